use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/projects", project_routes())
        .nest("/assets", asset_routes())
        .nest("/versions", version_meta_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::auth::register))
        .routes(routes!(handlers::auth::login))
        .routes(routes!(handlers::auth::me))
}

fn project_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::project::list_projects,
            handlers::project::create_project
        ))
        .routes(routes!(
            handlers::project::get_project,
            handlers::project::update_project,
            handlers::project::delete_project
        ))
}

fn asset_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(
            handlers::asset::list_assets,
            handlers::asset::upload_asset
        ))
        .routes(routes!(handlers::asset::get_asset))
        .routes(routes!(
            handlers::version::list_versions,
            handlers::version::create_version
        ))
        .routes(routes!(handlers::version::download_version))
        .routes(routes!(
            handlers::comment::list_comments,
            handlers::comment::add_comment
        ))
        .layer(handlers::asset::upload_body_limit())
}

fn version_meta_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(handlers::version::list_statuses))
}
