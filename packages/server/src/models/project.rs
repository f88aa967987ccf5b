use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::project;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateProjectRequest {
    #[schema(example = "spring_campaign")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub active: Option<bool>,
}

pub fn validate_project_name(name: &str) -> Result<(), AppError> {
    let name = name.trim();
    if name.is_empty() || name.chars().count() > 128 {
        return Err(AppError::Validation(
            "Project name must be 1-128 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<project::Model> for ProjectResponse {
    fn from(p: project::Model) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            active: p.active,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectResponse>,
    pub total: u64,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ProjectListQuery {
    /// Include inactive projects when true.
    pub include_inactive: Option<bool>,
}
