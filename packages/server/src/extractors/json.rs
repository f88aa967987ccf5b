use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// JSON body extractor that reports malformed input through the API's
/// error envelope instead of axum's plain-text rejection.
#[derive(Debug)]
pub struct AppJson<T>(pub T);

impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(JsonRejection::MissingJsonContentType(_)) => Err(AppError::Validation(
                "Expected 'Content-Type: application/json'".into(),
            )),
            Err(rejection) => Err(AppError::Validation(rejection.body_text())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, header};
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Payload {
        name: String,
    }

    #[tokio::test]
    async fn valid_body_is_extracted() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"hero"}"#))
            .unwrap();
        let AppJson(payload) = AppJson::<Payload>::from_request(req, &()).await.unwrap();
        assert_eq!(payload.name, "hero");
    }

    #[tokio::test]
    async fn malformed_body_becomes_validation_error() {
        let req = Request::builder()
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let err = AppJson::<Payload>::from_request(req, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_content_type_is_rejected() {
        let req = Request::builder().body(Body::from("{}")).unwrap();
        let err = AppJson::<Payload>::from_request(req, &())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
