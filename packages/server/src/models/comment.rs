use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::comment;
use crate::error::AppError;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    #[schema(example = "The silhouette reads much better now.")]
    pub content: String,
}

pub fn validate_comment(payload: &CreateCommentRequest) -> Result<(), AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::Validation("Comment must not be empty".into()));
    }
    if payload.content.chars().count() > 10_000 {
        return Err(AppError::Validation(
            "Comment must be at most 10,000 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentResponse {
    pub id: i32,
    pub asset_id: i32,
    pub user_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<comment::Model> for CommentResponse {
    fn from(c: comment::Model) -> Self {
        Self {
            id: c.id,
            asset_id: c.asset_id,
            user_id: c.user_id,
            content: c.content,
            created_at: c.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
    pub total: u64,
}
