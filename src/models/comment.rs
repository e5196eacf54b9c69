use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::error::AppError;

/// Deepest allowed reply level; top-level comments are level 0.
pub const MAX_REPLY_DEPTH: i64 = 32;

/// Represents the 'comments' table in the database.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,

    /// Partition key: an article slug or a synthetic `photo:<filename>` key.
    pub post_id: String,

    /// `None` for top-level comments.
    pub parent_id: Option<i64>,

    pub nickname: String,
    pub content: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// A comment together with its nested replies (oldest reply first).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentNode {
    #[serde(flatten)]
    pub comment: Comment,
    pub replies: Vec<CommentNode>,
}

// Unlink the subtree level by level so a long reply chain is freed
// without one stack frame per level.
impl Drop for CommentNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.replies);
        while let Some(mut node) = stack.pop() {
            stack.append(&mut node.replies);
        }
    }
}

/// Query parameters for listing comments.
#[derive(Debug, Deserialize)]
pub struct CommentListParams {
    #[serde(rename = "postId")]
    pub post_id: Option<String>,
}

/// An assembled comment thread; also the body of `GET /api/comments`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentTree {
    /// Root comments, newest first.
    pub comments: Vec<CommentNode>,
    /// Every row of the post, including replies and unreachable orphans.
    pub total: usize,
}

/// Raw body of `POST /api/comments`. Every field is optional so that a
/// missing field surfaces as a 400 with our own message, not a rejection
/// from the JSON extractor.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub post_id: Option<String>,
    pub nickname: Option<String>,
    pub content: Option<String>,
    pub parent_id: Option<i64>,
}

/// A trimmed, validated comment ready for insertion.
#[derive(Debug, Validate)]
pub struct NewComment {
    #[validate(length(
        min = 1,
        max = 255,
        message = "postId must be between 1 and 255 characters"
    ))]
    pub post_id: String,

    #[validate(length(
        min = 1,
        max = 50,
        message = "Nickname must be between 1 and 50 characters"
    ))]
    pub nickname: String,

    #[validate(length(
        min = 1,
        max = 1000,
        message = "Comment must be between 1 and 1000 characters"
    ))]
    pub content: String,

    pub parent_id: Option<i64>,
}

impl CreateCommentRequest {
    /// Returns the submission with nickname and content trimmed, or `None`
    /// when a required field is missing or blank. `postId` is a lookup key
    /// and is kept verbatim.
    pub fn into_new_comment(self) -> Option<NewComment> {
        let present = |field: Option<String>| {
            field
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Some(NewComment {
            post_id: self.post_id.filter(|id| !id.is_empty())?,
            nickname: present(self.nickname)?,
            content: present(self.content)?,
            parent_id: self.parent_id,
        })
    }
}

impl NewComment {
    /// Validates the submission and reports the first failing field,
    /// checked in the order postId, nickname, content.
    pub fn check(&self) -> Result<(), AppError> {
        const FIELD_ORDER: [&str; 3] = ["post_id", "nickname", "content"];

        let Err(errors) = self.validate() else {
            return Ok(());
        };
        let fields = errors.field_errors();
        let message = FIELD_ORDER
            .iter()
            .filter_map(|field| fields.get(*field))
            .flat_map(|errs| errs.iter())
            .find_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());

        Err(AppError::BadRequest(message))
    }
}

/// Response body for a successful `POST /api/comments`.
#[derive(Debug, Serialize)]
pub struct CreatedCommentResponse {
    pub success: bool,
    pub comment: Comment,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(post_id: &str, nickname: &str, content: &str) -> CreateCommentRequest {
        CreateCommentRequest {
            post_id: Some(post_id.to_string()),
            nickname: Some(nickname.to_string()),
            content: Some(content.to_string()),
            parent_id: None,
        }
    }

    #[test]
    fn trims_before_validation() {
        let new = request("post-1", "  Ada  ", "\n hello \n")
            .into_new_comment()
            .unwrap();
        assert_eq!(new.post_id, "post-1");
        assert_eq!(new.nickname, "Ada");
        assert_eq!(new.content, "hello");
        assert!(new.validate().is_ok());
    }

    #[test]
    fn blank_fields_are_missing() {
        assert!(request("p", "   ", "hi").into_new_comment().is_none());
        assert!(request("p", "Ada", "").into_new_comment().is_none());
        assert!(CreateCommentRequest::default().into_new_comment().is_none());
    }

    #[test]
    fn length_bounds_count_characters() {
        let fifty = "名".repeat(50);
        let ok = request("p", &fifty, "hi").into_new_comment().unwrap();
        assert!(ok.validate().is_ok());

        let too_long = request("p", &"a".repeat(51), "hi").into_new_comment().unwrap();
        assert!(too_long.validate().is_err());

        let content = request("p", "Ada", &"x".repeat(1001)).into_new_comment().unwrap();
        assert!(content.validate().is_err());
    }

    #[test]
    fn post_id_is_kept_verbatim() {
        let new = request(" post-1 ", "Ada", "hi").into_new_comment().unwrap();
        assert_eq!(new.post_id, " post-1 ");
        assert!(request("", "Ada", "hi").into_new_comment().is_none());
    }

    fn bad_request_message(result: Result<(), AppError>) -> String {
        match result {
            Err(AppError::BadRequest(message)) => message,
            other => panic!("expected a bad request, got {:?}", other),
        }
    }

    #[test]
    fn nickname_is_reported_before_content() {
        let long_nickname = "n".repeat(51);
        let long_content = "c".repeat(1001);
        for _ in 0..20 {
            let new = request("p", &long_nickname, &long_content)
                .into_new_comment()
                .unwrap();
            assert_eq!(
                bad_request_message(new.check()),
                "Nickname must be between 1 and 50 characters"
            );
        }

        let new = request("p", "Ada", &long_content).into_new_comment().unwrap();
        assert_eq!(
            bad_request_message(new.check()),
            "Comment must be between 1 and 1000 characters"
        );
        assert!(request("p", "Ada", "hi").into_new_comment().unwrap().check().is_ok());
    }

    #[test]
    fn request_uses_camel_case() {
        let req: CreateCommentRequest = serde_json::from_value(serde_json::json!({
            "postId": "p",
            "nickname": "Ada",
            "content": "hi",
            "parentId": 7
        }))
        .unwrap();
        assert_eq!(req.parent_id, Some(7));
        assert_eq!(req.post_id.as_deref(), Some("p"));
    }
}
