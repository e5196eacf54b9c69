use serde::{Deserialize, Serialize};

/// Query parameters shared by both page-view endpoints.
#[derive(Debug, Deserialize)]
pub struct PageViewParams {
    pub id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PageViewResponse {
    pub views: i64,
}
