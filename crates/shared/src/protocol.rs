use serde::{Deserialize, Serialize};

use crate::{
    domain::{ClassId, CommentId, ProfileId, Version},
    error::GraphqlError,
};

#[derive(Debug, Clone, Serialize)]
pub struct GraphqlRequest<'a, V> {
    pub query: &'a str,
    pub variables: V,
}

/// Every managed-API call answers with this envelope. Both halves may be set
/// at once when a field resolver fails partway.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct GraphqlResponse<T> {
    #[serde(default)]
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelConnection<T> {
    pub items: Vec<T>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EqFilter<T> {
    pub eq: T,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentFilter {
    pub class_id: EqFilter<ClassId>,
}

impl CommentFilter {
    pub fn for_class(class_id: &ClassId) -> Self {
        Self {
            class_id: EqFilter {
                eq: class_id.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentInput {
    pub class_id: ClassId,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UpdateCommentInput {
    pub id: CommentId,
    pub content: String,
    #[serde(rename = "_version")]
    pub version: Version,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteCommentInput {
    pub id: CommentId,
    #[serde(rename = "_version")]
    pub version: Version,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProfileInput {
    pub id: ProfileId,
    pub user_id: String,
    pub name: Option<String>,
    pub organization: String,
    pub point: i64,
}

/// Raw answer of the text-generation query; `body` is itself JSON text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelContentBlock {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelBody {
    pub content: Vec<ModelContentBlock>,
}

impl ModelBody {
    /// `content[0].text`, if the model produced one.
    pub fn first_text(&self) -> Option<&str> {
        self.content.first().and_then(|block| block.text.as_deref())
    }
}
