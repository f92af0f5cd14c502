use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use shared::{
    domain::{ClassId, Comment, CommentId, Profile, ProfileId},
    error::GraphqlError,
    protocol::{
        CommentFilter, CreateCommentInput, CreateProfileInput, DeleteCommentInput,
        GenerationResponse, GraphqlRequest, GraphqlResponse, ModelConnection, UpdateCommentInput,
    },
};
use tracing::{debug, warn};

use crate::{
    error::{StoreError, StoreResult},
    CommentStore, ProfileStore, TextGenerator,
};

const GET_COMMENT: &str = "query GetComment($id: ID!) { getComment(id: $id) { id classId content owner createdAt updatedAt _version _deleted } }";
const LIST_COMMENTS: &str = "query ListComments($filter: ModelCommentFilterInput, $nextToken: String) { listComments(filter: $filter, nextToken: $nextToken) { items { id classId content owner createdAt updatedAt _version _deleted } nextToken } }";
const CREATE_COMMENT: &str = "mutation CreateComment($input: CreateCommentInput!) { createComment(input: $input) { id classId content owner createdAt updatedAt _version _deleted } }";
const UPDATE_COMMENT: &str = "mutation UpdateComment($input: UpdateCommentInput!) { updateComment(input: $input) { id classId content owner createdAt updatedAt _version _deleted } }";
const DELETE_COMMENT: &str = "mutation DeleteComment($input: DeleteCommentInput!) { deleteComment(input: $input) { id classId content owner createdAt updatedAt _version _deleted } }";
const GET_PROFILE: &str = "query GetProfile($id: ID!) { getProfile(id: $id) { id userId name organization point } }";
const LIST_PROFILES: &str = "query ListProfiles($nextToken: String) { listProfiles(nextToken: $nextToken) { items { id userId name organization point } nextToken } }";
const CREATE_PROFILE: &str = "mutation CreateProfile($input: CreateProfileInput!) { createProfile(input: $input) { id userId name organization point } }";
const MAX_ERROR_BODY: usize = 512;

const ASK_BEDROCK: &str = "query AskBedrock($prompt: String) { askBedrock(prompt: $prompt) { body error } }";

#[derive(Debug, Clone, Default)]
pub enum Credentials {
    #[default]
    None,
    /// Sent as `x-api-key`.
    ApiKey(String),
    /// User-pool token, sent verbatim as `Authorization`.
    Token(String),
}

/// HTTP client for the schema-generated GraphQL API of the managed backend.
#[derive(Debug, Clone)]
pub struct GraphqlClient {
    http: Client,
    endpoint: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetCommentData {
    get_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListCommentsData {
    list_comments: ModelConnection<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateCommentData {
    create_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateCommentData {
    update_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteCommentData {
    delete_comment: Option<Comment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetProfileData {
    get_profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListProfilesData {
    list_profiles: ModelConnection<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateProfileData {
    create_profile: Option<Profile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AskBedrockData {
    ask_bedrock: Option<BedrockReply>,
}

#[derive(Debug, Deserialize)]
struct ErrorsOnly {
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Debug, Deserialize)]
struct BedrockReply {
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListCommentsVariables<'a> {
    filter: &'a CommentFilter,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PageVariables<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    next_token: Option<&'a str>,
}

impl GraphqlClient {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            http: Client::new(),
            endpoint: endpoint.into(),
            credentials,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn execute<V, T>(&self, operation: &'static str, query: &str, variables: V) -> StoreResult<T>
    where
        V: Serialize + Send,
        T: DeserializeOwned + Send,
    {
        let request = self
            .http
            .post(&self.endpoint)
            .json(&GraphqlRequest { query, variables });
        let request = match &self.credentials {
            Credentials::None => request,
            Credentials::ApiKey(key) => request.header("x-api-key", key),
            Credentials::Token(token) => request.header(reqwest::header::AUTHORIZATION, token),
        };

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        if !status.is_success() {
            return Err(rejected(operation, status, &bytes));
        }

        let envelope: GraphqlResponse<T> = serde_json::from_slice(&bytes)
            .map_err(|source| StoreError::Decode { operation, source })?;

        if let Some(errors) = envelope.errors.filter(|errors| !errors.is_empty()) {
            debug!(operation, count = errors.len(), "graphql: request returned errors");
            return Err(StoreError::from_graphql(errors));
        }
        envelope
            .data
            .ok_or(StoreError::MissingData { operation })
    }
}

/// Error for a non-2xx reply. The managed API reports auth and validation
/// failures with a 4xx status and a GraphQL `errors` array, which is kept
/// when present.
fn rejected(operation: &'static str, status: StatusCode, bytes: &[u8]) -> StoreError {
    match serde_json::from_slice::<ErrorsOnly>(bytes) {
        Ok(ErrorsOnly { errors }) if !errors.is_empty() => {
            warn!(operation, %status, count = errors.len(), "graphql: request rejected");
            StoreError::from_graphql(errors)
        }
        _ => {
            warn!(operation, %status, "graphql: request failed without graphql errors");
            StoreError::Status {
                operation,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes[..bytes.len().min(MAX_ERROR_BODY)]).into_owned(),
            }
        }
    }
}

#[async_trait]
impl CommentStore for GraphqlClient {
    async fn get_comment(&self, id: &CommentId) -> StoreResult<Option<Comment>> {
        let data: GetCommentData = self
            .execute("getComment", GET_COMMENT, json!({ "id": id }))
            .await?;
        Ok(data.get_comment.filter(|comment| !comment.is_deleted()))
    }

    async fn list_comments(&self, class_id: &ClassId) -> StoreResult<Vec<Comment>> {
        let filter = CommentFilter::for_class(class_id);
        let mut comments = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let data: ListCommentsData = self
                .execute(
                    "listComments",
                    LIST_COMMENTS,
                    ListCommentsVariables {
                        filter: &filter,
                        next_token: next_token.as_deref(),
                    },
                )
                .await?;
            for item in data.list_comments.items {
                match serde_json::from_value::<Comment>(item) {
                    Ok(comment) if !comment.is_deleted() => comments.push(comment),
                    Ok(_) => {}
                    Err(err) => {
                        warn!(%class_id, "graphql: skipping undecodable listComments item: {err}")
                    }
                }
            }
            match data.list_comments.next_token {
                Some(token) if next_token.as_deref() != Some(token.as_str()) => {
                    next_token = Some(token)
                }
                Some(token) => {
                    warn!(%class_id, %token, "graphql: listComments repeated its page token");
                    break;
                }
                None => break,
            }
        }
        Ok(comments)
    }

    async fn create_comment(&self, input: CreateCommentInput) -> StoreResult<Comment> {
        let data: CreateCommentData = self
            .execute("createComment", CREATE_COMMENT, json!({ "input": input }))
            .await?;
        data.create_comment.ok_or(StoreError::MissingData {
            operation: "createComment",
        })
    }

    async fn update_comment(&self, input: UpdateCommentInput) -> StoreResult<Comment> {
        let data: UpdateCommentData = self
            .execute("updateComment", UPDATE_COMMENT, json!({ "input": input }))
            .await?;
        data.update_comment.ok_or(StoreError::MissingData {
            operation: "updateComment",
        })
    }

    async fn delete_comment(&self, input: DeleteCommentInput) -> StoreResult<Comment> {
        let data: DeleteCommentData = self
            .execute("deleteComment", DELETE_COMMENT, json!({ "input": input }))
            .await?;
        data.delete_comment.ok_or(StoreError::MissingData {
            operation: "deleteComment",
        })
    }
}

#[async_trait]
impl ProfileStore for GraphqlClient {
    async fn get_profile(&self, id: &ProfileId) -> StoreResult<Option<Profile>> {
        let data: GetProfileData = self
            .execute("getProfile", GET_PROFILE, json!({ "id": id }))
            .await?;
        Ok(data.get_profile)
    }

    async fn list_profiles(&self) -> StoreResult<Vec<Profile>> {
        let mut profiles = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let data: ListProfilesData = self
                .execute(
                    "listProfiles",
                    LIST_PROFILES,
                    PageVariables {
                        next_token: next_token.as_deref(),
                    },
                )
                .await?;
            profiles.extend(data.list_profiles.items);
            match data.list_profiles.next_token {
                Some(token) if next_token.as_deref() != Some(token.as_str()) => {
                    next_token = Some(token)
                }
                Some(token) => {
                    warn!(%token, "graphql: listProfiles repeated its page token");
                    break;
                }
                None => break,
            }
        }
        Ok(profiles)
    }

    async fn create_profile(&self, input: CreateProfileInput) -> StoreResult<Profile> {
        let data: CreateProfileData = self
            .execute("createProfile", CREATE_PROFILE, json!({ "input": input }))
            .await?;
        data.create_profile.ok_or(StoreError::MissingData {
            operation: "createProfile",
        })
    }
}

#[async_trait]
impl TextGenerator for GraphqlClient {
    async fn query(&self, prompt: &str) -> StoreResult<GenerationResponse> {
        let data: AskBedrockData = self
            .execute("askBedrock", ASK_BEDROCK, json!({ "prompt": prompt }))
            .await?;
        match data.ask_bedrock {
            Some(BedrockReply {
                body: Some(body), ..
            }) => Ok(GenerationResponse { body }),
            Some(BedrockReply {
                error: Some(message),
                ..
            }) => Err(StoreError::from_graphql(vec![
                GraphqlError::new(message).with_type("BedrockError")
            ])),
            _ => Err(StoreError::MissingData {
                operation: "askBedrock",
            }),
        }
    }
}

#[cfg(test)]
#[path = "tests/graphql_tests.rs"]
mod tests;
