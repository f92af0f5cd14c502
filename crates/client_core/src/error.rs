use shared::{
    domain::{CommentId, Version},
    error::{GraphqlError, GraphqlErrors},
};
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("version conflict: {0}")]
    Conflict(GraphqlErrors),
    #[error("store rejected request: {0}")]
    Graphql(GraphqlErrors),
    #[error("{operation} failed with HTTP {status}: {body}")]
    Status {
        operation: &'static str,
        status: u16,
        body: String,
    },
    #[error("{operation} returned no data")]
    MissingData { operation: &'static str },
    #[error("failed to decode {operation} response: {source}")]
    Decode {
        operation: &'static str,
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn from_graphql(errors: Vec<GraphqlError>) -> Self {
        let errors = GraphqlErrors(errors);
        if errors.any_conflict() {
            Self::Conflict(errors)
        } else {
            Self::Graphql(errors)
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }
}

#[derive(Debug, Error)]
pub enum CommentError {
    #[error("comment body must not be empty")]
    EmptyBody,
    #[error("comment {0} is not part of this thread")]
    UnknownComment(CommentId),
    #[error("comment {id} was modified concurrently (sent version {version})")]
    Conflict {
        id: CommentId,
        version: Version,
        #[source]
        source: StoreError,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("text generation returned a malformed body: {0}")]
    MalformedModelResponse(#[from] serde_json::Error),
    #[error("text generation returned no text")]
    EmptyModelResponse,
}

impl CommentError {
    pub(crate) fn from_write(id: &CommentId, version: Version, err: StoreError) -> Self {
        if err.is_conflict() {
            Self::Conflict {
                id: id.clone(),
                version,
                source: err,
            }
        } else {
            Self::Store(err)
        }
    }
}
