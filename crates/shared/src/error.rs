use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `errorType` values the managed API uses for rejected versioned writes.
const CONFLICT_ERROR_TYPES: &[&str] = &[
    "ConflictUnhandled",
    "ConditionalCheckFailedException",
    "DynamoDB:ConditionalCheckFailedException",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphqlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<serde_json::Value>,
}

impl GraphqlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            path: Vec::new(),
        }
    }

    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    pub fn is_conflict(&self) -> bool {
        self.error_type
            .as_deref()
            .is_some_and(|kind| CONFLICT_ERROR_TYPES.contains(&kind))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", join_messages(.0))]
pub struct GraphqlErrors(pub Vec<GraphqlError>);

impl GraphqlErrors {
    pub fn any_conflict(&self) -> bool {
        self.0.iter().any(GraphqlError::is_conflict)
    }
}

fn join_messages(errors: &[GraphqlError]) -> String {
    errors
        .iter()
        .map(|err| match &err.error_type {
            Some(kind) => format!("{kind}: {}", err.message),
            None => err.message.clone(),
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognises_conflict_error_types() {
        let err = GraphqlError::new("Conflict resolver rejects mutation.")
            .with_type("ConflictUnhandled");
        assert!(err.is_conflict());
        assert!(!GraphqlError::new("Unauthorized").with_type("Unauthorized").is_conflict());
        assert!(!GraphqlError::new("no type").is_conflict());
    }

    #[test]
    fn joins_messages_with_their_types() {
        let errors = GraphqlErrors(vec![
            GraphqlError::new("first").with_type("Validation"),
            GraphqlError::new("second"),
        ]);
        assert_eq!(errors.to_string(), "Validation: first; second");
        assert!(!errors.any_conflict());
    }
}
