use async_trait::async_trait;
use shared::{
    domain::{ClassId, Comment, CommentId, Profile, ProfileId},
    protocol::{
        CreateCommentInput, CreateProfileInput, DeleteCommentInput, GenerationResponse,
        UpdateCommentInput,
    },
};

pub mod error;
pub mod graphql;
pub mod profile;
pub mod thread;

pub use error::{CommentError, StoreError, StoreResult};
pub use graphql::{Credentials, GraphqlClient};
pub use profile::{display_name, ensure_profile, load_profile_view, ProfileView, SignedInUser};
pub use thread::{
    CommentThread, NO_COMMENTS_PLACEHOLDER, SUMMARY_ERROR_PLACEHOLDER,
    SUMMARY_PENDING_PLACEHOLDER,
};

/// Comment-shaped records of the managed data store.
#[async_trait]
pub trait CommentStore: Send + Sync {
    async fn get_comment(&self, id: &CommentId) -> StoreResult<Option<Comment>>;
    /// All live comments whose `classId` equals `class_id`, in store order.
    async fn list_comments(&self, class_id: &ClassId) -> StoreResult<Vec<Comment>>;
    async fn create_comment(&self, input: CreateCommentInput) -> StoreResult<Comment>;
    async fn update_comment(&self, input: UpdateCommentInput) -> StoreResult<Comment>;
    async fn delete_comment(&self, input: DeleteCommentInput) -> StoreResult<Comment>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, id: &ProfileId) -> StoreResult<Option<Profile>>;
    async fn list_profiles(&self) -> StoreResult<Vec<Profile>>;
    async fn create_profile(&self, input: CreateProfileInput) -> StoreResult<Profile>;
}

/// Foundation-model endpoint proxied through the managed API.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn query(&self, prompt: &str) -> StoreResult<GenerationResponse>;
}
