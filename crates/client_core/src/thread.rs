use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use shared::{
    domain::{ActiveComment, ClassId, Comment, CommentId, Version},
    protocol::{CreateCommentInput, DeleteCommentInput, ModelBody, UpdateCommentInput},
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{error::CommentError, CommentStore, TextGenerator};

pub const NO_COMMENTS_PLACEHOLDER: &str = "No comments available to summarize.";
pub const SUMMARY_ERROR_PLACEHOLDER: &str = "An error occurred while generating the summary.";
pub const SUMMARY_PENDING_PLACEHOLDER: &str = "Generated summary will appear here.";

#[derive(Debug, Default)]
struct ThreadState {
    comments: Vec<Comment>,
    active: Option<ActiveComment>,
    draft: String,
    stashed_draft: Option<String>,
    summary: Option<String>,
    last_error: Option<String>,
}

impl ThreadState {
    fn find(&self, id: &CommentId) -> Option<&Comment> {
        self.comments.iter().find(|comment| &comment.id == id)
    }

    fn upsert(&mut self, comment: Comment) {
        match self.comments.iter_mut().find(|existing| existing.id == comment.id) {
            Some(existing) => *existing = comment,
            None => self.comments.push(comment),
        }
    }

    fn editing(&self) -> bool {
        self.active.as_ref().is_some_and(ActiveComment::is_edit)
    }

    fn leave_active(&mut self) {
        self.active = None;
        self.draft = self.stashed_draft.take().unwrap_or_default();
    }

    /// The new-comment text being typed. While editing, `draft` holds the
    /// edited comment's text and the new-comment text sits in the stash.
    fn unsent_draft(&self) -> String {
        if self.editing() {
            self.stashed_draft.clone().unwrap_or_default()
        } else {
            self.draft.clone()
        }
    }
}

/// Raises a flag for as long as it lives.
struct BusyFlag<'a>(&'a AtomicBool);

impl<'a> BusyFlag<'a> {
    fn raise(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for BusyFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// View-model of the comment thread attached to one catalog item.
///
/// Holds whatever the store last returned for the item. Writes go straight
/// to the store; updates and deletes re-fetch the whole thread afterwards
/// instead of patching the local copy. State is never locked across a remote
/// call, so readers see the busy flags while a call is in flight.
pub struct CommentThread {
    store: Arc<dyn CommentStore>,
    generator: Arc<dyn TextGenerator>,
    class_id: ClassId,
    inner: Mutex<ThreadState>,
    loading: AtomicBool,
    summarizing: AtomicBool,
}

impl CommentThread {
    pub fn new(
        class_id: ClassId,
        store: Arc<dyn CommentStore>,
        generator: Arc<dyn TextGenerator>,
    ) -> Self {
        Self {
            store,
            generator,
            class_id,
            inner: Mutex::new(ThreadState::default()),
            loading: AtomicBool::new(false),
            summarizing: AtomicBool::new(false),
        }
    }

    pub fn class_id(&self) -> &ClassId {
        &self.class_id
    }

    /// Local comments in the order the store returned them.
    pub async fn comments(&self) -> Vec<Comment> {
        self.inner.lock().await.comments.clone()
    }

    /// Comments for this item, newest first.
    pub async fn visible_comments(&self) -> Vec<Comment> {
        let mut visible: Vec<Comment> = self
            .inner
            .lock()
            .await
            .comments
            .iter()
            .filter(|comment| comment.class_id == self.class_id)
            .cloned()
            .collect();
        visible.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        visible
    }

    pub async fn active(&self) -> Option<ActiveComment> {
        self.inner.lock().await.active.clone()
    }

    pub async fn draft(&self) -> String {
        self.inner.lock().await.draft.clone()
    }

    pub async fn set_draft(&self, draft: impl Into<String>) {
        self.inner.lock().await.draft = draft.into();
    }

    pub async fn summary(&self) -> String {
        self.inner
            .lock()
            .await
            .summary
            .clone()
            .unwrap_or_else(|| SUMMARY_PENDING_PLACEHOLDER.to_string())
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    pub fn is_summarizing(&self) -> bool {
        self.summarizing.load(Ordering::SeqCst)
    }

    /// Message of the most recent failed remote call, cleared by the next
    /// successful one.
    pub async fn last_error(&self) -> Option<String> {
        self.inner.lock().await.last_error.clone()
    }

    /// Replaces the local thread with a fresh fetch. A failed fetch is logged
    /// and leaves the thread empty.
    pub async fn list(&self) -> Vec<Comment> {
        let _loading = BusyFlag::raise(&self.loading);
        let fetched = self.store.list_comments(&self.class_id).await;

        let mut state = self.inner.lock().await;
        match fetched {
            Ok(comments) => {
                state.comments = comments;
                state.last_error = None;
            }
            Err(err) => {
                error!(class_id = %self.class_id, "comments: error fetching comments: {err}");
                state.comments.clear();
                state.last_error = Some(err.to_string());
            }
        }
        state.comments.clone()
    }

    pub async fn create(&self, body: &str) -> Result<Comment, CommentError> {
        if is_blank(body) {
            warn!(class_id = %self.class_id, "comments: refusing to create an empty comment");
            return Err(CommentError::EmptyBody);
        }

        let input = CreateCommentInput {
            class_id: self.class_id.clone(),
            content: body.to_string(),
        };
        let created = self.store.create_comment(input).await;

        let mut state = self.inner.lock().await;
        match created {
            Ok(comment) => {
                info!(class_id = %self.class_id, comment_id = %comment.id, "comments: created comment");
                state.upsert(comment.clone());
                state.last_error = None;
                Ok(comment)
            }
            Err(err) => {
                error!(class_id = %self.class_id, "comments: error creating comment: {err}");
                state.last_error = Some(err.to_string());
                Err(err.into())
            }
        }
    }

    pub async fn update(
        &self,
        id: &CommentId,
        version: Version,
        body: &str,
    ) -> Result<(), CommentError> {
        if is_blank(body) {
            warn!(comment_id = %id, "comments: refusing to update with an empty body");
            return Err(CommentError::EmptyBody);
        }

        let input = UpdateCommentInput {
            id: id.clone(),
            content: body.to_string(),
            version,
        };
        match self.store.update_comment(input).await {
            Ok(updated) => {
                info!(
                    comment_id = %updated.id,
                    version = %updated.version,
                    "comments: updated comment"
                );
                self.list().await;
                Ok(())
            }
            Err(err) => {
                error!(comment_id = %id, %version, "comments: error updating comment: {err}");
                self.inner.lock().await.last_error = Some(err.to_string());
                Err(CommentError::from_write(id, version, err))
            }
        }
    }

    pub async fn delete(&self, id: &CommentId, version: Version) -> Result<(), CommentError> {
        let input = DeleteCommentInput {
            id: id.clone(),
            version,
        };
        match self.store.delete_comment(input).await {
            Ok(deleted) => {
                info!(comment_id = %deleted.id, "comments: deleted comment");
                {
                    let mut state = self.inner.lock().await;
                    if state.active.as_ref().is_some_and(|active| &active.id == id) {
                        state.leave_active();
                    }
                }
                self.list().await;
                Ok(())
            }
            Err(err) => {
                error!(comment_id = %id, %version, "comments: error deleting comment: {err}");
                self.inner.lock().await.last_error = Some(err.to_string());
                Err(CommentError::from_write(id, version, err))
            }
        }
    }

    /// Puts the form into edit mode for `id`, loading its body as the draft.
    /// The draft that was being typed is restored by [`Self::cancel`].
    pub async fn begin_edit(&self, id: &CommentId) -> Result<(), CommentError> {
        let mut state = self.inner.lock().await;
        let content = state
            .find(id)
            .map(|comment| comment.content.clone())
            .ok_or_else(|| CommentError::UnknownComment(id.clone()))?;
        if state.stashed_draft.is_none() {
            state.stashed_draft = Some(std::mem::take(&mut state.draft));
        }
        state.draft = content;
        state.active = Some(ActiveComment::edit(id.clone()));
        Ok(())
    }

    pub async fn begin_reply(&self, id: &CommentId) -> Result<(), CommentError> {
        let mut state = self.inner.lock().await;
        if state.find(id).is_none() {
            return Err(CommentError::UnknownComment(id.clone()));
        }
        if state.editing() {
            state.leave_active();
        }
        state.active = Some(ActiveComment::reply(id.clone()));
        Ok(())
    }

    /// Leaves edit mode if editing, otherwise discards the draft.
    pub async fn cancel(&self) {
        let mut state = self.inner.lock().await;
        if state.editing() {
            state.leave_active();
        } else {
            state.draft.clear();
        }
    }

    /// Sends the draft: an update of the edited comment in edit mode, a new
    /// comment otherwise.
    pub async fn submit(&self) -> Result<(), CommentError> {
        let (body, edit_target) = {
            let state = self.inner.lock().await;
            let target = match &state.active {
                Some(active) if active.is_edit() => {
                    let version = state
                        .find(&active.id)
                        .map(|comment| comment.version)
                        .ok_or_else(|| CommentError::UnknownComment(active.id.clone()))?;
                    Some((active.id.clone(), version))
                }
                _ => None,
            };
            (state.draft.clone(), target)
        };

        match edit_target {
            Some((id, version)) => {
                self.update(&id, version, &body).await?;
                let mut state = self.inner.lock().await;
                if state.active.as_ref().is_some_and(|active| active.id == id) {
                    state.leave_active();
                }
            }
            None => {
                self.create(&body).await?;
                self.inner.lock().await.draft.clear();
            }
        }
        Ok(())
    }

    /// Summarizes the thread plus the unsent new-comment draft. Failures are
    /// logged and turned into [`SUMMARY_ERROR_PLACEHOLDER`]; the result is
    /// also kept as [`Self::summary`].
    pub async fn summarize(&self) -> String {
        let _summarizing = BusyFlag::raise(&self.summarizing);
        info!(class_id = %self.class_id, "comments: generating summarization");

        let draft = self.inner.lock().await.unsent_draft();
        let text = match self.generate_summary(Some(&draft)).await {
            Ok(text) => text,
            Err(err) => {
                error!(class_id = %self.class_id, "comments: error generating summary: {err}");
                SUMMARY_ERROR_PLACEHOLDER.to_string()
            }
        };

        self.inner.lock().await.summary = Some(text.clone());
        text
    }

    /// Fetches the thread, appends `draft` when it has content and asks the
    /// text generator for a structured summary. Returns
    /// [`NO_COMMENTS_PLACEHOLDER`] without calling the generator when there
    /// is nothing to summarize.
    pub async fn generate_summary(&self, draft: Option<&str>) -> Result<String, CommentError> {
        let existing = self.store.list_comments(&self.class_id).await?;
        let mut bodies: Vec<&str> = existing
            .iter()
            .map(|comment| comment.content.as_str())
            .collect();
        if let Some(draft) = draft.filter(|draft| !draft.trim().is_empty()) {
            bodies.push(draft);
        }

        if bodies.is_empty() {
            info!(class_id = %self.class_id, "comments: no comments to summarize");
            return Ok(NO_COMMENTS_PLACEHOLDER.to_string());
        }

        let response = self
            .generator
            .query(&build_summary_prompt(&bodies))
            .await?;
        parse_model_text(&response.body)
    }
}

fn is_blank(body: &str) -> bool {
    body.chars().all(char::is_whitespace)
}

pub(crate) fn build_summary_prompt(bodies: &[&str]) -> String {
    format!(
        "📊 Summarize the following comments in a structured format:\n\n\
         {}\n\n\
         Format your response as follows:\n\n\
         📚 Summary:\n\
         [Provide a concise summary of the overall sentiment and main points]\n\n\
         ⭐️ Overall Score : [_/5]\n\n\
         💫 Key Reason:\n\
         [Main reason for the score]",
        bodies.join("\n")
    )
}

/// Pulls `content[0].text` out of the model's JSON body.
pub(crate) fn parse_model_text(body: &str) -> Result<String, CommentError> {
    let parsed: ModelBody = serde_json::from_str(body)?;
    match parsed.first_text() {
        Some(text) if !text.is_empty() => Ok(text.to_string()),
        _ => Err(CommentError::EmptyModelResponse),
    }
}

#[cfg(test)]
#[path = "tests/thread_tests.rs"]
mod tests;
