use async_trait::async_trait;
use tracing::{debug, error};

use super::types::Tag;
use crate::app::{
  errors::StagsError,
  query::TagQuery,
  types::{Document, DocumentDraft},
};

/// Create/read/update/delete of documents and the tag-intersection query over them.
///
/// Writes are atomic: a document and its tag associations are stored together or
/// not at all. Rejections (`Validation`, `NotFound`) never touch storage state.
#[async_trait]
pub trait DocumentStore: Send + Sync {
  /// Stores a new document owned by `owner_id`. The draft must carry a known type
  /// and at least one tag.
  async fn create(&self, draft: &DocumentDraft, owner_id: i32) -> Result<Document, StagsError>;

  /// A document with its full tag list. Documents without tags read as not found.
  async fn read(&self, id: i32) -> Result<Document, StagsError>;

  /// Writes the scalar fields that changed. A non-empty tag list replaces every
  /// association of the document, even when the set is unchanged; an empty one
  /// leaves the tags alone.
  async fn update(&self, id: i32, draft: &DocumentDraft) -> Result<Document, StagsError>;

  async fn delete(&self, id: i32) -> Result<(), StagsError>;

  async fn owned_by(&self, id: i32, uid: i32) -> Result<bool, StagsError>;

  /// Documents matching a normalized query, by ascending id.
  async fn find(&self, query: &TagQuery) -> Result<Vec<Document>, StagsError>;

  async fn tags(&self) -> Result<Vec<Tag>, StagsError>;

  /// Documents visible to `uid` that carry every tag in `tags`. With no tags, every
  /// document `uid` owns.
  async fn query(&self, uid: i32, tags: &[String]) -> Result<Vec<Document>, StagsError> {
    self.find(&TagQuery::new(uid, tags)).await
  }
}

/// Logs a failed store operation once, at the level its kind deserves.
pub(crate) fn log_outcome<T>(
  op: &'static str,
  result: Result<T, StagsError>,
) -> Result<T, StagsError> {
  if let Err(err) = &result {
    if err.is_rejection() {
      debug!(op, %err, "request rejected");
    } else {
      error!(op, %err, "storage failure");
    }
  }
  result
}
