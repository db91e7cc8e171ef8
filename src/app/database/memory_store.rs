use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, instrument};

use super::{
  document_store::{log_outcome, DocumentStore},
  types::{DocumentRow, Tag},
};
use crate::app::{
  errors::StagsError,
  query::TagQuery,
  tag_cache::{TagCache, TagSource},
  types::{Document, DocumentDraft, ValidDraft},
};

/// The relational tables of the PostgreSQL schema, in process.
#[derive(Debug, Default)]
struct Tables {
  documents: BTreeMap<i32, DocumentRow>,
  tag_ids: HashMap<String, i32>,
  tag_names: BTreeMap<i32, String>,
  /// (document_id, tag_id)
  links: BTreeSet<(i32, i32)>,
  last_document_id: i32,
}

impl Tables {
  fn tags_of(&self, document_id: i32) -> Vec<String> {
    self
      .links
      .range((document_id, i32::MIN)..=(document_id, i32::MAX))
      .filter_map(|(_, tag_id)| self.tag_names.get(tag_id).cloned())
      .collect()
  }

  fn unlink_all(&mut self, document_id: i32) {
    self.links.retain(|(doc, _)| *doc != document_id);
  }
}

#[async_trait]
impl TagSource for Tables {
  async fn insert_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError> {
    if self.tag_ids.contains_key(name) {
      return Ok(None);
    }
    let id = self.tag_names.keys().next_back().copied().unwrap_or(0) + 1;
    self.tag_ids.insert(name.to_string(), id);
    self.tag_names.insert(id, name.to_string());
    Ok(Some(id))
  }

  async fn find_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError> {
    Ok(self.tag_ids.get(name).copied())
  }
}

/// Document store kept entirely in memory. Same semantics as the PostgreSQL store;
/// a single lock makes every write atomic.
#[derive(Debug, Default)]
pub struct MemoryStore {
  tables: Mutex<Tables>,
  cache: TagCache,
}

impl MemoryStore {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn tag_cache(&self) -> &TagCache {
    &self.cache
  }

  pub async fn association_count(&self, document_id: i32) -> usize {
    self.tables.lock().await.links.iter().filter(|(doc, _)| *doc == document_id).count()
  }

  async fn link_tags(
    &self,
    tables: &mut Tables,
    document_id: i32,
    draft: &ValidDraft,
  ) -> Result<(), StagsError> {
    let mut pending = self.cache.pending();
    let mut links = Vec::with_capacity(draft.tags.len());
    for name in &draft.tags {
      links.push((document_id, pending.resolve(tables, name).await?));
    }
    tables.links.extend(links);
    pending.commit();
    Ok(())
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  #[instrument(skip(self, draft), fields(name = %draft.name))]
  async fn create(&self, draft: &DocumentDraft, owner_id: i32) -> Result<Document, StagsError> {
    log_outcome("create", async {
      let draft = draft.validate()?.require_tags()?;
      let mut tables = self.tables.lock().await;
      tables.last_document_id += 1;
      let row = DocumentRow {
        id: tables.last_document_id,
        name: draft.name.clone(),
        doc_type: draft.doc_type,
        content: draft.content.clone(),
        owner_id,
      };
      tables.documents.insert(row.id, row.clone());
      self.link_tags(&mut tables, row.id, &draft).await?;

      info!(id = row.id, owner_id, "created document");
      Ok::<_, StagsError>(row.with_tags(draft.tags.into_iter().collect()))
    }
    .await)
  }

  async fn read(&self, id: i32) -> Result<Document, StagsError> {
    log_outcome("read", async {
      let tables = self.tables.lock().await;
      let row = tables.documents.get(&id).cloned().ok_or(StagsError::NotFound(id))?;
      let tags = tables.tags_of(id);
      if tags.is_empty() {
        return Err(StagsError::NotFound(id));
      }
      Ok::<_, StagsError>(row.with_tags(tags))
    }
    .await)
  }

  #[instrument(skip(self, draft))]
  async fn update(&self, id: i32, draft: &DocumentDraft) -> Result<Document, StagsError> {
    log_outcome("update", async {
      let draft = draft.validate()?;
      let mut tables = self.tables.lock().await;
      let mut row = tables.documents.get(&id).cloned().ok_or(StagsError::NotFound(id))?;

      let changes = row.changes_to(&draft);
      if !changes.is_empty() {
        changes.apply(&mut row);
        tables.documents.insert(id, row.clone());
      }
      if !draft.tags.is_empty() {
        tables.unlink_all(id);
        self.link_tags(&mut tables, id, &draft).await?;
      }

      info!(id, "updated document");
      let tags = tables.tags_of(id);
      Ok::<_, StagsError>(row.with_tags(tags))
    }
    .await)
  }

  #[instrument(skip(self))]
  async fn delete(&self, id: i32) -> Result<(), StagsError> {
    log_outcome("delete", async {
      let mut tables = self.tables.lock().await;
      tables.documents.remove(&id).ok_or(StagsError::NotFound(id))?;
      tables.unlink_all(id);
      info!(id, "deleted document");
      Ok::<_, StagsError>(())
    }
    .await)
  }

  async fn owned_by(&self, id: i32, uid: i32) -> Result<bool, StagsError> {
    let tables = self.tables.lock().await;
    Ok(tables.documents.get(&id).is_some_and(|row| row.owner_id == uid))
  }

  #[instrument(skip(self), fields(uid = query.uid, tags = ?query.tags))]
  async fn find(&self, query: &TagQuery) -> Result<Vec<Document>, StagsError> {
    let tables = self.tables.lock().await;
    Ok(
      tables
        .documents
        .values()
        .map(|row| (row, tables.tags_of(row.id)))
        .filter(|(row, tags)| query.matches(row.owner_id, tags))
        .map(|(row, tags)| row.clone().with_tags(tags))
        .collect(),
    )
  }

  async fn tags(&self) -> Result<Vec<Tag>, StagsError> {
    let tables = self.tables.lock().await;
    let mut tags = tables
      .tag_names
      .iter()
      .map(|(id, name)| Tag { id: *id, name: name.clone() })
      .collect::<Vec<_>>();
    tags.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(tags)
  }
}
