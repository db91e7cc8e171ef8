use std::{
  collections::HashMap,
  sync::{PoisonError, RwLock},
};

use async_trait::async_trait;
use tracing::debug;

use super::{errors::StagsError, tags::sanitize_tag};

/// Storage side of tag resolution.
#[async_trait]
pub trait TagSource: Send {
  /// Creates the tag. `None` means the name already exists, typically because a
  /// concurrent writer created it first.
  async fn insert_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError>;

  async fn find_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError>;
}

/// Shared tag name to id map. Holds no lock across storage calls; the unique
/// constraint on tag names settles concurrent first use of a name.
#[derive(Debug, Default)]
pub struct TagCache {
  ids: RwLock<HashMap<String, i32>>,
}

impl TagCache {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn load<I>(entries: I) -> Self
  where
    I: IntoIterator<Item = (String, i32)>,
  {
    TagCache { ids: RwLock::new(entries.into_iter().collect()) }
  }

  pub fn get(&self, name: &str) -> Option<i32> {
    self.ids.read().unwrap_or_else(PoisonError::into_inner).get(name).copied()
  }

  pub fn len(&self) -> usize {
    self.ids.read().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn extend<I>(&self, entries: I)
  where
    I: IntoIterator<Item = (String, i32)>,
  {
    self.ids.write().unwrap_or_else(PoisonError::into_inner).extend(entries);
  }

  /// Starts a resolution scope for one write. Ids it learns reach the cache on `commit`.
  pub fn pending(&self) -> PendingTags<'_> {
    PendingTags { cache: self, learned: Vec::new() }
  }
}

/// Tag ids resolved inside a transaction that has not committed yet. Dropping it
/// without `commit` forgets them, so a rolled back insert never lands in the cache.
#[derive(Debug)]
pub struct PendingTags<'a> {
  cache: &'a TagCache,
  learned: Vec<(String, i32)>,
}

impl PendingTags<'_> {
  pub async fn resolve<S>(&mut self, source: &mut S, name: &str) -> Result<i32, StagsError>
  where
    S: TagSource + ?Sized,
  {
    let name = sanitize_tag(name);
    if let Some(id) = self.cache.get(&name).or_else(|| self.learned_id(&name)) {
      return Ok(id);
    }

    let id = match source.insert_tag(&name).await? {
      Some(id) => id,
      None => {
        debug!(tag = %name, "tag already exists, re-reading its id");
        source.find_tag(&name).await?.ok_or_else(|| {
          StagsError::Other(format!("tag '{}' vanished after insert conflict", name))
        })?
      },
    };
    self.learned.push((name, id));
    Ok(id)
  }

  pub fn commit(self) {
    if !self.learned.is_empty() {
      debug!(count = self.learned.len(), "publishing new tags to cache");
      self.cache.extend(self.learned);
    }
  }

  fn learned_id(&self, name: &str) -> Option<i32> {
    self.learned.iter().find(|(n, _)| n == name).map(|(_, id)| *id)
  }
}
