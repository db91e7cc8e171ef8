use std::collections::BTreeSet;

use super::tags::{is_public, normalize_tags};

/// Ids of documents carrying every tag in `$2` that are owned by `$1` or public.
/// `$3` is the number of distinct tags in `$2`. Public visibility is checked in a
/// sub-select so the `:public` association never counts towards `$3`.
pub const MATCHING_DOCUMENTS_SQL: &str = r#"
SELECT documents.id
  FROM documents
  JOIN document_tags ON document_tags.document_id = documents.id
  JOIN tags ON tags.id = document_tags.tag_id
 WHERE tags.name = ANY($2)
   AND (documents.owner_id = $1
        OR EXISTS (SELECT 1
                     FROM document_tags AS public_links
                     JOIN tags AS public_tags ON public_tags.id = public_links.tag_id
                    WHERE public_links.document_id = documents.id
                      AND public_tags.name = ':public'))
 GROUP BY documents.id
HAVING COUNT(DISTINCT tags.name) = $3
 ORDER BY documents.id
"#;

/// A normalized tag-intersection request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagQuery {
  pub uid: i32,
  pub tags: BTreeSet<String>,
}

impl TagQuery {
  pub fn new<I, S>(uid: i32, tags: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    TagQuery { uid, tags: normalize_tags(tags) }
  }

  /// No required tags: the query lists everything the user owns.
  pub fn is_unconstrained(&self) -> bool {
    self.tags.is_empty()
  }

  pub fn required(&self) -> i64 {
    self.tags.len() as i64
  }

  pub fn tag_list(&self) -> Vec<String> {
    self.tags.iter().cloned().collect()
  }

  pub fn matches<S: AsRef<str>>(&self, owner_id: i32, doc_tags: &[S]) -> bool {
    if self.is_unconstrained() {
      return owner_id == self.uid;
    }
    let visible = owner_id == self.uid || is_public(doc_tags);
    visible && self.tags.iter().all(|required| doc_tags.iter().any(|t| t.as_ref() == required))
  }
}
