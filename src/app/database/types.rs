use std::io::Write;

use diesel::{
  deserialize::{self, FromSql},
  pg::{Pg, PgValue},
  prelude::*,
  serialize::{self, IsNull, Output, ToSql},
};
use serde::Serialize;

use super::schema::{sql_types::Dtype, *};
use crate::app::types::{DocType, Document, ValidDraft};

impl ToSql<Dtype, Pg> for DocType {
  fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
    out.write_all(self.as_str().as_bytes())?;
    Ok(IsNull::No)
  }
}

impl FromSql<Dtype, Pg> for DocType {
  fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
    Ok(std::str::from_utf8(bytes.as_bytes())?.parse()?)
  }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = documents)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct DocumentRow {
  pub id: i32,
  pub name: String,
  pub doc_type: DocType,
  pub content: String,
  pub owner_id: i32,
}

impl DocumentRow {
  pub fn with_tags(self, mut tags: Vec<String>) -> Document {
    tags.sort();
    Document {
      id: self.id,
      name: self.name,
      doc_type: self.doc_type,
      content: self.content,
      owner_id: self.owner_id,
      tags,
    }
  }

  /// Only the scalar fields that differ from `draft`.
  pub fn changes_to(&self, draft: &ValidDraft) -> DocumentChangeset {
    DocumentChangeset {
      name: (self.name != draft.name).then(|| draft.name.clone()),
      doc_type: (self.doc_type != draft.doc_type).then_some(draft.doc_type),
      content: (self.content != draft.content).then(|| draft.content.clone()),
    }
  }
}

#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = documents)]
pub struct InsertableDocument {
  pub name: String,
  pub doc_type: DocType,
  pub content: String,
  pub owner_id: i32,
}

impl InsertableDocument {
  pub fn new(draft: &ValidDraft, owner_id: i32) -> Self {
    InsertableDocument {
      name: draft.name.clone(),
      doc_type: draft.doc_type,
      content: draft.content.clone(),
      owner_id,
    }
  }
}

/// `None` fields are left out of the UPDATE statement.
#[derive(AsChangeset, Debug, Clone, Default, PartialEq)]
#[diesel(table_name = documents)]
pub struct DocumentChangeset {
  pub name: Option<String>,
  pub doc_type: Option<DocType>,
  pub content: Option<String>,
}

impl DocumentChangeset {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.doc_type.is_none() && self.content.is_none()
  }

  pub fn apply(self, row: &mut DocumentRow) {
    if let Some(name) = self.name {
      row.name = name;
    }
    if let Some(doc_type) = self.doc_type {
      row.doc_type = doc_type;
    }
    if let Some(content) = self.content {
      row.content = content;
    }
  }
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq, Serialize)]
#[diesel(table_name = tags)]
pub struct Tag {
  pub id: i32,
  pub name: String,
}

#[derive(Queryable, Selectable, Insertable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(DocumentRow, foreign_key = document_id))]
#[diesel(belongs_to(Tag))]
#[diesel(table_name = document_tags)]
#[diesel(primary_key(tag_id, document_id))]
pub struct DocumentTag {
  pub tag_id: i32,
  pub document_id: i32,
}

#[derive(QueryableByName, Debug)]
pub struct MatchedId {
  #[diesel(sql_type = diesel::sql_types::Int4)]
  pub id: i32,
}
