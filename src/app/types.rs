use std::{collections::BTreeSet, fmt, str::FromStr};

use diesel::{deserialize::FromSqlRow, expression::AsExpression};
use serde::{Deserialize, Serialize};

use super::{
  database::schema::sql_types::Dtype,
  errors::ValidationError,
  tags::{is_public, normalize_tags},
};

/// Kind of content a document holds. New kinds are appended, never reordered:
/// the PostgreSQL enum mirrors this list.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsExpression, FromSqlRow,
)]
#[diesel(sql_type = Dtype)]
#[serde(rename_all = "lowercase")]
pub enum DocType {
  Text,
  Url,
  Pdf,
  Ps,
}

impl DocType {
  pub const ALL: [DocType; 4] = [DocType::Text, DocType::Url, DocType::Pdf, DocType::Ps];

  pub fn as_str(&self) -> &'static str {
    match self {
      DocType::Text => "text",
      DocType::Url => "url",
      DocType::Pdf => "pdf",
      DocType::Ps => "ps",
    }
  }

  /// Guesses the type of free-form content: anything that looks like a link or a path is a url.
  pub fn infer(content: &str) -> DocType {
    const URL_PREFIXES: [&str; 6] = ["http://", "https://", "ftp://", "ftps://", "C:", "/"];
    if URL_PREFIXES.iter().any(|prefix| content.starts_with(prefix)) {
      DocType::Url
    } else {
      DocType::Text
    }
  }
}

impl FromStr for DocType {
  type Err = ValidationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    DocType::ALL
      .into_iter()
      .find(|kind| kind.as_str() == s)
      .ok_or_else(|| ValidationError::UnknownType(s.to_string()))
  }
}

impl fmt::Display for DocType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.as_str())
  }
}

/// A stored document as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
  pub id: i32,
  pub name: String,
  #[serde(rename = "type")]
  pub doc_type: DocType,
  pub content: String,
  pub owner_id: i32,
  /// Sorted by name. Treat as a set.
  pub tags: Vec<String>,
}

impl Document {
  pub fn is_public(&self) -> bool {
    is_public(&self.tags)
  }

  pub fn visible_to(&self, uid: i32) -> bool {
    self.owner_id == uid || self.is_public()
  }
}

/// Caller-supplied fields of a document, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentDraft {
  pub name: String,
  #[serde(rename = "type", default)]
  pub doc_type: Option<String>,
  #[serde(default)]
  pub content: String,
  #[serde(default)]
  pub tags: Vec<String>,
}

impl DocumentDraft {
  pub fn new(name: &str, doc_type: Option<&str>, content: &str, tags: &[&str]) -> Self {
    DocumentDraft {
      name: name.to_string(),
      doc_type: doc_type.map(String::from),
      content: content.to_string(),
      tags: tags.iter().map(|t| t.to_string()).collect(),
    }
  }

  /// Resolves the type (inferring it from the content when absent) and normalizes tags.
  /// The tag set may come back empty; create and update decide what that means.
  pub fn validate(&self) -> Result<ValidDraft, ValidationError> {
    let content = self.content.trim().to_string();
    let doc_type = match self.doc_type.as_deref() {
      Some(kind) => kind.parse()?,
      None => DocType::infer(&content),
    };
    Ok(ValidDraft { name: self.name.clone(), doc_type, content, tags: normalize_tags(&self.tags) })
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidDraft {
  pub name: String,
  pub doc_type: DocType,
  pub content: String,
  pub tags: BTreeSet<String>,
}

impl ValidDraft {
  pub fn require_tags(self) -> Result<Self, ValidationError> {
    if self.tags.is_empty() {
      Err(ValidationError::NoTags)
    } else {
      Ok(self)
    }
  }
}
