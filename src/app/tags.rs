use std::collections::BTreeSet;

use super::consts::{PUBLIC_TAG, TAG_SEPARATOR};

/// Strips the reserved separator and surrounding whitespace from a tag name.
pub fn sanitize_tag(tag: &str) -> String {
  tag.replace(TAG_SEPARATOR, "").trim().to_string()
}

/// Sanitized, de-duplicated, non-empty tag names in lexical order.
pub fn normalize_tags<I, S>(tags: I) -> BTreeSet<String>
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  tags.into_iter().map(|t| sanitize_tag(t.as_ref())).filter(|t| !t.is_empty()).collect()
}

/// Splits free-form user input ("physics, bookmarks" or a separator-joined list) into tags.
pub fn split_tags(input: &str) -> Vec<String> {
  input
    .split(|c: char| c == TAG_SEPARATOR || c == ' ' || c == ',' || c == '\n' || c == '\t')
    .filter(|t| !t.is_empty())
    .map(String::from)
    .collect()
}

pub fn is_public<I, S>(tags: I) -> bool
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  tags.into_iter().any(|t| t.as_ref() == PUBLIC_TAG)
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn separator_is_stripped_from_names() {
    assert_eq!(sanitize_tag("bad\u{1F}tag"), "badtag");
    assert_eq!(sanitize_tag("  physics "), "physics");
  }

  #[test]
  fn normalization_dedupes_and_drops_empties() {
    let tags = normalize_tags(["a", "a", "b", "\u{1F}", " "]);
    assert_eq!(tags.into_iter().collect::<Vec<_>>(), vec!["a".to_string(), "b".to_string()]);
  }

  #[test]
  fn split_accepts_every_delimiter() {
    assert_eq!(
      split_tags("physics, bookmarks\tpapers\nmaths\u{1F}:public"),
      vec!["physics", "bookmarks", "papers", "maths", ":public"]
    );
    assert!(split_tags(" ,, ").is_empty());
  }

  #[test]
  fn public_tag_is_detected() {
    assert!(is_public(["maths", ":public"]));
    assert!(!is_public(["public"]));
  }
}
