//! Store properties shared by every backend.
#![allow(dead_code)]

use std::collections::BTreeSet;

use pretty_assertions::assert_eq;
use stags::app::{
  database::DocumentStore,
  errors::StagsError,
  types::{DocType, Document, DocumentDraft},
};

/// A store plus two users and a tag suffix, so runs against a shared database
/// never see each other's documents.
pub struct Fixture<'a> {
  pub store: &'a dyn DocumentStore,
  pub alice: i32,
  pub bob: i32,
  pub suffix: String,
}

impl<'a> Fixture<'a> {
  pub fn new(store: &'a dyn DocumentStore, alice: i32, bob: i32, suffix: &str) -> Self {
    Fixture { store, alice, bob, suffix: suffix.to_string() }
  }

  pub fn tag(&self, name: &str) -> String {
    if name.starts_with(':') {
      name.to_string()
    } else {
      format!("{}{}", name, self.suffix)
    }
  }

  pub fn tags(&self, names: &[&str]) -> Vec<String> {
    names.iter().map(|n| self.tag(n)).collect()
  }

  pub fn draft(&self, name: &str, content: &str, tags: &[&str]) -> DocumentDraft {
    DocumentDraft {
      name: name.to_string(),
      doc_type: None,
      content: content.to_string(),
      tags: self.tags(tags),
    }
  }

  pub async fn create(&self, owner: i32, name: &str, content: &str, tags: &[&str]) -> Document {
    self.store.create(&self.draft(name, content, tags), owner).await.unwrap()
  }

  pub async fn query(&self, uid: i32, tags: &[&str]) -> Vec<Document> {
    self.store.query(uid, &self.tags(tags)).await.unwrap()
  }

  pub async fn seed_bookmarks(&self) -> [Document; 3] {
    [
      self.create(self.alice, "ArXiv", "http://arxiv.org/", &["papers", "maths", "physics"]).await,
      self
        .create(
          self.alice,
          "/r/physics",
          "http://www.reddit.com/r/physics/",
          &["bookmarks", "physics"],
        )
        .await,
      self
        .create(
          self.alice,
          "Slashdot",
          "http://beta.slashdot.org/",
          &["bookmarks", "programming", "physics", "science"],
        )
        .await,
    ]
  }
}

pub fn names(documents: &[Document]) -> BTreeSet<String> {
  documents.iter().map(|d| d.name.clone()).collect()
}

pub fn set(items: &[&str]) -> BTreeSet<String> {
  items.iter().map(|s| s.to_string()).collect()
}

pub async fn intersection_scenario(fx: &Fixture<'_>) {
  fx.seed_bookmarks().await;
  let physics = fx.query(fx.alice, &["physics"]).await;
  assert_eq!(names(&physics), set(&["ArXiv", "/r/physics", "Slashdot"]));
  let bookmarked = fx.query(fx.alice, &["physics", "bookmarks"]).await;
  assert_eq!(names(&bookmarked), set(&["/r/physics", "Slashdot"]));
  assert_eq!(names(&fx.query(fx.alice, &["maths", "programming"]).await), set(&[]));
}

pub async fn results_are_visible_supersets(fx: &Fixture<'_>) {
  fx.seed_bookmarks().await;
  fx.create(fx.bob, "bob's notes", "remember the milk", &["physics"]).await;
  fx.create(fx.bob, "bob's paper", "/papers/qft.ps", &["physics", "papers", ":public"]).await;

  let required = fx.tags(&["physics", "papers"]);
  let found = fx.store.query(fx.alice, &required).await.unwrap();
  assert_eq!(names(&found), set(&["ArXiv", "bob's paper"]));
  for document in &found {
    assert!(document.owner_id == fx.alice || document.is_public());
    assert!(required.iter().all(|t| document.tags.contains(t)));
  }
}

pub async fn read_reproduces_created_document(fx: &Fixture<'_>) {
  let draft = DocumentDraft {
    name: "QFT lecture".into(),
    doc_type: Some("pdf".into()),
    content: "/papers/qft.pdf".into(),
    tags: fx.tags(&["physics", "lectures", "physics"]),
  };
  let created = fx.store.create(&draft, fx.alice).await.unwrap();
  let read = fx.store.read(created.id).await.unwrap();

  assert_eq!(read, created);
  assert_eq!(read.name, "QFT lecture");
  assert_eq!(read.doc_type, DocType::Pdf);
  assert_eq!(read.content, "/papers/qft.pdf");
  assert_eq!(read.owner_id, fx.alice);
  let expected: BTreeSet<String> = fx.tags(&["lectures", "physics"]).into_iter().collect();
  assert_eq!(read.tags.iter().cloned().collect::<BTreeSet<_>>(), expected);
}

pub async fn unknown_type_is_rejected(fx: &Fixture<'_>) {
  let before = fx.query(fx.alice, &[]).await.len();
  let draft = DocumentDraft {
    name: "nice website".into(),
    doc_type: Some("badtype".into()),
    content: "http://awesom.eu".into(),
    tags: fx.tags(&["irc"]),
  };
  let err = fx.store.create(&draft, fx.alice).await.unwrap_err();
  assert!(matches!(err, StagsError::Validation(_)), "unexpected error {:?}", err);
  assert_eq!(fx.query(fx.alice, &[]).await.len(), before);
  assert!(fx.query(fx.alice, &["irc"]).await.is_empty());
}

pub async fn tagless_drafts_are_rejected(fx: &Fixture<'_>) {
  let draft = DocumentDraft {
    name: "empty".into(),
    content: "x".into(),
    tags: vec!["\u{1F}".into()],
    ..Default::default()
  };
  assert!(matches!(fx.store.create(&draft, fx.alice).await, Err(StagsError::Validation(_))));
}

pub async fn duplicate_tags_do_not_inflate_the_count(fx: &Fixture<'_>) {
  fx.seed_bookmarks().await;
  let doubled = fx.query(fx.alice, &["physics", "physics", "bookmarks"]).await;
  let single = fx.query(fx.alice, &["physics", "bookmarks"]).await;
  assert_eq!(doubled, single);
  assert_eq!(single.len(), 2);
}

pub async fn delete_removes_document(fx: &Fixture<'_>) -> i32 {
  let [arxiv, ..] = fx.seed_bookmarks().await;
  fx.store.delete(arxiv.id).await.unwrap();

  assert!(matches!(fx.store.read(arxiv.id).await, Err(StagsError::NotFound(id)) if id == arxiv.id));
  assert!(matches!(fx.store.delete(arxiv.id).await, Err(StagsError::NotFound(_))));
  assert_eq!(names(&fx.query(fx.alice, &["physics"]).await), set(&["/r/physics", "Slashdot"]));
  arxiv.id
}

pub async fn empty_query_lists_owned_documents(fx: &Fixture<'_>) {
  fx.seed_bookmarks().await;
  fx.create(fx.bob, "bob's public notes", "hello", &["notes", ":public"]).await;

  let mine = fx.store.query(fx.alice, &[]).await.unwrap();
  assert_eq!(names(&mine), set(&["ArXiv", "/r/physics", "Slashdot"]));
  let blank = fx.store.query(fx.alice, &["".into(), "\u{1F}".into()]).await.unwrap();
  assert_eq!(blank, mine);
  assert!(mine.windows(2).all(|pair| pair[0].id < pair[1].id));
}

pub async fn public_documents_are_shared(fx: &Fixture<'_>) {
  let private = fx.create(fx.bob, "diary", "dear diary", &["secret"]).await;
  let public =
    fx.create(fx.bob, "reading list", "http://example.org/", &["secret", ":public"]).await;

  assert_eq!(names(&fx.query(fx.alice, &["secret"]).await), set(&["reading list"]));
  assert_eq!(names(&fx.query(fx.bob, &["secret"]).await), set(&["diary", "reading list"]));
  assert!(fx.store.owned_by(public.id, fx.bob).await.unwrap());
  assert!(!fx.store.owned_by(public.id, fx.alice).await.unwrap());
  assert!(!fx.store.owned_by(private.id, fx.alice).await.unwrap());
}

pub async fn update_semantics(fx: &Fixture<'_>) {
  let [_, reddit, _] = fx.seed_bookmarks().await;

  // same tags: set unchanged
  let same = fx.draft("/r/physics", "http://www.reddit.com/r/physics/", &["physics", "bookmarks"]);
  let updated = fx.store.update(reddit.id, &same).await.unwrap();
  assert_eq!(updated.tags, reddit.tags);

  // no tags: only scalar fields change
  let renamed = fx.draft("r/physics", "http://old.reddit.com/r/physics/", &[]);
  let updated = fx.store.update(reddit.id, &renamed).await.unwrap();
  assert_eq!(updated.name, "r/physics");
  assert_eq!(updated.content, "http://old.reddit.com/r/physics/");
  assert_eq!(updated.tags, reddit.tags);

  // new tags replace the set
  let retagged = fx.draft("r/physics", "http://old.reddit.com/r/physics/", &["forums"]);
  let updated = fx.store.update(reddit.id, &retagged).await.unwrap();
  assert_eq!(updated.tags, fx.tags(&["forums"]));
  assert_eq!(fx.store.read(reddit.id).await.unwrap(), updated);
  assert_eq!(names(&fx.query(fx.alice, &["bookmarks"]).await), set(&["Slashdot"]));

  let bad = DocumentDraft { doc_type: Some("badtype".into()), ..retagged };
  assert!(matches!(fx.store.update(reddit.id, &bad).await, Err(StagsError::Validation(_))));
  assert!(matches!(fx.store.update(-1, &same).await, Err(StagsError::NotFound(-1))));
}

pub async fn concurrent_first_use_shares_one_tag(fx: &Fixture<'_>) {
  let left_draft = fx.draft("left", "l", &["race"]);
  let right_draft = fx.draft("right", "r", &["race"]);
  let (left, right) = tokio::join!(
    fx.store.create(&left_draft, fx.alice),
    fx.store.create(&right_draft, fx.alice),
  );
  left.unwrap();
  right.unwrap();

  assert_eq!(names(&fx.query(fx.alice, &["race"]).await), set(&["left", "right"]));
  let race = fx.tag("race");
  let tags = fx.store.tags().await.unwrap();
  assert_eq!(tags.iter().filter(|t| t.name == race).count(), 1);
}
