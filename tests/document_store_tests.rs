mod common;

#[cfg(test)]
mod memory_store_tests {
  use stags::app::database::MemoryStore;

  use crate::common::{self, Fixture};

  macro_rules! memory_test {
    ($($property:ident),* $(,)?) => {
      $(
        #[tokio::test]
        async fn $property() {
          let store = MemoryStore::new();
          common::$property(&Fixture::new(&store, 1, 2, "")).await;
        }
      )*
    };
  }

  memory_test!(
    intersection_scenario,
    results_are_visible_supersets,
    read_reproduces_created_document,
    unknown_type_is_rejected,
    tagless_drafts_are_rejected,
    duplicate_tags_do_not_inflate_the_count,
    empty_query_lists_owned_documents,
    public_documents_are_shared,
    update_semantics,
    concurrent_first_use_shares_one_tag,
  );

  #[tokio::test]
  async fn delete_cascades_to_associations() {
    let store = MemoryStore::new();
    let id = common::delete_removes_document(&Fixture::new(&store, 1, 2, "")).await;
    assert_eq!(store.association_count(id).await, 0);
  }
}

/// Runs against the database named by `TEST_DATABASE_URL` and is skipped without it.
/// Every test uses its own users and tag suffix, so runs can share a database.
#[cfg(test)]
mod pg_store_tests {
  use dotenv::dotenv;
  use rand::Rng;
  use stags::app::database::PgStore;

  use crate::common::{self, Fixture};

  async fn pg_store() -> Option<PgStore> {
    dotenv().ok();
    let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
      eprintln!("TEST_DATABASE_URL not set, skipping");
      return None;
    };
    Some(PgStore::connect(&url, 4).await.unwrap())
  }

  fn users() -> (i32, i32, String) {
    let alice = rand::thread_rng().gen_range(1_000_000..1_000_000_000);
    (alice, alice + 1, format!("-{}", alice))
  }

  macro_rules! pg_test {
    ($($property:ident),* $(,)?) => {
      $(
        #[tokio::test]
        async fn $property() {
          let Some(store) = pg_store().await else { return };
          let (alice, bob, suffix) = users();
          common::$property(&Fixture::new(&store, alice, bob, &suffix)).await;
        }
      )*
    };
  }

  pg_test!(
    intersection_scenario,
    results_are_visible_supersets,
    read_reproduces_created_document,
    unknown_type_is_rejected,
    tagless_drafts_are_rejected,
    duplicate_tags_do_not_inflate_the_count,
    empty_query_lists_owned_documents,
    public_documents_are_shared,
    update_semantics,
    concurrent_first_use_shares_one_tag,
  );

  #[tokio::test]
  async fn delete_cascades_to_associations() {
    let Some(store) = pg_store().await else { return };
    let (alice, bob, suffix) = users();
    let id = common::delete_removes_document(&Fixture::new(&store, alice, bob, &suffix)).await;
    assert_eq!(store.association_count(id).await.unwrap(), 0);
  }

  #[tokio::test]
  async fn new_tags_reach_the_cache_after_commit() {
    let Some(store) = pg_store().await else { return };
    let (alice, bob, suffix) = users();
    let fx = Fixture::new(&store, alice, bob, &suffix);
    let doc = fx.create(alice, "cached", "x", &["fresh"]).await;

    let id = store.tag_cache().get(&fx.tag("fresh"));
    assert!(id.is_some());
    let tags = fx.store.tags().await.unwrap();
    assert_eq!(tags.iter().find(|t| t.name == fx.tag("fresh")).map(|t| t.id), id);
    assert_eq!(store.association_count(doc.id).await.unwrap(), 1);
  }

  #[tokio::test]
  async fn reconnecting_reloads_the_tag_cache() {
    let Some(store) = pg_store().await else { return };
    let (alice, bob, suffix) = users();
    Fixture::new(&store, alice, bob, &suffix).create(alice, "persisted", "x", &["kept"]).await;

    let Some(reopened) = pg_store().await else { return };
    let kept = format!("kept{}", suffix);
    assert_eq!(reopened.tag_cache().get(&kept), store.tag_cache().get(&kept));
    assert!(reopened.tag_cache().get(&kept).is_some());
  }
}
