use std::collections::BTreeSet;

use async_trait::async_trait;
use diesel::{
  prelude::*,
  sql_types::{Array, Int4, Int8, Text},
};
use diesel_async::{
  async_connection_wrapper::AsyncConnectionWrapper,
  pooled_connection::{deadpool::Pool, AsyncDieselConnectionManager},
  scoped_futures::ScopedFutureExt,
  AsyncConnection, AsyncPgConnection, RunQueryDsl,
};
use diesel_migrations::{embed_migrations, EmbeddedMigrations};
use tracing::{info, instrument};

use super::{
  document_store::{log_outcome, DocumentStore},
  schema::{document_tags, documents, tags},
  types::*,
};
use crate::app::{
  errors::StagsError,
  query::{TagQuery, MATCHING_DOCUMENTS_SQL},
  tag_cache::{PendingTags, TagCache, TagSource},
  types::{Document, DocumentDraft},
};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// PostgreSQL-backed document store.
pub struct PgStore {
  pool: Pool<AsyncPgConnection>,
  cache: TagCache,
}

impl PgStore {
  /// Applies pending migrations, opens a pool of `pool_size` connections and loads the tag cache.
  pub async fn connect(database_url: &str, pool_size: usize) -> Result<Self, StagsError> {
    run_migrations(database_url).await?;
    let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
    let pool = Pool::builder(manager)
      .max_size(pool_size)
      .build()
      .map_err(|e| StagsError::PoolError(e.to_string()))?;
    PgStore::with_pool(pool).await
  }

  pub async fn with_pool(pool: Pool<AsyncPgConnection>) -> Result<Self, StagsError> {
    let mut pooled = pool.get().await?;
    let conn: &mut AsyncPgConnection = &mut pooled;
    let entries = tags::table.select((tags::name, tags::id)).load::<(String, i32)>(conn).await?;
    info!(count = entries.len(), "loaded tag cache");
    drop(pooled);
    Ok(PgStore { pool, cache: TagCache::load(entries) })
  }

  pub fn tag_cache(&self) -> &TagCache {
    &self.cache
  }

  /// Number of tag associations that reference `document_id`.
  pub async fn association_count(&self, document_id: i32) -> Result<i64, StagsError> {
    let mut pooled = self.pool.get().await?;
    let conn: &mut AsyncPgConnection = &mut pooled;
    Ok(
      document_tags::table
        .filter(document_tags::document_id.eq(document_id))
        .count()
        .get_result::<i64>(conn)
        .await?,
    )
  }
}

pub async fn run_migrations(database_url: &str) -> Result<(), StagsError> {
  let sync_db_url = database_url.to_string();
  tokio::task::spawn_blocking(move || {
    use diesel_migrations::MigrationHarness;
    let mut conn = AsyncConnectionWrapper::<AsyncPgConnection>::establish(&sync_db_url)
      .map_err(|e| StagsError::MigrationError(e.to_string()))?;
    let applied = conn
      .run_pending_migrations(MIGRATIONS)
      .map_err(|e| StagsError::MigrationError(e.to_string()))?;
    for version in applied {
      info!(%version, "applied migration");
    }
    Ok::<_, StagsError>(())
  })
  .await
  .map_err(|e| StagsError::MigrationError(e.to_string()))?
}

#[async_trait]
impl TagSource for AsyncPgConnection {
  async fn insert_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError> {
    Ok(
      diesel::insert_into(tags::table)
        .values(tags::name.eq(name))
        .on_conflict(tags::name)
        .do_nothing()
        .returning(tags::id)
        .get_result::<i32>(self)
        .await
        .optional()?,
    )
  }

  async fn find_tag(&mut self, name: &str) -> Result<Option<i32>, StagsError> {
    Ok(
      tags::table
        .filter(tags::name.eq(name))
        .select(tags::id)
        .first::<i32>(self)
        .await
        .optional()?,
    )
  }
}

async fn link_tags(
  conn: &mut AsyncPgConnection,
  pending: &mut PendingTags<'_>,
  document_id: i32,
  names: &BTreeSet<String>,
) -> Result<(), StagsError> {
  let mut links = Vec::with_capacity(names.len());
  for name in names {
    let tag_id = pending.resolve(conn, name).await?;
    links.push(DocumentTag { tag_id, document_id });
  }
  diesel::insert_into(document_tags::table)
    .values(&links)
    .on_conflict_do_nothing()
    .execute(conn)
    .await?;
  Ok(())
}

async fn tag_names(
  conn: &mut AsyncPgConnection,
  document_id: i32,
) -> Result<Vec<String>, StagsError> {
  Ok(
    document_tags::table
      .inner_join(tags::table)
      .filter(document_tags::document_id.eq(document_id))
      .select(tags::name)
      .order(tags::name.asc())
      .load::<String>(conn)
      .await?,
  )
}

/// Rows and tags for `ids` in two statements, whatever the number of ids.
async fn load_documents(
  conn: &mut AsyncPgConnection,
  ids: &[i32],
) -> Result<Vec<Document>, StagsError> {
  if ids.is_empty() {
    return Ok(Vec::new());
  }
  let rows = documents::table
    .filter(documents::id.eq_any(ids))
    .order(documents::id.asc())
    .select(DocumentRow::as_select())
    .load::<DocumentRow>(conn)
    .await?;
  let links = DocumentTag::belonging_to(&rows)
    .inner_join(tags::table)
    .select((DocumentTag::as_select(), tags::name))
    .order(tags::name.asc())
    .load::<(DocumentTag, String)>(conn)
    .await?;

  Ok(
    links
      .grouped_by(&rows)
      .into_iter()
      .zip(rows)
      .map(|(links, row)| row.with_tags(links.into_iter().map(|(_, name)| name).collect()))
      .collect(),
  )
}

#[async_trait]
impl DocumentStore for PgStore {
  #[instrument(skip(self, draft), fields(name = %draft.name))]
  async fn create(&self, draft: &DocumentDraft, owner_id: i32) -> Result<Document, StagsError> {
    log_outcome("create", async {
      let draft = draft.validate()?.require_tags()?;
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;

      let mut pending = self.cache.pending();
      let (draft_ref, pending_ref) = (&draft, &mut pending);
      let row = conn
        .transaction::<_, StagsError, _>(move |conn| {
          async move {
            let row = diesel::insert_into(documents::table)
              .values(InsertableDocument::new(draft_ref, owner_id))
              .returning(DocumentRow::as_returning())
              .get_result::<DocumentRow>(conn)
              .await?;
            link_tags(conn, pending_ref, row.id, &draft_ref.tags).await?;
            Ok(row)
          }
          .scope_boxed()
        })
        .await?;
      pending.commit();

      info!(id = row.id, owner_id, "created document");
      Ok::<_, StagsError>(row.with_tags(draft.tags.into_iter().collect()))
    }
    .await)
  }

  #[instrument(skip(self))]
  async fn read(&self, id: i32) -> Result<Document, StagsError> {
    log_outcome("read", async {
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;
      let row = documents::table
        .find(id)
        .select(DocumentRow::as_select())
        .first::<DocumentRow>(conn)
        .await
        .optional()?
        .ok_or(StagsError::NotFound(id))?;
      let tags = tag_names(conn, id).await?;
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
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;

      let mut pending = self.cache.pending();
      let (draft_ref, pending_ref) = (&draft, &mut pending);
      let document = conn
        .transaction::<_, StagsError, _>(move |conn| {
          async move {
            let mut row = documents::table
              .find(id)
              .select(DocumentRow::as_select())
              .for_update()
              .first::<DocumentRow>(conn)
              .await
              .optional()?
              .ok_or(StagsError::NotFound(id))?;

            let changes = row.changes_to(draft_ref);
            if !changes.is_empty() {
              diesel::update(documents::table.find(id)).set(&changes).execute(conn).await?;
              changes.apply(&mut row);
            }
            if !draft_ref.tags.is_empty() {
              diesel::delete(document_tags::table.filter(document_tags::document_id.eq(id)))
                .execute(conn)
                .await?;
              link_tags(conn, pending_ref, id, &draft_ref.tags).await?;
            }
            let tags = tag_names(conn, id).await?;
            Ok(row.with_tags(tags))
          }
          .scope_boxed()
        })
        .await?;
      pending.commit();

      info!(id, "updated document");
      Ok::<_, StagsError>(document)
    }
    .await)
  }

  #[instrument(skip(self))]
  async fn delete(&self, id: i32) -> Result<(), StagsError> {
    log_outcome("delete", async {
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;
      let deleted = diesel::delete(documents::table.find(id)).execute(conn).await?;
      if deleted == 0 {
        return Err(StagsError::NotFound(id));
      }
      info!(id, "deleted document");
      Ok::<_, StagsError>(())
    }
    .await)
  }

  async fn owned_by(&self, id: i32, uid: i32) -> Result<bool, StagsError> {
    log_outcome("owned_by", async {
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;
      Ok::<_, StagsError>(
        diesel::select(diesel::dsl::exists(
          documents::table.filter(documents::id.eq(id)).filter(documents::owner_id.eq(uid)),
        ))
        .get_result::<bool>(conn)
        .await?,
      )
    }
    .await)
  }

  #[instrument(skip(self), fields(uid = query.uid, tags = ?query.tags))]
  async fn find(&self, query: &TagQuery) -> Result<Vec<Document>, StagsError> {
    log_outcome("query", async {
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;

      let ids: Vec<i32> = if query.is_unconstrained() {
        documents::table
          .filter(documents::owner_id.eq(query.uid))
          .select(documents::id)
          .order(documents::id.asc())
          .load::<i32>(conn)
          .await?
      } else {
        diesel::sql_query(MATCHING_DOCUMENTS_SQL)
          .bind::<Int4, _>(query.uid)
          .bind::<Array<Text>, _>(query.tag_list())
          .bind::<Int8, _>(query.required())
          .load::<MatchedId>(conn)
          .await?
          .into_iter()
          .map(|m| m.id)
          .collect()
      };
      load_documents(conn, &ids).await
    }
    .await)
  }

  async fn tags(&self) -> Result<Vec<Tag>, StagsError> {
    log_outcome("tags", async {
      let mut pooled = self.pool.get().await?;
      let conn: &mut AsyncPgConnection = &mut pooled;
      Ok::<_, StagsError>(
        tags::table.select(Tag::as_select()).order(tags::name.asc()).load::<Tag>(conn).await?,
      )
    }
    .await)
  }
}
