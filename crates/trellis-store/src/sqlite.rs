use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::types::Json;
use sqlx::{FromRow, SqliteConnection};
use tracing::{info, instrument};
use uuid::Uuid;

use trellis_model::{
  FilterParams, IoInterface, RevisionContent, RevisionState, TestWiring, TransformationRevision,
  WorkflowContent,
};
use trellis_nesting::{Descendant, Nesting, build_nestings};

use crate::error::StoreError;
use crate::filter::select_revisions;
use crate::store::RevisionStore;

/// SQLite-based revision store.
///
/// Every mutation runs in a single transaction together with the closure
/// rebuild it triggers, so revisions and nesting rows are always observed in
/// a consistent pair. Uniqueness of `(revision_group_id, version_tag)` is
/// left to the schema's unique constraint: the second concurrent writer
/// fails instead of blocking.
pub struct SqliteStore {
  pool: SqlitePool,
}

impl SqliteStore {
  /// Create a new SQLite store with the given connection pool.
  pub fn new(pool: SqlitePool) -> Self {
    Self { pool }
  }

  /// Run database migrations.
  pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../../migrations").run(&self.pool).await
  }
}

#[async_trait]
impl RevisionStore for SqliteStore {
  #[instrument(skip_all, fields(id = %revision.id))]
  async fn create(&self, revision: &TransformationRevision) -> Result<(), StoreError> {
    if revision.state != RevisionState::Draft {
      return Err(StoreError::NotDraft {
        id: revision.id,
        state: revision.state,
      });
    }
    revision.validate_content()?;

    let mut tx = self.pool.begin().await?;

    let inserted = sqlx::query(
      r#"
            INSERT INTO transformation_revisions
              (id, revision_group_id, name, description, category, version_tag,
               state, type, documentation, component_code, workflow_content,
               io_interface, test_wiring, released_timestamp, disabled_timestamp)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(revision.id)
    .bind(revision.revision_group_id)
    .bind(&revision.name)
    .bind(&revision.description)
    .bind(&revision.category)
    .bind(&revision.version_tag)
    .bind(revision.state.as_str())
    .bind(revision.transformation_type.as_str())
    .bind(&revision.documentation)
    .bind(&revision.component_code)
    .bind(revision.workflow_content.as_ref().map(Json))
    .bind(Json(&revision.io_interface))
    .bind(Json(&revision.test_wiring))
    .bind(revision.released_timestamp)
    .bind(revision.disabled_timestamp)
    .execute(&mut *tx)
    .await;

    if let Err(error) = inserted {
      if is_unique_violation(&error) {
        return Err(StoreError::DuplicateVersionTag {
          revision_group_id: revision.revision_group_id,
          version_tag: revision.version_tag.clone(),
        });
      }
      return Err(error.into());
    }

    if let Some(content) = &revision.workflow_content {
      rebuild_nestings(&mut tx, revision.id, content).await?;
    }

    tx.commit().await?;
    info!(id = %revision.id, "created transformation revision");
    Ok(())
  }

  async fn get(&self, id: Uuid) -> Result<TransformationRevision, StoreError> {
    let mut conn = self.pool.acquire().await?;
    fetch_revision(&mut conn, id).await
  }

  #[instrument(skip(self))]
  async fn release(&self, id: Uuid) -> Result<TransformationRevision, StoreError> {
    let mut tx = self.pool.begin().await?;
    let mut revision = fetch_revision(&mut tx, id).await?;
    revision.release(Utc::now())?;

    sqlx::query(
      r#"
            UPDATE transformation_revisions
            SET state = ?, released_timestamp = ?
            WHERE id = ?
            "#,
    )
    .bind(revision.state.as_str())
    .bind(revision.released_timestamp)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(content) = &revision.workflow_content {
      rebuild_nestings(&mut tx, id, content).await?;
    }

    tx.commit().await?;
    info!(id = %id, "released transformation revision");
    Ok(revision)
  }

  #[instrument(skip(self))]
  async fn disable(&self, id: Uuid) -> Result<TransformationRevision, StoreError> {
    let mut tx = self.pool.begin().await?;
    let mut revision = fetch_revision(&mut tx, id).await?;
    revision.disable(Utc::now())?;

    sqlx::query(
      r#"
            UPDATE transformation_revisions
            SET state = ?, disabled_timestamp = ?
            WHERE id = ?
            "#,
    )
    .bind(revision.state.as_str())
    .bind(revision.disabled_timestamp)
    .bind(id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(id = %id, "disabled transformation revision");
    Ok(revision)
  }

  #[instrument(skip(self, content))]
  async fn update_content(
    &self,
    id: Uuid,
    content: RevisionContent,
  ) -> Result<TransformationRevision, StoreError> {
    let mut tx = self.pool.begin().await?;
    let mut revision = fetch_revision(&mut tx, id).await?;
    revision.update_content(content)?;

    sqlx::query(
      r#"
            UPDATE transformation_revisions
            SET component_code = ?, workflow_content = ?
            WHERE id = ?
            "#,
    )
    .bind(&revision.component_code)
    .bind(revision.workflow_content.as_ref().map(Json))
    .bind(id)
    .execute(&mut *tx)
    .await?;

    if let Some(content) = &revision.workflow_content {
      rebuild_nestings(&mut tx, id, content).await?;
    }

    tx.commit().await?;
    info!(id = %id, "updated draft content");
    Ok(revision)
  }

  #[instrument(skip(self))]
  async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
    let mut tx = self.pool.begin().await?;
    let revision = fetch_revision(&mut tx, id).await?;
    if revision.state != RevisionState::Draft {
      return Err(StoreError::NotDraft {
        id,
        state: revision.state,
      });
    }

    let containing: Option<(Uuid,)> = sqlx::query_as(
      r#"
            SELECT workflow_id FROM nestings
            WHERE nested_transformation_id = ?
            LIMIT 1
            "#,
    )
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;
    if let Some((workflow_id,)) = containing {
      return Err(StoreError::NestedInWorkflow { id, workflow_id });
    }

    sqlx::query("DELETE FROM nestings WHERE workflow_id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;
    sqlx::query("DELETE FROM transformation_revisions WHERE id = ?")
      .bind(id)
      .execute(&mut *tx)
      .await?;

    tx.commit().await?;
    info!(id = %id, "deleted draft revision");
    Ok(())
  }

  async fn list(&self, filter: &FilterParams) -> Result<Vec<TransformationRevision>, StoreError> {
    let rows: Vec<RevisionRow> = sqlx::query_as(
      r#"
            SELECT id, revision_group_id, name, description, category, version_tag,
                   state, type, documentation, component_code, workflow_content,
                   io_interface, test_wiring, released_timestamp, disabled_timestamp
            FROM transformation_revisions
            "#,
    )
    .fetch_all(&self.pool)
    .await?;
    let revisions = rows
      .into_iter()
      .map(RevisionRow::into_revision)
      .collect::<Result<Vec<_>, _>>()?;

    let nesting_rows: Vec<NestingRow> = sqlx::query_as(
      r#"
            SELECT workflow_id, via_transformation_id, via_operator_id,
                   depth, nested_transformation_id, nested_operator_id
            FROM nestings
            "#,
    )
    .fetch_all(&self.pool)
    .await?;
    let nestings: Vec<Nesting> = nesting_rows.into_iter().map(NestingRow::into_nesting).collect();

    Ok(select_revisions(revisions, &nestings, filter))
  }

  async fn descendants(&self, workflow_id: Uuid) -> Result<Vec<Descendant>, StoreError> {
    let mut conn = self.pool.acquire().await?;
    fetch_revision(&mut conn, workflow_id).await?;

    let rows: Vec<(i64, Uuid, Uuid)> = sqlx::query_as(
      r#"
            SELECT depth, nested_transformation_id, nested_operator_id
            FROM nestings
            WHERE workflow_id = ?
            ORDER BY depth, nested_operator_id
            "#,
    )
    .bind(workflow_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(
      rows
        .into_iter()
        .map(|(depth, transformation_id, operator_id)| Descendant {
          depth: depth as u32,
          transformation_id,
          operator_id,
        })
        .collect(),
    )
  }

  async fn ancestors(&self, transformation_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
    let mut conn = self.pool.acquire().await?;
    fetch_revision(&mut conn, transformation_id).await?;

    let rows: Vec<(Uuid,)> = sqlx::query_as(
      r#"
            SELECT DISTINCT workflow_id FROM nestings
            WHERE nested_transformation_id = ?
            ORDER BY workflow_id
            "#,
    )
    .bind(transformation_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(rows.into_iter().map(|(workflow_id,)| workflow_id).collect())
  }
}

/// Recompute and atomically replace one workflow's closure rows inside the
/// caller's transaction. On any error the transaction is dropped unchanged,
/// keeping the previously stored rows.
async fn rebuild_nestings(
  conn: &mut SqliteConnection,
  workflow_id: Uuid,
  content: &WorkflowContent,
) -> Result<(), StoreError> {
  let contents = workflow_contents(conn).await?;
  let rows = build_nestings(workflow_id, content, &contents)?;

  sqlx::query("DELETE FROM nestings WHERE workflow_id = ?")
    .bind(workflow_id)
    .execute(&mut *conn)
    .await?;

  for row in &rows {
    sqlx::query(
      r#"
            INSERT INTO nestings
              (workflow_id, via_transformation_id, via_operator_id,
               depth, nested_transformation_id, nested_operator_id)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
    )
    .bind(row.workflow_id)
    .bind(row.via_transformation_id)
    .bind(row.via_operator_id)
    .bind(row.depth as i64)
    .bind(row.nested_transformation_id)
    .bind(row.nested_operator_id)
    .execute(&mut *conn)
    .await?;
  }

  tracing::debug!(workflow_id = %workflow_id, rows = rows.len(), "rebuilt nesting closure");
  Ok(())
}

/// Content of every stored workflow revision, keyed by revision id.
async fn workflow_contents(
  conn: &mut SqliteConnection,
) -> Result<HashMap<Uuid, WorkflowContent>, StoreError> {
  let rows: Vec<(Uuid, Json<WorkflowContent>)> = sqlx::query_as(
    r#"
        SELECT id, workflow_content FROM transformation_revisions
        WHERE workflow_content IS NOT NULL
        "#,
  )
  .fetch_all(&mut *conn)
  .await?;

  Ok(rows.into_iter().map(|(id, content)| (id, content.0)).collect())
}

async fn fetch_revision(
  conn: &mut SqliteConnection,
  id: Uuid,
) -> Result<TransformationRevision, StoreError> {
  let row: Option<RevisionRow> = sqlx::query_as(
    r#"
        SELECT id, revision_group_id, name, description, category, version_tag,
               state, type, documentation, component_code, workflow_content,
               io_interface, test_wiring, released_timestamp, disabled_timestamp
        FROM transformation_revisions
        WHERE id = ?
        "#,
  )
  .bind(id)
  .fetch_optional(&mut *conn)
  .await?;

  row.ok_or(StoreError::NotFound(id))?.into_revision()
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
  match error {
    sqlx::Error::Database(database_error) => database_error.is_unique_violation(),
    _ => false,
  }
}

/// A transformation revision as stored in the database.
#[derive(FromRow)]
struct RevisionRow {
  id: Uuid,
  revision_group_id: Uuid,
  name: String,
  description: String,
  category: String,
  version_tag: String,
  state: String,
  #[sqlx(rename = "type")]
  transformation_type: String,
  documentation: String,
  component_code: Option<String>,
  workflow_content: Option<Json<WorkflowContent>>,
  io_interface: Json<IoInterface>,
  test_wiring: Json<TestWiring>,
  released_timestamp: Option<DateTime<Utc>>,
  disabled_timestamp: Option<DateTime<Utc>>,
}

impl RevisionRow {
  fn into_revision(self) -> Result<TransformationRevision, StoreError> {
    Ok(TransformationRevision {
      id: self.id,
      revision_group_id: self.revision_group_id,
      name: self.name,
      description: self.description,
      category: self.category,
      version_tag: self.version_tag,
      state: self.state.parse().map_err(StoreError::Model)?,
      transformation_type: self.transformation_type.parse().map_err(StoreError::Model)?,
      documentation: self.documentation,
      component_code: self.component_code,
      workflow_content: self.workflow_content.map(|content| content.0),
      io_interface: self.io_interface.0,
      test_wiring: self.test_wiring.0,
      released_timestamp: self.released_timestamp,
      disabled_timestamp: self.disabled_timestamp,
    })
  }
}

/// A closure row as stored in the database.
#[derive(FromRow)]
struct NestingRow {
  workflow_id: Uuid,
  via_transformation_id: Uuid,
  via_operator_id: Uuid,
  depth: i64,
  nested_transformation_id: Uuid,
  nested_operator_id: Uuid,
}

impl NestingRow {
  fn into_nesting(self) -> Nesting {
    Nesting {
      workflow_id: self.workflow_id,
      via_transformation_id: self.via_transformation_id,
      via_operator_id: self.via_operator_id,
      depth: self.depth as u32,
      nested_transformation_id: self.nested_transformation_id,
      nested_operator_id: self.nested_operator_id,
    }
  }
}
