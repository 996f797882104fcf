//! PostgreSQL implementation of ToolStore.
//!
//! Statistics are bumped with a single `UPDATE ... SET x = x + 1`, so the
//! row lock taken by Postgres makes concurrent updates safe. The audit insert
//! and the statistics update share one transaction.

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::domain::foundation::{ConversationId, ExecutionId, PrincipalId, Timestamp, ToolId};
use crate::domain::tools::{
    ExecutionBackend, ExecutionStatus, ToolCategory, ToolDefinition, ToolExecutionRecord,
    ToolFilter, ToolStats,
};
use crate::ports::{StoreError, ToolStore};

const TOOL_COLUMNS: &str = r#"
    id, name, display_name, category, description, usage_examples, backend,
    parameters_schema, response_schema, is_active, requires_auth, allowed_roles, version,
    execution_count, success_count, error_count, avg_execution_time_ms
"#;

/// PostgreSQL implementation of ToolStore.
#[derive(Clone)]
pub struct PostgresToolStore {
    pool: PgPool,
}

impl PostgresToolStore {
    /// Creates a new PostgresToolStore.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Migration failed: {}", e)))
    }

    /// Inserts or updates a definition by name. Statistics are left untouched.
    pub async fn upsert_tool(&self, tool: &ToolDefinition) -> Result<(), StoreError> {
        let backend = to_json(tool.backend())?;
        sqlx::query(
            r#"
            INSERT INTO tool_definitions (
                id, name, display_name, category, description, usage_examples,
                execution_type, backend, parameters_schema, response_schema,
                is_active, requires_auth, allowed_roles, version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                category = EXCLUDED.category,
                description = EXCLUDED.description,
                usage_examples = EXCLUDED.usage_examples,
                execution_type = EXCLUDED.execution_type,
                backend = EXCLUDED.backend,
                parameters_schema = EXCLUDED.parameters_schema,
                response_schema = EXCLUDED.response_schema,
                is_active = EXCLUDED.is_active,
                requires_auth = EXCLUDED.requires_auth,
                allowed_roles = EXCLUDED.allowed_roles,
                version = EXCLUDED.version,
                updated_at = NOW()
            "#,
        )
        .bind(tool.id().as_uuid())
        .bind(tool.name())
        .bind(tool.display_name())
        .bind(tool.category())
        .bind(tool.description())
        .bind(to_json(tool.usage_examples())?)
        .bind(tool.backend().kind())
        .bind(backend)
        .bind(tool.parameters_schema())
        .bind(tool.response_schema())
        .bind(tool.is_active())
        .bind(tool.requires_auth())
        .bind(to_json(tool.allowed_roles())?)
        .bind(tool.version())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to upsert tool: {}", e)))?;
        Ok(())
    }

    /// Inserts or updates a category by name.
    pub async fn upsert_category(&self, category: &ToolCategory) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO tool_categories (name, display_name, description, sort_order, is_active)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                description = EXCLUDED.description,
                sort_order = EXCLUDED.sort_order,
                is_active = EXCLUDED.is_active
            "#,
        )
        .bind(&category.name)
        .bind(&category.display_name)
        .bind(&category.description)
        .bind(category.order)
        .bind(category.is_active)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to upsert category: {}", e)))?;
        Ok(())
    }

    /// Most recent audit records for a tool, newest first.
    pub async fn recent_executions(
        &self,
        tool_id: ToolId,
        limit: i64,
    ) -> Result<Vec<ToolExecutionRecord>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, tool_id, tool_name, principal_id, parameters, result, error_message,
                   status, execution_time_ms, conversation_id, created_at
            FROM tool_executions
            WHERE tool_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(tool_id.as_uuid())
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to load executions: {}", e)))?;

        rows.iter().map(row_to_record).collect()
    }
}

#[async_trait]
impl ToolStore for PostgresToolStore {
    async fn load_active_tools(&self, filter: &ToolFilter) -> Result<Vec<ToolDefinition>, StoreError> {
        let (condition, argument) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM tool_definitions WHERE is_active{} ORDER BY created_at, name",
            TOOL_COLUMNS, condition
        );

        let mut query = sqlx::query(&sql);
        if let Some(argument) = argument {
            query = query.bind(argument);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load tools: {}", e)))?;

        rows.iter().map(row_to_tool).collect()
    }

    async fn list_categories(&self) -> Result<Vec<ToolCategory>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT name, display_name, description, sort_order, is_active
            FROM tool_categories
            WHERE is_active
            ORDER BY sort_order, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to load categories: {}", e)))?;

        rows.iter()
            .map(|row| {
                Ok(ToolCategory {
                    name: row.try_get("name").map_err(db_err)?,
                    display_name: row.try_get("display_name").map_err(db_err)?,
                    description: row.try_get("description").map_err(db_err)?,
                    order: row.try_get("sort_order").map_err(db_err)?,
                    is_active: row.try_get("is_active").map_err(db_err)?,
                })
            })
            .collect()
    }

    async fn save_execution_record(&self, record: &ToolExecutionRecord) -> Result<(), StoreError> {
        insert_record(&self.pool, record).await
    }

    async fn update_tool_stats(
        &self,
        tool_id: ToolId,
        success: bool,
        elapsed_ms: u64,
    ) -> Result<ToolStats, StoreError> {
        bump_stats(&self.pool, tool_id, success, elapsed_ms).await
    }

    async fn record_execution(&self, record: &ToolExecutionRecord) -> Result<ToolStats, StoreError> {
        let mut tx = self.pool.begin().await.map_err(|e| {
            StoreError::database(format!("Failed to start transaction: {}", e))
        })?;

        insert_record(&mut *tx, record).await?;
        let stats = bump_stats(
            &mut *tx,
            record.tool_id(),
            record.is_success(),
            record.execution_time_ms(),
        )
        .await?;

        tx.commit().await.map_err(|e| {
            StoreError::database(format!("Failed to commit transaction: {}", e))
        })?;
        Ok(stats)
    }
}

// Helpers generic over pool/transaction bind owned values only.
async fn insert_record<'e, E>(executor: E, record: &ToolExecutionRecord) -> Result<(), StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO tool_executions (
            id, tool_id, tool_name, principal_id, parameters, result, error_message,
            status, execution_time_ms, conversation_id, created_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(*record.id().as_uuid())
    .bind(*record.tool_id().as_uuid())
    .bind(record.tool_name().to_string())
    .bind(record.principal_id().as_str().to_string())
    .bind(record.parameters().clone())
    .bind(record.result().cloned())
    .bind(record.error_message().map(str::to_string))
    .bind(record.status().as_str())
    .bind(record.execution_time_ms() as i64)
    .bind(record.conversation_id().map(|id| *id.as_uuid()))
    .bind(*record.created_at().as_datetime())
    .execute(executor)
    .await
    .map_err(|e| StoreError::database(format!("Failed to insert execution record: {}", e)))?;
    Ok(())
}

async fn bump_stats<'e, E>(
    executor: E,
    tool_id: ToolId,
    success: bool,
    elapsed_ms: u64,
) -> Result<ToolStats, StoreError>
where
    E: sqlx::PgExecutor<'e>,
{
    // Right-hand sides see the pre-update row, so the mean folds in one sample.
    let row = sqlx::query(
        r#"
        UPDATE tool_definitions SET
            execution_count = execution_count + 1,
            success_count = success_count + CASE WHEN $2 THEN 1 ELSE 0 END,
            error_count = error_count + CASE WHEN $2 THEN 0 ELSE 1 END,
            avg_execution_time_ms =
                (avg_execution_time_ms * execution_count + $3) / (execution_count + 1),
            updated_at = NOW()
        WHERE id = $1
        RETURNING execution_count, success_count, error_count, avg_execution_time_ms
        "#,
    )
    .bind(*tool_id.as_uuid())
    .bind(success)
    .bind(elapsed_ms as f64)
    .fetch_optional(executor)
    .await
    .map_err(|e| StoreError::database(format!("Failed to update tool stats: {}", e)))?
    .ok_or(StoreError::ToolNotFound(tool_id))?;

    row_to_stats(&row)
}

/// Extra WHERE condition and its bind argument for a filter.
fn filter_clause(filter: &ToolFilter) -> (&'static str, Option<String>) {
    match filter {
        ToolFilter::All => ("", None),
        ToolFilter::Category(category) => (" AND category = $1", Some(category.clone())),
        ToolFilter::Name(name) => (" AND name = $1", Some(name.clone())),
        ToolFilter::Query(query) => (
            " AND (name ILIKE $1 ESCAPE '\\' OR display_name ILIKE $1 ESCAPE '\\' \
             OR description ILIKE $1 ESCAPE '\\')",
            Some(like_pattern(query)),
        ),
    }
}

/// `%query%` with LIKE metacharacters escaped.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::database(e.to_string())
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Serialization(e.to_string()))
}

fn row_to_stats(row: &PgRow) -> Result<ToolStats, StoreError> {
    let count = |column: &str| -> Result<u64, StoreError> {
        Ok(row.try_get::<i64, _>(column).map_err(db_err)?.max(0) as u64)
    };
    Ok(ToolStats {
        execution_count: count("execution_count")?,
        success_count: count("success_count")?,
        error_count: count("error_count")?,
        avg_execution_time_ms: row.try_get("avg_execution_time_ms").map_err(db_err)?,
    })
}

fn row_to_tool(row: &PgRow) -> Result<ToolDefinition, StoreError> {
    let backend: ExecutionBackend = from_json(row.try_get("backend").map_err(db_err)?)?;
    let usage_examples: Vec<String> = from_json(row.try_get("usage_examples").map_err(db_err)?)?;
    let allowed_roles: Vec<String> = from_json(row.try_get("allowed_roles").map_err(db_err)?)?;
    let response_schema: Option<serde_json::Value> = row.try_get("response_schema").map_err(db_err)?;

    let mut tool = ToolDefinition::new(
        row.try_get::<String, _>("name").map_err(db_err)?,
        row.try_get::<String, _>("category").map_err(db_err)?,
        row.try_get::<String, _>("description").map_err(db_err)?,
        backend,
    )
    .with_id(ToolId::from_uuid(row.try_get::<Uuid, _>("id").map_err(db_err)?))
    .with_display_name(row.try_get::<String, _>("display_name").map_err(db_err)?)
    .with_parameters_schema(row.try_get("parameters_schema").map_err(db_err)?)
    .with_active(row.try_get("is_active").map_err(db_err)?)
    .with_requires_auth(row.try_get("requires_auth").map_err(db_err)?)
    .with_allowed_roles(allowed_roles)
    .with_version(row.try_get::<String, _>("version").map_err(db_err)?)
    .with_stats(row_to_stats(row)?);

    for example in usage_examples {
        tool = tool.with_usage_example(example);
    }
    if let Some(schema) = response_schema {
        tool = tool.with_response_schema(schema);
    }
    Ok(tool)
}

fn row_to_record(row: &PgRow) -> Result<ToolExecutionRecord, StoreError> {
    let status: String = row.try_get("status").map_err(db_err)?;
    let status = ExecutionStatus::parse(&status)
        .ok_or_else(|| StoreError::Serialization(format!("unknown execution status '{}'", status)))?;
    let conversation_id: Option<Uuid> = row.try_get("conversation_id").map_err(db_err)?;

    Ok(ToolExecutionRecord::reconstitute(
        ExecutionId::from_uuid(row.try_get("id").map_err(db_err)?),
        ToolId::from_uuid(row.try_get("tool_id").map_err(db_err)?),
        row.try_get("tool_name").map_err(db_err)?,
        PrincipalId::new(row.try_get::<String, _>("principal_id").map_err(db_err)?),
        row.try_get("parameters").map_err(db_err)?,
        row.try_get("result").map_err(db_err)?,
        row.try_get("error_message").map_err(db_err)?,
        status,
        row.try_get::<i64, _>("execution_time_ms").map_err(db_err)?.max(0) as u64,
        conversation_id.map(ConversationId::from_uuid),
        Timestamp::from_datetime(row.try_get("created_at").map_err(db_err)?),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_wraps_and_escapes() {
        assert_eq!(like_pattern("mood"), "%mood%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn filter_clause_binds_expected_argument() {
        assert_eq!(filter_clause(&ToolFilter::All), ("", None));

        let (sql, arg) = filter_clause(&ToolFilter::Category("tasks".into()));
        assert_eq!(sql, " AND category = $1");
        assert_eq!(arg.as_deref(), Some("tasks"));

        let (sql, arg) = filter_clause(&ToolFilter::Query("Mood".into()));
        assert!(sql.contains("display_name ILIKE $1"));
        assert_eq!(arg.as_deref(), Some("%Mood%"));
    }
}
