use async_trait::async_trait;
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    OrderDocument, OrderId, OrderQuery, OrderStoreError, RestaurantId, Result, Version,
    store::{OrderStore, validate_document},
};

const SELECT_COLUMNS: &str = "SELECT id, restaurant_id, gateway_reference, status, payment_status, version, created_at, updated_at, body FROM orders";

/// PostgreSQL-backed order store.
#[derive(Clone)]
pub struct PostgresOrderStore {
    pool: PgPool,
}

impl PostgresOrderStore {
    /// Creates a new PostgreSQL order store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_document(row: PgRow) -> Result<OrderDocument> {
        Ok(OrderDocument {
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            restaurant_id: RestaurantId::from_uuid(row.try_get::<Uuid, _>("restaurant_id")?),
            gateway_reference: row.try_get("gateway_reference")?,
            status: row.try_get("status")?,
            payment_status: row.try_get("payment_status")?,
            version: Version::new(row.try_get("version")?),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
            body: row.try_get("body")?,
        })
    }

    /// Maps unique-constraint violations to store errors.
    fn map_write_error(e: sqlx::Error, document: &OrderDocument) -> OrderStoreError {
        if let sqlx::Error::Database(ref db_err) = e {
            match db_err.constraint() {
                Some("unique_gateway_reference") => {
                    return OrderStoreError::DuplicateReference {
                        reference: document.gateway_reference.clone().unwrap_or_default(),
                    };
                }
                Some("orders_pkey") => return OrderStoreError::AlreadyExists(document.order_id),
                _ => {}
            }
        }
        OrderStoreError::Database(e)
    }
}

#[async_trait]
impl OrderStore for PostgresOrderStore {
    async fn insert(&self, document: OrderDocument) -> Result<Version> {
        validate_document(&document)?;

        sqlx::query(
            r#"
            INSERT INTO orders (id, restaurant_id, gateway_reference, status, payment_status, version, created_at, updated_at, body)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(document.order_id.as_uuid())
        .bind(document.restaurant_id.as_uuid())
        .bind(&document.gateway_reference)
        .bind(&document.status)
        .bind(&document.payment_status)
        .bind(Version::first().as_i64())
        .bind(document.created_at)
        .bind(document.updated_at)
        .bind(&document.body)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &document))?;

        Ok(Version::first())
    }

    async fn get(&self, order_id: OrderId) -> Result<Option<OrderDocument>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn get_by_reference(&self, reference: &str) -> Result<Option<OrderDocument>> {
        let row = sqlx::query(&format!("{SELECT_COLUMNS} WHERE gateway_reference = $1"))
            .bind(reference)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_document).transpose()
    }

    async fn update(&self, document: OrderDocument, expected: Version) -> Result<Version> {
        validate_document(&document)?;
        let new_version = expected.next();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET gateway_reference = $3,
                status = $4,
                payment_status = $5,
                version = $6,
                updated_at = $7,
                body = $8
            WHERE id = $1 AND version = $2
            "#,
        )
        .bind(document.order_id.as_uuid())
        .bind(expected.as_i64())
        .bind(&document.gateway_reference)
        .bind(&document.status)
        .bind(&document.payment_status)
        .bind(new_version.as_i64())
        .bind(document.updated_at)
        .bind(&document.body)
        .execute(&self.pool)
        .await
        .map_err(|e| Self::map_write_error(e, &document))?;

        if result.rows_affected() == 1 {
            return Ok(new_version);
        }

        // Nothing matched: either the order is gone or another writer moved it on
        let actual: Option<i64> = sqlx::query_scalar("SELECT version FROM orders WHERE id = $1")
            .bind(document.order_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        tracing::debug!(order_id = %document.order_id, %expected, ?actual, "conditional update matched no row");

        match actual {
            Some(actual) => Err(OrderStoreError::VersionConflict {
                order_id: document.order_id,
                expected,
                actual: Version::new(actual),
            }),
            None => Err(OrderStoreError::NotFound(document.order_id)),
        }
    }

    async fn query(&self, query: OrderQuery) -> Result<Vec<OrderDocument>> {
        let mut sql = format!("{SELECT_COLUMNS} WHERE 1=1");
        let mut param_count = 0;

        // Build dynamic query
        if query.restaurant_id.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND restaurant_id = ${param_count}"));
        }
        if query.statuses.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND status = ANY(${param_count})"));
        }
        if query.payment_status.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND payment_status = ${param_count}"));
        }
        if query.created_from.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at >= ${param_count}"));
        }
        if query.created_to.is_some() {
            param_count += 1;
            sql.push_str(&format!(" AND created_at <= ${param_count}"));
        }

        sql.push_str(" ORDER BY created_at DESC, id ASC");

        if query.limit.is_some() {
            param_count += 1;
            sql.push_str(&format!(" LIMIT ${param_count}"));
        }
        if query.offset.is_some() {
            param_count += 1;
            sql.push_str(&format!(" OFFSET ${param_count}"));
        }

        let mut sqlx_query = sqlx::query(&sql);

        if let Some(id) = query.restaurant_id {
            sqlx_query = sqlx_query.bind(id.as_uuid());
        }
        if let Some(statuses) = query.statuses {
            sqlx_query = sqlx_query.bind(statuses);
        }
        if let Some(payment_status) = query.payment_status {
            sqlx_query = sqlx_query.bind(payment_status);
        }
        if let Some(from) = query.created_from {
            sqlx_query = sqlx_query.bind(from);
        }
        if let Some(to) = query.created_to {
            sqlx_query = sqlx_query.bind(to);
        }
        if let Some(limit) = query.limit {
            sqlx_query = sqlx_query.bind(limit as i64);
        }
        if let Some(offset) = query.offset {
            sqlx_query = sqlx_query.bind(offset as i64);
        }

        let rows = sqlx_query.fetch_all(&self.pool).await?;
        rows.into_iter().map(Self::row_to_document).collect()
    }
}
