use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use farewatch_core::model::{SearchRequest, SearchRequestStatus};
use farewatch_core::ports::{BoxError, SearchRequestRepository};
use farewatch_core::CoreError;
use sqlx::PgPool;
use uuid::Uuid;

pub struct PgSearchRequestRepository {
    pool: PgPool,
}

impl PgSearchRequestRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SearchRequestRow {
    id: Uuid,
    origin: String,
    destination: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    status: String,
    cursor: Option<String>,
    has_more: bool,
    processed_count: i64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SearchRequestRow> for SearchRequest {
    type Error = CoreError;

    fn try_from(row: SearchRequestRow) -> Result<Self, Self::Error> {
        let status = SearchRequestStatus::parse(&row.status).ok_or_else(|| {
            CoreError::ValidationError(format!("search request status {}", row.status))
        })?;
        Ok(SearchRequest {
            id: row.id,
            origin: row.origin,
            destination: row.destination,
            start_date: row.start_date,
            end_date: row.end_date,
            status,
            cursor: row.cursor,
            has_more: row.has_more,
            processed_count: row.processed_count,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// `cursor` is reserved in Postgres, so the column is page_cursor and gets
// aliased back for FromRow.
const REQUEST_COLUMNS: &str = "id, origin, destination, start_date, end_date, status, \
                               page_cursor AS cursor, has_more, processed_count, error_message, \
                               created_at, updated_at";

#[async_trait]
impl SearchRequestRepository for PgSearchRequestRepository {
    async fn find(&self, id: Uuid) -> Result<Option<SearchRequest>, BoxError> {
        let row: Option<SearchRequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM search_requests WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| SearchRequest::try_from(r).map_err(BoxError::from))
            .transpose()
    }

    async fn find_open_for_route(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<SearchRequest>, BoxError> {
        let row: Option<SearchRequestRow> = sqlx::query_as(&format!(
            "SELECT {REQUEST_COLUMNS} FROM search_requests \
             WHERE origin = $1 AND destination = $2 AND start_date = $3 AND end_date = $4 \
               AND status = 'processing' \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(origin)
        .bind(destination)
        .bind(start_date)
        .bind(end_date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| SearchRequest::try_from(r).map_err(BoxError::from))
            .transpose()
    }

    async fn create(
        &self,
        origin: &str,
        destination: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<SearchRequest, BoxError> {
        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO search_requests \
             (id, origin, destination, start_date, end_date, status, has_more, processed_count, \
              created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, 'processing', TRUE, 0, $6, $6)",
        )
        .bind(id)
        .bind(origin)
        .bind(destination)
        .bind(start_date)
        .bind(end_date)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(SearchRequest {
            id,
            origin: origin.to_string(),
            destination: destination.to_string(),
            start_date,
            end_date,
            status: SearchRequestStatus::Processing,
            cursor: None,
            has_more: true,
            processed_count: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn save_progress(
        &self,
        id: Uuid,
        cursor: Option<&str>,
        has_more: bool,
        processed_count: i64,
    ) -> Result<(), BoxError> {
        // COALESCE keeps the first-page cursor immutable: once the column is
        // non-null, later writes cannot change it.
        sqlx::query(
            "UPDATE search_requests \
             SET page_cursor = COALESCE(page_cursor, $2), has_more = $3, processed_count = $4, \
                 updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(cursor)
        .bind(has_more)
        .bind(processed_count)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn finalize(
        &self,
        id: Uuid,
        status: SearchRequestStatus,
        error_message: Option<&str>,
    ) -> Result<(), BoxError> {
        // Guarded on the processing status so a terminal row stays terminal.
        sqlx::query(
            "UPDATE search_requests \
             SET status = $2, error_message = $3, updated_at = now() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error_message)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
