//! PostgreSQL-backed [`UploadIntentLog`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::upsert::excluded;
use diesel_async::RunQueryDsl;
use tracing::debug;

use crate::domain::UserId;
use crate::domain::ports::{UploadIntent, UploadIntentLog, UploadIntentLogError};

use super::models::{NewUploadIntentRow, UploadIntentRow};
use super::pool::{DbPool, PoolError};
use super::schema::upload_intents;

/// Diesel implementation of the [`UploadIntentLog`] port.
#[derive(Clone)]
pub struct DieselUploadIntentLog {
    pool: DbPool,
}

impl DieselUploadIntentLog {
    /// Create a log over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> UploadIntentLogError {
    UploadIntentLogError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> UploadIntentLogError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    debug!(error = %error, "diesel operation failed");
    match error {
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            UploadIntentLogError::connection("database connection error")
        }
        DieselError::QueryBuilderError(_) => UploadIntentLogError::query("database query error"),
        _ => UploadIntentLogError::query("database error"),
    }
}

#[async_trait]
impl UploadIntentLog for DieselUploadIntentLog {
    async fn begin(&self, intent: &UploadIntent) -> Result<(), UploadIntentLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(upload_intents::table)
            .values(NewUploadIntentRow::from(intent))
            .on_conflict(upload_intents::user_id)
            .do_update()
            .set((
                upload_intents::blob_key.eq(excluded(upload_intents::blob_key)),
                upload_intents::created_at.eq(excluded(upload_intents::created_at)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn complete(&self, user_id: &UserId) -> Result<(), UploadIntentLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::delete(upload_intents::table.find(user_id.as_uuid()))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn pending_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<UploadIntent>, UploadIntentLogError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UploadIntentRow> = upload_intents::table
            .filter(upload_intents::created_at.lt(cutoff))
            .select(UploadIntentRow::as_select())
            .order_by(upload_intents::created_at.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;

        rows.into_iter()
            .map(|row| row.into_intent().map_err(UploadIntentLogError::query))
            .collect()
    }
}
