//! PostgreSQL-backed [`RecordStore`] using Diesel.
//!
//! Plain inserts upsert on the id. Conditional inserts serialise on a
//! transaction-scoped advisory lock keyed by the email, so two creates racing
//! for one address cannot both commit.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel::upsert::excluded;
use diesel_async::AsyncConnection as _;
use diesel_async::RunQueryDsl;
use diesel_async::scoped_futures::ScopedFutureExt as _;
use tracing::debug;

use crate::domain::ports::{RecordChanges, RecordStore, RecordStoreError};
use crate::domain::{RecordField, UserDocument, UserId, UserRecord};

use super::models::{NewUserRecordRow, UserRecordRow, UserRecordUpdate};
use super::pool::{DbPool, PoolError};
use super::schema::user_records;

const EMAIL_LOCK_SQL: &str = "SELECT pg_advisory_xact_lock(hashtext($1))";

/// Diesel implementation of the [`RecordStore`] port.
#[derive(Clone)]
pub struct DieselRecordStore {
    pool: DbPool,
}

impl DieselRecordStore {
    /// Create a store over the given pool.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn map_pool_error(error: PoolError) -> RecordStoreError {
    RecordStoreError::connection(error.into_message())
}

fn map_diesel_error(error: diesel::result::Error) -> RecordStoreError {
    use diesel::result::{DatabaseErrorKind, Error as DieselError};

    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(
            error_type = %std::any::type_name_of_val(&error),
            "diesel operation failed"
        ),
    }

    match error {
        DieselError::NotFound => RecordStoreError::query("record not found"),
        DieselError::QueryBuilderError(_) => RecordStoreError::query("database query error"),
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            RecordStoreError::query("record already exists")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            RecordStoreError::connection("database connection error")
        }
        _ => RecordStoreError::query("database error"),
    }
}

fn affected_or_not_found(rows: usize, id: &UserId) -> Result<(), RecordStoreError> {
    if rows == 0 {
        Err(RecordStoreError::not_found(id.as_ref()))
    } else {
        Ok(())
    }
}

#[async_trait]
impl RecordStore for DieselRecordStore {
    async fn get(&self, id: &UserId) -> Result<Option<UserDocument>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let row: Option<UserRecordRow> = user_records::table
            .find(id.as_uuid())
            .select(UserRecordRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(row.map(UserDocument::from))
    }

    async fn scan_all(&self) -> Result<Vec<UserDocument>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<UserRecordRow> = user_records::table
            .select(UserRecordRow::as_select())
            .order_by((user_records::created_at, user_records::id))
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(UserDocument::from).collect())
    }

    async fn find_by_field(
        &self,
        field: RecordField,
        value: &str,
    ) -> Result<Vec<UserDocument>, RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let query = user_records::table
            .select(UserRecordRow::as_select())
            .order_by(user_records::created_at)
            .into_boxed();
        let query = match field {
            RecordField::Name => query.filter(user_records::name.eq(value)),
            RecordField::Email => query.filter(user_records::email.eq(value)),
        };
        let rows: Vec<UserRecordRow> = query.load(&mut conn).await.map_err(map_diesel_error)?;
        Ok(rows.into_iter().map(UserDocument::from).collect())
    }

    async fn insert(&self, record: &UserRecord) -> Result<(), RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        diesel::insert_into(user_records::table)
            .values(NewUserRecordRow::from(record))
            .on_conflict(user_records::id)
            .do_update()
            .set((
                user_records::name.eq(excluded(user_records::name)),
                user_records::email.eq(excluded(user_records::email)),
                user_records::image_locator.eq(excluded(user_records::image_locator)),
                user_records::image_key.eq(excluded(user_records::image_key)),
            ))
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(map_diesel_error)
    }

    async fn insert_if_email_absent(&self, record: &UserRecord) -> Result<(), RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let email = record.email().as_ref();
        let inserted = conn
            .transaction(|conn| {
                async move {
                    diesel::sql_query(EMAIL_LOCK_SQL)
                        .bind::<Text, _>(email)
                        .execute(conn)
                        .await?;
                    let taken: bool = diesel::select(diesel::dsl::exists(
                        user_records::table.filter(user_records::email.eq(email)),
                    ))
                    .get_result(conn)
                    .await?;
                    if taken {
                        return Ok(false);
                    }
                    diesel::insert_into(user_records::table)
                        .values(NewUserRecordRow::from(record))
                        .execute(conn)
                        .await?;
                    Ok::<_, diesel::result::Error>(true)
                }
                .scope_boxed()
            })
            .await
            .map_err(map_diesel_error)?;

        if inserted {
            Ok(())
        } else {
            Err(RecordStoreError::email_taken(email))
        }
    }

    async fn update(&self, id: &UserId, changes: &RecordChanges) -> Result<(), RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        if changes.is_empty() {
            // Diesel refuses an empty changeset; an empty update only asserts existence.
            let exists: bool = diesel::select(diesel::dsl::exists(
                user_records::table.find(id.as_uuid()),
            ))
            .get_result(&mut conn)
            .await
            .map_err(map_diesel_error)?;
            return affected_or_not_found(usize::from(exists), id);
        }

        let rows = diesel::update(user_records::table.find(id.as_uuid()))
            .set(UserRecordUpdate::from(changes))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        affected_or_not_found(rows, id)
    }

    async fn delete(&self, id: &UserId) -> Result<(), RecordStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows = diesel::delete(user_records::table.find(id.as_uuid()))
            .execute(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        affected_or_not_found(rows, id)
    }
}
