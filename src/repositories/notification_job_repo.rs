use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use diesel_async::AsyncPgConnection;
use diesel_async::pooled_connection::bb8::PooledConnection;
use uuid::Uuid;

use crate::db::AsyncDbPool;
use crate::dispatch::{NotificationJobStore, StaleRecovery};
use crate::error::{AppError, AppResult};
use crate::models::{JobStatus, NewNotificationJob, NotificationJob};
use crate::schema::notification_jobs::{self, dsl};
use crate::services::notifications::SendTally;

/// PostgreSQL-backed [`NotificationJobStore`].
///
/// Holds only the pool, so clones share connections.
#[derive(Clone)]
pub struct NotificationJobRepository {
    pool: AsyncDbPool,
}

impl NotificationJobRepository {
    pub fn new(pool: AsyncDbPool) -> Self {
        Self { pool }
    }

    async fn conn(&self) -> AppResult<PooledConnection<'_, AsyncPgConnection>> {
        self.pool
            .get()
            .await
            .map_err(|e| AppError::ConnectionPool {
                source: anyhow::Error::from(e),
            })
    }
}

#[async_trait]
impl NotificationJobStore for NotificationJobRepository {
    async fn fetch_due(&self, now: DateTime<Utc>, limit: i64) -> AppResult<Vec<NotificationJob>> {
        let mut conn = self.conn().await?;

        notification_jobs::table
            .filter(dsl::status.eq(JobStatus::Pending))
            .filter(dsl::scheduled_at.le(now))
            .order((
                dsl::scheduled_at.asc(),
                dsl::created_at.asc(),
                dsl::id.asc(),
            ))
            .limit(limit)
            .select(NotificationJob::as_select())
            .load(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn claim(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        let mut conn = self.conn().await?;

        diesel::update(
            notification_jobs::table
                .filter(dsl::id.eq(id))
                .filter(dsl::status.eq(JobStatus::Pending)),
        )
        .set((
            dsl::status.eq(JobStatus::Processing),
            dsl::attempts.eq(dsl::attempts + 1),
            dsl::claimed_at.eq(Some(now)),
        ))
        .returning(NotificationJob::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)
    }

    async fn complete(&self, id: Uuid, tally: SendTally, now: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(
            notification_jobs::table
                .filter(dsl::id.eq(id))
                .filter(dsl::status.eq(JobStatus::Processing)),
        )
        .set((
            dsl::status.eq(JobStatus::Completed),
            dsl::sent_count.eq(tally.sent),
            dsl::failed_count.eq(tally.failed),
            dsl::total_count.eq(tally.total),
            dsl::processed_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await?;

        Ok(updated == 1)
    }

    async fn fail(&self, id: Uuid, message: &str, now: DateTime<Utc>) -> AppResult<bool> {
        let mut conn = self.conn().await?;

        let updated = diesel::update(
            notification_jobs::table
                .filter(dsl::id.eq(id))
                .filter(dsl::status.eq(JobStatus::Processing)),
        )
        .set((
            dsl::status.eq(JobStatus::Failed),
            dsl::error_message.eq(Some(message)),
            dsl::processed_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await?;

        Ok(updated == 1)
    }

    async fn reclaim_stale(
        &self,
        stale_before: DateTime<Utc>,
        max_attempts: i32,
        now: DateTime<Utc>,
    ) -> AppResult<StaleRecovery> {
        let mut conn = self.conn().await?;

        let requeued = diesel::update(
            notification_jobs::table
                .filter(dsl::status.eq(JobStatus::Processing))
                .filter(dsl::claimed_at.is_null().or(dsl::claimed_at.lt(stale_before)))
                .filter(dsl::attempts.lt(max_attempts)),
        )
        .set((
            dsl::status.eq(JobStatus::Pending),
            dsl::claimed_at.eq(None::<DateTime<Utc>>),
        ))
        .execute(&mut conn)
        .await?;

        let abandoned = diesel::update(
            notification_jobs::table
                .filter(dsl::status.eq(JobStatus::Processing))
                .filter(dsl::claimed_at.is_null().or(dsl::claimed_at.lt(stale_before)))
                .filter(dsl::attempts.ge(max_attempts)),
        )
        .set((
            dsl::status.eq(JobStatus::Failed),
            dsl::error_message.eq(Some(crate::dispatch::abandoned_message(max_attempts))),
            dsl::processed_at.eq(Some(now)),
        ))
        .execute(&mut conn)
        .await?;

        Ok(StaleRecovery {
            requeued: requeued as u32,
            abandoned: abandoned as u32,
        })
    }

    async fn create(&self, job: NewNotificationJob, now: DateTime<Utc>) -> AppResult<NotificationJob> {
        let mut conn = self.conn().await?;

        diesel::insert_into(notification_jobs::table)
            .values((&job, dsl::created_at.eq(now)))
            .returning(NotificationJob::as_returning())
            .get_result(&mut conn)
            .await
            .map_err(AppError::from)
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<NotificationJob>> {
        let mut conn = self.conn().await?;

        notification_jobs::table
            .find(id)
            .select(NotificationJob::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(AppError::from)
    }

    async fn list(
        &self,
        status: Option<JobStatus>,
        offset: i64,
        limit: i64,
    ) -> AppResult<(Vec<NotificationJob>, i64)> {
        let mut conn = self.conn().await?;

        let mut query = notification_jobs::table.into_boxed();
        let mut count_query = notification_jobs::table.into_boxed();
        if let Some(status) = status {
            query = query.filter(dsl::status.eq(status));
            count_query = count_query.filter(dsl::status.eq(status));
        }

        let jobs = query
            .order((dsl::scheduled_at.desc(), dsl::created_at.desc()))
            .offset(offset)
            .limit(limit)
            .select(NotificationJob::as_select())
            .load(&mut conn)
            .await?;

        let total: i64 = count_query.count().get_result(&mut conn).await?;

        Ok((jobs, total))
    }

    async fn cancel(&self, id: Uuid, now: DateTime<Utc>) -> AppResult<Option<NotificationJob>> {
        let mut conn = self.conn().await?;

        diesel::update(
            notification_jobs::table
                .filter(dsl::id.eq(id))
                .filter(dsl::status.eq(JobStatus::Pending)),
        )
        .set((
            dsl::status.eq(JobStatus::Cancelled),
            dsl::processed_at.eq(Some(now)),
        ))
        .returning(NotificationJob::as_returning())
        .get_result(&mut conn)
        .await
        .optional()
        .map_err(AppError::from)
    }

    async fn ping(&self) -> AppResult<()> {
        let mut conn = self.conn().await?;

        diesel::sql_query("SELECT 1")
            .execute(&mut conn)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Database {
                operation: "health check".to_string(),
                source: anyhow::Error::from(e),
            })
    }
}
