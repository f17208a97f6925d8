use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{entities::dispatch, errors::ServiceError, models::NewDispatch};

pub mod dispatch_repository;

pub use dispatch_repository::DispatchRepository;

/// Persistence collaborator for dispatches.
///
/// `list_recent` must return rows ordered by `created_at` descending; callers
/// rely on that order and never re-sort.
#[async_trait]
pub trait DispatchStore: Send + Sync {
    async fn list_recent(&self) -> Result<Vec<dispatch::Model>, ServiceError>;

    async fn insert(
        &self,
        dispatch: NewDispatch,
        now: DateTime<Utc>,
    ) -> Result<dispatch::Model, ServiceError>;

    async fn update_status(
        &self,
        id: uuid::Uuid,
        status: String,
        now: DateTime<Utc>,
    ) -> Result<dispatch::Model, ServiceError>;
}

#[cfg(test)]
mockall::mock! {
    pub Store {}

    #[async_trait]
    impl DispatchStore for Store {
        async fn list_recent(&self) -> Result<Vec<dispatch::Model>, ServiceError>;

        async fn insert(
            &self,
            dispatch: NewDispatch,
            now: DateTime<Utc>,
        ) -> Result<dispatch::Model, ServiceError>;

        async fn update_status(
            &self,
            id: uuid::Uuid,
            status: String,
            now: DateTime<Utc>,
        ) -> Result<dispatch::Model, ServiceError>;
    }
}
