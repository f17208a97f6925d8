use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, QueryOrder, Set};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::dispatch::{
    ActiveModel as DispatchActiveModel, Column, Entity as Dispatch, Model as DispatchModel,
};
use crate::errors::ServiceError;
use crate::models::{NewDispatch, StatusCategory};

use super::DispatchStore;

/// sea-orm backed dispatch store.
#[derive(Debug, Clone)]
pub struct DispatchRepository {
    db: Arc<DatabaseConnection>,
}

impl DispatchRepository {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<DispatchModel>, ServiceError> {
        Ok(Dispatch::find_by_id(id).one(self.db.as_ref()).await?)
    }
}

#[async_trait]
impl DispatchStore for DispatchRepository {
    async fn list_recent(&self) -> Result<Vec<DispatchModel>, ServiceError> {
        let rows = Dispatch::find()
            .order_by_desc(Column::CreatedAt)
            .all(self.db.as_ref())
            .await?;
        debug!(count = rows.len(), "loaded dispatches");
        Ok(rows)
    }

    async fn insert(
        &self,
        dispatch: NewDispatch,
        now: DateTime<Utc>,
    ) -> Result<DispatchModel, ServiceError> {
        let model = dispatch.into_model(Uuid::new_v4(), now);
        let active: DispatchActiveModel = model.into();
        Ok(active.insert(self.db.as_ref()).await?)
    }

    async fn update_status(
        &self,
        id: Uuid,
        status: String,
        now: DateTime<Utc>,
    ) -> Result<DispatchModel, ServiceError> {
        let existing = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Dispatch {} not found", id)))?;

        let stamp_accepted = existing.accepted_at.is_none();
        let stamp_completed = existing.completed_at.is_none();
        let category = StatusCategory::from_status(&status);

        let mut active: DispatchActiveModel = existing.into();
        active.status = Set(status.trim().to_string());
        match category {
            StatusCategory::Accepted if stamp_accepted => active.accepted_at = Set(Some(now)),
            StatusCategory::Completed if stamp_completed => active.completed_at = Set(Some(now)),
            _ => {}
        }

        Ok(active.update(self.db.as_ref()).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ensure_schema;
    use chrono::Duration;
    use sea_orm::{ConnectOptions, Database};

    async fn repository() -> DispatchRepository {
        let mut opts = ConnectOptions::new("sqlite::memory:".to_string());
        opts.max_connections(1).sqlx_logging(false);
        let db = Database::connect(opts).await.unwrap();
        ensure_schema(&db).await.unwrap();
        DispatchRepository::new(Arc::new(db))
    }

    fn new_dispatch(order_id: &str) -> NewDispatch {
        NewDispatch {
            order_id: order_id.into(),
            destination: "Planta Bucaramanga".into(),
            farm: "La Esperanza".into(),
            vehicle_plate: "TKR512".into(),
            driver_name: "Carlos Rincon".into(),
            driver_id: None,
            packages: 40,
            concentrate_amount: None,
            loading_company: "Cargas del Oriente".into(),
            zone: None,
            status: None,
            eta: None,
        }
    }

    #[tokio::test]
    async fn list_recent_is_newest_first() {
        let repo = repository().await;
        let now = Utc::now();
        repo.insert(new_dispatch("A1"), now - Duration::minutes(5))
            .await
            .unwrap();
        repo.insert(new_dispatch("A2"), now).await.unwrap();

        let rows = repo.list_recent().await.unwrap();
        let orders: Vec<&str> = rows.iter().map(|r| r.order_id.as_str()).collect();
        assert_eq!(orders, vec!["A2", "A1"]);
    }

    #[tokio::test]
    async fn update_status_stamps_lifecycle_timestamps_once() {
        let repo = repository().await;
        let created = repo.insert(new_dispatch("A1"), Utc::now()).await.unwrap();

        let accepted_at = Utc::now();
        let accepted = repo
            .update_status(created.id, "aceptado".into(), accepted_at)
            .await
            .unwrap();
        assert_eq!(accepted.status, "aceptado");
        assert!(accepted.accepted_at.is_some());
        assert!(accepted.completed_at.is_none());

        let later = accepted_at + Duration::hours(1);
        let again = repo
            .update_status(created.id, "accepted".into(), later)
            .await
            .unwrap();
        assert_eq!(again.accepted_at, accepted.accepted_at);

        let done = repo
            .update_status(created.id, "completado".into(), later)
            .await
            .unwrap();
        assert!(done.completed_at.is_some());
    }

    #[tokio::test]
    async fn update_status_on_missing_dispatch_is_not_found() {
        let repo = repository().await;
        let err = repo
            .update_status(Uuid::new_v4(), "pending".into(), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }
}
