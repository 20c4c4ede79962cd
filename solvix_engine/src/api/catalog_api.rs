use std::fmt::Debug;

use log::*;

use crate::{
    db_types::{NewService, Service},
    traits::{CatalogManagement, OrderFlowError},
};

pub struct CatalogApi<B> {
    db: B,
}

impl<B> Debug for CatalogApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CatalogApi")
    }
}

impl<B> CatalogApi<B>
where B: CatalogManagement
{
    pub fn new(db: B) -> Self {
        Self { db }
    }

    pub async fn services(&self) -> Result<Vec<Service>, OrderFlowError> {
        self.db.fetch_services().await
    }

    pub async fn service_by_id(&self, service_id: i64) -> Result<Service, OrderFlowError> {
        self.db.fetch_service(service_id).await?.ok_or(OrderFlowError::ServiceNotFound(service_id))
    }

    pub async fn create_service(&self, service: NewService) -> Result<Service, OrderFlowError> {
        if service.name.trim().is_empty() {
            return Err(OrderFlowError::ValidationError("Service name is required".into()));
        }
        if service.base_price.value() < 0 {
            return Err(OrderFlowError::ValidationError("Base price cannot be negative".into()));
        }
        let service = self.db.insert_service(service).await?;
        info!("🛒️ Service #{} ({}) is now in the catalogue", service.id, service.name);
        Ok(service)
    }
}
