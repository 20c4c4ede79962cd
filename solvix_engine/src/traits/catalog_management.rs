use crate::{
    db_types::{NewService, Service},
    traits::OrderFlowError,
};

#[allow(async_fn_in_trait)]
pub trait CatalogManagement {
    async fn fetch_services(&self) -> Result<Vec<Service>, OrderFlowError>;

    async fn fetch_service(&self, service_id: i64) -> Result<Option<Service>, OrderFlowError>;

    async fn insert_service(&self, service: NewService) -> Result<Service, OrderFlowError>;
}
