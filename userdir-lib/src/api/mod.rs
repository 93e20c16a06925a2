use crate::model::Entity;
use async_trait::async_trait;

mod error;
mod http;

pub use error::ApiError;
pub use http::HttpClient;

/// CRUD access to one entity type on the directory service.
///
/// Every call is a single attempt; retry is left to the caller.
#[async_trait]
pub trait Resource<E: Entity>: Send + Sync {
    async fn list(&self) -> Result<Vec<E>, ApiError>;
    async fn get(&self, key: E::Key) -> Result<E, ApiError>;
    async fn create(&self, draft: &E::Draft) -> Result<E, ApiError>;
    async fn update(&self, key: E::Key, draft: &E::Draft) -> Result<E, ApiError>;
    async fn delete(&self, key: E::Key) -> Result<(), ApiError>;
}

