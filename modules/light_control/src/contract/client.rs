use async_trait::async_trait;

use crate::contract::{
    error::LightControlError,
    model::{AccessToken, Credentials, LightDecision, LightReading, Principal, User},
};

/// In-process API of the light_control module, published through the ClientHub.
#[async_trait]
pub trait LightControlApi: Send + Sync {
    async fn register(&self, credentials: Credentials) -> Result<User, LightControlError>;

    async fn login(&self, credentials: Credentials) -> Result<AccessToken, LightControlError>;

    /// Verify a bearer token and return who it was issued to.
    async fn authenticate(&self, token: &str) -> Result<Principal, LightControlError>;

    /// Most recent intensity, or 0 when nothing has been recorded.
    async fn latest_intensity(&self) -> Result<i32, LightControlError>;

    async fn record_intensity(&self, intensity: i32) -> Result<LightReading, LightControlError>;

    async fn decide(&self, intensity: i32) -> LightDecision;
}
