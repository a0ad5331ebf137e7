use async_trait::async_trait;
use std::sync::Arc;

use crate::contract::{
    client::LightControlApi,
    error::LightControlError,
    model::{AccessToken, Credentials, LightDecision, LightReading, Principal, User},
};
use crate::domain::service::Service;

/// Local implementation of the LightControlApi trait that delegates to the domain service
pub struct LightControlLocalClient {
    service: Arc<Service>,
}

impl LightControlLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl LightControlApi for LightControlLocalClient {
    async fn register(&self, credentials: Credentials) -> Result<User, LightControlError> {
        self.service.register(credentials).await.map_err(Into::into)
    }

    async fn login(&self, credentials: Credentials) -> Result<AccessToken, LightControlError> {
        self.service.login(credentials).await.map_err(Into::into)
    }

    async fn authenticate(&self, token: &str) -> Result<Principal, LightControlError> {
        self.service.authenticate(token).map_err(Into::into)
    }

    async fn latest_intensity(&self) -> Result<i32, LightControlError> {
        self.service.latest_intensity().await.map_err(Into::into)
    }

    async fn record_intensity(&self, intensity: i32) -> Result<LightReading, LightControlError> {
        self.service
            .record_intensity(intensity)
            .await
            .map_err(Into::into)
    }

    async fn decide(&self, intensity: i32) -> LightDecision {
        self.service.decide(intensity)
    }
}
