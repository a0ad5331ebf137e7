use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use crate::config::LightControlConfig;
use crate::contract::model::{AccessToken, Credentials, LightDecision, LightReading, Principal, User};
use crate::domain::decision;
use crate::domain::error::DomainError;
use crate::domain::ports::{SecretHasher, TokenSigner};
use crate::domain::repo::{InsertUserOutcome, LightReadingsRepository, NewUserRecord, UsersRepository};

/// Business rules of the module. Storage and credential handling are behind ports.
pub struct Service {
    users: Arc<dyn UsersRepository>,
    readings: Arc<dyn LightReadingsRepository>,
    hasher: Arc<dyn SecretHasher>,
    tokens: Arc<dyn TokenSigner>,
    config: ServiceConfig,
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub on_threshold: i32,
    pub min_intensity: i32,
    pub max_intensity: i32,
    pub min_password_len: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self::from(&LightControlConfig::default())
    }
}

impl From<&LightControlConfig> for ServiceConfig {
    fn from(cfg: &LightControlConfig) -> Self {
        Self {
            on_threshold: cfg.on_threshold,
            min_intensity: cfg.min_intensity,
            max_intensity: cfg.max_intensity,
            min_password_len: cfg.min_password_len,
        }
    }
}

fn db_err(e: anyhow::Error) -> DomainError {
    DomainError::database(format!("{e:#}"))
}

impl Service {
    pub fn new(
        users: Arc<dyn UsersRepository>,
        readings: Arc<dyn LightReadingsRepository>,
        hasher: Arc<dyn SecretHasher>,
        tokens: Arc<dyn TokenSigner>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            users,
            readings,
            hasher,
            tokens,
            config,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    #[instrument(name = "light_control.service.register", skip(self, credentials), fields(username = %credentials.username))]
    pub async fn register(&self, credentials: Credentials) -> Result<User, DomainError> {
        let username = credentials.username.trim().to_owned();
        self.validate_credentials(&username, &credentials.password)?;

        if self.users.username_exists(&username).await.map_err(db_err)? {
            return Err(DomainError::username_taken(username));
        }

        let hasher = self.hasher.clone();
        let password = credentials.password;
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| DomainError::internal(format!("hashing task failed: {e}")))?
            .map_err(|e| DomainError::internal(format!("{e:#}")))?;

        let record = NewUserRecord {
            username: username.clone(),
            password_hash,
            created_at: Utc::now(),
        };

        // the pre-check races with concurrent registrations; the unique index decides
        match self.users.insert(record).await.map_err(db_err)? {
            InsertUserOutcome::Inserted(user) => {
                info!(user_id = user.id, "Registered user");
                Ok(user)
            }
            InsertUserOutcome::Duplicate => Err(DomainError::username_taken(username)),
        }
    }

    #[instrument(name = "light_control.service.login", skip(self, credentials), fields(username = %credentials.username))]
    pub async fn login(&self, credentials: Credentials) -> Result<AccessToken, DomainError> {
        let username = credentials.username.trim();
        require_present(username, &credentials.password)?;
        let Some(stored) = self.users.find_by_username(username).await.map_err(db_err)? else {
            debug!("Login for unknown user");
            return Err(DomainError::InvalidCredentials);
        };

        let hasher = self.hasher.clone();
        let password = credentials.password;
        let hash = stored.password_hash.clone();
        let matches = tokio::task::spawn_blocking(move || hasher.verify(&password, &hash))
            .await
            .map_err(|e| DomainError::internal(format!("verification task failed: {e}")))?
            .map_err(|e| {
                warn!(user_id = stored.id, "Stored password hash is unreadable");
                DomainError::internal(format!("{e:#}"))
            })?;

        if !matches {
            debug!("Password mismatch");
            return Err(DomainError::InvalidCredentials);
        }

        let token = self
            .tokens
            .issue(&stored.username)
            .map_err(|e| DomainError::internal(format!("{e:#}")))?;
        info!(user_id = stored.id, "Issued access token");
        Ok(token)
    }

    /// Any verification failure collapses to `InvalidToken`.
    pub fn authenticate(&self, token: &str) -> Result<Principal, DomainError> {
        self.tokens.verify(token).map_err(|e| {
            debug!(error = %e, "Token rejected");
            DomainError::InvalidToken
        })
    }

    #[instrument(name = "light_control.service.latest_intensity", skip(self))]
    pub async fn latest_intensity(&self) -> Result<i32, DomainError> {
        let latest = self.readings.latest().await.map_err(db_err)?;
        Ok(latest.map_or(0, |r| r.intensity))
    }

    #[instrument(name = "light_control.service.record_intensity", skip(self))]
    pub async fn record_intensity(&self, intensity: i32) -> Result<LightReading, DomainError> {
        let ServiceConfig {
            min_intensity: min,
            max_intensity: max,
            ..
        } = self.config;
        if !(min..=max).contains(&intensity) {
            return Err(DomainError::IntensityOutOfRange {
                value: intensity,
                min,
                max,
            });
        }

        let reading = self
            .readings
            .insert(intensity, Utc::now())
            .await
            .map_err(db_err)?;
        debug!(reading_id = reading.id, "Stored light reading");
        Ok(reading)
    }

    pub fn decide(&self, intensity: i32) -> LightDecision {
        decision::decide(intensity, self.config.on_threshold)
    }

    fn validate_credentials(&self, username: &str, password: &str) -> Result<(), DomainError> {
        require_present(username, password)?;
        if password.chars().count() < self.config.min_password_len {
            return Err(DomainError::validation(
                "password",
                format!("must be at least {} characters", self.config.min_password_len),
            ));
        }
        Ok(())
    }
}

/// Both login and registration reject blank usernames and empty passwords.
fn require_present(username: &str, password: &str) -> Result<(), DomainError> {
    if username.is_empty() {
        return Err(DomainError::validation("username", "must not be empty"));
    }
    if password.is_empty() {
        return Err(DomainError::validation("password", "must not be empty"));
    }
    Ok(())
}
