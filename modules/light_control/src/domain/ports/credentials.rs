use crate::contract::model::{AccessToken, Principal};

/// One-way hashing of user secrets. Implementations may be CPU heavy;
/// the service calls them off the async executor.
pub trait SecretHasher: Send + Sync {
    fn hash(&self, secret: &str) -> anyhow::Result<String>;

    /// `Ok(false)` on mismatch; `Err` only when `stored` cannot be parsed.
    fn verify(&self, secret: &str, stored: &str) -> anyhow::Result<bool>;
}

/// Issues and checks bearer tokens.
pub trait TokenSigner: Send + Sync {
    fn issue(&self, subject: &str) -> anyhow::Result<AccessToken>;

    fn verify(&self, token: &str) -> anyhow::Result<Principal>;
}
