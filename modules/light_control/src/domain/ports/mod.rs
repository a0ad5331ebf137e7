pub mod credentials;

pub use credentials::{SecretHasher, TokenSigner};
