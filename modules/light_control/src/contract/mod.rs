pub mod client;
pub mod error;
pub mod model;

pub use client::LightControlApi;
pub use error::LightControlError;
pub use model::{AccessToken, Credentials, LightDecision, LightReading, Principal, User};
