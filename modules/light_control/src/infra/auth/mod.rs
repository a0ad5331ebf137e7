mod argon2_hasher;
mod jwt_tokens;

pub use argon2_hasher::Argon2Hasher;
pub use jwt_tokens::JwtTokenSigner;
