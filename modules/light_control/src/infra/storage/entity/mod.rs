pub mod light_reading;
pub mod user;
