pub mod decision;
pub mod error;
pub mod ports;
pub mod repo;
pub mod service;
