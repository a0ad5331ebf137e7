//! # ModKit - module system for the streetlight server
//!
//! Modules are plain structs implementing one or more capability traits.
//! The binary lists them explicitly in a [`ModuleRegistry`], and the
//! [`runtime::run`] driver walks them through the phases
//! init → db → rest → start → wait → stop.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modkit::{ModuleEntry, ModuleRegistry};
//!
//! let users = Arc::new(UsersModule::default());
//! let registry = ModuleRegistry::builder()
//!     .register(ModuleEntry::new("users", users.clone()).with_db(users.clone()).with_rest(users))
//!     .build()?;
//! ```

pub use anyhow::Result;
pub use async_trait::async_trait;

// Module system exports
pub use crate::contracts::*;
pub mod context;
pub use context::{ConfigProvider, ModuleCtx, ModuleCtxBuilder};

pub mod client_hub;
pub mod registry;

pub use client_hub::ClientHub;
pub use registry::{ModuleEntry, ModuleRegistry, RegistryBuilder, RegistryError};

// Core module contracts and traits
pub mod contracts;

pub mod api;
pub use api::problem::{
    bad_request, conflict, forbidden, internal_error, unauthorized, Problem, ProblemResponse,
    ValidationError, APPLICATION_PROBLEM_JSON,
};

pub mod runtime;
pub use runtime::{run, DbOptions, RunOptions, ShutdownOptions};
