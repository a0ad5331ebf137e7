//! Lifecycle hooks a module can implement. The registry drives them in a
//! fixed sequence: `init`, `migrate`, REST composition, `start`, and on
//! shutdown `stop`.

use async_trait::async_trait;
use axum::Router;
use tokio_util::sync::CancellationToken;

/// Every registered module implements this. `init` reads the module's
/// config section and publishes clients into the [`crate::ClientHub`];
/// the database may still be unmigrated at this point.
#[async_trait]
pub trait Module: Send + Sync + 'static {
    async fn init(&self, ctx: &crate::context::ModuleCtx) -> anyhow::Result<()>;
}

/// Modules that own tables.
#[async_trait]
pub trait DbModule: Send + Sync {
    /// Bring the schema up to date. Called once per run with the shared
    /// handle, after every module's `init`.
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()>;
}

/// Modules that expose HTTP endpoints. Called in dependency order with the
/// router built so far; the returned router is passed to the next module.
pub trait RestfulModule: Send + Sync {
    fn register_rest(
        &self,
        ctx: &crate::context::ModuleCtx,
        router: Router,
    ) -> anyhow::Result<Router>;
}

/// The one module that serves HTTP. A registry with REST modules but no
/// host, or with two hosts, fails the REST phase.
pub trait RestHostModule: Send + Sync + 'static {
    /// Called before any [`RestfulModule`]; adds host-owned routes such as `/health`.
    fn rest_prepare(
        &self,
        ctx: &crate::context::ModuleCtx,
        router: Router,
    ) -> anyhow::Result<Router>;

    /// Called last. Layers middleware over the composed router and keeps it
    /// for the listener, which binds in `start`.
    fn rest_finalize(
        &self,
        ctx: &crate::context::ModuleCtx,
        router: Router,
    ) -> anyhow::Result<Router>;
}

/// Modules with background work. `start` runs in dependency order and the
/// first error aborts the run; `stop` runs in reverse order and its errors
/// are only logged.
#[async_trait]
pub trait StatefulModule: Send + Sync {
    async fn start(&self, cancel: CancellationToken) -> anyhow::Result<()>;
    async fn stop(&self, cancel: CancellationToken) -> anyhow::Result<()>;
}
