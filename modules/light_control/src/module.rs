use std::sync::Arc;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use modkit::{DbModule, Module, ModuleCtx, RestfulModule};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};

use crate::api::rest::routes;
use crate::config::LightControlConfig;
use crate::contract::client::LightControlApi;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::LightControlLocalClient;
use crate::infra::auth::{Argon2Hasher, JwtTokenSigner};
use crate::infra::storage::{migrations::Migrator, SeaOrmLightReadingsRepository, SeaOrmUsersRepository};

/// Accounts, light readings and the on/off decision.
#[derive(Default)]
pub struct LightControl {
    service: ArcSwapOption<Service>,
}

impl LightControl {
    pub const NAME: &'static str = "light_control";

    fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("{} service not initialized", Self::NAME))
    }
}

#[async_trait]
impl Module for LightControl {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing light_control module");

        let cfg: LightControlConfig = ctx.module_config_required()?;
        cfg.validate()?;
        debug!(
            on_threshold = cfg.on_threshold,
            min_intensity = cfg.min_intensity,
            max_intensity = cfg.max_intensity,
            token_ttl_secs = cfg.token_ttl_secs,
            "Loaded light_control config"
        );

        let conn = ctx.db_required()?.sea();
        let service = Arc::new(Service::new(
            Arc::new(SeaOrmUsersRepository::new(conn.clone())),
            Arc::new(SeaOrmLightReadingsRepository::new(conn)),
            Arc::new(Argon2Hasher::default()),
            Arc::new(JwtTokenSigner::new(&cfg.jwt_secret, cfg.token_ttl_secs)),
            ServiceConfig::from(&cfg),
        ));
        self.service.store(Some(service.clone()));

        let api: Arc<dyn LightControlApi> = Arc::new(LightControlLocalClient::new(service));
        ctx.client_hub().register::<dyn LightControlApi>(api);
        info!("LightControl API exposed to ClientHub");
        Ok(())
    }
}

#[async_trait]
impl DbModule for LightControl {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running light_control database migrations");
        Migrator::up(&db.sea(), None).await?;
        info!("light_control migrations completed");
        Ok(())
    }
}

impl RestfulModule for LightControl {
    fn register_rest(&self, _ctx: &ModuleCtx, router: axum::Router) -> anyhow::Result<axum::Router> {
        info!("Registering light_control REST routes");
        routes::register_routes(router, self.service()?)
    }
}
