//! Lifecycle orchestration through `modkit::run`: phase order, database
//! wiring, REST composition and failure handling.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::Router;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use modkit::{
    contracts::{DbModule, Module, RestHostModule, RestfulModule, StatefulModule},
    run, ConfigProvider, DbOptions, ModuleCtx, ModuleEntry, ModuleRegistry, RunOptions,
    ShutdownOptions,
};

type CallTracker = Arc<Mutex<Vec<String>>>;

struct MockConfigProvider(serde_json::Value);

impl ConfigProvider for MockConfigProvider {
    fn get_module_config(&self, module_name: &str) -> Option<&serde_json::Value> {
        self.0.get(module_name)
    }
}

fn provider() -> Arc<dyn ConfigProvider> {
    Arc::new(MockConfigProvider(serde_json::json!({
        "host": { "greeting": "hi" }
    })))
}

#[derive(Clone, Copy, PartialEq)]
enum FailAt {
    Nowhere,
    Init,
    Migrate,
    Rest,
    Start,
    Stop,
}

struct TestModule {
    name: &'static str,
    calls: CallTracker,
    fail_at: FailAt,
}

impl TestModule {
    fn new(name: &'static str, calls: &CallTracker) -> Self {
        Self {
            name,
            calls: calls.clone(),
            fail_at: FailAt::Nowhere,
        }
    }

    fn failing(mut self, at: FailAt) -> Self {
        self.fail_at = at;
        self
    }

    fn record(&self, what: &str, at: FailAt) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(format!("{}.{what}", self.name));
        if self.fail_at == at {
            anyhow::bail!("{what} failed for module {}", self.name);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Module for TestModule {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        assert_eq!(ctx.current_module(), Some(self.name));
        self.record("init", FailAt::Init)
    }
}

#[async_trait::async_trait]
impl DbModule for TestModule {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(db.sqlx_sqlite()).await?;
        self.record("migrate", FailAt::Migrate)
    }
}

impl RestfulModule for TestModule {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        self.record("register_rest", FailAt::Rest)?;
        Ok(router)
    }
}

impl RestHostModule for TestModule {
    fn rest_prepare(&self, ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        #[derive(serde::Deserialize, Default)]
        struct HostCfg {
            greeting: String,
        }
        let cfg: HostCfg = ctx.module_config();
        assert_eq!(cfg.greeting, "hi");
        self.record("rest_prepare", FailAt::Rest)?;
        Ok(router)
    }

    fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        self.record("rest_finalize", FailAt::Rest)?;
        Ok(router)
    }
}

#[async_trait::async_trait]
impl StatefulModule for TestModule {
    async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.record("start", FailAt::Start)
    }

    async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
        self.record("stop", FailAt::Stop)
    }
}

/// `host` serves REST and runs; `app` depends on it and uses the database.
fn registry(host: TestModule, app: TestModule) -> ModuleRegistry {
    let host = Arc::new(host);
    let app = Arc::new(app);
    ModuleRegistry::builder()
        .register(
            ModuleEntry::new("app", app.clone())
                .depends_on(&["host"])
                .with_db(app.clone())
                .with_rest(app.clone())
                .with_stateful(app),
        )
        .register(
            ModuleEntry::new("host", host.clone())
                .with_rest_host(host.clone())
                .with_stateful(host),
        )
        .build()
        .unwrap()
}

async fn memory_db() -> Arc<modkit_db::DbHandle> {
    Arc::new(
        modkit_db::DbHandle::connect("sqlite::memory:", modkit_db::ConnectOpts::default())
            .await
            .unwrap(),
    )
}

fn calls(tracker: &CallTracker) -> Vec<String> {
    tracker.lock().unwrap().clone()
}

#[tokio::test]
async fn phases_run_in_dependency_order_and_stop_in_reverse() {
    let tracker = CallTracker::default();
    let cancel = CancellationToken::new();

    let handle = tokio::spawn(run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::Existing(memory_db().await),
        shutdown: ShutdownOptions::Token(cancel.clone()),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker),
        ),
    }));

    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();
    timeout(Duration::from_secs(5), handle)
        .await
        .expect("runner should finish")
        .unwrap()
        .unwrap();

    assert_eq!(
        calls(&tracker),
        [
            "host.init",
            "app.init",
            "app.migrate",
            "host.rest_prepare",
            "app.register_rest",
            "host.rest_finalize",
            "host.start",
            "app.start",
            "app.stop",
            "host.stop",
        ]
    );
}

#[tokio::test]
async fn init_failure_stops_before_later_phases() {
    let tracker = CallTracker::default();
    let err = run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::Existing(memory_db().await),
        shutdown: ShutdownOptions::Token(CancellationToken::new()),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker).failing(FailAt::Init),
        ),
    })
    .await
    .unwrap_err();

    assert!(format!("{err:#}").contains("init failed for module app"));
    assert_eq!(calls(&tracker), ["host.init", "app.init"]);
}

#[tokio::test]
async fn migration_failure_is_reported_with_module_name() {
    let tracker = CallTracker::default();
    let err = run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::Existing(memory_db().await),
        shutdown: ShutdownOptions::Token(CancellationToken::new()),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker).failing(FailAt::Migrate),
        ),
    })
    .await
    .unwrap_err();

    assert!(err.to_string().contains("'app'"), "{err}");
    assert!(!calls(&tracker).iter().any(|c| c.ends_with(".start")));
}

#[tokio::test]
async fn without_database_the_migration_phase_is_skipped() {
    let tracker = CallTracker::default();
    let run_fut = run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::None,
        shutdown: ShutdownOptions::Future(Box::pin(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
        })),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker),
        ),
    });
    timeout(Duration::from_secs(5), run_fut)
        .await
        .expect("runner should finish")
        .unwrap();

    let c = calls(&tracker);
    assert!(!c.iter().any(|c| c.ends_with(".migrate")));
    assert_eq!(c.last().map(String::as_str), Some("host.stop"));
}

#[tokio::test]
async fn rest_failure_prevents_start() {
    let tracker = CallTracker::default();
    let err = run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::None,
        shutdown: ShutdownOptions::Token(CancellationToken::new()),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker).failing(FailAt::Rest),
        ),
    })
    .await
    .unwrap_err();

    assert!(format!("{err:#}").contains("app"), "unexpected error: {err:#}");
    let c = calls(&tracker);
    assert!(c.contains(&"app.register_rest".to_string()));
    assert!(!c.iter().any(|call| call.ends_with(".start")));
}

#[tokio::test]
async fn start_failure_aborts_the_run() {
    let tracker = CallTracker::default();
    let result = timeout(
        Duration::from_secs(5),
        run(RunOptions {
            modules_cfg: provider(),
            db: DbOptions::None,
            shutdown: ShutdownOptions::Token(CancellationToken::new()),
            registry: registry(
                TestModule::new("host", &tracker).failing(FailAt::Start),
                TestModule::new("app", &tracker),
            ),
        }),
    )
    .await
    .expect("a failed start must not wait for shutdown");

    assert!(result.is_err());
    assert!(!calls(&tracker).contains(&"app.start".to_string()));
}

#[tokio::test]
async fn stop_failures_do_not_fail_shutdown() {
    let tracker = CallTracker::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    run(RunOptions {
        modules_cfg: provider(),
        db: DbOptions::None,
        shutdown: ShutdownOptions::Token(cancel),
        registry: registry(
            TestModule::new("host", &tracker),
            TestModule::new("app", &tracker).failing(FailAt::Stop),
        ),
    })
    .await
    .unwrap();

    let c = calls(&tracker);
    assert!(c.contains(&"app.stop".to_string()));
    assert!(c.contains(&"host.stop".to_string()));
}
