use axum::Router;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use thiserror::Error;

use crate::context;
use crate::contracts;

/// One module and the capabilities it exposes.
///
/// The same `Arc` is usually passed to several `with_*` calls since a
/// module struct implements every capability trait it supports.
pub struct ModuleEntry {
    pub name: &'static str,
    pub deps: &'static [&'static str],
    pub core: Arc<dyn contracts::Module>,
    pub rest: Option<Arc<dyn contracts::RestfulModule>>,
    pub rest_host: Option<Arc<dyn contracts::RestHostModule>>,
    pub db: Option<Arc<dyn contracts::DbModule>>,
    pub stateful: Option<Arc<dyn contracts::StatefulModule>>,
}

impl ModuleEntry {
    pub fn new(name: &'static str, core: Arc<dyn contracts::Module>) -> Self {
        Self {
            name,
            deps: &[],
            core,
            rest: None,
            rest_host: None,
            db: None,
            stateful: None,
        }
    }

    pub fn depends_on(mut self, deps: &'static [&'static str]) -> Self {
        self.deps = deps;
        self
    }

    pub fn with_rest(mut self, m: Arc<dyn contracts::RestfulModule>) -> Self {
        self.rest = Some(m);
        self
    }

    pub fn with_rest_host(mut self, m: Arc<dyn contracts::RestHostModule>) -> Self {
        self.rest_host = Some(m);
        self
    }

    pub fn with_db(mut self, m: Arc<dyn contracts::DbModule>) -> Self {
        self.db = Some(m);
        self
    }

    pub fn with_stateful(mut self, m: Arc<dyn contracts::StatefulModule>) -> Self {
        self.stateful = Some(m);
        self
    }
}

impl std::fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleEntry")
            .field("name", &self.name)
            .field("deps", &self.deps)
            .field("has_rest", &self.rest.is_some())
            .field("is_rest_host", &self.rest_host.is_some())
            .field("has_db", &self.db.is_some())
            .field("has_stateful", &self.stateful.is_some())
            .finish()
    }
}

/// Dependency-ordered set of modules driven through the lifecycle phases.
pub struct ModuleRegistry {
    modules: Vec<ModuleEntry>,
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&'static str> = self.modules.iter().map(|m| m.name).collect();
        f.debug_struct("ModuleRegistry")
            .field("modules", &names)
            .finish()
    }
}

impl ModuleRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    pub fn modules(&self) -> &[ModuleEntry] {
        &self.modules
    }

    // ---- Ordered phases: init → DB → REST (sync) → start → stop ----

    pub async fn run_init_phase(&self, base_ctx: &context::ModuleCtx) -> Result<(), RegistryError> {
        for e in &self.modules {
            let ctx = base_ctx.clone().for_module(e.name);
            e.core
                .init(&ctx)
                .await
                .map_err(|source| RegistryError::Init {
                    module: e.name,
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn run_db_phase(&self, db: &modkit_db::DbHandle) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(dbm) = &e.db {
                tracing::debug!(module = e.name, "running migrations");
                dbm.migrate(db)
                    .await
                    .map_err(|source| RegistryError::DbMigrate {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Compose the router: host prepare, every provider in dependency order,
    /// then host finalize. Returns the finalized router.
    pub fn run_rest_phase(
        &self,
        base_ctx: &context::ModuleCtx,
        mut router: Router,
    ) -> Result<Router, RegistryError> {
        let mut hosts = self.modules.iter().filter_map(|e| e.rest_host.as_ref().map(|h| (e.name, h)));

        let Some((host_name, host)) = hosts.next() else {
            return if self.modules.iter().any(|e| e.rest.is_some()) {
                Err(RegistryError::RestRequiresHost)
            } else {
                Ok(router)
            };
        };
        if hosts.next().is_some() {
            return Err(RegistryError::MultipleRestHosts);
        }

        let host_ctx = base_ctx.clone().for_module(host_name);

        router = host
            .rest_prepare(&host_ctx, router)
            .map_err(|source| RegistryError::RestPrepare {
                module: host_name,
                source,
            })?;

        for e in &self.modules {
            if let Some(rest) = &e.rest {
                let ctx = base_ctx.clone().for_module(e.name);
                router = rest
                    .register_rest(&ctx, router)
                    .map_err(|source| RegistryError::RestRegister {
                        module: e.name,
                        source,
                    })?;
            }
        }

        host.rest_finalize(&host_ctx, router)
            .map_err(|source| RegistryError::RestFinalize {
                module: host_name,
                source,
            })
    }

    pub async fn run_start_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in &self.modules {
            if let Some(s) = &e.stateful {
                s.start(cancel.clone())
                    .await
                    .map_err(|source| RegistryError::Start {
                        module: e.name,
                        source,
                    })?;
            }
        }
        Ok(())
    }

    /// Stop in reverse order. Failures are logged, not propagated.
    pub async fn run_stop_phase(&self, cancel: CancellationToken) -> Result<(), RegistryError> {
        for e in self.modules.iter().rev() {
            if let Some(s) = &e.stateful {
                if let Err(err) = s.stop(cancel.clone()).await {
                    tracing::warn!(module = e.name, error = %err, "Failed to stop module");
                }
            }
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RegistryBuilder {
    entries: Vec<ModuleEntry>,
}

impl RegistryBuilder {
    pub fn register(mut self, entry: ModuleEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Validate names and dependencies, then order modules so every
    /// dependency comes before its dependents. Registration order breaks ties.
    pub fn build(self) -> Result<ModuleRegistry, RegistryError> {
        let mut idx: HashMap<&'static str, usize> = HashMap::new();
        for (i, e) in self.entries.iter().enumerate() {
            if idx.insert(e.name, i).is_some() {
                return Err(RegistryError::DuplicateModule(e.name));
            }
        }

        // edge dep -> dependent
        let mut adj = vec![Vec::<usize>::new(); self.entries.len()];
        let mut indeg = vec![0usize; self.entries.len()];
        for (i, e) in self.entries.iter().enumerate() {
            for &d in e.deps {
                let v = *idx.get(d).ok_or_else(|| RegistryError::UnknownDependency {
                    module: e.name,
                    depends_on: d.to_string(),
                })?;
                adj[v].push(i);
                indeg[i] += 1;
            }
        }

        let mut q: VecDeque<usize> = (0..indeg.len()).filter(|&i| indeg[i] == 0).collect();
        let mut order = Vec::with_capacity(self.entries.len());
        while let Some(u) = q.pop_front() {
            order.push(u);
            for &w in &adj[u] {
                indeg[w] -= 1;
                if indeg[w] == 0 {
                    q.push_back(w);
                }
            }
        }

        if order.len() != self.entries.len() {
            let mut stuck: Vec<&'static str> = (0..indeg.len())
                .filter(|&i| indeg[i] > 0)
                .map(|i| self.entries[i].name)
                .collect();
            stuck.sort_unstable();
            return Err(RegistryError::CycleDetected { modules: stuck });
        }

        let mut slots: Vec<Option<ModuleEntry>> = self.entries.into_iter().map(Some).collect();
        let modules: Vec<ModuleEntry> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        tracing::info!(
            modules = ?modules.iter().map(|e| e.name).collect::<Vec<_>>(),
            "Module dependency order resolved"
        );

        Ok(ModuleRegistry { modules })
    }
}

/// Structured errors for the module registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("initialization failed for module '{module}'")]
    Init {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("start failed for '{module}'")]
    Start {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("DB migration failed for module '{module}'")]
    DbMigrate {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST prepare failed for host module '{module}'")]
    RestPrepare {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST registration failed for module '{module}'")]
    RestRegister {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("REST finalize failed for host module '{module}'")]
    RestFinalize {
        module: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("modules with REST routes found, but no module hosts the REST ingress")]
    RestRequiresHost,
    #[error("multiple REST host modules detected; exactly one is allowed")]
    MultipleRestHosts,

    #[error("module '{0}' is already registered")]
    DuplicateModule(&'static str),
    #[error("module '{module}' depends on unknown '{depends_on}'")]
    UnknownDependency {
        module: &'static str,
        depends_on: String,
    },
    #[error("cyclic dependency detected among: {}", modules.join(", "))]
    CycleDetected { modules: Vec<&'static str> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ModuleCtx, ModuleCtxBuilder};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, e: impl Into<String>) {
            self.events.lock().push(e.into());
        }
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    struct Probe {
        name: &'static str,
        log: Arc<Recorder>,
    }

    #[async_trait::async_trait]
    impl contracts::Module for Probe {
        async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
            assert_eq!(ctx.current_module(), Some(self.name));
            self.log.push(format!("init:{}", self.name));
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl contracts::StatefulModule for Probe {
        async fn start(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.push(format!("start:{}", self.name));
            Ok(())
        }
        async fn stop(&self, _cancel: CancellationToken) -> anyhow::Result<()> {
            self.log.push(format!("stop:{}", self.name));
            Ok(())
        }
    }

    impl contracts::RestfulModule for Probe {
        fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.log.push(format!("rest:{}", self.name));
            Ok(router.route("/probe", axum::routing::get(|| async { "ok" })))
        }
    }

    impl contracts::RestHostModule for Probe {
        fn rest_prepare(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.log.push(format!("prepare:{}", self.name));
            Ok(router)
        }
        fn rest_finalize(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
            self.log.push(format!("finalize:{}", self.name));
            Ok(router)
        }
    }

    fn probe(name: &'static str, log: &Arc<Recorder>) -> Arc<Probe> {
        Arc::new(Probe {
            name,
            log: log.clone(),
        })
    }

    fn names(reg: &ModuleRegistry) -> Vec<&'static str> {
        reg.modules().iter().map(|e| e.name).collect()
    }

    #[test]
    fn dependencies_come_first() {
        let log = Arc::new(Recorder::default());
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("lights", probe("lights", &log)).depends_on(&["ingress"]))
            .register(ModuleEntry::new("ingress", probe("ingress", &log)))
            .build()
            .unwrap();
        assert_eq!(names(&reg), vec!["ingress", "lights"]);
    }

    #[test]
    fn unknown_dependency_error() {
        let log = Arc::new(Recorder::default());
        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("lights", probe("lights", &log)).depends_on(&["nope"]))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            RegistryError::UnknownDependency { module: "lights", ref depends_on } if depends_on == "nope"
        ));
    }

    #[test]
    fn duplicate_and_cycle_are_rejected() {
        let log = Arc::new(Recorder::default());
        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", probe("a", &log)))
            .register(ModuleEntry::new("a", probe("a", &log)))
            .build()
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateModule("a")));

        let err = ModuleRegistry::builder()
            .register(ModuleEntry::new("a", probe("a", &log)).depends_on(&["b"]))
            .register(ModuleEntry::new("b", probe("b", &log)).depends_on(&["a"]))
            .build()
            .unwrap_err();
        match err {
            RegistryError::CycleDetected { modules } => assert_eq!(modules, vec!["a", "b"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rest_requires_host() {
        let log = Arc::new(Recorder::default());
        let p = probe("lights", &log);
        let reg = ModuleRegistry::builder()
            .register(ModuleEntry::new("lights", p.clone()).with_rest(p))
            .build()
            .unwrap();
        let ctx = ModuleCtxBuilder::new(CancellationToken::new()).build();
        let err = reg.run_rest_phase(&ctx, Router::new()).unwrap_err();
        assert!(matches!(err, RegistryError::RestRequiresHost));
    }

    #[tokio::test]
    async fn phases_run_in_order() {
        let log = Arc::new(Recorder::default());
        let host = probe("ingress", &log);
        let lights = probe("lights", &log);
        let reg = ModuleRegistry::builder()
            .register(
                ModuleEntry::new("lights", lights.clone())
                    .depends_on(&["ingress"])
                    .with_rest(lights.clone())
                    .with_stateful(lights),
            )
            .register(
                ModuleEntry::new("ingress", host.clone())
                    .with_rest_host(host.clone())
                    .with_stateful(host),
            )
            .build()
            .unwrap();

        let cancel = CancellationToken::new();
        let ctx = ModuleCtxBuilder::new(cancel.clone()).build();

        reg.run_init_phase(&ctx).await.unwrap();
        reg.run_rest_phase(&ctx, Router::new()).unwrap();
        reg.run_start_phase(cancel.clone()).await.unwrap();
        reg.run_stop_phase(cancel).await.unwrap();

        assert_eq!(
            log.take(),
            vec![
                "init:ingress",
                "init:lights",
                "prepare:ingress",
                "rest:lights",
                "finalize:ingress",
                "start:ingress",
                "start:lights",
                "stop:lights",
                "stop:ingress",
            ]
        );
    }
}
