use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use keel_di::{
    Component, Declaration, Inject, LifecycleState, MissingArgumentPolicy, Param, Setting,
};

pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self) -> Result<(), String>;
}

/// Connections to the primary database
pub struct ConnectionPool {
    size: u32,
    open: AtomicBool,
}

impl Component for ConnectionPool {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .constructor([Param::setting("pool.size", 4_u32)], |args| {
                Ok(ConnectionPool {
                    size: args.setting("pool.size")?,
                    open: AtomicBool::new(false),
                })
            })
            .provides(|pool| pool as Arc<dyn HealthCheck>);

        declaration
            .on(LifecycleState::Started)
            .run(|pool, _| async move {
                pool.open.store(true, Ordering::SeqCst);
                tracing::info!("Opened {} connections", pool.size);
                Ok(())
            });
        declaration
            .on(LifecycleState::Stopped)
            .run(|pool, _| async move {
                pool.open.store(false, Ordering::SeqCst);
                tracing::info!("Closed {} connections", pool.size);
                Ok(())
            });
    }
}

impl HealthCheck for ConnectionPool {
    fn name(&self) -> &'static str {
        "connection pool"
    }

    fn check(&self) -> Result<(), String> {
        match self.open.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err("pool is closed".to_string()),
        }
    }
}

/// In memory cache in front of the repository
#[derive(Default)]
pub struct Cache {
    capacity: Setting<u32>,
    warm: AtomicBool,
}

impl Component for Cache {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .default_constructor()
            .setting("cache.capacity", 128_u32, |cache| &cache.capacity)
            .provides(|cache| cache as Arc<dyn HealthCheck>);

        declaration
            .on(LifecycleState::Resolved)
            .run(|cache, _| async move {
                cache.warm.store(true, Ordering::SeqCst);
                tracing::info!("Warmed cache with capacity {}", *cache.capacity);
                Ok(())
            });
    }
}

impl HealthCheck for Cache {
    fn name(&self) -> &'static str {
        "cache"
    }

    fn check(&self) -> Result<(), String> {
        match self.warm.load(Ordering::SeqCst) {
            true => Ok(()),
            false => Err("cache is cold".to_string()),
        }
    }
}

/// Reads through the cache into the pool
pub struct Repository {
    pool: Arc<ConnectionPool>,
    cache: Inject<Cache>,
    queries: AtomicU32,
}

impl Component for Repository {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .constructor([Param::component::<ConnectionPool>()], |args| {
                Ok(Repository {
                    pool: args.component()?,
                    cache: Inject::new(),
                    queries: AtomicU32::new(0),
                })
            })
            .inject_optional(|repository| &repository.cache);

        // Runs only when an audit log is registered
        declaration
            .on(LifecycleState::Started)
            .param::<AuditLog>()
            .policy(MissingArgumentPolicy::SkipInvocation)
            .run(|repository, args| async move {
                let audit = args.component::<AuditLog>()?;
                audit.record(&format!("repository ready on {} connections", repository.pool.size));
                Ok(())
            });
    }
}

impl Repository {
    pub fn query(&self, key: &str) -> String {
        let count = self.queries.fetch_add(1, Ordering::SeqCst) + 1;
        let source = match self.cache.get() {
            Some(cache) if cache.warm.load(Ordering::SeqCst) => "cache",
            _ => "pool",
        };
        format!("{key} from {source} (query #{count})")
    }
}

/// Optional sink for audit entries
pub struct AuditLog;

impl AuditLog {
    pub fn record(&self, entry: &str) {
        tracing::info!(target: "audit", "{entry}");
    }
}
