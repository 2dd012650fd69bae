//! One process lifetime of the sandboxed toolchain.
//!
//! The session owns the virtual filesystem and the lock registry, so both
//! have exactly one owner and a well-defined reset point instead of living
//! as implicit global state. Construction seeds the base namespace and
//! clears the registry; `load` must complete before the toolchain's first
//! read.

use std::time::Duration;

use toolhost_vfs::{base_layout, ArchiveSource, LoadError, Loader, MountLayout, VfsError, VfsStore};
use tracing::debug;

use crate::bridge::ExecBridge;
use crate::error::{ExecError, LookupError};
use crate::host::ExecutionHost;
use crate::lock::{LockPolicy, LockRegistry};
use crate::lookup::lookup_path;
use crate::request::ExecRequest;

/// Session-wide configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lock registry policy; an explicit choice, never inferred.
    pub lock_policy: LockPolicy,
    /// Where archives are staged.
    pub layout: MountLayout,
    /// Reserved inactivity delay. Carried as configuration only; nothing
    /// enforces it and callers must not assume timeout semantics.
    pub wait_delay: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            lock_policy: LockPolicy::Strict,
            layout: MountLayout::default(),
            wait_delay: None,
        }
    }
}

/// Which archives a session loads at startup.
#[derive(Debug, Clone, Default)]
pub struct LoadPlan {
    /// Standard-library archives, staged in order (later wins).
    pub stdlib: Vec<String>,
    /// The prebuilt tool-binary archive, if any.
    pub tools: Option<String>,
    /// Cache shard digits to load.
    pub cache_shards: Vec<char>,
}

/// Owns the store, the lock registry, and the bridge for one process.
pub struct Session<H> {
    config: SessionConfig,
    store: VfsStore,
    locks: LockRegistry,
    bridge: ExecBridge<H>,
}

impl<H: ExecutionHost> Session<H> {
    /// Create a session: seed the base namespace, reset the lock registry.
    pub fn new(host: H, config: SessionConfig) -> Result<Self, VfsError> {
        let mut store = VfsStore::new();
        base_layout(&mut store, &config.layout)?;
        let mut locks = LockRegistry::new(config.lock_policy);
        locks.reset();
        Ok(Self {
            config,
            store,
            locks,
            bridge: ExecBridge::new(host),
        })
    }

    /// Stage every archive the plan names.
    ///
    /// Aborts on the first transport or decode failure; the toolchain must
    /// never start against a partially populated store.
    pub fn load(
        &mut self,
        source: &mut dyn ArchiveSource,
        plan: &LoadPlan,
    ) -> Result<(), LoadError> {
        let mut loader = Loader::new(&mut self.store, self.config.layout.clone());
        for name in &plan.stdlib {
            loader.stage_stdlib(source, name)?;
        }
        if let Some(tools) = &plan.tools {
            loader.stage_tools(source, tools)?;
        }
        for &shard in &plan.cache_shards {
            loader.stage_cache_shard(source, shard)?;
        }
        debug!(entries = self.store.len(), "session load complete");
        Ok(())
    }

    /// Run a child program through the execution bridge.
    pub async fn run(&mut self, request: ExecRequest) -> Result<(), ExecError> {
        self.bridge.run(request).await
    }

    /// Resolve an executable by absolute path.
    pub fn lookup(&self, name: &str) -> Result<String, LookupError> {
        lookup_path(&self.store, name)
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &VfsStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut VfsStore {
        &mut self.store
    }

    pub fn locks(&self) -> &LockRegistry {
        &self.locks
    }

    pub fn locks_mut(&mut self) -> &mut LockRegistry {
        &mut self.locks
    }
}
