use std::{
    any::type_name,
    fmt::Debug,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use crate::{
    analyzer::DependencyEdge,
    errors::{EngineError, LookupError},
    initiator::Arena,
    lifecycle::LifecycleState,
    scheduler::Scheduler,
    types::{Injectable, TypeInfo},
};

/// Running engine holding every live component.
///
/// Cheap to clone, all clones share the same components.
#[derive(Clone)]
pub struct Engine(Arc<EngineInner>);

struct EngineInner {
    arena: Arena,
    states: Mutex<Vec<LifecycleState>>,
    stopped: AtomicBool,
}

impl Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states = self.states();
        let mut map = f.debug_struct("Engine");
        for (slot, state) in self.0.arena.slots.iter().zip(states) {
            map.field(slot.descriptor.concrete.type_name, &state);
        }
        map.finish()
    }
}

impl Engine {
    pub(crate) fn new(arena: Arena, states: Vec<LifecycleState>) -> Self {
        Engine(Arc::new(EngineInner {
            arena,
            states: Mutex::new(states),
            stopped: AtomicBool::new(false),
        }))
    }

    /// The component bound to `K`
    pub fn get<K: ?Sized + Injectable>(&self) -> Option<Arc<K>> {
        self.0.arena.lookup(TypeInfo::of::<K>())?.get::<K>()
    }

    /// The component bound to `K`, or an error naming the key
    pub fn require<K: ?Sized + Injectable>(&self) -> Result<Arc<K>, LookupError> {
        let resolved = self
            .0
            .arena
            .lookup(TypeInfo::of::<K>())
            .ok_or(LookupError::NotFound(type_name::<K>()))?;

        resolved.get::<K>().ok_or(LookupError::DowncastFailed {
            required_type: type_name::<K>(),
            actual_type: resolved.info().type_name,
        })
    }

    /// Every component that can be viewed as `K`, in registration order.
    ///
    /// Unlike [Engine::get] this includes components that are not bound to `K`, such as
    /// several implementations declaring the same capability through
    /// [Declaration::provides](crate::Declaration::provides).
    pub fn stream<K: ?Sized + Injectable>(&self) -> Vec<Arc<K>> {
        let key = TypeInfo::of::<K>();
        self.0
            .arena
            .slots
            .iter()
            .filter_map(|slot| {
                let cast = slot.descriptor.cast_for(key)?;
                cast(&slot.instance)?.get::<K>()
            })
            .collect()
    }

    /// Current lifecycle state of the component bound to `K`
    pub fn state_of<K: ?Sized + Injectable>(&self) -> Option<LifecycleState> {
        let binding = self.0.arena.bindings.get(&TypeInfo::of::<K>().type_id)?;
        self.states().get(binding.descriptor).copied()
    }

    /// Concrete types of all components, in registration order
    pub fn components(&self) -> Vec<TypeInfo> {
        (0..self.0.arena.slots.len())
            .map(|index| self.0.arena.concrete(index))
            .collect()
    }

    /// Dependencies between the components
    pub fn edges(&self) -> Vec<DependencyEdge> {
        self.0
            .arena
            .slots
            .iter()
            .flat_map(|slot| slot.edges.iter().copied())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.arena.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.arena.slots.is_empty()
    }

    /// Drives every component to [LifecycleState::Stopped].
    ///
    /// Components stop in dependency order, the same order they started in.
    /// Only the first call does anything, later calls return `Ok` right away.
    pub async fn stop(&self) -> Result<(), EngineError> {
        if self.0.stopped.swap(true, Ordering::SeqCst) {
            tracing::debug!("Engine was already stopped");
            return Ok(());
        }

        tracing::info!("Stopping {} components", self.len());
        let mut states = self.states();
        let result = Scheduler::new(&self.0.arena)
            .advance(&mut states, LifecycleState::Stopped)
            .await;
        *self.lock_states() = states;

        match &result {
            Ok(()) => tracing::info!("All components stopped"),
            Err(error) => tracing::error!("Stopping failed: {error}"),
        }
        result
    }

    /// [Engine::stop] on the current thread
    pub fn stop_blocking(&self) -> Result<(), EngineError> {
        futures::executor::block_on(self.stop())
    }

    fn states(&self) -> Vec<LifecycleState> {
        self.lock_states().clone()
    }

    fn lock_states(&self) -> std::sync::MutexGuard<'_, Vec<LifecycleState>> {
        self.0.states.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
