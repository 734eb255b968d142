use std::{
    any::type_name,
    fmt::Debug,
    ops::Deref,
    sync::{Arc, OnceLock},
};

use crate::types::Injectable;

/// Field filled in after construction.
///
/// The engine injects it when the owning component reaches
/// [LifecycleState::Initialized](crate::LifecycleState::Initialized), which is what allows two
/// components to reference each other.
///
/// ### Panics
///
/// Dereferencing panics if the field is accessed before injection, or if it was declared
/// optional and nothing was bound. Use [Inject::get] when that can happen.
pub struct Inject<D: ?Sized + Injectable> {
    slot: OnceLock<Arc<D>>,
}

impl<D: ?Sized + Injectable> Inject<D> {
    pub fn new() -> Self {
        Inject {
            slot: OnceLock::new(),
        }
    }

    /// Accesses the injected value, `None` before injection
    pub fn get(&self) -> Option<&Arc<D>> {
        self.slot.get()
    }

    pub fn is_injected(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Returns the value back if the slot was already filled
    pub(crate) fn fill(&self, value: Arc<D>) -> Result<(), Arc<D>> {
        self.slot.set(value)
    }
}

impl<D: ?Sized + Injectable> Default for Inject<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: ?Sized + Injectable> Deref for Inject<D> {
    type Target = Arc<D>;

    fn deref(&self) -> &Self::Target {
        self.get().unwrap_or_else(|| {
            panic!(
                "Field of type '{}' accessed before it was injected",
                type_name::<D>()
            )
        })
    }
}

impl<D: ?Sized + Injectable> Debug for Inject<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = if self.is_injected() {
            "injected"
        } else {
            "pending"
        };
        f.debug_tuple("Inject")
            .field(&type_name::<D>())
            .field(&state)
            .finish()
    }
}

/// Config field filled in after construction, together with [Inject] fields
pub struct Setting<V> {
    slot: OnceLock<V>,
}

impl<V> Setting<V> {
    pub fn new() -> Self {
        Setting {
            slot: OnceLock::new(),
        }
    }

    pub fn get(&self) -> Option<&V> {
        self.slot.get()
    }

    pub(crate) fn fill(&self, value: V) -> Result<(), V> {
        self.slot.set(value)
    }
}

impl<V> Default for Setting<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Deref for Setting<V> {
    type Target = V;

    fn deref(&self) -> &Self::Target {
        self.get().unwrap_or_else(|| {
            panic!(
                "Setting of type '{}' accessed before it was resolved",
                type_name::<V>()
            )
        })
    }
}

impl<V: Debug> Debug for Setting<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Setting").field(&self.get()).finish()
    }
}
