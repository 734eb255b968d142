use std::{
    any::{Any, TypeId},
    sync::Arc,
};

/// Errors raised by user code (constructors, callbacks, proxies)
pub type DynError = Box<dyn std::error::Error + Send + Sync>;

/// Components may be shared between threads once the engine is built,
/// so anything injectable needs to be Send + Sync + 'static.
///
/// Unsized types are allowed, which is how `dyn Trait` keys are expressed.
pub trait Injectable: Send + Sync + 'static {}
impl<T: ?Sized + Send + Sync + 'static> Injectable for T {}

/// Live, shared value of a component
#[derive(Clone)]
pub struct Instance {
    pub info: TypeInfo,
    pub instance: Arc<dyn Any + Send + Sync + 'static>,
}

impl Instance {
    pub(crate) fn new<T: Injectable>(instance: T) -> Self {
        Self::from_arc(Arc::new(instance))
    }

    pub(crate) fn from_arc<T: Injectable>(instance: Arc<T>) -> Self {
        Instance {
            info: TypeInfo::of::<T>(),
            instance,
        }
    }

    pub fn downcast<T: Injectable>(&self) -> Result<Arc<T>, &'static str> {
        match Arc::downcast::<T>(self.instance.clone()) {
            Ok(downcasted) => Ok(downcasted),
            Err(_) => Err(self.info.type_name),
        }
    }
}

/// A resolved value, viewed through the key it was requested with.
///
/// Holds either an `Arc<Key>` for components or the plain value for settings.
pub struct Resolved {
    info: TypeInfo,
    value: Box<dyn Any + Send + Sync>,
}

impl Resolved {
    pub fn component<K: ?Sized + Injectable>(value: Arc<K>) -> Self {
        Resolved {
            info: TypeInfo::of::<K>(),
            value: Box::new(value),
        }
    }

    pub fn setting<V: Clone + Send + Sync + 'static>(value: V) -> Self {
        Resolved {
            info: TypeInfo::of::<V>(),
            value: Box::new(value),
        }
    }

    /// The type this value is viewed as
    pub fn info(&self) -> TypeInfo {
        self.info
    }

    /// Returns the component if it is viewed as `K`
    pub fn get<K: ?Sized + Injectable>(&self) -> Option<Arc<K>> {
        self.value.downcast_ref::<Arc<K>>().cloned()
    }

    /// Returns the setting if it holds a `V`
    pub fn value<V: Clone + 'static>(&self) -> Option<V> {
        self.value.downcast_ref::<V>().cloned()
    }
}

/// Views a concrete instance as one of its keys
pub(crate) type CastFn = Arc<dyn Fn(&Instance) -> Option<Resolved> + Send + Sync>;

pub(crate) fn self_cast<T: Injectable>() -> CastFn {
    Arc::new(|instance: &Instance| {
        instance
            .downcast::<T>()
            .ok()
            .map(Resolved::component::<T>)
    })
}

pub(crate) fn alias_cast<K, T>(cast: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static) -> CastFn
where
    K: ?Sized + Injectable,
    T: Injectable,
{
    Arc::new(move |instance: &Instance| {
        instance
            .downcast::<T>()
            .ok()
            .map(|concrete| Resolved::component::<K>(cast(concrete)))
    })
}

/// Type Name and Type Id
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub struct TypeInfo {
    pub type_name: &'static str,
    pub type_id: TypeId,
}
impl std::fmt::Display for TypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name)
    }
}
impl TypeInfo {
    pub fn of<T: 'static + ?Sized>() -> TypeInfo {
        TypeInfo {
            type_name: std::any::type_name::<T>(),
            type_id: TypeId::of::<T>(),
        }
    }

    /// Whether the type is declared in `module_path` or one of its submodules
    pub fn in_module(&self, module_path: &str) -> bool {
        let name = self.type_name.strip_prefix("dyn ").unwrap_or(self.type_name);
        match name.strip_prefix(module_path) {
            Some(rest) => rest.starts_with("::"),
            None => false,
        }
    }
}
