use std::{any::type_name, future::Future, marker::PhantomData, sync::Arc};

use keel_config::ConfigValue;

use crate::{
    args::Args,
    descriptor::{AttachedExecution, Capability, Constructor, Execution, FieldInjection, Param},
    lifecycle::{LifecycleState, MissingArgumentPolicy},
    slots::{Inject, Setting},
    types::{alias_cast, self_cast, CastFn, DynError, Injectable, Instance, Resolved, TypeInfo},
};

/// A type the engine can construct, inject and drive through the lifecycle.
///
/// Everything the engine needs to know is written down in [Component::declare].
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use keel_di::{Component, Declaration, Inject, LifecycleState, Param};
///
/// struct Pool {
///     size: u32,
/// }
/// impl Component for Pool {
///     fn declare(declaration: &mut Declaration<Self>) {
///         declaration.constructor([Param::setting("pool.size", 4_u32)], |args| {
///             Ok(Pool { size: args.setting("pool.size")? })
///         });
///     }
/// }
///
/// #[derive(Default)]
/// struct Repository {
///     pool: Inject<Pool>,
/// }
/// impl Component for Repository {
///     fn declare(declaration: &mut Declaration<Self>) {
///         declaration
///             .default_constructor()
///             .inject(|repository| &repository.pool);
///         declaration
///             .on(LifecycleState::Started)
///             .run(|repository, _args| async move {
///                 assert!(repository.pool.size > 0);
///                 Ok(())
///             });
///     }
/// }
/// ```
pub trait Component: Injectable + Sized {
    fn declare(declaration: &mut Declaration<Self>);
}

/// Explicit description of a component, filled by [Component::declare]
pub struct Declaration<T: Injectable> {
    pub(crate) constructors: Vec<Constructor>,
    pub(crate) supplier: Option<Constructor>,
    pub(crate) fields: Vec<FieldInjection>,
    pub(crate) executions: Vec<AttachedExecution>,
    pub(crate) capabilities: Vec<Capability>,
    pub(crate) overwrite: bool,
    /// Number of executions inherited through [Declaration::extends], these stay in front
    inherited: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Injectable> Declaration<T> {
    pub(crate) fn new() -> Self {
        Declaration {
            constructors: Vec::new(),
            supplier: None,
            fields: Vec::new(),
            executions: Vec::new(),
            capabilities: Vec::new(),
            overwrite: true,
            inherited: 0,
            _marker: PhantomData,
        }
    }

    /// Whether later registrations under the same key replace this one, `true` by default
    pub fn overwrite(&mut self, overwrite: bool) -> &mut Self {
        self.overwrite = overwrite;
        self
    }

    /// Adds a constructor.
    ///
    /// The engine invokes the constructor with the most parameters it can resolve,
    /// earlier declarations win ties.
    pub fn constructor<F>(&mut self, params: impl IntoIterator<Item = Param>, build: F) -> &mut Self
    where
        F: Fn(&Args) -> Result<T, DynError> + Send + Sync + 'static,
    {
        self.constructors
            .push(Constructor::new(params.into_iter().collect(), build));
        self
    }

    /// Adds the zero-argument constructor `T::default`
    pub fn default_constructor(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.constructor([], |_| Ok(T::default()))
    }

    /// Supplies instances from `supply`, the constructors are ignored
    pub fn supplier<F>(&mut self, supply: F) -> &mut Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.supplier = Some(Constructor::new(Vec::new(), move |_| Ok(supply())));
        self
    }

    /// Injects the component bound to `D` once `T` reaches [LifecycleState::Initialized]
    pub fn inject<D: ?Sized + Injectable>(&mut self, slot: fn(&T) -> &Inject<D>) -> &mut Self {
        self.inject_param(Param::component::<D>(), slot)
    }

    /// Like [Declaration::inject], but leaves the field empty if nothing is bound to `D`
    pub fn inject_optional<D: ?Sized + Injectable>(
        &mut self,
        slot: fn(&T) -> &Inject<D>,
    ) -> &mut Self {
        self.inject_param(Param::optional::<D>(), slot)
    }

    fn inject_param<D: ?Sized + Injectable>(
        &mut self,
        target: Param,
        slot: fn(&T) -> &Inject<D>,
    ) -> &mut Self {
        let inject = move |owner: &Instance, value: Resolved| -> Result<(), DynError> {
            let owner = owner.downcast::<T>().map_err(|actual| {
                format!("Expected an owner of type '{}', got '{actual}'", type_name::<T>())
            })?;
            let value = value
                .get::<D>()
                .ok_or_else(|| format!("Value is a '{}', not a '{}'", value.info(), type_name::<D>()))?;
            slot(&owner)
                .fill(value)
                .map_err(|_| format!("'{}' was injected twice", type_name::<D>()))?;
            Ok(())
        };

        self.fields.push(FieldInjection {
            target,
            inject: Arc::new(inject),
        });
        self
    }

    /// Config field, resolved from overrides or `default` when `T` reaches [LifecycleState::Initialized]
    pub fn setting<V: ConfigValue>(
        &mut self,
        name: impl Into<String>,
        default: V,
        slot: fn(&T) -> &Setting<V>,
    ) -> &mut Self {
        let inject = move |owner: &Instance, value: Resolved| -> Result<(), DynError> {
            let owner = owner.downcast::<T>().map_err(|actual| {
                format!("Expected an owner of type '{}', got '{actual}'", type_name::<T>())
            })?;
            let value = value
                .value::<V>()
                .ok_or_else(|| format!("Value is a '{}', not a '{}'", value.info(), type_name::<V>()))?;
            slot(&owner)
                .fill(value)
                .map_err(|_| "Setting was resolved twice".to_string())?;
            Ok(())
        };

        self.fields.push(FieldInjection {
            target: Param::setting(name, default),
            inject: Arc::new(inject),
        });
        self
    }

    /// Makes `T` visible as `K` to [Engine::stream](crate::Engine::stream), without binding `K`
    pub fn provides<K: ?Sized + Injectable>(
        &mut self,
        cast: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static,
    ) -> &mut Self {
        self.capabilities.push(Capability {
            key: TypeInfo::of::<K>(),
            cast: alias_cast(cast),
        });
        self
    }

    /// Inherits the callbacks and capabilities of `P`.
    ///
    /// `parent` returns the part of `T` that is a `P`. The callbacks of `P` run
    /// before those of `T` for the same state.
    pub fn extends<P: Component>(&mut self, parent: fn(&T) -> Arc<P>) -> &mut Self {
        let declared = Declaration::<P>::declared();

        let to_parent = move |instance: &Instance| -> Option<Instance> {
            let child = instance.downcast::<T>().ok()?;
            Some(Instance::from_arc(parent(&child)))
        };
        let project = |view: CastFn| -> CastFn {
            Arc::new(move |instance: &Instance| view(&to_parent(instance)?))
        };

        self.capabilities.push(Capability {
            key: TypeInfo::of::<P>(),
            cast: project(self_cast::<P>()),
        });
        for capability in declared.capabilities {
            self.capabilities.push(Capability {
                key: capability.key,
                cast: project(capability.cast),
            });
        }

        for attached in declared.executions {
            let execution = AttachedExecution {
                view: project(attached.view),
                execution: attached.execution,
            };
            self.executions.insert(self.inherited, execution);
            self.inherited += 1;
        }
        self
    }

    /// Starts a callback run when `T` reaches `state`
    pub fn on(&mut self, state: LifecycleState) -> ExecutionBuilder<'_, T> {
        ExecutionBuilder {
            declaration: self,
            execution: Execution::at(state),
        }
    }

    pub(crate) fn declared() -> Self
    where
        T: Component,
    {
        let mut declaration = Self::new();
        T::declare(&mut declaration);
        declaration
    }
}

/// Callback builder returned by [Declaration::on]
pub struct ExecutionBuilder<'a, T: Injectable> {
    declaration: &'a mut Declaration<T>,
    execution: Execution<T>,
}

impl<T: Injectable> ExecutionBuilder<'_, T> {
    /// Requires the component bound to `D`
    pub fn param<D: ?Sized + Injectable>(mut self) -> Self {
        self.execution = self.execution.param::<D>();
        self
    }

    pub fn policy(mut self, policy: MissingArgumentPolicy) -> Self {
        self.execution = self.execution.policy(policy);
        self
    }

    pub fn run<F, Fut>(self, action: F)
    where
        F: Fn(Arc<T>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        let execution = self.execution.run(action);
        self.declaration.executions.push(AttachedExecution {
            view: self_cast::<T>(),
            execution,
        });
    }
}
