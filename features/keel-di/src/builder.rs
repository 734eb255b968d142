use std::sync::Arc;

use keel_config::ParamOverrides;

use crate::{
    component::Component,
    container::Engine,
    dependency_graph::BuildPlan,
    descriptor::{Bundle, ComponentDescriptor, ExecutionDescriptor},
    errors::{DependencyGraphError, DependencyGraphErrors, EngineError},
    initiator::instantiate,
    lifecycle::LifecycleState,
    proxy::CapabilityProxy,
    registry::Registry,
    scheduler::Scheduler,
    types::Injectable,
};

/// Collects components, callbacks, config overrides and proxies, then builds the [Engine].
///
/// Building runs in phases:
/// 1. Planning: constructors are selected and the dependency graph is validated
/// 2. Instantiation: every component is constructed, dependencies first
/// 3. Lifecycle: every component is driven up to [LifecycleState::Started]
///
/// A failure in any phase aborts the build and no engine is returned.
pub struct EngineBuilder {
    registry: Registry,
    /// Issues found while registering, reported by [EngineBuilder::build]
    errors: Vec<DependencyGraphError>,
    /// Attached once every component is registered, so they follow the final bindings
    executions: Vec<ExecutionDescriptor>,
    overrides: ParamOverrides,
    proxies: Vec<Arc<dyn CapabilityProxy>>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineBuilder {
    pub fn new() -> Self {
        EngineBuilder {
            registry: Registry::default(),
            errors: Vec::new(),
            executions: Vec::new(),
            overrides: ParamOverrides::new(),
            proxies: Vec::new(),
        }
    }
}

impl EngineBuilder {
    /// Registers `T`, bound to its own type
    pub fn register<T: Component>(self) -> Self {
        self.register_descriptor(ComponentDescriptor::of::<T>())
    }

    /// Registers `T` bound to the alias `K`.
    ///
    /// The last registration under a key wins, unless the bound component declared
    /// `overwrite(false)`, or `K` is itself a registered type. `T` stays resolvable by its
    /// own type either way.
    pub fn register_as<K, T>(self, cast: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static) -> Self
    where
        K: ?Sized + Injectable,
        T: Component,
    {
        self.register_descriptor(ComponentDescriptor::aliased::<K, T>(cast))
    }

    pub fn register_descriptor(mut self, descriptor: ComponentDescriptor) -> Self {
        if descriptor.constructors.is_empty() {
            tracing::warn!(
                "{} has neither a constructor nor a supplier",
                descriptor.concrete
            );
            self.errors
                .push(DependencyGraphError::UnresolvableConstructor(
                    descriptor.concrete,
                ));
            return self;
        }
        self.registry.register(descriptor);
        self
    }

    /// Registers every component of the bundle
    pub fn register_bundle<B: Bundle>(self) -> Self {
        let injectables = B::injectables();
        tracing::debug!(
            "Registering bundle {} with {} components",
            std::any::type_name::<B>(),
            injectables.len()
        );
        injectables
            .into_iter()
            .fold(self, |builder, descriptor| builder.register_descriptor(descriptor))
    }

    /// Registers an already constructed value
    pub fn add_instance<T: Injectable>(self, instance: T) -> Self {
        self.register_descriptor(ComponentDescriptor::instance(instance))
    }

    /// Overrides the config parameter `name`, replacing any earlier override
    pub fn override_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name, value);
        self
    }

    pub fn override_params<K, V>(mut self, overrides: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides.extend(overrides);
        self
    }

    /// Adds a callback to whatever its owner key is bound to once registration is done
    pub fn add_execution(mut self, execution: ExecutionDescriptor) -> Self {
        self.executions.push(execution);
        self
    }

    /// Adds a proxy, proxies are asked in the order they were added
    pub fn set_proxy(mut self, proxy: impl CapabilityProxy + 'static) -> Self {
        self.proxies.push(Arc::new(proxy));
        self
    }

    pub async fn build(self) -> Result<Engine, EngineError> {
        let EngineBuilder {
            mut registry,
            mut errors,
            executions,
            overrides,
            proxies,
        } = self;

        tracing::debug!(
            "Building engine with {} components, {} callbacks, {} overrides and {} proxies",
            registry.descriptors.len(),
            executions.len(),
            overrides.len(),
            proxies.len()
        );

        for execution in executions {
            if let Err(error) = registry.attach_execution(execution) {
                errors.push(error);
            }
        }

        let plan = match BuildPlan::new(&registry) {
            Ok(plan) if errors.is_empty() => plan,
            Ok(_) => return Err(Self::graph_failure(errors)),
            Err(mut graph) => {
                errors.append(&mut graph.errors);
                return Err(Self::graph_failure(errors));
            }
        };

        let arena = instantiate(registry, plan, overrides, &proxies).await?;

        let mut states = vec![LifecycleState::Created; arena.slots.len()];
        Scheduler::new(&arena)
            .advance(&mut states, LifecycleState::Started)
            .await?;

        tracing::info!("Engine started with {} components", states.len());
        Ok(Engine::new(arena, states))
    }

    /// [EngineBuilder::build] on the current thread
    pub fn build_blocking(self) -> Result<Engine, EngineError> {
        futures::executor::block_on(self.build())
    }

    fn graph_failure(errors: Vec<DependencyGraphError>) -> EngineError {
        let errors = DependencyGraphErrors { errors };
        tracing::error!("{errors}");
        errors.into()
    }
}
