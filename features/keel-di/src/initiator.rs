use std::{any::TypeId, collections::HashMap, sync::Arc};

use keel_config::ParamOverrides;

use crate::{
    analyzer::DependencyEdge,
    args::Args,
    dependency_graph::BuildPlan,
    descriptor::{ComponentDescriptor, Param, ParamKind},
    errors::{DependencyGraphError, DependencyGraphErrors, EngineError},
    lifecycle::LifecycleState,
    proxy::{select_proxy, CapabilityProxy},
    registry::{Binding, Registry},
    scheduler::run_executions,
    types::{Instance, Resolved, TypeInfo},
};

/// A constructed component
pub(crate) struct Slot {
    pub descriptor: ComponentDescriptor,
    pub instance: Instance,
    pub proxy: Arc<dyn CapabilityProxy>,
    pub edges: Vec<DependencyEdge>,
    /// Per state, the slots that must reach the state first
    pub ordering: Vec<Vec<usize>>,
}

/// Every constructed component, indexed like the registry
pub(crate) struct Arena {
    pub slots: Vec<Slot>,
    pub bindings: HashMap<TypeId, Binding>,
    pub overrides: ParamOverrides,
}

impl Arena {
    /// The instance bound to `key`, viewed as `key`
    pub fn lookup(&self, key: TypeInfo) -> Option<Resolved> {
        let binding = self.bindings.get(&key.type_id)?;
        binding.view(&self.slots[binding.descriptor].instance)
    }

    pub fn concrete(&self, index: usize) -> TypeInfo {
        self.slots[index].descriptor.concrete
    }
}

/// Constructs every component in planned order.
///
/// Callbacks targeting [LifecycleState::Created] run directly after their owner is constructed.
/// Fields are left for the scheduler to inject.
pub(crate) async fn instantiate(
    registry: Registry,
    plan: BuildPlan,
    overrides: ParamOverrides,
    proxies: &[Arc<dyn CapabilityProxy>],
) -> Result<Arena, EngineError> {
    let proxies: Vec<Arc<dyn CapabilityProxy>> = registry
        .descriptors
        .iter()
        .map(|descriptor| select_proxy(proxies, descriptor.concrete))
        .collect();
    let mut instances: Vec<Option<Instance>> = vec![None; registry.descriptors.len()];

    let total = plan.order.len();
    for (position, &index) in plan.order.iter().enumerate() {
        let descriptor = &registry.descriptors[index];
        let component = descriptor.concrete;
        let constructor = &descriptor.constructors[plan.constructors[index]];

        let args = resolve_args(
            &registry.bindings,
            &instances,
            &overrides,
            component,
            constructor.params(),
        )?;

        let proxy = &proxies[index];
        let instance = proxy
            .construct(component, constructor, &args)
            .map_err(|error| EngineError::ConstructorFailed {
                component,
                error: Arc::new(error),
            })?;
        tracing::debug!(
            "Constructed instance of {} [{} of {total}]",
            instance.info.type_name,
            position + 1
        );
        instances[index] = Some(instance.clone());

        let lookup = |key: TypeInfo| lookup_in(&registry.bindings, &instances, key);
        run_executions(
            descriptor,
            &instance,
            proxy.as_ref(),
            LifecycleState::Created,
            lookup,
        )
        .await?;
    }

    let (descriptors, bindings) = registry.into_parts();
    let mut slots = Vec::with_capacity(descriptors.len());
    let parts = descriptors
        .into_iter()
        .zip(instances)
        .zip(proxies)
        .zip(plan.edges);
    for (index, (((descriptor, instance), proxy), edges)) in parts.enumerate() {
        let Some(instance) = instance else {
            return Err(DependencyGraphErrors {
                errors: vec![DependencyGraphError::UnresolvableConstructor(
                    descriptor.concrete,
                )],
            }
            .into());
        };

        let ordering = LifecycleState::ALL
            .iter()
            .map(|&state| {
                edges
                    .iter()
                    .filter(|edge| edge.orders_transition(state))
                    .filter_map(|edge| bindings.get(&edge.dependency.type_id))
                    .map(|binding| binding.descriptor)
                    .filter(|&dependency| dependency != index)
                    .collect()
            })
            .collect();

        slots.push(Slot {
            descriptor,
            instance,
            proxy,
            edges,
            ordering,
        });
    }

    Ok(Arena {
        slots,
        bindings,
        overrides,
    })
}

fn lookup_in(
    bindings: &HashMap<TypeId, Binding>,
    instances: &[Option<Instance>],
    key: TypeInfo,
) -> Option<Resolved> {
    let binding = bindings.get(&key.type_id)?;
    let instance = instances[binding.descriptor].as_ref()?;
    binding.view(instance)
}

/// Resolves constructor parameters from constructed instances and the config overlay
fn resolve_args(
    bindings: &HashMap<TypeId, Binding>,
    instances: &[Option<Instance>],
    overrides: &ParamOverrides,
    component: TypeInfo,
    params: &[Param],
) -> Result<Args, EngineError> {
    let mut args = Args::default();
    for param in params {
        match &param.kind {
            ParamKind::Component { key, required } => {
                match lookup_in(bindings, instances, *key) {
                    Some(value) => args.insert_component(*key, value),
                    None if *required => {
                        return Err(EngineError::MissingRequiredDependency {
                            dependency: *key,
                            required_by: component,
                            state: LifecycleState::Created,
                        })
                    }
                    None => tracing::trace!("Optional {key} of {component} is not bound"),
                }
            }
            ParamKind::Setting { name, resolve, .. } => {
                let value =
                    resolve(overrides).map_err(|error| EngineError::Config { component, error })?;
                args.insert_setting(name, value);
            }
        }
    }
    Ok(args)
}
