use std::sync::Arc;

use futures::{stream::FuturesUnordered, StreamExt};

use crate::{
    args::Args,
    descriptor::{ComponentDescriptor, ParamKind},
    errors::EngineError,
    initiator::{Arena, Slot},
    lifecycle::{LifecycleState, MissingArgumentPolicy},
    proxy::CapabilityProxy,
    types::{Instance, Resolved, TypeInfo},
};

/// Runs the callbacks `descriptor` declared for `state`, in declaration order.
///
/// Parents are declared first, so their callbacks run before the child's.
pub(crate) async fn run_executions(
    descriptor: &ComponentDescriptor,
    instance: &Instance,
    proxy: &dyn CapabilityProxy,
    state: LifecycleState,
    lookup: impl Fn(TypeInfo) -> Option<Resolved>,
) -> Result<(), EngineError> {
    let component = descriptor.concrete;

    'executions: for attached in descriptor
        .executions
        .iter()
        .filter(|attached| attached.execution.state == state)
    {
        let execution = &attached.execution;

        let mut args = Args::default();
        for &dependency in &execution.params {
            match lookup(dependency) {
                Some(value) => args.insert_component(dependency, value),
                None => match execution.policy {
                    MissingArgumentPolicy::FailBuild => {
                        return Err(EngineError::MissingRequiredDependency {
                            dependency,
                            required_by: component,
                            state,
                        })
                    }
                    MissingArgumentPolicy::SkipInvocation => {
                        tracing::warn!(
                            "Skipping {state} callback of {component}, '{dependency}' is missing"
                        );
                        continue 'executions;
                    }
                },
            }
        }

        let Some(owner) = (attached.view)(instance) else {
            return Err(EngineError::ExecutionFailed {
                owner: component,
                state,
                error: Arc::new(
                    format!("'{component}' cannot be viewed as '{}'", execution.owner).into(),
                ),
            });
        };

        tracing::trace!(
            "Running {state} callback of {} on {component}",
            execution.owner
        );
        proxy
            .invoke(component, execution, owner, args)
            .await
            .map_err(|error| {
                tracing::error!("{state} callback of {component} failed: {error}");
                EngineError::ExecutionFailed {
                    owner: component,
                    state,
                    error: Arc::new(error),
                }
            })?;
    }

    Ok(())
}

/// Moves constructed components through the lifecycle.
///
/// Every component reaches a state before any component moves past it. Within a state, a
/// component transitions once the components it depends on for that state have transitioned.
/// Components that are ready at the same time transition concurrently.
pub(crate) struct Scheduler<'a> {
    arena: &'a Arena,
}

impl<'a> Scheduler<'a> {
    pub fn new(arena: &'a Arena) -> Self {
        Scheduler { arena }
    }

    /// Advances every component in `states` up to and including `target`
    pub async fn advance(
        &self,
        states: &mut [LifecycleState],
        target: LifecycleState,
    ) -> Result<(), EngineError> {
        let Some(&lowest) = states.iter().min() else {
            return Ok(());
        };

        let mut next = lowest.next();
        while let Some(state) = next.filter(|&state| state <= target) {
            self.advance_to(states, state).await?;
            next = state.next();
        }
        Ok(())
    }

    async fn advance_to(
        &self,
        states: &mut [LifecycleState],
        state: LifecycleState,
    ) -> Result<(), EngineError> {
        let Some(previous) = state.previous() else {
            return Ok(());
        };

        let mut wave = 0;
        loop {
            let pending: Vec<usize> = (0..states.len())
                .filter(|&index| states[index] < state)
                .collect();
            if pending.is_empty() {
                tracing::debug!("All {} components reached {state}", states.len());
                return Ok(());
            }

            let ready: Vec<usize> = pending
                .iter()
                .copied()
                .filter(|&index| {
                    states[index] == previous
                        && self.arena.slots[index].ordering[state.index()]
                            .iter()
                            .all(|&dependency| states[dependency] >= state)
                })
                .collect();

            if ready.is_empty() {
                let blocked: Vec<TypeInfo> = pending
                    .iter()
                    .map(|&index| self.arena.concrete(index))
                    .collect();
                tracing::error!("Transition to {state} is deadlocked on {blocked:?}");
                return Err(EngineError::DeadlockedTransition { state, blocked });
            }

            wave += 1;
            tracing::trace!(
                "{state} wave {wave}: {} ready, {} pending",
                ready.len(),
                pending.len()
            );

            let mut transitions: FuturesUnordered<_> = ready
                .into_iter()
                .map(move |index| self.transition(index, state))
                .collect();
            while let Some(result) = transitions.next().await {
                let index = result?;
                states[index] = state;
            }
        }
    }

    async fn transition(&self, index: usize, state: LifecycleState) -> Result<usize, EngineError> {
        let slot = &self.arena.slots[index];
        if state == LifecycleState::Initialized {
            self.inject_fields(slot)?;
        }

        run_executions(
            &slot.descriptor,
            &slot.instance,
            slot.proxy.as_ref(),
            state,
            |key| self.arena.lookup(key),
        )
        .await?;

        tracing::trace!("{} reached {state}", slot.descriptor.concrete);
        Ok(index)
    }

    /// Fills the deferred fields of a component
    fn inject_fields(&self, slot: &Slot) -> Result<(), EngineError> {
        let component = slot.descriptor.concrete;

        for field in &slot.descriptor.fields {
            let value = match &field.target.kind {
                ParamKind::Component { key, required } => match self.arena.lookup(*key) {
                    Some(value) => value,
                    None if *required => {
                        return Err(EngineError::MissingRequiredDependency {
                            dependency: *key,
                            required_by: component,
                            state: LifecycleState::Initialized,
                        })
                    }
                    None => {
                        tracing::trace!("Leaving optional field {key} of {component} empty");
                        continue;
                    }
                },
                ParamKind::Setting { resolve, .. } => resolve(&self.arena.overrides)
                    .map_err(|error| EngineError::Config { component, error })?,
            };

            tracing::trace!("Injecting {} into {component}", field.target.describe());
            slot.proxy
                .set_field(component, field, &slot.instance, value)
                .map_err(|error| EngineError::FieldInjectionFailed {
                    component,
                    field: field.target.describe(),
                    error: Arc::new(error),
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use keel_config::ParamOverrides;

    use super::*;
    use crate::{
        component::{Component, Declaration},
        dependency_graph::BuildPlan,
        descriptor::Param,
        initiator::instantiate,
        registry::Registry,
    };

    static CALLS: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

    struct Disk;
    impl Component for Disk {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.supplier(|| Disk);
            declaration.on(LifecycleState::Started).run(|_, _| async {
                CALLS.lock().unwrap().push("disk");
                Ok(())
            });
        }
    }

    struct Index;
    impl Component for Index {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.constructor([Param::component::<Disk>()], |_| Ok(Index));
            declaration.on(LifecycleState::Started).run(|_, _| async {
                CALLS.lock().unwrap().push("index");
                Ok(())
            });
        }
    }

    #[test]
    fn dependencies_transition_first() {
        let mut registry = Registry::default();
        registry.register(ComponentDescriptor::of::<Index>());
        registry.register(ComponentDescriptor::of::<Disk>());
        let plan = BuildPlan::new(&registry).unwrap();

        futures::executor::block_on(async {
            let arena = instantiate(registry, plan, ParamOverrides::new(), &[])
                .await
                .unwrap();
            let mut states = vec![LifecycleState::Created; arena.slots.len()];

            Scheduler::new(&arena)
                .advance(&mut states, LifecycleState::Resolved)
                .await
                .unwrap();
            assert_eq!(states, vec![LifecycleState::Resolved; 2]);
            assert!(CALLS.lock().unwrap().is_empty());

            Scheduler::new(&arena)
                .advance(&mut states, LifecycleState::Started)
                .await
                .unwrap();
        });

        assert_eq!(*CALLS.lock().unwrap(), vec!["disk", "index"]);
    }

    struct Left;
    impl Component for Left {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.supplier(|| Left);
            declaration
                .on(LifecycleState::Resolved)
                .param::<Right>()
                .run(|_, _| async { Ok(()) });
        }
    }

    struct Right;
    impl Component for Right {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.supplier(|| Right);
            declaration
                .on(LifecycleState::Resolved)
                .param::<Left>()
                .run(|_, _| async { Ok(()) });
        }
    }

    #[test]
    fn mutually_waiting_components_deadlock() {
        let mut registry = Registry::default();
        registry.register(ComponentDescriptor::of::<Left>());
        registry.register(ComponentDescriptor::of::<Right>());
        let plan = BuildPlan::new(&registry).unwrap();

        let result = futures::executor::block_on(async {
            let arena = instantiate(registry, plan, ParamOverrides::new(), &[])
                .await
                .unwrap();
            let mut states = vec![LifecycleState::Created; arena.slots.len()];
            let result = Scheduler::new(&arena)
                .advance(&mut states, LifecycleState::Started)
                .await;
            assert_eq!(states, vec![LifecycleState::Initialized; 2]);
            result
        });

        let Err(EngineError::DeadlockedTransition { state, blocked }) = result else {
            panic!("expected a deadlock");
        };
        assert_eq!(state, LifecycleState::Resolved);
        assert_eq!(blocked, vec![TypeInfo::of::<Left>(), TypeInfo::of::<Right>()]);
    }
}
