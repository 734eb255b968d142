use std::{
    any::TypeId,
    collections::{hash_map::Entry, HashMap},
};

use crate::{
    descriptor::{AttachedExecution, Capability, ComponentDescriptor, ExecutionDescriptor},
    errors::DependencyGraphError,
    types::{CastFn, Instance, Resolved, TypeInfo},
};

/// Key bound to a descriptor, with the cast viewing its instance as the key
#[derive(Clone)]
pub(crate) struct Binding {
    pub descriptor: usize,
    pub cast: CastFn,
}

impl Binding {
    pub fn view(&self, instance: &Instance) -> Option<Resolved> {
        (self.cast)(instance)
    }
}

/// One descriptor per concrete type, and the binding of every key
#[derive(Default)]
pub(crate) struct Registry {
    pub descriptors: Vec<ComponentDescriptor>,
    pub bindings: HashMap<TypeId, Binding>,
    by_concrete: HashMap<TypeId, usize>,
}

impl Registry {
    /// Inserts the descriptor and binds its key according to the overwrite policy.
    ///
    /// Registering a concrete type again replaces its descriptor, keeping the keys it was
    /// bound to before. An alias key that is itself a registered concrete type is never
    /// taken over.
    pub fn register(&mut self, descriptor: ComponentDescriptor) {
        let concrete = descriptor.concrete;
        let key = descriptor.key;
        let key_cast = descriptor.key_cast.clone();
        let self_cast = descriptor.self_cast.clone();

        let index = match self.by_concrete.get(&concrete.type_id) {
            Some(&index) => {
                let previous = std::mem::replace(&mut self.descriptors[index], descriptor);
                let current = &mut self.descriptors[index];

                // Keys the previous registration was reachable by
                let mut kept = previous.capabilities;
                if previous.key != concrete {
                    kept.push(Capability {
                        key: previous.key,
                        cast: previous.key_cast,
                    });
                }
                for capability in kept {
                    if current.cast_for(capability.key).is_none() {
                        current.capabilities.push(capability);
                    }
                }

                tracing::debug!("Replaced descriptor of {concrete}");
                index
            }
            None => {
                self.descriptors.push(descriptor);
                let index = self.descriptors.len() - 1;
                self.by_concrete.insert(concrete.type_id, index);
                tracing::debug!("Registered {concrete} under key {key}");
                index
            }
        };

        // A registered type always resolves to its own descriptor
        self.bindings.insert(
            concrete.type_id,
            Binding {
                descriptor: index,
                cast: self_cast,
            },
        );

        if key == concrete {
            return;
        }
        if let Some(&owner) = self.by_concrete.get(&key.type_id) {
            tracing::warn!(
                "{key} is registered itself and stays bound to {}, {concrete} is only resolvable by its own type",
                self.descriptors[owner].concrete
            );
            return;
        }

        let binding = Binding {
            descriptor: index,
            cast: key_cast,
        };
        match self.bindings.entry(key.type_id) {
            Entry::Occupied(mut bound) => {
                let existing = &self.descriptors[bound.get().descriptor];
                if bound.get().descriptor != index && !existing.overwrite {
                    tracing::warn!(
                        "{key} stays bound to {} which does not allow overwrites, {concrete} is only resolvable by its own type",
                        existing.concrete
                    );
                    return;
                }
                bound.insert(binding);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(binding);
            }
        }
    }

    pub fn binding(&self, key: TypeInfo) -> Option<&Binding> {
        self.bindings.get(&key.type_id)
    }

    /// Descriptor bound to `key`
    pub fn resolve(&self, key: TypeInfo) -> Option<usize> {
        self.binding(key).map(|binding| binding.descriptor)
    }

    pub fn into_parts(self) -> (Vec<ComponentDescriptor>, HashMap<TypeId, Binding>) {
        (self.descriptors, self.bindings)
    }

    /// Attaches a callback to whatever its owner key is bound to
    pub fn attach_execution(
        &mut self,
        execution: ExecutionDescriptor,
    ) -> Result<(), DependencyGraphError> {
        let owner = execution.owner;
        let Some(binding) = self.binding(owner).cloned() else {
            return Err(DependencyGraphError::UnknownOwner(owner));
        };

        tracing::debug!(
            "Attached {} callback to {} through {owner}",
            execution.state,
            self.descriptors[binding.descriptor].concrete
        );
        self.descriptors[binding.descriptor]
            .executions
            .push(AttachedExecution {
                view: binding.cast,
                execution,
            });
        Ok(())
    }
}
