use crate::{
    descriptor::ComponentDescriptor,
    lifecycle::{LifecycleState, MissingArgumentPolicy},
    types::TypeInfo,
};

/// Where a dependency was declared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Constructor,
    Field,
    Execution(LifecycleState),
}

/// `consumer` needs whatever is bound to `dependency`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DependencyEdge {
    pub consumer: TypeInfo,
    pub dependency: TypeInfo,
    /// Optional edges are not an error when unresolved
    pub required: bool,
    pub kind: EdgeKind,
}

impl DependencyEdge {
    /// Whether the dependency must be constructed before the consumer
    pub fn orders_construction(&self) -> bool {
        matches!(
            self.kind,
            EdgeKind::Constructor | EdgeKind::Execution(LifecycleState::Created)
        )
    }

    /// Whether the dependency must reach `state` before the consumer does
    pub fn orders_transition(&self, state: LifecycleState) -> bool {
        match self.kind {
            EdgeKind::Constructor => true,
            EdgeKind::Field => false,
            EdgeKind::Execution(target) => target == state,
        }
    }
}

/// Dependencies of a descriptor when built through the constructor at `constructor`.
///
/// Config parameters produce no edges.
pub(crate) fn analyze(descriptor: &ComponentDescriptor, constructor: usize) -> Vec<DependencyEdge> {
    let consumer = descriptor.concrete;
    let mut edges = Vec::new();

    let constructor_params = descriptor
        .constructors
        .get(constructor)
        .map(|constructor| constructor.params.as_slice())
        .unwrap_or_default();
    for param in constructor_params {
        if let Some(dependency) = param.key() {
            edges.push(DependencyEdge {
                consumer,
                dependency,
                required: param.is_required(),
                kind: EdgeKind::Constructor,
            });
        }
    }

    for field in &descriptor.fields {
        if let Some(dependency) = field.target.key() {
            edges.push(DependencyEdge {
                consumer,
                dependency,
                required: field.target.is_required(),
                kind: EdgeKind::Field,
            });
        }
    }

    for execution in descriptor.executions() {
        for &dependency in execution.params() {
            edges.push(DependencyEdge {
                consumer,
                dependency,
                required: execution.policy() == MissingArgumentPolicy::FailBuild,
                kind: EdgeKind::Execution(execution.state()),
            });
        }
    }

    edges
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        component::{Component, Declaration},
        descriptor::Param,
        slots::Inject,
    };

    struct Db;
    struct Cache;

    #[derive(Default)]
    struct Service {
        cache: Inject<Cache>,
    }
    impl Component for Service {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration
                .constructor(
                    [Param::component::<Db>(), Param::setting("limit", 5_u32)],
                    |_| Ok(Service::default()),
                )
                .default_constructor()
                .inject_optional(|service| &service.cache);
            declaration
                .on(LifecycleState::Started)
                .param::<Arc<str>>()
                .policy(MissingArgumentPolicy::SkipInvocation)
                .run(|_, _| async { Ok(()) });
        }
    }

    #[test]
    fn edges_follow_the_selected_constructor() {
        let descriptor = ComponentDescriptor::of::<Service>();

        let with_db = analyze(&descriptor, 0);
        assert_eq!(
            with_db.iter().map(|edge| edge.kind).collect::<Vec<_>>(),
            vec![
                EdgeKind::Constructor,
                EdgeKind::Field,
                EdgeKind::Execution(LifecycleState::Started)
            ]
        );
        assert_eq!(with_db[0].dependency, TypeInfo::of::<Db>());
        assert!(with_db[0].required);
        assert!(!with_db[1].required);
        assert!(!with_db[2].required);

        let without_db = analyze(&descriptor, 1);
        assert_eq!(without_db.len(), 2);
        assert!(without_db.iter().all(|edge| !edge.orders_construction()));
    }

    #[test]
    fn transition_ordering_depends_on_the_target_state() {
        let edge = DependencyEdge {
            consumer: TypeInfo::of::<Service>(),
            dependency: TypeInfo::of::<Db>(),
            required: true,
            kind: EdgeKind::Execution(LifecycleState::Resolved),
        };
        assert!(edge.orders_transition(LifecycleState::Resolved));
        assert!(!edge.orders_transition(LifecycleState::Started));
        assert!(!edge.orders_construction());
    }
}
