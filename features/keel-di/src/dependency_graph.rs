use crate::{
    analyzer::{analyze, DependencyEdge},
    descriptor::{ComponentDescriptor, Constructor},
    errors::{DependencyGraphError, DependencyGraphErrors},
    registry::Registry,
    types::TypeInfo,
};

/// Plan for instantiating every registered component
///
/// Used to check missing and circular dependencies before anything is constructed
pub(crate) struct BuildPlan {
    /// Descriptor indices, dependencies first
    pub(crate) order: Vec<usize>,
    /// Selected constructor per descriptor
    pub(crate) constructors: Vec<usize>,
    /// Dependency edges per descriptor
    pub(crate) edges: Vec<Vec<DependencyEdge>>,
}

impl BuildPlan {
    /// Selects constructors, validates the graph and orders construction
    ///
    /// Returns a list of all issues
    pub(crate) fn new(registry: &Registry) -> Result<Self, DependencyGraphErrors> {
        let mut errors = Vec::new();
        let mut constructors = Vec::with_capacity(registry.descriptors.len());
        let mut edges = Vec::with_capacity(registry.descriptors.len());

        for descriptor in &registry.descriptors {
            let selected = match select_constructor(registry, descriptor) {
                Ok(selected) => selected,
                Err(mut missing) => {
                    errors.append(&mut missing);
                    0
                }
            };
            let descriptor_edges = analyze(descriptor, selected);

            for edge in &descriptor_edges {
                if edge.required && registry.resolve(edge.dependency).is_none() {
                    let error = DependencyGraphError::MissingDependency {
                        dependency: edge.dependency,
                        required_by: edge.consumer,
                    };
                    if !errors.contains(&error) {
                        errors.push(error);
                    }
                }
            }

            tracing::trace!(
                "{} depends on {:?}",
                descriptor.concrete,
                descriptor_edges
                    .iter()
                    .map(|edge| edge.dependency.type_name)
                    .collect::<Vec<_>>()
            );
            constructors.push(selected);
            edges.push(descriptor_edges);
        }

        let order = construction_order(registry, &edges, &mut errors);

        if !errors.is_empty() {
            return Err(DependencyGraphErrors { errors });
        }

        tracing::debug!(
            "Planned construction of {} components: {:?}",
            order.len(),
            order
                .iter()
                .map(|&index| registry.descriptors[index].concrete.type_name)
                .collect::<Vec<_>>()
        );

        Ok(BuildPlan {
            order,
            constructors,
            edges,
        })
    }
}

/// Picks the constructor with the most parameters that are all resolvable, earlier declarations
/// win ties. A supplier is always selected.
fn select_constructor(
    registry: &Registry,
    descriptor: &ComponentDescriptor,
) -> Result<usize, Vec<DependencyGraphError>> {
    if descriptor.supplied {
        return Ok(0);
    }

    let resolvable = |constructor: &Constructor| {
        constructor.params.iter().all(|param| match param.key() {
            Some(key) => !param.is_required() || registry.resolve(key).is_some(),
            None => true,
        })
    };

    let mut best: Option<(usize, usize)> = None;
    for (index, constructor) in descriptor.constructors.iter().enumerate() {
        let arity = constructor.params.len();
        if resolvable(constructor) && best.map_or(true, |(_, best_arity)| arity > best_arity) {
            best = Some((index, arity));
        }
    }

    if let Some((index, _)) = best {
        return Ok(index);
    }

    // Report what is missing for the most complete constructor
    let Some(widest) = descriptor
        .constructors
        .iter()
        .reduce(|widest, next| if next.params.len() > widest.params.len() { next } else { widest })
    else {
        return Err(vec![DependencyGraphError::UnresolvableConstructor(
            descriptor.concrete,
        )]);
    };

    Err(widest
        .params
        .iter()
        .filter_map(|param| param.key().filter(|_| param.is_required()))
        .filter(|&key| registry.resolve(key).is_none())
        .map(|dependency| DependencyGraphError::MissingDependency {
            dependency,
            required_by: descriptor.concrete,
        })
        .collect())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Orders descriptors so every construction dependency comes first, registration order otherwise
fn construction_order(
    registry: &Registry,
    edges: &[Vec<DependencyEdge>],
    errors: &mut Vec<DependencyGraphError>,
) -> Vec<usize> {
    let dependencies: Vec<Vec<usize>> = edges
        .iter()
        .enumerate()
        .map(|(index, descriptor_edges)| {
            descriptor_edges
                .iter()
                .filter(|edge| edge.orders_construction())
                .filter_map(|edge| registry.resolve(edge.dependency))
                .filter(|&dependency| dependency != index)
                .collect()
        })
        .collect();

    let mut visits = vec![Visit::Pending; dependencies.len()];
    let mut order = Vec::with_capacity(dependencies.len());
    let mut chain = Vec::new();
    for index in 0..dependencies.len() {
        visit(
            registry,
            &dependencies,
            index,
            &mut visits,
            &mut chain,
            &mut order,
            errors,
        );
    }
    return order;

    fn visit(
        registry: &Registry,
        dependencies: &[Vec<usize>],
        index: usize,
        visits: &mut [Visit],
        chain: &mut Vec<usize>,
        order: &mut Vec<usize>,
        errors: &mut Vec<DependencyGraphError>,
    ) {
        match visits[index] {
            Visit::Done => return,
            Visit::InProgress => {
                // Circular Dependency - report the chain from the first occurrence
                let start = chain
                    .iter()
                    .position(|&entry| entry == index)
                    .unwrap_or_default();
                let mut cycle: Vec<TypeInfo> = chain[start..]
                    .iter()
                    .map(|&entry| registry.descriptors[entry].concrete)
                    .collect();
                let from = registry.descriptors[index].concrete;
                let to = cycle.last().copied().unwrap_or(from);
                cycle.push(from);

                errors.push(DependencyGraphError::CircularDependency {
                    from,
                    to,
                    chain: cycle,
                });
                return;
            }
            Visit::Pending => {}
        }

        visits[index] = Visit::InProgress;
        chain.push(index);
        for &dependency in &dependencies[index] {
            visit(
                registry,
                dependencies,
                dependency,
                visits,
                chain,
                order,
                errors,
            );
        }
        chain.pop();
        visits[index] = Visit::Done;
        order.push(index);
    }
}
