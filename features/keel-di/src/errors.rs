use std::sync::Arc;

use keel_config::ConfigError;
use thiserror::Error;

use crate::{
    lifecycle::LifecycleState,
    types::{DynError, TypeInfo},
};

/// Errors aborting [EngineBuilder::build](crate::EngineBuilder::build) or
/// [Engine::stop](crate::Engine::stop)
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// There are issues with the dependency graph
    #[error(transparent)]
    DependencyGraph(#[from] DependencyGraphErrors),

    /// A callback parameter could not be resolved and its policy is to fail
    #[error("'{required_by}' needs '{dependency}' to reach {state}, but it is missing")]
    MissingRequiredDependency {
        dependency: TypeInfo,
        required_by: TypeInfo,
        state: LifecycleState,
    },

    /// A config override could not be coerced into the declared type
    #[error("Config of '{component}' is invalid: {error}")]
    Config {
        component: TypeInfo,
        #[source]
        error: ConfigError,
    },

    /// A full scan advanced nothing while components remained below the state
    #[error("No component could advance to {state}, remaining components wait on each other: {blocked:?}")]
    DeadlockedTransition {
        state: LifecycleState,
        blocked: Vec<TypeInfo>,
    },

    /// A constructor returned an error
    #[error("Constructor for '{component}' failed - error: {error}")]
    ConstructorFailed {
        component: TypeInfo,
        error: Arc<DynError>,
    },

    /// Setting a deferred field failed
    #[error("Injecting '{field}' into '{component}' failed - error: {error}")]
    FieldInjectionFailed {
        component: TypeInfo,
        field: String,
        error: Arc<DynError>,
    },

    /// A lifecycle callback returned an error.
    ///
    /// `owner` is the concrete component the callback ran on, also for callbacks inherited
    /// from a parent or attached through an alias key.
    #[error("{state} callback of '{owner}' failed - error: {error}")]
    ExecutionFailed {
        owner: TypeInfo,
        state: LifecycleState,
        error: Arc<DynError>,
    },
}

impl EngineError {
    /// Issues found while planning, empty for every other error
    pub fn graph_errors(&self) -> &[DependencyGraphError] {
        match self {
            EngineError::DependencyGraph(graph) => &graph.errors,
            _ => &[],
        }
    }
}

/// Errors when looking up a component or an argument
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// Nothing is bound to the requested key
    #[error("No component is bound to '{0}'")]
    NotFound(&'static str),

    /// No setting with this name was resolved
    #[error("No setting named '{0}' was resolved")]
    SettingMissing(String),

    #[error("Failed to downcast, required: '{required_type}' actual: '{actual_type}'")]
    DowncastFailed {
        required_type: &'static str,
        actual_type: &'static str,
    },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DependencyGraphError {
    #[error("'{0}' has neither a constructor nor a supplier")]
    UnresolvableConstructor(TypeInfo),
    #[error("'{required_by}' needs '{dependency}' but it is missing")]
    MissingDependency {
        dependency: TypeInfo,
        required_by: TypeInfo,
    },
    #[error("A Circular Dependency exists between '{from}' and '{to}' through {chain:?} - Consider injecting one side as a field")]
    CircularDependency {
        from: TypeInfo,
        to: TypeInfo,
        chain: Vec<TypeInfo>,
    },
    #[error("A callback was added for '{0}', but nothing is bound to it")]
    UnknownOwner(TypeInfo),
}

#[derive(Error, Debug, Clone)]
pub struct DependencyGraphErrors {
    pub errors: Vec<DependencyGraphError>,
}
impl std::fmt::Display for DependencyGraphErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut display = Vec::new();
        display.push("The dependency graph had one or more errors:".to_string());
        for error in &self.errors {
            display.push(format!("- {}", error));
        }
        f.write_str(&display.join("\n"))
    }
}
