//! Keel DI constructs components, wires them together and drives them through a lifecycle.
//!
//! Keel DI is split into three parts:
//! 1. The EngineBuilder where one registers components, callbacks, config overrides and proxies
//! 2. The build, which plans construction, instantiates every component and advances all of them
//!    to [LifecycleState::Started]
//! 3. The Engine, which hands out the live components until it is stopped
//!
//! Components describe themselves through [Component::declare]: which constructors they have,
//! which fields are injected after construction, which config parameters they read and which
//! callbacks run at which lifecycle state.
//!
//! # Examples
//!
//! ```rust
//! use std::sync::Arc;
//! use keel_di::{Component, Declaration, EngineBuilder, LifecycleState, Param};
//!
//! struct Pool {
//!     size: u32,
//! }
//! impl Component for Pool {
//!     fn declare(declaration: &mut Declaration<Self>) {
//!         declaration.constructor([Param::setting("pool.size", 4_u32)], |args| {
//!             Ok(Pool { size: args.setting("pool.size")? })
//!         });
//!     }
//! }
//!
//! struct Repository {
//!     pool: Arc<Pool>,
//! }
//! impl Component for Repository {
//!     fn declare(declaration: &mut Declaration<Self>) {
//!         declaration.constructor([Param::component::<Pool>()], |args| {
//!             Ok(Repository { pool: args.component()? })
//!         });
//!     }
//! }
//!
//! let engine = EngineBuilder::new()
//!     .register::<Repository>()
//!     .register::<Pool>()
//!     .override_param("pool.size", "8")
//!     .build_blocking()
//!     .unwrap();
//!
//! let repository = engine.require::<Repository>().unwrap();
//! assert_eq!(repository.pool.size, 8);
//! assert_eq!(engine.state_of::<Repository>(), Some(LifecycleState::Started));
//! engine.stop_blocking().unwrap();
//! ```

pub mod analyzer;
pub mod args;
pub mod builder;
pub mod component;
pub mod container;
mod dependency_graph;
pub mod descriptor;
pub mod errors;
mod initiator;
pub mod lifecycle;
pub mod proxy;
mod registry;
mod scheduler;
pub mod slots;
pub mod types;

pub use analyzer::{DependencyEdge, EdgeKind};
pub use args::Args;
pub use builder::EngineBuilder;
pub use component::{Component, Declaration, ExecutionBuilder};
pub use container::Engine;
pub use descriptor::{
    Bundle, ComponentDescriptor, Constructor, Execution, ExecutionDescriptor, FieldInjection,
    Param,
};
pub use errors::{DependencyGraphError, DependencyGraphErrors, EngineError, LookupError};
pub use keel_config::{ConfigError, ConfigValue, ParamOverrides};
pub use lifecycle::{LifecycleState, MissingArgumentPolicy};
pub use proxy::{CapabilityProxy, DirectProxy};
pub use slots::{Inject, Setting};
pub use types::{DynError, Injectable, Instance, Resolved, TypeInfo};
