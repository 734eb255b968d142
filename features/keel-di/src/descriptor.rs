use std::{fmt::Debug, future::Future, marker::PhantomData, sync::Arc};

use futures::{future::BoxFuture, FutureExt};
use keel_config::{ConfigError, ConfigValue, ParamOverrides};

use crate::{
    args::Args,
    component::{Component, Declaration},
    lifecycle::{LifecycleState, MissingArgumentPolicy},
    types::{alias_cast, self_cast, CastFn, DynError, Injectable, Instance, Resolved, TypeInfo},
};

type SettingFn = Arc<dyn Fn(&ParamOverrides) -> Result<Resolved, ConfigError> + Send + Sync>;
type BuildFn = Arc<dyn Fn(&Args) -> Result<Instance, DynError> + Send + Sync>;
type InjectFn = Arc<dyn Fn(&Instance, Resolved) -> Result<(), DynError> + Send + Sync>;
type ActionFn = Arc<dyn Fn(Resolved, Args) -> BoxFuture<'static, Result<(), DynError>> + Send + Sync>;

/// A constructor parameter or an injected field
#[derive(Clone)]
pub struct Param {
    pub(crate) kind: ParamKind,
}

#[derive(Clone)]
pub(crate) enum ParamKind {
    Component {
        key: TypeInfo,
        required: bool,
    },
    Setting {
        name: String,
        target: &'static str,
        resolve: SettingFn,
    },
}

impl Param {
    /// Another component, bound to key `K`
    pub fn component<K: ?Sized + Injectable>() -> Self {
        Param {
            kind: ParamKind::Component {
                key: TypeInfo::of::<K>(),
                required: true,
            },
        }
    }

    /// Another component, bound to key `K` - resolves to nothing if `K` is unbound
    pub fn optional<K: ?Sized + Injectable>() -> Self {
        Param {
            kind: ParamKind::Component {
                key: TypeInfo::of::<K>(),
                required: false,
            },
        }
    }

    /// A config parameter with a typed default, overridable by name
    pub fn setting<V: ConfigValue>(name: impl Into<String>, default: V) -> Self {
        let name = name.into();
        let lookup_name = name.clone();
        Param {
            kind: ParamKind::Setting {
                name,
                target: V::target_name(),
                resolve: Arc::new(move |overrides: &ParamOverrides| {
                    overrides
                        .resolve(&lookup_name, &default)
                        .map(Resolved::setting)
                }),
            },
        }
    }

    /// The component key, `None` for settings
    pub fn key(&self) -> Option<TypeInfo> {
        match &self.kind {
            ParamKind::Component { key, .. } => Some(*key),
            ParamKind::Setting { .. } => None,
        }
    }

    pub fn is_required(&self) -> bool {
        match &self.kind {
            ParamKind::Component { required, .. } => *required,
            ParamKind::Setting { .. } => true,
        }
    }

    pub(crate) fn describe(&self) -> String {
        match &self.kind {
            ParamKind::Component { key, .. } => key.type_name.to_string(),
            ParamKind::Setting { name, target, .. } => format!("{name}: {target}"),
        }
    }
}

impl Debug for Param {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// One way of constructing a component
#[derive(Clone)]
pub struct Constructor {
    pub(crate) params: Vec<Param>,
    pub(crate) build: BuildFn,
}

impl Constructor {
    pub(crate) fn new<T, F>(params: Vec<Param>, build: F) -> Self
    where
        T: Injectable,
        F: Fn(&Args) -> Result<T, DynError> + Send + Sync + 'static,
    {
        Constructor {
            params,
            build: Arc::new(move |args: &Args| build(args).map(Instance::new)),
        }
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    /// Runs the constructor with already resolved arguments
    pub fn invoke(&self, args: &Args) -> Result<Instance, DynError> {
        (self.build)(args)
    }
}

/// A field set after construction, once the owner reaches [LifecycleState::Initialized]
#[derive(Clone)]
pub struct FieldInjection {
    pub(crate) target: Param,
    pub(crate) inject: InjectFn,
}

impl FieldInjection {
    pub fn target(&self) -> &Param {
        &self.target
    }

    /// Writes `value` into the field of `owner`
    pub fn inject(&self, owner: &Instance, value: Resolved) -> Result<(), DynError> {
        (self.inject)(owner, value)
    }
}

/// A callback run once, when its owner reaches `state`
#[derive(Clone)]
pub struct ExecutionDescriptor {
    pub(crate) owner: TypeInfo,
    pub(crate) state: LifecycleState,
    pub(crate) params: Vec<TypeInfo>,
    pub(crate) policy: MissingArgumentPolicy,
    pub(crate) action: ActionFn,
}

impl ExecutionDescriptor {
    pub fn owner(&self) -> TypeInfo {
        self.owner
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    pub fn params(&self) -> &[TypeInfo] {
        &self.params
    }

    pub fn policy(&self) -> MissingArgumentPolicy {
        self.policy
    }

    /// Runs the callback against `owner`, which must be viewed as [ExecutionDescriptor::owner]
    pub fn invoke(&self, owner: Resolved, args: Args) -> BoxFuture<'static, Result<(), DynError>> {
        (self.action)(owner, args)
    }
}

impl Debug for ExecutionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionDescriptor")
            .field("owner", &self.owner.type_name)
            .field("state", &self.state)
            .field("params", &self.params)
            .field("policy", &self.policy)
            .finish()
    }
}

/// Builds an [ExecutionDescriptor] owned by whatever is bound to `K`
///
/// ```rust
/// # use keel_di::{Execution, LifecycleState, MissingArgumentPolicy};
/// # use std::sync::atomic::{AtomicBool, Ordering};
/// struct Pool { open: AtomicBool }
/// struct Metrics;
///
/// let execution = Execution::<Pool>::at(LifecycleState::Started)
///     .param::<Metrics>()
///     .policy(MissingArgumentPolicy::SkipInvocation)
///     .run(|pool, _args| async move {
///         pool.open.store(true, Ordering::SeqCst);
///         Ok(())
///     });
/// # assert_eq!(execution.params().len(), 1);
/// ```
pub struct Execution<K: ?Sized> {
    state: LifecycleState,
    params: Vec<TypeInfo>,
    policy: MissingArgumentPolicy,
    _owner: PhantomData<fn(Arc<K>)>,
}

impl<K: ?Sized + Injectable> Execution<K> {
    pub fn at(state: LifecycleState) -> Self {
        Execution {
            state,
            params: Vec::new(),
            policy: MissingArgumentPolicy::default(),
            _owner: PhantomData,
        }
    }

    /// Requires the component bound to `D`, read through [Args::component]
    pub fn param<D: ?Sized + Injectable>(mut self) -> Self {
        self.params.push(TypeInfo::of::<D>());
        self
    }

    pub fn policy(mut self, policy: MissingArgumentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn run<F, Fut>(self, action: F) -> ExecutionDescriptor
    where
        F: Fn(Arc<K>, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), DynError>> + Send + 'static,
    {
        let action: ActionFn = Arc::new(move |owner: Resolved, args: Args| match owner.get::<K>() {
            Some(owner) => action(owner, args).boxed(),
            None => {
                let error: DynError = format!(
                    "Callback owner is a '{}', expected '{}'",
                    owner.info(),
                    std::any::type_name::<K>()
                )
                .into();
                futures::future::ready(Err(error)).boxed()
            }
        });

        ExecutionDescriptor {
            owner: TypeInfo::of::<K>(),
            state: self.state,
            params: self.params,
            policy: self.policy,
            action,
        }
    }
}

/// An execution attached to a descriptor, with the view of the instance it runs against
#[derive(Clone)]
pub(crate) struct AttachedExecution {
    pub view: CastFn,
    pub execution: ExecutionDescriptor,
}

/// An additional key a component can be viewed as
#[derive(Clone)]
pub(crate) struct Capability {
    pub key: TypeInfo,
    pub cast: CastFn,
}

/// Build-time record describing one candidate component
#[derive(Clone)]
pub struct ComponentDescriptor {
    pub(crate) concrete: TypeInfo,
    pub(crate) key: TypeInfo,
    pub(crate) key_cast: CastFn,
    pub(crate) self_cast: CastFn,
    pub(crate) overwrite: bool,
    pub(crate) supplied: bool,
    pub(crate) constructors: Vec<Constructor>,
    pub(crate) fields: Vec<FieldInjection>,
    pub(crate) executions: Vec<AttachedExecution>,
    pub(crate) capabilities: Vec<Capability>,
}

impl ComponentDescriptor {
    /// Component bound to its own type
    pub fn of<T: Component>() -> Self {
        Self::from_declaration(Declaration::<T>::declared(), TypeInfo::of::<T>(), self_cast::<T>())
    }

    /// Component bound to the alias key `K`, still resolvable by its own type
    pub fn aliased<K, T>(cast: impl Fn(Arc<T>) -> Arc<K> + Send + Sync + 'static) -> Self
    where
        K: ?Sized + Injectable,
        T: Component,
    {
        Self::from_declaration(
            Declaration::<T>::declared(),
            TypeInfo::of::<K>(),
            alias_cast(cast),
        )
    }

    /// Already constructed value, supplied as-is
    pub fn instance<T: Injectable>(value: T) -> Self {
        let instance = Instance::new(value);
        let mut declaration = Declaration::<T>::new();
        declaration.supplier = Some(Constructor {
            params: Vec::new(),
            build: Arc::new(move |_: &Args| -> Result<Instance, DynError> { Ok(instance.clone()) }),
        });
        Self::from_declaration(declaration, TypeInfo::of::<T>(), self_cast::<T>())
    }

    fn from_declaration<T: Injectable>(
        declaration: Declaration<T>,
        key: TypeInfo,
        key_cast: CastFn,
    ) -> Self {
        let Declaration {
            constructors,
            supplier,
            fields,
            executions,
            capabilities,
            overwrite,
            ..
        } = declaration;

        let supplied = supplier.is_some();
        let constructors = match supplier {
            Some(supplier) => vec![supplier],
            None => constructors,
        };

        ComponentDescriptor {
            concrete: TypeInfo::of::<T>(),
            key,
            key_cast,
            self_cast: self_cast::<T>(),
            overwrite,
            supplied,
            constructors,
            fields,
            executions,
            capabilities,
        }
    }

    /// Overrides the overwrite flag the component declared
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn concrete(&self) -> TypeInfo {
        self.concrete
    }

    pub fn key(&self) -> TypeInfo {
        self.key
    }

    pub fn overwrite(&self) -> bool {
        self.overwrite
    }

    pub fn constructors(&self) -> &[Constructor] {
        &self.constructors
    }

    pub fn fields(&self) -> &[FieldInjection] {
        &self.fields
    }

    pub fn executions(&self) -> impl Iterator<Item = &ExecutionDescriptor> {
        self.executions.iter().map(|attached| &attached.execution)
    }

    /// Whether the component can be viewed as `key`
    pub(crate) fn cast_for(&self, key: TypeInfo) -> Option<&CastFn> {
        if key == self.concrete {
            return Some(&self.self_cast);
        }
        if key == self.key {
            return Some(&self.key_cast);
        }
        self.capabilities
            .iter()
            .find(|capability| capability.key == key)
            .map(|capability| &capability.cast)
    }
}

impl Debug for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDescriptor")
            .field("concrete", &self.concrete.type_name)
            .field("key", &self.key.type_name)
            .field("overwrite", &self.overwrite)
            .field("constructors", &self.constructors.len())
            .field("fields", &self.fields.len())
            .field("executions", &self.executions.len())
            .finish()
    }
}

/// A group of components registered together
pub trait Bundle {
    /// Descriptors of every component in the bundle, may be called more than once
    fn injectables() -> Vec<ComponentDescriptor>;
}
