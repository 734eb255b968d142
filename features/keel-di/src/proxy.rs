use std::sync::Arc;

use futures::future::BoxFuture;

use crate::{
    args::Args,
    descriptor::{Constructor, ExecutionDescriptor, FieldInjection},
    types::{DynError, Instance, Resolved, TypeInfo},
};

/// Indirection used whenever the engine constructs, injects or calls into a component.
///
/// The engine picks the first registered proxy whose [CapabilityProxy::applies_to] accepts the
/// component, and falls back to [DirectProxy]. Proxies let a module keep its constructors and
/// fields private while still handing the engine a way to use them.
///
/// Every method except [CapabilityProxy::applies_to] defaults to calling straight through.
pub trait CapabilityProxy: Send + Sync {
    /// Whether this proxy handles `component`, usually a [TypeInfo::in_module] check
    fn applies_to(&self, component: TypeInfo) -> bool;

    fn construct(
        &self,
        component: TypeInfo,
        constructor: &Constructor,
        args: &Args,
    ) -> Result<Instance, DynError> {
        let _ = component;
        constructor.invoke(args)
    }

    fn set_field(
        &self,
        component: TypeInfo,
        field: &FieldInjection,
        owner: &Instance,
        value: Resolved,
    ) -> Result<(), DynError> {
        let _ = component;
        field.inject(owner, value)
    }

    fn invoke(
        &self,
        component: TypeInfo,
        execution: &ExecutionDescriptor,
        owner: Resolved,
        args: Args,
    ) -> BoxFuture<'static, Result<(), DynError>> {
        let _ = component;
        execution.invoke(owner, args)
    }
}

/// Calls everything directly, applies to every component
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectProxy;

impl CapabilityProxy for DirectProxy {
    fn applies_to(&self, _: TypeInfo) -> bool {
        true
    }
}

/// First registered proxy applying to `component`
pub(crate) fn select_proxy(
    proxies: &[Arc<dyn CapabilityProxy>],
    component: TypeInfo,
) -> Arc<dyn CapabilityProxy> {
    match proxies.iter().find(|proxy| proxy.applies_to(component)) {
        Some(proxy) => proxy.clone(),
        None => Arc::new(DirectProxy),
    }
}
