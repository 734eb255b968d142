use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures::future::BoxFuture;
use keel_di::{
    Args, CapabilityProxy, Component, Constructor, Declaration, DynError, EngineBuilder,
    EngineError, ExecutionDescriptor, FieldInjection, Inject, Instance, LifecycleState, Resolved,
    TypeInfo,
};

mod sealed {
    use super::*;

    /// Only reachable through the proxy of this module
    #[derive(Default)]
    pub struct Vault {
        pub(super) opened: AtomicUsize,
        pub(super) ledger: Inject<super::Ledger>,
    }

    impl Component for Vault {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration
                .default_constructor()
                .inject(|vault| &vault.ledger);
            declaration
                .on(LifecycleState::Started)
                .run(|vault, _| async move {
                    vault.opened.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                });
        }
    }
}

#[derive(Default)]
struct Ledger;
impl Component for Ledger {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.default_constructor();
    }
}

#[derive(Default)]
struct Calls {
    constructed: AtomicUsize,
    injected: AtomicUsize,
    invoked: AtomicUsize,
}

/// Counts every call for components of one module, then calls straight through
struct CountingProxy {
    module: String,
    calls: Arc<Calls>,
}

impl CapabilityProxy for CountingProxy {
    fn applies_to(&self, component: TypeInfo) -> bool {
        component.in_module(&self.module)
    }

    fn construct(
        &self,
        _: TypeInfo,
        constructor: &Constructor,
        args: &Args,
    ) -> Result<Instance, DynError> {
        self.calls.constructed.fetch_add(1, Ordering::SeqCst);
        constructor.invoke(args)
    }

    fn set_field(
        &self,
        _: TypeInfo,
        field: &FieldInjection,
        owner: &Instance,
        value: Resolved,
    ) -> Result<(), DynError> {
        self.calls.injected.fetch_add(1, Ordering::SeqCst);
        field.inject(owner, value)
    }

    fn invoke(
        &self,
        _: TypeInfo,
        execution: &ExecutionDescriptor,
        owner: Resolved,
        args: Args,
    ) -> BoxFuture<'static, Result<(), DynError>> {
        self.calls.invoked.fetch_add(1, Ordering::SeqCst);
        execution.invoke(owner, args)
    }
}

fn sealed_module() -> String {
    format!("{}::sealed", module_path!())
}

#[test]
fn proxies_handle_the_components_they_apply_to() {
    let calls = Arc::new(Calls::default());
    let engine = EngineBuilder::new()
        .register::<sealed::Vault>()
        .register::<Ledger>()
        .set_proxy(CountingProxy {
            module: sealed_module(),
            calls: calls.clone(),
        })
        .build_blocking()
        .unwrap();

    assert_eq!(calls.constructed.load(Ordering::SeqCst), 1);
    assert_eq!(calls.injected.load(Ordering::SeqCst), 1);
    assert_eq!(calls.invoked.load(Ordering::SeqCst), 1);

    let vault = engine.require::<sealed::Vault>().unwrap();
    assert_eq!(vault.opened.load(Ordering::SeqCst), 1);
    assert!(vault.ledger.is_injected());
}

#[test]
fn first_applicable_proxy_wins() {
    let first = Arc::new(Calls::default());
    let second = Arc::new(Calls::default());
    EngineBuilder::new()
        .register::<sealed::Vault>()
        .register::<Ledger>()
        .set_proxy(CountingProxy {
            module: sealed_module(),
            calls: first.clone(),
        })
        .set_proxy(CountingProxy {
            module: module_path!().to_string(),
            calls: second.clone(),
        })
        .build_blocking()
        .unwrap();

    assert_eq!(first.constructed.load(Ordering::SeqCst), 1);
    // Only the ledger falls through to the second proxy
    assert_eq!(second.constructed.load(Ordering::SeqCst), 1);
    assert_eq!(second.injected.load(Ordering::SeqCst), 0);
}

struct Refusing;
impl CapabilityProxy for Refusing {
    fn applies_to(&self, component: TypeInfo) -> bool {
        component == TypeInfo::of::<Ledger>()
    }

    fn construct(&self, component: TypeInfo, _: &Constructor, _: &Args) -> Result<Instance, DynError> {
        Err(format!("{component} may not be constructed here").into())
    }
}

#[test]
fn proxy_failures_abort_the_build() {
    let error = EngineBuilder::new()
        .register::<Ledger>()
        .set_proxy(Refusing)
        .build_blocking()
        .unwrap_err();

    assert!(matches!(
        error,
        EngineError::ConstructorFailed { component, .. } if component == TypeInfo::of::<Ledger>()
    ));
}
