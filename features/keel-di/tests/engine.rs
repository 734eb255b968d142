use std::sync::Arc;

use keel_di::{
    Bundle, Component, ComponentDescriptor, Declaration, DependencyGraphError, EngineBuilder,
    EngineError, LifecycleState, LookupError, Param, TypeInfo,
};

trait Foo: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct Bar;
impl Foo for Bar {
    fn name(&self) -> &'static str {
        "bar"
    }
}
impl Component for Bar {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.default_constructor();
    }
}

#[derive(Default)]
struct Baz;
impl Foo for Baz {
    fn name(&self) -> &'static str {
        "baz"
    }
}
impl Component for Baz {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.default_constructor();
    }
}

#[derive(Default)]
struct Pinned;
impl Foo for Pinned {
    fn name(&self) -> &'static str {
        "pinned"
    }
}
impl Component for Pinned {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.default_constructor().overwrite(false);
    }
}

fn bar_as_foo(bar: Arc<Bar>) -> Arc<dyn Foo> {
    bar
}

fn baz_as_foo(baz: Arc<Baz>) -> Arc<dyn Foo> {
    baz
}

fn pinned_as_foo(pinned: Arc<Pinned>) -> Arc<dyn Foo> {
    pinned
}

struct Holder {
    bar: Arc<Bar>,
}
impl Component for Holder {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.constructor([Param::component::<Bar>()], |args| {
            Ok(Holder {
                bar: args.component()?,
            })
        });
    }
}

#[test]
fn last_registration_under_a_key_wins() {
    let engine = EngineBuilder::new()
        .register_as::<dyn Foo, Bar>(bar_as_foo)
        .register_as::<dyn Foo, Baz>(baz_as_foo)
        .register_as::<dyn Foo, Bar>(bar_as_foo)
        .build_blocking()
        .unwrap();

    assert_eq!(engine.require::<dyn Foo>().unwrap().name(), "bar");
    assert_eq!(engine.len(), 2);
    assert!(engine.get::<Baz>().is_some());
}

#[test]
fn overwrite_false_keeps_the_first_binding() {
    let engine = EngineBuilder::new()
        .register_as::<dyn Foo, Pinned>(pinned_as_foo)
        .register_as::<dyn Foo, Baz>(baz_as_foo)
        .build_blocking()
        .unwrap();

    assert_eq!(engine.require::<dyn Foo>().unwrap().name(), "pinned");
    assert_eq!(engine.require::<Baz>().unwrap().name(), "baz");

    let mut names: Vec<_> = engine
        .stream::<dyn Foo>()
        .iter()
        .map(|foo| foo.name())
        .collect();
    names.sort_unstable();
    assert_eq!(names, vec!["baz", "pinned"]);
}

struct Tagged(&'static str);
impl Component for Tagged {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.supplier(|| Tagged("registered"));
    }
}

struct Wrapper {
    inner: Arc<Tagged>,
}
impl Component for Wrapper {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.supplier(|| Wrapper {
            inner: Arc::new(Tagged("wrapped")),
        });
    }
}

fn wrapped_tag(wrapper: Arc<Wrapper>) -> Arc<Tagged> {
    wrapper.inner.clone()
}

#[test]
fn registered_types_resolve_to_themselves_over_aliases() {
    let alias_first = EngineBuilder::new()
        .register_as::<Tagged, Wrapper>(wrapped_tag)
        .register::<Tagged>();
    let alias_last = EngineBuilder::new()
        .register::<Tagged>()
        .register_as::<Tagged, Wrapper>(wrapped_tag);

    for builder in [alias_first, alias_last] {
        let engine = builder.build_blocking().unwrap();

        assert_eq!(engine.require::<Tagged>().unwrap().0, "registered");
        assert_eq!(engine.require::<Wrapper>().unwrap().inner.0, "wrapped");

        let mut tags: Vec<_> = engine.stream::<Tagged>().iter().map(|tag| tag.0).collect();
        tags.sort_unstable();
        assert_eq!(tags, vec!["registered", "wrapped"]);
    }
}

#[test]
fn every_key_has_exactly_one_instance() {
    let engine = EngineBuilder::new()
        .register::<Holder>()
        .register::<Bar>()
        .build_blocking()
        .unwrap();

    let first = engine.require::<Bar>().unwrap();
    let second = engine.require::<Bar>().unwrap();
    let holder = engine.require::<Holder>().unwrap();

    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &holder.bar));
}

#[test]
fn alias_and_concrete_lookups_share_the_instance() {
    let engine = EngineBuilder::new()
        .register_as::<dyn Foo, Bar>(bar_as_foo)
        .build_blocking()
        .unwrap();

    let as_foo = engine.require::<dyn Foo>().unwrap();
    let as_bar: Arc<dyn Foo> = engine.require::<Bar>().unwrap();
    assert!(std::ptr::addr_eq(Arc::as_ptr(&as_foo), Arc::as_ptr(&as_bar)));
}

#[test]
fn unbound_keys_are_reported() {
    let engine = EngineBuilder::new()
        .register::<Bar>()
        .build_blocking()
        .unwrap();

    assert!(engine.get::<Baz>().is_none());
    assert_eq!(
        engine.require::<Baz>().err(),
        Some(LookupError::NotFound(std::any::type_name::<Baz>()))
    );
    assert!(engine.state_of::<Baz>().is_none());
}

#[test]
fn instances_are_supplied_as_is() {
    let dsn = Arc::new("postgres://localhost".to_string());
    let engine = EngineBuilder::new()
        .add_instance(dsn.clone())
        .build_blocking()
        .unwrap();

    let supplied = engine.require::<Arc<String>>().unwrap();
    assert!(Arc::ptr_eq(&*supplied, &dsn));
}

trait Plugin: Send + Sync {
    fn name(&self) -> &'static str;
}

#[derive(Default)]
struct Alpha;
impl Plugin for Alpha {
    fn name(&self) -> &'static str {
        "alpha"
    }
}
impl Component for Alpha {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .default_constructor()
            .provides(|alpha| alpha as Arc<dyn Plugin>);
    }
}

#[derive(Default)]
struct Beta;
impl Plugin for Beta {
    fn name(&self) -> &'static str {
        "beta"
    }
}
impl Component for Beta {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration
            .default_constructor()
            .provides(|beta| beta as Arc<dyn Plugin>);
    }
}

struct Plugins;
impl Bundle for Plugins {
    fn injectables() -> Vec<ComponentDescriptor> {
        vec![
            ComponentDescriptor::of::<Alpha>(),
            ComponentDescriptor::of::<Beta>(),
        ]
    }
}

#[test]
fn bundles_register_every_component() {
    let engine = EngineBuilder::new()
        .register_bundle::<Plugins>()
        .build_blocking()
        .unwrap();

    assert_eq!(
        engine.components(),
        vec![TypeInfo::of::<Alpha>(), TypeInfo::of::<Beta>()]
    );
    assert_eq!(engine.state_of::<Beta>(), Some(LifecycleState::Started));
}

#[test]
fn stream_finds_unbound_capabilities() {
    let engine = EngineBuilder::new()
        .register_bundle::<Plugins>()
        .register::<Bar>()
        .build_blocking()
        .unwrap();

    let names: Vec<_> = engine
        .stream::<dyn Plugin>()
        .iter()
        .map(|plugin| plugin.name())
        .collect();
    assert_eq!(names, vec!["alpha", "beta"]);
    assert!(engine.get::<dyn Plugin>().is_none());
    assert_eq!(engine.stream::<Bar>().len(), 1);
}

#[test]
fn missing_dependencies_fail_the_build() {
    let error = EngineBuilder::new()
        .register::<Holder>()
        .build_blocking()
        .unwrap_err();

    assert_eq!(
        error.graph_errors(),
        &[DependencyGraphError::MissingDependency {
            dependency: TypeInfo::of::<Bar>(),
            required_by: TypeInfo::of::<Holder>(),
        }]
    );
}

#[test]
fn components_without_constructors_fail_the_build() {
    struct Bare;
    impl Component for Bare {
        fn declare(_: &mut Declaration<Self>) {}
    }

    let error = EngineBuilder::new()
        .register::<Bare>()
        .register::<Bar>()
        .build_blocking()
        .unwrap_err();

    assert_eq!(
        error.graph_errors(),
        &[DependencyGraphError::UnresolvableConstructor(
            TypeInfo::of::<Bare>()
        )]
    );
}

struct Chicken;
impl Component for Chicken {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.constructor([Param::component::<Egg>()], |_| Ok(Chicken));
    }
}

struct Egg;
impl Component for Egg {
    fn declare(declaration: &mut Declaration<Self>) {
        declaration.constructor([Param::component::<Chicken>()], |_| Ok(Egg));
    }
}

#[test]
fn constructor_cycles_fail_the_build() {
    let error = EngineBuilder::new()
        .register::<Chicken>()
        .register::<Egg>()
        .build_blocking()
        .unwrap_err();

    assert!(matches!(
        error.graph_errors(),
        [DependencyGraphError::CircularDependency { .. }]
    ));
}

#[test]
fn the_widest_resolvable_constructor_is_used() {
    struct Report {
        source: Option<Arc<Bar>>,
    }
    impl Component for Report {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration
                .constructor([], |_| Ok(Report { source: None }))
                .constructor([Param::component::<Bar>()], |args| {
                    Ok(Report {
                        source: Some(args.component()?),
                    })
                });
        }
    }

    let without_bar = EngineBuilder::new()
        .register::<Report>()
        .build_blocking()
        .unwrap();
    assert!(without_bar.require::<Report>().unwrap().source.is_none());

    let with_bar = EngineBuilder::new()
        .register::<Report>()
        .register::<Bar>()
        .build_blocking()
        .unwrap();
    assert!(with_bar.require::<Report>().unwrap().source.is_some());
}

#[test]
fn constructor_errors_abort_the_build() {
    struct Faulty;
    impl Component for Faulty {
        fn declare(declaration: &mut Declaration<Self>) {
            declaration.constructor([], |_| Err("no disk space".into()));
        }
    }

    let error = EngineBuilder::new()
        .register::<Faulty>()
        .build_blocking()
        .unwrap_err();

    let EngineError::ConstructorFailed { component, error } = error else {
        panic!("expected a constructor failure, got {error}");
    };
    assert_eq!(component, TypeInfo::of::<Faulty>());
    assert_eq!(error.to_string(), "no disk space");
}

#[test]
fn dependency_edges_are_exposed() {
    let engine = EngineBuilder::new()
        .register::<Holder>()
        .register::<Bar>()
        .build_blocking()
        .unwrap();

    let edges = engine.edges();
    assert_eq!(edges.len(), 1);
    assert_eq!(edges[0].consumer, TypeInfo::of::<Holder>());
    assert_eq!(edges[0].dependency, TypeInfo::of::<Bar>());
}
