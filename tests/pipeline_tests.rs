//! Stage ordering, event parameters, listener priorities and
//! module-contributed listeners.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{json, Value};

use module_host::error::ModuleError;
use module_host::event::EventKind;
use module_host::loader::{LoadState, Loader};
use module_host::module::{Capabilities, ListenerBinding, LoadContext, Module};

use common::{config_with_modules, kinds, new_event_log, record_all_events, FixtureModule};

#[test]
fn stage_events_fire_in_order_and_routes_stay_silent() {
    common::init_tracing();
    let log = new_event_log();
    let mut loader = Loader::new();
    record_all_events(&mut loader, &log);
    FixtureModule::new("1.0.1")
        .with_config(json!({"web": {"port": 8080}}))
        .with_service("web.server")
        .with_listeners(Vec::new)
        .with_route("home", "/", "GET")
        .register(&mut loader, "web");

    loader.load(&config_with_modules(&["web"])).unwrap();

    // No event kind exists for the route stage.
    assert_eq!(
        kinds(&log),
        vec![
            EventKind::BeforeLoad,
            EventKind::ConfigMerged,
            EventKind::ServicesAdded,
            EventKind::ListenersAdded,
            EventKind::ModuleLoaded,
            EventKind::AfterLoad,
        ]
    );
}

#[test]
fn stage_events_carry_the_module_and_its_contribution() {
    let params: Rc<RefCell<Vec<(EventKind, Option<Value>)>>> =
        Rc::new(RefCell::new(Vec::new()));

    let mut loader = Loader::new();
    for kind in [EventKind::ConfigMerged, EventKind::ServicesAdded, EventKind::ModuleLoaded] {
        let params = params.clone();
        loader.add_listener(
            kind,
            Box::new(move |event| {
                assert_eq!(event.param("module"), Some(&json!("web")));
                let payload = match event.kind() {
                    EventKind::ConfigMerged => event.param("config").cloned(),
                    EventKind::ServicesAdded => event.param("services").cloned(),
                    EventKind::ModuleLoaded => event.param("version").cloned(),
                    _ => None,
                };
                params.borrow_mut().push((event.kind(), payload));
            }),
            0,
        );
    }
    FixtureModule::new("1.0.1")
        .with_config(json!({"web": {"port": 8080}}))
        .with_service("web.server")
        .register(&mut loader, "web");

    loader.load(&config_with_modules(&["web"])).unwrap();

    assert_eq!(
        *params.borrow(),
        vec![
            (EventKind::ConfigMerged, Some(json!({"web": {"port": 8080}}))),
            (EventKind::ServicesAdded, Some(json!(["web.server"]))),
            (EventKind::ModuleLoaded, Some(json!("1.0.1"))),
        ]
    );
}

#[test]
fn dependency_events_precede_every_pipeline_stage() {
    let log = new_event_log();
    let mut loader = Loader::new();
    record_all_events(&mut loader, &log);
    FixtureModule::new("1.0.0")
        .with_config(json!({"a": 1}))
        .register(&mut loader, "first");
    FixtureModule::new("1.0.0")
        .with_config(json!({"b": 2}))
        .with_module_dep("first", "^1.0.0")
        .register(&mut loader, "second");

    loader
        .load(&config_with_modules(&["first", "second"]))
        .unwrap();

    let seen = kinds(&log);
    let last_check = seen
        .iter()
        .rposition(|k| *k == EventKind::ModuleDependencyChecked)
        .unwrap();
    let first_merge = seen
        .iter()
        .position(|k| *k == EventKind::ConfigMerged)
        .unwrap();
    assert!(last_check < first_merge);
}

#[test]
fn routes_keep_declaration_order_across_modules() {
    let mut loader = Loader::new();
    FixtureModule::new("1.0.0")
        .with_route("home", "/", "GET")
        .with_route("about", "/about", "GET")
        .register(&mut loader, "site");
    FixtureModule::new("1.0.0")
        .with_route("api", "/api", "POST")
        .register(&mut loader, "api");

    loader
        .load(&config_with_modules(&["site", "api"]))
        .unwrap();

    let names: Vec<&str> = loader
        .routes()
        .routes()
        .iter()
        .map(|r| r.name.as_str())
        .collect();
    assert_eq!(names, vec!["home", "about", "api"]);
}

#[test]
fn listener_priority_orders_execution_over_registration() {
    let order = Rc::new(RefCell::new(Vec::new()));
    let mut loader = Loader::new();
    for (label, priority) in [("low", -10), ("high", 10), ("mid-a", 0), ("mid-b", 0)] {
        let order = order.clone();
        loader.add_listener(
            EventKind::ModuleLoaded,
            Box::new(move |_| order.borrow_mut().push(label)),
            priority,
        );
    }
    FixtureModule::new("1.0.0").register(&mut loader, "auth");

    loader.load(&config_with_modules(&["auth"])).unwrap();

    // Priority wins; ties keep registration order.
    assert_eq!(*order.borrow(), vec!["high", "mid-a", "mid-b", "low"]);
}

#[test]
fn stopping_without_an_error_only_mutes_later_listeners() {
    let reached = Rc::new(RefCell::new(false));
    let mut loader = Loader::new();
    loader.add_listener(
        EventKind::ConfigMerged,
        Box::new(|event| event.stop_propagation("seen enough")),
        10,
    );
    {
        let reached = reached.clone();
        loader.add_listener(
            EventKind::ConfigMerged,
            Box::new(move |_| *reached.borrow_mut() = true),
            0,
        );
    }
    FixtureModule::new("1.0.0")
        .with_config(json!({"k": "v"}))
        .register(&mut loader, "auth");

    loader.load(&config_with_modules(&["auth"])).unwrap();

    assert_eq!(loader.state(), LoadState::Completed);
    assert!(!*reached.borrow());
}

#[test]
fn module_registered_listeners_observe_later_events() {
    let log = new_event_log();
    let mut loader = Loader::new();
    {
        let log = log.clone();
        FixtureModule::new("1.0.0")
            .with_listeners(move || {
                vec![ListenerBinding::new(
                    EventKind::AfterLoad,
                    common::recording_listener(log.clone()),
                )]
            })
            .register(&mut loader, "observer");
    }
    FixtureModule::new("1.0.0").register(&mut loader, "second");

    loader
        .load(&config_with_modules(&["observer", "second"]))
        .unwrap();

    assert_eq!(kinds(&log), vec![EventKind::AfterLoad]);
}

#[test]
fn capability_gating_skips_unclaimed_stages() {
    let log = new_event_log();
    let mut loader = Loader::new();
    record_all_events(&mut loader, &log);
    // Services only: no config, listener or route stage events.
    FixtureModule::new("1.0.0")
        .with_service("only.service")
        .register(&mut loader, "narrow");

    loader.load(&config_with_modules(&["narrow"])).unwrap();

    assert_eq!(
        kinds(&log),
        vec![
            EventKind::BeforeLoad,
            EventKind::ServicesAdded,
            EventKind::ModuleLoaded,
            EventKind::AfterLoad,
        ]
    );
}

#[test]
fn init_sees_the_assigned_name_and_the_merged_config() {
    struct Inspecting {
        seen: Rc<RefCell<Option<(String, Value)>>>,
    }

    impl Module for Inspecting {
        fn version(&self) -> &str {
            "1.0.0"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::CONFIG
        }

        fn config(&self) -> Value {
            json!({"inspect": {"enabled": true}})
        }

        fn init(&mut self, ctx: &mut LoadContext<'_>) -> Result<(), ModuleError> {
            *self.seen.borrow_mut() =
                Some((ctx.module_name.to_string(), ctx.merged_config.clone()));
            Ok(())
        }
    }

    let seen = Rc::new(RefCell::new(None));
    let mut loader = Loader::new();
    {
        let seen = seen.clone();
        loader.register_module("inspector", move || {
            Box::new(Inspecting { seen: seen.clone() })
        });
    }

    loader
        .load(&config_with_modules(&["inspector"]))
        .unwrap();

    let (name, merged) = seen.borrow().clone().unwrap();
    assert_eq!(name, "inspector");
    assert_eq!(merged["inspect"]["enabled"], json!(true));
}

#[test]
fn non_mapping_config_contribution_is_invalid() {
    let mut loader = Loader::new();
    FixtureModule::new("1.0.0")
        .with_config(json!("just a string"))
        .register(&mut loader, "odd");

    let err = loader.load(&config_with_modules(&["odd"])).unwrap_err();
    assert!(matches!(err, ModuleError::InvalidModule { name, .. } if name == "odd"));
}

#[test]
fn later_config_contribution_wins_per_leaf() {
    let mut loader = Loader::new();
    FixtureModule::new("1.0.0")
        .with_config(json!({"db": {"host": "localhost", "pool": 4}}))
        .register(&mut loader, "first");
    FixtureModule::new("1.0.0")
        .with_config(json!({"db": {"pool": 16}}))
        .register(&mut loader, "second");

    loader
        .load(&config_with_modules(&["first", "second"]))
        .unwrap();

    assert_eq!(loader.merged_config()["db"]["host"], json!("localhost"));
    assert_eq!(loader.merged_config()["db"]["pool"], json!(16));
}
