//! Integration tests for the synchronous observation surface.

use std::sync::{Arc, Mutex};

use kanshi::{
    Change, ChangeOrigin, Error, ObserveOptions, Session, Target, TrackedValue, Value,
};

fn recorder() -> (
    Arc<Mutex<Vec<Change>>>,
    impl Fn(&Change) + Send + Sync + Clone,
) {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    (log, move |change: &Change| {
        sink.lock().unwrap().push(change.clone())
    })
}

fn sync_options() -> ObserveOptions {
    ObserveOptions::default().with_poll_deletions(false)
}

fn object(target: &Target, prop: &str) -> kanshi::ObjectHandle {
    match target.get(prop).unwrap() {
        TrackedValue::Object(handle) => handle,
        TrackedValue::Primitive(v) => panic!("expected object at {prop}, got {v:?}"),
    }
}

#[test]
fn test_assignment_notifies_once_with_old_and_new() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("count", 1)]);
    session
        .observe_with(&target, "count", observer, sync_options())
        .unwrap();

    target.set("count", 2).unwrap();

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "count");
    assert_eq!(changes[0].old, Value::Int(1));
    assert_eq!(changes[0].new, Value::Int(2));
    assert_eq!(changes[0].origin, ChangeOrigin::Assign);
}

#[test]
fn test_double_observation_rejected() {
    let (_, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", 1)]);
    session
        .observe_with(&target, "p", observer.clone(), sync_options())
        .unwrap();
    let err = session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyObserved(p) if p == "p"));
}

#[test]
fn test_observing_missing_property_rejected() {
    let (_, observer) = recorder();
    let session = Session::new();
    let target = Target::new();
    let err = session
        .observe_with(&target, "ghost", observer, sync_options())
        .unwrap_err();
    assert!(matches!(err, Error::PropertyNotFound(p) if p == "ghost"));
}

#[test]
fn test_observing_constant_property_rejected() {
    let (_, observer) = recorder();
    let session = Session::new();
    let target = Target::new();
    target.set_const("version", 1).unwrap();
    let err = session
        .observe_with(&target, "version", observer, sync_options())
        .unwrap_err();
    assert!(matches!(err, Error::ConstantProperty(_)));
    assert_eq!(session.observed_targets(), 0);
}

#[test]
fn test_list_validation_installs_nothing_on_failure() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("a", 1)]);
    let err = session
        .observe_with(&target, ["a", "ghost"], observer, sync_options())
        .unwrap_err();
    assert!(matches!(err, Error::PropertyNotFound(_)));
    assert_eq!(session.observed_targets(), 0);

    target.set("a", 2).unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn test_unobserve_round_trip() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", Value::record([("a", 1)]))]);
    session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();

    object(&target, "p").set("a", 2).unwrap();
    let before = object(&target, "p").to_value().unwrap();

    session.unobserve(&target, "p").unwrap();
    assert_eq!(object(&target, "p").to_value().unwrap(), before);
    assert_eq!(session.observed_targets(), 0);

    let fired = log.lock().unwrap().len();
    target.set("p", Value::record([("b", 2)])).unwrap();
    object(&target, "p").set("b", 3).unwrap();
    assert_eq!(log.lock().unwrap().len(), fired);
}

#[test]
fn test_nested_key_write_traps() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", Value::record([("a", 1)]))]);
    session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();

    object(&target, "p").set("a", 2).unwrap();

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "p");
    assert_eq!(changes[0].origin, ChangeOrigin::KeyWrite);
    assert_eq!(changes[0].old, Value::record([("a", 1)]));
    assert_eq!(changes[0].new, Value::record([("a", 2)]));
    assert_eq!(
        object(&target, "p").to_value().unwrap(),
        Value::record([("a", 2)])
    );
}

#[test]
fn test_old_values_are_independent_snapshots() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", Value::record([("a", 1)]))]);
    session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();

    let handle = object(&target, "p");
    handle.set("a", 2).unwrap();
    handle.set("a", 3).unwrap();

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 2);
    // each old value reflects the state before its own write, untouched by
    // later live mutation
    assert_eq!(changes[0].old, Value::record([("a", 1)]));
    assert_eq!(changes[1].old, Value::record([("a", 2)]));
}

#[test]
fn test_method_calls_intercepted_and_shadow_synchronized() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("items", Value::seq([1]))]);
    session
        .observe_with(&target, "items", observer, sync_options())
        .unwrap();

    let handle = object(&target, "items");
    assert_eq!(handle.invoke("push", &[Value::Int(2)]).unwrap(), Value::Int(2));
    assert_eq!(handle.invoke("pop", &[]).unwrap(), Value::Int(2));

    let changes = log.lock().unwrap();
    // exactly one notification per mutating call, no length bookkeeping
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].origin, ChangeOrigin::MethodCall);
    assert_eq!(changes[0].old, Value::seq([1]));
    assert_eq!(changes[0].new, Value::seq([1, 2]));
    // shadow followed the push, so the second old reflects it
    assert_eq!(changes[1].old, Value::seq([1, 2]));
    assert_eq!(changes[1].new, Value::seq([1]));
}

#[test]
fn test_set_and_map_method_interception() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([
        ("tags", Value::set(["a"])),
        ("index", Value::map([("k", 1)])),
    ]);
    session
        .observe_with(&target, ["tags", "index"], observer, sync_options())
        .unwrap();

    let tags = object(&target, "tags");
    assert_eq!(tags.invoke("insert", &[Value::from("b")]).unwrap(), Value::Bool(true));
    assert_eq!(tags.invoke("insert", &[Value::from("b")]).unwrap(), Value::Bool(false));

    let index = object(&target, "index");
    assert_eq!(
        index
            .invoke("insert", &[Value::from("k"), Value::Int(2)])
            .unwrap(),
        Value::Int(1)
    );

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 3);
    assert_eq!(changes[0].path, "tags");
    assert_eq!(changes[2].path, "index");
    assert_eq!(changes[2].new, Value::map([("k", 2)]));
}

#[test]
fn test_failed_invoke_neither_mutates_nor_notifies() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("items", Value::seq([1]))]);
    session
        .observe_with(&target, "items", observer, sync_options())
        .unwrap();

    let handle = object(&target, "items");
    assert!(matches!(
        handle.invoke("sort", &[]),
        Err(Error::UnknownMethod { .. })
    ));
    assert!(matches!(
        handle.invoke("remove", &[Value::Int(7)]),
        Err(Error::IndexOutOfBounds { .. })
    ));

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(handle.to_value().unwrap(), Value::seq([1]));
}

#[test]
fn test_reassignment_rewraps_new_object_values() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", 1)]);
    session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();

    // primitive -> object reassignment
    target.set("p", Value::record([("a", 1)])).unwrap();
    // the fresh object is intercepted without re-observing
    object(&target, "p").set("a", 2).unwrap();

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 2);
    assert_eq!(changes[0].origin, ChangeOrigin::Assign);
    assert_eq!(changes[0].old, Value::Int(1));
    assert_eq!(changes[1].origin, ChangeOrigin::KeyWrite);
    assert_eq!(changes[1].old, Value::record([("a", 1)]));
}

#[test]
fn test_depth_expansion_reports_nested_paths_in_order() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([(
        "p",
        Value::record([("a", Value::record([("x", 1)]))]),
    )]);
    session
        .observe_with(
            &target,
            "p",
            observer,
            sync_options().with_depth(2),
        )
        .unwrap();

    let a = object(&target, "p").get("a").unwrap().into_object().unwrap();
    a.set("x", 2).unwrap();

    let changes = log.lock().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].path, "p -> a -> x");
    let p_at = changes[0].path.find("p").unwrap();
    let a_at = changes[0].path.find("a").unwrap();
    assert!(p_at < a_at);
    assert_eq!(changes[0].old, Value::Int(1));
    assert_eq!(changes[0].new, Value::Int(2));
}

#[test]
fn test_writes_below_observed_depth_are_plain() {
    let (log, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([(
        "p",
        Value::record([("a", Value::record([("x", 1)]))]),
    )]);
    session
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();

    // two levels under the monitor with default depth: invisible
    let a = object(&target, "p").get("a").unwrap().into_object().unwrap();
    a.set("x", 2).unwrap();
    assert!(log.lock().unwrap().is_empty());

    // one level under: trapped
    object(&target, "p")
        .set("a", Value::record([("x", 3)]))
        .unwrap();
    assert_eq!(log.lock().unwrap().len(), 1);
}

#[test]
fn test_observed_count_is_per_target_not_per_property() {
    let (_, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("a", 1), ("b", 2)]);
    session
        .observe_with(&target, ["a", "b"], observer, sync_options())
        .unwrap();
    assert_eq!(session.observed_targets(), 1);

    session.unobserve(&target, "a").unwrap();
    assert_eq!(session.observed_targets(), 1);
    session.unobserve(&target, "b").unwrap();
    assert_eq!(session.observed_targets(), 0);
    assert!(!session.is_observing(&target));
}

#[test]
fn test_target_entries_dispose_independently() {
    let (log_one, observer_one) = recorder();
    let (log_two, observer_two) = recorder();
    let session = Session::new();
    let one = Target::from_iter([("p", 1)]);
    let two = Target::from_iter([("p", 1)]);
    session
        .observe_with(&one, "p", observer_one, sync_options())
        .unwrap();
    session
        .observe_with(&two, "p", observer_two, sync_options())
        .unwrap();
    assert_eq!(session.observed_targets(), 2);

    session.unobserve_all(&one).unwrap();
    assert_eq!(session.observed_targets(), 1);

    one.set("p", 2).unwrap();
    two.set("p", 2).unwrap();
    assert!(log_one.lock().unwrap().is_empty());
    assert_eq!(log_two.lock().unwrap().len(), 1);
}

#[test]
fn test_sessions_do_not_share_registries() {
    let (_, observer) = recorder();
    let first = Session::new();
    let second = Session::new();
    let target = Target::from_iter([("p", 1)]);
    first
        .observe_with(&target, "p", observer, sync_options())
        .unwrap();
    assert_eq!(first.observed_targets(), 1);
    assert_eq!(second.observed_targets(), 0);
    // monitors are target-resident, so the single-monitor invariant holds
    // across sessions
    let err = second
        .observe_with(&target, "p", |_: &Change| {}, sync_options())
        .unwrap_err();
    assert!(matches!(err, Error::AlreadyObserved(_)));
}

#[test]
fn test_reentrant_unobserve_from_callback() {
    let session = Session::new();
    let target = Target::from_iter([("p", 1)]);
    let fired = Arc::new(Mutex::new(0usize));

    let reentrant_session = session.clone();
    let reentrant_target = target.clone();
    let count = fired.clone();
    session
        .observe_with(
            &target,
            "p",
            move |_: &Change| {
                *count.lock().unwrap() += 1;
                reentrant_session
                    .unobserve(&reentrant_target, "p")
                    .unwrap();
            },
            sync_options(),
        )
        .unwrap();

    target.set("p", 2).unwrap();
    target.set("p", 3).unwrap();

    assert_eq!(*fired.lock().unwrap(), 1);
    assert_eq!(session.observed_targets(), 0);
}

#[test]
fn test_unobserve_unknown_target_is_a_noop() {
    let session = Session::new();
    let target = Target::from_iter([("p", 1)]);
    session.unobserve(&target, "p").unwrap();
    session.unobserve_all(&target).unwrap();
}

#[test]
fn test_polling_without_runtime_is_rejected() {
    let (_, observer) = recorder();
    let session = Session::new();
    let target = Target::from_iter([("p", 1)]);
    let err = session.observe(&target, "p", observer).unwrap_err();
    assert!(matches!(err, Error::RuntimeUnavailable));
    assert_eq!(session.observed_targets(), 0);
}
