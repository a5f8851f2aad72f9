use smart_promise::{Reason, Resolver, SmartPromise, reset_event_loop, run_event_loop, take_unhandled_rejections};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

// Initialize logger for tests
#[ctor::ctor]
fn __init_test_logger() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default()).is_test(true).try_init();
}

#[test]
fn executor_resolution_is_observable_immediately() {
    let ran = Rc::new(Cell::new(false));
    let ran_in_executor = ran.clone();
    let promise = SmartPromise::new(move |res, _rej| {
        ran_in_executor.set(true);
        res.resolve(5);
    });
    // The executor runs synchronously inside the constructor.
    assert!(ran.get());
    assert!(promise.is_settled());
    assert!(promise.is_fulfilled());
    assert!(!promise.is_rejected());
    assert_eq!(promise.value(), Some(5));
    assert!(promise.reason().is_none());
}

#[test]
fn executor_resolution_reaches_continuations() {
    let promise = SmartPromise::new(|res, _rej| res.resolve(5));
    let observed = Rc::new(Cell::new(None));
    let sink = observed.clone();
    promise.then(move |v| sink.set(Some(v)));
    assert_eq!(observed.get(), None);
    run_event_loop();
    assert_eq!(observed.get(), Some(5));
}

#[test]
fn executor_rejection_is_observable_immediately() {
    reset_event_loop();
    let promise: SmartPromise<i32> = SmartPromise::new(|_res, rej| rej.reject(Reason::new("reason")));
    promise.catch(|_| {});
    assert!(promise.is_settled());
    assert!(promise.is_rejected());
    assert!(!promise.is_fulfilled());
    assert!(promise.value().is_none());
    assert_eq!(promise.reason().unwrap().downcast_ref::<&str>(), Some(&"reason"));
    run_event_loop();
    assert!(take_unhandled_rejections().is_empty());
}

#[test]
fn executor_rejection_reaches_continuations() {
    let promise: SmartPromise<i32> = SmartPromise::new(|_res, rej| rej.reject(Reason::new("reason")));
    let caught = Rc::new(RefCell::new(None));
    let sink = caught.clone();
    promise.catch(move |reason| *sink.borrow_mut() = Some(reason));
    run_event_loop();
    let caught = caught.borrow();
    assert_eq!(caught.as_ref().unwrap().downcast_ref::<&str>(), Some(&"reason"));
}

#[test]
fn pending_promise_has_empty_slots() {
    let promise: SmartPromise<i32> = SmartPromise::pending();
    assert!(!promise.is_settled());
    assert!(!promise.is_fulfilled());
    assert!(!promise.is_rejected());
    assert!(promise.value().is_none());
    assert!(promise.reason().is_none());
    assert!(promise.settled_result().is_none());
}

#[test]
fn executor_that_never_settles_leaves_promise_pending() {
    let promise: SmartPromise<i32> = SmartPromise::new(|_res, _rej| {});
    assert!(!promise.is_settled());
    promise.resolve(5);
    assert!(promise.is_fulfilled());
    assert_eq!(promise.value(), Some(5));
}

#[test]
fn resolution_outside_the_executor() {
    let promise = SmartPromise::pending();
    assert!(!promise.is_fulfilled());
    assert!(promise.value().is_none());
    promise.resolve(5);
    assert!(promise.is_fulfilled());
    assert_eq!(promise.value(), Some(5));
    assert!(matches!(promise.settled_result(), Some(Ok(5))));
}

#[test]
fn rejection_outside_the_executor() {
    reset_event_loop();
    let promise: SmartPromise<i32> = SmartPromise::pending();
    promise.catch(|_| {});
    assert!(!promise.is_rejected());
    assert!(promise.reason().is_none());
    promise.reject(Reason::new("fail"));
    assert!(promise.is_rejected());
    assert_eq!(promise.reason().unwrap().downcast_ref::<&str>(), Some(&"fail"));
    run_event_loop();
    assert!(take_unhandled_rejections().is_empty());
}

#[test]
fn entry_points_captured_in_executor_work_after_construction() {
    let captured: Rc<RefCell<Option<Resolver<i32>>>> = Rc::new(RefCell::new(None));
    let slot = captured.clone();
    let promise = SmartPromise::new(move |res, _rej| *slot.borrow_mut() = Some(res));
    assert!(!promise.is_settled());

    let resolver = captured.borrow_mut().take().unwrap();
    resolver.resolve(5);
    assert!(promise.is_fulfilled());
    assert_eq!(promise.value(), Some(5));
}

#[test]
fn cloned_entry_points_settle_the_same_promise() {
    let promise: SmartPromise<i32> = SmartPromise::pending();
    let rejecter = promise.rejecter();
    promise.catch(|_| {});
    rejecter.reject(Reason::new(404usize));
    assert!(promise.is_rejected());
    assert_eq!(promise.reason().unwrap().downcast_ref::<usize>(), Some(&404));
}

#[test]
fn second_resolution_is_ignored() {
    let promise = SmartPromise::pending();
    promise.resolve(5);
    promise.resolve(6);
    assert!(promise.is_fulfilled());
    assert_eq!(promise.value(), Some(5));
}

#[test]
fn rejection_after_resolution_is_ignored() {
    reset_event_loop();
    let promise = SmartPromise::pending();
    promise.resolve(5);
    promise.reject(Reason::new("too late"));
    assert!(promise.is_fulfilled());
    assert!(!promise.is_rejected());
    assert_eq!(promise.value(), Some(5));
    assert!(promise.reason().is_none());
    // The ignored rejection never reaches the task queue, so no unhandled
    // report appears either.
    run_event_loop();
    assert!(take_unhandled_rejections().is_empty());
}

#[test]
fn resolution_after_rejection_is_ignored() {
    let promise: SmartPromise<i32> = SmartPromise::pending();
    promise.catch(|_| {});
    promise.reject(Reason::new("fail"));
    promise.resolve(1);
    assert!(promise.is_rejected());
    assert!(promise.value().is_none());
    assert_eq!(promise.reason().unwrap().downcast_ref::<&str>(), Some(&"fail"));
}

#[test]
fn settled_result_reports_both_outcomes() {
    let fulfilled = SmartPromise::pending();
    fulfilled.resolve(7);
    assert!(matches!(fulfilled.settled_result(), Some(Ok(7))));

    let rejected: SmartPromise<i32> = SmartPromise::pending();
    rejected.catch(|_| {});
    rejected.reject(Reason::new("nope"));
    match rejected.settled_result() {
        Some(Err(reason)) => assert_eq!(reason.downcast_ref::<&str>(), Some(&"nope")),
        other => panic!("expected a rejection result, got {other:?}"),
    }
}

#[test]
fn wrapper_substitutes_for_the_base_promise() {
    let promise = SmartPromise::pending();
    let order = Rc::new(RefCell::new(Vec::new()));

    let sink = order.clone();
    promise.then(move |v| sink.borrow_mut().push(("first", v)));
    let sink = order.clone();
    promise.as_promise().then(move |v| sink.borrow_mut().push(("second", v)));

    promise.resolve(3);
    run_event_loop();
    assert_eq!(*order.borrow(), vec![("first", 3), ("second", 3)]);
}
