//! End-to-end behaviour of the asynchronous open bridge over the mock driver.

use nfc_core::mock::MockDriver;
use nfc_core::{Context, ContextConfig, Device, ErrorKind, EventLoop, Result, Slot};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::thread;

type Outcome = Rc<RefCell<Vec<Result<Device<MockDriver>>>>>;

fn setup(readers: &[&str]) -> (Arc<MockDriver>, Context<MockDriver>, EventLoop<MockDriver>) {
    let driver = Arc::new(MockDriver::with_readers(readers));
    let context = Context::new(driver.clone(), ContextConfig::default()).unwrap();
    let host = EventLoop::new().unwrap();
    (driver, context, host)
}

fn collector() -> (Outcome, impl FnOnce(Result<Device<MockDriver>>) + 'static) {
    let outcome: Outcome = Rc::new(RefCell::new(Vec::new()));
    let sink = outcome.clone();
    (outcome, move |result: Result<Device<MockDriver>>| {
        sink.borrow_mut().push(result)
    })
}

#[test]
fn open_with_one_reader_delivers_device() {
    let (driver, context, mut host) = setup(&["ACS ACR122U PICC Interface 00 00"]);
    let (outcome, callback) = collector();

    context.open(&mut host, "", callback).unwrap();
    assert_eq!(host.run_until_idle(), 1);

    let mut results = outcome.borrow_mut();
    assert_eq!(results.len(), 1);
    let device = results.pop().unwrap().unwrap();
    assert!(!device.name().is_empty());
    assert!(!device.connstring().is_empty());
    assert_eq!(context.slot(), Slot::Occupied);
    assert_eq!(context.pending_operations(), 0);
    assert_eq!(driver.stats().opens, 1);
}

#[test]
fn open_with_no_readers_delivers_open_failure() {
    let (_driver, context, mut host) = setup(&[]);
    let (outcome, callback) = collector();

    context.open(&mut host, "", callback).unwrap();
    host.run_until_idle();

    let results = outcome.borrow();
    assert_eq!(results.len(), 1);
    let err = results[0].as_ref().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::OpenFailure);
    assert_eq!(context.slot(), Slot::Vacant);
    assert_eq!(context.pending_operations(), 0);
}

#[test]
fn oversized_connstring_is_rejected_synchronously() {
    let (driver, context, mut host) = setup(&["reader"]);
    let (outcome, callback) = collector();

    let err = context
        .open(&mut host, &"x".repeat(nfc_core::MAX_CONNSTRING_LEN + 1), callback)
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    assert_eq!(host.run_until_idle(), 0);
    assert!(outcome.borrow().is_empty());
    assert!(driver.open_threads().is_empty());
    assert_eq!(context.pending_operations(), 0);
}

#[test]
fn second_open_while_pending_is_a_state_error() {
    let (driver, context, mut host) = setup(&["reader"]);
    let gate = driver.hold_opens();
    let (first, first_cb) = collector();
    let (second, second_cb) = collector();

    context.open(&mut host, "", first_cb).unwrap();
    let err = context.open(&mut host, "", second_cb).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);

    gate.release();
    host.run_until_idle();

    assert!(second.borrow().is_empty());
    let results = first.borrow();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_ref().unwrap().name(), "reader");
}

#[test]
fn second_open_while_device_established_is_a_state_error() {
    let (_driver, context, mut host) = setup(&["reader"]);
    let (first, first_cb) = collector();

    context.open(&mut host, "", first_cb).unwrap();
    host.run_until_idle();
    assert!(first.borrow()[0].is_ok());

    let (_second, second_cb) = collector();
    let err = context.open(&mut host, "", second_cb).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
}

#[test]
fn closing_device_frees_slot_for_next_open() {
    let (driver, context, mut host) = setup(&["reader"]);
    let (first, first_cb) = collector();

    context.open(&mut host, "", first_cb).unwrap();
    host.run_until_idle();
    let device = first.borrow_mut().pop().unwrap().unwrap();

    drop(device);
    assert_eq!(driver.stats().closes, 1);
    assert_eq!(context.slot(), Slot::Vacant);

    let (second, second_cb) = collector();
    context.open(&mut host, "", second_cb).unwrap();
    host.run_until_idle();
    assert!(second.borrow()[0].is_ok());
    assert_eq!(driver.stats().opens, 2);
}

#[test]
fn closed_context_rejects_open_with_state_error() {
    let (_driver, context, mut host) = setup(&["reader"]);
    context.close();

    let (outcome, callback) = collector();
    let err = context.open(&mut host, "", callback).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(host.run_until_idle(), 0);
    assert!(outcome.borrow().is_empty());
}

#[test]
fn failed_construction_reports_resource_error() {
    let driver = Arc::new(MockDriver::new().with_failing_init());
    let err = Context::new(driver, ContextConfig::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resource);
}

#[test]
fn dropping_context_mid_open_defers_native_release() {
    let (driver, context, mut host) = setup(&["reader"]);
    let gate = driver.hold_opens();
    let (outcome, callback) = collector();

    context.open(&mut host, "", callback).unwrap();
    drop(context);
    assert_eq!(driver.stats().exits, 0);

    gate.release();
    host.run_until_idle();

    assert_eq!(driver.stats().exits, 1);
    assert_eq!(outcome.borrow().len(), 1);
}

#[test]
fn open_runs_on_worker_and_callback_on_host_thread() {
    let (driver, context, mut host) = setup(&["reader"]);
    let host_thread = thread::current().id();
    let callback_thread = Rc::new(RefCell::new(None));
    let seen = callback_thread.clone();

    context
        .open(&mut host, "", move |_| {
            *seen.borrow_mut() = Some(thread::current().id());
        })
        .unwrap();
    host.run_until_idle();

    assert_eq!(*callback_thread.borrow(), Some(host_thread));
    let workers = driver.open_threads();
    assert_eq!(workers.len(), 1);
    assert_ne!(workers[0], host_thread);
}

#[test]
fn opens_on_separate_contexts_proceed_independently() {
    let driver = Arc::new(MockDriver::with_readers(&["reader"]));
    let first = Context::new(driver.clone(), ContextConfig::default()).unwrap();
    let second = Context::new(driver.clone(), ContextConfig::default()).unwrap();
    let mut host = EventLoop::new().unwrap();
    let (outcome, first_cb) = collector();
    let (other, second_cb) = collector();

    first.open(&mut host, "", first_cb).unwrap();
    second.open(&mut host, "mock:reader", second_cb).unwrap();
    assert_eq!(host.run_until_idle(), 2);

    assert!(outcome.borrow()[0].is_ok());
    assert!(other.borrow()[0].is_ok());
    assert_ne!(first.id(), second.id());
}

#[test]
fn version_is_stable() {
    let first = nfc_core::version();
    for _ in 0..10 {
        assert_eq!(nfc_core::version(), first);
    }
    assert!(!first.is_empty());
}
