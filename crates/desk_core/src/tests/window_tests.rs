use std::sync::Arc;

use super::*;
use crate::test_support::{FakeHost, HostCall};

fn manager() -> (WindowManager, Arc<FakeHost>) {
    let host = Arc::new(FakeHost::default());
    (WindowManager::new(host.clone()), host)
}

#[test]
fn ensure_twice_returns_the_same_window_for_every_role() {
    let (mut windows, host) = manager();
    let specs = WindowSpecs::default();

    for role in WindowRole::ALL {
        let first = windows.ensure(role, specs.for_role(role)).expect("open").id();
        let second = windows.ensure(role, specs.for_role(role)).expect("reuse").id();
        assert_eq!(first, second, "{role} window must be a singleton");
    }
    assert_eq!(host.opened(), 3);
}

#[test]
fn child_windows_are_parented_to_main() {
    let (mut windows, host) = manager();
    let specs = WindowSpecs::default();
    let main = windows
        .ensure(WindowRole::Main, &specs.main)
        .expect("main")
        .id();
    let register = windows
        .ensure(WindowRole::Register, &specs.register)
        .expect("register")
        .id();

    assert_eq!(host.spec(register).parent, Some(main));
    assert!(host.spec(register).modal);
    assert_eq!(host.spec(main).parent, None);
}

#[test]
fn user_close_clears_role_and_next_ensure_opens_a_new_window() {
    let (mut windows, host) = manager();
    let specs = WindowSpecs::default();
    let first = windows
        .ensure(WindowRole::List, &specs.list)
        .expect("open")
        .id();

    assert_eq!(windows.on_closed(first), Some(WindowRole::List));
    assert!(windows.get(WindowRole::List).is_none());

    let second = windows
        .ensure(WindowRole::List, &specs.list)
        .expect("reopen")
        .id();
    assert_ne!(first, second);
    assert_eq!(host.opened(), 2);
}

#[test]
fn programmatic_close_transitions_once() {
    let (mut windows, host) = manager();
    let specs = WindowSpecs::default();
    let register = windows
        .ensure(WindowRole::Register, &specs.register)
        .expect("open")
        .id();

    assert_eq!(windows.close(WindowRole::Register), Some(register));
    assert!(windows.get(WindowRole::Register).is_none());
    assert!(host.calls().contains(&HostCall::Close(register)));

    // The host echoes the close back; only the first echo counts.
    assert_eq!(windows.on_closed(register), Some(WindowRole::Register));
    assert_eq!(windows.on_closed(register), None);
}

#[test]
fn closing_a_role_without_a_window_is_a_no_op() {
    let (mut windows, host) = manager();
    assert_eq!(windows.close(WindowRole::Register), None);
    assert_eq!(windows.close(WindowRole::Register), None);
    assert!(host.calls().is_empty());
}

#[test]
fn stale_close_does_not_clear_a_reopened_window() {
    let (mut windows, _host) = manager();
    let specs = WindowSpecs::default();
    let old = windows
        .ensure(WindowRole::Register, &specs.register)
        .expect("open")
        .id();
    windows.close(WindowRole::Register);
    let new = windows
        .ensure(WindowRole::Register, &specs.register)
        .expect("reopen")
        .id();

    assert_eq!(windows.on_closed(old), Some(WindowRole::Register));
    assert_eq!(windows.get(WindowRole::Register).map(WindowHandle::id), Some(new));
}

#[test]
fn rejected_open_leaves_role_empty() {
    let (mut windows, host) = manager();
    host.reject(WindowRole::List);

    let err = windows
        .ensure(WindowRole::List, &WindowSpecs::default().list)
        .expect_err("host rejects");
    assert!(matches!(err, WindowError::HostRejected { role: WindowRole::List, .. }));
    assert!(windows.get(WindowRole::List).is_none());
}

#[test]
fn send_to_dropped_receiver_reports_missing_window() {
    let (tx, rx) = crossbeam_channel::bounded(1);
    let handle = WindowHandle {
        id: WindowId(9),
        role: WindowRole::Main,
        events: tx,
        generation: 0,
        loaded: false,
    };
    drop(rx);

    let err = handle
        .send(WindowEvent::SerialData { line: "x".into() })
        .expect_err("receiver gone");
    assert_eq!(
        err,
        DeliveryError::WindowMissing {
            window_id: WindowId(9),
            channel: "serial-data"
        }
    );
}

#[test]
fn only_the_current_navigation_marks_a_window_loaded() {
    let (mut windows, host) = manager();
    let specs = WindowSpecs::default();
    let first = windows
        .ensure(WindowRole::List, &specs.list)
        .expect("open")
        .current_load();
    assert_eq!(host.latest_load(first.window_id), first);

    let second = windows.reload(WindowRole::List).expect("reload");
    assert_eq!(second.generation, first.generation + 1);
    assert!(host.calls().contains(&HostCall::Reload(first.window_id)));

    assert!(!windows.on_loaded(first), "superseded navigation");
    assert!(!windows.get(WindowRole::List).expect("list").is_loaded());

    assert!(windows.on_loaded(second));
    assert!(windows.get(WindowRole::List).expect("list").is_loaded());

    assert_eq!(windows.reload(WindowRole::Register), None);
}
