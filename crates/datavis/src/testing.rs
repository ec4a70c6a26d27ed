//! Helpers shared by the in-crate tests.

use std::sync::mpsc::{self, Receiver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::backend::headless::{HeadlessConnector, HeadlessController};
use crate::registry::{Registry, RegistryConfig};

/// Upper bound for anything expected to finish.
pub(crate) const TIMEOUT: Duration = Duration::from_secs(5);

/// How long something must stay blocked to count as blocked.
const SETTLE: Duration = Duration::from_millis(100);

pub(crate) fn headless_registry() -> (Arc<Registry>, HeadlessController) {
    let (connector, ctl) = HeadlessConnector::new();
    let registry = Registry::new(connector, RegistryConfig::default()).unwrap();
    (registry, ctl)
}

/// Runs `f` on a new thread; the receiver yields once `f` returns.
pub(crate) fn spawn_signal(f: impl FnOnce() + Send + 'static) -> Receiver<()> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        f();
        let _ = tx.send(());
    });
    rx
}

pub(crate) fn assert_blocked(done: &Receiver<()>) {
    assert!(
        done.recv_timeout(SETTLE).is_err(),
        "expected the call to still be blocked"
    );
}

pub(crate) fn assert_returns(what: &str, f: impl FnOnce() + Send + 'static) {
    spawn_signal(f)
        .recv_timeout(TIMEOUT)
        .unwrap_or_else(|_| panic!("{what} did not return"));
}
