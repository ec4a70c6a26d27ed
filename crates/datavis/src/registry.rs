//! Live-window registry and close synchronization.
//!
//! A [`Registry`] owns one windowing connection, the event thread pumping
//! it, and the set of open windows. Every close, whether requested by code
//! or by the user through the window manager, goes through
//! [`Registry::remove_window`], which wakes whoever is waiting on that
//! window and, when it was the last one, whoever is waiting on all of them.
//!
//! Waiting is a rendezvous: each waiter registers its own notifier under
//! the lock that guards the window set, so it either sees the window
//! already gone or is guaranteed a signal. The remover drains the notifiers
//! it answers under that lock and signals each one after releasing it.

use std::collections::HashMap;
use std::fmt;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::backend::winit::WinitConnector;
use crate::backend::{Connection, Connector, NativeWindow};
use crate::error::{PlotError, Result};
use crate::sync::{lock, rendezvous, Notifier};

/// Stable handle of a window inside its registry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowKey(u64);

impl fmt::Display for WindowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "window#{}", self.0)
    }
}

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Name of the thread running the event loop.
    pub event_thread_name: String,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            event_thread_name: "datavis-events".to_string(),
        }
    }
}

/// Registry entry of one open window.
struct Slot {
    native: Arc<dyn NativeWindow>,
    /// Callers blocked in `Window::wait_for_closed` on this window.
    close_waiters: Vec<Notifier>,
}

struct RegistryState {
    windows: HashMap<WindowKey, Slot>,
    next_key: u64,
    /// Number used by the next default title. Advances for every window,
    /// titled or not, so default names never repeat.
    next_default_name: u64,
    /// Callers blocked in `wait_for_all_closed`.
    all_closed_waiters: Vec<Notifier>,
}

impl RegistryState {
    fn new() -> Self {
        Self {
            windows: HashMap::new(),
            next_key: 1,
            next_default_name: 1,
            all_closed_waiters: Vec::new(),
        }
    }

    fn default_name(&self) -> String {
        format!("Figure - {}", self.next_default_name)
    }

    fn add_window(&mut self, key: WindowKey, slot: Slot) {
        self.windows.insert(key, slot);
        self.next_default_name += 1;
    }

    /// Takes the global waiters if no window is left open.
    fn take_all_closed_waiters(&mut self) -> Vec<Notifier> {
        if self.windows.is_empty() {
            std::mem::take(&mut self.all_closed_waiters)
        } else {
            Vec::new()
        }
    }
}

/// Process-wide owner of the windowing connection and the open windows.
pub struct Registry {
    connection: Arc<dyn Connection>,
    state: Mutex<RegistryState>,
}

impl Registry {
    /// Opens `connector` on a new event thread and returns a registry
    /// bound to it.
    ///
    /// The returned registry is independent of the process-wide one; use
    /// [`initialize`] for that.
    pub fn new(connector: impl Connector, config: RegistryConfig) -> Result<Arc<Self>> {
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);
        let connector: Box<dyn Connector> = Box::new(connector);

        thread::Builder::new()
            .name(config.event_thread_name.clone())
            .spawn(move || match connector.open() {
                Ok((connection, pump)) => {
                    if ready_tx.send(Ok(connection)).is_ok() {
                        log::debug!("event loop running");
                        pump.run();
                    }
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| PlotError::Connection(format!("failed to spawn event thread: {e}")))?;

        let connection = ready_rx
            .recv()
            .map_err(|_| PlotError::connection("event thread exited before opening the connection"))??;

        log::info!("windowing connection opened ({})", config.event_thread_name);
        Ok(Arc::new(Self {
            connection,
            state: Mutex::new(RegistryState::new()),
        }))
    }

    pub(crate) fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    /// Title the next untitled window would get, `"Figure - N"`.
    pub fn next_default_name(&self) -> String {
        lock(&self.state).default_name()
    }

    /// Number of open windows.
    pub fn window_count(&self) -> usize {
        lock(&self.state).windows.len()
    }

    pub fn is_open(&self, key: WindowKey) -> bool {
        lock(&self.state).windows.contains_key(&key)
    }

    pub(crate) fn reserve_key(&self) -> WindowKey {
        let mut state = lock(&self.state);
        let key = WindowKey(state.next_key);
        state.next_key += 1;
        key
    }

    /// Names and registers a fully built window, making it visible to
    /// registry-wide operations. Returns the title applied.
    pub(crate) fn add_window(
        &self,
        key: WindowKey,
        native: Arc<dyn NativeWindow>,
        title: &str,
    ) -> String {
        let mut state = lock(&self.state);
        let title = if title.is_empty() {
            state.default_name()
        } else {
            title.to_string()
        };
        native.set_title(&title);

        state.add_window(
            key,
            Slot {
                native,
                close_waiters: Vec::new(),
            },
        );
        log::debug!("{key} registered as {title:?} ({} open)", state.windows.len());
        title
    }

    pub(crate) fn native(&self, key: WindowKey) -> Option<Arc<dyn NativeWindow>> {
        lock(&self.state)
            .windows
            .get(&key)
            .map(|slot| Arc::clone(&slot.native))
    }

    /// Closes `key` and wakes its waiters. Safe to call any number of times.
    ///
    /// Waiters on the window are signalled before waiters on the whole set.
    pub fn remove_window(&self, key: WindowKey) {
        let (slot, all_waiters) = {
            let mut state = lock(&self.state);
            let Some(slot) = state.windows.remove(&key) else {
                return;
            };
            let all_waiters = state.take_all_closed_waiters();
            log::debug!("{key} removed ({} open)", state.windows.len());
            (slot, all_waiters)
        };

        slot.native.destroy();

        if !slot.close_waiters.is_empty() {
            log::debug!("{key}: waking {} close waiter(s)", slot.close_waiters.len());
            slot.close_waiters.into_iter().for_each(Notifier::notify);
        }
        if !all_waiters.is_empty() {
            log::debug!("last window closed: waking {} waiter(s)", all_waiters.len());
            all_waiters.into_iter().for_each(Notifier::notify);
        }
    }

    /// Closes every open window through [`remove_window`](Self::remove_window).
    pub fn close_all(&self) {
        let keys: Vec<WindowKey> = lock(&self.state).windows.keys().copied().collect();
        for key in keys {
            self.remove_window(key);
        }

        // Covers waiters that registered while windows were closing.
        let waiters = lock(&self.state).take_all_closed_waiters();
        waiters.into_iter().for_each(Notifier::notify);
    }

    /// Blocks until `key` is closed. Returns immediately if it already is.
    pub(crate) fn wait_for_window(&self, key: WindowKey) {
        let waiter = {
            let mut state = lock(&self.state);
            let Some(slot) = state.windows.get_mut(&key) else {
                return;
            };
            let (notifier, waiter) = rendezvous();
            slot.close_waiters.push(notifier);
            waiter
        };
        waiter.wait();
    }

    /// Blocks until no window is open. Returns immediately if none is.
    ///
    /// There is no deadline: with a window open and nobody closing it, this
    /// never returns.
    pub fn wait_for_all_closed(&self) {
        let waiter = {
            let mut state = lock(&self.state);
            if state.windows.is_empty() {
                return;
            }
            let (notifier, waiter) = rendezvous();
            state.all_closed_waiters.push(notifier);
            waiter
        };
        waiter.wait();
    }
}

static GLOBAL: Mutex<Option<Arc<Registry>>> = Mutex::new(None);

/// Returns the process-wide registry, opening the desktop backend on first use.
///
/// On failure nothing is kept, so a later call retries.
pub fn initialize() -> Result<Arc<Registry>> {
    initialize_with(WinitConnector::default())
}

/// Like [`initialize`], opening `connector` if no registry exists yet.
/// An existing registry is returned unchanged and `connector` is dropped.
pub fn initialize_with(connector: impl Connector) -> Result<Arc<Registry>> {
    let mut global = lock(&GLOBAL);
    if let Some(registry) = global.as_ref() {
        return Ok(Arc::clone(registry));
    }

    let registry = Registry::new(connector, RegistryConfig::default()).inspect_err(|e| {
        log::error!("failed to initialize window registry: {e}");
    })?;
    *global = Some(Arc::clone(&registry));
    Ok(registry)
}

/// The process-wide registry, if one was initialized.
pub fn global() -> Option<Arc<Registry>> {
    lock(&GLOBAL).clone()
}

/// Closes every window of the process-wide registry. No-op before initialization.
pub fn close_all_windows() {
    if let Some(registry) = global() {
        registry.close_all();
    }
}

/// Blocks until every window of the process-wide registry is closed.
/// Returns immediately before initialization.
pub fn wait_for_all_windows_closed() {
    if let Some(registry) = global() {
        registry.wait_for_all_closed();
    }
}
