//! Display-less backend.
//!
//! Windows are plain pixel buffers. A [`HeadlessController`] observes every
//! call the registry makes and can play the role of the user, closing a
//! window from the event thread the way a window manager would.

use std::any::Any;
use std::collections::HashMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::{Connection, Connector, DrawSurface, EventPump, NativeWindow, WindowSpec};
use crate::coords::Point;
use crate::error::{PlotError, Result};
use crate::paint::Color;
use crate::sync::lock;

/// Identifier of a headless native window, assigned from 1 in creation order.
pub type HeadlessId = u64;

/// Call counters shared by a connection and its controller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct HeadlessStats {
    pub windows_created: usize,
    pub windows_destroyed: usize,
    pub surfaces_acquired: usize,
    pub surfaces_released: usize,
    pub presents: usize,
}

#[derive(Default)]
struct Shared {
    stats: Mutex<HeadlessStats>,
    windows: Mutex<HashMap<HeadlessId, Arc<HeadlessWindow>>>,
    next_id: Mutex<HeadlessId>,
    fail_surfaces: Mutex<bool>,
}

enum Event {
    UserClose { id: HeadlessId, done: Sender<bool> },
}

/// Opens a [`HeadlessConnection`]. Use [`HeadlessConnector::fail`] to
/// simulate a display that cannot be reached.
pub struct HeadlessConnector {
    shared: Arc<Shared>,
    events: Receiver<Event>,
    fail_with: Option<String>,
}

impl HeadlessConnector {
    /// Returns a connector and the controller observing what it opens.
    pub fn new() -> (Self, HeadlessController) {
        let shared = Arc::new(Shared::default());
        let (tx, rx) = mpsc::channel();
        let connector = Self {
            shared: Arc::clone(&shared),
            events: rx,
            fail_with: None,
        };
        (connector, HeadlessController { shared, events: tx })
    }

    /// A connector whose `open` always fails with `reason`.
    pub fn fail(reason: impl Into<String>) -> Self {
        let (mut connector, _) = Self::new();
        connector.fail_with = Some(reason.into());
        connector
    }
}

impl Connector for HeadlessConnector {
    fn open(self: Box<Self>) -> Result<(Arc<dyn Connection>, Box<dyn EventPump>)> {
        if let Some(reason) = self.fail_with {
            return Err(PlotError::Connection(reason));
        }

        let connection = HeadlessConnection {
            shared: Arc::clone(&self.shared),
        };
        let pump = HeadlessPump {
            shared: self.shared,
            events: self.events,
        };
        Ok((Arc::new(connection), Box::new(pump)))
    }
}

struct HeadlessPump {
    shared: Arc<Shared>,
    events: Receiver<Event>,
}

impl EventPump for HeadlessPump {
    fn run(self: Box<Self>) {
        // Ends once every controller is dropped.
        while let Ok(event) = self.events.recv() {
            match event {
                Event::UserClose { id, done } => {
                    let window = lock(&self.shared.windows).get(&id).cloned();
                    let fired = match window {
                        Some(window) => window.fire_close(),
                        None => false,
                    };
                    let _ = done.send(fired);
                }
            }
        }
        log::debug!("headless event pump stopped");
    }
}

/// Test-side handle onto a headless connection.
#[derive(Clone)]
pub struct HeadlessController {
    shared: Arc<Shared>,
    events: Sender<Event>,
}

impl HeadlessController {
    pub fn stats(&self) -> HeadlessStats {
        lock(&self.shared.stats).clone()
    }

    /// Ids of windows that have not been destroyed, in creation order.
    pub fn live_windows(&self) -> Vec<HeadlessId> {
        let mut ids: Vec<_> = lock(&self.shared.windows).keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn find_by_title(&self, title: &str) -> Option<HeadlessId> {
        lock(&self.shared.windows)
            .values()
            .find(|w| lock(&w.state).title == title)
            .map(|w| w.id)
    }

    pub fn title(&self, id: HeadlessId) -> Option<String> {
        self.with_window(id, |s| s.title.clone())
    }

    pub fn is_mapped(&self, id: HeadlessId) -> bool {
        self.with_window(id, |s| s.mapped).unwrap_or(false)
    }

    /// Returns the creation parameters the window was opened with.
    pub fn spec(&self, id: HeadlessId) -> Option<WindowSpec> {
        self.with_window(id, |s| s.spec.clone())
    }

    pub fn pixel(&self, id: HeadlessId, x: i32, y: i32) -> Option<Color> {
        self.with_window(id, |s| {
            Point::new(x, y)
                .index_in(s.spec.width, s.spec.height)
                .map(|i| s.pixels[i])
        })
        .flatten()
    }

    /// Makes every following surface acquisition fail until reset.
    pub fn set_surface_failure(&self, fail: bool) {
        *lock(&self.shared.fail_surfaces) = fail;
    }

    /// Delivers a user close for `id` on the event thread and waits until the
    /// close callback has returned.
    ///
    /// Returns `false` if the window is unknown, has no callback, or the
    /// event thread did not answer within `timeout`.
    pub fn user_close(&self, id: HeadlessId, timeout: Duration) -> bool {
        let (done, rx) = mpsc::channel();
        if self.events.send(Event::UserClose { id, done }).is_err() {
            return false;
        }
        rx.recv_timeout(timeout).unwrap_or(false)
    }

    fn with_window<T>(&self, id: HeadlessId, f: impl FnOnce(&WindowState) -> T) -> Option<T> {
        let window = lock(&self.shared.windows).get(&id).cloned()?;
        let state = lock(&window.state);
        Some(f(&state))
    }
}

pub struct HeadlessConnection {
    shared: Arc<Shared>,
}

impl Connection for HeadlessConnection {
    fn create_window(&self, spec: &WindowSpec) -> Result<Arc<dyn NativeWindow>> {
        let id = {
            let mut next = lock(&self.shared.next_id);
            *next += 1;
            *next
        };

        let window = Arc::new(HeadlessWindow {
            id,
            shared: Arc::clone(&self.shared),
            state: Mutex::new(WindowState {
                spec: spec.clone(),
                title: String::new(),
                mapped: false,
                destroyed: false,
                events_attached: true,
                pixels: vec![spec.background; spec.width as usize * spec.height as usize],
                on_close: None,
            }),
        });

        lock(&self.shared.windows).insert(id, Arc::clone(&window));
        lock(&self.shared.stats).windows_created += 1;
        Ok(window)
    }

    fn acquire_surface<'w>(&self, window: &'w dyn NativeWindow) -> Result<Box<dyn DrawSurface + 'w>> {
        let window = window
            .as_any()
            .downcast_ref::<HeadlessWindow>()
            .ok_or_else(|| PlotError::surface("window belongs to another backend"))?;

        if *lock(&self.shared.fail_surfaces) {
            return Err(PlotError::surface("surface acquisition disabled"));
        }
        if lock(&window.state).destroyed {
            return Err(PlotError::surface("window has been destroyed"));
        }

        lock(&self.shared.stats).surfaces_acquired += 1;
        Ok(Box::new(HeadlessSurface {
            window,
            staged: Vec::new(),
        }))
    }
}

struct WindowState {
    spec: WindowSpec,
    title: String,
    mapped: bool,
    destroyed: bool,
    events_attached: bool,
    pixels: Vec<Color>,
    on_close: Option<Box<dyn FnOnce() + Send>>,
}

pub struct HeadlessWindow {
    id: HeadlessId,
    shared: Arc<Shared>,
    state: Mutex<WindowState>,
}

impl HeadlessWindow {
    pub fn id(&self) -> HeadlessId {
        self.id
    }

    fn fire_close(&self) -> bool {
        let callback = {
            let mut state = lock(&self.state);
            if !state.events_attached || !state.spec.events.close {
                return false;
            }
            state.on_close.take()
        };
        match callback {
            Some(cb) => {
                cb();
                true
            }
            None => false,
        }
    }
}

impl NativeWindow for HeadlessWindow {
    fn on_graceful_close(&self, callback: Box<dyn FnOnce() + Send>) {
        lock(&self.state).on_close = Some(callback);
    }

    fn detach_events(&self) {
        lock(&self.state).events_attached = false;
    }

    fn destroy(&self) {
        {
            let mut state = lock(&self.state);
            if state.destroyed {
                return;
            }
            state.destroyed = true;
            state.mapped = false;
            state.on_close = None;
        }
        lock(&self.shared.windows).remove(&self.id);
        lock(&self.shared.stats).windows_destroyed += 1;
    }

    fn map(&self) {
        lock(&self.state).mapped = true;
    }

    fn set_title(&self, title: &str) {
        lock(&self.state).title = title.to_string();
    }

    fn geometry(&self) -> (u32, u32) {
        let state = lock(&self.state);
        if state.destroyed {
            return (0, 0);
        }
        (state.spec.width, state.spec.height)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Staged pixels become visible on `present`; release is counted on drop.
struct HeadlessSurface<'w> {
    window: &'w HeadlessWindow,
    staged: Vec<(i32, i32, Color)>,
}

impl DrawSurface for HeadlessSurface<'_> {
    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        self.staged.push((x, y, color));
    }

    fn present(&mut self) {
        {
            let mut state = lock(&self.window.state);
            let (w, h) = (state.spec.width, state.spec.height);
            for (x, y, color) in self.staged.drain(..) {
                if let Some(i) = Point::new(x, y).index_in(w, h) {
                    state.pixels[i] = color.over(state.pixels[i]);
                }
            }
        }
        lock(&self.window.shared.stats).presents += 1;
    }
}

impl Drop for HeadlessSurface<'_> {
    fn drop(&mut self) {
        lock(&self.window.shared.stats).surfaces_released += 1;
    }
}
