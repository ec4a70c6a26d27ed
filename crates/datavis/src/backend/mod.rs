//! Windowing system contract.
//!
//! The registry and windows only talk to the platform through these traits:
//! - [`Connector`] opens a connection on the event thread
//! - [`EventPump`] runs that thread's event loop, firing close callbacks
//! - [`Connection`] creates native windows and binds drawing surfaces
//! - [`NativeWindow`] / [`DrawSurface`] are the per-window resources
//!
//! [`winit`] is the desktop implementation; [`headless`] records calls for
//! tests and CI machines without a display.

pub mod headless;
pub mod winit;

use std::sync::Arc;

use crate::error::Result;
use crate::paint::Color;

/// Opens a windowing connection.
///
/// `open` runs on the thread that will later run the returned [`EventPump`],
/// since platform event loops are usually bound to the thread that made them.
pub trait Connector: Send + 'static {
    fn open(self: Box<Self>) -> Result<(Arc<dyn Connection>, Box<dyn EventPump>)>;
}

/// The event-processing loop of an open connection.
pub trait EventPump {
    /// Dispatches events until the connection goes away. Close callbacks are
    /// invoked from inside this call.
    fn run(self: Box<Self>);
}

/// An open windowing connection shared by every window of a registry.
pub trait Connection: Send + Sync {
    fn create_window(&self, spec: &WindowSpec) -> Result<Arc<dyn NativeWindow>>;

    /// Binds a drawing surface to `window`. The surface is released on drop.
    fn acquire_surface<'w>(&self, window: &'w dyn NativeWindow) -> Result<Box<dyn DrawSurface + 'w>>;
}

/// A platform window, opaque beyond these operations.
pub trait NativeWindow: Send + Sync {
    /// Registers the callback fired once, on the event thread, when the user
    /// closes the window through the window manager.
    fn on_graceful_close(&self, callback: Box<dyn FnOnce() + Send>);

    /// Drops every event and pointer binding of this window.
    fn detach_events(&self);

    /// Destroys the platform window. Idempotent.
    fn destroy(&self);

    /// Shows the window.
    fn map(&self);

    fn set_title(&self, title: &str);

    /// Current size in physical pixels.
    fn geometry(&self) -> (u32, u32);

    fn as_any(&self) -> &dyn std::any::Any;
}

/// A temporary pixel buffer bound to a native window.
pub trait DrawSurface {
    /// Writes one pixel. Out-of-bounds coordinates are ignored.
    fn set_pixel(&mut self, x: i32, y: i32, color: Color);

    /// Flushes written pixels and shows them on the window.
    fn present(&mut self);
}

/// Events a native window reports.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct EventMask {
    pub button_release: bool,
    pub close: bool,
}

impl Default for EventMask {
    fn default() -> Self {
        Self {
            button_release: true,
            close: true,
        }
    }
}

/// Native window creation parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSpec {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub background: Color,
    pub events: EventMask,
}

impl WindowSpec {
    /// Plot window defaults: top-left origin, opaque white background,
    /// button-release and close events.
    pub fn plot(width: u32, height: u32) -> Self {
        Self {
            x: 0,
            y: 0,
            width,
            height,
            background: Color::WHITE,
            events: EventMask::default(),
        }
    }
}
