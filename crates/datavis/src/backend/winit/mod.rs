//! Desktop backend: `winit` windows presented through `wgpu`.
//!
//! The winit event loop lives on the registry's event thread. Windows can
//! only be created from inside that loop, so [`WinitConnection`] posts a
//! request through the loop proxy and blocks on the reply. Close callbacks
//! run on the event thread and must not create windows themselves.

mod canvas;
mod gpu;
mod init;

pub use init::GpuInit;

use std::any::Any;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, SyncSender};
use std::sync::{Arc, Mutex, MutexGuard};

use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop, EventLoopProxy};
use winit::window::{Window, WindowId};

use self::canvas::PixelBuffer;
use self::gpu::{Gpu, SurfaceErrorAction};
use super::{Connection, Connector, DrawSurface, EventMask, EventPump, NativeWindow, WindowSpec};
use crate::error::{PlotError, Result};
use crate::paint::Color;
use crate::sync::lock;

/// Opens a winit event loop on the calling thread.
#[derive(Debug, Clone, Default)]
pub struct WinitConnector {
    pub gpu: GpuInit,
}

impl WinitConnector {
    pub fn new(gpu: GpuInit) -> Self {
        Self { gpu }
    }
}

impl Connector for WinitConnector {
    fn open(self: Box<Self>) -> Result<(Arc<dyn Connection>, Box<dyn EventPump>)> {
        let event_loop = build_event_loop()?;

        let windows = WindowMap::default();
        let connection = WinitConnection {
            proxy: Mutex::new(event_loop.create_proxy()),
            windows: windows.clone(),
            gpu: self.gpu,
        };
        let pump = WinitPump {
            event_loop,
            handler: Handler { windows },
        };

        Ok((Arc::new(connection), Box::new(pump)))
    }
}

#[cfg(target_os = "macos")]
fn build_event_loop() -> Result<EventLoop<Request>> {
    Err(PlotError::Connection(
        "the macOS event loop must run on the main thread".to_string(),
    ))
}

#[cfg(not(target_os = "macos"))]
fn build_event_loop() -> Result<EventLoop<Request>> {
    let mut builder = EventLoop::<Request>::with_user_event();

    #[cfg(all(unix, not(any(target_os = "ios", target_os = "android"))))]
    winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);

    #[cfg(target_os = "windows")]
    winit::platform::windows::EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);

    builder
        .build()
        .map_err(|e| PlotError::Connection(format!("failed to create winit EventLoop: {e}")))
}

type WindowMap = Arc<Mutex<HashMap<WindowId, Arc<WinitWindow>>>>;

/// Work the event loop performs on behalf of other threads.
enum Request {
    Create {
        spec: WindowSpec,
        reply: SyncSender<std::result::Result<Window, String>>,
    },
    /// Forgets the window and drops the last platform handle on the event thread.
    Destroy {
        id: WindowId,
        window: Option<Arc<Window>>,
    },
}

pub struct WinitConnection {
    proxy: Mutex<EventLoopProxy<Request>>,
    windows: WindowMap,
    gpu: GpuInit,
}

impl Connection for WinitConnection {
    fn create_window(&self, spec: &WindowSpec) -> Result<Arc<dyn NativeWindow>> {
        let (reply, rx) = mpsc::sync_channel(1);
        lock(&self.proxy)
            .send_event(Request::Create { spec: spec.clone(), reply })
            .map_err(|_| PlotError::connection("winit event loop has exited"))?;

        let window = rx
            .recv()
            .map_err(|_| PlotError::connection("winit event loop dropped a window request"))?
            .map_err(PlotError::Connection)?;
        let window = Arc::new(window);
        let id = window.id();

        let gpu = match pollster::block_on(Gpu::new(Arc::clone(&window), self.gpu.clone())) {
            Ok(gpu) => gpu,
            Err(e) => {
                let _ = lock(&self.proxy).send_event(Request::Destroy { id, window: Some(window) });
                return Err(PlotError::Connection(format!("{e:#}")));
            }
        };

        let (w, h): (u32, u32) = window.inner_size().into();
        let native = Arc::new(WinitWindow {
            id,
            proxy: Mutex::new(lock(&self.proxy).clone()),
            events: spec.events,
            attached: AtomicBool::new(true),
            on_close: Mutex::new(None),
            window: Mutex::new(Some(window)),
            canvas: Mutex::new(Some(Canvas {
                pixels: PixelBuffer::new(w, h, spec.background),
                gpu,
            })),
        });

        lock(&self.windows).insert(id, Arc::clone(&native));
        log::debug!("native window {id:?} created ({w}x{h})");
        Ok(native)
    }

    fn acquire_surface<'w>(&self, window: &'w dyn NativeWindow) -> Result<Box<dyn DrawSurface + 'w>> {
        let window = window
            .as_any()
            .downcast_ref::<WinitWindow>()
            .ok_or_else(|| PlotError::surface("window belongs to another backend"))?;

        let canvas = lock(&window.canvas);
        if canvas.is_none() {
            return Err(PlotError::surface("window has been destroyed"));
        }
        Ok(Box::new(WinitSurface { canvas }))
    }
}

struct Canvas {
    pixels: PixelBuffer,
    gpu: Gpu,
}

impl Canvas {
    fn present(&mut self) {
        if let Err(err) = self.gpu.present(&self.pixels) {
            let reason = err.to_string();
            match self.gpu.handle_surface_error(err) {
                SurfaceErrorAction::Fatal => log::error!("present failed: {reason}"),
                action => log::debug!("present skipped ({action:?}): {reason}"),
            }
        }
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        self.pixels.resize(size.width, size.height);
        self.gpu.resize(size);
    }
}

/// A winit window plus the pixels shown in it.
pub struct WinitWindow {
    id: WindowId,
    proxy: Mutex<EventLoopProxy<Request>>,
    events: EventMask,
    attached: AtomicBool,
    on_close: Mutex<Option<Box<dyn FnOnce() + Send>>>,
    window: Mutex<Option<Arc<Window>>>,
    canvas: Mutex<Option<Canvas>>,
}

impl WinitWindow {
    fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    fn with_window(&self, f: impl FnOnce(&Window)) {
        if let Some(w) = lock(&self.window).as_deref() {
            f(w);
        }
    }

    fn fire_close(&self) {
        let callback = lock(&self.on_close).take();
        match callback {
            Some(cb) => cb(),
            None => self.destroy(),
        }
    }

    fn redraw(&self) {
        if let Some(canvas) = lock(&self.canvas).as_mut() {
            canvas.present();
        }
    }

    fn resize(&self, size: PhysicalSize<u32>) {
        if let Some(canvas) = lock(&self.canvas).as_mut() {
            canvas.resize(size);
        }
        self.with_window(|w| w.request_redraw());
    }
}

impl NativeWindow for WinitWindow {
    fn on_graceful_close(&self, callback: Box<dyn FnOnce() + Send>) {
        *lock(&self.on_close) = Some(callback);
    }

    fn detach_events(&self) {
        self.attached.store(false, Ordering::Release);
    }

    fn destroy(&self) {
        // Surface first: it holds a window reference of its own.
        let canvas = lock(&self.canvas).take();
        drop(canvas);

        let window = lock(&self.window).take();
        if window.is_none() {
            return;
        }
        self.attached.store(false, Ordering::Release);

        // If the loop is gone the handle drops here instead.
        let _ = lock(&self.proxy).send_event(Request::Destroy { id: self.id, window });
        log::debug!("native window {:?} destroyed", self.id);
    }

    fn map(&self) {
        self.with_window(|w| {
            w.set_visible(true);
            w.request_redraw();
        });
    }

    fn set_title(&self, title: &str) {
        self.with_window(|w| w.set_title(title));
    }

    fn geometry(&self) -> (u32, u32) {
        lock(&self.window)
            .as_deref()
            .map(|w| w.inner_size().into())
            .unwrap_or((0, 0))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Canvas lock held for the duration of a draw call.
struct WinitSurface<'w> {
    canvas: MutexGuard<'w, Option<Canvas>>,
}

impl DrawSurface for WinitSurface<'_> {
    fn set_pixel(&mut self, x: i32, y: i32, color: Color) {
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.pixels.set(x, y, color);
        }
    }

    fn present(&mut self) {
        if let Some(canvas) = self.canvas.as_mut() {
            canvas.present();
        }
    }
}

struct WinitPump {
    event_loop: EventLoop<Request>,
    handler: Handler,
}

impl EventPump for WinitPump {
    fn run(self: Box<Self>) {
        let WinitPump { event_loop, mut handler } = *self;
        if let Err(e) = event_loop.run_app(&mut handler) {
            log::error!("winit event loop terminated with error: {e}");
        }
    }
}

struct Handler {
    windows: WindowMap,
}

impl Handler {
    fn lookup(&self, id: WindowId) -> Option<Arc<WinitWindow>> {
        let mut windows = lock(&self.windows);
        let win = windows.get(&id)?;
        if win.is_attached() {
            return Some(Arc::clone(win));
        }
        windows.remove(&id);
        None
    }
}

impl ApplicationHandler<Request> for Handler {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        event_loop.set_control_flow(ControlFlow::Wait);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, request: Request) {
        match request {
            Request::Create { spec, reply } => {
                let attrs = Window::default_attributes()
                    .with_title(String::new())
                    .with_inner_size(PhysicalSize::new(spec.width, spec.height))
                    .with_position(PhysicalPosition::new(spec.x, spec.y))
                    .with_visible(false);
                let result = event_loop
                    .create_window(attrs)
                    .map_err(|e| format!("failed to create window: {e}"));
                let _ = reply.send(result);
            }
            Request::Destroy { id, window } => {
                lock(&self.windows).remove(&id);
                drop(window);
            }
        }
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent) {
        let Some(win) = self.lookup(window_id) else {
            return;
        };

        match event {
            WindowEvent::CloseRequested if win.events.close => win.fire_close(),
            WindowEvent::Resized(size) => win.resize(size),
            WindowEvent::RedrawRequested => win.redraw(),
            WindowEvent::MouseInput {
                state: ElementState::Released,
                button,
                ..
            } if win.events.button_release => {
                log::trace!("button {button:?} released on {window_id:?}");
            }
            _ => {}
        }
    }
}
