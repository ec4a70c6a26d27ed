use std::sync::{Arc, Mutex};

use crate::backend::WindowSpec;
use crate::coords::Point;
use crate::error::{PlotError, Result};
use crate::paint::Color;
use crate::registry::{initialize, Registry, WindowKey};
use crate::sync::lock;

/// Axis settings kept with the window for the plotting layer.
#[derive(Debug, Clone, Default)]
struct Attributes {
    title: String,
    x_axis_visible: bool,
    y_axis_visible: bool,
    x_axis_label: String,
    y_axis_label: String,
}

/// An on-screen plot window.
///
/// All methods take `&self`; share a window across threads with `Arc`.
/// Dropping a `Window` does not close it.
pub struct Window {
    registry: Arc<Registry>,
    key: WindowKey,
    attrs: Mutex<Attributes>,
}

impl Window {
    /// Creates and shows a plot window in the process-wide registry.
    ///
    /// The window opens at (0, 0) on a white background. An empty `title`
    /// selects the next `"Figure - N"` name.
    pub fn new(width: i32, height: i32, title: &str) -> Result<Self> {
        validate_dimensions(width, height)?;
        let registry = initialize()?;
        Self::with_registry(&registry, width, height, title)
    }

    /// Creates and shows a plot window in `registry`.
    pub fn with_registry(registry: &Arc<Registry>, width: i32, height: i32, title: &str) -> Result<Self> {
        let (width, height) = validate_dimensions(width, height)?;

        let key = registry.reserve_key();
        let native = registry
            .connection()
            .create_window(&WindowSpec::plot(width, height))?;

        let on_close = {
            let registry = Arc::downgrade(registry);
            let native = Arc::downgrade(&native);
            Box::new(move || {
                if let Some(native) = native.upgrade() {
                    native.detach_events();
                    native.destroy();
                }
                if let Some(registry) = registry.upgrade() {
                    log::debug!("{key} closed by user");
                    registry.remove_window(key);
                }
            })
        };
        native.on_graceful_close(on_close);

        let title = registry.add_window(key, Arc::clone(&native), title);

        native.map();

        Ok(Self {
            registry: Arc::clone(registry),
            key,
            attrs: Mutex::new(Attributes {
                title,
                ..Attributes::default()
            }),
        })
    }

    pub fn key(&self) -> WindowKey {
        self.key
    }

    /// Whether the window has been closed, by code or by the user.
    pub fn is_closed(&self) -> bool {
        !self.registry.is_open(self.key)
    }

    /// Closes the window. Safe to call more than once.
    pub fn close(&self) {
        self.registry.remove_window(self.key);
    }

    /// Blocks until the window is closed; returns at once if it already is.
    ///
    /// There is no timeout. Waiting on an open window nobody closes blocks
    /// forever.
    pub fn wait_for_closed(&self) {
        self.registry.wait_for_window(self.key);
    }

    pub fn title(&self) -> String {
        lock(&self.attrs).title.clone()
    }

    pub fn set_title(&self, title: &str) {
        lock(&self.attrs).title = title.to_string();
        if let Some(native) = self.registry.native(self.key) {
            native.set_title(title);
        }
    }

    /// Width of the window surface in pixels, `0` once closed.
    pub fn window_width(&self) -> u32 {
        self.geometry().0
    }

    /// Height of the window surface in pixels, `0` once closed.
    pub fn window_height(&self) -> u32 {
        self.geometry().1
    }

    fn geometry(&self) -> (u32, u32) {
        self.registry
            .native(self.key)
            .map(|native| native.geometry())
            .unwrap_or((0, 0))
    }

    pub fn x_axis_visible(&self) -> bool {
        lock(&self.attrs).x_axis_visible
    }

    pub fn set_x_axis_visible(&self, visible: bool) {
        lock(&self.attrs).x_axis_visible = visible;
    }

    pub fn y_axis_visible(&self) -> bool {
        lock(&self.attrs).y_axis_visible
    }

    pub fn set_y_axis_visible(&self, visible: bool) {
        lock(&self.attrs).y_axis_visible = visible;
    }

    pub fn x_axis_label(&self) -> String {
        lock(&self.attrs).x_axis_label.clone()
    }

    pub fn set_x_axis_label(&self, label: &str) {
        lock(&self.attrs).x_axis_label = label.to_string();
    }

    pub fn y_axis_label(&self) -> String {
        lock(&self.attrs).y_axis_label.clone()
    }

    pub fn set_y_axis_label(&self, label: &str) {
        lock(&self.attrs).y_axis_label = label.to_string();
    }

    /// Draws one pixel in window coordinates and presents it.
    ///
    /// Every call presents the whole surface, so this is slow for many
    /// points; prefer [`draw_points`](Self::draw_points). Does nothing on a
    /// closed window or when no surface can be acquired.
    pub fn draw_point(&self, x: i32, y: i32, color: Color) {
        self.draw([Point::new(x, y)], color);
    }

    /// Draws `points` in window coordinates and presents them once.
    ///
    /// Does nothing on a closed window or when no surface can be acquired.
    pub fn draw_points(&self, points: &[Point], color: Color) {
        self.draw(points.iter().copied(), color);
    }

    /// One surface acquisition and one present per call. The surface is
    /// released when it goes out of scope, on every path.
    fn draw(&self, points: impl IntoIterator<Item = Point>, color: Color) {
        let Some(native) = self.registry.native(self.key) else {
            return;
        };

        let mut surface = match self.registry.connection().acquire_surface(native.as_ref()) {
            Ok(surface) => surface,
            Err(e) => {
                log::debug!("{}: skipping draw: {e}", self.key);
                return;
            }
        };

        for p in points {
            surface.set_pixel(p.x, p.y, color);
        }
        surface.present();
    }
}

impl std::fmt::Debug for Window {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Window")
            .field("key", &self.key)
            .field("title", &self.title())
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn validate_dimensions(width: i32, height: i32) -> Result<(u32, u32)> {
    match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) if w > 0 && h > 0 => Ok((w, h)),
        _ => Err(PlotError::InvalidDimension { width, height }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{assert_blocked, assert_returns, headless_registry, spawn_signal, TIMEOUT};

    // ── creation ─────────────────────────────────────────────────────────

    #[test]
    fn untitled_windows_count_up_across_custom_titles() {
        let (registry, ctl) = headless_registry();

        let titles: Vec<String> = ["", "", "custom", "", "other", ""]
            .iter()
            .map(|t| Window::with_registry(&registry, 20, 20, t).unwrap().title())
            .collect();

        assert_eq!(
            titles,
            ["Figure - 1", "Figure - 2", "custom", "Figure - 4", "other", "Figure - 6"]
        );
        assert!(ctl.find_by_title("Figure - 4").is_some());
        assert!(ctl.find_by_title("Figure - 3").is_none());
    }

    #[test]
    fn native_window_uses_plot_defaults_and_is_shown() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 300, 400, "").unwrap();

        let id = ctl.find_by_title("Figure - 1").unwrap();
        let spec = ctl.spec(id).unwrap();
        assert_eq!((spec.x, spec.y), (0, 0));
        assert_eq!((spec.width, spec.height), (300, 400));
        assert_eq!(spec.background, Color::WHITE);
        assert!(spec.events.button_release && spec.events.close);
        assert!(ctl.is_mapped(id));
        assert_eq!((w.window_width(), w.window_height()), (300, 400));
    }

    #[test]
    fn invalid_dimensions_register_nothing() {
        let (registry, ctl) = headless_registry();
        for (w, h) in [(0, 10), (10, 0), (-5, 10), (10, -1), (0, 0)] {
            let err = Window::with_registry(&registry, w, h, "").unwrap_err();
            assert_eq!(err, PlotError::InvalidDimension { width: w, height: h });
        }
        assert_eq!(registry.window_count(), 0);
        assert_eq!(ctl.stats().windows_created, 0);
        assert_eq!(registry.next_default_name(), "Figure - 1");
    }

    #[test]
    fn invalid_dimensions_fail_before_initializing() {
        let err = Window::new(0, 100, "").unwrap_err();
        assert!(matches!(err, PlotError::InvalidDimension { width: 0, height: 100 }));
    }

    #[test]
    fn set_title_updates_field_and_native() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 10, 10, "").unwrap();
        let id = ctl.find_by_title("Figure - 1").unwrap();

        w.set_title("renamed");
        assert_eq!(w.title(), "renamed");
        assert_eq!(ctl.title(id).as_deref(), Some("renamed"));
    }

    #[test]
    fn axis_attributes_round_trip() {
        let (registry, _ctl) = headless_registry();
        let w = Window::with_registry(&registry, 10, 10, "").unwrap();
        assert!(!w.x_axis_visible() && !w.y_axis_visible());

        w.set_x_axis_visible(true);
        w.set_y_axis_label("amplitude");
        assert!(w.x_axis_visible());
        assert!(!w.y_axis_visible());
        assert_eq!(w.y_axis_label(), "amplitude");
        assert_eq!(w.x_axis_label(), "");
    }

    // ── closing and waiting ──────────────────────────────────────────────

    #[test]
    fn close_is_idempotent() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 10, 10, "").unwrap();
        w.close();
        w.close();
        assert!(w.is_closed());
        assert_eq!(ctl.stats().windows_destroyed, 1);
        assert_eq!((w.window_width(), w.window_height()), (0, 0));
    }

    #[test]
    fn wait_after_close_returns_immediately() {
        let (registry, _ctl) = headless_registry();
        let w = Arc::new(Window::with_registry(&registry, 10, 10, "").unwrap());
        w.close();
        assert_returns("wait_for_closed", move || w.wait_for_closed());
    }

    #[test]
    fn close_releases_window_and_global_waiters() {
        let (registry, _ctl) = headless_registry();
        let w = Arc::new(Window::with_registry(&registry, 10, 10, "").unwrap());

        let window_done = spawn_signal({
            let w = Arc::clone(&w);
            move || w.wait_for_closed()
        });
        let all_done = spawn_signal({
            let registry = Arc::clone(&registry);
            move || registry.wait_for_all_closed()
        });
        assert_blocked(&window_done);
        assert_blocked(&all_done);

        w.close();
        window_done.recv_timeout(TIMEOUT).unwrap();
        all_done.recv_timeout(TIMEOUT).unwrap();
    }

    #[test]
    fn closing_another_window_does_not_release_waiter() {
        let (registry, _ctl) = headless_registry();
        let a = Arc::new(Window::with_registry(&registry, 10, 10, "").unwrap());
        let b = Window::with_registry(&registry, 10, 10, "").unwrap();

        let done = spawn_signal({
            let a = Arc::clone(&a);
            move || a.wait_for_closed()
        });
        b.close();
        assert_blocked(&done);
        a.close();
        done.recv_timeout(TIMEOUT).unwrap();
    }

    #[test]
    fn user_close_on_event_thread_releases_waiters() {
        let (registry, ctl) = headless_registry();
        let w = Arc::new(Window::with_registry(&registry, 10, 10, "").unwrap());
        let id = ctl.find_by_title("Figure - 1").unwrap();

        let window_done = spawn_signal({
            let w = Arc::clone(&w);
            move || w.wait_for_closed()
        });
        let all_done = spawn_signal({
            let registry = Arc::clone(&registry);
            move || registry.wait_for_all_closed()
        });
        assert_blocked(&window_done);

        assert!(ctl.user_close(id, TIMEOUT));
        window_done.recv_timeout(TIMEOUT).unwrap();
        all_done.recv_timeout(TIMEOUT).unwrap();

        assert!(w.is_closed());
        assert_eq!(ctl.stats().windows_destroyed, 1);
        assert!(ctl.live_windows().is_empty());
    }

    #[test]
    fn user_close_after_programmatic_close_is_ignored() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 10, 10, "").unwrap();
        let id = ctl.find_by_title("Figure - 1").unwrap();
        w.close();
        assert!(!ctl.user_close(id, TIMEOUT));
        assert_eq!(ctl.stats().windows_destroyed, 1);
    }

    #[test]
    fn two_waiters_on_one_window_both_return() {
        let (registry, _ctl) = headless_registry();
        let w = Arc::new(Window::with_registry(&registry, 10, 10, "").unwrap());

        let waiters: Vec<_> = (0..2)
            .map(|_| {
                let w = Arc::clone(&w);
                spawn_signal(move || w.wait_for_closed())
            })
            .collect();
        for done in &waiters {
            assert_blocked(done);
        }

        w.close();
        for done in &waiters {
            done.recv_timeout(TIMEOUT).unwrap();
        }
    }

    // ── drawing ──────────────────────────────────────────────────────────

    #[test]
    fn batched_draw_presents_once() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 50, 50, "").unwrap();

        let points: Vec<Point> = (0..25).map(|i| Point::new(i, i)).collect();
        w.draw_points(&points, Color::RED);

        let stats = ctl.stats();
        assert_eq!(stats.presents, 1);
        assert_eq!(stats.surfaces_acquired, 1);
        assert_eq!(stats.surfaces_released, 1);
    }

    #[test]
    fn single_point_draws_present_each_time() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 50, 50, "").unwrap();

        for i in 0..25 {
            w.draw_point(i, 0, Color::BLUE);
        }

        let stats = ctl.stats();
        assert_eq!(stats.presents, 25);
        assert_eq!(stats.surfaces_released, 25);
    }

    #[test]
    fn drawn_pixels_land_on_the_window() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 8, 8, "").unwrap();
        let id = ctl.find_by_title("Figure - 1").unwrap();

        w.draw_point(2, 3, Color::RED);
        w.draw_points(&[Point::new(0, 0), Point::new(7, 7), Point::new(9, 9)], Color::GREEN);

        assert_eq!(ctl.pixel(id, 2, 3), Some(Color::RED));
        assert_eq!(ctl.pixel(id, 0, 0), Some(Color::GREEN));
        assert_eq!(ctl.pixel(id, 7, 7), Some(Color::GREEN));
        assert_eq!(ctl.pixel(id, 1, 1), Some(Color::WHITE));
    }

    #[test]
    fn drawing_on_closed_window_does_nothing() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 8, 8, "").unwrap();
        w.close();

        w.draw_point(1, 1, Color::RED);
        w.draw_points(&[Point::new(1, 1)], Color::RED);

        let stats = ctl.stats();
        assert_eq!(stats.surfaces_acquired, 0);
        assert_eq!(stats.presents, 0);
    }

    #[test]
    fn surface_failure_skips_draw() {
        let (registry, ctl) = headless_registry();
        let w = Window::with_registry(&registry, 8, 8, "").unwrap();
        let id = ctl.find_by_title("Figure - 1").unwrap();

        ctl.set_surface_failure(true);
        w.draw_point(1, 1, Color::RED);
        assert_eq!(ctl.stats().presents, 0);
        assert_eq!(ctl.pixel(id, 1, 1), Some(Color::WHITE));

        ctl.set_surface_failure(false);
        w.draw_point(1, 1, Color::RED);
        assert_eq!(ctl.stats().presents, 1);
    }
}
