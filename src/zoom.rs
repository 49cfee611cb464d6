//! Map camera: zoom transforms, pointer zoom rules, the fit-to-region
//! computation and the scripted opening animation.
//!
//! The page script replays what is computed here. Keyframes for the
//! opening animation are sampled in Rust and interpolated linearly in the
//! browser; wheel and drag gestures follow the same rules as
//! [`ZoomBehavior`].

use geo::Rect;
use serde::Serialize;
use std::f64::consts::SQRT_2;

/// `translate(x, y) scale(k)`: a point `p` maps to `p * k + (x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
    pub y: f64,
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform { k: 1.0, x: 0.0, y: 0.0 };

    pub fn new(k: f64, x: f64, y: f64) -> Self {
        Self { k, x, y }
    }

    pub fn apply(&self, point: (f64, f64)) -> (f64, f64) {
        (point.0 * self.k + self.x, point.1 * self.k + self.y)
    }

    pub fn invert(&self, point: (f64, f64)) -> (f64, f64) {
        ((point.0 - self.x) / self.k, (point.1 - self.y) / self.k)
    }
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// How the wheel delta is expressed by the browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelDeltaMode {
    Pixel,
    Line,
    Page,
}

impl WheelDeltaMode {
    /// From `WheelEvent.deltaMode`.
    pub fn from_dom(mode: u32) -> Self {
        match mode {
            1 => Self::Line,
            2 => Self::Page,
            _ => Self::Pixel,
        }
    }
}

/// Pointer zoom rules: a bounded scale range, wheel zoom about the pointer,
/// double-click zoom and drag panning. Serialized into the page, whose
/// script applies these values as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ZoomBehavior {
    pub min_scale: f64,
    pub max_scale: f64,
    /// Wheel exponent per pixel, line and page of `deltaY`
    pub wheel_pixel: f64,
    pub wheel_line: f64,
    pub wheel_page: f64,
    /// Wheel multiplier while ctrl is held (trackpad pinch)
    pub ctrl_factor: f64,
    /// Scale factor of one double-click, inverted with shift
    pub dblclick_factor: f64,
}

impl ZoomBehavior {
    pub fn new(min_scale: f64, max_scale: f64) -> Self {
        Self {
            min_scale,
            max_scale,
            wheel_pixel: 0.002,
            wheel_line: 0.05,
            wheel_page: 1.0,
            ctrl_factor: 10.0,
            dblclick_factor: 2.0,
        }
    }

    pub fn clamp_scale(&self, k: f64) -> f64 {
        k.clamp(self.min_scale, self.max_scale)
    }

    /// Exponent applied as `2^delta` for one wheel event.
    pub fn wheel_delta(&self, delta_y: f64, mode: WheelDeltaMode, ctrl: bool) -> f64 {
        let per_unit = match mode {
            WheelDeltaMode::Pixel => self.wheel_pixel,
            WheelDeltaMode::Line => self.wheel_line,
            WheelDeltaMode::Page => self.wheel_page,
        };
        -delta_y * per_unit * if ctrl { self.ctrl_factor } else { 1.0 }
    }

    /// Rescale by `factor` keeping the point under `pointer` fixed.
    pub fn scale_by(&self, transform: ZoomTransform, factor: f64, pointer: (f64, f64)) -> ZoomTransform {
        let k = self.clamp_scale(transform.k * factor);
        let (px, py) = transform.invert(pointer);
        ZoomTransform::new(k, pointer.0 - px * k, pointer.1 - py * k)
    }

    pub fn wheel(&self, transform: ZoomTransform, delta_y: f64, mode: WheelDeltaMode, ctrl: bool, pointer: (f64, f64)) -> ZoomTransform {
        let factor = 2f64.powf(self.wheel_delta(delta_y, mode, ctrl));
        self.scale_by(transform, factor, pointer)
    }

    pub fn double_click(&self, transform: ZoomTransform, pointer: (f64, f64), shift: bool) -> ZoomTransform {
        let factor = if shift { 1.0 / self.dblclick_factor } else { self.dblclick_factor };
        self.scale_by(transform, factor, pointer)
    }

    pub fn pan(&self, transform: ZoomTransform, dx: f64, dy: f64) -> ZoomTransform {
        ZoomTransform::new(transform.k, transform.x + dx, transform.y + dy)
    }
}

/// Transform that centres `bounds` in the viewport, filling `padding` of it,
/// with the scale clamped to the zoom range.
pub fn fit_bounds(bounds: Rect<f64>, width: f64, height: f64, padding: f64, behavior: &ZoomBehavior) -> ZoomTransform {
    let dx = bounds.max().x - bounds.min().x;
    let dy = bounds.max().y - bounds.min().y;
    let x = (bounds.min().x + bounds.max().x) / 2.0;
    let y = (bounds.min().y + bounds.max().y) / 2.0;

    let k = behavior.clamp_scale(padding / (dx / width).max(dy / height));
    ZoomTransform::new(k, width / 2.0 - k * x, height / 2.0 - k * y)
}

pub fn ease_cubic_in_out(t: f64) -> f64 {
    let t = t * 2.0;
    if t <= 1.0 {
        t * t * t / 2.0
    } else {
        let t = t - 2.0;
        (t * t * t + 2.0) / 2.0
    }
}

const RHO: f64 = SQRT_2;
const EPSILON2: f64 = 1e-12;

/// View as seen through the viewport: centre point and visible width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    pub cx: f64,
    pub cy: f64,
    pub w: f64,
}

/// Smooth pan-and-zoom path between two views (van Wijk & Nuij, rho = sqrt 2).
#[derive(Debug, Clone, Copy)]
pub struct ZoomPath {
    from: View,
    dx: f64,
    dy: f64,
    d1: f64,
    r0: f64,
    s: f64,
}

impl ZoomPath {
    pub fn new(from: View, to: View) -> Self {
        let dx = to.cx - from.cx;
        let dy = to.cy - from.cy;
        let d2 = dx * dx + dy * dy;
        let rho2 = RHO * RHO;
        let rho4 = rho2 * rho2;

        if d2 < EPSILON2 {
            let s = (to.w / from.w).ln() / RHO;
            return Self { from, dx, dy, d1: 0.0, r0: 0.0, s };
        }

        let d1 = d2.sqrt();
        let b0 = (to.w * to.w - from.w * from.w + rho4 * d2) / (2.0 * from.w * rho2 * d1);
        let b1 = (to.w * to.w - from.w * from.w - rho4 * d2) / (2.0 * to.w * rho2 * d1);
        let r0 = ((b0 * b0 + 1.0).sqrt() - b0).ln();
        let r1 = ((b1 * b1 + 1.0).sqrt() - b1).ln();
        Self { from, dx, dy, d1, r0, s: (r1 - r0) / RHO }
    }

    /// View at `t` in [0, 1].
    pub fn at(&self, t: f64) -> View {
        let s = t * self.s;
        if self.d1 == 0.0 {
            return View {
                cx: self.from.cx + t * self.dx,
                cy: self.from.cy + t * self.dy,
                w: self.from.w * (RHO * s).exp(),
            };
        }

        let cosh_r0 = self.r0.cosh();
        let u = self.from.w / (RHO * RHO * self.d1) * (cosh_r0 * (RHO * s + self.r0).tanh() - self.r0.sinh());
        View {
            cx: self.from.cx + u * self.dx,
            cy: self.from.cy + u * self.dy,
            w: self.from.w * cosh_r0 / (RHO * s + self.r0).cosh(),
        }
    }
}

/// Serialized names are the states the page script tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    Idle,
    Animating,
    UserInteracting,
}

/// Scripted move from the current transform to a target, with delay and easing.
#[derive(Debug, Clone)]
pub struct CameraAnimation {
    start: ZoomTransform,
    end: ZoomTransform,
    path: ZoomPath,
    viewport: (f64, f64),
    pub delay_ms: f64,
    pub duration_ms: f64,
}

impl CameraAnimation {
    pub fn new(start: ZoomTransform, end: ZoomTransform, width: f64, height: f64, delay_ms: f64, duration_ms: f64) -> Self {
        let centre = (width / 2.0, height / 2.0);
        let w = width.max(height);
        let view = |t: &ZoomTransform| {
            let (cx, cy) = t.invert(centre);
            View { cx, cy, w: w / t.k }
        };

        Self {
            start,
            end,
            path: ZoomPath::new(view(&start), view(&end)),
            viewport: (width, height),
            delay_ms,
            duration_ms,
        }
    }

    /// Transform after `progress` in [0, 1] of the (uneased) duration.
    pub fn transform_at(&self, progress: f64) -> ZoomTransform {
        let progress = progress.clamp(0.0, 1.0);
        if progress >= 1.0 {
            return self.end;
        }
        if progress <= 0.0 {
            return self.start;
        }

        let view = self.path.at(ease_cubic_in_out(progress));
        let w = self.viewport.0.max(self.viewport.1);
        let k = w / view.w;
        ZoomTransform::new(k, self.viewport.0 / 2.0 - view.cx * k, self.viewport.1 / 2.0 - view.cy * k)
    }
}

/// Camera state machine driven by page time and pointer gestures.
#[derive(Debug, Clone)]
pub struct Camera {
    state: CameraState,
    transform: ZoomTransform,
    animation: Option<CameraAnimation>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            state: CameraState::Idle,
            transform: ZoomTransform::IDENTITY,
            animation: None,
        }
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    /// Queue the opening animation; it starts once its delay has elapsed.
    pub fn schedule(&mut self, animation: CameraAnimation) {
        self.animation = Some(animation);
    }

    /// Advance to `elapsed_ms` since page load.
    pub fn tick(&mut self, elapsed_ms: f64) -> ZoomTransform {
        if self.state == CameraState::UserInteracting {
            return self.transform;
        }

        if let Some(animation) = &self.animation {
            if elapsed_ms >= animation.delay_ms {
                let progress = (elapsed_ms - animation.delay_ms) / animation.duration_ms.max(1.0);
                self.transform = animation.transform_at(progress);
                if progress >= 1.0 {
                    self.state = CameraState::Idle;
                    self.animation = None;
                } else {
                    self.state = CameraState::Animating;
                }
            }
        }

        self.transform
    }

    /// Play the scheduled animation through, sampling `count + 1` evenly
    /// spaced transforms from its first frame to its last.
    pub fn sample_animation(&mut self, count: usize) -> Vec<ZoomTransform> {
        let Some((delay, duration)) = self.animation.as_ref().map(|a| (a.delay_ms, a.duration_ms)) else {
            return vec![self.transform];
        };

        let count = count.max(1);
        (0..=count)
            .map(|i| self.tick(delay + duration * i as f64 / count as f64))
            .collect()
    }

    /// A pointer gesture takes over from wherever the camera currently is.
    pub fn gesture(&mut self, transform: ZoomTransform) {
        self.state = CameraState::UserInteracting;
        self.animation = None;
        self.transform = transform;
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Coord;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn approx_t(a: ZoomTransform, b: ZoomTransform) -> bool {
        approx(a.k, b.k) && approx(a.x, b.x) && approx(a.y, b.y)
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect<f64> {
        Rect::new(Coord { x: x0, y: y0 }, Coord { x: x1, y: y1 })
    }

    #[test]
    fn fit_centres_and_clamps() {
        let behavior = ZoomBehavior::new(1.0, 8.0);

        // 100x50 box in a 1000x500 viewport: 0.9 / 0.1 = 9, clamped to 8
        let t = fit_bounds(rect(100.0, 100.0, 200.0, 150.0), 1000.0, 500.0, 0.9, &behavior);
        assert!(approx(t.k, 8.0));
        assert!(approx(t.x, 500.0 - 8.0 * 150.0));
        assert!(approx(t.y, 250.0 - 8.0 * 125.0));
        let centre = t.apply((150.0, 125.0));
        assert!(approx(centre.0, 500.0) && approx(centre.1, 250.0));

        // Larger than the viewport never zooms out below 1
        let wide = fit_bounds(rect(0.0, 0.0, 2000.0, 100.0), 1000.0, 500.0, 0.9, &behavior);
        assert!(approx(wide.k, 1.0));

        let mid = fit_bounds(rect(0.0, 0.0, 300.0, 100.0), 1000.0, 500.0, 0.9, &behavior);
        assert!(approx(mid.k, 3.0));
    }

    #[test]
    fn wheel_zoom_keeps_pointer_fixed_and_respects_extent() {
        let behavior = ZoomBehavior::new(1.0, 8.0);
        let pointer = (300.0, 200.0);

        let zoomed = behavior.wheel(ZoomTransform::IDENTITY, -500.0, WheelDeltaMode::Pixel, false, pointer);
        assert!(approx(zoomed.k, 2.0));
        let fixed = zoomed.apply(ZoomTransform::IDENTITY.invert(pointer));
        assert!(approx(fixed.0, pointer.0) && approx(fixed.1, pointer.1));

        let out = behavior.wheel(ZoomTransform::IDENTITY, 500.0, WheelDeltaMode::Pixel, false, pointer);
        assert!(approx(out.k, 1.0));

        let far = behavior.wheel(zoomed, -10.0, WheelDeltaMode::Page, false, pointer);
        assert!(approx(far.k, 8.0));
    }

    #[test]
    fn wheel_delta_modes() {
        let behavior = ZoomBehavior::new(1.0, 8.0);
        assert!(approx(behavior.wheel_delta(100.0, WheelDeltaMode::from_dom(0), false), -0.2));
        assert!(approx(behavior.wheel_delta(3.0, WheelDeltaMode::from_dom(1), false), -0.15));
        assert!(approx(behavior.wheel_delta(-1.0, WheelDeltaMode::from_dom(2), true), 10.0));
    }

    #[test]
    fn double_click_doubles_about_pointer_and_shift_halves() {
        let behavior = ZoomBehavior::new(1.0, 8.0);
        let pointer = (120.0, 80.0);

        let zoomed = behavior.double_click(ZoomTransform::IDENTITY, pointer, false);
        assert!(approx(zoomed.k, 2.0));
        let fixed = zoomed.apply(ZoomTransform::IDENTITY.invert(pointer));
        assert!(approx(fixed.0, pointer.0) && approx(fixed.1, pointer.1));
        assert!(approx_t(zoomed, ZoomTransform::new(2.0, -120.0, -80.0)));

        let back = behavior.double_click(zoomed, pointer, true);
        assert!(approx_t(back, ZoomTransform::IDENTITY));
        assert!(approx(behavior.double_click(back, pointer, true).k, 1.0));
    }

    #[test]
    fn pan_translates_only() {
        let behavior = ZoomBehavior::new(1.0, 8.0);
        let t = behavior.pan(ZoomTransform::new(2.0, 5.0, 5.0), 10.0, -3.0);
        assert_eq!(t, ZoomTransform::new(2.0, 15.0, 2.0));
    }

    #[test]
    fn easing_is_symmetric() {
        assert_eq!(ease_cubic_in_out(0.0), 0.0);
        assert_eq!(ease_cubic_in_out(1.0), 1.0);
        assert!(approx(ease_cubic_in_out(0.5), 0.5));
        assert!(approx(ease_cubic_in_out(0.25) + ease_cubic_in_out(0.75), 1.0));
        assert!(ease_cubic_in_out(0.1) < 0.1);
    }

    #[test]
    fn zoom_path_hits_both_ends() {
        let from = View { cx: 0.0, cy: 0.0, w: 1000.0 };
        let to = View { cx: 300.0, cy: -80.0, w: 125.0 };
        let path = ZoomPath::new(from, to);

        let start = path.at(0.0);
        let end = path.at(1.0);
        assert!(approx(start.cx, 0.0) && approx(start.w, 1000.0));
        assert!(approx(end.cx, 300.0) && approx(end.cy, -80.0) && approx(end.w, 125.0));
    }

    #[test]
    fn zoom_path_in_place_only_scales() {
        let path = ZoomPath::new(View { cx: 5.0, cy: 5.0, w: 800.0 }, View { cx: 5.0, cy: 5.0, w: 100.0 });
        let mid = path.at(0.5);
        assert!(approx(mid.cx, 5.0));
        assert!(approx(mid.w, (800.0f64 * 100.0).sqrt()));
    }

    #[test]
    fn keyframes_run_from_identity_to_target() {
        let target = ZoomTransform::new(6.0, -2400.0, -900.0);
        let mut camera = Camera::new();
        camera.schedule(CameraAnimation::new(ZoomTransform::IDENTITY, target, 960.0, 600.0, 3000.0, 5000.0));
        let frames = camera.sample_animation(60);

        assert_eq!(frames.len(), 61);
        assert_eq!(frames[0], ZoomTransform::IDENTITY);
        assert_eq!(*frames.last().unwrap(), target);
        assert!(frames.iter().all(|f| f.k >= 1.0 - 1e-9 && f.k <= 6.0 + 1e-9));
        assert_eq!(camera.state(), CameraState::Idle);
        assert_eq!(Camera::new().sample_animation(10), vec![ZoomTransform::IDENTITY]);
    }

    #[test]
    fn camera_waits_then_animates_then_idles() {
        let target = ZoomTransform::new(4.0, -1000.0, -400.0);
        let mut camera = Camera::new();
        camera.schedule(CameraAnimation::new(ZoomTransform::IDENTITY, target, 960.0, 600.0, 3000.0, 5000.0));

        assert_eq!(camera.tick(1000.0), ZoomTransform::IDENTITY);
        assert_eq!(camera.state(), CameraState::Idle);

        let mid = camera.tick(5500.0);
        assert_eq!(camera.state(), CameraState::Animating);
        assert!(mid.k > 1.0 && mid.k < 4.0);

        assert!(approx_t(camera.tick(8000.0), target));
        assert_eq!(camera.state(), CameraState::Idle);
        assert!(approx_t(camera.tick(20_000.0), target));
    }

    #[test]
    fn gesture_takes_over_running_animation() {
        let target = ZoomTransform::new(4.0, -1000.0, -400.0);
        let mut camera = Camera::new();
        camera.schedule(CameraAnimation::new(ZoomTransform::IDENTITY, target, 960.0, 600.0, 3000.0, 5000.0));

        let current = camera.tick(4000.0);
        assert_eq!(camera.state(), CameraState::Animating);

        let behavior = ZoomBehavior::new(1.0, 8.0);
        camera.gesture(behavior.pan(current, 20.0, 0.0));
        assert_eq!(camera.state(), CameraState::UserInteracting);

        let after = camera.tick(7000.0);
        assert!(approx(after.x, current.x + 20.0));
        assert!(approx(after.k, current.k));
    }
}
