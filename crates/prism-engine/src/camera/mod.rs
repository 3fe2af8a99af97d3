//! Camera with lazily cached view/projection matrices.
//!
//! Setters only mark the affected matrix dirty; the matrix accessors are the
//! only recompute sites. Mutating a view parameter leaves the cached
//! projection untouched and vice versa.

mod cached;

pub use cached::Cached;

use glam::{Mat4, Vec3};

/// Screen rectangle the projection maps to, in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Screen {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Screen {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn aspect(&self) -> f32 {
        self.width / self.height
    }
}

impl Default for Screen {
    fn default() -> Self {
        Self::new(0.0, 0.0, 1.0, 1.0)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Projection {
    Ortho,
    Perspective,
}

/// Initial camera parameters.
#[derive(Debug, Clone)]
pub struct CameraInit {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub near: f32,
    pub far: f32,
    pub fov: f32,
    pub screen: Screen,
    pub projection: Projection,
}

impl Default for CameraInit {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            near: 0.001,
            far: 1000.0,
            fov: std::f32::consts::FRAC_PI_4,
            screen: Screen::default(),
            projection: Projection::Perspective,
        }
    }
}

/// View parameters (position/target/up) and projection parameters
/// (near/far/fov/screen/projection kind), with both derived matrices held in
/// [`Cached`] cells.
#[derive(Debug, Clone)]
pub struct Camera {
    position: Vec3,
    target: Vec3,
    up: Vec3,

    near: f32,
    far: f32,
    fov: f32,
    screen: Screen,
    projection: Projection,

    view: Cached<Mat4>,
    proj: Cached<Mat4>,
}

impl Camera {
    pub fn new(init: CameraInit) -> Self {
        Self {
            position: init.position,
            target: init.target,
            up: init.up,
            near: init.near,
            far: init.far,
            fov: init.fov,
            screen: init.screen,
            projection: init.projection,
            view: Cached::new(Mat4::IDENTITY),
            proj: Cached::new(Mat4::IDENTITY),
        }
    }

    // ── view parameters ───────────────────────────────────────────────────

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.view.invalidate();
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        self.view.invalidate();
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn set_up(&mut self, up: Vec3) {
        self.up = up;
        self.view.invalidate();
    }

    // ── projection parameters ─────────────────────────────────────────────

    pub fn near(&self) -> f32 {
        self.near
    }

    pub fn set_near(&mut self, near: f32) {
        self.near = near;
        self.proj.invalidate();
    }

    pub fn far(&self) -> f32 {
        self.far
    }

    pub fn set_far(&mut self, far: f32) {
        self.far = far;
        self.proj.invalidate();
    }

    pub fn fov(&self) -> f32 {
        self.fov
    }

    pub fn set_fov(&mut self, fov: f32) {
        self.fov = fov;
        self.proj.invalidate();
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Replaces the whole screen rect, marking the projection dirty once.
    pub fn set_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.proj.invalidate();
    }

    pub fn projection(&self) -> Projection {
        self.projection
    }

    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
        self.proj.invalidate();
    }

    // ── cache control ─────────────────────────────────────────────────────

    pub fn invalidate_view(&mut self) {
        self.view.invalidate();
    }

    pub fn invalidate_projection(&mut self) {
        self.proj.invalidate();
    }

    pub fn view_is_dirty(&self) -> bool {
        self.view.is_dirty()
    }

    pub fn projection_is_dirty(&self) -> bool {
        self.proj.is_dirty()
    }

    // ── derived matrices ──────────────────────────────────────────────────

    /// Look-at view matrix from `(position, target, up)`.
    ///
    /// Recomputed only here, only when a view parameter changed since the
    /// last read.
    pub fn view_matrix(&mut self) -> Mat4 {
        let (position, target, up) = (self.position, self.target, self.up);
        *self
            .view
            .get_or_update(|| Mat4::look_at_rh(position, target, up))
    }

    /// Projection matrix for the current projection kind.
    ///
    /// The ortho volume is centered on the camera's X/Y position with half
    /// extents from the screen rect, and spans `-far..+far` in depth. The
    /// perspective branch is a standard fov projection over the screen
    /// aspect. Both use glam's right-handed, zero-to-one depth constructors.
    pub fn projection_matrix(&mut self) -> Mat4 {
        let (projection, screen, position) = (self.projection, self.screen, self.position);
        let (near, far, fov) = (self.near, self.far, self.fov);

        *self.proj.get_or_update(|| match projection {
            Projection::Ortho => {
                let half_w = screen.width / 2.0;
                let half_h = screen.height / 2.0;
                Mat4::orthographic_rh(
                    position.x - half_w,
                    position.x + half_w,
                    position.y - half_h,
                    position.y + half_h,
                    -far,
                    far,
                )
            }
            Projection::Perspective => Mat4::perspective_rh(fov, screen.aspect(), near, far),
        })
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(CameraInit::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f32::consts::FRAC_PI_2;

    fn spec_camera() -> Camera {
        Camera::new(CameraInit {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov: FRAC_PI_2,
            screen: Screen::new(0.0, 0.0, 800.0, 600.0),
            projection: Projection::Perspective,
            ..Default::default()
        })
    }

    fn mat4_approx_eq(a: Mat4, b: Mat4, eps: f32) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() <= eps)
    }

    // ── closed-form matrices ──────────────────────────────────────────────

    #[test]
    fn view_matrix_matches_closed_form_look_at() {
        // Eye at (0,0,3) looking at the origin with +Y up: identity rotation,
        // translation -3 along Z.
        let mut camera = spec_camera();
        let expected = Mat4::from_cols_array(&[
            1.0, 0.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, 0.0, //
            0.0, 0.0, 1.0, 0.0, //
            0.0, 0.0, -3.0, 1.0,
        ]);

        assert_eq!(camera.view_matrix(), expected);
    }

    #[test]
    fn projection_matrix_matches_closed_form_perspective() {
        let mut camera = spec_camera();

        let fov = FRAC_PI_2;
        let aspect = 800.0 / 600.0;
        let (near, far) = (camera.near(), camera.far());

        let f = 1.0 / (0.5 * fov).tan();
        let r = far / (near - far);
        let expected = Mat4::from_cols_array(&[
            f / aspect, 0.0, 0.0, 0.0, //
            0.0, f, 0.0, 0.0, //
            0.0, 0.0, r, -1.0, //
            0.0, 0.0, r * near, 0.0,
        ]);

        assert!(mat4_approx_eq(camera.projection_matrix(), expected, 1e-5));
    }

    #[test]
    fn ortho_volume_is_centered_on_camera_position() {
        let mut camera = Camera::new(CameraInit {
            position: Vec3::new(10.0, -4.0, 0.0),
            screen: Screen::new(0.0, 0.0, 200.0, 100.0),
            projection: Projection::Ortho,
            far: 50.0,
            ..Default::default()
        });

        let expected = Mat4::orthographic_rh(
            10.0 - 100.0,
            10.0 + 100.0,
            -4.0 - 50.0,
            -4.0 + 50.0,
            -50.0,
            50.0,
        );

        assert_eq!(camera.projection_matrix(), expected);
    }

    // ── cache behavior ────────────────────────────────────────────────────

    #[test]
    fn view_mutation_leaves_projection_bit_identical() {
        let mut camera = spec_camera();
        let projection_before = camera.projection_matrix();

        camera.set_position(Vec3::new(5.0, 1.0, -2.0));
        camera.set_target(Vec3::new(0.0, 1.0, 0.0));

        assert!(!camera.projection_is_dirty());
        assert_eq!(camera.projection_matrix(), projection_before);
    }

    #[test]
    fn projection_mutation_leaves_view_bit_identical() {
        let mut camera = spec_camera();
        let view_before = camera.view_matrix();

        camera.set_fov(1.0);
        camera.set_near(0.5);

        assert!(!camera.view_is_dirty());
        assert_eq!(camera.view_matrix(), view_before);
    }

    #[test]
    fn view_recomputes_after_view_setter() {
        let mut camera = spec_camera();
        let before = camera.view_matrix();

        camera.set_position(Vec3::new(0.0, 2.0, 3.0));
        let after = camera.view_matrix();

        assert_ne!(before, after);
        assert!(!camera.view_is_dirty());
    }

    #[test]
    fn setter_with_identical_value_still_yields_equal_matrix() {
        let mut camera = spec_camera();
        let before = camera.view_matrix();

        camera.set_position(camera.position());
        assert!(camera.view_is_dirty());
        assert_eq!(camera.view_matrix(), before);
    }

    #[test]
    fn bulk_screen_setter_marks_projection_dirty_once() {
        let mut camera = spec_camera();
        camera.projection_matrix();
        assert!(!camera.projection_is_dirty());

        camera.set_screen(Screen::new(0.0, 0.0, 1024.0, 768.0));
        assert!(camera.projection_is_dirty());
        assert!(!camera.view_is_dirty());

        let updated = camera.projection_matrix();
        assert!(!camera.projection_is_dirty());
        assert_eq!(camera.projection_matrix(), updated);
    }

    #[test]
    fn matrix_reads_are_the_only_recompute_sites() {
        let mut camera = spec_camera();

        // A long run of setters must not trigger any recompute on its own;
        // both caches stay dirty until read.
        camera.set_position(Vec3::ONE);
        camera.set_fov(1.2);
        camera.set_far(10.0);
        camera.set_up(Vec3::Z);

        assert!(camera.view_is_dirty());
        assert!(camera.projection_is_dirty());
    }
}
