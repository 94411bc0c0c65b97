use std::f32::consts::{PI, TAU};

use glam::{Mat4, Vec2, Vec3};

use crate::config::CameraConfig;
use crate::surface::{CameraFrame, SurfaceSize};

const MIN_POLAR: f32 = 1e-4;

/// Accumulated user input for one tick, in physical pixels and wheel lines.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct ControlInput {
    /// Drag travel that orbits the camera.
    pub rotate: Vec2,
    /// Drag travel that pans the target (ignored when panning is off).
    pub pan: Vec2,
    /// Wheel lines; positive moves toward the target.
    pub zoom: f32,
}

/// Perspective camera orbiting a target, with damped rotation.
///
/// Rotation input is queued as angular velocity; every [`update`](Self::update)
/// applies `damping` of what is queued and keeps the rest, so a drag coasts to
/// a stop over several ticks. Zoom is applied at once and clamped to the
/// distance range.
#[derive(Debug, Clone, PartialEq)]
pub struct Viewpoint {
    fov_y: f32,
    aspect: f32,
    near: f32,
    far: f32,

    target: Vec3,
    radius: f32,
    /// Azimuth around +Y, measured from +Z.
    theta: f32,
    /// Angle from +Y.
    phi: f32,

    delta_theta: f32,
    delta_phi: f32,
    viewport_height: f32,

    damping: f32,
    min_distance: f32,
    max_distance: f32,
    max_polar: f32,
    enable_pan: bool,
    rotate_speed: f32,
    zoom_speed: f32,
}

impl Viewpoint {
    pub fn new(config: &CameraConfig, size: SurfaceSize) -> Self {
        let target = Vec3::from(config.target);
        let offset = Vec3::from(config.position) - target;
        let radius = offset.length().max(f32::EPSILON);

        let mut vp = Self {
            fov_y: config.fov.to_radians(),
            aspect: size.aspect(),
            near: config.near,
            far: config.far,
            target,
            radius,
            theta: offset.x.atan2(offset.z),
            phi: (offset.y / radius).clamp(-1.0, 1.0).acos(),
            delta_theta: 0.0,
            delta_phi: 0.0,
            viewport_height: size.height.max(1) as f32,
            damping: config.damping,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            max_polar: config.max_polar_angle.clamp(MIN_POLAR, PI),
            enable_pan: config.enable_pan,
            rotate_speed: config.rotate_speed,
            zoom_speed: config.zoom_speed,
        };
        vp.clamp();
        vp
    }

    /// Follows an output resize. Only the projection changes.
    pub fn set_viewport(&mut self, size: SurfaceSize) {
        self.aspect = size.aspect();
        self.viewport_height = size.height.max(1) as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn distance(&self) -> f32 {
        self.radius
    }

    pub fn update(&mut self, input: &ControlInput) {
        let per_px = TAU / self.viewport_height * self.rotate_speed;
        self.delta_theta -= input.rotate.x * per_px;
        self.delta_phi -= input.rotate.y * per_px;

        if input.zoom != 0.0 {
            self.radius *= 0.95f32.powf(input.zoom * self.zoom_speed);
        }

        if self.enable_pan && input.pan != Vec2::ZERO {
            let (right, up) = self.basis();
            let world_per_px = 2.0 * self.radius * (self.fov_y * 0.5).tan() / self.viewport_height;
            self.target += (-right * input.pan.x + up * input.pan.y) * world_per_px;
        }

        self.theta += self.delta_theta * self.damping;
        self.phi += self.delta_phi * self.damping;
        self.delta_theta *= 1.0 - self.damping;
        self.delta_phi *= 1.0 - self.damping;

        self.clamp();
    }

    pub fn position(&self) -> Vec3 {
        let s = self.phi.sin();
        self.target + Vec3::new(s * self.theta.sin(), self.phi.cos(), s * self.theta.cos()) * self.radius
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn frame(&self) -> CameraFrame {
        CameraFrame {
            view_proj: self.projection() * self.view(),
            position: self.position(),
        }
    }

    fn basis(&self) -> (Vec3, Vec3) {
        let forward = (self.target - self.position()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        (right, right.cross(forward))
    }

    fn clamp(&mut self) {
        self.phi = self.phi.clamp(MIN_POLAR, self.max_polar);
        self.radius = self.radius.clamp(self.min_distance, self.max_distance);
    }
}
