//! Typed scene configuration.
//!
//! Everything deserialises from TOML with `#[serde(default)]`: missing keys
//! keep their defaults and unknown keys are ignored. Values are checked by
//! [`FieldConfig::validate`] before a scene allocates anything.

use std::f32::consts::PI;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::{ensure_non_negative, ensure_positive, FieldError, Result};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SceneKind {
    #[default]
    Starry,
    Sakura,
    ConeTree,
}

impl SceneKind {
    pub const ALL: [SceneKind; 3] = [SceneKind::Starry, SceneKind::Sakura, SceneKind::ConeTree];

    pub fn name(self) -> &'static str {
        match self {
            SceneKind::Starry => "starry",
            SceneKind::Sakura => "sakura",
            SceneKind::ConeTree => "cone-tree",
        }
    }
}

impl fmt::Display for SceneKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SceneKind {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        SceneKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| FieldError::invalid("scene", format!("unknown scene `{s}`")))
    }
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub scene: SceneKind,
    /// Fixed RNG seed; `None` draws one from the OS.
    pub seed: Option<u64>,
    pub starry: StarrySkyConfig,
    pub sakura: SakuraConfig,
    pub cone_tree: ConeTreeConfig,
}

impl FieldConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| FieldError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Checks every section, not only the selected scene's.
    pub fn validate(&self) -> Result<()> {
        self.starry.validate()?;
        self.sakura.validate()?;
        self.cone_tree.validate()
    }
}

// ── camera ────────────────────────────────────────────────────────────────

/// Perspective + orbit-control settings. Angles in degrees except
/// `max_polar_angle`, which is in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct CameraConfig {
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub position: [f32; 3],
    pub target: [f32; 3],
    pub damping: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    pub max_polar_angle: f32,
    pub enable_pan: bool,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

impl CameraConfig {
    pub fn starry() -> Self {
        Self {
            fov: 60.0,
            near: 0.1,
            far: 5000.0,
            position: [0.0, 120.0, 600.0],
            target: [0.0; 3],
            damping: 0.06,
            min_distance: 120.0,
            max_distance: 4000.0,
            max_polar_angle: PI,
            enable_pan: false,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }

    pub fn sakura() -> Self {
        Self {
            fov: 50.0,
            near: 0.1,
            far: 20000.0,
            position: [0.0, 60.0, 160.0],
            target: [0.0, 40.0, 0.0],
            damping: 0.05,
            min_distance: 10.0,
            max_distance: 2000.0,
            max_polar_angle: PI / 1.1,
            enable_pan: true,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
        }
    }

    pub fn cone_tree() -> Self {
        Self {
            position: [0.0, 3.0, 9.0],
            target: [0.0, 2.0, 0.0],
            min_distance: 2.0,
            max_distance: 60.0,
            ..Self::sakura()
        }
    }

    pub fn validate(&self, section: &str) -> Result<()> {
        let field = |name: &str| format!("{section}.camera.{name}");

        if !(self.fov > 0.0 && self.fov < 180.0) {
            return Err(FieldError::invalid(field("fov"), "must be within (0, 180) degrees"));
        }
        if !(self.near > 0.0 && self.far > self.near) {
            return Err(FieldError::invalid(field("near"), "needs 0 < near < far"));
        }
        if !(self.damping > 0.0 && self.damping <= 1.0) {
            return Err(FieldError::invalid(field("damping"), "must be within (0, 1]"));
        }
        if !(self.min_distance > 0.0 && self.max_distance >= self.min_distance) {
            return Err(FieldError::invalid(field("min_distance"), "needs 0 < min_distance <= max_distance"));
        }
        if !(self.max_polar_angle > 0.0 && self.max_polar_angle <= PI) {
            return Err(FieldError::invalid(field("max_polar_angle"), "must be within (0, pi]"));
        }
        for (name, v) in [("rotate_speed", self.rotate_speed), ("zoom_speed", self.zoom_speed)] {
            ensure_positive(&field(name), v)?;
        }
        if self.position.iter().chain(&self.target).any(|v| !v.is_finite()) {
            return Err(FieldError::invalid(field("position"), "must be finite"));
        }
        if self.position == self.target {
            return Err(FieldError::invalid(field("position"), "must differ from the target"));
        }
        Ok(())
    }
}

/// Partial camera settings layered over a scene's own camera defaults.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct CameraOverrides {
    pub fov: Option<f32>,
    pub near: Option<f32>,
    pub far: Option<f32>,
    pub position: Option<[f32; 3]>,
    pub target: Option<[f32; 3]>,
    pub damping: Option<f32>,
    pub min_distance: Option<f32>,
    pub max_distance: Option<f32>,
    pub max_polar_angle: Option<f32>,
    pub enable_pan: Option<bool>,
    pub rotate_speed: Option<f32>,
    pub zoom_speed: Option<f32>,
}

impl CameraOverrides {
    pub fn apply(&self, base: CameraConfig) -> CameraConfig {
        CameraConfig {
            fov: self.fov.unwrap_or(base.fov),
            near: self.near.unwrap_or(base.near),
            far: self.far.unwrap_or(base.far),
            position: self.position.unwrap_or(base.position),
            target: self.target.unwrap_or(base.target),
            damping: self.damping.unwrap_or(base.damping),
            min_distance: self.min_distance.unwrap_or(base.min_distance),
            max_distance: self.max_distance.unwrap_or(base.max_distance),
            max_polar_angle: self.max_polar_angle.unwrap_or(base.max_polar_angle),
            enable_pan: self.enable_pan.unwrap_or(base.enable_pan),
            rotate_speed: self.rotate_speed.unwrap_or(base.rotate_speed),
            zoom_speed: self.zoom_speed.unwrap_or(base.zoom_speed),
        }
    }
}

// ── starry sky ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StarrySkyConfig {
    pub star_count: usize,
    pub star_radius: f32,
    pub galaxy_count: usize,
    /// Semi-axes of the galaxy ellipsoid.
    pub galaxy_axes: [f32; 3],
    pub density_pow: f32,
    pub edge_blur: f32,
    pub max_tries: u32,
    pub micro_cloud_count: usize,
    pub micro_core_count: usize,
    pub filament_count: usize,
    /// Group rotation per tick around X and Y, in radians.
    pub spin: [f32; 2],
    pub meteors: MeteorConfig,
    pub camera: CameraOverrides,
}

impl Default for StarrySkyConfig {
    fn default() -> Self {
        Self {
            star_count: 34_000,
            star_radius: 7000.0,
            galaxy_count: 90_000,
            galaxy_axes: [2880.0, 864.0, 2250.0],
            density_pow: 1.4,
            edge_blur: 216.0,
            max_tries: 4000,
            micro_cloud_count: 44_000,
            micro_core_count: 24_000,
            filament_count: 80,
            spin: [0.000_03, 0.000_28],
            meteors: MeteorConfig::default(),
            camera: CameraOverrides::default(),
        }
    }
}

impl StarrySkyConfig {
    pub fn camera(&self) -> CameraConfig {
        self.camera.apply(CameraConfig::starry())
    }

    pub fn validate(&self) -> Result<()> {
        ensure_positive("starry.star_radius", self.star_radius)?;
        for (i, axis) in ["x", "y", "z"].iter().enumerate() {
            ensure_positive(&format!("starry.galaxy_axes.{axis}"), self.galaxy_axes[i])?;
        }
        ensure_non_negative("starry.density_pow", self.density_pow)?;
        ensure_non_negative("starry.edge_blur", self.edge_blur)?;
        if self.max_tries == 0 {
            return Err(FieldError::invalid("starry.max_tries", "must be at least 1"));
        }
        if self.spin.iter().any(|v| !v.is_finite()) {
            return Err(FieldError::invalid("starry.spin", "must be finite"));
        }
        self.meteors.validate()?;
        self.camera().validate("starry")
    }
}

/// Shooting-star trails.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MeteorConfig {
    /// Chance per tick that one meteor spawns.
    pub spawn_probability: f32,
    pub min_life: u32,
    /// Upper bound (exclusive) of the random ticks added to each life.
    pub life_jitter: u32,
    pub speed_min: f32,
    pub speed_max: f32,
    pub color: [f32; 3],
}

impl Default for MeteorConfig {
    fn default() -> Self {
        Self {
            spawn_probability: 0.006,
            min_life: 30,
            life_jitter: 40,
            speed_min: 20.0,
            speed_max: 140.0,
            color: [1.0, 0.957, 0.851],
        }
    }
}

impl MeteorConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.spawn_probability) {
            return Err(FieldError::invalid("starry.meteors.spawn_probability", "must be within [0, 1]"));
        }
        if self.min_life == 0 {
            return Err(FieldError::invalid("starry.meteors.min_life", "must be at least 1"));
        }
        ensure_positive("starry.meteors.speed_min", self.speed_min)?;
        if !(self.speed_max >= self.speed_min && self.speed_max.is_finite()) {
            return Err(FieldError::invalid("starry.meteors.speed_max", "must be finite and >= speed_min"));
        }
        if self.color.iter().any(|c| !(0.0..=1.0).contains(c)) {
            return Err(FieldError::invalid("starry.meteors.color", "channels must be within [0, 1]"));
        }
        Ok(())
    }
}

// ── sakura ────────────────────────────────────────────────────────────────

/// Blossom tree. Lengths are in model units and multiplied by `world_scale`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SakuraConfig {
    pub particle_count: usize,
    pub particle_size: f32,
    pub crown_diameter: f32,
    pub crown_height: f32,
    pub petal_count: usize,
    pub petal_size: f32,
    /// Extra crown spin per tick, in radians.
    pub rotation_speed: f32,
    pub trunk_height: f32,
    pub trunk_base_diameter: f32,
    pub trunk_top_diameter: f32,
    pub world_scale: f32,
    pub camera: CameraOverrides,
}

impl Default for SakuraConfig {
    fn default() -> Self {
        Self {
            particle_count: 120_000,
            particle_size: 1.0,
            crown_diameter: 12_000.0,
            crown_height: 3000.0,
            petal_count: 5000,
            petal_size: 1.0,
            rotation_speed: 0.0004,
            trunk_height: 5000.0,
            trunk_base_diameter: 1500.0,
            trunk_top_diameter: 80.0,
            world_scale: 0.01,
            camera: CameraOverrides::default(),
        }
    }
}

impl SakuraConfig {
    pub fn camera(&self) -> CameraConfig {
        self.camera.apply(CameraConfig::sakura())
    }

    pub fn validate(&self) -> Result<()> {
        positive_count("sakura.particle_count", self.particle_count)?;
        ensure_positive("sakura.particle_size", self.particle_size)?;
        ensure_positive("sakura.crown_diameter", self.crown_diameter)?;
        ensure_positive("sakura.crown_height", self.crown_height)?;
        ensure_positive("sakura.petal_size", self.petal_size)?;
        ensure_positive("sakura.trunk_height", self.trunk_height)?;
        ensure_non_negative("sakura.trunk_base_diameter", self.trunk_base_diameter)?;
        ensure_non_negative("sakura.trunk_top_diameter", self.trunk_top_diameter)?;
        ensure_positive("sakura.world_scale", self.world_scale)?;
        if !self.rotation_speed.is_finite() {
            return Err(FieldError::invalid("sakura.rotation_speed", "must be finite"));
        }
        self.camera().validate("sakura")
    }
}

// ── cone tree ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConeTreeConfig {
    pub particle_count: usize,
    pub particle_size: f32,
    pub height: f32,
    pub width: f32,
    pub rotation_speed: f32,
    pub petal_count: usize,
    pub camera: CameraOverrides,
}

impl Default for ConeTreeConfig {
    fn default() -> Self {
        Self {
            particle_count: 3000,
            particle_size: 0.04,
            height: 4.0,
            width: 2.0,
            rotation_speed: 0.001,
            petal_count: 800,
            camera: CameraOverrides::default(),
        }
    }
}

impl ConeTreeConfig {
    pub fn camera(&self) -> CameraConfig {
        self.camera.apply(CameraConfig::cone_tree())
    }

    pub fn validate(&self) -> Result<()> {
        positive_count("cone_tree.particle_count", self.particle_count)?;
        ensure_positive("cone_tree.particle_size", self.particle_size)?;
        ensure_positive("cone_tree.height", self.height)?;
        ensure_positive("cone_tree.width", self.width)?;
        if !self.rotation_speed.is_finite() {
            return Err(FieldError::invalid("cone_tree.rotation_speed", "must be finite"));
        }
        self.camera().validate("cone_tree")
    }
}

// ── checks ────────────────────────────────────────────────────────────────

fn positive_count(field: &str, v: usize) -> Result<()> {
    if v > 0 {
        Ok(())
    } else {
        Err(FieldError::invalid(field, "must be greater than zero"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        FieldConfig::default().validate().unwrap();
    }

    #[test]
    fn missing_keys_default_and_unknown_keys_are_ignored() {
        let cfg = FieldConfig::from_toml_str(
            r#"
            scene = "sakura"
            seed = 7
            colour_scheme = "ignored"

            [sakura]
            particle_count = 1000
            world_scale = 0.02
            wind = 3.5

            [sakura.camera]
            fov = 40.0
            "#,
        )
        .unwrap();

        assert_eq!(cfg.scene, SceneKind::Sakura);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.sakura.particle_count, 1000);
        assert_eq!(cfg.sakura.world_scale, 0.02);
        assert_eq!(cfg.sakura.petal_count, 5000);
        assert_eq!(cfg.starry, StarrySkyConfig::default());

        let cam = cfg.sakura.camera();
        assert_eq!(cam.fov, 40.0);
        assert_eq!(cam.position, [0.0, 60.0, 160.0]);
        cfg.validate().unwrap();
    }

    #[test]
    fn bad_values_fail_fast_with_the_field_name() {
        let mut cfg = FieldConfig::default();
        cfg.sakura.world_scale = -1.0;
        match cfg.validate() {
            Err(FieldError::InvalidConfig { field, .. }) => assert_eq!(field, "sakura.world_scale"),
            other => panic!("unexpected {other:?}"),
        }

        let mut cfg = FieldConfig::default();
        cfg.cone_tree.particle_count = 0;
        assert!(cfg.validate().is_err());

        let mut cfg = FieldConfig::default();
        cfg.starry.meteors.spawn_probability = 1.5;
        assert!(cfg.validate().is_err());

        let mut cfg = FieldConfig::default();
        cfg.starry.galaxy_axes[1] = f32::NAN;
        assert!(cfg.validate().is_err());

        let mut cfg = FieldConfig::default();
        cfg.starry.edge_blur = -0.5;
        match cfg.validate() {
            Err(FieldError::InvalidConfig { field, reason }) => {
                assert_eq!(field, "starry.edge_blur");
                assert!(reason.contains(">= 0"), "{reason}");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn negative_count_is_a_parse_error() {
        let err = FieldConfig::from_toml_str("[sakura]\nparticle_count = -5\n").unwrap_err();
        assert!(matches!(err, FieldError::ConfigParse(_)));
    }

    #[test]
    fn scene_names_round_trip() {
        for kind in SceneKind::ALL {
            assert_eq!(kind.name().parse::<SceneKind>().unwrap(), kind);
        }
        assert!("galaxy".parse::<SceneKind>().is_err());
    }

    #[test]
    fn missing_file_reports_the_path() {
        let err = FieldConfig::load(Path::new("/nonexistent/nightbloom.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/nightbloom.toml"));
    }
}
