use std::path::PathBuf;

use thiserror::Error;

use crate::surface::Resource;

/// Errors raised while configuring or building a field.
///
/// Per-frame and per-resource failures during teardown never surface as
/// `FieldError`; they are logged and skipped.
#[derive(Debug, Error)]
pub enum FieldError {
    #[error("invalid config `{field}`: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("point set attribute `{attribute}` has {found} entries, expected {expected}")]
    AttributeLength {
        attribute: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("render surface error: {0}")]
    Surface(#[from] SurfaceError),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FieldError {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub(crate) fn ensure_positive(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(FieldError::invalid(field, format!("must be a positive finite number, got {value}")))
    }
}

pub(crate) fn ensure_non_negative(field: &str, value: f32) -> Result<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FieldError::invalid(field, format!("must be finite and >= 0, got {value}")))
    }
}

/// Errors reported by a [`RenderSurface`](crate::surface::RenderSurface).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SurfaceError {
    #[error("unknown or already released resource {0:?}")]
    UnknownResource(Resource),

    #[error("render surface is not attached")]
    Detached,

    #[error("allocation failed: {0}")]
    Allocation(String),
}

pub type Result<T> = std::result::Result<T, FieldError>;
