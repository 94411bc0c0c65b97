use glam::Vec3;

use crate::error::{FieldError, Result};

/// Positions plus per-point attributes of one particle cloud.
///
/// All attribute arrays have the same length as `positions`; index `i` in
/// every array describes the same point. The set is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct PointSet {
    positions: Vec<Vec3>,
    phases: Vec<f32>,
    sizes: Vec<f32>,
    colors: Option<Vec<[f32; 3]>>,
}

impl PointSet {
    pub fn new(
        positions: Vec<Vec3>,
        phases: Vec<f32>,
        sizes: Vec<f32>,
        colors: Option<Vec<[f32; 3]>>,
    ) -> Result<Self> {
        let expected = positions.len();
        check_len("phase", expected, phases.len())?;
        check_len("size", expected, sizes.len())?;
        if let Some(colors) = &colors {
            check_len("color", expected, colors.len())?;
        }

        Ok(Self {
            positions,
            phases,
            sizes,
            colors,
        })
    }

    pub fn empty() -> Self {
        Self {
            positions: Vec::new(),
            phases: Vec::new(),
            sizes: Vec::new(),
            colors: None,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn phases(&self) -> &[f32] {
        &self.phases
    }

    pub fn sizes(&self) -> &[f32] {
        &self.sizes
    }

    pub fn colors(&self) -> Option<&[[f32; 3]]> {
        self.colors.as_deref()
    }

    pub fn has_colors(&self) -> bool {
        self.colors.is_some()
    }

    /// Color of point `i`, white when the set carries no colors.
    pub fn color(&self, i: usize) -> [f32; 3] {
        self.colors
            .as_ref()
            .and_then(|c| c.get(i).copied())
            .unwrap_or([1.0, 1.0, 1.0])
    }
}

fn check_len(attribute: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(FieldError::AttributeLength {
            attribute,
            expected,
            found,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mismatched_attributes_are_rejected() {
        let err = PointSet::new(vec![Vec3::ZERO; 3], vec![0.0; 3], vec![1.0; 2], None).unwrap_err();
        assert!(matches!(
            err,
            FieldError::AttributeLength { attribute: "size", expected: 3, found: 2 }
        ));

        let err = PointSet::new(vec![Vec3::ZERO; 2], vec![0.0; 2], vec![1.0; 2], Some(vec![[0.0; 3]; 5]))
            .unwrap_err();
        assert!(matches!(err, FieldError::AttributeLength { attribute: "color", .. }));
    }

    #[test]
    fn missing_colors_read_as_white() {
        let set = PointSet::new(vec![Vec3::ONE], vec![0.5], vec![2.0], None).unwrap();
        assert_eq!(set.color(0), [1.0, 1.0, 1.0]);
        assert!(!set.has_colors());
    }
}
