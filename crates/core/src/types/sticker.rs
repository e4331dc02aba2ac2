//! Sticker placement geometry.

use serde::{Deserialize, Serialize};

use crate::{ItemPhotoId, VisitPhotoId};

/// Errors that can occur when validating a [`StickerTransform`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq)]
pub enum TransformError {
    /// One of the values is NaN or infinite.
    #[error("{field} must be a finite number")]
    NotFinite {
        /// Name of the offending field.
        field: &'static str,
    },
    /// Position outside the photo.
    #[error("{field} must be between 0 and 100 (got {value})")]
    PositionOutOfRange {
        /// `x` or `y`.
        field: &'static str,
        /// Offending value.
        value: f64,
    },
    /// Scale not in (0, 10].
    #[error("scale must be greater than 0 and at most {max} (got {value})")]
    ScaleOutOfRange {
        /// Offending value.
        value: f64,
        /// Upper bound.
        max: f64,
    },
}

impl TransformError {
    /// The request field the error refers to.
    #[must_use]
    pub const fn field(&self) -> &'static str {
        match self {
            Self::NotFinite { field } | Self::PositionOutOfRange { field, .. } => field,
            Self::ScaleOutOfRange { .. } => "scale",
        }
    }
}

/// Position, scale and rotation of a sticker on its photo.
///
/// `x` and `y` are percentages of the photo's width and height, measured from
/// the top-left corner. Rotation is stored in degrees normalized to `[0, 360)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StickerTransform {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub rotation: f64,
}

impl StickerTransform {
    /// Largest allowed scale factor.
    pub const MAX_SCALE: f64 = 10.0;

    /// Validate raw values and return the canonical transform.
    ///
    /// # Errors
    ///
    /// Returns an error if any value is not finite, the position is outside
    /// the photo, or the scale is not in `(0, 10]`.
    pub fn new(x: f64, y: f64, scale: f64, rotation: f64) -> Result<Self, TransformError> {
        for (field, value) in [("x", x), ("y", y), ("scale", scale), ("rotation", rotation)] {
            if !value.is_finite() {
                return Err(TransformError::NotFinite { field });
            }
        }
        for (field, value) in [("x", x), ("y", y)] {
            if !(0.0..=100.0).contains(&value) {
                return Err(TransformError::PositionOutOfRange { field, value });
            }
        }
        if scale <= 0.0 || scale > Self::MAX_SCALE {
            return Err(TransformError::ScaleOutOfRange {
                value: scale,
                max: Self::MAX_SCALE,
            });
        }

        Ok(Self {
            x,
            y,
            scale,
            rotation: normalize_degrees(rotation),
        })
    }

    /// Transform for a freshly placed sticker at the given position.
    ///
    /// # Errors
    ///
    /// Returns an error if the position is invalid.
    pub fn at(x: f64, y: f64) -> Result<Self, TransformError> {
        Self::new(x, y, 1.0, 0.0)
    }
}

fn normalize_degrees(degrees: f64) -> f64 {
    let r = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if r >= 360.0 { 0.0 } else { r }
}

/// The photo a sticker is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum PhotoRef {
    Visit(VisitPhotoId),
    Item(ItemPhotoId),
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_transform_passes_through() {
        let t = StickerTransform::new(25.0, 75.5, 1.5, 30.0).unwrap();
        assert!((t.x - 25.0).abs() < f64::EPSILON);
        assert!((t.y - 75.5).abs() < f64::EPSILON);
        assert!((t.scale - 1.5).abs() < f64::EPSILON);
        assert!((t.rotation - 30.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_rotation_is_normalized() {
        let t = StickerTransform::new(0.0, 0.0, 1.0, -90.0).unwrap();
        assert!((t.rotation - 270.0).abs() < 1e-9);
        let t = StickerTransform::new(0.0, 0.0, 1.0, 720.0).unwrap();
        assert!(t.rotation.abs() < 1e-9);
        let t = StickerTransform::new(0.0, 0.0, 1.0, -1e-20).unwrap();
        assert!((0.0..360.0).contains(&t.rotation));
    }

    #[test]
    fn test_rejects_non_finite() {
        let err = StickerTransform::new(f64::NAN, 0.0, 1.0, 0.0).unwrap_err();
        assert_eq!(err, TransformError::NotFinite { field: "x" });
        let err = StickerTransform::new(0.0, 0.0, 1.0, f64::INFINITY).unwrap_err();
        assert_eq!(err.field(), "rotation");
    }

    #[test]
    fn test_rejects_position_outside_photo() {
        let err = StickerTransform::new(50.0, 100.5, 1.0, 0.0).unwrap_err();
        assert_eq!(err.field(), "y");
    }

    #[test]
    fn test_rejects_bad_scale() {
        assert!(StickerTransform::new(0.0, 0.0, 0.0, 0.0).is_err());
        assert!(StickerTransform::new(0.0, 0.0, -1.0, 0.0).is_err());
        assert!(StickerTransform::new(0.0, 0.0, 10.0, 0.0).is_ok());
        let err = StickerTransform::new(0.0, 0.0, 10.5, 0.0).unwrap_err();
        assert_eq!(err.field(), "scale");
    }

    #[test]
    fn test_placement_defaults() {
        let t = StickerTransform::at(10.0, 20.0).unwrap();
        assert!((t.scale - 1.0).abs() < f64::EPSILON);
        assert!(t.rotation.abs() < f64::EPSILON);
    }

    #[test]
    fn test_photo_ref_wire_format() {
        let json = serde_json::to_string(&PhotoRef::Item(ItemPhotoId::new(9))).unwrap();
        assert_eq!(json, r#"{"kind":"item","id":9}"#);
        let parsed: PhotoRef = serde_json::from_str(r#"{"kind":"visit","id":3}"#).unwrap();
        assert_eq!(parsed, PhotoRef::Visit(VisitPhotoId::new(3)));
    }
}
