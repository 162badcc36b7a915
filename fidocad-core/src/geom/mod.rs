//! Geometry shared by the model and the export backends.

pub mod arrow;
pub mod curves;
pub mod distance;

pub use arrow::{arrow_head, ArrowHead, ArrowSpec, ARROW_EMPTY, ARROW_LIMITER};
pub use curves::{bezier_points, flatten_spline, spline_through, Cubic, CURVE_STEPS};
