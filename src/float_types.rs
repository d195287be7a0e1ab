//! Scalar type and crate-wide geometric tolerance.

use core::str::FromStr;
use std::sync::OnceLock;

// Re-export parry for the f64 build.
pub use parry3d_f64 as parry3d;

/// Our Real scalar type. The exact-arithmetic predicate tier is built on
/// binary64 error-free transformations, so the crate is pinned to `f64`.
pub type Real = f64;

/// Tolerance used for tests on normalized quantities (welding, on-plane
/// checks against unit normals, degenerate-area rejection).
pub const EPSILON: Real = 1e-12;

/// Lazily-initialized tolerance used across the crate.
/// Defaults to [`EPSILON`], but can be overridden:
///  1) **Build-time**: set env var `MESHCSG_TOLERANCE` (e.g. `MESHCSG_TOLERANCE=1e-9 cargo build`)
///  2) **Runtime**: call [`set_tolerance`] once before using the library
static TOLERANCE_CELL: OnceLock<Real> = OnceLock::new();

/// Returns the current tolerance value.
/// If not set yet, it tries `MESHCSG_TOLERANCE` (parsed as `f64`) and falls
/// back to [`EPSILON`].
pub fn tolerance() -> Real {
    *TOLERANCE_CELL.get_or_init(|| {
        // Compile-time env if provided, inherited by dependencies
        if let Some(environment_variable) = option_env!("MESHCSG_TOLERANCE") {
            if let Ok(value) = Real::from_str(environment_variable) {
                return value.max(Real::EPSILON);
            }
        }
        EPSILON
    })
}

/// Set the tolerance programmatically once (subsequent calls are ignored).
/// Call near program start: `meshcsg::float_types::set_tolerance(1e-9);`
pub fn set_tolerance(value: Real) {
    let _ = TOLERANCE_CELL.set(value.max(Real::EPSILON));
}

/// Archimedes' constant (π)
pub const PI: Real = core::f64::consts::PI;

/// π/2
pub const FRAC_PI_2: Real = core::f64::consts::FRAC_PI_2;

/// The full circle constant (τ)
pub const TAU: Real = core::f64::consts::TAU;
