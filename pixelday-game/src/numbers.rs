//! Numeric helpers centralizing clamps and safe numeric casts.

use num_traits::cast::cast;

use crate::constants::{
    POINTS_MAX, POINTS_MIN, REPAIR_POINTS_MAX, REPAIR_POINTS_MIN, SCORE_MAX, SCORE_MIN,
};

/// Clamp a running score (or any score-scoped value) to `[SCORE_MIN, SCORE_MAX]`.
#[must_use]
pub const fn clamp_score(value: i32) -> i32 {
    if value < SCORE_MIN {
        SCORE_MIN
    } else if value > SCORE_MAX {
        SCORE_MAX
    } else {
        value
    }
}

/// Clamp an outcome's point delta to `[POINTS_MIN, POINTS_MAX]`.
#[must_use]
pub const fn clamp_points(value: i32) -> i32 {
    if value < POINTS_MIN {
        POINTS_MIN
    } else if value > POINTS_MAX {
        POINTS_MAX
    } else {
        value
    }
}

/// Clamp a repair's recovered points to `[REPAIR_POINTS_MIN, REPAIR_POINTS_MAX]`.
#[must_use]
pub const fn clamp_recovered(value: i32) -> i32 {
    if value < REPAIR_POINTS_MIN {
        REPAIR_POINTS_MIN
    } else if value > REPAIR_POINTS_MAX {
        REPAIR_POINTS_MAX
    } else {
        value
    }
}

/// Round a f64 and clamp it to the i32 range, returning 0 for NaN values.
#[must_use]
pub fn round_f64_to_i32(value: f64) -> i32 {
    if value.is_nan() {
        return 0;
    }
    let min = cast::<i32, f64>(i32::MIN).unwrap_or(f64::MIN);
    let max = cast::<i32, f64>(i32::MAX).unwrap_or(f64::MAX);
    let clamped = value.clamp(min, max).round();
    cast::<f64, i32>(clamped).unwrap_or(0)
}
