//! Input Sanitization
//!
//! Numeric hygiene for values that arrive from settings commands or
//! configuration.
//!
//! Functions:
//! - Ratio clamping
//! - Selection weight cleanup
//! - Session size clamping

use crate::types::SelectionWeights;

/// Returns true when the value cannot be used as a weight or ratio
pub fn is_invalid(value: f64) -> bool {
    value.is_nan() || value.is_infinite()
}

/// Clamp a ratio into [0, 1]; non-finite values become `fallback`
pub fn sanitize_ratio(value: f64, fallback: f64) -> f64 {
    if is_invalid(value) {
        return fallback;
    }
    value.clamp(0.0, 1.0)
}

/// Clean a single weight: non-finite or negative becomes 0
pub fn sanitize_weight(value: f64) -> f64 {
    if is_invalid(value) || value < 0.0 {
        0.0
    } else {
        value
    }
}

/// Clean a weight triple; an all-zero triple becomes uniform
pub fn sanitize_weights(weights: SelectionWeights) -> SelectionWeights {
    let cleaned = SelectionWeights {
        struggling: sanitize_weight(weights.struggling),
        new: sanitize_weight(weights.new),
        revision: sanitize_weight(weights.revision),
    };

    let total = cleaned.total();
    if total <= 0.0 || is_invalid(total) {
        return SelectionWeights::new(1.0, 1.0, 1.0);
    }
    cleaned
}

/// Clamp a requested session size into [1, max]
pub fn sanitize_session_size(size: usize, max: usize) -> usize {
    size.clamp(1, max.max(1))
}
