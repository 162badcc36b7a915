//! Number formatting shared by the text-based backends.
//!
//! Every output format writes decimals the same way: integral values keep a
//! single `.0`, everything else uses the shortest representation that reads
//! back to the same value. The dot is always the decimal separator.

/// Decimal text for a double, `2.0` rather than `2`.
pub fn decimal(v: f64) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Same as [`decimal`] for single precision values such as dash lengths.
pub fn decimal_f32(v: f32) -> String {
    if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e7 {
        format!("{:.1}", v)
    } else {
        format!("{}", v)
    }
}

/// Rounds half up to two decimal digits.
pub fn round2(v: f64) -> f64 {
    (v * 100.0 + 0.5).floor() / 100.0
}

/// Text of `v` rounded to two decimal digits.
pub fn round_to(v: f64) -> String {
    decimal(round2(v))
}

/// Text of `v` truncated toward zero after `digits` decimal digits.
pub fn truncate_to(v: f64, digits: i32) -> String {
    let scale = 10f64.powi(digits);
    decimal((v * scale).trunc() / scale)
}
