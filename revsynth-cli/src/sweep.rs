//! Simulated throttle for the lab: speed ramps 0 → 1 → 0 once per period.

/// Triangle sweep in `[0, 1]` at `elapsed_s` seconds. A non-positive or
/// non-finite period holds full speed.
pub fn triangle(elapsed_s: f32, period_s: f32) -> f32 {
    if !(period_s.is_finite() && period_s > 0.0) {
        return 1.0;
    }
    let phase = (elapsed_s / period_s).rem_euclid(1.0);
    (1.0 - (2.0 * phase - 1.0).abs()).clamp(0.0, 1.0)
}
