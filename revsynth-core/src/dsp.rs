//! Scalar helpers shared by the oscillator and the post-processing stages.
//!
//! - Pure functions; nothing here keeps state
//! - Out-of-range arguments are clamped, never rejected
//! - `fast-math` swaps in a polynomial sine
//!
//! Argument and return domains are documented per function.

#![allow(clippy::excessive_precision)]

use core::f32::consts::PI;

use cfg_if::cfg_if;

// --------------------------------- Constants -------------------------------------

/// 2π (commonly useful)
pub const TAU: f32 = 2.0 * PI;

/// A very small epsilon used in denormal handling and safe divisions.
pub const EPS_SMALL: f32 = 1.0e-20;

/// Smallest gain exponent accepted by [`shape_gain`]; keeps `1/gain` finite.
pub const MIN_GAIN: f32 = 1.0e-3;

// --------------------------------- Utilities -------------------------------------

#[inline]
pub fn clamp(x: f32, lo: f32, hi: f32) -> f32 {
    if x < lo { lo } else if x > hi { hi } else { x }
}

/// Clamp into `[0, 1]`; NaN maps to 0.
#[inline]
pub fn clamp01(x: f32) -> f32 {
    if x.is_nan() { 0.0 } else { clamp(x, 0.0, 1.0) }
}

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL { 0.0 } else { x }
}

/// Replace NaN/inf with silence.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// Final output stage: sanitize, then hard clamp to `[-1, 1]`.
#[inline]
pub fn hard_limit(x: f32) -> f32 {
    clamp(sanitize(x), -1.0, 1.0)
}

// --------------------------------- Fast trig -------------------------------------

/// Fast sine: range reduction into [-π/2, π/2] and a 5th-order minimax-style poly.
/// Max abs error ~5e-3 when `fast-math` is enabled, output kept in [-1, 1];
/// falls back to exact otherwise.
#[inline]
pub fn fast_sin(x: f32) -> f32 {
    cfg_if! {
        if #[cfg(feature = "fast-math")] {
            let mut xr = x;
            let k = (xr / TAU).round();
            xr -= k * TAU;
            // fold into [-π/2, π/2] where the polynomial is accurate
            if xr > 0.5 * PI {
                xr = PI - xr;
            } else if xr < -0.5 * PI {
                xr = -PI - xr;
            }

            // 5th-order odd polynomial: sin(x) ≈ x * (a + b x^2 + c x^4).
            // It overshoots to ~1.0046 near ±π/2, so clamp to the unit range.
            let x2 = xr * xr;
            let y = xr * (0.999_979_313_3 + x2 * (-0.166_624_432_0 + x2 * 0.008_308_978_98));
            clamp(y, -1.0, 1.0)
        } else {
            x.sin()
        }
    }
}

// --------------------------------- Exponentials / smoothing ----------------------

/// Convert cutoff in Hz to a simple one-pole (non-TPT) coefficient `exp(-2π fc / sr)`.
/// For the `y += a * (x - y)` form use `a = 1 - one_pole_coeff_hz(..)`.
#[inline]
pub fn one_pole_coeff_hz(cut_hz: f32, sr: f32) -> f32 {
    let sr = sr.max(1.0);
    let fc = cut_hz.max(0.0).min(0.499 * sr);
    (-2.0 * PI * fc / sr).exp()
}

// --------------------------------- Shaping stages --------------------------------

/// Sign-preserving inverse power curve: `sign(v) · |v|^(1/gain)`.
///
/// `gain > 1` pushes values toward ±1 (compresses dynamic range), `gain < 1`
/// pulls them toward 0. Gain is clamped to at least [`MIN_GAIN`].
#[inline]
pub fn shape_gain(v: f32, gain: f32) -> f32 {
    let g = if gain.is_nan() { 1.0 } else { gain.max(MIN_GAIN) };
    if g == 1.0 {
        return v;
    }
    let mag = v.abs().powf(1.0 / g);
    if v < 0.0 { -mag } else { mag }
}

/// Amplitude-modulation carrier: `(1 − 2·strength) + strength · sin(2π · t · hz)`.
///
/// `t` is elapsed time in seconds. `strength` is clamped to `[0, 1]`; a
/// non-finite `hz` stops the carrier at phase 0.
#[inline]
pub fn am_carrier(t: f64, hz: f32, strength: f32) -> f32 {
    let s = clamp01(strength);
    let hz = if hz.is_finite() { hz } else { 0.0 };
    // Reduce the phase in f64 so large `t` keeps full precision.
    let phase = (t * f64::from(hz)).rem_euclid(1.0) as f32;
    (1.0 - 2.0 * s) + s * fast_sin(TAU * phase)
}

// --------------------------------- Tests (std only) ------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_respects_both_bounds() {
        assert_eq!(clamp(2.0, -1.0, 1.0), 1.0);
        assert_eq!(clamp(-2.0, -1.0, 1.0), -1.0);
        assert_eq!(clamp(0.25, -1.0, 1.0), 0.25);
        assert_eq!(clamp01(f32::NAN), 0.0);
    }

    #[test]
    fn hard_limit_drops_non_finite() {
        assert_eq!(hard_limit(f32::NAN), 0.0);
        assert_eq!(hard_limit(f32::INFINITY), 0.0);
        assert_eq!(hard_limit(3.0), 1.0);
        assert_eq!(hard_limit(-3.0), -1.0);
    }

    #[test]
    fn gain_preserves_sign() {
        for v in [-0.9, -0.3, 0.0, 0.3, 0.9] {
            for g in [0.5, 1.0, 1.5, 2.0] {
                let y = shape_gain(v, g);
                assert!(y.abs() <= 1.0, "v={v} g={g} y={y}");
                assert!(v == 0.0 || y.signum() == v.signum(), "v={v} g={g} y={y}");
            }
        }
    }

    #[test]
    fn gain_above_one_compresses_toward_extremes() {
        let v = 0.25;
        assert!(shape_gain(v, 2.0) > v);
        assert!((shape_gain(v, 2.0) - 0.5).abs() < 1e-6);
        assert!(shape_gain(v, 0.5) < v);
        assert!((shape_gain(-v, 2.0) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn gain_tolerates_degenerate_exponents() {
        for g in [0.0, -1.0, f32::NAN] {
            let y = shape_gain(0.5, g);
            assert!(y.is_finite(), "g={g} y={y}");
        }
    }

    #[test]
    fn am_carrier_range_follows_strength() {
        for s in [0.0_f32, 0.25, 0.5, 1.0] {
            for i in 0..1000 {
                let t = f64::from(i) / 1000.0;
                let c = am_carrier(t, 3.0, s);
                let lo = 1.0 - 3.0 * s - 1e-3;
                let hi = 1.0 - s + 1e-3;
                assert!(c >= lo && c <= hi, "s={s} t={t} c={c}");
            }
        }
        assert_eq!(am_carrier(12.3, 10.0, 0.0), 1.0);
        assert!(am_carrier(12.3, f32::NAN, 0.5).is_finite());
    }

    #[cfg(feature = "fast-math")]
    #[test]
    fn fast_sin_stays_in_unit_range() {
        let mut max = 0.0_f32;
        for i in -20_000..=20_000 {
            let x = i as f32 * 0.001;
            let y = fast_sin(x);
            assert!((-1.0..=1.0).contains(&y), "x={x} y={y}");
            assert!((y - x.sin()).abs() < 1e-2, "x={x} y={y}");
            max = max.max(y.abs());
        }
        assert!(max > 0.999, "max={max}");
    }
}
