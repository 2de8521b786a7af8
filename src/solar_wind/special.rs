//! Special functions for power-law solar-wind dispersion.
//!
//! The path-integrated electron column through a spherically-symmetric density
//! falloff `n_e ∝ r⁻ᵖ` reduces to the Gauss hypergeometric function
//! `(z/b)·₂F₁(1/2, p/2; 3/2; −(z/b)²)`, which is the antiderivative
//! `∫₀^{z/b} (1+t²)^{−p/2} dt`. This module evaluates that integral over the
//! full dynamic range of its argument (the far bound sits at ~1e11 AU) and
//! provides the gamma-function piece of the complete integral together with the
//! analytic p-derivatives used by the fitter.
//!
//! All functions require `p > 1`; the integral diverges at `p ≤ 1` and callers
//! must not receive a numerically wrong value there.

use statrs::function::gamma::{digamma, gamma};

use crate::timing_errors::TimingError;

const SQRT_PI: f64 = 1.772_453_850_905_516;

/// `∫₀^u (1+t²)^{−p/2} dt`, i.e. `u·₂F₁(1/2, p/2; 3/2; −u²)`.
///
/// Odd in `u`. Evaluated in three regimes:
/// - `|u| ≤ 0.5`: direct hypergeometric series,
/// - `0.5 < |u| < 6`: Pfaff-transformed series with argument `u²/(1+u²)`,
/// - `|u| ≥ 6`: complete integral minus the large-`u` binomial tail.
///
/// Errors with [`TimingError::UnsupportedPowerLawIndex`] for `p ≤ 1`.
pub fn path_integral(u: f64, p: f64) -> Result<f64, TimingError> {
    if p <= 1.0 {
        return Err(TimingError::UnsupportedPowerLawIndex(p));
    }
    if u < 0.0 {
        return Ok(-path_integral(-u, p)?);
    }
    if u == 0.0 {
        return Ok(0.0);
    }
    if u <= 0.5 {
        Ok(series_direct(u, p))
    } else if u < 6.0 {
        Ok(series_pfaff(u, p))
    } else {
        Ok(complete_integral(p) - integral_tail(u, p))
    }
}

/// Direct series of `u·₂F₁(1/2, p/2; 3/2; −u²)`; converges fast for `u² ≤ 1/4`.
fn series_direct(u: f64, p: f64) -> f64 {
    const KMAX: usize = 200;
    let contr = f64::EPSILON;
    let w = -u * u;
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 0..KMAX {
        let kf = k as f64;
        term *= (0.5 + kf) * (0.5 * p + kf) / ((1.5 + kf) * (kf + 1.0)) * w;
        sum += term;
        if term.abs() < contr * sum.abs() {
            break;
        }
    }
    u * sum
}

/// Pfaff transformation: `₂F₁(1/2, p/2; 3/2; −u²) =
/// (1+u²)^{−1/2}·₂F₁(1/2, (3−p)/2; 3/2; u²/(1+u²))`, whose argument stays in
/// `[0, 1)` so the series converges for any real `u`.
fn series_pfaff(u: f64, p: f64) -> f64 {
    const KMAX: usize = 5000;
    let contr = f64::EPSILON;
    let m = u * u / (1.0 + u * u);
    let b = 0.5 * (3.0 - p);
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 0..KMAX {
        let kf = k as f64;
        term *= (0.5 + kf) * (b + kf) / ((1.5 + kf) * (kf + 1.0)) * m;
        sum += term;
        if term.abs() < contr * sum.abs() {
            break;
        }
    }
    u / (1.0 + u * u).sqrt() * sum
}

/// `∫₀^∞ (1+t²)^{−p/2} dt = (√π/2)·Γ((p−1)/2)/Γ(p/2)`, for `p > 1`.
pub fn complete_integral(p: f64) -> f64 {
    0.5 * SQRT_PI * gamma_ratio(p)
}

/// Binomial expansion of `∫_u^∞ (1+t²)^{−p/2} dt` in powers of `u⁻²`; accurate
/// for `u ≥ 6`, and underflows harmlessly to zero at the huge far bound.
fn integral_tail(u: f64, p: f64) -> f64 {
    const KMAX: usize = 100;
    let contr = f64::EPSILON;
    let ui2 = 1.0 / (u * u);
    let mut term = u.powf(1.0 - p) / (p - 1.0);
    let mut sum = term;
    for k in 0..KMAX {
        let kf = k as f64;
        term *= -(0.5 * p + kf) / (kf + 1.0) * (p - 1.0 + 2.0 * kf) / (p + 1.0 + 2.0 * kf) * ui2;
        sum += term;
        if term.abs() < contr * sum.abs() {
            break;
        }
    }
    sum
}

/// `Γ(p/2 − 1/2)/Γ(p/2)`: the gamma-function piece of the complete integral.
/// Multiply by `b√π/2` to get the path length through the full column.
pub fn gamma_ratio(p: f64) -> f64 {
    gamma(0.5 * p - 0.5) / gamma(0.5 * p)
}

/// Closed-form derivative of [`gamma_ratio`] with respect to `p`, via the
/// digamma function.
pub fn d_gamma_ratio_dp(p: f64) -> f64 {
    gamma(0.5 * p - 0.5) * digamma(0.5 * p - 0.5) / 2.0 / gamma(0.5 * p)
        - gamma(0.5 * p - 0.5) * digamma(0.5 * p) / 2.0 / gamma(0.5 * p)
}

/// `cot θ·₂F₁(1/2, p/2; 3/2; −cot²θ)` with `θ = atan2(b, z)`: the
/// finite-boundary piece of the path length. Multiply by `b` for length units.
pub fn hypergeom_term(b: f64, z: f64, p: f64) -> Result<f64, TimingError> {
    let theta = b.atan2(z);
    let cot = if theta.tan().is_infinite() {
        0.0
    } else {
        1.0 / theta.tan()
    };
    path_integral(cot, p)
}

/// Derivative of [`hypergeom_term`] with respect to `p`.
///
/// The hypergeometric series is numerically unstable when differentiated near
/// the tangent point (`cot θ` small), so this uses an order (4,4) Padé
/// expansion of `∂/∂p [cot θ·₂F₁(1/2, p/2; 3/2; −cot²θ)]` in
/// `x = θ − π/2`. The rational polynomial below is fixed; derivative
/// consistency tests compare it against finite differences.
pub fn d_hypergeom_term_dp(b: f64, z: f64, p: f64) -> f64 {
    let x = b.atan2(z) - std::f64::consts::FRAC_PI_2;
    let x2 = x * x;
    let x3 = x2 * x;
    let x4 = x2 * x2;
    let p2 = p * p;
    let p3 = p2 * p;
    let p4 = p2 * p2;
    let num = 8580.0
        * x3
        * ((p4 - 76.0 / 11.0 * p3 + 2996.0 / 429.0 * p2 + 5248.0 / 429.0 * p - 1984.0 / 429.0)
            * x4
            + 84.0 / 11.0 * (p2 - 115.0 / 39.0 * p - 44.0 / 39.0) * (p + 4.0) * x2
            + 1960.0 / 143.0 * (p + 4.0) * (p + 4.0));
    let den = 39.0 * x4 * p3 - 186.0 * x4 * p2 + 200.0 * x4 * p
        + 360.0 * x2 * p2
        + 32.0 * x4
        - 480.0 * x2 * p
        - 1440.0 * x2
        + 840.0 * p
        + 3360.0;
    num / (den * den)
}

#[cfg(test)]
mod special_test {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_path_integral_p2_is_arctan() {
        for u in [0.05, 0.3, 0.49, 0.51, 2.0, 5.9, 6.1, 30.0, 1e4] {
            assert_relative_eq!(
                path_integral(u, 2.0).unwrap(),
                u.atan(),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_path_integral_p3_closed_form() {
        for u in [0.1, 0.5, 1.7, 6.5, 100.0] {
            assert_relative_eq!(
                path_integral(u, 3.0).unwrap(),
                u / (1.0 + u * u).sqrt(),
                max_relative = 1e-10
            );
        }
    }

    #[test]
    fn test_path_integral_is_odd() {
        for p in [1.5, 2.0, 3.0] {
            for u in [0.2, 1.3, 8.0] {
                assert_eq!(
                    path_integral(-u, p).unwrap(),
                    -path_integral(u, p).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_path_integral_positive_and_monotonic() {
        for p in [1.5, 2.0, 3.0] {
            let mut prev = 0.0;
            for i in 1..200 {
                let u = 0.1 * i as f64;
                let v = path_integral(u, p).unwrap();
                assert!(v > prev, "not increasing at u={u}, p={p}");
                prev = v;
            }
        }
    }

    #[test]
    fn test_path_integral_converges_to_complete() {
        // far bound behaves as infinity
        assert_relative_eq!(
            path_integral(1e11, 2.0).unwrap(),
            std::f64::consts::FRAC_PI_2,
            max_relative = 1e-10
        );
        // the residual tail scales as u^(1-p), largest for shallow indices
        for p in [1.5, 2.5, 4.0] {
            assert_relative_eq!(
                path_integral(1e11, p).unwrap(),
                complete_integral(p),
                max_relative = 1e-5
            );
        }
    }

    #[test]
    fn test_unsupported_power_law() {
        assert_eq!(
            path_integral(2.0, 1.0),
            Err(TimingError::UnsupportedPowerLawIndex(1.0))
        );
        assert_eq!(
            path_integral(2.0, 0.5),
            Err(TimingError::UnsupportedPowerLawIndex(0.5))
        );
    }

    #[test]
    fn test_gamma_ratio_known_values() {
        // Γ(1/2)/Γ(1) = √π ; Γ(1)/Γ(3/2) = 2/√π
        assert_relative_eq!(gamma_ratio(2.0), SQRT_PI, max_relative = 1e-12);
        assert_relative_eq!(gamma_ratio(3.0), 2.0 / SQRT_PI, max_relative = 1e-12);
    }

    #[test]
    fn test_d_gamma_ratio_dp_matches_finite_difference() {
        let h = 1e-6;
        for p in [1.5, 2.0, 3.0, 4.5] {
            let fd = (gamma_ratio(p + h) - gamma_ratio(p - h)) / (2.0 * h);
            assert_relative_eq!(d_gamma_ratio_dp(p), fd, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_hypergeom_term_matches_path_integral() {
        // cot(atan2(b, z)) = z/b
        let (b, z) = (0.7, 0.4);
        for p in [1.5, 2.0, 3.0] {
            assert_relative_eq!(
                hypergeom_term(b, z, p).unwrap(),
                path_integral(z / b, p).unwrap(),
                max_relative = 1e-12
            );
        }
    }

    #[test]
    fn test_d_hypergeom_term_dp_near_perpendicular() {
        // Padé expansion is anchored at θ = π/2; compare against central
        // differences of the exact term at elongations a few degrees away
        let h = 1e-5;
        for theta_deg in [85.0_f64, 95.0] {
            let theta = theta_deg.to_radians();
            let (b, z) = (theta.sin(), theta.cos());
            for p in [1.5, 2.0, 3.0] {
                let fd = (hypergeom_term(b, z, p + h).unwrap()
                    - hypergeom_term(b, z, p - h).unwrap())
                    / (2.0 * h);
                assert_relative_eq!(d_hypergeom_term_dp(b, z, p), fd, max_relative = 1e-4);
            }
        }
    }

    #[test]
    fn test_d_hypergeom_term_dp_vanishes_at_perpendicular() {
        // at θ = π/2 the finite boundary term is identically zero for every p
        for p in [1.5, 2.0, 3.0] {
            assert!(d_hypergeom_term_dp(1.0, 0.0, p).abs() < 1e-15);
        }
    }
}
