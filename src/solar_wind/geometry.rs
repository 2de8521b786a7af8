//! Solar-wind path-length geometry.
//!
//! The dispersion measure contributed by the solar wind is a density amplitude
//! times a purely geometric path length through the wind, a function of the
//! Sun–pulsar elongation `θ` and the Earth–Sun distance `r`. Two regimes:
//!
//! - **Spherical, fixed p = 2**: the 1/r² falloff integrates to the closed
//!   trigonometric form `AU²·ρ/(r·sin ρ)` with `ρ = π − θ`.
//! - **General power law p**: the ray is parameterized by the impact parameter
//!   `b = r·sin θ` and integrated from the observer boundary `−z_sun = −r·cos θ`
//!   out to an effectively infinite far bound, through the hypergeometric
//!   [`path_integral`](crate::solar_wind::special::path_integral).
//!
//! All lengths come back in parsec so that `n_e [cm⁻³] × length [pc]` is
//! directly a DM in pc cm⁻³.

use crate::constants::{Parsec, Radian, AU_TO_PC, Z_LARGE_AU};
use crate::solar_wind::special::{
    d_gamma_ratio_dp, d_hypergeom_term_dp, gamma_ratio, hypergeom_term, path_integral,
};
use crate::timing_errors::TimingError;

const SQRT_PI: f64 = 1.772_453_850_905_516;

/// Closed-form p = 2 path length in parsec for one elongation/distance pair.
pub fn spherical_geometry_one(theta: Radian, r_au: f64) -> Parsec {
    let rho = std::f64::consts::PI - theta;
    AU_TO_PC * rho / (r_au * rho.sin())
}

/// Vectorized [`spherical_geometry_one`].
pub fn spherical_geometry(theta: &[Radian], r_au: &[f64]) -> Vec<Parsec> {
    theta
        .iter()
        .zip(r_au)
        .map(|(&t, &r)| spherical_geometry_one(t, r))
        .collect()
}

/// General power-law path length in parsec for one elongation/distance pair.
///
/// `(1/b)ᵖ · b · (I(z_far/b) − I(−z_sun/b))` with `b` in AU; the far bound is
/// [`Z_LARGE_AU`]. Errors for `p ≤ 1`.
pub fn power_law_geometry_one(theta: Radian, r_au: f64, p: f64) -> Result<Parsec, TimingError> {
    let b = r_au * theta.sin();
    let z_sun = r_au * theta.cos();
    let integral = path_integral(Z_LARGE_AU / b, p)? - path_integral(-z_sun / b, p)?;
    Ok(b.powf(-p) * b * AU_TO_PC * integral)
}

/// Vectorized [`power_law_geometry_one`].
pub fn power_law_geometry(
    theta: &[Radian],
    r_au: &[f64],
    p: f64,
) -> Result<Vec<Parsec>, TimingError> {
    theta
        .iter()
        .zip(r_au)
        .map(|(&t, &r)| power_law_geometry_one(t, r, p))
        .collect()
}

/// Derivative of the power-law path length with respect to the index `p`,
/// in parsec per unit of `p`.
///
/// Uses the complete-integral split: the finite-boundary hypergeometric term is
/// differentiated through its Padé expansion, the gamma-function term through
/// digamma. For `p ≤ 1` the integral diverges and the derivative is reported as
/// `+∞` rather than erroring (the value path has already rejected such models).
pub fn d_power_law_geometry_d_p_one(
    theta: Radian,
    r_au: f64,
    p: f64,
) -> Result<f64, TimingError> {
    if p <= 1.0 {
        return Ok(f64::INFINITY);
    }
    let b = r_au * theta.sin();
    let z_sun = r_au * theta.cos();
    let bp = b.powf(-p);
    let deriv_part = bp
        * (b * d_hypergeom_term_dp(b, z_sun, p) + b * SQRT_PI / 2.0 * d_gamma_ratio_dp(p));
    let log_part = bp
        * b.ln()
        * (b * hypergeom_term(b, z_sun, p)? + b * SQRT_PI / 2.0 * gamma_ratio(p));
    Ok((deriv_part - log_part) * AU_TO_PC)
}

/// Vectorized [`d_power_law_geometry_d_p_one`].
pub fn d_power_law_geometry_d_p(
    theta: &[Radian],
    r_au: &[f64],
    p: f64,
) -> Result<Vec<f64>, TimingError> {
    theta
        .iter()
        .zip(r_au)
        .map(|(&t, &r)| d_power_law_geometry_d_p_one(t, r, p))
        .collect()
}

#[cfg(test)]
mod geometry_test {
    use super::*;
    use crate::constants::RADEG;
    use approx::assert_relative_eq;

    #[test]
    fn test_power_law_p2_matches_spherical() {
        // at p = 2 the hypergeometric geometry collapses to the trigonometric form
        for theta_deg in [20.0, 60.0, 90.0, 120.0, 160.0] {
            let theta = theta_deg * RADEG;
            for r in [0.985, 1.0, 1.017] {
                assert_relative_eq!(
                    power_law_geometry_one(theta, r, 2.0).unwrap(),
                    spherical_geometry_one(theta, r),
                    max_relative = 1e-8
                );
            }
        }
    }

    #[test]
    fn test_geometry_positive_and_peaks_at_conjunction() {
        let g_small = power_law_geometry_one(10.0 * RADEG, 1.0, 2.5).unwrap();
        let g_mid = power_law_geometry_one(90.0 * RADEG, 1.0, 2.5).unwrap();
        let g_anti = power_law_geometry_one(170.0 * RADEG, 1.0, 2.5).unwrap();
        assert!(g_small > g_mid);
        assert!(g_mid > g_anti);
        assert!(g_anti > 0.0);
    }

    #[test]
    fn test_geometry_rejects_shallow_index() {
        assert!(matches!(
            power_law_geometry_one(90.0 * RADEG, 1.0, 1.0),
            Err(TimingError::UnsupportedPowerLawIndex(_))
        ));
    }

    #[test]
    fn test_d_geometry_infinite_for_shallow_index() {
        let d = d_power_law_geometry_d_p_one(90.0 * RADEG, 1.0, 0.8).unwrap();
        assert!(d.is_infinite());
    }

    #[test]
    fn test_d_geometry_matches_finite_difference() {
        let h = 1e-5;
        for theta_deg in [85.0, 90.0, 95.0] {
            let theta = theta_deg * RADEG;
            for p in [1.5, 2.0, 3.0] {
                let fd = (power_law_geometry_one(theta, 1.0, p + h).unwrap()
                    - power_law_geometry_one(theta, 1.0, p - h).unwrap())
                    / (2.0 * h);
                let analytic = d_power_law_geometry_d_p_one(theta, 1.0, p).unwrap();
                assert_relative_eq!(analytic, fd, max_relative = 5e-4);
            }
        }
    }
}
