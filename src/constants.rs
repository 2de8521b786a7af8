//! # Constants and type definitions for Peryton
//!
//! This module centralizes the **physical constants**, **conversion factors**, and **common type
//! definitions** used throughout the `peryton` library.
//!
//! ## Overview
//!
//! - Astronomical and physical constants (IAU 2012 / CODATA values)
//! - Unit conversions (degrees ↔ radians, AU ↔ parsec, days ↔ seconds)
//! - The TEMPO dispersion constant tying DM to a frequency-dependent delay
//! - Core type aliases used across the crate
//!
//! These definitions are used by all main modules, including the solar-wind dispersion
//! models and the relativistic binary parameter deriver.

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a Julian day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Astronomical Unit in kilometers (IAU 2012)
pub const AU: f64 = 149_597_870.7;

/// Parsec in kilometers
pub const PC: f64 = 3.085_677_581_491_367_3e13;

/// Astronomical Unit expressed in parsec
pub const AU_TO_PC: f64 = AU / PC;

/// MJD epoch of J2000.0 (2000-01-01 12:00:00 TT)
pub const T2000: f64 = 51544.5;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Speed of light in km/s
pub const VLIGHT: f64 = 2.99792458e5;

/// Speed of light in m/s
pub const VLIGHT_MS: f64 = 2.99792458e8;

/// Newtonian constant of gravitation, m³ kg⁻¹ s⁻² (CODATA 2018)
pub const GRAV: f64 = 6.674_30e-11;

/// Heliocentric gravitational parameter GM☉, m³ s⁻² (IAU nominal)
pub const GMS: f64 = 1.327_124_400_18e20;

/// Solar mass in kilograms, consistent with [`GMS`] and [`GRAV`]
pub const MSUN: f64 = GMS / GRAV;

/// TEMPO dispersion constant, s MHz² cm³ pc⁻¹.
///
/// A signal at frequency `f` MHz through a column of `DM` pc cm⁻³ is delayed by
/// `DM_CONST * DM / f²` seconds. The truncated value `2.41e-4` is the historical
/// TEMPO convention, kept for compatibility with existing timing solutions.
pub const DM_CONST: f64 = 1.0 / 2.41e-4;

/// Far bound of the dispersion path integral, in AU.
///
/// The line of sight is sampled out to 1e14 light-seconds past the Sun, which is
/// effectively infinity for any power-law index p > 1.
pub const Z_LARGE_AU: f64 = 1.0e14 * VLIGHT / AU;

/// Observing frequencies below this value (MHz) are unusable for dedispersion;
/// fit-derivative contributions are zeroed there.
pub const MIN_DISPERSION_FREQ_MHZ: f64 = 1.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Modified Julian Date (days), float form used for segment bounds and selection
pub type MJD = f64;
/// Dispersion measure in pc cm⁻³
pub type Dm = f64;
/// Path length in parsec
pub type Parsec = f64;
/// Time interval in seconds
pub type Sec = f64;
