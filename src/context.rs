//! # Pulsar context: sky geometry and cross-component queries
//!
//! [`PulsarContext`] is the collaborator every delay component holds a reference
//! to. It resolves the queries that span components:
//!
//! 1. **Sun–pulsar geometry** — elongation angle and Earth–Sun distance per TOA,
//!    from the low-precision analytic solar ephemeris (Allen's Astrophysical
//!    Quantities, 27.4.1). Good to a few arcminutes, which is ample for
//!    solar-wind dispersion work.
//! 2. **Solar conjunction search** — first epoch of minimum elongation after a
//!    given date, used for per-segment maximum-DM estimates.
//! 3. **Barycentric observing frequencies** — when the caller has supplied them;
//!    components fall back to topocentric frequencies (with a warning) otherwise.
//!
//! Pulsar coordinates are taken directly in ecliptic longitude/latitude; frame
//! conversions from equatorial catalogs are the caller's business.

use nalgebra::Vector3;
use tracing::debug;

use crate::constants::{Radian, DPI, MJD, RADEG, T2000};
use crate::toas::Toas;

/// Sun's ecliptic longitude in radians at a float MJD (low-precision analytic form).
///
/// Allen's Astrophysical Quantities 27.4.1; aberration is folded into the mean
/// longitude term. (The original tables give the `sin 2g` coefficient as 0.020°.)
pub fn solar_longitude(mjd: MJD) -> Radian {
    // days since J2000.0
    let n = mjd - T2000;
    // mean longitude of the Sun, corrected for aberration
    let l = 280.460 + 0.9854674 * n;
    // mean anomaly
    let g = (357.528 + 0.9856003 * n) * RADEG;
    let longitude = l * RADEG + (1.915 * (g).sin() + 0.020 * (2.0 * g).sin()) * RADEG;
    longitude.rem_euclid(DPI)
}

/// Earth–Sun distance in AU at a float MJD (same low-precision series).
pub fn sun_distance_au(mjd: MJD) -> f64 {
    let n = mjd - T2000;
    let g = (357.528 + 0.9856003 * n) * RADEG;
    1.00014 - 0.01671 * g.cos() - 0.00014 * (2.0 * g).cos()
}

/// Unit vector in the ecliptic frame for ecliptic longitude/latitude in radians.
fn ecliptic_unit(lon: Radian, lat: Radian) -> Vector3<f64> {
    Vector3::new(lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin())
}

#[derive(Debug, Clone)]
pub struct PulsarContext {
    /// Pulsar ecliptic longitude, radians
    elong: Radian,
    /// Pulsar ecliptic latitude, radians
    elat: Radian,
    /// Position epoch (falls back to MJD 50000 when unset, as conventional)
    posepoch: Option<MJD>,
    /// Barycentric observing frequencies aligned with the caller's TOA table, MHz
    bary_freqs: Option<Vec<f64>>,
}

impl PulsarContext {
    /// Build a context from pulsar ecliptic coordinates in **degrees**.
    pub fn new(elong_deg: f64, elat_deg: f64) -> Self {
        PulsarContext {
            elong: elong_deg * RADEG,
            elat: elat_deg * RADEG,
            posepoch: None,
            bary_freqs: None,
        }
    }

    pub fn with_posepoch(mut self, mjd: MJD) -> Self {
        self.posepoch = Some(mjd);
        self
    }

    /// Supply barycentric frequencies (MHz), one per TOA of the table the
    /// components will be queried with.
    pub fn set_barycentric_freqs(&mut self, freqs: Vec<f64>) {
        self.bary_freqs = Some(freqs);
    }

    /// Pulsar ecliptic latitude, radians. This is the fiducial viewing angle of
    /// the scaled solar-wind model.
    pub fn ecliptic_lat(&self) -> Radian {
        self.elat
    }

    pub fn posepoch(&self) -> MJD {
        self.posepoch.unwrap_or(50000.0)
    }

    /// Sun–pulsar elongation (radians) and Earth–Sun distance (AU) per TOA.
    pub fn sun_angle(&self, toas: &Toas) -> (Vec<Radian>, Vec<f64>) {
        let psr = ecliptic_unit(self.elong, self.elat);
        let mut angles = Vec::with_capacity(toas.len());
        let mut dists = Vec::with_capacity(toas.len());
        for toa in toas.iter() {
            let mjd = toa.mjd.as_f64();
            let sun = ecliptic_unit(solar_longitude(mjd), 0.0);
            angles.push(psr.dot(&sun).clamp(-1.0, 1.0).acos());
            dists.push(sun_distance_au(mjd));
        }
        (angles, dists)
    }

    /// Barycentric frequencies for this table, if the caller supplied a matching set.
    pub fn barycentric_freq(&self, toas: &Toas) -> Option<Vec<f64>> {
        match &self.bary_freqs {
            Some(freqs) if freqs.len() == toas.len() => Some(freqs.clone()),
            Some(freqs) => {
                debug!(
                    have = freqs.len(),
                    want = toas.len(),
                    "barycentric frequency table does not match TOA table"
                );
                None
            }
            None => None,
        }
    }

    /// First solar conjunction after `t0`: the epoch and the elongation there.
    ///
    /// The Sun's longitude is sampled over one year and the zero crossing of
    /// its offset from the pulsar longitude is found by linear interpolation.
    /// At conjunction the elongation equals the pulsar's |ecliptic latitude|.
    pub fn conjunction_after(&self, t0: MJD) -> (MJD, Radian) {
        // 380 days guarantees the Sun laps the pulsar longitude once, whatever
        // the starting phase (it gains ~0.986 deg/day relative to a fixed star)
        const SPAN_DAYS: f64 = 380.0;
        const NSAMPLE: usize = 96;
        let mut times = Vec::with_capacity(NSAMPLE);
        let mut dlon = Vec::with_capacity(NSAMPLE);
        for i in 0..NSAMPLE {
            let t = t0 + SPAN_DAYS * i as f64 / (NSAMPLE - 1) as f64;
            times.push(t);
            dlon.push((solar_longitude(t) - self.elong).rem_euclid(DPI));
        }
        // unwrap the offset into a monotonically increasing sequence
        let mut offset = 0.0;
        let mut prev_raw = dlon[0];
        for d in dlon.iter_mut().skip(1) {
            if *d < prev_raw {
                offset += DPI;
            }
            prev_raw = *d;
            *d += offset;
        }
        // next multiple of 2π above the starting offset is the conjunction
        let target = DPI * (dlon[0] / DPI).ceil();
        for d in dlon.iter_mut() {
            *d -= target;
        }
        let conj = interp_zero(&dlon, &times).unwrap_or(t0);
        (conj, self.elat.abs())
    }
}

/// Linear interpolation of the abscissa where an increasing series crosses zero.
fn interp_zero(y: &[f64], x: &[f64]) -> Option<MJD> {
    for i in 1..y.len() {
        if y[i - 1] <= 0.0 && y[i] > 0.0 {
            let f = -y[i - 1] / (y[i] - y[i - 1]);
            return Some(x[i - 1] + f * (x[i] - x[i - 1]));
        }
    }
    None
}
