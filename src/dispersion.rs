//! Shared dispersion plumbing: the DM → delay frequency scaling and the
//! barycentric/topocentric frequency choice.
//!
//! Every dispersive component converts its DM contribution (pc cm⁻³) to a time
//! delay through the same cold-plasma relation, and every delay derivative is
//! the corresponding DM derivative scaled by `DM_CONST / f²`. TOAs observed
//! below [`MIN_DISPERSION_FREQ_MHZ`](crate::constants::MIN_DISPERSION_FREQ_MHZ)
//! contribute nothing to the fit derivatives; the delay value itself is still
//! the physical one.

use tracing::warn;

use crate::constants::{Dm, Sec, DM_CONST, MIN_DISPERSION_FREQ_MHZ};
use crate::context::PulsarContext;
use crate::toas::Toas;

/// Cold-plasma dispersion delay in seconds for one DM (pc cm⁻³) and frequency (MHz).
pub fn dispersion_delay(dm: Dm, freq_mhz: f64) -> Sec {
    DM_CONST * dm / (freq_mhz * freq_mhz)
}

/// ∂delay/∂DM at one frequency: the scaling shared by every delay derivative,
/// zeroed below the minimum usable frequency.
pub fn d_delay_d_dm(freq_mhz: f64) -> f64 {
    if !usable_freq(freq_mhz) {
        return 0.0;
    }
    DM_CONST / (freq_mhz * freq_mhz)
}

fn usable_freq(freq_mhz: f64) -> bool {
    freq_mhz.is_finite() && freq_mhz >= MIN_DISPERSION_FREQ_MHZ
}

/// Per-TOA frequencies used for dedispersion: barycentric when the context can
/// provide them, topocentric otherwise (with a warning; the Doppler error this
/// introduces is ~1e-4 fractional).
pub fn dedispersion_freqs(ctx: &PulsarContext, toas: &Toas) -> Vec<f64> {
    match ctx.barycentric_freq(toas) {
        Some(freqs) => freqs,
        None => {
            warn!("using topocentric frequency for dedispersion");
            toas.freqs()
        }
    }
}

/// Map a per-TOA DM array to a delay array using the given frequencies.
pub fn dm_to_delay(dm: &[Dm], freqs_mhz: &[f64]) -> Vec<Sec> {
    dm.iter()
        .zip(freqs_mhz)
        .map(|(&d, &f)| dispersion_delay(d, f))
        .collect()
}

/// Map a per-TOA DM-derivative array to a delay-derivative array.
pub fn d_dm_to_d_delay(d_dm: &[f64], freqs_mhz: &[f64]) -> Vec<f64> {
    d_dm.iter()
        .zip(freqs_mhz)
        .map(|(&d, &f)| d * d_delay_d_dm(f))
        .collect()
}
