use std::collections::HashMap;

use crate::constants::MJD;
use crate::time::PulsarMjd;

/// A single pulse time-of-arrival measurement.
///
/// # Fields
///
/// * `mjd` - arrival time, split-precision MJD
/// * `freq_mhz` - topocentric observing frequency in MHz
/// * `flags` - arbitrary ancillary key/value flags carried through from the caller
#[derive(Debug, Clone)]
pub struct Toa {
    pub mjd: PulsarMjd,
    pub freq_mhz: f64,
    flags: HashMap<String, String>,
}

impl Toa {
    pub fn new(mjd: PulsarMjd, freq_mhz: f64) -> Self {
        Toa {
            mjd,
            freq_mhz,
            flags: HashMap::new(),
        }
    }

    pub fn with_flag(mut self, key: &str, value: &str) -> Self {
        self.flags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn flag(&self, key: &str) -> Option<&str> {
        self.flags.get(key).map(String::as_str)
    }
}

/// An ordered TOA table. Owned by the caller; timing-model components only read it.
#[derive(Debug, Clone, Default)]
pub struct Toas {
    rows: Vec<Toa>,
}

impl Toas {
    pub fn new(rows: Vec<Toa>) -> Self {
        Toas { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Toa> {
        self.rows.iter()
    }

    pub fn get(&self, idx: usize) -> Option<&Toa> {
        self.rows.get(idx)
    }

    /// Float MJD view of the table, for segment membership tests and solar geometry.
    pub fn mjds(&self) -> Vec<MJD> {
        self.rows.iter().map(|t| t.mjd.as_f64()).collect()
    }

    /// Topocentric observing frequencies in MHz.
    pub fn freqs(&self) -> Vec<f64> {
        self.rows.iter().map(|t| t.freq_mhz).collect()
    }

    /// New table holding clones of the rows at `indices`, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Toas {
        Toas {
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

impl std::ops::Index<usize> for Toas {
    type Output = Toa;

    fn index(&self, idx: usize) -> &Toa {
        &self.rows[idx]
    }
}
