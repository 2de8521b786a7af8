use hifitime::{Epoch, TimeScale};

use crate::constants::SECONDS_PER_DAY;

/// A Modified Julian Date held as a split integer day + fractional day.
///
/// Sub-microsecond pulse timing over decades exceeds the resolution of a single
/// `f64` MJD (~1 µs at MJD 55000), so the day number and the day fraction are
/// stored separately. The fraction is kept normalized to `0 ≤ frac < 1`.
///
/// The lossy [`as_f64`](PulsarMjd::as_f64) view is only used where day-level
/// resolution suffices (segment membership tests, solar geometry).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulsarMjd {
    day: i64,
    frac: f64,
}

impl PulsarMjd {
    /// Build from a day number and a day fraction, normalizing so that the
    /// fraction lands in `[0, 1)`.
    pub fn new(day: i64, frac: f64) -> Self {
        let carry = frac.floor();
        PulsarMjd {
            day: day + carry as i64,
            frac: frac - carry,
        }
    }

    /// Build from a float MJD. Lossy for sub-microsecond work; fine for tests
    /// and for segment bounds.
    pub fn from_f64(mjd: f64) -> Self {
        Self::new(mjd.floor() as i64, mjd.fract())
    }

    pub fn day(&self) -> i64 {
        self.day
    }

    pub fn frac(&self) -> f64 {
        self.frac
    }

    /// Collapse to a float MJD (precision-lossy).
    pub fn as_f64(&self) -> f64 {
        self.day as f64 + self.frac
    }

    /// Exact elapsed seconds since `other`, computed without collapsing the
    /// split representation first.
    pub fn seconds_since(&self, other: &PulsarMjd) -> f64 {
        (self.day - other.day) as f64 * SECONDS_PER_DAY + (self.frac - other.frac) * SECONDS_PER_DAY
    }

    /// Convert to a [`hifitime::Epoch`] in the given time scale.
    pub fn to_epoch(&self, scale: TimeScale) -> Epoch {
        Epoch::from_mjd_in_time_scale(self.day as f64, scale)
            + hifitime::Duration::from_seconds(self.frac * SECONDS_PER_DAY)
    }

    /// Build from a [`hifitime::Epoch`], splitting at the day boundary.
    pub fn from_epoch(epoch: Epoch, scale: TimeScale) -> Self {
        let mjd = match scale {
            TimeScale::UTC => epoch.to_mjd_utc_days(),
            _ => epoch.to_mjd_tt_days(),
        };
        Self::from_f64(mjd)
    }
}

impl PartialOrd for PulsarMjd {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match self.day.cmp(&other.day) {
            std::cmp::Ordering::Equal => self.frac.partial_cmp(&other.frac),
            ord => Some(ord),
        }
    }
}

#[cfg(test)]
mod time_test {
    use super::*;

    #[test]
    fn test_normalization() {
        let t = PulsarMjd::new(55000, 1.25);
        assert_eq!(t.day(), 55001);
        assert_eq!(t.frac(), 0.25);

        let t = PulsarMjd::new(55000, -0.25);
        assert_eq!(t.day(), 54999);
        assert_eq!(t.frac(), 0.75);
    }

    #[test]
    fn test_seconds_since_preserves_precision() {
        // one nanosecond apart, 10000 days from the reference
        let a = PulsarMjd::new(55000, 0.5);
        let b = PulsarMjd::new(45000, 0.5 + 1e-9 / SECONDS_PER_DAY);
        let dt = a.seconds_since(&b);
        let expected = 10000.0 * SECONDS_PER_DAY - 1e-9;
        assert!((dt - expected).abs() < 1e-6);
    }

    #[test]
    fn test_ordering() {
        let a = PulsarMjd::new(55000, 0.5);
        let b = PulsarMjd::new(55000, 0.6);
        let c = PulsarMjd::new(55001, 0.1);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_epoch_roundtrip() {
        let t = PulsarMjd::new(55000, 0.25);
        let epoch = t.to_epoch(TimeScale::TT);
        assert!((epoch.to_mjd_tt_days() - 55000.25).abs() < 1e-9);
        let back = PulsarMjd::from_epoch(epoch, TimeScale::TT);
        assert_eq!(back.day(), 55000);
        assert!((back.frac() - 0.25).abs() < 1e-9);

        // UTC epochs split on the UTC day boundary
        let utc = Epoch::from_mjd_utc(59000.5);
        let t = PulsarMjd::from_epoch(utc, TimeScale::UTC);
        assert_eq!(t.day(), 59000);
        assert!((t.frac() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_as_f64_roundtrip() {
        let t = PulsarMjd::from_f64(59215.75);
        assert_eq!(t.day(), 59215);
        assert_eq!(t.frac(), 0.75);
        assert_eq!(t.as_f64(), 59215.75);
    }
}
