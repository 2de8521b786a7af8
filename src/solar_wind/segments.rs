//! Segmented solar-wind parameter bookkeeping.
//!
//! A segmented model carries four co-indexed parameter families per segment:
//! amplitude (`SWX_nnnn`, cm⁻³), power-law index (`SWXP_nnnn`) and the two
//! range bounds (`SWXR1_nnnn`/`SWXR2_nnnn`, MJD). Each index owns one
//! [`SwxSegment`] holding all four handles, so an index present in one family
//! but missing from another cannot be represented; [`SegmentSet::validate`]
//! still checks the name/index agreement and value sanity of what was stored,
//! since segments can be built by hand through [`SegmentSet::insert`].

use std::collections::BTreeMap;

use tracing::warn;

use crate::constants::MJD;
use crate::params::{indexed_name, MjdRange, Param};
use crate::timing_errors::TimingError;
use crate::toas::Toas;

/// One solar-wind segment: the four co-indexed parameter handles.
///
/// The amplitude and power share the segment's `frozen` state; the range bounds
/// are never fit and always frozen.
#[derive(Debug, Clone, PartialEq)]
pub struct SwxSegment {
    pub ne_sw: Param,
    pub power: Param,
    pub start: Param,
    pub end: Param,
}

impl SwxSegment {
    pub fn new(index: u16, ne_sw: f64, power: f64, start: MJD, end: MJD, frozen: bool) -> Self {
        SwxSegment {
            ne_sw: Param::new(indexed_name("SWX_", index), ne_sw, frozen),
            power: Param::new(indexed_name("SWXP_", index), power, frozen),
            start: Param::new(indexed_name("SWXR1_", index), start, true),
            end: Param::new(indexed_name("SWXR2_", index), end, true),
        }
    }

    /// Half-open `[start, end)` validity interval.
    pub fn range(&self) -> MjdRange {
        MjdRange {
            start: self.start.value(),
            end: self.end.value(),
        }
    }

    /// A segment is fit (non-frozen) when its amplitude is.
    pub fn frozen(&self) -> bool {
        self.ne_sw.frozen()
    }

    /// The four par-file lines of this segment, amplitude first.
    pub fn as_parfile(&self) -> String {
        let mut out = String::new();
        out += &self.ne_sw.as_parfile_line();
        out += &self.power.as_parfile_line();
        out += &self.start.as_parfile_line();
        out += &self.end.as_parfile_line();
        out
    }
}

/// How to combine the amplitude and power of two segments being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeValue {
    First,
    Second,
    Mean,
}

impl MergeValue {
    fn combine(self, a: f64, b: f64) -> f64 {
        match self {
            MergeValue::First => a,
            MergeValue::Second => b,
            MergeValue::Mean => 0.5 * (a + b),
        }
    }
}

/// Ordered collection of solar-wind segments keyed by index.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SegmentSet {
    segments: BTreeMap<u16, SwxSegment>,
}

impl SegmentSet {
    pub fn new() -> Self {
        SegmentSet::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: u16) -> Option<&SwxSegment> {
        self.segments.get(&index)
    }

    pub fn get_mut(&mut self, index: u16) -> Option<&mut SwxSegment> {
        self.segments.get_mut(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u16, &SwxSegment)> {
        self.segments.iter().map(|(&i, s)| (i, s))
    }

    /// Sorted list of registered segment indices.
    pub fn get_indices(&self) -> Vec<u16> {
        self.segments.keys().copied().collect()
    }

    /// Low-level insertion that bypasses the range checks of
    /// [`add_range`](Self::add_range); the stored segment is only vetted by the
    /// next [`validate`](Self::validate).
    pub fn insert(&mut self, index: u16, segment: SwxSegment) {
        self.segments.insert(index, segment);
    }

    /// Register a new segment and return its index.
    ///
    /// Both bounds are required and must satisfy `start ≤ end`; when `index` is
    /// `None` the next free index (max + 1, starting from 1) is assigned.
    pub fn add_range(
        &mut self,
        mjd_start: Option<MJD>,
        mjd_end: Option<MJD>,
        index: Option<u16>,
        ne_sw: f64,
        power: f64,
        frozen: bool,
    ) -> Result<u16, TimingError> {
        let (start, end) = match (mjd_start, mjd_end) {
            (Some(s), Some(e)) => (s, e),
            _ => return Err(TimingError::PartialRange),
        };
        if end < start {
            return Err(TimingError::InvertedRange { start, end });
        }
        let index = match index {
            Some(i) => {
                if self.segments.contains_key(&i) {
                    return Err(TimingError::IndexInUse(i));
                }
                i
            }
            None => self.segments.keys().max().map_or(1, |&m| m + 1),
        };
        self.segments
            .insert(index, SwxSegment::new(index, ne_sw, power, start, end, frozen));
        Ok(index)
    }

    /// Remove every segment whose index appears in `indices`.
    ///
    /// All indices are checked before anything is removed, so an unknown index
    /// errors without dropping the known ones.
    pub fn remove_range(&mut self, indices: &[u16]) -> Result<(), TimingError> {
        for i in indices {
            if !self.segments.contains_key(i) {
                return Err(TimingError::UnknownParameter(indexed_name("SWX_", *i)));
            }
        }
        for i in indices {
            self.segments.remove(i);
        }
        Ok(())
    }

    /// Check the name/index agreement of each stored segment, range ordering,
    /// and value finiteness. The error names the first offending family.
    pub fn validate(&self) -> Result<(), TimingError> {
        for (&index, seg) in &self.segments {
            for (family, param) in [
                ("SWX_", &seg.ne_sw),
                ("SWXP_", &seg.power),
                ("SWXR1_", &seg.start),
                ("SWXR2_", &seg.end),
            ] {
                if param.name() != indexed_name(family, index) || !param.value().is_finite() {
                    return Err(TimingError::SegmentFamilyMismatch { family, index });
                }
            }
            let r = seg.range();
            if r.end < r.start {
                return Err(TimingError::InvertedRange {
                    start: r.start,
                    end: r.end,
                });
            }
        }
        Ok(())
    }

    /// Check that every non-frozen segment covers at least one TOA; all empty
    /// segments are collected into a single error.
    pub fn validate_against_toas(&self, toas: &Toas) -> Result<(), TimingError> {
        let mjds = toas.mjds();
        let mut bad = Vec::new();
        for seg in self.segments.values() {
            if seg.frozen() {
                continue;
            }
            let r = seg.range();
            if !mjds.iter().any(|&t| r.contains(t)) {
                bad.push(seg.ne_sw.name().to_string());
            }
        }
        if bad.is_empty() {
            Ok(())
        } else {
            Err(TimingError::MissingToas(bad))
        }
    }

    /// Selector conditions, one per segment, keyed by the amplitude name.
    pub fn conditions(&self) -> BTreeMap<String, (MJD, MJD)> {
        self.segments
            .values()
            .map(|seg| {
                let r = seg.range();
                (seg.ne_sw.name().to_string(), (r.start, r.end))
            })
            .collect()
    }

    /// Split the segment whose interior contains `at` into two at that epoch.
    ///
    /// The existing segment keeps `[start, at)`; a new segment with the same
    /// amplitude, power and frozen state covers `[at, end)`. Returns
    /// `(kept_index, new_index)`.
    pub fn split_range(&mut self, at: MJD) -> Result<(u16, u16), TimingError> {
        let (&index, _) = self
            .segments
            .iter()
            .find(|(_, seg)| {
                let r = seg.range();
                r.start < at && at < r.end
            })
            .ok_or(TimingError::NoSegmentAtEpoch(at))?;
        let (ne_sw, power, old_end, frozen) = {
            let seg = &self.segments[&index];
            (
                seg.ne_sw.value(),
                seg.power.value(),
                seg.end.value(),
                seg.frozen(),
            )
        };
        let new_index = self.add_range(Some(at), Some(old_end), None, ne_sw, power, frozen)?;
        if let Some(seg) = self.segments.get_mut(&index) {
            seg.end.set_value(at);
        }
        Ok((index, new_index))
    }

    /// Merge two segments into one spanning both ranges, combining the
    /// amplitude and power according to `value`. Returns the new index.
    ///
    /// Segments lying between the two (in time) end up covered by the merged
    /// range; this is legal but usually unintended, so it is logged.
    pub fn merge_ranges(
        &mut self,
        first: u16,
        second: u16,
        value: MergeValue,
    ) -> Result<u16, TimingError> {
        let (a, b) = match (self.segments.get(&first), self.segments.get(&second)) {
            (Some(a), Some(b)) => (a, b),
            (None, _) => return Err(TimingError::UnknownParameter(indexed_name("SWX_", first))),
            (_, None) => return Err(TimingError::UnknownParameter(indexed_name("SWX_", second))),
        };
        let start = a.range().start.min(b.range().start);
        let end = a.range().end.max(b.range().end);
        let merged = MjdRange { start, end };
        for (&i, seg) in &self.segments {
            if i != first && i != second && merged.contains(seg.range().start) {
                warn!(index = i, "segment lies inside the merged range");
            }
        }
        let ne_sw = value.combine(a.ne_sw.value(), b.ne_sw.value());
        let power = value.combine(a.power.value(), b.power.value());
        let frozen = a.frozen() && b.frozen();
        let new_index = self.add_range(Some(start), Some(end), None, ne_sw, power, frozen)?;
        self.remove_range(&[first, second])?;
        Ok(new_index)
    }

    /// Par-file serialization of every segment, sorted by index.
    pub fn as_parfile(&self) -> String {
        self.segments.values().map(SwxSegment::as_parfile).collect()
    }
}
