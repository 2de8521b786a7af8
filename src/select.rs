//! Partition a TOA table into named time segments.
//!
//! Each named condition is a half-open MJD interval `[lo, hi)`; the selector
//! returns, per condition, the indices of the timestamps falling inside it.
//! The function is pure: callers may memoize results per segment layout, but
//! correctness never depends on caching.

use std::collections::BTreeMap;
use std::collections::HashMap;

use crate::constants::MJD;

/// Index the timestamps matching each named `[lo, hi)` condition.
///
/// Arguments
/// ---------
/// * `conditions`: mapping from segment name to `(lo, hi)` MJD bounds
/// * `mjds`: timestamps to partition
///
/// Return
/// ------
/// * mapping from segment name to the ascending list of matching indices.
///   A condition with `hi < lo` selects nothing; bounds are never swapped.
pub fn get_select_index(
    conditions: &BTreeMap<String, (MJD, MJD)>,
    mjds: &[MJD],
) -> HashMap<String, Vec<usize>> {
    conditions
        .iter()
        .map(|(name, &(lo, hi))| {
            let idx: Vec<usize> = mjds
                .iter()
                .enumerate()
                .filter(|(_, &t)| lo <= t && t < hi)
                .map(|(i, _)| i)
                .collect();
            (name.clone(), idx)
        })
        .collect()
}

#[cfg(test)]
mod select_test {
    use super::*;

    fn condition(name: &str, lo: f64, hi: f64) -> BTreeMap<String, (MJD, MJD)> {
        let mut c = BTreeMap::new();
        c.insert(name.to_string(), (lo, hi));
        c
    }

    #[test]
    fn test_half_open_interval() {
        let mjds = [54999.0, 55000.0, 55005.0, 55010.0, 55011.0];
        let sel = get_select_index(&condition("SWX_0001", 55000.0, 55010.0), &mjds);
        assert_eq!(sel["SWX_0001"], vec![1, 2]);
    }

    #[test]
    fn test_disjoint_partition() {
        let mjds = [54999.0, 55000.0, 55005.0, 55010.0, 55011.0];
        let mut conds = BTreeMap::new();
        conds.insert("SWX_0001".to_string(), (54990.0, 55000.0));
        conds.insert("SWX_0002".to_string(), (55000.0, 55010.0));
        conds.insert("SWX_0003".to_string(), (55010.0, 55020.0));
        let sel = get_select_index(&conds, &mjds);
        assert_eq!(sel["SWX_0001"], vec![0]);
        assert_eq!(sel["SWX_0002"], vec![1, 2]);
        assert_eq!(sel["SWX_0003"], vec![3, 4]);
    }

    #[test]
    fn test_inverted_bounds_select_nothing() {
        let mjds = [55000.0, 55005.0];
        let sel = get_select_index(&condition("SWX_0001", 55010.0, 55000.0), &mjds);
        assert!(sel["SWX_0001"].is_empty());
    }

    #[test]
    fn test_empty_inputs() {
        let sel = get_select_index(&BTreeMap::new(), &[55000.0]);
        assert!(sel.is_empty());
        let sel = get_select_index(&condition("SWX_0001", 55000.0, 55010.0), &[]);
        assert!(sel["SWX_0001"].is_empty());
    }
}
