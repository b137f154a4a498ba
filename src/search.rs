//! Locating the cluster that is sounding at the playback time.
//!
//! Both strategies return the greatest index `i` with `clusters[i].time <=
//! cur_time`, or `None` before the first cluster. A cluster is active from
//! its onset instant onward.

use crate::types::{Continuity, NoteCluster};

/// Pick the strategy from `continuity`: a jump invalidates `hint`, so it
/// gets a binary search; steady playback scans forward from `hint`.
pub fn find_cluster_index(
    cur_time: f64,
    clusters: &[NoteCluster],
    hint: Option<usize>,
    continuity: Continuity,
) -> Option<usize> {
    match continuity {
        Continuity::Discontinuous => full_search(cur_time, clusters),
        Continuity::Continuous => incremental_search(cur_time, clusters, hint),
    }
}

/// O(log n) binary search over the whole cluster list.
pub fn full_search(cur_time: f64, clusters: &[NoteCluster]) -> Option<usize> {
    clusters
        .partition_point(|c| c.time <= cur_time)
        .checked_sub(1)
}

/// Forward-only scan starting at `hint`, amortized O(1) per call while time
/// advances smoothly.
///
/// `hint` must be the result for some earlier time not after `cur_time`
/// (`None` meaning "before the first cluster"). The scan never moves
/// backward; a regressed time yields a stale answer in release builds.
pub fn incremental_search(cur_time: f64, clusters: &[NoteCluster], hint: Option<usize>) -> Option<usize> {
    if let Some(i) = hint {
        debug_assert!(i < clusters.len(), "hint {} out of range ({} clusters)", i, clusters.len());
        debug_assert!(
            clusters.get(i).map_or(true, |c| c.time <= cur_time),
            "time went backwards without a discontinuity"
        );
    }

    let mut found = hint.filter(|&i| i < clusters.len());
    let mut next = found.map_or(0, |i| i + 1);
    while next < clusters.len() && clusters[next].time <= cur_time {
        found = Some(next);
        next += 1;
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::BTreeSet;

    fn clusters(times: &[f64]) -> Vec<NoteCluster> {
        times
            .iter()
            .enumerate()
            .map(|(i, &time)| NoteCluster { time, notes: BTreeSet::from([(i % 128) as u8]) })
            .collect()
    }

    #[test]
    fn test_boundary_scenario() {
        let c = clusters(&[1.0, 2.5]);
        assert_eq!(full_search(1.0, &c), Some(0));
        assert_eq!(full_search(0.9, &c), None);
        assert_eq!(full_search(2.5, &c), Some(1));
        assert_eq!(full_search(2.4999, &c), Some(0));
        assert_eq!(full_search(100.0, &c), Some(1));
    }

    #[test]
    fn test_empty_cluster_list() {
        assert_eq!(full_search(3.0, &[]), None);
        assert_eq!(incremental_search(3.0, &[], None), None);
        assert_eq!(find_cluster_index(3.0, &[], None, Continuity::Discontinuous), None);
        assert_eq!(find_cluster_index(3.0, &[], None, Continuity::Continuous), None);
    }

    #[test]
    fn test_incremental_from_none() {
        let c = clusters(&[1.0, 2.0, 3.0]);
        assert_eq!(incremental_search(0.5, &c, None), None);
        assert_eq!(incremental_search(1.0, &c, None), Some(0));
        assert_eq!(incremental_search(2.7, &c, None), Some(1));
    }

    #[test]
    fn test_incremental_holds_then_advances() {
        let c = clusters(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(incremental_search(1.5, &c, Some(0)), Some(0));
        assert_eq!(incremental_search(2.0, &c, Some(0)), Some(1));
        // Several clusters skipped in one step
        assert_eq!(incremental_search(3.9, &c, Some(0)), Some(2));
        assert_eq!(incremental_search(9.0, &c, Some(3)), Some(3));
    }

    #[test]
    fn test_dispatch_ignores_hint_on_discontinuity() {
        let c = clusters(&[1.0, 2.0, 3.0, 4.0]);
        // Seek backwards: the hint is stale and must not be used
        assert_eq!(find_cluster_index(1.5, &c, Some(3), Continuity::Discontinuous), Some(0));
        assert_eq!(find_cluster_index(3.5, &c, Some(1), Continuity::Continuous), Some(2));
    }

    #[test]
    fn test_incremental_matches_full_on_random_traces() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..50 {
            let n = rng.gen_range(0..200);
            let mut t = 0.0;
            let mut times = Vec::with_capacity(n);
            for _ in 0..n {
                t += rng.gen_range(0.001..0.5);
                times.push(t);
            }
            let c = clusters(&times);

            let mut now = 0.0;
            let mut index = find_cluster_index(now, &c, None, Continuity::Discontinuous);
            while now < t + 1.0 {
                // Mix of tiny frame steps, zero steps and larger jumps forward
                now += match rng.gen_range(0..10) {
                    0 => 0.0,
                    1 => rng.gen_range(0.5..3.0),
                    _ => rng.gen_range(0.0..0.05),
                };
                index = find_cluster_index(now, &c, index, Continuity::Continuous);
                assert_eq!(index, full_search(now, &c), "diverged at t={}", now);
            }
        }
    }
}
