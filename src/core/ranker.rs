//! Top-k selection over a distance vector.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::models::ranking::{RankedMatch, RankingResult};

/// Ascending distance, NaN after every number, then ascending index.
///
/// `-0.0` and `0.0` are the same distance and fall through to the index.
fn match_cmp_asc(a: &RankedMatch, b: &RankedMatch) -> Ordering {
    let by_distance = match (a.distance.is_nan(), b.distance.is_nan()) {
        (false, false) => a
            .distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal),
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    };
    by_distance.then_with(|| a.index.cmp(&b.index))
}

fn clamp_k(k: i64, n: usize) -> usize {
    usize::try_from(k.max(0)).map_or(n, |k| k.min(n))
}

/// Returns the `k` nearest references, nearest first.
///
/// `k <= 0` gives an empty result and `k >= distances.len()` gives the whole
/// vector sorted. Equal distances keep ascending index order.
pub fn rank(distances: &[f64], k: i64) -> RankingResult {
    let take = clamp_k(k, distances.len());
    if take == 0 {
        return RankingResult::default();
    }

    let mut matches: Vec<RankedMatch> = distances
        .iter()
        .enumerate()
        .map(|(index, &distance)| RankedMatch::new(index, distance))
        .collect();
    matches.sort_by(match_cmp_asc);
    matches.truncate(take);
    RankingResult::from_sorted(matches)
}

struct HeapEntry(RankedMatch);

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        match_cmp_asc(&self.0, &other.0) == Ordering::Equal
    }
}

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        match_cmp_asc(&self.0, &other.0)
    }
}

/// Same output as [`rank`], keeping at most `k` candidates in a max-heap.
///
/// Worth it when the reference set is large and `k` is small.
pub fn rank_bounded(distances: &[f64], k: i64) -> RankingResult {
    let take = clamp_k(k, distances.len());
    if take == 0 {
        return RankingResult::default();
    }

    let mut heap = BinaryHeap::with_capacity(take + 1);
    for (index, &distance) in distances.iter().enumerate() {
        let entry = HeapEntry(RankedMatch::new(index, distance));
        if heap.len() < take {
            heap.push(entry);
        } else if let Some(worst) = heap.peek() {
            if entry < *worst {
                heap.pop();
                heap.push(entry);
            }
        }
    }

    let matches = heap.into_sorted_vec().into_iter().map(|e| e.0).collect();
    RankingResult::from_sorted(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(result: &RankingResult) -> Vec<(usize, f64)> {
        result.iter().map(|m| (m.index, m.distance)).collect()
    }

    #[test]
    fn test_ties_keep_index_order() {
        let result = rank(&[0.9, 0.1, 0.5, 0.1], 3);
        assert_eq!(pairs(&result), vec![(1, 0.1), (3, 0.1), (2, 0.5)]);
    }

    #[test]
    fn test_empty_and_zero_k() {
        assert!(rank(&[], 5).is_empty());
        assert!(rank(&[0.3, 0.2], 0).is_empty());
        assert!(rank(&[0.3, 0.2], -4).is_empty());
        assert!(rank(&[0.3, 0.2], i64::MIN).is_empty());
    }

    #[test]
    fn test_large_k_returns_everything() {
        let distances = [0.4, 0.0, 2.0, 0.4, 1.0];
        let result = rank(&distances, i64::MAX);
        assert_eq!(result.indices(), vec![1, 0, 3, 4, 2]);
        assert_eq!(rank(&distances, 5), result);
    }

    #[test]
    fn test_smaller_k_is_prefix() {
        let distances = [0.7, 0.2, 0.2, 0.9, 0.0, 0.2, 0.5];
        let full = rank(&distances, distances.len() as i64);
        for k in 1..distances.len() {
            let partial = rank(&distances, k as i64);
            assert_eq!(partial.len(), k);
            assert_eq!(&full[..k], &partial[..]);
        }
    }

    #[test]
    fn test_reranking_sorted_output_is_stable() {
        let result = rank(&[0.9, 0.1, 0.5, 0.1, 0.3], 4);
        let sorted: Vec<f64> = result.iter().map(|m| m.distance).collect();
        let again = rank(&sorted, 4);
        assert_eq!(again.indices(), vec![0, 1, 2, 3]);
        let again_distances: Vec<f64> = again.iter().map(|m| m.distance).collect();
        assert_eq!(again_distances, sorted);
    }

    #[test]
    fn test_nan_sorts_last() {
        let result = rank(&[f64::NAN, 0.5, -f64::NAN, 0.1], 4);
        assert_eq!(result.indices(), vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_signed_zeros_tie_on_index() {
        let distances = [0.0, -0.0, 0.2, -0.0];
        assert_eq!(rank(&distances, 4).indices(), vec![0, 1, 3, 2]);
        assert_eq!(rank_bounded(&distances, 4).indices(), vec![0, 1, 3, 2]);
        assert_eq!(rank(&[0.0, -0.0], 2).indices(), vec![0, 1]);
        assert_eq!(rank_bounded(&[0.0, -0.0], 2).indices(), vec![0, 1]);
        assert_eq!(rank_bounded(&[-0.0, 0.0, -0.0], 2).indices(), vec![0, 1]);
    }

    #[test]
    fn test_bounded_matches_full_sort() {
        let distances = [
            0.31, 0.05, 0.77, 0.05, 0.31, 1.2, 0.0, 0.66, 0.05, 0.9, 0.31, 0.12,
        ];
        for k in -1..=(distances.len() as i64 + 2) {
            assert_eq!(
                rank_bounded(&distances, k),
                rank(&distances, k),
                "k = {}",
                k
            );
        }
        assert!(rank_bounded(&[], 3).is_empty());
    }
}
