use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;

use crate::error::{AppError, Result};

/// Per-reference distances produced by a single inference call.
///
/// Position `i` holds the distance between the query and reference image `i`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DistanceVector(Vec<f64>);

impl DistanceVector {
    /// Wraps raw distances without checking them.
    pub fn new(distances: Vec<f64>) -> Self {
        Self(distances)
    }

    /// Checks that every distance is a non-negative number.
    ///
    /// The ranker accepts anything; this is for input arriving from outside
    /// the process.
    pub fn validate(&self) -> Result<()> {
        if let Some((i, d)) = self
            .0
            .iter()
            .enumerate()
            .find(|(_, d)| d.is_nan() || **d < 0.0)
        {
            return Err(AppError::Validation(format!(
                "distance at index {} must be a non-negative number, got {}",
                i, d
            )));
        }
        Ok(())
    }

    /// Consumes the vector, returning the raw distances.
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for DistanceVector {
    fn from(v: Vec<f64>) -> Self {
        Self(v)
    }
}

impl From<Vec<f32>> for DistanceVector {
    fn from(v: Vec<f32>) -> Self {
        Self(v.into_iter().map(f64::from).collect())
    }
}

impl Deref for DistanceVector {
    type Target = [f64];

    fn deref(&self) -> &[f64] {
        &self.0
    }
}

/// A reference image and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankedMatch {
    /// Index of the reference image in the distance vector.
    pub index: usize,
    /// Distance between the query and the reference image.
    pub distance: f64,
}

impl RankedMatch {
    /// Creates a new match.
    pub fn new(index: usize, distance: f64) -> Self {
        Self { index, distance }
    }
}

/// Matches ordered by ascending distance, ties by ascending index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RankingResult(Vec<RankedMatch>);

impl RankingResult {
    pub(crate) fn from_sorted(matches: Vec<RankedMatch>) -> Self {
        Self(matches)
    }

    /// The matches in rank order.
    pub fn matches(&self) -> &[RankedMatch] {
        &self.0
    }

    /// Just the reference indices, in rank order.
    pub fn indices(&self) -> Vec<usize> {
        self.0.iter().map(|m| m.index).collect()
    }

    /// The human-readable listing shown to end users.
    pub fn listing(&self) -> String {
        self.to_string()
    }
}

impl Deref for RankingResult {
    type Target = [RankedMatch];

    fn deref(&self) -> &[RankedMatch] {
        &self.0
    }
}

impl IntoIterator for RankingResult {
    type Item = RankedMatch;
    type IntoIter = std::vec::IntoIter<RankedMatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl fmt::Display for RankingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Results")?;
        writeln!(f)?;
        for m in &self.0 {
            writeln!(f, "Element: {}  Offset: {}", m.distance, m.index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_negative_and_nan() {
        assert!(DistanceVector::new(vec![0.0, 1.5]).validate().is_ok());
        assert!(DistanceVector::new(vec![]).validate().is_ok());
        assert!(DistanceVector::new(vec![0.0, -0.0]).validate().is_ok());

        let err = DistanceVector::new(vec![0.1, -0.2]).validate().unwrap_err();
        assert!(err.to_string().contains("index 1"));
        assert!(DistanceVector::new(vec![f64::NAN]).validate().is_err());
    }

    #[test]
    fn test_listing_format() {
        let result = RankingResult::from_sorted(vec![
            RankedMatch::new(1, 0.1),
            RankedMatch::new(2, 0.5),
        ]);
        assert_eq!(
            result.listing(),
            "Results\n\nElement: 0.1  Offset: 1\nElement: 0.5  Offset: 2\n"
        );
        assert_eq!(RankingResult::default().listing(), "Results\n\n");
    }

    #[test]
    fn test_serializes_as_plain_list() {
        let result = RankingResult::from_sorted(vec![RankedMatch::new(3, 0.25)]);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json, serde_json::json!([{ "index": 3, "distance": 0.25 }]));
    }
}
