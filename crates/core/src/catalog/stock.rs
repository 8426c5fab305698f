//! Per-size and flat stock counts.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bucket used by products without sizes, and when no size is selected.
pub const DEFAULT_BUCKET: &str = "default";

/// Stock counts keyed by size label.
///
/// Stored as a JSON object (`{"P": 2, "M": 0}` or `{"default": 12}`).
/// Recorded counts may be negative after manual edits; every read clamps
/// them to zero.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StockLevels(BTreeMap<String, i32>);

impl StockLevels {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Flat stock stored in the default bucket.
    #[must_use]
    pub fn flat(count: i32) -> Self {
        let mut levels = Self::new();
        levels.set(DEFAULT_BUCKET, count);
        levels
    }

    /// Stock keyed by size.
    #[must_use]
    pub fn per_size<S: Into<String>>(counts: impl IntoIterator<Item = (S, i32)>) -> Self {
        Self(counts.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Raw recorded count, which may be negative.
    #[must_use]
    pub fn recorded(&self, bucket: &str) -> i32 {
        self.0.get(bucket).copied().unwrap_or(0)
    }

    /// Available units for a size, or the default bucket when `size` is `None`.
    ///
    /// Missing buckets count as zero.
    #[must_use]
    pub fn available(&self, size: Option<&str>) -> u32 {
        let bucket = size.unwrap_or(DEFAULT_BUCKET);
        u32::try_from(self.recorded(bucket)).unwrap_or(0)
    }

    pub fn set(&mut self, bucket: impl Into<String>, count: i32) {
        self.0.insert(bucket.into(), count);
    }

    /// Sum of available units across every bucket.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0
            .values()
            .map(|&v| u32::try_from(v).unwrap_or(0))
            .fold(0_u32, u32::saturating_add)
    }

    /// Keep only the buckets that match the product's sizes.
    ///
    /// A product without sizes keeps only the default bucket. Sizes with no
    /// recorded count get an explicit zero so the admin form shows them.
    #[must_use]
    pub fn normalized_for(&self, sizes: &[String]) -> Self {
        if sizes.is_empty() {
            return Self::flat(self.recorded(DEFAULT_BUCKET).max(0));
        }
        Self(
            sizes
                .iter()
                .map(|size| (size.clone(), self.recorded(size).max(0)))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i32)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_clamps_negative() {
        let stock = StockLevels::per_size([("M", -3), ("G", 4)]);
        assert_eq!(stock.available(Some("M")), 0);
        assert_eq!(stock.available(Some("G")), 4);
        assert_eq!(stock.recorded("M"), -3);
    }

    #[test]
    fn test_available_missing_bucket_is_zero() {
        let stock = StockLevels::per_size([("M", 2)]);
        assert_eq!(stock.available(Some("GG")), 0);
        assert_eq!(stock.available(None), 0);
    }

    #[test]
    fn test_flat_uses_default_bucket() {
        let stock = StockLevels::flat(7);
        assert_eq!(stock.available(None), 7);
        assert_eq!(stock.total(), 7);
    }

    #[test]
    fn test_normalized_for_sizes() {
        let stock = StockLevels::per_size([("P", 1), ("XG", 9), ("M", -1)]);
        let sizes = vec!["P".to_string(), "M".to_string(), "G".to_string()];
        let normalized = stock.normalized_for(&sizes);
        assert_eq!(normalized, StockLevels::per_size([("P", 1), ("M", 0), ("G", 0)]));
    }

    #[test]
    fn test_normalized_without_sizes_keeps_default() {
        let stock = StockLevels::per_size([("default", 5), ("M", 3)]);
        assert_eq!(stock.normalized_for(&[]), StockLevels::flat(5));
    }

    #[test]
    fn test_json_shape() {
        let stock = StockLevels::per_size([("M", 2)]);
        assert_eq!(serde_json::to_string(&stock).unwrap(), r#"{"M":2}"#);
    }
}
