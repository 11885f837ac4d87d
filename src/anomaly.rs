//! anomaly.rs — Range-based anomaly detection over a metric snapshot.
//!
//! Each tracked metric path is compared against a configured expected range.
//! A reading is anomalous when it falls outside `[low, high]` by more than
//! `threshold` sigma-equivalent units, where one sigma-equivalent is half
//! the range half-width (the range is read as +-2 sigma around its
//! midpoint). Severity comes from the policy band table. Metrics without a
//! range are skipped, never an error.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::policy::ScoringPolicy;
use crate::snapshot::MetricSnapshot;

/// Alert severity. Ordering follows deviation magnitude.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Closed interval `[low, high]`. Serializes as a two-element array to
/// match the collector wire format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedRange(pub f64, pub f64);

impl ExpectedRange {
    /// Bounds in guaranteed `low <= high` order, whatever the file said.
    pub fn ordered(&self) -> (f64, f64) {
        if self.0 <= self.1 {
            (self.0, self.1)
        } else {
            (self.1, self.0)
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        let (low, high) = self.ordered();
        (low..=high).contains(&value)
    }
}

/// One detected deviation. Immutable; consumed by the context formatter and
/// display collaborators. No cross-run deduplication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyAlert {
    pub id: String,
    pub timestamp: u64,
    /// Dotted path of the source field, e.g. `github.commits`.
    pub metric: String,
    pub severity: Severity,
    pub description: String,
    pub value: f64,
    pub expected_range: ExpectedRange,
}

/// Expected ranges keyed by metric path, loaded from JSON
/// (`{"github.commits": [50, 150], ...}`). Falls back to a built-in seed.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ExpectedRanges {
    ranges: HashMap<String, ExpectedRange>,
}

impl ExpectedRanges {
    /// Load from a JSON file. Falls back to `default_seed()` on error.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|_| Self::default_seed()),
            Err(_) => Self::default_seed(),
        }
    }

    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (&'static str, f64, f64)>,
    {
        let ranges = pairs
            .into_iter()
            .map(|(path, low, high)| (path.to_string(), ExpectedRange(low, high)))
            .collect();
        Self { ranges }
    }

    pub fn get(&self, path: &str) -> Option<ExpectedRange> {
        self.ranges.get(path).copied()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Built-in seed calibrated for a mid-sized project. Used as fallback
    /// if no config file is found; collectors are expected to ship their
    /// own calibration per project.
    pub fn default_seed() -> Self {
        DEFAULT_SEED.clone()
    }
}

static DEFAULT_SEED: Lazy<ExpectedRanges> = Lazy::new(|| {
    ExpectedRanges::from_pairs([
        ("github.stars", 0.0, 5_000.0),
        ("github.forks", 0.0, 1_200.0),
        ("github.commits", 50.0, 150.0),
        ("github.contributors", 2.0, 80.0),
        ("github.issues", 0.0, 200.0),
        ("github.pullRequests", 0.0, 120.0),
        ("github.releases", 0.0, 10.0),
        ("github.velocity", 0.0, 30.0),
        ("twitter.mentions", 0.0, 2_000.0),
        ("twitter.sentiment", -0.2, 0.3),
        ("twitter.engagement", 0.0, 10_000.0),
        ("twitter.followers", 0.0, 100_000.0),
        ("twitter.retweets", 0.0, 5_000.0),
        ("twitter.likes", 0.0, 20_000.0),
        ("twitter.impressions", 0.0, 500_000.0),
        ("onchain.transactions", 0.0, 20_000.0),
        ("onchain.uniqueAddresses", 0.0, 8_000.0),
        ("onchain.volume", 0.0, 1_000_000.0),
        ("onchain.liquidity", 10_000.0, 2_000_000.0),
        ("onchain.holders", 0.0, 20_000.0),
        ("onchain.transferCount", 0.0, 15_000.0),
        ("interactionPatterns.discordMessages", 0.0, 4_000.0),
        ("interactionPatterns.telegramMessages", 0.0, 3_000.0),
        ("interactionPatterns.redditPosts", 0.0, 400.0),
        ("interactionPatterns.mediumPosts", 0.0, 60.0),
        ("interactionPatterns.githubDiscussions", 0.0, 150.0),
        ("communityMentions", 0.0, 2_500.0),
    ])
});

/// Compare every tracked metric against its expected range and return the
/// alerts, sorted by ascending metric path (then descending severity, so
/// rendering is deterministic). In-range values never alert; metrics
/// without a range are skipped. Never fails on well-typed input.
pub fn detect(
    snapshot: &MetricSnapshot,
    expected: &ExpectedRanges,
    threshold: f64,
    policy: &ScoringPolicy,
) -> Vec<AnomalyAlert> {
    let threshold = if threshold.is_finite() && threshold > 0.0 {
        threshold
    } else {
        policy.default_anomaly_threshold
    };

    let mut alerts = Vec::new();
    for (path, value) in snapshot.metric_values() {
        let Some(range) = expected.get(path) else {
            // No range configured: no alert possible for this metric.
            continue;
        };
        let (low, high) = range.ordered();
        if (low..=high).contains(&value) {
            continue;
        }

        let excess = if value < low { low - value } else { value - high };
        let half_width = (high - low) / 2.0;
        // One sigma-equivalent = half the half-width (range spans +-2 sigma).
        let sigma = half_width / 2.0;
        let anomalous = if sigma > 0.0 {
            excess > threshold * sigma
        } else {
            // Zero-width range: any excess beyond the bound alerts.
            excess > 0.0
        };
        if !anomalous {
            continue;
        }

        let ratio = if half_width > 0.0 {
            excess / half_width
        } else {
            f64::INFINITY
        };
        let severity = policy.severity_for(ratio);
        let side = if value < low { "below" } else { "above" };
        let description = format!(
            "{path} reading {} is {side} the expected range {} - {}",
            fmt_num(value),
            fmt_num(low),
            fmt_num(high)
        );

        alerts.push(AnomalyAlert {
            id: alert_id(snapshot.timestamp, path, value),
            timestamp: snapshot.timestamp,
            metric: path.to_string(),
            severity,
            description,
            value,
            expected_range: ExpectedRange(low, high),
        });
    }

    alerts.sort_by(|a, b| {
        a.metric
            .cmp(&b.metric)
            .then_with(|| b.severity.cmp(&a.severity))
    });
    alerts
}

/// Stable, content-derived alert id: truncated SHA-256 over the snapshot
/// timestamp, metric path, and observed value.
fn alert_id(timestamp: u64, metric: &str, value: f64) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(timestamp.to_be_bytes());
    hasher.update(metric.as_bytes());
    hasher.update(value.to_bits().to_be_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(12);
    for b in digest.iter().take(6) {
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Integral values print without a fraction, everything else with two
/// decimals. Keeps descriptions readable for counter metrics.
pub(crate) fn fmt_num(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e12 {
        format!("{}", x as i64)
    } else {
        format!("{x:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample;

    fn policy() -> ScoringPolicy {
        ScoringPolicy::default()
    }

    #[test]
    fn in_range_never_alerts() {
        let mut s = sample();
        s.twitter.sentiment = 0.1;
        let ranges = ExpectedRanges::from_pairs([("twitter.sentiment", -0.2, 0.3)]);
        let alerts = detect(&s, &ranges, 2.5, &policy());
        assert!(alerts.is_empty());
    }

    #[test]
    fn commit_spike_is_high_severity() {
        let mut s = sample();
        s.github.commits = 500;
        let ranges = ExpectedRanges::from_pairs([("github.commits", 50.0, 150.0)]);
        let alerts = detect(&s, &ranges, 2.5, &policy());
        assert_eq!(alerts.len(), 1);
        let a = &alerts[0];
        assert_eq!(a.metric, "github.commits");
        // Excess 350 over a half-width of 50 -> ratio 7 -> high.
        assert_eq!(a.severity, Severity::High);
        assert!((a.value - 500.0).abs() < 1e-9);
        assert_eq!(a.expected_range, ExpectedRange(50.0, 150.0));
        assert!(a.description.contains("above"));
    }

    #[test]
    fn below_range_alerts_too() {
        let mut s = sample();
        s.onchain.liquidity = 100.0;
        let ranges = ExpectedRanges::from_pairs([("onchain.liquidity", 500_000.0, 600_000.0)]);
        let alerts = detect(&s, &ranges, 2.5, &policy());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
        assert!(alerts[0].description.contains("below"));
    }

    #[test]
    fn missing_ranges_are_skipped_silently() {
        let s = sample();
        let ranges = ExpectedRanges::from_pairs([]);
        assert!(detect(&s, &ranges, 2.5, &policy()).is_empty());
    }

    #[test]
    fn small_excursion_under_threshold_is_ignored() {
        let mut s = sample();
        // Range [50, 150]: half-width 50, sigma 25, threshold 2.5 -> the
        // excess must exceed 62.5 before anything alerts.
        s.github.commits = 200;
        let ranges = ExpectedRanges::from_pairs([("github.commits", 50.0, 150.0)]);
        assert!(detect(&s, &ranges, 2.5, &policy()).is_empty());

        s.github.commits = 213;
        let alerts = detect(&s, &ranges, 2.5, &policy());
        assert_eq!(alerts.len(), 1);
        // Excess 63 over half-width 50 -> ratio 1.26 -> low.
        assert_eq!(alerts[0].severity, Severity::Low);
    }

    #[test]
    fn zero_width_range_degrades_to_any_excess() {
        let mut s = sample();
        s.github.releases = 5;
        let ranges = ExpectedRanges::from_pairs([("github.releases", 0.0, 0.0)]);
        let alerts = detect(&s, &ranges, 2.5, &policy());
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].severity, Severity::High);
    }

    #[test]
    fn severity_non_decreasing_in_deviation() {
        let ranges = ExpectedRanges::from_pairs([("github.commits", 50.0, 150.0)]);
        let mut prev = Severity::Low;
        for commits in (200u64..2000).step_by(50) {
            let mut s = sample();
            s.github.commits = commits;
            let alerts = detect(&s, &ranges, 2.5, &policy());
            if let Some(a) = alerts.first() {
                assert!(a.severity >= prev);
                prev = a.severity;
            }
        }
        assert_eq!(prev, Severity::High);
    }

    #[test]
    fn output_sorted_by_metric_path() {
        let mut s = sample();
        s.github.commits = 10_000;
        s.twitter.mentions = 100_000;
        s.onchain.transactions = 900_000;
        let ranges = ExpectedRanges::from_pairs([
            ("twitter.mentions", 0.0, 2_000.0),
            ("github.commits", 50.0, 150.0),
            ("onchain.transactions", 0.0, 20_000.0),
        ]);
        let alerts = detect(&s, &ranges, 2.5, &policy());
        let paths: Vec<_> = alerts.iter().map(|a| a.metric.as_str()).collect();
        assert_eq!(
            paths,
            vec!["github.commits", "onchain.transactions", "twitter.mentions"]
        );
    }

    #[test]
    fn ids_are_stable_and_unique_within_a_run() {
        let mut s = sample();
        s.github.commits = 10_000;
        s.twitter.mentions = 100_000;
        let ranges = ExpectedRanges::from_pairs([
            ("github.commits", 50.0, 150.0),
            ("twitter.mentions", 0.0, 2_000.0),
        ]);
        let a = detect(&s, &ranges, 2.5, &policy());
        let b = detect(&s, &ranges, 2.5, &policy());
        assert_eq!(a, b, "identical input must produce identical alerts");
        assert_ne!(a[0].id, a[1].id);
    }

    #[test]
    fn invalid_threshold_falls_back_to_policy_default() {
        let mut s = sample();
        s.github.commits = 500;
        let ranges = ExpectedRanges::from_pairs([("github.commits", 50.0, 150.0)]);
        let with_default = detect(&s, &ranges, 0.0, &policy());
        assert_eq!(with_default.len(), 1);
    }

    #[test]
    fn seed_covers_every_snapshot_path() {
        let seed = ExpectedRanges::default_seed();
        for (path, _) in sample().metric_values() {
            assert!(seed.get(path).is_some(), "missing seed range for {path}");
        }
    }
}
