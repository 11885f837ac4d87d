//! # Momentum Scorer
//! Pure, testable reduction of a snapshot series into per-channel and
//! overall momentum. No I/O, suitable for unit tests and offline
//! evaluation.
//!
//! Policy: each channel blends its normalized sub-signals by weight; the
//! four channel scores blend into `overall` through the channel mix. Trend
//! compares the newest overall to a short moving average of prior
//! snapshots; confidence grows with history length and shrinks with the
//! variance of recent overalls.

use serde::{Deserialize, Serialize};

use crate::policy::ScoringPolicy;
use crate::snapshot::{MetricSnapshot, ValidationError};

/// Direction of the composite momentum across recent snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Rising,
    Falling,
    Stable,
}

/// One score per analysis run. Derived purely from the snapshot series and
/// never mutated after creation. All score fields live in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MomentumScore {
    pub overall: f64,
    pub github: f64,
    pub social: f64,
    pub onchain: f64,
    pub community: f64,
    pub trend: Trend,
    pub confidence: f64,
}

/// Reduce a chronologically ordered snapshot series into a momentum score.
/// Requires at least one snapshot; the last element is the current reading.
pub fn score(
    history: &[MetricSnapshot],
    policy: &ScoringPolicy,
) -> Result<MomentumScore, ValidationError> {
    let current = history.last().ok_or(ValidationError::EmptyHistory)?;

    // 1) Per-channel scores for the current snapshot.
    let github = github_score(current, policy);
    let social = social_score(current, policy);
    let onchain = onchain_score(current, policy);
    let community = community_score(current, policy);
    let overall = blend_overall(github, social, onchain, community, policy);

    // 2) Overall for every prior snapshot feeds trend and stability.
    let overalls: Vec<f64> = history.iter().map(|s| overall_for(s, policy)).collect();
    let prior = &overalls[..overalls.len() - 1];
    let trend = classify_trend(overall, prior, policy);

    // 3) Confidence from history size and recent stability.
    let confidence = confidence_for(&overalls, policy);

    Ok(MomentumScore {
        overall,
        github,
        social,
        onchain,
        community,
        trend,
        confidence,
    })
}

/// Overall momentum of a single snapshot (no trend/confidence context).
pub fn overall_for(snapshot: &MetricSnapshot, policy: &ScoringPolicy) -> f64 {
    blend_overall(
        github_score(snapshot, policy),
        social_score(snapshot, policy),
        onchain_score(snapshot, policy),
        community_score(snapshot, policy),
        policy,
    )
}

fn blend_overall(
    github: f64,
    social: f64,
    onchain: f64,
    community: f64,
    policy: &ScoringPolicy,
) -> f64 {
    let mix = &policy.channel_mix;
    let raw = github * mix.github
        + social * mix.social
        + onchain * mix.onchain
        + community * mix.community;
    // Normalize by the mix sum so effective weights always sum to 1.
    let denom = mix.sum().max(1e-9);
    clamp01(raw / denom)
}

pub fn github_score(s: &MetricSnapshot, policy: &ScoringPolicy) -> f64 {
    let w = &policy.github;
    weighted(&[
        (norm(s.github.velocity, w.velocity.scale), w.velocity.weight),
        (
            norm(s.github.contributors as f64, w.contributors.scale),
            w.contributors.weight,
        ),
        (norm(s.github.commits as f64, w.commits.scale), w.commits.weight),
        (norm(s.github.stars as f64, w.stars.scale), w.stars.weight),
        (norm(s.github.forks as f64, w.forks.scale), w.forks.weight),
        (
            norm(s.github.pull_requests as f64, w.pull_requests.scale),
            w.pull_requests.weight,
        ),
    ])
}

pub fn social_score(s: &MetricSnapshot, policy: &ScoringPolicy) -> f64 {
    let w = &policy.social;
    // Sentiment is already bounded; map [-1, 1] onto [0, 1].
    let sentiment = clamp01((s.twitter.sentiment + 1.0) / 2.0);
    weighted(&[
        (sentiment, w.sentiment.weight),
        (
            norm(s.twitter.engagement as f64, w.engagement.scale),
            w.engagement.weight,
        ),
        (
            norm(s.twitter.mentions as f64, w.mentions.scale),
            w.mentions.weight,
        ),
        (
            norm(s.twitter.impressions as f64, w.impressions.scale),
            w.impressions.weight,
        ),
        (
            norm(s.twitter.followers as f64, w.followers.scale),
            w.followers.weight,
        ),
    ])
}

pub fn onchain_score(s: &MetricSnapshot, policy: &ScoringPolicy) -> f64 {
    let w = &policy.onchain;
    weighted(&[
        (norm(s.onchain.liquidity, w.liquidity.scale), w.liquidity.weight),
        (
            norm(s.onchain.unique_addresses as f64, w.unique_addresses.scale),
            w.unique_addresses.weight,
        ),
        (norm(s.onchain.volume, w.volume.scale), w.volume.weight),
        (
            norm(s.onchain.transactions as f64, w.transactions.scale),
            w.transactions.weight,
        ),
        (norm(s.onchain.holders as f64, w.holders.scale), w.holders.weight),
    ])
}

pub fn community_score(s: &MetricSnapshot, policy: &ScoringPolicy) -> f64 {
    let w = &policy.community;
    let i = &s.interaction_patterns;
    weighted(&[
        (
            norm(i.discord_messages as f64, w.discord_messages.scale),
            w.discord_messages.weight,
        ),
        (
            norm(i.telegram_messages as f64, w.telegram_messages.scale),
            w.telegram_messages.weight,
        ),
        (
            norm(i.reddit_posts as f64, w.reddit_posts.scale),
            w.reddit_posts.weight,
        ),
        (
            norm(i.medium_posts as f64, w.medium_posts.scale),
            w.medium_posts.weight,
        ),
        (
            norm(i.github_discussions as f64, w.github_discussions.scale),
            w.github_discussions.weight,
        ),
        (
            norm(s.community_mentions as f64, w.community_mentions.scale),
            w.community_mentions.weight,
        ),
    ])
}

/// Compare the current overall to the moving average of up to
/// `policy.trend.window` prior overalls. No priors means stable.
pub fn classify_trend(current: f64, prior: &[f64], policy: &ScoringPolicy) -> Trend {
    if prior.is_empty() {
        return Trend::Stable;
    }
    let window = policy.trend.window.max(1);
    let recent = &prior[prior.len().saturating_sub(window)..];
    let avg = recent.iter().sum::<f64>() / recent.len() as f64;

    // Margin is relative to the baseline, floored so a flat-zero history
    // cannot make every wiggle count as a trend.
    let margin = policy.trend.rel_margin * avg.max(policy.trend.min_baseline);
    if current - avg > margin {
        Trend::Rising
    } else if avg - current > margin {
        Trend::Falling
    } else {
        Trend::Stable
    }
}

/// Confidence blends history size and recent stability, clamped to [0, 1].
/// A single sample is capped at the policy ceiling.
fn confidence_for(overalls: &[f64], policy: &ScoringPolicy) -> f64 {
    let c = &policy.confidence;
    let n = overalls.len();

    let size_term = (n as f64 / c.size_saturation.max(1) as f64).clamp(0.0, 1.0);

    let window = policy.trend.window + 1;
    let recent = &overalls[n.saturating_sub(window)..];
    let stability = 1.0 - (stddev(recent) / c.stddev_scale.max(1e-9)).clamp(0.0, 1.0);

    let raw = c.base + c.size_weight * size_term + c.stability_weight * stability;
    let confidence = clamp01(raw);
    if n == 1 {
        confidence.min(c.single_sample_ceiling)
    } else {
        confidence
    }
}

/// Weighted mean normalized by the weight sum (zero-weight degrades to a
/// neutral 0), clamped to [0, 1].
fn weighted(pairs: &[(f64, f64)]) -> f64 {
    let mut acc = 0.0;
    let mut denom = 0.0;
    for &(value, weight) in pairs {
        let w = weight.max(0.0);
        acc += value * w;
        denom += w;
    }
    if denom <= 0.0 {
        return 0.0;
    }
    clamp01(acc / denom)
}

/// Linear normalization with saturation: `x / scale` clamped to [0, 1].
/// A non-positive scale degrades to 0 rather than dividing by zero.
fn norm(x: f64, scale: f64) -> f64 {
    if scale <= 0.0 || !scale.is_finite() {
        return 0.0;
    }
    clamp01(x / scale)
}

fn stddev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    var.sqrt()
}

fn clamp01(x: f64) -> f64 {
    if x < 0.0 {
        0.0
    } else if x > 1.0 {
        1.0
    } else {
        x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample;
    use crate::snapshot::{
        GithubMetrics, InteractionMetrics, OnchainMetrics, TwitterMetrics,
    };

    fn policy() -> ScoringPolicy {
        ScoringPolicy::default()
    }

    fn quiet_snapshot(ts: u64) -> MetricSnapshot {
        MetricSnapshot {
            timestamp: ts,
            github: GithubMetrics {
                stars: 10,
                forks: 1,
                commits: 2,
                contributors: 1,
                issues: 0,
                pull_requests: 0,
                releases: 0,
                velocity: 0.1,
            },
            twitter: TwitterMetrics {
                mentions: 2,
                sentiment: 0.0,
                engagement: 5,
                followers: 100,
                retweets: 1,
                likes: 4,
                impressions: 300,
            },
            onchain: OnchainMetrics {
                transactions: 10,
                unique_addresses: 5,
                volume: 100.0,
                liquidity: 1_000.0,
                holders: 40,
                transfer_count: 9,
            },
            community_mentions: 3,
            interaction_patterns: InteractionMetrics {
                discord_messages: 4,
                telegram_messages: 2,
                reddit_posts: 0,
                medium_posts: 0,
                github_discussions: 0,
            },
        }
    }

    #[test]
    fn empty_history_is_rejected() {
        let err = score(&[], &policy()).unwrap_err();
        assert_eq!(err, ValidationError::EmptyHistory);
    }

    #[test]
    fn single_snapshot_is_stable_with_capped_confidence() {
        let p = policy();
        let s = score(&[sample()], &p).unwrap();
        assert_eq!(s.trend, Trend::Stable);
        assert!(s.confidence <= p.confidence.single_sample_ceiling);
        assert!((0.0..=1.0).contains(&s.overall));
    }

    #[test]
    fn channel_scores_stay_in_bounds() {
        let p = policy();
        let s = score(&[sample()], &p).unwrap();
        for v in [s.overall, s.github, s.social, s.onchain, s.community] {
            assert!((0.0..=1.0).contains(&v), "score out of bounds: {v}");
        }
    }

    #[test]
    fn rising_between_two_snapshots() {
        let p = policy();
        let history = vec![quiet_snapshot(1), sample()];
        let s = score(&history, &p).unwrap();
        assert_eq!(s.trend, Trend::Rising);
    }

    #[test]
    fn falling_between_two_snapshots() {
        let p = policy();
        let history = vec![sample(), quiet_snapshot(2)];
        let s = score(&history, &p).unwrap();
        assert_eq!(s.trend, Trend::Falling);
    }

    #[test]
    fn trend_classification_example() {
        let p = policy();
        // Two-run history where overall rises from 0.40 to 0.55.
        assert_eq!(classify_trend(0.55, &[0.40], &p), Trend::Rising);
        assert_eq!(classify_trend(0.40, &[0.55], &p), Trend::Falling);
        assert_eq!(classify_trend(0.41, &[0.40], &p), Trend::Stable);
    }

    #[test]
    fn confidence_grows_with_history_length() {
        let p = policy();
        let short = score(&[sample(), sample()], &p).unwrap();
        let history: Vec<_> = (0..8).map(|_| sample()).collect();
        let long = score(&history, &p).unwrap();
        assert!(long.confidence > short.confidence);
    }

    #[test]
    fn volatile_history_lowers_confidence() {
        let p = policy();
        let steady: Vec<_> = (0..6).map(|_| sample()).collect();
        let mut volatile = Vec::new();
        for i in 0..6 {
            volatile.push(if i % 2 == 0 { sample() } else { quiet_snapshot(i) });
        }
        let a = score(&steady, &p).unwrap();
        let b = score(&volatile, &p).unwrap();
        assert!(a.confidence > b.confidence);
    }

    #[test]
    fn saturated_metrics_cap_at_one() {
        let mut s = sample();
        s.github.velocity = 1e9;
        s.github.stars = u64::MAX;
        s.onchain.liquidity = 1e15;
        let p = policy();
        let out = score(&[s], &p).unwrap();
        assert!(out.github <= 1.0);
        assert!(out.onchain <= 1.0);
        assert!(out.overall <= 1.0);
    }

    #[test]
    fn zero_snapshot_degrades_to_neutral_not_panic() {
        let mut s = quiet_snapshot(1);
        s.github = GithubMetrics {
            stars: 0,
            forks: 0,
            commits: 0,
            contributors: 0,
            issues: 0,
            pull_requests: 0,
            releases: 0,
            velocity: 0.0,
        };
        let out = score(&[s], &policy()).unwrap();
        assert!((0.0..=1.0).contains(&out.overall));
        assert!(out.github.abs() < 1e-9);
    }
}
