// tests/momentum_props.rs
//
// Property-style checks for the momentum scorer: bounds under randomized
// in-domain input, the single-sample ceiling, and the documented trend
// scenarios.

use rand::Rng;

use momentum_tracker::momentum::{classify_trend, score, Trend};
use momentum_tracker::policy::ScoringPolicy;
use momentum_tracker::snapshot::{
    GithubMetrics, InteractionMetrics, MetricSnapshot, OnchainMetrics, TwitterMetrics,
    ValidationError,
};

fn random_snapshot<R: Rng>(rng: &mut R, ts: u64) -> MetricSnapshot {
    MetricSnapshot {
        timestamp: ts,
        github: GithubMetrics {
            stars: rng.random_range(0..1_000_000),
            forks: rng.random_range(0..100_000),
            commits: rng.random_range(0..10_000),
            contributors: rng.random_range(0..2_000),
            issues: rng.random_range(0..5_000),
            pull_requests: rng.random_range(0..2_000),
            releases: rng.random_range(0..200),
            velocity: rng.random_range(0.0..500.0),
        },
        twitter: TwitterMetrics {
            mentions: rng.random_range(0..100_000),
            sentiment: rng.random_range(-1.0..=1.0),
            engagement: rng.random_range(0..1_000_000),
            followers: rng.random_range(0..10_000_000),
            retweets: rng.random_range(0..100_000),
            likes: rng.random_range(0..1_000_000),
            impressions: rng.random_range(0..100_000_000),
        },
        onchain: OnchainMetrics {
            transactions: rng.random_range(0..1_000_000),
            unique_addresses: rng.random_range(0..500_000),
            volume: rng.random_range(0.0..1e9),
            liquidity: rng.random_range(0.0..1e9),
            holders: rng.random_range(0..1_000_000),
            transfer_count: rng.random_range(0..1_000_000),
        },
        community_mentions: rng.random_range(0..100_000),
        interaction_patterns: InteractionMetrics {
            discord_messages: rng.random_range(0..100_000),
            telegram_messages: rng.random_range(0..100_000),
            reddit_posts: rng.random_range(0..10_000),
            medium_posts: rng.random_range(0..1_000),
            github_discussions: rng.random_range(0..5_000),
        },
    }
}

#[test]
fn scores_stay_in_bounds_for_any_in_domain_input() {
    let policy = ScoringPolicy::default();
    let mut rng = rand::rng();

    for round in 0..200 {
        let len = rng.random_range(1..=12);
        let history: Vec<_> = (0..len)
            .map(|i| random_snapshot(&mut rng, i as u64 * 3_600_000))
            .collect();
        let s = score(&history, &policy).expect("non-empty history");
        for (name, v) in [
            ("overall", s.overall),
            ("github", s.github),
            ("social", s.social),
            ("onchain", s.onchain),
            ("community", s.community),
            ("confidence", s.confidence),
        ] {
            assert!(
                (0.0..=1.0).contains(&v),
                "round {round}: {name} out of bounds: {v}"
            );
        }
    }
}

#[test]
fn empty_history_fails_with_validation_error() {
    let err = score(&[], &ScoringPolicy::default()).unwrap_err();
    assert_eq!(err, ValidationError::EmptyHistory);
}

#[test]
fn single_sample_confidence_stays_under_documented_ceiling() {
    let policy = ScoringPolicy::default();
    let mut rng = rand::rng();
    for _ in 0..50 {
        let s = score(&[random_snapshot(&mut rng, 0)], &policy).expect("one snapshot");
        assert_eq!(s.trend, Trend::Stable);
        assert!(s.confidence <= policy.confidence.single_sample_ceiling);
    }
}

#[test]
fn effective_channel_weights_sum_to_one() {
    // A snapshot that saturates every signal must blend to exactly 1.0,
    // whatever the (normalized) mix says.
    let policy = ScoringPolicy::default();
    let maxed = MetricSnapshot {
        timestamp: 0,
        github: GithubMetrics {
            stars: u64::MAX,
            forks: u64::MAX,
            commits: u64::MAX,
            contributors: u64::MAX,
            issues: u64::MAX,
            pull_requests: u64::MAX,
            releases: u64::MAX,
            velocity: 1e12,
        },
        twitter: TwitterMetrics {
            mentions: u64::MAX,
            sentiment: 1.0,
            engagement: u64::MAX,
            followers: u64::MAX,
            retweets: u64::MAX,
            likes: u64::MAX,
            impressions: u64::MAX,
        },
        onchain: OnchainMetrics {
            transactions: u64::MAX,
            unique_addresses: u64::MAX,
            volume: 1e12,
            liquidity: 1e12,
            holders: u64::MAX,
            transfer_count: u64::MAX,
        },
        community_mentions: u64::MAX,
        interaction_patterns: InteractionMetrics {
            discord_messages: u64::MAX,
            telegram_messages: u64::MAX,
            reddit_posts: u64::MAX,
            medium_posts: u64::MAX,
            github_discussions: u64::MAX,
        },
    };
    let s = score(&[maxed], &policy).expect("one snapshot");
    assert!((s.overall - 1.0).abs() < 1e-9, "overall was {}", s.overall);
}

#[test]
fn documented_trend_scenarios() {
    let policy = ScoringPolicy::default();
    // Overall rising 0.40 -> 0.55 classifies as rising.
    assert_eq!(classify_trend(0.55, &[0.40], &policy), Trend::Rising);
    // The mirrored drop classifies as falling.
    assert_eq!(classify_trend(0.40, &[0.55], &policy), Trend::Falling);
    // Within the margin: stable.
    assert_eq!(classify_trend(0.405, &[0.40], &policy), Trend::Stable);
    // No priors: stable by definition.
    assert_eq!(classify_trend(0.9, &[], &policy), Trend::Stable);
}
