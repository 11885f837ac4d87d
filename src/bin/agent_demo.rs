//! Demo that runs one full analysis cycle offline against the mock model.

use std::sync::Arc;

use momentum_tracker::anomaly::{detect, ExpectedRanges};
use momentum_tracker::config::model::ModelConfig;
use momentum_tracker::context::format_context;
use momentum_tracker::momentum;
use momentum_tracker::policy::ScoringPolicy;
use momentum_tracker::snapshot::{
    GithubMetrics, InteractionMetrics, MetricSnapshot, OnchainMetrics, TwitterMetrics,
};
use momentum_tracker::synth::{MockProvider, Synthesizer};

fn demo_snapshot() -> MetricSnapshot {
    MetricSnapshot {
        timestamp: 1_700_000_000_000,
        github: GithubMetrics {
            stars: 1200,
            forks: 300,
            commits: 500,
            contributors: 18,
            issues: 40,
            pull_requests: 22,
            releases: 3,
            velocity: 13.5,
        },
        twitter: TwitterMetrics {
            mentions: 450,
            sentiment: 0.35,
            engagement: 2100,
            followers: 18000,
            retweets: 520,
            likes: 3100,
            impressions: 64000,
        },
        onchain: OnchainMetrics {
            transactions: 4100,
            unique_addresses: 1800,
            volume: 210_000.0,
            liquidity: 540_000.0,
            holders: 5200,
            transfer_count: 3900,
        },
        community_mentions: 620,
        interaction_patterns: InteractionMetrics {
            discord_messages: 840,
            telegram_messages: 410,
            reddit_posts: 36,
            medium_posts: 4,
            github_discussions: 19,
        },
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let policy = ScoringPolicy::default();
    let ranges = ExpectedRanges::default_seed();
    let snapshot = demo_snapshot();

    let alerts = detect(&snapshot, &ranges, 2.5, &policy);
    let score = momentum::score(&[snapshot.clone()], &policy).expect("non-empty history");
    let context = format_context(None, &snapshot, &alerts);

    let synth = Synthesizer::new(Arc::new(MockProvider::canned()), &ModelConfig::default());
    let insights = synth.synthesize(&context).await.expect("mock synthesis");

    println!("{context}");
    println!(
        "score: {}",
        serde_json::to_string_pretty(&score).expect("serialize score")
    );
    println!(
        "alerts: {}",
        serde_json::to_string_pretty(&alerts).expect("serialize alerts")
    );
    println!(
        "insights: {}",
        serde_json::to_string_pretty(&insights).expect("serialize insights")
    );
    println!("agent-demo done");
}
