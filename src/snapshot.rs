//! snapshot.rs — Wire-facing data model for one measurement instant.
//!
//! A `MetricSnapshot` is produced once by an external collector and never
//! mutated. Counters are unsigned integers; `sentiment` is a bounded float
//! and `velocity`/`volume`/`liquidity` are non-negative floats. Everything
//! serializes as camelCase JSON to match the collector payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Fail-fast input validation failure. A snapshot that trips this is never
/// partially processed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("history must contain at least one snapshot")]
    EmptyHistory,
    #[error("{field}: {value} is outside {expected}")]
    OutOfDomain {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },
}

/// Code-repository activity counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GithubMetrics {
    pub stars: u64,
    pub forks: u64,
    pub commits: u64,
    pub contributors: u64,
    pub issues: u64,
    pub pull_requests: u64,
    pub releases: u64,
    /// Commits per day.
    pub velocity: f64,
}

/// Social-media signal counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwitterMetrics {
    pub mentions: u64,
    /// Aggregate sentiment in [-1, 1].
    pub sentiment: f64,
    pub engagement: u64,
    pub followers: u64,
    pub retweets: u64,
    pub likes: u64,
    pub impressions: u64,
}

/// On-chain activity counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnchainMetrics {
    pub transactions: u64,
    pub unique_addresses: u64,
    pub volume: f64,
    /// Currency units.
    pub liquidity: f64,
    pub holders: u64,
    pub transfer_count: u64,
}

/// Cross-platform community interaction counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetrics {
    pub discord_messages: u64,
    pub telegram_messages: u64,
    pub reddit_posts: u64,
    pub medium_posts: u64,
    pub github_discussions: u64,
}

/// One immutable measurement instant across all tracked channels,
/// identified by `timestamp` (epoch milliseconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    pub timestamp: u64,
    pub github: GithubMetrics,
    pub twitter: TwitterMetrics,
    pub onchain: OnchainMetrics,
    /// Aggregate count, independent of `interaction_patterns`.
    pub community_mentions: u64,
    pub interaction_patterns: InteractionMetrics,
}

impl MetricSnapshot {
    /// Check the float-field domains. Unsigned counters cannot go negative,
    /// so only `sentiment` and the non-negative floats need a gate.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_bounded("twitter.sentiment", self.twitter.sentiment)?;
        check_non_negative("github.velocity", self.github.velocity)?;
        check_non_negative("onchain.volume", self.onchain.volume)?;
        check_non_negative("onchain.liquidity", self.onchain.liquidity)?;
        Ok(())
    }

    /// Flatten into `(dotted path, value)` pairs for range-based checks.
    /// Paths use the wire names (`github.pullRequests`, not `pull_requests`).
    pub fn metric_values(&self) -> Vec<(&'static str, f64)> {
        let g = &self.github;
        let t = &self.twitter;
        let o = &self.onchain;
        let i = &self.interaction_patterns;
        vec![
            ("github.stars", g.stars as f64),
            ("github.forks", g.forks as f64),
            ("github.commits", g.commits as f64),
            ("github.contributors", g.contributors as f64),
            ("github.issues", g.issues as f64),
            ("github.pullRequests", g.pull_requests as f64),
            ("github.releases", g.releases as f64),
            ("github.velocity", g.velocity),
            ("twitter.mentions", t.mentions as f64),
            ("twitter.sentiment", t.sentiment),
            ("twitter.engagement", t.engagement as f64),
            ("twitter.followers", t.followers as f64),
            ("twitter.retweets", t.retweets as f64),
            ("twitter.likes", t.likes as f64),
            ("twitter.impressions", t.impressions as f64),
            ("onchain.transactions", o.transactions as f64),
            ("onchain.uniqueAddresses", o.unique_addresses as f64),
            ("onchain.volume", o.volume),
            ("onchain.liquidity", o.liquidity),
            ("onchain.holders", o.holders as f64),
            ("onchain.transferCount", o.transfer_count as f64),
            ("interactionPatterns.discordMessages", i.discord_messages as f64),
            ("interactionPatterns.telegramMessages", i.telegram_messages as f64),
            ("interactionPatterns.redditPosts", i.reddit_posts as f64),
            ("interactionPatterns.mediumPosts", i.medium_posts as f64),
            ("interactionPatterns.githubDiscussions", i.github_discussions as f64),
            ("communityMentions", self.community_mentions as f64),
        ]
    }
}

fn check_bounded(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || !(-1.0..=1.0).contains(&value) {
        return Err(ValidationError::OutOfDomain {
            field,
            value,
            expected: "[-1, 1]",
        });
    }
    Ok(())
}

fn check_non_negative(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ValidationError::OutOfDomain {
            field,
            value,
            expected: "[0, +inf)",
        });
    }
    Ok(())
}

/// Identifies the tracked project. Read-only context for collectors; the
/// core only embeds the name into the formatted model context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub twitter_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discord: Option<DiscordChannel>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscordChannel {
    pub server_id: String,
    pub channel_id: String,
}
