//! context.rs — Deterministic text rendering of a snapshot plus alerts.
//!
//! This text is the only channel through which numeric state reaches the
//! insight synthesizer, so completeness is a correctness requirement: every
//! field of every metric group is rendered under a labeled section, and an
//! empty alert list renders an explicit sentinel line. Pure and total; the
//! snapshot's own timestamp is the only time reference. ASCII output for
//! stable prompts.

use std::fmt::Write as _;

use crate::anomaly::{fmt_num, AnomalyAlert};
use crate::snapshot::{MetricSnapshot, ProjectConfig};

const NO_ALERTS_SENTINEL: &str = "No recent anomaly alerts.";

/// Render the full analysis context. Byte-identical output for
/// structurally equal input.
pub fn format_context(
    project: Option<&ProjectConfig>,
    snapshot: &MetricSnapshot,
    alerts: &[AnomalyAlert],
) -> String {
    let mut out = String::with_capacity(1024);

    out.push_str("# Momentum Analysis Context\n\n");
    if let Some(p) = project {
        let _ = writeln!(out, "Project: {}", p.name);
    }
    let _ = writeln!(out, "Snapshot timestamp: {} (epoch ms)", snapshot.timestamp);

    let g = &snapshot.github;
    out.push_str("\n## GitHub Activity\n");
    let _ = writeln!(out, "- Stars: {}", g.stars);
    let _ = writeln!(out, "- Forks: {}", g.forks);
    let _ = writeln!(out, "- Commits: {}", g.commits);
    let _ = writeln!(out, "- Contributors: {}", g.contributors);
    let _ = writeln!(out, "- Issues: {}", g.issues);
    let _ = writeln!(out, "- Pull Requests: {}", g.pull_requests);
    let _ = writeln!(out, "- Releases: {}", g.releases);
    let _ = writeln!(out, "- Velocity: {:.2} commits/day", g.velocity);

    let t = &snapshot.twitter;
    out.push_str("\n## Twitter Signals\n");
    let _ = writeln!(out, "- Mentions: {}", t.mentions);
    let _ = writeln!(out, "- Sentiment: {:.2}", t.sentiment);
    let _ = writeln!(out, "- Engagement: {}", t.engagement);
    let _ = writeln!(out, "- Followers: {}", t.followers);
    let _ = writeln!(out, "- Retweets: {}", t.retweets);
    let _ = writeln!(out, "- Likes: {}", t.likes);
    let _ = writeln!(out, "- Impressions: {}", t.impressions);

    let i = &snapshot.interaction_patterns;
    out.push_str("\n## Community Interaction\n");
    let _ = writeln!(out, "- Discord Messages: {}", i.discord_messages);
    let _ = writeln!(out, "- Telegram Messages: {}", i.telegram_messages);
    let _ = writeln!(out, "- Reddit Posts: {}", i.reddit_posts);
    let _ = writeln!(out, "- Medium Posts: {}", i.medium_posts);
    let _ = writeln!(out, "- GitHub Discussions: {}", i.github_discussions);
    let _ = writeln!(
        out,
        "- Total Community Mentions: {}",
        snapshot.community_mentions
    );

    let o = &snapshot.onchain;
    out.push_str("\n## Onchain Activity\n");
    let _ = writeln!(out, "- Transactions: {}", o.transactions);
    let _ = writeln!(out, "- Unique Addresses: {}", o.unique_addresses);
    let _ = writeln!(out, "- Volume: {:.2}", o.volume);
    let _ = writeln!(out, "- Liquidity: ${:.2}", o.liquidity);
    let _ = writeln!(out, "- Holders: {}", o.holders);
    let _ = writeln!(out, "- Transfer Count: {}", o.transfer_count);

    out.push_str("\n## Recent Anomaly Alerts\n");
    if alerts.is_empty() {
        out.push_str(NO_ALERTS_SENTINEL);
        out.push('\n');
    } else {
        for a in alerts {
            let (low, high) = a.expected_range.ordered();
            let _ = writeln!(
                out,
                "- [{}] {} (value: {}, expected: {} - {}, severity: {})",
                a.metric,
                a.description,
                fmt_num(a.value),
                fmt_num(low),
                fmt_num(high),
                a.severity.as_str(),
            );
        }
    }

    out.push_str(
        "\n### Notes\nUse this context to identify cross-signal convergence, \
         detect abnormal movements, and predict momentum shifts.\n",
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::{detect, ExpectedRanges};
    use crate::policy::ScoringPolicy;
    use crate::snapshot::tests::sample;

    #[test]
    fn identical_input_yields_identical_text() {
        let s = sample();
        let ranges = ExpectedRanges::from_pairs([("github.commits", 0.0, 10.0)]);
        let alerts = detect(&s, &ranges, 2.5, &ScoringPolicy::default());
        assert!(!alerts.is_empty());
        let a = format_context(None, &s, &alerts);
        let b = format_context(None, &s, &alerts);
        assert_eq!(a, b);
    }

    #[test]
    fn every_metric_group_is_rendered() {
        let text = format_context(None, &sample(), &[]);
        for section in [
            "## GitHub Activity",
            "## Twitter Signals",
            "## Community Interaction",
            "## Onchain Activity",
            "## Recent Anomaly Alerts",
        ] {
            assert!(text.contains(section), "missing section {section}");
        }
        for label in [
            "- Stars:",
            "- Velocity:",
            "- Sentiment:",
            "- Impressions:",
            "- Discord Messages:",
            "- Total Community Mentions:",
            "- Liquidity:",
            "- Transfer Count:",
        ] {
            assert!(text.contains(label), "missing field {label}");
        }
    }

    #[test]
    fn empty_alerts_render_sentinel_line() {
        let text = format_context(None, &sample(), &[]);
        assert!(text.contains(NO_ALERTS_SENTINEL));
    }

    #[test]
    fn alerts_render_one_bullet_each() {
        let mut s = sample();
        s.github.commits = 500;
        s.twitter.mentions = 100_000;
        let ranges = ExpectedRanges::from_pairs([
            ("github.commits", 50.0, 150.0),
            ("twitter.mentions", 0.0, 2_000.0),
        ]);
        let alerts = detect(&s, &ranges, 2.5, &ScoringPolicy::default());
        let text = format_context(None, &s, &alerts);
        assert!(!text.contains(NO_ALERTS_SENTINEL));
        assert!(text.contains("- [github.commits]"));
        assert!(text.contains("- [twitter.mentions]"));
        assert!(text.contains("expected: 50 - 150"));
        assert!(text.contains("severity: high"));
    }

    #[test]
    fn project_name_is_embedded_when_given() {
        let project = crate::snapshot::ProjectConfig {
            name: "Lens Protocol".to_string(),
            github_repo: None,
            twitter_handle: None,
            contract_address: None,
            token_symbol: None,
            telegram: None,
            discord: None,
        };
        let text = format_context(Some(&project), &sample(), &[]);
        assert!(text.contains("Project: Lens Protocol"));
    }
}
