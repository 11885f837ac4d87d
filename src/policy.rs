//! # Scoring & Detection Policy
//!
//! Every tunable of the pipeline lives here as data, not branches: channel
//! mix, per-signal weights and normalization scales, severity bands, trend
//! and confidence knobs, and the default anomaly threshold.
//!
//! Loads from `config/policy.toml` (override via `POLICY_CONFIG_PATH`);
//! missing file means compiled-in defaults. A dev-gated polling watcher can
//! hot-reload the file on mtime change (`POLICY_HOT_RELOAD=1`).

use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::{Duration, SystemTime};
use tracing::info;

use crate::anomaly::Severity;

// --- env defaults & names ---
pub const DEFAULT_POLICY_CONFIG_PATH: &str = "config/policy.toml";
pub const ENV_POLICY_CONFIG_PATH: &str = "POLICY_CONFIG_PATH";

/// One normalized sub-signal: its weight inside the channel blend and the
/// raw value at which it saturates to 1.0.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Signal {
    pub weight: f64,
    pub scale: f64,
}

impl Signal {
    const fn new(weight: f64, scale: f64) -> Self {
        Self { weight, scale }
    }
}

/// Commit velocity and contributor growth dominate the github score.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct GithubSignals {
    pub velocity: Signal,
    pub contributors: Signal,
    pub commits: Signal,
    pub stars: Signal,
    pub forks: Signal,
    pub pull_requests: Signal,
}

impl Default for GithubSignals {
    fn default() -> Self {
        Self {
            velocity: Signal::new(0.40, 20.0),
            contributors: Signal::new(0.25, 50.0),
            commits: Signal::new(0.15, 300.0),
            stars: Signal::new(0.10, 2_000.0),
            forks: Signal::new(0.05, 500.0),
            pull_requests: Signal::new(0.05, 100.0),
        }
    }
}

/// Sentiment and engagement dominate the social score. Sentiment has no
/// scale: it maps through `(s + 1) / 2` (the scale field is ignored).
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct SocialSignals {
    pub sentiment: Signal,
    pub engagement: Signal,
    pub mentions: Signal,
    pub impressions: Signal,
    pub followers: Signal,
}

impl Default for SocialSignals {
    fn default() -> Self {
        Self {
            sentiment: Signal::new(0.40, 1.0),
            engagement: Signal::new(0.30, 5_000.0),
            mentions: Signal::new(0.15, 1_000.0),
            impressions: Signal::new(0.10, 100_000.0),
            followers: Signal::new(0.05, 50_000.0),
        }
    }
}

/// Liquidity and unique-address growth dominate the onchain score.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct OnchainSignals {
    pub liquidity: Signal,
    pub unique_addresses: Signal,
    pub volume: Signal,
    pub transactions: Signal,
    pub holders: Signal,
}

impl Default for OnchainSignals {
    fn default() -> Self {
        Self {
            liquidity: Signal::new(0.35, 1_000_000.0),
            unique_addresses: Signal::new(0.30, 5_000.0),
            volume: Signal::new(0.15, 500_000.0),
            transactions: Signal::new(0.10, 10_000.0),
            holders: Signal::new(0.10, 10_000.0),
        }
    }
}

/// Message/post volume dominates the community score.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct CommunitySignals {
    pub discord_messages: Signal,
    pub telegram_messages: Signal,
    pub reddit_posts: Signal,
    pub medium_posts: Signal,
    pub github_discussions: Signal,
    pub community_mentions: Signal,
}

impl Default for CommunitySignals {
    fn default() -> Self {
        Self {
            discord_messages: Signal::new(0.30, 2_000.0),
            telegram_messages: Signal::new(0.25, 1_500.0),
            reddit_posts: Signal::new(0.15, 200.0),
            medium_posts: Signal::new(0.10, 50.0),
            github_discussions: Signal::new(0.10, 100.0),
            community_mentions: Signal::new(0.10, 1_000.0),
        }
    }
}

/// How the four channel scores blend into `overall`. Weights are normalized
/// by their sum at use time, so any positive mix is a valid configuration.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ChannelMix {
    pub github: f64,
    pub social: f64,
    pub onchain: f64,
    pub community: f64,
}

impl Default for ChannelMix {
    fn default() -> Self {
        Self {
            github: 0.25,
            social: 0.25,
            onchain: 0.25,
            community: 0.25,
        }
    }
}

impl ChannelMix {
    pub fn sum(&self) -> f64 {
        self.github + self.social + self.onchain + self.community
    }
}

/// One severity band: deviations up to `max_ratio` half-widths beyond the
/// expected range map to `severity`. Anything above the last band is High.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SeverityBand {
    pub max_ratio: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct TrendPolicy {
    /// How many prior snapshots feed the moving average.
    pub window: usize,
    /// Relative margin around the moving average before rising/falling.
    pub rel_margin: f64,
    /// Floor for the baseline so a near-zero average cannot make the
    /// margin vanish.
    pub min_baseline: f64,
}

impl Default for TrendPolicy {
    fn default() -> Self {
        Self {
            window: 5,
            rel_margin: 0.05,
            min_baseline: 0.05,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct ConfidencePolicy {
    pub base: f64,
    pub size_weight: f64,
    pub stability_weight: f64,
    /// History length at which the size term saturates.
    pub size_saturation: usize,
    /// Stddev of recent overalls that zeroes the stability term.
    pub stddev_scale: f64,
    /// Hard cap when only one snapshot is available.
    pub single_sample_ceiling: f64,
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self {
            base: 0.25,
            size_weight: 0.45,
            stability_weight: 0.30,
            size_saturation: 10,
            stddev_scale: 0.5,
            single_sample_ceiling: 0.5,
        }
    }
}

/// The full policy table consumed by the detector and the scorer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub channel_mix: ChannelMix,
    pub github: GithubSignals,
    pub social: SocialSignals,
    pub onchain: OnchainSignals,
    pub community: CommunitySignals,
    pub severity_bands: Vec<SeverityBand>,
    pub trend: TrendPolicy,
    pub confidence: ConfidencePolicy,
    /// Sensitivity used when the caller does not supply one.
    pub default_anomaly_threshold: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            channel_mix: ChannelMix::default(),
            github: GithubSignals::default(),
            social: SocialSignals::default(),
            onchain: OnchainSignals::default(),
            community: CommunitySignals::default(),
            severity_bands: vec![
                SeverityBand {
                    max_ratio: 1.5,
                    severity: Severity::Low,
                },
                SeverityBand {
                    max_ratio: 3.0,
                    severity: Severity::Medium,
                },
            ],
            trend: TrendPolicy::default(),
            confidence: ConfidencePolicy::default(),
            default_anomaly_threshold: 2.5,
        }
    }
}

impl ScoringPolicy {
    /// Load from `POLICY_CONFIG_PATH` or the default path. A missing file
    /// yields the compiled-in defaults; a malformed file is an error.
    pub fn from_toml() -> anyhow::Result<Self> {
        let path = std::env::var(ENV_POLICY_CONFIG_PATH)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_POLICY_CONFIG_PATH));

        match fs::read_to_string(&path) {
            Ok(content) => Self::from_toml_str(&content),
            Err(_) => Ok(Self::default()),
        }
    }

    pub fn from_toml_str(toml_str: &str) -> anyhow::Result<Self> {
        let mut policy: ScoringPolicy = toml::from_str(toml_str)?;
        policy.sanitize();
        Ok(policy)
    }

    /// Keep the table usable regardless of what the file said: non-negative
    /// weights, sorted bands, a positive channel mix, a positive threshold.
    fn sanitize(&mut self) {
        if !(self.channel_mix.sum() > 0.0) || !self.channel_mix.sum().is_finite() {
            self.channel_mix = ChannelMix::default();
        }
        self.severity_bands
            .retain(|b| b.max_ratio.is_finite() && b.max_ratio > 0.0);
        self.severity_bands
            .sort_by(|a, b| a.max_ratio.total_cmp(&b.max_ratio));
        if !(self.default_anomaly_threshold > 0.0) {
            self.default_anomaly_threshold = 2.5;
        }
        if !(0.0..=1.0).contains(&self.confidence.single_sample_ceiling) {
            self.confidence.single_sample_ceiling =
                ConfidencePolicy::default().single_sample_ceiling;
        }
    }

    /// Map an out-of-range deviation (in half-widths beyond the bound) to a
    /// severity. Total and monotonic: every positive ratio gets exactly one
    /// severity, never decreasing in `ratio`.
    pub fn severity_for(&self, ratio: f64) -> Severity {
        for band in &self.severity_bands {
            if ratio <= band.max_ratio {
                return band.severity;
            }
        }
        Severity::High
    }
}

/* ----------------------------
Thread-safe handle + hot reload
---------------------------- */

/// A threadsafe handle that can hot-reload the underlying policy in dev.
/// - Enable by setting POLICY_HOT_RELOAD=1
/// - Dev-gated: active only if cfg!(debug_assertions) OR SHUTTLE_ENV is "local"/"development".
#[derive(Clone)]
pub struct PolicyHandle {
    inner: Arc<RwLock<ScoringPolicy>>,
}

impl PolicyHandle {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self {
            inner: Arc::new(RwLock::new(policy)),
        }
    }

    /// Snapshot of the current policy. Falls back to defaults if the lock
    /// is poisoned; the pipeline never fails on policy access.
    pub fn current(&self) -> ScoringPolicy {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(_) => ScoringPolicy::default(),
        }
    }
}

/// Returns true if we should enable hot reload (dev/local only).
fn hot_reload_enabled() -> bool {
    let want = std::env::var("POLICY_HOT_RELOAD")
        .ok()
        .map(|v| v == "1")
        .unwrap_or(false);
    if !want {
        return false;
    }
    if cfg!(debug_assertions) {
        return true;
    }
    matches!(
        std::env::var("SHUTTLE_ENV")
            .unwrap_or_default()
            .to_ascii_lowercase()
            .as_str(),
        "local" | "development" | "dev"
    )
}

/// Start a simple polling watcher on `path` to hot-reload into `handle`.
/// Polls mtime every 2s. Uses only std, no external deps.
pub fn start_hot_reload_thread(handle: PolicyHandle, path: PathBuf) {
    if !hot_reload_enabled() {
        return;
    }

    thread::spawn(move || {
        let poll = Duration::from_secs(2);
        let mut last_mtime: Option<SystemTime> = None;

        loop {
            match fs::metadata(&path).and_then(|m| m.modified()) {
                Ok(mtime) => {
                    let changed = match last_mtime {
                        None => {
                            last_mtime = Some(mtime);
                            false
                        }
                        Some(prev) => mtime > prev,
                    };
                    if changed {
                        if let Ok(content) = fs::read_to_string(&path) {
                            if let Ok(fresh) = ScoringPolicy::from_toml_str(&content) {
                                if let Ok(mut guard) = handle.inner.write() {
                                    *guard = fresh;
                                    info!(target: "policy", "scoring policy hot-reloaded");
                                }
                            }
                        }
                        last_mtime = Some(mtime);
                    }
                }
                Err(_) => {
                    // File missing or unreadable; keep trying.
                }
            }
            thread::sleep(poll);
        }
    });
}
