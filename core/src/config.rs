use serde::{Deserialize, Serialize};

// ── Parser ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ParserConfig {
    /// Data rows handled per batch before progress is reported.
    pub batch_size: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self { batch_size: 5000 }
    }
}

// ── Fraud / integrity ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FraudConfig {
    pub disposable_domains: Vec<String>,
    /// Wallets shorter than this are ignored for sybil checks.
    pub min_wallet_len: usize,
    pub speed_run_hours: f64,
    pub bot_activity_hours: f64,
}

impl Default for FraudConfig {
    fn default() -> Self {
        Self {
            disposable_domains: [
                "yopmail.com",
                "mailinator.com",
                "temp-mail.org",
                "guerrillamail.com",
                "10minutemail.com",
                "sharklasers.com",
                "throwawaymail.com",
                "getnada.com",
            ]
            .iter()
            .map(|d| d.to_string())
            .collect(),
            min_wallet_len: 11,
            speed_run_hours: 4.0,
            bot_activity_hours: 0.5,
        }
    }
}

impl FraudConfig {
    pub fn is_disposable(&self, domain: &str) -> bool {
        self.disposable_domains
            .iter()
            .any(|d| d.eq_ignore_ascii_case(domain))
    }
}

// ── Metrics ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MetricsConfig {
    pub rapid_completion_hours: f64,
    /// Explicit windows up to this many days chart daily; longer ones weekly.
    pub daily_granularity_max_days: i64,
    /// Bucket cap when no window is supplied (most recent buckets kept).
    pub undated_bucket_limit: usize,
    pub leaderboard_size: usize,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            rapid_completion_hours: 5.0,
            daily_granularity_max_days: 60,
            undated_bucket_limit: 24,
            leaderboard_size: 10,
        }
    }
}

// ── Top level ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    pub parser:  ParserConfig,
    pub fraud:   FraudConfig,
    pub metrics: MetricsConfig,
}

impl IngestConfig {
    /// Load a JSON config file. Missing sections fall back to defaults.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: IngestConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        if config.parser.batch_size == 0 {
            anyhow::bail!("{path}: parser.batch_size must be > 0");
        }
        Ok(config)
    }

    /// Config used by tests: defaults with a small batch size so
    /// multi-batch behaviour shows up on modest fixtures.
    pub fn default_test() -> Self {
        Self {
            parser: ParserConfig { batch_size: 100 },
            ..Self::default()
        }
    }
}
