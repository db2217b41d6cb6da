//! Tunables of the digest composition engine.
//!
//! One [`DigestConfig`] is built at process start (see
//! [`crate::config::Config::from_env`]) and shared read-only by every run.
//! The `Default` implementations carry the production defaults.

/// Default preferred window when none is requested.
pub const DEFAULT_WINDOW_HOURS: u32 = 24;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DigestConfig {
    pub persona: String,
    pub window: WindowConfig,
    pub quality: QualityConfig,
    pub selection: SelectionConfig,
    pub gap_fill: GapFillConfig,
}

impl DigestConfig {
    /// Config with the given persona and default thresholds.
    #[must_use]
    pub fn with_persona(persona: impl Into<String>) -> Self {
        Self {
            persona: persona.into(),
            ..Self::default()
        }
    }
}

/// Window Resolver settings.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowConfig {
    /// Preferred lookback in hours (default 24 when unset).
    pub preferred_hours: Option<u32>,
    /// Ceiling for expansion (default 14 days).
    pub max_hours: u32,
    /// Candidate count below which the window is expanded.
    pub min_items: usize,
    pub max_expansions: usize,
    /// Row limit for windowed fetches.
    pub fetch_limit: usize,
    pub allow_stale_fallback: bool,
    /// Row limit for the unwindowed stale fallback fetch.
    pub stale_fallback_limit: usize,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            preferred_hours: None,
            max_hours: 14 * 24,
            min_items: 6,
            max_expansions: 5,
            fetch_limit: 500,
            allow_stale_fallback: true,
            stale_fallback_limit: 50,
        }
    }
}

/// Quality Filter settings.
#[derive(Debug, Clone, PartialEq)]
pub struct QualityConfig {
    /// Restrict the digest to the financial allow-lists below.
    pub financial_only: bool,
    pub financial_authorities: Vec<String>,
    pub financial_sectors: Vec<String>,
    pub financial_keywords: Vec<String>,
    /// Days an identifier stays in the "recently sent" set.
    pub history_retention_days: u32,
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            financial_only: true,
            financial_authorities: to_strings(DEFAULT_FINANCIAL_AUTHORITIES),
            financial_sectors: to_strings(DEFAULT_FINANCIAL_SECTORS),
            financial_keywords: to_strings(DEFAULT_FINANCIAL_KEYWORDS),
            history_retention_days: 14,
        }
    }
}

/// Balanced Selector quotas and named authorities.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub domestic_target: usize,
    pub international_target: usize,
    /// Regulator selected first, up to `priority_cap`.
    pub priority_authority: String,
    pub priority_cap: usize,
    /// Hard-capped at one item.
    pub secondary_authority: String,
    /// Hard-capped at one item.
    pub tertiary_authority: String,
    /// Treasury-like bodies sharing `treasury_family_cap`. Any authority
    /// starting with `HM ` also belongs to the family.
    pub treasury_family: Vec<String>,
    pub treasury_family_cap: usize,
    /// Exchange operator hard-capped at `capped_exchange_limit`.
    pub capped_exchange: String,
    pub capped_exchange_limit: usize,
    pub authority_cap: usize,
    pub sector_cap: usize,
    /// Minimum score for the domestic high-relevance pass.
    pub domestic_high_threshold: u8,
    /// Minimum score for the first international pass.
    pub international_high_threshold: u8,
    pub international_authority_cap: usize,
    pub international_relaxed_authority_cap: usize,
}

impl SelectionConfig {
    #[must_use]
    pub fn total_target(&self) -> usize {
        self.domestic_target + self.international_target
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            domestic_target: 10,
            international_target: 5,
            priority_authority: "FCA".to_string(),
            priority_cap: 3,
            secondary_authority: "Bank of England".to_string(),
            tertiary_authority: "The Pensions Regulator".to_string(),
            treasury_family: to_strings(&["HM Treasury", "HMRC", "HM Government", "OFSI"]),
            treasury_family_cap: 2,
            capped_exchange: "AQUIS".to_string(),
            capped_exchange_limit: 2,
            authority_cap: 2,
            sector_cap: 5,
            domestic_high_threshold: 80,
            international_high_threshold: 70,
            international_authority_cap: 1,
            international_relaxed_authority_cap: 2,
        }
    }
}

/// Gap-Filler settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GapFillConfig {
    pub supplemental_limit: usize,
    /// Score given to supplemental records that carry none.
    pub default_score: u8,
}

impl Default for GapFillConfig {
    fn default() -> Self {
        Self {
            supplemental_limit: 50,
            default_score: 40,
        }
    }
}

pub(crate) const DEFAULT_FINANCIAL_AUTHORITIES: &[&str] = &[
    "FCA",
    "Financial Conduct Authority",
    "PRA",
    "Prudential Regulation Authority",
    "Bank of England",
    "HM Treasury",
    "HMRC",
    "OFSI",
    "The Pensions Regulator",
    "Financial Ombudsman Service",
    "Payment Systems Regulator",
    "Serious Fraud Office",
    "Competition and Markets Authority",
    "London Stock Exchange",
    "AQUIS",
    "ESMA",
    "EBA",
    "EIOPA",
    "ECB",
    "European Central Bank",
    "SEC",
    "CFTC",
    "FINRA",
    "Federal Reserve",
    "FSB",
    "Financial Stability Board",
    "BIS",
    "IOSCO",
    "FATF",
];

pub(crate) const DEFAULT_FINANCIAL_SECTORS: &[&str] = &[
    "banking",
    "insurance",
    "payments",
    "investment management",
    "asset management",
    "wealth management",
    "pensions",
    "consumer credit",
    "mortgages",
    "capital markets",
    "crypto assets",
    "fintech",
    "financial services",
];

pub(crate) const DEFAULT_FINANCIAL_KEYWORDS: &[&str] = &[
    "bank",
    "banks",
    "banking",
    "insurer",
    "insurers",
    "insurance",
    "payment",
    "payments",
    "credit",
    "lending",
    "mortgage",
    "mortgages",
    "pension",
    "pensions",
    "investment",
    "investments",
    "fund",
    "funds",
    "securities",
    "capital requirements",
    "liquidity",
    "aml",
    "money laundering",
    "sanctions",
    "consumer duty",
    "prudential",
    "market abuse",
    "cryptoasset",
    "cryptoassets",
    "financial",
];

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}
