//! Authority classification against the configured named authorities.

use crate::pipeline::config::SelectionConfig;
use crate::util::text::{contains_phrase, normalize_text};

/// How an authority is treated by the quota rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthorityClass {
    Priority,
    Secondary,
    Tertiary,
    TreasuryFamily,
    CappedExchange,
    Other,
}

/// Normalised named authorities, built once per run.
#[derive(Debug, Clone)]
pub struct AuthorityPolicy {
    priority: String,
    secondary: String,
    tertiary: String,
    treasury_family: Vec<String>,
    capped_exchange: String,
}

impl AuthorityPolicy {
    #[must_use]
    pub fn new(config: &SelectionConfig) -> Self {
        Self {
            priority: normalize_text(&config.priority_authority),
            secondary: normalize_text(&config.secondary_authority),
            tertiary: normalize_text(&config.tertiary_authority),
            treasury_family: config
                .treasury_family
                .iter()
                .map(|a| normalize_text(a))
                .filter(|a| !a.is_empty())
                .collect(),
            capped_exchange: normalize_text(&config.capped_exchange),
        }
    }

    /// Classify an authority name. Named matches win in the order listed.
    #[must_use]
    pub fn classify(&self, authority: &str) -> AuthorityClass {
        let normalized = normalize_text(authority);
        if normalized.is_empty() {
            return AuthorityClass::Other;
        }
        let named = |name: &str| normalized == name || contains_phrase(&normalized, name);
        if named(self.priority.as_str()) {
            AuthorityClass::Priority
        } else if named(self.secondary.as_str()) {
            AuthorityClass::Secondary
        } else if named(self.tertiary.as_str()) {
            AuthorityClass::Tertiary
        } else if named(self.capped_exchange.as_str()) {
            AuthorityClass::CappedExchange
        } else if normalized.starts_with("hm ")
            || self.treasury_family.iter().any(|n| named(n.as_str()))
        {
            AuthorityClass::TreasuryFamily
        } else {
            AuthorityClass::Other
        }
    }
}

/// Hard cap for a class, if any. These hold in every pass and in gap-fill.
#[must_use]
pub fn hard_cap(class: AuthorityClass, config: &SelectionConfig) -> Option<usize> {
    match class {
        AuthorityClass::Secondary | AuthorityClass::Tertiary => Some(1),
        AuthorityClass::CappedExchange => Some(config.capped_exchange_limit),
        AuthorityClass::Priority
        | AuthorityClass::TreasuryFamily
        | AuthorityClass::Other => None,
    }
}
