//! Records exchanged with the update pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::util::text::{headline_key, normalize_text};

/// Region label that marks an update as domestic.
pub const DOMESTIC_REGION: &str = "UK";

/// A regulatory update as stored by the scrapers and feed fetchers.
///
/// Every field except `headline` is optional; missing values are tolerated and
/// resolved through the accessor methods below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawUpdate {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub ai_summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub authority: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub sector: Option<String>,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub published_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub fetched_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub compliance_deadline: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient_score")]
    pub relevance_score: Option<u8>,
    #[serde(default)]
    pub priority_reason: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

impl RawUpdate {
    /// Stable identifier: the primary id, falling back to the source URL.
    #[must_use]
    pub fn identity_key(&self) -> Option<&str> {
        non_blank(self.id.as_deref()).or_else(|| non_blank(self.url.as_deref()))
    }

    /// Identifier used for membership checks during selection.
    ///
    /// Records with neither id nor URL are identified by their headline key.
    #[must_use]
    pub fn selection_identity(&self) -> String {
        self.identity_key().map_or_else(
            || format!("headline:{}", headline_key(&self.headline)),
            ToString::to_string,
        )
    }

    /// Best-effort publication time.
    #[must_use]
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        self.published_date.or(self.fetched_date).or(self.created_at)
    }

    /// Region absent or `UK` means domestic.
    #[must_use]
    pub fn is_domestic(&self) -> bool {
        non_blank(self.region.as_deref())
            .is_none_or(|region| region.eq_ignore_ascii_case(DOMESTIC_REGION))
    }

    #[must_use]
    pub fn score(&self) -> u8 {
        self.relevance_score.unwrap_or(0)
    }

    #[must_use]
    pub fn authority_name(&self) -> &str {
        self.authority.as_deref().map_or("", str::trim)
    }

    /// Feed-provided summary, falling back to the description.
    #[must_use]
    pub fn feed_summary(&self) -> Option<&str> {
        non_blank(self.summary.as_deref()).or_else(|| non_blank(self.description.as_deref()))
    }

    /// Best available summary text: AI summary, feed summary, then description.
    #[must_use]
    pub fn best_summary(&self) -> Option<&str> {
        non_blank(self.ai_summary.as_deref()).or_else(|| self.feed_summary())
    }

    /// All sector labels, trimmed and de-duplicated by normalised form.
    #[must_use]
    pub fn sector_labels(&self) -> Vec<&str> {
        let mut seen = Vec::<String>::new();
        let mut labels = Vec::new();
        for label in self.sector.iter().chain(self.sectors.iter()) {
            let trimmed = label.trim();
            let key = normalize_sector(trimmed);
            if key.is_empty() || seen.contains(&key) {
                continue;
            }
            seen.push(key);
            labels.push(trimmed);
        }
        labels
    }

    /// Headline and summaries joined for keyword matching.
    #[must_use]
    pub fn combined_text(&self) -> String {
        let mut text = self.headline.clone();
        for part in [
            self.summary.as_deref(),
            self.ai_summary.as_deref(),
            self.description.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            text.push(' ');
            text.push_str(part);
        }
        text
    }
}

/// Normalise a sector label (`&` is read as `and`).
#[must_use]
pub fn normalize_sector(label: &str) -> String {
    normalize_text(&label.replace('&', " and "))
}

/// Firm profile used to parameterise the relevance categoriser.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirmProfile {
    pub name: String,
    #[serde(default)]
    pub sectors: Vec<String>,
    #[serde(default)]
    pub priority_authorities: Vec<String>,
}

/// One entry of the "already sent" history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentRecord {
    pub id: String,
    pub sent_at: DateTime<Utc>,
}

/// Accept the scorer's output in whatever numeric shape it arrives.
///
/// Fractions are rounded and values are clamped to `0..=100`; anything that
/// is not a number (or a numeric string) reads as no score.
fn lenient_score<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let raw = match value {
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => text.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw.filter(|score| score.is_finite()).map(|score| {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let clamped = score.round().clamp(0.0, 100.0) as u8;
        clamped
    }))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
