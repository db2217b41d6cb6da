//! Output shapes handed to rendering and transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::quality::FilteredUpdate;
use crate::store::models::DOMESTIC_REGION;

/// One composed digest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestPayload {
    pub digest_id: Uuid,
    pub persona: String,
    /// Narrative summary sentence(s).
    pub summary: String,
    /// Domestic insights first, then international.
    pub insights: Vec<DigestInsight>,
    pub metrics: DigestMetrics,
    pub generated_at: DateTime<Utc>,
    /// Set when the sent history had to be ignored to produce any output.
    #[serde(default)]
    pub history_ignored: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestInsight {
    pub id: Option<String>,
    pub headline: String,
    /// Best available summary, untruncated.
    pub summary: Option<String>,
    pub ai_summary: Option<String>,
    pub description: Option<String>,
    pub authority: Option<String>,
    pub sectors: Vec<String>,
    pub region: String,
    pub relevance_score: u8,
    pub priority_reason: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub url: Option<String>,
}

impl From<&FilteredUpdate> for DigestInsight {
    fn from(update: &FilteredUpdate) -> Self {
        Self {
            id: update.identity_key().map(ToString::to_string),
            headline: update.headline.trim().to_string(),
            summary: update.best_summary().map(ToString::to_string),
            ai_summary: update.ai_summary.clone(),
            description: update.description.clone(),
            authority: update.authority.clone(),
            sectors: update
                .sector_labels()
                .into_iter()
                .map(ToString::to_string)
                .collect(),
            region: update
                .region
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .unwrap_or(DOMESTIC_REGION)
                .to_string(),
            relevance_score: update.score(),
            priority_reason: update.priority_reason.clone(),
            published_at: update.published_at(),
            url: update.url.clone(),
        }
    }
}

/// Counts over the final selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestMetrics {
    pub high_count: usize,
    pub medium_count: usize,
    pub low_count: usize,
    pub unique_authorities: usize,
    pub deadline_count: usize,
    /// `null` when the stale fallback was used.
    pub window_hours_used: Option<u32>,
    pub stale_fallback_used: bool,
}

impl DigestMetrics {
    #[must_use]
    pub fn bucket_total(&self) -> usize {
        self.high_count + self.medium_count + self.low_count
    }
}

/// Parameters of one composition run.
#[derive(Debug, Clone)]
pub struct ComposeRequest {
    /// Overrides the configured persona.
    pub persona: Option<String>,
    /// Overrides the configured preferred window.
    pub window_hours: Option<u32>,
    pub now: DateTime<Utc>,
}

impl ComposeRequest {
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self {
            persona: None,
            window_hours: None,
            now,
        }
    }

    #[must_use]
    pub fn with_persona(mut self, persona: impl Into<String>) -> Self {
        self.persona = Some(persona.into());
        self
    }

    #[must_use]
    pub fn with_window_hours(mut self, hours: u32) -> Self {
        self.window_hours = Some(hours);
        self
    }
}
