use thiserror::Error;

/// Which planned fetch of a composition run failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    Window,
    Expansion,
    StaleFallback,
    Supplemental,
}

impl FetchStage {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Window => "window",
            Self::Expansion => "expansion",
            Self::StaleFallback => "stale_fallback",
            Self::Supplemental => "supplemental",
        }
    }
}

impl std::fmt::Display for FetchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures surfaced by a composition run.
///
/// Collaborator errors are never retried; they propagate with the stage that
/// issued the call.
#[derive(Debug, Error)]
pub enum ComposeError {
    #[error("{stage} fetch failed: {source}")]
    Fetch {
        stage: FetchStage,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to load sent history: {source}")]
    History {
        #[source]
        source: anyhow::Error,
    },
    #[error("relevance categorisation failed: {source}")]
    Categorize {
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to build keyword matcher: {0}")]
    Lexicon(#[from] aho_corasick::BuildError),
}

impl ComposeError {
    pub(crate) fn fetch(stage: FetchStage) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| Self::Fetch { stage, source }
    }
}
