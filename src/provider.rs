use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::catalog::EventCatalog;
use crate::models::{EventCategory, EventDraft, RecommendCandidate, SearchCandidate, UserPreferences};

pub const MAX_DRAFT_TAGS: usize = 5;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),
    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("provider response missing content")]
    MissingContent,
    #[error("malformed provider output: {0}")]
    Malformed(String),
}

/// What the recommender is told about the user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferenceSummary {
    pub favorite_categories: Vec<EventCategory>,
    pub liked_titles: Vec<String>,
    pub location_known: bool,
}

impl PreferenceSummary {
    pub fn build(prefs: &UserPreferences, catalog: &EventCatalog, location_known: bool) -> Self {
        Self {
            favorite_categories: prefs.top_categories(3),
            liked_titles: catalog.titles_of(&prefs.liked_event_ids),
            location_known,
        }
    }

    pub fn is_cold_start(&self) -> bool {
        self.favorite_categories.is_empty() && self.liked_titles.is_empty()
    }
}

/// Interprets free text and ranks events. Backed by a hosted LLM in production.
#[async_trait]
pub trait RankingProvider: Send + Sync {
    async fn parse_freeform_event(&self, text: &str) -> Result<EventDraft, ProviderError>;

    /// Event ids ranked by relevance to `query`, most relevant first.
    async fn search_by_query(
        &self,
        query: &str,
        candidates: &[SearchCandidate],
    ) -> Result<Vec<String>, ProviderError>;

    /// Event ids ranked by predicted interest, strongest first.
    async fn recommend(
        &self,
        profile: &PreferenceSummary,
        candidates: &[RecommendCandidate],
    ) -> Result<Vec<String>, ProviderError>;
}

/// Rejects drafts without a title or description; tidies tags.
pub fn normalize_draft(mut draft: EventDraft) -> Result<EventDraft, ProviderError> {
    draft.title = draft.title.trim().to_string();
    draft.description = draft.description.trim().to_string();
    if draft.title.is_empty() || draft.description.is_empty() {
        return Err(ProviderError::Malformed(
            "draft is missing a title or description".to_string(),
        ));
    }

    let mut tags: Vec<String> = Vec::new();
    for tag in &draft.tags {
        let clean = tag.trim().to_lowercase();
        if !clean.is_empty() && !tags.contains(&clean) {
            tags.push(clean);
        }
    }
    tags.truncate(MAX_DRAFT_TAGS);
    draft.tags = tags;

    draft.suggested_time = draft
        .suggested_time
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("null"));

    Ok(draft)
}

pub async fn draft_or_none(provider: &dyn RankingProvider, text: &str) -> Option<EventDraft> {
    match provider.parse_freeform_event(text).await {
        Ok(draft) => Some(draft),
        Err(err) => {
            warn!("event draft failed: {err}");
            None
        }
    }
}

pub async fn search_or_empty(
    provider: &dyn RankingProvider,
    query: &str,
    candidates: &[SearchCandidate],
) -> Vec<String> {
    provider
        .search_by_query(query, candidates)
        .await
        .unwrap_or_else(|err| {
            warn!("event search failed: {err}");
            Vec::new()
        })
}

pub async fn recommend_or_empty(
    provider: &dyn RankingProvider,
    profile: &PreferenceSummary,
    candidates: &[RecommendCandidate],
) -> Vec<String> {
    provider
        .recommend(profile, candidates)
        .await
        .unwrap_or_else(|err| {
            warn!("recommendations failed: {err}");
            Vec::new()
        })
}

#[cfg(test)]
pub(crate) mod stub {
    use std::sync::Mutex;

    use super::*;

    /// Deterministic provider returning canned answers, or failing on demand.
    #[derive(Default)]
    pub struct FixedProvider {
        pub draft: Option<EventDraft>,
        pub search: Vec<String>,
        pub recommended: Vec<String>,
        pub fail: bool,
        pub seen_profiles: Mutex<Vec<PreferenceSummary>>,
        pub seen_queries: Mutex<Vec<String>>,
    }

    impl FixedProvider {
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::default()
            }
        }

        fn check(&self) -> Result<(), ProviderError> {
            if self.fail {
                Err(ProviderError::Unavailable("stubbed failure".to_string()))
            } else {
                Ok(())
            }
        }
    }

    #[async_trait]
    impl RankingProvider for FixedProvider {
        async fn parse_freeform_event(&self, _text: &str) -> Result<EventDraft, ProviderError> {
            self.check()?;
            self.draft.clone().ok_or(ProviderError::MissingContent)
        }

        async fn search_by_query(
            &self,
            query: &str,
            _candidates: &[SearchCandidate],
        ) -> Result<Vec<String>, ProviderError> {
            self.check()?;
            self.seen_queries.lock().unwrap().push(query.to_string());
            Ok(self.search.clone())
        }

        async fn recommend(
            &self,
            profile: &PreferenceSummary,
            _candidates: &[RecommendCandidate],
        ) -> Result<Vec<String>, ProviderError> {
            self.check()?;
            self.seen_profiles.lock().unwrap().push(profile.clone());
            Ok(self.recommended.clone())
        }
    }
}
