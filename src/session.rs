use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::catalog::{self, EventCatalog};
use crate::location::LocationReport;
use crate::models::{
    Coordinate, EventCategory, EventDraft, LocalEvent, RecommendCandidate, SearchCandidate,
    UserPreferences,
};
use crate::pipeline::{compute_displayed, Mode};
use crate::preferences;
use crate::provider::PreferenceSummary;

const DRAFT_LOCATION: &str = "TBD";

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DisplayedEvent {
    #[serde(flatten)]
    pub event: LocalEvent,
    pub liked: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub mode: Mode,
    pub query: String,
    pub in_progress: bool,
    pub max_distance_km: Option<f64>,
    pub location_known: bool,
    pub events: Vec<DisplayedEvent>,
}

/// Work handed out to run against the provider outside the session lock.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub token: u64,
    pub query: String,
    pub candidates: Vec<SearchCandidate>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecommendRequest {
    pub token: u64,
    pub profile: PreferenceSummary,
    pub candidates: Vec<RecommendCandidate>,
}

/// Edits applied to a previewed draft before it is added.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DraftEdits {
    pub title: Option<String>,
    pub description: Option<String>,
    pub category: Option<EventCategory>,
    pub location: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub coordinates: Option<Coordinate>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum SessionError {
    #[error("unknown event id: {0}")]
    UnknownEvent(String),
    #[error("distance threshold must be a non-negative number")]
    InvalidDistance,
    #[error("no draft is waiting to be added")]
    NoPendingDraft,
}

/// Everything the event list screen holds for one user.
#[derive(Debug, Clone)]
pub struct Session {
    catalog: EventCatalog,
    preferences: UserPreferences,
    reference_location: Option<Coordinate>,
    query: String,
    filtered_ids: Option<Vec<String>>,
    personalized: bool,
    max_distance_km: Option<f64>,
    in_progress: bool,
    pending_draft: Option<LocalEvent>,
    latest_request: u64,
}

impl Session {
    pub fn new(catalog: EventCatalog, preferences: UserPreferences) -> Self {
        Self {
            catalog,
            preferences,
            reference_location: None,
            query: String::new(),
            filtered_ids: None,
            personalized: false,
            max_distance_km: None,
            in_progress: false,
            pending_draft: None,
            latest_request: 0,
        }
    }

    pub fn catalog(&self) -> &EventCatalog {
        &self.catalog
    }

    pub fn preferences(&self) -> &UserPreferences {
        &self.preferences
    }

    pub fn reference_location(&self) -> Option<Coordinate> {
        self.reference_location
    }

    pub fn pending_draft(&self) -> Option<&LocalEvent> {
        self.pending_draft.as_ref()
    }

    pub fn in_progress(&self) -> bool {
        self.in_progress
    }

    pub fn mode(&self) -> Mode {
        if self.personalized {
            Mode::Recommended
        } else if self.filtered_ids.is_some() {
            Mode::SearchResults
        } else {
            Mode::Trending
        }
    }

    pub fn displayed(&self) -> Vec<DisplayedEvent> {
        compute_displayed(
            self.catalog.events(),
            self.filtered_ids.as_deref(),
            self.max_distance_km,
        )
        .into_iter()
        .map(|event| DisplayedEvent {
            event: event.clone(),
            liked: self.preferences.is_liked(&event.id),
        })
        .collect()
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            mode: self.mode(),
            query: self.query.clone(),
            in_progress: self.in_progress,
            max_distance_km: self.max_distance_km,
            location_known: self.reference_location.is_some(),
            events: self.displayed(),
        }
    }

    fn next_token(&mut self) -> u64 {
        self.latest_request += 1;
        self.latest_request
    }

    fn is_current(&self, token: u64) -> bool {
        if token == self.latest_request {
            true
        } else {
            debug!(token, latest = self.latest_request, "discarding stale ranking");
            false
        }
    }

    /// Starts a query search. A blank query returns to Trending instead.
    pub fn begin_search(&mut self, query: &str) -> Option<SearchRequest> {
        let query = query.trim();
        if query.is_empty() {
            self.clear_search();
            return None;
        }

        self.personalized = false;
        self.query = query.to_string();
        self.in_progress = true;
        Some(SearchRequest {
            token: self.next_token(),
            query: self.query.clone(),
            candidates: self.catalog.search_candidates(),
        })
    }

    /// Applies ranked ids if no newer request was issued since.
    pub fn finish_search(&mut self, token: u64, ranked_ids: Vec<String>) -> bool {
        if !self.is_current(token) {
            return false;
        }
        self.filtered_ids = Some(ranked_ids);
        self.in_progress = false;
        true
    }

    /// Back to Trending: no query, no id filter, "for you" off.
    pub fn clear_search(&mut self) {
        self.next_token();
        self.query.clear();
        self.filtered_ids = None;
        self.personalized = false;
        self.in_progress = false;
    }

    /// Switches "for you" on or off. Switching it off when it is already off
    /// changes nothing, so an in-flight search still lands.
    pub fn set_personalized(&mut self, enabled: bool) -> Option<RecommendRequest> {
        if !enabled && !self.personalized {
            return None;
        }
        if enabled {
            self.personalized = true;
            self.query.clear();
            self.filtered_ids = None;
            return Some(self.recommend_request());
        }

        self.next_token();
        self.personalized = false;
        self.in_progress = false;
        if self.query.is_empty() {
            self.filtered_ids = None;
        }
        None
    }

    fn recommend_request(&mut self) -> RecommendRequest {
        self.in_progress = true;
        RecommendRequest {
            token: self.next_token(),
            profile: PreferenceSummary::build(
                &self.preferences,
                &self.catalog,
                self.reference_location.is_some(),
            ),
            candidates: self.catalog.recommend_candidates(),
        }
    }

    pub fn finish_recommend(&mut self, token: u64, ranked_ids: Vec<String>) -> bool {
        if !self.is_current(token) || !self.personalized {
            return false;
        }
        self.filtered_ids = Some(ranked_ids);
        self.in_progress = false;
        true
    }

    /// Likes or unlikes an event. While "for you" is on, the recommendations
    /// are refreshed with the new preferences.
    pub fn toggle_like(
        &mut self,
        event_id: &str,
    ) -> Result<Option<RecommendRequest>, SessionError> {
        let event = self
            .catalog
            .get(event_id)
            .ok_or_else(|| SessionError::UnknownEvent(event_id.to_string()))?;
        self.preferences = preferences::toggle_like(&self.preferences, event);

        if self.personalized {
            Ok(Some(self.recommend_request()))
        } else {
            Ok(None)
        }
    }

    /// Sets the reference location once; later reports are ignored.
    pub fn resolve_location(&mut self, report: LocationReport, fallback: Coordinate) -> bool {
        if self.reference_location.is_some() {
            return false;
        }
        let origin = report.resolve(fallback);
        self.reference_location = Some(origin);
        self.catalog.apply_reference_location(origin);
        true
    }

    pub fn set_max_distance(&mut self, max_distance_km: Option<f64>) -> Result<(), SessionError> {
        if let Some(km) = max_distance_km {
            if !km.is_finite() || km < 0.0 {
                return Err(SessionError::InvalidDistance);
            }
        }
        self.max_distance_km = max_distance_km;
        Ok(())
    }

    /// Turns a provider draft into a full event awaiting confirmation.
    pub fn preview_draft(&mut self, draft: EventDraft, now: DateTime<Utc>) -> LocalEvent {
        let date = draft
            .suggested_time
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or(now);

        let id = catalog::new_event_id(&draft.title, now);
        let event = LocalEvent {
            image_url: catalog::placeholder_image(&now.timestamp_millis().to_string()),
            id,
            title: draft.title,
            description: draft.description,
            date,
            location: DRAFT_LOCATION.to_string(),
            coordinates: None,
            category: draft.category,
            attendees: 0,
            rating: 0.0,
            distance: None,
            tags: draft.tags,
        };
        self.pending_draft = Some(event.clone());
        event
    }

    /// Adds the previewed draft to the front of the catalog.
    pub fn commit_draft(&mut self, edits: DraftEdits) -> Result<LocalEvent, SessionError> {
        let mut event = self
            .pending_draft
            .take()
            .ok_or(SessionError::NoPendingDraft)?;

        if let Some(title) = edits.title.filter(|t| !t.trim().is_empty()) {
            event.title = title.trim().to_string();
        }
        if let Some(description) = edits.description {
            event.description = description;
        }
        if let Some(category) = edits.category {
            event.category = category;
        }
        if let Some(location) = edits.location.filter(|l| !l.trim().is_empty()) {
            event.location = location.trim().to_string();
        }
        if let Some(date) = edits.date {
            event.date = date;
        }
        if let Some(coordinates) = edits.coordinates {
            event.coordinates = Some(coordinates);
            event.distance = self
                .reference_location
                .map(|origin| crate::geo::distance_km(origin, coordinates));
        }

        self.catalog.prepend(event.clone());
        Ok(event)
    }

    pub fn discard_draft(&mut self) {
        self.pending_draft = None;
    }
}
