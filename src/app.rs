use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::location::LocationReport;
use crate::models::{Coordinate, LocalEvent, UserPreferences};
use crate::preferences::PreferenceStore;
use crate::provider::{self, RankingProvider};
use crate::session::{DraftEdits, RecommendRequest, Session, SessionError, Snapshot};

/// Shared application state: one session, its provider, and durable prefs.
pub struct AppState {
    session: Mutex<Session>,
    provider: Arc<dyn RankingProvider>,
    store: PreferenceStore,
    fallback_location: Coordinate,
}

impl AppState {
    pub fn new(
        session: Session,
        provider: Arc<dyn RankingProvider>,
        store: PreferenceStore,
        fallback_location: Coordinate,
    ) -> Self {
        Self {
            session: Mutex::new(session),
            provider,
            store,
            fallback_location,
        }
    }

    // A panic mid-update leaves the session consistent enough to keep serving.
    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Snapshot {
        self.session().snapshot()
    }

    pub fn event_count(&self) -> usize {
        self.session().catalog().len()
    }

    pub fn preferences(&self) -> UserPreferences {
        self.session().preferences().clone()
    }

    pub fn set_max_distance(&self, max_distance_km: Option<f64>) -> Result<Snapshot, SessionError> {
        let mut session = self.session();
        session.set_max_distance(max_distance_km)?;
        Ok(session.snapshot())
    }

    pub fn clear_search(&self) -> Snapshot {
        let mut session = self.session();
        session.clear_search();
        session.snapshot()
    }

    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Snapshot {
        let request = self.session().begin_search(query);
        let Some(request) = request else {
            return self.snapshot();
        };

        let ranked =
            provider::search_or_empty(self.provider.as_ref(), &request.query, &request.candidates)
                .await;
        info!(results = ranked.len(), "search ranked");

        let mut session = self.session();
        session.finish_search(request.token, ranked);
        session.snapshot()
    }

    #[instrument(skip(self))]
    pub async fn set_for_you(&self, enabled: bool) -> Snapshot {
        let request = self.session().set_personalized(enabled);
        match request {
            Some(request) => self.run_recommendations(request).await,
            None => self.snapshot(),
        }
    }

    async fn run_recommendations(&self, request: RecommendRequest) -> Snapshot {
        let ranked = provider::recommend_or_empty(
            self.provider.as_ref(),
            &request.profile,
            &request.candidates,
        )
        .await;
        info!(
            results = ranked.len(),
            cold_start = request.profile.is_cold_start(),
            "recommendations ranked"
        );

        let mut session = self.session();
        session.finish_recommend(request.token, ranked);
        session.snapshot()
    }

    /// Toggles a like, persists the preferences, and refreshes "for you".
    #[instrument(skip(self))]
    pub async fn toggle_like(&self, event_id: &str) -> Result<UserPreferences, SessionError> {
        // Saved under the session lock so overlapping toggles reach the store in order.
        let (prefs, refresh) = {
            let mut session = self.session();
            let refresh = session.toggle_like(event_id)?;
            let prefs = session.preferences().clone();
            if let Err(err) = self.store.save(&prefs) {
                warn!("failed to persist preferences: {err}");
            }
            (prefs, refresh)
        };

        if let Some(request) = refresh {
            self.run_recommendations(request).await;
        }
        Ok(prefs)
    }

    pub fn report_location(&self, report: LocationReport) -> Snapshot {
        let mut session = self.session();
        if session.resolve_location(report, self.fallback_location) {
            if let Some(origin) = session.reference_location() {
                info!(lat = origin.lat, lng = origin.lng, "reference location set");
            }
        }
        session.snapshot()
    }

    /// Interprets free text into a previewed event. `None` leaves any earlier
    /// preview untouched.
    #[instrument(skip(self, text), fields(len = text.len()))]
    pub async fn draft_event(&self, text: &str) -> Option<LocalEvent> {
        if text.trim().is_empty() {
            return None;
        }
        let draft = provider::draft_or_none(self.provider.as_ref(), text).await?;
        Some(self.session().preview_draft(draft, Utc::now()))
    }

    pub fn discard_draft(&self) {
        self.session().discard_draft();
    }

    pub fn commit_draft(&self, edits: DraftEdits) -> Result<LocalEvent, SessionError> {
        let event = self.session().commit_draft(edits)?;
        info!(id = %event.id, title = %event.title, "event added");
        Ok(event)
    }
}
