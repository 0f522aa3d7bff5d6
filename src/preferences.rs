use std::sync::Mutex;

use thiserror::Error;
use tracing::warn;

use crate::db::Store;
use crate::models::{EventCategory, LocalEvent, UserPreferences};

pub const PREFERENCES_KEY: &str = "localPulse_prefs";

#[derive(Debug, Error)]
pub enum PreferenceStoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("preference store lock poisoned")]
    Poisoned,
}

impl UserPreferences {
    pub fn is_liked(&self, event_id: &str) -> bool {
        self.liked_event_ids.iter().any(|id| id == event_id)
    }

    pub fn category_count(&self, category: EventCategory) -> u32 {
        self.liked_categories.get(&category).copied().unwrap_or(0)
    }

    /// Categories with at least one like, ordered by count, highest first.
    /// Ties are ordered by category name.
    pub fn top_categories(&self, limit: usize) -> Vec<EventCategory> {
        let mut ranked: Vec<(EventCategory, u32)> = self
            .liked_categories
            .iter()
            .filter(|(_, count)| **count > 0)
            .map(|(category, count)| (*category, *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
        ranked
            .into_iter()
            .take(limit)
            .map(|(category, _)| category)
            .collect()
    }
}

/// Returns the preferences with `event` liked or unliked.
///
/// Unliking decrements the category tally floored at zero. The tally is keyed
/// on the category the event has at toggle time, so it drifts if an event is
/// recategorised between like and unlike.
pub fn toggle_like(prefs: &UserPreferences, event: &LocalEvent) -> UserPreferences {
    let mut next = prefs.clone();
    let count = next.liked_categories.entry(event.category).or_insert(0);

    if prefs.is_liked(&event.id) {
        next.liked_event_ids.retain(|id| id != &event.id);
        *count = count.saturating_sub(1);
    } else {
        next.liked_event_ids.push(event.id.clone());
        *count += 1;
    }

    next
}

/// Preferences kept under a single key and rewritten on every change.
pub struct PreferenceStore {
    store: Mutex<Store>,
}

impl PreferenceStore {
    pub fn new(store: Store) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    /// Absent or unreadable state yields the default preferences.
    pub fn load(&self) -> UserPreferences {
        let raw = match self.store.lock() {
            Ok(store) => store.get(PREFERENCES_KEY),
            Err(_) => {
                warn!("preference store lock poisoned, using defaults");
                return UserPreferences::default();
            }
        };

        match raw {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|err| {
                warn!("stored preferences are corrupt, using defaults: {err}");
                UserPreferences::default()
            }),
            Ok(None) => UserPreferences::default(),
            Err(err) => {
                warn!("failed to read stored preferences, using defaults: {err}");
                UserPreferences::default()
            }
        }
    }

    pub fn save(&self, prefs: &UserPreferences) -> Result<(), PreferenceStoreError> {
        let json = serde_json::to_string(prefs)?;
        let store = self
            .store
            .lock()
            .map_err(|_| PreferenceStoreError::Poisoned)?;
        store.put(PREFERENCES_KEY, &json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_events;

    fn event(id: &str, category: EventCategory) -> LocalEvent {
        let mut event = seed_events().remove(0);
        event.id = id.to_string();
        event.category = category;
        event
    }

    #[test]
    fn like_adds_id_and_counts_category() {
        let prefs = UserPreferences::default();
        let liked = toggle_like(&prefs, &event("a", EventCategory::Music));
        assert_eq!(liked.liked_event_ids, vec!["a".to_string()]);
        assert_eq!(liked.category_count(EventCategory::Music), 1);
        // input untouched
        assert!(prefs.liked_event_ids.is_empty());
    }

    #[test]
    fn toggle_twice_restores_original() {
        let music = event("a", EventCategory::Music);
        let start = toggle_like(&UserPreferences::default(), &event("b", EventCategory::Music));

        let twice = toggle_like(&toggle_like(&start, &music), &music);
        assert_eq!(twice, start);
    }

    #[test]
    fn unlike_floors_category_at_zero() {
        let mut prefs = UserPreferences::default();
        prefs.liked_event_ids.push("a".into());
        // liked but the tally was never recorded
        let unliked = toggle_like(&prefs, &event("a", EventCategory::Sports));
        assert!(unliked.liked_event_ids.is_empty());
        assert_eq!(unliked.category_count(EventCategory::Sports), 0);
    }

    #[test]
    fn category_change_after_like_drifts_tally() {
        let liked = toggle_like(&UserPreferences::default(), &event("a", EventCategory::Music));
        let unliked = toggle_like(&liked, &event("a", EventCategory::Art));

        // accepted drift: Music keeps its count, Art floors at zero
        assert_eq!(unliked.category_count(EventCategory::Music), 1);
        assert_eq!(unliked.category_count(EventCategory::Art), 0);
        assert!(unliked.liked_event_ids.is_empty());
    }

    #[test]
    fn top_categories_orders_by_count() {
        let mut prefs = UserPreferences::default();
        prefs.liked_categories.insert(EventCategory::Music, 1);
        prefs.liked_categories.insert(EventCategory::Tech, 4);
        prefs.liked_categories.insert(EventCategory::Food, 2);
        prefs.liked_categories.insert(EventCategory::Outdoors, 0);

        assert_eq!(
            prefs.top_categories(3),
            vec![EventCategory::Tech, EventCategory::Food, EventCategory::Music]
        );
    }

    #[test]
    fn top_categories_break_ties_by_name() {
        let mut prefs = UserPreferences::default();
        prefs.liked_categories.insert(EventCategory::Music, 1);
        prefs.liked_categories.insert(EventCategory::Art, 1);
        prefs.liked_categories.insert(EventCategory::Sports, 2);
        prefs.liked_categories.insert(EventCategory::Community, 1);

        assert_eq!(
            prefs.top_categories(3),
            vec![EventCategory::Sports, EventCategory::Art, EventCategory::Community]
        );
        assert_eq!(prefs.top_categories(10).last(), Some(&EventCategory::Music));
    }

    #[test]
    fn store_round_trips_and_defaults_on_corruption() {
        let store = PreferenceStore::new(Store::open_in_memory().unwrap());
        assert_eq!(store.load(), UserPreferences::default());

        let prefs = toggle_like(&UserPreferences::default(), &event("1", EventCategory::Music));
        store.save(&prefs).unwrap();
        assert_eq!(store.load(), prefs);

        store
            .store
            .lock()
            .unwrap()
            .put(PREFERENCES_KEY, "{not json")
            .unwrap();
        assert_eq!(store.load(), UserPreferences::default());
    }

    #[test]
    fn reads_camel_case_storage_shape() {
        let store = PreferenceStore::new(Store::open_in_memory().unwrap());
        store
            .store
            .lock()
            .unwrap()
            .put(
                PREFERENCES_KEY,
                r#"{"likedEventIds":["3"],"likedCategories":{"Technology":1}}"#,
            )
            .unwrap();
        let prefs = store.load();
        assert!(prefs.is_liked("3"));
        assert_eq!(prefs.category_count(EventCategory::Tech), 1);
    }
}
