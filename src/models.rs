use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventCategory {
    #[serde(rename = "Music")]
    Music,
    #[serde(rename = "Food & Drink")]
    Food,
    #[serde(rename = "Arts & Culture")]
    Art,
    #[serde(rename = "Sports")]
    Sports,
    #[serde(rename = "Community")]
    Community,
    #[serde(rename = "Technology")]
    Tech,
    #[serde(rename = "Nightlife")]
    Nightlife,
    #[serde(rename = "Outdoors")]
    Outdoors,
}

impl EventCategory {
    pub const ALL: [EventCategory; 8] = [
        EventCategory::Music,
        EventCategory::Food,
        EventCategory::Art,
        EventCategory::Sports,
        EventCategory::Community,
        EventCategory::Tech,
        EventCategory::Nightlife,
        EventCategory::Outdoors,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            EventCategory::Music => "Music",
            EventCategory::Food => "Food & Drink",
            EventCategory::Art => "Arts & Culture",
            EventCategory::Sports => "Sports",
            EventCategory::Community => "Community",
            EventCategory::Tech => "Technology",
            EventCategory::Nightlife => "Nightlife",
            EventCategory::Outdoors => "Outdoors",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL
            .into_iter()
            .find(|category| category.label().eq_ignore_ascii_case(label))
    }
}

impl fmt::Display for EventCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LocalEvent {
    pub id: String,
    pub title: String,
    pub description: String,
    pub date: DateTime<Utc>,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinate>,
    pub category: EventCategory,
    pub image_url: String,
    pub attendees: u32,
    pub rating: f32, // 0.0 - 5.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>, // km from the reference location
    pub tags: Vec<String>,
}

/// Structured draft extracted from a free-text event description.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub category: EventCategory,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_time: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserPreferences {
    pub liked_event_ids: Vec<String>,
    pub liked_categories: BTreeMap<EventCategory, u32>,
}

// Liked ids compare as a set; a missing category counts as zero.
impl PartialEq for UserPreferences {
    fn eq(&self, other: &Self) -> bool {
        let ids = |prefs: &Self| prefs.liked_event_ids.iter().cloned().collect::<BTreeSet<_>>();
        ids(self) == ids(other)
            && EventCategory::ALL.iter().all(|category| {
                self.liked_categories.get(category).copied().unwrap_or(0)
                    == other.liked_categories.get(category).copied().unwrap_or(0)
            })
    }
}

/// Projection of an event sent to the provider for query search.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SearchCandidate {
    pub id: String,
    pub title: String,
    pub description: String,
    pub tags: String,
    pub category: EventCategory,
    pub date: DateTime<Utc>,
}

/// Projection of an event sent to the provider for recommendations.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct RecommendCandidate {
    pub id: String,
    pub title: String,
    pub category: EventCategory,
    pub tags: String,
    pub distance: String,
}

impl From<&LocalEvent> for SearchCandidate {
    fn from(event: &LocalEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description: event.description.clone(),
            tags: event.tags.join(", "),
            category: event.category,
            date: event.date,
        }
    }
}

impl From<&LocalEvent> for RecommendCandidate {
    fn from(event: &LocalEvent) -> Self {
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            category: event.category,
            tags: event.tags.join(", "),
            distance: distance_label(event.distance),
        }
    }
}

/// Renders a distance for prompts. A measured `0.0` shows as "0.0km"; only a
/// missing distance is "Unknown", unlike a falsy check that would hide an
/// event at the user's own position.
pub fn distance_label(distance: Option<f64>) -> String {
    match distance {
        Some(km) => format!("{km:.1}km"),
        None => "Unknown".to_string(),
    }
}
