use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};

use crate::geo;
use crate::models::{
    Coordinate, EventCategory, LocalEvent, RecommendCandidate, SearchCandidate,
};

/// In-memory event list in natural (display) order.
#[derive(Debug, Clone, Default)]
pub struct EventCatalog {
    events: Vec<LocalEvent>,
}

impl EventCatalog {
    pub fn new(events: Vec<LocalEvent>) -> Self {
        Self { events }
    }

    pub fn seeded() -> Self {
        Self::new(seed_events())
    }

    pub fn events(&self) -> &[LocalEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LocalEvent> {
        self.events.iter().find(|event| event.id == id)
    }

    /// User submissions go to the front of the list.
    pub fn prepend(&mut self, event: LocalEvent) {
        self.events.insert(0, event);
    }

    /// Attaches `distance` to every event that has coordinates.
    pub fn apply_reference_location(&mut self, origin: Coordinate) {
        for event in &mut self.events {
            if let Some(coordinates) = event.coordinates {
                event.distance = Some(geo::distance_km(origin, coordinates));
            }
        }
    }

    pub fn search_candidates(&self) -> Vec<SearchCandidate> {
        self.events.iter().map(SearchCandidate::from).collect()
    }

    pub fn recommend_candidates(&self) -> Vec<RecommendCandidate> {
        self.events.iter().map(RecommendCandidate::from).collect()
    }

    /// Titles of liked events, in catalog order.
    pub fn titles_of(&self, ids: &[String]) -> Vec<String> {
        self.events
            .iter()
            .filter(|event| ids.iter().any(|id| id == &event.id))
            .map(|event| event.title.clone())
            .collect()
    }
}

pub fn new_event_id(title: &str, created_at: DateTime<Utc>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(title.as_bytes());
    hasher.update(b"|");
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher.update(b"|");
    hasher.update(created_at.timestamp_nanos_opt().unwrap_or_default().to_le_bytes());
    let digest = format!("{:x}", hasher.finalize());
    digest[..16].to_string()
}

pub fn placeholder_image(seed: &str) -> String {
    format!("https://picsum.photos/800/600?random={seed}")
}

pub fn seed_events() -> Vec<LocalEvent> {
    let now = Utc::now();
    vec![
        seed_event(
            "1",
            10,
            "Harare Jazz Festival",
            "A vibrant celebration of jazz in the capital featuring Oliver Mtukudzi tribute bands and rising afro-jazz stars.",
            now + Duration::days(2),
            "Harare Gardens",
            EventCategory::Music,
            (1200, 4.9),
            &["jazz", "afro-jazz", "live music", "outdoor"],
            Coordinate::new(-17.8249, 31.0498),
        ),
        seed_event(
            "2",
            11,
            "Bulawayo Arts & Crafts Fair",
            "Discover unique handmade crafts, stone sculptures, and basketry from local artisans in the City of Kings.",
            now + Duration::days(5),
            "Bulawayo City Hall",
            EventCategory::Art,
            (450, 4.6),
            &["arts", "crafts", "culture", "family"],
            Coordinate::new(-20.1559, 28.5813),
        ),
        seed_event(
            "3",
            12,
            "Zim Tech Innovation Summit",
            "A gathering of Zimbabwe's brightest minds in fintech, agritech, and software development. Networking and pitch sessions.",
            now + Duration::days(1),
            "Rainbow Towers, Harare",
            EventCategory::Tech,
            (300, 4.5),
            &["tech", "startups", "innovation", "business"],
            Coordinate::new(-17.8318, 31.0335),
        ),
        seed_event(
            "4",
            13,
            "Victoria Falls Sunset Cruise",
            "Relax on the Zambezi River with drinks and snacks while watching hippos and elephants as the sun goes down.",
            now + Duration::days(3),
            "Zambezi River, Vic Falls",
            EventCategory::Outdoors,
            (80, 4.8),
            &["cruise", "wildlife", "sunset", "tourism"],
            Coordinate::new(-17.9244, 25.8567),
        ),
        seed_event(
            "5",
            14,
            "Traditional Food Festival",
            "Experience the authentic taste of Zimbabwe. Sadza, roadrunner, madora, and mazhanje on the menu.",
            now + Duration::days(6),
            "Mukuvisi Woodlands",
            EventCategory::Food,
            (600, 4.7),
            &["food", "traditional", "culture", "outdoors"],
            Coordinate::new(-17.8509, 31.0874),
        ),
        seed_event(
            "6",
            15,
            "Kariba Houseboat Party",
            "A weekend getaway on Lake Kariba. Fishing, music, and good vibes under the stars.",
            now + Duration::days(10),
            "Lake Kariba",
            EventCategory::Nightlife,
            (40, 4.9),
            &["party", "travel", "fishing", "weekend"],
            Coordinate::new(-16.5333, 28.8000),
        ),
    ]
}

fn seed_event(
    id: &str,
    image_seed: u32,
    title: &str,
    description: &str,
    date: DateTime<Utc>,
    location: &str,
    category: EventCategory,
    (attendees, rating): (u32, f32),
    tags: &[&str],
    coordinates: Coordinate,
) -> LocalEvent {
    LocalEvent {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        date,
        location: location.to_string(),
        coordinates: Some(coordinates),
        category,
        image_url: placeholder_image(&image_seed.to_string()),
        attendees,
        rating,
        distance: None,
        tags: tags.iter().map(|tag| tag.to_string()).collect(),
    }
}
