use std::collections::HashMap;

use serde::Serialize;

use crate::models::LocalEvent;

/// Which filter regime is active. Derived from session state, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Trending,
    SearchResults,
    Recommended,
}

/// Produces the visible event sequence.
///
/// An id filter keeps only listed events and orders them by their first
/// position in the filter; unknown and repeated ids are ignored. A distance
/// threshold then drops events without a computed distance or farther than
/// the threshold, never reordering.
pub fn compute_displayed<'a>(
    events: &'a [LocalEvent],
    id_filter: Option<&[String]>,
    max_distance_km: Option<f64>,
) -> Vec<&'a LocalEvent> {
    let mut result: Vec<&LocalEvent> = match id_filter {
        Some(ids) => {
            let mut rank: HashMap<&str, usize> = HashMap::with_capacity(ids.len());
            for (position, id) in ids.iter().enumerate() {
                rank.entry(id.as_str()).or_insert(position);
            }
            let mut kept: Vec<(usize, &LocalEvent)> = events
                .iter()
                .filter_map(|event| rank.get(event.id.as_str()).map(|pos| (*pos, event)))
                .collect();
            kept.sort_by_key(|(position, _)| *position);
            kept.into_iter().map(|(_, event)| event).collect()
        }
        None => events.iter().collect(),
    };

    if let Some(max) = max_distance_km {
        result.retain(|event| matches!(event.distance, Some(km) if km <= max));
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::seed_events;

    fn catalog(ids: &[(&str, Option<f64>)]) -> Vec<LocalEvent> {
        let template = seed_events().remove(0);
        ids.iter()
            .map(|(id, distance)| LocalEvent {
                id: id.to_string(),
                distance: *distance,
                ..template.clone()
            })
            .collect()
    }

    fn ids(events: &[&LocalEvent]) -> Vec<String> {
        events.iter().map(|e| e.id.clone()).collect()
    }

    fn filter(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    #[test]
    fn no_filters_keeps_natural_order() {
        let events = catalog(&[("a", None), ("b", Some(3.0)), ("c", None)]);
        assert_eq!(ids(&compute_displayed(&events, None, None)), vec!["a", "b", "c"]);
    }

    #[test]
    fn id_filter_dictates_order_and_membership() {
        let events = catalog(&[("a", None), ("b", None), ("c", None)]);
        let wanted = filter(&["c", "a"]);
        assert_eq!(
            ids(&compute_displayed(&events, Some(wanted.as_slice()), None)),
            vec!["c", "a"]
        );
    }

    #[test]
    fn unknown_and_duplicate_ids_are_tolerated() {
        let events = catalog(&[("a", None), ("b", None)]);
        let wanted = filter(&["ghost", "b", "a", "b"]);
        assert_eq!(
            ids(&compute_displayed(&events, Some(wanted.as_slice()), None)),
            vec!["b", "a"]
        );
    }

    #[test]
    fn empty_filter_shows_nothing() {
        let events = catalog(&[("a", None)]);
        assert!(compute_displayed(&events, Some(&[][..]), None).is_empty());
    }

    #[test]
    fn distance_excludes_unknown_even_when_filtered_in() {
        let events = catalog(&[("a", None), ("b", Some(4.0)), ("c", Some(10.0)), ("d", Some(10.5))]);
        let wanted = filter(&["d", "c", "b", "a"]);
        assert_eq!(
            ids(&compute_displayed(&events, Some(wanted.as_slice()), Some(10.0))),
            vec!["c", "b"]
        );
    }

    #[test]
    fn distance_alone_never_reorders() {
        let events = catalog(&[("far", Some(9.0)), ("x", Some(50.0)), ("near", Some(1.0))]);
        assert_eq!(
            ids(&compute_displayed(&events, None, Some(10.0))),
            vec!["far", "near"]
        );
    }
}
