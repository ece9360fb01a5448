//! Collection-event filtering for the harvest monitor.
//!
//! Filtering is stateless: callers re-run it for every query and cache the
//! result themselves if they need to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::model::{CollectionEvent, ComplianceStatus};

/// Sentinel accepted by both filter parameters to disable that predicate.
pub const ALL: &str = "all";

/// Compliance-status predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusQuery {
    #[default]
    All,
    Only(ComplianceStatus),
}

impl StatusQuery {
    pub fn matches(&self, status: ComplianceStatus) -> bool {
        match self {
            StatusQuery::All => true,
            StatusQuery::Only(wanted) => *wanted == status,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown status '{}' (expected all, compliant, violation or pending)",
            self.0
        )
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for StatusQuery {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ALL => Ok(StatusQuery::All),
            "compliant" => Ok(StatusQuery::Only(ComplianceStatus::Compliant)),
            "violation" => Ok(StatusQuery::Only(ComplianceStatus::Violation)),
            "pending" => Ok(StatusQuery::Only(ComplianceStatus::Pending)),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for StatusQuery {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Select events matching both a species and a status query, in input order.
///
/// `species` is `"all"` or a case-sensitive substring of the species field,
/// so "Ashwagandha" matches "Ashwagandha (Withania somnifera)".
pub fn filter_events<'a>(
    events: impl IntoIterator<Item = &'a CollectionEvent>,
    species: &str,
    status: StatusQuery,
) -> Vec<&'a CollectionEvent> {
    events
        .into_iter()
        .filter(|e| species == ALL || e.species.contains(species))
        .filter(|e| status.matches(e.compliance_status))
        .collect()
}

/// Query parameters for GET /events.
#[derive(Debug, Clone, Deserialize)]
pub struct EventQuery {
    #[serde(default = "default_species")]
    pub species: String,

    #[serde(default)]
    pub status: StatusQuery,
}

fn default_species() -> String {
    ALL.to_string()
}

impl Default for EventQuery {
    fn default() -> Self {
        Self {
            species: default_species(),
            status: StatusQuery::All,
        }
    }
}

impl EventQuery {
    pub fn apply<'a>(&self, events: &'a [CollectionEvent]) -> Vec<&'a CollectionEvent> {
        filter_events(events, &self.species, self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::fixtures;

    fn events() -> Vec<CollectionEvent> {
        Dataset::from_raw(fixtures::raw_dataset()).collection_events
    }

    fn ids(events: &[&CollectionEvent]) -> Vec<String> {
        events.iter().map(|e| e.id.clone()).collect()
    }

    #[test]
    fn test_all_all_is_identity() {
        let events = events();

        let filtered = filter_events(&events, ALL, StatusQuery::All);

        assert_eq!(filtered.len(), events.len());
        assert!(filtered.iter().zip(&events).all(|(a, b)| *a == b));
    }

    #[test]
    fn test_species_substring_match() {
        let events = events();

        assert_eq!(ids(&filter_events(&events, "Turmeric", StatusQuery::All)), ["ce-002"]);
        assert_eq!(ids(&filter_events(&events, "Ashwagandha", StatusQuery::All)), ["ce-001"]);
        assert_eq!(ids(&filter_events(&events, "Withania", StatusQuery::All)), ["ce-001"]);
        assert!(filter_events(&events, "Neem", StatusQuery::All).is_empty());
    }

    #[test]
    fn test_species_match_is_case_sensitive() {
        let events = events();
        assert!(filter_events(&events, "turmeric", StatusQuery::All).is_empty());
    }

    #[test]
    fn test_status_match() {
        let events = events();

        let compliant = filter_events(
            &events,
            ALL,
            StatusQuery::Only(ComplianceStatus::Compliant),
        );
        assert_eq!(ids(&compliant), ["ce-001"]);

        let pending = filter_events(&events, ALL, StatusQuery::Only(ComplianceStatus::Pending));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_predicates_are_anded() {
        let events = events();

        let none = filter_events(
            &events,
            "Turmeric",
            StatusQuery::Only(ComplianceStatus::Compliant),
        );
        assert!(none.is_empty());

        let one = filter_events(
            &events,
            "Turmeric",
            StatusQuery::Only(ComplianceStatus::Violation),
        );
        assert_eq!(ids(&one), ["ce-002"]);
    }

    #[test]
    fn test_filter_is_idempotent_and_order_preserving() {
        let mut events = events();
        for i in 0..6 {
            let mut extra = events[i % 2].clone();
            extra.id = format!("ce-extra-{}", i);
            events.push(extra);
        }
        let status = StatusQuery::Only(ComplianceStatus::Violation);

        let once = filter_events(&events, "Turmeric", status);
        let twice = filter_events(once.iter().copied(), "Turmeric", status);

        assert_eq!(ids(&once), ids(&twice));
        assert_eq!(ids(&once), ["ce-002", "ce-extra-1", "ce-extra-3", "ce-extra-5"]);
    }

    #[test]
    fn test_status_query_parsing() {
        assert_eq!("all".parse::<StatusQuery>(), Ok(StatusQuery::All));
        assert_eq!(
            "violation".parse::<StatusQuery>(),
            Ok(StatusQuery::Only(ComplianceStatus::Violation))
        );
        assert!("Compliant".parse::<StatusQuery>().is_err());
    }

    #[test]
    fn test_event_query_defaults() {
        let query: EventQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.species, "all");
        assert_eq!(query.status, StatusQuery::All);
        assert_eq!(query.apply(&events()).len(), 2);
    }
}
