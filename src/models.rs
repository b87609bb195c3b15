//! Resource records and request payloads for the events backend

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type Id = u64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Id,
    #[serde(default)]
    pub user: Option<User>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub full_name: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// URL of the uploaded picture
    #[serde(default)]
    pub profile_picture: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The signed-in user together with their profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub user: User,
    #[serde(default)]
    pub profile: Option<Profile>,
}

/// Registration form fields
#[derive(Debug, Clone, Default, Serialize)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password: String,
    /// Confirmation; the backend rejects the request if it differs from `password`
    pub password2: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Id,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub organizer: Option<User>,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Number of "going" RSVPs
    #[serde(default)]
    pub rsvp_count: u64,
    /// The caller's own RSVP, if signed in and responded
    #[serde(default)]
    pub user_rsvp_status: Option<RsvpStatus>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub invited_users: Vec<Id>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub is_public: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub invited_users: Vec<Id>,
}

/// Partial update; only the fields that are set are sent
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EventUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_public: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub invited_users: Option<Vec<Id>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RsvpStatus {
    Going,
    Maybe,
    NotGoing,
}

impl RsvpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RsvpStatus::Going => "going",
            RsvpStatus::Maybe => "maybe",
            RsvpStatus::NotGoing => "not_going",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rsvp {
    pub id: Id,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default)]
    pub user: Option<User>,
    pub status: RsvpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RsvpUpdate {
    pub status: RsvpStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Id,
    #[serde(default)]
    pub event: Option<Event>,
    #[serde(default)]
    pub user: Option<User>,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rating must be 1..=5; the backend enforces the range
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewReview {
    pub rating: u8,
    pub comment: String,
}

impl NewReview {
    pub fn new(rating: u8, comment: impl Into<String>) -> Self {
        Self {
            rating,
            comment: comment.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReviewUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Query parameters accepted by the event list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilters {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    /// Full-text match on title, description and location
    pub search: Option<String>,
    pub is_public: Option<bool>,
    pub location: Option<String>,
    pub organizer: Option<Id>,
    /// `start_time`, `created_at` or `title`, prefixed with `-` for descending
    pub ordering: Option<String>,
}

impl EventFilters {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            ..Self::default()
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = PageFilters {
            page: self.page,
            page_size: self.page_size,
        }
        .query_pairs();
        if let Some(search) = self.search.as_ref().filter(|s| !s.is_empty()) {
            pairs.push(("search", search.clone()));
        }
        if let Some(is_public) = self.is_public {
            pairs.push(("is_public", is_public.to_string()));
        }
        if let Some(location) = &self.location {
            pairs.push(("location", location.clone()));
        }
        if let Some(organizer) = self.organizer {
            pairs.push(("organizer", organizer.to_string()));
        }
        if let Some(ordering) = &self.ordering {
            pairs.push(("ordering", ordering.clone()));
        }
        pairs
    }
}

/// Plain pagination parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageFilters {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl PageFilters {
    pub fn page(page: u32) -> Self {
        Self {
            page: Some(page),
            page_size: None,
        }
    }

    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(page_size) = self.page_size {
            pairs.push(("page_size", page_size.to_string()));
        }
        pairs
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewFilters {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub event_id: Option<Id>,
}

impl ReviewFilters {
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = PageFilters {
            page: self.page,
            page_size: self.page_size,
        }
        .query_pairs();
        if let Some(event_id) = self.event_id {
            pairs.push(("event_id", event_id.to_string()));
        }
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_filters_query() {
        assert_eq!(EventFilters::page(2).query_pairs(), vec![("page", "2".to_string())]);
        assert!(EventFilters::default().query_pairs().is_empty());

        let filters = EventFilters {
            page: Some(1),
            search: Some("rust meetup".to_string()),
            is_public: Some(true),
            ordering: Some("-start_time".to_string()),
            ..Default::default()
        };
        assert_eq!(
            filters.query_pairs(),
            vec![
                ("page", "1".to_string()),
                ("search", "rust meetup".to_string()),
                ("is_public", "true".to_string()),
                ("ordering", "-start_time".to_string()),
            ]
        );
    }

    #[test]
    fn test_empty_search_is_omitted() {
        let filters = EventFilters {
            search: Some(String::new()),
            ..Default::default()
        };
        assert!(filters.query_pairs().is_empty());
    }

    #[test]
    fn test_event_update_sends_only_set_fields() {
        let update = EventUpdate {
            title: Some("Renamed".to_string()),
            is_public: Some(false),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({"title": "Renamed", "is_public": false})
        );
    }

    #[test]
    fn test_rsvp_status_wire_names() {
        assert_eq!(serde_json::to_value(RsvpStatus::NotGoing).unwrap(), json!("not_going"));
        let status: RsvpStatus = serde_json::from_value(json!("maybe")).unwrap();
        assert_eq!(status, RsvpStatus::Maybe);
        assert_eq!(RsvpStatus::Going.as_str(), "going");
        assert!(serde_json::from_value::<RsvpStatus>(json!("attending")).is_err());
    }

    #[test]
    fn test_event_decodes_backend_payload() {
        let event: Event = serde_json::from_value(json!({
            "id": 7,
            "title": "Rust meetup",
            "description": "Talks and pizza",
            "organizer": {"id": 1, "username": "ana", "email": "ana@example.com",
                          "first_name": "Ana", "last_name": "Lopez"},
            "location": "Berlin",
            "start_time": "2026-11-01T18:00:00Z",
            "end_time": "2026-11-01T21:00:00Z",
            "is_public": true,
            "created_at": "2026-10-01T09:00:00Z",
            "updated_at": "2026-10-02T09:00:00.123456Z",
            "rsvp_count": 12,
            "user_rsvp_status": "going",
            "average_rating": null,
            "invited_users": []
        }))
        .unwrap();

        assert_eq!(event.id, 7);
        assert_eq!(event.organizer.unwrap().username, "ana");
        assert_eq!(event.user_rsvp_status, Some(RsvpStatus::Going));
        assert!(event.average_rating.is_none());
        assert!(event.end_time > event.start_time);
    }
}
