use crate::api_client::ApiClient;
use crate::error::Result;
use crate::models::{
    Event, EventFilters, EventUpdate, Id, NewEvent, NewReview, PageFilters, Review, Rsvp,
    RsvpStatus, RsvpUpdate,
};
use crate::transport::Transport;
use crate::types::Page;

/// Events, plus the RSVP and review actions nested under an event
pub struct EventsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> EventsApi<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &EventFilters) -> Result<Page<Event>> {
        self.client.get("/events/", &filters.query_pairs()).await
    }

    pub async fn get(&self, id: Id) -> Result<Event> {
        self.client.get(&format!("/events/{id}/"), &[]).await
    }

    /// The backend sets the organizer to the signed-in user
    pub async fn create(&self, event: &NewEvent) -> Result<Event> {
        self.client.post("/events/", event).await
    }

    pub async fn update(&self, id: Id, update: &EventUpdate) -> Result<Event> {
        self.client.patch(&format!("/events/{id}/"), update).await
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        self.client.delete(&format!("/events/{id}/")).await
    }

    /// Create or replace the caller's RSVP for an event
    pub async fn rsvp(&self, event_id: Id, status: RsvpStatus) -> Result<Rsvp> {
        self.client
            .post(&format!("/events/{event_id}/rsvp/"), &RsvpUpdate { status })
            .await
    }

    pub async fn rsvps(&self, event_id: Id) -> Result<Vec<Rsvp>> {
        self.client.get(&format!("/events/{event_id}/rsvps/"), &[]).await
    }

    pub async fn add_review(&self, event_id: Id, review: &NewReview) -> Result<Review> {
        self.client
            .post(&format!("/events/{event_id}/review/"), review)
            .await
    }

    pub async fn reviews(&self, event_id: Id, filters: &PageFilters) -> Result<Page<Review>> {
        self.client
            .get(&format!("/events/{event_id}/reviews/"), &filters.query_pairs())
            .await
    }
}
