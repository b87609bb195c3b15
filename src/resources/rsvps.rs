use crate::api_client::ApiClient;
use crate::error::Result;
use crate::models::{Id, Rsvp, RsvpUpdate};
use crate::transport::Transport;

/// The caller's own RSVPs
pub struct RsvpsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> RsvpsApi<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Rsvp>> {
        self.client.get("/rsvps/", &[]).await
    }

    pub async fn get(&self, id: Id) -> Result<Rsvp> {
        self.client.get(&format!("/rsvps/{id}/"), &[]).await
    }

    pub async fn update(&self, id: Id, update: &RsvpUpdate) -> Result<Rsvp> {
        self.client.patch(&format!("/rsvps/{id}/"), update).await
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        self.client.delete(&format!("/rsvps/{id}/")).await
    }
}
