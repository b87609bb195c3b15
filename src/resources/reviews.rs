use crate::api_client::ApiClient;
use crate::error::Result;
use crate::models::{Id, Review, ReviewFilters, ReviewUpdate};
use crate::transport::Transport;
use crate::types::Page;

/// Reviews across all events. New reviews are added through
/// [`EventsApi::add_review`](crate::resources::EventsApi::add_review).
pub struct ReviewsApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ReviewsApi<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn list(&self, filters: &ReviewFilters) -> Result<Page<Review>> {
        self.client.get("/reviews/", &filters.query_pairs()).await
    }

    pub async fn get(&self, id: Id) -> Result<Review> {
        self.client.get(&format!("/reviews/{id}/"), &[]).await
    }

    pub async fn update(&self, id: Id, update: &ReviewUpdate) -> Result<Review> {
        self.client.patch(&format!("/reviews/{id}/"), update).await
    }

    pub async fn delete(&self, id: Id) -> Result<()> {
        self.client.delete(&format!("/reviews/{id}/")).await
    }
}
