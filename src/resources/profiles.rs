use crate::api_client::ApiClient;
use crate::error::Result;
use crate::models::{Id, Profile, ProfileUpdate};
use crate::transport::Transport;

/// User profiles; non-staff users only see their own
pub struct ProfilesApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> ProfilesApi<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Profile>> {
        self.client.get("/profiles/", &[]).await
    }

    pub async fn get(&self, id: Id) -> Result<Profile> {
        self.client.get(&format!("/profiles/{id}/"), &[]).await
    }

    pub async fn update(&self, id: Id, update: &ProfileUpdate) -> Result<Profile> {
        self.client.patch(&format!("/profiles/{id}/"), update).await
    }
}
