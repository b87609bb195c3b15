use crate::api_client::{ApiClient, SessionEvent};
use crate::error::Result;
use crate::models::{Account, NewAccount, User};
use crate::transport::Transport;
use crate::types::{CredentialPair, LoginCredentials, LoginResponse};
use serde::Deserialize;
use tracing::info;

#[derive(Debug, Deserialize)]
struct RegisterResponse {
    user: User,
    /// Only present when the backend logs the new account in directly
    #[serde(default)]
    access: Option<String>,
    #[serde(default)]
    refresh: Option<String>,
}

/// Registration, login and the current session
pub struct AuthApi<'a, T> {
    client: &'a ApiClient<T>,
}

impl<'a, T: Transport> AuthApi<'a, T> {
    pub(crate) fn new(client: &'a ApiClient<T>) -> Self {
        Self { client }
    }

    /// Create an account. Tokens are stored only if the backend returns them.
    pub async fn register(&self, account: &NewAccount) -> Result<Account> {
        let registered: RegisterResponse = self.client.post("/auth/register/", account).await?;
        info!(username = %registered.user.username, "Account registered");

        if let (Some(access_token), Some(refresh_token)) = (registered.access, registered.refresh) {
            self.client.token_store().store_pair(&CredentialPair {
                access_token,
                refresh_token,
            })?;
            self.client.notify(SessionEvent::LoggedIn);
        }

        Ok(Account {
            user: registered.user,
            profile: None,
        })
    }

    /// Log in and store the returned credential pair
    ///
    /// Sent without a bearer token; a 401 means bad credentials and is
    /// returned without a refresh.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<CredentialPair> {
        let response: LoginResponse = self.client.exchange("/auth/login/", credentials).await?;
        let pair = CredentialPair {
            access_token: response.access,
            refresh_token: response.refresh,
        };

        self.client.token_store().store_pair(&pair)?;
        info!(username = %credentials.username, "Logged in");
        self.client.notify(SessionEvent::LoggedIn);

        Ok(pair)
    }

    pub async fn current_user(&self) -> Result<Account> {
        self.client.get("/auth/me/", &[]).await
    }

    /// Clear the stored credentials; no network call
    pub fn logout(&self) -> Result<()> {
        self.client.logout()
    }
}
