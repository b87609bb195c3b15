//! Type definitions for authentication and pagination

use serde::{Deserialize, Serialize};

/// Server-side page size for every paginated list endpoint
pub const PAGE_SIZE: u64 = 10;

/// Authentication tokens (access + refresh)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Which of the two stored credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Username/password pair sent to the login endpoint
#[derive(Debug, Clone, Serialize)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh: &'a str,
}

/// The refresh endpoint returns `refresh` only when the backend rotates it
#[derive(Debug, Deserialize)]
pub(crate) struct RefreshResponse {
    pub access: String,
    #[serde(default)]
    pub refresh: Option<String>,
}

/// One page of a paginated list endpoint
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Total number of pages at the server's fixed page size
    pub fn total_pages(&self) -> u64 {
        self.total_pages_for(PAGE_SIZE)
    }

    pub fn total_pages_for(&self, page_size: u64) -> u64 {
        if page_size == 0 {
            return 0;
        }
        self.count.div_ceil(page_size)
    }

    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}
