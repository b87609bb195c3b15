//! Event API Client
//!
//! A Rust client library for the events backend (events, RSVPs, reviews,
//! profiles), with bearer-token authentication and automatic
//! refresh-and-retry when an access token is rejected.

pub mod api_client;
pub mod error;
pub mod models;
pub mod resources;
pub mod token_store;
pub mod transport;
pub mod types;

pub use api_client::{ApiClient, ClientConfig, SessionEvent};
pub use error::{ApiError, ClientError, Result};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore};
pub use transport::{ApiRequest, ApiResponse, ReqwestTransport, Transport};
pub use types::{CredentialPair, LoginCredentials, Page, TokenKind};
