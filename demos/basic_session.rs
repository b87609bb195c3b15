//! Basic session example
//!
//! Usage:
//!   cargo run --example basic_session
//!
//! Environment:
//!   EVENT_API_BASE_URL   backend base URL (default http://localhost:8000/api)
//!   EVENT_API_USERNAME   account to log in with
//!   EVENT_API_PASSWORD
//!   EVENT_API_TOKEN_FILE where to keep tokens between runs

use event_api_client::models::{EventFilters, RsvpStatus};
use event_api_client::{
    ApiClient, ClientConfig, FileTokenStore, LoginCredentials, SessionEvent, TokenStore,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = ClientConfig::from_env()?;
    let token_file = std::env::var("EVENT_API_TOKEN_FILE")
        .unwrap_or_else(|_| ".event-api-tokens.json".to_string());

    println!("=== Event API Client Example ===");
    println!("Backend: {}", config.base_url);
    println!("Token file: {}", token_file);
    println!();

    let store = Arc::new(FileTokenStore::open(&token_file)?);
    let client = ApiClient::new(config, store.clone())?;

    // The router would do this: go back to the login page when the session ends
    let mut session_events = client.session_events();
    tokio::spawn(async move {
        while let Ok(event) = session_events.recv().await {
            if event == SessionEvent::Expired {
                println!("! Session expired, please log in again");
            }
        }
    });

    if store.credentials().is_none() {
        let username = std::env::var("EVENT_API_USERNAME").unwrap_or_else(|_| "demo".to_string());
        let password = std::env::var("EVENT_API_PASSWORD").unwrap_or_else(|_| "demo".to_string());

        println!("Logging in as {}...", username);
        client
            .auth()
            .login(&LoginCredentials::new(username, password))
            .await?;
        println!("✓ Logged in, tokens saved");
        println!();
    } else {
        println!("✓ Reusing stored session");
        println!();
    }

    let account = client.auth().current_user().await?;
    println!("Signed in as {}", account.user.username);
    println!();

    let page = client.events().list(&EventFilters::page(1)).await?;
    println!(
        "{} events ({} pages):",
        page.count,
        page.total_pages()
    );
    for event in &page.results {
        println!("  - [{}] {} @ {} ({})", event.id, event.title, event.location, event.start_time);
    }
    println!();

    if let Some(first) = page.results.first() {
        match client.events().rsvp(first.id, RsvpStatus::Maybe).await {
            Ok(rsvp) => println!("✓ RSVP'd {:?} to {}", rsvp.status, first.title),
            Err(e) => println!("! RSVP failed: {}", e),
        }
    }

    Ok(())
}
