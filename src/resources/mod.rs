//! One entry point per resource family, borrowed from an [`ApiClient`](crate::ApiClient)

mod auth;
mod events;
mod profiles;
mod reviews;
mod rsvps;

pub use auth::AuthApi;
pub use events::EventsApi;
pub use profiles::ProfilesApi;
pub use reviews::ReviewsApi;
pub use rsvps::RsvpsApi;
