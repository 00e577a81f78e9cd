mod auth;
mod handlers;
mod server;

#[cfg(test)]
mod tests;

pub use auth::API_KEY_HEADER;
pub use handlers::{ApiFailure, ProfilePayload};
pub use server::{ApiServer, ApiServerBuilder, ApiState};
