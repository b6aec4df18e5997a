//! Request extractors: authenticated caller and JSON bodies that fail with the API error envelope.

pub mod auth;
pub mod json;

pub use auth::{CurrentUser, MaybeUser};
pub use json::JsonBody;
