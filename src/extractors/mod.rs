//! Request extractors.

mod caller;
mod json;
pub use caller::AuthUser;
pub use json::JsonBody;
