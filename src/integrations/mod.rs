//! External service integrations.

pub mod registry_client {
    pub use crate::registry_client::*;
}

pub mod rate_limiter {
    pub use crate::rate_limiter::*;
}
