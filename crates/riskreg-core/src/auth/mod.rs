//! The login pipeline.
//!
//! [`validation`] checks field shape, [`throttle`] owns the keyed attempt
//! counters, [`login`] ties them to a credential directory, and
//! [`messages`] renders what the user sees.

pub mod login;
pub mod messages;
pub mod throttle;
pub mod validation;

pub use login::{Authenticated, LoginService, LoginStage};
pub use messages::Locale;
pub use throttle::{throttle_key, RateLimiter};
pub use validation::{Credentials, Field, FieldErrors, LoginForm};
