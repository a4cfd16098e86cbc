//! Configuration for the authentication core.
//!
//! Throttle policy and directory selection ([`settings::AuthSettings`]) are
//! stored as TOML and loaded at startup.

pub mod settings;

pub use settings::{AuthSettings, DirectoryConfig, DirectoryKind, SoapConfig, ThrottleConfig, UserEntry};
