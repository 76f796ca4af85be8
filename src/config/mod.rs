//! Sentry Configuration Module
//!
//! ## Loading Order
//!
//! 1. `IPV6_SENTRY_CONFIG` environment variable (path to TOML file)
//! 2. `ipv6_sentry.toml` in the current working directory
//! 3. Built-in defaults (`defaults.rs`)
//!
//! The loaded `SentryConfig` is passed by value into the components that
//! need it; CLI flags are applied on top in `main`.

pub mod defaults;
mod sentry_config;
pub mod validation;

pub use sentry_config::*;
