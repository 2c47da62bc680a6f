//! Lumen Engine Library
//!
//! This library provides the plugin registry and the host-side plumbing
//! around it. It is used by both the `lumen` binary and integration tests.

/// Configuration management module
pub mod config;

/// Runtime module for loading and managing native scene plugins
pub mod runtime;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;

/// Platform-specific utilities module
pub mod platform;
