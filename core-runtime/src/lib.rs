//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the media browser core:
//! - Logging and tracing infrastructure
//! - Configuration management
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the library, playback and
//! service crates depend on. It establishes the logging conventions, the
//! configuration builder that wires host bridges in, and the event
//! broadcasting mechanism used throughout the system.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
