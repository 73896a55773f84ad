//! # Spaceship Core Infrastructure
//!
//! File: cli/src/core/mod.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module aggregates the core infrastructure components used by every
//! command: configuration, error management, and runner script rendering.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, merging, and validation
//! - `error`: Error types and error handling utilities
//! - `templating`: Rendering of the remote runner scripts
//!
//! ## Usage
//!
//! ```rust
//! use crate::core::config; // For loading configuration
//! use crate::core::error::{SpaceshipError, Result}; // For error handling
//! use crate::core::templating; // For runner script rendering
//! ```
//!
pub mod config;
pub mod error;
pub mod templating;
