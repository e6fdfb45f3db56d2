//! Riskscope Common - Shared configuration, errors, and logging for riskscope services.
//!
//! This crate provides:
//! - Configuration types and loading
//! - Configuration validation
//! - Error types and handling utilities
//! - Logging setup

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod logging;
pub mod validation;

pub use config::{
    AnalysisConfig, Config, NetworkConfig, ObservabilityConfig, ProviderMode, ProvidersConfig,
    RecommendationsConfig, ServiceConfig, WeightsConfig,
};
pub use error::{Error, Result};
pub use validation::{Validate, ValidationError, ValidationResult};
