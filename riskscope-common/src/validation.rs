//! Configuration validation for riskscope services.
//!
//! Runs once at startup. A configuration that fails here never reaches
//! request handling.

use thiserror::Error;

use crate::config::{
    AnalysisConfig, Config, ObservabilityConfig, ProviderMode, ProvidersConfig,
    RecommendationsConfig, WeightsConfig,
};

/// Tolerance used when checking that weights sum to 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Upper bound for the per-job deadline.
pub const MAX_JOB_DEADLINE_SECS: u64 = 3_600;

/// Configuration validation error.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Configuration conflict: {reason}")]
    Conflict { reason: String },

    #[error("Multiple validation errors: {0:?}")]
    Multiple(Vec<ValidationError>),
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trait for validatable configuration sections.
pub trait Validate {
    /// Validate this configuration section.
    fn validate(&self) -> ValidationResult<()>;
}

impl Config {
    /// Validate the entire configuration.
    pub fn validate(&self) -> ValidationResult<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.analysis.validate() {
            errors.push(e);
        }

        if let Err(e) = self.recommendations.validate() {
            errors.push(e);
        }

        if let Err(e) = self.providers.validate() {
            errors.push(e);
        }

        if let Err(e) = self.observability.validate() {
            errors.push(e);
        }

        if self.service.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "service.port".into(),
                reason: "must be between 1 and 65535".into(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else if errors.len() == 1 {
            Err(errors.remove(0))
        } else {
            Err(ValidationError::Multiple(errors))
        }
    }

    /// Load and validate configuration.
    pub fn load_and_validate() -> anyhow::Result<Self> {
        let config = Self::load_with_env()?;
        config.validate().map_err(|e| anyhow::anyhow!("{}", e))?;
        Ok(config)
    }
}

impl Validate for WeightsConfig {
    fn validate(&self) -> ValidationResult<()> {
        let named = [
            ("sentiment", self.sentiment),
            ("controversy", self.controversy),
            ("audience", self.audience),
            ("trend", self.trend),
        ];

        for (name, weight) in named {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ValidationError::InvalidValue {
                    field: format!("analysis.weights.{name}"),
                    reason: format!("must be a non-negative number, got {weight}"),
                });
            }
        }

        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ValidationError::InvalidValue {
                field: "analysis.weights".into(),
                reason: format!("weights must sum to 1.0, got {total:.6}"),
            });
        }

        Ok(())
    }
}

impl Validate for AnalysisConfig {
    fn validate(&self) -> ValidationResult<()> {
        self.weights.validate()?;

        if self.fast_timeout_secs == 0 || self.media_timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "analysis.*_timeout_secs".into(),
                reason: "timeouts must be greater than 0".into(),
            });
        }

        if self.job_deadline_secs == 0 || self.job_deadline_secs > MAX_JOB_DEADLINE_SECS {
            return Err(ValidationError::InvalidValue {
                field: "analysis.job_deadline_secs".into(),
                reason: format!("must be within 1..={MAX_JOB_DEADLINE_SECS}"),
            });
        }

        let longest = self.fast_timeout_secs.max(self.media_timeout_secs);
        if self.job_deadline_secs < longest {
            return Err(ValidationError::Conflict {
                reason: format!(
                    "analysis.job_deadline_secs ({}) is shorter than the longest per-signal timeout ({longest})",
                    self.job_deadline_secs
                ),
            });
        }

        if self.worker_pool_size == 0 {
            return Err(ValidationError::InvalidValue {
                field: "analysis.worker_pool_size".into(),
                reason: "worker pool needs at least one slot".into(),
            });
        }

        Ok(())
    }
}

impl Validate for RecommendationsConfig {
    fn validate(&self) -> ValidationResult<()> {
        if !(0.0..=100.0).contains(&self.min_factor_impact) {
            return Err(ValidationError::InvalidValue {
                field: "recommendations.min_factor_impact".into(),
                reason: "must be within [0, 100]".into(),
            });
        }

        if !(0.0..=100.0).contains(&self.dimension_threshold) {
            return Err(ValidationError::InvalidValue {
                field: "recommendations.dimension_threshold".into(),
                reason: "must be within [0, 100]".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ProvidersConfig {
    fn validate(&self) -> ValidationResult<()> {
        if self.mode == ProviderMode::Http {
            match self.endpoint.as_deref() {
                None | Some("") => {
                    return Err(ValidationError::MissingField {
                        field: "providers.endpoint (required in http mode)".into(),
                    });
                }
                Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
                    return Err(ValidationError::InvalidValue {
                        field: "providers.endpoint".into(),
                        reason: format!("must be an http(s) URL, got {url}"),
                    });
                }
                Some(_) => {}
            }
        }

        if self.timeout_secs == 0 {
            return Err(ValidationError::InvalidValue {
                field: "providers.timeout_secs".into(),
                reason: "must be greater than 0".into(),
            });
        }

        Ok(())
    }
}

impl Validate for ObservabilityConfig {
    fn validate(&self) -> ValidationResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_level".into(),
                reason: format!("must be one of {valid_levels:?}"),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.log_format.to_lowercase().as_str()) {
            return Err(ValidationError::InvalidValue {
                field: "observability.log_format".into(),
                reason: format!("must be one of {valid_formats:?}"),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test_case(0.25, 0.35, 0.25, 0.25 ; "sum above one")]
    #[test_case(0.25, 0.35, 0.25, 0.0 ; "sum below one")]
    #[test_case(-0.1, 0.45, 0.5, 0.15 ; "negative weight")]
    #[test_case(f64::NAN, 0.35, 0.25, 0.15 ; "nan weight")]
    fn test_invalid_weights(sentiment: f64, controversy: f64, audience: f64, trend: f64) {
        let weights = WeightsConfig {
            sentiment,
            controversy,
            audience,
            trend,
        };
        assert!(weights.validate().is_err());
    }

    #[test]
    fn test_weights_within_tolerance() {
        let weights = WeightsConfig {
            sentiment: 0.1,
            controversy: 0.2,
            audience: 0.3,
            trend: 0.4,
        };
        assert!(weights.validate().is_ok());
    }

    #[test_case(30, 120, 150 ; "defaults")]
    #[test_case(30, 120, 120 ; "deadline equals media timeout")]
    #[test_case(30, 30, 30 ; "all equal")]
    fn test_valid_deadlines(fast: u64, media: u64, deadline: u64) {
        let analysis = AnalysisConfig {
            fast_timeout_secs: fast,
            media_timeout_secs: media,
            job_deadline_secs: deadline,
            ..Default::default()
        };
        assert!(analysis.validate().is_ok());
    }

    #[test_case(30, 120, 10 ; "deadline shorter than media timeout")]
    #[test_case(60, 20, 40 ; "deadline shorter than fast timeout")]
    fn test_deadline_conflicts_with_timeouts(fast: u64, media: u64, deadline: u64) {
        let analysis = AnalysisConfig {
            fast_timeout_secs: fast,
            media_timeout_secs: media,
            job_deadline_secs: deadline,
            ..Default::default()
        };
        assert!(matches!(
            analysis.validate(),
            Err(ValidationError::Conflict { .. })
        ));
    }

    #[test_case(0 ; "zero")]
    #[test_case(MAX_JOB_DEADLINE_SECS + 1 ; "above maximum")]
    #[test_case(u64::MAX ; "u64 max")]
    fn test_deadline_out_of_range(deadline: u64) {
        let analysis = AnalysisConfig {
            job_deadline_secs: deadline,
            ..Default::default()
        };
        assert!(matches!(
            analysis.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_http_mode_requires_endpoint() {
        let providers = ProvidersConfig {
            mode: ProviderMode::Http,
            ..Default::default()
        };
        assert!(matches!(
            providers.validate(),
            Err(ValidationError::MissingField { .. })
        ));

        let providers = ProvidersConfig {
            mode: ProviderMode::Http,
            endpoint: Some("models:8080".into()),
            ..Default::default()
        };
        assert!(matches!(
            providers.validate(),
            Err(ValidationError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let mut config = Config::default();
        config.analysis.worker_pool_size = 0;
        config.observability.log_format = "xml".into();

        match config.validate() {
            Err(ValidationError::Multiple(errors)) => assert_eq!(errors.len(), 2),
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }
}
