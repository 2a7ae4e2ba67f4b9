use derive_more::IsVariant;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// What the driver does once an optimum with a zero non-basic Cj - Zj is found.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, IsVariant, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum AlternatePolicy {
    /// Report the first optimum
    #[default]
    Stop,
    /// Keep pivoting on zero columns until a basis repeats
    Explore,
}

/// What the driver does when the ratio test ends in a tie.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, IsVariant, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum DegeneracyPolicy {
    /// Pivot on the first tied row
    #[default]
    Continue,
    Stop,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SolverConfig {
    /// Pivots allowed before the run is declared cyclic
    pub max_iterations: usize,
    /// Tableau snapshots kept by the driver, oldest dropped first
    pub history_limit: usize,
    pub alternates: AlternatePolicy,
    pub degeneracy: DegeneracyPolicy,
    /// Magnitude under which a tableau component counts as zero
    pub epsilon: f64,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            history_limit: 32,
            alternates: AlternatePolicy::default(),
            degeneracy: DegeneracyPolicy::default(),
            epsilon: 1e-9,
        }
    }
}

impl SolverConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroIterationCap);
        }
        if self.epsilon.is_nan() || self.epsilon < 0. {
            return Err(ConfigError::InvalidEpsilon {
                epsilon: self.epsilon,
            });
        }
        Ok(())
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_history_limit(mut self, history_limit: usize) -> Self {
        self.history_limit = history_limit;
        self
    }

    pub fn with_alternates(mut self, alternates: AlternatePolicy) -> Self {
        self.alternates = alternates;
        self
    }

    pub fn with_degeneracy(mut self, degeneracy: DegeneracyPolicy) -> Self {
        self.degeneracy = degeneracy;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }
}
