//! Simulation configuration.
//!
//! The default configuration lives in `data/sim_config.json` and is embedded
//! at compile time via `include_str!()`. Job categories come from this data;
//! nothing in the engine hardcodes them.

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
pub const DEFAULT_CONFIG_JSON: &str = include_str!("../../../data/sim_config.json");

/// A named job classification. Hidden categories are not shown to players
/// (need-driven work, for instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobCategory {
    pub name: String,
    #[serde(default)]
    pub hidden: bool,
}

impl JobCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// In scan order for job assignment.
    pub job_categories: Vec<JobCategory>,
    /// Lifetime of an inventory claim, in AUT.
    pub claim_duration: f64,
    /// Fast frames per slow update.
    pub slow_update_frames: u32,
    /// Action points gained per AUT.
    pub action_point_rate: f32,
    pub action_point_cap: f32,
    /// Work done per action point, before skill.
    pub work_rate: f32,
    pub idle_dwell_min: f32,
    pub idle_dwell_max: f32,
    /// AUT between job searches for an idle actor.
    pub job_search_interval: f32,
    pub diagonal_movement: bool,
    /// Skill experience per unit of work.
    pub xp_per_work: f32,
    /// Items an actor can carry.
    pub carry_capacity: u32,
    /// Stack size cap for items created by jobs.
    pub max_stack_size: u32,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            job_categories: ["construction", "hauling", "farming", "crafting"]
                .into_iter()
                .map(JobCategory::new)
                .chain(std::iter::once(JobCategory {
                    name: "needs".into(),
                    hidden: true,
                }))
                .collect(),
            claim_duration: 120.0,
            slow_update_frames: 10,
            action_point_rate: 4.0,
            action_point_cap: 8.0,
            work_rate: 1.0,
            idle_dwell_min: 1.0,
            idle_dwell_max: 4.0,
            job_search_interval: 0.5,
            diagonal_movement: false,
            xp_per_work: 0.5,
            carry_capacity: 50,
            max_stack_size: 50,
            seed: 42,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("no job categories configured")]
    NoCategories,

    #[error("duplicate job category: {0}")]
    DuplicateCategory(String),

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl SimConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// The embedded `data/sim_config.json`.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_json(DEFAULT_CONFIG_JSON)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.job_categories.is_empty() {
            return Err(ConfigError::NoCategories);
        }
        let mut seen = std::collections::BTreeSet::new();
        for category in &self.job_categories {
            if !seen.insert(category.name.as_str()) {
                return Err(ConfigError::DuplicateCategory(category.name.clone()));
            }
        }

        let positive = |field: &'static str, value: f64| {
            if value > 0.0 && value.is_finite() {
                Ok(())
            } else {
                Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("must be positive, got {}", value),
                })
            }
        };
        positive("claim_duration", self.claim_duration)?;
        positive("action_point_rate", self.action_point_rate as f64)?;
        positive("action_point_cap", self.action_point_cap as f64)?;
        positive("work_rate", self.work_rate as f64)?;
        positive("slow_update_frames", self.slow_update_frames as f64)?;
        positive("carry_capacity", self.carry_capacity as f64)?;
        positive("max_stack_size", self.max_stack_size as f64)?;

        if self.idle_dwell_min < 0.0 || self.idle_dwell_min > self.idle_dwell_max {
            return Err(ConfigError::InvalidValue {
                field: "idle_dwell_min",
                reason: format!(
                    "dwell range {}..{} is empty or negative",
                    self.idle_dwell_min, self.idle_dwell_max
                ),
            });
        }
        if self.xp_per_work < 0.0 || self.job_search_interval < 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "xp_per_work",
                reason: "rates cannot be negative".into(),
            });
        }
        Ok(())
    }

    pub fn has_category(&self, name: &str) -> bool {
        self.job_categories.iter().any(|c| c.name == name)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.job_categories.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_config_matches_default() {
        let embedded = SimConfig::embedded().unwrap();
        assert_eq!(embedded, SimConfig::default());
        assert!(embedded.has_category("hauling"));
        assert!(embedded.job_categories.iter().any(|c| c.hidden));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config = SimConfig::from_json(r#"{ "action_point_rate": 2.0 }"#).unwrap();
        assert_eq!(config.action_point_rate, 2.0);
        assert_eq!(config.slow_update_frames, 10);
    }

    #[test]
    fn test_duplicate_category_rejected() {
        let json = r#"{ "job_categories": [ { "name": "a" }, { "name": "a" } ] }"#;
        assert!(matches!(
            SimConfig::from_json(json),
            Err(ConfigError::DuplicateCategory(name)) if name == "a"
        ));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(matches!(
            SimConfig::from_json(r#"{ "job_categories": [] }"#),
            Err(ConfigError::NoCategories)
        ));
        assert!(matches!(
            SimConfig::from_json(r#"{ "claim_duration": 0.0 }"#),
            Err(ConfigError::InvalidValue { field: "claim_duration", .. })
        ));
        assert!(matches!(
            SimConfig::from_json(r#"{ "idle_dwell_min": 5.0, "idle_dwell_max": 1.0 }"#),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(SimConfig::from_json("not json"), Err(ConfigError::Parse(_))));
    }
}
