use std::path::Path;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::errors::{Result, TabgateError};

/// Default pattern for URLs that belong to the coordinated site
pub const DEFAULT_SITE_PATTERN: &str = r"^https?://(www\.|m\.)?youtube\.com";

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Regex a tab URL must match to count as "still on the site"
    pub site_pattern: String,
    /// Focus the tab that is granted play when the queue advances
    pub focus_on_advance: bool,
    /// Advance the queue when the active tab navigates off the site
    pub advance_on_navigate: bool,
    /// Skip advancement after an eviction while another tab holds the slot
    pub hold_slot_on_evict: bool,
    /// Capacity of the inbound message channel
    pub event_capacity: usize,
    /// Commands waiting for the host beyond this many are dropped
    pub command_capacity: usize,
    /// Observer-side tuning shipped to each tab
    pub observer: ObserverConfig,
}

/// Tuning for the per-tab observer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObserverConfig {
    /// Fraction of the media duration at which playback counts as completed
    pub completion_threshold: f64,
    /// A play starting below this position after an end is a replay
    #[serde(with = "duration_ms")]
    pub replay_window: Duration,
    /// Period of the force-pause enforcement loop
    #[serde(with = "duration_ms")]
    pub pause_interval: Duration,
    /// Period of the page guard loop
    #[serde(with = "duration_ms")]
    pub guard_interval: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            site_pattern: DEFAULT_SITE_PATTERN.to_string(),
            focus_on_advance: true,
            advance_on_navigate: false,
            hold_slot_on_evict: false,
            event_capacity: 256,
            command_capacity: 256,
            observer: ObserverConfig::default(),
        }
    }
}

impl Default for ObserverConfig {
    fn default() -> Self {
        Self {
            completion_threshold: 0.985,
            replay_window: Duration::from_secs(2),
            pause_interval: Duration::from_millis(300),
            guard_interval: Duration::from_millis(1500),
        }
    }
}

impl CoordinatorConfig {
    /// Create a new builder for CoordinatorConfig
    pub fn builder() -> CoordinatorConfigBuilder {
        CoordinatorConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.compile_site_pattern()?;
        if self.event_capacity == 0 {
            return Err(TabgateError::configuration_field(
                "event_capacity must be greater than 0",
                "event_capacity",
            ));
        }
        if self.command_capacity == 0 {
            return Err(TabgateError::configuration_field(
                "command_capacity must be greater than 0",
                "command_capacity",
            ));
        }
        self.observer.validate()
    }

    /// Compile `site_pattern`
    pub fn compile_site_pattern(&self) -> Result<Regex> {
        Regex::new(&self.site_pattern).map_err(|source| TabgateError::Pattern {
            pattern: self.site_pattern.clone(),
            source,
        })
    }

    /// Parse and validate a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| TabgateError::io(format!("read {}", path.display()), e))?;
        Self::from_yaml_str(&text)
    }

    /// Configuration for local testing: short loops, small channel
    pub fn development() -> Self {
        Self {
            event_capacity: 16,
            observer: ObserverConfig {
                pause_interval: Duration::from_millis(50),
                guard_interval: Duration::from_millis(250),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

impl ObserverConfig {
    /// Validate the observer tuning
    pub fn validate(&self) -> Result<()> {
        let t = self.completion_threshold;
        if !(t > 0.0 && t <= 1.0) {
            return Err(TabgateError::configuration_field(
                "completion_threshold must be in (0, 1]",
                "completion_threshold",
            ));
        }
        if self.pause_interval.is_zero() {
            return Err(TabgateError::configuration_field(
                "pause_interval must be non-zero",
                "pause_interval",
            ));
        }
        if self.guard_interval.is_zero() {
            return Err(TabgateError::configuration_field(
                "guard_interval must be non-zero",
                "guard_interval",
            ));
        }
        Ok(())
    }
}

/// Builder for CoordinatorConfig
pub struct CoordinatorConfigBuilder {
    config: CoordinatorConfig,
}

impl CoordinatorConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
        }
    }

    /// Set the site pattern
    pub fn site_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.config.site_pattern = pattern.into();
        self
    }

    /// Enable/disable focusing on advancement
    pub fn focus_on_advance(mut self, enabled: bool) -> Self {
        self.config.focus_on_advance = enabled;
        self
    }

    /// Enable/disable advancement after the active tab navigates away
    pub fn advance_on_navigate(mut self, enabled: bool) -> Self {
        self.config.advance_on_navigate = enabled;
        self
    }

    /// Keep the current slot holder when a background tab is evicted
    pub fn hold_slot_on_evict(mut self, enabled: bool) -> Self {
        self.config.hold_slot_on_evict = enabled;
        self
    }

    /// Set inbound channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Set the host command backlog limit
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.config.command_capacity = capacity;
        self
    }

    /// Set the completion threshold
    pub fn completion_threshold(mut self, threshold: f64) -> Self {
        self.config.observer.completion_threshold = threshold;
        self
    }

    /// Set the force-pause period
    pub fn pause_interval(mut self, interval: Duration) -> Self {
        self.config.observer.pause_interval = interval;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<CoordinatorConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

impl Default for CoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
