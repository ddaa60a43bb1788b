//! Navigation engine configuration.
//!
//! Thresholds default to the values the navigation UI has always used. They
//! can be overridden from an INI file:
//!
//! ```ini
//! [navigation]
//! off_route_threshold_m = 50
//! arrival_radius_m = 30
//! near_tier_m = 100
//! imminent_tier_m = 30
//! require_guidance = true
//! heading_min_movement_m = 10
//! ```
//!
//! Missing keys keep their defaults; a missing file yields the defaults.

use std::path::{Path, PathBuf};

use ini::Ini;
use thiserror::Error;

use crate::route::GuidanceRequirement;

/// Distance from the route beyond which a fix counts as off route.
pub const DEFAULT_OFF_ROUTE_THRESHOLD_M: f64 = 50.0;

/// Distance to the destination below which the trip is complete.
pub const DEFAULT_ARRIVAL_RADIUS_M: f64 = 30.0;

/// Upper (exclusive) bound of the "near" announcement tier.
pub const DEFAULT_NEAR_TIER_M: f64 = 100.0;

/// Upper (inclusive) bound of the "imminent" announcement tier.
pub const DEFAULT_IMMINENT_TIER_M: f64 = 30.0;

/// Minimum movement between fixes before a heading is derived from them.
pub const DEFAULT_HEADING_MIN_MOVEMENT_M: f64 = 10.0;

/// INI section holding navigation settings.
const SECTION: &str = "navigation";

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Thresholds and switches for a navigation session.
#[derive(Debug, Clone, PartialEq)]
pub struct NavigationConfig {
    /// Off-route threshold (meters). Distance to the nearest route vertex
    /// strictly greater than this is off route.
    pub off_route_threshold_m: f64,

    /// Arrival radius (meters). Straight-line distance to the final route
    /// vertex strictly below this completes the trip.
    pub arrival_radius_m: f64,

    /// Near tier bound (meters).
    pub near_tier_m: f64,

    /// Imminent tier bound (meters).
    pub imminent_tier_m: f64,

    /// Whether sessions need turn-by-turn steps. When set, routes without
    /// steps get a synthesized coarse step list.
    pub require_guidance: bool,

    /// Minimum movement (meters) before a heading is derived from fixes.
    pub heading_min_movement_m: f64,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            off_route_threshold_m: DEFAULT_OFF_ROUTE_THRESHOLD_M,
            arrival_radius_m: DEFAULT_ARRIVAL_RADIUS_M,
            near_tier_m: DEFAULT_NEAR_TIER_M,
            imminent_tier_m: DEFAULT_IMMINENT_TIER_M,
            require_guidance: true,
            heading_min_movement_m: DEFAULT_HEADING_MIN_MOVEMENT_M,
        }
    }
}

impl NavigationConfig {
    /// Guidance requirement passed to route validation.
    pub fn guidance(&self) -> GuidanceRequirement {
        if self.require_guidance {
            GuidanceRequirement::TurnByTurn
        } else {
            GuidanceRequirement::DistanceOnly
        }
    }

    /// Check that thresholds are positive and tiers are ordered.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("off_route_threshold_m", self.off_route_threshold_m),
            ("arrival_radius_m", self.arrival_radius_m),
            ("near_tier_m", self.near_tier_m),
            ("imminent_tier_m", self.imminent_tier_m),
        ];
        for (key, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!("{} must be positive", key)));
            }
        }
        if !(self.heading_min_movement_m.is_finite() && self.heading_min_movement_m >= 0.0) {
            return Err(ConfigError::Invalid(
                "heading_min_movement_m must not be negative".to_string(),
            ));
        }
        if self.imminent_tier_m >= self.near_tier_m {
            return Err(ConfigError::Invalid(format!(
                "imminent_tier_m ({}) must be below near_tier_m ({})",
                self.imminent_tier_m, self.near_tier_m
            )));
        }
        Ok(())
    }
}

/// Configuration file loader.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Navigation settings.
    pub navigation: NavigationConfig,
}

impl ConfigFile {
    /// Load from the default location, falling back to defaults when the
    /// file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        match config_file_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from an explicit path. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&contents)?;
        tracing::info!(path = %path.display(), "Loaded navigation config");
        Ok(config)
    }

    /// Parse INI text.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut navigation = NavigationConfig::default();

        if let Some(section) = ini.section(Some(SECTION)) {
            let set_f64 = |key: &str, slot: &mut f64| -> Result<(), ConfigError> {
                if let Some(raw) = section.get(key) {
                    *slot = parse_value(key, raw)?;
                }
                Ok(())
            };
            set_f64("off_route_threshold_m", &mut navigation.off_route_threshold_m)?;
            set_f64("arrival_radius_m", &mut navigation.arrival_radius_m)?;
            set_f64("near_tier_m", &mut navigation.near_tier_m)?;
            set_f64("imminent_tier_m", &mut navigation.imminent_tier_m)?;
            set_f64("heading_min_movement_m", &mut navigation.heading_min_movement_m)?;

            if let Some(raw) = section.get("require_guidance") {
                navigation.require_guidance = parse_bool("require_guidance", raw)?;
            }
        }

        navigation.validate()?;
        Ok(Self { navigation })
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> String {
        let n = &self.navigation;
        format!(
            "[{}]\n\
             off_route_threshold_m = {}\n\
             arrival_radius_m = {}\n\
             near_tier_m = {}\n\
             imminent_tier_m = {}\n\
             require_guidance = {}\n\
             heading_min_movement_m = {}\n",
            SECTION,
            n.off_route_threshold_m,
            n.arrival_radius_m,
            n.near_tier_m,
            n.imminent_tier_m,
            n.require_guidance,
            n.heading_min_movement_m
        )
    }
}

/// Default configuration file path (`<config dir>/citynav/config.ini`).
pub fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("citynav").join("config.ini"))
}

fn parse_value(key: &str, raw: &str) -> Result<f64, ConfigError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        })
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Ok(true),
        "false" | "no" | "0" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = NavigationConfig::default();
        assert_eq!(config.off_route_threshold_m, 50.0);
        assert_eq!(config.arrival_radius_m, 30.0);
        assert_eq!(config.near_tier_m, 100.0);
        assert_eq!(config.imminent_tier_m, 30.0);
        assert!(config.require_guidance);
        assert_eq!(config.guidance(), GuidanceRequirement::TurnByTurn);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_overrides() {
        let config = ConfigFile::parse(
            "[navigation]\noff_route_threshold_m = 75\nrequire_guidance = no\n",
        )
        .unwrap();
        assert_eq!(config.navigation.off_route_threshold_m, 75.0);
        assert!(!config.navigation.require_guidance);
        assert_eq!(config.navigation.guidance(), GuidanceRequirement::DistanceOnly);
        // Untouched keys keep defaults
        assert_eq!(config.navigation.arrival_radius_m, 30.0);
    }

    #[test]
    fn test_parse_ignores_other_sections() {
        let config = ConfigFile::parse("[map]\nstyle = dark\n").unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_parse_rejects_bad_number() {
        let err = ConfigFile::parse("[navigation]\nnear_tier_m = far\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "near_tier_m"));
    }

    #[test]
    fn test_parse_rejects_bad_bool() {
        let err = ConfigFile::parse("[navigation]\nrequire_guidance = maybe\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_validate_rejects_inverted_tiers() {
        let err = ConfigFile::parse("[navigation]\nimminent_tier_m = 150\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
        assert!(err.to_string().contains("imminent_tier_m"));
    }

    #[test]
    fn test_validate_rejects_non_positive() {
        let config = NavigationConfig {
            arrival_radius_m: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_from(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[navigation]").unwrap();
        writeln!(file, "arrival_radius_m = 20").unwrap();
        let config = ConfigFile::load_from(file.path()).unwrap();
        assert_eq!(config.navigation.arrival_radius_m, 20.0);
    }

    #[test]
    fn test_ini_string_parses_back() {
        let mut original = ConfigFile::default();
        original.navigation.near_tier_m = 120.0;
        original.navigation.require_guidance = false;
        let parsed = ConfigFile::parse(&original.to_ini_string()).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_config_file_path_name() {
        if let Some(path) = config_file_path() {
            assert!(path.ends_with("citynav/config.ini"));
        }
    }
}
