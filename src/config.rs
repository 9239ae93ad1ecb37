use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use crate::model::ContainerTemplate;
use crate::packer::PackOptions;
use crate::placement::PlacementConfig;

/// Complete application configuration, loaded from environment variables or
/// default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub packer: PackerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            packer: PackerConfig::from_env(),
        }
    }
}

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    bind_ip: IpAddr,
    display_host: String,
    port: u16,
}

impl ApiConfig {
    const DEFAULT_HOST: &'static str = "0.0.0.0";
    const DEFAULT_PORT: u16 = 8080;

    fn from_env() -> Self {
        let host_value =
            env_string("LOADPLAN_API_HOST").unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, effective_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse LOADPLAN_API_HOST ('{}'): {}. Using {}.",
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    Self::DEFAULT_HOST
                        .parse::<IpAddr>()
                        .expect("Default host must be valid"),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match env_string("LOADPLAN_API_PORT") {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    eprintln!(
                        "⚠️ LOADPLAN_API_PORT must not be 0. Using {}.",
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    eprintln!(
                        "⚠️ Could not parse LOADPLAN_API_PORT ('{}'): {}. Using {}.",
                        raw,
                        err,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
            },
            None => Self::DEFAULT_PORT,
        };

        Self {
            bind_ip,
            display_host: effective_host,
            port,
        }
    }

    /// Socket address to bind the server to.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_ip, self.port)
    }

    /// Visible hostname for logging and hints.
    pub fn display_host(&self) -> &str {
        &self.display_host
    }

    /// Configured port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Indicates whether binding to all interfaces.
    pub fn binds_to_all_interfaces(&self) -> bool {
        match self.bind_ip {
            IpAddr::V4(addr) => addr == Ipv4Addr::UNSPECIFIED,
            IpAddr::V6(addr) => addr == Ipv6Addr::UNSPECIFIED,
        }
    }

    /// Checks whether the hostname matches the default value.
    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration for the packing pipeline.
///
/// Request-level flags override these per request; the environment only
/// supplies the defaults.
#[derive(Clone, Debug)]
pub struct PackerConfig {
    placement: PlacementConfig,
    default_max_weight: f64,
    placement_timeout_ms: u64,
}

impl PackerConfig {
    const GRID_STEP_VAR: &'static str = "LOADPLAN_GRID_STEP";
    const ROUNDING_PRECISION_VAR: &'static str = "LOADPLAN_ROUNDING_PRECISION";
    const ALLOW_ROTATIONS_VAR: &'static str = "LOADPLAN_ALLOW_ROTATIONS";
    const BIGGER_FIRST_VAR: &'static str = "LOADPLAN_BIGGER_FIRST";
    const DISTRIBUTE_ITEMS_VAR: &'static str = "LOADPLAN_DISTRIBUTE_ITEMS";
    const DEFAULT_MAX_WEIGHT_VAR: &'static str = "LOADPLAN_DEFAULT_MAX_WEIGHT";
    const PLACEMENT_TIMEOUT_VAR: &'static str = "LOADPLAN_PLACEMENT_TIMEOUT_MS";

    /// Creates a configuration with explicit values, bypassing the
    /// environment. Useful for embedding the pipeline and for tests.
    pub fn new(
        placement: PlacementConfig,
        default_max_weight: f64,
        placement_timeout_ms: u64,
    ) -> Self {
        Self {
            placement,
            default_max_weight,
            placement_timeout_ms,
        }
    }

    fn from_env() -> Self {
        let grid_step = load_f64_with_warning(
            Self::GRID_STEP_VAR,
            PlacementConfig::DEFAULT_GRID_STEP,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted grid step may affect placement determinism",
        );

        let default_max_weight = load_f64_with_warning(
            Self::DEFAULT_MAX_WEIGHT_VAR,
            ContainerTemplate::DEFAULT_MAX_WEIGHT,
            |value| value > 0.0,
            "must be greater than 0",
            "Warning: Adjusted default weight ceiling changes overflow behavior",
        );

        let rounding_precision = load_u64(
            Self::ROUNDING_PRECISION_VAR,
            u64::from(PlacementConfig::DEFAULT_ROUNDING_PRECISION),
        ) as u32;

        let placement_timeout_ms = load_u64(Self::PLACEMENT_TIMEOUT_VAR, 0);

        let allow_rotation = env_string(Self::ALLOW_ROTATIONS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::ALLOW_ROTATIONS_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_ALLOW_ROTATION);
        let bigger_first = env_string(Self::BIGGER_FIRST_VAR)
            .and_then(|raw| parse_bool(&raw, Self::BIGGER_FIRST_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_BIGGER_FIRST);
        let distribute_items = env_string(Self::DISTRIBUTE_ITEMS_VAR)
            .and_then(|raw| parse_bool(&raw, Self::DISTRIBUTE_ITEMS_VAR))
            .unwrap_or(PlacementConfig::DEFAULT_DISTRIBUTE_ITEMS);

        let placement = PlacementConfig {
            bigger_first,
            distribute_items,
            allow_rotation,
            rounding_precision,
            grid_step,
        };

        Self {
            placement,
            default_max_weight,
            placement_timeout_ms,
        }
    }

    /// Returns the configured placement defaults.
    pub fn placement_config(&self) -> PlacementConfig {
        self.placement
    }

    /// Weight ceiling applied when a request does not specify one.
    pub fn default_max_weight(&self) -> f64 {
        self.default_max_weight
    }

    /// Wall-clock budget per placement call; `None` when disabled.
    pub fn placement_timeout(&self) -> Option<Duration> {
        if self.placement_timeout_ms == 0 {
            None
        } else {
            Some(Duration::from_millis(self.placement_timeout_ms))
        }
    }

    /// Baseline options for one request, before request-level overrides.
    pub fn pack_options(&self) -> PackOptions {
        PackOptions {
            placement: self.placement,
            strategy: Default::default(),
            placement_timeout: self.placement_timeout(),
        }
    }
}

fn env_string(name: &str) -> Option<String> {
    match env::var(name) {
        Ok(value) => {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_owned())
            }
        }
        Err(env::VarError::NotPresent) => None,
        Err(err) => {
            eprintln!(
                "⚠️ Access to {} failed: {}. Using default value.",
                name, err
            );
            None
        }
    }
}

fn parse_bool(raw: &str, var_name: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "no" | "n" | "off" => Some(false),
        other => {
            eprintln!(
                "⚠️ Could not interpret {} ('{}') as boolean value. Using default value.",
                var_name, other
            );
            None
        }
    }
}

fn load_u64(var_name: &str, default: u64) -> u64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<u64>() {
            Ok(value) => value,
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as integer: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

fn load_f64_with_warning(
    var_name: &str,
    default: f64,
    validator: impl Fn(f64) -> bool,
    invalid_hint: &str,
    warning: &str,
) -> f64 {
    match env_string(var_name) {
        Some(raw) => match raw.parse::<f64>() {
            Ok(value) => {
                if !validator(value) {
                    eprintln!(
                        "⚠️ {} contains invalid value '{}': {}. Using {}.",
                        var_name, raw, invalid_hint, default
                    );
                    default
                } else {
                    let tolerance = (default.abs().max(1.0)) * 1e-9;
                    if (value - default).abs() > tolerance {
                        println!("⚠️ {} ({} = {}).", warning, var_name, value);
                    }
                    value
                }
            }
            Err(err) => {
                eprintln!(
                    "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                    var_name, raw, err, default
                );
                default
            }
        },
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bool_true_values() {
        assert_eq!(parse_bool("1", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("true", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("yes", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("y", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("on", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool("TRUE", "TEST_VAR"), Some(true));
        assert_eq!(parse_bool(" true ", "TEST_VAR"), Some(true));
    }

    #[test]
    fn test_parse_bool_false_values() {
        assert_eq!(parse_bool("0", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("false", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("no", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("off", "TEST_VAR"), Some(false));
        assert_eq!(parse_bool("OFF", "TEST_VAR"), Some(false));
    }

    #[test]
    fn test_parse_bool_invalid_values() {
        assert_eq!(parse_bool("invalid", "TEST_VAR"), None);
        assert_eq!(parse_bool("2", "TEST_VAR"), None);
        assert_eq!(parse_bool("", "TEST_VAR"), None);
    }

    #[test]
    fn zero_timeout_disables_the_budget() {
        let config = PackerConfig {
            placement: PlacementConfig::default(),
            default_max_weight: ContainerTemplate::DEFAULT_MAX_WEIGHT,
            placement_timeout_ms: 0,
        };
        assert_eq!(config.placement_timeout(), None);

        let config = PackerConfig {
            placement_timeout_ms: 250,
            ..config
        };
        assert_eq!(
            config.placement_timeout(),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn pack_options_carry_placement_defaults() {
        let placement = PlacementConfig {
            bigger_first: false,
            grid_step: 2.5,
            ..PlacementConfig::default()
        };
        let config = PackerConfig {
            placement,
            default_max_weight: 500.0,
            placement_timeout_ms: 0,
        };

        let options = config.pack_options();
        assert!(!options.placement.bigger_first);
        assert_eq!(options.placement.grid_step, 2.5);
        assert_eq!(options.placement_timeout, None);
        assert_eq!(config.default_max_weight(), 500.0);
    }
}
