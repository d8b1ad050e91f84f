use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;

use tracing::{info, warn};

use crate::allocator::LabelStyle;

/// Complete application configuration, loaded from environment variables or default values.
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub planner: PlannerConfig,
}

impl AppConfig {
    /// Creates a configuration from the currently available environment variables.
    pub fn from_env() -> Self {
        Self {
            api: ApiConfig::from_env(),
            planner: PlannerConfig::from_env(),
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
    const HOST_VAR: &'static str = "PALLET_PLAN_API_HOST";
    const PORT_VAR: &'static str = "PALLET_PLAN_API_PORT";

    fn from_env() -> Self {
        Self::from_values(env_string(Self::HOST_VAR), env_string(Self::PORT_VAR))
    }

    fn from_values(host: Option<String>, port: Option<String>) -> Self {
        let host_value = host.unwrap_or_else(|| Self::DEFAULT_HOST.to_string());
        let (bind_ip, display_host) = match host_value.parse::<IpAddr>() {
            Ok(ip) => (ip, host_value),
            Err(err) => {
                warn!(
                    "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                    Self::HOST_VAR,
                    host_value,
                    err,
                    Self::DEFAULT_HOST
                );
                (
                    IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                    Self::DEFAULT_HOST.to_string(),
                )
            }
        };

        let port = match port {
            Some(raw) => match raw.parse::<u16>() {
                Ok(value) if value != 0 => value,
                Ok(_) => {
                    warn!(
                        "⚠️ {} must not be 0. Using {}.",
                        Self::PORT_VAR,
                        Self::DEFAULT_PORT
                    );
                    Self::DEFAULT_PORT
                }
                Err(err) => {
                    warn!(
                        "⚠️ Could not parse {} ('{}'): {}. Using {}.",
                        Self::PORT_VAR,
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
            display_host,
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

    pub fn uses_default_host(&self) -> bool {
        self.display_host == Self::DEFAULT_HOST
    }
}

/// Configuration of the planning engine and the live workbench.
#[derive(Clone, Debug)]
pub struct PlannerConfig {
    style: LabelStyle,
    debounce: Duration,
    share_path: String,
}

impl PlannerConfig {
    pub const DEFAULT_DEBOUNCE_MS: u64 = 200;
    pub const DEFAULT_SHARE_PATH: &'static str = "/";

    const DEBOUNCE_VAR: &'static str = "PALLET_PLAN_RECALC_DEBOUNCE_MS";
    const SEPARATOR_VAR: &'static str = "PALLET_PLAN_SEGMENT_SEPARATOR";
    const UNIT_VAR: &'static str = "PALLET_PLAN_UNIT_NAME";
    const SHORT_FILL_TAG_VAR: &'static str = "PALLET_PLAN_SHORT_FILL_TAG";
    const FULL_PALLETS_VAR: &'static str = "PALLET_PLAN_FULL_PALLET_NAME";
    const SHARE_PATH_VAR: &'static str = "PALLET_PLAN_SHARE_PATH";

    fn from_env() -> Self {
        let debounce_ms = parse_u64_setting(
            Self::DEBOUNCE_VAR,
            env_string(Self::DEBOUNCE_VAR),
            Self::DEFAULT_DEBOUNCE_MS,
            |value| (1..=10_000).contains(&value),
            "must be between 1 and 10000",
        );

        // The separator is read untrimmed so ", " keeps its space.
        let separator = env::var(Self::SEPARATOR_VAR)
            .ok()
            .filter(|raw| !raw.is_empty())
            .unwrap_or_else(|| LabelStyle::DEFAULT_SEPARATOR.to_string());

        let style = LabelStyle::builder()
            .separator(separator)
            .unit(env_string(Self::UNIT_VAR).unwrap_or_else(|| LabelStyle::DEFAULT_UNIT.into()))
            .short_fill_tag(
                env_string(Self::SHORT_FILL_TAG_VAR)
                    .unwrap_or_else(|| LabelStyle::DEFAULT_SHORT_FILL_TAG.into()),
            )
            .full_pallets(
                env_string(Self::FULL_PALLETS_VAR)
                    .unwrap_or_else(|| LabelStyle::DEFAULT_FULL_PALLETS.into()),
            )
            .build();

        if style != LabelStyle::default() {
            info!("🏷️ Custom label vocabulary in use: {:?}", style);
        }

        Self {
            style,
            debounce: Duration::from_millis(debounce_ms),
            share_path: normalize_share_path(env_string(Self::SHARE_PATH_VAR)),
        }
    }

    /// Vocabulary for labels and summary texts.
    pub fn label_style(&self) -> &LabelStyle {
        &self.style
    }

    /// Delay between the last edit and the workbench recalculation.
    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    /// Path prefix under which share links are opened.
    pub fn share_path(&self) -> &str {
        &self.share_path
    }
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            style: LabelStyle::default(),
            debounce: Duration::from_millis(Self::DEFAULT_DEBOUNCE_MS),
            share_path: Self::DEFAULT_SHARE_PATH.to_string(),
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
            warn!("⚠️ Access to {} failed: {}. Using default value.", name, err);
            None
        }
    }
}

fn parse_u64_setting(
    var_name: &str,
    raw: Option<String>,
    default: u64,
    validator: impl Fn(u64) -> bool,
    invalid_hint: &str,
) -> u64 {
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<u64>() {
        Ok(value) if validator(value) => value,
        Ok(_) => {
            warn!(
                "⚠️ {} contains invalid value '{}': {}. Using {}.",
                var_name, raw, invalid_hint, default
            );
            default
        }
        Err(err) => {
            warn!(
                "⚠️ Could not parse {} ('{}') as number: {}. Using {}.",
                var_name, raw, err, default
            );
            default
        }
    }
}

fn normalize_share_path(raw: Option<String>) -> String {
    match raw {
        Some(path) if path.starts_with('/') => path,
        Some(path) => format!("/{path}"),
        None => PlannerConfig::DEFAULT_SHARE_PATH.to_string(),
    }
}
