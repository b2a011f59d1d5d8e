use std::env;
use std::str::FromStr;

use crate::numbering::{
    NumberingPlan, DEFAULT_IPV4_UNIT_STRIDE, DEFAULT_IPV6_UNIT_STRIDE, DEFAULT_VPLS_INNER_VLANS,
    DEFAULT_VPWS_INNER_VLANS,
};

/// Config holds all application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub templates_dir: String,
    pub device_user: String,
    pub device_password: String,
    pub ssh_timeout_secs: u64,
    pub max_parallel_devices: usize,
    pub gateway_host_offset: u32,
    pub numbering: NumberingPlan,
}

impl Config {
    /// Load configuration from environment variables with defaults
    pub fn load() -> Self {
        Self {
            templates_dir: get_env("TEMPLATES_DIR", ""),
            device_user: get_env("DEVICE_USER", "admin"),
            device_password: get_env("DEVICE_PASSWORD", "admin"),
            ssh_timeout_secs: get_env_positive("SSH_TIMEOUT_SECS", 60),
            max_parallel_devices: get_env_positive("MAX_PARALLEL_DEVICES", 4),
            gateway_host_offset: get_env_positive("GATEWAY_HOST_OFFSET", 1),
            numbering: NumberingPlan {
                ipv4_unit_stride: get_env_positive("IPV4_UNIT_STRIDE", DEFAULT_IPV4_UNIT_STRIDE),
                ipv6_unit_stride: get_env_positive("IPV6_UNIT_STRIDE", DEFAULT_IPV6_UNIT_STRIDE),
                vpws_inner_vlans: get_env_positive("VPWS_INNER_VLANS", DEFAULT_VPWS_INNER_VLANS),
                vpls_inner_vlans: get_env_positive("VPLS_INNER_VLANS", DEFAULT_VPLS_INNER_VLANS),
            },
        }
    }
}

fn get_env(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn get_env_positive<T>(key: &str, default: T) -> T
where
    T: FromStr + PartialOrd + Default,
{
    parse_positive(env::var(key).ok().as_deref(), default)
}

/// Parse a strictly positive number, falling back to `default` otherwise
fn parse_positive<T>(raw: Option<&str>, default: T) -> T
where
    T: FromStr + PartialOrd + Default,
{
    raw.and_then(|v| v.trim().parse::<T>().ok())
        .filter(|v| *v > T::default())
        .unwrap_or(default)
}
