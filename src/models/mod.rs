use serde::{de, Deserialize, Deserializer};

use crate::numbering::{DeviceFacts, ServiceKind, Side};

/// DeviceRecord is one PE router entry from the inventory file
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceRecord {
    /// Management hostname; taken from the inventory key, not the record body
    #[serde(skip)]
    pub hostname: String,
    #[serde(default)]
    pub name: Option<String>,
    /// Management address when it differs from the inventory key
    #[serde(default)]
    pub host: Option<String>,
    /// Raw service tags; unknown ones are reported and ignored at load time
    #[serde(default)]
    pub vpn_types: Vec<String>,
    pub base_interface: String,
    #[serde(deserialize_with = "scalar_string")]
    pub rd: String,
    #[serde(default)]
    pub side: Option<Side>,
    #[serde(default)]
    pub ipvpn_ipnet: Option<String>,
    #[serde(default)]
    pub ipvpn_ipv6net: Option<String>,
    #[serde(default)]
    pub vlan_offsets: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

impl DeviceRecord {
    /// Name shown in logs and reports, falling back to the hostname
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.hostname)
    }

    pub fn address(&self) -> &str {
        self.host.as_deref().unwrap_or(&self.hostname)
    }

    pub fn supports(&self, kind: ServiceKind) -> bool {
        self.vpn_types.iter().any(|tag| tag.trim() == kind.as_str())
    }

    pub fn facts(&self) -> DeviceFacts<'_> {
        DeviceFacts {
            base_interface: &self.base_interface,
            route_distinguisher: &self.rd,
            side: self.side,
            ipv4_network: self.ipvpn_ipnet.as_deref(),
            ipv6_network: self.ipvpn_ipv6net.as_deref(),
            vlan_offsets: self.vlan_offsets.as_deref(),
        }
    }
}

/// Render a YAML string or number as text, e.g. an unquoted `rd: 65000`
pub fn yaml_scalar(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let value = serde_yaml::Value::deserialize(deserializer)?;
    yaml_scalar(&value)
        .ok_or_else(|| de::Error::custom(format!("expected a string or number, got {:?}", value)))
}

/// Canonical push outcome values reported per device
pub mod push_status {
    pub const PRINTED: &str = "printed";
    pub const ROLLED_BACK: &str = "rolled-back";
    pub const COMMITTED: &str = "committed";
    pub const FAILED: &str = "failed";
}
