use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::models::{yaml_scalar, DeviceRecord};
use crate::numbering::ServiceKind;

#[derive(Debug, Deserialize)]
struct InventoryFile {
    #[serde(rename = "PEs")]
    pes: serde_yaml::Mapping,
}

/// Inventory holds the PE routers in the order they appear in the file
#[derive(Debug, Clone, Default)]
pub struct Inventory {
    pub devices: Vec<DeviceRecord>,
}

impl Inventory {
    /// Load an inventory YAML file with a top-level `PEs` mapping
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read inventory {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid inventory {}", path.display()))
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        let file: InventoryFile = serde_yaml::from_str(text)?;

        let mut devices = Vec::with_capacity(file.pes.len());
        for (key, value) in file.pes {
            let hostname = yaml_scalar(&key)
                .ok_or_else(|| anyhow::anyhow!("Unsupported device key in PEs: {:?}", key))?;
            let mut record: DeviceRecord = serde_yaml::from_value(value)
                .with_context(|| format!("Invalid record for device {}", hostname))?;
            record.hostname = hostname;
            for tag in &record.vpn_types {
                if let Err(e) = tag.parse::<ServiceKind>() {
                    tracing::warn!("{}: ignoring vpn type: {}", record.display_name(), e);
                }
            }
            devices.push(record);
        }

        Ok(Self { devices })
    }

    /// Devices whose `vpn_types` include the requested kind
    pub fn select(&self, kind: ServiceKind) -> impl Iterator<Item = &DeviceRecord> {
        self.devices.iter().filter(move |d| {
            let wanted = d.supports(kind);
            if !wanted {
                tracing::debug!("Skipping {}: no {} service", d.display_name(), kind);
            }
            wanted
        })
    }
}
