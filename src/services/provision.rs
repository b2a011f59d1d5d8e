use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;

use crate::config::Config;
use crate::inventory::Inventory;
use crate::models::DeviceRecord;
use crate::numbering::{self, NumberingPlan, ServiceParameters, ServiceRequest};
use crate::render::Renderer;
use crate::transport::{ConfigTransport, PushOutcome, PushTarget};

/// Outcome of provisioning one device
#[derive(Debug)]
pub struct DeviceReport {
    pub hostname: String,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: i64,
    pub result: Result<PushOutcome>,
}

/// ProvisionService turns an inventory plus a service request into pushed configs
pub struct ProvisionService {
    plan: NumberingPlan,
    renderer: Renderer,
    transport: Arc<dyn ConfigTransport>,
    default_user: String,
    default_password: String,
    max_parallel: usize,
}

impl ProvisionService {
    pub fn new(config: &Config, renderer: Renderer, transport: Arc<dyn ConfigTransport>) -> Self {
        Self {
            plan: config.numbering,
            renderer,
            transport,
            default_user: config.device_user.clone(),
            default_password: config.device_password.clone(),
            max_parallel: config.max_parallel_devices.max(1),
        }
    }

    /// Derive and render one device's config. Nothing is sent anywhere.
    pub fn prepare(&self, device: &DeviceRecord, request: &ServiceRequest) -> Result<(PushTarget, String)> {
        let params = ServiceParameters::new(request, &device.facts())
            .with_context(|| format!("Invalid {} parameters for {}", request.kind, device.hostname))?;
        let set = numbering::derive(&params, &self.plan)
            .with_context(|| format!("Numbering failed for {}", device.hostname))?;
        let config = self
            .renderer
            .render_device(&set)
            .with_context(|| format!("Rendering failed for {}", device.hostname))?;

        let target = PushTarget {
            hostname: device.address().to_string(),
            username: device.username.clone().unwrap_or_else(|| self.default_user.clone()),
            password: device.password.clone().unwrap_or_else(|| self.default_password.clone()),
        };
        Ok((target, config))
    }

    pub async fn provision_device(&self, device: &DeviceRecord, request: &ServiceRequest) -> DeviceReport {
        let started_at = Utc::now();
        tracing::info!("{}: provisioning {}", device.display_name(), request.kind);

        let result = match self.prepare(device, request) {
            Ok((target, config)) => self.transport.push(&target, &config).await,
            Err(e) => Err(e),
        };

        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
        match &result {
            Ok(outcome) => tracing::info!(
                "{}: {} in {}ms",
                device.display_name(),
                outcome.status,
                elapsed_ms
            ),
            Err(e) => tracing::error!("{}: {:#}", device.display_name(), e),
        }

        DeviceReport {
            hostname: device.hostname.clone(),
            name: device.display_name().to_string(),
            started_at,
            elapsed_ms,
            result,
        }
    }

    /// Provision every device carrying the requested service kind.
    /// Devices run concurrently up to the configured limit; reports keep
    /// inventory order.
    pub async fn run(&self, inventory: &Inventory, request: &ServiceRequest) -> Vec<DeviceReport> {
        let devices: Vec<&DeviceRecord> = inventory.select(request.kind).collect();
        tracing::info!(
            "Provisioning {} {} instance(s) from id {} on {} device(s)",
            request.vpn_count,
            request.kind,
            request.first_vpn_id,
            devices.len()
        );

        stream::iter(devices)
            .map(|device| self.provision_device(device, request))
            .buffered(self.max_parallel)
            .collect()
            .await
    }
}
