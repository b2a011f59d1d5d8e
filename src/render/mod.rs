//! Tera rendering of identifier sets into device configuration text.
//!
//! Each service kind has two templates, `<kind>/routing-instances.tera` and
//! `<kind>/interfaces.tera`. Built-in versions are compiled in; a templates
//! directory can override any of them by name.

use anyhow::Result;
use serde::Serialize;
use tera::{Context, Tera};

use crate::numbering::addressing::{ipv4_host, ipv6_host};
use crate::numbering::{Esi, IdentifierSet, ServiceKind};

const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "ipvpn/routing-instances.tera",
        include_str!("../../templates/ipvpn/routing-instances.tera"),
    ),
    (
        "ipvpn/interfaces.tera",
        include_str!("../../templates/ipvpn/interfaces.tera"),
    ),
    (
        "vpws/routing-instances.tera",
        include_str!("../../templates/vpws/routing-instances.tera"),
    ),
    (
        "vpws/interfaces.tera",
        include_str!("../../templates/vpws/interfaces.tera"),
    ),
    (
        "vpls/routing-instances.tera",
        include_str!("../../templates/vpls/routing-instances.tera"),
    ),
    (
        "vpls/interfaces.tera",
        include_str!("../../templates/vpls/interfaces.tera"),
    ),
];

/// One stacked-tag sub-interface
#[derive(Debug, Clone, Serialize)]
struct Circuit {
    unit: u32,
    outer_vlan: u32,
    inner_vlan: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    gateway6: Option<String>,
}

/// One VPN instance with everything its two fragments need
#[derive(Debug, Clone, Serialize)]
struct Instance {
    vpn: u32,
    outer_vlan: u32,
    /// Unit carrying the whole inner list (pseudowire, VPLS right side)
    unit: Option<u32>,
    inner_list: String,
    esi: Option<Esi>,
    circuits: Vec<Circuit>,
}

pub struct Renderer {
    tera: Tera,
    gateway_host_offset: u32,
}

impl Renderer {
    /// Build the renderer. An empty `templates_dir` uses the built-ins only.
    pub fn new(templates_dir: &str, gateway_host_offset: u32) -> Result<Self> {
        let mut tera = if templates_dir.is_empty() {
            Tera::default()
        } else {
            let glob = format!("{}/**/*.tera", templates_dir.trim_end_matches('/'));
            let overrides = Tera::new(&glob)
                .map_err(|e| anyhow::anyhow!("Invalid templates in {}: {}", templates_dir, e))?;
            tracing::info!(
                "Loaded {} template overrides from {}",
                overrides.get_template_names().count(),
                templates_dir
            );
            overrides
        };

        // `extend` keeps templates already present, so overrides win
        let mut builtin = Tera::default();
        builtin
            .add_raw_templates(BUILTIN_TEMPLATES.to_vec())
            .map_err(|e| anyhow::anyhow!("Invalid built-in template: {}", e))?;
        tera.extend(&builtin)
            .map_err(|e| anyhow::anyhow!("Failed to merge templates: {}", e))?;

        Ok(Self {
            tera,
            gateway_host_offset,
        })
    }

    /// Render both fragments for one device and join them
    pub fn render_device(&self, set: &IdentifierSet) -> Result<String> {
        let context = self.build_context(set)?;
        let routing = self.render_fragment(set.kind, "routing-instances", &context)?;
        let interfaces = self.render_fragment(set.kind, "interfaces", &context)?;
        Ok(format!("{}\n{}\n", routing, interfaces))
    }

    fn render_fragment(&self, kind: ServiceKind, fragment: &str, context: &Context) -> Result<String> {
        let name = format!("{}/{}.tera", kind, fragment);
        self.tera
            .render(&name, context)
            .map_err(|e| anyhow::anyhow!("Template rendering failed for {}: {}", name, e))
    }

    fn build_context(&self, set: &IdentifierSet) -> Result<Context> {
        let mut context = Context::new();
        context.insert("kind", &set.kind);
        context.insert("base_interface", &set.base_interface);
        context.insert("rd", &set.route_distinguisher);
        context.insert("side", &set.side);
        context.insert("outer_offset", &set.offsets.outer);
        context.insert("inner_offset", &set.offsets.inner);
        context.insert("vpns", &set.vpn_ids);
        context.insert("units", &set.unit_ids);
        context.insert("number_of_units", &set.unit_ids.len());
        context.insert("subnets", &set.subnets);
        context.insert("v6subnets", &set.v6subnets);
        context.insert("inner_vlans", &set.inner_vlans);
        context.insert("outer_vlans", &set.outer_vlans);
        context.insert("esis", &set.esis);
        context.insert("esi_exists", &set.esi_applicable);

        if let Some(vpls) = &set.vpls {
            context.insert("left_vpns", &vpls.left_vpns);
            context.insert("left_units", &set.unit_ids);
            context.insert("right_units", &vpls.right_units);
            context.insert("instance_units", &vpls.instance_units);
            context.insert("base_unit", &vpls.base_unit);
        }

        let instances = match set.kind {
            ServiceKind::Ipvpn => self.ipvpn_instances(set)?,
            ServiceKind::Vpws => vpws_instances(set)?,
            ServiceKind::Vpls => vpls_instances(set)?,
        };
        context.insert("instances", &instances);
        Ok(context)
    }

    /// Every VPN gets every unit; unit numbers are shifted per instance so
    /// they stay unique on the shared physical interface.
    fn ipvpn_instances(&self, set: &IdentifierSet) -> Result<Vec<Instance>> {
        let offsets = set.offsets;
        let unit_count = set.unit_ids.len() as u32;
        let mut instances = Vec::with_capacity(set.vpn_ids.len());

        for (position, &vpn) in set.vpn_ids.iter().enumerate() {
            let shift = u32::try_from(position)
                .ok()
                .and_then(|p| p.checked_mul(unit_count))
                .ok_or_else(|| anyhow::anyhow!("Too many units for vpn {}", vpn))?;
            let outer_vlan = shifted(vpn, offsets.outer, "outer vlan")?;
            let mut circuits = Vec::with_capacity(set.unit_ids.len());
            for (((&unit, &inner), subnet), subnet6) in set
                .unit_ids
                .iter()
                .zip(&set.inner_vlans)
                .zip(&set.subnets)
                .zip(&set.v6subnets)
            {
                let gateway = ipv4_host(subnet, self.gateway_host_offset)
                    .ok_or_else(|| anyhow::anyhow!("No gateway address in {}", subnet))?;
                let gateway6 = ipv6_host(subnet6, self.gateway_host_offset)
                    .ok_or_else(|| anyhow::anyhow!("No gateway address in {}", subnet6))?;
                circuits.push(Circuit {
                    unit: shifted(unit, shift, "unit")?,
                    outer_vlan,
                    inner_vlan: shifted(inner, offsets.inner, "inner vlan")?,
                    gateway: Some(gateway.to_string()),
                    gateway6: Some(gateway6.to_string()),
                });
            }
            instances.push(Instance {
                vpn,
                outer_vlan,
                unit: None,
                inner_list: String::new(),
                esi: None,
                circuits,
            });
        }
        Ok(instances)
    }
}

/// One pseudowire per VPN, unit numbered after the VPN id
fn vpws_instances(set: &IdentifierSet) -> Result<Vec<Instance>> {
    let offsets = set.offsets;
    let per_vpn = set.inner_vlans.len().checked_div(set.vpn_ids.len()).unwrap_or(0).max(1);

    set.vpn_ids
        .iter()
        .zip(set.inner_vlans.chunks(per_vpn))
        .enumerate()
        .map(|(position, (&vpn, inner))| {
            Ok(Instance {
                vpn,
                outer_vlan: shifted(vpn, offsets.outer, "outer vlan")?,
                unit: Some(vpn),
                inner_list: join_tags(inner, offsets.inner)?,
                esi: set.esis.get(position).cloned(),
                circuits: Vec::new(),
            })
        })
        .collect()
}

fn vpls_instances(set: &IdentifierSet) -> Result<Vec<Instance>> {
    let offsets = set.offsets;
    let Some(vpls) = &set.vpls else {
        return Ok(Vec::new());
    };
    let pool_size = vpls.instance_units.len().max(1);

    set.vpn_ids
        .iter()
        .enumerate()
        .map(|(position, &vpn)| {
            let start = position * pool_size;
            let end = start + pool_size;
            let circuits = set.unit_ids[start..end]
                .iter()
                .zip(&set.outer_vlans[start..end])
                .zip(&set.inner_vlans[start..end])
                .map(|((&unit, &outer), &inner)| {
                    Ok(Circuit {
                        unit,
                        outer_vlan: shifted(outer, offsets.outer, "outer vlan")?,
                        inner_vlan: shifted(inner, offsets.inner, "inner vlan")?,
                        gateway: None,
                        gateway6: None,
                    })
                })
                .collect::<Result<Vec<Circuit>>>()?;
            Ok(Instance {
                vpn,
                outer_vlan: shifted(set.outer_vlans[start], offsets.outer, "outer vlan")?,
                unit: vpls.right_units.get(position).copied(),
                inner_list: join_tags(&set.inner_vlans[start..end], offsets.inner)?,
                esi: set.esis.get(position).cloned(),
                circuits,
            })
        })
        .collect()
}

/// `value + offset`, refusing to wrap
fn shifted(value: u32, offset: u32, what: &str) -> Result<u32> {
    value
        .checked_add(offset)
        .ok_or_else(|| anyhow::anyhow!("{} {} plus offset {} overflows", what, value, offset))
}

fn join_tags(tags: &[u32], offset: u32) -> Result<String> {
    let shifted_tags = tags
        .iter()
        .map(|&tag| shifted(tag, offset, "inner vlan").map(|t| t.to_string()))
        .collect::<Result<Vec<_>>>()?;
    Ok(shifted_tags.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::{derive, DeviceFacts, NumberingPlan, ServiceParameters, ServiceRequest, Side};

    fn render(kind: ServiceKind, side: Option<Side>) -> String {
        let request = ServiceRequest {
            kind,
            vpn_count: 2,
            first_vpn_id: 100,
            unit_count: Some(3),
            first_unit_id: Some(10),
            first_outer_vlan_id: Some(50),
        };
        let facts = DeviceFacts {
            base_interface: "xe-0/0/1",
            route_distinguisher: "65000",
            side,
            ipv4_network: Some("10.0.0.0/24"),
            ipv6_network: Some("2001:db8::/112"),
            vlan_offsets: Some("1000 0"),
        };
        let params = ServiceParameters::new(&request, &facts).unwrap();
        let set = derive(&params, &NumberingPlan::default()).unwrap();
        Renderer::new("", 1).unwrap().render_device(&set).unwrap()
    }

    #[test]
    fn test_render_ipvpn() {
        let config = render(ServiceKind::Ipvpn, None);
        assert!(config.contains("routing-instances {"));
        assert!(config.contains("ipvpn-100 {"));
        assert!(config.contains("ipvpn-101 {"));
        assert!(config.contains("interface xe-0/0/1.10;"));
        // Second instance shifts units past the first instance's block
        assert!(config.contains("interface xe-0/0/1.13;"));
        assert!(config.contains("route-distinguisher 65000:100;"));
        assert!(config.contains("vlan-tags outer 1100 inner 1;"));
        assert!(config.contains("address 10.0.1.1/24;"));
        assert!(config.contains("address 2001:db8::3:1/112;"));
        assert!(!config.contains("esi"));
    }

    #[test]
    fn test_render_vpws_right_has_esi() {
        let config = render(ServiceKind::Vpws, Some(Side::Right));
        assert!(config.contains("vpws-100 {"));
        assert!(config.contains("unit 101 {"));
        assert!(config.contains("inner-list [ 1 2 3 4 5 6 7 8 9 10 ];"));
        assert!(config.contains("00:00:00:00:00:00:00:00:01:00;"));
        assert!(config.contains("00:00:00:00:00:00:00:00:01:01;"));
        assert!(!config.contains("00:00:00:00:00:00:00:00:01:02;"));
    }

    #[test]
    fn test_render_vpws_left_has_no_esi() {
        let config = render(ServiceKind::Vpws, Some(Side::Left));
        assert!(config.contains("vpws-101 {"));
        assert!(!config.contains("esi"));
    }

    #[test]
    fn test_render_vpls_left_uses_dense_units() {
        let config = render(ServiceKind::Vpls, Some(Side::Left));
        assert!(config.contains("vpls-100 {"));
        assert!(config.contains("unit 10 {"));
        assert!(config.contains("unit 69 {"));
        assert!(config.contains("vlan-tags outer 1050 inner 1;"));
        assert!(config.contains("vlan-tags outer 1051 inner 30;"));
        assert!(config.contains("interface xe-0/0/1.39;"));
        assert!(!config.contains("esi"));
    }

    #[test]
    fn test_render_vpls_right_uses_sparse_units() {
        let config = render(ServiceKind::Vpls, Some(Side::Right));
        assert!(config.contains("unit 10 {"));
        assert!(config.contains("unit 40 {"));
        assert!(!config.contains("unit 11 {"));
        assert!(config.contains("interface xe-0/0/1.40;"));
        assert!(config.contains("00:00:00:00:00:00:00:00:00:40;"));
    }

    #[test]
    fn test_render_is_deterministic() {
        assert_eq!(
            render(ServiceKind::Vpls, Some(Side::Right)),
            render(ServiceKind::Vpls, Some(Side::Right))
        );
    }

    #[test]
    fn test_render_rejects_wrapping_offsets() {
        let request = ServiceRequest {
            kind: ServiceKind::Vpws,
            vpn_count: 1,
            first_vpn_id: 100,
            unit_count: None,
            first_unit_id: None,
            first_outer_vlan_id: None,
        };
        let facts = DeviceFacts {
            base_interface: "xe-0/0/1",
            route_distinguisher: "65000",
            side: Some(Side::Left),
            ipv4_network: None,
            ipv6_network: None,
            vlan_offsets: Some("4294967295 0"),
        };
        let params = ServiceParameters::new(&request, &facts).unwrap();
        let set = derive(&params, &NumberingPlan::default()).unwrap();
        let err = Renderer::new("", 1).unwrap().render_device(&set).unwrap_err();
        assert!(err.to_string().contains("outer vlan 100"));
    }

    #[test]
    fn test_join_tags() {
        assert_eq!(join_tags(&[1, 2, 3], 100).unwrap(), "101 102 103");
        assert_eq!(join_tags(&[], 0).unwrap(), "");
        assert!(join_tags(&[1, 2], u32::MAX - 1).is_err());
    }
}
