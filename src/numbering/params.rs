use std::fmt;
use std::str::FromStr;

use ipnet::{Ipv4Net, Ipv6Net};
use serde::{Deserialize, Serialize};

use super::addressing::{parse_ipv4_network, parse_ipv6_network};
use super::NumberingError;

/// The three supported service topologies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceKind {
    Ipvpn,
    Vpws,
    Vpls,
}

impl ServiceKind {
    pub const ALL: [ServiceKind; 3] = [ServiceKind::Ipvpn, ServiceKind::Vpws, ServiceKind::Vpls];

    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::Ipvpn => "ipvpn",
            ServiceKind::Vpws => "vpws",
            ServiceKind::Vpls => "vpls",
        }
    }

    /// Pseudowire and VPLS instances come in left/right pairs; IP-VPN does not.
    pub fn is_side_aware(&self) -> bool {
        matches!(self, ServiceKind::Vpws | ServiceKind::Vpls)
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = NumberingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        ServiceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| NumberingError::UnsupportedServiceKind(s.to_string()))
    }
}

/// Which end of a redundant pseudowire/VPLS pair a device sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Outer/inner VLAN offsets added by the templates when forming stacked tags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct VlanOffsets {
    pub outer: u32,
    pub inner: u32,
}

impl FromStr for VlanOffsets {
    type Err = NumberingError;

    /// Parse the inventory form `"<outer> <inner>"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || NumberingError::MalformedOffsetPair(s.to_string());
        let tokens: Vec<&str> = s.split_whitespace().collect();
        let [outer, inner] = tokens.as_slice() else {
            return Err(malformed());
        };
        Ok(Self {
            outer: outer.parse().map_err(|_| malformed())?,
            inner: inner.parse().map_err(|_| malformed())?,
        })
    }
}

/// Run-wide fields chosen on the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    pub kind: ServiceKind,
    pub vpn_count: u32,
    pub first_vpn_id: u32,
    pub unit_count: Option<u32>,
    pub first_unit_id: Option<u32>,
    pub first_outer_vlan_id: Option<u32>,
}

/// Per-device fields taken from an inventory record
#[derive(Debug, Clone, Copy)]
pub struct DeviceFacts<'a> {
    pub base_interface: &'a str,
    pub route_distinguisher: &'a str,
    pub side: Option<Side>,
    pub ipv4_network: Option<&'a str>,
    pub ipv6_network: Option<&'a str>,
    pub vlan_offsets: Option<&'a str>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IpVpnParams {
    pub vpn_count: u32,
    pub first_vpn_id: u32,
    pub unit_count: u32,
    pub first_unit_id: u32,
    pub base_interface: String,
    pub route_distinguisher: String,
    pub base_ipv4_network: Ipv4Net,
    pub base_ipv6_network: Ipv6Net,
    pub offsets: VlanOffsets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VpwsParams {
    pub vpn_count: u32,
    pub first_vpn_id: u32,
    pub base_interface: String,
    pub route_distinguisher: String,
    pub side: Side,
    pub offsets: VlanOffsets,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VplsParams {
    pub vpn_count: u32,
    pub first_vpn_id: u32,
    pub first_unit_id: u32,
    pub first_outer_vlan_id: u32,
    pub base_interface: String,
    pub route_distinguisher: String,
    pub side: Side,
    pub offsets: VlanOffsets,
}

/// Validated service parameters, one variant per topology.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceParameters {
    IpVpn(IpVpnParams),
    Vpws(VpwsParams),
    Vpls(VplsParams),
}

impl ServiceParameters {
    /// Merge a run request with one device's facts.
    ///
    /// Every field the selected topology needs is checked here, so a value of
    /// this type can always be derived without further validation.
    pub fn new(request: &ServiceRequest, facts: &DeviceFacts<'_>) -> Result<Self, NumberingError> {
        let kind = request.kind;
        let required = |value: Option<u32>, field: &'static str| {
            value.ok_or(NumberingError::MissingField { kind, field })
        };

        if request.vpn_count == 0 {
            return Err(NumberingError::ZeroCount { field: "vpn_count" });
        }
        let offsets: VlanOffsets = facts
            .vlan_offsets
            .ok_or(NumberingError::MissingField { kind, field: "vlan_offsets" })?
            .parse()?;
        let base_interface = facts.base_interface.to_string();
        let route_distinguisher = facts.route_distinguisher.to_string();

        let params = match kind {
            ServiceKind::Ipvpn => {
                let unit_count = required(request.unit_count, "unit_count")?;
                if unit_count == 0 {
                    return Err(NumberingError::ZeroCount { field: "unit_count" });
                }
                let ipv4 = facts
                    .ipv4_network
                    .ok_or(NumberingError::MissingField { kind, field: "ipvpn_ipnet" })?;
                let ipv6 = facts
                    .ipv6_network
                    .ok_or(NumberingError::MissingField { kind, field: "ipvpn_ipv6net" })?;
                ServiceParameters::IpVpn(IpVpnParams {
                    vpn_count: request.vpn_count,
                    first_vpn_id: request.first_vpn_id,
                    unit_count,
                    first_unit_id: required(request.first_unit_id, "first_unit_id")?,
                    base_interface,
                    route_distinguisher,
                    base_ipv4_network: parse_ipv4_network(ipv4)?,
                    base_ipv6_network: parse_ipv6_network(ipv6)?,
                    offsets,
                })
            }
            ServiceKind::Vpws => ServiceParameters::Vpws(VpwsParams {
                vpn_count: request.vpn_count,
                first_vpn_id: request.first_vpn_id,
                base_interface,
                route_distinguisher,
                side: facts.side.ok_or(NumberingError::MissingField { kind, field: "side" })?,
                offsets,
            }),
            ServiceKind::Vpls => ServiceParameters::Vpls(VplsParams {
                vpn_count: request.vpn_count,
                first_vpn_id: request.first_vpn_id,
                first_unit_id: required(request.first_unit_id, "first_unit_id")?,
                first_outer_vlan_id: required(request.first_outer_vlan_id, "first_outer_vlan_id")?,
                base_interface,
                route_distinguisher,
                side: facts.side.ok_or(NumberingError::MissingField { kind, field: "side" })?,
                offsets,
            }),
        };
        Ok(params)
    }
}
