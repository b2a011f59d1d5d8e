//! Numbering engine for VPN provisioning.
//!
//! Everything in here is pure arithmetic: given a fully populated
//! [`ServiceParameters`] value it computes the VLAN tags, subnets, unit
//! numbers and ESIs one device needs for one service kind. Nothing here
//! touches the network, the filesystem or any shared state, so calling
//! [`derive`] twice with the same input always yields the same
//! [`IdentifierSet`].

pub mod addressing;
pub mod esi;
pub mod ipvpn;
pub mod params;
pub mod sequence;
pub mod vpls;
pub mod vpws;

use ipnet::{Ipv4Net, Ipv6Net};
use serde::Serialize;

pub use esi::Esi;
pub use params::{
    DeviceFacts, IpVpnParams, ServiceKind, ServiceParameters, ServiceRequest, Side, VlanOffsets,
    VplsParams, VpwsParams,
};

/// Default IPv4 address stride between consecutive unit subnets (one /24).
pub const DEFAULT_IPV4_UNIT_STRIDE: u32 = 256;
/// Default IPv6 address stride between consecutive unit subnets (one /112).
pub const DEFAULT_IPV6_UNIT_STRIDE: u128 = 65_536;
/// Size of the inner VLAN pool reused by every pseudowire instance.
pub const DEFAULT_VPWS_INNER_VLANS: u32 = 10;
/// Size of the inner VLAN pool carried under each VPLS outer tag.
pub const DEFAULT_VPLS_INNER_VLANS: u32 = 30;

/// Errors raised while building or deriving service numbering.
#[derive(Debug, thiserror::Error)]
pub enum NumberingError {
    #[error("invalid network {value:?}: {source}")]
    InvalidNetwork {
        value: String,
        source: ipnet::AddrParseError,
    },

    #[error("malformed vlan offset pair {0:?}, expected \"<outer> <inner>\"")]
    MalformedOffsetPair(String),

    #[error("unsupported service kind {0:?}")]
    UnsupportedServiceKind(String),

    #[error("{kind} service requires {field}")]
    MissingField {
        kind: ServiceKind,
        field: &'static str,
    },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("{field} runs an identifier range past 4294967295")]
    IdRangeOverflow { field: &'static str },

    #[error("subnet for unit {unit} runs past the end of the address space (base {base})")]
    AddressSpaceExhausted { base: String, unit: u32 },
}

/// Deployment convention constants used by the derivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumberingPlan {
    pub ipv4_unit_stride: u32,
    pub ipv6_unit_stride: u128,
    pub vpws_inner_vlans: u32,
    pub vpls_inner_vlans: u32,
}

impl Default for NumberingPlan {
    fn default() -> Self {
        Self {
            ipv4_unit_stride: DEFAULT_IPV4_UNIT_STRIDE,
            ipv6_unit_stride: DEFAULT_IPV6_UNIT_STRIDE,
            vpws_inner_vlans: DEFAULT_VPWS_INNER_VLANS,
            vpls_inner_vlans: DEFAULT_VPLS_INNER_VLANS,
        }
    }
}

/// VPLS-only unit layout.
///
/// `left_vpns` is positionally aligned with the set's `unit_ids`,
/// `inner_vlans` and `outer_vlans`. `right_units` holds one unit per VPN
/// instance. `instance_units` and `base_unit` let the routing-instance
/// fragment enumerate units on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VplsUnits {
    pub left_vpns: Vec<u32>,
    pub right_units: Vec<u32>,
    pub instance_units: Vec<u32>,
    pub base_unit: u32,
}

/// Complete identifier set for one service kind on one device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentifierSet {
    pub kind: ServiceKind,
    pub base_interface: String,
    pub route_distinguisher: String,
    pub side: Option<Side>,
    pub offsets: VlanOffsets,
    pub vpn_ids: Vec<u32>,
    /// Dense interface units. Empty for pseudowires, which key units by VPN.
    pub unit_ids: Vec<u32>,
    pub subnets: Vec<Ipv4Net>,
    pub v6subnets: Vec<Ipv6Net>,
    pub inner_vlans: Vec<u32>,
    pub outer_vlans: Vec<u32>,
    pub esis: Vec<Esi>,
    pub esi_applicable: bool,
    pub vpls: Option<VplsUnits>,
}

/// Derive the identifier set for any service kind.
pub fn derive(
    params: &ServiceParameters,
    plan: &NumberingPlan,
) -> Result<IdentifierSet, NumberingError> {
    let set = match params {
        ServiceParameters::IpVpn(p) => ipvpn::derive(p, plan)?,
        ServiceParameters::Vpws(p) => vpws::derive(p, plan)?,
        ServiceParameters::Vpls(p) => vpls::derive(p, plan)?,
    };
    tracing::debug!(
        "Derived {} numbering: {} vpns, {} units, {} esis",
        set.kind,
        set.vpn_ids.len(),
        set.unit_ids.len(),
        set.esis.len()
    );
    Ok(set)
}
