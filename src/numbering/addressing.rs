//! Per-unit subnet slicing.
//!
//! Unit `i` (1-indexed) gets the base address moved forward by `i * stride`
//! addresses. The base prefix length is carried over unchanged; no prefix
//! alignment takes place.

use std::net::{Ipv4Addr, Ipv6Addr};

use ipnet::{Ipv4Net, Ipv6Net};

use super::NumberingError;

pub fn parse_ipv4_network(value: &str) -> Result<Ipv4Net, NumberingError> {
    value
        .trim()
        .parse()
        .map_err(|source| NumberingError::InvalidNetwork {
            value: value.to_string(),
            source,
        })
}

pub fn parse_ipv6_network(value: &str) -> Result<Ipv6Net, NumberingError> {
    value
        .trim()
        .parse()
        .map_err(|source| NumberingError::InvalidNetwork {
            value: value.to_string(),
            source,
        })
}

/// Slice `count` IPv4 subnets, one per unit, starting one stride past the base.
pub fn partition_ipv4(
    base: Ipv4Net,
    count: u32,
    stride: u32,
) -> Result<Vec<Ipv4Net>, NumberingError> {
    let start = u32::from(base.addr());
    (1..=count)
        .map(|unit| {
            let exhausted = || NumberingError::AddressSpaceExhausted {
                base: base.to_string(),
                unit,
            };
            let addr = stride
                .checked_mul(unit)
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(exhausted)?;
            Ipv4Net::new(Ipv4Addr::from(addr), base.prefix_len()).map_err(|_| exhausted())
        })
        .collect()
}

/// Slice `count` IPv6 subnets, one per unit, starting one stride past the base.
pub fn partition_ipv6(
    base: Ipv6Net,
    count: u32,
    stride: u128,
) -> Result<Vec<Ipv6Net>, NumberingError> {
    let start = u128::from(base.addr());
    (1..=count)
        .map(|unit| {
            let exhausted = || NumberingError::AddressSpaceExhausted {
                base: base.to_string(),
                unit,
            };
            let addr = stride
                .checked_mul(u128::from(unit))
                .and_then(|offset| start.checked_add(offset))
                .ok_or_else(exhausted)?;
            Ipv6Net::new(Ipv6Addr::from(addr), base.prefix_len()).map_err(|_| exhausted())
        })
        .collect()
}

/// Host address `offset` inside `net`, keeping the prefix length (e.g. a gateway).
pub fn ipv4_host(net: &Ipv4Net, offset: u32) -> Option<Ipv4Net> {
    let addr = u32::from(net.addr()).checked_add(offset)?;
    Ipv4Net::new(Ipv4Addr::from(addr), net.prefix_len()).ok()
}

pub fn ipv6_host(net: &Ipv6Net, offset: u32) -> Option<Ipv6Net> {
    let addr = u128::from(net.addr()).checked_add(u128::from(offset))?;
    Ipv6Net::new(Ipv6Addr::from(addr), net.prefix_len()).ok()
}
