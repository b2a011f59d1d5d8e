use super::addressing::{partition_ipv4, partition_ipv6};
use super::sequence::{pool, sequence};
use super::{IdentifierSet, IpVpnParams, NumberingError, NumberingPlan, ServiceKind};

/// Multipoint IP-VPN.
///
/// Subnets are sliced per unit and shared by every VPN instance on the
/// device. Inner tags are the fixed 1-based unit positions; the offsets are
/// left for the templates to apply.
pub fn derive(params: &IpVpnParams, plan: &NumberingPlan) -> Result<IdentifierSet, NumberingError> {
    let subnets = partition_ipv4(params.base_ipv4_network, params.unit_count, plan.ipv4_unit_stride)?;
    let v6subnets = partition_ipv6(params.base_ipv6_network, params.unit_count, plan.ipv6_unit_stride)?;

    Ok(IdentifierSet {
        kind: ServiceKind::Ipvpn,
        base_interface: params.base_interface.clone(),
        route_distinguisher: params.route_distinguisher.clone(),
        side: None,
        offsets: params.offsets,
        vpn_ids: sequence(params.vpn_count, params.first_vpn_id, "first_vpn_id")?,
        unit_ids: sequence(params.unit_count, params.first_unit_id, "first_unit_id")?,
        subnets,
        v6subnets,
        inner_vlans: pool(params.unit_count),
        outer_vlans: Vec::new(),
        esis: Vec::new(),
        esi_applicable: false,
        vpls: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numbering::addressing::{parse_ipv4_network, parse_ipv6_network};
    use crate::numbering::VlanOffsets;

    fn params() -> IpVpnParams {
        IpVpnParams {
            vpn_count: 2,
            first_vpn_id: 100,
            unit_count: 3,
            first_unit_id: 10,
            base_interface: "ge-0/0/0".to_string(),
            route_distinguisher: "65000".to_string(),
            base_ipv4_network: parse_ipv4_network("10.0.0.0/24").unwrap(),
            base_ipv6_network: parse_ipv6_network("2001:db8::/112").unwrap(),
            offsets: VlanOffsets { outer: 100, inner: 0 },
        }
    }

    #[test]
    fn test_ipvpn_scenario() {
        let set = derive(&params(), &NumberingPlan::default()).unwrap();
        assert_eq!(set.vpn_ids, vec![100, 101]);
        assert_eq!(set.unit_ids, vec![10, 11, 12]);
        let bases: Vec<String> = set.subnets.iter().map(|n| n.addr().to_string()).collect();
        assert_eq!(bases, vec!["10.0.1.0", "10.0.2.0", "10.0.3.0"]);
        assert_eq!(set.v6subnets.len(), 3);
        assert_eq!(set.inner_vlans, vec![1, 2, 3]);
        assert!(set.outer_vlans.is_empty());
        assert!(!set.esi_applicable);
        assert!(set.esis.is_empty());
        assert_eq!(set.side, None);
        assert_eq!(set.offsets, VlanOffsets { outer: 100, inner: 0 });
    }

    #[test]
    fn test_ipvpn_unit_sequences_aligned() {
        let mut p = params();
        p.unit_count = 8;
        let set = derive(&p, &NumberingPlan::default()).unwrap();
        assert_eq!(set.unit_ids.len(), 8);
        assert_eq!(set.subnets.len(), 8);
        assert_eq!(set.v6subnets.len(), 8);
        assert_eq!(set.inner_vlans.len(), 8);
    }

    #[test]
    fn test_ipvpn_custom_stride() {
        let plan = NumberingPlan {
            ipv4_unit_stride: 4,
            ..NumberingPlan::default()
        };
        let mut p = params();
        p.base_ipv4_network = parse_ipv4_network("10.0.0.0/30").unwrap();
        let set = derive(&p, &plan).unwrap();
        let shown: Vec<String> = set.subnets.iter().map(|n| n.to_string()).collect();
        assert_eq!(shown, vec!["10.0.0.4/30", "10.0.0.8/30", "10.0.0.12/30"]);
    }

    #[test]
    fn test_ipvpn_unit_range_overflow() {
        let mut p = params();
        p.first_unit_id = u32::MAX - 1;
        let err = derive(&p, &NumberingPlan::default()).unwrap_err();
        assert!(matches!(err, NumberingError::IdRangeOverflow { field: "first_unit_id" }));
    }
}
