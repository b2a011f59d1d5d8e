use super::esi::{encode_all, esi_applicable};
use super::sequence::{pool, repeat_block, repeat_each, sequence, sequence_inclusive, stepped};
use super::{IdentifierSet, NumberingError, NumberingPlan, ServiceKind, VplsParams, VplsUnits};

/// Multipoint VPLS over QinQ.
///
/// Each VPN instance gets one outer tag carrying the whole inner pool. The
/// Cartesian product of (outer, inner) is flattened into parallel sequences
/// so the templates can walk them positionally: the left side gets one dense
/// unit per (outer, inner) pair, the right side one unit per instance.
pub fn derive(params: &VplsParams, plan: &NumberingPlan) -> Result<IdentifierSet, NumberingError> {
    let pool_size = plan.vpls_inner_vlans;
    let side = Some(params.side);
    let applicable = esi_applicable(ServiceKind::Vpls, side);

    let left_count = params
        .vpn_count
        .checked_mul(pool_size)
        .ok_or(NumberingError::IdRangeOverflow { field: "vpn_count" })?;
    let vpn_ids = sequence(params.vpn_count, params.first_vpn_id, "first_vpn_id")?;
    let inner_pool = pool(pool_size);
    let outer_ids =
        sequence_inclusive(params.vpn_count, params.first_outer_vlan_id, "first_outer_vlan_id")?;
    let right_units = stepped(params.vpn_count, params.first_unit_id, pool_size, "first_unit_id")?;
    let left_units = sequence(left_count, params.first_unit_id, "first_unit_id")?;

    Ok(IdentifierSet {
        kind: ServiceKind::Vpls,
        base_interface: params.base_interface.clone(),
        route_distinguisher: params.route_distinguisher.clone(),
        side,
        offsets: params.offsets,
        unit_ids: left_units,
        subnets: Vec::new(),
        v6subnets: Vec::new(),
        inner_vlans: repeat_block(&inner_pool, params.vpn_count),
        outer_vlans: repeat_each(&outer_ids, pool_size),
        esis: encode_all(applicable, &right_units),
        esi_applicable: applicable,
        vpls: Some(VplsUnits {
            left_vpns: repeat_each(&vpn_ids, pool_size),
            right_units,
            instance_units: (0..pool_size).collect(),
            base_unit: params.first_unit_id,
        }),
        vpn_ids,
    })
}
