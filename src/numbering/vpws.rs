use super::esi::{encode_all, esi_applicable};
use super::sequence::{pool, repeat_block, sequence, sequence_inclusive};
use super::{IdentifierSet, NumberingError, NumberingPlan, ServiceKind, VpwsParams};

/// Point-to-point pseudowire.
///
/// Every instance reuses the same inner tag pool. The ESI range is closed,
/// so it carries one entry past the last VPN id.
pub fn derive(params: &VpwsParams, plan: &NumberingPlan) -> Result<IdentifierSet, NumberingError> {
    let side = Some(params.side);
    let applicable = esi_applicable(ServiceKind::Vpws, side);
    let esi_indices = sequence_inclusive(params.vpn_count, params.first_vpn_id, "first_vpn_id")?;

    Ok(IdentifierSet {
        kind: ServiceKind::Vpws,
        base_interface: params.base_interface.clone(),
        route_distinguisher: params.route_distinguisher.clone(),
        side,
        offsets: params.offsets,
        vpn_ids: sequence(params.vpn_count, params.first_vpn_id, "first_vpn_id")?,
        unit_ids: Vec::new(),
        subnets: Vec::new(),
        v6subnets: Vec::new(),
        inner_vlans: repeat_block(&pool(plan.vpws_inner_vlans), params.vpn_count),
        outer_vlans: Vec::new(),
        esis: encode_all(applicable, &esi_indices),
        esi_applicable: applicable,
        vpls: None,
    })
}
