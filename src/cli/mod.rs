use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::numbering::{ServiceKind, ServiceRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Derive, render and push L2/L3 VPN services to PE routers", long_about = None)]
pub struct Cli {
    #[arg(help = "Inventory YAML with a top-level PEs mapping")]
    pub devices: PathBuf,

    #[arg(short = 'p', long = "pprint-only", help = "Print rendered config instead of pushing it")]
    pub pprint_only: bool,

    #[arg(long, help = "Commit after a clean commit check instead of rolling back")]
    pub commit: bool,

    #[command(subcommand)]
    pub service: ServiceCommand,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ServiceCommand {
    /// Multipoint IP-VPN (VRF) instances
    Ipvpn {
        #[arg(short = 'n', long = "number-of-vpns")]
        vpn_count: u32,
        #[arg(short = 'v', long = "first-vpn-id")]
        first_vpn_id: u32,
        #[arg(short = 'u', long = "number-of-units")]
        unit_count: u32,
        #[arg(short = 'i', long = "first-unit-id")]
        first_unit_id: u32,
    },
    /// Point-to-point pseudowires
    Vpws {
        #[arg(short = 'n', long = "number-of-vpns")]
        vpn_count: u32,
        #[arg(short = 'v', long = "first-vpn-id")]
        first_vpn_id: u32,
    },
    /// Multipoint VPLS over QinQ
    Vpls {
        #[arg(short = 'n', long = "number-of-vpns")]
        vpn_count: u32,
        #[arg(short = 'v', long = "first-vpn-id")]
        first_vpn_id: u32,
        #[arg(short = 'i', long = "first-unit-id")]
        first_unit_id: u32,
        #[arg(short = 'o', long = "first-outer-vlan-id")]
        first_outer_vlan_id: u32,
    },
}

impl ServiceCommand {
    pub fn request(&self) -> ServiceRequest {
        match *self {
            ServiceCommand::Ipvpn {
                vpn_count,
                first_vpn_id,
                unit_count,
                first_unit_id,
            } => ServiceRequest {
                kind: ServiceKind::Ipvpn,
                vpn_count,
                first_vpn_id,
                unit_count: Some(unit_count),
                first_unit_id: Some(first_unit_id),
                first_outer_vlan_id: None,
            },
            ServiceCommand::Vpws {
                vpn_count,
                first_vpn_id,
            } => ServiceRequest {
                kind: ServiceKind::Vpws,
                vpn_count,
                first_vpn_id,
                unit_count: None,
                first_unit_id: None,
                first_outer_vlan_id: None,
            },
            ServiceCommand::Vpls {
                vpn_count,
                first_vpn_id,
                first_unit_id,
                first_outer_vlan_id,
            } => ServiceRequest {
                kind: ServiceKind::Vpls,
                vpn_count,
                first_vpn_id,
                unit_count: None,
                first_unit_id: Some(first_unit_id),
                first_outer_vlan_id: Some(first_outer_vlan_id),
            },
        }
    }
}
