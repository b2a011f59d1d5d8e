use std::fmt;

use serde::Serialize;

use super::{ServiceKind, Side};

const ESI_DIGITS: usize = 20;

/// Ethernet Segment Identifier in its 10-octet colon form.
///
/// The index is zero-padded to 20 decimal digits and split into pairs, so
/// index 5 becomes `00:00:00:00:00:00:00:00:00:05`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Esi(String);

impl Esi {
    pub fn from_index(index: u64) -> Self {
        let digits = format!("{:0width$}", index, width = ESI_DIGITS);
        let octets = digits
            .chars()
            .collect::<Vec<_>>()
            .chunks(2)
            .map(|c| c.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join(":");
        Self(octets)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Esi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Only the right-hand side of a pseudowire or VPLS pair advertises an ESI.
pub fn esi_applicable(kind: ServiceKind, side: Option<Side>) -> bool {
    kind.is_side_aware() && side == Some(Side::Right)
}

/// Encode every index, or nothing when ESIs do not apply.
pub fn encode_all(applicable: bool, indices: &[u32]) -> Vec<Esi> {
    if !applicable {
        return Vec::new();
    }
    indices
        .iter()
        .map(|&index| Esi::from_index(u64::from(index)))
        .collect()
}
