//! Integer sequences for VPN ids, unit numbers and VLAN tag pools.
//!
//! Every range is checked against `u32::MAX`; `field` names the request
//! value that pushed it over.

use super::NumberingError;

/// Half-open range `[first, first + count)`.
pub fn sequence(count: u32, first: u32, field: &'static str) -> Result<Vec<u32>, NumberingError> {
    (0..count)
        .map(|offset| first.checked_add(offset).ok_or(NumberingError::IdRangeOverflow { field }))
        .collect()
}

/// Closed range `[first, first + count]`, one entry longer than [`sequence`].
pub fn sequence_inclusive(
    count: u32,
    first: u32,
    field: &'static str,
) -> Result<Vec<u32>, NumberingError> {
    (0..=count)
        .map(|offset| first.checked_add(offset).ok_or(NumberingError::IdRangeOverflow { field }))
        .collect()
}

/// `count` values starting at `first`, spaced `step` apart.
pub fn stepped(
    count: u32,
    first: u32,
    step: u32,
    field: &'static str,
) -> Result<Vec<u32>, NumberingError> {
    (0..count)
        .map(|offset| {
            offset
                .checked_mul(step)
                .and_then(|delta| first.checked_add(delta))
                .ok_or(NumberingError::IdRangeOverflow { field })
        })
        .collect()
}

/// Tag pool `[1, size]`.
pub fn pool(size: u32) -> Vec<u32> {
    (1..=size).collect()
}

/// The whole block, `times` times over: `[1, 2, 1, 2]` for `([1, 2], 2)`.
pub fn repeat_block(block: &[u32], times: u32) -> Vec<u32> {
    (0..times).flat_map(|_| block.iter().copied()).collect()
}

/// Every value `each` times in a row: `[1, 1, 2, 2]` for `([1, 2], 2)`.
pub fn repeat_each(values: &[u32], each: u32) -> Vec<u32> {
    values
        .iter()
        .flat_map(|&value| std::iter::repeat(value).take(each as usize))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_half_open() {
        for (count, first) in [(1, 0), (3, 10), (5, 4090), (64, 1000)] {
            let seq = sequence(count, first, "first_vpn_id").unwrap();
            assert_eq!(seq.len(), count as usize);
            assert_eq!(seq[0], first);
            assert_eq!(*seq.last().unwrap(), first + count - 1);
            assert!(seq.windows(2).all(|w| w[1] == w[0] + 1));
        }
    }

    #[test]
    fn test_sequence_zero_count_is_empty() {
        assert!(sequence(0, 100, "first_vpn_id").unwrap().is_empty());
        assert!(stepped(0, 100, 30, "first_unit_id").unwrap().is_empty());
    }

    #[test]
    fn test_sequence_inclusive_has_extra_entry() {
        assert_eq!(sequence_inclusive(3, 200, "first_vpn_id").unwrap(), vec![200, 201, 202, 203]);
        assert_eq!(sequence_inclusive(0, 7, "first_vpn_id").unwrap(), vec![7]);
    }

    #[test]
    fn test_stepped() {
        assert_eq!(stepped(2, 1000, 30, "first_unit_id").unwrap(), vec![1000, 1030]);
        assert_eq!(stepped(3, 0, 5, "first_unit_id").unwrap(), vec![0, 5, 10]);
    }

    #[test]
    fn test_ranges_ending_at_u32_max() {
        assert_eq!(sequence(1, u32::MAX, "first_vpn_id").unwrap(), vec![u32::MAX]);
        assert_eq!(stepped(2, u32::MAX - 30, 30, "first_unit_id").unwrap().len(), 2);
    }

    #[test]
    fn test_ranges_past_u32_max_are_rejected() {
        assert!(matches!(
            sequence(2, u32::MAX, "first_vpn_id"),
            Err(NumberingError::IdRangeOverflow { field: "first_vpn_id" })
        ));
        // The closed range reaches one past the last id
        assert!(matches!(
            sequence_inclusive(1, u32::MAX, "first_vpn_id"),
            Err(NumberingError::IdRangeOverflow { field: "first_vpn_id" })
        ));
        assert!(matches!(
            stepped(3, u32::MAX - 30, 30, "first_unit_id"),
            Err(NumberingError::IdRangeOverflow { field: "first_unit_id" })
        ));
    }

    #[test]
    fn test_repeats() {
        assert_eq!(pool(3), vec![1, 2, 3]);
        assert!(pool(0).is_empty());
        assert_eq!(repeat_block(&[1, 2], 2), vec![1, 2, 1, 2]);
        assert_eq!(repeat_each(&[7, 8], 3), vec![7, 7, 7, 8, 8, 8]);
        assert!(repeat_block(&[1, 2], 0).is_empty());
    }
}
