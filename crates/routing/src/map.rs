//! Relay map generation
//!
//! A routing map is a shuffled, duplicate-free subset of the known relay
//! records, truncated to `max_map_size` and linked in order. The caller
//! fetches the candidate RRI list (capped at `max_map_size +
//! RI_LIST_EXTRA`); an empty list is a hard error.

use std::collections::HashSet;

use rand::seq::SliceRandom;
use tracing::debug;
use veilnet_core::{RelayHop, RelayRecord, Result, RoutingMap, VeilNetError};

/// Default cap on hops in a generated map.
pub const DEFAULT_MAX_MAP_SIZE: usize = 20;

/// Extra records to fetch beyond the cap, to survive duplicates.
pub const RI_LIST_EXTRA: usize = 20;

/// Build a routing map from candidate relay records.
pub fn generate_relay_map(records: &[RelayRecord], max_map_size: usize) -> Result<RoutingMap> {
    if records.is_empty() {
        return Err(VeilNetError::NoRelaysAvailable);
    }

    let mut seen = HashSet::new();
    let mut hops: Vec<RelayHop> = records
        .iter()
        .filter(|record| seen.insert(record.relay_id.clone()))
        .map(RelayHop::from_record)
        .collect();

    let mut rng = rand::thread_rng();
    hops.shuffle(&mut rng);
    hops.truncate(max_map_size);

    if hops.is_empty() {
        return Err(VeilNetError::NoRelaysAvailable);
    }

    debug!(hops = hops.len(), "generated relay map");
    Ok(RoutingMap::new(hops))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_PEM: &str = "-----BEGIN RSA PUBLIC KEY-----\nAAAA\n-----END RSA PUBLIC KEY-----\n";

    fn records(n: usize) -> Vec<RelayRecord> {
        (0..n)
            .map(|i| RelayRecord::new(format!("relay-{i}"), "10.0.0.1", 9000 + i as u16, TEST_PEM))
            .collect()
    }

    #[test]
    fn test_empty_list_is_an_error() {
        assert!(matches!(
            generate_relay_map(&[], 20),
            Err(VeilNetError::NoRelaysAvailable)
        ));
    }

    #[test]
    fn test_map_length_is_min_of_inputs_and_cap() {
        let relays = records(5);
        assert_eq!(generate_relay_map(&relays, 20).unwrap().len(), 5);
        assert_eq!(generate_relay_map(&relays, 3).unwrap().len(), 3);
        assert_eq!(generate_relay_map(&relays, 5).unwrap().len(), 5);
    }

    #[test]
    fn test_map_has_no_duplicate_relay_ids() {
        let mut relays = records(4);
        relays.extend(records(4)); // every id twice
        let map = generate_relay_map(&relays, 20).unwrap();
        assert_eq!(map.len(), 4);

        let mut ids = HashSet::new();
        for hop in map.hops() {
            assert!(ids.insert(hop.relay_id.clone()));
        }
    }

    #[test]
    fn test_map_is_a_permutation_of_a_subset() {
        let relays = records(10);
        let input_ids: HashSet<String> =
            relays.iter().map(|r| r.relay_id.clone()).collect();

        let map = generate_relay_map(&relays, 6).unwrap();
        assert_eq!(map.len(), 6);
        for hop in map.hops() {
            assert!(input_ids.contains(&hop.relay_id));
        }
    }

    #[test]
    fn test_zero_cap_is_an_error() {
        let relays = records(3);
        assert!(matches!(
            generate_relay_map(&relays, 0),
            Err(VeilNetError::NoRelaysAvailable)
        ));
    }
}
