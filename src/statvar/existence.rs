//! Existence index
//!
//! Answers "how many descendant stat vars have data at this place" for a
//! cross product of places and stat var (or group) ids. Existence rows only
//! live in the base tier.

use std::collections::HashMap;

use crate::model::PlaceStatVarExistence;
use crate::store::keys::{stat_existence_keys, token_fn};
use crate::store::{json_decoder, read_tiers, Store};
use crate::types::Result;

/// id → place → number of descendant stat vars with data
pub type ExistenceCounts = HashMap<String, HashMap<String, u32>>;

/// Count stat vars with data for every (place, id) pair.
///
/// Every id is a top-level key of the result. A place without data for an
/// id is absent from that id's map; a zero count is never stored.
pub async fn count_stat_var(
    store: &Store,
    svs_or_svgs: &[String],
    places: &[String],
) -> Result<ExistenceCounts> {
    let mut result: ExistenceCounts = svs_or_svgs
        .iter()
        .map(|id| (id.clone(), HashMap::new()))
        .collect();
    if svs_or_svgs.is_empty() || places.is_empty() {
        return Ok(result);
    }

    let (keys, tokens) = stat_existence_keys(places, svs_or_svgs);
    let group = token_fn(&tokens);
    let rows = read_tiers(
        store,
        &keys,
        json_decoder::<PlaceStatVarExistence>,
        Some(&group),
        false,
    )
    .await?;

    for key in &keys {
        let Some(pair) = tokens.get(key.as_str()) else {
            continue;
        };
        let Some(existence) = rows.base.get(&pair.token()) else {
            continue;
        };
        if existence.num_descendent_stat_vars == 0 {
            continue;
        }
        result
            .entry(pair.stat_var.clone())
            .or_default()
            .insert(pair.place.clone(), existence.num_descendent_stat_vars);
    }
    Ok(result)
}

/// Largest count of `id` across places, zero when it has no data anywhere
pub fn max_count(counts: &ExistenceCounts, id: &str) -> u32 {
    counts
        .get(id)
        .and_then(|by_place| by_place.values().copied().max())
        .unwrap_or(0)
}

/// Whether `id` has data at any of the counted places
pub fn has_data(counts: &ExistenceCounts, id: &str) -> bool {
    counts.get(id).is_some_and(|by_place| !by_place.is_empty())
}
