//! Stat vars available at places
//!
//! Stat var lists are the one row type unioned across tiers instead of
//! overridden: Private, then Branch, then Base, first appearance wins.

use std::collections::{HashMap, HashSet};

use super::existence::{count_stat_var, has_data};
use crate::model::PlaceStatVars;
use crate::store::keys::place_stat_vars_keys;
use crate::store::{json_decoder, merge_dedupe, read_tiers, Store};
use crate::types::{MixerError, Result};

fn decode_stat_var_ids(id: &str, raw: &[u8]) -> Result<Vec<String>> {
    json_decoder::<PlaceStatVars>(id, raw).map(|row| row.stat_var_ids)
}

/// Stat vars with data at each place. Every requested place is present.
pub async fn get_place_stat_vars(
    store: &Store,
    places: &[String],
) -> Result<HashMap<String, Vec<String>>> {
    if places.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: dcid".to_string(),
        ));
    }
    let keys = place_stat_vars_keys(places);
    let rows = read_tiers(store, &keys, decode_stat_var_ids, None, true).await?;
    let private = store.private().snapshot();

    let mut result = HashMap::with_capacity(places.len());
    for place in places {
        let private_svs = if private.is_empty() {
            Vec::new()
        } else {
            private.stat_vars(std::slice::from_ref(place)).0
        };
        let branch = rows.branch.get(place).map(Vec::as_slice).unwrap_or_default();
        let base = rows.base.get(place).map(Vec::as_slice).unwrap_or_default();
        result.insert(place.clone(), merge_dedupe(&[private_svs.as_slice(), branch, base]));
    }
    Ok(result)
}

/// Stat vars with data at any of `places`.
///
/// With a non-empty `filter`, only filter ids with data are returned, in
/// filter order. Otherwise the per-place lists are unioned in place order.
pub async fn get_place_stat_vars_union(
    store: &Store,
    places: &[String],
    filter: &[String],
) -> Result<Vec<String>> {
    if places.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: dcids".to_string(),
        ));
    }
    let filter = merge_dedupe(&[filter]);
    let filter_set: HashSet<&str> = filter.iter().map(String::as_str).collect();

    let stat_vars = if !filter.is_empty() {
        let counts = count_stat_var(store, &filter, places).await?;
        filter
            .iter()
            .filter(|sv| has_data(&counts, sv))
            .cloned()
            .collect()
    } else {
        let mut per_place = get_place_stat_vars(store, places).await?;
        if places.len() == 1 {
            per_place.remove(&places[0]).unwrap_or_default()
        } else {
            let lists: Vec<&[String]> = places
                .iter()
                .filter_map(|p| per_place.get(p).map(Vec::as_slice))
                .collect();
            merge_dedupe(&lists)
        }
    };

    let private = store.private().snapshot();
    if private.is_empty() {
        return Ok(stat_vars);
    }
    let (private_svs, _) = private.stat_vars(places);
    let private_svs: Vec<String> = private_svs
        .into_iter()
        .filter(|sv| filter_set.is_empty() || filter_set.contains(sv.as_str()))
        .collect();
    Ok(merge_dedupe(&[stat_vars.as_slice(), private_svs.as_slice()]))
}
