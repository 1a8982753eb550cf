//! Place page aggregation
//!
//! Resolves the place type, then fans out four independent lookups and
//! joins them before the final statistics fetch:
//!
//! ```text
//!                    ┌─► children ─┐
//! place ─► type ─────┼─► parents  ─┼─► slots ─► all places ─► stats ─► PlacePageData
//!                    ├─► similar  ─┤
//!                    └─► nearby   ─┘
//! ```
//!
//! Each task returns a tagged [`Related`] value routed into its own slot, so
//! completion order never changes the response. The first failure aborts
//! the remaining tasks.

use chrono::Datelike;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::debug;

use crate::config::MixerConfig;
use crate::convert::normalize_series;
use crate::model::{Place, PlacePageData, PointStat, StatVarObsSeries, StatVarSeries};
use crate::node::get_property_values_helper;
use crate::place::get_place_metadata;
use crate::stat::{get_best_series, get_latest_pop, get_stat_set_series, POPULATION_STAT_VAR};
use crate::store::keys::place_page_keys;
use crate::store::{json_decoder, merge_dedupe, read_tiers, Store};
use crate::types::{MixerError, Result};

// ============================================================================
// Place types and cohorts
// ============================================================================

/// Child place types shown for a place type
fn wanted_place_types(place_type: &str) -> &'static [&'static str] {
    match place_type {
        "Country" => &[
            "State",
            "EurostatNUTS1",
            "EurostatNUTS2",
            "AdministrativeArea1",
        ],
        "State" => &["County"],
        "County" => &["City", "Town", "Village", "Borough"],
        _ => ALL_WANTED_PLACE_TYPES,
    }
}

/// Child place types shown when the parent type has no specific list
const ALL_WANTED_PLACE_TYPES: &[&str] = &[
    "Country",
    "State",
    "County",
    "City",
    "Town",
    "Village",
    "Borough",
    "CensusZipCodeTabulationArea",
    "EurostatNUTS1",
    "EurostatNUTS2",
    "EurostatNUTS3",
    "AdministrativeArea1",
    "AdministrativeArea2",
    "AdministrativeArea3",
    "AdministrativeArea4",
    "AdministrativeArea5",
];

/// Equivalent place types: the key is preferred over the value
const EQUIVALENT_PLACE_TYPES: &[(&str, &str)] = &[
    ("State", "AdministrativeArea1"),
    ("County", "AdministrativeArea2"),
    ("City", "AdministrativeArea3"),
    ("Town", "City"),
    ("Borough", "City"),
    ("Village", "City"),
];

/// Parent types never listed as parents
const EXCLUDED_PARENT_TYPE: &str = "CensusZipCodeTabulationArea";
const EARTH: &str = "Earth";

/// US state, county and city ids differ only in the digit count
static US_GEO_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^geoId/(\d{2}|\d{5}|\d{7})$").ok());

fn us_geo_id_digits(place_dcid: &str) -> Option<usize> {
    let caps = US_GEO_ID.as_ref()?.captures(place_dcid)?;
    caps.get(1).map(|m| m.as_str().len())
}

/// Comparison cohort for similar places, if the place has one
pub fn get_cohort(place_type: &str, place_dcid: &str) -> Option<&'static str> {
    if place_type == "Country" {
        return Some("PlacePagesComparisonCountriesCohort");
    }
    match us_geo_id_digits(place_dcid) {
        Some(2) => return Some("PlacePagesComparisonStateCohort"),
        Some(5) => return Some("PlacePagesComparisonCountyCohort"),
        Some(7) => return Some("PlacePagesComparisonCityCohort"),
        _ => {}
    }
    if place_type == "City" {
        return Some("PlacePagesComparisonWorldCitiesCohort");
    }
    None
}

/// Drop types whose preferred equivalent is also present
pub fn trim_types(types: &[String]) -> Vec<String> {
    let to_trim: HashSet<&str> = types
        .iter()
        .filter_map(|t| {
            EQUIVALENT_PLACE_TYPES
                .iter()
                .find(|(preferred, _)| preferred == t)
                .map(|(_, other)| *other)
        })
        .collect();
    types
        .iter()
        .filter(|t| !to_trim.contains(t.as_str()))
        .cloned()
        .collect()
}

/// Most specific asserted type. Generic types only win when nothing else
/// is asserted.
async fn get_place_type(store: &Store, dcid: &str) -> Result<String> {
    let mut resp = get_property_values_helper(store, &[dcid.to_string()], "typeOf", true).await?;
    let mut chosen = String::new();
    for node in resp.remove(dcid).unwrap_or_default() {
        if chosen.is_empty() || chosen.starts_with("AdministrativeArea") || chosen == "Place" {
            chosen = node.dcid;
        }
    }
    Ok(chosen)
}

// ============================================================================
// Related places
// ============================================================================

/// Child places grouped by type, each group sorted by descending population
async fn get_child_places(
    store: &Store,
    dcid: &str,
    place_type: &str,
) -> Result<BTreeMap<String, Vec<Place>>> {
    let place = [dcid.to_string()];
    let (mut contained, mut overlaps) = tokio::try_join!(
        get_property_values_helper(store, &place, "containedInPlace", false),
        get_property_values_helper(store, &place, "geoOverlaps", false),
    )?;
    let children = contained
        .remove(dcid)
        .unwrap_or_default()
        .into_iter()
        .chain(overlaps.remove(dcid).unwrap_or_default());

    let wanted = wanted_place_types(place_type);
    let mut result: BTreeMap<String, Vec<Place>> = BTreeMap::new();
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for child in children {
        for child_type in trim_types(&child.types) {
            if !wanted.contains(&child_type.as_str()) {
                continue;
            }
            if !seen.insert((child_type.clone(), child.dcid.clone())) {
                continue;
            }
            result.entry(child_type).or_default().push(Place {
                dcid: child.dcid.clone(),
                name: child.name.clone(),
                pop: 0,
            });
        }
    }

    let dcids = merge_dedupe(&[result
        .values()
        .flatten()
        .map(|p| p.dcid.clone())
        .collect::<Vec<_>>()
        .as_slice()]);
    let pop = get_latest_pop(store, &dcids).await?;
    for places in result.values_mut() {
        for place in places.iter_mut() {
            if let Some(value) = pop.get(&place.dcid) {
                place.pop = *value;
            }
        }
        places.sort_by(|a, b| b.pop.cmp(&a.pop));
    }
    Ok(result)
}

/// Pick the child type with the most places (first in type order on ties)
/// and cap its list.
pub fn filter_child_places(
    children: &BTreeMap<String, Vec<Place>>,
    max_num_child: usize,
) -> (String, Vec<Place>) {
    let mut best: Option<(&String, &Vec<Place>)> = None;
    for (child_type, places) in children {
        if places.len() > best.map_or(0, |(_, p)| p.len()) {
            best = Some((child_type, places));
        }
    }
    match best {
        Some((child_type, places)) => (
            child_type.clone(),
            places.iter().take(max_num_child).cloned().collect(),
        ),
        None => (String::new(), Vec::new()),
    }
}

/// Nearest-first parents, without zip code areas and Earth
async fn get_parent_places(store: &Store, dcid: &str) -> Result<Vec<String>> {
    let mut metadata = get_place_metadata(store, &[dcid.to_string()]).await?;
    let Some(data) = metadata.remove(dcid) else {
        return Ok(Vec::new());
    };
    Ok(data
        .parents
        .into_iter()
        .filter(|p| p.place_type != EXCLUDED_PARENT_TYPE && p.dcid != EARTH)
        .map(|p| p.dcid)
        .collect())
}

/// 32-bit FNV-1a
pub fn fnv1a32(data: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;
    data.iter().fold(OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(PRIME)
    })
}

/// Shuffle seed: the caller's when non-zero, else the place hash plus the
/// day of year so results rotate daily.
pub fn similar_places_seed(place_dcid: &str, seed: i64, day_of_year: u32) -> u64 {
    if seed != 0 {
        return seed as u64;
    }
    u64::from(fnv1a32(place_dcid.as_bytes())) + u64::from(day_of_year)
}

/// Shuffle `members` deterministically with `seed` and keep `max`.
///
/// ChaCha8 keeps the order stable across rand releases and platforms.
pub fn pick_similar(mut members: Vec<String>, seed: u64, max: usize) -> Vec<String> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    members.shuffle(&mut rng);
    members.truncate(max);
    members
}

async fn get_similar_places(
    store: &Store,
    dcid: &str,
    place_type: &str,
    seed: i64,
    max: usize,
) -> Result<Vec<String>> {
    let Some(cohort) = get_cohort(place_type, dcid) else {
        return Ok(Vec::new());
    };
    let mut resp = get_property_values_helper(store, &[cohort.to_string()], "member", true).await?;
    let members: Vec<String> = resp
        .remove(cohort)
        .unwrap_or_default()
        .into_iter()
        .map(|n| n.dcid)
        .filter(|d| d != dcid)
        .collect();
    let members = merge_dedupe(&[members.as_slice()]);

    let seed = similar_places_seed(dcid, seed, chrono::Local::now().ordinal());
    Ok(pick_similar(members, seed, max))
}

/// Nearby places above the population floor, most populous first
async fn get_nearby_places(store: &Store, dcid: &str, config: &MixerConfig) -> Result<Vec<String>> {
    let mut resp = get_property_values_helper(store, &[dcid.to_string()], "nearbyPlaces", true).await?;
    let neighbors: Vec<String> = resp
        .remove(dcid)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|n| n.value.split('@').next().map(str::to_string))
        .filter(|d| !d.is_empty())
        .collect();
    let neighbors = merge_dedupe(&[neighbors.as_slice()]);

    let pop = get_latest_pop(store, &neighbors).await?;
    let mut result: Vec<(String, i64)> = pop
        .into_iter()
        .filter(|(_, p)| *p > config.min_population)
        .collect();
    result.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    Ok(result
        .into_iter()
        .take(config.max_nearby_place)
        .map(|(d, _)| d)
        .collect())
}

// ============================================================================
// Statistics
// ============================================================================

/// Place page series and latest population for `places`.
///
/// Series come from the place page rows (base tier), extended with
/// `stat_vars` read through the tiered series path.
pub async fn fetch_place_page_stats(
    store: &Store,
    places: &[String],
    stat_vars: &[String],
) -> Result<(HashMap<String, StatVarSeries>, HashMap<String, PointStat>)> {
    let mut page_data: HashMap<String, StatVarSeries> = HashMap::new();
    let mut pop_data: HashMap<String, PointStat> = HashMap::new();
    if places.is_empty() {
        return Ok((page_data, pop_data));
    }

    let keys = place_page_keys(places);
    let rows = read_tiers(store, &keys, json_decoder::<StatVarObsSeries>, None, false).await?;
    for (place, row) in rows.base {
        let mut series_by_sv = StatVarSeries::default();
        for (stat_var, obs) in &row.data {
            if let (Some(mut series), _) = get_best_series(obs, "", false) {
                normalize_series(&mut series);
                series_by_sv.data.insert(stat_var.clone(), series);
            }
            if stat_var != POPULATION_STAT_VAR {
                continue;
            }
            if let (Some(mut series), Some(date)) = get_best_series(obs, "", true) {
                normalize_series(&mut series);
                let value = series.val.get(&date).copied().unwrap_or_default();
                pop_data.insert(
                    place.clone(),
                    PointStat {
                        date,
                        value,
                        metadata: series.metadata,
                    },
                );
            }
        }
        page_data.insert(place, series_by_sv);
    }

    if !stat_vars.is_empty() {
        let extra = get_stat_set_series(store, places, stat_vars).await?;
        for (place, series_by_sv) in extra {
            if series_by_sv.data.is_empty() {
                continue;
            }
            page_data
                .entry(place)
                .or_default()
                .data
                .extend(series_by_sv.data);
        }
    }
    Ok((page_data, pop_data))
}

// ============================================================================
// Aggregation
// ============================================================================

/// One fan-out result, tagged by category
#[derive(Debug)]
enum Related {
    Children {
        all: BTreeMap<String, Vec<Place>>,
        child_type: String,
        places: Vec<String>,
    },
    Parents(Vec<String>),
    Similar(Vec<String>),
    Nearby(Vec<String>),
}

fn dcids(places: &[Place]) -> Vec<String> {
    places.iter().map(|p| p.dcid.clone()).collect()
}

/// Full place page bundle for `place`.
///
/// `seed` of zero derives the similar-places shuffle from the place id and
/// the day of year. `new_stat_vars` adds series beyond the place page rows.
pub async fn get_place_page_data(
    store: Arc<Store>,
    place: &str,
    seed: i64,
    new_stat_vars: &[String],
    config: &MixerConfig,
) -> Result<PlacePageData> {
    let started = Instant::now();
    if place.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: dcid".to_string(),
        ));
    }
    let place_type = get_place_type(&store, place).await?;

    let mut tasks: JoinSet<Result<Related>> = JoinSet::new();
    {
        let (store, place, place_type, max) = (
            Arc::clone(&store),
            place.to_string(),
            place_type.clone(),
            config.max_num_child,
        );
        tasks.spawn(async move {
            let all = get_child_places(&store, &place, &place_type).await?;
            let (child_type, kept) = filter_child_places(&all, max);
            Ok(Related::Children {
                places: dcids(&kept),
                all,
                child_type,
            })
        });
    }
    {
        let (store, place) = (Arc::clone(&store), place.to_string());
        tasks.spawn(async move { get_parent_places(&store, &place).await.map(Related::Parents) });
    }
    {
        let (store, place, place_type, max) = (
            Arc::clone(&store),
            place.to_string(),
            place_type.clone(),
            config.max_similar_place,
        );
        tasks.spawn(async move {
            get_similar_places(&store, &place, &place_type, seed, max)
                .await
                .map(Related::Similar)
        });
    }
    {
        let (store, place, config) = (Arc::clone(&store), place.to_string(), *config);
        tasks.spawn(async move {
            get_nearby_places(&store, &place, &config)
                .await
                .map(Related::Nearby)
        });
    }

    let mut resp = PlacePageData {
        place_type,
        ..PlacePageData::default()
    };
    while let Some(joined) = tasks.join_next().await {
        let related = match joined.map_err(MixerError::from).and_then(|r| r) {
            Ok(related) => related,
            Err(e) => {
                tasks.abort_all();
                return Err(e);
            }
        };
        match related {
            Related::Children {
                all,
                child_type,
                places,
            } => {
                resp.all_child_places = all;
                resp.child_places_type = child_type;
                resp.child_places = places;
            }
            Related::Parents(places) => resp.parent_places = places,
            Related::Similar(places) => resp.similar_places = places,
            Related::Nearby(places) => resp.nearby_places = places,
        }
    }

    let own = [place.to_string()];
    let all_places = merge_dedupe(&[
        own.as_slice(),
        resp.child_places.as_slice(),
        resp.parent_places.as_slice(),
        resp.similar_places.as_slice(),
        resp.nearby_places.as_slice(),
    ]);
    let (stat_var_series, latest_population) =
        fetch_place_page_stats(&store, &all_places, new_stat_vars).await?;
    resp.stat_var_series = stat_var_series;
    resp.latest_population = latest_population;

    debug!(
        place = place,
        related = all_places.len() - 1,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Place page assembled"
    );
    Ok(resp)
}
