//! Observation series
//!
//! Chart rows are read from Base and Branch, the private overlay is consulted
//! first, and the highest tier that holds a series wins it outright.
//!
//! ```text
//! Private ──┐
//! Branch  ──┼─► pick_tier ──► ObsTimeSeries ──► get_best_series ──► Series
//! Base    ──┘
//! ```

use futures::future::try_join_all;
use std::cmp::Reverse;
use std::collections::HashMap;
use tracing::debug;

use crate::convert::{normalize_obs_series, to_obs_series};
use crate::model::{ObsTimeSeries, Series, SourceSeries, StatMetadata, StatVarSeries};
use crate::store::keys::chart_keys;
use crate::store::{pick_tier, read_tiers, Store};
use crate::types::{MixerError, Result};

/// Stat var holding total population
pub const POPULATION_STAT_VAR: &str = "Count_Person";

/// Imports preferred when a place has several sources, best first
const PREFERRED_IMPORTS: &[&str] = &[
    "CensusPEP",
    "CensusACS5YearSurvey",
    "EurostatData",
    "WorldDevelopmentIndicators",
    "OECDRegionalDemography",
];

fn import_rank(import_name: &str) -> usize {
    PREFERRED_IMPORTS
        .iter()
        .position(|name| *name == import_name)
        .unwrap_or(PREFERRED_IMPORTS.len())
}

// ============================================================================
// Tiered series reads
// ============================================================================

/// Series of `stat_var` for each place that has one.
///
/// `data` holds the values of the best source series, in canonical units.
pub async fn get_stats(
    store: &Store,
    places: &[String],
    stat_var: &str,
) -> Result<HashMap<String, ObsTimeSeries>> {
    if places.is_empty() || stat_var.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: places, stat var".to_string(),
        ));
    }
    let keys = chart_keys(places, stat_var);
    let mut rows = read_tiers(store, &keys, to_obs_series, None, true).await?;
    let private = store.private().snapshot();

    let mut result = HashMap::with_capacity(places.len());
    for place in places {
        let private_series = private.series(place, stat_var).map(|mut series| {
            normalize_obs_series(&mut series);
            series
        });
        let picked = pick_tier(
            private_series,
            rows.branch.remove(place),
            rows.base.remove(place),
        );
        if let Some((tier, mut series)) = picked {
            debug!(place = %place, stat_var = stat_var, tier = %tier, "Series selected");
            fill_preferred_data(&mut series);
            result.insert(place.clone(), series);
        }
    }
    Ok(result)
}

/// Replace `data` with the values of the best source series. Rows without
/// source series keep the `data` they were stored with.
fn fill_preferred_data(obs: &mut ObsTimeSeries) {
    if let (Some(best), _) = get_best_series(obs, "", false) {
        obs.data = best.val;
    }
}

// ============================================================================
// Series selection
// ============================================================================

fn to_series(source: &SourceSeries) -> Series {
    Series {
        val: source.val.clone(),
        metadata: StatMetadata {
            import_name: source.import_name.clone(),
            provenance_url: source.provenance_url.clone(),
            measurement_method: source.measurement_method.clone(),
            observation_period: source.observation_period.clone(),
            scaling_factor: source.scaling_factor.clone(),
            unit: source.unit.clone(),
        },
    }
}

/// Pick the preferred source series of `obs`.
///
/// Restricted to `import_name` when non-empty. Sources rank by import
/// preference, then by most recent observation; earlier sources win ties.
/// With `use_latest`, the date of the chosen series' last observation is
/// returned too.
pub fn get_best_series(
    obs: &ObsTimeSeries,
    import_name: &str,
    use_latest: bool,
) -> (Option<Series>, Option<String>) {
    let best = obs
        .source_series
        .iter()
        .filter(|s| !s.val.is_empty())
        .filter(|s| import_name.is_empty() || s.import_name == import_name)
        .enumerate()
        .min_by_key(|(index, s)| {
            let latest = s.val.keys().next_back().cloned().unwrap_or_default();
            (import_rank(&s.import_name), Reverse(latest), *index)
        })
        .map(|(_, s)| s);

    let Some(best) = best else {
        return (None, None);
    };
    let latest = if use_latest {
        best.val.keys().next_back().cloned()
    } else {
        None
    };
    (Some(to_series(best)), latest)
}

/// Best series per place and stat var.
///
/// Every place is present; stat vars without data at a place are absent.
pub async fn get_stat_set_series(
    store: &Store,
    places: &[String],
    stat_vars: &[String],
) -> Result<HashMap<String, StatVarSeries>> {
    if places.is_empty() || stat_vars.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: places, stat vars".to_string(),
        ));
    }
    let per_stat_var =
        try_join_all(stat_vars.iter().map(|sv| get_stats(store, places, sv))).await?;

    let mut result: HashMap<String, StatVarSeries> = places
        .iter()
        .map(|p| (p.clone(), StatVarSeries::default()))
        .collect();
    for (stat_var, by_place) in stat_vars.iter().zip(per_stat_var) {
        for (place, obs) in by_place {
            if let (Some(series), _) = get_best_series(&obs, "", false) {
                result
                    .entry(place)
                    .or_default()
                    .data
                    .insert(stat_var.clone(), series);
            }
        }
    }
    Ok(result)
}

/// Latest population per place, from the best source series of each row.
///
/// Rows without source series fall back to their stored values. Places
/// without population data are absent.
pub async fn get_latest_pop(store: &Store, places: &[String]) -> Result<HashMap<String, i64>> {
    if places.is_empty() {
        return Ok(HashMap::new());
    }
    let series = get_stats(store, places, POPULATION_STAT_VAR).await?;
    Ok(series
        .into_iter()
        .filter_map(|(place, obs)| latest_value(&obs).map(|value| (place, value as i64)))
        .collect())
}

fn latest_value(obs: &ObsTimeSeries) -> Option<f64> {
    match get_best_series(obs, "", true) {
        (Some(best), Some(date)) => best.val.get(&date).copied(),
        _ => obs.data.values().next_back().copied(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ChartStore;
    use crate::store::{Manifest, MemoryTable, PrivateImport, PrivateObservation, PrivateOverlay};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn source(import: &str, points: &[(&str, f64)]) -> SourceSeries {
        SourceSeries {
            import_name: import.to_string(),
            val: points.iter().map(|(d, v)| (d.to_string(), *v)).collect(),
            ..SourceSeries::default()
        }
    }

    fn chart(data: &[(&str, f64)], sources: Vec<SourceSeries>) -> ChartStore {
        ChartStore {
            obs_time_series: Some(ObsTimeSeries {
                data: data.iter().map(|(d, v)| (d.to_string(), *v)).collect(),
                source_series: sources,
                ..ObsTimeSeries::default()
            }),
        }
    }

    fn places(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_best_series_prefers_ranked_import() {
        let obs = ObsTimeSeries {
            source_series: vec![
                source("Unranked", &[("2021", 1.0)]),
                source("CensusACS5YearSurvey", &[("2019", 2.0)]),
                source("CensusPEP", &[("2018", 3.0)]),
            ],
            ..ObsTimeSeries::default()
        };
        let (series, latest) = get_best_series(&obs, "", true);
        let series = series.unwrap();
        assert_eq!(series.metadata.import_name, "CensusPEP");
        assert_eq!(latest.as_deref(), Some("2018"));
    }

    #[test]
    fn test_best_series_prefers_fresher_within_rank() {
        let obs = ObsTimeSeries {
            source_series: vec![
                source("A", &[("2015", 1.0)]),
                source("B", &[("2020", 2.0)]),
                source("C", &[]),
            ],
            ..ObsTimeSeries::default()
        };
        let (series, latest) = get_best_series(&obs, "", false);
        assert_eq!(series.unwrap().metadata.import_name, "B");
        assert!(latest.is_none());

        let (series, _) = get_best_series(&obs, "A", false);
        assert_eq!(series.unwrap().metadata.import_name, "A");
        assert_eq!(get_best_series(&obs, "C", false), (None, None));
    }

    #[tokio::test]
    async fn test_get_stats_tier_precedence() {
        let base = MemoryTable::new("base");
        base.insert_json(
            "d/6/geoId/06^Count_Person",
            &chart(&[("2019", 100.0)], vec![source("CensusPEP", &[("2019", 100.0)])]),
        )
        .unwrap();
        base.insert_json(
            "d/6/geoId/07^Count_Person",
            &chart(&[("2019", 7.0)], vec![]),
        )
        .unwrap();
        let branch = MemoryTable::new("branch");
        branch
            .insert_json(
                "d/6/geoId/06^Count_Person",
                &chart(&[("2020", 200.0)], vec![source("CensusPEP", &[("2020", 200.0)])]),
            )
            .unwrap();
        let private = PrivateOverlay::from_import(PrivateImport {
            manifest: Manifest {
                import_name: "Mine".to_string(),
                ..Manifest::default()
            },
            stat_vars: vec![],
            observations: vec![PrivateObservation {
                place: "geoId/08".to_string(),
                stat_var: "Count_Person".to_string(),
                date: "2021".to_string(),
                value: 8.0,
                unit: String::new(),
            }],
        });
        let store = Store::new(Arc::new(base))
            .with_branch(Arc::new(branch))
            .with_private(Arc::new(private));

        let stats = get_stats(
            &store,
            &places(&["geoId/06", "geoId/07", "geoId/08", "geoId/09"]),
            "Count_Person",
        )
        .await
        .unwrap();

        assert_eq!(stats.len(), 3);
        assert_eq!(stats["geoId/06"].data, BTreeMap::from([("2020".to_string(), 200.0)]));
        assert_eq!(stats["geoId/07"].data["2019"], 7.0);
        assert_eq!(stats["geoId/08"].source_series[0].import_name, "Mine");

        let pop = get_latest_pop(&store, &places(&["geoId/06", "geoId/09"])).await.unwrap();
        assert_eq!(pop, HashMap::from([("geoId/06".to_string(), 200)]));
    }

    #[tokio::test]
    async fn test_source_series_only_rows() {
        let base = MemoryTable::new("base");
        base.insert_json(
            "d/6/geoId/06^Count_Person",
            &chart(
                &[],
                vec![
                    source("CensusACS5YearSurvey", &[("2019", 38_000_000.0)]),
                    source("CensusPEP", &[("2019", 39_400_000.0), ("2020", 39_500_000.0)]),
                ],
            ),
        )
        .unwrap();
        let mut electricity = source("EIA", &[("2020", 2.0)]);
        electricity.unit = "GigawattHour".to_string();
        base.insert_json(
            "d/6/geoId/06^Annual_Generation_Electricity",
            &chart(&[("2020", 2.0)], vec![electricity]),
        )
        .unwrap();
        let store = Store::new(Arc::new(base));

        let pop = get_latest_pop(&store, &places(&["geoId/06"])).await.unwrap();
        assert_eq!(pop["geoId/06"], 39_500_000);

        let stats = get_stats(&store, &places(&["geoId/06"]), "Count_Person").await.unwrap();
        assert_eq!(stats["geoId/06"].data.len(), 2);
        assert_eq!(stats["geoId/06"].data["2020"], 39_500_000.0);

        let stats = get_stats(&store, &places(&["geoId/06"]), "Annual_Generation_Electricity")
            .await
            .unwrap();
        let obs = &stats["geoId/06"];
        assert_eq!(obs.source_series[0].unit, "KilowattHour");
        assert_eq!(obs.data["2020"], 2_000_000.0);
    }

    #[tokio::test]
    async fn test_stat_set_series() {
        let base = MemoryTable::new("base");
        base.insert_json(
            "d/6/geoId/06^Count_Person",
            &chart(&[], vec![source("CensusPEP", &[("2019", 100.0)])]),
        )
        .unwrap();
        let store = Store::new(Arc::new(base));

        let result = get_stat_set_series(
            &store,
            &places(&["geoId/06", "geoId/07"]),
            &places(&["Count_Person", "Median_Age_Person"]),
        )
        .await
        .unwrap();
        assert_eq!(result["geoId/06"].data.len(), 1);
        assert_eq!(result["geoId/06"].data["Count_Person"].val["2019"], 100.0);
        assert!(result["geoId/07"].data.is_empty());
    }

    #[tokio::test]
    async fn test_get_stats_rejects_empty_input() {
        let store = Store::new(Arc::new(MemoryTable::new("base")));
        let err = get_stats(&store, &[], "Count_Person").await.unwrap_err();
        assert!(matches!(err, MixerError::InvalidArgument(_)));
    }
}
