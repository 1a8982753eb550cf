//! Unit normalisation for observation series
//!
//! Some sources report in coarse units. Series are rewritten in place to the
//! canonical unit so every consumer sees comparable values.

use tracing::debug;

use crate::model::{ChartStore, ObsTimeSeries, Series, SourceSeries};
use crate::types::{MixerError, Result};

/// Conversion target for a source unit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitConversion {
    pub unit: &'static str,
    pub scaling: f64,
}

/// Look up the conversion for `unit`, if it needs one
pub fn unit_conversion(unit: &str) -> Option<UnitConversion> {
    match unit {
        "GigawattHour" => Some(UnitConversion {
            unit: "KilowattHour",
            scaling: 1_000_000.0,
        }),
        _ => None,
    }
}

/// Rewrite a source series to its canonical unit. Returns true if it changed.
pub fn normalize_source_series(series: &mut SourceSeries) -> bool {
    let Some(conversion) = unit_conversion(&series.unit) else {
        return false;
    };
    series.unit = conversion.unit.to_string();
    for value in series.val.values_mut() {
        *value *= conversion.scaling;
    }
    true
}

/// Rewrite a selected series to its canonical unit. Returns true if it changed.
pub fn normalize_series(series: &mut Series) -> bool {
    let Some(conversion) = unit_conversion(&series.metadata.unit) else {
        return false;
    };
    series.metadata.unit = conversion.unit.to_string();
    for value in series.val.values_mut() {
        *value *= conversion.scaling;
    }
    true
}

/// Normalise every source series of `obs`
pub fn normalize_obs_series(obs: &mut ObsTimeSeries) {
    let mut converted = 0;
    for series in &mut obs.source_series {
        if normalize_source_series(series) {
            converted += 1;
        }
    }
    if converted > 0 {
        debug!(converted = converted, "Normalised source series units");
    }
}

/// Decoder for chart rows: yields the unit-normalised time series
pub fn to_obs_series(id: &str, raw: &[u8]) -> Result<ObsTimeSeries> {
    let chart: ChartStore = serde_json::from_slice(raw).map_err(|e| MixerError::decode(id, e))?;
    let mut obs = chart
        .obs_time_series
        .ok_or_else(|| MixerError::decode(id, "chart row has no time series"))?;
    normalize_obs_series(&mut obs);
    Ok(obs)
}
