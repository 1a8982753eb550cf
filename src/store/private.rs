//! Private overlay - in-process supplementary data
//!
//! Holds user-supplied stat vars and observations that never reach the
//! wide-column store. An external loader replaces the whole contents at once;
//! request handlers take an [`OverlaySnapshot`] and read it without locking for
//! the rest of the resolution.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;
use std::sync::{Arc, RwLock};
use tracing::info;

use crate::model::{ObsTimeSeries, SourceSeries};
use crate::types::{MixerError, Result};

/// Describes a private import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Manifest {
    pub import_name: String,
    pub provenance_url: String,
}

/// One private observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateObservation {
    pub place: String,
    pub stat_var: String,
    pub date: String,
    pub value: f64,
    pub unit: String,
}

/// Loader payload for the overlay
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrivateImport {
    pub manifest: Manifest,
    /// Declared stat vars, including ones without observations
    pub stat_vars: Vec<String>,
    pub observations: Vec<PrivateObservation>,
}

#[derive(Debug, Default)]
struct PrivateSeries {
    unit: String,
    val: BTreeMap<String, f64>,
}

/// Immutable view of the overlay contents
#[derive(Debug, Default)]
pub struct OverlaySnapshot {
    manifest: Manifest,
    /// All stat vars in first-declared order
    stat_vars: Vec<String>,
    stat_var_set: HashSet<String>,
    /// stat var → place → series
    observations: HashMap<String, HashMap<String, PrivateSeries>>,
}

impl OverlaySnapshot {
    fn from_import(import: PrivateImport) -> Self {
        let mut snapshot = Self {
            manifest: import.manifest,
            ..Self::default()
        };
        for sv in import.stat_vars {
            snapshot.declare(sv);
        }
        for obs in import.observations {
            snapshot.declare(obs.stat_var.clone());
            let series = snapshot
                .observations
                .entry(obs.stat_var)
                .or_default()
                .entry(obs.place)
                .or_default();
            if series.unit.is_empty() {
                series.unit = obs.unit;
            }
            series.val.insert(obs.date, obs.value);
        }
        snapshot
    }

    fn declare(&mut self, sv: String) {
        if self.stat_var_set.insert(sv.clone()) {
            self.stat_vars.push(sv);
        }
    }

    /// True when no private stat var is loaded
    pub fn is_empty(&self) -> bool {
        self.stat_vars.is_empty()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    /// Whether `id` is a privately loaded stat var
    pub fn has_stat_var(&self, id: &str) -> bool {
        self.stat_var_set.contains(id)
    }

    /// Split private stat vars into those with and without data.
    ///
    /// With an empty `places`, data at any place counts.
    pub fn stat_vars(&self, places: &[String]) -> (Vec<String>, Vec<String>) {
        let mut with_data = Vec::new();
        let mut without_data = Vec::new();
        for sv in &self.stat_vars {
            let has_data = self.observations.get(sv).is_some_and(|by_place| {
                if places.is_empty() {
                    !by_place.is_empty()
                } else {
                    places.iter().any(|p| by_place.contains_key(p))
                }
            });
            if has_data {
                with_data.push(sv.clone());
            } else {
                without_data.push(sv.clone());
            }
        }
        (with_data, without_data)
    }

    /// Observations for one place and stat var, shaped like a cache row
    pub fn series(&self, place: &str, stat_var: &str) -> Option<ObsTimeSeries> {
        let series = self.observations.get(stat_var)?.get(place)?;
        Some(ObsTimeSeries {
            data: series.val.clone(),
            place_name: String::new(),
            source_series: vec![SourceSeries {
                import_name: self.manifest.import_name.clone(),
                unit: series.unit.clone(),
                provenance_url: self.manifest.provenance_url.clone(),
                val: series.val.clone(),
                ..SourceSeries::default()
            }],
            provenance_url: self.manifest.provenance_url.clone(),
        })
    }
}

/// Shared handle to the private overlay
#[derive(Debug, Default)]
pub struct PrivateOverlay {
    current: RwLock<Arc<OverlaySnapshot>>,
}

impl PrivateOverlay {
    /// Create an empty overlay
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an overlay populated from `import`
    pub fn from_import(import: PrivateImport) -> Self {
        let overlay = Self::new();
        overlay.replace(import);
        overlay
    }

    /// Load an import file (JSON [`PrivateImport`])
    pub async fn load_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read(path).await.map_err(|e| {
            MixerError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let import: PrivateImport = serde_json::from_slice(&raw).map_err(|e| {
            MixerError::Config(format!("Invalid private import {}: {}", path.display(), e))
        })?;
        Ok(Self::from_import(import))
    }

    /// Swap in new contents. Readers holding an older snapshot keep it.
    pub fn replace(&self, import: PrivateImport) {
        let snapshot = Arc::new(OverlaySnapshot::from_import(import));
        info!(
            import_name = %snapshot.manifest.import_name,
            stat_vars = snapshot.stat_vars.len(),
            "Private overlay replaced"
        );
        match self.current.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => *poisoned.into_inner() = snapshot,
        }
    }

    /// Current contents, stable for as long as the caller holds it
    pub fn snapshot(&self) -> Arc<OverlaySnapshot> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }
}
