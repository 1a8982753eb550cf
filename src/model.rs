//! Data model for stored rows and assembled responses
//!
//! Row payloads are JSON documents with camelCase field names. Every field
//! defaults when absent so partial rows written by older cache builds still
//! decode.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ============================================================================
// Stat var hierarchy
// ============================================================================

/// Child stat var reference inside a stat var group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildStatVar {
    pub id: String,
    pub display_name: String,
    /// Whether the stat var has observations (for the requested places, if any)
    pub has_data: bool,
}

/// Child stat var group reference inside a stat var group
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChildStatVarGroup {
    pub id: String,
    /// Label for the specialization relative to the parent group
    pub specialized_entity: String,
    pub display_name: String,
    pub num_descendent_stat_vars: u32,
}

/// A single stat var group node.
///
/// The child lists are the authoritative edges of the hierarchy. The parent
/// list is a back-reference for navigation only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarGroupNode {
    pub absolute_name: String,
    pub child_stat_vars: Vec<ChildStatVar>,
    pub child_stat_var_groups: Vec<ChildStatVarGroup>,
    pub parent_stat_var_groups: Vec<String>,
    pub num_descendent_stat_vars: u32,
}

/// The full stat var group hierarchy, keyed by group id
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarGroups {
    pub stat_var_groups: BTreeMap<String, StatVarGroupNode>,
}

/// Existence row for one (place, stat var or group) pair
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceStatVarExistence {
    pub num_descendent_stat_vars: u32,
}

/// Stat var list row for one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceStatVars {
    pub stat_var_ids: Vec<String>,
}

/// Per place-type coverage summary of a stat var
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceTypeSummary {
    pub num_places: u32,
    pub top_places: Vec<Place>,
}

/// Summary row for a stat var
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarSummary {
    pub place_type_summary: BTreeMap<String, PlaceTypeSummary>,
}

// ============================================================================
// Knowledge graph
// ============================================================================

/// A node reached through a property arc
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    pub dcid: String,
    pub name: String,
    pub value: String,
    pub types: Vec<String>,
    pub provenance_id: String,
}

/// Property value row: all nodes on one arc of one entity
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PropValueCache {
    pub nodes: Vec<Node>,
}

/// Subject-predicate-object triple with display names attached
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Triple {
    pub subject_id: String,
    pub subject_name: String,
    pub predicate: String,
    pub object_id: String,
    pub object_name: String,
    pub object_value: String,
    pub provenance_id: String,
}

/// All triples touching one entity, as subject or object
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Triples {
    pub triples: Vec<Triple>,
}

// ============================================================================
// Observations
// ============================================================================

/// Observations for one place/stat var from a single source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SourceSeries {
    pub import_name: String,
    pub observation_period: String,
    pub measurement_method: String,
    pub scaling_factor: String,
    pub unit: String,
    pub provenance_url: String,
    /// Date → value
    pub val: BTreeMap<String, f64>,
}

/// All source series for one place/stat var
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObsTimeSeries {
    /// Preferred series values, date → value
    pub data: BTreeMap<String, f64>,
    pub place_name: String,
    pub source_series: Vec<SourceSeries>,
    pub provenance_url: String,
}

/// Chart cache row. Only the time-series variant is served here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartStore {
    pub obs_time_series: Option<ObsTimeSeries>,
}

/// Provenance attached to a served series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatMetadata {
    pub import_name: String,
    pub provenance_url: String,
    pub measurement_method: String,
    pub observation_period: String,
    pub scaling_factor: String,
    pub unit: String,
}

/// A single selected series
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Series {
    pub val: BTreeMap<String, f64>,
    pub metadata: StatMetadata,
}

/// A single observation with its provenance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PointStat {
    pub date: String,
    pub value: f64,
    pub metadata: StatMetadata,
}

/// Place page cache row: stat var → observations for one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarObsSeries {
    pub data: BTreeMap<String, ObsTimeSeries>,
}

/// Selected series per stat var for one place
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatVarSeries {
    pub data: BTreeMap<String, Series>,
}

// ============================================================================
// Places
// ============================================================================

/// A place reference, optionally annotated with its latest population
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Place {
    pub dcid: String,
    pub name: String,
    pub pop: i64,
}

/// One entry of a place's parent chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceParent {
    pub dcid: String,
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: String,
}

/// Place metadata row: nearest-first parent chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlaceMetadata {
    pub name: String,
    #[serde(rename = "type")]
    pub place_type: String,
    pub parents: Vec<PlaceParent>,
}

/// Assembled place page response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlacePageData {
    pub place_type: String,
    pub child_places_type: String,
    pub child_places: Vec<String>,
    pub all_child_places: BTreeMap<String, Vec<Place>>,
    pub parent_places: Vec<String>,
    pub similar_places: Vec<String>,
    pub nearby_places: Vec<String>,
    pub stat_var_series: HashMap<String, StatVarSeries>,
    pub latest_population: HashMap<String, PointStat>,
}
