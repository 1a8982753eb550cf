//! Knowledge graph reads: property values and triples
//!
//! Both come from the base tier only. Branch rows carry supplementary
//! statistics, not schema or graph edges.

use std::collections::{BTreeMap, HashMap};
use std::str::FromStr;
use tracing::debug;

use crate::model::{Node, PropValueCache, Triples};
use crate::store::keys::{property_values_keys, triples_keys};
use crate::store::{json_decoder, read_tiers, Store};
use crate::types::{MixerError, Result};

/// Arc direction(s) to read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
    Both,
}

impl Direction {
    fn reads_in(self) -> bool {
        matches!(self, Direction::In | Direction::Both)
    }

    fn reads_out(self) -> bool {
        matches!(self, Direction::Out | Direction::Both)
    }
}

impl FromStr for Direction {
    type Err = std::convert::Infallible;

    /// Anything other than `in` or `out` reads both directions
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "in" => Direction::In,
            "out" => Direction::Out,
            _ => Direction::Both,
        })
    }
}

/// dcid → direction label (`in`/`out`) → nodes
pub type PropertyValues = HashMap<String, BTreeMap<String, Vec<Node>>>;

/// A dcid must be non-empty and free of whitespace
pub fn check_valid_dcids(dcids: &[String]) -> bool {
    dcids
        .iter()
        .all(|d| !d.is_empty() && !d.chars().any(char::is_whitespace))
}

/// Property values of `prop` for each dcid.
///
/// Every requested dcid appears in the result. A direction label is only
/// present when it has nodes left after the type filter and limit.
pub async fn get_property_values(
    store: &Store,
    dcids: &[String],
    prop: &str,
    direction: Direction,
    value_type: &str,
    limit: usize,
) -> Result<PropertyValues> {
    if prop.is_empty() || dcids.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments".to_string(),
        ));
    }
    if !check_valid_dcids(dcids) {
        return Err(MixerError::InvalidArgument("Invalid DCIDs".to_string()));
    }

    let in_res = if direction.reads_in() {
        get_property_values_helper(store, dcids, prop, false).await?
    } else {
        HashMap::new()
    };
    let out_res = if direction.reads_out() {
        get_property_values_helper(store, dcids, prop, true).await?
    } else {
        HashMap::new()
    };

    let mut result: PropertyValues = dcids
        .iter()
        .map(|d| (d.clone(), BTreeMap::new()))
        .collect();
    for (label, res) in [("in", in_res), ("out", out_res)] {
        for (dcid, nodes) in res {
            let trimmed = trim_nodes(nodes, value_type, limit);
            if !trimmed.is_empty() {
                result
                    .entry(dcid)
                    .or_default()
                    .insert(label.to_string(), trimmed);
            }
        }
    }
    Ok(result)
}

/// Raw property values for one arc direction, keyed by dcid.
///
/// Dcids without a row are absent.
pub async fn get_property_values_helper(
    store: &Store,
    dcids: &[String],
    prop: &str,
    arc_out: bool,
) -> Result<HashMap<String, Vec<Node>>> {
    let keys = property_values_keys(dcids, prop, arc_out);
    let rows = read_tiers(store, &keys, json_decoder::<PropValueCache>, None, false).await?;
    debug!(prop = prop, arc_out = arc_out, found = rows.base.len(), "Property values read");
    Ok(rows
        .base
        .into_iter()
        .map(|(dcid, cache)| (dcid, cache.nodes))
        .collect())
}

/// Keep nodes of `value_type` (any type when empty), at most `limit` of
/// them (no cap when zero).
pub fn trim_nodes(nodes: Vec<Node>, value_type: &str, limit: usize) -> Vec<Node> {
    if limit == 0 && value_type.is_empty() {
        return nodes;
    }
    let matching = nodes
        .into_iter()
        .filter(|n| value_type.is_empty() || n.types.iter().any(|t| t == value_type));
    if limit > 0 {
        matching.take(limit).collect()
    } else {
        matching.collect()
    }
}

/// Triples for each dcid. Dcids without a row are absent.
pub async fn read_triples(store: &Store, dcids: &[String]) -> Result<HashMap<String, Triples>> {
    let keys = triples_keys(dcids);
    let rows = read_tiers(store, &keys, json_decoder::<Triples>, None, false).await?;
    Ok(rows.base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryTable;
    use std::sync::Arc;

    fn node(dcid: &str, types: &[&str]) -> Node {
        Node {
            dcid: dcid.to_string(),
            types: types.iter().map(|t| t.to_string()).collect(),
            ..Node::default()
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn graph_store() -> Store {
        let base = MemoryTable::new("base");
        base.insert_json(
            "d/4/geoId/06^containedInPlace",
            &PropValueCache {
                nodes: vec![
                    node("geoId/06001", &["County"]),
                    node("geoId/0644000", &["City"]),
                    node("geoId/06085", &["County"]),
                ],
            },
        )
        .unwrap();
        base.insert_json(
            "d/3/geoId/06^containedInPlace",
            &PropValueCache {
                nodes: vec![node("country/USA", &["Country"])],
            },
        )
        .unwrap();
        Store::new(Arc::new(base))
    }

    #[test]
    fn test_direction_parse() {
        assert_eq!("in".parse::<Direction>().unwrap(), Direction::In);
        assert_eq!("out".parse::<Direction>().unwrap(), Direction::Out);
        assert_eq!("".parse::<Direction>().unwrap(), Direction::Both);
    }

    #[test]
    fn test_trim_nodes() {
        let nodes = vec![node("a", &["City"]), node("b", &["County"]), node("c", &["City"])];
        assert_eq!(trim_nodes(nodes.clone(), "", 0).len(), 3);
        assert_eq!(trim_nodes(nodes.clone(), "City", 0).len(), 2);
        let limited = trim_nodes(nodes, "", 1);
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].dcid, "a");
    }

    #[tokio::test]
    async fn test_both_directions() {
        let store = graph_store();
        let result = get_property_values(
            &store,
            &ids(&["geoId/06", "geoId/99"]),
            "containedInPlace",
            Direction::Both,
            "County",
            0,
        )
        .await
        .unwrap();

        assert_eq!(result["geoId/06"]["in"].len(), 2);
        assert!(!result["geoId/06"].contains_key("out"));
        assert!(result["geoId/99"].is_empty());
    }

    #[tokio::test]
    async fn test_invalid_arguments() {
        let store = graph_store();
        let err = get_property_values(&store, &[], "typeOf", Direction::Out, "", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MixerError::InvalidArgument(_)));

        let err = get_property_values(&store, &ids(&["geo Id"]), "typeOf", Direction::Out, "", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MixerError::InvalidArgument(_)));

        let err = get_property_values(&store, &ids(&["geoId/06"]), "", Direction::Out, "", 0)
            .await
            .unwrap_err();
        assert!(matches!(err, MixerError::InvalidArgument(_)));
    }
}
