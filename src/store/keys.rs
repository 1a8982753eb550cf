//! Row key definitions
//!
//! Every query kind owns a fixed prefix. A row key is the prefix followed by
//! one or more identifiers joined with [`KEY_DELIMITER`]. The identifier part
//! is kept alongside the full key so readers can group results by it without
//! re-parsing.

use std::collections::HashMap;
use std::fmt;

/// Stat var list per place
pub const PLACE_STAT_VARS_PREFIX: &str = "d/0/";
/// Single row holding the canonical stat var group hierarchy
pub const STAT_VAR_GROUP_KEY: &str = "d/1";
/// Triples per entity
pub const TRIPLES_PREFIX: &str = "d/2/";
/// Outgoing property values per entity and property
pub const PROP_VAL_OUT_PREFIX: &str = "d/3/";
/// Incoming property values per entity and property
pub const PROP_VAL_IN_PREFIX: &str = "d/4/";
/// Place page observations per place
pub const PLACE_PAGE_PREFIX: &str = "d/5/";
/// Chart observations per place and stat var
pub const CHART_PREFIX: &str = "d/6/";
/// Parent chain per place
pub const PLACE_METADATA_PREFIX: &str = "d/7/";
/// Existence counts per place and stat var (or group)
pub const STAT_EXISTENCE_PREFIX: &str = "d/e/";
/// Coverage summary per stat var
pub const STAT_VAR_SUMMARY_PREFIX: &str = "d/s/";

/// Separator between identifiers inside a key
pub const KEY_DELIMITER: &str = "^";

/// A row key in the wide-column store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RowKey {
    key: String,
    id: String,
}

impl RowKey {
    /// Build a key from a prefix and its identifier part
    pub fn new(prefix: &str, id: &str) -> Self {
        Self {
            key: format!("{prefix}{id}"),
            id: id.to_string(),
        }
    }

    /// Full storage key
    pub fn as_str(&self) -> &str {
        &self.key
    }

    /// Identifier part (the key without its prefix)
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

/// The (place, stat var) pair an existence key stands for
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlaceStatVar {
    pub place: String,
    pub stat_var: String,
}

impl PlaceStatVar {
    /// Grouping token for this pair
    pub fn token(&self) -> String {
        format!("{}{}{}", self.place, KEY_DELIMITER, self.stat_var)
    }
}

fn joined(parts: &[&str]) -> String {
    parts.join(KEY_DELIMITER)
}

pub fn place_stat_vars_keys(places: &[String]) -> Vec<RowKey> {
    places
        .iter()
        .map(|p| RowKey::new(PLACE_STAT_VARS_PREFIX, p))
        .collect()
}

pub fn stat_var_group_key() -> RowKey {
    RowKey {
        key: STAT_VAR_GROUP_KEY.to_string(),
        id: String::new(),
    }
}

pub fn triples_keys(dcids: &[String]) -> Vec<RowKey> {
    dcids.iter().map(|d| RowKey::new(TRIPLES_PREFIX, d)).collect()
}

/// Property value keys for one arc direction. The id part is the entity dcid.
pub fn property_values_keys(dcids: &[String], prop: &str, arc_out: bool) -> Vec<RowKey> {
    let prefix = if arc_out {
        PROP_VAL_OUT_PREFIX
    } else {
        PROP_VAL_IN_PREFIX
    };
    dcids
        .iter()
        .map(|d| RowKey {
            key: format!("{prefix}{}", joined(&[d, prop])),
            id: d.clone(),
        })
        .collect()
}

pub fn place_page_keys(places: &[String]) -> Vec<RowKey> {
    places
        .iter()
        .map(|p| RowKey::new(PLACE_PAGE_PREFIX, p))
        .collect()
}

/// Chart keys for one stat var. The id part is the place dcid.
pub fn chart_keys(places: &[String], stat_var: &str) -> Vec<RowKey> {
    places
        .iter()
        .map(|p| RowKey {
            key: format!("{CHART_PREFIX}{}", joined(&[p, stat_var])),
            id: p.clone(),
        })
        .collect()
}

pub fn place_metadata_keys(places: &[String]) -> Vec<RowKey> {
    places
        .iter()
        .map(|p| RowKey::new(PLACE_METADATA_PREFIX, p))
        .collect()
}

pub fn stat_var_summary_keys(stat_vars: &[String]) -> Vec<RowKey> {
    stat_vars
        .iter()
        .map(|sv| RowKey::new(STAT_VAR_SUMMARY_PREFIX, sv))
        .collect()
}

/// Cross product of existence keys, one per (place, id) pair.
///
/// Returns the keys in place-major order together with the pair each full
/// key stands for.
pub fn stat_existence_keys(
    places: &[String],
    svs_or_svgs: &[String],
) -> (Vec<RowKey>, HashMap<String, PlaceStatVar>) {
    let mut keys = Vec::with_capacity(places.len() * svs_or_svgs.len());
    let mut tokens = HashMap::with_capacity(places.len() * svs_or_svgs.len());
    for place in places {
        for sv in svs_or_svgs {
            let pair = PlaceStatVar {
                place: place.clone(),
                stat_var: sv.clone(),
            };
            let key = RowKey::new(STAT_EXISTENCE_PREFIX, &pair.token());
            tokens.insert(key.as_str().to_string(), pair);
            keys.push(key);
        }
    }
    (keys, tokens)
}

/// Grouping function mapping an existence key to its pair token.
///
/// Keys missing from `tokens` fall back to their id part.
pub fn token_fn(tokens: &HashMap<String, PlaceStatVar>) -> impl Fn(&RowKey) -> String + '_ {
    move |key: &RowKey| {
        tokens
            .get(key.as_str())
            .map(PlaceStatVar::token)
            .unwrap_or_else(|| key.id().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_key_parts() {
        let key = RowKey::new(PLACE_STAT_VARS_PREFIX, "geoId/06");
        assert_eq!(key.as_str(), "d/0/geoId/06");
        assert_eq!(key.id(), "geoId/06");
        assert_eq!(key.to_string(), "d/0/geoId/06");
    }

    #[test]
    fn test_property_values_direction() {
        let dcids = vec!["geoId/06".to_string()];
        let out = property_values_keys(&dcids, "typeOf", true);
        let inc = property_values_keys(&dcids, "typeOf", false);
        assert_eq!(out[0].as_str(), "d/3/geoId/06^typeOf");
        assert_eq!(inc[0].as_str(), "d/4/geoId/06^typeOf");
        assert_eq!(out[0].id(), "geoId/06");
    }

    #[test]
    fn test_existence_cross_product() {
        let places = vec!["geoId/06".to_string(), "geoId/07".to_string()];
        let svs = vec!["Count_Person".to_string(), "dc/g/Root".to_string()];
        let (keys, tokens) = stat_existence_keys(&places, &svs);
        assert_eq!(keys.len(), 4);
        assert_eq!(tokens.len(), 4);
        assert_eq!(keys[1].as_str(), "d/e/geoId/06^dc/g/Root");

        let pair = &tokens["d/e/geoId/07^Count_Person"];
        assert_eq!(pair.place, "geoId/07");
        assert_eq!(pair.stat_var, "Count_Person");
    }

    #[test]
    fn test_token_fn() {
        let places = vec!["geoId/06".to_string()];
        let svs = vec!["Count_Person".to_string()];
        let (keys, tokens) = stat_existence_keys(&places, &svs);
        let f = token_fn(&tokens);
        assert_eq!(f(&keys[0]), "geoId/06^Count_Person");

        let stray = RowKey::new(PLACE_STAT_VARS_PREFIX, "geoId/01");
        assert_eq!(f(&stray), "geoId/01");
    }

    #[test]
    fn test_keys_deterministic() {
        let dcids = vec!["geoId/06".to_string()];
        assert_eq!(chart_keys(&dcids, "Count_Person"), chart_keys(&dcids, "Count_Person"));
        assert_eq!(chart_keys(&dcids, "Count_Person")[0].as_str(), "d/6/geoId/06^Count_Person");
    }
}
