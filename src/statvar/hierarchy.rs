//! Stat var group hierarchy engine
//!
//! Serves the canonical group tree (optionally pruned to places with data),
//! single group nodes with existence annotations, and leaf-to-root paths.
//!
//! ## Place filtering
//!
//! ```text
//! place stat vars ─► keep child stat vars with data
//!                         │
//!                         ▼
//!                  DFS validity (Pending / Valid / Invalid per group)
//!                         │
//!                         ▼
//!                  drop invalid groups and references to them
//! ```
//!
//! A group is valid when it keeps a child stat var or has a valid child
//! group. Groups reached again while still `Pending` close a cycle and count
//! as invalid along that edge. On cyclic input the result therefore depends
//! on visit order (sorted group id): a group first reached through the back
//! edge is marked invalid even if the cycle also leads to data.

use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, warn};

use super::cache::SvgCache;
use super::existence::{count_stat_var, has_data, max_count};
use super::place_stat_vars::get_place_stat_vars_union;
use crate::model::{
    ChildStatVar, ChildStatVarGroup, StatVarGroupNode, StatVarGroups, StatVarSummary,
};
use crate::node::read_triples;
use crate::store::keys::{stat_var_group_key, stat_var_summary_keys};
use crate::store::{json_decoder, merge_dedupe, read_tiers, Store};
use crate::types::{MixerError, Result};

/// Root of the hierarchy
pub const SVG_ROOT: &str = "dc/g/Root";
/// Synthetic group holding privately loaded stat vars
pub const PRIVATE_SVG: &str = "dc/g/Private";
/// Prefix of auto-generated group ids
pub const AUTO_GEN_SVG_PREFIX: &str = "dc/g/";
const SVG_DELIMITER: &str = "_";

const SPECIALIZATION_OF: &str = "specializationOf";
const MEMBER_OF: &str = "memberOf";
const NAME: &str = "name";

// ============================================================================
// Tree filtering
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Validity {
    Pending,
    Valid,
    Invalid,
}

fn mark_valid(
    groups: &BTreeMap<String, StatVarGroupNode>,
    id: &str,
    memo: &mut HashMap<String, Validity>,
) -> bool {
    match memo.get(id) {
        Some(Validity::Valid) => return true,
        Some(Validity::Invalid) => return false,
        Some(Validity::Pending) => {
            warn!(svg = id, "Cycle in stat var group hierarchy");
            return false;
        }
        None => {}
    }
    let Some(node) = groups.get(id) else {
        memo.insert(id.to_string(), Validity::Invalid);
        return false;
    };

    memo.insert(id.to_string(), Validity::Pending);
    let valid = !node.child_stat_vars.is_empty()
        || node
            .child_stat_var_groups
            .iter()
            .any(|child| mark_valid(groups, &child.id, memo));
    let state = if valid {
        Validity::Valid
    } else {
        Validity::Invalid
    };
    memo.insert(id.to_string(), state);
    valid
}

/// Prune `groups` to stat vars in `place_svs` and the groups leading to them.
///
/// Returns a new tree; the input is left untouched.
pub fn filter_svg(groups: &StatVarGroups, place_svs: &[String]) -> StatVarGroups {
    let valid_svs: HashSet<&str> = place_svs.iter().map(String::as_str).collect();
    let mut filtered = groups.clone();

    for node in filtered.stat_var_groups.values_mut() {
        node.child_stat_vars
            .retain(|child| valid_svs.contains(child.id.as_str()));
    }

    let mut memo = HashMap::with_capacity(filtered.stat_var_groups.len());
    for id in filtered.stat_var_groups.keys() {
        mark_valid(&filtered.stat_var_groups, id, &mut memo);
    }
    let is_valid = |id: &str| memo.get(id) == Some(&Validity::Valid);

    filtered.stat_var_groups.retain(|id, _| is_valid(id.as_str()));
    for node in filtered.stat_var_groups.values_mut() {
        node.child_stat_var_groups
            .retain(|child| is_valid(child.id.as_str()));
    }
    filtered
        .stat_var_groups
        .retain(|_, node| !node.child_stat_vars.is_empty() || !node.child_stat_var_groups.is_empty());

    debug!(
        before = groups.stat_var_groups.len(),
        after = filtered.stat_var_groups.len(),
        "Stat var groups filtered"
    );
    filtered
}

/// The canonical group tree, pruned to `places` when any are given.
pub async fn get_stat_var_group(store: &Store, places: &[String]) -> Result<StatVarGroups> {
    // Arbitrary dcids without stat vars simply produce an empty tree.
    let place_svs = if places.is_empty() {
        Vec::new()
    } else {
        get_place_stat_vars_union(store, places, &[]).await?
    };

    let keys = [stat_var_group_key()];
    let mut rows = read_tiers(store, &keys, json_decoder::<StatVarGroups>, None, false).await?;
    let groups = rows
        .base
        .remove(keys[0].id())
        .ok_or_else(|| MixerError::NotFound("Stat var group not found in cache".to_string()))?;

    if places.is_empty() {
        Ok(groups)
    } else {
        Ok(filter_svg(&groups, &place_svs))
    }
}

// ============================================================================
// Node resolution
// ============================================================================

async fn node_from_triples(store: &Store, svg: &str) -> Result<StatVarGroupNode> {
    let mut triples = read_triples(store, &[svg.to_string()]).await?;
    let triples = triples
        .remove(svg)
        .ok_or_else(|| MixerError::Internal(format!("No triples for stat var group: {svg}")))?;

    let mut result = StatVarGroupNode::default();
    for t in triples.triples {
        if t.subject_id == svg {
            match t.predicate.as_str() {
                SPECIALIZATION_OF => result.parent_stat_var_groups.push(t.object_id),
                NAME => result.absolute_name = t.object_value,
                _ => {}
            }
        } else {
            match t.predicate.as_str() {
                SPECIALIZATION_OF => {
                    let specialized_entity = compute_specialized_entity(svg, &t.subject_id);
                    result.child_stat_var_groups.push(ChildStatVarGroup {
                        id: t.subject_id,
                        specialized_entity,
                        display_name: t.subject_name,
                        num_descendent_stat_vars: 0,
                    });
                }
                MEMBER_OF => result.child_stat_vars.push(ChildStatVar {
                    id: t.subject_id,
                    display_name: t.subject_name,
                    has_data: false,
                }),
                _ => {}
            }
        }
    }
    Ok(result)
}

fn node_from_cache(cache: &SvgCache, svg: &str) -> StatVarGroupNode {
    let mut result = cache.get(svg).cloned().unwrap_or_default();
    for item in &mut result.child_stat_var_groups {
        if let Some(info) = cache.get(&item.id) {
            item.display_name = info.absolute_name.clone();
            item.num_descendent_stat_vars = info.num_descendent_stat_vars;
        }
    }
    for item in &mut result.child_stat_vars {
        item.has_data = true;
    }
    result.parent_stat_var_groups = cache.parents(svg).to_vec();
    result
}

/// One group node with its children and parents.
///
/// With `read_from_triples` the node is derived from raw triples, otherwise
/// it comes from the precomputed cache. When `places` are given, counts
/// become the largest existence count across them and child stat vars
/// without data there lose their `has_data` flag.
pub async fn get_stat_var_group_node(
    store: &Store,
    cache: &SvgCache,
    svg: &str,
    places: &[String],
    read_from_triples: bool,
) -> Result<StatVarGroupNode> {
    if svg.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required argument: stat_var_group".to_string(),
        ));
    }

    let mut result = if read_from_triples {
        node_from_triples(store, svg).await?
    } else {
        node_from_cache(cache, svg)
    };

    if !places.is_empty() {
        let child_svgs: Vec<String> = result
            .child_stat_var_groups
            .iter()
            .map(|c| c.id.clone())
            .collect();
        let child_svs: Vec<String> = result.child_stat_vars.iter().map(|c| c.id.clone()).collect();
        let own = [svg.to_string()];
        let all_ids = merge_dedupe(&[
            own.as_slice(),
            child_svgs.as_slice(),
            child_svs.as_slice(),
            result.parent_stat_var_groups.as_slice(),
        ]);

        let counts = count_stat_var(store, &all_ids, places).await?;
        result.num_descendent_stat_vars = max_count(&counts, svg);
        for item in &mut result.child_stat_var_groups {
            item.num_descendent_stat_vars = max_count(&counts, &item.id);
        }
        for item in &mut result.child_stat_vars {
            if !has_data(&counts, &item.id) {
                item.has_data = false;
            }
        }
    }

    let private = store.private().snapshot();
    if !private.is_empty() {
        let (with_data, without_data) = private.stat_vars(&[]);
        if svg == SVG_ROOT {
            let import_name = private.manifest().import_name.clone();
            result.child_stat_var_groups.push(ChildStatVarGroup {
                id: PRIVATE_SVG.to_string(),
                specialized_entity: import_name.clone(),
                display_name: import_name,
                num_descendent_stat_vars: u32::try_from(with_data.len() + without_data.len())
                    .unwrap_or(u32::MAX),
            });
        } else if svg == PRIVATE_SVG {
            let flagged = with_data
                .into_iter()
                .map(|sv| (sv, true))
                .chain(without_data.into_iter().map(|sv| (sv, false)));
            for (sv, flag) in flagged {
                result.child_stat_vars.push(ChildStatVar {
                    id: sv.clone(),
                    display_name: sv,
                    has_data: flag,
                });
            }
        }
    }
    Ok(result)
}

// ============================================================================
// Paths and labels
// ============================================================================

/// Path from `id` up to (not including) the root, following first parents.
pub fn get_stat_var_path(store: &Store, cache: &SvgCache, id: &str) -> Result<Vec<String>> {
    if id.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required argument: id".to_string(),
        ));
    }
    if store.private().snapshot().has_stat_var(id) {
        return Ok(vec![id.to_string(), PRIVATE_SVG.to_string()]);
    }

    let mut path = vec![id.to_string()];
    let mut seen: HashSet<&str> = HashSet::from([id]);
    let mut curr = id;
    while let Some(parent) = cache.parents(curr).first() {
        let parent = parent.as_str();
        if parent == SVG_ROOT {
            break;
        }
        if !seen.insert(parent) {
            warn!(id = id, svg = parent, "Cycle while resolving stat var path");
            break;
        }
        path.push(parent.to_string());
        curr = parent;
    }
    Ok(path)
}

fn is_basic_population_type(t: &str) -> bool {
    // Household and HousingUnit have their own verticals
    matches!(t, "Person" | "Household" | "HousingUnit" | "Thing")
}

/// Label of what `child_svg` specializes relative to `parent_svg`.
///
/// Only computed for auto-generated ids; empty otherwise.
pub fn compute_specialized_entity(parent_svg: &str, child_svg: &str) -> String {
    let (Some(parent), Some(child)) = (
        parent_svg.strip_prefix(AUTO_GEN_SVG_PREFIX),
        child_svg.strip_prefix(AUTO_GEN_SVG_PREFIX),
    ) else {
        return String::new();
    };
    let parent_pieces: Vec<&str> = parent.split(SVG_DELIMITER).collect();
    let parent_set: HashSet<&str> = parent_pieces.iter().copied().collect();

    let result: Vec<&str> = child
        .split(SVG_DELIMITER)
        .filter(|c| !is_basic_population_type(c) && !parent_set.contains(c))
        .collect();
    if result.is_empty() {
        // Person_Employment under Employment strips to nothing
        return parent_pieces.join(", ");
    }
    result.join(", ")
}

// ============================================================================
// Summaries
// ============================================================================

/// Coverage summary per stat var. Ids without a summary row are absent.
pub async fn get_stat_var_summary(
    store: &Store,
    stat_vars: &[String],
) -> Result<HashMap<String, StatVarSummary>> {
    let keys = stat_var_summary_keys(stat_vars);
    let rows = read_tiers(store, &keys, json_decoder::<StatVarSummary>, None, false).await?;
    Ok(rows.base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PlaceStatVarExistence, Triple, Triples};
    use crate::store::{Manifest, MemoryTable, PrivateImport, PrivateObservation, PrivateOverlay};
    use std::sync::Arc;

    fn group(name: &str, svs: &[&str], svgs: &[&str]) -> StatVarGroupNode {
        StatVarGroupNode {
            absolute_name: name.to_string(),
            child_stat_vars: svs
                .iter()
                .map(|id| ChildStatVar {
                    id: id.to_string(),
                    display_name: id.to_string(),
                    has_data: false,
                })
                .collect(),
            child_stat_var_groups: svgs
                .iter()
                .map(|id| ChildStatVarGroup {
                    id: id.to_string(),
                    ..ChildStatVarGroup::default()
                })
                .collect(),
            ..StatVarGroupNode::default()
        }
    }

    fn tree(entries: Vec<(&str, StatVarGroupNode)>) -> StatVarGroups {
        StatVarGroups {
            stat_var_groups: entries
                .into_iter()
                .map(|(id, node)| (id.to_string(), node))
                .collect(),
        }
    }

    fn ids(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn demographics() -> StatVarGroups {
        tree(vec![
            (
                "dc/g/Root",
                group("Root", &[], &["dc/g/Demographics", "dc/g/Economy"]),
            ),
            (
                "dc/g/Demographics",
                group("Demographics", &["Count_Person"], &["dc/g/Person_Age"]),
            ),
            (
                "dc/g/Person_Age",
                group("Age", &["Count_Person_Upto5Years"], &[]),
            ),
            (
                "dc/g/Economy",
                group("Economy", &[], &["dc/g/Person_Employment"]),
            ),
            (
                "dc/g/Person_Employment",
                group("Employment", &["Count_Person_Employed"], &[]),
            ),
        ])
    }

    #[test]
    fn test_filter_keeps_only_groups_with_data() {
        let filtered = filter_svg(&demographics(), &ids(&["Count_Person_Upto5Years"]));
        let kept: Vec<&str> = filtered.stat_var_groups.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["dc/g/Demographics", "dc/g/Person_Age", "dc/g/Root"]);

        let demo = &filtered.stat_var_groups["dc/g/Demographics"];
        assert!(demo.child_stat_vars.is_empty());
        assert_eq!(demo.child_stat_var_groups.len(), 1);
        assert_eq!(
            filtered.stat_var_groups["dc/g/Root"].child_stat_var_groups[0].id,
            "dc/g/Demographics"
        );
    }

    #[test]
    fn test_filter_is_idempotent() {
        let svs = ids(&["Count_Person", "Count_Person_Employed"]);
        let once = filter_svg(&demographics(), &svs);
        let twice = filter_svg(&once, &svs);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_filter_shared_descendant() {
        // Both parents reference the same child group
        let groups = tree(vec![
            ("dc/g/Root", group("Root", &[], &["dc/g/A", "dc/g/B"])),
            ("dc/g/A", group("A", &[], &["dc/g/Shared"])),
            ("dc/g/B", group("B", &[], &["dc/g/Shared"])),
            ("dc/g/Shared", group("Shared", &["Count_Farm"], &[])),
        ]);
        let filtered = filter_svg(&groups, &ids(&["Count_Farm"]));
        assert_eq!(filtered.stat_var_groups.len(), 4);

        let empty = filter_svg(&groups, &ids(&["Count_Person"]));
        assert!(empty.stat_var_groups.is_empty());
    }

    #[test]
    fn test_filter_cycle_terminates() {
        let groups = tree(vec![
            ("dc/g/Root", group("Root", &[], &["dc/g/X"])),
            ("dc/g/X", group("X", &[], &["dc/g/Y"])),
            ("dc/g/Y", group("Y", &[], &["dc/g/X"])),
        ]);
        let filtered = filter_svg(&groups, &ids(&["Count_Person"]));
        assert!(filtered.stat_var_groups.is_empty());
    }

    #[test]
    fn test_filter_cycle_validity_follows_visit_order() {
        // X is visited before Y, so Y only sees X while it is still pending
        let groups = tree(vec![
            ("dc/g/Root", group("Root", &[], &["dc/g/X"])),
            ("dc/g/X", group("X", &[], &["dc/g/Y", "dc/g/Z"])),
            ("dc/g/Y", group("Y", &[], &["dc/g/X"])),
            ("dc/g/Z", group("Z", &["Count_Person"], &[])),
        ]);
        let filtered = filter_svg(&groups, &ids(&["Count_Person"]));
        let kept: Vec<&str> = filtered.stat_var_groups.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["dc/g/Root", "dc/g/X", "dc/g/Z"]);
        let x_children: Vec<&str> = filtered.stat_var_groups["dc/g/X"]
            .child_stat_var_groups
            .iter()
            .map(|c| c.id.as_str())
            .collect();
        assert_eq!(x_children, vec!["dc/g/Z"]);
    }

    #[test]
    fn test_compute_specialized_entity() {
        assert_eq!(
            compute_specialized_entity("dc/g/Person_Age", "dc/g/Person_Age_Gender"),
            "Gender"
        );
        assert_eq!(
            compute_specialized_entity("dc/g/Employment", "dc/g/Person_Employment"),
            "Employment"
        );
        assert_eq!(
            compute_specialized_entity("dc/g/Person_Employment", "dc/g/Person_Employment_County"),
            "County"
        );
        assert_eq!(
            compute_specialized_entity("dc/g/Root", "dc/g/Household_Income_Race"),
            "Income, Race"
        );
        assert_eq!(compute_specialized_entity("dc/g/Root", "custom/Group"), "");
    }

    fn private_overlay() -> Arc<PrivateOverlay> {
        Arc::new(PrivateOverlay::from_import(PrivateImport {
            manifest: Manifest {
                import_name: "Local Survey".to_string(),
                ..Manifest::default()
            },
            stat_vars: ids(&["Count_Bench"]),
            observations: vec![PrivateObservation {
                place: "geoId/06".to_string(),
                stat_var: "Count_Bike".to_string(),
                date: "2021".to_string(),
                value: 3.0,
                unit: String::new(),
            }],
        }))
    }

    fn hierarchy_store() -> Store {
        let base = MemoryTable::new("base");
        base.insert_json("d/1", &demographics()).unwrap();
        base.insert_json(
            "d/0/geoId/06",
            &crate::model::PlaceStatVars {
                stat_var_ids: ids(&["Count_Person"]),
            },
        )
        .unwrap();
        for (key, count) in [
            ("d/e/geoId/06^dc/g/Demographics", 1),
            ("d/e/geoId/07^dc/g/Demographics", 2),
            ("d/e/geoId/07^dc/g/Person_Age", 1),
            ("d/e/geoId/06^Count_Person", 1),
        ] {
            base.insert_json(
                key,
                &PlaceStatVarExistence {
                    num_descendent_stat_vars: count,
                },
            )
            .unwrap();
        }
        Store::new(Arc::new(base)).with_private(private_overlay())
    }

    #[tokio::test]
    async fn test_get_stat_var_group_filtered() {
        let store = hierarchy_store();
        let full = get_stat_var_group(&store, &[]).await.unwrap();
        assert_eq!(full.stat_var_groups.len(), 5);

        let filtered = get_stat_var_group(&store, &ids(&["geoId/06"])).await.unwrap();
        let kept: Vec<&str> = filtered.stat_var_groups.keys().map(String::as_str).collect();
        assert_eq!(kept, vec!["dc/g/Demographics", "dc/g/Root"]);
    }

    #[tokio::test]
    async fn test_get_stat_var_group_not_found() {
        let store = Store::new(Arc::new(MemoryTable::new("base")));
        let err = get_stat_var_group(&store, &[]).await.unwrap_err();
        assert!(matches!(err, MixerError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_node_from_cache_with_places() {
        let store = hierarchy_store();
        let cache = SvgCache::build(&demographics());

        let node = get_stat_var_group_node(&store, &cache, "dc/g/Demographics", &[], false)
            .await
            .unwrap();
        assert!(node.child_stat_vars[0].has_data);
        assert_eq!(node.child_stat_var_groups[0].display_name, "Age");
        assert_eq!(node.child_stat_var_groups[0].num_descendent_stat_vars, 1);
        assert_eq!(node.parent_stat_var_groups, vec!["dc/g/Root"]);

        let node = get_stat_var_group_node(
            &store,
            &cache,
            "dc/g/Demographics",
            &ids(&["geoId/06", "geoId/07"]),
            false,
        )
        .await
        .unwrap();
        // Largest count across places, not the sum
        assert_eq!(node.num_descendent_stat_vars, 2);
        assert_eq!(node.child_stat_var_groups[0].num_descendent_stat_vars, 1);
        assert!(node.child_stat_vars[0].has_data);

        let node = get_stat_var_group_node(&store, &cache, "dc/g/Economy", &ids(&["geoId/06"]), false)
            .await
            .unwrap();
        assert_eq!(node.num_descendent_stat_vars, 0);
        assert_eq!(node.child_stat_var_groups.len(), 1);
        assert_eq!(node.child_stat_var_groups[0].num_descendent_stat_vars, 0);
    }

    #[tokio::test]
    async fn test_has_data_cleared_not_removed() {
        let store = hierarchy_store();
        let cache = SvgCache::build(&demographics());
        let node = get_stat_var_group_node(
            &store,
            &cache,
            "dc/g/Person_Employment",
            &ids(&["geoId/06"]),
            false,
        )
        .await
        .unwrap();
        assert_eq!(node.child_stat_vars.len(), 1);
        assert!(!node.child_stat_vars[0].has_data);
    }

    #[tokio::test]
    async fn test_private_group_under_root() {
        let store = hierarchy_store();
        let cache = SvgCache::build(&demographics());

        let root = get_stat_var_group_node(&store, &cache, SVG_ROOT, &[], false)
            .await
            .unwrap();
        let private = root.child_stat_var_groups.last().unwrap();
        assert_eq!(private.id, PRIVATE_SVG);
        assert_eq!(private.display_name, "Local Survey");
        assert_eq!(private.num_descendent_stat_vars, 2);

        let node = get_stat_var_group_node(&store, &cache, PRIVATE_SVG, &[], false)
            .await
            .unwrap();
        let flags: Vec<(&str, bool)> = node
            .child_stat_vars
            .iter()
            .map(|c| (c.id.as_str(), c.has_data))
            .collect();
        assert_eq!(flags, vec![("Count_Bike", true), ("Count_Bench", false)]);
    }

    #[tokio::test]
    async fn test_node_from_triples() {
        let base = MemoryTable::new("base");
        let triple = |subject: &str, subject_name: &str, predicate: &str, object: &str, value: &str| Triple {
            subject_id: subject.to_string(),
            subject_name: subject_name.to_string(),
            predicate: predicate.to_string(),
            object_id: object.to_string(),
            object_value: value.to_string(),
            ..Triple::default()
        };
        base.insert_json(
            "d/2/dc/g/Person_Age",
            &Triples {
                triples: vec![
                    triple("dc/g/Person_Age", "", "specializationOf", "dc/g/Demographics", ""),
                    triple("dc/g/Person_Age", "", "name", "", "Age"),
                    triple("dc/g/Person_Age_Gender", "Age and gender", "specializationOf", "dc/g/Person_Age", ""),
                    triple("Count_Person_Upto5Years", "Under 5", "memberOf", "dc/g/Person_Age", ""),
                ],
            },
        )
        .unwrap();
        let store = Store::new(Arc::new(base));
        let cache = SvgCache::default();

        let node = get_stat_var_group_node(&store, &cache, "dc/g/Person_Age", &[], true)
            .await
            .unwrap();
        assert_eq!(node.absolute_name, "Age");
        assert_eq!(node.parent_stat_var_groups, vec!["dc/g/Demographics"]);
        assert_eq!(node.child_stat_var_groups[0].specialized_entity, "Gender");
        assert_eq!(node.child_stat_var_groups[0].display_name, "Age and gender");
        assert_eq!(node.child_stat_vars[0].id, "Count_Person_Upto5Years");

        let err = get_stat_var_group_node(&store, &cache, "dc/g/Missing", &[], true)
            .await
            .unwrap_err();
        assert!(matches!(err, MixerError::Internal(_)));
    }

    #[test]
    fn test_stat_var_path() {
        let store = hierarchy_store();
        let cache = SvgCache::build(&demographics());

        assert_eq!(
            get_stat_var_path(&store, &cache, "Count_Person_Upto5Years").unwrap(),
            vec!["Count_Person_Upto5Years", "dc/g/Person_Age", "dc/g/Demographics"]
        );
        assert_eq!(
            get_stat_var_path(&store, &cache, "Count_Bike").unwrap(),
            vec!["Count_Bike", PRIVATE_SVG]
        );
        assert_eq!(get_stat_var_path(&store, &cache, "Unknown").unwrap(), vec!["Unknown"]);
        assert!(get_stat_var_path(&store, &cache, "").is_err());
    }

    #[test]
    fn test_stat_var_path_cycle_guard() {
        let store = Store::new(Arc::new(MemoryTable::new("base")));
        let cache = SvgCache::build(&tree(vec![
            ("dc/g/X", group("X", &["Count_Farm"], &["dc/g/Y"])),
            ("dc/g/Y", group("Y", &[], &["dc/g/X"])),
        ]));
        assert_eq!(
            get_stat_var_path(&store, &cache, "Count_Farm").unwrap(),
            vec!["Count_Farm", "dc/g/X", "dc/g/Y"]
        );
    }

    #[tokio::test]
    async fn test_stat_var_summary() {
        let base = MemoryTable::new("base");
        base.insert("d/s/Count_Person", br#"{"placeTypeSummary": {"State": {"numPlaces": 52}}}"#.to_vec());
        let store = Store::new(Arc::new(base));
        let summary = get_stat_var_summary(&store, &ids(&["Count_Person", "Count_Farm"]))
            .await
            .unwrap();
        assert_eq!(summary.len(), 1);
        assert_eq!(summary["Count_Person"].place_type_summary["State"].num_places, 52);
    }
}
