//! Precomputed stat var group snapshot
//!
//! Built once at startup from the canonical hierarchy row and shared
//! read-only (`Arc<SvgCache>`) by every request afterwards.
//!
//! ## Contents
//!
//! - **svg_info**: every group node, with `num_descendent_stat_vars` set to
//!   the number of distinct stat vars reachable below it
//! - **parent_svg**: child id (group or stat var) → sorted parent group ids,
//!   derived from the child lists

use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

use crate::model::{StatVarGroupNode, StatVarGroups};
use crate::store::keys::stat_var_group_key;
use crate::store::{json_decoder, read_tiers, Store};
use crate::types::{MixerError, Result};

/// Read-only snapshot of the stat var group hierarchy
#[derive(Debug, Clone, Default)]
pub struct SvgCache {
    pub svg_info: HashMap<String, StatVarGroupNode>,
    pub parent_svg: HashMap<String, Vec<String>>,
}

impl SvgCache {
    /// Build the snapshot from a full hierarchy
    pub fn build(groups: &StatVarGroups) -> Self {
        let nodes = &groups.stat_var_groups;

        let mut parents: HashMap<String, BTreeSet<String>> = HashMap::new();
        for (parent_id, node) in nodes {
            let children = node
                .child_stat_var_groups
                .iter()
                .map(|c| &c.id)
                .chain(node.child_stat_vars.iter().map(|c| &c.id));
            for child in children {
                parents
                    .entry(child.clone())
                    .or_default()
                    .insert(parent_id.clone());
            }
        }
        let parent_svg: HashMap<String, Vec<String>> = parents
            .into_iter()
            .map(|(child, set)| (child, set.into_iter().collect()))
            .collect();

        let mut descendants = DescendantCounter::default();
        let mut svg_info = HashMap::with_capacity(nodes.len());
        for (id, node) in nodes {
            let mut node = node.clone();
            node.num_descendent_stat_vars = descendants.count(groups, id);
            node.parent_stat_var_groups = parent_svg.get(id).cloned().unwrap_or_default();
            svg_info.insert(id.clone(), node);
        }

        Self {
            svg_info,
            parent_svg,
        }
    }

    /// Load the canonical hierarchy row from the base tier and build
    pub async fn load(store: &Store) -> Result<Self> {
        let keys = [stat_var_group_key()];
        let mut rows = read_tiers(store, &keys, json_decoder::<StatVarGroups>, None, false).await?;
        let groups = rows
            .base
            .remove(keys[0].id())
            .ok_or_else(|| MixerError::NotFound("Stat var group not found in cache".to_string()))?;
        let cache = Self::build(&groups);
        info!(
            groups = cache.svg_info.len(),
            indexed_children = cache.parent_svg.len(),
            "Stat var group cache built"
        );
        Ok(cache)
    }

    pub fn get(&self, svg: &str) -> Option<&StatVarGroupNode> {
        self.svg_info.get(svg)
    }

    /// Sorted parent groups of a group or stat var
    pub fn parents(&self, id: &str) -> &[String] {
        self.parent_svg.get(id).map(Vec::as_slice).unwrap_or_default()
    }
}

/// Memoised distinct-descendant counting. A group revisited while still on
/// the traversal stack contributes nothing further.
#[derive(Default)]
struct DescendantCounter {
    memo: HashMap<String, HashSet<String>>,
    in_progress: HashSet<String>,
}

impl DescendantCounter {
    fn count(&mut self, groups: &StatVarGroups, id: &str) -> u32 {
        let reachable = self.stat_vars_below(groups, id);
        u32::try_from(reachable.len()).unwrap_or(u32::MAX)
    }

    fn stat_vars_below(&mut self, groups: &StatVarGroups, id: &str) -> HashSet<String> {
        if let Some(done) = self.memo.get(id) {
            return done.clone();
        }
        let Some(node) = groups.stat_var_groups.get(id) else {
            return HashSet::new();
        };
        if !self.in_progress.insert(id.to_string()) {
            warn!(svg = id, "Cycle in stat var group hierarchy");
            return HashSet::new();
        }

        let mut reachable: HashSet<String> =
            node.child_stat_vars.iter().map(|c| c.id.clone()).collect();
        for child in &node.child_stat_var_groups {
            reachable.extend(self.stat_vars_below(groups, &child.id));
        }

        self.in_progress.remove(id);
        self.memo.insert(id.to_string(), reachable.clone());
        reachable
    }
}
