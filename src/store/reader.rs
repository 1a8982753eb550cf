//! Tiered reader - batched decode across Base and Branch tiers
//!
//! One batched lookup per consulted tier, every non-empty row decoded by the
//! caller's decoder. The reader never merges tiers itself; it hands back one
//! map per tier and the caller applies precedence with [`pick_tier`] or
//! [`merge_dedupe`].
//!
//! ```text
//! keys ──► Base table ───► decode ──► base map   ┐
//!     └──► Branch table ─► decode ──► branch map ┴─► caller merges (+ Private)
//! ```

use serde::de::DeserializeOwned;
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::debug;

use super::keys::RowKey;
use super::Store;
use crate::types::{MixerError, Result};

/// Data tiers, lowest precedence first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Tier {
    /// Immutable periodic snapshot
    Base,
    /// Rows changed since the base snapshot
    Branch,
    /// In-process overlay
    Private,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Base => f.write_str("base"),
            Tier::Branch => f.write_str("branch"),
            Tier::Private => f.write_str("private"),
        }
    }
}

/// Decoded rows, one map per tier
#[derive(Debug)]
pub struct TierRows<T> {
    pub base: HashMap<String, T>,
    pub branch: HashMap<String, T>,
}

/// Grouping function: row key → result map key
pub type GroupFn<'a> = &'a (dyn Fn(&RowKey) -> String + Sync);

/// Read `keys` from Base and, when `read_branch` is set, from Branch.
///
/// Results are keyed by the row's id part, or by `group_by` when given. A
/// row that fails to decode fails the whole batch.
pub async fn read_tiers<T, D>(
    store: &Store,
    keys: &[RowKey],
    decode: D,
    group_by: Option<GroupFn<'_>>,
    read_branch: bool,
) -> Result<TierRows<T>>
where
    D: Fn(&str, &[u8]) -> Result<T>,
{
    if keys.is_empty() {
        return Ok(TierRows {
            base: HashMap::new(),
            branch: HashMap::new(),
        });
    }

    let (base_raw, branch_raw) = match (read_branch, store.branch()) {
        (true, Some(branch)) => {
            let (base, branch) =
                tokio::try_join!(store.base().read_rows(keys), branch.read_rows(keys))?;
            (base, branch)
        }
        _ => (store.base().read_rows(keys).await?, HashMap::new()),
    };

    let base = decode_rows(keys, base_raw, &decode, group_by)?;
    let branch = decode_rows(keys, branch_raw, &decode, group_by)?;
    debug!(
        keys = keys.len(),
        base = base.len(),
        branch = branch.len(),
        read_branch = read_branch,
        "Tiered read"
    );
    Ok(TierRows { base, branch })
}

fn decode_rows<T, D>(
    keys: &[RowKey],
    mut raw: HashMap<String, Vec<u8>>,
    decode: &D,
    group_by: Option<GroupFn<'_>>,
) -> Result<HashMap<String, T>>
where
    D: Fn(&str, &[u8]) -> Result<T>,
{
    let mut out = HashMap::with_capacity(raw.len());
    for key in keys {
        let Some(payload) = raw.remove(key.as_str()) else {
            continue;
        };
        if payload.is_empty() {
            continue;
        }
        let token = match group_by {
            Some(f) => f(key),
            None => key.id().to_string(),
        };
        let value = decode(&token, &payload).map_err(|e| match e {
            MixerError::Decode { reason, .. } => MixerError::decode(key.as_str(), reason),
            other => other,
        })?;
        out.insert(token, value);
    }
    Ok(out)
}

/// Decoder for JSON row payloads
pub fn json_decoder<T: DeserializeOwned>(id: &str, raw: &[u8]) -> Result<T> {
    serde_json::from_slice(raw).map_err(|e| MixerError::decode(id, e))
}

/// Pick the value from the highest-precedence tier that has one.
///
/// No field-level merge: the winner is returned whole.
pub fn pick_tier<T>(private: Option<T>, branch: Option<T>, base: Option<T>) -> Option<(Tier, T)> {
    private
        .map(|v| (Tier::Private, v))
        .or_else(|| branch.map(|v| (Tier::Branch, v)))
        .or_else(|| base.map(|v| (Tier::Base, v)))
}

/// Union of id lists, deduplicated, in order of first appearance.
///
/// Pass lists highest precedence first.
pub fn merge_dedupe(lists: &[&[String]]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for list in lists {
        for id in list.iter() {
            if seen.insert(id.as_str()) {
                out.push(id.clone());
            }
        }
    }
    out
}
