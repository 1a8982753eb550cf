//! Layered storage access
//!
//! A [`Store`] bundles the tiers a request may consult:
//!
//! - **Base**: immutable periodic snapshot (always present)
//! - **Branch**: rows changed since the base snapshot (optional)
//! - **Private**: in-process overlay owned by an external loader
//!
//! Tables are shared read-only across concurrent requests. Nothing in this
//! crate writes to them after startup.

pub mod keys;
pub mod private;
pub mod reader;
pub mod table;

pub use keys::RowKey;
pub use private::{Manifest, OverlaySnapshot, PrivateImport, PrivateObservation, PrivateOverlay};
pub use reader::{json_decoder, merge_dedupe, pick_tier, read_tiers, Tier, TierRows};
pub use table::{MemoryTable, RowTable};

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::types::{MixerError, Result};

/// Snapshot file names inside a data directory
pub const BASE_FILE: &str = "base.json";
pub const BRANCH_FILE: &str = "branch.json";
pub const PRIVATE_FILE: &str = "private.json";

/// All tiers available to a request
#[derive(Clone)]
pub struct Store {
    base: Arc<dyn RowTable>,
    branch: Option<Arc<dyn RowTable>>,
    private: Arc<PrivateOverlay>,
}

impl Store {
    /// Create a store with only the base tier and an empty private overlay
    pub fn new(base: Arc<dyn RowTable>) -> Self {
        Self {
            base,
            branch: None,
            private: Arc::new(PrivateOverlay::new()),
        }
    }

    /// Attach a branch tier
    pub fn with_branch(mut self, branch: Arc<dyn RowTable>) -> Self {
        self.branch = Some(branch);
        self
    }

    /// Attach a private overlay
    pub fn with_private(mut self, private: Arc<PrivateOverlay>) -> Self {
        self.private = private;
        self
    }

    /// Load snapshot files from `dir`.
    ///
    /// `base.json` is required. `branch.json` is only loaded when
    /// `branch_enabled` is set; it and `private.json` may be absent.
    pub async fn from_data_dir(dir: &Path, branch_enabled: bool) -> Result<Self> {
        let base_path = dir.join(BASE_FILE);
        if !base_path.exists() {
            return Err(MixerError::Config(format!(
                "Base snapshot missing: {}",
                base_path.display()
            )));
        }
        let mut store = Self::new(Arc::new(MemoryTable::from_json_file("base", &base_path).await?));

        let branch_path = dir.join(BRANCH_FILE);
        if branch_enabled && branch_path.exists() {
            store = store.with_branch(Arc::new(
                MemoryTable::from_json_file("branch", &branch_path).await?,
            ));
        }

        let private_path = dir.join(PRIVATE_FILE);
        if private_path.exists() {
            store = store.with_private(Arc::new(PrivateOverlay::load_file(&private_path).await?));
        }

        info!(
            dir = %dir.display(),
            branch = store.branch.is_some(),
            private = !store.private.snapshot().is_empty(),
            "Store opened"
        );
        Ok(store)
    }

    pub fn base(&self) -> &Arc<dyn RowTable> {
        &self.base
    }

    pub fn branch(&self) -> Option<&Arc<dyn RowTable>> {
        self.branch.as_ref()
    }

    pub fn private(&self) -> &PrivateOverlay {
        &self.private
    }
}
