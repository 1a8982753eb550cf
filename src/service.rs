//! Service facade
//!
//! [`MixerService`] owns the shared store, the startup hierarchy snapshot and
//! the place page tunables, and exposes one method per query. It is cheap to
//! clone and safe to share across concurrent requests.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

use crate::config::MixerConfig;
use crate::model::{
    ObsTimeSeries, PlaceMetadata, PlacePageData, StatVarGroupNode, StatVarGroups, StatVarSeries,
    StatVarSummary, Triples,
};
use crate::node::{self, Direction, PropertyValues};
use crate::place;
use crate::placepage;
use crate::stat;
use crate::statvar::{self, ExistenceCounts, SvgCache};
use crate::store::{PrivateImport, Store};
use crate::types::Result;

#[derive(Clone)]
pub struct MixerService {
    store: Arc<Store>,
    cache: Arc<SvgCache>,
    config: MixerConfig,
}

impl MixerService {
    pub fn new(store: Arc<Store>, cache: Arc<SvgCache>, config: MixerConfig) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    /// Open the store and build the hierarchy snapshot
    pub async fn open(store: Store, config: MixerConfig) -> Result<Self> {
        let cache = SvgCache::load(&store).await?;
        info!(
            max_num_child = config.max_num_child,
            min_population = config.min_population,
            "Mixer service ready"
        );
        Ok(Self::new(Arc::new(store), Arc::new(cache), config))
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn cache(&self) -> &SvgCache {
        &self.cache
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    // ========================================================================
    // Stat var hierarchy
    // ========================================================================

    pub async fn get_stat_var_group(&self, places: &[String]) -> Result<StatVarGroups> {
        statvar::get_stat_var_group(&self.store, places).await
    }

    pub async fn get_stat_var_group_node(
        &self,
        svg: &str,
        places: &[String],
        read_from_triples: bool,
    ) -> Result<StatVarGroupNode> {
        statvar::get_stat_var_group_node(&self.store, &self.cache, svg, places, read_from_triples)
            .await
    }

    pub fn get_stat_var_path(&self, id: &str) -> Result<Vec<String>> {
        statvar::get_stat_var_path(&self.store, &self.cache, id)
    }

    pub async fn get_stat_var_summary(
        &self,
        stat_vars: &[String],
    ) -> Result<HashMap<String, StatVarSummary>> {
        statvar::get_stat_var_summary(&self.store, stat_vars).await
    }

    pub async fn count_stat_var(
        &self,
        svs_or_svgs: &[String],
        places: &[String],
    ) -> Result<ExistenceCounts> {
        statvar::count_stat_var(&self.store, svs_or_svgs, places).await
    }

    pub async fn get_place_stat_vars(
        &self,
        places: &[String],
    ) -> Result<HashMap<String, Vec<String>>> {
        statvar::get_place_stat_vars(&self.store, places).await
    }

    pub async fn get_place_stat_vars_union(
        &self,
        places: &[String],
        filter: &[String],
    ) -> Result<Vec<String>> {
        statvar::get_place_stat_vars_union(&self.store, places, filter).await
    }

    // ========================================================================
    // Places and statistics
    // ========================================================================

    pub async fn get_place_page_data(
        &self,
        place: &str,
        seed: i64,
        new_stat_vars: &[String],
    ) -> Result<PlacePageData> {
        placepage::get_place_page_data(
            Arc::clone(&self.store),
            place,
            seed,
            new_stat_vars,
            &self.config,
        )
        .await
    }

    pub async fn get_place_metadata(
        &self,
        places: &[String],
    ) -> Result<HashMap<String, PlaceMetadata>> {
        place::get_place_metadata(&self.store, places).await
    }

    pub async fn get_stats(
        &self,
        places: &[String],
        stat_var: &str,
    ) -> Result<HashMap<String, ObsTimeSeries>> {
        stat::get_stats(&self.store, places, stat_var).await
    }

    pub async fn get_stat_set_series(
        &self,
        places: &[String],
        stat_vars: &[String],
    ) -> Result<HashMap<String, StatVarSeries>> {
        stat::get_stat_set_series(&self.store, places, stat_vars).await
    }

    // ========================================================================
    // Knowledge graph
    // ========================================================================

    pub async fn get_property_values(
        &self,
        dcids: &[String],
        prop: &str,
        direction: Direction,
        value_type: &str,
        limit: usize,
    ) -> Result<PropertyValues> {
        node::get_property_values(&self.store, dcids, prop, direction, value_type, limit).await
    }

    pub async fn get_triples(&self, dcids: &[String]) -> Result<HashMap<String, Triples>> {
        node::read_triples(&self.store, dcids).await
    }

    // ========================================================================
    // Private overlay
    // ========================================================================

    /// Replace the private overlay contents. In-flight requests keep the
    /// snapshot they started with.
    pub fn load_private(&self, import: PrivateImport) {
        self.store.private().replace(import);
    }
}
