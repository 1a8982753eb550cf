//! Place metadata: the parent chain of each place

use std::collections::HashMap;

use crate::model::PlaceMetadata;
use crate::store::keys::place_metadata_keys;
use crate::store::{json_decoder, read_tiers, Store};
use crate::types::{MixerError, Result};

/// Metadata for each place that has a row. Base tier only.
pub async fn get_place_metadata(
    store: &Store,
    places: &[String],
) -> Result<HashMap<String, PlaceMetadata>> {
    if places.is_empty() {
        return Err(MixerError::InvalidArgument(
            "Missing required arguments: places".to_string(),
        ));
    }
    let keys = place_metadata_keys(places);
    let rows = read_tiers(store, &keys, json_decoder::<PlaceMetadata>, None, false).await?;
    Ok(rows.base)
}
