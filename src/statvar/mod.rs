//! Stat vars and stat var groups
//!
//! - [`existence`]: per-place existence counts
//! - [`place_stat_vars`]: stat var lists per place, unioned across tiers
//! - [`cache`]: the precomputed group snapshot built at startup
//! - [`hierarchy`]: filtered trees, node resolution and paths

pub mod cache;
pub mod existence;
pub mod hierarchy;
pub mod place_stat_vars;

pub use cache::SvgCache;
pub use existence::{count_stat_var, ExistenceCounts};
pub use hierarchy::{
    compute_specialized_entity, filter_svg, get_stat_var_group, get_stat_var_group_node,
    get_stat_var_path, get_stat_var_summary, PRIVATE_SVG, SVG_ROOT,
};
pub use place_stat_vars::{get_place_stat_vars, get_place_stat_vars_union};
