//! stat-mixer - tiered statistics and stat var hierarchy reader
//!
//! Serves statistical queries over a knowledge graph stored as a read-only
//! wide-column snapshot, layered with newer branch rows and an in-process
//! private overlay.
//!
//! ```text
//!   caller ─► MixerService ─┬─► statvar (hierarchy, existence, lists)
//!                           ├─► placepage (fan-out aggregation)
//!                           └─► stat / node / place
//!                                     │
//!                                     ▼
//!                              store::read_tiers
//!                        ┌────────────┼────────────┐
//!                      Base        Branch       Private
//!                   (snapshot)   (optional)   (overlay)
//! ```
//!
//! ## Tier precedence
//!
//! - **Single values** (a series, a node): Private > Branch > Base, the
//!   winner is taken whole
//! - **Id lists** (stat vars with data): union in that order, deduplicated

pub mod config;
pub mod convert;
pub mod model;
pub mod node;
pub mod place;
pub mod placepage;
pub mod service;
pub mod stat;
pub mod statvar;
pub mod store;
pub mod types;

pub use config::{Args, Command, MixerConfig};
pub use service::MixerService;
pub use statvar::SvgCache;
pub use store::{MemoryTable, PrivateOverlay, RowTable, Store};
pub use types::{ErrorCode, MixerError, Result};
