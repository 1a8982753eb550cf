//! Configuration for stat-mixer
//!
//! CLI arguments and environment variable handling using clap, plus the
//! tunables the place page aggregator reads at request time.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// stat-mixer - tiered statistics and stat var hierarchy reader
#[derive(Parser, Debug, Clone)]
#[command(name = "stat-mixer")]
#[command(about = "Serve merged statistics and stat var hierarchies from tiered snapshots")]
pub struct Args {
    /// Directory holding base.json and optional branch.json / private.json
    #[arg(long, env = "DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Consult the branch tier where a query allows it
    #[arg(long, env = "BRANCH_ENABLED", default_value_t = true, action = ArgAction::Set)]
    pub branch_enabled: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    #[command(subcommand)]
    pub command: Command,
}

/// Queries the CLI can run
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the stat var group tree
    Svg {
        /// Only keep groups with data at these places
        #[arg(long = "place", value_delimiter = ',')]
        places: Vec<String>,
    },

    /// Print one stat var group node
    SvgNode {
        /// Stat var group id
        svg: String,
        /// Annotate existence for these places
        #[arg(long = "place", value_delimiter = ',')]
        places: Vec<String>,
        /// Derive the node from raw triples instead of the cache
        #[arg(long)]
        from_triples: bool,
    },

    /// Print the path from a stat var or group up to the root
    Path {
        /// Stat var or stat var group id
        id: String,
    },

    /// Print stat vars with data per place, or their union
    PlaceStatVars {
        /// Place dcids
        #[arg(required = true)]
        places: Vec<String>,
        /// Print the union across places
        #[arg(long)]
        union: bool,
        /// Only report these stat vars (union mode)
        #[arg(long = "stat-var", value_delimiter = ',')]
        filter: Vec<String>,
    },

    /// Print the place page bundle for a place
    PlacePage {
        /// Place dcid
        place: String,
        /// Shuffle seed for similar places (0 derives one from the place)
        #[arg(long, default_value = "0")]
        seed: i64,
        /// Extra stat vars to fetch series for
        #[arg(long = "stat-var", value_delimiter = ',')]
        stat_vars: Vec<String>,
    },

    /// Print coverage summaries for stat vars
    Summary {
        /// Stat var ids
        #[arg(required = true)]
        stat_vars: Vec<String>,
    },

    /// Print observation series of one stat var for places
    Stats {
        /// Stat var id
        stat_var: String,
        /// Place dcids
        #[arg(required = true)]
        places: Vec<String>,
    },

    /// Print property values of entities
    PropertyValues {
        /// Property name
        #[arg(short, long)]
        property: String,
        /// Arc direction: in, out or both
        #[arg(short, long, default_value = "out")]
        direction: String,
        /// Only return values of this type
        #[arg(long, default_value = "")]
        value_type: String,
        /// Maximum values per entity and direction (0 for no limit)
        #[arg(short, long, default_value = "0")]
        limit: usize,
        /// Entity dcids
        #[arg(required = true)]
        dcids: Vec<String>,
    },
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        match &self.data_dir {
            None => return Err("DATA_DIR is required".to_string()),
            Some(dir) if !dir.is_dir() => {
                return Err(format!("DATA_DIR is not a directory: {}", dir.display()));
            }
            Some(_) => {}
        }
        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }
        Ok(())
    }
}

/// Place page tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MixerConfig {
    /// Child places kept from the largest child type
    pub max_num_child: usize,
    /// Similar places kept after shuffling the cohort
    pub max_similar_place: usize,
    /// Nearby places kept after sorting by population
    pub max_nearby_place: usize,
    /// Nearby places need a population strictly above this
    pub min_population: i64,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            max_num_child: 5,
            max_similar_place: 5,
            max_nearby_place: 5,
            min_population: 10_000,
        }
    }
}

impl MixerConfig {
    /// Create config from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("MAX_NUM_CHILD") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_num_child = n;
            }
        }

        if let Ok(val) = std::env::var("MAX_SIMILAR_PLACE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_similar_place = n;
            }
        }

        if let Ok(val) = std::env::var("MAX_NEARBY_PLACE") {
            if let Ok(n) = val.parse::<usize>() {
                config.max_nearby_place = n;
            }
        }

        if let Ok(val) = std::env::var("MIN_POPULATION") {
            if let Ok(n) = val.parse::<i64>() {
                config.min_population = n;
            }
        }

        config
    }
}
