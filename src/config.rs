//! Engine default parameters: a literal default overlaid with environment
//! variables via `figment`.
//!
//! This is a convenience layer only. Every engine options struct
//! (`KnuthBendixOptions`, `ToddCoxeterOptions`, `RaceOptions`, ...) can also
//! be built and tuned directly through its own setters, independent of
//! whatever `EngineDefaults` is loaded in the process — every parameter
//! stays settable via dedicated setters regardless of whether
//! `EngineDefaults` is ever consulted.

use figment::providers::{Env, Serialized};
use figment::Figment;
use serde::{Deserialize, Serialize};

/// Default tunables for the Knuth–Bendix engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnuthBendixDefaults {
    pub max_pending_rules: usize,
    pub check_confluence_interval: usize,
    pub max_overlap: Option<usize>,
    pub max_rules: Option<usize>,
}

impl Default for KnuthBendixDefaults {
    fn default() -> Self {
        KnuthBendixDefaults {
            max_pending_rules: 128,
            check_confluence_interval: 4096,
            max_overlap: None,
            max_rules: None,
        }
    }
}

/// Default tunables for the Todd–Coxeter engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToddCoxeterDefaults {
    pub pack_limit: usize,
    pub pack_growth_percent: u32,
}

impl Default for ToddCoxeterDefaults {
    fn default() -> Self {
        ToddCoxeterDefaults {
            pack_limit: 120_000,
            pack_growth_percent: 10,
        }
    }
}

/// Default tunables for the race coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceDefaults {
    /// `None` means "use hardware concurrency".
    pub max_threads: Option<usize>,
}

impl Default for RaceDefaults {
    fn default() -> Self {
        RaceDefaults { max_threads: None }
    }
}

/// Aggregate engine defaults, loadable from `CONGRUENCE_*` environment
/// variables (nested with `__`, e.g.
/// `CONGRUENCE_KNUTH_BENDIX__MAX_RULES=5000`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineDefaults {
    #[serde(default)]
    pub knuth_bendix: KnuthBendixDefaults,
    #[serde(default)]
    pub todd_coxeter: ToddCoxeterDefaults,
    #[serde(default)]
    pub race: RaceDefaults,
}

impl EngineDefaults {
    /// Loads defaults, overlaying `CONGRUENCE_`-prefixed environment
    /// variables on top of the literal defaults above.
    pub fn load() -> Self {
        Figment::new()
            .merge(Serialized::defaults(EngineDefaults::default()))
            .merge(Env::prefixed("CONGRUENCE_").split("__"))
            .extract()
            .unwrap_or_default()
    }
}
