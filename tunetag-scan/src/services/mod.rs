//! Pipeline stage services
//!
//! One file per stage of the trigger scan: extraction and comparison wrap
//! the external fingerprint tool, the collector probes window groups, the
//! voter and pruner filter candidates, and the payload extractor annotates
//! the survivors.

pub mod comparer;
pub mod extractor;
pub mod pattern_voter;
pub mod payload_extractor;
pub mod scratch;
pub mod tag_pruner;
pub mod window_collector;

pub use comparer::{FingerprintComparer, ToolFingerprintComparer};
pub use extractor::{FingerprintExtractor, ToolFingerprintExtractor};
pub use pattern_voter::{PatternVoter, TriggerPattern, Vote};
pub use payload_extractor::PayloadExtractor;
pub use scratch::ScratchWorkspace;
pub use tag_pruner::TagPruner;
pub use window_collector::{WindowCollector, WindowGroup};
