//! Configuration models and the layer merge.

mod entry;
mod layer;
mod merge;
mod settings;
mod tree;

pub use entry::{AgentEntry, EntryKind, MAX_TIMEOUT_SECS, MIN_TIMEOUT_SECS, UtdEntry};
pub use layer::{ConfigLayer, LayerKind};
pub use merge::{MergedConfig, ReferenceIssue, load, merge_layers};
pub use settings::{DEFAULT_TIMEOUT_SECS, Settings};
pub use tree::ConfigTree;
