mod fake_shell;
mod fake_transport;
mod memory_assets;

pub use fake_shell::{FakeShellRunner, RecordedRun};
pub use fake_transport::{SequenceTransport, transport_failure};
pub use memory_assets::MemoryAssetReader;
