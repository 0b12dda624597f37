mod asset_reader;
mod registry_transport;
mod shell_runner;

pub use asset_reader::AssetReader;
pub use registry_transport::RegistryTransport;
pub use shell_runner::{ShellError, ShellOutput, ShellRunner};
