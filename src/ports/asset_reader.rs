use std::io;
use std::path::Path;

/// Port for reading template and prompt files.
pub trait AssetReader {
    fn read_to_string(&self, path: &Path) -> io::Result<String>;
}
