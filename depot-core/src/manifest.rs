use crate::error::Result;
use crate::file::DepotFile;

/// A parsed depot manifest: the file list for one depot version.
pub trait Manifest: Send {
    fn depot_id(&self) -> u32;

    /// True until [`decrypt_filenames`](Self::decrypt_filenames) succeeds on
    /// a manifest whose names were shipped encrypted.
    fn filenames_encrypted(&self) -> bool;

    fn decrypt_filenames(&mut self, key: &[u8]) -> Result<()>;

    /// Every entry in the manifest, directories and symlinks included.
    fn into_files(self: Box<Self>) -> Vec<Box<dyn DepotFile>>;
}
