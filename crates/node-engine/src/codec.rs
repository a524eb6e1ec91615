//! Image codec seam
//!
//! The engine never decodes or encodes image files itself. Input nodes and
//! the batch runner go through an [`ImageCodec`], which converts between
//! files on disk and RGB or grayscale [`Artifact`]s.

use std::path::Path;

use crate::artifact::Artifact;
use crate::error::Result;

/// Reads and writes image files
pub trait ImageCodec: Send + Sync {
    /// Decode the file at `path`
    fn read(&self, path: &Path) -> Result<Artifact>;

    /// Encode `artifact` to `path`, choosing the format from the extension
    fn write(&self, path: &Path, artifact: &Artifact) -> Result<()>;
}
