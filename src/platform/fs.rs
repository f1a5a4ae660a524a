// CycleScope - platform/fs.rs
//
// Bounded file reading for series inputs.

use crate::util::error::SourceError;
use std::path::Path;

/// Read a text file, refusing anything larger than `max_size` bytes.
///
/// Invalid UTF-8 is replaced rather than rejected; the CSV reader reports
/// any cell that ends up unparseable.
pub fn read_file_capped(path: &Path, max_size: u64) -> Result<String, SourceError> {
    let metadata = std::fs::metadata(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if metadata.len() > max_size {
        return Err(SourceError::FileTooLarge {
            path: path.to_path_buf(),
            size: metadata.len(),
            max_size,
        });
    }

    let bytes = std::fs::read(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
