//! Ergonomic error context helpers.
//!
//! Provides an extension trait for adding path context to `io::Result`,
//! converting IO errors into `NetError::Io`.

use crate::base::neterror::NetError;
use std::io;
use std::path::Path;

/// Extension trait for adding context to IO Results.
pub trait IoResultExt<T> {
    /// Attach the path the failed operation was working on.
    ///
    /// # Example
    /// ```ignore
    /// use curlreq::base::context::IoResultExt;
    ///
    /// let absolute = std::fs::canonicalize(path).path_context(path)?;
    /// // Error: "I/O error on ./missing.txt: No such file or directory"
    /// ```
    fn path_context(self, path: &Path) -> Result<T, NetError>;
}

impl<T> IoResultExt<T> for Result<T, io::Error> {
    fn path_context(self, path: &Path) -> Result<T, NetError> {
        self.map_err(|e| NetError::io(path.display().to_string(), e))
    }
}
