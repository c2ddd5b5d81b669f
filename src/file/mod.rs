//! Interfaces for locating protobuf source files.
//!
//! The loader addresses files by logical name, exactly as written in
//! `import` statements. The main implementation is [`IncludeFileResolver`],
//! which probes one import search root on the file system;
//! [`ChainFileResolver`] tries several resolvers in order. Custom resolvers
//! can source files from anywhere else, such as in-memory fixtures.

mod chain;
mod include;

pub use chain::ChainFileResolver;
pub use include::IncludeFileResolver;

use std::path::{Path, PathBuf};

use crate::error::Error;

/// A strategy for locating protobuf source files by logical name.
pub trait FileResolver {
    /// Opens a file by its logical name.
    ///
    /// # Errors
    ///
    /// If the file does not exist, the implementation should return
    /// [`Error::file_not_found()`] so that a containing
    /// [`ChainFileResolver`] can try the next resolver.
    fn open(&self, name: &str) -> Result<SourceFile, Error>;
}

impl<T> FileResolver for Box<T>
where
    T: FileResolver + ?Sized,
{
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        (**self).open(name)
    }
}

/// An opened protobuf source file, returned by [`FileResolver::open`].
#[derive(Debug, Clone)]
pub struct SourceFile {
    name: String,
    path: Option<PathBuf>,
    source: String,
}

impl SourceFile {
    /// Creates a source file from a string, with no backing path.
    pub fn from_source(name: &str, source: &str) -> SourceFile {
        SourceFile {
            name: name.to_owned(),
            path: None,
            source: source.to_owned(),
        }
    }

    pub(crate) fn from_path(name: &str, path: PathBuf, source: String) -> SourceFile {
        SourceFile {
            name: name.to_owned(),
            path: Some(path),
            source,
        }
    }

    /// The logical name of this file.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The filesystem path, if this file is backed by a physical file.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The full source text.
    pub fn source(&self) -> &str {
        &self.source
    }
}
