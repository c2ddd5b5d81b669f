use std::fmt;

use crate::error::Error;

use super::{FileResolver, SourceFile};

/// A [`FileResolver`] that tries several other resolvers in order.
///
/// The loader uses one of these over the configured import search roots:
/// the first resolver that does not report "file not found" wins.
#[derive(Default)]
pub struct ChainFileResolver {
    resolvers: Vec<Box<dyn FileResolver>>,
}

impl ChainFileResolver {
    /// Creates a new, empty [`ChainFileResolver`].
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a resolver, searched after all previously added resolvers.
    pub fn add<F>(&mut self, resolver: F)
    where
        F: FileResolver + 'static,
    {
        self.resolvers.push(Box::new(resolver))
    }
}

impl FileResolver for ChainFileResolver {
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        for resolver in &self.resolvers {
            match resolver.open(name) {
                Ok(file) => return Ok(file),
                Err(err) if err.is_file_not_found() => continue,
                Err(err) => return Err(err),
            }
        }

        Err(Error::file_not_found(name))
    }
}

impl fmt::Debug for ChainFileResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainFileResolver").finish_non_exhaustive()
    }
}
