use std::{fs, io, path::PathBuf};

use crate::error::{Error, ErrorKind};

use super::{FileResolver, SourceFile};

/// A [`FileResolver`] that searches one import root on the file system.
#[derive(Debug)]
pub struct IncludeFileResolver {
    include: PathBuf,
}

impl IncludeFileResolver {
    /// Constructs an `IncludeFileResolver` that searches the given root.
    pub fn new(include: PathBuf) -> Self {
        IncludeFileResolver { include }
    }
}

impl FileResolver for IncludeFileResolver {
    /// Opens `<include>/<name>` if it exists and is a regular file.
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        let path = self.include.join(name);
        if !path.is_file() {
            return Err(Error::file_not_found(name));
        }

        match fs::read_to_string(&path) {
            Ok(source) => Ok(SourceFile::from_path(name, path, source)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Error::file_not_found(name)),
            Err(err) => Err(Error::from_kind(ErrorKind::OpenFile { path, err })),
        }
    }
}
