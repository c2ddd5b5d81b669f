//! The compiler driver: loads files and their transitive imports, then
//! resolves and lowers them.


use std::{collections::HashMap, fmt, fmt::Write as _, path::Path};

use prost::Message as _;
use prost_types::FileDescriptorSet;
use tracing::debug;

use crate::{
    ast::{self, FileId},
    error::{Error, ErrorKind},
    file::{ChainFileResolver, FileResolver, IncludeFileResolver},
    generate, parse, resolve,
};

/// Compiles a set of protobuf files into a
/// [`FileDescriptorSet`](prost_types::FileDescriptorSet).
///
/// Files and their transitive imports are located through a
/// [`FileResolver`]; imports are loaded depth-first so the output is
/// topologically ordered, with every file preceding the files that import
/// it. Import cycles are rejected.
pub struct Compiler {
    resolver: Box<dyn FileResolver>,
    set: ast::FileSet,
    index: HashMap<String, FileId>,
    resolved: bool,
}

impl Compiler {
    /// Creates a new [`Compiler`] searching the given import roots.
    ///
    /// If no roots are given, the current directory is searched.
    pub fn new<I, P>(includes: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut resolver = ChainFileResolver::new();
        let mut empty = true;
        for include in includes {
            resolver.add(IncludeFileResolver::new(include.as_ref().to_owned()));
            empty = false;
        }
        if empty {
            resolver.add(IncludeFileResolver::new(".".into()));
        }

        Ok(Compiler::with_file_resolver(resolver))
    }

    /// Creates a new [`Compiler`] with a custom [`FileResolver`] for looking
    /// up files.
    pub fn with_file_resolver<R>(resolver: R) -> Self
    where
        R: FileResolver + 'static,
    {
        Compiler {
            resolver: Box::new(resolver),
            set: ast::FileSet::new(),
            index: HashMap::new(),
            resolved: false,
        }
    }

    /// Loads the file with the given logical name, along with all of its
    /// transitive imports.
    pub fn add_file(&mut self, name: &str) -> Result<&mut Self, Error> {
        let mut import_stack = Vec::new();
        self.load_file(name, &mut import_stack)?;
        self.resolved = false;
        Ok(self)
    }

    /// Resolves all loaded files and lowers them to a descriptor set.
    pub fn file_descriptor_set(&mut self) -> Result<FileDescriptorSet, Error> {
        if !self.resolved {
            resolve::resolve_file_set(&mut self.set)?;
            self.resolved = true;
        }
        generate::generate_file_set(&self.set)
    }

    /// Like [`file_descriptor_set()`](Compiler::file_descriptor_set), but
    /// returns the encoded bytes.
    pub fn encode_file_descriptor_set(&mut self) -> Result<Vec<u8>, Error> {
        Ok(self.file_descriptor_set()?.encode_to_vec())
    }

    /// Returns the loaded AST.
    pub fn file_set(&self) -> &ast::FileSet {
        &self.set
    }

    fn load_file(&mut self, name: &str, import_stack: &mut Vec<String>) -> Result<FileId, Error> {
        if let Some(&id) = self.index.get(name) {
            return Ok(id);
        }

        if import_stack.iter().any(|n| n == name) {
            let mut cycle = String::new();
            for import in import_stack.iter() {
                let _ = write!(cycle, "{} -> ", import);
            }
            let _ = write!(cycle, "{}", name);
            return Err(Error::from_kind(ErrorKind::CircularImport { cycle }));
        }

        let source = self.resolver.open(name)?;
        debug!(file = name, path = ?source.path(), "loaded file");

        let id = parse::parse_file(&mut self.set, name, source.source())?;

        import_stack.push(name.to_owned());
        for import in self.set.file(id).imports.clone() {
            self.load_file(&import, import_stack)?;
        }
        import_stack.pop();

        // Imports finished first, so the output order is topological.
        self.set.finish_file(id);
        self.index.insert(name.to_owned(), id);
        Ok(id)
    }
}

impl fmt::Debug for Compiler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compiler")
            .field("files", &self.index)
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}
