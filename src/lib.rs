//! A Protocol Buffers schema compiler front end.
//!
//! `protodesc` parses `.proto` source files, discovers and loads their
//! transitive imports across a set of import search roots, resolves type
//! references using the proto2/proto3 scoping rules, and lowers the result
//! to a [`FileDescriptorSet`](prost_types::FileDescriptorSet), the wire
//! format consumed by protoc-compatible code generator plugins.
//!
//! For one-shot compilation see [`compile()`]; for more control over file
//! lookup see [`Compiler`] and the [`file`] module.
//!
//! # Examples
//!
//! ```
//! # use prost_types::{DescriptorProto, FileDescriptorProto, FileDescriptorSet};
//! # let dir = tempfile::tempdir().unwrap();
//! # std::env::set_current_dir(&dir).unwrap();
//! std::fs::write("root.proto", "message Foo {}").unwrap();
//!
//! let files = protodesc::compile(["root.proto"], ["."]).unwrap();
//! assert_eq!(files, FileDescriptorSet {
//!     file: vec![FileDescriptorProto {
//!         name: Some("root.proto".to_owned()),
//!         message_type: vec![DescriptorProto {
//!             name: Some("Foo".to_owned()),
//!             ..Default::default()
//!         }],
//!         ..Default::default()
//!     }],
//! });
//! ```
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod ast;
pub mod file;

mod compile;
mod error;
mod generate;
mod lex;
mod parse;
mod resolve;

use std::path::Path;

use prost_types::FileDescriptorSet;

pub use self::compile::Compiler;
pub use self::error::{Error, ParseError};

pub(crate) const MAX_FIELD_NUMBER: i32 = 536_870_911;

/// Convenience function for compiling a set of protobuf files.
///
/// This is equivalent to constructing a [`Compiler`] over `includes`, adding
/// each of `files`, and calling
/// [`file_descriptor_set()`](Compiler::file_descriptor_set). The returned
/// set contains every transitively imported file, topologically ordered.
pub fn compile<F, N, I, P>(files: F, includes: I) -> Result<FileDescriptorSet, Error>
where
    F: IntoIterator<Item = N>,
    N: AsRef<str>,
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let mut compiler = Compiler::new(includes)?;
    for file in files {
        compiler.add_file(file.as_ref())?;
    }
    compiler.file_descriptor_set()
}
