use std::{fmt, io, path::PathBuf};

use logos::Span;
use miette::{Diagnostic, NamedSource, SourceCode, SpanContents as _};
use thiserror::Error;

use crate::MAX_FIELD_NUMBER;

/// An error that can occur while compiling protobuf files.
#[derive(Debug, Diagnostic, Error)]
#[error(transparent)]
#[diagnostic(transparent)]
pub struct Error {
    kind: Box<ErrorKind>,
}

#[derive(Debug, Diagnostic, Error)]
pub(crate) enum ErrorKind {
    #[error("{}", err)]
    #[diagnostic(forward(err))]
    Parse { err: ParseError },
    #[error("file not found: {name}")]
    FileNotFound { name: String },
    #[error("import cycle detected: {cycle}")]
    CircularImport { cycle: String },
    #[error("error opening file '{}'", path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("{file}: failed to resolve name '{name}'")]
    UnresolvedName { file: String, name: String },
    #[error("{file}: invalid map key type '{name}'")]
    #[diagnostic(help("map keys must be an integer type, 'bool' or 'string'"))]
    InvalidMapKeyType { file: String, name: String },
    #[error("{file}: extendee '{name}' is not a message type")]
    ExtendeeNotMessage { file: String, name: String },
    #[error("internal error: {message}")]
    Internal { message: String },
    #[error(transparent)]
    Custom(Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Creates an instance of [`struct@Error`] with an arbitrary payload.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::from_kind(ErrorKind::Custom(error.into()))
    }

    /// Creates an instance of [`struct@Error`] indicating that a file could not
    /// be found.
    ///
    /// [`FileResolver`](crate::file::FileResolver) implementations should
    /// return this error when a file does not exist, so that resolver chains
    /// can fall through to the next search root.
    pub fn file_not_found(name: &str) -> Self {
        Error::from_kind(ErrorKind::FileNotFound {
            name: name.to_owned(),
        })
    }

    /// Returns true if this is an instance of [`Error::file_not_found()`].
    pub fn is_file_not_found(&self) -> bool {
        matches!(&*self.kind, ErrorKind::FileNotFound { .. })
    }

    /// Returns true if this error was caused by a failure to parse a source
    /// file.
    pub fn is_parse(&self) -> bool {
        matches!(&*self.kind, ErrorKind::Parse { .. })
    }

    pub(crate) fn from_kind(kind: ErrorKind) -> Self {
        Error {
            kind: Box::new(kind),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Error::from_kind(ErrorKind::Internal {
            message: message.into(),
        })
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Self {
        Error::from_kind(ErrorKind::Parse { err })
    }
}

/// An error that occurred while parsing a protobuf source file.
///
/// The `Debug` representation renders as `<file>:<line>:<column>: <message>`
/// with 1-based line numbering; the miette [`Diagnostic`] implementation
/// additionally carries the source span for rich reporting.
#[derive(Error, Diagnostic)]
#[error("{}", kind)]
#[diagnostic(forward(kind))]
pub struct ParseError {
    kind: Box<ParseErrorKind>,
    #[source_code]
    source_code: NamedSource,
}

#[derive(Error, Debug, Diagnostic, PartialEq)]
pub(crate) enum ParseErrorKind {
    #[error("invalid token")]
    InvalidToken {
        #[label("found here")]
        span: Span,
    },
    #[error("unterminated string")]
    UnterminatedString {
        #[label("string starts here")]
        span: Span,
    },
    #[error("invalid string escape")]
    InvalidStringEscape {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid string character")]
    InvalidStringCharacters {
        #[label("invalid characters")]
        span: Span,
    },
    #[error("string is not valid utf-8")]
    InvalidUtf8String {
        #[label("defined here")]
        span: Span,
    },
    #[error("unknown syntax '{syntax}'")]
    #[diagnostic(help("possible values are 'proto2' and 'proto3'"))]
    UnknownSyntax {
        syntax: String,
        #[label("defined here")]
        span: Span,
    },
    #[error("duplicate syntax statement")]
    DuplicateSyntax {
        #[label("defined again here")]
        span: Span,
    },
    #[error("duplicate package statement")]
    DuplicatePackage {
        #[label("defined again here")]
        span: Span,
    },
    #[error("invalid package name")]
    #[diagnostic(help(
        "package names are '.'-separated identifiers, without leading, trailing or doubled dots"
    ))]
    InvalidPackageName {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid identifier")]
    #[diagnostic(help("identifiers must consist of letters, numbers and underscores, and may not start with a number"))]
    InvalidIdentifier {
        #[label("defined here")]
        span: Span,
    },
    #[error("invalid group name")]
    #[diagnostic(help(
        "group names must consist of a capital letter followed by letters, numbers and underscores"
    ))]
    InvalidGroupName {
        #[label("defined here")]
        span: Span,
    },
    #[error("expected {expected}, but found '{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        #[label("found here")]
        span: Span,
    },
    #[error("expected {expected}, but reached end of file")]
    UnexpectedEof { expected: String },
    #[error("field numbers must be between 1 and {}", MAX_FIELD_NUMBER)]
    InvalidFieldNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("field numbers between 19000 and 19999 are reserved")]
    ReservedFieldNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("enum numbers must be between {} and {}", i32::MIN, i32::MAX)]
    InvalidEnumNumber {
        #[label("defined here")]
        span: Span,
    },
    #[error("extension range end must not be less than its start")]
    InvalidExtensionRange {
        #[label("defined here")]
        span: Span,
    },
    #[error("{kind} fields are not allowed in extensions")]
    InvalidExtendFieldKind {
        kind: &'static str,
        #[label("defined here")]
        span: Span,
    },
    #[error("oneof declarations may not be nested")]
    NestedOneof {
        #[label("defined here")]
        span: Span,
    },
}

impl ParseError {
    pub(crate) fn new(
        kind: ParseErrorKind,
        name: &str,
        source: impl SourceCode + Send + Sync + 'static,
    ) -> Self {
        ParseError {
            kind: Box::new(kind),
            source_code: NamedSource::new(name, source),
        }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    /// Gets the primary source code span associated with this error, if any.
    pub fn span(&self) -> Option<Span> {
        match &*self.kind {
            ParseErrorKind::InvalidToken { span } => Some(span.clone()),
            ParseErrorKind::UnterminatedString { span } => Some(span.clone()),
            ParseErrorKind::InvalidStringEscape { span } => Some(span.clone()),
            ParseErrorKind::InvalidStringCharacters { span } => Some(span.clone()),
            ParseErrorKind::InvalidUtf8String { span } => Some(span.clone()),
            ParseErrorKind::UnknownSyntax { span, .. } => Some(span.clone()),
            ParseErrorKind::DuplicateSyntax { span } => Some(span.clone()),
            ParseErrorKind::DuplicatePackage { span } => Some(span.clone()),
            ParseErrorKind::InvalidPackageName { span } => Some(span.clone()),
            ParseErrorKind::InvalidIdentifier { span } => Some(span.clone()),
            ParseErrorKind::InvalidGroupName { span } => Some(span.clone()),
            ParseErrorKind::UnexpectedToken { span, .. } => Some(span.clone()),
            ParseErrorKind::UnexpectedEof { .. } => None,
            ParseErrorKind::InvalidFieldNumber { span } => Some(span.clone()),
            ParseErrorKind::ReservedFieldNumber { span } => Some(span.clone()),
            ParseErrorKind::InvalidEnumNumber { span } => Some(span.clone()),
            ParseErrorKind::InvalidExtensionRange { span } => Some(span.clone()),
            ParseErrorKind::InvalidExtendFieldKind { span, .. } => Some(span.clone()),
            ParseErrorKind::NestedOneof { span } => Some(span.clone()),
        }
    }
}

impl fmt::Debug for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.span().and_then(|span| {
            let contents = self.source_code.read_span(&span.into(), 0, 0).ok()?;
            let file = contents.name().unwrap_or("<unknown>").to_owned();
            Some((file, contents.line() + 1, contents.column() + 1))
        });

        match location {
            Some((file, line, column)) => write!(f, "{}:{}:{}: {}", file, line, column, self),
            None => write!(f, "{}", self),
        }
    }
}
