//! The abstract syntax tree for protobuf schema files.
//!
//! All nodes are owned by a [`FileSet`], which stores files, messages, enums,
//! services and extensions in flat arenas addressed by typed ids. Upward
//! references (`up` fields) and resolved type references are arena ids, so the
//! parent/child cycles of the schema graph never become ownership cycles.
//!
//! The parser creates nodes in a single pass; the resolver fills in the
//! resolved type references afterwards and is the only mutation after
//! construction. The descriptor generator only reads.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            pub(crate) fn new(index: usize) -> Self {
                $name(index as u32)
            }

            pub(crate) fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a [`File`] within a [`FileSet`].
    FileId
);
define_id!(
    /// Identifies a [`Message`] within a [`FileSet`].
    MessageId
);
define_id!(
    /// Identifies an [`Enum`] within a [`FileSet`].
    EnumId
);
define_id!(
    /// Identifies a [`Service`] within a [`FileSet`].
    ServiceId
);
define_id!(
    /// Identifies an [`Extension`] within a [`FileSet`].
    ExtensionId
);

/// A set of parsed proto files and every node they contain.
#[derive(Debug, Default)]
pub struct FileSet {
    files: Vec<File>,
    order: Vec<FileId>,
    messages: Vec<Message>,
    enums: Vec<Enum>,
    services: Vec<Service>,
    extensions: Vec<Extension>,
}

impl FileSet {
    pub(crate) fn new() -> FileSet {
        FileSet::default()
    }

    /// Iterates over the files in topological order: a file is yielded before
    /// every file that imports it.
    pub fn files(&self) -> impl Iterator<Item = &File> + '_ {
        self.order.iter().map(|&id| self.file(id))
    }

    pub(crate) fn file_ids(&self) -> impl Iterator<Item = FileId> + '_ {
        self.order.iter().copied()
    }

    /// Returns the file with the given id.
    pub fn file(&self, id: FileId) -> &File {
        &self.files[id.index()]
    }

    /// Returns the message with the given id.
    pub fn message(&self, id: MessageId) -> &Message {
        &self.messages[id.index()]
    }

    /// Returns the enum with the given id.
    pub fn enum_(&self, id: EnumId) -> &Enum {
        &self.enums[id.index()]
    }

    /// Returns the service with the given id.
    pub fn service(&self, id: ServiceId) -> &Service {
        &self.services[id.index()]
    }

    /// Returns the extension block with the given id.
    pub fn extension(&self, id: ExtensionId) -> &Extension {
        &self.extensions[id.index()]
    }

    pub(crate) fn file_mut(&mut self, id: FileId) -> &mut File {
        &mut self.files[id.index()]
    }

    pub(crate) fn message_mut(&mut self, id: MessageId) -> &mut Message {
        &mut self.messages[id.index()]
    }

    pub(crate) fn enum_mut(&mut self, id: EnumId) -> &mut Enum {
        &mut self.enums[id.index()]
    }

    pub(crate) fn service_mut(&mut self, id: ServiceId) -> &mut Service {
        &mut self.services[id.index()]
    }

    pub(crate) fn extension_mut(&mut self, id: ExtensionId) -> &mut Extension {
        &mut self.extensions[id.index()]
    }

    pub(crate) fn alloc_file(&mut self, file: File) -> FileId {
        let id = FileId::new(self.files.len());
        self.files.push(file);
        id
    }

    /// Marks a file as fully loaded, fixing its place in the output order.
    ///
    /// The loader calls this after all of the file's imports have been
    /// loaded, which makes the order topological by construction.
    pub(crate) fn finish_file(&mut self, id: FileId) {
        debug_assert!(!self.order.contains(&id));
        self.order.push(id);
    }

    pub(crate) fn alloc_message(&mut self, message: Message) -> MessageId {
        let id = MessageId::new(self.messages.len());
        self.messages.push(message);
        id
    }

    pub(crate) fn alloc_enum(&mut self, enum_: Enum) -> EnumId {
        let id = EnumId::new(self.enums.len());
        self.enums.push(enum_);
        id
    }

    pub(crate) fn alloc_service(&mut self, service: Service) -> ServiceId {
        let id = ServiceId::new(self.services.len());
        self.services.push(service);
        id
    }

    pub(crate) fn alloc_extension(&mut self, extension: Extension) -> ExtensionId {
        let id = ExtensionId::new(self.extensions.len());
        self.extensions.push(extension);
        id
    }

    /// Returns the fully qualified, leading-dot name of a message or enum,
    /// e.g. `.pkg.Outer.Inner`.
    ///
    /// Built by walking `up` references to the enclosing file, then
    /// prepending the file's package components.
    pub fn qualified_name(&self, ty: NamedType) -> String {
        let mut parts = Vec::new();
        let mut scope = match ty {
            NamedType::Message(id) => {
                let message = self.message(id);
                parts.push(message.name.as_str());
                message.up
            }
            NamedType::Enum(id) => {
                let enum_ = self.enum_(id);
                parts.push(enum_.name.as_str());
                enum_.up
            }
        };

        loop {
            match scope {
                TypeScope::Message(id) => {
                    let message = self.message(id);
                    parts.push(message.name.as_str());
                    scope = message.up;
                }
                TypeScope::File(id) => {
                    for component in self.file(id).package.iter().rev() {
                        parts.push(component);
                    }
                    break;
                }
            }
        }

        parts.reverse();
        format!(".{}", parts.join("."))
    }

    /// Returns the file enclosing a scope by walking `up` references.
    pub fn file_of(&self, mut scope: TypeScope) -> FileId {
        loop {
            match scope {
                TypeScope::File(id) => return id,
                TypeScope::Message(id) => scope = self.message(id).up,
            }
        }
    }
}

/// The enclosing scope of a message, enum or extension block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeScope {
    File(FileId),
    Message(MessageId),
}

/// A resolved reference to a named type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedType {
    Message(MessageId),
    Enum(EnumId),
}

/// A source position: 1-based line number and 0-based byte offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub offset: usize,
}

/// The declared syntax of a file. `proto2` when absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

/// A single parsed proto file.
#[derive(Debug)]
pub struct File {
    /// The filename as requested, relative to an import root.
    pub name: String,
    pub syntax: Syntax,
    /// Dotted package path components; empty if the file has no package.
    pub package: Vec<String>,
    /// Imported filenames, in declaration order.
    pub imports: Vec<String>,
    /// Indexes into `imports` of the imports declared `public`.
    pub public_imports: Vec<usize>,
    pub options: Vec<FileOption>,
    pub messages: Vec<MessageId>,
    pub enums: Vec<EnumId>,
    pub services: Vec<ServiceId>,
    pub extensions: Vec<ExtensionId>,
    /// All comment blocks of the file, in source order.
    pub comments: Vec<Comment>,
    pub(crate) source: String,
}

impl File {
    pub(crate) fn new(name: impl Into<String>, source: impl Into<String>) -> File {
        File {
            name: name.into(),
            syntax: Syntax::default(),
            package: Vec::new(),
            imports: Vec::new(),
            public_imports: Vec::new(),
            options: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            comments: Vec::new(),
            source: source.into(),
        }
    }

    /// Returns the comment block that ends on the line immediately above
    /// `pos`, if any.
    pub fn leading_comment(&self, pos: Position) -> Option<&Comment> {
        let line = pos.line.checked_sub(1)?;
        let index = self.comments.partition_point(|c| c.end.line < line);
        self.comments.get(index).filter(|c| c.end.line == line)
    }

    /// Returns the single-line comment block on the same line as `pos`, if
    /// any.
    pub fn inline_comment(&self, pos: Position) -> Option<&Comment> {
        let index = self.comments.partition_point(|c| c.start.line < pos.line);
        let comment = self.comments.get(index).filter(|c| c.start.line == pos.line)?;
        debug_assert!(comment.start == comment.end && comment.text.len() == 1);
        Some(comment)
    }
}

/// A file-level option; the value distinguishes quoted strings from bare
/// identifiers as required for descriptor encoding.
#[derive(Debug, Clone, PartialEq)]
pub struct FileOption {
    pub name: String,
    pub value: OptionValue,
}

/// The raw value of a file-level option.
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    /// A quoted string literal, stored unescaped.
    String(String),
    /// Any other token, stored as written.
    Ident(String),
}

/// A proto message, including synthetic messages produced from groups.
#[derive(Debug)]
pub struct Message {
    pub name: String,
    /// Position of the `message` keyword (or of the group body).
    pub position: Position,
    /// True if this message was synthesized from a group field.
    pub group: bool,
    pub fields: Vec<Field>,
    /// Nested messages, including groups, in declaration order.
    pub messages: Vec<MessageId>,
    pub enums: Vec<EnumId>,
    pub oneofs: Vec<Oneof>,
    pub extensions: Vec<ExtensionId>,
    /// Declared extension ranges, inclusive at both ends.
    pub extension_ranges: Vec<(i32, i32)>,
    pub up: TypeScope,
}

impl Message {
    pub(crate) fn new(name: String, position: Position, up: TypeScope) -> Message {
        Message {
            name,
            position,
            group: false,
            fields: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            oneofs: Vec::new(),
            extensions: Vec::new(),
            extension_ranges: Vec::new(),
            up,
        }
    }
}

/// The label of a field. Optional when not written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Label {
    #[default]
    Optional,
    Required,
    Repeated,
}

/// A field of a message or extension block.
#[derive(Debug)]
pub struct Field {
    pub position: Position,
    pub name: String,
    pub tag: i32,
    pub label: Label,
    /// The type name as written; for map fields, the value type.
    pub type_name: String,
    /// Set during resolution, or by the parser for group fields.
    pub ty: Option<FieldType>,
    /// For map fields, the key type name as written.
    pub key_type_name: Option<String>,
    /// Set during resolution for map fields.
    pub key_ty: Option<ScalarType>,
    /// The raw default literal; string defaults are stored unescaped.
    pub default: Option<String>,
    /// The value of the `packed` field option, if present.
    pub packed: Option<bool>,
    /// Index into the enclosing message's `oneofs`, if the field is a oneof
    /// member.
    pub oneof: Option<usize>,
}

impl Field {
    pub(crate) fn new(position: Position) -> Field {
        Field {
            position,
            name: String::new(),
            tag: 0,
            label: Label::default(),
            type_name: String::new(),
            ty: None,
            key_type_name: None,
            key_ty: None,
            default: None,
            packed: None,
            oneof: None,
        }
    }
}

/// The resolved type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Scalar(ScalarType),
    Message(MessageId),
    Enum(EnumId),
}

/// The fifteen scalar field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarType {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
}

impl ScalarType {
    /// Looks up a scalar type by its source name.
    pub fn from_name(name: &str) -> Option<ScalarType> {
        match name {
            "double" => Some(ScalarType::Double),
            "float" => Some(ScalarType::Float),
            "int32" => Some(ScalarType::Int32),
            "int64" => Some(ScalarType::Int64),
            "uint32" => Some(ScalarType::Uint32),
            "uint64" => Some(ScalarType::Uint64),
            "sint32" => Some(ScalarType::Sint32),
            "sint64" => Some(ScalarType::Sint64),
            "fixed32" => Some(ScalarType::Fixed32),
            "fixed64" => Some(ScalarType::Fixed64),
            "sfixed32" => Some(ScalarType::Sfixed32),
            "sfixed64" => Some(ScalarType::Sfixed64),
            "bool" => Some(ScalarType::Bool),
            "string" => Some(ScalarType::String),
            "bytes" => Some(ScalarType::Bytes),
            _ => None,
        }
    }

    /// Whether this type may be the key of a map field.
    pub fn is_valid_map_key(self) -> bool {
        !matches!(
            self,
            ScalarType::Double | ScalarType::Float | ScalarType::Bytes
        )
    }
}

/// A oneof declaration. Member fields refer to it by index.
#[derive(Debug)]
pub struct Oneof {
    pub name: String,
    pub position: Position,
}

/// An enum declaration.
#[derive(Debug)]
pub struct Enum {
    pub name: String,
    pub position: Position,
    pub values: Vec<EnumValue>,
    pub up: TypeScope,
}

impl Enum {
    pub(crate) fn new(name: String, position: Position, up: TypeScope) -> Enum {
        Enum {
            name,
            position,
            values: Vec::new(),
            up,
        }
    }
}

/// A single value of an enum.
#[derive(Debug)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
    pub position: Position,
}

/// An RPC service declaration.
#[derive(Debug)]
pub struct Service {
    pub name: String,
    pub position: Position,
    pub methods: Vec<Method>,
    pub up: FileId,
}

impl Service {
    pub(crate) fn new(name: String, position: Position, up: FileId) -> Service {
        Service {
            name,
            position,
            methods: Vec::new(),
            up,
        }
    }
}

/// A method of a service.
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub position: Position,
    pub in_type_name: String,
    pub out_type_name: String,
    /// Set during resolution.
    pub in_ty: Option<NamedType>,
    /// Set during resolution.
    pub out_ty: Option<NamedType>,
}

/// An `extend` block.
#[derive(Debug)]
pub struct Extension {
    pub position: Position,
    /// The extendee type name as written.
    pub extendee: String,
    /// Set during resolution; always a message.
    pub extendee_type: Option<MessageId>,
    pub fields: Vec<Field>,
    pub up: TypeScope,
}

impl Extension {
    pub(crate) fn new(position: Position, extendee: String, up: TypeScope) -> Extension {
        Extension {
            position,
            extendee,
            extendee_type: None,
            fields: Vec::new(),
            up,
        }
    }
}

/// A contiguous run of `//` comments.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Position of the first `//`.
    pub start: Position,
    /// Position of the last `//`.
    pub end: Position,
    /// One entry per line, with the common left-whitespace prefix and any
    /// trailing whitespace removed.
    pub text: Vec<String>,
}
