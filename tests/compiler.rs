use prost::Message as _;
use prost_types::{
    descriptor_proto::ExtensionRange,
    field_descriptor_proto::{Label, Type},
    uninterpreted_option::NamePart,
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FieldOptions, FileDescriptorProto, FileDescriptorSet, FileOptions, MessageOptions,
    MethodDescriptorProto, OneofDescriptorProto, ServiceDescriptorProto, UninterpretedOption,
};
use protodesc::{
    file::{FileResolver, SourceFile},
    Compiler, Error,
};
use similar_asserts::assert_eq;

struct TestFileResolver {
    files: Vec<(&'static str, &'static str)>,
}

impl FileResolver for TestFileResolver {
    fn open(&self, name: &str) -> Result<SourceFile, Error> {
        for (file, source) in &self.files {
            if *file == name {
                return Ok(SourceFile::from_source(name, source));
            }
        }

        Err(Error::file_not_found(name))
    }
}

/// Compiles the listed files, adding the last one as the root, and checks
/// the universal descriptor invariants on the result.
fn try_compile(files: &[(&'static str, &'static str)]) -> Result<FileDescriptorSet, Error> {
    let mut compiler = Compiler::with_file_resolver(TestFileResolver {
        files: files.to_vec(),
    });
    compiler.add_file(files.last().expect("no files").0)?;
    let set = compiler.file_descriptor_set()?;
    check_invariants(&set);
    Ok(set)
}

fn compile_files(files: &[(&'static str, &'static str)]) -> FileDescriptorSet {
    try_compile(files).expect("compilation failed")
}

fn compile_one(source: &'static str) -> FileDescriptorProto {
    let mut set = compile_files(&[("test.proto", source)]);
    assert_eq!(set.file.len(), 1);
    set.file.remove(0)
}

/// Checks the invariants that hold for every generated descriptor set:
/// import closure, topological order, tag ranges, half-open extension
/// ranges, leading-dot type names, and a clean encode/decode round trip.
fn check_invariants(set: &FileDescriptorSet) {
    let names: Vec<&str> = set.file.iter().map(|f| f.name()).collect();

    for (index, file) in set.file.iter().enumerate() {
        for dep in &file.dependency {
            let dep_index = names
                .iter()
                .position(|name| *name == dep.as_str())
                .unwrap_or_else(|| panic!("import '{}' not present in the set", dep));
            assert!(
                dep_index < index,
                "'{}' appears after its importer '{}'",
                dep,
                file.name(),
            );
        }

        for message in &file.message_type {
            check_message_invariants(message);
        }
        for extension in &file.extension {
            check_field_invariants(extension);
        }
    }

    let encoded = set.encode_to_vec();
    let decoded = FileDescriptorSet::decode(encoded.as_slice()).expect("round trip failed");
    assert_eq!(&decoded, set);
}

fn check_message_invariants(message: &DescriptorProto) {
    for field in message.field.iter().chain(&message.extension) {
        check_field_invariants(field);
    }
    for range in &message.extension_range {
        assert!(range.start() < range.end(), "empty extension range");
        assert!(range.start() >= 1 && range.end() <= 536_870_912);
    }
    for nested in &message.nested_type {
        check_message_invariants(nested);
    }
}

fn check_field_invariants(field: &FieldDescriptorProto) {
    let number = field.number();
    assert!((1..=536_870_911).contains(&number), "bad tag {}", number);
    assert!(!(19000..=19999).contains(&number), "reserved tag {}", number);
    if field.r#type == Some(Type::Message as i32)
        || field.r#type == Some(Type::Enum as i32)
        || field.r#type == Some(Type::Group as i32)
    {
        assert!(
            field.type_name().starts_with('.'),
            "type name '{}' is not fully qualified",
            field.type_name(),
        );
    }
}

fn message_file(message_type: Vec<DescriptorProto>) -> FileDescriptorProto {
    FileDescriptorProto {
        name: Some("test.proto".to_owned()),
        message_type,
        ..Default::default()
    }
}

fn field(name: &str, number: i32, label: Label, ty: Type) -> FieldDescriptorProto {
    FieldDescriptorProto {
        name: Some(name.to_owned()),
        number: Some(number),
        label: Some(label as i32),
        r#type: Some(ty as i32),
        ..Default::default()
    }
}

fn named_field(
    name: &str,
    number: i32,
    label: Label,
    ty: Type,
    type_name: &str,
) -> FieldDescriptorProto {
    FieldDescriptorProto {
        type_name: Some(type_name.to_owned()),
        ..field(name, number, label, ty)
    }
}

#[test]
fn simple_message() {
    assert_eq!(
        compile_one("message TestMessage {\n  required int32 foo = 1;\n}\n"),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![field("foo", 1, Label::Required, Type::Int32)],
            ..Default::default()
        }]),
    );
}

#[test]
fn simple_fields() {
    assert_eq!(
        compile_one(
            "message TestMessage {\n\
             \x20 required int32 foo = 15;\n\
             \x20 optional int32 bar = 34;\n\
             \x20 repeated int32 baz = 3;\n\
             }\n",
        ),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![
                field("foo", 15, Label::Required, Type::Int32),
                field("bar", 34, Label::Optional, Type::Int32),
                field("baz", 3, Label::Repeated, Type::Int32),
            ],
            ..Default::default()
        }]),
    );
}

#[test]
fn primitive_field_types() {
    let types = [
        ("double", Type::Double),
        ("float", Type::Float),
        ("int32", Type::Int32),
        ("int64", Type::Int64),
        ("uint32", Type::Uint32),
        ("uint64", Type::Uint64),
        ("sint32", Type::Sint32),
        ("sint64", Type::Sint64),
        ("fixed32", Type::Fixed32),
        ("fixed64", Type::Fixed64),
        ("sfixed32", Type::Sfixed32),
        ("sfixed64", Type::Sfixed64),
        ("bool", Type::Bool),
        ("string", Type::String),
        ("bytes", Type::Bytes),
    ];

    let mut source = String::from("message TestMessage {\n");
    for (name, _) in &types {
        source += &format!("  required {} foo = 1;\n", name);
    }
    source += "}\n";

    let file = compile_one(Box::leak(source.into_boxed_str()));
    let expected: Vec<FieldDescriptorProto> = types
        .iter()
        .map(|&(_, ty)| field("foo", 1, Label::Required, ty))
        .collect();
    assert_eq!(file.message_type[0].field, expected);
}

#[test]
fn field_defaults() {
    let file = compile_one(
        "message TestMessage {\n\
         \x20 required int32  foo = 1 [default=  1  ];\n\
         \x20 required int32  foo = 1 [default= -2  ];\n\
         \x20 required float  foo = 1 [default=  7.5];\n\
         \x20 required double foo = 1 [default=  inf];\n\
         \x20 required double foo = 1 [default= -inf];\n\
         \x20 required double foo = 1 [default=  nan];\n\
         \x20 required bool   foo = 1 [default= true];\n\
         \x20 required string foo = 1 [default= \"blah\"];\n\
         \x20 required Foo    foo = 1 [default= FOO  ];\n\
         \x20 required int32  foo = 1 [default= 0x7FFFFFFF];\n\
         \x20 required uint64 foo = 1 [default= 0xFFFFFFFFFFFFFFFF];\n\
         }\n\
         enum Foo { UNKNOWN = 0; FOO = 1; }\n",
    );

    let defaults: Vec<&str> = file.message_type[0]
        .field
        .iter()
        .map(|f| f.default_value())
        .collect();
    assert_eq!(
        defaults,
        vec![
            "1",
            "-2",
            "7.5",
            "inf",
            "-inf",
            "nan",
            "true",
            "blah",
            "FOO",
            "0x7FFFFFFF",
            "0xFFFFFFFFFFFFFFFF",
        ],
    );

    let enum_field = &file.message_type[0].field[8];
    assert_eq!(enum_field.r#type, Some(Type::Enum as i32));
    assert_eq!(enum_field.type_name(), ".Foo");

    assert_eq!(
        file.enum_type,
        vec![EnumDescriptorProto {
            name: Some("Foo".to_owned()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("UNKNOWN".to_owned()),
                    number: Some(0),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("FOO".to_owned()),
                    number: Some(1),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
    );
}

#[test]
fn nested_message() {
    assert_eq!(
        compile_one(
            "message TestMessage {\n  message Nested {}\n  optional Nested test_nested = 1;\n}\n",
        ),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![named_field(
                "test_nested",
                1,
                Label::Optional,
                Type::Message,
                ".TestMessage.Nested",
            )],
            nested_type: vec![DescriptorProto {
                name: Some("Nested".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        }]),
    );
}

#[test]
fn nested_enum() {
    assert_eq!(
        compile_one(
            "message TestMessage {\n  enum NestedEnum {}\n  optional NestedEnum test_enum = 1;\n}\n",
        ),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![named_field(
                "test_enum",
                1,
                Label::Optional,
                Type::Enum,
                ".TestMessage.NestedEnum",
            )],
            enum_type: vec![EnumDescriptorProto {
                name: Some("NestedEnum".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        }]),
    );
}

#[test]
fn leading_dot_reference() {
    let file = compile_one(
        "message TestMessage {\n  message Nested {}\n  optional .TestMessage.Nested n = 1;\n}\n",
    );
    assert_eq!(
        file.message_type[0].field[0].type_name(),
        ".TestMessage.Nested",
    );
}

#[test]
fn groups() {
    assert_eq!(
        compile_one("message TestMessage {\n  optional group TestGroup = 1 {};\n}\n"),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![named_field(
                "testgroup",
                1,
                Label::Optional,
                Type::Group,
                ".TestMessage.TestGroup",
            )],
            nested_type: vec![DescriptorProto {
                name: Some("TestGroup".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        }]),
    );
}

#[test]
fn extension_ranges() {
    assert_eq!(
        compile_one("message TestMessage {\n  extensions 10 to 19;\n  extensions 30 to max;\n}\n"),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            extension_range: vec![
                ExtensionRange {
                    start: Some(10),
                    end: Some(20),
                    ..Default::default()
                },
                ExtensionRange {
                    start: Some(30),
                    end: Some(536_870_912),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }]),
    );
}

#[test]
fn compound_extension_ranges() {
    let file = compile_one("message TestMessage {\n  extensions 2, 15, 9 to 11, 100 to max, 3;\n}\n");
    let ranges: Vec<(i32, i32)> = file.message_type[0]
        .extension_range
        .iter()
        .map(|r| (r.start(), r.end()))
        .collect();
    assert_eq!(
        ranges,
        vec![(2, 3), (15, 16), (9, 12), (100, 536_870_912), (3, 4)],
    );
}

#[test]
fn map_fields() {
    assert_eq!(
        compile_one("message TestMessage {\n  map<int32, string> m = 1;\n}\n"),
        message_file(vec![DescriptorProto {
            name: Some("TestMessage".to_owned()),
            field: vec![named_field(
                "m",
                1,
                Label::Repeated,
                Type::Message,
                ".TestMessage.MEntry",
            )],
            nested_type: vec![DescriptorProto {
                name: Some("MEntry".to_owned()),
                field: vec![
                    field("key", 1, Label::Optional, Type::Int32),
                    field("value", 2, Label::Optional, Type::String),
                ],
                options: Some(MessageOptions {
                    map_entry: Some(true),
                    ..Default::default()
                }),
                ..Default::default()
            }],
            ..Default::default()
        }]),
    );
}

#[test]
fn map_entries_follow_declared_nested_types() {
    let file = compile_one(
        "message TestMessage {\n\
         \x20 message Nested {}\n\
         \x20 map<string, Nested> primitive_type_map = 1;\n\
         \x20 message Later {}\n\
         }\n",
    );

    let nested_names: Vec<&str> = file.message_type[0]
        .nested_type
        .iter()
        .map(|m| m.name())
        .collect();
    // The synthetic entry comes after every author-declared nested message.
    assert_eq!(nested_names, vec!["Nested", "Later", "PrimitiveTypeMapEntry"]);

    let entry = &file.message_type[0].nested_type[2];
    assert_eq!(
        entry.field[1],
        named_field("value", 2, Label::Optional, Type::Message, ".TestMessage.Nested"),
    );
    assert_eq!(
        file.message_type[0].field[0].type_name(),
        ".TestMessage.PrimitiveTypeMapEntry",
    );
}

#[test]
fn proto3_syntax() {
    let file = compile_one(
        "syntax = \"proto3\";\n\
         message TestMessage {\n\
         \x20 int32 foo = 1;\n\
         \x20 optional int32 bar = 2;\n\
         }\n",
    );
    assert_eq!(file.syntax(), "proto3");
    assert_eq!(
        file.message_type[0].field,
        vec![
            field("foo", 1, Label::Optional, Type::Int32),
            field("bar", 2, Label::Optional, Type::Int32),
        ],
    );

    // proto2 is the absent default.
    let file = compile_one("syntax = \"proto2\";\nmessage M {}\n");
    assert_eq!(file.syntax, None);
}

#[test]
fn enum_values() {
    let file = compile_one("enum TestEnum {\n  FOO = 13;\n  BAR = -10;\n  BAZ = 500;\n}\n");
    assert_eq!(
        file.enum_type,
        vec![EnumDescriptorProto {
            name: Some("TestEnum".to_owned()),
            value: vec![
                EnumValueDescriptorProto {
                    name: Some("FOO".to_owned()),
                    number: Some(13),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("BAR".to_owned()),
                    number: Some(-10),
                    ..Default::default()
                },
                EnumValueDescriptorProto {
                    name: Some("BAZ".to_owned()),
                    number: Some(500),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }],
    );
}

#[test]
fn simple_service() {
    let file = compile_one(
        "service TestService {\n  rpc Foo(In) returns (Out);\n}\nmessage In {}\nmessage Out {}\n",
    );
    assert_eq!(
        file.service,
        vec![ServiceDescriptorProto {
            name: Some("TestService".to_owned()),
            method: vec![MethodDescriptorProto {
                name: Some("Foo".to_owned()),
                input_type: Some(".In".to_owned()),
                output_type: Some(".Out".to_owned()),
                ..Default::default()
            }],
            ..Default::default()
        }],
    );
}

#[test]
fn packages() {
    assert_eq!(compile_one("package foo.bar.baz;\n").package(), "foo.bar.baz");
    assert_eq!(
        compile_one("package foo   .   bar.  \n  baz;\n").package(),
        "foo.bar.baz",
    );
    assert_eq!(compile_one("").package, None);
}

#[test]
fn public_imports() {
    let set = compile_files(&[
        ("foo.proto", ""),
        ("bar.proto", ""),
        ("baz.proto", ""),
        ("qux.proto", ""),
        (
            "test.proto",
            "import \"foo.proto\";\n\
             import public \"bar.proto\";\n\
             import \"baz.proto\";\n\
             import public \"qux.proto\";\n",
        ),
    ]);

    let root = set.file.last().unwrap();
    assert_eq!(
        root.dependency,
        vec!["foo.proto", "bar.proto", "baz.proto", "qux.proto"],
    );
    assert_eq!(root.public_dependency, vec![1, 3]);
}

#[test]
fn file_options() {
    let file = compile_one(
        "option java_package = \"com.google.foo\";\noption optimize_for = CODE_SIZE;\n",
    );
    assert_eq!(
        file.options,
        Some(FileOptions {
            uninterpreted_option: vec![
                UninterpretedOption {
                    name: vec![NamePart {
                        name_part: "java_package".to_owned(),
                        is_extension: false,
                    }],
                    string_value: Some(b"com.google.foo".to_vec()),
                    ..Default::default()
                },
                UninterpretedOption {
                    name: vec![NamePart {
                        name_part: "optimize_for".to_owned(),
                        is_extension: false,
                    }],
                    identifier_value: Some("CODE_SIZE".to_owned()),
                    ..Default::default()
                },
            ],
            ..Default::default()
        }),
    );
}

#[test]
fn dotted_file_option_names() {
    let file = compile_one("option a.b.c = 1;\n");
    let option = &file.options.as_ref().unwrap().uninterpreted_option[0];
    let parts: Vec<&str> = option.name.iter().map(|p| p.name_part.as_str()).collect();
    assert_eq!(parts, vec!["a", "b", "c"]);
    assert_eq!(option.identifier_value(), "1");
}

#[test]
fn packed_fields() {
    let file = compile_one("message M {\n  repeated int32 a = 1 [packed = true];\n}\n");
    assert_eq!(
        file.message_type[0].field[0].options,
        Some(FieldOptions {
            packed: Some(true),
            ..Default::default()
        }),
    );
}

#[test]
fn oneofs() {
    let file = compile_one(
        "message M {\n\
         \x20 oneof choice {\n\
         \x20   int32 a = 1;\n\
         \x20   string b = 2;\n\
         \x20 }\n\
         \x20 oneof other { bool c = 3; }\n\
         }\n",
    );

    assert_eq!(
        file.message_type[0].oneof_decl,
        vec![
            OneofDescriptorProto {
                name: Some("choice".to_owned()),
                ..Default::default()
            },
            OneofDescriptorProto {
                name: Some("other".to_owned()),
                ..Default::default()
            },
        ],
    );
    let indexes: Vec<Option<i32>> = file.message_type[0]
        .field
        .iter()
        .map(|f| f.oneof_index)
        .collect();
    assert_eq!(indexes, vec![Some(0), Some(0), Some(1)]);
}

#[test]
fn extensions() {
    let set = compile_files(&[(
        "test.proto",
        "message Extendee { extensions 100 to 200; }\n\
         extend Extendee { optional int32 top = 150; }\n\
         message Holder {\n\
         \x20 extend Extendee { optional string nested = 101; }\n\
         }\n",
    )]);
    let file = &set.file[0];

    assert_eq!(
        file.extension,
        vec![FieldDescriptorProto {
            extendee: Some(".Extendee".to_owned()),
            ..field("top", 150, Label::Optional, Type::Int32)
        }],
    );

    let holder = &file.message_type[1];
    assert_eq!(holder.name(), "Holder");
    assert_eq!(
        holder.extension,
        vec![FieldDescriptorProto {
            extendee: Some(".Extendee".to_owned()),
            ..field("nested", 101, Label::Optional, Type::String)
        }],
    );
}

#[test]
fn cross_file_references() {
    let set = compile_files(&[
        (
            "dep.proto",
            "package pkg;\nmessage Dep { message Inner {} }\n",
        ),
        (
            "test.proto",
            "import \"dep.proto\";\n\
             message Root {\n\
             \x20 optional pkg.Dep dep = 1;\n\
             \x20 optional pkg.Dep.Inner inner = 2;\n\
             }\n",
        ),
    ]);

    assert_eq!(set.file[0].name(), "dep.proto");
    assert_eq!(set.file[1].name(), "test.proto");
    assert_eq!(set.file[1].dependency, vec!["dep.proto"]);

    let fields = &set.file[1].message_type[0].field;
    assert_eq!(fields[0].type_name(), ".pkg.Dep");
    assert_eq!(fields[0].r#type, Some(Type::Message as i32));
    assert_eq!(fields[1].type_name(), ".pkg.Dep.Inner");
}

#[test]
fn transitive_imports_are_included_once() {
    let set = compile_files(&[
        ("shared.proto", "message Shared {}\n"),
        ("a.proto", "import \"shared.proto\";\n"),
        ("b.proto", "import \"shared.proto\";\n"),
        (
            "test.proto",
            "import \"a.proto\";\nimport \"b.proto\";\n",
        ),
    ]);
    let names: Vec<&str> = set.file.iter().map(|f| f.name()).collect();
    assert_eq!(
        names,
        vec!["shared.proto", "a.proto", "b.proto", "test.proto"],
    );
}

#[test]
fn unresolved_type_error() {
    let err = try_compile(&[(
        "test.proto",
        "message Foo {\n  optional NotFound foo = 1;\n}\n",
    )])
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "test.proto: failed to resolve name 'NotFound'",
    );
}

#[test]
fn import_cycle_error() {
    let err = try_compile(&[
        ("dep.proto", "import \"test.proto\";\n"),
        ("test.proto", "import \"dep.proto\";\n"),
    ])
    .unwrap_err();
    assert_eq!(
        err.to_string(),
        "import cycle detected: test.proto -> dep.proto -> test.proto",
    );
}

#[test]
fn import_not_found_error() {
    let err = try_compile(&[("test.proto", "import \"missing.proto\";\n")]).unwrap_err();
    assert!(err.is_file_not_found());
    assert_eq!(err.to_string(), "file not found: missing.proto");
}

#[test]
fn parse_error_format() {
    let err = try_compile(&[("test.proto", "message Foo {\n  banana\n}\n")]).unwrap_err();
    assert!(err.is_parse());
    let rendered = format!("{:?}", err);
    assert!(rendered.contains("test.proto:3:1"), "got: {}", rendered);
}
