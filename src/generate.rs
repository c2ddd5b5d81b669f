//! Lowering of the resolved AST into `FileDescriptorSet` values.
//!
//! The generator only reads the AST. Any unresolved reference encountered
//! here indicates a bug in the earlier stages and is reported as an internal
//! error rather than silently skipped.

use prost_types::{
    descriptor_proto, field_descriptor_proto, uninterpreted_option, DescriptorProto,
    EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto, FieldOptions,
    FileDescriptorProto, FileDescriptorSet, FileOptions, MessageOptions, MethodDescriptorProto,
    OneofDescriptorProto, ServiceDescriptorProto, UninterpretedOption,
};

use crate::{
    ast::{self, ExtensionId, FieldType, Label, MessageId, NamedType, ScalarType, Syntax},
    error::Error,
};

pub(crate) fn generate_file_set(set: &ast::FileSet) -> Result<FileDescriptorSet, Error> {
    let mut file = Vec::new();
    for f in set.files() {
        file.push(generate_file(set, f)?);
    }
    Ok(FileDescriptorSet { file })
}

fn generate_file(set: &ast::FileSet, file: &ast::File) -> Result<FileDescriptorProto, Error> {
    let mut fdp = FileDescriptorProto {
        name: maybe_string(file.name.clone()),
        package: maybe_string(file.package.join(".")),
        dependency: file.imports.clone(),
        ..Default::default()
    };

    fdp.public_dependency = file.public_imports.iter().map(|&i| i as i32).collect();
    fdp.public_dependency.sort_unstable();

    for &message in &file.messages {
        fdp.message_type.push(generate_message(set, message)?);
    }
    for &enum_ in &file.enums {
        fdp.enum_type.push(generate_enum(set.enum_(enum_)));
    }
    for &service in &file.services {
        fdp.service.push(generate_service(set, service)?);
    }
    for &extension in &file.extensions {
        fdp.extension.extend(generate_extension(set, extension)?);
    }

    if !file.options.is_empty() {
        let mut options = FileOptions::default();
        for option in &file.options {
            options.uninterpreted_option.push(generate_option(option));
        }
        fdp.options = Some(options);
    }

    // "proto2" is the default and is left absent.
    if file.syntax == Syntax::Proto3 {
        fdp.syntax = Some("proto3".to_owned());
    }

    Ok(fdp)
}

/// File-level options are not interpreted; each becomes an
/// `uninterpreted_option` entry with one name part per dotted segment.
fn generate_option(option: &ast::FileOption) -> UninterpretedOption {
    let mut uo = UninterpretedOption::default();
    for part in option.name.split('.') {
        uo.name.push(uninterpreted_option::NamePart {
            name_part: part.to_owned(),
            is_extension: false,
        });
    }
    match &option.value {
        ast::OptionValue::String(value) => uo.string_value = Some(value.clone().into_bytes()),
        ast::OptionValue::Ident(value) => uo.identifier_value = Some(value.clone()),
    }
    uo
}

fn generate_message(set: &ast::FileSet, id: MessageId) -> Result<DescriptorProto, Error> {
    let message = set.message(id);
    let mut dp = DescriptorProto {
        name: Some(message.name.clone()),
        ..Default::default()
    };

    let mut map_entries = Vec::new();
    for field in &message.fields {
        let (fdp, entry) = generate_field(set, Some(id), field, None)?;
        dp.field.push(fdp);
        map_entries.extend(entry);
    }

    for &extension in &message.extensions {
        dp.extension.extend(generate_extension(set, extension)?);
    }
    for &nested in &message.messages {
        dp.nested_type.push(generate_message(set, nested)?);
    }
    // Synthetic map entries go after all author-declared nested messages so
    // they don't disturb author indexes.
    dp.nested_type.append(&mut map_entries);

    for &enum_ in &message.enums {
        dp.enum_type.push(generate_enum(set.enum_(enum_)));
    }

    for &(start, end) in &message.extension_ranges {
        // The descriptor uses half-open intervals.
        dp.extension_range.push(descriptor_proto::ExtensionRange {
            start: Some(start),
            end: Some(end + 1),
            ..Default::default()
        });
    }

    for oneof in &message.oneofs {
        dp.oneof_decl.push(OneofDescriptorProto {
            name: Some(oneof.name.clone()),
            ..Default::default()
        });
    }

    Ok(dp)
}

fn generate_field(
    set: &ast::FileSet,
    parent: Option<MessageId>,
    field: &ast::Field,
    extendee: Option<&str>,
) -> Result<(FieldDescriptorProto, Option<DescriptorProto>), Error> {
    use field_descriptor_proto::{Label as PbLabel, Type};

    let mut fdp = FieldDescriptorProto {
        name: Some(field.name.clone()),
        number: Some(field.tag),
        ..Default::default()
    };
    fdp.label = Some(match field.label {
        Label::Required => PbLabel::Required,
        Label::Repeated => PbLabel::Repeated,
        Label::Optional => PbLabel::Optional,
    } as i32);

    if let Some(key_ty) = field.key_ty {
        let parent = parent.ok_or_else(|| Error::internal("map field outside of a message"))?;
        let entry = generate_map_entry(set, field, key_ty)?;
        fdp.r#type = Some(Type::Message as i32);
        fdp.type_name = Some(format!(
            "{}.{}",
            set.qualified_name(NamedType::Message(parent)),
            entry.name(),
        ));
        return Ok((fdp, Some(entry)));
    }

    match field.ty {
        Some(FieldType::Scalar(scalar)) => {
            fdp.r#type = Some(scalar_type(scalar) as i32);
        }
        Some(FieldType::Message(message)) => {
            if set.message(message).group {
                fdp.r#type = Some(Type::Group as i32);
                // The field name of a group is lowercased, matching protoc.
                fdp.name = Some(field.name.to_ascii_lowercase());
            } else {
                fdp.r#type = Some(Type::Message as i32);
            }
            fdp.type_name = Some(set.qualified_name(NamedType::Message(message)));
        }
        Some(FieldType::Enum(enum_)) => {
            fdp.r#type = Some(Type::Enum as i32);
            fdp.type_name = Some(set.qualified_name(NamedType::Enum(enum_)));
        }
        None => {
            return Err(Error::internal(format!(
                "field '{}' reached the generator unresolved",
                field.name,
            )))
        }
    }

    if let Some(extendee) = extendee {
        fdp.extendee = Some(extendee.to_owned());
    }
    if let Some(default) = &field.default {
        fdp.default_value = Some(default.clone());
    }
    if let Some(packed) = field.packed {
        fdp.options = Some(FieldOptions {
            packed: Some(packed),
            ..Default::default()
        });
    }
    if let Some(oneof) = field.oneof {
        fdp.oneof_index = Some(oneof as i32);
    }

    Ok((fdp, None))
}

/// Synthesizes the `<PascalCaseFieldName>Entry` nested message for a map
/// field, with `key` at tag 1 and `value` at tag 2.
fn generate_map_entry(
    set: &ast::FileSet,
    field: &ast::Field,
    key_ty: ScalarType,
) -> Result<DescriptorProto, Error> {
    use field_descriptor_proto::{Label as PbLabel, Type};

    let mut key = FieldDescriptorProto {
        name: Some("key".to_owned()),
        number: Some(1),
        label: Some(PbLabel::Optional as i32),
        ..Default::default()
    };
    key.r#type = Some(scalar_type(key_ty) as i32);

    let mut value = FieldDescriptorProto {
        name: Some("value".to_owned()),
        number: Some(2),
        label: Some(PbLabel::Optional as i32),
        ..Default::default()
    };
    match field.ty {
        Some(FieldType::Scalar(scalar)) => {
            value.r#type = Some(scalar_type(scalar) as i32);
        }
        Some(FieldType::Message(message)) => {
            value.r#type = Some(Type::Message as i32);
            value.type_name = Some(set.qualified_name(NamedType::Message(message)));
        }
        Some(FieldType::Enum(enum_)) => {
            value.r#type = Some(Type::Enum as i32);
            value.type_name = Some(set.qualified_name(NamedType::Enum(enum_)));
        }
        None => {
            return Err(Error::internal(format!(
                "map field '{}' reached the generator unresolved",
                field.name,
            )))
        }
    }

    Ok(DescriptorProto {
        name: Some(map_entry_name(&field.name)),
        field: vec![key, value],
        options: Some(MessageOptions {
            map_entry: Some(true),
            ..Default::default()
        }),
        ..Default::default()
    })
}

fn generate_enum(enum_: &ast::Enum) -> EnumDescriptorProto {
    EnumDescriptorProto {
        name: Some(enum_.name.clone()),
        value: enum_
            .values
            .iter()
            .map(|value| EnumValueDescriptorProto {
                name: Some(value.name.clone()),
                number: Some(value.number),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

fn generate_service(
    set: &ast::FileSet,
    id: ast::ServiceId,
) -> Result<ServiceDescriptorProto, Error> {
    let service = set.service(id);
    let mut sdp = ServiceDescriptorProto {
        name: Some(service.name.clone()),
        ..Default::default()
    };

    for method in &service.methods {
        let in_ty = method.in_ty.ok_or_else(|| {
            Error::internal(format!("method '{}' reached the generator unresolved", method.name))
        })?;
        let out_ty = method.out_ty.ok_or_else(|| {
            Error::internal(format!("method '{}' reached the generator unresolved", method.name))
        })?;
        sdp.method.push(MethodDescriptorProto {
            name: Some(method.name.clone()),
            input_type: Some(set.qualified_name(in_ty)),
            output_type: Some(set.qualified_name(out_ty)),
            ..Default::default()
        });
    }

    Ok(sdp)
}

fn generate_extension(
    set: &ast::FileSet,
    id: ExtensionId,
) -> Result<Vec<FieldDescriptorProto>, Error> {
    let extension = set.extension(id);
    let extendee_type = extension
        .extendee_type
        .ok_or_else(|| Error::internal("extension reached the generator unresolved"))?;
    let extendee = set.qualified_name(NamedType::Message(extendee_type));

    let mut fields = Vec::new();
    for field in &extension.fields {
        let (fdp, _) = generate_field(set, None, field, Some(&extendee))?;
        fields.push(fdp);
    }
    Ok(fields)
}

fn scalar_type(scalar: ScalarType) -> field_descriptor_proto::Type {
    use field_descriptor_proto::Type;

    match scalar {
        ScalarType::Double => Type::Double,
        ScalarType::Float => Type::Float,
        ScalarType::Int32 => Type::Int32,
        ScalarType::Int64 => Type::Int64,
        ScalarType::Uint32 => Type::Uint32,
        ScalarType::Uint64 => Type::Uint64,
        ScalarType::Sint32 => Type::Sint32,
        ScalarType::Sint64 => Type::Sint64,
        ScalarType::Fixed32 => Type::Fixed32,
        ScalarType::Fixed64 => Type::Fixed64,
        ScalarType::Sfixed32 => Type::Sfixed32,
        ScalarType::Sfixed64 => Type::Sfixed64,
        ScalarType::Bool => Type::Bool,
        ScalarType::String => Type::String,
        ScalarType::Bytes => Type::Bytes,
    }
}

fn maybe_string(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

/// Derives the synthetic nested message name for a map field: `foo_bar`
/// becomes `FooBarEntry`.
fn map_entry_name(field_name: &str) -> String {
    let mut name = String::with_capacity(field_name.len() + 5);
    for part in field_name.split('_') {
        let mut chars = part.chars();
        if let Some(first) = chars.next() {
            name.push(first.to_ascii_uppercase());
            name.extend(chars);
        }
    }
    name.push_str("Entry");
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_entry_names() {
        assert_eq!(map_entry_name("m"), "MEntry");
        assert_eq!(map_entry_name("foo_bar"), "FooBarEntry");
        assert_eq!(map_entry_name("primitive_type_map"), "PrimitiveTypeMapEntry");
        assert_eq!(map_entry_name("already_Cased"), "AlreadyCasedEntry");
    }
}
