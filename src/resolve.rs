//! Symbol resolution: links textual type references to the AST nodes they
//! name.
//!
//! Resolution runs once after all files are loaded. A traversal keeps a stack
//! of enclosing scopes; a reference `A.B.C` is tried against each scope from
//! innermost to outermost, and the first scope in which the whole component
//! chain matches wins. A leading dot forces lookup to start at the root.

use tracing::debug;

use crate::{
    ast::{self, EnumId, ExtensionId, FieldType, FileId, MessageId, NamedType, ScalarType},
    error::{Error, ErrorKind},
};

pub(crate) fn resolve_file_set(set: &mut ast::FileSet) -> Result<(), Error> {
    let files: Vec<FileId> = set.file_ids().collect();
    for file in files {
        resolve_file(set, file)?;
    }
    Ok(())
}

/// One element of the scope stack during traversal and lookup.
///
/// Enums cannot enclose further declarations, but an enum may be the final
/// element of a resolved chain.
#[derive(Debug, Clone, Copy)]
enum ScopeElem {
    Root,
    File(FileId),
    Message(MessageId),
    Enum(EnumId),
}

fn resolve_file(set: &mut ast::FileSet, file: FileId) -> Result<(), Error> {
    let scope = vec![ScopeElem::Root, ScopeElem::File(file)];

    for message in set.file(file).messages.clone() {
        resolve_message(set, file, &scope, message)?;
    }
    for extension in set.file(file).extensions.clone() {
        resolve_extension(set, file, &scope, extension)?;
    }
    for service in set.file(file).services.clone() {
        resolve_service(set, file, &scope, service)?;
    }
    Ok(())
}

fn resolve_message(
    set: &mut ast::FileSet,
    file: FileId,
    scope: &[ScopeElem],
    message: MessageId,
) -> Result<(), Error> {
    let mut scope = scope.to_vec();
    scope.push(ScopeElem::Message(message));

    for index in 0..set.message(message).fields.len() {
        resolve_field(set, file, &scope, message, index)?;
    }
    for nested in set.message(message).messages.clone() {
        resolve_message(set, file, &scope, nested)?;
    }
    for extension in set.message(message).extensions.clone() {
        resolve_extension(set, file, &scope, extension)?;
    }
    Ok(())
}

fn resolve_field(
    set: &mut ast::FileSet,
    file: FileId,
    scope: &[ScopeElem],
    message: MessageId,
    index: usize,
) -> Result<(), Error> {
    // Group fields already point at their synthetic message.
    if set.message(message).fields[index].ty.is_none() {
        let type_name = set.message(message).fields[index].type_name.clone();
        let ty = resolve_field_type(set, scope, &type_name)
            .ok_or_else(|| unresolved_name(set, file, &type_name))?;
        set.message_mut(message).fields[index].ty = Some(ty);
    }

    if let Some(key_type_name) = set.message(message).fields[index].key_type_name.clone() {
        let key_ty = ScalarType::from_name(&key_type_name)
            .filter(|ty| ty.is_valid_map_key())
            .ok_or_else(|| {
                Error::from_kind(ErrorKind::InvalidMapKeyType {
                    file: set.file(file).name.clone(),
                    name: key_type_name.clone(),
                })
            })?;
        set.message_mut(message).fields[index].key_ty = Some(key_ty);
    }

    Ok(())
}

fn resolve_extension(
    set: &mut ast::FileSet,
    file: FileId,
    scope: &[ScopeElem],
    extension: ExtensionId,
) -> Result<(), Error> {
    let extendee = set.extension(extension).extendee.clone();
    match resolve_name(set, scope, &extendee) {
        Some(NamedType::Message(message)) => {
            set.extension_mut(extension).extendee_type = Some(message);
        }
        Some(NamedType::Enum(_)) => {
            return Err(Error::from_kind(ErrorKind::ExtendeeNotMessage {
                file: set.file(file).name.clone(),
                name: extendee,
            }))
        }
        None => return Err(unresolved_name(set, file, &extendee)),
    }

    for index in 0..set.extension(extension).fields.len() {
        if set.extension(extension).fields[index].ty.is_some() {
            continue;
        }
        let type_name = set.extension(extension).fields[index].type_name.clone();
        let ty = resolve_field_type(set, scope, &type_name)
            .ok_or_else(|| unresolved_name(set, file, &type_name))?;
        set.extension_mut(extension).fields[index].ty = Some(ty);
    }

    Ok(())
}

fn resolve_service(
    set: &mut ast::FileSet,
    file: FileId,
    scope: &[ScopeElem],
    service: ast::ServiceId,
) -> Result<(), Error> {
    for index in 0..set.service(service).methods.len() {
        let in_type_name = set.service(service).methods[index].in_type_name.clone();
        let in_ty = resolve_name(set, scope, &in_type_name)
            .ok_or_else(|| unresolved_name(set, file, &in_type_name))?;
        set.service_mut(service).methods[index].in_ty = Some(in_ty);

        let out_type_name = set.service(service).methods[index].out_type_name.clone();
        let out_ty = resolve_name(set, scope, &out_type_name)
            .ok_or_else(|| unresolved_name(set, file, &out_type_name))?;
        set.service_mut(service).methods[index].out_ty = Some(out_ty);
    }
    Ok(())
}

fn unresolved_name(set: &ast::FileSet, file: FileId, name: &str) -> Error {
    Error::from_kind(ErrorKind::UnresolvedName {
        file: set.file(file).name.clone(),
        name: name.to_owned(),
    })
}

fn resolve_field_type(set: &ast::FileSet, scope: &[ScopeElem], name: &str) -> Option<FieldType> {
    if let Some(scalar) = ScalarType::from_name(name) {
        return Some(FieldType::Scalar(scalar));
    }
    match resolve_name(set, scope, name)? {
        NamedType::Message(message) => Some(FieldType::Message(message)),
        NamedType::Enum(enum_) => Some(FieldType::Enum(enum_)),
    }
}

/// Resolves a possibly dotted reference against the scope stack.
fn resolve_name(set: &ast::FileSet, scope: &[ScopeElem], name: &str) -> Option<NamedType> {
    let (text, mut working_scope) = match name.strip_prefix('.') {
        Some(rest) => (rest, vec![ScopeElem::Root]),
        None => (name, scope.to_vec()),
    };

    let parts: Vec<&str> = text.split('.').collect();
    if parts.iter().any(|part| part.is_empty()) {
        return None;
    }

    while !working_scope.is_empty() {
        if let Some(chain) = match_name_components(set, &working_scope, &parts) {
            if let Some(target) = as_named_type(chain.last()) {
                debug!(
                    name,
                    resolved = %set.qualified_name(target),
                    "resolved type name",
                );
                return Some(target);
            }
        }
        working_scope.pop();
    }

    None
}

/// Matches the components of a reference as a chain of immediate children
/// starting in `scope`, returning the extended scope on success.
fn match_name_components(
    set: &ast::FileSet,
    scope: &[ScopeElem],
    parts: &[&str],
) -> Option<Vec<ScopeElem>> {
    let (first, rest) = parts.split_first()?;

    for elem in find_name(set, scope, first) {
        let mut extended = scope.to_vec();
        extended.push(elem);
        if rest.is_empty() {
            return Some(extended);
        }
        if let Some(chain) = match_name_components(set, &extended, rest) {
            return Some(chain);
        }
    }

    None
}

/// Finds immediate children of the innermost scope element matching `name`.
///
/// At the root, a name may match the first component of a file's package, or
/// a top-level declaration of any file without a package.
fn find_name(set: &ast::FileSet, scope: &[ScopeElem], name: &str) -> Vec<ScopeElem> {
    match scope.last() {
        None => Vec::new(),
        Some(ScopeElem::Root) => {
            let mut found = Vec::new();
            for file in set.file_ids() {
                if set.file(file).package.is_empty() {
                    let mut file_scope = scope.to_vec();
                    file_scope.push(ScopeElem::File(file));
                    found.extend(find_name(set, &file_scope, name));
                } else if set.file(file).package[0] == name {
                    found.push(ScopeElem::File(file));
                }
            }
            found
        }
        Some(&ScopeElem::File(file)) => {
            let file = set.file(file);
            for &message in &file.messages {
                if set.message(message).name == name {
                    return vec![ScopeElem::Message(message)];
                }
            }
            for &enum_ in &file.enums {
                if set.enum_(enum_).name == name {
                    return vec![ScopeElem::Enum(enum_)];
                }
            }
            Vec::new()
        }
        Some(&ScopeElem::Message(message)) => {
            let message = set.message(message);
            for &nested in &message.messages {
                if set.message(nested).name == name {
                    return vec![ScopeElem::Message(nested)];
                }
            }
            for &enum_ in &message.enums {
                if set.enum_(enum_).name == name {
                    return vec![ScopeElem::Enum(enum_)];
                }
            }
            Vec::new()
        }
        Some(ScopeElem::Enum(_)) => Vec::new(),
    }
}

fn as_named_type(elem: Option<&ScopeElem>) -> Option<NamedType> {
    match elem {
        Some(&ScopeElem::Message(message)) => Some(NamedType::Message(message)),
        Some(&ScopeElem::Enum(enum_)) => Some(NamedType::Enum(enum_)),
        _ => None,
    }
}
