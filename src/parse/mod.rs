//! The recursive descent parser for `.proto` source files.
//!
//! A single pass over the token stream populates an [`ast::File`] and its
//! nodes inside the [`ast::FileSet`] arena. Type references are recorded as
//! raw text and linked later by the resolver; only group fields get their
//! type here, since the parser synthesizes the nested message itself.


use logos::{Logos, Span};

use crate::{
    ast::{self, FileId, Label, MessageId, Position, TypeScope},
    error::{ParseError, ParseErrorKind},
    lex::Token,
    MAX_FIELD_NUMBER,
};

const RESERVED_FIELD_NUMBERS: std::ops::RangeInclusive<i64> = 19000..=19999;

/// Parses one source buffer into a new [`ast::File`] in `set`.
pub(crate) fn parse_file(
    set: &mut ast::FileSet,
    name: &str,
    source: &str,
) -> Result<FileId, ParseError> {
    let file = set.alloc_file(ast::File::new(name, source));
    let mut parser = Parser::new(set, file, source);
    match parser.parse_file() {
        Ok(()) => Ok(file),
        Err(kind) => Err(ParseError::new(kind, name, source.to_owned())),
    }
}

struct Parser<'a, 's> {
    set: &'a mut ast::FileSet,
    file: FileId,
    lexer: logos::Lexer<'s, Token<'s>>,
    peeked: Option<Option<(Token<'s>, Span)>>,
    lines: LineIndex,
    comments: Vec<RawComment>,
    seen_syntax: bool,
}

struct RawComment {
    text: String,
    line: usize,
    offset: usize,
}

impl<'a, 's> Parser<'a, 's> {
    fn new(set: &'a mut ast::FileSet, file: FileId, source: &'s str) -> Self {
        Parser {
            set,
            file,
            lexer: Token::lexer(source),
            peeked: None,
            lines: LineIndex::new(source),
            comments: Vec::new(),
            seen_syntax: false,
        }
    }

    fn parse_file(&mut self) -> Result<(), ParseErrorKind> {
        while let Some((token, _)) = self.peek()? {
            match token {
                Token::Semicolon => {
                    self.bump();
                }
                Token::Word("syntax") => self.parse_syntax()?,
                Token::Word("package") => self.parse_package()?,
                Token::Word("import") => self.parse_import()?,
                Token::Word("option") => self.parse_file_option()?,
                Token::Word("message") => {
                    let message = self.parse_message(TypeScope::File(self.file))?;
                    self.set.file_mut(self.file).messages.push(message);
                }
                Token::Word("enum") => {
                    let enum_ = self.parse_enum(TypeScope::File(self.file))?;
                    self.set.file_mut(self.file).enums.push(enum_);
                }
                Token::Word("service") => {
                    let service = self.parse_service()?;
                    self.set.file_mut(self.file).services.push(service);
                }
                Token::Word("extend") => {
                    let extension = self.parse_extension(TypeScope::File(self.file))?;
                    self.set.file_mut(self.file).extensions.push(extension);
                }
                _ => {
                    return self.unexpected_token(
                        "'syntax', 'package', 'import', 'option', 'message', 'enum', \
                         'service' or 'extend'",
                    )
                }
            }
        }

        self.finish_comments();
        Ok(())
    }

    fn parse_syntax(&mut self) -> Result<(), ParseErrorKind> {
        let span = self.expect_keyword("syntax")?;
        if self.seen_syntax {
            return Err(ParseErrorKind::DuplicateSyntax { span });
        }

        self.expect_eq(Token::Equals)?;
        match self.peek()? {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                match value.as_ref() {
                    "proto2" => self.set.file_mut(self.file).syntax = ast::Syntax::Proto2,
                    "proto3" => self.set.file_mut(self.file).syntax = ast::Syntax::Proto3,
                    _ => {
                        return Err(ParseErrorKind::UnknownSyntax {
                            syntax: value.into_owned(),
                            span,
                        })
                    }
                }
            }
            _ => return self.unexpected_token("a quoted string"),
        }
        self.expect_eq(Token::Semicolon)?;
        self.seen_syntax = true;
        Ok(())
    }

    fn parse_package(&mut self) -> Result<(), ParseErrorKind> {
        let keyword_span = self.expect_keyword("package")?;
        if !self.set.file(self.file).package.is_empty() {
            return Err(ParseErrorKind::DuplicatePackage { span: keyword_span });
        }

        // Components may be split across several word tokens when whitespace
        // surrounds the dots, e.g. `package foo . bar;`.
        let mut package = String::new();
        let mut name_span = keyword_span;
        loop {
            match self.peek()? {
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    break;
                }
                Some((Token::Word(word), span)) => {
                    self.bump();
                    if word == "." {
                        if package.is_empty() || package.ends_with('.') {
                            return Err(ParseErrorKind::UnexpectedToken {
                                expected: "a package name".to_owned(),
                                found: word.to_owned(),
                                span,
                            });
                        }
                    } else if !package.is_empty() && !package.ends_with('.') {
                        return Err(ParseErrorKind::UnexpectedToken {
                            expected: "'.' or ';'".to_owned(),
                            found: word.to_owned(),
                            span,
                        });
                    }
                    package.push_str(word);
                    name_span = join_span(name_span, span);
                }
                _ => return self.unexpected_token("a package name, '.' or ';'"),
            }
        }

        if package.is_empty()
            || package.starts_with('.')
            || package.ends_with('.')
            || package.split('.').any(|part| !is_ident(part))
        {
            return Err(ParseErrorKind::InvalidPackageName { span: name_span });
        }

        self.set.file_mut(self.file).package =
            package.split('.').map(str::to_owned).collect();
        Ok(())
    }

    fn parse_import(&mut self) -> Result<(), ParseErrorKind> {
        self.expect_keyword("import")?;

        let public = match self.peek()? {
            Some((Token::Word("public"), _)) => {
                self.bump();
                true
            }
            _ => false,
        };

        let (value, _) = self.expect_string()?;
        self.expect_eq(Token::Semicolon)?;

        let file = self.set.file_mut(self.file);
        if public {
            file.public_imports.push(file.imports.len());
        }
        file.imports.push(value);
        Ok(())
    }

    fn parse_file_option(&mut self) -> Result<(), ParseErrorKind> {
        self.expect_keyword("option")?;

        let name = match self.peek()? {
            Some((Token::Word(word), _)) => {
                self.bump();
                word.to_owned()
            }
            _ => return self.unexpected_token("an option name"),
        };

        self.expect_eq(Token::Equals)?;

        let value = match self.peek()? {
            Some((Token::StringLiteral(value), _)) => {
                self.bump();
                ast::OptionValue::String(value.into_owned())
            }
            Some((Token::Word(word), _)) => {
                self.bump();
                ast::OptionValue::Ident(word.to_owned())
            }
            _ => return self.unexpected_token("an option value"),
        };

        self.expect_eq(Token::Semicolon)?;

        self.set
            .file_mut(self.file)
            .options
            .push(ast::FileOption { name, value });
        Ok(())
    }

    fn parse_message(&mut self, up: TypeScope) -> Result<MessageId, ParseErrorKind> {
        let span = self.expect_keyword("message")?;
        let position = self.position(&span);

        let (name, _) = self.expect_ident()?;
        self.expect_eq(Token::LeftBrace)?;

        let message = self.set.alloc_message(ast::Message::new(name, position, up));
        self.parse_message_contents(message)?;
        self.expect_eq(Token::RightBrace)?;

        Ok(message)
    }

    fn parse_message_contents(&mut self, message: MessageId) -> Result<(), ParseErrorKind> {
        // Set while inside a oneof; its `}` is consumed here rather than
        // ending the message.
        let mut oneof = None;

        loop {
            match self.peek()? {
                None => return Err(ParseErrorKind::UnexpectedEof {
                    expected: "'}'".to_owned(),
                }),
                Some((Token::RightBrace, _)) => {
                    if oneof.is_some() {
                        self.bump();
                        oneof = None;
                        continue;
                    }
                    return Ok(());
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Word("message"), _)) => {
                    let nested = self.parse_message(TypeScope::Message(message))?;
                    self.set.message_mut(message).messages.push(nested);
                }
                Some((Token::Word("enum"), _)) => {
                    let enum_ = self.parse_enum(TypeScope::Message(message))?;
                    self.set.message_mut(message).enums.push(enum_);
                }
                Some((Token::Word("extend"), _)) => {
                    let extension = self.parse_extension(TypeScope::Message(message))?;
                    self.set.message_mut(message).extensions.push(extension);
                }
                Some((Token::Word("extensions"), _)) => {
                    let ranges = self.parse_extension_ranges()?;
                    self.set
                        .message_mut(message)
                        .extension_ranges
                        .extend(ranges);
                }
                Some((Token::Word("oneof"), span)) => {
                    if oneof.is_some() {
                        return Err(ParseErrorKind::NestedOneof { span });
                    }
                    self.bump();
                    let position = self.position(&span);
                    let (name, _) = self.expect_ident()?;
                    self.expect_eq(Token::LeftBrace)?;

                    let oneofs = &mut self.set.message_mut(message).oneofs;
                    oneofs.push(ast::Oneof { name, position });
                    oneof = Some(oneofs.len() - 1);
                }
                Some(_) => {
                    let field = self.parse_field(Some(message), oneof)?;
                    self.set.message_mut(message).fields.push(field);
                }
            }
        }
    }

    /// Parses one field declaration. `parent` is the enclosing message, or
    /// `None` inside an `extend` block, where groups and maps are rejected.
    fn parse_field(
        &mut self,
        parent: Option<MessageId>,
        oneof: Option<usize>,
    ) -> Result<ast::Field, ParseErrorKind> {
        let first_span = match self.peek()? {
            Some((_, span)) => span,
            None => {
                return Err(ParseErrorKind::UnexpectedEof {
                    expected: "a field declaration".to_owned(),
                })
            }
        };

        let mut field = ast::Field::new(self.position(&first_span));
        field.oneof = oneof;

        let mut is_map = false;
        match self.peek()? {
            Some((Token::Word("required"), _)) => {
                self.bump();
                field.label = Label::Required;
            }
            Some((Token::Word("optional"), _)) => {
                self.bump();
            }
            Some((Token::Word("repeated"), _)) => {
                self.bump();
                field.label = Label::Repeated;
            }
            Some((Token::Word("map"), span)) => {
                self.bump();
                if parent.is_none() {
                    return Err(ParseErrorKind::InvalidExtendFieldKind { kind: "map", span });
                }
                self.expect_eq(Token::LeftAngleBracket)?;
                field.key_type_name = Some(self.expect_type_name()?);
                self.expect_eq(Token::Comma)?;
                field.type_name = self.expect_type_name()?;
                self.expect_eq(Token::RightAngleBracket)?;
                // Maps are repeated on the wire.
                field.label = Label::Repeated;
                is_map = true;
            }
            // No label: an apparent type name, proto3 style. The default
            // label is optional.
            _ => {}
        }

        if !is_map {
            field.type_name = self.expect_type_name()?;
        }

        let (name, name_span) = self.expect_ident()?;
        field.name = name;

        self.expect_eq(Token::Equals)?;
        let (tag, _) = self.parse_tag_number(false)?;
        field.tag = tag;

        if field.type_name == "group" {
            return self.parse_group_body(field, parent, name_span);
        }

        if let Some((Token::LeftBracket, _)) = self.peek()? {
            self.parse_field_options(&mut field)?;
        }

        self.expect_eq(Token::Semicolon)?;
        Ok(field)
    }

    /// Parses `{ contents }` of a group field, synthesizing the nested
    /// message. The field's descriptor name is lowercased later by the
    /// generator.
    fn parse_group_body(
        &mut self,
        mut field: ast::Field,
        parent: Option<MessageId>,
        name_span: Span,
    ) -> Result<ast::Field, ParseErrorKind> {
        let parent = match parent {
            Some(parent) => parent,
            None => {
                return Err(ParseErrorKind::InvalidExtendFieldKind {
                    kind: "group",
                    span: name_span,
                })
            }
        };

        // The name already passed the identifier check; groups additionally
        // must start with a capital letter.
        if !field.name.starts_with(|ch: char| ch.is_ascii_uppercase()) {
            return Err(ParseErrorKind::InvalidGroupName { span: name_span });
        }

        let brace_span = self.expect_eq(Token::LeftBrace)?;

        let mut group = ast::Message::new(
            field.name.clone(),
            self.position(&brace_span),
            TypeScope::Message(parent),
        );
        group.group = true;
        let group = self.set.alloc_message(group);

        self.parse_message_contents(group)?;
        self.expect_eq(Token::RightBrace)?;
        self.set.message_mut(parent).messages.push(group);

        field.type_name = field.name.clone();
        field.ty = Some(ast::FieldType::Message(group));

        // A semicolon after a group is optional.
        if let Some((Token::Semicolon, _)) = self.peek()? {
            self.bump();
        }
        Ok(field)
    }

    fn parse_field_options(&mut self, field: &mut ast::Field) -> Result<(), ParseErrorKind> {
        self.expect_eq(Token::LeftBracket)?;

        loop {
            match self.peek()? {
                Some((Token::Word("default"), _)) => {
                    self.bump();
                    self.expect_eq(Token::Equals)?;
                    match self.peek()? {
                        Some((Token::StringLiteral(value), span)) => {
                            self.bump();
                            // String fields store the unescaped content; any
                            // other type keeps the literal as written.
                            if field.type_name == "string" {
                                field.default = Some(value.into_owned());
                            } else {
                                field.default =
                                    Some(self.lexer.source()[span].to_owned());
                            }
                        }
                        Some((Token::Word(word), _)) => {
                            self.bump();
                            field.default = Some(word.to_owned());
                        }
                        _ => return self.unexpected_token("a default value"),
                    }
                }
                Some((Token::Word("packed"), _)) => {
                    self.bump();
                    self.expect_eq(Token::Equals)?;
                    field.packed = Some(self.expect_bool()?);
                }
                _ => return self.unexpected_token("'default' or 'packed'"),
            }

            match self.peek()? {
                Some((Token::Comma, _)) => {
                    self.bump();
                }
                Some((Token::RightBracket, _)) => {
                    self.bump();
                    return Ok(());
                }
                _ => return self.unexpected_token("',' or ']'"),
            }
        }
    }

    fn parse_extension_ranges(&mut self) -> Result<Vec<(i32, i32)>, ParseErrorKind> {
        self.expect_keyword("extensions")?;

        let mut ranges = Vec::new();
        loop {
            let (start, start_span) = self.parse_tag_number(false)?;
            let mut end = start;

            let mut separator = self.peek()?;
            if let Some((Token::Word("to"), _)) = separator {
                self.bump();
                let (range_end, end_span) = self.parse_tag_number(true)?;
                end = range_end;
                if start > end {
                    return Err(ParseErrorKind::InvalidExtensionRange {
                        span: join_span(start_span, end_span),
                    });
                }
                separator = self.peek()?;
            }

            ranges.push((start, end));

            match separator {
                Some((Token::Comma, _)) => {
                    self.bump();
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                    return Ok(ranges);
                }
                _ => return self.unexpected_token("',', ';' or 'to'"),
            }
        }
    }

    fn parse_tag_number(&mut self, allow_max: bool) -> Result<(i32, Span), ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word(word), span)) => {
                self.bump();
                if allow_max && word == "max" {
                    return Ok((MAX_FIELD_NUMBER, span));
                }
                let number: i64 = word
                    .parse()
                    .map_err(|_| ParseErrorKind::InvalidFieldNumber { span: span.clone() })?;
                if number < 1 || number > MAX_FIELD_NUMBER as i64 {
                    return Err(ParseErrorKind::InvalidFieldNumber { span });
                }
                if RESERVED_FIELD_NUMBERS.contains(&number) {
                    return Err(ParseErrorKind::ReservedFieldNumber { span });
                }
                Ok((number as i32, span))
            }
            _ => self.unexpected_token("a field number"),
        }
    }

    fn parse_enum(&mut self, up: TypeScope) -> Result<ast::EnumId, ParseErrorKind> {
        let span = self.expect_keyword("enum")?;
        let position = self.position(&span);

        let (name, _) = self.expect_ident()?;
        self.expect_eq(Token::LeftBrace)?;

        let enum_ = self.set.alloc_enum(ast::Enum::new(name, position, up));

        loop {
            match self.peek()? {
                None => {
                    return Err(ParseErrorKind::UnexpectedEof {
                        expected: "'}'".to_owned(),
                    })
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    return Ok(enum_);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Word(_), _)) => {
                    let (name, name_span) = self.expect_ident()?;
                    let position = self.position(&name_span);
                    self.expect_eq(Token::Equals)?;
                    let number = self.parse_enum_number()?;
                    self.expect_eq(Token::Semicolon)?;
                    self.set.enum_mut(enum_).values.push(ast::EnumValue {
                        name,
                        number,
                        position,
                    });
                }
                Some(_) => return self.unexpected_token("an enum value name or '}'"),
            }
        }
    }

    fn parse_enum_number(&mut self) -> Result<i32, ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word(word), span)) => {
                self.bump();
                word.parse()
                    .map_err(|_| ParseErrorKind::InvalidEnumNumber { span })
            }
            _ => self.unexpected_token("an enum value number"),
        }
    }

    fn parse_service(&mut self) -> Result<ast::ServiceId, ParseErrorKind> {
        let span = self.expect_keyword("service")?;
        let position = self.position(&span);

        let (name, _) = self.expect_ident()?;
        self.expect_eq(Token::LeftBrace)?;

        let service = self
            .set
            .alloc_service(ast::Service::new(name, position, self.file));

        loop {
            match self.peek()? {
                None => {
                    return Err(ParseErrorKind::UnexpectedEof {
                        expected: "'}'".to_owned(),
                    })
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    return Ok(service);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some((Token::Word("rpc"), rpc_span)) => {
                    self.bump();
                    let position = self.position(&rpc_span);
                    let (name, _) = self.expect_ident()?;

                    self.expect_eq(Token::LeftParen)?;
                    let in_type_name = self.expect_type_name()?;
                    self.expect_eq(Token::RightParen)?;
                    self.expect_keyword("returns")?;
                    self.expect_eq(Token::LeftParen)?;
                    let out_type_name = self.expect_type_name()?;
                    self.expect_eq(Token::RightParen)?;
                    self.expect_eq(Token::Semicolon)?;

                    self.set.service_mut(service).methods.push(ast::Method {
                        name,
                        position,
                        in_type_name,
                        out_type_name,
                        in_ty: None,
                        out_ty: None,
                    });
                }
                Some(_) => return self.unexpected_token("'rpc' or '}'"),
            }
        }
    }

    fn parse_extension(&mut self, up: TypeScope) -> Result<ast::ExtensionId, ParseErrorKind> {
        let span = self.expect_keyword("extend")?;
        let position = self.position(&span);

        let extendee = self.expect_type_name()?;
        self.expect_eq(Token::LeftBrace)?;

        let extension = self
            .set
            .alloc_extension(ast::Extension::new(position, extendee, up));

        loop {
            match self.peek()? {
                None => {
                    return Err(ParseErrorKind::UnexpectedEof {
                        expected: "'}'".to_owned(),
                    })
                }
                Some((Token::RightBrace, _)) => {
                    self.bump();
                    return Ok(extension);
                }
                Some((Token::Semicolon, _)) => {
                    self.bump();
                }
                Some(_) => {
                    let field = self.parse_field(None, None)?;
                    self.set.extension_mut(extension).fields.push(field);
                }
            }
        }
    }

    fn expect_keyword(&mut self, keyword: &'static str) -> Result<Span, ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word(word), span)) if word == keyword => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", keyword)),
        }
    }

    fn expect_eq(&mut self, token: Token<'s>) -> Result<Span, ParseErrorKind> {
        match self.peek()? {
            Some((found, span)) if found == token => {
                self.bump();
                Ok(span)
            }
            _ => self.unexpected_token(format!("'{}'", token)),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, Span), ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word(word), span)) => {
                if !is_ident(word) {
                    return Err(ParseErrorKind::InvalidIdentifier { span });
                }
                self.bump();
                Ok((word.to_owned(), span))
            }
            _ => self.unexpected_token("an identifier"),
        }
    }

    fn expect_type_name(&mut self) -> Result<String, ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word(word), _)) => {
                self.bump();
                Ok(word.to_owned())
            }
            _ => self.unexpected_token("a type name"),
        }
    }

    fn expect_string(&mut self) -> Result<(String, Span), ParseErrorKind> {
        match self.peek()? {
            Some((Token::StringLiteral(value), span)) => {
                self.bump();
                Ok((value.into_owned(), span))
            }
            _ => self.unexpected_token("a quoted string"),
        }
    }

    fn expect_bool(&mut self) -> Result<bool, ParseErrorKind> {
        match self.peek()? {
            Some((Token::Word("true"), _)) => {
                self.bump();
                Ok(true)
            }
            Some((Token::Word("false"), _)) => {
                self.bump();
                Ok(false)
            }
            _ => self.unexpected_token("'true' or 'false'"),
        }
    }

    fn unexpected_token<T>(&mut self, expected: impl ToString) -> Result<T, ParseErrorKind> {
        match self.peek()? {
            Some((found, span)) => Err(ParseErrorKind::UnexpectedToken {
                expected: expected.to_string(),
                found: found.to_string(),
                span,
            }),
            None => Err(ParseErrorKind::UnexpectedEof {
                expected: expected.to_string(),
            }),
        }
    }

    fn position(&self, span: &Span) -> Position {
        Position {
            line: self.lines.line(span.start),
            offset: span.start,
        }
    }

    fn peek(&mut self) -> Result<Option<(Token<'s>, Span)>, ParseErrorKind> {
        if self.peeked.is_none() {
            self.peeked = Some(self.advance()?);
        }
        Ok(self.peeked.clone().unwrap_or_default())
    }

    fn bump(&mut self) -> (Token<'s>, Span) {
        self.peeked
            .take()
            .flatten()
            .expect("called bump without peek returning a token")
    }

    fn advance(&mut self) -> Result<Option<(Token<'s>, Span)>, ParseErrorKind> {
        loop {
            match self.lexer.next() {
                Some(Ok(Token::LineComment(text))) => {
                    let span = self.lexer.span();
                    self.comments.push(RawComment {
                        text: text[2..].to_owned(),
                        line: self.lines.line(span.start),
                        offset: span.start,
                    });
                }
                Some(Ok(token)) => {
                    if let Some(err) = self.take_lex_error() {
                        return Err(err);
                    }
                    return Ok(Some((token, self.lexer.span())));
                }
                Some(Err(())) => {
                    return Err(ParseErrorKind::InvalidToken {
                        span: self.lexer.span(),
                    })
                }
                None => {
                    if let Some(err) = self.take_lex_error() {
                        return Err(err);
                    }
                    return Ok(None);
                }
            }
        }
    }

    fn take_lex_error(&mut self) -> Option<ParseErrorKind> {
        if self.lexer.extras.errors.is_empty() {
            None
        } else {
            Some(self.lexer.extras.errors.remove(0))
        }
    }

    /// Groups the accumulated comments into blocks of consecutive lines and
    /// attaches them to the file.
    fn finish_comments(&mut self) {
        let mut comments = std::mem::take(&mut self.comments);

        while !comments.is_empty() {
            let mut n = 1;
            while n < comments.len() && comments[n].line == comments[n - 1].line + 1 {
                n += 1;
            }

            let rest = comments.split_off(n);
            let block = std::mem::replace(&mut comments, rest);

            let start = Position {
                line: block[0].line,
                offset: block[0].offset,
            };
            let end = Position {
                line: block[n - 1].line,
                offset: block[n - 1].offset,
            };
            let text = normalize_comment_block(
                block.into_iter().map(|c| c.text).collect(),
            );

            self.set
                .file_mut(self.file)
                .comments
                .push(ast::Comment { start, end, text });
        }
    }
}

/// Strips trailing whitespace from every line and removes the common
/// left-whitespace prefix of the block.
///
/// The prefix is seeded from the first line's leading whitespace and
/// shortened until every line starts with it. Mixed tabs and spaces are not
/// reconciled beyond that.
fn normalize_comment_block(lines: Vec<String>) -> Vec<String> {
    let mut lines: Vec<String> = lines
        .into_iter()
        .map(|line| line.trim_end().to_owned())
        .collect();

    let mut prefix = String::new();
    for (i, line) in lines.iter().enumerate() {
        if i == 0 {
            let trim = line.len() - line.trim_start().len();
            prefix = line[..trim].to_owned();
        } else {
            while !prefix.is_empty() && !line.starts_with(&prefix) {
                prefix.pop();
            }
        }
        if prefix.is_empty() {
            break;
        }
    }

    if !prefix.is_empty() {
        for line in &mut lines {
            *line = line[prefix.len()..].to_owned();
        }
    }

    lines
}

fn join_span(start: Span, end: Span) -> Span {
    start.start..end.end
}

/// A single word token is an identifier if it is a letter followed by
/// letters, digits and underscores. Words carrying dots, signs or a leading
/// digit are numbers or dotted names, never bare identifiers.
fn is_ident(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(ch) if ch.is_ascii_alphabetic())
        && chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

/// 1-based line lookup for byte offsets, backed by the offset of the first
/// byte of every line.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(source: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(source.match_indices('\n').map(|(index, _)| index + 1));
        LineIndex { starts }
    }

    /// Returns the 1-based line number containing `offset`: the number of
    /// line starts at or before it.
    fn line(&self, offset: usize) -> usize {
        self.starts.partition_point(|&start| start <= offset)
    }
}
