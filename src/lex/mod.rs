
use std::{borrow::Cow, fmt, str};

use logos::{Lexer, Logos};

use crate::error::ParseErrorKind;

/// The token stream of a single `.proto` source buffer.
///
/// Identifiers, numbers and dotted names are lexed as one `Word` matched by
/// `[-+._A-Za-z0-9]+`; splitting dotted packages or parsing numeric literals
/// is left to the parser. Any byte outside that class which is not
/// punctuation, a quote or whitespace is a lex error.
#[derive(Debug, Clone, Logos, PartialEq)]
#[logos(extras = TokenExtras)]
#[logos(skip r"[\t\v\f\r\n ]+")]
pub(crate) enum Token<'a> {
    #[regex(r"[-+._A-Za-z0-9]+")]
    Word(&'a str),
    #[regex(r#"'|""#, string)]
    StringLiteral(Cow<'a, str>),
    #[token(";")]
    Semicolon,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token("=")]
    Equals,
    #[token("[")]
    LeftBracket,
    #[token("]")]
    RightBracket,
    #[token(",")]
    Comma,
    #[token("<")]
    LeftAngleBracket,
    #[token(">")]
    RightAngleBracket,
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[regex(r"//[^\n]*")]
    LineComment(&'a str),
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(value) => write!(f, "{}", value),
            Token::StringLiteral(value) => {
                write!(f, "\"")?;
                for ch in value.chars() {
                    write!(f, "{}", ch.escape_default())?;
                }
                write!(f, "\"")
            }
            Token::Semicolon => write!(f, ";"),
            Token::LeftBrace => write!(f, "{{"),
            Token::RightBrace => write!(f, "}}"),
            Token::Equals => write!(f, "="),
            Token::LeftBracket => write!(f, "["),
            Token::RightBracket => write!(f, "]"),
            Token::Comma => write!(f, ","),
            Token::LeftAngleBracket => write!(f, "<"),
            Token::RightAngleBracket => write!(f, ">"),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
            Token::LineComment(value) => write!(f, "{}", value),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct TokenExtras {
    pub errors: Vec<ParseErrorKind>,
}

/// Lexes the remainder of a string literal after its opening quote.
///
/// Both quote kinds use the same escape rules; the inactive quote kind is
/// ordinary content. The unescaped text is produced here so downstream
/// layers never re-inspect the raw literal.
fn string<'a>(lex: &mut Lexer<'a, Token<'a>>) -> Cow<'a, str> {
    #[derive(Logos)]
    #[logos(subpattern hex = r"[0-9A-Fa-f]")]
    enum Component<'a> {
        #[regex(r#"[^\x00\n\\'"]+"#)]
        Unescaped(&'a str),
        #[regex(r#"['"]"#, terminator)]
        Terminator(u8),
        #[regex(r#"\\[xX](?&hex)(?&hex)?"#, hex_escape)]
        #[regex(r#"\\[0-7][0-7]?[0-7]?"#, oct_escape)]
        #[regex(r#"\\[abfnrtv?\\'"]"#, char_escape)]
        Byte(u8),
        #[regex(r#"\\u(?&hex)(?&hex)(?&hex)(?&hex)"#, unicode_escape)]
        #[regex(
            r#"\\U(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)(?&hex)"#,
            unicode_escape
        )]
        Char(char),
    }

    fn terminator<'a>(lex: &mut Lexer<'a, Component<'a>>) -> u8 {
        debug_assert_eq!(lex.slice().len(), 1);
        lex.slice().as_bytes()[0]
    }

    fn hex_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Result<u8, ()> {
        u32::from_str_radix(&lex.slice()[2..], 16)
            .map_err(drop)?
            .try_into()
            .map_err(drop)
    }

    fn oct_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Result<u8, ()> {
        u32::from_str_radix(&lex.slice()[1..], 8)
            .map_err(drop)?
            .try_into()
            .map_err(drop)
    }

    fn char_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> u8 {
        match lex.slice().as_bytes()[1] {
            b'a' => b'\x07',
            b'b' => b'\x08',
            b'f' => b'\x0c',
            b'n' => b'\n',
            b'r' => b'\r',
            b't' => b'\t',
            b'v' => b'\x0b',
            b'?' => b'?',
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            _ => unreachable!("failed to parse char escape"),
        }
    }

    fn unicode_escape<'a>(lex: &mut Lexer<'a, Component<'a>>) -> Option<char> {
        let value = u32::from_str_radix(&lex.slice()[2..], 16).ok()?;
        char::from_u32(value)
    }

    let mut result: Option<Cow<'a, [u8]>> = None;

    let mut char_lexer = Component::lexer(lex.remainder());
    let terminator = lex.slice().as_bytes()[0];

    loop {
        match char_lexer.next() {
            Some(Ok(Component::Unescaped(s))) => cow_push_bytes(&mut result, s.as_bytes()),
            Some(Ok(Component::Terminator(t))) if t == terminator => {
                break;
            }
            Some(Ok(Component::Terminator(ch) | Component::Byte(ch))) => {
                result.get_or_insert_with(Cow::default).to_mut().push(ch)
            }
            Some(Ok(Component::Char(ch))) => {
                let mut buf = [0; 4];
                let encoded = ch.encode_utf8(&mut buf);
                result
                    .get_or_insert_with(Cow::default)
                    .to_mut()
                    .extend_from_slice(encoded.as_bytes())
            }
            Some(Err(())) => {
                if char_lexer.slice().contains('\n') {
                    lex.extras.errors.push(ParseErrorKind::UnterminatedString {
                        span: lex.span(),
                    });
                    break;
                }

                let start = lex.span().end + char_lexer.span().start;
                let end = lex.span().end + char_lexer.span().end;
                if char_lexer.slice().starts_with('\\') {
                    lex.extras
                        .errors
                        .push(ParseErrorKind::InvalidStringEscape { span: start..end });
                } else {
                    lex.extras
                        .errors
                        .push(ParseErrorKind::InvalidStringCharacters { span: start..end });
                }
            }
            None => {
                lex.extras.errors.push(ParseErrorKind::UnterminatedString {
                    span: lex.span(),
                });
                break;
            }
        }
    }

    lex.bump(char_lexer.span().end);

    match result.unwrap_or_default() {
        Cow::Borrowed(bytes) => match str::from_utf8(bytes) {
            Ok(s) => Cow::Borrowed(s),
            Err(_) => {
                lex.extras
                    .errors
                    .push(ParseErrorKind::InvalidUtf8String { span: lex.span() });
                Cow::Borrowed("")
            }
        },
        Cow::Owned(bytes) => match String::from_utf8(bytes) {
            Ok(s) => Cow::Owned(s),
            Err(_) => {
                lex.extras
                    .errors
                    .push(ParseErrorKind::InvalidUtf8String { span: lex.span() });
                Cow::Borrowed("")
            }
        },
    }
}

fn cow_push_bytes<'a>(cow: &mut Option<Cow<'a, [u8]>>, s: &'a [u8]) {
    match cow {
        Some(cow) => cow.to_mut().extend_from_slice(s),
        None => *cow = Some(Cow::Borrowed(s)),
    }
}
