// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STEP record tokenizer using nom combinators
//!
//! Parses data-section entities (`#12=IFCWALL(...);`) and header records
//! (`FILE_NAME(...);`) into attribute values.

use ifc_frag_model::{AttributeValue, DecodedEntity, EntityId, IfcType, ParseError, Result};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_until, take_while, take_while1},
    character::complete::{char, multispace1},
    combinator::{opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair},
    IResult, Parser,
};

/// Deepest list nesting accepted in one record; real files stay in single digits
const MAX_NESTING: usize = 64;

/// Raw token from a STEP file (before conversion to AttributeValue)
#[derive(Clone, Debug, PartialEq)]
pub enum Token<'a> {
    /// Entity reference (#123)
    EntityRef(u32),
    /// String value, still STEP-encoded
    String(&'a str),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Enumeration (.VALUE.)
    Enum(&'a str),
    /// List of tokens
    List(Vec<Token<'a>>),
    /// Typed value like IFCLABEL('text')
    TypedValue(&'a str, Vec<Token<'a>>),
    /// Null value ($)
    Null,
    /// Derived value (*)
    Derived,
}

impl Token<'_> {
    /// Convert token to owned AttributeValue, decoding string escapes
    pub fn to_attribute_value(&self) -> AttributeValue {
        match self {
            Token::EntityRef(id) => AttributeValue::EntityRef(EntityId(*id)),
            Token::String(s) => AttributeValue::String(decode_step_string(s)),
            Token::Integer(i) => AttributeValue::Integer(*i),
            Token::Float(f) => AttributeValue::Float(*f),
            Token::Enum(s) => match *s {
                "T" | "TRUE" => AttributeValue::Bool(true),
                "F" | "FALSE" => AttributeValue::Bool(false),
                _ => AttributeValue::Enum((*s).to_string()),
            },
            Token::List(items) => {
                AttributeValue::List(items.iter().map(|t| t.to_attribute_value()).collect())
            }
            Token::TypedValue(name, args) => AttributeValue::TypedValue(
                (*name).to_string(),
                args.iter().map(|t| t.to_attribute_value()).collect(),
            ),
            Token::Null => AttributeValue::Null,
            Token::Derived => AttributeValue::Derived,
        }
    }
}

// ============================================================================
// Parsing Primitives
// ============================================================================

/// Skip whitespace and `/* ... */` comments
fn ws(input: &str) -> IResult<&str, ()> {
    value(
        (),
        many0(alt((
            value((), multispace1),
            value((), (tag("/*"), take_until("*/"), tag("*/"))),
        ))),
    )
    .parse(input)
}

/// Parse an entity reference (#123)
fn entity_ref(input: &str) -> IResult<&str, Token<'_>> {
    let (input, _) = char('#')(input)?;
    let (input, digits) = take_while1(|c: char| c.is_ascii_digit())(input)?;
    let id = lexical_core::parse::<u32>(digits.as_bytes()).unwrap_or(0);
    Ok((input, Token::EntityRef(id)))
}

/// Parse a STEP string ('text' with '' for escaped quotes)
fn step_string(input: &str) -> IResult<&str, Token<'_>> {
    let (rest, _) = char('\'')(input)?;

    let bytes = rest.as_bytes();
    let mut end = 0;
    loop {
        match memchr::memchr(b'\'', &bytes[end..]) {
            Some(offset) => {
                end += offset;
                if bytes.get(end + 1) == Some(&b'\'') {
                    end += 2;
                    continue;
                }
                break;
            }
            None => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    input,
                    nom::error::ErrorKind::Char,
                )))
            }
        }
    }

    Ok((&rest[end + 1..], Token::String(&rest[..end])))
}

/// Parse a number (integer or float)
fn number(input: &str) -> IResult<&str, Token<'_>> {
    let (input, num_str) = recognize((
        opt(alt((char('-'), char('+')))),
        take_while1(|c: char| c.is_ascii_digit()),
        opt(pair(char('.'), take_while(|c: char| c.is_ascii_digit()))),
        opt((
            alt((char('e'), char('E'))),
            opt(alt((char('+'), char('-')))),
            take_while1(|c: char| c.is_ascii_digit()),
        )),
    ))
    .parse(input)?;

    let digits = num_str.trim_start_matches('+').as_bytes();
    if num_str.contains(['.', 'e', 'E']) {
        // "1." is valid STEP but not every float parser accepts it
        let f = lexical_core::parse::<f64>(digits)
            .or_else(|_| num_str.trim_start_matches('+').trim_end_matches('.').parse())
            .unwrap_or(0.0);
        Ok((input, Token::Float(f)))
    } else {
        let i = lexical_core::parse::<i64>(digits).unwrap_or(0);
        Ok((input, Token::Integer(i)))
    }
}

/// Parse an enumeration (.VALUE.)
fn enumeration(input: &str) -> IResult<&str, Token<'_>> {
    let (input, name) = delimited(
        char('.'),
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        char('.'),
    )
    .parse(input)?;
    Ok((input, Token::Enum(name)))
}

/// Parse null ($) or derived (*)
fn placeholder(input: &str) -> IResult<&str, Token<'_>> {
    alt((value(Token::Null, char('$')), value(Token::Derived, char('*')))).parse(input)
}

/// Parse a parenthesized, comma-separated token list
///
/// `depth` counts the enclosing lists; past [`MAX_NESTING`] the record is
/// rejected instead of recursing further.
fn token_list(input: &str, depth: usize) -> IResult<&str, Vec<Token<'_>>> {
    let (rest, _) = char('(')(input)?;
    if depth >= MAX_NESTING {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }
    let (rest, _) = ws(rest)?;
    let (rest, items) = separated_list0((ws, char(','), ws), |i| token(i, depth + 1)).parse(rest)?;
    let (rest, _) = pair(ws, char(')')).parse(rest)?;
    Ok((rest, items))
}

fn list(input: &str, depth: usize) -> IResult<&str, Token<'_>> {
    let (input, items) = token_list(input, depth)?;
    Ok((input, Token::List(items)))
}

fn identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_ascii_alphanumeric() || c == '_')(input)
}

/// Parse a typed value like IFCLABEL('text')
fn typed_value(input: &str, depth: usize) -> IResult<&str, Token<'_>> {
    let (input, type_name) = identifier(input)?;
    let (input, _) = ws(input)?;
    let (input, args) = token_list(input, depth)?;
    Ok((input, Token::TypedValue(type_name, args)))
}

/// Parse any token
fn token(input: &str, depth: usize) -> IResult<&str, Token<'_>> {
    alt((
        entity_ref,
        step_string,
        placeholder,
        enumeration,
        number,
        |i| list(i, depth),
        |i| typed_value(i, depth),
    ))
    .parse(input)
}

// ============================================================================
// String decoding
// ============================================================================

/// Decode STEP string escapes: `''`, `\\`, `\X\hh`, `\X2\hhhh...\X0\`, `\S\c`
pub fn decode_step_string(raw: &str) -> String {
    if !raw.contains(['\\', '\'']) {
        return raw.to_string();
    }

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(pos) = rest.find(['\\', '\'']) {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        if let Some(tail) = rest.strip_prefix("''") {
            out.push('\'');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\\\\") {
            out.push('\\');
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix("\\X2\\") {
            let end = tail.find("\\X0\\").unwrap_or(tail.len());
            let units: Vec<u16> = tail[..end]
                .as_bytes()
                .chunks(4)
                .filter_map(|c| std::str::from_utf8(c).ok())
                .filter_map(|h| u16::from_str_radix(h, 16).ok())
                .collect();
            out.push_str(&String::from_utf16_lossy(&units));
            rest = tail.get(end + 4..).unwrap_or("");
        } else if let Some(tail) = rest.strip_prefix("\\X\\") {
            match tail.get(..2).and_then(|h| u8::from_str_radix(h, 16).ok()) {
                Some(byte) => {
                    out.push(char::from(byte));
                    rest = &tail[2..];
                }
                None => {
                    out.push_str("\\X\\");
                    rest = tail;
                }
            }
        } else if let Some(tail) = rest.strip_prefix("\\S\\") {
            match tail.chars().next() {
                Some(c) if c.is_ascii() => {
                    out.push(char::from(c as u8 + 128));
                    rest = &tail[1..];
                }
                _ => {
                    out.push_str("\\S\\");
                    rest = tail;
                }
            }
        } else {
            let mut chars = rest.chars();
            if let Some(c) = chars.next() {
                out.push(c);
            }
            rest = chars.as_str();
        }
    }
    out.push_str(rest);
    out
}

// ============================================================================
// Record Parsing
// ============================================================================

/// Parse a complete entity definition
///
/// Format: `#123=IFCWALL(attr1,attr2,...);`
pub fn parse_entity(input: &str) -> Result<DecodedEntity> {
    let entity = (
        ws,
        char('#'),
        take_while1(|c: char| c.is_ascii_digit()),
        ws,
        char('='),
        ws,
        identifier,
        ws,
        |i| token_list(i, 0),
    )
        .parse(input);

    match entity {
        Ok((_, (_, _, id, _, _, _, type_name, _, tokens))) => {
            let id = lexical_core::parse::<u32>(id.as_bytes())
                .map_err(|_| ParseError::format(format!("entity id out of range: {id}")))?;
            Ok(DecodedEntity {
                id: EntityId(id),
                ifc_type: IfcType::parse(type_name),
                attributes: tokens.iter().map(|t| t.to_attribute_value()).collect(),
            })
        }
        Err(e) => {
            let id = leading_id(input).unwrap_or_default();
            Err(ParseError::entity_parse(EntityId(id), format!("{e}")))
        }
    }
}

/// Parse entity from the content slice at the given byte offsets
pub fn parse_entity_at(content: &str, start: usize, end: usize) -> Result<DecodedEntity> {
    let slice = content
        .get(start..end)
        .ok_or_else(|| ParseError::format(format!("entity span {start}..{end} out of bounds")))?;
    parse_entity(slice)
}

/// Parse a header record such as `FILE_NAME('a.ifc','2024-01-01',...)`
///
/// Returns the keyword and its decoded arguments.
pub fn parse_record(input: &str) -> Option<(&str, Vec<AttributeValue>)> {
    let (_, (_, name, _, tokens)) = (ws, identifier, ws, |i| token_list(i, 0))
        .parse(input)
        .ok()?;
    Some((name, tokens.iter().map(|t| t.to_attribute_value()).collect()))
}

fn leading_id(input: &str) -> Option<u32> {
    let digits: String = input
        .trim_start()
        .strip_prefix('#')?
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_ref() {
        let (remaining, token) = entity_ref("#123").unwrap();
        assert_eq!(remaining, "");
        assert_eq!(token, Token::EntityRef(123));
    }

    #[test]
    fn test_parse_string_with_escaped_quote() {
        let (remaining, token) = step_string("'it''s a test',").unwrap();
        assert_eq!(remaining, ",");
        assert_eq!(token, Token::String("it''s a test"));
        assert_eq!(
            token.to_attribute_value(),
            AttributeValue::String("it's a test".into())
        );
    }

    #[test]
    fn test_unterminated_string_fails() {
        assert!(step_string("'never closed").is_err());
    }

    #[test]
    fn test_parse_numbers() {
        assert_eq!(number("42").unwrap().1, Token::Integer(42));
        assert_eq!(number("-7").unwrap().1, Token::Integer(-7));
        match number("1.5E-3").unwrap().1 {
            Token::Float(f) => assert!((f - 0.0015).abs() < 1e-12),
            other => panic!("Expected float, got {other:?}"),
        }
        match number("10000.").unwrap().1 {
            Token::Float(f) => assert_eq!(f, 10000.0),
            other => panic!("Expected float, got {other:?}"),
        }
    }

    #[test]
    fn test_logical_enums_become_bools() {
        let (_, token) = enumeration(".T.").unwrap();
        assert_eq!(token.to_attribute_value(), AttributeValue::Bool(true));
        let (_, token) = enumeration(".ELEMENT.").unwrap();
        assert_eq!(
            token.to_attribute_value(),
            AttributeValue::Enum("ELEMENT".into())
        );
    }

    #[test]
    fn test_decode_unicode_escapes() {
        assert_eq!(decode_step_string("Wand \\X2\\00FC\\X0\\ber"), "Wand über");
        assert_eq!(decode_step_string("T\\X\\FCr"), "T\u{fc}r");
        assert_eq!(decode_step_string("plain"), "plain");
        assert_eq!(decode_step_string("a\\\\b"), "a\\b");
    }

    #[test]
    fn test_parse_entity() {
        let entity =
            parse_entity("#1= IFCWALL('abc',$,#2,(1.,2.,3.),IFCLABEL('x'),*);").unwrap();
        assert_eq!(entity.id, EntityId(1));
        assert_eq!(entity.ifc_type, IfcType::IfcWall);
        assert_eq!(entity.attributes.len(), 6);
        assert_eq!(entity.get_ref(2), Some(EntityId(2)));
        assert_eq!(entity.get_list(3).map(|l| l.len()), Some(3));
        assert_eq!(entity.get_string(4), Some("x"));
        assert_eq!(entity.get(5), Some(&AttributeValue::Derived));
    }

    #[test]
    fn test_parse_entity_with_comment() {
        let entity = parse_entity("#9=IFCSLAB(/* guid */'g',$);").unwrap();
        assert_eq!(entity.get_string(0), Some("g"));
    }

    #[test]
    fn test_parse_entity_error_names_entity() {
        let err = parse_entity("#77=IFCWALL('abc',$").unwrap_err();
        assert!(matches!(err, ParseError::EntityParse(EntityId(77), _)));
    }

    #[test]
    fn test_nested_lists_within_limit() {
        let entity = parse_entity("#5=IFCCARTESIANPOINTLIST3D(((((0.,1.,2.)))));").unwrap();
        let inner = entity.get_list(0).and_then(|l| l[0].as_list()).and_then(|l| l[0].as_list());
        assert_eq!(inner.map(|l| l.len()), Some(1));
    }

    #[test]
    fn test_runaway_nesting_is_an_entity_error() {
        let depth = 200_000;
        let input = format!(
            "#30=IFCWALL('1w',$,'W',$,$,{}1.{},$,$,$);",
            "(".repeat(depth),
            ")".repeat(depth)
        );
        let err = parse_entity(&input).unwrap_err();
        assert!(matches!(err, ParseError::EntityParse(EntityId(30), _)));

        let input = format!("#31=IFCWALL({}1.{});", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert!(parse_entity(&input).is_err());
        let ok = MAX_NESTING - 1;
        let input = format!("#32=IFCWALL({}1.{});", "(".repeat(ok), ")".repeat(ok));
        assert!(parse_entity(&input).is_ok());
    }

    #[test]
    fn test_parse_header_record() {
        let (name, args) =
            parse_record("FILE_NAME('a.ifc','2024-01-01T00:00:00',('Me'),('Org'),'pp','app','');")
                .unwrap();
        assert_eq!(name, "FILE_NAME");
        assert_eq!(args.len(), 7);
        assert_eq!(args[0].as_string(), Some("a.ifc"));
        assert_eq!(
            args[2].as_list().and_then(|l| l[0].as_string()),
            Some("Me")
        );
    }
}
