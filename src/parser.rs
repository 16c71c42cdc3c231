use std::cell::RefCell;

use nom::{
    branch::alt,
    character::complete::{anychar, char, none_of},
    combinator::{eof, map, opt, value},
    multi::{many0, many1},
    sequence::{preceded, terminated},
    IResult,
};
use thiserror::Error;

use crate::pattern::{Atom, AtomKind, Pattern, Quant};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("unclosed character class")]
    UnclosedCharacterClass,
    #[error("unclosed group")]
    UnclosedGroup,
    #[error("dangling backslash in pattern")]
    DanglingBackslash,
    #[error("unexpected input near '{0}'")]
    Unexpected(String),
}

struct ParseContext {
    group_counter: RefCell<usize>,
}

impl ParseContext {
    fn new() -> Self {
        Self {
            group_counter: RefCell::new(0),
        }
    }

    // Group ids are allocated when the opening parenthesis is seen, so
    // numbering is pre-order across the whole pattern, nested groups
    // included.
    fn next_group_id(&self) -> usize {
        let mut counter = self.group_counter.borrow_mut();
        *counter += 1;
        *counter
    }

    fn group_count(&self) -> usize {
        *self.group_counter.borrow()
    }
}

pub fn parse_pattern(pattern: &str) -> Result<Pattern, ParseError> {
    let context = ParseContext::new();
    match whole_pattern(pattern.as_bytes(), &context) {
        Ok((rest, atoms)) if rest.is_empty() => Ok(Pattern::new(atoms, context.group_count())),
        Ok((rest, _)) => Err(leftover_error(rest)),
        Err(_) => Err(ParseError::Unexpected(pattern.to_string())),
    }
}

// The body combinators stop at the first byte that cannot start an atom;
// which byte that is tells us what was left unfinished.
fn leftover_error(rest: &[u8]) -> ParseError {
    match rest.first() {
        Some(b'[') => ParseError::UnclosedCharacterClass,
        Some(b'(') => ParseError::UnclosedGroup,
        Some(b'\\') if rest.len() == 1 => ParseError::DanglingBackslash,
        _ => ParseError::Unexpected(String::from_utf8_lossy(rest).into_owned()),
    }
}

fn whole_pattern<'a>(input: &'a [u8], context: &ParseContext) -> IResult<&'a [u8], Vec<Atom>> {
    // '^' is an anchor only as the very first byte of the pattern;
    // everywhere else the literal branch picks it up.
    let (input, start) = opt(char('^'))(input)?;
    let (input, mut atoms) = body(input, context)?;
    if start.is_some() {
        atoms.insert(0, Atom::new(AtomKind::StartAnchor, Quant::One));
    }
    Ok((input, atoms))
}

fn body<'a>(input: &'a [u8], context: &ParseContext) -> IResult<&'a [u8], Vec<Atom>> {
    many0(|i| quantified(i, context))(input)
}

fn quantified<'a>(input: &'a [u8], context: &ParseContext) -> IResult<&'a [u8], Atom> {
    let (input, kind) = atom_kind(input, context)?;
    let (input, quantifier) = opt(alt((char('+'), char('?'))))(input)?;

    let quant = match quantifier {
        Some('+') => Quant::OneOrMore,
        Some('?') => Quant::ZeroOrOne,
        _ => Quant::One,
    };

    Ok((input, Atom::new(kind, quant)))
}

fn atom_kind<'a>(input: &'a [u8], context: &ParseContext) -> IResult<&'a [u8], AtomKind> {
    alt((
        end_anchor,
        dot,
        char_class,
        escape,
        |i| group(i, context),
        literal,
    ))(input)
}

// '$' is an anchor only as the very last byte of the pattern, so the parse
// requires end-of-input right behind it; any other '$' falls through to
// the literal branch.
fn end_anchor(input: &[u8]) -> IResult<&[u8], AtomKind> {
    value(AtomKind::EndAnchor, terminated(char('$'), eof))(input)
}

fn dot(input: &[u8]) -> IResult<&[u8], AtomKind> {
    value(AtomKind::Dot, char('.'))(input)
}

fn char_class(input: &[u8]) -> IResult<&[u8], AtomKind> {
    let (input, _) = char('[')(input)?;
    let (input, negated) = opt(char('^'))(input)?;
    let (input, bytes) = many1(class_byte)(input)?;
    let (input, _) = char(']')(input)?;

    Ok((
        input,
        AtomKind::Class {
            bytes,
            negated: negated.is_some(),
        },
    ))
}

fn class_byte(input: &[u8]) -> IResult<&[u8], u8> {
    map(alt((preceded(char('\\'), anychar), none_of("]"))), |c| c as u8)(input)
}

fn escape(input: &[u8]) -> IResult<&[u8], AtomKind> {
    let (input, _) = char('\\')(input)?;
    let (input, c) = anychar(input)?;

    let kind = match c {
        'd' => AtomKind::Digit,
        'w' => AtomKind::Word,
        // \1 .. \9 are back-references; \0 falls through to a literal '0'.
        '1'..='9' => AtomKind::BackRef(c as usize - '0' as usize),
        c => AtomKind::Literal(c as u8),
    };

    Ok((input, kind))
}

fn group<'a>(input: &'a [u8], context: &ParseContext) -> IResult<&'a [u8], AtomKind> {
    let (input, _) = char('(')(input)?;
    let id = context.next_group_id();
    let (input, first) = body(input, context)?;
    let (input, mut rest) = many0(preceded(char('|'), |i| body(i, context)))(input)?;
    let (input, _) = char(')')(input)?;

    let mut alternatives = vec![first];
    alternatives.append(&mut rest);
    Ok((input, AtomKind::Group { id, alternatives }))
}

fn literal(input: &[u8]) -> IResult<&[u8], AtomKind> {
    map(none_of(".+?()[]|\\"), |c| AtomKind::Literal(c as u8))(input)
}
