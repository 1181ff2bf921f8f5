//! Lexical analysis: lines of text to a lazy stream of [`Token`]s.
//!
//! The [`Tokenizer`] pulls one line at a time from a [`LineSource`] and scans
//! it into a FIFO cache of tokens, so look-ahead never reads further than the
//! current line. Every token carries the 0-based line it was scanned on for
//! error reporting.

use std::collections::VecDeque;

use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{take_till1, take_while},
    character::complete::char,
    combinator::value,
};

use crate::Error;
use crate::source::LineSource;

/// Allowed characters in operator-like symbol names.
pub(crate) const SYMBOL_CHARS: &str = "!@$%&/.-\\λ=?+|*^";

/// The kind-specific payload of a token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LeftParen,
    RightParen,
    /// A bare word: `[A-Za-z_][A-Za-z0-9_-]*`
    Identifier(String),
    /// An operator-like word built purely from [`SYMBOL_CHARS`]
    Symbol(String),
    String(String),
    Number(f64),
    Boolean(bool),
}

/// One lexical token together with the 0-based line it was scanned on.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

/// Anything that ends an identifier/symbol/number atom.
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, ',' | '(' | ')' | '"' | ';')
}

/// Whitespace and commas separate tokens; commas are purely visual.
fn separators(input: &str) -> IResult<&str, &str> {
    take_while(|c: char| c.is_whitespace() || c == ',').parse(input)
}

fn structural(input: &str) -> IResult<&str, TokenKind> {
    alt((
        value(TokenKind::LeftParen, char('(')),
        value(TokenKind::RightParen, char(')')),
    ))
    .parse(input)
}

/// A maximal run of non-delimiter characters, classified afterwards.
fn atom_text(input: &str) -> IResult<&str, &str> {
    take_till1(is_delimiter).parse(input)
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        }
        _ => false,
    }
}

fn is_symbol(word: &str) -> bool {
    !word.is_empty() && word.chars().all(|c| SYMBOL_CHARS.contains(c))
}

/// Classify a flushed atom. Order matters: boolean, identifier, symbol,
/// number, and anything left over is a fatal scan error.
fn classify_atom(word: &str, line: usize) -> Result<TokenKind, Error> {
    if let Some(flag) = word.strip_prefix('#') {
        return match flag {
            "t" => Ok(TokenKind::Boolean(true)),
            "f" => Ok(TokenKind::Boolean(false)),
            _ => Err(Error::scan(
                line,
                format!("{word} is not a valid boolean constant, expected #t or #f"),
            )),
        };
    }
    if is_identifier(word) {
        return Ok(TokenKind::Identifier(word.to_owned()));
    }
    if is_symbol(word) {
        return Ok(TokenKind::Symbol(word.to_owned()));
    }
    match word.parse::<f64>() {
        Ok(number) => Ok(TokenKind::Number(number)),
        Err(_) => Err(Error::scan(line, format!("unable to parse token {word}"))),
    }
}

/// Scan one source line into tokens.
///
/// A `;` comments out the rest of the line. A `"` starts a string literal
/// that must close on the same line; there are no escape sequences, the
/// closing quote is simply the next `"`.
pub(crate) fn scan_line(line: &str, number: usize) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let mut rest = line;

    loop {
        if let Ok((after, _)) = separators(rest) {
            rest = after;
        }
        if rest.is_empty() || rest.starts_with(';') {
            break;
        }

        if let Ok((after, kind)) = structural(rest) {
            tokens.push(Token { kind, line: number });
            rest = after;
            continue;
        }

        if let Some(tail) = rest.strip_prefix('"') {
            let Some(end) = tail.find('"') else {
                return Err(Error::scan(
                    number,
                    "unexpected end of line while reading a string literal",
                ));
            };
            tokens.push(Token {
                kind: TokenKind::String(tail[..end].to_owned()),
                line: number,
            });
            rest = &tail[end + 1..];
            continue;
        }

        match atom_text(rest) {
            Ok((after, word)) => {
                tokens.push(Token {
                    kind: classify_atom(word, number)?,
                    line: number,
                });
                rest = after;
            }
            // First character is known not to be a separator, paren, quote
            // or comment at this point, so the atom parser cannot fail.
            Err(_) => {
                return Err(Error::scan(number, format!("unable to scan input: {rest}")));
            }
        }
    }

    Ok(tokens)
}

/// A lazy, cacheable token stream over a [`LineSource`].
///
/// Tokens for the current line are held in a FIFO cache; [`Tokenizer::peek`]
/// refills it one source line at a time, skipping (but still counting) blank
/// and comment-only lines.
pub struct Tokenizer<S> {
    source: S,
    cache: VecDeque<Token>,
    line: usize,
}

impl<S: LineSource> Tokenizer<S> {
    pub fn new(source: S) -> Self {
        Tokenizer {
            source,
            cache: VecDeque::new(),
            line: 0,
        }
    }

    /// True once the source is exhausted and no scanned tokens remain.
    ///
    /// Note: trailing blank or comment-only lines keep this false until
    /// consumed; drivers should loop on [`Tokenizer::peek`] instead.
    pub fn eof(&self) -> bool {
        self.source.eof() && self.cache.is_empty()
    }

    /// Non-consuming look-ahead at the next token.
    pub fn peek(&mut self) -> Result<Option<&Token>, Error> {
        while self.cache.is_empty() {
            if self.source.eof() {
                return Ok(None);
            }
            self.refill()?;
        }
        Ok(self.cache.front())
    }

    /// Consume and return the next token.
    pub fn next(&mut self) -> Result<Option<Token>, Error> {
        self.peek()?;
        Ok(self.cache.pop_front())
    }

    /// Pull one line from the source and scan it into the cache. Blank lines
    /// contribute no tokens but still advance the line counter.
    fn refill(&mut self) -> Result<(), Error> {
        let Some(row) = self.source.read_line() else {
            return Ok(());
        };
        let number = self.line;
        self.line += 1;
        self.cache.extend(scan_line(row.trim(), number)?);
        Ok(())
    }
}
