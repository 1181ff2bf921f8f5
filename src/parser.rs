//! Recursive S-expression parsing: tokens to a [`SyntaxTree`].

use crate::Error;
use crate::lexer::{Token, TokenKind, Tokenizer};
use crate::source::LineSource;

/// Either a single non-parenthesis token or an ordered list of subtrees.
///
/// Parenthesis tokens never appear as leaves; they exist only as structural
/// delimiters during parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum SyntaxTree {
    Atom(Token),
    List(Vec<SyntaxTree>),
}

impl SyntaxTree {
    /// The line of the first token in this tree, for error reporting.
    pub fn line(&self) -> Option<usize> {
        match self {
            SyntaxTree::Atom(token) => Some(token.line),
            SyntaxTree::List(items) => items.first().and_then(SyntaxTree::line),
        }
    }
}

/// Read one complete S-expression from the token stream.
pub fn read<S: LineSource>(tokenizer: &mut Tokenizer<S>) -> Result<SyntaxTree, Error> {
    let Some(next) = tokenizer.next()? else {
        return Err(Error::parse("unexpected end of stream"));
    };

    match next.kind {
        TokenKind::LeftParen => {
            let mut expression = Vec::new();
            // Collect subtrees until the next token is the closing paren.
            loop {
                match tokenizer.peek()? {
                    None => {
                        return Err(Error::parse_at(
                            next.line,
                            "unexpected end of stream while reading a statement",
                        ));
                    }
                    Some(token) if token.kind == TokenKind::RightParen => break,
                    Some(_) => expression.push(read(tokenizer)?),
                }
            }
            // Consume the trailing right parenthesis.
            tokenizer.next()?;
            Ok(SyntaxTree::List(expression))
        }
        TokenKind::RightParen => Err(Error::parse_at(next.line, "unexpected right parenthesis")),
        _ => Ok(SyntaxTree::Atom(next)),
    }
}
