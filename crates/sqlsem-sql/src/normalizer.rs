//! Whitespace and comment normalization
//!
//! Rebuilds the query on a single line from its tokens: each token is copied
//! verbatim, and any run of whitespace or comments between two tokens becomes
//! one space. Quoted spans are single tokens, so their inner whitespace and
//! comment-like text survive untouched.

use sqlsem_core::Span;

use crate::lexer::{lex, QuoteStyle, Token};

/// Single-line copy of a query and its tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    /// Normalized text
    pub text: String,

    /// Tokens with spans in `text`
    pub tokens: Vec<Token>,

    /// Quote style of a span left open at end of input, with its start offset in `text`
    pub unterminated: Option<(QuoteStyle, usize)>,

    /// Tokenizer error; `text` is then the input with whitespace collapsed and `tokens` is empty
    pub failure: Option<String>,
}

/// Normalize SQL text
pub fn normalize(sql: &str) -> Normalized {
    let lexed = lex(sql);
    if let Some(failure) = lexed.failure {
        return Normalized {
            text: sql.split_whitespace().collect::<Vec<_>>().join(" "),
            tokens: Vec::new(),
            unterminated: None,
            failure: Some(failure),
        };
    }

    let mut text = String::with_capacity(sql.len());
    let mut tokens = Vec::with_capacity(lexed.tokens.len());
    let mut unterminated = None;
    let mut previous_end = None;

    for token in lexed.tokens {
        // Tokens are contiguous apart from the whitespace and comments dropped between them
        if previous_end.is_some_and(|end| end < token.span.start) {
            text.push(' ');
        }
        previous_end = Some(token.span.end);

        let start = text.len();
        text.push_str(token.span.slice(sql).unwrap_or_default());
        if let Some((style, _)) = lexed.unterminated.filter(|(_, at)| *at == token.span.start) {
            unterminated = Some((style, start));
        }
        tokens.push(Token {
            kind: token.kind,
            span: Span::new(start, text.len()),
        });
    }

    Normalized {
        text,
        tokens,
        unterminated,
        failure: None,
    }
}
