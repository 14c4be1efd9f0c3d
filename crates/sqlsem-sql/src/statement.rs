//! Statement-level facts: leading keyword and parameter placeholders

use sqlsem_core::StatementKind;

use crate::lexer::{Keyword, Token, TokenKind};

/// Classify a statement by its first keyword
pub fn classify(tokens: &[Token]) -> StatementKind {
    let Some(word) = tokens
        .iter()
        .find(|t| t.kind != TokenKind::LParen)
        .and_then(Token::word)
    else {
        return StatementKind::Unknown;
    };

    match word.keyword {
        Keyword::SELECT | Keyword::WITH => StatementKind::Select,
        Keyword::INSERT => StatementKind::Insert,
        Keyword::UPDATE => StatementKind::Update,
        Keyword::DELETE => StatementKind::Delete,
        Keyword::EXEC | Keyword::EXECUTE => StatementKind::Execute,
        Keyword::CREATE => StatementKind::Create,
        Keyword::DROP => StatementKind::Drop,
        Keyword::MERGE => StatementKind::Merge,
        _ => StatementKind::Unknown,
    }
}

/// Number of `?` placeholders (quoted spans never produce one)
pub fn count_placeholders(tokens: &[Token]) -> usize {
    tokens
        .iter()
        .filter(|t| matches!(&t.kind, TokenKind::Placeholder(p) if p.starts_with('?')))
        .count()
}
