//! Table reference resolution
//!
//! Turns the tokens of one FROM item or JOIN target into a table designator:
//! optional schema, name, optional alias. The clause segmenter has already
//! cut the span at the next boundary keyword, so the resolver only has to
//! walk `name ( . name )* [ [AS] alias ]` and report anything left over.

use sqlsem_core::Span;

use crate::lexer::{is_reserved, matching_paren, span_of, text_of, Keyword, Token, TokenKind};

/// A table designator isolated from a clause span
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTable {
    pub schema: Option<String>,
    pub name: String,
    pub alias: Option<String>,

    /// The name had three or more dotted parts and was kept whole
    pub multipart: bool,

    /// Tokens left after the name, alias and table hints
    pub trailing: Option<Span>,
}

/// Reasons a span yields no table
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("no table name")]
    Empty,

    #[error("derived tables and parenthesized joins are not supported")]
    DerivedTable,

    #[error("table-valued function '{0}' is not supported")]
    TableFunction(String),

    #[error("expected a table name, found '{0}'")]
    NotAnIdentifier(String),
}

/// Resolve one table reference
pub fn resolve_table(tokens: &[Token], src: &str) -> Result<ResolvedTable, ResolveError> {
    let first = tokens.first().ok_or(ResolveError::Empty)?;
    if first.kind == TokenKind::LParen {
        return Err(ResolveError::DerivedTable);
    }

    let (parts, mut pos) = name_parts(tokens, src)?;

    if matches!(tokens.get(pos).map(|t| &t.kind), Some(TokenKind::LParen)) {
        return Err(ResolveError::TableFunction(parts.join(".")));
    }

    let multipart = parts.len() > 2;
    let (schema, name) = match parts.as_slice() {
        [name] => (None, name.clone()),
        [schema, name] => (Some(schema.clone()), name.clone()),
        _ => (None, parts.join(".")),
    };
    if name.is_empty() {
        return Err(ResolveError::Empty);
    }

    pos = skip_table_hints(tokens, pos);
    let (alias, after_alias) = alias_at(tokens, pos);
    pos = skip_table_hints(tokens, after_alias);

    Ok(ResolvedTable {
        schema,
        name,
        alias,
        multipart,
        trailing: span_of(&tokens[pos.min(tokens.len())..]),
    })
}

/// `word ( . word )*`, returning the parts and the index after them
///
/// An empty part (`db..table`) is kept so the dotted name survives intact.
fn name_parts(tokens: &[Token], src: &str) -> Result<(Vec<String>, usize), ResolveError> {
    let mut parts = Vec::new();
    let mut pos = 0;

    loop {
        match tokens.get(pos).and_then(Token::word) {
            Some(word) if parts.is_empty() && is_reserved(word) => {
                return Err(ResolveError::NotAnIdentifier(word.value.clone()));
            }
            Some(word) => {
                parts.push(word.value.clone());
                pos += 1;
            }
            None => return Err(ResolveError::NotAnIdentifier(text_of(src, tokens).to_string())),
        }

        if !is_period(tokens.get(pos)) {
            return Ok((parts, pos));
        }
        pos += 1;
        while is_period(tokens.get(pos)) {
            parts.push(String::new());
            pos += 1;
        }
    }
}

fn is_period(token: Option<&Token>) -> bool {
    matches!(token.map(|t| &t.kind), Some(TokenKind::Period))
}

/// `[AS] alias` at `pos`
fn alias_at(tokens: &[Token], pos: usize) -> (Option<String>, usize) {
    let Some(token) = tokens.get(pos) else {
        return (None, pos);
    };

    if token.is_keyword(Keyword::AS) {
        return match tokens.get(pos + 1).and_then(Token::word) {
            Some(word) => (Some(word.value.clone()), pos + 2),
            None => (None, pos),
        };
    }

    match token.word() {
        Some(word) if !is_reserved(word) => (Some(word.value.clone()), pos + 1),
        _ => (None, pos),
    }
}

/// Skip `WITH (NOLOCK)` style table hints
fn skip_table_hints(tokens: &[Token], mut pos: usize) -> usize {
    while tokens.get(pos).is_some_and(|t| t.is_keyword(Keyword::WITH))
        && matches!(tokens.get(pos + 1).map(|t| &t.kind), Some(TokenKind::LParen))
    {
        match matching_paren(tokens, pos + 1) {
            Some(close) => pos = close + 1,
            None => break,
        }
    }
    pos
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::lexer::tokenize;

    fn resolve(src: &str) -> Result<ResolvedTable, ResolveError> {
        resolve_table(&tokenize(src), src)
    }

    fn table(schema: Option<&str>, name: &str, alias: Option<&str>) -> ResolvedTable {
        ResolvedTable {
            schema: schema.map(String::from),
            name: name.to_string(),
            alias: alias.map(String::from),
            multipart: false,
            trailing: None,
        }
    }

    #[test]
    fn plain_name() {
        assert_eq!(resolve("Products").unwrap(), table(None, "Products", None));
    }

    #[test]
    fn schema_qualified_with_bare_alias() {
        assert_eq!(resolve("dbo.Products p").unwrap(), table(Some("dbo"), "Products", Some("p")));
    }

    #[test]
    fn bracketed_matches_plain() {
        assert_eq!(resolve("[dbo].[Products] p"), resolve("dbo.Products p"));
        assert_eq!(resolve("`dbo`.`Products` AS p"), resolve("dbo.Products p"));
    }

    #[test]
    fn as_keyword_is_case_insensitive() {
        assert_eq!(resolve("Categories as Cat").unwrap(), table(None, "Categories", Some("Cat")));
    }

    #[test]
    fn brackets_with_spaces_and_dots() {
        assert_eq!(
            resolve("[Sales].[Order Details] od").unwrap(),
            table(Some("Sales"), "Order Details", Some("od"))
        );
        assert_eq!(resolve("[a.b]").unwrap(), table(None, "a.b", None));
    }

    #[test]
    fn three_part_name_kept_whole() {
        let resolved = resolve("Northwind.dbo.Products p").unwrap();
        assert_eq!(resolved.schema, None);
        assert_eq!(resolved.name, "Northwind.dbo.Products");
        assert_eq!(resolved.alias.as_deref(), Some("p"));
        assert!(resolved.multipart);

        assert_eq!(resolve("Northwind..Products").unwrap().name, "Northwind..Products");
    }

    #[test]
    fn table_hints_are_skipped() {
        assert_eq!(resolve("Products p WITH (NOLOCK)").unwrap(), table(None, "Products", Some("p")));
        assert_eq!(resolve("Products WITH (NOLOCK, INDEX(ix))").unwrap(), table(None, "Products", None));
    }

    #[test]
    fn reserved_word_is_not_an_alias() {
        let src = "Products WHERE x";
        let resolved = resolve(src).unwrap();
        assert_eq!(resolved.alias, None);
        assert_eq!(resolved.trailing.and_then(|s| s.slice(src)), Some("WHERE x"));
    }

    #[test]
    fn trailing_tokens_reported() {
        let src = "Products p extra stuff";
        let resolved = resolve(src).unwrap();
        assert_eq!(resolved.alias.as_deref(), Some("p"));
        assert_eq!(resolved.trailing.and_then(|s| s.slice(src)), Some("extra stuff"));
    }

    #[test]
    fn failures() {
        assert_eq!(resolve(""), Err(ResolveError::Empty));
        assert_eq!(resolve("(SELECT 1) x"), Err(ResolveError::DerivedTable));
        assert_eq!(
            resolve("OPENROWSET('x', 'y') r"),
            Err(ResolveError::TableFunction("OPENROWSET".into()))
        );
        assert_eq!(resolve("123"), Err(ResolveError::NotAnIdentifier("123".into())));
        assert_eq!(resolve("dbo."), Err(ResolveError::NotAnIdentifier("dbo.".into())));
        assert_eq!(resolve("WHERE"), Err(ResolveError::NotAnIdentifier("WHERE".into())));
        assert_eq!(resolve("[]"), Err(ResolveError::Empty));
    }

    #[test]
    fn quoted_reserved_word_is_a_name() {
        assert_eq!(resolve("[Order] [Select]").unwrap(), table(None, "Order", Some("Select")));
    }
}
