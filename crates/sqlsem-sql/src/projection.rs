//! SELECT list parsing

use sqlsem_core::{ColumnProjection, Diagnostic, DiagnosticCode, ElementRef, Severity};

use crate::confidence::ConfidenceTracker;
use crate::lexer::{is_reserved, matching_paren, span_of, split_top_level_commas, text_of, Keyword, Token, TokenKind};

/// Parsed SELECT list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Projection {
    pub columns: Vec<ColumnProjection>,
    pub distinct: bool,
}

/// Parse the body of a SELECT clause
///
/// `clause_index` is used to point diagnostics at the clause when a list
/// entry yields nothing.
pub fn parse_projection(
    body: &[Token],
    src: &str,
    clause_index: usize,
    tracker: &mut ConfidenceTracker<'_>,
) -> Projection {
    let mut projection = Projection::default();
    let pos = skip_prefixes(body, &mut projection.distinct);
    let list = &body[pos..];

    if list.is_empty() {
        tracker.report(
            Diagnostic::new(DiagnosticCode::SqlUnparsableClause, Severity::Warn, "SELECT list is empty")
                .with_element(ElementRef::Clause(clause_index))
                .with_span(span_of(body)),
        );
        return projection;
    }

    for item in split_top_level_commas(list) {
        let ordinal = projection.columns.len();
        let (expression, alias) = split_alias(item);
        if expression.is_empty() {
            tracker.report(
                Diagnostic::new(
                    DiagnosticCode::SqlUnparsableClause,
                    Severity::Warn,
                    format!("SELECT list entry '{}' has no expression", text_of(src, item)),
                )
                .with_element(ElementRef::Clause(clause_index))
                .with_span(span_of(item)),
            );
            continue;
        }

        let mut column = ColumnProjection {
            expression: text_of(src, expression).to_string(),
            alias,
            table_hint: None,
            column_name: None,
            ordinal,
        };

        match classify(expression) {
            Shape::Wildcard(prefix) => column.table_hint = prefix,
            Shape::Column(mut parts) => {
                column.column_name = parts.pop();
                if !parts.is_empty() {
                    column.table_hint = Some(parts.join("."));
                }
            }
            Shape::Literal => {}
            Shape::Complex => tracker.report(
                Diagnostic::new(
                    DiagnosticCode::SqlComplexColumn,
                    Severity::Info,
                    format!("'{}' is too complex to assign a table hint", column.expression),
                )
                .with_element(ElementRef::Column(ordinal))
                .with_span(span_of(expression)),
            ),
        }

        projection.columns.push(column);
    }

    projection
}

/// Skip `DISTINCT`, `ALL` and T-SQL `TOP n [PERCENT] [WITH TIES]`
fn skip_prefixes(body: &[Token], distinct: &mut bool) -> usize {
    let mut pos = 0;
    let at = |pos: usize, keyword: Keyword| body.get(pos).is_some_and(|t| t.is_keyword(keyword));

    if at(pos, Keyword::DISTINCT) {
        *distinct = true;
        pos += 1;
    } else if at(pos, Keyword::ALL) {
        pos += 1;
    }

    if at(pos, Keyword::TOP) {
        pos += 1;
        match body.get(pos).map(|t| &t.kind) {
            Some(TokenKind::LParen) => {
                pos = matching_paren(body, pos).map_or(body.len(), |close| close + 1);
            }
            Some(TokenKind::Number(..)) | Some(TokenKind::Placeholder(_)) => pos += 1,
            Some(TokenKind::Word(word)) if word.value.starts_with('@') => pos += 1,
            _ => {}
        }
        if at(pos, Keyword::PERCENT) {
            pos += 1;
        }
        if at(pos, Keyword::WITH) && at(pos + 1, Keyword::TIES) {
            pos += 2;
        }
    }

    pos.min(body.len())
}

/// Split an entry into expression tokens and alias
fn split_alias(item: &[Token]) -> (&[Token], Option<String>) {
    // T-SQL `alias = expression`
    if item.len() >= 3 && item[1].kind == TokenKind::Eq {
        if let Some(alias) = alias_name(&item[0]) {
            return (&item[2..], Some(alias));
        }
    }

    let n = item.len();
    if n >= 3 && item[n - 2].is_keyword(Keyword::AS) {
        if let Some(alias) = alias_name(&item[n - 1]) {
            return (&item[..n - 2], Some(alias));
        }
    }

    if n >= 2 && ends_expression(&item[n - 2]) {
        if let Some(word) = item[n - 1].word() {
            if !is_reserved(word) {
                return (&item[..n - 1], Some(word.value.clone()));
            }
        }
    }

    (item, None)
}

/// Identifier or string literal usable as a column alias
fn alias_name(token: &Token) -> Option<String> {
    match &token.kind {
        TokenKind::Word(word) if !is_reserved(word) => Some(word.value.clone()),
        TokenKind::SingleQuotedString(value) | TokenKind::NationalStringLiteral(value) => Some(value.clone()),
        _ => None,
    }
}

/// Whether an expression can end with this token, so a word after it is an alias
fn ends_expression(token: &Token) -> bool {
    match &token.kind {
        TokenKind::Word(word) => !is_reserved(word) || matches!(word.keyword, Keyword::END | Keyword::NULL),
        TokenKind::RParen | TokenKind::Placeholder(_) => true,
        kind => is_literal(kind),
    }
}

/// String, number or hex literal
fn is_literal(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Number(..)
            | TokenKind::SingleQuotedString(_)
            | TokenKind::NationalStringLiteral(_)
            | TokenKind::EscapedStringLiteral(_)
            | TokenKind::HexStringLiteral(_)
    )
}

enum Shape {
    /// `*` or `prefix.*`
    Wildcard(Option<String>),
    /// Dotted identifier parts
    Column(Vec<String>),
    Literal,
    Complex,
}

fn classify(expression: &[Token]) -> Shape {
    match expression {
        [token] if token.kind == TokenKind::Mul => return Shape::Wildcard(None),
        [token] => match &token.kind {
            TokenKind::Placeholder(_) => return Shape::Literal,
            TokenKind::Word(word) if word.keyword == Keyword::NULL => return Shape::Literal,
            kind if is_literal(kind) => return Shape::Literal,
            _ => {}
        },
        [sign, number]
            if matches!(sign.kind, TokenKind::Minus | TokenKind::Plus)
                && matches!(number.kind, TokenKind::Number(..)) =>
        {
            return Shape::Literal
        }
        _ => {}
    }

    let wildcard = expression.last().is_some_and(|t| t.kind == TokenKind::Mul);
    let path = if wildcard {
        match expression.len().checked_sub(2).map(|i| &expression[i].kind) {
            Some(TokenKind::Period) => &expression[..expression.len() - 2],
            _ => return Shape::Complex,
        }
    } else {
        expression
    };

    let Some(parts) = dotted_parts(path) else {
        return Shape::Complex;
    };
    if wildcard {
        Shape::Wildcard(Some(parts.join(".")))
    } else {
        Shape::Column(parts)
    }
}

/// `word ( . word )*` with quoting stripped
fn dotted_parts(tokens: &[Token]) -> Option<Vec<String>> {
    if tokens.len() % 2 == 0 {
        return None;
    }
    let mut parts = Vec::with_capacity(tokens.len() / 2 + 1);
    for (i, token) in tokens.iter().enumerate() {
        if i % 2 == 1 {
            if token.kind != TokenKind::Period {
                return None;
            }
            continue;
        }
        let word = token.word()?;
        if is_reserved(word) {
            return None;
        }
        parts.push(word.value.clone());
    }
    Some(parts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::lexer::tokenize;
    use sqlsem_core::{PenaltyTable, SeverityThreshold};

    fn parse(list: &str) -> (Projection, Vec<Diagnostic>) {
        let penalties = PenaltyTable::default();
        let severity = SeverityThreshold::default();
        let mut tracker = ConfidenceTracker::new(&penalties, &severity);
        let projection = parse_projection(&tokenize(list), list, 0, &mut tracker);
        (projection, tracker.into_diagnostics())
    }

    fn summary(projection: &Projection) -> Vec<(&str, Option<&str>, Option<&str>)> {
        projection
            .columns
            .iter()
            .map(|c| (c.expression.as_str(), c.alias.as_deref(), c.table_hint.as_deref()))
            .collect()
    }

    #[test]
    fn alias_capture() {
        let (projection, diagnostics) = parse("c.CategoryID AS Expr1, c.CategoryName");
        assert_eq!(
            summary(&projection),
            vec![
                ("c.CategoryID", Some("Expr1"), Some("c")),
                ("c.CategoryName", None, Some("c")),
            ]
        );
        assert_eq!(projection.columns[1].column_name.as_deref(), Some("CategoryName"));
        assert_eq!(projection.columns[1].ordinal, 1);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn bare_alias_after_expression() {
        let (projection, _) = parse("p.Name ProductName, COUNT(*) cnt, CASE WHEN a = 1 THEN 'x' END flag");
        assert_eq!(projection.columns[0].alias.as_deref(), Some("ProductName"));
        assert_eq!(projection.columns[1].expression, "COUNT(*)");
        assert_eq!(projection.columns[1].alias.as_deref(), Some("cnt"));
        assert_eq!(projection.columns[2].alias.as_deref(), Some("flag"));
    }

    #[test]
    fn wildcards() {
        let (projection, diagnostics) = parse("*, o.*");
        assert_eq!(summary(&projection), vec![("*", None, None), ("o.*", None, Some("o"))]);
        assert!(projection.columns.iter().all(|c| c.is_wildcard()));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn nested_commas_stay_together() {
        let (projection, _) = parse("COALESCE(a.x, b.x, 'n,a') AS x, CONCAT(a, ',', b)");
        assert_eq!(projection.columns.len(), 2);
        assert_eq!(projection.columns[0].expression, "COALESCE(a.x, b.x, 'n,a')");
    }

    #[test]
    fn distinct_and_top() {
        let (projection, _) = parse("DISTINCT TOP (10) PERCENT WITH TIES a, b");
        assert!(projection.distinct);
        assert_eq!(summary(&projection), vec![("a", None, None), ("b", None, None)]);

        let (projection, _) = parse("TOP 5 a");
        assert!(!projection.distinct);
        assert_eq!(projection.columns[0].expression, "a");
    }

    #[test]
    fn tsql_alias_forms() {
        let (projection, _) = parse("Total = o.Qty * o.Price, o.Name AS 'Product Name', [Order Date] = o.Date");
        assert_eq!(projection.columns[0].alias.as_deref(), Some("Total"));
        assert_eq!(projection.columns[0].expression, "o.Qty * o.Price");
        assert_eq!(projection.columns[1].alias.as_deref(), Some("Product Name"));
        assert_eq!(projection.columns[2].alias.as_deref(), Some("Order Date"));
        assert_eq!(projection.columns[2].table_hint.as_deref(), Some("o"));
    }

    #[test]
    fn bracketed_columns() {
        let (projection, _) = parse("[p].[Unit Price] AS [Price]");
        let column = &projection.columns[0];
        assert_eq!(column.expression, "[p].[Unit Price]");
        assert_eq!(column.table_hint.as_deref(), Some("p"));
        assert_eq!(column.column_name.as_deref(), Some("Unit Price"));
        assert_eq!(column.alias.as_deref(), Some("Price"));
    }

    #[test]
    fn three_part_column_hint() {
        let (projection, _) = parse("dbo.Products.Name");
        assert_eq!(projection.columns[0].table_hint.as_deref(), Some("dbo.Products"));
        assert_eq!(projection.columns[0].column_name.as_deref(), Some("Name"));
    }

    #[test]
    fn complex_and_literal_expressions() {
        let (projection, diagnostics) = parse("1, 'x', NULL, -1, UPPER(p.Name), a + b");
        assert_eq!(projection.columns.len(), 6);
        let complex: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::SqlComplexColumn)
            .map(|d| d.element)
            .collect();
        assert_eq!(complex, vec![Some(ElementRef::Column(4)), Some(ElementRef::Column(5))]);
        assert!(projection.columns[4].table_hint.is_none());
    }

    #[test]
    fn keyword_operands_are_not_aliases() {
        let (projection, _) = parse("a AND b");
        assert_eq!(projection.columns[0].alias, None);
    }

    #[test]
    fn empty_list_and_empty_entries() {
        let (projection, diagnostics) = parse("");
        assert!(projection.columns.is_empty());
        assert_eq!(diagnostics[0].code, DiagnosticCode::SqlUnparsableClause);

        let (projection, diagnostics) = parse("a, , b");
        assert_eq!(summary(&projection), vec![("a", None, None), ("b", None, None)]);
        assert_eq!(projection.columns[1].ordinal, 1);
        assert_eq!(diagnostics.len(), 1);
    }
}
