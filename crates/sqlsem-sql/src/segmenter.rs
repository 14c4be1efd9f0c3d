//! Clause segmentation
//!
//! Splits a token stream into top-level clauses (`SELECT`, `FROM`, the
//! `JOIN` family, `ON`, `WHERE`, ...). Keywords are only recognised outside
//! parentheses, and join qualifiers only count when they sit directly in
//! front of `JOIN`, so a column or alias called `left` is never mistaken for
//! part of a join keyword.

use std::ops::Range;

use sqlsem_core::{Diagnostic, DiagnosticCode, Severity, Span};

use crate::confidence::ConfidenceTracker;
use crate::lexer::{span_of, text_of, Keyword, Token, TokenKind};

/// Kind of a top-level clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    Select,
    Into,
    From,
    /// Any `[qualifiers] JOIN`
    Join,
    On,
    Using,
    Where,
    GroupBy,
    Having,
    OrderBy,
    /// `UNION`, `EXCEPT`, `INTERSECT`, `MINUS`
    SetOperation,
    /// `CROSS APPLY` / `OUTER APPLY`
    Apply,
    /// `LIMIT`, `OFFSET`, `FETCH`, `OPTION`, `FOR`, `WINDOW`, `QUALIFY`
    Trailer,
}

impl ClauseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Into => "INTO",
            Self::From => "FROM",
            Self::Join => "JOIN",
            Self::On => "ON",
            Self::Using => "USING",
            Self::Where => "WHERE",
            Self::GroupBy => "GROUP BY",
            Self::Having => "HAVING",
            Self::OrderBy => "ORDER BY",
            Self::SetOperation => "set operation",
            Self::Apply => "APPLY",
            Self::Trailer => "trailer",
        }
    }
}

impl std::fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One clause: its keyword tokens and the body tokens up to the next clause
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub kind: ClauseKind,

    /// Upper-cased words in front of `JOIN` / `APPLY`
    pub qualifiers: Vec<String>,

    /// Token indices of the keyword sequence
    pub keyword: Range<usize>,

    /// Token indices of the clause body
    pub body: Range<usize>,
}

impl Clause {
    pub fn body<'t>(&self, tokens: &'t [Token]) -> &'t [Token] {
        tokens.get(self.body.clone()).unwrap_or(&[])
    }

    /// Keyword and body together
    pub fn tokens<'t>(&self, tokens: &'t [Token]) -> &'t [Token] {
        tokens.get(self.keyword.start..self.body.end).unwrap_or(&[])
    }

    /// Verbatim body text
    pub fn body_text<'s>(&self, tokens: &[Token], src: &'s str) -> &'s str {
        text_of(src, self.body(tokens))
    }

    /// Span of keyword and body
    pub fn span(&self, tokens: &[Token]) -> Option<Span> {
        span_of(self.tokens(tokens))
    }
}

const JOIN_QUALIFIERS: &[Keyword] = &[
    Keyword::INNER,
    Keyword::LEFT,
    Keyword::RIGHT,
    Keyword::FULL,
    Keyword::OUTER,
    Keyword::CROSS,
];

fn is_join_qualifier(token: &Token) -> bool {
    JOIN_QUALIFIERS.iter().any(|q| token.is_keyword(*q))
}

/// Clause keyword starting at `i`: kind, qualifiers, and keyword length in tokens
fn boundary_at(tokens: &[Token], i: usize) -> Option<(ClauseKind, Vec<String>, usize)> {
    let token = tokens.get(i)?;
    let word = token.word()?;
    let next_is = |offset: usize, keyword: Keyword| tokens.get(i + offset).is_some_and(|t| t.is_keyword(keyword));

    let single = |kind: ClauseKind| -> Option<(ClauseKind, Vec<String>, usize)> { Some((kind, Vec::new(), 1)) };
    match word.keyword {
        Keyword::SELECT => single(ClauseKind::Select),
        Keyword::INTO => single(ClauseKind::Into),
        Keyword::FROM => single(ClauseKind::From),
        Keyword::JOIN => single(ClauseKind::Join),
        Keyword::ON => single(ClauseKind::On),
        Keyword::USING => single(ClauseKind::Using),
        Keyword::WHERE => single(ClauseKind::Where),
        Keyword::HAVING => single(ClauseKind::Having),
        Keyword::GROUP if next_is(1, Keyword::BY) => Some((ClauseKind::GroupBy, Vec::new(), 2)),
        Keyword::ORDER if next_is(1, Keyword::BY) => Some((ClauseKind::OrderBy, Vec::new(), 2)),
        Keyword::UNION | Keyword::EXCEPT | Keyword::INTERSECT => single(ClauseKind::SetOperation),
        Keyword::LIMIT
        | Keyword::OFFSET
        | Keyword::FETCH
        | Keyword::OPTION
        | Keyword::FOR
        | Keyword::WINDOW
        | Keyword::QUALIFY => single(ClauseKind::Trailer),
        _ if token.is_word_ci("MINUS") => single(ClauseKind::SetOperation),
        _ if is_join_qualifier(token) => {
            // `FROM t AS left JOIN u`: the word after AS is an alias
            if i > 0 && tokens[i - 1].is_keyword(Keyword::AS) {
                return None;
            }
            let mut j = i;
            let mut qualifiers = Vec::new();
            while let Some(token) = tokens.get(j).filter(|t| is_join_qualifier(t)) {
                qualifiers.push(token.word()?.value.to_ascii_uppercase());
                j += 1;
            }
            let terminal = tokens.get(j)?;
            if terminal.is_keyword(Keyword::JOIN) {
                Some((ClauseKind::Join, qualifiers, j - i + 1))
            } else if terminal.is_keyword(Keyword::APPLY) {
                Some((ClauseKind::Apply, qualifiers, j - i + 1))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn unsupported(message: impl Into<String>, span: Span) -> Diagnostic {
    Diagnostic::new(DiagnosticCode::SqlUnsupportedSyntax, Severity::Warn, message).with_span(span)
}

/// Segment tokens into top-level clauses in source order
pub fn segment(tokens: &[Token], tracker: &mut ConfidenceTracker<'_>) -> Vec<Clause> {
    let mut clauses: Vec<Clause> = Vec::new();
    let mut depth = 0usize;
    let mut end = tokens.len();

    let cte = tokens.first().is_some_and(|t| t.is_keyword(Keyword::WITH));
    if cte {
        tracker.report(unsupported(
            "common table expressions are not supported; only the main query is extracted",
            tokens[0].span,
        ));
    }

    let mut i = 0;
    while i < tokens.len() {
        let token = &tokens[i];
        match token.kind {
            TokenKind::LParen => {
                // CTE bodies before the main query are already covered above
                let in_cte_preamble = cte && clauses.is_empty();
                if !in_cte_preamble && tokens.get(i + 1).is_some_and(|t| t.is_keyword(Keyword::SELECT)) {
                    tracker.report(unsupported(
                        "subqueries are not supported; their tables are not extracted",
                        tokens[i + 1].span,
                    ));
                }
                depth += 1;
                i += 1;
                continue;
            }
            TokenKind::RParen => {
                depth = depth.saturating_sub(1);
                i += 1;
                continue;
            }
            TokenKind::SemiColon if depth == 0 => {
                end = i;
                if tokens[i + 1..].iter().any(|t| t.kind != TokenKind::SemiColon) {
                    tracker.report(unsupported(
                        "multiple statements; only the first is extracted",
                        token.span,
                    ));
                }
                break;
            }
            _ => {}
        }

        if depth > 0 {
            i += 1;
            continue;
        }

        let Some((kind, qualifiers, len)) = boundary_at(tokens, i) else {
            i += 1;
            continue;
        };

        if let Some(previous) = clauses.last_mut() {
            previous.body.end = i;
        }

        match kind {
            ClauseKind::SetOperation => {
                tracker.report(unsupported(
                    format!("{} is not supported; only the first query is extracted", token.word().map(|w| w.value.to_ascii_uppercase()).unwrap_or_default()),
                    token.span,
                ));
                end = i;
                break;
            }
            ClauseKind::Apply => {
                let span = span_of(&tokens[i..i + len]).unwrap_or(token.span);
                tracker.report(unsupported(
                    format!("{} APPLY is not supported", qualifiers.join(" ")),
                    span,
                ));
            }
            _ => {}
        }

        clauses.push(Clause {
            kind,
            qualifiers,
            keyword: i..i + len,
            body: i + len..tokens.len(),
        });
        i += len;
    }

    if let Some(last) = clauses.last_mut() {
        last.body.end = last.body.end.min(end);
    }

    for clause in &clauses {
        tracing::trace!(
            kind = %clause.kind,
            qualifiers = ?clause.qualifiers,
            tokens = clause.body.len(),
            "segmented clause"
        );
    }

    clauses
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use crate::lexer::tokenize;
    use sqlsem_core::{PenaltyTable, SeverityThreshold};

    fn run(sql: &str) -> (Vec<Clause>, Vec<Diagnostic>) {
        let penalties = PenaltyTable::default();
        let severity = SeverityThreshold::default();
        let mut tracker = ConfidenceTracker::new(&penalties, &severity);
        let tokens = tokenize(sql);
        let clauses = segment(&tokens, &mut tracker);
        (clauses, tracker.into_diagnostics())
    }

    fn shape(sql: &str) -> Vec<(ClauseKind, String)> {
        let tokens = tokenize(sql);
        run(sql)
            .0
            .iter()
            .map(|c| (c.kind, c.body_text(&tokens, sql).to_string()))
            .collect()
    }

    #[test]
    fn basic_select_join() {
        let sql = "SELECT p.Name FROM Products p INNER JOIN Categories c ON p.CategoryID = c.ID WHERE p.Active = 1";
        assert_eq!(
            shape(sql),
            vec![
                (ClauseKind::Select, "p.Name".to_string()),
                (ClauseKind::From, "Products p".to_string()),
                (ClauseKind::Join, "Categories c".to_string()),
                (ClauseKind::On, "p.CategoryID = c.ID".to_string()),
                (ClauseKind::Where, "p.Active = 1".to_string()),
            ]
        );
    }

    #[test]
    fn qualifiers_only_before_join() {
        let sql = "SELECT left FROM t AS left JOIN u ON t.a = u.a LEFT OUTER JOIN v ON u.b = v.b";
        let (clauses, diagnostics) = run(sql);
        let joins: Vec<_> = clauses.iter().filter(|c| c.kind == ClauseKind::Join).collect();
        assert_eq!(joins.len(), 2);
        assert!(joins[0].qualifiers.is_empty());
        assert_eq!(joins[1].qualifiers, vec!["LEFT", "OUTER"]);
        assert!(diagnostics.is_empty());

        let tokens = tokenize(sql);
        assert_eq!(clauses[1].body_text(&tokens, sql), "t AS left");
    }

    #[test]
    fn left_function_is_not_a_qualifier() {
        let kinds: Vec<_> = shape("SELECT LEFT(name, 3) FROM t").into_iter().map(|c| c.0).collect();
        assert_eq!(kinds, vec![ClauseKind::Select, ClauseKind::From]);
    }

    #[test]
    fn keywords_inside_parens_are_ignored() {
        let sql = "SELECT CAST(x AS INT), EXTRACT(YEAR FROM d) FROM t";
        assert_eq!(shape(sql).len(), 2);
    }

    #[test]
    fn group_and_order_by() {
        let kinds: Vec<_> = shape("SELECT a FROM t GROUP BY a HAVING COUNT(*) > 1 ORDER BY a")
            .into_iter()
            .map(|c| c.0)
            .collect();
        assert_eq!(
            kinds,
            vec![ClauseKind::Select, ClauseKind::From, ClauseKind::GroupBy, ClauseKind::Having, ClauseKind::OrderBy]
        );
    }

    #[test]
    fn set_operation_stops_segmentation() {
        let sql = "SELECT a FROM t UNION SELECT a FROM u";
        let (clauses, diagnostics) = run(sql);
        assert_eq!(clauses.len(), 2);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, DiagnosticCode::SqlUnsupportedSyntax);
    }

    #[test]
    fn subquery_reported() {
        let (_, diagnostics) = run("SELECT a FROM t WHERE a IN (SELECT b FROM u)");
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("subqueries"));
    }

    #[test]
    fn cte_reported_once_and_main_query_segmented() {
        let sql = "WITH x AS (SELECT a FROM t) SELECT a FROM x";
        let (clauses, diagnostics) = run(sql);
        assert_eq!(diagnostics.len(), 1);
        assert!(diagnostics[0].message.contains("common table expressions"));
        let kinds: Vec<_> = clauses.iter().map(|c| c.kind).collect();
        assert_eq!(kinds, vec![ClauseKind::Select, ClauseKind::From]);
    }

    #[test]
    fn apply_is_its_own_clause() {
        let (clauses, diagnostics) = run("SELECT a FROM t CROSS APPLY dbo.fn(t.id) f");
        assert_eq!(clauses[2].kind, ClauseKind::Apply);
        assert_eq!(clauses[2].qualifiers, vec!["CROSS"]);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn trailing_semicolon_is_fine() {
        let sql = "SELECT a FROM t;";
        let (clauses, diagnostics) = run(sql);
        let tokens = tokenize(sql);
        assert!(diagnostics.is_empty());
        assert_eq!(clauses[1].body_text(&tokens, sql), "t");
    }

    #[test]
    fn second_statement_reported() {
        let (clauses, diagnostics) = run("SELECT a FROM t; DELETE FROM u");
        assert_eq!(clauses.len(), 2);
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn quoted_keywords_are_identifiers() {
        let sql = "SELECT [from] FROM [where]";
        assert_eq!(
            shape(sql),
            vec![
                (ClauseKind::Select, "[from]".to_string()),
                (ClauseKind::From, "[where]".to_string()),
            ]
        );
    }
}
