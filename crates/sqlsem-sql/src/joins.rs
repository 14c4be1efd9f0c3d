//! Join graph construction
//!
//! Walks the FROM / JOIN / ON / USING clauses in source order, resolving each
//! table designator and pairing it with the reference immediately before it.

use sqlsem_core::{
    ConditionPair, Diagnostic, DiagnosticCode, ElementRef, JoinClause, JoinKind, Severity,
    TableReference,
};

use crate::confidence::ConfidenceTracker;
use crate::lexer::{
    is_reserved, matching_paren, span_of, split_top_level_commas, text_of, Keyword, Token, TokenKind,
};
use crate::resolver::{resolve_table, ResolvedTable};
use crate::segmenter::{Clause, ClauseKind};

/// Tables in appearance order and the joins between them
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JoinGraph {
    pub tables: Vec<TableReference>,
    pub joins: Vec<JoinClause>,
}

/// Map join qualifier words to a join kind; `None` for an invalid combination
pub fn join_kind(qualifiers: &[String], default: JoinKind) -> Option<JoinKind> {
    let words: Vec<&str> = qualifiers.iter().map(String::as_str).collect();
    match words.as_slice() {
        [] => Some(default),
        ["INNER"] => Some(JoinKind::Inner),
        ["LEFT"] | ["LEFT", "OUTER"] => Some(JoinKind::Left),
        ["RIGHT"] | ["RIGHT", "OUTER"] => Some(JoinKind::Right),
        ["FULL"] | ["FULL", "OUTER"] => Some(JoinKind::Full),
        ["CROSS"] => Some(JoinKind::Cross),
        _ => None,
    }
}

/// Build the join graph from segmented clauses
pub fn build_join_graph(
    clauses: &[Clause],
    tokens: &[Token],
    src: &str,
    default_kind: JoinKind,
    tracker: &mut ConfidenceTracker<'_>,
) -> JoinGraph {
    let mut builder = GraphBuilder {
        tokens,
        src,
        default_kind,
        tracker,
        graph: JoinGraph::default(),
        pending: None,
        skip_condition: false,
    };

    for (index, clause) in clauses.iter().enumerate() {
        match clause.kind {
            ClauseKind::On | ClauseKind::Using => builder.condition(index, clause),
            kind => {
                builder.finish_pending();
                match kind {
                    ClauseKind::From => builder.from(index, clause),
                    ClauseKind::Join => builder.join(index, clause),
                    _ => builder.skip_condition = false,
                }
            }
        }
    }
    builder.finish_pending();

    builder.graph
}

struct GraphBuilder<'a, 't> {
    tokens: &'a [Token],
    src: &'a str,
    default_kind: JoinKind,
    tracker: &'a mut ConfidenceTracker<'t>,
    graph: JoinGraph,

    /// Join still waiting for its ON / USING
    pending: Option<usize>,

    /// The last JOIN failed to resolve, so its condition is dropped quietly
    skip_condition: bool,
}

fn warning(code: DiagnosticCode, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(code, Severity::Warn, message)
}

fn info(code: DiagnosticCode, message: impl Into<String>) -> Diagnostic {
    Diagnostic::new(code, Severity::Info, message)
}

impl GraphBuilder<'_, '_> {
    fn from(&mut self, index: usize, clause: &Clause) {
        self.skip_condition = false;
        let body = clause.body(self.tokens);
        if body.is_empty() {
            let diagnostic = warning(DiagnosticCode::SqlUnparsableClause, "FROM clause has no table")
                .with_element(ElementRef::Clause(index))
                .with_span(clause.span(self.tokens));
            self.tracker.report(diagnostic);
            return;
        }

        let mut items = split_top_level_commas(body).into_iter();
        if let Some(first) = items.next() {
            self.resolve(index, clause, first);
        }
        for item in items {
            self.comma_item(index, clause, item);
        }
    }

    /// A comma-separated item is an implicit cross join with the table before it
    fn comma_item(&mut self, index: usize, clause: &Clause, item: &[Token]) {
        let Some(right) = self.resolve(index, clause, item) else {
            return;
        };
        if right > 0 {
            self.graph.joins.push(JoinClause {
                left: right - 1,
                right,
                join_kind: JoinKind::Cross,
                condition_text: None,
                condition_pairs: Vec::new(),
            });
        }
    }

    fn join(&mut self, index: usize, clause: &Clause) {
        let join_kind = match join_kind(&clause.qualifiers, self.default_kind) {
            Some(kind) => kind,
            None => {
                let keyword = text_of(self.src, &self.tokens[clause.keyword.clone()]);
                let diagnostic = warning(
                    DiagnosticCode::SqlUnmatchedKeyword,
                    format!("'{}' is not a valid join keyword sequence", keyword),
                )
                .with_element(ElementRef::Clause(index))
                .with_span(clause.span(self.tokens));
                self.tracker.report(diagnostic);
                JoinKind::Unspecified
            }
        };

        // `JOIN b, c`: everything after the first comma is a comma join
        let mut items = split_top_level_commas(clause.body(self.tokens)).into_iter();
        self.join_target(index, clause, join_kind, items.next().unwrap_or_default());
        for item in items {
            self.comma_item(index, clause, item);
        }
    }

    fn join_target(&mut self, index: usize, clause: &Clause, join_kind: JoinKind, target: &[Token]) {
        let Some(right) = self.resolve(index, clause, target) else {
            self.skip_condition = true;
            return;
        };

        if right == 0 {
            let diagnostic = warning(DiagnosticCode::SqlUnmatchedKeyword, "JOIN without a preceding table")
                .with_element(ElementRef::Table(right))
                .with_span(clause.span(self.tokens));
            self.tracker.report(diagnostic);
            self.skip_condition = true;
            return;
        }

        self.skip_condition = false;
        self.graph.joins.push(JoinClause {
            left: right - 1,
            right,
            join_kind,
            condition_text: None,
            condition_pairs: Vec::new(),
        });
        self.pending = Some(self.graph.joins.len() - 1);
    }

    fn condition(&mut self, index: usize, clause: &Clause) {
        // `ON a.id = b.id, c`: the condition ends at the first comma
        let mut items = split_top_level_commas(clause.body(self.tokens)).into_iter();
        self.attach_condition(index, clause, items.next().unwrap_or_default());
        for item in items {
            self.comma_item(index, clause, item);
        }
    }

    fn attach_condition(&mut self, index: usize, clause: &Clause, body: &[Token]) {
        let Some(join_index) = self.pending.take() else {
            if !std::mem::take(&mut self.skip_condition) {
                let diagnostic = warning(
                    DiagnosticCode::SqlUnmatchedKeyword,
                    format!("{} without a preceding JOIN", clause.kind),
                )
                .with_element(ElementRef::Clause(index))
                .with_span(clause.span(self.tokens));
                self.tracker.report(diagnostic);
            }
            return;
        };

        if body.is_empty() {
            // Reported as a missing condition once the join is finished
            self.pending = Some(join_index);
            return;
        }

        let (text, pairs) = match clause.kind {
            ClauseKind::Using => {
                let keyword_and_body = self
                    .tokens
                    .get(clause.keyword.start..clause.body.start + body.len())
                    .unwrap_or(body);
                (
                    text_of(self.src, keyword_and_body).to_string(),
                    self.using_pairs(join_index, body),
                )
            }
            _ => (
                text_of(self.src, body).to_string(),
                self.condition_pairs(join_index, body),
            ),
        };

        let join = &mut self.graph.joins[join_index];
        join.condition_text = Some(text);
        join.condition_pairs = pairs;
    }

    /// Diagnose a join that never received a condition
    fn finish_pending(&mut self) {
        let Some(join_index) = self.pending.take() else {
            return;
        };
        let join = &self.graph.joins[join_index];
        if join.condition_text.is_some() {
            return;
        }

        let right = self.graph.tables[join.right].display_name();
        if join.join_kind.expects_condition() {
            let diagnostic = warning(
                DiagnosticCode::SqlJoinMissingCondition,
                format!("{} to '{}' has no ON or USING condition", join.join_kind, right),
            )
            .with_element(ElementRef::Join(join_index));
            self.tracker.report(diagnostic);
        } else {
            let diagnostic = info(
                DiagnosticCode::SqlJoinMissingCondition,
                format!("CROSS JOIN to '{}' has no condition", right),
            )
            .with_element(ElementRef::Join(join_index));
            self.tracker.note(diagnostic);
        }
    }

    /// Resolve one designator and add it to the table list
    fn resolve(&mut self, index: usize, clause: &Clause, item: &[Token]) -> Option<usize> {
        match resolve_table(item, self.src) {
            Ok(resolved) => self.add_table(resolved),
            Err(err) => {
                let span = span_of(item).or_else(|| clause.span(self.tokens));
                let diagnostic = warning(
                    DiagnosticCode::SqlUnparsableClause,
                    format!("{} clause skipped: {}", clause.kind, err),
                )
                .with_element(ElementRef::Clause(index))
                .with_span(span);
                self.tracker.report(diagnostic);
                None
            }
        }
    }

    fn add_table(&mut self, resolved: ResolvedTable) -> Option<usize> {
        let order = self.graph.tables.len();
        let table = TableReference::new(resolved.schema, resolved.name, resolved.alias, order);

        if let Some(existing) = self
            .graph
            .tables
            .iter()
            .find(|t| t.identity_key() == table.identity_key())
        {
            let diagnostic = warning(
                DiagnosticCode::SqlAliasCollision,
                format!("'{}' is referenced again with the same alias; the repeat is ignored", existing.display_name()),
            )
            .with_element(ElementRef::Table(existing.appearance_order));
            self.tracker.report(diagnostic);
            return None;
        }

        if let Some(alias) = &table.alias {
            if let Some(other) = self
                .graph
                .tables
                .iter()
                .find(|t| t.alias.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(alias)))
            {
                let diagnostic = warning(
                    DiagnosticCode::SqlAliasCollision,
                    format!("alias '{}' is already used by '{}'", alias, other.full_name()),
                )
                .with_element(ElementRef::Table(order));
                self.tracker.report(diagnostic);
            }
        }

        if resolved.multipart {
            let diagnostic = info(
                DiagnosticCode::SqlMultipartName,
                format!("'{}' has three or more name parts; kept whole as the table name", table.name),
            )
            .with_element(ElementRef::Table(order));
            self.tracker.note(diagnostic);
        }

        if let Some(span) = resolved.trailing {
            let diagnostic = warning(
                DiagnosticCode::SqlTrailingTokens,
                format!(
                    "unexpected '{}' after table '{}'",
                    span.slice(self.src).unwrap_or_default(),
                    table.display_name()
                ),
            )
            .with_element(ElementRef::Table(order))
            .with_span(span);
            self.tracker.report(diagnostic);
        }

        self.graph.tables.push(table);
        Some(order)
    }

    /// Equality pairs from an ON condition
    fn condition_pairs(&mut self, join_index: usize, body: &[Token]) -> Vec<ConditionPair> {
        let mut conjuncts = Vec::new();
        if split_conjuncts(body, &mut conjuncts) {
            let diagnostic = info(
                DiagnosticCode::SqlAmbiguousCondition,
                "join condition contains OR; pairs are taken from each operand",
            )
            .with_element(ElementRef::Join(join_index))
            .with_span(span_of(body));
            self.tracker.note(diagnostic);
        }

        let mut pairs = Vec::new();
        for conjunct in conjuncts {
            if let Some((left, right)) = equality(conjunct) {
                pairs.push(ConditionPair::new(text_of(self.src, left), text_of(self.src, right)));
                continue;
            }
            let diagnostic = info(
                DiagnosticCode::SqlAmbiguousCondition,
                format!("'{}' is not a simple column equality", text_of(self.src, conjunct)),
            )
            .with_element(ElementRef::Join(join_index))
            .with_span(span_of(conjunct));
            self.tracker.note(diagnostic);
        }
        pairs
    }

    /// `USING (a, b)` pairs, qualified by the left and right display names
    fn using_pairs(&mut self, join_index: usize, body: &[Token]) -> Vec<ConditionPair> {
        let join = &self.graph.joins[join_index];
        let left = self.graph.tables[join.left].display_name().to_string();
        let right = self.graph.tables[join.right].display_name().to_string();

        let inner = match (body.first().map(|t| &t.kind), matching_paren(body, 0)) {
            (Some(TokenKind::LParen), Some(close)) if close == body.len() - 1 => &body[1..close],
            _ => body,
        };

        let mut pairs = Vec::new();
        for column in split_top_level_commas(inner) {
            let name = text_of(self.src, column);
            if let [token] = column {
                if token.word().is_some() {
                    pairs.push(ConditionPair::new(format!("{}.{}", left, name), format!("{}.{}", right, name)));
                    continue;
                }
            }
            let diagnostic = info(
                DiagnosticCode::SqlAmbiguousCondition,
                format!("'{}' is not a column name", name),
            )
            .with_element(ElementRef::Join(join_index))
            .with_span(span_of(column));
            self.tracker.note(diagnostic);
        }
        pairs
    }
}

/// Split a condition on top-level AND / OR, unwrapping fully parenthesized
/// operands. Returns whether an OR was seen.
fn split_conjuncts<'t>(tokens: &'t [Token], out: &mut Vec<&'t [Token]>) -> bool {
    let mut has_or = false;
    let mut depth = 0usize;
    let mut in_between = false;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            _ if token.is_keyword(Keyword::BETWEEN) => in_between = true,
            _ if token.is_keyword(Keyword::AND) && in_between => in_between = false,
            _ if token.is_keyword(Keyword::AND) || token.is_keyword(Keyword::OR) => {
                has_or |= token.is_keyword(Keyword::OR);
                has_or |= push_operand(&tokens[start..i], out);
                start = i + 1;
            }
            _ => {}
        }
    }
    has_or |= push_operand(&tokens[start..], out);
    has_or
}

fn push_operand<'t>(part: &'t [Token], out: &mut Vec<&'t [Token]>) -> bool {
    match part.first().map(|t| &t.kind) {
        Some(TokenKind::LParen) if matching_paren(part, 0) == Some(part.len() - 1) => {
            split_conjuncts(&part[1..part.len() - 1], out)
        }
        _ => {
            out.push(part);
            false
        }
    }
}

/// `column_ref = column_ref` with exactly one top-level `=`
fn equality(tokens: &[Token]) -> Option<(&[Token], &[Token])> {
    let mut depth = 0usize;
    let mut position = None;
    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Eq if depth == 0 => {
                if position.replace(i).is_some() {
                    return None;
                }
            }
            _ => {}
        }
    }

    let (left, right) = tokens.split_at(position?);
    let right = &right[1..];
    (is_column_ref(left) && is_column_ref(right)).then_some((left, right))
}

/// `word ( . word )*`, where the first word is not a bare keyword like NULL
fn is_column_ref(tokens: &[Token]) -> bool {
    if tokens.len() % 2 == 0 {
        return false;
    }
    tokens.iter().enumerate().all(|(i, token)| {
        if i % 2 == 1 {
            return token.kind == TokenKind::Period;
        }
        match token.word() {
            Some(word) => !is_reserved(word),
            None => false,
        }
    })
}
