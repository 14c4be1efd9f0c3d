//! Token stream over SQL command text
//!
//! Tokens come from the sqlparser tokenizer with a T-SQL flavoured dialect
//! that also accepts backtick identifiers. Whitespace and comments are
//! dropped; every remaining token carries its byte span in the source so
//! later stages can slice verbatim text.
//!
//! Tokenizing never fails from the caller's point of view. When the
//! tokenizer rejects the input because a quoted span or block comment is
//! left open, the span is closed and the text tokenized again.

use sqlparser::dialect::Dialect;
use sqlparser::tokenizer::{Location, TokenWithSpan, Tokenizer};
use sqlsem_core::Span;

pub use sqlparser::keywords::Keyword;
pub use sqlparser::tokenizer::{Token as TokenKind, Word};

/// Identifier rules of SQL Server plus backtick quoting
#[derive(Debug, Default)]
pub struct QueryDialect;

impl Dialect for QueryDialect {
    fn is_delimited_identifier_start(&self, ch: char) -> bool {
        matches!(ch, '"' | '[' | '`')
    }

    fn is_identifier_start(&self, ch: char) -> bool {
        ch.is_alphabetic() || matches!(ch, '_' | '#' | '@')
    }

    fn is_identifier_part(&self, ch: char) -> bool {
        ch.is_alphabetic() || ch.is_ascii_digit() || matches!(ch, '@' | '$' | '#' | '_')
    }
}

/// Quoting style of an identifier or literal span
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    /// `[name]`
    Bracket,
    /// `` `name` ``
    Backtick,
    /// `"name"`
    Double,
    /// `'text'`
    Single,
}

impl QuoteStyle {
    pub fn closer(&self) -> char {
        match self {
            Self::Bracket => ']',
            Self::Backtick => '`',
            Self::Double => '"',
            Self::Single => '\'',
        }
    }

    fn closed_by(closer: &str) -> Option<Self> {
        match closer {
            "]" => Some(Self::Bracket),
            "`" => Some(Self::Backtick),
            "\"" => Some(Self::Double),
            "'" => Some(Self::Single),
            _ => None,
        }
    }
}

/// Appended in turn when the tokenizer hits end of input inside a span
const CLOSERS: [&str; 5] = ["]", "'", "\"", "`", "*/"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn word(&self) -> Option<&Word> {
        match &self.kind {
            TokenKind::Word(word) => Some(word),
            _ => None,
        }
    }

    /// Bare keyword match; quoted words always carry `Keyword::NoKeyword`
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.word().is_some_and(|w| w.keyword == keyword)
    }

    /// Case-insensitive match on a bare word with no `Keyword` variant
    pub fn is_word_ci(&self, value: &str) -> bool {
        self.word()
            .is_some_and(|w| w.quote_style.is_none() && w.value.eq_ignore_ascii_case(value))
    }
}

/// Tokens of one input and how tokenizing went
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexed {
    /// Non-whitespace tokens with spans in the source text
    pub tokens: Vec<Token>,

    /// Quote style of a span left open at end of input, with the source offset of its token
    pub unterminated: Option<(QuoteStyle, usize)>,

    /// Tokenizer error when no closing attempt helped
    pub failure: Option<String>,
}

/// Tokenize SQL text, dropping whitespace and comments
pub fn tokenize(sql: &str) -> Vec<Token> {
    lex(sql).tokens
}

/// Tokenize SQL text, closing a span left open at end of input
pub fn lex(sql: &str) -> Lexed {
    let dialect = QueryDialect;
    let error = match Tokenizer::new(&dialect, sql).tokenize_with_location() {
        Ok(tokens) => {
            return Lexed {
                tokens: spanned(sql, sql.len(), tokens),
                unterminated: None,
                failure: None,
            }
        }
        Err(err) => err,
    };

    for closer in CLOSERS {
        let patched = format!("{sql}{closer}");
        let Ok(tokens) = Tokenizer::new(&dialect, &patched).tokenize_with_location() else {
            continue;
        };
        tracing::debug!(closer, error = %error, "closed an unterminated span to tokenize");

        let tokens = spanned(&patched, sql.len(), tokens);
        let unterminated = QuoteStyle::closed_by(closer)
            .zip(tokens.last())
            .map(|(style, token)| (style, token.span.start));
        return Lexed {
            tokens,
            unterminated,
            failure: None,
        };
    }

    tracing::debug!(error = %error, "SQL text could not be tokenized");
    Lexed {
        tokens: Vec::new(),
        unterminated: None,
        failure: Some(error.to_string()),
    }
}

/// Convert tokenizer locations to byte spans clamped to `limit`
fn spanned(text: &str, limit: usize, tokens: Vec<TokenWithSpan>) -> Vec<Token> {
    let offsets = ByteOffsets::new(text);
    tokens
        .into_iter()
        .filter(|t| !matches!(t.token, TokenKind::Whitespace(_) | TokenKind::EOF))
        .map(|t| Token {
            span: Span::new(
                offsets.of(t.span.start).min(limit),
                offsets.of(t.span.end).min(limit),
            ),
            kind: t.token,
        })
        .filter(|t| !t.span.is_empty())
        .collect()
}

/// Maps 1-based line/column locations (columns count chars) to byte offsets
struct ByteOffsets {
    chars: Vec<usize>,
    line_starts: Vec<usize>,
    len: usize,
}

impl ByteOffsets {
    fn new(text: &str) -> Self {
        let mut chars = Vec::with_capacity(text.len() + 1);
        let mut line_starts = vec![0];
        for (index, (offset, ch)) in text.char_indices().enumerate() {
            chars.push(offset);
            if ch == '\n' {
                line_starts.push(index + 1);
            }
        }
        chars.push(text.len());
        Self {
            chars,
            line_starts,
            len: text.len(),
        }
    }

    fn of(&self, location: Location) -> usize {
        let line = (location.line as usize).saturating_sub(1);
        let column = (location.column as usize).saturating_sub(1);
        self.line_starts
            .get(line)
            .and_then(|start| self.chars.get(start + column))
            .copied()
            .unwrap_or(self.len)
    }
}

/// Verbatim text covered by a run of tokens
pub fn text_of<'a>(src: &'a str, tokens: &[Token]) -> &'a str {
    match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => src.get(first.span.start..last.span.end).unwrap_or(""),
        _ => "",
    }
}

/// Span covering a run of tokens
pub fn span_of(tokens: &[Token]) -> Option<Span> {
    Some(Span::new(tokens.first()?.span.start, tokens.last()?.span.end))
}

/// Index of the `)` matching the `(` at `open`, if balanced
pub fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Split tokens on commas outside parentheses
pub fn split_top_level_commas(tokens: &[Token]) -> Vec<&[Token]> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, token) in tokens.iter().enumerate() {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => depth = depth.saturating_sub(1),
            TokenKind::Comma if depth == 0 => {
                items.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    items.push(&tokens[start..]);
    items
}

/// Bare words that cannot be an AS-less alias
///
/// Join qualifiers (`LEFT`, `INNER`, ...) are absent on purpose: they only
/// act as keywords directly before `JOIN`.
pub fn is_reserved(word: &Word) -> bool {
    if word.quote_style.is_some() {
        return false;
    }
    matches!(
        word.keyword,
        Keyword::SELECT
            | Keyword::FROM
            | Keyword::WHERE
            | Keyword::JOIN
            | Keyword::ON
            | Keyword::USING
            | Keyword::AS
            | Keyword::AND
            | Keyword::OR
            | Keyword::NOT
            | Keyword::GROUP
            | Keyword::ORDER
            | Keyword::BY
            | Keyword::HAVING
            | Keyword::UNION
            | Keyword::EXCEPT
            | Keyword::INTERSECT
            | Keyword::INTO
            | Keyword::WITH
            | Keyword::SET
            | Keyword::VALUES
            | Keyword::LIMIT
            | Keyword::OFFSET
            | Keyword::FETCH
            | Keyword::OPTION
            | Keyword::FOR
            | Keyword::CASE
            | Keyword::WHEN
            | Keyword::THEN
            | Keyword::ELSE
            | Keyword::END
            | Keyword::NULL
            | Keyword::IS
            | Keyword::IN
            | Keyword::LIKE
            | Keyword::BETWEEN
            | Keyword::DISTINCT
            | Keyword::ALL
            | Keyword::TOP
            | Keyword::APPLY
            | Keyword::WINDOW
            | Keyword::QUALIFY
            | Keyword::OVER
            | Keyword::ASC
            | Keyword::DESC
            | Keyword::EXISTS
    ) || word.value.eq_ignore_ascii_case("MINUS")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn words(src: &str) -> Vec<String> {
        tokenize(src)
            .into_iter()
            .filter_map(|t| t.word().map(|w| w.value.clone()))
            .collect()
    }

    #[test]
    fn bracketed_and_plain_identifiers() {
        let tokens = tokenize("[dbo].[Order Details] od");
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens[0].word().unwrap().value, "dbo");
        assert_eq!(tokens[0].word().unwrap().quote_style, Some('['));
        assert_eq!(tokens[1].kind, TokenKind::Period);
        assert_eq!(tokens[2].word().unwrap().value, "Order Details");
        assert_eq!(tokens[3].word().unwrap().quote_style, None);
        assert_eq!(tokens[2].span, Span::new(6, 21));
    }

    #[test]
    fn backtick_and_double_quotes() {
        assert_eq!(words("`db`.\"t\""), vec!["db", "t"]);
        let tokens = tokenize("`db`.\"t\"");
        assert_eq!(tokens[0].word().unwrap().quote_style, Some('`'));
        assert_eq!(tokens[2].word().unwrap().quote_style, Some('"'));
    }

    #[test]
    fn quoted_words_are_not_keywords() {
        let tokens = tokenize("[FROM] from");
        assert!(!tokens[0].is_keyword(Keyword::FROM));
        assert!(tokens[1].is_keyword(Keyword::FROM));
        assert!(!is_reserved(tokens[0].word().unwrap()));
        assert!(is_reserved(tokens[1].word().unwrap()));
    }

    #[test]
    fn words_without_a_keyword_variant() {
        let tokens = tokenize("minus [MINUS]");
        assert!(tokens[0].is_word_ci("MINUS"));
        assert!(!tokens[1].is_word_ci("MINUS"));
        assert!(is_reserved(tokens[0].word().unwrap()));
    }

    #[test]
    fn string_literals_and_escapes() {
        let tokens = tokenize("'it''s', N'x'");
        assert_eq!(tokens[0].kind, TokenKind::SingleQuotedString("it's".into()));
        assert_eq!(tokens[1].kind, TokenKind::Comma);
        assert_eq!(tokens[2].kind, TokenKind::NationalStringLiteral("x".into()));
        assert_eq!(tokens[2].span, Span::new(9, 13));
    }

    #[test]
    fn operators_and_punctuation() {
        let tokens = tokenize("a.b<>c.d AND x>=1 OR y = ?");
        assert_eq!(tokens[3].kind, TokenKind::Neq);
        assert!(tokens.iter().any(|t| t.kind == TokenKind::GtEq));
        assert!(tokens.iter().any(|t| t.kind == TokenKind::Eq));
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Placeholder("?".into()));
    }

    #[test]
    fn variables_and_temp_tables() {
        assert_eq!(words("@batch #staging"), vec!["@batch", "#staging"]);
    }

    #[test]
    fn numbers() {
        let tokens = tokenize("1.5 * 2");
        assert!(matches!(tokens[0].kind, TokenKind::Number(ref n, _) if n == "1.5"));
        assert_eq!(tokens[1].kind, TokenKind::Mul);
        assert!(matches!(tokens[2].kind, TokenKind::Number(ref n, _) if n == "2"));
    }

    #[test]
    fn comments_are_dropped() {
        let src = "a -- note\n/* block */ b";
        let tokens = tokenize(src);
        assert_eq!(words(src), vec!["a", "b"]);
        assert_eq!(tokens[1].span.slice(src), Some("b"));
    }

    #[test]
    fn spans_are_byte_offsets_across_lines() {
        let src = "SELECT 'Caf\u{e9}' AS n\r\nFROM [T\u{e9}st] t";
        let tokens = tokenize(src);
        let slices: Vec<_> = tokens.iter().map(|t| t.span.slice(src).unwrap()).collect();
        assert_eq!(slices, vec!["SELECT", "'Caf\u{e9}'", "AS", "n", "FROM", "[T\u{e9}st]", "t"]);
    }

    #[test]
    fn unterminated_bracket_is_closed() {
        let lexed = lex("FROM [dbo");
        assert_eq!(lexed.tokens[1].word().unwrap().value, "dbo");
        assert_eq!(lexed.tokens[1].span, Span::new(5, 9));
        assert_eq!(lexed.unterminated, Some((QuoteStyle::Bracket, 5)));
        assert_eq!(lexed.failure, None);
    }

    #[test]
    fn unterminated_string_is_closed() {
        let lexed = lex("WHERE a = 'abc");
        assert_eq!(lexed.tokens[3].kind, TokenKind::SingleQuotedString("abc".into()));
        assert_eq!(lexed.unterminated, Some((QuoteStyle::Single, 10)));
    }

    #[test]
    fn unterminated_block_comment_is_dropped() {
        let lexed = lex("SELECT a /* never closed");
        assert_eq!(lexed.tokens.len(), 2);
        assert_eq!(lexed.unterminated, None);
        assert_eq!(lexed.failure, None);
    }

    #[test]
    fn comma_split_respects_parens() {
        let tokens = tokenize("a, COALESCE(b, c), d");
        let items = split_top_level_commas(&tokens);
        assert_eq!(items.len(), 3);
        assert_eq!(text_of("a, COALESCE(b, c), d", items[1]), "COALESCE(b, c)");
    }

    #[test]
    fn paren_matching() {
        let tokens = tokenize("(a (b) c) d");
        assert_eq!(matching_paren(&tokens, 0), Some(5));
        assert_eq!(matching_paren(&tokens, 2), Some(4));
        assert_eq!(matching_paren(&tokenize("(a"), 0), None);
    }
}
