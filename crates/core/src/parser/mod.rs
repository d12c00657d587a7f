//! Recursive-descent MDX parser.
//!
//! Split by concern: `select` (statement, axes, cube, WHERE), `sets`
//! (set expressions and member paths), `expressions` (value and logical
//! expressions). The driver here owns token cursor plumbing, error
//! construction, timeout checking and recovery.
//!
//! The parser never unwinds across its public entry point: errors are
//! collected into the caller's [`DiagnosticBag`] and a partial tree is
//! returned whenever one can be salvaged. Recovery skips forward to the
//! next axis separator, WHERE, FROM or statement terminator, always
//! consuming at least one token.

mod expressions;
mod select;
mod sets;

use std::time::Instant;

use crate::ast::SelectStatement;
use crate::diag::{DiagKind, Diagnostic, DiagnosticBag};
use crate::lexer::{Span, Spanned, Token};

/// Function names the parser accepts without `allow_unknown_functions`.
/// Matched case-insensitively.
pub(crate) const KNOWN_FUNCTIONS: &[&str] = &[
    // Set functions
    "CROSSJOIN",
    "FILTER",
    "DESCENDANTS",
    "ANCESTORS",
    "MEMBERS",
    "CHILDREN",
    "UNION",
    "INTERSECT",
    "EXCEPT",
    "NONEMPTY",
    "NONEMPTYCROSSJOIN",
    "TOPCOUNT",
    "BOTTOMCOUNT",
    "HEAD",
    "TAIL",
    "ORDER",
    "HIERARCHIZE",
    // Aggregates
    "SUM",
    "AVG",
    "COUNT",
    "MIN",
    "MAX",
    "AGGREGATE",
    "DISTINCTCOUNT",
    // Scalar helpers
    "IIF",
    "COALESCEEMPTY",
    "DIVIDE",
    "ROUND",
    "ABS",
    "FORMAT",
    "CONCATENATE",
    // Time intelligence
    "PARALLELPERIOD",
    "PERIODSTODATE",
    "OPENINGPERIOD",
    "CLOSINGPERIOD",
    "YTD",
    "QTD",
    "MTD",
    "WTD",
    "PREVIOUSMONTH",
    "LASTPERIODS",
];

pub(crate) fn is_known_function(name: &str) -> bool {
    KNOWN_FUNCTIONS.iter().any(|f| f.eq_ignore_ascii_case(name))
}

pub(crate) struct Parser<'a> {
    tokens: &'a [Spanned],
    src: &'a str,
    pos: usize,
    pub(crate) allow_unknown_functions: bool,
    deadline: Option<Instant>,
    timed_out: bool,
}

/// Outcome of a parse: a tree when one could be built (possibly partial),
/// plus whatever diagnostics accrued in the bag.
pub fn parse(
    tokens: &[Spanned],
    src: &str,
    allow_unknown_functions: bool,
    deadline: Option<Instant>,
    bag: &mut DiagnosticBag,
) -> Option<SelectStatement> {
    let mut p = Parser {
        tokens,
        src,
        pos: 0,
        allow_unknown_functions,
        deadline,
        timed_out: false,
    };
    p.parse_statement(bag)
}

impl<'a> Parser<'a> {
    // -- Cursor helpers -----------------------------------------

    pub(crate) fn cur(&self) -> &Spanned {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek(&self) -> &Token {
        &self.cur().token
    }

    pub(crate) fn peek_at(&self, ahead: usize) -> &Token {
        let i = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[i].token
    }

    pub(crate) fn cur_span(&self) -> Span {
        self.cur().span
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), Token::Eof)
    }

    pub(crate) fn advance(&mut self) -> Spanned {
        let t = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        t
    }

    pub(crate) fn mark(&self) -> usize {
        self.pos
    }

    pub(crate) fn rewind(&mut self, mark: usize) {
        self.pos = mark;
    }

    // -- Keyword helpers (keywords are case-insensitive) --------

    pub(crate) fn is_kw(&self, kw: &str) -> bool {
        matches!(self.peek(), Token::Ident(w) if w.eq_ignore_ascii_case(kw))
    }

    pub(crate) fn is_kw_at(&self, ahead: usize, kw: &str) -> bool {
        matches!(self.peek_at(ahead), Token::Ident(w) if w.eq_ignore_ascii_case(kw))
    }

    pub(crate) fn eat_kw(&mut self, kw: &str) -> bool {
        if self.is_kw(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_kw(&mut self, kw: &str) -> Result<Span, Diagnostic> {
        if self.is_kw(kw) {
            Ok(self.advance().span)
        } else {
            Err(self.err(format!("expected '{kw}', got {}", self.peek())))
        }
    }

    pub(crate) fn expect(&mut self, token: Token, what: &str) -> Result<Span, Diagnostic> {
        if self.peek() == &token {
            Ok(self.advance().span)
        } else {
            Err(self.err(format!("expected {what}, got {}", self.peek())))
        }
    }

    /// Bracketed or plain identifier as a name.
    pub(crate) fn take_name(&mut self) -> Result<(String, Span), Diagnostic> {
        match self.peek().clone() {
            Token::Bracketed(s) => Ok((s, self.advance().span)),
            Token::Ident(s) => Ok((s, self.advance().span)),
            _ => Err(self
                .err(format!("expected identifier, got {}", self.peek()))
                .with_suggestion(crate::diag::suggestion::CHECK_MEMBER_PATH)),
        }
    }

    pub(crate) fn take_number(&mut self) -> Result<(String, Span), Diagnostic> {
        if let Token::Number(n) = self.peek().clone() {
            Ok((n, self.advance().span))
        } else {
            Err(self.err(format!("expected number, got {}", self.peek())))
        }
    }

    pub(crate) fn take_string(&mut self) -> Result<(String, Span), Diagnostic> {
        if let Token::Str(s) = self.peek().clone() {
            Ok((s, self.advance().span))
        } else {
            Err(self.err(format!("expected string literal, got {}", self.peek())))
        }
    }

    // -- Errors and timeout -------------------------------------

    pub(crate) fn err(&self, msg: impl Into<String>) -> Diagnostic {
        Diagnostic::error(DiagKind::ParseError, msg, self.cur_span()).with_snippet_from(self.src)
    }

    /// Check the parse deadline. Emitted at production entry points so
    /// overshoot is bounded by a single production.
    pub(crate) fn check_deadline(&mut self) -> Result<(), Diagnostic> {
        if self.timed_out {
            return Err(Diagnostic::error(
                DiagKind::ParseTimeout,
                "parse time budget exhausted",
                self.cur_span(),
            ));
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                self.timed_out = true;
                return Err(Diagnostic::error(
                    DiagKind::ParseTimeout,
                    "parse time budget exhausted",
                    self.cur_span(),
                ));
            }
        }
        Ok(())
    }

    pub(crate) fn has_timed_out(&self) -> bool {
        self.timed_out
    }

    // -- Recovery -----------------------------------------------

    /// Skip to the next plausible continuation point: a `,` at bracket
    /// depth zero, or `FROM` / `WHERE` / `ON` / `;` / end of input.
    /// Always consumes at least one token so recovery makes progress.
    pub(crate) fn recover_to_boundary(&mut self) {
        let mut depth: i32 = 0;
        let mut consumed = false;
        loop {
            match self.peek() {
                Token::Eof => break,
                Token::LParen | Token::LBrace => {
                    depth += 1;
                    self.advance();
                    consumed = true;
                }
                Token::RParen | Token::RBrace => {
                    if depth > 0 {
                        depth -= 1;
                    }
                    self.advance();
                    consumed = true;
                }
                Token::Comma if depth == 0 => {
                    if !consumed {
                        self.advance();
                    }
                    break;
                }
                Token::Semi => {
                    if !consumed {
                        self.advance();
                    }
                    break;
                }
                Token::Ident(w)
                    if depth == 0
                        && (w.eq_ignore_ascii_case("FROM")
                            || w.eq_ignore_ascii_case("WHERE")
                            || w.eq_ignore_ascii_case("ON")) =>
                {
                    if !consumed {
                        // Stuck directly on a boundary keyword that the
                        // caller could not use: step over it.
                        self.advance();
                    }
                    break;
                }
                _ => {
                    self.advance();
                    consumed = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;

    fn parse_src(src: &str) -> (Option<SelectStatement>, DiagnosticBag) {
        let mut bag = DiagnosticBag::new();
        let out = lexer::lex(src, &mut bag);
        let stmt = parse(&out.tokens, src, true, None, &mut bag);
        (stmt, bag)
    }

    #[test]
    fn minimal_query_parses() {
        let (stmt, bag) = parse_src("SELECT {[Measures].[Sales Amount]} ON 0 FROM [Adventure Works]");
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        let stmt = stmt.expect("tree");
        assert_eq!(stmt.axes.len(), 1);
        assert_eq!(stmt.axes[0].ordinal, 0);
    }

    #[test]
    fn messy_spacing_is_accepted() {
        let (stmt, bag) = parse_src(
            "SELECT{[Measures].[Sales Amount]}ON COLUMNS,\n   {[Product].[Category].Members}    ON    ROWS\nFROM    [Adventure Works]",
        );
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        let stmt = stmt.expect("tree");
        assert_eq!(stmt.axes.len(), 2);
        assert_eq!(stmt.axes[1].ordinal, 1);
    }

    #[test]
    fn missing_from_is_diagnosed_with_catalogue_suggestion() {
        let (_, bag) = parse_src("SELECT {[Measures].[X]} ON 0");
        assert!(bag.has_errors());
        assert!(bag
            .iter()
            .any(|d| d.suggestion.as_deref() == Some(crate::diag::suggestion::MISSING_FROM)));
    }

    #[test]
    fn duplicate_axis_is_diagnosed() {
        let (_, bag) = parse_src(
            "SELECT {[Measures].[X]} ON 0, {[Product].[Category].Members} ON 0 FROM [C]",
        );
        assert!(bag
            .iter()
            .any(|d| d.suggestion.as_deref() == Some(crate::diag::suggestion::DUPLICATE_AXIS)));
    }

    #[test]
    fn recovery_salvages_later_axes() {
        // First axis is broken (unclosed brace contents); the parser must
        // still see FROM and produce a tree.
        let (stmt, bag) = parse_src("SELECT {[A].[B] ON 0, {[Measures].[X]} ON 1 FROM [Cube]");
        assert!(bag.has_errors());
        assert!(stmt.is_some());
    }

    #[test]
    fn where_tuple_parses() {
        let (stmt, bag) =
            parse_src("SELECT {[Measures].[X]} ON 0 FROM [C] WHERE ([Date].[Year].&[2023])");
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        let stmt = stmt.expect("tree");
        assert!(matches!(
            stmt.where_clause,
            Some(crate::ast::WhereClause::Tuple { .. })
        ));
    }

    #[test]
    fn empty_where_parses_as_empty() {
        let (stmt, bag) = parse_src("SELECT {[Measures].[X]} ON 0 FROM [C] WHERE ()");
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert!(matches!(
            stmt.expect("tree").where_clause,
            Some(crate::ast::WhereClause::Empty(_))
        ));
    }

    #[test]
    fn with_member_parses() {
        let (stmt, bag) = parse_src(
            "WITH MEMBER [Measures].[Avg Price] AS [Measures].[Sales] / [Measures].[Qty] \
             SELECT {[Measures].[Avg Price]} ON 0 FROM [C]",
        );
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert_eq!(stmt.expect("tree").with_items.len(), 1);
    }

    #[test]
    fn drillthrough_is_unsupported() {
        let (_, bag) = parse_src("DRILLTHROUGH SELECT {[Measures].[X]} ON 0 FROM [C]");
        assert!(bag
            .iter()
            .any(|d| d.kind == DiagKind::UnsupportedConstruct));
    }

    #[test]
    fn every_recovery_step_consumes_tokens() {
        // Pathological garbage: the parser must terminate.
        let (_, bag) = parse_src("SELECT } } } , , ON ON { FROM");
        assert!(bag.has_errors());
    }

    #[test]
    fn axis_names_map_to_ordinals() {
        let (stmt, _) = parse_src(
            "SELECT {[Measures].[M]} ON COLUMNS, {[A].[B].Members} ON ROWS, \
             {[C].[D].Members} ON PAGES, {[E].[F].Members} ON CHAPTERS, \
             {[G].[H].Members} ON SECTIONS FROM [Cube]",
        );
        let stmt = stmt.expect("tree");
        let ordinals: Vec<u32> = stmt.axes.iter().map(|a| a.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn axis_function_form() {
        let (stmt, bag) = parse_src("SELECT {[Measures].[M]} ON AXIS(0) FROM [Cube]");
        assert!(bag.is_empty(), "diagnostics: {:?}", bag.as_slice());
        assert_eq!(stmt.expect("tree").axes[0].ordinal, 0);
    }
}
