//! Statement-level productions: WITH, SELECT axes, FROM, WHERE.

use super::Parser;
use crate::ast::{AxisSpec, CubeSpec, MemberExpr, SelectStatement, WhereClause, WithItem};
use crate::diag::{suggestion, DiagKind, Diagnostic, DiagnosticBag};
use crate::lexer::Token;

impl<'a> Parser<'a> {
    /// Parse one MDX statement. Returns a tree whenever the skeleton
    /// (SELECT + FROM) could be salvaged, together with all diagnostics.
    pub(crate) fn parse_statement(&mut self, bag: &mut DiagnosticBag) -> Option<SelectStatement> {
        let start = self.cur_span();

        // Statements outside the supported subset fail fast with a
        // dedicated kind so callers can tell them from plain typos.
        if self.is_kw("CREATE") || self.is_kw("SCOPE") || self.is_kw("SESSION") {
            bag.push(
                Diagnostic::error(
                    DiagKind::UnsupportedConstruct,
                    format!("{} statements are not supported", self.peek()),
                    self.cur_span(),
                )
                .with_snippet_from(self.src),
            );
            return None;
        }
        if self.is_kw("DRILLTHROUGH") {
            bag.push(
                Diagnostic::error(
                    DiagKind::UnsupportedConstruct,
                    "DRILLTHROUGH is not supported; converting the inner SELECT only",
                    self.cur_span(),
                )
                .with_snippet_from(self.src),
            );
            self.advance();
            // Skip optional MAXROWS n
            if self.eat_kw("MAXROWS") {
                let _ = self.take_number();
            }
        }

        let mut with_items = Vec::new();
        if self.eat_kw("WITH") {
            self.parse_with_items(&mut with_items, bag);
        }

        if self.expect_kw("SELECT").is_err() {
            bag.push(
                self.err(format!("expected SELECT, got {}", self.peek()))
                    .with_suggestion(suggestion::MISSING_FROM),
            );
            return None;
        }

        let axes = self.parse_axes(bag);

        // The configured error cap aborts the parse with whatever was
        // salvaged so far.
        if bag.at_error_limit() {
            return Some(SelectStatement {
                with_items,
                axes,
                cube: CubeSpec::Named {
                    name: "Unknown".to_string(),
                    database: None,
                    span: self.cur_span(),
                },
                where_clause: None,
                span: start.merge(&self.cur_span()),
            });
        }

        let cube = match self.parse_from_clause(bag) {
            Ok(cube) => cube,
            Err(diag) => {
                bag.push(diag);
                CubeSpec::Named {
                    name: "Unknown".to_string(),
                    database: None,
                    span: self.cur_span(),
                }
            }
        };

        let where_clause = if self.eat_kw("WHERE") {
            match self.parse_where_clause() {
                Ok(w) => Some(w),
                Err(diag) => {
                    bag.push(diag.with_suggestion(suggestion::INVALID_WHERE));
                    None
                }
            }
        } else {
            None
        };

        if self.peek() == &Token::Semi {
            self.advance();
        }
        if !self.at_eof() && !self.has_timed_out() {
            bag.push(self.err(format!("unexpected trailing input: {}", self.peek())));
        }

        Some(SelectStatement {
            with_items,
            axes,
            cube,
            where_clause,
            span: start.merge(&self.cur_span()),
        })
    }

    // -- WITH section -------------------------------------------

    fn parse_with_items(&mut self, items: &mut Vec<WithItem>, bag: &mut DiagnosticBag) {
        loop {
            if let Err(diag) = self.check_deadline() {
                bag.push(diag);
                return;
            }
            if self.is_kw("MEMBER") {
                match self.parse_with_member() {
                    Ok(item) => items.push(item),
                    Err(diag) => {
                        bag.push(diag);
                        if bag.at_error_limit() {
                            return;
                        }
                        self.recover_to_boundary();
                    }
                }
            } else if self.is_kw("SET") {
                match self.parse_with_set() {
                    Ok(item) => items.push(item),
                    Err(diag) => {
                        bag.push(diag);
                        if bag.at_error_limit() {
                            return;
                        }
                        self.recover_to_boundary();
                    }
                }
            } else {
                return;
            }
            // Some frontends separate WITH items with commas.
            while self.peek() == &Token::Comma {
                self.advance();
            }
        }
    }

    fn parse_with_member(&mut self) -> Result<WithItem, Diagnostic> {
        let start = self.expect_kw("MEMBER")?;
        let path = self.parse_member_expr()?;
        self.expect_kw("AS")?;
        // Some tools quote the definition body; accept both forms.
        let expr = if let Token::Str(body) = self.peek().clone() {
            let span = self.advance().span;
            crate::ast::ValueExpr::Str { value: body, span }
        } else {
            self.parse_value_expr()?
        };

        let mut format_string = None;
        let mut solve_order = None;
        loop {
            let had_comma = self.peek() == &Token::Comma;
            let mark = self.mark();
            if had_comma {
                self.advance();
            }
            if self.is_kw("FORMAT_STRING") {
                self.advance();
                self.expect(Token::Eq, "'='")?;
                let (s, _) = self.take_string()?;
                format_string = Some(s);
            } else if self.is_kw("SOLVE_ORDER") {
                self.advance();
                self.expect(Token::Eq, "'='")?;
                let negative = self.peek() == &Token::Minus;
                if negative {
                    self.advance();
                }
                let (n, span) = self.take_number()?;
                let parsed: i64 = n
                    .parse()
                    .map_err(|_| Diagnostic::error(DiagKind::ParseError, format!("invalid SOLVE_ORDER value '{n}'"), span))?;
                solve_order = Some(if negative { -parsed } else { parsed });
            } else {
                self.rewind(mark);
                break;
            }
        }

        Ok(WithItem::Member {
            path,
            expr,
            format_string,
            solve_order,
            span: start.merge(&self.cur_span()),
        })
    }

    fn parse_with_set(&mut self) -> Result<WithItem, Diagnostic> {
        let start = self.expect_kw("SET")?;
        let (name, _) = self.take_name()?;
        self.expect_kw("AS")?;
        let set = self.parse_set_expr()?;
        Ok(WithItem::Set {
            name,
            set,
            span: start.merge(&self.cur_span()),
        })
    }

    // -- Axes ---------------------------------------------------

    fn parse_axes(&mut self, bag: &mut DiagnosticBag) -> Vec<AxisSpec> {
        let mut axes: Vec<AxisSpec> = Vec::new();
        loop {
            if let Err(diag) = self.check_deadline() {
                bag.push(diag);
                break;
            }
            match self.parse_axis_spec() {
                Ok(axis) => {
                    if axes.iter().any(|a| a.ordinal == axis.ordinal) {
                        bag.push(
                            Diagnostic::error(
                                DiagKind::ParseError,
                                format!("axis {} assigned more than once", axis.ordinal),
                                axis.span,
                            )
                            .with_suggestion(suggestion::DUPLICATE_AXIS)
                            .with_snippet_from(self.src),
                        );
                    } else {
                        axes.push(axis);
                    }
                }
                Err(diag) => {
                    bag.push(diag);
                    if bag.at_error_limit() {
                        break;
                    }
                    self.recover_to_boundary();
                    // recover_to_boundary stops before FROM/WHERE; a comma
                    // means another axis follows.
                    if self.is_kw("FROM") || self.is_kw("WHERE") || self.at_eof() {
                        break;
                    }
                    continue;
                }
            }
            if self.peek() == &Token::Comma {
                self.advance();
                continue;
            }
            break;
        }
        axes
    }

    fn parse_axis_spec(&mut self) -> Result<AxisSpec, Diagnostic> {
        let start = self.cur_span();
        let mut non_empty = false;
        if self.is_kw("NON") && self.is_kw_at(1, "EMPTY") {
            self.advance();
            self.advance();
            non_empty = true;
        }
        let set = self.parse_set_expr()?;
        if !self.is_kw("ON") {
            return Err(self
                .err(format!("expected ON after axis set, got {}", self.peek()))
                .with_suggestion(suggestion::MISSING_ON));
        }
        self.advance();
        let ordinal = self.parse_axis_id()?;
        Ok(AxisSpec {
            non_empty,
            set,
            ordinal,
            span: start.merge(&self.cur_span()),
        })
    }

    fn parse_axis_id(&mut self) -> Result<u32, Diagnostic> {
        const NAMED: &[(&str, u32)] = &[
            ("COLUMNS", 0),
            ("ROWS", 1),
            ("PAGES", 2),
            ("CHAPTERS", 3),
            ("SECTIONS", 4),
        ];
        for (name, ordinal) in NAMED {
            if self.is_kw(name) {
                self.advance();
                return Ok(*ordinal);
            }
        }
        if self.is_kw("AXIS") {
            self.advance();
            self.expect(Token::LParen, "'('")?;
            let (n, span) = self.take_number()?;
            self.expect(Token::RParen, "')'")?;
            return parse_axis_number(&n, span);
        }
        if let Token::Number(n) = self.peek().clone() {
            let span = self.advance().span;
            return parse_axis_number(&n, span);
        }
        Err(self.err(format!("expected axis identifier, got {}", self.peek())))
    }

    // -- FROM / cube --------------------------------------------

    fn parse_from_clause(&mut self, bag: &mut DiagnosticBag) -> Result<CubeSpec, Diagnostic> {
        if !self.is_kw("FROM") {
            return Err(self
                .err(format!("expected FROM, got {}", self.peek()))
                .with_suggestion(suggestion::MISSING_FROM));
        }
        self.advance();
        let start = self.cur_span();

        if self.peek() == &Token::LParen {
            self.advance();
            if !self.is_kw("SELECT") {
                return Err(self
                    .err("FROM ( … ) must contain a subselect starting with SELECT"));
            }
            let inner = self.parse_subselect(bag)?;
            self.expect(Token::RParen, "')'")?;
            return Ok(CubeSpec::Subselect(Box::new(inner)));
        }

        // `[db].[cube]` or `[cube]` or `cube`
        let (first, _) = self.take_name()?;
        let mut parts = vec![first];
        while self.peek() == &Token::Dot {
            self.advance();
            let (next, _) = self.take_name()?;
            parts.push(next);
        }
        let name = parts.pop().unwrap_or_default();
        let database = if parts.is_empty() {
            None
        } else {
            Some(parts.join("."))
        };
        Ok(CubeSpec::Named {
            name,
            database,
            span: start.merge(&self.cur_span()),
        })
    }

    /// Parse the inside of `FROM ( SELECT … )`. Errors inside the
    /// subselect are fatal for the FROM clause rather than recovered,
    /// keeping the outer statement's recovery points intact.
    fn parse_subselect(&mut self, bag: &mut DiagnosticBag) -> Result<SelectStatement, Diagnostic> {
        self.expect_kw("SELECT")?;
        let axes = self.parse_axes(bag);
        let cube = self.parse_from_clause(bag)?;
        let where_clause = if self.eat_kw("WHERE") {
            Some(self.parse_where_clause()?)
        } else {
            None
        };
        Ok(SelectStatement {
            with_items: Vec::new(),
            axes,
            cube,
            where_clause,
            span: self.cur_span(),
        })
    }

    // -- WHERE --------------------------------------------------

    fn parse_where_clause(&mut self) -> Result<WhereClause, Diagnostic> {
        let start = self.cur_span();

        if self.peek() == &Token::LParen {
            // Could be: empty, a tuple of members, or a parenthesized
            // logical expression. Prefer the tightest interpretation:
            // tuple first, logical as fallback.
            if self.peek_at(1) == &Token::RParen {
                self.advance();
                self.advance();
                return Ok(WhereClause::Empty(start.merge(&self.cur_span())));
            }
            let mark = self.mark();
            if let Ok(members) = self.try_parse_where_tuple() {
                return Ok(WhereClause::Tuple {
                    members,
                    span: start.merge(&self.cur_span()),
                });
            }
            self.rewind(mark);
            let expr = self.parse_logical_expr()?;
            return Ok(WhereClause::Logical {
                expr,
                span: start.merge(&self.cur_span()),
            });
        }

        // Bare member or logical expression.
        let expr = self.parse_logical_expr()?;
        if let crate::ast::LogicalExpr::Member(m) = expr {
            return Ok(WhereClause::Tuple {
                span: m.span,
                members: vec![m],
            });
        }
        Ok(WhereClause::Logical {
            expr,
            span: start.merge(&self.cur_span()),
        })
    }

    fn try_parse_where_tuple(&mut self) -> Result<Vec<MemberExpr>, Diagnostic> {
        self.expect(Token::LParen, "'('")?;
        let mut members = Vec::new();
        loop {
            let member = self.parse_member_expr()?;
            members.push(member);
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => {
                    self.advance();
                    return Ok(members);
                }
                other => {
                    return Err(self.err(format!("expected ',' or ')' in tuple, got {other}")))
                }
            }
        }
    }

}

fn parse_axis_number(text: &str, span: crate::lexer::Span) -> Result<u32, Diagnostic> {
    text.parse::<u32>().map_err(|_| {
        Diagnostic::error(
            DiagKind::ParseError,
            format!("invalid axis number '{text}'"),
            span,
        )
    })
}
