//! Set expressions and member paths.

use super::Parser;
use crate::ast::{MemberExpr, MemberOp, SetCallArg, SetExpr};
use crate::diag::{suggestion, Diagnostic};
use crate::lexer::Token;

impl<'a> Parser<'a> {
    /// `set_expr := primary (('*' | '+') primary)*` with `*` building an
    /// implicit cross product and `+` a union.
    pub(crate) fn parse_set_expr(&mut self) -> Result<SetExpr, Diagnostic> {
        self.check_deadline()?;
        let mut left = self.parse_set_primary()?;
        loop {
            match self.peek() {
                Token::Star => {
                    self.advance();
                    let right = self.parse_set_primary()?;
                    let span = left.span().merge(&right.span());
                    left = SetExpr::Product {
                        left: Box::new(left),
                        right: Box::new(right),
                        span,
                    };
                }
                Token::Plus => {
                    self.advance();
                    let right = self.parse_set_primary()?;
                    let span = left.span().merge(&right.span());
                    left = SetExpr::Call {
                        name: "UNION".to_string(),
                        args: vec![SetCallArg::Set(left), SetCallArg::Set(right)],
                        span,
                    };
                }
                _ => return Ok(left),
            }
        }
    }

    fn parse_set_primary(&mut self) -> Result<SetExpr, Diagnostic> {
        match self.peek().clone() {
            Token::LBrace => self.parse_braced_set(),
            Token::LParen => self.parse_paren_set(),
            Token::Ident(name) => {
                if self.peek_at(1) == &Token::LParen {
                    return self.parse_set_call(name);
                }
                self.parse_member_tail()
            }
            Token::Bracketed(_) => self.parse_member_tail(),
            other => Err(self.err(format!("expected set expression, got {other}"))),
        }
    }

    /// `{ items? }`, elements may themselves be sets, tuples, members or
    /// ranges. Nesting depth is not limited here; the lowerer flattens
    /// and warns.
    fn parse_braced_set(&mut self) -> Result<SetExpr, Diagnostic> {
        let start = self.expect(Token::LBrace, "'{'")?;
        let mut items = Vec::new();
        loop {
            match self.peek() {
                Token::RBrace => {
                    let end = self.advance().span;
                    return Ok(SetExpr::Braced {
                        items,
                        span: start.merge(&end),
                    });
                }
                Token::Comma => {
                    // Tolerate stray separators from sloppy generators.
                    self.advance();
                }
                Token::Eof => {
                    return Err(self
                        .err("unterminated set: expected '}'")
                        .with_suggestion(suggestion::UNBALANCED_BRACKETS));
                }
                _ => {
                    items.push(self.parse_set_expr()?);
                    match self.peek() {
                        Token::Comma => {
                            self.advance();
                        }
                        Token::RBrace => {}
                        other => {
                            return Err(self
                                .err(format!("expected ',' or '}}' in set, got {other}")))
                        }
                    }
                }
            }
        }
    }

    /// `( … )` as a set element: either a tuple of members or a
    /// parenthesized set. The tuple interpretation wins when every
    /// element is a member path, matching the tightest-reading rule.
    fn parse_paren_set(&mut self) -> Result<SetExpr, Diagnostic> {
        let start = self.cur_span();
        let mark = self.mark();
        self.advance();

        // Attempt: tuple of member paths.
        let mut members = Vec::new();
        let tuple_ok = loop {
            match self.parse_member_expr() {
                Ok(m) => members.push(m),
                Err(_) => break false,
            }
            match self.peek() {
                Token::Comma => {
                    self.advance();
                }
                Token::RParen => break true,
                _ => break false,
            }
        };
        if tuple_ok {
            let end = self.advance().span;
            if members.len() == 1 {
                return Ok(SetExpr::Member(members.pop().expect("one member")));
            }
            return Ok(SetExpr::Tuple {
                members,
                span: start.merge(&end),
            });
        }

        // Fallback: parenthesized set expression.
        self.rewind(mark);
        self.advance();
        let inner = self.parse_set_expr()?;
        self.expect(Token::RParen, "')'")?;
        Ok(inner)
    }

    fn parse_set_call(&mut self, name: String) -> Result<SetExpr, Diagnostic> {
        let upper = name.to_ascii_uppercase();
        if !self.allow_unknown_functions && !super::is_known_function(&name) {
            return Err(self.err(format!("unknown function '{name}'")));
        }
        let start = self.advance().span; // function name
        self.expect(Token::LParen, "'('")?;
        let mut args = Vec::new();
        if self.peek() != &Token::RParen {
            loop {
                args.push(self.parse_set_call_arg()?);
                if self.peek() == &Token::Comma {
                    self.advance();
                    continue;
                }
                break;
            }
        }
        let end = self.expect(Token::RParen, "')'")?;
        Ok(SetExpr::Call {
            name: upper,
            args,
            span: start.merge(&end),
        })
    }

    /// Function arguments mix sets (`CROSSJOIN(a, b)`) and scalars
    /// (`TOPCOUNT(set, 10, measure)`): try the set reading first and fall
    /// back to a value expression.
    fn parse_set_call_arg(&mut self) -> Result<SetCallArg, Diagnostic> {
        let mark = self.mark();
        match self.parse_set_expr() {
            Ok(set) if self.at_arg_boundary() => Ok(SetCallArg::Set(set)),
            _ => {
                self.rewind(mark);
                let value = self.parse_value_expr()?;
                Ok(SetCallArg::Value(value))
            }
        }
    }

    fn at_arg_boundary(&self) -> bool {
        matches!(self.peek(), Token::Comma | Token::RParen)
    }

    /// A member path possibly extended into a range (`a : b`).
    fn parse_member_tail(&mut self) -> Result<SetExpr, Diagnostic> {
        let member = self.parse_member_expr()?;
        if self.peek() == &Token::Colon {
            self.advance();
            let to = self.parse_member_expr()?;
            let span = member.span.merge(&to.span);
            return Ok(SetExpr::Range {
                from: member,
                to,
                span,
            });
        }
        Ok(SetExpr::Member(member))
    }

    /// `part ('.' part)* ('.&[key]')? ('.' op)?`
    ///
    /// Ops: Members, AllMembers, Children, Parent, FirstChild, LastChild,
    /// Lead(n), Lag(n). An op terminates the path.
    pub(crate) fn parse_member_expr(&mut self) -> Result<MemberExpr, Diagnostic> {
        self.check_deadline()?;
        let (first, start) = self.take_name()?;
        let mut parts = vec![first];
        let mut key = None;
        let mut op = None;
        let mut end = start;

        while self.peek() == &Token::Dot {
            self.advance();
            match self.peek().clone() {
                Token::Amp => {
                    self.advance();
                    match self.peek().clone() {
                        Token::Bracketed(k) => {
                            end = self.advance().span;
                            key = Some(k);
                        }
                        Token::Ident(k) => {
                            end = self.advance().span;
                            key = Some(k);
                        }
                        Token::Number(k) => {
                            end = self.advance().span;
                            key = Some(k);
                        }
                        other => {
                            return Err(self
                                .err(format!("expected key after '.&', got {other}"))
                                .with_suggestion(suggestion::CHECK_MEMBER_PATH))
                        }
                    }
                }
                Token::Bracketed(name) => {
                    end = self.advance().span;
                    parts.push(name);
                }
                Token::Ident(word) => {
                    if let Some(parsed) = self.parse_member_op(&word)? {
                        op = Some(parsed);
                        end = self.cur_span();
                        break;
                    }
                    end = self.advance().span;
                    parts.push(word);
                }
                other => {
                    return Err(self
                        .err(format!("expected member path segment, got {other}"))
                        .with_suggestion(suggestion::CHECK_MEMBER_PATH))
                }
            }
        }

        Ok(MemberExpr {
            parts,
            key,
            op,
            span: start.merge(&end),
        })
    }

    /// Try to read `word` as a member navigation op; consumes tokens only
    /// when it is one.
    fn parse_member_op(&mut self, word: &str) -> Result<Option<MemberOp>, Diagnostic> {
        let op = match word.to_ascii_uppercase().as_str() {
            "MEMBERS" => MemberOp::Members,
            "ALLMEMBERS" => MemberOp::AllMembers,
            "CHILDREN" => MemberOp::Children,
            "PARENT" => MemberOp::Parent,
            "FIRSTCHILD" => MemberOp::FirstChild,
            "LASTCHILD" => MemberOp::LastChild,
            "LEAD" | "LAG" => {
                let is_lead = word.eq_ignore_ascii_case("LEAD");
                self.advance();
                self.expect(Token::LParen, "'('")?;
                let negative = self.peek() == &Token::Minus;
                if negative {
                    self.advance();
                }
                let (n, span) = self.take_number()?;
                let parsed: i64 = n.parse().map_err(|_| {
                    Diagnostic::error(
                        crate::diag::DiagKind::ParseError,
                        format!("invalid offset '{n}'"),
                        span,
                    )
                })?;
                let offset = if negative { -parsed } else { parsed };
                self.expect(Token::RParen, "')'")?;
                return Ok(Some(if is_lead {
                    MemberOp::Lead(offset)
                } else {
                    MemberOp::Lag(offset)
                }));
            }
            _ => return Ok(None),
        };
        self.advance();
        Ok(Some(op))
    }
}
