//! Expression parsing (Pratt-style).

use crate::ast::{Expr, InfixOp, PrefixOp};
use crate::error::ParserError;
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::{get_precedence, Precedence};

impl Parser {
    /// Parse an expression with the given minimum binding power.
    pub(crate) fn expression(&mut self, precedence: Precedence) -> ParseResult<Expr> {
        let mut left = self.prefix()?;

        while !self.check(&TokenKind::Semicolon) && precedence < get_precedence(&self.peek().kind) {
            left = self.infix(left)?;
        }

        Ok(left)
    }

    fn prefix(&mut self) -> ParseResult<Expr> {
        if self.is_at_end() {
            return Err(ParserError::UnexpectedEof);
        }

        let token = self.advance();
        match token.kind {
            TokenKind::IntLiteral(n) => Ok(Expr::IntLiteral(n)),
            TokenKind::StringLiteral(s) => Ok(Expr::StringLiteral(s)),
            TokenKind::BoolLiteral(b) => Ok(Expr::BoolLiteral(b)),
            TokenKind::Identifier(name) => Ok(Expr::Identifier(name)),

            TokenKind::Minus => {
                let operand = self.expression(Precedence::Unary)?;
                Ok(Expr::Prefix {
                    operator: PrefixOp::Minus,
                    operand: Box::new(operand),
                })
            }
            TokenKind::Bang => {
                let operand = self.expression(Precedence::Unary)?;
                Ok(Expr::Prefix {
                    operator: PrefixOp::Bang,
                    operand: Box::new(operand),
                })
            }

            TokenKind::LeftParen => {
                let expr = self.expression(Precedence::None)?;
                self.expect(&TokenKind::RightParen)?;
                Ok(expr)
            }

            TokenKind::If => self.if_expression(),
            TokenKind::Fn => self.function_literal(),
            TokenKind::LeftBracket => self.array_literal(),
            TokenKind::LeftBrace => self.hash_literal(),

            kind => Err(ParserError::unexpected_token(
                "expression",
                format!("{}", kind),
            )),
        }
    }

    fn infix(&mut self, left: Expr) -> ParseResult<Expr> {
        let token = self.advance();
        match token.kind {
            TokenKind::LeftParen => self.call_expression(left),
            TokenKind::LeftBracket => {
                let index = self.expression(Precedence::None)?;
                self.expect(&TokenKind::RightBracket)?;
                Ok(Expr::Index {
                    left: Box::new(left),
                    index: Box::new(index),
                })
            }
            kind => {
                let precedence = get_precedence(&kind);
                let operator = match kind {
                    TokenKind::Plus => InfixOp::Add,
                    TokenKind::Minus => InfixOp::Subtract,
                    TokenKind::Star => InfixOp::Multiply,
                    TokenKind::Slash => InfixOp::Divide,
                    TokenKind::EqualEqual => InfixOp::Equal,
                    TokenKind::BangEqual => InfixOp::NotEqual,
                    TokenKind::Less => InfixOp::Less,
                    TokenKind::Greater => InfixOp::Greater,
                    other => {
                        return Err(ParserError::unexpected_token(
                            "operator",
                            format!("{}", other),
                        ))
                    }
                };
                let right = self.expression(precedence)?;
                Ok(Expr::Infix {
                    left: Box::new(left),
                    operator,
                    right: Box::new(right),
                })
            }
        }
    }

    fn if_expression(&mut self) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;
        let condition = self.expression(Precedence::None)?;
        self.expect(&TokenKind::RightParen)?;

        let consequence = self.block()?;

        let alternative = if self.match_token(&TokenKind::Else) {
            Some(self.block()?)
        } else {
            None
        };

        Ok(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn function_literal(&mut self) -> ParseResult<Expr> {
        self.expect(&TokenKind::LeftParen)?;

        let mut parameters = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                parameters.push(self.expect_identifier()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;

        let body = self.block()?;
        Ok(Expr::FunctionLiteral { parameters, body })
    }

    fn call_expression(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                arguments.push(self.expression(Precedence::None)?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightParen)?;

        Ok(Expr::Call {
            callee: Box::new(callee),
            arguments,
        })
    }

    fn array_literal(&mut self) -> ParseResult<Expr> {
        let mut elements = Vec::new();
        if !self.check(&TokenKind::RightBracket) {
            loop {
                elements.push(self.expression(Precedence::None)?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBracket)?;

        Ok(Expr::ArrayLiteral(elements))
    }

    fn hash_literal(&mut self) -> ParseResult<Expr> {
        let mut pairs = Vec::new();
        if !self.check(&TokenKind::RightBrace) {
            loop {
                let key = self.expression(Precedence::None)?;
                self.expect(&TokenKind::Colon)?;
                let value = self.expression(Precedence::None)?;
                pairs.push((key, value));
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Expr::HashLiteral(pairs))
    }
}
