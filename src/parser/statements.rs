//! Statement parsing.

use crate::ast::{Block, Stmt};
use crate::lexer::TokenKind;
use crate::parser::core::{ParseResult, Parser};
use crate::parser::precedence::Precedence;

impl Parser {
    /// Parse a single statement.
    pub(crate) fn statement(&mut self) -> ParseResult<Stmt> {
        match self.peek().kind {
            TokenKind::Let => self.let_statement(),
            TokenKind::Return => self.return_statement(),
            _ => self.expression_statement(),
        }
    }

    fn let_statement(&mut self) -> ParseResult<Stmt> {
        self.advance(); // let
        let name = self.expect_identifier()?;
        self.expect(&TokenKind::Equal)?;
        let value = self.expression(Precedence::None)?;
        self.match_token(&TokenKind::Semicolon);
        Ok(Stmt::Let { name, value })
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        self.advance(); // return
        let value = self.expression(Precedence::None)?;
        self.match_token(&TokenKind::Semicolon);
        Ok(Stmt::Return(value))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression(Precedence::None)?;
        self.match_token(&TokenKind::Semicolon);
        Ok(Stmt::Expression(expr))
    }

    /// Parse a braced block of statements.
    pub(crate) fn block(&mut self) -> ParseResult<Block> {
        self.expect(&TokenKind::LeftBrace)?;

        let mut statements = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            statements.push(self.statement()?);
        }
        self.expect(&TokenKind::RightBrace)?;

        Ok(Block::new(statements))
    }
}
