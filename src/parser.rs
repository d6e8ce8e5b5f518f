use std::rc::Rc;

use crate::ast::*;
use crate::error::SyntaxError;
use crate::lexer;
use crate::token::{Spanned, Token};

type Result<T> = std::result::Result<T, SyntaxError>;

/// Deepest nesting of statements, expressions and unary operators the
/// parser accepts. Both the parser and the interpreter recurse per level.
pub const MAX_NESTING: usize = 64;

/// Lex and parse a sprite script in one step.
pub fn parse_script(source: &str) -> Result<Program> {
    let tokens = lexer::lex(source)?;
    Parser::new(tokens).parse()
}

/// Recursive descent parser for sprite scripts.
///
/// Statements are LL(1) with a bounded look-ahead for arrow functions and
/// `for...of`; expressions use precedence climbing.
pub struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
    depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Spanned>) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    // ── Helpers ────────────────────────────────────────────────────────

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn peek_spanned(&self) -> Option<&Spanned> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Spanned> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        match self.peek_spanned() {
            Some(s) if &s.token == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(s) => Err(SyntaxError::unexpected_token(
                expected.describe(),
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(SyntaxError::unexpected_eof(expected.describe())),
        }
    }

    fn expect_ident(&mut self) -> Result<String> {
        match self.peek_spanned() {
            Some(Spanned {
                token: Token::Ident(name),
                ..
            }) => {
                let name = name.clone();
                self.pos += 1;
                Ok(name)
            }
            Some(s) => Err(SyntaxError::unexpected_token(
                "identifier",
                s.token.describe(),
                s.span.clone(),
            )),
            None => Err(SyntaxError::unexpected_eof("identifier")),
        }
    }

    fn unexpected(&self, expected: &str) -> SyntaxError {
        match self.peek_spanned() {
            Some(s) => SyntaxError::unexpected_token(expected, s.token.describe(), s.span.clone()),
            None => SyntaxError::unexpected_eof(expected),
        }
    }

    fn at(&self, token: &Token) -> bool {
        self.peek() == Some(token)
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.at(token) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// Run `parse` one nesting level deeper.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        if self.depth >= MAX_NESTING {
            return Err(SyntaxError::nesting_too_deep(self.current_span()));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn current_span(&self) -> std::ops::Range<usize> {
        match self.peek_spanned() {
            Some(s) => s.span.clone(),
            None => self.tokens.last().map(|s| s.span.end..s.span.end).unwrap_or(0..0),
        }
    }

    // ── Top-level ──────────────────────────────────────────────────────

    /// Parse a complete script.
    pub fn parse(&mut self) -> Result<Program> {
        let mut body = Vec::new();
        while self.peek().is_some() {
            body.push(self.parse_statement()?);
        }
        Ok(Program { body })
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn parse_statement(&mut self) -> Result<Stmt> {
        self.nested(Self::parse_statement_kind)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt> {
        match self.peek() {
            Some(Token::Function) if matches!(self.peek_at(1), Some(Token::Ident(_))) => {
                let def = self.parse_function()?;
                Ok(Stmt::Function(def))
            }
            Some(Token::Let | Token::Const | Token::Var) => {
                let stmt = self.parse_declaration()?;
                self.eat(&Token::Semicolon);
                Ok(stmt)
            }
            Some(Token::If) => self.parse_if(),
            Some(Token::While) => {
                self.advance();
                self.expect(&Token::LParen)?;
                let condition = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While { condition, body })
            }
            Some(Token::For) => self.parse_for(),
            Some(Token::Return) => {
                self.advance();
                let value = if matches!(self.peek(), None | Some(Token::Semicolon | Token::RBrace)) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.eat(&Token::Semicolon);
                Ok(Stmt::Return(value))
            }
            Some(Token::Break) => {
                self.advance();
                self.eat(&Token::Semicolon);
                Ok(Stmt::Break)
            }
            Some(Token::Continue) => {
                self.advance();
                self.eat(&Token::Semicolon);
                Ok(Stmt::Continue)
            }
            Some(Token::Throw) => {
                self.advance();
                let value = self.parse_expression()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt::Throw(value))
            }
            Some(Token::Try) => self.parse_try(),
            Some(Token::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(Token::Semicolon) => {
                self.advance();
                Ok(Stmt::Empty)
            }
            Some(_) => {
                let expr = self.parse_expression()?;
                self.eat(&Token::Semicolon);
                Ok(Stmt::Expr(expr))
            }
            None => Err(SyntaxError::unexpected_eof("statement")),
        }
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>> {
        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        while !self.at(&Token::RBrace) {
            if self.peek().is_none() {
                return Err(SyntaxError::unexpected_eof("'}'"));
            }
            body.push(self.parse_statement()?);
        }
        self.expect(&Token::RBrace)?;
        Ok(body)
    }

    fn parse_decl_kind(&mut self) -> Result<DeclKind> {
        let kind = match self.peek() {
            Some(Token::Let) => DeclKind::Let,
            Some(Token::Const) => DeclKind::Const,
            Some(Token::Var) => DeclKind::Var,
            _ => return Err(self.unexpected("'let', 'const' or 'var'")),
        };
        self.advance();
        Ok(kind)
    }

    fn parse_declaration(&mut self) -> Result<Stmt> {
        let kind = self.parse_decl_kind()?;
        let mut decls = Vec::new();
        loop {
            let span = self.current_span();
            let name = self.expect_ident()?;
            let init = if self.eat(&Token::Assign) {
                Some(self.parse_expression()?)
            } else {
                None
            };
            if kind == DeclKind::Const && init.is_none() {
                return Err(SyntaxError::message(
                    &format!("missing initializer in const declaration of '{name}'"),
                    Some(span),
                ));
            }
            decls.push((name, init));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        Ok(Stmt::Decl { kind, decls })
    }

    fn parse_if(&mut self) -> Result<Stmt> {
        self.expect(&Token::If)?;
        self.expect(&Token::LParen)?;
        let condition = self.parse_expression()?;
        self.expect(&Token::RParen)?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(&Token::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt> {
        self.expect(&Token::For)?;
        self.expect(&Token::LParen)?;

        // for (const x of xs)
        let is_for_of = matches!(self.peek(), Some(Token::Let | Token::Const | Token::Var))
            && matches!(self.peek_at(1), Some(Token::Ident(_)))
            && matches!(self.peek_at(2), Some(Token::Ident(s)) if s == "of");
        if is_for_of {
            let kind = self.parse_decl_kind()?;
            let binding = self.expect_ident()?;
            self.advance(); // consume 'of'
            let iterable = self.parse_expression()?;
            self.expect(&Token::RParen)?;
            let body = Box::new(self.parse_statement()?);
            return Ok(Stmt::ForOf {
                kind,
                binding,
                iterable,
                body,
            });
        }

        let init = match self.peek() {
            Some(Token::Semicolon) => None,
            Some(Token::Let | Token::Const | Token::Var) => Some(Box::new(self.parse_declaration()?)),
            _ => Some(Box::new(Stmt::Expr(self.parse_expression()?))),
        };
        self.expect(&Token::Semicolon)?;
        let condition = if self.at(&Token::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::Semicolon)?;
        let update = if self.at(&Token::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(&Token::RParen)?;
        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> Result<Stmt> {
        self.expect(&Token::Try)?;
        let block = self.parse_block()?;
        let catch = if self.eat(&Token::Catch) {
            let binding = if self.eat(&Token::LParen) {
                let name = self.expect_ident()?;
                self.expect(&Token::RParen)?;
                Some(name)
            } else {
                None
            };
            Some((binding, self.parse_block()?))
        } else {
            None
        };
        let finally = if self.eat(&Token::Finally) {
            Some(self.parse_block()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("'catch' or 'finally'"));
        }
        Ok(Stmt::Try {
            block,
            catch,
            finally,
        })
    }

    /// `function [name](params) { body }`
    fn parse_function(&mut self) -> Result<Rc<FunctionDef>> {
        self.expect(&Token::Function)?;
        let name = match self.peek() {
            Some(Token::Ident(_)) => Some(self.expect_ident()?),
            _ => None,
        };
        let params = self.parse_params()?;
        let body = FunctionBody::Block(self.parse_block()?);
        Ok(Rc::new(FunctionDef { name, params, body }))
    }

    fn parse_params(&mut self) -> Result<Vec<String>> {
        self.expect(&Token::LParen)?;
        let mut params = Vec::new();
        while !self.at(&Token::RParen) {
            params.push(self.expect_ident()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(params)
    }

    // ── Expressions ────────────────────────────────────────────────────

    pub fn parse_expression(&mut self) -> Result<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> Result<Expr> {
        self.nested(Self::parse_assignment_level)
    }

    fn parse_assignment_level(&mut self) -> Result<Expr> {
        if self.at_arrow() {
            return self.parse_arrow();
        }

        let span = self.current_span();
        let left = self.parse_ternary()?;

        let op = match self.peek() {
            Some(Token::Assign) => AssignOp::Set,
            Some(Token::PlusAssign) => AssignOp::Add,
            Some(Token::MinusAssign) => AssignOp::Sub,
            Some(Token::StarAssign) => AssignOp::Mul,
            Some(Token::SlashAssign) => AssignOp::Div,
            _ => return Ok(left),
        };
        if !left.is_assignable() {
            return Err(SyntaxError::invalid_assignment(span));
        }
        self.advance(); // consume operator
        // Right associative: a = b = c
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target: Box::new(left),
            op,
            value: Box::new(value),
        })
    }

    /// Whether the upcoming tokens start an arrow function.
    fn at_arrow(&self) -> bool {
        match self.peek() {
            Some(Token::Ident(_)) => self.peek_at(1) == Some(&Token::Arrow),
            Some(Token::LParen) => {
                let mut depth = 0usize;
                let mut offset = 0usize;
                while let Some(tok) = self.peek_at(offset) {
                    match tok {
                        Token::LParen => depth += 1,
                        Token::RParen => {
                            depth -= 1;
                            if depth == 0 {
                                return self.peek_at(offset + 1) == Some(&Token::Arrow);
                            }
                        }
                        _ => {}
                    }
                    offset += 1;
                }
                false
            }
            _ => false,
        }
    }

    fn parse_arrow(&mut self) -> Result<Expr> {
        let params = if self.at(&Token::LParen) {
            self.parse_params()?
        } else {
            vec![self.expect_ident()?]
        };
        self.expect(&Token::Arrow)?;
        let body = if self.at(&Token::LBrace) {
            FunctionBody::Block(self.parse_block()?)
        } else {
            FunctionBody::Expr(self.parse_assignment()?)
        };
        Ok(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body,
        })))
    }

    fn parse_ternary(&mut self) -> Result<Expr> {
        let condition = self.parse_binary(0)?;
        if !self.eat(&Token::Question) {
            return Ok(condition);
        }
        let if_true = self.parse_assignment()?;
        self.expect(&Token::Colon)?;
        let if_false = self.parse_assignment()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
        })
    }

    /// Precedence climbing over binary operators.
    fn parse_binary(&mut self, min_prec: u8) -> Result<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.peek() {
                Some(Token::OrOr) => BinOp::Or,
                Some(Token::AndAnd) => BinOp::And,
                Some(Token::EqEq) => BinOp::Eq,
                Some(Token::NotEq) => BinOp::NotEq,
                Some(Token::StrictEq) => BinOp::StrictEq,
                Some(Token::StrictNotEq) => BinOp::StrictNotEq,
                Some(Token::Less) => BinOp::Lt,
                Some(Token::LessEq) => BinOp::LtEq,
                Some(Token::Greater) => BinOp::Gt,
                Some(Token::GreaterEq) => BinOp::GtEq,
                Some(Token::Plus) => BinOp::Add,
                Some(Token::Minus) => BinOp::Sub,
                Some(Token::Star) => BinOp::Mul,
                Some(Token::Slash) => BinOp::Div,
                Some(Token::Percent) => BinOp::Rem,
                _ => break,
            };

            if op.precedence() <= min_prec {
                break;
            }

            self.advance(); // consume operator
            let right = self.parse_binary(op.precedence())?;
            left = Expr::BinaryOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            Some(Token::Bang) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            Some(Token::Plus) => UnaryOp::Plus,
            Some(Token::Typeof) => UnaryOp::Typeof,
            Some(Token::PlusPlus | Token::MinusMinus) => {
                let delta = if self.at(&Token::PlusPlus) { 1.0 } else { -1.0 };
                self.advance();
                let span = self.current_span();
                let target = self.nested(Self::parse_unary)?;
                if !target.is_assignable() {
                    return Err(SyntaxError::invalid_assignment(span));
                }
                return Ok(Expr::Update {
                    target: Box::new(target),
                    delta,
                    prefix: true,
                });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr> {
        let span = self.current_span();
        let expr = self.parse_call_member()?;
        let delta = match self.peek() {
            Some(Token::PlusPlus) => 1.0,
            Some(Token::MinusMinus) => -1.0,
            _ => return Ok(expr),
        };
        if !expr.is_assignable() {
            return Err(SyntaxError::invalid_assignment(span));
        }
        self.advance();
        Ok(Expr::Update {
            target: Box::new(expr),
            delta,
            prefix: false,
        })
    }

    fn parse_call_member(&mut self) -> Result<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek() {
                Some(Token::Dot) => {
                    self.advance();
                    let field = self.expect_ident()?;
                    expr = Expr::Member {
                        object: Box::new(expr),
                        field,
                    };
                }
                Some(Token::LBracket) => {
                    self.advance();
                    let index = self.parse_expression()?;
                    self.expect(&Token::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                Some(Token::LParen) => {
                    let args = self.parse_args()?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>> {
        self.expect(&Token::LParen)?;
        let mut args = Vec::new();
        while !self.at(&Token::RParen) {
            if self.peek().is_none() {
                return Err(SyntaxError::unexpected_eof("')'"));
            }
            args.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expr> {
        let Some(token) = self.peek().cloned() else {
            return Err(SyntaxError::unexpected_eof("expression"));
        };
        let expr = match token {
            Token::Number(v) => Expr::Number(v),
            Token::String(s) => Expr::String(s),
            Token::True => Expr::Bool(true),
            Token::False => Expr::Bool(false),
            Token::Null => Expr::Null,
            Token::Undefined => Expr::Undefined,
            Token::Ident(name) => Expr::Ident(name),
            Token::Function => return Ok(Expr::Function(self.parse_function()?)),
            Token::LParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(&Token::RParen)?;
                return Ok(expr);
            }
            Token::LBracket => return self.parse_array(),
            Token::LBrace => return self.parse_object(),
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        Ok(expr)
    }

    fn parse_array(&mut self) -> Result<Expr> {
        self.expect(&Token::LBracket)?;
        let mut elements = Vec::new();
        while !self.at(&Token::RBracket) {
            if self.peek().is_none() {
                return Err(SyntaxError::unexpected_eof("']'"));
            }
            elements.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBracket)?;
        Ok(Expr::Array(elements))
    }

    /// `{ key: value, 'quoted': value, shorthand }`
    fn parse_object(&mut self) -> Result<Expr> {
        self.expect(&Token::LBrace)?;
        let mut entries = Vec::new();
        while !self.at(&Token::RBrace) {
            let key = match self.peek() {
                Some(Token::Ident(name)) => name.clone(),
                Some(Token::String(s)) => s.clone(),
                Some(Token::Number(n)) => crate::script::format_number(*n),
                _ => return Err(self.unexpected("property name")),
            };
            let shorthand = matches!(self.peek(), Some(Token::Ident(_)));
            self.advance();
            let value = if self.eat(&Token::Colon) {
                self.parse_expression()?
            } else if shorthand {
                Expr::Ident(key.clone())
            } else {
                return Err(self.unexpected("':'"));
            };
            entries.push((key, value));
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(&Token::RBrace)?;
        Ok(Expr::Object(entries))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
