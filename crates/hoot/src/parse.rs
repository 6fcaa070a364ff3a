//! Recursive-descent parser: token vector to statements.
//!
//! One token of lookahead, a precedence cascade for expressions, and
//! panic-mode recovery: when a declaration fails to parse the parser reports
//! the error, synchronizes to the next statement boundary, and keeps going so
//! one run surfaces every syntax problem.
//!
//! `for` has no AST node of its own — it desugars to `While` wrapped in
//! blocks that preserve the initializer's lexical scope.

use std::rc::Rc;

use crate::{
    ast::{Expr, ExprId, ExprKind, FunctionDecl, LiteralValue, Stmt},
    error::Diagnostics,
    token::{Token, TokenLiteral, TokenType},
};

/// Functions and calls accept at most this many parameters/arguments.
/// Exceeding it is reported but does not abort the parse.
const MAX_ARITY: usize = 255;

/// Marker error for panic-mode recovery. The message has already been
/// reported through [`Diagnostics`] by the time this is raised.
struct ParseError;

type ParseResult<T> = Result<T, ParseError>;

pub(crate) struct Parser<'d> {
    tokens: Vec<Token>,
    diagnostics: &'d Diagnostics,
    current: usize,
    /// Monotonic counter backing [`ExprId`] assignment.
    next_expr_id: u32,
    /// Counter used to name anonymous functions for display.
    next_lambda: u32,
}

impl<'d> Parser<'d> {
    pub fn new(tokens: Vec<Token>, diagnostics: &'d Diagnostics) -> Self {
        Self {
            tokens,
            diagnostics,
            current: 0,
            next_expr_id: 0,
            next_lambda: 0,
        }
    }

    /// Parses the whole token stream into statements.
    ///
    /// Declarations that fail to parse are dropped after synchronization;
    /// `Diagnostics::had_error` tells callers whether the result is runnable.
    pub fn parse(mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        statements
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenType::Class) {
            self.class_declaration()
        } else if self.check(TokenType::Fun) && self.check_next(TokenType::Identifier) {
            // `fun` followed by anything but a name is an anonymous function
            // expression and falls through to `statement`.
            self.advance();
            self.function("function").map(Stmt::Function)
        } else if self.match_kind(TokenType::Let) {
            self.let_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(ParseError) => {
                self.synchronize();
                None
            }
        }
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect class name.")?.clone();

        let superclass = if self.match_kind(TokenType::Less) {
            let super_name = self
                .consume(TokenType::Identifier, "Expect superclass name.")?
                .clone();
            Some(self.make_expr(ExprKind::Variable { name: super_name }))
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }

        self.consume(TokenType::RightBrace, "Expect '}' after class body.")?;
        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenType::For) {
            return self.for_statement();
        }
        if self.match_kind(TokenType::If) {
            return self.if_statement();
        }
        if self.match_kind(TokenType::Print) {
            return self.print_statement();
        }
        if self.match_kind(TokenType::Return) {
            return self.return_statement();
        }
        if self.match_kind(TokenType::While) {
            return self.while_statement();
        }
        if self.match_kind(TokenType::Break) {
            return self.break_statement();
        }
        if self.match_kind(TokenType::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    /// Desugars `for (init; condition; increment) body` into nested blocks
    /// around a `While`. The initializer's scope encloses both the body and
    /// the increment, so a `let` initializer is visible to both and invisible
    /// after the loop.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenType::Semicolon) {
            None
        } else if self.match_kind(TokenType::Let) {
            Some(self.let_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenType::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }

        let condition = condition.unwrap_or_else(|| self.make_expr(ExprKind::Literal(LiteralValue::Bool(true))));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenType::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.consume(TokenType::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn let_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?.clone();

        let initializer = if self.match_kind(TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Let { name, initializer })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body })
    }

    fn break_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        self.consume(TokenType::Semicolon, "Expect ';' after 'break' statement.")?;
        Ok(Stmt::Break { keyword })
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(value))
    }

    /// Parses a named function or method: `IDENT "(" params? ")" block`.
    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        let name = self
            .consume(TokenType::Identifier, &format!("Expect {kind} name."))?
            .clone();
        self.finish_function(name, kind)
    }

    /// Parses an anonymous function expression: `"fun" "(" params? ")" block`.
    fn lambda(&mut self) -> ParseResult<Expr> {
        let fun = self.previous().clone();
        let name = Token::synthetic(TokenType::Identifier, format!("lambda-{}", self.next_lambda), fun.line);
        self.next_lambda += 1;
        let declaration = self.finish_function(name, "function")?;
        Ok(self.make_expr(ExprKind::Lambda(declaration)))
    }

    fn finish_function(&mut self, name: Token, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        self.consume(TokenType::LeftParen, &format!("Expect '(' after {kind} name."))?;
        let mut params = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= MAX_ARITY {
                    let token = self.peek().clone();
                    self.diagnostics
                        .error_at(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenType::Identifier, "Expect parameter name.")?.clone());
                if !self.match_kind(TokenType::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenType::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenType::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.match_kind(TokenType::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr.kind {
                ExprKind::Variable { name } => Ok(self.make_expr(ExprKind::Assign { name, value })),
                ExprKind::Get { object, name } => Ok(self.make_expr(ExprKind::Set { object, name, value })),
                _ => {
                    // Report but keep parsing: the error is not confusing
                    // enough to warrant panic-mode recovery.
                    self.diagnostics.error_at(&equals, "Invalid assignment target.");
                    Ok(expr)
                }
            };
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.match_kind(TokenType::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = self.make_expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenType::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = self.make_expr(ExprKind::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_kinds(&[TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = self.make_expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.match_kinds(&[
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = self.make_expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_kinds(&[TokenType::Minus, TokenType::Plus]) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = self.make_expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_kinds(&[TokenType::Slash, TokenType::Star]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = self.make_expr(ExprKind::Binary {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_kinds(&[TokenType::Bang, TokenType::Minus]) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            return Ok(self.make_expr(ExprKind::Unary {
                operator,
                right: Box::new(right),
            }));
        }
        self.call()
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= MAX_ARITY {
                    let token = self.peek().clone();
                    self.diagnostics.error_at(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_kind(TokenType::Comma) {
                    break;
                }
            }
        }

        let paren = self
            .consume(TokenType::RightParen, "Expect ')' after arguments.")?
            .clone();

        Ok(self.make_expr(ExprKind::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenType::Dot) {
                let name = self
                    .consume(TokenType::Identifier, "Expect property name after '.'.")?
                    .clone();
                expr = self.make_expr(ExprKind::Get {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_kind(TokenType::False) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Bool(false))));
        }
        if self.match_kind(TokenType::True) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Bool(true))));
        }
        if self.match_kind(TokenType::Nil) {
            return Ok(self.make_expr(ExprKind::Literal(LiteralValue::Nil)));
        }

        if self.match_kinds(&[TokenType::Number, TokenType::String]) {
            let literal = match &self.previous().literal {
                TokenLiteral::Number(value) => LiteralValue::Number(*value),
                TokenLiteral::Str(text) => LiteralValue::Str(Rc::from(text.as_str())),
                TokenLiteral::None => {
                    unreachable!("number and string tokens always carry a literal payload")
                }
            };
            return Ok(self.make_expr(ExprKind::Literal(literal)));
        }

        if self.match_kind(TokenType::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expect '.' after 'super'.")?;
            let method = self
                .consume(TokenType::Identifier, "Expect superclass method name.")?
                .clone();
            return Ok(self.make_expr(ExprKind::Super { keyword, method }));
        }

        if self.match_kind(TokenType::This) {
            let keyword = self.previous().clone();
            return Ok(self.make_expr(ExprKind::This { keyword }));
        }

        if self.match_kind(TokenType::Fun) {
            return self.lambda();
        }

        if self.match_kind(TokenType::Identifier) {
            let name = self.previous().clone();
            return Ok(self.make_expr(ExprKind::Variable { name }));
        }

        if self.match_kind(TokenType::LeftParen) {
            let expression = Box::new(self.expression()?);
            self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
            return Ok(self.make_expr(ExprKind::Grouping { expression }));
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expect expression."))
    }

    fn make_expr(&mut self, kind: ExprKind) -> Expr {
        let id = ExprId::new(self.next_expr_id);
        self.next_expr_id += 1;
        Expr { id, kind }
    }

    fn consume(&mut self, kind: TokenType, message: &str) -> ParseResult<&Token> {
        if self.check(kind) {
            return Ok(self.advance());
        }
        let token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn match_kind(&mut self, kind: TokenType) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn match_kinds(&mut self, kinds: &[TokenType]) -> bool {
        kinds.iter().any(|&kind| self.match_kind(kind))
    }

    fn check(&self, kind: TokenType) -> bool {
        !self.is_at_end() && self.peek().token_type == kind
    }

    fn check_next(&self, kind: TokenType) -> bool {
        self.tokens
            .get(self.current + 1)
            .is_some_and(|token| token.token_type == kind)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().token_type == TokenType::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    fn error(&self, token: &Token, message: &str) -> ParseError {
        self.diagnostics.error_at(token, message);
        ParseError
    }

    /// Panic-mode recovery: advances until just past a semicolon or until a
    /// token that plausibly starts a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().token_type == TokenType::Semicolon {
                return;
            }

            match self.peek().token_type {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Let
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Break
                | TokenType::Print
                | TokenType::Return => return,
                _ => {
                    self.advance();
                }
            }
        }
    }
}
