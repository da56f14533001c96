//! Recursive-descent parser and AST for the preview script subset.

use crate::error::RuleError;

use super::lexer::{Token, TokenKind};

#[derive(Debug, Clone)]
/// Statement AST node.
pub enum Stmt {
    /// `function name(params) { body }`
    Function(FunctionDecl),
    /// `let`/`const`/`var` declaration with optional initializer.
    Declare {
        name: String,
        init: Option<Expr>,
    },
    /// Assignment to a previously declared variable.
    Assign {
        name: String,
        value: Expr,
    },
    If {
        condition: Expr,
        then_branch: Vec<Stmt>,
        else_branch: Option<Vec<Stmt>>,
    },
    While {
        condition: Expr,
        body: Vec<Stmt>,
    },
    For {
        init: Option<Box<Stmt>>,
        condition: Option<Expr>,
        update: Option<Box<Stmt>>,
        body: Vec<Stmt>,
    },
    Return(Option<Expr>),
    Expr(Expr),
}

#[derive(Debug, Clone)]
/// A named function declaration.
pub struct FunctionDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone)]
/// Expression AST node.
pub enum Expr {
    Number(f64),
    String(String),
    Bool(bool),
    Null,
    Array(Vec<Expr>),
    Ident(String),
    /// Property access `object.property`.
    Member {
        object: Box<Expr>,
        property: String,
    },
    /// Computed access `object[index]`.
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Ternary {
        condition: Box<Expr>,
        then_value: Box<Expr>,
        else_value: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
}

/// Parses a token stream into a statement list (the program).
pub fn parse_program(tokens: &[Token]) -> Result<Vec<Stmt>, RuleError> {
    let mut parser = Parser { tokens, pos: 0 };
    let mut statements = Vec::new();
    while !matches!(parser.current().kind, TokenKind::Eof) {
        statements.push(parser.parse_statement()?);
    }
    Ok(statements)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn parse_statement(&mut self) -> Result<Stmt, RuleError> {
        match self.current().kind {
            TokenKind::Function => self.parse_function(),
            TokenKind::Let | TokenKind::Const | TokenKind::Var => self.parse_declaration(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => {
                self.pos += 1;
                if self
                    .consume_if(|k| matches!(k, TokenKind::Semicolon))
                    .is_some()
                {
                    return Ok(Stmt::Return(None));
                }
                if matches!(self.current().kind, TokenKind::RBrace | TokenKind::Eof) {
                    return Ok(Stmt::Return(None));
                }
                let value = self.parse_expression()?;
                self.consume_if(|k| matches!(k, TokenKind::Semicolon));
                Ok(Stmt::Return(Some(value)))
            }
            _ => self.parse_expression_or_assignment(),
        }
    }

    fn parse_function(&mut self) -> Result<Stmt, RuleError> {
        self.pos += 1;
        let name = self.expect_ident("expected function name")?;
        self.expect(
            |k| matches!(k, TokenKind::LParen),
            "expected '(' after function name",
        )?;
        let mut params = Vec::new();
        if self
            .consume_if(|k| matches!(k, TokenKind::RParen))
            .is_none()
        {
            loop {
                params.push(self.expect_ident("expected parameter name")?);
                if self.consume_if(|k| matches!(k, TokenKind::Comma)).is_some() {
                    continue;
                }
                self.expect(
                    |k| matches!(k, TokenKind::RParen),
                    "expected ')' after parameters",
                )?;
                break;
            }
        }
        let body = self.parse_block()?;
        Ok(Stmt::Function(FunctionDecl { name, params, body }))
    }

    fn parse_declaration(&mut self) -> Result<Stmt, RuleError> {
        self.pos += 1;
        let name = self.expect_ident("expected variable name")?;
        let init = if self.consume_if(|k| matches!(k, TokenKind::Assign)).is_some() {
            Some(self.parse_expression()?)
        } else {
            None
        };
        self.consume_if(|k| matches!(k, TokenKind::Semicolon));
        Ok(Stmt::Declare { name, init })
    }

    fn parse_if(&mut self) -> Result<Stmt, RuleError> {
        self.pos += 1;
        self.expect(|k| matches!(k, TokenKind::LParen), "expected '(' after if")?;
        let condition = self.parse_expression()?;
        self.expect(
            |k| matches!(k, TokenKind::RParen),
            "expected ')' after if condition",
        )?;
        let then_branch = self.parse_block_or_single()?;
        let else_branch = if self.consume_if(|k| matches!(k, TokenKind::Else)).is_some() {
            if matches!(self.current().kind, TokenKind::If) {
                Some(vec![self.parse_if()?])
            } else {
                Some(self.parse_block_or_single()?)
            }
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn parse_while(&mut self) -> Result<Stmt, RuleError> {
        self.pos += 1;
        self.expect(|k| matches!(k, TokenKind::LParen), "expected '(' after while")?;
        let condition = self.parse_expression()?;
        self.expect(
            |k| matches!(k, TokenKind::RParen),
            "expected ')' after while condition",
        )?;
        let body = self.parse_block_or_single()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_for(&mut self) -> Result<Stmt, RuleError> {
        self.pos += 1;
        self.expect(|k| matches!(k, TokenKind::LParen), "expected '(' after for")?;
        let init = if self
            .consume_if(|k| matches!(k, TokenKind::Semicolon))
            .is_some()
        {
            None
        } else {
            let statement = match self.current().kind {
                TokenKind::Let | TokenKind::Const | TokenKind::Var => self.parse_declaration()?,
                _ => self.parse_expression_or_assignment()?,
            };
            Some(Box::new(statement))
        };
        let condition = if matches!(self.current().kind, TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect(
            |k| matches!(k, TokenKind::Semicolon),
            "expected ';' after for condition",
        )?;
        let update = if matches!(self.current().kind, TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_assignment_only()?))
        };
        self.expect(
            |k| matches!(k, TokenKind::RParen),
            "expected ')' after for clauses",
        )?;
        let body = self.parse_block_or_single()?;
        Ok(Stmt::For {
            init,
            condition,
            update,
            body,
        })
    }

    fn parse_block(&mut self) -> Result<Vec<Stmt>, RuleError> {
        self.expect(|k| matches!(k, TokenKind::LBrace), "expected '{'")?;
        let mut statements = Vec::new();
        while self
            .consume_if(|k| matches!(k, TokenKind::RBrace))
            .is_none()
        {
            if matches!(self.current().kind, TokenKind::Eof) {
                return Err(RuleError::Script(
                    "unexpected end of script inside a block".to_string(),
                ));
            }
            statements.push(self.parse_statement()?);
        }
        Ok(statements)
    }

    fn parse_block_or_single(&mut self) -> Result<Vec<Stmt>, RuleError> {
        if matches!(self.current().kind, TokenKind::LBrace) {
            self.parse_block()
        } else {
            Ok(vec![self.parse_statement()?])
        }
    }

    /// Parses either `name = expr` or a bare expression statement.
    fn parse_expression_or_assignment(&mut self) -> Result<Stmt, RuleError> {
        if let TokenKind::Ident(ref name) = self.current().kind {
            if matches!(self.peek(1).kind, TokenKind::Assign) {
                let name = name.clone();
                self.pos += 2;
                let value = self.parse_expression()?;
                self.consume_if(|k| matches!(k, TokenKind::Semicolon));
                return Ok(Stmt::Assign { name, value });
            }
        }
        let expr = self.parse_expression()?;
        self.consume_if(|k| matches!(k, TokenKind::Semicolon));
        Ok(Stmt::Expr(expr))
    }

    /// `for` update clause: assignment or expression, no trailing ';'.
    fn parse_assignment_only(&mut self) -> Result<Stmt, RuleError> {
        if let TokenKind::Ident(ref name) = self.current().kind {
            if matches!(self.peek(1).kind, TokenKind::Assign) {
                let name = name.clone();
                self.pos += 2;
                let value = self.parse_expression()?;
                return Ok(Stmt::Assign { name, value });
            }
        }
        Ok(Stmt::Expr(self.parse_expression()?))
    }

    fn parse_expression(&mut self) -> Result<Expr, RuleError> {
        self.parse_ternary()
    }

    fn parse_ternary(&mut self) -> Result<Expr, RuleError> {
        let condition = self.parse_or()?;
        if self
            .consume_if(|k| matches!(k, TokenKind::Question))
            .is_none()
        {
            return Ok(condition);
        }
        let then_value = self.parse_ternary()?;
        self.expect(
            |k| matches!(k, TokenKind::Colon),
            "expected ':' in conditional expression",
        )?;
        let else_value = self.parse_ternary()?;
        Ok(Expr::Ternary {
            condition: Box::new(condition),
            then_value: Box::new(then_value),
            else_value: Box::new(else_value),
        })
    }

    fn parse_or(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_and()?;
        while self.consume_if(|k| matches!(k, TokenKind::OrOr)).is_some() {
            let right = self.parse_and()?;
            expr = Expr::Binary {
                op: BinaryOp::Or,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_equality()?;
        while self
            .consume_if(|k| matches!(k, TokenKind::AndAnd))
            .is_some()
        {
            let right = self.parse_equality()?;
            expr = Expr::Binary {
                op: BinaryOp::And,
                left: Box::new(expr),
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_comparison()?;
        loop {
            // '==='/'!==' are treated as their loose counterparts; all
            // runtime values are already concrete JSON values.
            let op = if self
                .consume_if(|k| matches!(k, TokenKind::EqEq | TokenKind::EqEqEq))
                .is_some()
            {
                Some(BinaryOp::Eq)
            } else if self
                .consume_if(|k| matches!(k, TokenKind::NotEq | TokenKind::NotEqEq))
                .is_some()
            {
                Some(BinaryOp::NotEq)
            } else {
                None
            };

            if let Some(op) = op {
                let right = self.parse_comparison()?;
                expr = Expr::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_term()?;
        loop {
            let op = if self.consume_if(|k| matches!(k, TokenKind::Lt)).is_some() {
                Some(BinaryOp::Lt)
            } else if self.consume_if(|k| matches!(k, TokenKind::Lte)).is_some() {
                Some(BinaryOp::Lte)
            } else if self.consume_if(|k| matches!(k, TokenKind::Gt)).is_some() {
                Some(BinaryOp::Gt)
            } else if self.consume_if(|k| matches!(k, TokenKind::Gte)).is_some() {
                Some(BinaryOp::Gte)
            } else {
                None
            };

            if let Some(op) = op {
                let right = self.parse_term()?;
                expr = Expr::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_factor()?;
        loop {
            let op = if self.consume_if(|k| matches!(k, TokenKind::Plus)).is_some() {
                Some(BinaryOp::Add)
            } else if self.consume_if(|k| matches!(k, TokenKind::Minus)).is_some() {
                Some(BinaryOp::Sub)
            } else {
                None
            };

            if let Some(op) = op {
                let right = self.parse_factor()?;
                expr = Expr::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_unary()?;
        loop {
            let op = if self.consume_if(|k| matches!(k, TokenKind::Star)).is_some() {
                Some(BinaryOp::Mul)
            } else if self.consume_if(|k| matches!(k, TokenKind::Slash)).is_some() {
                Some(BinaryOp::Div)
            } else if self
                .consume_if(|k| matches!(k, TokenKind::Percent))
                .is_some()
            {
                Some(BinaryOp::Mod)
            } else {
                None
            };

            if let Some(op) = op {
                let right = self.parse_unary()?;
                expr = Expr::Binary {
                    op,
                    left: Box::new(expr),
                    right: Box::new(right),
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, RuleError> {
        if self.consume_if(|k| matches!(k, TokenKind::Minus)).is_some() {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Neg,
                expr: Box::new(expr),
            });
        }

        if self.consume_if(|k| matches!(k, TokenKind::Bang)).is_some() {
            let expr = self.parse_unary()?;
            return Ok(Expr::Unary {
                op: UnaryOp::Not,
                expr: Box::new(expr),
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expr, RuleError> {
        let mut expr = self.parse_primary()?;
        loop {
            if self.consume_if(|k| matches!(k, TokenKind::Dot)).is_some() {
                let property = self.expect_ident("expected property name after '.'")?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self
                .consume_if(|k| matches!(k, TokenKind::LBracket))
                .is_some()
            {
                let index = self.parse_expression()?;
                self.expect(
                    |k| matches!(k, TokenKind::RBracket),
                    "expected ']' after index",
                )?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self
                .consume_if(|k| matches!(k, TokenKind::LParen))
                .is_some()
            {
                let mut args = Vec::new();
                if self
                    .consume_if(|k| matches!(k, TokenKind::RParen))
                    .is_none()
                {
                    loop {
                        args.push(self.parse_expression()?);
                        if self.consume_if(|k| matches!(k, TokenKind::Comma)).is_some() {
                            continue;
                        }
                        self.expect(
                            |k| matches!(k, TokenKind::RParen),
                            "expected ')' after call arguments",
                        )?;
                        break;
                    }
                }
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, RuleError> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Number(n) => {
                self.pos += 1;
                Ok(Expr::Number(n))
            }
            TokenKind::String(ref s) => {
                self.pos += 1;
                Ok(Expr::String(s.clone()))
            }
            TokenKind::Bool(v) => {
                self.pos += 1;
                Ok(Expr::Bool(v))
            }
            TokenKind::Null => {
                self.pos += 1;
                Ok(Expr::Null)
            }
            TokenKind::Ident(ref s) => {
                self.pos += 1;
                Ok(Expr::Ident(s.clone()))
            }
            TokenKind::LBracket => {
                self.pos += 1;
                let mut elements = Vec::new();
                if self
                    .consume_if(|k| matches!(k, TokenKind::RBracket))
                    .is_none()
                {
                    loop {
                        elements.push(self.parse_expression()?);
                        if self.consume_if(|k| matches!(k, TokenKind::Comma)).is_some() {
                            continue;
                        }
                        self.expect(
                            |k| matches!(k, TokenKind::RBracket),
                            "expected ']' after array elements",
                        )?;
                        break;
                    }
                }
                Ok(Expr::Array(elements))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let expr = self.parse_expression()?;
                self.expect(
                    |k| matches!(k, TokenKind::RParen),
                    "expected ')' after expression",
                )?;
                Ok(expr)
            }
            _ => Err(RuleError::Script(format!(
                "unexpected token {:?} at {}",
                token.kind, token.pos
            ))),
        }
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn peek(&self, ahead: usize) -> &Token {
        let idx = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[idx]
    }

    fn consume_if(&mut self, predicate: fn(&TokenKind) -> bool) -> Option<&Token> {
        if predicate(&self.current().kind) {
            let current = &self.tokens[self.pos];
            self.pos += 1;
            Some(current)
        } else {
            None
        }
    }

    fn expect(
        &mut self,
        predicate: fn(&TokenKind) -> bool,
        message: &str,
    ) -> Result<(), RuleError> {
        if self.consume_if(predicate).is_some() {
            Ok(())
        } else {
            Err(RuleError::Script(format!(
                "{} at {}",
                message,
                self.current().pos
            )))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<String, RuleError> {
        match self.current().kind {
            TokenKind::Ident(ref s) => {
                let name = s.clone();
                self.pos += 1;
                Ok(name)
            }
            _ => Err(RuleError::Script(format!(
                "{} at {}",
                message,
                self.current().pos
            ))),
        }
    }
}
