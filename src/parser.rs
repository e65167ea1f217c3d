use crate::ast::*;
use crate::error::{Span, SparklingError, SparklingResult};
use crate::lexer::Lexer;
use crate::token::{Token, TokenKind};
use crate::value::Value;

use std::rc::Rc;

/// Parses a complete translation unit.
pub fn parse(source: &str) -> SparklingResult<Program> {
    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize()?;

    let mut parser = Parser::new(tokens);
    parser.parse()
}
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, current: 0 }
    }

    /// Parses the token stream as a program: global statements up to
    /// end of input.
    pub fn parse(&mut self) -> SparklingResult<Program> {
        let mut body = Vec::new();
        while !self.is_at_end() {
            body.push(self.parse_stmt(true)?);
        }

        // defensive: statement dispatch consumes every token, so a
        // parse that got here without error is at EOF
        if !self.is_at_end() {
            return Err(SparklingError::parser(
                "garbage after input",
                self.peek().span,
            ));
        }

        Ok(Program { body })
    }
    fn parse_stmt(&mut self, is_global: bool) -> SparklingResult<Stmt> {
        match self.peek_kind() {
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::Do => self.parse_do(),
            TokenKind::For => self.parse_for(),
            TokenKind::Foreach => self.parse_foreach(),
            TokenKind::Break => self.parse_break(),
            TokenKind::Continue => self.parse_continue(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Semicolon => self.parse_empty(),
            TokenKind::LBrace => self.parse_block(),
            TokenKind::Var => self.parse_vardecl(),
            // A function statement at file scope; in a local scope the
            // keyword can only start a function expression.
            TokenKind::Function if is_global => self.parse_function_stmt(),
            _ => self.parse_expr_stmt(),
        }
    }

    fn parse_if(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'if'
        let condition = self.parse_expr()?;
        let then_branch = Box::new(self.parse_block()?);

        // "else" may only be followed by a block or another "if";
        // else-if chains nest rightward.
        let else_branch = if self.match_kind(&TokenKind::Else) {
            match self.peek_kind() {
                TokenKind::LBrace => Some(Box::new(self.parse_block()?)),
                TokenKind::If => Some(Box::new(self.parse_if()?)),
                _ => {
                    return Err(SparklingError::parser(
                        "expected block or 'if' after 'else'",
                        self.peek().span,
                    ));
                }
            }
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    fn parse_while(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'while'
        let condition = self.parse_expr()?;
        let body = Box::new(self.parse_block()?);
        Ok(Stmt::While {
            condition,
            body,
            span,
        })
    }

    fn parse_do(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'do'
        let body = Box::new(self.parse_block()?);

        self.expect_kind(
            &TokenKind::While,
            "expected `while' after body of do-while statement",
        )?;
        let condition = self.parse_expr()?;
        self.expect_kind(
            &TokenKind::Semicolon,
            "expected `;' after condition of do-while statement",
        )?;

        Ok(Stmt::DoWhile {
            condition,
            body,
            span,
        })
    }

    fn parse_for(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'for'

        // All three header parts are full expressions; declarations and
        // empty parts are not allowed.
        let init = self.parse_expr()?;
        self.expect_kind(
            &TokenKind::Semicolon,
            "expected `;' after initialization of for loop",
        )?;

        let condition = self.parse_expr()?;
        self.expect_kind(
            &TokenKind::Semicolon,
            "expected `;' after condition of for loop",
        )?;

        let step = self.parse_expr()?;
        let body = Box::new(self.parse_block()?);

        Ok(Stmt::For {
            init,
            condition,
            step,
            body,
            span,
        })
    }

    fn parse_foreach(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'foreach'

        let key = self.expect_ident("key in foreach loop must be a variable")?;
        self.expect_kind(&TokenKind::As, "expected `as' after key in foreach loop")?;

        let value = self.expect_ident("value in foreach loop must be a variable")?;
        self.expect_kind(&TokenKind::In, "expected `in' after value in foreach loop")?;

        let iterable = self.parse_expr()?;
        let body = Box::new(self.parse_block()?);

        Ok(Stmt::Foreach {
            key,
            value,
            iterable,
            body,
            span,
        })
    }

    fn parse_break(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span;
        self.expect_kind(&TokenKind::Semicolon, "expected `;' after `break'")?;
        Ok(Stmt::Break { span })
    }

    fn parse_continue(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span;
        self.expect_kind(&TokenKind::Semicolon, "expected `;' after `continue'")?;
        Ok(Stmt::Continue { span })
    }

    fn parse_return(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'return'

        if self.match_kind(&TokenKind::Semicolon) {
            return Ok(Stmt::Return { value: None, span }); // return without value
        }

        let expr = self.parse_expr()?;
        self.expect_kind(
            &TokenKind::Semicolon,
            "expected `;' after expression in return statement",
        )?;
        Ok(Stmt::Return {
            value: Some(expr),
            span,
        })
    }

    fn parse_vardecl(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'var'
        let mut decls = Vec::new();

        loop {
            let decl_span = self.peek().span;
            let name = self.expect_ident("expected identifier in declaration")?;

            let initializer = if self.match_kind(&TokenKind::Eq) {
                Some(self.parse_expr()?)
            } else {
                None
            };

            decls.push(VarDeclarator {
                name,
                initializer,
                span: decl_span,
            });

            if !self.match_kind(&TokenKind::Comma) {
                break;
            }
        }

        self.expect_kind(
            &TokenKind::Semicolon,
            "expected `;' after variable initialization",
        )?;
        Ok(Stmt::VarDecl { decls, span })
    }

    fn parse_function_stmt(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume 'function'
        let name = self.expect_ident("expected function name in function statement")?;
        let params = self.parse_decl_args()?;
        let body = Box::new(self.parse_block()?);
        Ok(Stmt::FuncDecl {
            name,
            params,
            body,
            span,
        })
    }

    fn parse_block(&mut self) -> SparklingResult<Stmt> {
        let span = self
            .expect_kind(&TokenKind::LBrace, "expected `{' in block statement")?
            .span;

        // an empty block collapses to the empty statement
        if self.match_kind(&TokenKind::RBrace) {
            return Ok(Stmt::Empty { span });
        }

        let mut stmts = Vec::new();
        while !self.check_kind(&TokenKind::RBrace) && !self.is_at_end() {
            stmts.push(self.parse_stmt(false)?);
        }

        self.expect_kind(
            &TokenKind::RBrace,
            "expected `}' at end of block statement",
        )?;
        Ok(Stmt::Block { stmts, span })
    }

    fn parse_expr_stmt(&mut self) -> SparklingResult<Stmt> {
        let expr = self.parse_expr()?;
        let span = expr.span();
        self.expect_kind(&TokenKind::Semicolon, "expected `;' after expression")?;
        Ok(Stmt::ExprStmt { expr, span })
    }

    fn parse_empty(&mut self) -> SparklingResult<Stmt> {
        let span = self.advance().span; // consume ';'
        Ok(Stmt::Empty { span })
    }
    /// The expression grammar is a precedence ladder: each level either
    /// defers to the next tighter one or consumes its operators and
    /// combines.
    fn parse_expr(&mut self) -> SparklingResult<Expr> {
        self.parse_assignment()
    }

    fn parse_assignment(&mut self) -> SparklingResult<Expr> {
        let target = self.parse_concat()?;

        let span = self.peek().span;
        let op = match self.peek_kind() {
            TokenKind::Eq => None,
            TokenKind::PlusEq => Some(BinOp::Add),
            TokenKind::MinusEq => Some(BinOp::Sub),
            TokenKind::StarEq => Some(BinOp::Mul),
            TokenKind::SlashEq => Some(BinOp::Div),
            TokenKind::PercentEq => Some(BinOp::Mod),
            TokenKind::AmpEq => Some(BinOp::BitAnd),
            TokenKind::PipeEq => Some(BinOp::BitOr),
            TokenKind::CaretEq => Some(BinOp::BitXor),
            TokenKind::ShlEq => Some(BinOp::Shl),
            TokenKind::ShrEq => Some(BinOp::Shr),
            TokenKind::DotDotEq => Some(BinOp::Concat),
            _ => return Ok(target),
        };
        self.advance();

        // right recursion for right-associative operators
        let value = self.parse_assignment()?;

        Ok(match op {
            None => Expr::Assign {
                target: Box::new(target),
                value: Box::new(value),
                span,
            },
            Some(op) => Expr::CompoundAssign {
                op,
                target: Box::new(target),
                value: Box::new(value),
                span,
            },
        })
    }

    fn parse_concat(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::DotDot, BinOp::Concat)];
        self.binary_leftassoc(OPS, Self::parse_condexpr)
    }

    fn parse_condexpr(&mut self) -> SparklingResult<Expr> {
        let condition = self.parse_logical_or()?;

        if !self.check_kind(&TokenKind::Question) {
            return Ok(condition);
        }
        let span = self.advance().span; // consume '?'

        let then_branch = self.parse_expr()?;
        self.expect_kind(&TokenKind::Colon, "expected `:' in conditional expression")?;

        // the false branch nests: a?b:c?d:e groups as a?b:(c?d:e)
        let else_branch = self.parse_condexpr()?;

        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
            span,
        })
    }

    fn parse_logical_or(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::PipePipe, BinOp::Or)];
        self.binary_leftassoc(OPS, Self::parse_logical_and)
    }

    fn parse_logical_and(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::AmpAmp, BinOp::And)];
        self.binary_leftassoc(OPS, Self::parse_comparison)
    }

    fn parse_comparison(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[
            (TokenKind::EqEq, BinOp::Eq),
            (TokenKind::BangEq, BinOp::Ne),
            (TokenKind::Lt, BinOp::Lt),
            (TokenKind::Gt, BinOp::Gt),
            (TokenKind::LtEq, BinOp::Le),
            (TokenKind::GtEq, BinOp::Ge),
        ];
        self.binary_leftassoc(OPS, Self::parse_bitwise_or)
    }

    fn parse_bitwise_or(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::Pipe, BinOp::BitOr)];
        self.binary_leftassoc(OPS, Self::parse_bitwise_xor)
    }

    fn parse_bitwise_xor(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::Caret, BinOp::BitXor)];
        self.binary_leftassoc(OPS, Self::parse_bitwise_and)
    }

    fn parse_bitwise_and(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[(TokenKind::Amp, BinOp::BitAnd)];
        self.binary_leftassoc(OPS, Self::parse_shift)
    }

    fn parse_shift(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[
            (TokenKind::Shl, BinOp::Shl),
            (TokenKind::Shr, BinOp::Shr),
        ];
        self.binary_leftassoc(OPS, Self::parse_additive)
    }

    fn parse_additive(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[
            (TokenKind::Plus, BinOp::Add),
            (TokenKind::Minus, BinOp::Sub),
        ];
        self.binary_leftassoc(OPS, Self::parse_multiplicative)
    }

    fn parse_multiplicative(&mut self) -> SparklingResult<Expr> {
        const OPS: &[(TokenKind, BinOp)] = &[
            (TokenKind::Star, BinOp::Mul),
            (TokenKind::Slash, BinOp::Div),
            (TokenKind::Percent, BinOp::Mod),
        ];
        self.binary_leftassoc(OPS, Self::parse_prefix)
    }

    /// Drives one left-associative binary level: `subexpr` parses the
    /// next tighter level, `ops` maps this level's tokens to operators.
    /// Iteration instead of left recursion (which would not terminate).
    fn binary_leftassoc(
        &mut self,
        ops: &[(TokenKind, BinOp)],
        subexpr: fn(&mut Self) -> SparklingResult<Expr>,
    ) -> SparklingResult<Expr> {
        let mut left = subexpr(self)?;

        while let Some((op, span)) = self.match_operator(ops) {
            let right = subexpr(self)?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
                span,
            };
        }

        Ok(left)
    }

    fn parse_prefix(&mut self) -> SparklingResult<Expr> {
        let span = self.peek().span;

        let op = match self.peek_kind() {
            TokenKind::Plus => UnaryOp::Pos,
            TokenKind::Minus => UnaryOp::Neg,
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Tilde => UnaryOp::BitNot,
            TokenKind::Sizeof => UnaryOp::SizeOf,
            TokenKind::Typeof => UnaryOp::TypeOf,
            TokenKind::Hash => UnaryOp::NthArg,
            TokenKind::PlusPlus | TokenKind::MinusMinus => {
                let op = if matches!(self.peek_kind(), TokenKind::PlusPlus) {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                self.advance();
                // right recursion for right-associative operators
                let operand = self.parse_prefix()?;
                return Ok(Expr::PreIncDec {
                    op,
                    operand: Box::new(operand),
                    span,
                });
            }
            _ => return self.parse_postfix(),
        };
        self.advance();

        let operand = self.parse_prefix()?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
            span,
        })
    }

    fn parse_postfix(&mut self) -> SparklingResult<Expr> {
        let mut expr = self.parse_term()?;

        // iteration instead of left recursion - we want to terminate
        loop {
            let op_span = self.peek().span;
            match self.peek_kind() {
                TokenKind::PlusPlus => {
                    self.advance();
                    expr = Expr::PostIncDec {
                        op: IncDecOp::Inc,
                        operand: Box::new(expr),
                        span: op_span,
                    };
                }
                TokenKind::MinusMinus => {
                    self.advance();
                    expr = Expr::PostIncDec {
                        op: IncDecOp::Dec,
                        operand: Box::new(expr),
                        span: op_span,
                    };
                }
                TokenKind::LBracket => {
                    self.advance();
                    let index = self.parse_expr()?;
                    self.expect_kind(
                        &TokenKind::RBracket,
                        "expected `]' after expression in array subscript",
                    )?;
                    let span = expr.span();
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                        span,
                    };
                }
                TokenKind::LParen => {
                    self.advance();
                    let args = self.parse_call_args()?;
                    let span = expr.span();
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                TokenKind::Dot | TokenKind::Arrow => {
                    self.advance();
                    let member = self.expect_ident("expected identifier after . or -> operator")?;
                    let span = expr.span();
                    expr = Expr::MemberAccess {
                        object: Box::new(expr),
                        member,
                        span,
                    };
                }
                _ => break,
            }
        }

        Ok(expr)
    }

    fn parse_term(&mut self) -> SparklingResult<Expr> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::LParen => {
                self.advance();
                let expr = self.parse_expr()?;
                self.expect_kind(
                    &TokenKind::RParen,
                    "expected `)' after parenthesized expression",
                )?;
                Ok(expr)
            }

            // only the anonymous form is allowed in an expression
            TokenKind::Function => self.parse_function_expr(),

            TokenKind::Ident(name) => {
                self.advance();
                Ok(Expr::Ident {
                    name,
                    span: token.span,
                })
            }

            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Bool(true),
                    span: token.span,
                })
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Bool(false),
                    span: token.span,
                })
            }
            TokenKind::Nil => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Nil,
                    span: token.span,
                })
            }
            TokenKind::Nan => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Float(f64::NAN),
                    span: token.span,
                })
            }

            TokenKind::Int(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Int(value),
                    span: token.span,
                })
            }
            TokenKind::Float(value) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Float(value),
                    span: token.span,
                })
            }
            TokenKind::Str(content) => {
                self.advance();
                Ok(Expr::Literal {
                    value: Value::Str(Rc::new(content)),
                    span: token.span,
                })
            }

            _ => Err(SparklingError::parser(
                format!("unexpected token {:?}", token.kind),
                token.span,
            )),
        }
    }

    fn parse_function_expr(&mut self) -> SparklingResult<Expr> {
        let span = self.advance().span; // consume 'function'
        let params = self.parse_decl_args()?;
        let body = Box::new(self.parse_block()?);
        Ok(Expr::Function { params, body, span })
    }

    fn parse_decl_args(&mut self) -> SparklingResult<Vec<String>> {
        self.expect_kind(&TokenKind::LParen, "expected `(' in function header")?;
        let mut params = Vec::new();

        if !self.check_kind(&TokenKind::RParen) {
            params.push(self.expect_ident("expected identifier in function argument list")?);
            while self.match_kind(&TokenKind::Comma) {
                params.push(self.expect_ident("expected identifier in function argument list")?);
            }
        }

        self.expect_kind(
            &TokenKind::RParen,
            "expected `)' after function argument list",
        )?;
        Ok(params)
    }

    fn parse_call_args(&mut self) -> SparklingResult<Vec<Expr>> {
        let mut args = Vec::new();

        if !self.check_kind(&TokenKind::RParen) {
            args.push(self.parse_expr()?);
            while self.match_kind(&TokenKind::Comma) {
                args.push(self.parse_expr()?);
            }
        }

        self.expect_kind(
            &TokenKind::RParen,
            "expected `)' after expression in function call",
        )?;
        Ok(args)
    }
    #[inline]
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    #[inline]
    fn peek_kind(&self) -> &TokenKind {
        &self.tokens[self.current].kind
    }

    #[inline]
    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    #[inline]
    fn is_at_end(&self) -> bool {
        matches!(self.tokens[self.current].kind, TokenKind::Eof)
    }

    fn check_kind(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.peek_kind()) == std::mem::discriminant(kind)
    }

    fn match_kind(&mut self, kind: &TokenKind) -> bool {
        if self.check_kind(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes the current token if its kind is listed in `ops`,
    /// returning the mapped operator.
    fn match_operator(&mut self, ops: &[(TokenKind, BinOp)]) -> Option<(BinOp, Span)> {
        let current = self.peek_kind();
        let op = ops
            .iter()
            .find(|(kind, _)| kind == current)
            .map(|(_, op)| *op)?;
        let token = self.advance();
        Some((op, token.span))
    }

    fn expect_kind(&mut self, kind: &TokenKind, msg: &str) -> SparklingResult<Token> {
        if self.check_kind(kind) {
            Ok(self.advance())
        } else {
            Err(SparklingError::parser(msg, self.peek().span))
        }
    }

    fn expect_ident(&mut self, msg: &str) -> SparklingResult<String> {
        let token = self.peek().clone();
        if let TokenKind::Ident(name) = token.kind {
            self.advance();
            Ok(name)
        } else {
            Err(SparklingError::parser(msg, token.span))
        }
    }
}
