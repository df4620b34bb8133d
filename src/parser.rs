use super::ast::{Expression, Statement, Value};
use super::diagnostics::ParseError;
use super::token::{Literal, Token, TokenType};
use tracing::{debug, instrument, trace};

type ParseResult<T> = Result<T, ParseError>;

/// Recursive descent parser with one token of lookahead.
///
/// A failed statement is reported, skipped up to the next statement
/// boundary, and left out of the program, so one pass collects every
/// syntax error.
pub struct Parser<'a> {
    tokens: &'a [Token<'a>],
    current: usize,
    loop_depth: usize,
    errors: Vec<ParseError>,
}

impl<'a> Parser<'a> {
    /// `tokens` must end with an `EOF` token, as `scan_tokens` guarantees.
    pub fn new(tokens: &'a [Token<'a>]) -> Parser<'a> {
        Parser {
            tokens,
            current: 0,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }
    #[instrument(level = "debug", skip_all)]
    pub fn parse(mut self) -> (Vec<Statement<'a>>, Vec<ParseError>) {
        let mut statements: Vec<Statement<'a>> = Vec::new();
        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        debug!(
            statements = statements.len(),
            errors = self.errors.len(),
            "parsed"
        );
        (statements, self.errors)
    }
    fn declaration(&mut self) -> Option<Statement<'a>> {
        let result = match self.peek().tokentype {
            TokenType::Var => {
                self.advance();
                self.var_declaration()
            }
            _ => self.statement(),
        };
        match result {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                trace!(%error, "synchronizing");
                self.errors.push(error);
                self.synchronize();
                None
            }
        }
    }
    fn var_declaration(&mut self) -> ParseResult<Statement<'a>> {
        let name = self.consume(TokenType::Identifier, "Expect variable name.")?;
        let initializer = match self.peek().tokentype {
            TokenType::Equal => {
                self.advance();
                Some(self.expression()?)
            }
            _ => None,
        };
        self.consume(
            TokenType::Semicolon,
            "Expect ';' after variable declaration.",
        )?;
        Ok(Statement::Var { name, initializer })
    }
    fn statement(&mut self) -> ParseResult<Statement<'a>> {
        match self.peek().tokentype {
            TokenType::If => {
                self.advance();
                self.if_statement()
            }
            TokenType::Print => {
                self.advance();
                self.print_statement()
            }
            TokenType::LeftBrace => {
                self.advance();
                Ok(Statement::Block(self.block()?))
            }
            TokenType::While => {
                self.advance();
                self.while_statement()
            }
            TokenType::For => {
                self.advance();
                self.for_statement()
            }
            TokenType::Break => {
                let keyword = self.advance();
                self.break_statement(keyword)
            }
            TokenType::Continue => Err(self.error("'continue' is not supported.")),
            _ => self.expression_statement(),
        }
    }
    fn for_statement(&mut self) -> ParseResult<Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'for'.")?;
        let initializer: Option<Statement<'a>> = match self.peek().tokentype {
            TokenType::Semicolon => {
                self.advance();
                None
            }
            TokenType::Var => {
                self.advance();
                Some(self.var_declaration()?)
            }
            _ => Some(self.expression_statement()?),
        };

        let condition = match self.peek().tokentype {
            TokenType::Semicolon => Expression::Literal(Value::Boolean(true)),
            _ => self.expression()?,
        };
        self.consume(TokenType::Semicolon, "Expect ';' after loop condition.")?;

        let increment: Option<Expression<'a>> = match self.peek().tokentype {
            TokenType::RightParen => None,
            _ => Some(self.expression()?),
        };
        self.consume(TokenType::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.loop_body()?;

        if let Some(x) = increment {
            body = Statement::Block(vec![body, Statement::Expression(x)])
        }
        body = Statement::While {
            condition,
            body: Box::new(body),
        };
        match initializer {
            None => Ok(body),
            Some(x) => Ok(Statement::Block(vec![x, body])),
        }
    }
    fn while_statement(&mut self) -> ParseResult<Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after condition.")?;
        let body = self.loop_body()?;
        Ok(Statement::While {
            condition,
            body: Box::new(body),
        })
    }
    fn loop_body(&mut self) -> ParseResult<Statement<'a>> {
        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        body
    }
    fn break_statement(&mut self, keyword: &'a Token<'a>) -> ParseResult<Statement<'a>> {
        if self.loop_depth == 0 {
            return Err(ParseError::at(
                keyword,
                "Must be inside a loop to use 'break'.",
            ));
        }
        self.consume(TokenType::Semicolon, "Expect ';' after 'break'.")?;
        Ok(Statement::Break(keyword))
    }
    fn if_statement(&mut self) -> ParseResult<Statement<'a>> {
        self.consume(TokenType::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expect ')' after if condition.")?;
        let then_branch = Box::new(self.statement()?);
        let else_branch = match self.peek().tokentype {
            TokenType::Else => {
                self.advance();
                Some(Box::new(self.statement()?))
            }
            _ => None,
        };
        Ok(Statement::If {
            condition,
            then_branch,
            else_branch,
        })
    }
    fn block(&mut self) -> ParseResult<Vec<Statement<'a>>> {
        let mut statements: Vec<Statement<'a>> = Vec::new();
        while !self.is_at_end() && !self.peek().is(TokenType::RightBrace) {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }
        self.consume(TokenType::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }
    fn print_statement(&mut self) -> ParseResult<Statement<'a>> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after value.")?;
        Ok(Statement::Print(expr))
    }
    fn expression_statement(&mut self) -> ParseResult<Statement<'a>> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expect ';' after expression.")?;
        Ok(Statement::Expression(expr))
    }
    fn expression(&mut self) -> ParseResult<Expression<'a>> {
        self.assignment()
    }
    fn assignment(&mut self) -> ParseResult<Expression<'a>> {
        let expr = self.or()?;
        match self.peek().tokentype {
            TokenType::Equal => {
                let equals = self.advance();
                let value = self.assignment()?;
                match expr {
                    Expression::Variable(name) => Ok(Expression::Assign {
                        name,
                        value: Box::new(value),
                    }),
                    // Reported, but the statement keeps parsing.
                    _ => {
                        self.errors
                            .push(ParseError::at(equals, "Invalid assignment target."));
                        Ok(expr)
                    }
                }
            }
            _ => Ok(expr),
        }
    }
    fn or(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.and()?;
        while self.peek().is(TokenType::Or) {
            let operator = self.advance();
            let right = self.and()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn and(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.ternary()?;
        while self.peek().is(TokenType::And) {
            let operator = self.advance();
            let right = self.ternary()?;
            expr = Expression::Logical {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }
    fn ternary(&mut self) -> ParseResult<Expression<'a>> {
        let condition = self.equality()?;
        match self.peek().tokentype {
            TokenType::Question => {
                let question = self.advance();
                let then_branch = self.expression()?;
                self.consume(
                    TokenType::Colon,
                    "Expect ':' after then branch of conditional expression.",
                )?;
                let else_branch = self.ternary()?;
                Ok(Expression::Ternary {
                    condition: Box::new(condition),
                    question,
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                })
            }
            _ => Ok(condition),
        }
    }
    fn equality(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.comparison()?;
        loop {
            match self.peek().tokentype {
                TokenType::BangEqual | TokenType::EqualEqual => {
                    let operator = self.advance();
                    let right = self.comparison()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn comparison(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.addition()?;
        loop {
            match self.peek().tokentype {
                TokenType::Greater
                | TokenType::GreaterEqual
                | TokenType::Less
                | TokenType::LessEqual => {
                    let operator = self.advance();
                    let right = self.addition()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn addition(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.multiplication()?;
        loop {
            match self.peek().tokentype {
                TokenType::Minus | TokenType::Plus => {
                    let operator = self.advance();
                    let right = self.multiplication()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn multiplication(&mut self) -> ParseResult<Expression<'a>> {
        let mut expr = self.unary()?;
        loop {
            match self.peek().tokentype {
                TokenType::Slash | TokenType::Star => {
                    let operator = self.advance();
                    let right = self.unary()?;
                    expr = Expression::Binary {
                        left: Box::new(expr),
                        operator,
                        right: Box::new(right),
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }
    fn unary(&mut self) -> ParseResult<Expression<'a>> {
        match self.peek().tokentype {
            TokenType::Bang | TokenType::Minus => {
                let operator = self.advance();
                let right = self.unary()?;
                Ok(Expression::Unary {
                    operator,
                    right: Box::new(right),
                })
            }
            _ => self.primary(),
        }
    }
    fn primary(&mut self) -> ParseResult<Expression<'a>> {
        match self.peek().tokentype {
            TokenType::False => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(false)))
            }
            TokenType::True => {
                self.advance();
                Ok(Expression::Literal(Value::Boolean(true)))
            }
            TokenType::Nil => {
                self.advance();
                Ok(Expression::Literal(Value::Nil))
            }
            TokenType::Number | TokenType::String => {
                let token = self.advance();
                Ok(Expression::Literal(match token.literal {
                    Some(Literal::Number(x)) => Value::Number(x),
                    Some(Literal::String(x)) => Value::String(x.to_string()),
                    None => Value::Nil,
                }))
            }
            TokenType::Identifier => Ok(Expression::Variable(self.advance())),
            TokenType::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.consume(TokenType::RightParen, "Expect ')' after expression.")?;
                Ok(Expression::Grouping(Box::new(expr)))
            }
            _ => Err(self.error("Expect expression.")),
        }
    }
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if let TokenType::Semicolon = self.previous().tokentype {
                return;
            }
            match self.peek().tokentype {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => (),
            }
            self.advance();
        }
    }
    fn consume(&mut self, tokentype: TokenType, msg: &str) -> ParseResult<&'a Token<'a>> {
        if self.peek().is(tokentype) {
            Ok(self.advance())
        } else {
            trace!(expected = %tokentype, found = %self.peek().tokentype, "unexpected token");
            Err(self.error(msg))
        }
    }
    fn advance(&mut self) -> &'a Token<'a> {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }
    fn is_at_end(&self) -> bool {
        self.peek().is(TokenType::EOF)
    }
    fn peek(&self) -> &'a Token<'a> {
        let tokens = self.tokens;
        &tokens[self.current]
    }
    fn previous(&self) -> &'a Token<'a> {
        let tokens = self.tokens;
        &tokens[self.current.saturating_sub(1)]
    }
    fn error(&self, msg: &str) -> ParseError {
        ParseError::at(self.peek(), msg)
    }
}
