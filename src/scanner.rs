use crate::diagnostics::ScanError;
use crate::token::{Literal, Token, TokenType};
use phf::phf_map;
use std::iter::Peekable;
use std::str::CharIndices;
use tracing::{debug, instrument};

// Note: current becomes self.iter.peek()?.0
struct Scanner<'a> {
    source: &'a str,
    iter: Peekable<CharIndices<'a>>,
    start: usize,
    line: usize,
    errors: Vec<ScanError>,
}

/// Scans the whole source. Lexical errors are collected rather than fatal,
/// and the token list always ends with a single `EOF`.
#[instrument(level = "debug", skip_all)]
pub fn scan_tokens(source: &str) -> (Vec<Token<'_>>, Vec<ScanError>) {
    let mut scanner = Scanner {
        source,
        iter: source.char_indices().peekable(),
        start: 0,
        line: 1,
        errors: Vec::new(),
    };
    let mut tokens: Vec<Token> = Vec::new();

    while let Some(&(idx, c)) = scanner.iter.peek() {
        scanner.start = idx;
        scanner.iter.next();
        if let Some(token) = scanner.scan_token(c) {
            tokens.push(token);
        }
    }
    tokens.push(Token::new(TokenType::EOF, "", scanner.line));
    debug!(
        tokens = tokens.len(),
        errors = scanner.errors.len(),
        "scanned"
    );
    (tokens, scanner.errors)
}

impl<'a> Scanner<'a> {
    fn scan_token(&mut self, c: char) -> Option<Token<'a>> {
        match c {
            '(' => Some(self.token(TokenType::LeftParen)),
            ')' => Some(self.token(TokenType::RightParen)),
            '{' => Some(self.token(TokenType::LeftBrace)),
            '}' => Some(self.token(TokenType::RightBrace)),
            ',' => Some(self.token(TokenType::Comma)),
            '.' => Some(self.token(TokenType::Dot)),
            '-' => Some(self.token(TokenType::Minus)),
            '+' => Some(self.token(TokenType::Plus)),
            ';' => Some(self.token(TokenType::Semicolon)),
            '*' => Some(self.token(TokenType::Star)),
            '?' => Some(self.token(TokenType::Question)),
            ':' => Some(self.token(TokenType::Colon)),
            '!' => Some(self.either('=', TokenType::BangEqual, TokenType::Bang)),
            '=' => Some(self.either('=', TokenType::EqualEqual, TokenType::Equal)),
            '<' => Some(self.either('=', TokenType::LessEqual, TokenType::Less)),
            '>' => Some(self.either('=', TokenType::GreaterEqual, TokenType::Greater)),
            '/' => {
                if self.next_if('/') {
                    while let Some(&(_, c)) = self.iter.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.iter.next();
                    }
                    None
                } else {
                    Some(self.token(TokenType::Slash))
                }
            }
            ' ' | '\r' | '\t' => None,
            '\n' => {
                self.line += 1;
                None
            }
            '"' => self.string(),
            '0'..='9' => Some(self.number()),
            'a'..='z' | 'A'..='Z' | '_' => Some(self.identifier()),
            _ => {
                self.error(self.line, "Unexpected character.");
                None
            }
        }
    }
    fn current(&mut self) -> usize {
        match self.iter.peek() {
            None => self.source.len(),
            Some((idx, _)) => *idx,
        }
    }
    fn token(&mut self, token_type: TokenType) -> Token<'a> {
        let current = self.current();
        Token::new(token_type, &self.source[self.start..current], self.line)
    }
    fn either(&mut self, expected: char, matched: TokenType, single: TokenType) -> Token<'a> {
        if self.next_if(expected) {
            self.token(matched)
        } else {
            self.token(single)
        }
    }
    fn next_if(&mut self, expected: char) -> bool {
        self.iter.next_if(|&(_, c)| c == expected).is_some()
    }
    fn error(&mut self, line: usize, message: &str) {
        self.errors.push(ScanError {
            line,
            message: message.to_string(),
        });
    }
    fn string(&mut self) -> Option<Token<'a>> {
        let start_line = self.line;
        loop {
            match self.iter.next() {
                None => {
                    self.error(start_line, "Unterminated string.");
                    return None;
                }
                Some((_, '"')) => break,
                Some((_, '\n')) => self.line += 1,
                Some(_) => (),
            }
        }
        let current = self.current();
        let mut token = self.token(TokenType::String);
        token.literal = Some(Literal::String(&self.source[self.start + 1..current - 1]));
        Some(token)
    }
    fn digits(&mut self) {
        while self.iter.next_if(|&(_, c)| c.is_ascii_digit()).is_some() {}
    }
    fn number(&mut self) -> Token<'a> {
        self.digits();

        // A fractional part needs at least one digit after the dot.
        if let Some(&(_, '.')) = self.iter.peek() {
            let mut lookahead = self.iter.clone();
            lookahead.next();
            if let Some(&(_, c)) = lookahead.peek() {
                if c.is_ascii_digit() {
                    self.iter.next();
                    self.digits();
                }
            }
        }

        let mut token = self.token(TokenType::Number);
        // Only ASCII digits and at most one interior dot were consumed.
        let value = token.lexeme.parse().unwrap_or(f64::NAN);
        token.literal = Some(Literal::Number(value));
        token
    }
    fn identifier(&mut self) -> Token<'a> {
        while self
            .iter
            .next_if(|&(_, c)| c.is_ascii_alphanumeric() || c == '_')
            .is_some()
        {}
        let current = self.current();
        match KEYWORDS.get(&self.source[self.start..current]) {
            None => self.token(TokenType::Identifier),
            Some(keyword) => self.token(*keyword),
        }
    }
}

static KEYWORDS: phf::Map<&'static str, TokenType> = phf_map! {
    "and" => TokenType::And,
    "break" => TokenType::Break,
    "class" => TokenType::Class,
    "continue" => TokenType::Continue,
    "else" => TokenType::Else,
    "false" => TokenType::False,
    "for" => TokenType::For,
    "fun" => TokenType::Fun,
    "if" => TokenType::If,
    "nil" => TokenType::Nil,
    "or" => TokenType::Or,
    "print" => TokenType::Print,
    "return" => TokenType::Return,
    "super" => TokenType::Super,
    "this" => TokenType::This,
    "true" => TokenType::True,
    "var" => TokenType::Var,
    "while" => TokenType::While,
};
