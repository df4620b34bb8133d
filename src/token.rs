use strum_macros::Display;

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum TokenType {
    // Single-character tokens.
    LeftParen, RightParen, LeftBrace, RightBrace,
    Comma, Dot, Minus, Plus, Semicolon, Slash, Star,
    Question, Colon,

    // One or two character tokens.
    Bang, BangEqual,
    Equal, EqualEqual,
    Greater, GreaterEqual,
    Less, LessEqual,

    // Literals.
    Identifier, String, Number,

    // Keywords.
    And, Break, Class, Continue, Else, False, Fun, For, If, Nil, Or,
    Print, Return, Super, This, True, Var, While,

    EOF
}

/// Decoded value carried by number and string tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Literal<'a> {
    Number(f64),
    String(&'a str),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token<'a> {
    pub tokentype: TokenType,
    pub lexeme: &'a str,
    pub literal: Option<Literal<'a>>,
    pub line: usize,
}

impl<'a> Token<'a> {
    pub fn new(tokentype: TokenType, lexeme: &'a str, line: usize) -> Token<'a> {
        Token {
            tokentype,
            lexeme,
            literal: None,
            line,
        }
    }
    pub fn is(&self, tokentype: TokenType) -> bool {
        self.tokentype == tokentype
    }
}
