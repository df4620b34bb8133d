use crate::token::{Token, TokenType};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error: {message}")]
pub struct ScanError {
    pub line: usize,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] Error{location}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub location: String,
    pub message: String,
}

impl ParseError {
    pub fn at(token: &Token, message: &str) -> ParseError {
        let location = match token.tokentype {
            TokenType::EOF => " at end".to_string(),
            _ => format!(" at '{}'", token.lexeme),
        };
        ParseError {
            line: token.line,
            location,
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
#[error("[line {line}] {message}", line = .token.line)]
pub struct RuntimeError<'a> {
    pub token: &'a Token<'a>,
    pub message: String,
}

impl<'a> RuntimeError<'a> {
    pub fn new(token: &'a Token<'a>, message: impl Into<String>) -> RuntimeError<'a> {
        RuntimeError {
            token,
            message: message.into(),
        }
    }
}

/// Collects the errors of a run and remembers which kinds occurred.
///
/// Every report is echoed to stderr as it arrives. The host reads
/// `had_error` / `had_runtime_error` to pick an exit code.
#[derive(Debug, Default)]
pub struct Diagnostics {
    had_error: bool,
    had_runtime_error: bool,
    reports: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics::default()
    }
    pub fn report_error(&mut self, line: usize, location: &str, message: &str) {
        self.had_error = true;
        self.emit(format!("[line {}] Error{}: {}", line, location, message));
    }
    pub fn report_scan_error(&mut self, error: &ScanError) {
        self.report_error(error.line, "", &error.message);
    }
    pub fn report_parse_error(&mut self, error: &ParseError) {
        self.report_error(error.line, &error.location, &error.message);
    }
    pub fn report_runtime_error(&mut self, error: &RuntimeError) {
        self.had_runtime_error = true;
        self.emit(error.to_string());
    }
    pub fn had_error(&self) -> bool {
        self.had_error
    }
    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }
    /// Clears both flags between prompt submissions. Reports are kept.
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }
    pub fn reports(&self) -> &[String] {
        &self.reports
    }
    /// Drains the rendered reports, leaving the flags untouched.
    pub fn take_reports(&mut self) -> Vec<String> {
        std::mem::take(&mut self.reports)
    }
    fn emit(&mut self, report: String) {
        debug!(%report, "diagnostic");
        eprintln!("{}", report);
        self.reports.push(report);
    }
}

#[cfg(test)]
mod diagnostics_tests {
    use super::*;

    #[test]
    fn static_errors_render_with_location() {
        let eof = Token::new(TokenType::EOF, "", 3);
        let semi = Token::new(TokenType::Semicolon, ";", 2);
        assert_eq!(
            ParseError::at(&eof, "Expect expression.").to_string(),
            "[line 3] Error at end: Expect expression."
        );
        assert_eq!(
            ParseError::at(&semi, "Expect expression.").to_string(),
            "[line 2] Error at ';': Expect expression."
        );
        let scan = ScanError {
            line: 1,
            message: "Unexpected character.".to_string(),
        };
        assert_eq!(scan.to_string(), "[line 1] Error: Unexpected character.");
    }

    #[test]
    fn runtime_errors_render_line_and_message() {
        let minus = Token::new(TokenType::Minus, "-", 7);
        let error = RuntimeError::new(&minus, "Operand must be a number.");
        assert_eq!(error.to_string(), "[line 7] Operand must be a number.");
    }

    #[test]
    fn flags_track_each_kind_independently() {
        let mut diagnostics = Diagnostics::new();
        assert!(!diagnostics.had_error());
        diagnostics.report_error(1, "", "Unexpected character.");
        assert!(diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());

        let plus = Token::new(TokenType::Plus, "+", 2);
        diagnostics.report_runtime_error(&RuntimeError::new(&plus, "Operands must be numbers."));
        assert!(diagnostics.had_runtime_error());
        assert_eq!(
            diagnostics.reports(),
            &[
                "[line 1] Error: Unexpected character.".to_string(),
                "[line 2] Operands must be numbers.".to_string(),
            ]
        );

        diagnostics.reset();
        assert!(!diagnostics.had_error());
        assert!(!diagnostics.had_runtime_error());
        assert_eq!(diagnostics.reports().len(), 2);
    }

    #[test]
    fn take_reports_drains_between_submissions() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.report_error(1, " at end", "Expect expression.");
        assert_eq!(
            diagnostics.take_reports(),
            vec!["[line 1] Error at end: Expect expression.".to_string()]
        );
        assert!(diagnostics.reports().is_empty());
        assert!(diagnostics.had_error());

        diagnostics.reset();
        diagnostics.report_error(2, "", "Unexpected character.");
        assert_eq!(diagnostics.take_reports().len(), 1);
    }
}
