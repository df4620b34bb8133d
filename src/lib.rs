pub mod ast;
pub mod diagnostics;
pub mod environment;
pub mod interpreter;
pub mod parser;
pub mod scanner;
pub mod token;

use crate::ast::AstPrinter;
use crate::diagnostics::Diagnostics;
use crate::interpreter::Interpreter;
use std::io::{self, Write};
use tracing::{info_span, warn};

/// One interpreter session: a persistent global scope plus the error state
/// the host consults after each `run`.
pub struct Lox<W: Write = io::Stdout> {
    pub interpreter: Interpreter<W>,
    pub diagnostics: Diagnostics,
    print_ast: bool,
}

impl Default for Lox<io::Stdout> {
    fn default() -> Self {
        Lox::new()
    }
}

impl Lox<io::Stdout> {
    pub fn new() -> Lox<io::Stdout> {
        Lox::with_output(io::stdout())
    }
}

impl<W: Write> Lox<W> {
    pub fn with_output(out: W) -> Lox<W> {
        Lox {
            interpreter: Interpreter::with_output(out),
            diagnostics: Diagnostics::new(),
            print_ast: false,
        }
    }
    /// Echo every parsed statement as an s-expression before running it.
    pub fn print_ast(mut self, enabled: bool) -> Lox<W> {
        self.print_ast = enabled;
        self
    }
    pub fn output(&self) -> &W {
        self.interpreter.output()
    }
    /// Scans, parses and, if no static error was found, executes `source`.
    pub fn run(&mut self, source: &str) {
        let _span = info_span!("run", bytes = source.len()).entered();
        let (tokens, scan_errors) = scanner::scan_tokens(source);
        for error in &scan_errors {
            self.diagnostics.report_scan_error(error);
        }
        let (statements, parse_errors) = parser::Parser::new(&tokens).parse();
        for error in &parse_errors {
            self.diagnostics.report_parse_error(error);
        }
        if self.diagnostics.had_error() {
            return;
        }
        if self.print_ast {
            let printer = AstPrinter {};
            for stmt in &statements {
                let line = printer.print(stmt);
                if let Err(error) = writeln!(self.interpreter.output_mut(), "{}", line) {
                    warn!(%error, "failed to write syntax tree");
                }
            }
        }
        if let Err(error) = self.interpreter.interpret(&statements) {
            self.diagnostics.report_runtime_error(&error);
        }
    }
}
