use crate::ast::{Expression, Statement, Value};
use crate::diagnostics::RuntimeError;
use crate::environment::Environment;
use crate::token::{Token, TokenType};
use std::io::{self, Write};
use tracing::{debug, instrument, trace, warn};

/// How a statement finished. `Break` travels up through enclosing blocks
/// until the nearest loop consumes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Normal,
    Break,
}

type Evaluated<'a> = Result<Value, RuntimeError<'a>>;
type Executed<'a> = Result<Completion, RuntimeError<'a>>;

pub struct Interpreter<W: Write = io::Stdout> {
    pub environment: Environment,
    out: W,
}

impl Default for Interpreter<io::Stdout> {
    fn default() -> Self {
        Interpreter::new()
    }
}

impl Interpreter<io::Stdout> {
    pub fn new() -> Interpreter<io::Stdout> {
        Interpreter::with_output(io::stdout())
    }
}

impl<W: Write> Interpreter<W> {
    /// An interpreter whose `print` statements write to `out`.
    pub fn with_output(out: W) -> Interpreter<W> {
        Interpreter {
            environment: Environment::new(),
            out,
        }
    }
    pub fn output(&self) -> &W {
        &self.out
    }
    pub fn output_mut(&mut self) -> &mut W {
        &mut self.out
    }
    /// Runs the program until it ends or the first runtime error.
    /// Global bindings persist across calls.
    #[instrument(level = "debug", skip_all, fields(statements = statements.len()))]
    pub fn interpret<'a>(&mut self, statements: &[Statement<'a>]) -> Result<(), RuntimeError<'a>> {
        for stmt in statements {
            if let Err(error) = self.execute(stmt) {
                debug!(%error, depth = self.environment.depth(), "runtime error");
                return Err(error);
            }
        }
        Ok(())
    }
    pub fn execute<'a>(&mut self, stmt: &Statement<'a>) -> Executed<'a> {
        match stmt {
            Statement::Print(e) => {
                let val = self.evaluate(e)?;
                if let Err(error) = writeln!(self.out, "{}", val) {
                    warn!(%error, "failed to write output");
                }
            }
            Statement::Expression(e) => {
                self.evaluate(e)?;
            }
            Statement::Var { name, initializer } => {
                let val = match initializer {
                    Some(e) => Some(self.evaluate(e)?),
                    None => None,
                };
                self.environment.define(name.lexeme, val);
            }
            Statement::Block(stmts) => return self.execute_block(stmts),
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    return self.execute(then_branch);
                } else if let Some(else_branch) = else_branch {
                    return self.execute(else_branch);
                }
            }
            Statement::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if self.execute(body)? == Completion::Break {
                        trace!("loop exited by break");
                        break;
                    }
                }
            }
            Statement::Break(_) => return Ok(Completion::Break),
        }
        Ok(Completion::Normal)
    }
    /// Runs `stmts` in a fresh child scope. The scope is popped on every
    /// exit path, including `break` and runtime errors.
    fn execute_block<'a>(&mut self, stmts: &[Statement<'a>]) -> Executed<'a> {
        self.environment.start_block();
        let result = self.run_statements(stmts);
        self.environment.end_block();
        result
    }
    fn run_statements<'a>(&mut self, stmts: &[Statement<'a>]) -> Executed<'a> {
        for stmt in stmts {
            if let Completion::Break = self.execute(stmt)? {
                return Ok(Completion::Break);
            }
        }
        Ok(Completion::Normal)
    }
    fn evaluate<'a>(&mut self, expr: &Expression<'a>) -> Evaluated<'a> {
        match expr {
            Expression::Literal(x) => Ok(x.clone()),
            Expression::Grouping(x) => self.evaluate(x),
            Expression::Unary { operator, right } => {
                let rv = self.evaluate(right)?;
                match operator.tokentype {
                    TokenType::Minus => match rv {
                        Value::Number(r) => Ok(Value::Number(-r)),
                        _ => Err(RuntimeError::new(*operator, "Operand must be a number.")),
                    },
                    TokenType::Bang => Ok(Value::Boolean(!rv.is_truthy())),
                    _ => Err(unknown_operator(*operator)),
                }
            }
            Expression::Binary {
                left,
                operator,
                right,
            } => {
                let lv = self.evaluate(left)?;
                let rv = self.evaluate(right)?;
                binary(*operator, lv, rv)
            }
            Expression::Ternary {
                condition,
                question,
                then_branch,
                else_branch,
            } => match self.evaluate(condition)? {
                Value::Boolean(true) => self.evaluate(then_branch),
                Value::Boolean(false) => self.evaluate(else_branch),
                _ => Err(RuntimeError::new(
                    *question,
                    "Ternary condition must be a boolean.",
                )),
            },
            Expression::Variable(token) => self.environment.get(*token),
            Expression::Assign { name, value } => {
                let value = self.evaluate(value)?;
                self.environment.assign(*name, value.clone())?;
                Ok(value)
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => {
                let left = self.evaluate(left)?;
                match operator.tokentype {
                    TokenType::Or if left.is_truthy() => Ok(left),
                    TokenType::And if !left.is_truthy() => Ok(left),
                    TokenType::Or | TokenType::And => self.evaluate(right),
                    _ => Err(unknown_operator(*operator)),
                }
            }
        }
    }
}

fn binary<'a>(operator: &'a Token<'a>, lv: Value, rv: Value) -> Evaluated<'a> {
    match operator.tokentype {
        TokenType::EqualEqual => return Ok(Value::Boolean(lv == rv)),
        TokenType::BangEqual => return Ok(Value::Boolean(lv != rv)),
        TokenType::Plus => {
            return match (lv, rv) {
                (Value::Number(l), Value::Number(r)) => Ok(Value::Number(l + r)),
                (Value::String(mut l), Value::String(r)) => {
                    l.push_str(r.as_str());
                    Ok(Value::String(l))
                }
                _ => Err(RuntimeError::new(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            }
        }
        _ => (),
    }
    let (l, r) = match (lv, rv) {
        (Value::Number(l), Value::Number(r)) => (l, r),
        _ => return Err(RuntimeError::new(operator, "Operands must be numbers.")),
    };
    match operator.tokentype {
        TokenType::Minus => Ok(Value::Number(l - r)),
        TokenType::Slash => Ok(Value::Number(l / r)),
        TokenType::Star => Ok(Value::Number(l * r)),
        TokenType::Greater => Ok(Value::Boolean(l > r)),
        TokenType::GreaterEqual => Ok(Value::Boolean(l >= r)),
        TokenType::Less => Ok(Value::Boolean(l < r)),
        TokenType::LessEqual => Ok(Value::Boolean(l <= r)),
        _ => Err(unknown_operator(operator)),
    }
}

fn unknown_operator<'a>(operator: &'a Token<'a>) -> RuntimeError<'a> {
    RuntimeError::new(
        operator,
        format!("Unknown operator '{}'.", operator.lexeme),
    )
}

#[cfg(test)]
mod interpreter_tests {
    use super::Interpreter;
    use crate::ast::Value;
    use crate::parser::Parser;
    use crate::scanner::scan_tokens;
    use crate::token::{Token, TokenType};
    use pretty_assertions::assert_eq;

    /// Runs `source` on a fresh interpreter; returns printed output and the
    /// runtime error message, if any.
    fn run(source: &str) -> (String, Option<String>) {
        let (tokens, scan_errors) = scan_tokens(source);
        assert!(scan_errors.is_empty(), "{:?}", scan_errors);
        let (statements, parse_errors) = Parser::new(&tokens).parse();
        assert!(parse_errors.is_empty(), "{:?}", parse_errors);
        let mut interpreter = Interpreter::with_output(Vec::new());
        let error = interpreter
            .interpret(&statements)
            .err()
            .map(|e| e.to_string());
        assert_eq!(interpreter.environment.depth(), 0);
        let output = String::from_utf8(interpreter.output().clone()).unwrap();
        (output, error)
    }

    fn prints(source: &str, expected: &str) {
        let (output, error) = run(source);
        assert_eq!(error, None);
        assert_eq!(output, expected);
    }

    fn fails(source: &str, expected: &str) {
        let (_, error) = run(source);
        assert_eq!(error.as_deref(), Some(expected));
    }

    #[test]
    fn arithmetic() {
        prints("print 1 + 1;", "2\n");
        prints("print 7 / 2;", "3.5\n");
        prints("print -(2 * 3) - 4;", "-10\n");
        prints("print 0.1 + 0.2;", "0.30000000000000004\n");
        prints("print 1 / 0;", "Infinity\n");
        prints("print -1 / 0;", "-Infinity\n");
        prints("print 0 / 0;", "NaN\n");
    }

    #[test]
    fn string_concatenation() {
        prints("print \"a\" + \"b\";", "ab\n");
        fails("print \"a\" + 1;", "[line 1] Operands must be two numbers or two strings.");
    }

    #[test]
    fn comparison_requires_numbers() {
        prints("print 1 < 2; print 2 <= 2; print 3 > 4; print 3 >= 4;", "true\ntrue\nfalse\nfalse\n");
        fails("print \"a\" < \"b\";", "[line 1] Operands must be numbers.");
        fails("print nil * 2;", "[line 1] Operands must be numbers.");
        fails("print -\"x\";", "[line 1] Operand must be a number.");
    }

    #[test]
    fn equality_has_no_coercion() {
        prints(
            "print nil == nil; print nil == false; print 1 == \"1\"; print \"a\" != \"a\"; print true == true;",
            "true\nfalse\nfalse\nfalse\ntrue\n",
        );
    }

    #[test]
    fn truthiness() {
        prints("if (0) print \"yes\"; else print \"no\";", "yes\n");
        prints("if (nil) print \"yes\"; else print \"no\";", "no\n");
        prints("if (\"\") print \"yes\";", "yes\n");
        prints("print !nil; print !0;", "true\nfalse\n");
    }

    #[test]
    fn logical_operators_return_operands() {
        prints("print nil or \"x\"; print 1 and 2; print false and 1;", "x\n2\nfalse\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        prints("print false and -\"boom\";", "false\n");
        prints("print true or -\"boom\";", "true\n");
        fails("print true and -\"boom\";", "[line 1] Operand must be a number.");
    }

    #[test]
    fn ternary_requires_boolean_condition() {
        prints("print true ? 1 : 2; print false ? 1 : 2;", "1\n2\n");
        fails("print 1 ? 2 : 3;", "[line 1] Ternary condition must be a boolean.");
        fails("print nil ? 2 : 3;", "[line 1] Ternary condition must be a boolean.");
    }

    #[test]
    fn ternary_evaluates_only_chosen_branch() {
        prints("print true ? 1 : -\"boom\";", "1\n");
    }

    #[test]
    fn block_scoping() {
        prints("var a = 1; { var a = 2; print a; } print a;", "2\n1\n");
        prints("var a = 1; { a = 2; } print a;", "2\n");
    }

    #[test]
    fn undefined_and_uninitialized_variables() {
        fails("b = 1;", "[line 1] Undefined variable 'b'.");
        fails("print c;", "[line 1] Undefined variable 'c'.");
        fails("var u;\nprint u;", "[line 2] Cannot access uninitialized variable 'u'.");
        prints("var n = nil; print n;", "nil\n");
        prints("var u; u = 3; print u;", "3\n");
    }

    #[test]
    fn runtime_error_aborts_remaining_program() {
        let (output, error) = run("print 1;\nprint -nil;\nprint 2;");
        assert_eq!(output, "1\n");
        assert_eq!(error.as_deref(), Some("[line 2] Operand must be a number."));
    }

    #[test]
    fn runtime_error_inside_block_restores_scope() {
        // `run` also asserts the scope chain is back at the global scope.
        fails("{ { var x = 1; print x - nil; } }", "[line 1] Operands must be numbers.");
        fails(
            "{ var y = 1; { print y + nil; } }",
            "[line 1] Operands must be two numbers or two strings.",
        );
    }

    #[test]
    fn loops() {
        prints("for (var i = 0; i < 3; i = i + 1) print i;", "0\n1\n2\n");
        prints("var i = 0; while (i < 2) { print i; i = i + 1; }", "0\n1\n");
    }

    #[test]
    fn break_exits_one_loop_level() {
        prints(
            "for (var i = 0; i < 3; i = i + 1) {\n  for (var j = 0; j < 3; j = j + 1) {\n    if (j == 1) { { break; } }\n    print i * 10 + j;\n  }\n}",
            "0\n10\n20\n",
        );
        prints("while (true) { print 1; break; print 2; } print 3;", "1\n3\n");
    }

    #[test]
    fn assignment_is_an_expression() {
        prints("var a; var b; a = b = 4; print a + b;", "8\n");
    }

    #[test]
    fn globals_persist_across_runs() {
        let first = Token::new(TokenType::Identifier, "g", 1);
        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter.environment.define("g", Some(Value::Number(9.0)));
        let (tokens, _) = scan_tokens("print g;");
        let (statements, _) = Parser::new(&tokens).parse();
        interpreter.interpret(&statements).unwrap();
        assert_eq!(interpreter.output().as_slice(), b"9\n");
        assert_eq!(interpreter.environment.get(&first), Ok(Value::Number(9.0)));
    }
}
