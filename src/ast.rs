use super::token::Token;
use std::fmt;
use std::fmt::Formatter;

/// Runtime value. The derived equality is the language's `==`: no coercion
/// between types, and `nil` equals only `nil`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nil,
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Boolean(x) => *x,
            Value::Number(_) | Value::String(_) => true,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => write!(f, "nil"),
            Value::Boolean(x) => write!(f, "{}", x),
            Value::Number(x) if x.is_infinite() => {
                write!(f, "{}", if *x > 0.0 { "Infinity" } else { "-Infinity" })
            }
            // f64's Display already drops the ".0" of integral values.
            Value::Number(x) => write!(f, "{}", x),
            Value::String(x) => write!(f, "{}", x),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression<'a> {
    Binary {
        left: Box<Expression<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Grouping(Box<Expression<'a>>),
    Literal(Value),
    Logical {
        left: Box<Expression<'a>>,
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Ternary {
        condition: Box<Expression<'a>>,
        question: &'a Token<'a>,
        then_branch: Box<Expression<'a>>,
        else_branch: Box<Expression<'a>>,
    },
    Unary {
        operator: &'a Token<'a>,
        right: Box<Expression<'a>>,
    },
    Variable(&'a Token<'a>),
    Assign {
        name: &'a Token<'a>,
        value: Box<Expression<'a>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement<'a> {
    Print(Expression<'a>),
    Expression(Expression<'a>),
    Var {
        name: &'a Token<'a>,
        initializer: Option<Expression<'a>>,
    },
    Block(Vec<Statement<'a>>),
    If {
        condition: Expression<'a>,
        then_branch: Box<Statement<'a>>,
        else_branch: Option<Box<Statement<'a>>>,
    },
    While {
        condition: Expression<'a>,
        body: Box<Statement<'a>>,
    },
    Break(&'a Token<'a>),
}

/// Renders a tree as nested s-expressions, e.g. `(* (- 123) (group 45.67))`.
pub struct AstPrinter {}

impl AstPrinter {
    pub fn print(&self, stmt: &Statement) -> String {
        match stmt {
            Statement::Print(expr) => format!("(print {})", self.expr(expr)),
            Statement::Expression(expr) => format!("(; {})", self.expr(expr)),
            Statement::Var { name, initializer } => match initializer {
                None => format!("(var {})", name.lexeme),
                Some(init) => format!("(var {} {})", name.lexeme, self.expr(init)),
            },
            Statement::Block(stmts) => {
                let mut x = String::from("(block");
                for stmt in stmts {
                    x.push(' ');
                    x.push_str(self.print(stmt).as_str());
                }
                x.push(')');
                x
            }
            Statement::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                None => format!("(if {} {})", self.expr(condition), self.print(then_branch)),
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.expr(condition),
                    self.print(then_branch),
                    self.print(else_branch)
                ),
            },
            Statement::While { condition, body } => {
                format!("(while {} {})", self.expr(condition), self.print(body))
            }
            Statement::Break(_) => String::from("(break)"),
        }
    }
    pub fn expr(&self, n: &Expression) -> String {
        match n {
            Expression::Binary {
                left,
                operator,
                right,
            } => self.parenthesize(operator.lexeme, &[&**left, &**right]),
            Expression::Grouping(x) => self.parenthesize("group", &[&**x]),
            Expression::Literal(x) => match x {
                Value::String(y) => format!("\"{}\"", y),
                _ => x.to_string(),
            },
            Expression::Unary { operator, right } => {
                self.parenthesize(operator.lexeme, &[&**right])
            }
            Expression::Variable(x) => x.lexeme.to_string(),
            Expression::Assign { name, value } => {
                format!("(assign {} {})", name.lexeme, self.expr(value))
            }
            Expression::Logical {
                left,
                operator,
                right,
            } => self.parenthesize(operator.lexeme, &[&**left, &**right]),
            Expression::Ternary {
                condition,
                then_branch,
                else_branch,
                ..
            } => self.parenthesize("?:", &[&**condition, &**then_branch, &**else_branch]),
        }
    }
    fn parenthesize(&self, name: &str, args: &[&Expression]) -> String {
        let mut x = String::from("(");
        x.push_str(name);
        for arg in args {
            x.push(' ');
            x.push_str(self.expr(arg).as_str());
        }
        x.push(')');
        x
    }
}
