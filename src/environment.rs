use super::ast::Value;
use super::diagnostics::RuntimeError;
use super::token::Token;
use std::collections::BTreeMap;
use tracing::trace;

/// A binding is `None` from a bare `var x;` until its first assignment.
type Slot = Option<Value>;

/// The scope chain, innermost last. Scope `i` is enclosed by scope `i - 1`
/// and index 0 is the global scope, which is never popped.
#[derive(Debug)]
pub struct Environment {
    values: Vec<BTreeMap<String, Slot>>,
}

impl Default for Environment {
    fn default() -> Self {
        Environment::new()
    }
}

impl Environment {
    pub fn new() -> Environment {
        Environment {
            values: vec![BTreeMap::new()],
        }
    }
    pub fn start_block(&mut self) {
        self.values.push(BTreeMap::new());
        trace!(depth = self.depth(), "enter scope");
    }
    pub fn end_block(&mut self) {
        if self.values.len() > 1 {
            self.values.pop();
        }
        trace!(depth = self.depth(), "leave scope");
    }
    /// Number of scopes above the global one.
    pub fn depth(&self) -> usize {
        self.values.len() - 1
    }
    /// Binds in the innermost scope, replacing any binding of the same
    /// name there and shadowing outer ones.
    pub fn define(&mut self, name: &str, value: Option<Value>) {
        if let Some(scope) = self.values.last_mut() {
            scope.insert(name.to_string(), value);
        }
    }
    pub fn get<'a>(&self, token: &'a Token<'a>) -> Result<Value, RuntimeError<'a>> {
        for cur in self.values.iter().rev() {
            if let Some(slot) = cur.get(token.lexeme) {
                return match slot {
                    Some(x) => Ok(x.clone()),
                    None => Err(RuntimeError::new(
                        token,
                        format!("Cannot access uninitialized variable '{}'.", token.lexeme),
                    )),
                };
            }
        }
        Err(undefined(token))
    }
    pub fn assign<'a>(&mut self, token: &'a Token<'a>, value: Value) -> Result<(), RuntimeError<'a>> {
        for cur in self.values.iter_mut().rev() {
            if let Some(x) = cur.get_mut(token.lexeme) {
                *x = Some(value);
                return Ok(());
            }
        }
        Err(undefined(token))
    }
}

fn undefined<'a>(token: &'a Token<'a>) -> RuntimeError<'a> {
    RuntimeError::new(token, format!("Undefined variable '{}'.", token.lexeme))
}

#[cfg(test)]
mod environment_tests {
    use super::Environment;
    use crate::ast::Value;
    use crate::token::{Token, TokenType};

    fn name(lexeme: &str) -> Token<'_> {
        Token::new(TokenType::Identifier, lexeme, 1)
    }

    #[test]
    fn shadowing_and_scope_exit() {
        let a = name("a");
        let mut env = Environment::new();
        env.define("a", Some(Value::Number(1.0)));
        env.start_block();
        env.define("a", Some(Value::Number(2.0)));
        assert_eq!(env.get(&a), Ok(Value::Number(2.0)));
        env.end_block();
        assert_eq!(env.get(&a), Ok(Value::Number(1.0)));
    }

    #[test]
    fn assign_mutates_nearest_defining_scope() {
        let a = name("a");
        let mut env = Environment::new();
        env.define("a", Some(Value::Number(1.0)));
        env.start_block();
        env.start_block();
        assert!(env.assign(&a, Value::Number(5.0)).is_ok());
        env.end_block();
        env.end_block();
        assert_eq!(env.get(&a), Ok(Value::Number(5.0)));
    }

    #[test]
    fn assign_never_creates_a_binding() {
        let b = name("b");
        let mut env = Environment::new();
        let err = env.assign(&b, Value::Nil).unwrap_err();
        assert_eq!(err.message, "Undefined variable 'b'.");
        assert_eq!(
            env.get(&b).unwrap_err().message,
            "Undefined variable 'b'."
        );
    }

    #[test]
    fn redeclaration_overwrites() {
        let a = name("a");
        let mut env = Environment::new();
        env.define("a", Some(Value::Number(1.0)));
        env.define("a", Some(Value::String("x".to_string())));
        assert_eq!(env.get(&a), Ok(Value::String("x".to_string())));
    }

    #[test]
    fn uninitialized_differs_from_nil() {
        let u = name("u");
        let n = name("n");
        let mut env = Environment::new();
        env.define("u", None);
        env.define("n", Some(Value::Nil));
        assert_eq!(
            env.get(&u).unwrap_err().message,
            "Cannot access uninitialized variable 'u'."
        );
        assert_eq!(env.get(&n), Ok(Value::Nil));
        env.assign(&u, Value::Nil).unwrap();
        assert_eq!(env.get(&u), Ok(Value::Nil));
    }

    #[test]
    fn global_scope_survives_extra_end_block() {
        let a = name("a");
        let mut env = Environment::new();
        env.define("a", Some(Value::Boolean(true)));
        env.end_block();
        assert_eq!(env.depth(), 0);
        assert_eq!(env.get(&a), Ok(Value::Boolean(true)));
    }
}
