//! Shared AST builders for the integration tests. Parsing is outside this
//! core, so tests construct program trees directly.

#![allow(dead_code)]

use yantra::{Expr, Span};

pub fn sp() -> Span {
    Span::default()
}

pub fn num(n: f64) -> Expr {
    Expr::num(n, sp())
}

pub fn ident(name: &str) -> Expr {
    Expr::ident(name, sp())
}

pub fn call(head: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(ident(head)),
        args,
        span: sp(),
    }
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::Array(items, sp())
}

pub fn quote(inner: Expr) -> Expr {
    Expr::Quote(Box::new(inner), sp())
}

pub fn defmacro(name: &str, params: &[&str], body: Vec<Expr>) -> Expr {
    Expr::Defmacro {
        name: name.to_string(),
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        span: sp(),
    }
}
