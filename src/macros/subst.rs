//! Generic substitution fallback for macro-body evaluation.
//!
//! Covers every AST kind not given bespoke handling by the evaluator, so
//! macro bodies can freely use any language feature: a total deep copy
//! that replaces bound identifiers and recurses into every child position.

use crate::ast::Expr;
use crate::macros::Env;

/// Deep-copies `expr`, replacing every identifier bound in `env` with a
/// clone of its binding. Total: never fails, never skips a child position.
pub fn substitute(expr: &Expr, env: &Env) -> Expr {
    use Expr::*;
    match expr {
        Ident(name, _) => match env.get(name) {
            Some(bound) => bound.clone(),
            None => expr.clone(),
        },
        Lit(_, _) | Gensym { .. } => expr.clone(),
        Call { callee, args, span } => Call {
            callee: Box::new(substitute(callee, env)),
            args: substitute_all(args, env),
            span: *span,
        },
        Prop { object, name, span } => Prop {
            object: Box::new(substitute(object, env)),
            name: name.clone(),
            span: *span,
        },
        Index { object, index, span } => Index {
            object: Box::new(substitute(object, env)),
            index: Box::new(substitute(index, env)),
            span: *span,
        },
        New { ctor, args, span } => New {
            ctor: Box::new(substitute(ctor, env)),
            args: substitute_all(args, env),
            span: *span,
        },
        Array(items, span) => Array(substitute_all(items, env), *span),
        Object(fields, span) => Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, env)))
                .collect(),
            *span,
        ),
        Function {
            name,
            params,
            body,
            span,
        } => Function {
            name: name.clone(),
            params: params.clone(),
            body: substitute_all(body, env),
            span: *span,
        },
        Class {
            name,
            parent,
            members,
            span,
        } => Class {
            name: name.clone(),
            parent: parent.clone(),
            members: substitute_all(members, env),
            span: *span,
        },
        LetStar {
            bindings,
            body,
            span,
        } => LetStar {
            bindings: bindings
                .iter()
                .map(|(k, v)| (k.clone(), substitute(v, env)))
                .collect(),
            body: substitute_all(body, env),
            span: *span,
        },
        If {
            cond,
            then,
            alt,
            span,
        } => If {
            cond: Box::new(substitute(cond, env)),
            then: Box::new(substitute(then, env)),
            alt: alt.as_ref().map(|e| Box::new(substitute(e, env))),
            span: *span,
        },
        While { cond, body, span } => While {
            cond: Box::new(substitute(cond, env)),
            body: substitute_all(body, env),
            span: *span,
        },
        For {
            init,
            cond,
            step,
            body,
            span,
        } => For {
            init: Box::new(substitute(init, env)),
            cond: Box::new(substitute(cond, env)),
            step: Box::new(substitute(step, env)),
            body: substitute_all(body, env),
            span: *span,
        },
        Assign { target, value, span } => Assign {
            target: Box::new(substitute(target, env)),
            value: Box::new(substitute(value, env)),
            span: *span,
        },
        Return(value, span) => Return(
            value.as_ref().map(|e| Box::new(substitute(e, env))),
            *span,
        ),
        Throw(value, span) => Throw(Box::new(substitute(value, env)), *span),
        TryCatch {
            body,
            binding,
            handler,
            span,
        } => TryCatch {
            body: substitute_all(body, env),
            binding: binding.clone(),
            handler: substitute_all(handler, env),
            span: *span,
        },
        Block(stmts, span) => Block(substitute_all(stmts, env), *span),
        TypeAssert { expr, ty, span } => TypeAssert {
            expr: Box::new(substitute(expr, env)),
            ty: ty.clone(),
            span: *span,
        },
        Quote(inner, span) => Quote(Box::new(substitute(inner, env)), *span),
        Unquote(inner, span) => Unquote(Box::new(substitute(inner, env)), *span),
        UnquoteSplice(inner, span) => UnquoteSplice(Box::new(substitute(inner, env)), *span),
        Defmacro {
            name,
            params,
            body,
            span,
        } => Defmacro {
            name: name.clone(),
            params: params.clone(),
            body: substitute_all(body, env),
            span: *span,
        },
    }
}

fn substitute_all(items: &[Expr], env: &Env) -> Vec<Expr> {
    items.iter().map(|item| substitute(item, env)).collect()
}
