//! The compile-time macro-body evaluator.
//!
//! A small interpreter over the macro-body sublanguage, run once per macro
//! invocation against an environment seeded from the positional parameter
//! bindings. It operates on syntax, not runtime values: `let*` extends the
//! environment with bound subtrees, `if` is rebuilt as a runtime
//! conditional (a macro cannot select which branch's syntax appears in the
//! expansion), and everything without a bespoke rule falls through to the
//! generic substitution walker.

use crate::ast::{Expr, Lit, Span};
use crate::diagnostics::YantraError;
use crate::macros::gensym::Gensyms;
use crate::macros::quote::{self, Quoted};
use crate::macros::{subst, Env};

/// Evaluates one macro-body expression to the AST it produces.
pub fn evaluate(expr: &Expr, env: &Env, gensyms: &mut Gensyms) -> Result<Expr, YantraError> {
    let span = expr.span();
    Ok(evaluate_spliced(expr, env, gensyms)?.into_node(span))
}

/// Marker-aware evaluation. Only `unquote-splice` produces a
/// [`Quoted::Splice`]; every caller outside the quote converter must
/// flatten or promote it before the value escapes.
pub(crate) fn evaluate_spliced(
    expr: &Expr,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Quoted, YantraError> {
    use Expr::*;
    match expr {
        // A bound parameter yields an independent clone of its argument;
        // a free identifier stays a runtime reference.
        Ident(name, _) => Ok(Quoted::Node(match env.get(name) {
            Some(bound) => bound.clone(),
            None => expr.clone(),
        })),
        Lit(_, _) => Ok(Quoted::Node(expr.clone())),
        Gensym {
            prefix,
            generated,
            span,
        } => Ok(Quoted::Node(Expr::ident(
            gensyms.fresh(prefix.as_deref(), generated.as_deref()),
            *span,
        ))),
        // `unquote` outside of quote is legal: it simply evaluates its
        // argument in the current environment.
        Unquote(inner, _) => Ok(Quoted::Node(evaluate(inner, env, gensyms)?)),
        UnquoteSplice(inner, _) => {
            let value = evaluate(inner, env, gensyms)?;
            Ok(match value {
                Array(items, _) => Quoted::Splice(items),
                other => Quoted::Splice(vec![other]),
            })
        }
        Quote(inner, span) => {
            let converted = quote::convert(inner, env, gensyms)?.into_node(*span);
            Ok(Quoted::Node(converted))
        }
        LetStar {
            bindings,
            body,
            span,
        } => Ok(Quoted::Node(evaluate_let_star(
            bindings, body, *span, env, gensyms,
        )?)),
        If {
            cond,
            then,
            alt,
            span,
        } => {
            // Not compile-time-conditional: both branches are evaluated
            // for their substitutions and a runtime `if` is rebuilt.
            Ok(Quoted::Node(Expr::If {
                cond: Box::new(evaluate(cond, env, gensyms)?),
                then: Box::new(evaluate(then, env, gensyms)?),
                alt: match alt {
                    Some(e) => Some(Box::new(evaluate(e, env, gensyms)?)),
                    None => None,
                },
                span: *span,
            }))
        }
        Call { callee, args, span } => evaluate_call(callee, args, *span, env, gensyms),
        other => Ok(Quoted::Node(subst::substitute(other, env))),
    }
}

/// `let*` at compile time: bindings evaluate left-to-right into a growing
/// copy of the environment, then the body sequence runs in that scope and
/// the last value is returned.
fn evaluate_let_star(
    bindings: &[(String, Expr)],
    body: &[Expr],
    span: Span,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Expr, YantraError> {
    let mut scope = env.clone();
    for (name, value) in bindings {
        let bound = evaluate(value, &scope, gensyms)?;
        scope = scope.update(name.clone(), bound);
    }
    let mut result = Expr::Lit(Lit::Null, span);
    for stmt in body {
        result = evaluate(stmt, &scope, gensyms)?;
    }
    Ok(result)
}

fn evaluate_call(
    callee: &Expr,
    args: &[Expr],
    span: Span,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Quoted, YantraError> {
    let callee = evaluate(callee, env, gensyms)?;

    // Three pseudo-builtins are recognized at the macro-body level,
    // regardless of user macros.
    if let Expr::Ident(name, _) = &callee {
        match name.as_str() {
            "gensym" => {
                let prefix = args
                    .first()
                    .map(|arg| evaluate(arg, env, gensyms))
                    .transpose()?
                    .and_then(|arg| match arg {
                        Expr::Lit(Lit::Str(s), _) => Some(s),
                        _ => None,
                    });
                return Ok(Quoted::Node(Expr::ident(
                    gensyms.fresh(prefix.as_deref(), None),
                    span,
                )));
            }
            // `quote` receives its argument as raw syntax; converting the
            // evaluated form would substitute parameters twice and let
            // splice markers escape through the generic argument path.
            "quote" => {
                let quoted = match args.first() {
                    Some(arg) => quote::convert(arg, env, gensyms)?.into_node(span),
                    None => Expr::null(span),
                };
                return Ok(Quoted::Node(quoted));
            }
            // Sugar for building arrays without quoting.
            "array" => {
                return Ok(Quoted::Node(Expr::Array(
                    evaluate_args(args, env, gensyms)?,
                    span,
                )));
            }
            _ => {}
        }
    }

    Ok(Quoted::Node(Expr::Call {
        callee: Box::new(callee),
        args: evaluate_args(args, env, gensyms)?,
        span,
    }))
}

/// Evaluates an argument list, flattening splice markers in place.
fn evaluate_args(
    args: &[Expr],
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Vec<Expr>, YantraError> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match evaluate_spliced(arg, env, gensyms)? {
            Quoted::Splice(parts) => out.extend(parts),
            Quoted::Node(node) => out.push(node),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sp() -> Span {
        Span::default()
    }

    #[test]
    fn bound_parameters_are_cloned_independently() {
        let mut env = Env::new();
        let arg = Expr::Call {
            callee: Box::new(Expr::ident("f", sp())),
            args: vec![Expr::num(1.0, sp())],
            span: sp(),
        };
        env.insert("x".to_string(), arg.clone());
        let mut gensyms = Gensyms::new();

        let body = Expr::Quote(
            Box::new(Expr::Call {
                callee: Box::new(Expr::ident("array", sp())),
                args: vec![Expr::ident("~x", sp()), Expr::ident("~x", sp())],
                span: sp(),
            }),
            sp(),
        );
        let result = evaluate(&body, &env, &mut gensyms).unwrap();
        let Expr::Array(items, _) = result else {
            panic!("expected array, got {result}");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], arg);
        assert_eq!(items[1], arg);
    }

    #[test]
    fn let_star_bindings_see_earlier_bindings() {
        let env = Env::new();
        let mut gensyms = Gensyms::new();
        let expr = Expr::LetStar {
            bindings: vec![
                ("a".to_string(), Expr::num(1.0, sp())),
                ("b".to_string(), Expr::ident("a", sp())),
            ],
            body: vec![Expr::ident("b", sp())],
            span: sp(),
        };
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::num(1.0, sp())
        );
    }

    #[test]
    fn if_stays_a_runtime_conditional() {
        let mut env = Env::new();
        env.insert("c".to_string(), Expr::Lit(Lit::Bool(true), sp()));
        let mut gensyms = Gensyms::new();
        let expr = Expr::If {
            cond: Box::new(Expr::ident("c", sp())),
            then: Box::new(Expr::num(1.0, sp())),
            alt: Some(Box::new(Expr::num(2.0, sp()))),
            span: sp(),
        };
        // Both branches survive; only the condition is substituted.
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::If {
                cond: Box::new(Expr::Lit(Lit::Bool(true), sp())),
                then: Box::new(Expr::num(1.0, sp())),
                alt: Some(Box::new(Expr::num(2.0, sp()))),
                span: sp(),
            }
        );
    }

    #[test]
    fn array_pseudo_builtin_builds_an_array_node() {
        let mut env = Env::new();
        env.insert("x".to_string(), Expr::num(9.0, sp()));
        let mut gensyms = Gensyms::new();
        let expr = Expr::Call {
            callee: Box::new(Expr::ident("array", sp())),
            args: vec![Expr::ident("x", sp()), Expr::num(1.0, sp())],
            span: sp(),
        };
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::Array(vec![Expr::num(9.0, sp()), Expr::num(1.0, sp())], sp())
        );
    }

    #[test]
    fn gensym_pseudo_builtin_uses_string_prefix() {
        let env = Env::new();
        let mut gensyms = Gensyms::new();
        let expr = Expr::Call {
            callee: Box::new(Expr::ident("gensym", sp())),
            args: vec![Expr::str("tmp", sp())],
            span: sp(),
        };
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::ident("tmp_0", sp())
        );
    }

    #[test]
    fn splice_in_plain_call_arguments_flattens() {
        let mut env = Env::new();
        env.insert(
            "rest".to_string(),
            Expr::Array(vec![Expr::num(2.0, sp()), Expr::num(3.0, sp())], sp()),
        );
        let mut gensyms = Gensyms::new();
        let expr = Expr::Call {
            callee: Box::new(Expr::ident("f", sp())),
            args: vec![
                Expr::num(1.0, sp()),
                Expr::UnquoteSplice(Box::new(Expr::ident("rest", sp())), sp()),
            ],
            span: sp(),
        };
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::Call {
                callee: Box::new(Expr::ident("f", sp())),
                args: vec![
                    Expr::num(1.0, sp()),
                    Expr::num(2.0, sp()),
                    Expr::num(3.0, sp())
                ],
                span: sp(),
            }
        );
    }

    #[test]
    fn unquote_splice_of_a_non_array_becomes_a_single_element() {
        let mut env = Env::new();
        env.insert("x".to_string(), Expr::num(5.0, sp()));
        let mut gensyms = Gensyms::new();
        let expr = Expr::UnquoteSplice(Box::new(Expr::ident("x", sp())), sp());
        // At top level the marker is promoted to an array literal.
        assert_eq!(
            evaluate(&expr, &env, &mut gensyms).unwrap(),
            Expr::Array(vec![Expr::num(5.0, sp())], sp())
        );
    }
}
