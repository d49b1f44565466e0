//! Quote / quasiquote conversion: turns a quoted syntax subtree into
//! concrete AST.
//!
//! Quoted code arrives in the generic "everything is a call" shape the
//! Lisp grammar produces; this module is the reader that reconstructs
//! typed nodes from it. Escapes (`unquote`, `unquote-splice`, the `~` and
//! `~@` identifier sigils) hand control back to the evaluator, and their
//! results re-enter quoting context as computed AST or splice markers.
//!
//! **INVARIANT:** [`Quoted::Splice`] is transient. Every production site
//! that receives one must flatten it into the surrounding list (or promote
//! it to an array literal) before the value escapes this module.

use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::ast::{Expr, Lit, Span, TypeNode};
use crate::diagnostics::YantraError;
use crate::macros::gensym::Gensyms;
use crate::macros::{collect, eval, Env};

/// Result of converting one quoted node: either a single AST node, or an
/// ordered run of nodes to be inlined into the surrounding list.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Quoted {
    Node(Expr),
    Splice(Vec<Expr>),
}

impl Quoted {
    /// Collapses to a single node, promoting a top-level splice to an
    /// array literal.
    pub(crate) fn into_node(self, span: Span) -> Expr {
        match self {
            Quoted::Node(expr) => expr,
            Quoted::Splice(items) => Expr::Array(items, span),
        }
    }
}

/// Converts a quoted subtree into concrete AST under `env`.
pub(crate) fn convert(
    expr: &Expr,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Quoted, YantraError> {
    use Expr::*;
    match expr {
        Unquote(inner, _) => Ok(Quoted::Node(eval::evaluate(inner, env, gensyms)?)),
        UnquoteSplice(inner, _) => Ok(splice_of(eval::evaluate(inner, env, gensyms)?)),
        Ident(name, span) => convert_ident(expr, name, *span, env, gensyms),
        Gensym {
            prefix,
            generated,
            span,
        } => Ok(Quoted::Node(Expr::ident(
            gensyms.fresh(prefix.as_deref(), generated.as_deref()),
            *span,
        ))),
        Lit(_, _) => Ok(Quoted::Node(expr.clone())),
        Call { callee, args, span } => convert_call(callee, args, *span, env, gensyms),
        Quote(inner, span) => {
            let inner = convert(inner, env, gensyms)?.into_node(*span);
            Ok(Quoted::Node(inner))
        }
        Array(items, span) => Ok(Quoted::Node(Expr::Array(
            convert_list(items, env, gensyms)?,
            *span,
        ))),
        Object(fields, span) => {
            let fields = fields
                .iter()
                .map(|(k, v)| Ok((k.clone(), convert_node(v, env, gensyms)?)))
                .collect::<Result<_, YantraError>>()?;
            Ok(Quoted::Node(Expr::Object(fields, *span)))
        }
        Block(stmts, span) => Ok(Quoted::Node(Expr::Block(
            convert_list(stmts, env, gensyms)?,
            *span,
        ))),
        LetStar {
            bindings,
            body,
            span,
        } => {
            let bindings = bindings
                .iter()
                .map(|(k, v)| Ok((k.clone(), convert_node(v, env, gensyms)?)))
                .collect::<Result<_, YantraError>>()?;
            Ok(Quoted::Node(Expr::LetStar {
                bindings,
                body: convert_list(body, env, gensyms)?,
                span: *span,
            }))
        }
        Function {
            name,
            params,
            body,
            span,
        } => Ok(Quoted::Node(Expr::Function {
            name: name.clone(),
            params: params.clone(),
            body: convert_list(body, env, gensyms)?,
            span: *span,
        })),
        Class {
            name,
            parent,
            members,
            span,
        } => Ok(Quoted::Node(Expr::Class {
            name: name.clone(),
            parent: parent.clone(),
            members: convert_list(members, env, gensyms)?,
            span: *span,
        })),
        If {
            cond,
            then,
            alt,
            span,
        } => Ok(Quoted::Node(Expr::If {
            cond: Box::new(convert_node(cond, env, gensyms)?),
            then: Box::new(convert_node(then, env, gensyms)?),
            alt: match alt {
                Some(e) => Some(Box::new(convert_node(e, env, gensyms)?)),
                None => None,
            },
            span: *span,
        })),
        While { cond, body, span } => Ok(Quoted::Node(Expr::While {
            cond: Box::new(convert_node(cond, env, gensyms)?),
            body: convert_list(body, env, gensyms)?,
            span: *span,
        })),
        For {
            init,
            cond,
            step,
            body,
            span,
        } => Ok(Quoted::Node(Expr::For {
            init: Box::new(convert_node(init, env, gensyms)?),
            cond: Box::new(convert_node(cond, env, gensyms)?),
            step: Box::new(convert_node(step, env, gensyms)?),
            body: convert_list(body, env, gensyms)?,
            span: *span,
        })),
        Assign { target, value, span } => Ok(Quoted::Node(Expr::Assign {
            target: Box::new(convert_node(target, env, gensyms)?),
            value: Box::new(convert_node(value, env, gensyms)?),
            span: *span,
        })),
        Prop { object, name, span } => Ok(Quoted::Node(Expr::Prop {
            object: Box::new(convert_node(object, env, gensyms)?),
            name: name.clone(),
            span: *span,
        })),
        Index { object, index, span } => Ok(Quoted::Node(Expr::Index {
            object: Box::new(convert_node(object, env, gensyms)?),
            index: Box::new(convert_node(index, env, gensyms)?),
            span: *span,
        })),
        New { ctor, args, span } => Ok(Quoted::Node(Expr::New {
            ctor: Box::new(convert_node(ctor, env, gensyms)?),
            args: convert_list(args, env, gensyms)?,
            span: *span,
        })),
        Return(value, span) => Ok(Quoted::Node(Expr::Return(
            match value {
                Some(e) => Some(Box::new(convert_node(e, env, gensyms)?)),
                None => None,
            },
            *span,
        ))),
        Throw(value, span) => Ok(Quoted::Node(Expr::Throw(
            Box::new(convert_node(value, env, gensyms)?),
            *span,
        ))),
        TryCatch {
            body,
            binding,
            handler,
            span,
        } => Ok(Quoted::Node(Expr::TryCatch {
            body: convert_list(body, env, gensyms)?,
            binding: binding.clone(),
            handler: convert_list(handler, env, gensyms)?,
            span: *span,
        })),
        TypeAssert { expr, ty, span } => Ok(Quoted::Node(Expr::TypeAssert {
            expr: Box::new(convert_node(expr, env, gensyms)?),
            ty: ty.clone(),
            span: *span,
        })),
        Defmacro {
            name,
            params,
            body,
            span,
        } => Ok(Quoted::Node(Expr::Defmacro {
            name: name.clone(),
            params: params.clone(),
            body: convert_list(body, env, gensyms)?,
            span: *span,
        })),
    }
}

/// Converts a child in a single-node position, promoting splices to arrays.
fn convert_node(expr: &Expr, env: &Env, gensyms: &mut Gensyms) -> Result<Expr, YantraError> {
    let span = expr.span();
    Ok(convert(expr, env, gensyms)?.into_node(span))
}

/// The one general algorithm for turning a quoted list into a concrete
/// list: convert each child in order, inlining splice items at their
/// position and appending single nodes.
fn convert_list(
    items: &[Expr],
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Vec<Expr>, YantraError> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match convert(item, env, gensyms)? {
            Quoted::Splice(parts) => out.extend(parts),
            Quoted::Node(node) => out.push(node),
        }
    }
    Ok(out)
}

fn splice_of(value: Expr) -> Quoted {
    match value {
        Expr::Array(items, _) => Quoted::Splice(items),
        other => Quoted::Splice(vec![other]),
    }
}

// ============================================================================
// IDENTIFIER SUGAR
// ============================================================================

fn convert_ident(
    expr: &Expr,
    name: &str,
    span: Span,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Quoted, YantraError> {
    // `~@name` is sugar for unquote-splice of the remaining name.
    if let Some(rest) = name.strip_prefix("~@") {
        let value = eval::evaluate(&sugar_operand(rest, span), env, gensyms)?;
        return Ok(splice_of(value));
    }
    // `~name` is the analogous sugar for plain unquote.
    if let Some(rest) = name.strip_prefix('~') {
        let value = eval::evaluate(&sugar_operand(rest, span), env, gensyms)?;
        return Ok(Quoted::Node(value));
    }
    // A bare symbol matching a bound macro parameter is implicitly
    // unquoted. Capture hazard: any quoted symbol sharing a parameter's
    // name is substituted, sigil or not.
    if let Some(bound) = env.get(name) {
        return Ok(Quoted::Node(bound.clone()));
    }
    // Otherwise the symbol stays literal syntax.
    Ok(Quoted::Node(expr.clone()))
}

/// A decimal remainder after a sigil is positional-argument shorthand for
/// a numeric literal, not an identifier reference.
fn sugar_operand(rest: &str, span: Span) -> Expr {
    if !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()) {
        if let Ok(n) = rest.parse::<f64>() {
            return Expr::num(n, span);
        }
    }
    Expr::ident(rest, span)
}

// ============================================================================
// CALL-SHAPE RECONSTRUCTION
// ============================================================================

fn convert_call(
    callee: &Expr,
    args: &[Expr],
    span: Span,
    env: &Env,
    gensyms: &mut Gensyms,
) -> Result<Quoted, YantraError> {
    let parts = convert_list(args, env, gensyms)?;
    if let Expr::Ident(head, _) = callee {
        if let Some(entry) = reconstruction(head) {
            return entry.reconstruct(parts, span).map(Quoted::Node);
        }
    }
    let callee = convert_node(callee, env, gensyms)?;
    Ok(Quoted::Node(Expr::Call {
        callee: Box::new(callee),
        args: parts,
        span,
    }))
}

/// One entry of the quasiquote reader table: a recognized head identifier,
/// its minimum argument count, and the constructor that rebuilds the
/// canonical node from the already-converted argument list. Adding a form
/// is one line in [`TABLE`].
struct Reconstruction {
    head: &'static str,
    min_args: usize,
    build: fn(Vec<Expr>, Span) -> Result<Expr, YantraError>,
}

impl Reconstruction {
    fn reconstruct(&self, args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
        if args.len() < self.min_args {
            return Err(YantraError::MalformedQuotedForm {
                head: self.head.to_string(),
                reason: format!(
                    "expected at least {} argument(s), found {}",
                    self.min_args,
                    args.len()
                ),
                span,
            });
        }
        (self.build)(args, span)
    }
}

static TABLE: &[Reconstruction] = &[
    Reconstruction { head: "array", min_args: 0, build: build_array },
    Reconstruction { head: "function", min_args: 2, build: build_function },
    Reconstruction { head: "return", min_args: 0, build: build_return },
    Reconstruction { head: "block", min_args: 0, build: build_block },
    Reconstruction { head: "assign", min_args: 2, build: build_assign },
    Reconstruction { head: "index", min_args: 2, build: build_index },
    Reconstruction { head: "prop", min_args: 2, build: build_prop },
    Reconstruction { head: "if", min_args: 2, build: build_if },
    Reconstruction { head: "type-assert", min_args: 2, build: build_type_assert },
    Reconstruction { head: "new", min_args: 1, build: build_new },
    Reconstruction { head: "call", min_args: 1, build: build_call },
];

static BY_HEAD: Lazy<HashMap<&'static str, &'static Reconstruction>> = Lazy::new(|| {
    let mut by_head = HashMap::with_capacity(TABLE.len());
    for entry in TABLE {
        let previous = by_head.insert(entry.head, entry);
        assert!(
            previous.is_none(),
            "duplicate reconstruction head '{}'",
            entry.head
        );
    }
    by_head
});

fn reconstruction(head: &str) -> Option<&'static Reconstruction> {
    BY_HEAD.get(head).copied()
}

fn missing(head: &str, span: Span) -> YantraError {
    YantraError::MalformedQuotedForm {
        head: head.to_string(),
        reason: "missing required argument".to_string(),
        span,
    }
}

fn build_array(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    Ok(Expr::Array(args, span))
}

fn build_function(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let name = match iter.next() {
        Some(Expr::Ident(name, _)) => Some(name),
        Some(Expr::Lit(Lit::Null, _)) => None,
        Some(other) => {
            return Err(YantraError::MalformedQuotedForm {
                head: "function".to_string(),
                reason: format!(
                    "function name must be an identifier or null, found {}",
                    other.kind_name()
                ),
                span,
            });
        }
        None => return Err(missing("function", span)),
    };
    let params = match iter.next() {
        Some(params) => collect::extract_param_names(&params),
        None => return Err(missing("function", span)),
    };
    Ok(Expr::Function {
        name,
        params,
        body: iter.collect(),
        span,
    })
}

fn build_return(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    Ok(Expr::Return(args.into_iter().next().map(Box::new), span))
}

fn build_block(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    Ok(Expr::Block(args, span))
}

fn build_assign(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let target = iter.next().ok_or_else(|| missing("assign", span))?;
    let value = iter.next().ok_or_else(|| missing("assign", span))?;
    Ok(Expr::Assign {
        target: Box::new(target),
        value: Box::new(value),
        span,
    })
}

fn build_index(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let object = iter.next().ok_or_else(|| missing("index", span))?;
    let index = iter.next().ok_or_else(|| missing("index", span))?;
    Ok(Expr::Index {
        object: Box::new(object),
        index: Box::new(index),
        span,
    })
}

fn build_prop(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let object = iter.next().ok_or_else(|| missing("prop", span))?;
    let name = match iter.next() {
        Some(Expr::Lit(lit, _)) => lit_prop_name(&lit),
        Some(other) => {
            return Err(YantraError::NonLiteralPropName {
                found: other.kind_name().to_string(),
                span,
            });
        }
        None => return Err(missing("prop", span)),
    };
    Ok(Expr::Prop {
        object: Box::new(object),
        name,
        span,
    })
}

fn lit_prop_name(lit: &Lit) -> String {
    match lit {
        Lit::Str(s) => s.clone(),
        Lit::Num(n) => n.to_string(),
        Lit::Bool(b) => b.to_string(),
        Lit::Null => "null".to_string(),
    }
}

fn build_if(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let cond = iter.next().ok_or_else(|| missing("if", span))?;
    let then = iter.next().ok_or_else(|| missing("if", span))?;
    let alt = iter.next().map(Box::new);
    Ok(Expr::If {
        cond: Box::new(cond),
        then: Box::new(then),
        alt,
        span,
    })
}

fn build_type_assert(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let expr = iter.next().ok_or_else(|| missing("type-assert", span))?;
    let ty = match iter.next() {
        Some(Expr::Call { callee, args, span: ty_span })
            if matches!(&*callee, Expr::Ident(name, _) if name == "type-ref") =>
        {
            match args.into_iter().next() {
                Some(Expr::Lit(Lit::Str(name), _)) => TypeNode::Ref(name, ty_span),
                _ => {
                    return Err(YantraError::MalformedQuotedForm {
                        head: "type-assert".to_string(),
                        reason: "`type-ref` takes a single string literal".to_string(),
                        span,
                    });
                }
            }
        }
        _ => {
            return Err(YantraError::MalformedQuotedForm {
                head: "type-assert".to_string(),
                reason: "second argument must be a `type-ref(\"name\")` call".to_string(),
                span,
            });
        }
    };
    Ok(Expr::TypeAssert {
        expr: Box::new(expr),
        ty,
        span,
    })
}

fn build_new(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let ctor = iter.next().ok_or_else(|| missing("new", span))?;
    let rest: Vec<Expr> = iter.collect();
    // A single array-literal argument is spread into positional arguments.
    let args = match <[Expr; 1]>::try_from(rest) {
        Ok([Expr::Array(items, _)]) => items,
        Ok([other]) => vec![other],
        Err(rest) => rest,
    };
    Ok(Expr::New {
        ctor: Box::new(ctor),
        args,
        span,
    })
}

fn build_call(args: Vec<Expr>, span: Span) -> Result<Expr, YantraError> {
    let mut iter = args.into_iter();
    let callee = iter.next().ok_or_else(|| missing("call", span))?;
    Ok(Expr::Call {
        callee: Box::new(callee),
        args: iter.collect(),
        span,
    })
}
