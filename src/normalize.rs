//! Post-expansion AST normalization.
//!
//! The final pass over the filtered, fully macro-expanded tree. It removes
//! the macro-only node kinds that may legitimately remain (gensym inside a
//! bare quote, the quote itself) and canonicalizes ergonomic sugar the
//! earlier stages leave behind: dotted identifiers become property-access
//! chains, and type-annotation shorthand is stripped wherever it occurs.
//! Any other macro-only kind reaching this pass is a contract violation
//! and is reported rather than silently forwarded.

use crate::ast::{self, Expr, Program, Span, TypeNode};
use crate::diagnostics::YantraError;
use crate::macros::gensym::Gensyms;
use crate::macros::{quote, Env};

/// Normalizes a whole program.
pub fn normalize(program: Program, gensyms: &mut Gensyms) -> Result<Program, YantraError> {
    Ok(Program {
        body: normalize_program(program.body, gensyms)?,
    })
}

/// Normalizes a statement sequence.
pub fn normalize_program(
    body: Vec<Expr>,
    gensyms: &mut Gensyms,
) -> Result<Vec<Expr>, YantraError> {
    body.into_iter()
        .map(|stmt| normalize_expr(stmt, gensyms))
        .collect()
}

/// Normalizes one expression tree.
pub fn normalize_expr(expr: Expr, gensyms: &mut Gensyms) -> Result<Expr, YantraError> {
    match expr {
        // Residual gensyms should already be gone; resolve them anyway.
        Expr::Gensym {
            prefix,
            generated,
            span,
        } => Ok(Expr::ident(
            gensyms.fresh(prefix.as_deref(), generated.as_deref()),
            span,
        )),
        // A quote that survived the walker is converted here, with no
        // bindings in scope, and splice markers promoted to arrays.
        Expr::Quote(inner, span) => {
            let converted = quote::convert(&inner, &Env::new(), gensyms)?.into_node(span);
            normalize_expr(converted, gensyms)
        }
        Expr::Unquote(_, span) => Err(YantraError::ResidualMacroNode {
            kind: "unquote",
            span,
        }),
        Expr::UnquoteSplice(_, span) => Err(YantraError::ResidualMacroNode {
            kind: "unquote-splice",
            span,
        }),
        Expr::Defmacro { span, .. } => Err(YantraError::ResidualMacroNode {
            kind: "defmacro",
            span,
        }),
        Expr::Ident(name, span) if name.contains('.') => Ok(desugar_dotted(&name, span)),
        Expr::TypeAssert { expr, ty, span } => Ok(Expr::TypeAssert {
            expr: Box::new(normalize_expr(*expr, gensyms)?),
            ty: normalize_type(ty),
            span,
        }),
        other => ast::map_children(other, &mut |child| normalize_expr(child, gensyms)),
    }
}

/// Desugars a dotted identifier into a right-nested property chain:
/// `a.b.c` becomes property `c` of property `b` of identifier `a`.
fn desugar_dotted(name: &str, span: Span) -> Expr {
    let mut segments = name.split('.');
    // Degenerate names (leading/trailing/double dots) stay literal.
    if name.split('.').any(str::is_empty) {
        return Expr::ident(name, span);
    }
    let base = segments.next().unwrap_or(name);
    segments.fold(Expr::ident(base, span), |object, segment| Expr::Prop {
        object: Box::new(object),
        name: segment.to_string(),
        span,
    })
}

/// Canonicalizes type-annotation sugar recursively: object-type field
/// names shed a leading `.` or trailing `:`; structural type nodes are
/// recursed into.
fn normalize_type(ty: TypeNode) -> TypeNode {
    match ty {
        TypeNode::Ref(_, _) => ty,
        TypeNode::Object(fields, span) => TypeNode::Object(
            fields
                .into_iter()
                .map(|(name, field_ty)| (strip_field_sugar(&name), normalize_type(field_ty)))
                .collect(),
            span,
        ),
        TypeNode::Array(inner, span) => TypeNode::Array(Box::new(normalize_type(*inner)), span),
        TypeNode::Func(params, ret, span) => TypeNode::Func(
            params.into_iter().map(normalize_type).collect(),
            Box::new(normalize_type(*ret)),
            span,
        ),
        TypeNode::Union(members, span) => {
            TypeNode::Union(members.into_iter().map(normalize_type).collect(), span)
        }
        TypeNode::Intersect(members, span) => {
            TypeNode::Intersect(members.into_iter().map(normalize_type).collect(), span)
        }
    }
}

fn strip_field_sugar(name: &str) -> String {
    let name = name.strip_prefix('.').unwrap_or(name);
    let name = name.strip_suffix(':').unwrap_or(name);
    name.to_string()
}
