//! Core AST types for the Yantra front end.
//!
//! One closed `Expr` family covers both statements and expressions across
//! every compilation stage, including the macro-only kinds (`Quote`,
//! `Unquote`, `UnquoteSplice`, `Gensym`, `Defmacro`) that exist only
//! between parsing and the end of macro expansion. All nodes carry a span
//! for source tracking.

use serde::{Deserialize, Serialize};

/// Represents a span in the source code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A full program: an ordered sequence of top-level statements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Program {
    pub body: Vec<Expr>,
}

/// Literal values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
}

/// Type-annotation nodes, as produced by the later parser stages.
///
/// Field names in `Object` may still carry parser sugar (a leading `.` or
/// trailing `:`); the normalizer strips it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeNode {
    Ref(String, Span),
    Object(Vec<(String, TypeNode)>, Span),
    Array(Box<TypeNode>, Span),
    Func(Vec<TypeNode>, Box<TypeNode>, Span),
    Union(Vec<TypeNode>, Span),
    Intersect(Vec<TypeNode>, Span),
}

/// The core AST node family.
///
/// Ownership is strictly tree-shaped: a node owns its children, and sharing
/// only happens through deliberate cloning during macro substitution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Lit(Lit, Span),
    Ident(String, Span),
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Prop {
        object: Box<Expr>,
        name: String,
        span: Span,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    New {
        ctor: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Array(Vec<Expr>, Span),
    Object(Vec<(String, Expr)>, Span),
    Function {
        name: Option<String>,
        params: Vec<String>,
        body: Vec<Expr>,
        span: Span,
    },
    Class {
        name: String,
        parent: Option<String>,
        members: Vec<Expr>,
        span: Span,
    },
    LetStar {
        bindings: Vec<(String, Expr)>,
        body: Vec<Expr>,
        span: Span,
    },
    If {
        cond: Box<Expr>,
        then: Box<Expr>,
        alt: Option<Box<Expr>>,
        span: Span,
    },
    While {
        cond: Box<Expr>,
        body: Vec<Expr>,
        span: Span,
    },
    For {
        init: Box<Expr>,
        cond: Box<Expr>,
        step: Box<Expr>,
        body: Vec<Expr>,
        span: Span,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
        span: Span,
    },
    Return(Option<Box<Expr>>, Span),
    Throw(Box<Expr>, Span),
    TryCatch {
        body: Vec<Expr>,
        binding: String,
        handler: Vec<Expr>,
        span: Span,
    },
    Block(Vec<Expr>, Span),
    TypeAssert {
        expr: Box<Expr>,
        ty: TypeNode,
        span: Span,
    },

    // Macro-only kinds. None of these survive past the normalizer.
    Quote(Box<Expr>, Span),
    Unquote(Box<Expr>, Span),
    UnquoteSplice(Box<Expr>, Span),
    Gensym {
        prefix: Option<String>,
        /// Filled in on first expansion so that re-expanding the same node
        /// instance yields the identical identifier.
        generated: Option<String>,
        span: Span,
    },
    Defmacro {
        name: String,
        params: Vec<String>,
        body: Vec<Expr>,
        span: Span,
    },
}

impl Expr {
    /// Returns the span of this expression.
    pub fn span(&self) -> Span {
        use Expr::*;
        match self {
            Lit(_, span)
            | Ident(_, span)
            | Array(_, span)
            | Object(_, span)
            | Return(_, span)
            | Throw(_, span)
            | Block(_, span)
            | Quote(_, span)
            | Unquote(_, span)
            | UnquoteSplice(_, span) => *span,
            Call { span, .. }
            | Prop { span, .. }
            | Index { span, .. }
            | New { span, .. }
            | Function { span, .. }
            | Class { span, .. }
            | LetStar { span, .. }
            | If { span, .. }
            | While { span, .. }
            | For { span, .. }
            | Assign { span, .. }
            | TryCatch { span, .. }
            | TypeAssert { span, .. }
            | Gensym { span, .. }
            | Defmacro { span, .. } => *span,
        }
    }

    /// Returns the kind name of this node (for diagnostics and debugging).
    pub fn kind_name(&self) -> &'static str {
        use Expr::*;
        match self {
            Lit(_, _) => "literal",
            Ident(_, _) => "identifier",
            Call { .. } => "call",
            Prop { .. } => "prop",
            Index { .. } => "index",
            New { .. } => "new",
            Array(_, _) => "array",
            Object(_, _) => "object",
            Function { .. } => "function",
            Class { .. } => "class",
            LetStar { .. } => "let*",
            If { .. } => "if",
            While { .. } => "while",
            For { .. } => "for",
            Assign { .. } => "assign",
            Return(_, _) => "return",
            Throw(_, _) => "throw",
            TryCatch { .. } => "try-catch",
            Block(_, _) => "block",
            TypeAssert { .. } => "type-assert",
            Quote(_, _) => "quote",
            Unquote(_, _) => "unquote",
            UnquoteSplice(_, _) => "unquote-splice",
            Gensym { .. } => "gensym",
            Defmacro { .. } => "defmacro",
        }
    }

    /// True for the kinds that must not survive past the normalizer.
    pub fn is_macro_only(&self) -> bool {
        matches!(
            self,
            Expr::Quote(_, _)
                | Expr::Unquote(_, _)
                | Expr::UnquoteSplice(_, _)
                | Expr::Gensym { .. }
                | Expr::Defmacro { .. }
        )
    }

    /// The null literal, used for unbound trailing macro arguments.
    pub fn null(span: Span) -> Expr {
        Expr::Lit(Lit::Null, span)
    }

    pub fn num(n: f64, span: Span) -> Expr {
        Expr::Lit(Lit::Num(n), span)
    }

    pub fn str(s: impl Into<String>, span: Span) -> Expr {
        Expr::Lit(Lit::Str(s.into()), span)
    }

    pub fn ident(name: impl Into<String>, span: Span) -> Expr {
        Expr::Ident(name.into(), span)
    }
}

/// Rebuilds one level of the tree, applying `f` to every child position.
///
/// Leaves (`Lit`, `Ident`, `Gensym`) are returned unchanged. This is the
/// shared structural-recursion step used by the expansion walker and the
/// normalizer; the substitution fallback and the quote converter keep
/// their own exhaustive matches because they treat positions differently.
pub fn map_children<E>(
    expr: Expr,
    f: &mut dyn FnMut(Expr) -> Result<Expr, E>,
) -> Result<Expr, E> {
    use Expr::*;
    Ok(match expr {
        Lit(_, _) | Ident(_, _) | Gensym { .. } => expr,
        Call { callee, args, span } => Call {
            callee: Box::new(f(*callee)?),
            args: map_vec(args, f)?,
            span,
        },
        Prop { object, name, span } => Prop {
            object: Box::new(f(*object)?),
            name,
            span,
        },
        Index { object, index, span } => Index {
            object: Box::new(f(*object)?),
            index: Box::new(f(*index)?),
            span,
        },
        New { ctor, args, span } => New {
            ctor: Box::new(f(*ctor)?),
            args: map_vec(args, f)?,
            span,
        },
        Array(items, span) => Array(map_vec(items, f)?, span),
        Object(fields, span) => Object(map_fields(fields, f)?, span),
        Function {
            name,
            params,
            body,
            span,
        } => Function {
            name,
            params,
            body: map_vec(body, f)?,
            span,
        },
        Class {
            name,
            parent,
            members,
            span,
        } => Class {
            name,
            parent,
            members: map_vec(members, f)?,
            span,
        },
        LetStar {
            bindings,
            body,
            span,
        } => LetStar {
            bindings: map_fields(bindings, f)?,
            body: map_vec(body, f)?,
            span,
        },
        If {
            cond,
            then,
            alt,
            span,
        } => If {
            cond: Box::new(f(*cond)?),
            then: Box::new(f(*then)?),
            alt: map_opt(alt, f)?,
            span,
        },
        While { cond, body, span } => While {
            cond: Box::new(f(*cond)?),
            body: map_vec(body, f)?,
            span,
        },
        For {
            init,
            cond,
            step,
            body,
            span,
        } => For {
            init: Box::new(f(*init)?),
            cond: Box::new(f(*cond)?),
            step: Box::new(f(*step)?),
            body: map_vec(body, f)?,
            span,
        },
        Assign { target, value, span } => Assign {
            target: Box::new(f(*target)?),
            value: Box::new(f(*value)?),
            span,
        },
        Return(value, span) => Return(map_opt(value, f)?, span),
        Throw(value, span) => Throw(Box::new(f(*value)?), span),
        TryCatch {
            body,
            binding,
            handler,
            span,
        } => TryCatch {
            body: map_vec(body, f)?,
            binding,
            handler: map_vec(handler, f)?,
            span,
        },
        Block(stmts, span) => Block(map_vec(stmts, f)?, span),
        TypeAssert { expr, ty, span } => TypeAssert {
            expr: Box::new(f(*expr)?),
            ty,
            span,
        },
        Quote(inner, span) => Quote(Box::new(f(*inner)?), span),
        Unquote(inner, span) => Unquote(Box::new(f(*inner)?), span),
        UnquoteSplice(inner, span) => UnquoteSplice(Box::new(f(*inner)?), span),
        Defmacro {
            name,
            params,
            body,
            span,
        } => Defmacro {
            name,
            params,
            body: map_vec(body, f)?,
            span,
        },
    })
}

fn map_vec<E>(
    items: Vec<Expr>,
    f: &mut dyn FnMut(Expr) -> Result<Expr, E>,
) -> Result<Vec<Expr>, E> {
    items.into_iter().map(|item| f(item)).collect()
}

fn map_fields<E>(
    fields: Vec<(String, Expr)>,
    f: &mut dyn FnMut(Expr) -> Result<Expr, E>,
) -> Result<Vec<(String, Expr)>, E> {
    fields.into_iter().map(|(k, v)| Ok((k, f(v)?))).collect()
}

fn map_opt<E>(
    value: Option<Box<Expr>>,
    f: &mut dyn FnMut(Expr) -> Result<Expr, E>,
) -> Result<Option<Box<Expr>>, E> {
    match value {
        Some(e) => Ok(Some(Box::new(f(*e)?))),
        None => Ok(None),
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty())
    }
}

impl Expr {
    /// Pretty-prints the expression in s-expression form, for diagnostics.
    pub fn pretty(&self) -> String {
        use Expr::*;
        match self {
            Lit(lit, _) => match lit {
                crate::ast::Lit::Num(n) => n.to_string(),
                crate::ast::Lit::Str(s) => format!("\"{}\"", s),
                crate::ast::Lit::Bool(b) => b.to_string(),
                crate::ast::Lit::Null => "null".to_string(),
            },
            Ident(name, _) => name.clone(),
            Call { callee, args, .. } => pretty_form(&callee.pretty(), args),
            Prop { object, name, .. } => format!("(prop {} \"{}\")", object.pretty(), name),
            Index { object, index, .. } => {
                format!("(index {} {})", object.pretty(), index.pretty())
            }
            New { ctor, args, .. } => pretty_form(&format!("new {}", ctor.pretty()), args),
            Array(items, _) => pretty_form("array", items),
            Object(fields, _) => {
                let inner = fields
                    .iter()
                    .map(|(k, v)| format!("{}: {}", k, v.pretty()))
                    .collect::<Vec<_>>()
                    .join(" ");
                format!("(object {})", inner)
            }
            Function { name, body, .. } => {
                pretty_form(&format!("function {}", name.as_deref().unwrap_or("_")), body)
            }
            Class { name, members, .. } => pretty_form(&format!("class {}", name), members),
            LetStar { body, .. } => pretty_form("let*", body),
            If { cond, then, alt, .. } => match alt {
                Some(alt) => {
                    format!("(if {} {} {})", cond.pretty(), then.pretty(), alt.pretty())
                }
                None => format!("(if {} {})", cond.pretty(), then.pretty()),
            },
            While { cond, body, .. } => pretty_form(&format!("while {}", cond.pretty()), body),
            For { body, .. } => pretty_form("for", body),
            Assign { target, value, .. } => {
                format!("(assign {} {})", target.pretty(), value.pretty())
            }
            Return(value, _) => match value {
                Some(v) => format!("(return {})", v.pretty()),
                None => "(return)".to_string(),
            },
            Throw(value, _) => format!("(throw {})", value.pretty()),
            TryCatch { body, .. } => pretty_form("try", body),
            Block(stmts, _) => pretty_form("block", stmts),
            TypeAssert { expr, .. } => format!("(type-assert {})", expr.pretty()),
            Quote(inner, _) => format!("'{}", inner.pretty()),
            Unquote(inner, _) => format!("~{}", inner.pretty()),
            UnquoteSplice(inner, _) => format!("~@{}", inner.pretty()),
            Gensym { prefix, .. } => format!("(gensym {})", prefix.as_deref().unwrap_or("")),
            Defmacro { name, body, .. } => pretty_form(&format!("defmacro {}", name), body),
        }
    }
}

fn pretty_form(head: &str, items: &[Expr]) -> String {
    if items.is_empty() {
        return format!("({})", head);
    }
    let inner = items
        .iter()
        .map(|e| e.pretty())
        .collect::<Vec<_>>()
        .join(" ");
    format!("({} {})", head, inner)
}
