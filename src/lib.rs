//! Yantra: the macro expansion core of a Lisp-syntax compiler front end
//! that lowers to JavaScript-style surface syntax.
//!
//! The pipeline: a parsed [`Program`] goes through the expansion walker
//! (which collects macro definitions, rewrites call sites with the
//! compile-time evaluator, and filters the definitions out), then through
//! the normalizer, and comes out restricted to the canonical post-macro
//! kind family for the downstream resolver and code generator.

pub mod ast;
pub mod diagnostics;
pub mod macros;
pub mod normalize;

pub use ast::{Expr, Lit, Program, Span, TypeNode};
pub use diagnostics::{CollectingSink, EventSink, MacroEvent, NullSink, YantraError};
pub use macros::{expand_program, Env, Expander, Gensyms, MacroDef, MacroRegistry};
