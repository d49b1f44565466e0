//! # Yantra Macro Expansion System
//!
//! This module is responsible for the purely syntactic transformation of
//! the AST before resolution and code generation. Macros let authors write
//! compile-time procedures, in the language itself, whose call sites are
//! replaced by the AST their bodies produce.
//!
//! ## Core Principles
//!
//! - **Syntactic Only**: macros operate solely on the AST. They have no
//!   access to runtime state and cannot perform evaluation side effects.
//! - **Pure Transformation**: expansion is a deterministic function of the
//!   input program, the registry, and the gensym counter's start value.
//! - **Inspectable**: collection and every invocation emit structured
//!   events to the caller's [`EventSink`](crate::diagnostics::EventSink).
//! - **Layered**: the macro system is a distinct pipeline stage that runs
//!   after parsing and before type resolution.
//!
//! Hygiene is opt-in via explicit `gensym`; there is no automatic
//! alpha-renaming of macro-introduced binders.
//!
//! ## Module layout
//!
//! - [`collect`] — registry population from top-level statements
//! - [`expand`] — the full-program expansion walker and fixpoint driver
//! - [`eval`] — the compile-time macro-body evaluator
//! - [`quote`] — the quote/quasiquote-to-AST converter
//! - [`subst`] — the generic substitution fallback
//! - [`gensym`] — the unique-identifier service

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ast::{Expr, Span};

pub mod collect;
pub mod eval;
pub mod expand;
pub mod gensym;
pub mod quote;
pub mod subst;

pub use collect::{collect_macros, is_macro_definition};
pub use expand::{expand_program, Expander};
pub use gensym::Gensyms;

/// Maximum macro expansion depth before a `RecursionLimit` error is
/// raised instead of exhausting the call stack.
pub const MAX_MACRO_RECURSION_DEPTH: usize = 128;

/// The compile-time environment: parameter name to bound, unevaluated AST.
///
/// A persistent map, so nested `let*` scopes and recursive expansion get
/// snapshot semantics by construction: extension produces a new map and
/// never aliases the parent scope.
pub type Env = im::HashMap<String, Expr>;

/// A user-defined macro: name, ordered positional parameters, and a body
/// sequence evaluated at compile time (last value is the expansion).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Expr>,
    pub span: Span,
}

/// Registry of macro definitions, keyed by exact name.
///
/// Populated once per program compile, before any expansion, and read-only
/// afterwards. Registration is last-wins: a later definition under the
/// same name silently replaces the earlier one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MacroRegistry {
    macros: HashMap<String, MacroDef>,
}

impl MacroRegistry {
    /// Creates a new, empty macro registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a macro definition under its name.
    ///
    /// # Returns
    /// `Some(old_macro)` if a macro with this name was already registered,
    /// `None` otherwise. This allows callers to detect silent overwrites.
    pub fn register(&mut self, def: MacroDef) -> Option<MacroDef> {
        self.macros.insert(def.name.clone(), def)
    }

    /// Looks up a macro by name.
    pub fn lookup(&self, name: &str) -> Option<&MacroDef> {
        self.macros.get(name)
    }

    /// Checks if a macro with the given name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.macros.contains_key(name)
    }

    /// Returns the number of registered macros.
    pub fn len(&self) -> usize {
        self.macros.len()
    }

    /// Returns true if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// Returns an iterator over macro names.
    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.macros.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn def(name: &str, body: Expr) -> MacroDef {
        MacroDef {
            name: name.to_string(),
            params: vec![],
            body: vec![body],
            span: Span::default(),
        }
    }

    #[test]
    fn registration_is_last_wins() {
        let mut registry = MacroRegistry::new();
        let span = Span::default();
        assert!(registry.register(def("m", Expr::num(1.0, span))).is_none());
        let old = registry.register(def("m", Expr::num(2.0, span)));
        assert!(old.is_some());
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup("m").map(|d| &d.body[0]),
            Some(&Expr::num(2.0, span))
        );
    }
}
