//! Macro collection: one scan over the top-level program statements,
//! before any expansion, registering every macro definition by name.
//!
//! Three equivalent surface encodings are recognized and normalized into
//! one [`MacroDef`] record: the dedicated `defmacro` statement, the same
//! node appearing as a bare expression statement (structurally identical
//! in the unified kind family), and the legacy call shape
//! `(define-macro name (params...) body...)`.

use crate::ast::Expr;
use crate::diagnostics::{EventSink, MacroEvent};
use crate::macros::{MacroDef, MacroRegistry};

/// The well-known head identifier of the legacy call-shaped encoding.
const DEFINE_MACRO: &str = "define-macro";

/// Scans `stmts` and returns the populated registry.
///
/// Emits one `Registered` event per definition. A malformed legacy-call
/// definition (missing or non-identifier name) is skipped and surfaced as
/// a recoverable `MalformedDefinition` event; collection continues.
/// Later definitions under the same name overwrite earlier ones.
pub fn collect_macros(stmts: &[Expr], sink: &mut dyn EventSink) -> MacroRegistry {
    let mut registry = MacroRegistry::new();
    for stmt in stmts {
        match as_macro_def(stmt) {
            Ok(Some(def)) => {
                sink.emit(MacroEvent::Registered {
                    name: def.name.clone(),
                    params: def.params.clone(),
                });
                registry.register(def);
            }
            Ok(None) => {}
            Err(reason) => {
                sink.emit(MacroEvent::MalformedDefinition {
                    reason,
                    span: stmt.span(),
                });
            }
        }
    }
    registry
}

/// True for any statement in a macro-definition encoding, well-formed or
/// not. The expansion walker filters every such statement from its output.
pub fn is_macro_definition(stmt: &Expr) -> bool {
    match stmt {
        Expr::Defmacro { .. } => true,
        Expr::Call { callee, .. } => {
            matches!(&**callee, Expr::Ident(name, _) if name == DEFINE_MACRO)
        }
        _ => false,
    }
}

/// Normalizes a statement into a `MacroDef` if it is a macro definition.
///
/// `Ok(None)` means "not a definition"; `Err` carries the reason a
/// definition-shaped statement could not be registered.
fn as_macro_def(stmt: &Expr) -> Result<Option<MacroDef>, String> {
    match stmt {
        Expr::Defmacro {
            name,
            params,
            body,
            span,
        } => Ok(Some(MacroDef {
            name: name.clone(),
            params: params.clone(),
            body: body.clone(),
            span: *span,
        })),
        Expr::Call { callee, args, span } => {
            if !matches!(&**callee, Expr::Ident(name, _) if name == DEFINE_MACRO) {
                return Ok(None);
            }
            let name = match args.first() {
                Some(Expr::Ident(name, _)) => name.clone(),
                Some(other) => {
                    return Err(format!(
                        "macro name must be an identifier, found {}",
                        other.kind_name()
                    ));
                }
                None => return Err("missing macro name".to_string()),
            };
            let params = match args.get(1) {
                Some(list) => extract_param_names(list),
                None => Vec::new(),
            };
            let body = args.iter().skip(2).cloned().collect();
            Ok(Some(MacroDef {
                name,
                params,
                body,
                span: *span,
            }))
        }
        _ => Ok(None),
    }
}

/// Reads parameter names out of a parsed parameter-list position.
///
/// The Lisp grammar gives `(a b c)` the call shape, a later stage may
/// give it an array literal; both are accepted. Non-identifier entries
/// are skipped (the legacy encoding is lenient here).
pub(crate) fn extract_param_names(list: &Expr) -> Vec<String> {
    let mut names = Vec::new();
    match list {
        Expr::Array(items, _) => {
            for item in items {
                if let Expr::Ident(name, _) = item {
                    names.push(name.clone());
                }
            }
        }
        Expr::Call { callee, args, .. } => {
            if let Expr::Ident(name, _) = &**callee {
                names.push(name.clone());
            }
            for arg in args {
                if let Expr::Ident(name, _) = arg {
                    names.push(name.clone());
                }
            }
        }
        Expr::Ident(name, _) => names.push(name.clone()),
        _ => {}
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Span;
    use crate::diagnostics::CollectingSink;

    fn sp() -> Span {
        Span::default()
    }

    fn legacy_def(name_expr: Expr, params: Expr, body: Expr) -> Expr {
        Expr::Call {
            callee: Box::new(Expr::ident(DEFINE_MACRO, sp())),
            args: vec![name_expr, params, body],
            span: sp(),
        }
    }

    #[test]
    fn dedicated_statement_is_registered() {
        let stmt = Expr::Defmacro {
            name: "twice".to_string(),
            params: vec!["x".to_string()],
            body: vec![Expr::ident("x", sp())],
            span: sp(),
        };
        let mut sink = CollectingSink::new();
        let registry = collect_macros(std::slice::from_ref(&stmt), &mut sink);
        assert!(registry.contains("twice"));
        assert_eq!(
            sink.events,
            vec![MacroEvent::Registered {
                name: "twice".to_string(),
                params: vec!["x".to_string()],
            }]
        );
        assert!(is_macro_definition(&stmt));
    }

    #[test]
    fn legacy_call_shape_is_registered() {
        let stmt = legacy_def(
            Expr::ident("inc", sp()),
            Expr::Call {
                callee: Box::new(Expr::ident("x", sp())),
                args: vec![],
                span: sp(),
            },
            Expr::ident("x", sp()),
        );
        let mut sink = CollectingSink::new();
        let registry = collect_macros(std::slice::from_ref(&stmt), &mut sink);
        let def = registry.lookup("inc").expect("registered");
        assert_eq!(def.params, vec!["x".to_string()]);
        assert_eq!(def.body, vec![Expr::ident("x", sp())]);
    }

    #[test]
    fn malformed_legacy_definition_emits_event_and_is_skipped() {
        let stmt = legacy_def(
            Expr::num(1.0, sp()),
            Expr::Array(vec![], sp()),
            Expr::null(sp()),
        );
        let mut sink = CollectingSink::new();
        let registry = collect_macros(std::slice::from_ref(&stmt), &mut sink);
        assert!(registry.is_empty());
        assert!(matches!(
            sink.events.as_slice(),
            [MacroEvent::MalformedDefinition { .. }]
        ));
        // Still definition-shaped: the walker filters it out.
        assert!(is_macro_definition(&stmt));
    }

    #[test]
    fn later_definitions_overwrite_earlier_ones() {
        let first = Expr::Defmacro {
            name: "m".to_string(),
            params: vec![],
            body: vec![Expr::num(1.0, sp())],
            span: sp(),
        };
        let second = Expr::Defmacro {
            name: "m".to_string(),
            params: vec![],
            body: vec![Expr::num(2.0, sp())],
            span: sp(),
        };
        let mut sink = CollectingSink::new();
        let registry = collect_macros(&[first, second], &mut sink);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.lookup("m").map(|d| &d.body[0]),
            Some(&Expr::num(2.0, sp()))
        );
    }
}
