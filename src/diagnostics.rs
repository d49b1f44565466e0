//! Unified diagnostics for the Yantra macro expansion core.
//!
//! ## Core Principles
//!
//! - **One error type**: every failure mode of the expansion pipeline is a
//!   `YantraError` variant carrying the offending span. Errors are local,
//!   tree-local decisions made at the point of detection; nothing is
//!   retried, since expansion is a pure deterministic transform.
//! - **Structured events, fire-and-forget**: the expander reports progress
//!   as `MacroEvent` records pushed into an [`EventSink`]. The sink's own
//!   behavior (logging, storage, UI) belongs to the embedder.
//!
//! A raised error identifies the macro name, the call-site span, and the
//! specific malformed construct; `miette` renders the labeled span.

use miette::{Diagnostic, LabeledSpan};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::Span;

/// Converts an AST span to a miette source span.
pub fn to_source_span(span: Span) -> miette::SourceSpan {
    miette::SourceSpan::from(span.start..span.end)
}

/// Unified error type for all macro expansion failure modes.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum YantraError {
    /// A legacy call-shaped macro definition with a missing or
    /// non-identifier name. Surfaced through the sink as a recoverable
    /// [`MacroEvent::MalformedDefinition`] during collection; this variant
    /// exists for callers that want the hard-error behavior.
    #[error("malformed macro definition: {reason}")]
    MalformedDefinition { reason: String, span: Span },

    /// A quoted reconstruction form that does not match its table entry.
    #[error("malformed quoted `{head}` form: {reason}")]
    MalformedQuotedForm {
        head: String,
        reason: String,
        span: Span,
    },

    /// A quoted `prop` form whose property name is not a literal.
    #[error("property name in quoted `prop` form must be a literal, found {found}")]
    NonLiteralPropName { found: String, span: Span },

    /// Macro expansion exceeded the recursion depth bound.
    #[error("macro expansion depth exceeded ({limit}) while expanding '{name}'")]
    RecursionLimit {
        name: String,
        limit: usize,
        span: Span,
    },

    /// A macro-only node survived into the normalizer. Indicates a
    /// pipeline bug or a macro form in an unsupported position.
    #[error("macro-only node '{kind}' survived expansion")]
    ResidualMacroNode { kind: &'static str, span: Span },
}

impl YantraError {
    fn span(&self) -> Span {
        match self {
            YantraError::MalformedDefinition { span, .. }
            | YantraError::MalformedQuotedForm { span, .. }
            | YantraError::NonLiteralPropName { span, .. }
            | YantraError::RecursionLimit { span, .. }
            | YantraError::ResidualMacroNode { span, .. } => *span,
        }
    }

    fn primary_label(&self) -> String {
        match self {
            YantraError::MalformedDefinition { .. } => "defined here".into(),
            YantraError::MalformedQuotedForm { .. } => "quoted form here".into(),
            YantraError::NonLiteralPropName { .. } => "property name here".into(),
            YantraError::RecursionLimit { .. } => "call site".into(),
            YantraError::ResidualMacroNode { .. } => "left over here".into(),
        }
    }

    const fn code_suffix(&self) -> &'static str {
        match self {
            YantraError::MalformedDefinition { .. } => "malformed_definition",
            YantraError::MalformedQuotedForm { .. } => "malformed_quoted_form",
            YantraError::NonLiteralPropName { .. } => "non_literal_prop_name",
            YantraError::RecursionLimit { .. } => "recursion_limit",
            YantraError::ResidualMacroNode { .. } => "residual_macro_node",
        }
    }
}

impl Diagnostic for YantraError {
    fn code<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        Some(Box::new(format!("yantra::macros::{}", self.code_suffix())))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn std::fmt::Display + 'a>> {
        match self {
            YantraError::RecursionLimit { .. } => Some(Box::new(
                "a macro is expanding into a call to itself (directly or through another macro) without converging",
            )),
            YantraError::ResidualMacroNode { .. } => Some(Box::new(
                "macro-only forms are only meaningful inside macro bodies and quoted trees",
            )),
            _ => None,
        }
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            to_source_span(self.span()),
        )];
        Some(Box::new(labels.into_iter()))
    }
}

// ============================================================================
// EXPANSION EVENTS - the diagnostics/tracing boundary
// ============================================================================

/// A structured record emitted by the expander at its reporting points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MacroEvent {
    /// A macro definition was registered during collection.
    Registered { name: String, params: Vec<String> },
    /// A macro call site is about to be expanded.
    Expanding {
        name: String,
        arg_count: usize,
        span: Span,
    },
    /// Expansion of the whole program finished.
    ExpansionDone { macro_count: usize },
    /// A legacy call-shaped definition was skipped as malformed.
    /// Recoverable: collection continues without registering it.
    MalformedDefinition { reason: String, span: Span },
}

/// Receiver for expansion events. Fire-and-forget; no return value is
/// consumed by the core.
pub trait EventSink {
    fn emit(&mut self, event: MacroEvent);
}

/// A sink that records every event in order, for inspection and tests.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub events: Vec<MacroEvent>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all `Expanding` events, in emission order.
    pub fn expanded_names(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                MacroEvent::Expanding { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for CollectingSink {
    fn emit(&mut self, event: MacroEvent) {
        self.events.push(event);
    }
}

/// A sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: MacroEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collecting_sink_preserves_order() {
        let mut sink = CollectingSink::new();
        sink.emit(MacroEvent::Registered {
            name: "a".into(),
            params: vec![],
        });
        sink.emit(MacroEvent::ExpansionDone { macro_count: 1 });
        assert_eq!(sink.events.len(), 2);
        assert!(matches!(sink.events[0], MacroEvent::Registered { .. }));
        assert!(matches!(
            sink.events[1],
            MacroEvent::ExpansionDone { macro_count: 1 }
        ));
    }

    #[test]
    fn error_reports_code_and_label() {
        let err = YantraError::RecursionLimit {
            name: "loop".into(),
            limit: 128,
            span: Span { start: 4, end: 10 },
        };
        assert_eq!(
            err.code().map(|c| c.to_string()).as_deref(),
            Some("yantra::macros::recursion_limit")
        );
        let labels: Vec<_> = err.labels().into_iter().flatten().collect();
        assert_eq!(labels.len(), 1);
    }
}
