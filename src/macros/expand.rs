//! The expansion walker: full-program tree walk that discovers macro
//! calls, drives one-step and fixpoint expansion, and reassembles the
//! filtered program.
//!
//! Recursion is bottom-up at call sites: callee and arguments are fully
//! expanded before the walker checks whether the (now-expanded) callee
//! identifier names a registered macro. A macro's raw result is passed
//! back into the walker, depth-first, so macros expanding into other
//! macro calls reach a fixed point where no macro identifier remains at
//! call-head position. A depth bound turns runaway expansion into a
//! reported error instead of a blown stack.

use crate::ast::{self, Expr, Program, Span};
use crate::diagnostics::{EventSink, MacroEvent, YantraError};
use crate::macros::gensym::Gensyms;
use crate::macros::{collect, eval, Env, MacroDef, MacroRegistry, MAX_MACRO_RECURSION_DEPTH};
use crate::normalize;

/// Expands all macros in `program` and normalizes the result.
///
/// This is the main entry point for the macro expansion pipeline stage.
pub fn expand_program(
    program: Program,
    sink: &mut dyn EventSink,
) -> Result<Program, YantraError> {
    Expander::new(sink).expand_program(program)
}

/// Per-compile expansion state: the write-once registry, the monotonic
/// gensym counter, and the caller's event sink.
pub struct Expander<'s> {
    registry: MacroRegistry,
    gensyms: Gensyms,
    sink: &'s mut dyn EventSink,
    max_depth: usize,
}

impl<'s> Expander<'s> {
    pub fn new(sink: &'s mut dyn EventSink) -> Self {
        Self {
            registry: MacroRegistry::new(),
            gensyms: Gensyms::new(),
            sink,
            max_depth: MAX_MACRO_RECURSION_DEPTH,
        }
    }

    /// Overrides the expansion depth bound.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Runs macro collection over `program` without expanding anything.
    /// Useful together with [`Expander::macroexpand1`].
    pub fn collect(&mut self, program: &Program) {
        self.registry = collect::collect_macros(&program.body, &mut *self.sink);
    }

    pub fn registry(&self) -> &MacroRegistry {
        &self.registry
    }

    /// Collects macros, rewrites every statement, filters definition
    /// statements out, and hands the result to the normalizer.
    pub fn expand_program(&mut self, program: Program) -> Result<Program, YantraError> {
        self.registry = collect::collect_macros(&program.body, &mut *self.sink);

        let mut body = Vec::with_capacity(program.body.len());
        for stmt in program.body {
            if collect::is_macro_definition(&stmt) {
                continue;
            }
            body.push(self.expand_expr(stmt, 0)?);
        }

        let body = normalize::normalize_program(body, &mut self.gensyms)?;
        self.sink.emit(MacroEvent::ExpansionDone {
            macro_count: self.registry.len(),
        });
        Ok(Program { body })
    }

    /// Structural rewrite of one expression. `depth` counts macro
    /// expansions along this path, not tree depth.
    pub fn expand_expr(&mut self, expr: Expr, depth: usize) -> Result<Expr, YantraError> {
        match expr {
            Expr::Call { callee, args, span } => {
                let callee = self.expand_expr(*callee, depth)?;
                let mut expanded_args = Vec::with_capacity(args.len());
                for arg in args {
                    expanded_args.push(self.expand_expr(arg, depth)?);
                }

                if let Expr::Ident(name, _) = &callee {
                    if let Some(def) = self.registry.lookup(name).cloned() {
                        if depth >= self.max_depth {
                            return Err(YantraError::RecursionLimit {
                                name: name.clone(),
                                limit: self.max_depth,
                                span,
                            });
                        }
                        self.sink.emit(MacroEvent::Expanding {
                            name: name.clone(),
                            arg_count: expanded_args.len(),
                            span,
                        });
                        let produced = self.apply_macro(&def, &expanded_args, span)?;
                        return self.expand_expr(produced, depth + 1);
                    }
                }

                Ok(Expr::Call {
                    callee: Box::new(callee),
                    args: expanded_args,
                    span,
                })
            }
            // A bare quote outside any macro body: only its embedded
            // gensyms are expanded here; the contents stay literal syntax
            // until the normalizer converts them.
            Expr::Quote(inner, span) => {
                let inner = self.expand_quote_gensyms(*inner)?;
                Ok(Expr::Quote(Box::new(inner), span))
            }
            // Macro definition bodies are evaluated at invocation, never
            // expanded in place.
            Expr::Defmacro { .. } => Ok(expr),
            other => ast::map_children(other, &mut |child| self.expand_expr(child, depth)),
        }
    }

    /// Single-step expansion with **raw, unexpanded** arguments.
    ///
    /// The canonical call path (`expand_expr`) binds already-expanded
    /// arguments; this entry point exists for tooling that inspects one
    /// expansion step at a time. Returns `Ok(None)` when `expr` is not a
    /// call to a registered macro.
    pub fn macroexpand1(&mut self, expr: &Expr) -> Result<Option<Expr>, YantraError> {
        let Expr::Call { callee, args, span } = expr else {
            return Ok(None);
        };
        let Expr::Ident(name, _) = &**callee else {
            return Ok(None);
        };
        let Some(def) = self.registry.lookup(name).cloned() else {
            return Ok(None);
        };
        self.sink.emit(MacroEvent::Expanding {
            name: name.clone(),
            arg_count: args.len(),
            span: *span,
        });
        self.apply_macro(&def, args, *span).map(Some)
    }

    /// Evaluates a macro body against arguments bound positionally.
    fn apply_macro(
        &mut self,
        def: &MacroDef,
        args: &[Expr],
        span: Span,
    ) -> Result<Expr, YantraError> {
        let env = bind_params(&def.params, args, span);
        let mut result = Expr::null(span);
        for stmt in &def.body {
            result = eval::evaluate(stmt, &env, &mut self.gensyms)?;
        }
        Ok(result)
    }

    /// Expands gensym nodes inside a bare quote, writing the minted name
    /// back into the node so a later revisit returns the same identifier.
    fn expand_quote_gensyms(&mut self, expr: Expr) -> Result<Expr, YantraError> {
        match expr {
            Expr::Gensym {
                prefix,
                generated,
                span,
            } => {
                let name = self.gensyms.fresh(prefix.as_deref(), generated.as_deref());
                Ok(Expr::Gensym {
                    prefix,
                    generated: Some(name),
                    span,
                })
            }
            other => ast::map_children(other, &mut |child| self.expand_quote_gensyms(child)),
        }
    }
}

/// Seeds the evaluator environment from the positional parameter list.
/// Macros are not arity-checked: missing trailing arguments bind to a
/// null literal, extra arguments are ignored.
pub fn bind_params(params: &[String], args: &[Expr], span: Span) -> Env {
    let mut env = Env::new();
    for (i, name) in params.iter().enumerate() {
        let value = args.get(i).cloned().unwrap_or_else(|| Expr::null(span));
        env.insert(name.clone(), value);
    }
    env
}
