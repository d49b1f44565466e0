//! Macro expansion contract tests: the observable behavior of the
//! registry, the walker, the evaluator, and the quote converter working
//! together over whole programs.

mod common;

use common::*;
use yantra::{expand_program, CollectingSink, Expr, Program};

fn expand_ok(body: Vec<Expr>) -> Program {
    let mut sink = CollectingSink::new();
    let program = Program { body };
    expand_program(program, &mut sink).expect("expansion failed")
}

#[test]
fn defmacro_statements_are_filtered_and_replaced_by_expansions() {
    let program = expand_ok(vec![
        defmacro("twice", &["x"], vec![quote(call("array", vec![ident("x"), ident("x")]))]),
        call("twice", vec![num(7.0)]),
    ]);
    assert_eq!(program.body.len(), 1);
    assert_eq!(program.body[0], array(vec![num(7.0), num(7.0)]));
    assert!(!program
        .body
        .iter()
        .any(|stmt| matches!(stmt, Expr::Defmacro { .. })));
}

#[test]
fn legacy_define_macro_calls_register_and_are_filtered() {
    // (define-macro inc (x) (quote (call add ~x 1)))
    let legacy = call(
        "define-macro",
        vec![
            ident("inc"),
            Expr::Call {
                callee: Box::new(ident("x")),
                args: vec![],
                span: sp(),
            },
            quote(call("call", vec![ident("add"), ident("~x"), num(1.0)])),
        ],
    );
    let program = expand_ok(vec![legacy, call("inc", vec![ident("n")])]);
    assert_eq!(program.body.len(), 1);
    assert_eq!(
        program.body[0],
        Expr::Call {
            callee: Box::new(ident("add")),
            args: vec![ident("n"), num(1.0)],
            span: sp(),
        }
    );
}

#[test]
fn splices_flatten_instead_of_nesting() {
    // (defmacro wrap (a b) (quote (array ~@a b))) applied to ((array 1 2), 3)
    let program = expand_ok(vec![
        defmacro(
            "wrap",
            &["a", "b"],
            vec![quote(call("array", vec![ident("~@a"), ident("b")]))],
        ),
        call("wrap", vec![array(vec![num(1.0), num(2.0)]), num(3.0)]),
    ]);
    assert_eq!(program.body[0], array(vec![num(1.0), num(2.0), num(3.0)]));
}

#[test]
fn reconstruction_table_round_trips_quoted_control_flow() {
    let program = expand_ok(vec![
        defmacro(
            "guard",
            &["cond"],
            vec![quote(call(
                "if",
                vec![
                    ident("~cond"),
                    call("return", vec![num(1.0)]),
                    call("return", vec![num(2.0)]),
                ],
            ))],
        ),
        call("guard", vec![ident("x")]),
    ]);
    assert_eq!(
        program.body[0],
        Expr::If {
            cond: Box::new(ident("x")),
            then: Box::new(Expr::Return(Some(Box::new(num(1.0))), sp())),
            alt: Some(Box::new(Expr::Return(Some(Box::new(num(2.0))), sp()))),
            span: sp(),
        }
    );
}

#[test]
fn repeated_parameters_expand_to_independent_clones() {
    let program = expand_ok(vec![
        defmacro(
            "pair",
            &["x"],
            vec![quote(call("array", vec![ident("~x"), ident("~x")]))],
        ),
        call("pair", vec![call("f", vec![num(1.0)])]),
    ]);
    let Expr::Array(items, _) = &program.body[0] else {
        panic!("expected array, got {}", program.body[0]);
    };
    assert_eq!(items.len(), 2);
    assert_eq!(items[0], items[1]);

    // Independently owned: reworking one copy leaves the other intact.
    let mut items = items.clone();
    let original = items[1].clone();
    if let Expr::Call { args, .. } = &mut items[0] {
        args.push(num(99.0));
    }
    assert_eq!(items[1], original);
    assert_ne!(items[0], items[1]);
}

#[test]
fn macros_expanding_into_macros_reach_a_fixed_point() {
    let program = expand_ok(vec![
        defmacro("outer", &[], vec![quote(call("inner", vec![]))]),
        defmacro("inner", &[], vec![quote(call("array", vec![num(1.0)]))]),
        call("outer", vec![]),
    ]);
    assert_eq!(program.body.len(), 1);
    assert_eq!(program.body[0], array(vec![num(1.0)]));
}

#[test]
fn quoted_symbols_matching_parameter_names_are_captured() {
    // Regression for the documented capture hazard: a quoted bare symbol
    // that shares a macro parameter's name is substituted even without a
    // sigil. This behavior is intentional; do not "fix" it silently.
    let program = expand_ok(vec![
        defmacro("m", &["x"], vec![quote(call("array", vec![ident("x")]))]),
        call("m", vec![num(5.0)]),
    ]);
    assert_eq!(program.body[0], array(vec![num(5.0)]));
}

#[test]
fn missing_trailing_arguments_bind_to_null_without_error() {
    let program = expand_ok(vec![
        defmacro(
            "both",
            &["a", "b"],
            vec![quote(call("array", vec![ident("a"), ident("b")]))],
        ),
        call("both", vec![num(1.0)]),
    ]);
    assert_eq!(program.body[0], array(vec![num(1.0), Expr::null(sp())]));
}

#[test]
fn let_star_builds_syntax_at_compile_time() {
    // (defmacro sum (x) (let* ((lhs x)) (quote (call add ~lhs 1))))
    let program = expand_ok(vec![
        defmacro(
            "sum",
            &["x"],
            vec![Expr::LetStar {
                bindings: vec![("lhs".to_string(), ident("x"))],
                body: vec![quote(call("call", vec![ident("add"), ident("~lhs"), num(1.0)]))],
                span: sp(),
            }],
        ),
        call("sum", vec![ident("count")]),
    ]);
    assert_eq!(
        program.body[0],
        Expr::Call {
            callee: Box::new(ident("add")),
            args: vec![ident("count"), num(1.0)],
            span: sp(),
        }
    );
}

#[test]
fn macro_if_bodies_stay_runtime_conditionals() {
    // A macro cannot pick a branch's syntax with `if`; both branches are
    // substituted and a runtime conditional comes out.
    let program = expand_ok(vec![
        defmacro(
            "choose",
            &["c"],
            vec![Expr::If {
                cond: Box::new(ident("c")),
                then: Box::new(num(1.0)),
                alt: Some(Box::new(num(2.0))),
                span: sp(),
            }],
        ),
        call("choose", vec![ident("flag")]),
    ]);
    assert_eq!(
        program.body[0],
        Expr::If {
            cond: Box::new(ident("flag")),
            then: Box::new(num(1.0)),
            alt: Some(Box::new(num(2.0))),
            span: sp(),
        }
    );
}

#[test]
fn gensym_hygiene_prevents_binding_collisions() {
    // (defmacro with-tmp (v)
    //   (let* ((t (gensym "tmp")))
    //     (quote (block (assign ~t ~v) ~t))))
    let program = expand_ok(vec![
        defmacro(
            "with-tmp",
            &["v"],
            vec![Expr::LetStar {
                bindings: vec![(
                    "t".to_string(),
                    call("gensym", vec![Expr::str("tmp", sp())]),
                )],
                body: vec![quote(call(
                    "block",
                    vec![
                        call("assign", vec![ident("~t"), ident("~v")]),
                        ident("~t"),
                    ],
                ))],
                span: sp(),
            }],
        ),
        call("with-tmp", vec![ident("user_value")]),
        call("with-tmp", vec![ident("other_value")]),
    ]);

    let tmp_name = |stmt: &Expr| -> String {
        let Expr::Block(stmts, _) = stmt else {
            panic!("expected block, got {stmt}");
        };
        let Expr::Assign { target, .. } = &stmts[0] else {
            panic!("expected assign, got {}", stmts[0]);
        };
        let Expr::Ident(name, _) = &**target else {
            panic!("expected identifier target");
        };
        name.clone()
    };

    let first = tmp_name(&program.body[0]);
    let second = tmp_name(&program.body[1]);
    assert!(first.starts_with("tmp_"));
    assert!(second.starts_with("tmp_"));
    // Two invocations mint two distinct temporaries.
    assert_ne!(first, second);
}
