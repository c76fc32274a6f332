use super::api::{Rule, UnitParser};
use super::ast::*;

use pest::consumes_to;
use pest::parses_to;
use pest::Parser;

#[test]
fn test_type_name_with_segments() {
    parses_to! {
        parser: UnitParser,
        input: "Shop::Cart",
        rule: Rule::type_name,
        tokens: [
            type_name(0, 10)
        ]
    };
}

#[test]
fn test_require_statement_tokens() {
    parses_to! {
        parser: UnitParser,
        input: "require A::B;",
        rule: Rule::require_stmt,
        tokens: [
            require_stmt(0, 13, [
                kw_require(0, 7),
                type_name(8, 12)
            ])
        ]
    };
}

#[test]
fn test_call_suffix_tokens() {
    parses_to! {
        parser: UnitParser,
        input: "->name(1)",
        rule: Rule::call_suffix,
        tokens: [
            call_suffix(0, 9, [
                method_name(2, 6),
                call_args(6, 9, [
                    expr(7, 8, [
                        comparison(7, 8, [
                            concat(7, 8, [
                                additive(7, 8, [
                                    postfix(7, 8, [
                                        int_lit(7, 8)
                                    ])
                                ])
                            ])
                        ])
                    ])
                ])
            ])
        ]
    };
}

#[test]
fn test_keywords_are_not_locals() {
    assert!(UnitParser::parse(Rule::local, "new").is_err());
    assert!(UnitParser::parse(Rule::local, "self").is_err());
    let pairs = UnitParser::parse(Rule::local, "letter").unwrap();
    assert_eq!(pairs.as_str(), "letter");
}

#[test]
fn test_class_declaration_ast() {
    let src = r#"
class Shop::Cart extends Shop::Base, Mixin {
    method new(owner) {
        return new { owner: owner, items: [] };
    }

    method owner() { return self.owner; }
}
"#;
    let unit = UnitParser::parse_to_ast(src).unwrap();
    let classes: Vec<&ClassDecl> = unit.classes().collect();
    assert_eq!(classes.len(), 1);
    let cart = classes[0];
    assert_eq!(cart.name.as_str(), "Shop::Cart");
    assert_eq!(cart.line, 2);
    assert_eq!(
        cart.parents.iter().map(|p| p.as_str()).collect::<Vec<_>>(),
        vec!["Shop::Base", "Mixin"]
    );
    assert_eq!(cart.methods.len(), 2);
    assert_eq!(cart.methods[0].name, "new");
    assert_eq!(cart.methods[0].params, vec!["owner".to_string()]);
    assert_eq!(cart.methods[0].line, 3);
    assert_eq!(cart.methods[1].body[0].line, 7);
    match &cart.methods[1].body[0].kind {
        StmtKind::Return(Some(Expr {
            kind: ExprKind::Field(target, field),
            ..
        })) => {
            assert_eq!(target.kind, ExprKind::SelfRef);
            assert_eq!(field, "owner");
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_method_call_chain_keeps_lines() {
    let src = "let x = Present\n    ->new(1, \"a\")\n    ->name;\n";
    let unit = UnitParser::parse_to_ast(src).unwrap();
    let stmt = unit.statements().next().unwrap();
    let expr = match &stmt.kind {
        StmtKind::Let(name, e) => {
            assert_eq!(name, "x");
            e
        }
        other => panic!("unexpected statement {:?}", other),
    };
    match &expr.kind {
        ExprKind::Call {
            receiver,
            method,
            args,
        } => {
            assert_eq!(method, "name");
            assert!(args.is_empty());
            assert_eq!(expr.line, 3);
            match &receiver.kind {
                ExprKind::Call { method, args, .. } => {
                    assert_eq!(method, "new");
                    assert_eq!(receiver.line, 2);
                    assert_eq!(args[0].kind, ExprKind::Int(1));
                    assert_eq!(args[1].kind, ExprKind::Str("a".to_string()));
                }
                other => panic!("unexpected receiver {:?}", other),
            }
        }
        other => panic!("unexpected expression {:?}", other),
    }
}

#[test]
fn test_binary_operators_left_associative() {
    let unit = UnitParser::parse_to_ast("print 1 - 2 + 3;").unwrap();
    let stmt = unit.statements().next().unwrap();
    match &stmt.kind {
        StmtKind::Print(Expr {
            kind: ExprKind::Binary(BinOp::Add, lhs, rhs),
            ..
        }) => {
            assert!(matches!(lhs.kind, ExprKind::Binary(BinOp::Sub, _, _)));
            assert_eq!(rhs.kind, ExprKind::Int(3));
        }
        other => panic!("unexpected statement {:?}", other),
    }
}

#[test]
fn test_string_escapes() {
    let unit = UnitParser::parse_to_ast(r#"print "a\"b\\c\n";"#).unwrap();
    match &unit.statements().next().unwrap().kind {
        StmtKind::Print(e) => assert_eq!(e.kind, ExprKind::Str("a\"b\\c\n".to_string())),
        other => panic!("unexpected statement {:?}", other),
    };
}

#[test]
fn test_comments_and_reserved_method_names() {
    let src = "# leading comment\nclass A { method DESTROY() { } }\nA->DESTROY; # trailing\n";
    let unit = UnitParser::parse_to_ast(src).unwrap();
    assert_eq!(unit.items.len(), 2);
    assert_eq!(unit.classes().next().unwrap().methods[0].name, "DESTROY");
}

#[test]
fn test_syntax_error_reports_line() {
    let err = UnitParser::parse_to_ast("let a = 1;\nlet b = ;\n").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(err.to_string().contains("at line 2"));
}
