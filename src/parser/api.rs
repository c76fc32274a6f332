use pest::error::LineColLocation;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use super::ast::*;
use crate::runner::ds::type_name::TypeName;

#[derive(Parser)]
#[grammar = "parser/unit_grammar.pest"] // relative to src
pub struct UnitParser;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at line {line}, column {column}")]
pub struct ParseError {
    pub message: String,
    pub line: u32,
    pub column: u32,
}

impl From<pest::error::Error<Rule>> for ParseError {
    fn from(e: pest::error::Error<Rule>) -> Self {
        let (line, column) = match e.line_col {
            LineColLocation::Pos((l, c)) => (l, c),
            LineColLocation::Span((l, c), _) => (l, c),
        };
        ParseError {
            message: e.variant.message().to_string(),
            line: line as u32,
            column: column as u32,
        }
    }
}

impl UnitParser {
    pub fn parse_to_ast(source: &str) -> Result<Unit, ParseError> {
        let unit = UnitParser::parse(Rule::unit, source)?
            .next()
            .ok_or_else(|| error_at("empty parse", 1))?;
        build_unit(unit)
    }
}

fn error_at(message: impl Into<String>, line: u32) -> ParseError {
    ParseError {
        message: message.into(),
        line,
        column: 1,
    }
}

fn unexpected(pair: &Pair<Rule>) -> ParseError {
    let (line, column) = pair.as_span().start_pos().line_col();
    ParseError {
        message: format!("unexpected {:?}", pair.as_rule()),
        line: line as u32,
        column: column as u32,
    }
}

fn line_of(pair: &Pair<Rule>) -> u32 {
    pair.as_span().start_pos().line_col().0 as u32
}

fn is_keyword(rule: Rule) -> bool {
    matches!(
        rule,
        Rule::kw_class
            | Rule::kw_extends
            | Rule::kw_method
            | Rule::kw_let
            | Rule::kw_return
            | Rule::kw_die
            | Rule::kw_require
            | Rule::kw_print
            | Rule::kw_new
    )
}

/// Children of `pair` minus the keyword tokens that introduce it.
fn significant<'i>(pair: Pair<'i, Rule>) -> impl Iterator<Item = Pair<'i, Rule>> {
    pair.into_inner().filter(|p| !is_keyword(p.as_rule()))
}

fn next<'i>(
    inner: &mut impl Iterator<Item = Pair<'i, Rule>>,
    line: u32,
) -> Result<Pair<'i, Rule>, ParseError> {
    inner
        .next()
        .ok_or_else(|| error_at("unexpected end of construct", line))
}

fn type_name(pair: Pair<Rule>) -> Result<TypeName, ParseError> {
    let line = line_of(&pair);
    TypeName::parse(pair.as_str()).map_err(|e| error_at(e.to_string(), line))
}

fn build_unit(pair: Pair<Rule>) -> Result<Unit, ParseError> {
    let mut items = vec![];
    for p in pair.into_inner() {
        match p.as_rule() {
            Rule::class_decl => items.push(Item::Class(build_class(p)?)),
            Rule::EOI => { /* Do nothing */ }
            _ => items.push(Item::Stmt(build_statement(p)?)),
        }
    }
    Ok(Unit { items })
}

fn build_class(pair: Pair<Rule>) -> Result<ClassDecl, ParseError> {
    let line = line_of(&pair);
    let mut inner = significant(pair);
    let name = type_name(next(&mut inner, line)?)?;
    let mut parents = vec![];
    let mut methods = vec![];
    for p in inner {
        match p.as_rule() {
            Rule::extends_clause => {
                for parent in significant(p) {
                    parents.push(type_name(parent)?);
                }
            }
            Rule::method_decl => methods.push(build_method(p)?),
            _ => return Err(unexpected(&p)),
        }
    }
    Ok(ClassDecl {
        name,
        parents,
        methods,
        line,
    })
}

fn build_method(pair: Pair<Rule>) -> Result<MethodDecl, ParseError> {
    let line = line_of(&pair);
    let mut inner = significant(pair);
    let name = next(&mut inner, line)?.as_str().to_string();
    let params = next(&mut inner, line)?
        .into_inner()
        .map(|p| p.as_str().to_string())
        .collect();
    let body = build_block(next(&mut inner, line)?)?;
    Ok(MethodDecl {
        name,
        params,
        body,
        line,
    })
}

fn build_block(pair: Pair<Rule>) -> Result<Vec<Stmt>, ParseError> {
    pair.into_inner().map(build_statement).collect()
}

fn build_statement(pair: Pair<Rule>) -> Result<Stmt, ParseError> {
    let line = line_of(&pair);
    let rule = pair.as_rule();
    if !matches!(
        rule,
        Rule::let_stmt
            | Rule::return_stmt
            | Rule::die_stmt
            | Rule::require_stmt
            | Rule::print_stmt
            | Rule::expr_stmt
    ) {
        return Err(unexpected(&pair));
    }
    let mut inner = significant(pair);
    let kind = match rule {
        Rule::let_stmt => {
            let name = next(&mut inner, line)?.as_str().to_string();
            StmtKind::Let(name, build_expr(next(&mut inner, line)?)?)
        }
        Rule::return_stmt => StmtKind::Return(inner.next().map(build_expr).transpose()?),
        Rule::die_stmt => StmtKind::Die(build_expr(next(&mut inner, line)?)?),
        Rule::require_stmt => StmtKind::Require(type_name(next(&mut inner, line)?)?),
        Rule::print_stmt => StmtKind::Print(build_expr(next(&mut inner, line)?)?),
        _ => StmtKind::Expr(build_expr(next(&mut inner, line)?)?),
    };
    Ok(Stmt { kind, line })
}

fn build_expr(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    match pair.as_rule() {
        Rule::expr => {
            let line = line_of(&pair);
            build_expr(next(&mut pair.into_inner(), line)?)
        }
        Rule::comparison | Rule::concat | Rule::additive => build_binary(pair),
        Rule::postfix => build_postfix(pair),
        _ => build_primary(pair),
    }
}

fn build_binary(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let mut lhs = build_expr(next(&mut inner, line)?)?;
    while let Some(op_pair) = inner.next() {
        let op = match op_pair.as_str() {
            "==" => BinOp::Eq,
            "!=" => BinOp::Ne,
            "~" => BinOp::Concat,
            "+" => BinOp::Add,
            "-" => BinOp::Sub,
            _ => return Err(unexpected(&op_pair)),
        };
        let rhs = build_expr(next(&mut inner, line)?)?;
        lhs = Expr {
            line: lhs.line,
            kind: ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)),
        };
    }
    Ok(lhs)
}

fn build_postfix(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let line = line_of(&pair);
    let mut inner = pair.into_inner();
    let mut expr = build_primary(next(&mut inner, line)?)?;
    for suffix in inner {
        let suffix_line = line_of(&suffix);
        expr = match suffix.as_rule() {
            Rule::call_suffix => {
                let mut parts = suffix.into_inner();
                let method = next(&mut parts, suffix_line)?.as_str().to_string();
                let args = match parts.next() {
                    Some(args) => args
                        .into_inner()
                        .map(build_expr)
                        .collect::<Result<Vec<_>, _>>()?,
                    None => vec![],
                };
                Expr {
                    kind: ExprKind::Call {
                        receiver: Box::new(expr),
                        method,
                        args,
                    },
                    line: suffix_line,
                }
            }
            Rule::field_suffix => {
                let field = next(&mut suffix.into_inner(), suffix_line)?
                    .as_str()
                    .to_string();
                Expr {
                    kind: ExprKind::Field(Box::new(expr), field),
                    line: suffix_line,
                }
            }
            _ => return Err(unexpected(&suffix)),
        };
    }
    Ok(expr)
}

fn build_primary(pair: Pair<Rule>) -> Result<Expr, ParseError> {
    let line = line_of(&pair);
    let kind = match pair.as_rule() {
        Rule::int_lit => ExprKind::Int(
            pair.as_str()
                .parse()
                .map_err(|_| error_at("integer literal out of range", line))?,
        ),
        Rule::str_lit => {
            let raw = pair.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            ExprKind::Str(unescape(raw))
        }
        Rule::kw_true => ExprKind::Bool(true),
        Rule::kw_false => ExprKind::Bool(false),
        Rule::kw_nil => ExprKind::Nil,
        Rule::kw_self => ExprKind::SelfRef,
        Rule::type_name => ExprKind::Type(type_name(pair)?),
        Rule::local => ExprKind::Local(pair.as_str().to_string()),
        Rule::new_expr => {
            let mut fields = vec![];
            for init in significant(pair) {
                let init_line = line_of(&init);
                let mut parts = init.into_inner();
                let name = next(&mut parts, init_line)?.as_str().to_string();
                fields.push((name, build_expr(next(&mut parts, init_line)?)?));
            }
            ExprKind::New(fields)
        }
        Rule::list_expr => ExprKind::List(
            pair.into_inner()
                .map(build_expr)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        Rule::expr => return build_expr(pair),
        _ => return Err(unexpected(&pair)),
    };
    Ok(Expr { kind, line })
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}
