//! Syntax tree for unit files and scripts.
//!
//! Every statement and expression carries the 1-based source line it starts on so the
//! evaluator can keep call frames pointed at the code that is running.

use crate::runner::ds::type_name::TypeName;

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub items: Vec<Item>,
}

impl Unit {
    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|i| match i {
            Item::Class(c) => Some(c),
            Item::Stmt(_) => None,
        })
    }

    pub fn statements(&self) -> impl Iterator<Item = &Stmt> {
        self.items.iter().filter_map(|i| match i {
            Item::Stmt(s) => Some(s),
            Item::Class(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Class(ClassDecl),
    Stmt(Stmt),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: TypeName,
    pub parents: Vec<TypeName>,
    pub methods: Vec<MethodDecl>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MethodDecl {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    Let(String, Expr),
    Return(Option<Expr>),
    Die(Expr),
    Require(TypeName),
    Print(Expr),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Nil,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Expr>),
    Local(String),
    SelfRef,
    Type(TypeName),
    /// `new { field: expr, ... }`, an instance of the invocant's class.
    New(Vec<(String, Expr)>),
    Field(Box<Expr>, String),
    Call {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Binary(BinOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Concat,
    Eq,
    Ne,
}
