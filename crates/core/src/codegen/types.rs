//! TypeScript AST for the generated tool server.
//!
//! Only the node kinds the generator needs are modeled. The request
//! runtime is a fixed block and travels as [`TsStmt::Raw`].

/// Literal value
#[derive(Debug, Clone, PartialEq)]
pub enum TsLiteral {
    /// String literal, escaped on emission.
    String(String),
    /// Integer literal.
    Int(i64),
    /// Number already rendered in JS syntax.
    Number(String),
    /// `true` or `false`.
    Bool(bool),
    /// `null`
    Null,
}

/// TypeScript expression
#[derive(Debug, Clone, PartialEq)]
pub enum TsExpr {
    /// Literal value.
    Literal(TsLiteral),
    /// Object literal; keys are quoted when they are not identifiers.
    Object(Vec<(String, TsExpr)>),
    /// Array literal.
    Array(Vec<TsExpr>),
    /// `expr as const`
    AsConst(Box<TsExpr>),
}

impl TsExpr {
    /// String literal expression.
    pub fn string(s: impl Into<String>) -> Self {
        TsExpr::Literal(TsLiteral::String(s.into()))
    }

    /// Array of string literals.
    pub fn strings<S: AsRef<str>>(items: &[S]) -> Self {
        TsExpr::Array(items.iter().map(|s| TsExpr::string(s.as_ref())).collect())
    }

    /// String literal, or `null` for `None`.
    pub fn optional_string(s: Option<&str>) -> Self {
        s.map_or(TsExpr::Literal(TsLiteral::Null), TsExpr::string)
    }
}

/// Top-level statement
#[derive(Debug, Clone, PartialEq)]
pub enum TsStmt {
    /// `// text`, one line per entry.
    Comment(Vec<String>),
    /// `[export] const name[: ty] = init;`
    VarDecl {
        /// Prefix with `export`.
        is_export: bool,
        /// Binding name.
        name: String,
        /// Type annotation.
        ty: Option<String>,
        /// Initializer.
        init: TsExpr,
    },
    /// Code block emitted verbatim.
    Raw(String),
}

/// Complete TypeScript module
#[derive(Debug, Clone, PartialEq)]
pub struct TsModule {
    /// Statements in emission order.
    pub body: Vec<TsStmt>,
}
