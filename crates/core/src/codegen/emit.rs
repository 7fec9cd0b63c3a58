//! TypeScript code emission via the Emit trait.
//!
//! Object and array literals are laid out one entry per line with 2-space
//! indentation; empty ones collapse to `{}` and `[]`.

use super::types::{TsExpr, TsLiteral, TsModule, TsStmt};
use crate::utils::{escape_js_string, needs_quoting};

/// Trait for emitting TypeScript code from AST nodes.
pub trait Emit {
    /// Convert the AST node to its TypeScript string representation.
    fn emit(&self) -> String;
}

impl Emit for TsLiteral {
    fn emit(&self) -> String {
        match self {
            TsLiteral::String(s) => format!("\"{}\"", escape_js_string(s)),
            TsLiteral::Int(i) => i.to_string(),
            TsLiteral::Number(n) => n.clone(),
            TsLiteral::Bool(b) => b.to_string(),
            TsLiteral::Null => "null".to_string(),
        }
    }
}

impl Emit for TsExpr {
    fn emit(&self) -> String {
        self.emit_indented(0)
    }
}

impl TsExpr {
    /// Emit with nested lines indented one level deeper than `indent`.
    pub fn emit_indented(&self, indent: usize) -> String {
        match self {
            TsExpr::Literal(lit) => lit.emit(),
            TsExpr::Object(props) => {
                if props.is_empty() {
                    return "{}".to_string();
                }
                let inner = "  ".repeat(indent + 1);
                let mut output = String::from("{\n");
                for (key, value) in props {
                    let key = if needs_quoting(key) {
                        format!("\"{}\"", escape_js_string(key))
                    } else {
                        key.clone()
                    };
                    output.push_str(&format!(
                        "{inner}{key}: {},\n",
                        value.emit_indented(indent + 1)
                    ));
                }
                output.push_str(&"  ".repeat(indent));
                output.push('}');
                output
            }
            TsExpr::Array(items) => {
                if items.is_empty() {
                    return "[]".to_string();
                }
                // Arrays of scalars stay on one line
                if items
                    .iter()
                    .all(|i| matches!(i, TsExpr::Literal(_)))
                {
                    let parts: Vec<_> = items.iter().map(Emit::emit).collect();
                    return format!("[{}]", parts.join(", "));
                }
                let inner = "  ".repeat(indent + 1);
                let mut output = String::from("[\n");
                for item in items {
                    output.push_str(&format!("{inner}{},\n", item.emit_indented(indent + 1)));
                }
                output.push_str(&"  ".repeat(indent));
                output.push(']');
                output
            }
            TsExpr::AsConst(expr) => format!("{} as const", expr.emit_indented(indent)),
        }
    }
}

impl Emit for TsStmt {
    fn emit(&self) -> String {
        match self {
            TsStmt::Comment(lines) => {
                let mut output = String::new();
                for line in lines {
                    output.push_str("//");
                    if !line.is_empty() {
                        output.push(' ');
                        output.push_str(line);
                    }
                    output.push('\n');
                }
                output
            }
            TsStmt::VarDecl {
                is_export,
                name,
                ty,
                init,
            } => {
                let export = if *is_export { "export " } else { "" };
                let ty_str = ty.as_ref().map(|t| format!(": {t}")).unwrap_or_default();
                format!("{export}const {name}{ty_str} = {};\n", init.emit())
            }
            TsStmt::Raw(code) => {
                let mut output = code.trim_end().to_string();
                output.push('\n');
                output
            }
        }
    }
}

impl Emit for TsModule {
    fn emit(&self) -> String {
        let parts: Vec<String> = self.body.iter().map(Emit::emit).collect();
        parts.join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_literal() {
        assert_eq!(TsLiteral::String("say \"hi\"".into()).emit(), "\"say \\\"hi\\\"\"");
        assert_eq!(TsLiteral::Int(42).emit(), "42");
        assert_eq!(TsLiteral::Number("1.5".into()).emit(), "1.5");
        assert_eq!(TsLiteral::Bool(false).emit(), "false");
        assert_eq!(TsLiteral::Null.emit(), "null");
    }

    #[test]
    fn test_emit_nested_object() {
        let expr = TsExpr::Object(vec![
            ("name".into(), TsExpr::string("get_user")),
            ("X-Trace".into(), TsExpr::strings(&["a", "b"])),
            ("empty".into(), TsExpr::Object(vec![])),
            (
                "items".into(),
                TsExpr::Array(vec![TsExpr::Object(vec![(
                    "id".into(),
                    TsExpr::Literal(TsLiteral::Int(1)),
                )])]),
            ),
        ]);
        let expected = r#"{
  name: "get_user",
  "X-Trace": ["a", "b"],
  empty: {},
  items: [
    {
      id: 1,
    },
  ],
}"#;
        assert_eq!(expr.emit(), expected);
    }

    #[test]
    fn test_emit_var_decl() {
        let stmt = TsStmt::VarDecl {
            is_export: true,
            name: "tools".into(),
            ty: Some("ToolDef[]".into()),
            init: TsExpr::Array(vec![]),
        };
        assert_eq!(stmt.emit(), "export const tools: ToolDef[] = [];\n");

        let stmt = TsStmt::VarDecl {
            is_export: false,
            name: "mode".into(),
            ty: None,
            init: TsExpr::AsConst(Box::new(TsExpr::string("x"))),
        };
        assert_eq!(stmt.emit(), "const mode = \"x\" as const;\n");
    }

    #[test]
    fn test_emit_comment() {
        let stmt = TsStmt::Comment(vec!["Generated".into(), String::new(), "Do not edit".into()]);
        assert_eq!(stmt.emit(), "// Generated\n//\n// Do not edit\n");
    }
}
