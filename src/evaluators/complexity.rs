//! Python function analysis using tree-sitter
//!
//! Extracts every function definition (methods and nested functions
//! included) with its cyclomatic complexity, whether it opens with a
//! docstring, and whether it carries any type annotation.

use anyhow::{Context, Result};
use tree_sitter::{Node, Parser};

/// Per-function facts used by the L5 checks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionProfile {
    pub name: String,
    pub complexity: u32,
    pub has_docstring: bool,
    pub has_type_hints: bool,
}

/// Functions found in one source file
#[derive(Debug, Clone, Default)]
pub struct SourceProfile {
    pub functions: Vec<FunctionProfile>,
    /// The parse tree contains syntax errors
    pub has_errors: bool,
}

/// Parse Python source and profile its functions, in source order.
pub fn profile_source(source: &str) -> Result<SourceProfile> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("Failed to set Python language")?;
    let tree = parser
        .parse(source, None)
        .context("Failed to parse Python source")?;

    let root = tree.root_node();
    let mut functions = Vec::new();
    collect_functions(&root, source.as_bytes(), &mut functions);

    Ok(SourceProfile {
        functions,
        has_errors: root.has_error(),
    })
}

fn collect_functions(node: &Node, source: &[u8], out: &mut Vec<FunctionProfile>) {
    if node.kind() == "function_definition" {
        let name = node
            .child_by_field_name("name")
            .and_then(|n| n.utf8_text(source).ok())
            .unwrap_or("<anonymous>")
            .to_string();
        out.push(FunctionProfile {
            name,
            complexity: calculate_complexity(node),
            has_docstring: has_docstring(node),
            has_type_hints: has_type_hints(node),
        });
    }
    for child in node.children(&mut node.walk()) {
        collect_functions(&child, source, out);
    }
}

/// Cyclomatic complexity of a function, nested definitions included.
///
/// Base 1, plus one per `if`/`elif`, loop, `except` handler, boolean
/// operator, `assert` and conditional expression.
pub fn calculate_complexity(node: &Node) -> u32 {
    fn count_branches(node: &Node, complexity: &mut u32) {
        match node.kind() {
            "if_statement" | "elif_clause" | "for_statement" | "while_statement" => {
                *complexity += 1;
            }
            "except_clause" | "except_group_clause" => {
                *complexity += 1;
            }
            // `a and b and c` nests, so each operator counts once
            "boolean_operator" => {
                *complexity += 1;
            }
            "assert_statement" | "conditional_expression" => {
                *complexity += 1;
            }
            _ => {}
        }
        for child in node.children(&mut node.walk()) {
            count_branches(&child, complexity);
        }
    }

    let mut complexity = 1;
    count_branches(node, &mut complexity);
    complexity
}

/// First statement of the body is a bare string literal
fn has_docstring(func: &Node) -> bool {
    let Some(body) = func.child_by_field_name("body") else {
        return false;
    };
    let Some(first) = body.named_child(0) else {
        return false;
    };
    first.kind() == "expression_statement"
        && first
            .named_child(0)
            .is_some_and(|expr| expr.kind() == "string" || expr.kind() == "concatenated_string")
}

/// A return annotation or at least one annotated parameter
fn has_type_hints(func: &Node) -> bool {
    if func.child_by_field_name("return_type").is_some() {
        return true;
    }
    let Some(params) = func.child_by_field_name("parameters") else {
        return false;
    };
    let mut cursor = params.walk();
    let typed = params
        .named_children(&mut cursor)
        .any(|p| matches!(p.kind(), "typed_parameter" | "typed_default_parameter"));
    typed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(source: &str) -> Vec<FunctionProfile> {
        profile_source(source).expect("should parse").functions
    }

    #[test]
    fn test_trivial_functions() {
        let fns = profile("def a():\n    return 1\n\ndef b(x):\n    return x\n");
        assert_eq!(fns.len(), 2);
        assert!(fns.iter().all(|f| f.complexity == 1));
    }

    #[test]
    fn test_complexity_counts_decisions() {
        let source = r#"
def busy(items, flag):
    for item in items:
        if item and flag:
            continue
        elif item or not flag:
            pass
    while flag:
        flag = False
    try:
        pass
    except ValueError:
        pass
    assert items
    return 1 if flag else 0
"#;
        let fns = profile(source);
        // 1 + for + if + and + elif + or + while + except + assert + ternary
        assert_eq!(fns[0].complexity, 10);
    }

    #[test]
    fn test_nested_functions_are_profiled() {
        let source = "def outer():\n    def inner():\n        if True:\n            pass\n    return inner\n";
        let fns = profile(source);
        let names: Vec<&str> = fns.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["outer", "inner"]);
        // outer includes the nested branch
        assert_eq!(fns[0].complexity, 2);
        assert_eq!(fns[1].complexity, 2);
    }

    #[test]
    fn test_docstring_and_hints() {
        let source = r#"
class Tool:
    def method(self, path: str) -> None:
        """Do the thing."""
        pass

def plain(a, b=1):
    x = "not a docstring"
    return a

async def fetch(url="x") -> bytes:
    '''Fetch.'''
    return b""
"#;
        let fns = profile(source);
        assert_eq!(fns.len(), 3);
        assert!(fns[0].has_docstring && fns[0].has_type_hints);
        assert!(!fns[1].has_docstring && !fns[1].has_type_hints);
        assert!(fns[2].has_docstring && fns[2].has_type_hints);
    }

    #[test]
    fn test_syntax_errors_flagged() {
        let profile = profile_source("def broken(:\n    pass\n").unwrap();
        assert!(profile.has_errors);
        assert!(!profile_source("x = 1\n").unwrap().has_errors);
    }
}
