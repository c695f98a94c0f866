pub mod analyzer;
pub mod ast;
pub mod codegen;
pub mod error;

use analyzer::{Compilation, SemanticVisitor};
use ast::{Ast, NodeKind};
use error::InputError;

/// Type checks `ast` and generates its IR in one pass.
///
/// Semantic violations are collected in `Compilation::diagnostics`; only a tree
/// without a function list at its root is rejected outright.
pub fn compile(ast: &Ast) -> Result<Compilation, InputError> {
    let root = ast.root().ok_or(InputError::MissingRoot)?;
    if root.index() >= ast.len() {
        return Err(InputError::DanglingNode {
            parent: None,
            child: root.0,
        });
    }
    if !matches!(ast.kind(root), NodeKind::Funcs(_)) {
        return Err(InputError::InvalidRoot {
            found: ast.kind(root).describe(),
        });
    }

    let mut visitor = SemanticVisitor::new(ast);
    visitor.visit_funcs(root);
    Ok(visitor.finish())
}

pub fn compile_json(json: &str) -> Result<Compilation, InputError> {
    let ast = Ast::from_json(json)?;
    compile(&ast)
}
