use thiserror::Error;

/// A semantic violation found while analyzing a tree. None of these stop the traversal.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SemanticError {
    #[error("line {line}: variable {name} is not defined")]
    UndefinedName { line: u32, name: String },

    #[error("line {line}: function {name} is not defined")]
    UndefinedFunction { line: u32, name: String },

    #[error("line {line}: symbol {name} is a function")]
    DefinedAsFunction { line: u32, name: String },

    #[error("line {line}: symbol {name} is a variable")]
    DefinedAsVariable { line: u32, name: String },

    #[error("line {line}: symbol {name} is already defined")]
    Redefinition { line: u32, name: String },

    #[error("line {line}: type mismatch")]
    TypeMismatch { line: u32 },

    #[error("line {line}: prototype mismatch, function {name} expects parameters ({})", .expected.join(","))]
    PrototypeMismatch {
        line: u32,
        name: String,
        expected: Vec<String>,
    },

    #[error("line {line}: byte value {value} out of range")]
    ByteLiteralOutOfRange { line: u32, value: i64 },

    #[error("line {line}: unexpected break statement")]
    UnexpectedBreak { line: u32 },

    #[error("line {line}: unexpected continue statement")]
    UnexpectedContinue { line: u32 },

    #[error("line {line}: invalid assignment to array {name}")]
    InvalidArrayAssignment { line: u32, name: String },

    #[error("Program has no 'void main()' function")]
    MissingOrInvalidMain,

    #[error("line {line}: unexpected {found} (expected {expected})")]
    MalformedTree {
        line: u32,
        found: &'static str,
        expected: &'static str,
    },
}

impl SemanticError {
    pub fn line(&self) -> Option<u32> {
        match self {
            SemanticError::UndefinedName { line, .. }
            | SemanticError::UndefinedFunction { line, .. }
            | SemanticError::DefinedAsFunction { line, .. }
            | SemanticError::DefinedAsVariable { line, .. }
            | SemanticError::Redefinition { line, .. }
            | SemanticError::TypeMismatch { line }
            | SemanticError::PrototypeMismatch { line, .. }
            | SemanticError::ByteLiteralOutOfRange { line, .. }
            | SemanticError::UnexpectedBreak { line }
            | SemanticError::UnexpectedContinue { line }
            | SemanticError::InvalidArrayAssignment { line, .. }
            | SemanticError::MalformedTree { line, .. } => Some(*line),
            SemanticError::MissingOrInvalidMain => None,
        }
    }
}

/// Failure to obtain a tree to analyze.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("failed to read input: {0}")]
    Stdin(#[from] clap_stdin::StdinError),

    #[error("failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode syntax tree: {0}")]
    Json(#[from] serde_json::Error),

    #[error("syntax tree has no root node")]
    MissingRoot,

    #[error("node {child} referenced by {} does not exist", .parent.map_or("the root".to_string(), |p| format!("node {p}")))]
    DanglingNode { parent: Option<u32>, child: u32 },

    #[error("node {node} has more than one parent, the syntax tree must be acyclic")]
    SharedNode { node: u32 },

    #[error("root node is a {found}, expected a function list")]
    InvalidRoot { found: &'static str },
}
