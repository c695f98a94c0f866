mod expr;
mod stmt;

use log::{debug, warn};

use crate::ast::{Ast, NodeId, NodeKind};
use crate::codegen::runtime::{self, BUILTINS, RESERVED};
use crate::codegen::CodeBuffer;
use crate::error::SemanticError;

use super::{BuiltInType, FrameLayout, SymbolEntry, SymbolTable};

/// Type and result location of a visited expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Value {
    pub ty: BuiltInType,
    /// Register, immediate literal, pooled string name, or empty for VOID.
    pub place: String,
}

/// Per-node outputs of the traversal, indexed by `NodeId`.
#[derive(Clone, Debug, Default)]
pub struct Annotations {
    types: Vec<Option<BuiltInType>>,
    places: Vec<Option<String>>,
}

impl Annotations {
    fn with_capacity(len: usize) -> Self {
        Self {
            types: vec![None; len],
            places: vec![None; len],
        }
    }

    fn record(&mut self, id: NodeId, value: &Value) {
        if let Some(slot) = self.types.get_mut(id.index()) {
            *slot = Some(value.ty);
        }
        if let Some(slot) = self.places.get_mut(id.index()) {
            *slot = Some(value.place.clone());
        }
    }

    pub fn ty(&self, id: NodeId) -> Option<BuiltInType> {
        self.types.get(id.index()).copied().flatten()
    }

    pub fn place(&self, id: NodeId) -> Option<&str> {
        self.places.get(id.index()).and_then(|p| p.as_deref())
    }
}

#[derive(Debug)]
pub struct Compilation {
    pub ir: String,
    pub diagnostics: Vec<SemanticError>,
    pub annotations: Annotations,
    pub symbol_table: SymbolTable,
}

impl Compilation {
    pub fn is_ok(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

struct LoopLabels {
    continue_label: String,
    break_label: String,
}

/// Type checks a tree and emits its IR in the same depth-first pass.
pub struct SemanticVisitor<'a> {
    ast: &'a Ast,
    symbol_table: SymbolTable,
    code: CodeBuffer,
    return_type: BuiltInType,
    frame: FrameLayout,
    loop_stack: Vec<LoopLabels>,
    annotations: Annotations,
    diagnostics: Vec<SemanticError>,
}

impl<'a> SemanticVisitor<'a> {
    pub fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            symbol_table: SymbolTable::new(),
            code: CodeBuffer::new(),
            return_type: BuiltInType::Void,
            frame: FrameLayout::default(),
            loop_stack: vec![],
            annotations: Annotations::with_capacity(ast.len()),
            diagnostics: vec![],
        }
    }

    pub fn finish(self) -> Compilation {
        Compilation {
            ir: self.code.to_string(),
            diagnostics: self.diagnostics,
            annotations: self.annotations,
            symbol_table: self.symbol_table,
        }
    }

    pub fn visit_funcs(&mut self, root: NodeId) {
        let ast = self.ast;
        self.code.emit_global(runtime::PREAMBLE);
        for (name, builtin) in BUILTINS.entries() {
            self.symbol_table.add_entry(SymbolEntry::function(
                name,
                builtin.params.to_vec(),
                builtin.return_type,
            ));
        }

        let NodeKind::Funcs(funcs) = ast.kind(root) else {
            self.malformed(root, "function list");
            return;
        };

        let mut main_valid = false;
        for &func in funcs {
            let NodeKind::FuncDecl {
                id,
                return_type,
                formals,
                ..
            } = ast.kind(func)
            else {
                self.malformed(func, "function declaration");
                continue;
            };
            let Some(name) = self.name_of(*id) else {
                continue;
            };

            let ret = match ast.kind(*return_type) {
                NodeKind::PrimitiveType(t) => Some(*t),
                _ => None,
            };
            if name == "main" && ret == Some(BuiltInType::Void) && formals.is_empty() {
                main_valid = true;
            }
            if self.symbol_table.is_defined(name) || RESERVED.contains(name) {
                self.report(SemanticError::Redefinition {
                    line: self.ast.line(func),
                    name: name.to_string(),
                });
            }
            if ret.is_none() {
                self.mismatch(func);
            }

            let params = self.formal_types(formals);
            self.symbol_table.add_entry(SymbolEntry::function(
                name,
                params,
                ret.unwrap_or(BuiltInType::Void),
            ));
        }

        if !main_valid {
            self.report(SemanticError::MissingOrInvalidMain);
        }

        for &func in funcs {
            if matches!(ast.kind(func), NodeKind::FuncDecl { .. }) {
                self.visit_func_decl(func);
            }
        }
    }

    fn formal_types(&self, formals: &[NodeId]) -> Vec<BuiltInType> {
        let ast = self.ast;
        formals
            .iter()
            .map(|f| match ast.kind(*f) {
                NodeKind::Formal { ty, .. } => match ast.kind(*ty) {
                    NodeKind::PrimitiveType(t) => *t,
                    NodeKind::ArrayType { elem, .. } => *elem,
                    _ => BuiltInType::Void,
                },
                _ => BuiltInType::Void,
            })
            .collect()
    }

    fn visit_func_decl(&mut self, func: NodeId) {
        let ast = self.ast;
        let NodeKind::FuncDecl {
            id,
            return_type,
            formals,
            body,
        } = ast.kind(func)
        else {
            return;
        };
        let Some(name) = self.name_of(*id) else {
            return;
        };
        // A non-primitive return type was already reported while registering the function.
        let ret = match ast.kind(*return_type) {
            NodeKind::PrimitiveType(t) => *t,
            _ => BuiltInType::Void,
        };
        debug!("function {} ({} formals)", name, formals.len());

        self.frame = FrameLayout::measure(ast, *body, formals.len());
        let params = self
            .formal_types(formals)
            .iter()
            .map(|t| t.llvm())
            .collect::<Vec<_>>()
            .join(", ");
        self.code
            .emit_raw(&format!("define {} @{}({}) {{", ret.llvm(), name, params));
        self.code
            .emit(&format!("%frame = alloca i64, i32 {}", self.frame.slots()));

        self.symbol_table.begin_scope();
        for (k, formal) in formals.iter().enumerate() {
            self.visit_formal(*formal, k);
        }

        let previous_return = std::mem::replace(&mut self.return_type, ret);
        if let NodeKind::Statements(_) = ast.kind(*body) {
            // The function scope above already holds the body's names.
            self.visit_statements(*body, false);
        } else {
            self.visit_stmt(*body);
        }
        self.return_type = previous_return;

        match ret {
            BuiltInType::Void => self.code.emit("ret void"),
            t => self.code.emit(&format!("ret {} {}", t.llvm(), t.zero())),
        }
        self.code.emit_raw("}");
        self.code.emit_raw("");

        self.symbol_table.end_scope();
    }

    fn visit_formal(&mut self, formal: NodeId, k: usize) {
        let ast = self.ast;
        let NodeKind::Formal { id, ty } = ast.kind(formal) else {
            self.malformed(formal, "formal parameter");
            return;
        };
        let Some(name) = self.name_of(*id) else {
            return;
        };

        if self.symbol_table.is_defined(name) {
            self.report(SemanticError::Redefinition {
                line: self.ast.line(formal),
                name: name.to_string(),
            });
        }
        let ty = match ast.kind(*ty) {
            NodeKind::PrimitiveType(BuiltInType::Void) | NodeKind::ArrayType { .. } => {
                self.mismatch(formal);
                BuiltInType::Void
            }
            NodeKind::PrimitiveType(t) => *t,
            _ => {
                self.malformed(*ty, "type");
                BuiltInType::Void
            }
        };

        let storage = self.slot_address(self.symbol_table.formal_offset());
        if ty != BuiltInType::Void {
            self.code
                .emit(&format!("store {} %{}, ptr {}", ty.llvm(), k, storage));
        }
        self.symbol_table
            .add_entry(SymbolEntry::formal(name, ty, storage));
    }

    /// Emits the address computation of a frame slot and returns the register holding it.
    fn slot_address(&mut self, offset: i32) -> String {
        let reg = self.code.fresh_var();
        self.code.emit(&format!(
            "{} = getelementptr i64, ptr %frame, i32 {}",
            reg,
            self.frame.slot(offset)
        ));
        reg
    }

    /// Emits a zero-extension when a BYTE value flows into an INT position.
    fn widen(&mut self, value: &Value, target: BuiltInType) -> String {
        if value.ty == BuiltInType::Byte && target == BuiltInType::Int {
            let reg = self.code.fresh_var();
            self.code
                .emit(&format!("{} = zext i8 {} to i32", reg, value.place));
            reg
        } else {
            value.place.clone()
        }
    }

    /// Pointer form of a pooled string constant. Other places are already pointers.
    fn string_pointer(&mut self, place: &str) -> String {
        let Some(ty) = self.code.string_type(place) else {
            return place.to_string();
        };
        let reg = self.code.fresh_var();
        self.code.emit(&format!(
            "{} = getelementptr {}, ptr {}, i32 0, i32 0",
            reg, ty, place
        ));
        reg
    }

    fn runtime_error(&mut self, message: &str) {
        let name = self.code.emit_string(message);
        let ptr = self.string_pointer(&name);
        self.code
            .emit(&format!("call void {}(ptr {})", runtime::RUNTIME_ERROR, ptr));
        self.code.emit("unreachable");
    }

    /// Starts an unreachable block after a terminator emitted mid-block.
    fn open_dead_block(&mut self) {
        let label = self.code.fresh_label();
        self.code.emit_label(&label);
    }

    fn branch_to(&mut self, label: &str) {
        self.code.emit(&format!("br label %{}", label));
    }

    /// Whether `id` is an identifier naming a whole array.
    fn names_array(&self, id: NodeId) -> bool {
        self.ast
            .ident(id)
            .and_then(|name| self.symbol_table.find_entry(name, false))
            .is_some_and(SymbolEntry::is_array)
    }

    fn name_of(&mut self, id: NodeId) -> Option<&'a str> {
        let ast = self.ast;
        let name = ast.ident(id);
        if name.is_none() {
            self.malformed(id, "identifier");
        }
        name
    }

    fn report(&mut self, error: SemanticError) {
        warn!("{}", error);
        self.diagnostics.push(error);
    }

    fn mismatch(&mut self, id: NodeId) {
        self.report(SemanticError::TypeMismatch {
            line: self.ast.line(id),
        });
    }

    fn malformed(&mut self, id: NodeId, expected: &'static str) {
        self.report(SemanticError::MalformedTree {
            line: self.ast.line(id),
            found: self.ast.kind(id).describe(),
            expected,
        });
    }
}
