use log::debug;

use crate::analyzer::{array_length, declared_slots, BuiltInType, SymbolEntry};
use crate::ast::{NodeId, NodeKind};
use crate::error::SemanticError;

use super::{LoopLabels, SemanticVisitor, Value};

/// Declared type of a variable after its type node was checked.
#[derive(Clone, Copy)]
enum DeclaredType {
    Scalar(BuiltInType),
    Array(BuiltInType, usize),
}

impl SemanticVisitor<'_> {
    pub(super) fn visit_stmt(&mut self, id: NodeId) {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Statements(_) => self.visit_statements(id, true),
            NodeKind::Break => self.visit_break(id),
            NodeKind::Continue => self.visit_continue(id),
            NodeKind::Return(exp) => self.visit_return(id, *exp),
            NodeKind::If {
                condition,
                then,
                otherwise,
            } => self.visit_if(id, *condition, *then, *otherwise),
            NodeKind::While { condition, body } => self.visit_while(id, *condition, *body),
            NodeKind::VarDecl { id: name, ty, init } => self.visit_var_decl(id, *name, *ty, *init),
            NodeKind::Assign { id: name, exp } => self.visit_assign(id, *name, *exp),
            NodeKind::ArrayAssign {
                id: name,
                index,
                exp,
            } => self.visit_array_assign(id, *name, *index, *exp),
            NodeKind::Call { .. } => {
                self.visit_expr(id);
            }
            _ => self.malformed(id, "statement"),
        }
    }

    /// `opens_scope` is false only for the outermost block of a function body.
    pub(super) fn visit_statements(&mut self, id: NodeId, opens_scope: bool) {
        let ast = self.ast;
        let NodeKind::Statements(stmts) = ast.kind(id) else {
            return;
        };

        if opens_scope {
            self.symbol_table.begin_scope();
        }
        for stmt in stmts {
            self.visit_stmt(*stmt);
        }
        if opens_scope {
            self.symbol_table.end_scope();
        }
    }

    fn visit_break(&mut self, id: NodeId) {
        if !self.symbol_table.in_loop() {
            self.report(SemanticError::UnexpectedBreak {
                line: self.ast.line(id),
            });
            return;
        }
        if let Some(labels) = self.loop_stack.last() {
            let target = labels.break_label.clone();
            self.branch_to(&target);
            self.open_dead_block();
        }
    }

    fn visit_continue(&mut self, id: NodeId) {
        if !self.symbol_table.in_loop() {
            self.report(SemanticError::UnexpectedContinue {
                line: self.ast.line(id),
            });
            return;
        }
        if let Some(labels) = self.loop_stack.last() {
            let target = labels.continue_label.clone();
            self.branch_to(&target);
            self.open_dead_block();
        }
    }

    fn visit_return(&mut self, id: NodeId, exp: Option<NodeId>) {
        let expected = self.return_type;
        let Some(exp) = exp else {
            if expected != BuiltInType::Void {
                self.mismatch(id);
                return;
            }
            self.code.emit("ret void");
            self.open_dead_block();
            return;
        };

        let v = self.visit_expr(exp);
        if !v.ty.promotes_to(&expected) || self.names_array(exp) {
            self.mismatch(id);
            return;
        }
        match expected {
            BuiltInType::Void => self.code.emit("ret void"),
            t => {
                let place = self.widen(&v, t);
                self.code.emit(&format!("ret {} {}", t.llvm(), place));
            }
        }
        self.open_dead_block();
    }

    fn visit_if(&mut self, id: NodeId, condition: NodeId, then: NodeId, otherwise: Option<NodeId>) {
        let cond = self.visit_expr(condition);
        if cond.ty != BuiltInType::Bool {
            self.mismatch(id);
        }

        let then_label = self.code.fresh_label();
        let else_label = otherwise.map(|_| self.code.fresh_label());
        let end_label = self.code.fresh_label();
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            cond.place,
            then_label,
            else_label.as_ref().unwrap_or(&end_label)
        ));

        self.code.emit_label(&then_label);
        self.symbol_table.begin_scope();
        self.visit_stmt(then);
        self.symbol_table.end_scope();
        self.branch_to(&end_label);

        if let (Some(otherwise), Some(else_label)) = (otherwise, else_label) {
            self.code.emit_label(&else_label);
            self.symbol_table.begin_scope();
            self.visit_stmt(otherwise);
            self.symbol_table.end_scope();
            self.branch_to(&end_label);
        }
        self.code.emit_label(&end_label);
    }

    fn visit_while(&mut self, id: NodeId, condition: NodeId, body: NodeId) {
        let cond_label = self.code.fresh_label();
        let body_label = self.code.fresh_label();
        let end_label = self.code.fresh_label();

        self.branch_to(&cond_label);
        self.code.emit_label(&cond_label);
        let cond = self.visit_expr(condition);
        if cond.ty != BuiltInType::Bool {
            self.mismatch(id);
        }
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            cond.place, body_label, end_label
        ));

        self.code.emit_label(&body_label);
        self.symbol_table.begin_loop_scope();
        self.loop_stack.push(LoopLabels {
            continue_label: cond_label.clone(),
            break_label: end_label.clone(),
        });
        self.visit_stmt(body);
        self.loop_stack.pop();
        self.symbol_table.end_scope();
        self.branch_to(&cond_label);

        self.code.emit_label(&end_label);
    }

    fn visit_type(&mut self, ty: NodeId) -> Option<DeclaredType> {
        let ast = self.ast;
        match ast.kind(ty) {
            NodeKind::PrimitiveType(t) => Some(DeclaredType::Scalar(*t)),
            NodeKind::ArrayType { elem, length } => {
                let len = self.visit_expr(*length);
                if !len.ty.is_numeric() {
                    self.mismatch(ty);
                }
                let literal = matches!(ast.kind(*length), NodeKind::Num(_) | NodeKind::NumB(_));
                if !literal || array_length(ast, *length).is_none() {
                    self.mismatch(ty);
                }
                if *elem == BuiltInType::Void {
                    self.mismatch(ty);
                }
                let size = usize::try_from(declared_slots(ast, ty)).unwrap_or(0);
                Some(DeclaredType::Array(*elem, size))
            }
            _ => {
                self.malformed(ty, "type");
                None
            }
        }
    }

    fn visit_var_decl(&mut self, id: NodeId, name: NodeId, ty: NodeId, init: Option<NodeId>) {
        let ast = self.ast;
        let Some(declared) = self.visit_type(ty) else {
            return;
        };
        let Some(name) = self.name_of(name) else {
            return;
        };

        if self.symbol_table.is_defined(name) {
            self.report(SemanticError::Redefinition {
                line: ast.line(id),
                name: name.to_string(),
            });
        }
        let expected = match declared {
            DeclaredType::Scalar(t) | DeclaredType::Array(t, _) => t,
        };
        if matches!(declared, DeclaredType::Scalar(BuiltInType::Void)) {
            self.mismatch(id);
        }

        let mut initial = None;
        if let Some(init) = init {
            let v = self.visit_expr(init);
            let legal = match (ast.kind(init), &declared) {
                (_, DeclaredType::Array(..)) => false,
                _ if self.names_array(init) => false,
                // Call results must match the declared type exactly.
                (NodeKind::Call { callee, .. }, _) => ast
                    .ident(*callee)
                    .and_then(|f| self.symbol_table.find_entry(f, true))
                    .map_or(true, |f| f.return_type == expected),
                _ => v.ty.promotes_to(&expected),
            };
            if legal {
                initial = Some(v);
            } else {
                self.mismatch(id);
            }
        }

        let offset = self.symbol_table.offset();
        let mut declared = declared;
        if self.frame.reserve(offset, declared_slots(ast, ty)).is_none() {
            // Does not fit the frame; declared without storage of its own.
            self.mismatch(ty);
            if let DeclaredType::Array(elem, _) = declared {
                declared = DeclaredType::Array(elem, 0);
            }
        }
        let storage = self.slot_address(offset);
        debug!("declare {} at offset {} ({})", name, offset, storage);
        let entry = match declared {
            DeclaredType::Scalar(t) => {
                if t != BuiltInType::Void {
                    let value = match &initial {
                        Some(v) if v.ty != BuiltInType::Void => self.widen(v, t),
                        _ => t.zero().to_string(),
                    };
                    self.code
                        .emit(&format!("store {} {}, ptr {}", t.llvm(), value, storage));
                }
                SymbolEntry::variable(name, t, storage)
            }
            DeclaredType::Array(elem, size) => {
                if elem != BuiltInType::Void {
                    self.zero_fill(&storage, elem, size);
                }
                SymbolEntry::array(name, elem, size, storage)
            }
        };
        let assigned = self.symbol_table.add_entry(entry);
        debug_assert_eq!(assigned, offset);
    }

    /// Stores zero into every element of a freshly declared array, one element per iteration.
    fn zero_fill(&mut self, base: &str, elem: BuiltInType, size: usize) {
        let counter = self.code.fresh_var();
        self.code.emit(&format!(
            "{} = getelementptr i64, ptr %frame, i32 {}",
            counter,
            self.frame.scratch()
        ));
        self.code.emit(&format!("store i32 0, ptr {}", counter));

        let cond_label = self.code.fresh_label();
        let body_label = self.code.fresh_label();
        let inc_label = self.code.fresh_label();
        let end_label = self.code.fresh_label();

        self.branch_to(&cond_label);
        self.code.emit_label(&cond_label);
        let i = self.code.fresh_var();
        self.code.emit(&format!("{} = load i32, ptr {}", i, counter));
        let more = self.code.fresh_var();
        self.code
            .emit(&format!("{} = icmp slt i32 {}, {}", more, i, size));
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            more, body_label, end_label
        ));

        self.code.emit_label(&body_label);
        let ptr = self.code.fresh_var();
        self.code.emit(&format!(
            "{} = getelementptr {}, ptr {}, i32 {}",
            ptr,
            elem.llvm(),
            base,
            i
        ));
        self.code.emit(&format!(
            "store {} {}, ptr {}",
            elem.llvm(),
            elem.zero(),
            ptr
        ));
        self.branch_to(&inc_label);

        self.code.emit_label(&inc_label);
        let next = self.code.fresh_var();
        self.code.emit(&format!("{} = add i32 {}, 1", next, i));
        self.code.emit(&format!("store i32 {}, ptr {}", next, counter));
        self.branch_to(&cond_label);

        self.code.emit_label(&end_label);
    }

    fn visit_assign(&mut self, id: NodeId, target: NodeId, exp: NodeId) {
        let v = self.visit_expr(exp);
        let Some(name) = self.name_of(target) else {
            return;
        };
        let line = self.ast.line(id);

        let Some(entry) = self.symbol_table.find_entry(name, false).cloned() else {
            let name = name.to_string();
            if self.symbol_table.contains(&name, true) {
                self.report(SemanticError::DefinedAsFunction { line, name });
            } else {
                self.report(SemanticError::UndefinedName { line, name });
            }
            return;
        };
        if entry.is_array() {
            self.report(SemanticError::InvalidArrayAssignment {
                line,
                name: entry.name,
            });
            return;
        }

        let ty = entry.value_type();
        self.annotations.record(
            target,
            &Value {
                ty,
                place: entry.storage.clone(),
            },
        );
        if self.names_array(exp) || !v.ty.promotes_to(&ty) {
            self.mismatch(id);
            return;
        }
        if ty == BuiltInType::Void {
            return;
        }
        let value = self.widen(&v, ty);
        self.code
            .emit(&format!("store {} {}, ptr {}", ty.llvm(), value, entry.storage));
    }

    fn visit_array_assign(&mut self, id: NodeId, array: NodeId, index: NodeId, exp: NodeId) {
        self.visit_expr(array);
        let idx = self.visit_expr(index);
        let v = self.visit_expr(exp);
        let index_ok = idx.ty.is_numeric();
        if !index_ok {
            self.mismatch(id);
        }

        let Some(entry) = self
            .ast
            .ident(array)
            .and_then(|name| self.symbol_table.find_entry(name, false))
            .cloned()
        else {
            // Reported by the identifier visit.
            return;
        };
        let Some(size) = entry.array_size else {
            self.mismatch(id);
            return;
        };
        let elem = entry.value_type();
        if self.names_array(exp) || !v.ty.promotes_to(&elem) {
            self.mismatch(id);
            return;
        }
        if !index_ok {
            return;
        }

        let ptr = self.element_pointer(&entry.storage, size, elem, &idx);
        let value = self.widen(&v, elem);
        self.code
            .emit(&format!("store {} {}, ptr {}", elem.llvm(), value, ptr));
    }
}
