use crate::analyzer::BuiltInType;
use crate::ast::{BinOpKind, NodeId, NodeKind, RelOpKind};
use crate::codegen::runtime;
use crate::error::SemanticError;

use super::{SemanticVisitor, Value};

impl SemanticVisitor<'_> {
    pub(super) fn visit_expr(&mut self, id: NodeId) -> Value {
        let ast = self.ast;
        let value = match ast.kind(id) {
            NodeKind::Num(n) => Value {
                ty: BuiltInType::Int,
                place: n.to_string(),
            },
            NodeKind::NumB(n) => self.visit_byte(id, *n),
            NodeKind::Str(s) => Value {
                ty: BuiltInType::String,
                place: self.code.emit_string(s),
            },
            NodeKind::Bool(b) => Value {
                ty: BuiltInType::Bool,
                place: b.to_string(),
            },
            NodeKind::Id(name) => self.visit_id(id, name),
            NodeKind::BinOp { op, left, right } => self.visit_binop(id, *op, *left, *right),
            NodeKind::RelOp { op, left, right } => self.visit_relop(id, *op, *left, *right),
            NodeKind::Not(exp) => {
                let v = self.visit_expr(*exp);
                if v.ty != BuiltInType::Bool {
                    self.mismatch(id);
                    self.poisoned(BuiltInType::Bool)
                } else {
                    self.emit_value(BuiltInType::Bool, &format!("xor i1 {}, true", v.place))
                }
            }
            NodeKind::And { left, right } => self.visit_logical(id, "and", *left, *right),
            NodeKind::Or { left, right } => self.visit_logical(id, "or", *left, *right),
            NodeKind::ArrayDereference { id: array, index } => {
                self.visit_array_deref(id, *array, *index)
            }
            NodeKind::Cast { exp, target } => self.visit_cast(id, *exp, *target),
            NodeKind::Call { callee, args } => self.visit_call(id, *callee, args),
            _ => {
                self.malformed(id, "expression");
                self.poisoned(BuiltInType::Void)
            }
        };
        self.annotations.record(id, &value);
        value
    }

    fn visit_byte(&mut self, id: NodeId, n: i64) -> Value {
        if !(0..=255).contains(&n) {
            self.report(SemanticError::ByteLiteralOutOfRange {
                line: self.ast.line(id),
                value: n,
            });
        }
        Value {
            ty: BuiltInType::Byte,
            place: n.rem_euclid(256).to_string(),
        }
    }

    fn visit_id(&mut self, id: NodeId, name: &str) -> Value {
        let Some(entry) = self.symbol_table.find_entry(name, false).cloned() else {
            let line = self.ast.line(id);
            let name = name.to_string();
            if self.symbol_table.contains(&name, true) {
                self.report(SemanticError::DefinedAsFunction { line, name });
            } else {
                self.report(SemanticError::UndefinedName { line, name });
            }
            return self.poisoned(BuiltInType::Void);
        };

        let ty = entry.value_type();
        if entry.is_array() || ty == BuiltInType::Void {
            // Arrays are referenced through their base address, never loaded.
            return Value {
                ty,
                place: entry.storage,
            };
        }
        self.emit_value(ty, &format!("load {}, ptr {}", ty.llvm(), entry.storage))
    }

    fn visit_binop(&mut self, id: NodeId, op: BinOpKind, left: NodeId, right: NodeId) -> Value {
        let l = self.visit_expr(left);
        let r = self.visit_expr(right);

        if self.names_array(left) || self.names_array(right) {
            self.mismatch(id);
            return self.poisoned(BuiltInType::Int);
        }
        let Some(ty) = BuiltInType::arithmetic(l.ty, r.ty) else {
            self.mismatch(id);
            return self.poisoned(BuiltInType::Int);
        };

        let lhs = self.widen(&l, ty);
        let rhs = self.widen(&r, ty);
        let opcode = match (op, ty) {
            (BinOpKind::Add, _) => "add",
            (BinOpKind::Sub, _) => "sub",
            (BinOpKind::Mul, _) => "mul",
            (BinOpKind::Div, BuiltInType::Byte) => "udiv",
            (BinOpKind::Div, _) => "sdiv",
        };
        if op == BinOpKind::Div {
            self.guard_division(ty, &rhs);
        }
        self.emit_value(ty, &format!("{} {} {}, {}", opcode, ty.llvm(), lhs, rhs))
    }

    /// Branches to a runtime error when `divisor` is zero; falls through to a fresh block otherwise.
    fn guard_division(&mut self, ty: BuiltInType, divisor: &str) {
        let is_zero = self.code.fresh_var();
        let error_label = self.code.fresh_label();
        let ok_label = self.code.fresh_label();

        self.code
            .emit(&format!("{} = icmp eq {} {}, 0", is_zero, ty.llvm(), divisor));
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            is_zero, error_label, ok_label
        ));
        self.code.emit_label(&error_label);
        self.runtime_error(runtime::DIVISION_BY_ZERO);
        self.code.emit_label(&ok_label);
    }

    fn visit_relop(&mut self, id: NodeId, op: RelOpKind, left: NodeId, right: NodeId) -> Value {
        let l = self.visit_expr(left);
        let r = self.visit_expr(right);

        if self.names_array(left) || self.names_array(right) {
            self.mismatch(id);
            return self.poisoned(BuiltInType::Bool);
        }
        let Some(ty) = BuiltInType::arithmetic(l.ty, r.ty) else {
            self.mismatch(id);
            return self.poisoned(BuiltInType::Bool);
        };

        let lhs = self.widen(&l, ty);
        let rhs = self.widen(&r, ty);
        let signed = ty == BuiltInType::Int;
        let predicate = match op {
            RelOpKind::Equal => "eq",
            RelOpKind::NotEqual => "ne",
            RelOpKind::LessThan if signed => "slt",
            RelOpKind::LessThan => "ult",
            RelOpKind::GreaterThan if signed => "sgt",
            RelOpKind::GreaterThan => "ugt",
            RelOpKind::LessEqual if signed => "sle",
            RelOpKind::LessEqual => "ule",
            RelOpKind::GreaterEqual if signed => "sge",
            RelOpKind::GreaterEqual => "uge",
        };
        self.emit_value(
            BuiltInType::Bool,
            &format!("icmp {} {} {}, {}", predicate, ty.llvm(), lhs, rhs),
        )
    }

    /// `and` / `or` evaluate both operands; there is no short circuit.
    fn visit_logical(&mut self, id: NodeId, opcode: &str, left: NodeId, right: NodeId) -> Value {
        let l = self.visit_expr(left);
        let r = self.visit_expr(right);
        if l.ty != BuiltInType::Bool || r.ty != BuiltInType::Bool {
            self.mismatch(id);
            return self.poisoned(BuiltInType::Bool);
        }
        self.emit_value(
            BuiltInType::Bool,
            &format!("{} i1 {}, {}", opcode, l.place, r.place),
        )
    }

    fn visit_array_deref(&mut self, id: NodeId, array: NodeId, index: NodeId) -> Value {
        self.visit_expr(array);
        let idx = self.visit_expr(index);
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
            return self.poisoned(BuiltInType::Void);
        };
        let elem = entry.value_type();
        let Some(size) = entry.array_size else {
            self.mismatch(id);
            return self.poisoned(elem);
        };
        if !index_ok {
            return self.poisoned(elem);
        }

        let ptr = self.element_pointer(&entry.storage, size, elem, &idx);
        self.emit_value(elem, &format!("load {}, ptr {}", elem.llvm(), ptr))
    }

    /// Emits the bounds guard for `base[index]` and returns the element's address.
    pub(super) fn element_pointer(
        &mut self,
        base: &str,
        size: usize,
        elem: BuiltInType,
        index: &Value,
    ) -> String {
        let i = self.widen(index, BuiltInType::Int);
        let error_label = self.code.fresh_label();
        let upper_label = self.code.fresh_label();
        let ok_label = self.code.fresh_label();

        let negative = self.code.fresh_var();
        self.code
            .emit(&format!("{} = icmp slt i32 {}, 0", negative, i));
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            negative, error_label, upper_label
        ));

        self.code.emit_label(&upper_label);
        let too_large = self.code.fresh_var();
        self.code
            .emit(&format!("{} = icmp sge i32 {}, {}", too_large, i, size));
        self.code.emit(&format!(
            "br i1 {}, label %{}, label %{}",
            too_large, error_label, ok_label
        ));

        self.code.emit_label(&error_label);
        self.runtime_error(runtime::OUT_OF_BOUNDS);

        self.code.emit_label(&ok_label);
        let ptr = self.code.fresh_var();
        self.code.emit(&format!(
            "{} = getelementptr {}, ptr {}, i32 {}",
            ptr,
            elem.llvm(),
            base,
            i
        ));
        ptr
    }

    fn visit_cast(&mut self, id: NodeId, exp: NodeId, target: NodeId) -> Value {
        let v = self.visit_expr(exp);
        let ty = match self.ast.kind(target) {
            NodeKind::PrimitiveType(t) => *t,
            _ => {
                self.malformed(target, "primitive type");
                return self.poisoned(BuiltInType::Void);
            }
        };
        if !v.ty.is_numeric() || !ty.is_numeric() {
            self.mismatch(id);
            return self.poisoned(ty);
        }

        match (v.ty, ty) {
            (BuiltInType::Int, BuiltInType::Byte) => {
                self.emit_value(ty, &format!("trunc i32 {} to i8", v.place))
            }
            (BuiltInType::Byte, BuiltInType::Int) => {
                self.emit_value(ty, &format!("zext i8 {} to i32", v.place))
            }
            _ => v,
        }
    }

    fn visit_call(&mut self, id: NodeId, callee: NodeId, args: &[NodeId]) -> Value {
        let values: Vec<Value> = args.iter().map(|a| self.visit_expr(*a)).collect();
        let Some(name) = self.name_of(callee) else {
            return self.poisoned(BuiltInType::Void);
        };
        let line = self.ast.line(id);

        if self.symbol_table.contains(name, false) {
            self.report(SemanticError::DefinedAsVariable {
                line,
                name: name.to_string(),
            });
            return self.poisoned(BuiltInType::Void);
        }
        let Some(entry) = self.symbol_table.find_entry(name, true).cloned() else {
            self.report(SemanticError::UndefinedFunction {
                line,
                name: name.to_string(),
            });
            return self.poisoned(BuiltInType::Void);
        };

        let ret = entry.return_type;
        let matches = values.len() == entry.ty.len()
            && values
                .iter()
                .zip(&entry.ty)
                .zip(args)
                .all(|((v, param), arg)| v.ty.promotes_to(param) && !self.names_array(*arg));
        if !matches {
            self.report(SemanticError::PrototypeMismatch {
                line,
                name: name.to_string(),
                expected: entry.ty.iter().map(|t| t.name().to_string()).collect(),
            });
            return self.poisoned(ret);
        }

        let mut operands = vec![];
        for (v, param) in values.iter().zip(&entry.ty) {
            let place = match param {
                BuiltInType::String => self.string_pointer(&v.place),
                _ => self.widen(v, *param),
            };
            operands.push(format!("{} {}", param.llvm(), place));
        }
        let call = format!("call {} @{}({})", ret.llvm(), name, operands.join(", "));

        if ret == BuiltInType::Void {
            self.code.emit(&call);
            Value {
                ty: ret,
                place: String::new(),
            }
        } else {
            self.emit_value(ret, &call)
        }
    }

    /// Emits `%tN = <instruction>` and returns the new register as a value of type `ty`.
    fn emit_value(&mut self, ty: BuiltInType, instruction: &str) -> Value {
        let reg = self.code.fresh_var();
        self.code.emit(&format!("{} = {}", reg, instruction));
        Value { ty, place: reg }
    }

    /// Fallback value of an expression that failed to type check. Nothing is emitted for it.
    pub(super) fn poisoned(&self, ty: BuiltInType) -> Value {
        let place = match ty {
            BuiltInType::Void => String::new(),
            _ => "undef".to_string(),
        };
        Value { ty, place }
    }
}
