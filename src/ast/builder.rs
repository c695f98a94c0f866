//! Helpers for assembling trees in code. Every helper appends at the current line.

use crate::analyzer::BuiltInType;

use super::{Ast, BinOpKind, NodeId, NodeKind, RelOpKind};

impl Ast {
    pub fn num(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::Num(value))
    }

    pub fn byte(&mut self, value: i64) -> NodeId {
        self.push(NodeKind::NumB(value))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.push(NodeKind::Str(value.to_string()))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        self.push(NodeKind::Bool(value))
    }

    pub fn id(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Id(name.to_string()))
    }

    pub fn binop(&mut self, op: BinOpKind, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::BinOp { op, left, right })
    }

    pub fn relop(&mut self, op: RelOpKind, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::RelOp { op, left, right })
    }

    pub fn not(&mut self, exp: NodeId) -> NodeId {
        self.push(NodeKind::Not(exp))
    }

    pub fn and(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::And { left, right })
    }

    pub fn or(&mut self, left: NodeId, right: NodeId) -> NodeId {
        self.push(NodeKind::Or { left, right })
    }

    pub fn primitive(&mut self, ty: BuiltInType) -> NodeId {
        self.push(NodeKind::PrimitiveType(ty))
    }

    pub fn array_type(&mut self, elem: BuiltInType, length: NodeId) -> NodeId {
        self.push(NodeKind::ArrayType { elem, length })
    }

    pub fn array_deref(&mut self, name: &str, index: NodeId) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::ArrayDereference { id, index })
    }

    pub fn array_assign(&mut self, name: &str, index: NodeId, exp: NodeId) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::ArrayAssign { id, index, exp })
    }

    pub fn cast(&mut self, exp: NodeId, ty: BuiltInType) -> NodeId {
        let target = self.primitive(ty);
        self.push(NodeKind::Cast { exp, target })
    }

    pub fn call(&mut self, name: &str, args: Vec<NodeId>) -> NodeId {
        let callee = self.id(name);
        self.push(NodeKind::Call { callee, args })
    }

    pub fn statements(&mut self, stmts: Vec<NodeId>) -> NodeId {
        self.push(NodeKind::Statements(stmts))
    }

    pub fn break_stmt(&mut self) -> NodeId {
        self.push(NodeKind::Break)
    }

    pub fn continue_stmt(&mut self) -> NodeId {
        self.push(NodeKind::Continue)
    }

    pub fn return_stmt(&mut self, exp: Option<NodeId>) -> NodeId {
        self.push(NodeKind::Return(exp))
    }

    pub fn if_stmt(&mut self, condition: NodeId, then: NodeId, otherwise: Option<NodeId>) -> NodeId {
        self.push(NodeKind::If {
            condition,
            then,
            otherwise,
        })
    }

    pub fn while_stmt(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::While { condition, body })
    }

    /// `ty name = init;` with a primitive type.
    pub fn var_decl(&mut self, ty: BuiltInType, name: &str, init: Option<NodeId>) -> NodeId {
        let ty = self.primitive(ty);
        self.var_decl_with(ty, name, init)
    }

    /// `elem name[length];`
    pub fn array_decl(&mut self, elem: BuiltInType, name: &str, length: NodeId) -> NodeId {
        let ty = self.array_type(elem, length);
        self.var_decl_with(ty, name, None)
    }

    pub fn var_decl_with(&mut self, ty: NodeId, name: &str, init: Option<NodeId>) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::VarDecl { id, ty, init })
    }

    pub fn assign(&mut self, name: &str, exp: NodeId) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::Assign { id, exp })
    }

    pub fn formal(&mut self, ty: NodeId, name: &str) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::Formal { id, ty })
    }

    /// Function with primitive return and formal types whose body is `stmts`.
    pub fn func(
        &mut self,
        return_type: BuiltInType,
        name: &str,
        formals: Vec<(BuiltInType, &str)>,
        stmts: Vec<NodeId>,
    ) -> NodeId {
        let return_type = self.primitive(return_type);
        let formals = formals
            .into_iter()
            .map(|(ty, name)| {
                let ty = self.primitive(ty);
                self.formal(ty, name)
            })
            .collect();
        let body = self.statements(stmts);
        self.func_decl(return_type, name, formals, body)
    }

    pub fn func_decl(
        &mut self,
        return_type: NodeId,
        name: &str,
        formals: Vec<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let id = self.id(name);
        self.push(NodeKind::FuncDecl {
            id,
            return_type,
            formals,
            body,
        })
    }

    /// Appends the program root and records it.
    pub fn funcs(&mut self, funcs: Vec<NodeId>) -> NodeId {
        let root = self.push(NodeKind::Funcs(funcs));
        self.set_root(root);
        root
    }
}
