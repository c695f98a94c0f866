use crate::ast::{Ast, NodeId, NodeKind};

/// Stack frame of one function, in 8-byte slots.
///
/// Locals occupy `0..peak`, slot `peak` is scratch space for array zero-initialization
/// and formal `k` lives at `peak + 1 + k`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameLayout {
    peak: i32,
    formals: i32,
}

impl FrameLayout {
    /// Mirrors the symbol table's offset rules over `body` without touching any state.
    pub fn measure(ast: &Ast, body: NodeId, formals: usize) -> Self {
        let formals = i32::try_from(formals).unwrap_or(i32::MAX);
        Self {
            peak: peak_from(ast, body, 0, formals),
            formals,
        }
    }

    /// End offset of `slots` locals placed at `base`, or `None` when the frame
    /// would no longer fit an `i32` slot count.
    pub fn reserve(&self, base: i32, slots: i32) -> Option<i32> {
        reserve(base, slots, self.formals)
    }

    pub fn slots(&self) -> i32 {
        self.peak.saturating_add(1).saturating_add(self.formals)
    }

    pub fn scratch(&self) -> i32 {
        self.peak
    }

    /// Slot of a symbol-table offset. Formals have offsets `-1, -2, ...`.
    pub fn slot(&self, offset: i32) -> i32 {
        if offset >= 0 {
            offset
        } else {
            self.peak.saturating_sub(offset)
        }
    }
}

/// Element count of an array length literal, if it is one that fits an `i32`.
pub fn array_length(ast: &Ast, length: NodeId) -> Option<i32> {
    match ast.kind(length) {
        NodeKind::Num(n) | NodeKind::NumB(n) => i32::try_from(*n).ok().filter(|n| *n >= 0),
        _ => None,
    }
}

/// Declared size in slots of a variable declaration's type node.
pub fn declared_slots(ast: &Ast, ty: NodeId) -> i32 {
    match ast.kind(ty) {
        NodeKind::ArrayType { length, .. } => array_length(ast, *length).unwrap_or(0),
        _ => 1,
    }
}

/// Locals end at most where the scratch slot and every formal still follow within `i32`.
fn reserve(base: i32, slots: i32, formals: i32) -> Option<i32> {
    base.checked_add(slots)
        .filter(|end| end.checked_add(1).and_then(|e| e.checked_add(formals)).is_some())
}

/// A declaration that does not fit is reported by the visitor and takes no slots.
fn place(ast: &Ast, ty: NodeId, base: i32, formals: i32) -> i32 {
    reserve(base, declared_slots(ast, ty), formals).unwrap_or(base)
}

fn peak_from(ast: &Ast, stmt: NodeId, base: i32, formals: i32) -> i32 {
    match ast.kind(stmt) {
        NodeKind::VarDecl { ty, .. } => place(ast, *ty, base, formals),
        NodeKind::Statements(stmts) => {
            let mut offset = base;
            let mut peak = base;
            for s in stmts {
                if let NodeKind::VarDecl { ty, .. } = ast.kind(*s) {
                    offset = place(ast, *ty, offset, formals);
                    peak = peak.max(offset);
                } else {
                    peak = peak.max(peak_from(ast, *s, offset, formals));
                }
            }
            peak
        }
        NodeKind::If {
            then, otherwise, ..
        } => {
            let then_peak = peak_from(ast, *then, base, formals);
            otherwise.map_or(then_peak, |o| {
                then_peak.max(peak_from(ast, o, base, formals))
            })
        }
        NodeKind::While { body, .. } => peak_from(ast, *body, base, formals),
        _ => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::BuiltInType;

    #[test]
    fn sibling_blocks_share_slots() {
        let mut ast = Ast::new();
        let x = ast.var_decl(BuiltInType::Int, "x", None);
        let y = ast.var_decl(BuiltInType::Int, "y", None);
        let first = ast.statements(vec![y]);
        let len = ast.num(4);
        let arr = ast.array_decl(BuiltInType::Byte, "a", len);
        let second = ast.statements(vec![arr]);
        let body = ast.statements(vec![x, first, second]);

        let frame = FrameLayout::measure(&ast, body, 2);
        assert_eq!(frame.scratch(), 5);
        assert_eq!(frame.slots(), 8);
        assert_eq!(frame.slot(3), 3);
        assert_eq!(frame.slot(-1), 6);
        assert_eq!(frame.slot(-2), 7);
    }

    #[test]
    fn loop_and_branch_bodies_are_nested_scopes() {
        let mut ast = Ast::new();
        let a = ast.var_decl(BuiltInType::Int, "a", None);
        let b = ast.var_decl(BuiltInType::Int, "b", None);
        let c = ast.var_decl(BuiltInType::Int, "c", None);
        let inner = ast.statements(vec![b, c]);
        let cond = ast.boolean(true);
        let w = ast.while_stmt(cond, inner);
        let d = ast.var_decl(BuiltInType::Int, "d", None);
        let i = ast.if_stmt(cond, d, None);
        let body = ast.statements(vec![a, w, i]);

        assert_eq!(FrameLayout::measure(&ast, body, 0).scratch(), 3);
    }

    #[test]
    fn oversized_declarations_take_no_slots() {
        let mut ast = Ast::new();
        let huge = ast.num(3_000_000_000);
        let a = ast.array_decl(BuiltInType::Int, "a", huge);
        let big = ast.num(2_000_000_000);
        let b = ast.array_decl(BuiltInType::Int, "b", big);
        let big = ast.num(2_000_000_000);
        let c = ast.array_decl(BuiltInType::Int, "c", big);
        let body = ast.statements(vec![a, b, c]);

        let frame = FrameLayout::measure(&ast, body, 1);
        assert_eq!(frame.scratch(), 2_000_000_000);
        assert_eq!(frame.slots(), 2_000_000_002);
        assert_eq!(frame.reserve(frame.scratch(), 2_000_000_000), None);
        assert_eq!(frame.reserve(i32::MAX - 2, 1), None);
        assert_eq!(frame.reserve(i32::MAX - 3, 1), Some(i32::MAX - 2));
    }
}
