mod builder;
mod node;

pub use node::*;

use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Arena holding every node of one compilation unit. Parent-to-child edges are `NodeId`s.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ast {
    nodes: Vec<Node>,
    root: Option<NodeId>,
    #[serde(skip)]
    line: u32,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            nodes: vec![],
            root: None,
            line: 1,
        }
    }

    pub fn from_json(s: &str) -> Result<Self, InputError> {
        let ast: Ast = serde_json::from_str(s)?;
        ast.validate()?;
        Ok(ast)
    }

    pub fn to_json(&self) -> Result<String, InputError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), InputError> {
        let root = self.root.ok_or(InputError::MissingRoot)?;
        let len = self.nodes.len();
        if root.index() >= len {
            return Err(InputError::DanglingNode { parent: None, child: root.0 });
        }
        // One incoming edge per node, with the root's coming from outside, keeps
        // everything reachable from the root a tree.
        let mut has_parent = vec![false; len];
        has_parent[root.index()] = true;
        for (i, node) in self.nodes.iter().enumerate() {
            for child in node.kind.children() {
                let Some(seen) = has_parent.get_mut(child.index()) else {
                    return Err(InputError::DanglingNode {
                        parent: Some(i as u32),
                        child: child.0,
                    });
                };
                if *seen {
                    return Err(InputError::SharedNode { node: child.0 });
                }
                *seen = true;
            }
        }
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    pub fn line(&self, id: NodeId) -> u32 {
        self.node(id).line
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Line attached to nodes pushed from now on.
    pub fn at_line(&mut self, line: u32) -> &mut Self {
        self.line = line;
        self
    }

    pub fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            line: self.line,
            kind,
        });
        id
    }

    /// Name carried by an `Id` node.
    pub fn ident(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Id(name) => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip_keeps_lines_and_root() {
        let mut ast = Ast::new();
        let main = ast.at_line(3).func(crate::analyzer::BuiltInType::Void, "main", vec![], vec![]);
        let root = ast.funcs(vec![main]);
        let json = ast.to_json().unwrap();

        let loaded = Ast::from_json(&json).unwrap();
        assert_eq!(loaded.root(), Some(root));
        assert_eq!(loaded.line(main), 3);
        assert_eq!(loaded.len(), ast.len());
    }

    #[test]
    fn dangling_children_are_rejected() {
        let json = r#"{"nodes":[{"line":1,"kind":{"Not":7}}],"root":0}"#;
        assert!(matches!(
            Ast::from_json(json),
            Err(InputError::DanglingNode { parent: Some(0), child: 7 })
        ));
    }

    #[test]
    fn cycles_are_rejected() {
        let json = r#"{"nodes":[{"line":1,"kind":{"Not":0}}],"root":0}"#;
        assert!(matches!(
            Ast::from_json(json),
            Err(InputError::SharedNode { node: 0 })
        ));

        // `printi(!x)` where the operand of `!` is the `!` node itself
        let json = r#"{"nodes":[
            {"line":1,"kind":{"Not":0}},
            {"line":1,"kind":{"Id":"printi"}},
            {"line":1,"kind":{"Call":{"callee":1,"args":[0]}}},
            {"line":1,"kind":{"Statements":[2]}},
            {"line":1,"kind":{"PrimitiveType":"VOID"}},
            {"line":1,"kind":{"Id":"main"}},
            {"line":1,"kind":{"FuncDecl":{"id":5,"return_type":4,"formals":[],"body":3}}},
            {"line":1,"kind":{"Funcs":[6]}}
        ],"root":7}"#;
        assert!(matches!(
            Ast::from_json(json),
            Err(InputError::SharedNode { node: 0 })
        ));
    }

    #[test]
    fn nodes_with_two_parents_are_rejected() {
        let json = r#"{"nodes":[
            {"line":1,"kind":{"Bool":true}},
            {"line":1,"kind":{"Not":0}},
            {"line":1,"kind":{"And":{"left":0,"right":1}}}
        ],"root":2}"#;
        assert!(matches!(
            Ast::from_json(json),
            Err(InputError::SharedNode { node: 0 })
        ));
    }

    #[test]
    fn missing_root_is_rejected() {
        let json = r#"{"nodes":[{"line":1,"kind":"Break"}],"root":null}"#;
        assert!(matches!(Ast::from_json(json), Err(InputError::MissingRoot)));
    }
}
