use crate::symbol::{SymbolId, Tristate};

/// Stable index of an expression node in the [`ExprArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExprId(pub u32);

impl ExprId {
    /// The constant `y`, always present at index 0.
    pub const CONST_Y: ExprId = ExprId(0);
    /// The constant `n`, always present at index 1.
    pub const CONST_N: ExprId = ExprId(1);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    NotEq,
    Less,
    LessEq,
    Greater,
    GreaterEq,
}

impl CmpOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CmpOp::Eq => "=",
            CmpOp::NotEq => "!=",
            CmpOp::Less => "<",
            CmpOp::LessEq => "<=",
            CmpOp::Greater => ">",
            CmpOp::GreaterEq => ">=",
        }
    }
}

/// Constant leaf of a linked expression.
#[derive(Debug, Clone, PartialEq)]
pub enum ConstValue {
    Tristate(Tristate),
    Int(i64),
    Hex(i64),
    Str(String),
    Float(f64),
}

/// One node of a linked expression.  Children are arena ids, so evaluation
/// can walk the tree while the arena owner is mutably borrowed elsewhere.
#[derive(Debug, Clone)]
pub enum ExprNode {
    Const(ConstValue),
    Symbol(SymbolId),
    Not(ExprId),
    And(ExprId, ExprId),
    Or(ExprId, ExprId),
    Cmp(CmpOp, ExprId, ExprId),
}

/// Flat arena of expression nodes, shared by every symbol and menu node.
#[derive(Debug, Clone)]
pub struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self {
            nodes: vec![
                ExprNode::Const(ConstValue::Tristate(Tristate::Y)),
                ExprNode::Const(ConstValue::Tristate(Tristate::N)),
            ],
        }
    }

    pub fn push(&mut self, node: ExprNode) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: ExprId) -> &ExprNode {
        &self.nodes[id.0 as usize]
    }

    /// `a && b`, folding the constant cases away.
    pub fn and(&mut self, a: ExprId, b: ExprId) -> ExprId {
        if a == ExprId::CONST_Y {
            return b;
        }
        if b == ExprId::CONST_Y {
            return a;
        }
        if a == ExprId::CONST_N || b == ExprId::CONST_N {
            return ExprId::CONST_N;
        }
        self.push(ExprNode::And(a, b))
    }

    /// Collect every symbol referenced under `id`.
    pub fn collect_symbols(&self, id: ExprId, out: &mut Vec<SymbolId>) {
        match self.get(id) {
            ExprNode::Const(_) => {}
            ExprNode::Symbol(s) => out.push(*s),
            ExprNode::Not(e) => self.collect_symbols(*e, out),
            ExprNode::And(a, b) | ExprNode::Or(a, b) | ExprNode::Cmp(_, a, b) => {
                let (a, b) = (*a, *b);
                self.collect_symbols(a, out);
                self.collect_symbols(b, out);
            }
        }
    }
}

impl Default for ExprArena {
    fn default() -> Self {
        Self::new()
    }
}
