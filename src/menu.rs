use crate::expr::ExprId;
use crate::symbol::{ChoiceId, SymbolId};

/// Stable index of a node in the menu tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// What a menu node wraps.  All traversal is a match on this tag.
#[derive(Debug, Clone)]
pub enum MenuItem {
    /// The root or a plain `menu "title"` block.
    Menu {
        title: String,
        visible_if: ExprId,
    },
    /// A `config` / `menuconfig` wrapper.
    Symbol(SymbolId),
    /// A `choice` wrapper.
    Choice(ChoiceId),
    /// A standalone `comment "text"`.
    Comment {
        text: String,
        dep: ExprId,
    },
    /// An `if` block: transparent, only propagates its condition.
    If(ExprId),
}

#[derive(Debug, Clone)]
pub struct MenuNode {
    pub item: MenuItem,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl MenuNode {
    pub fn new(item: MenuItem, parent: Option<NodeId>) -> Self {
        Self {
            item,
            parent,
            children: Vec::new(),
        }
    }
}
