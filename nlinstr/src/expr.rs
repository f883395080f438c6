//! Compiled expression arena
//!
//! An [`Expression`] owns an append-only list of [`ExprNode`]s. Nodes are
//! addressed by [`NodeId`] (their creation order) and only ever reference
//! nodes created before them, so the arena is acyclic by construction and the
//! last node is the root.
//!
//! Variable leaves are not deduplicated: every `VAR` occurrence in the stream
//! owns a slot in the [`VarTable`] and its own leaf node, even when two slots
//! name the same decision variable.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs};

use crate::{
    opcode::{BinaryOp, UnaryOp},
    utils::ArenaFault,
};

/// Local occurrence slot of a variable inside one expression.
pub type VarSlot = usize;

/// Index of a node inside its expression arena.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeId(pub u32);

impl NodeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "%{}", self.0)
    }
}

/// One unit of a compiled expression.
#[derive(Debug, Clone, PartialEq, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(ExprNodeKind))]
#[strum_discriminants(derive(EnumIs))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExprNode {
    /// Literal value.
    Constant(f64),

    /// Reference to an external decision variable.
    Variable {
        /// Occurrence slot inside this expression.
        slot: VarSlot,
        /// 0-based index of the decision variable in the problem.
        index: usize,
    },

    /// Affine combination `constant + Σ coefficient · child`.
    ///
    /// Constant-coefficient additions, subtractions and scalings are kept in
    /// this form so the linear part stays visible to the consumer.
    Sum {
        terms: Vec<(NodeId, f64)>,
        constant: f64,
    },

    Unary {
        op: UnaryOp,
        child: NodeId,
    },

    Binary {
        op: BinaryOp,
        lhs: NodeId,
        rhs: NodeId,
    },
}

impl ExprNode {
    /// Children of this node, in operand order.
    pub fn children(&self) -> SmallVec<NodeId, 2> {
        match self {
            ExprNode::Constant(_) | ExprNode::Variable { .. } => SmallVec::new(),
            ExprNode::Sum { terms, .. } => terms.iter().map(|(child, _)| *child).collect(),
            ExprNode::Unary { child, .. } => std::iter::once(*child).collect(),
            ExprNode::Binary { lhs, rhs, .. } => [*lhs, *rhs].into_iter().collect(),
        }
    }

    pub fn kind(&self) -> ExprNodeKind {
        self.into()
    }

    /// Whether the node applies an operator (anything but a leaf).
    pub fn is_operator(&self) -> bool {
        !matches!(self, ExprNode::Constant(_) | ExprNode::Variable { .. })
    }
}

/// Mapping from local occurrence slot to external decision-variable index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VarTable {
    indices: Vec<usize>,
}

impl VarTable {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            indices: Vec::with_capacity(capacity),
        }
    }

    /// Register a new occurrence and return its slot.
    pub fn push(&mut self, index: usize) -> VarSlot {
        self.indices.push(index);
        self.indices.len() - 1
    }

    /// External index of an occurrence slot.
    pub fn index(&self, slot: VarSlot) -> Option<usize> {
        self.indices.get(slot).copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Iterate `(slot, index)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (VarSlot, usize)> + '_ {
        self.indices.iter().copied().enumerate()
    }

    /// Sorted, deduplicated decision-variable indices referenced by the table.
    pub fn distinct_indices(&self) -> Vec<usize> {
        let mut indices = self.indices.clone();
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

/// Append-only node storage used while an expression is being built.
#[derive(Debug, Default)]
pub(crate) struct ExprArena {
    nodes: Vec<ExprNode>,
}

impl ExprArena {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Append a node; children must already live in the arena.
    pub(crate) fn alloc(&mut self, node: ExprNode) -> NodeId {
        debug_assert!(
            node.children().iter().all(|child| child.index() < self.nodes.len()),
            "node {:?} references a node that was not created yet",
            node
        );
        self.nodes.push(node);
        NodeId((self.nodes.len() - 1) as u32)
    }

    pub(crate) fn get(&self, id: NodeId) -> Option<&ExprNode> {
        self.nodes.get(id.index())
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Seal the arena into an [`Expression`] rooted at the last created node.
    pub(crate) fn finish(self, variables: VarTable) -> Option<Expression> {
        let root = NodeId(self.nodes.len().checked_sub(1)? as u32);
        Some(Expression {
            root,
            variables,
            nodes: self.nodes,
        })
    }
}

/// A compiled expression: the node arena, its variable table and the root.
///
/// Deserialization goes through [`Expression::from_parts`], so a decoded
/// expression satisfies the same arena invariants as a compiled one.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "RawExpression"))]
pub struct Expression {
    root: NodeId,
    variables: VarTable,
    nodes: Vec<ExprNode>,
}

/// Unchecked wire form of an [`Expression`].
#[cfg(feature = "serde")]
#[derive(Deserialize)]
struct RawExpression {
    root: NodeId,
    variables: VarTable,
    nodes: Vec<ExprNode>,
}

#[cfg(feature = "serde")]
impl TryFrom<RawExpression> for Expression {
    type Error = ArenaFault;

    fn try_from(raw: RawExpression) -> Result<Self, ArenaFault> {
        Expression::from_parts(raw.nodes, raw.variables, raw.root)
    }
}

impl Expression {
    /// Assemble an expression from its parts, checking that the root is the
    /// last node, that every node only references earlier nodes and that
    /// variable leaves use slots of `variables`.
    pub fn from_parts(nodes: Vec<ExprNode>, variables: VarTable, root: NodeId) -> Result<Self, ArenaFault> {
        if nodes.is_empty() {
            return Err(ArenaFault::Empty);
        }
        if root.index() + 1 != nodes.len() {
            return Err(ArenaFault::MisplacedRoot {
                root,
                len: nodes.len(),
            });
        }

        for (index, node) in nodes.iter().enumerate() {
            let id = NodeId(index as u32);
            if let Some(child) = node.children().into_iter().find(|child| child.index() >= index) {
                return Err(ArenaFault::ForwardReference { node: id, child });
            }
            if let ExprNode::Variable { slot, .. } = node {
                if *slot >= variables.len() {
                    return Err(ArenaFault::UnknownSlot {
                        node: id,
                        slot: *slot,
                        len: variables.len(),
                    });
                }
            }
        }

        Ok(Self {
            root,
            variables,
            nodes,
        })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn root_node(&self) -> &ExprNode {
        &self.nodes[self.root.index()]
    }

    pub fn node(&self, id: NodeId) -> Option<&ExprNode> {
        self.nodes.get(id.index())
    }

    /// All nodes in creation order.
    pub fn nodes(&self) -> &[ExprNode] {
        &self.nodes
    }

    pub fn variables(&self) -> &VarTable {
        &self.variables
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of operator nodes (sums, unary and binary applications).
    pub fn operator_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_operator()).count()
    }

    /// Whether the expression references no decision variable at all.
    pub fn is_constant(&self) -> bool {
        self.variables.is_empty()
    }
}
