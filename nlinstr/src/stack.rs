//! Deferred-operand bookkeeping
//!
//! The builder keeps at most two operands in its argument registers. When a
//! third operand arrives, the older register is spilled here: sub-expressions
//! go to the pending-expression stack, variable occurrences to the
//! pending-variable stack, and the order-of-arrival stack remembers which of
//! the two was pushed so the latest spill is always the one popped back.
use smallvec::SmallVec;
use strum::{EnumDiscriminants, EnumIs};

use crate::{
    expr::{NodeId, VarSlot},
    opcode::Opcode,
    utils::Error,
};

/// Content of an argument register.
#[derive(Debug, Clone, Copy, PartialEq, Default, EnumIs, EnumDiscriminants)]
#[strum_discriminants(name(ArgKind))]
#[strum_discriminants(derive(EnumIs))]
pub enum Operand {
    #[default]
    Empty,
    Num(f64),
    Var(VarSlot),
    Expr(NodeId),
}

impl Operand {
    pub fn kind(&self) -> ArgKind {
        self.into()
    }
}

/// Which pending stack an entry of the order-of-arrival stack refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs)]
pub enum PendingKind {
    Expr,
    Var,
}

impl std::fmt::Display for PendingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PendingKind::Expr => f.write_str("expression"),
            PendingKind::Var => f.write_str("variable"),
        }
    }
}

/// An operand popped back from the pending stacks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Deferred {
    pub operand: Operand,
    /// The operand was produced before the one currently in the first
    /// register, so it is the *left* operand of the next binary operator.
    pub flipped: bool,
}

/// Pending-expression and pending-variable stacks plus their arrival order.
#[derive(Debug, Clone)]
pub struct OperandStacks {
    exprs: SmallVec<NodeId, 16>,
    vars: SmallVec<VarSlot, 16>,
    order: SmallVec<PendingKind, 32>,
    limit: usize,
}

impl OperandStacks {
    /// Stacks holding at most `limit` pending expressions and `limit` pending
    /// variables.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            exprs: SmallVec::new(),
            vars: SmallVec::new(),
            order: SmallVec::new(),
            limit,
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Defer an expression; `opcode` is the instruction that displaced it.
    pub fn push_expr(&mut self, node: NodeId, position: usize, opcode: Opcode) -> Result<(), Error> {
        self.check_capacity(PendingKind::Expr, position, opcode)?;
        self.exprs.push(node);
        self.order.push(PendingKind::Expr);
        Ok(())
    }

    pub fn push_var(&mut self, slot: VarSlot, position: usize, opcode: Opcode) -> Result<(), Error> {
        self.check_capacity(PendingKind::Var, position, opcode)?;
        self.vars.push(slot);
        self.order.push(PendingKind::Var);
        Ok(())
    }

    fn check_capacity(&self, stack: PendingKind, position: usize, opcode: Opcode) -> Result<(), Error> {
        let len = match stack {
            PendingKind::Expr => self.exprs.len(),
            PendingKind::Var => self.vars.len(),
        };
        if len >= self.limit || self.order.len() >= 2 * self.limit {
            return Err(Error::DepthExceeded {
                position,
                opcode,
                stack,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Pop whichever operand was deferred last.
    ///
    /// Returns `Ok(None)` when nothing is pending. An arrival record without a
    /// matching entry on its stack is reported as a malformed expression.
    pub fn pop_latest(&mut self, position: usize, opcode: Opcode) -> Result<Option<Deferred>, Error> {
        let Some(kind) = self.order.pop() else {
            return Ok(None);
        };

        let operand = match kind {
            PendingKind::Expr => self.exprs.pop().map(Operand::Expr),
            PendingKind::Var => self.vars.pop().map(Operand::Var),
        };

        match operand {
            Some(operand) => Ok(Some(Deferred {
                operand,
                flipped: true,
            })),
            None => Err(Error::MalformedExpression {
                position,
                operator: opcode.to_str(),
                detail: "the process list refers to a pending operand that does not exist",
            }),
        }
    }

    /// Total number of deferred operands.
    pub fn depth(&self) -> usize {
        self.order.len()
    }

    pub fn expr_depth(&self) -> usize {
        self.exprs.len()
    }

    pub fn var_depth(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The three stacks agree on how many operands are pending.
    pub fn is_consistent(&self) -> bool {
        self.order.len() == self.exprs.len() + self.vars.len()
    }
}
