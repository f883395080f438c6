//! Expression builder
//!
//! Drives a decoded instruction stream through a two-register state machine
//! and records every produced value in an [`ExprArena`].
//!
//! Registers
//! - `arg0` / `arg1` hold the two most recent operands, each one of
//!   {EMPTY, NUM, VAR, EXP}.
//! - A third operand spills `arg0` onto the [`OperandStacks`]; the spilled
//!   operand comes back (flipped, as the left operand) when a binary operator
//!   finds `arg1` empty.
//!
//! Every operator step leaves its result in `arg0` and clears `arg1`. At the
//! end of the stream exactly one value must remain, and since each operator
//! step creates its node last, that value is the last node of the arena.
//!
//! Example
//! ```
//! use nlinstr::builder::{compile, BuildOptions};
//!
//! // x0 + 3
//! let expr = compile(&[1.0, 0.0, 0.0, 3.0, 5.0], &BuildOptions::default()).unwrap();
//! assert_eq!(expr.evaluate(&[2.0]).unwrap(), 5.0);
//! ```
use log::{debug, trace};

use crate::{
    expr::{ExprArena, ExprNode, Expression, NodeId, VarSlot, VarTable},
    opcode::{BinaryOp, Opcode, OpcodeClass, UnaryOp},
    stack::{ArgKind, Operand, OperandStacks},
    stream::{DecodedStream, Instruction, InstructionKind, decode},
    utils::Error,
};

/// Historical capacity of each pending-operand stack.
pub const DEFAULT_MAX_DEPTH: usize = 512;

/// Default magnitude below which a constant coefficient counts as zero.
pub const DEFAULT_ZERO_TOLERANCE: f64 = 1e-6;

/// Knobs for one compile call.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// Capacity of each pending-operand stack.
    pub max_depth: usize,
    /// Constant multipliers with a magnitude at or below this value drop their
    /// term.
    pub zero_tolerance: f64,
    /// Number of decision variables in the problem, when known. Variable
    /// indices at or past it are rejected.
    pub variable_count: Option<usize>,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            zero_tolerance: DEFAULT_ZERO_TOLERANCE,
            variable_count: None,
        }
    }
}

/// Decode and build `tokens` in one go.
pub fn compile(tokens: &[f64], options: &BuildOptions) -> Result<Expression, Error> {
    let stream = decode(tokens)?;
    ExprBuilder::new(&stream, options).build()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the next instruction.
    Read,
    /// The stream is exhausted.
    Exit,
}

/// Operand resolved to something an operator can consume.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Arg {
    Const(f64),
    Node(NodeId),
}

pub struct ExprBuilder<'a> {
    stream: &'a DecodedStream,
    options: &'a BuildOptions,
    arena: ExprArena,
    variables: VarTable,
    args: [Operand; 2],
    pending: OperandStacks,
    next_var: VarSlot,
    state: State,
}

impl<'a> ExprBuilder<'a> {
    pub fn new(stream: &'a DecodedStream, options: &'a BuildOptions) -> Self {
        Self {
            stream,
            options,
            arena: ExprArena::with_capacity(stream.node_capacity()),
            variables: VarTable::with_capacity(stream.variable_count()),
            args: [Operand::Empty; 2],
            pending: OperandStacks::with_limit(options.max_depth),
            next_var: 0,
            state: State::Read,
        }
    }

    /// Run the state machine over the whole stream and return the expression.
    pub fn build(mut self) -> Result<Expression, Error> {
        self.check_variables()?;

        let stream = self.stream;

        // One leaf per variable occurrence; leaf `i` is slot `i`.
        for &index in &stream.variables {
            let slot = self.variables.push(index);
            self.arena.alloc(ExprNode::Variable { slot, index });
        }

        if let Some(root) = self.short_circuit() {
            debug!("Degenerate single-operand stream, skipping expression tree building");
            return self.seal(root);
        }

        for instruction in &stream.instructions {
            self.step(instruction)?;
            self.trace_state(instruction);
        }
        self.state = State::Exit;

        let registers = self.args;
        match registers {
            [Operand::Expr(root), Operand::Empty] if self.pending.is_empty() => self.seal(root),
            _ => Err(Error::MalformedExpression {
                position: stream.token_count,
                operator: "end of stream",
                detail: "the stream leaves operands that no operator consumes",
            }),
        }
    }

    fn check_variables(&self) -> Result<(), Error> {
        let Some(count) = self.options.variable_count else {
            return Ok(());
        };

        for instruction in &self.stream.instructions {
            if let InstructionKind::Var(index) = instruction.kind {
                if index >= count {
                    return Err(Error::UnknownVariable {
                        position: instruction.position,
                        index,
                        count,
                    });
                }
            }
        }
        Ok(())
    }

    /// `[NUM, c]` is a single constant and `[VAR, i]` a one-term sum.
    fn short_circuit(&mut self) -> Option<NodeId> {
        let [instruction] = self.stream.instructions.as_slice() else {
            return None;
        };

        match instruction.kind {
            InstructionKind::Num(value) => Some(self.arena.alloc(ExprNode::Constant(value))),
            InstructionKind::Var(_) => {
                let leaf = self.leaf(0);
                Some(self.arena.alloc(ExprNode::Sum {
                    terms: vec![(leaf, 1.0)],
                    constant: 0.0,
                }))
            }
            InstructionKind::Op(_) => None,
        }
    }

    fn seal(self, root: NodeId) -> Result<Expression, Error> {
        debug_assert_eq!(root.index() + 1, self.arena.len(), "root must be the last node");
        debug_assert!(self.pending.is_consistent());

        self.arena
            .finish(self.variables)
            .ok_or(Error::MalformedExpression {
                position: self.stream.token_count,
                operator: "end of stream",
                detail: "no expression was produced",
            })
    }

    fn step(&mut self, instruction: &Instruction) -> Result<(), Error> {
        let position = instruction.position;
        match instruction.kind {
            InstructionKind::Num(value) => self.push_operand(Operand::Num(value), position, Opcode::Num),
            InstructionKind::Var(_) => {
                let slot = self.next_var;
                self.next_var += 1;
                self.push_operand(Operand::Var(slot), position, Opcode::Var)
            }
            InstructionKind::Op(opcode) => match opcode.class() {
                OpcodeClass::Binary(op) => self.apply_binary(op, opcode, position),
                OpcodeClass::Unary(op) => self.apply_unary(op, opcode, position),
                OpcodeClass::Unsupported => {
                    Err(Error::UnsupportedOperator { position, opcode })
                }
                OpcodeClass::Operand => Err(Error::MalformedExpression {
                    position,
                    operator: opcode.to_str(),
                    detail: "operand opcode without its argument",
                }),
            },
        }
    }

    /// Place a new operand, spilling `arg0` when both registers are taken.
    fn push_operand(&mut self, operand: Operand, position: usize, opcode: Opcode) -> Result<(), Error> {
        match self.args {
            [Operand::Empty, _] => self.args[0] = operand,
            [_, Operand::Empty] => self.args[1] = operand,
            [displaced, current] => {
                self.defer(displaced, position, opcode)?;
                self.args = [current, operand];
            }
        }
        Ok(())
    }

    fn defer(&mut self, operand: Operand, position: usize, opcode: Opcode) -> Result<(), Error> {
        match operand {
            Operand::Var(slot) => self.pending.push_var(slot, position, opcode),
            Operand::Expr(node) => self.pending.push_expr(node, position, opcode),
            Operand::Num(value) => {
                let node = self.constant(value);
                self.pending.push_expr(node, position, opcode)
            }
            Operand::Empty => Ok(()),
        }
    }

    fn apply_binary(&mut self, op: BinaryOp, opcode: Opcode, position: usize) -> Result<(), Error> {
        let mut flipped = false;
        if self.args[1].is_empty() {
            if let Some(deferred) = self.pending.pop_latest(position, opcode)? {
                trace!("Processing waiting {:?} operand for `{}`", deferred.operand.kind(), opcode);
                self.args[1] = deferred.operand;
                flipped = deferred.flipped;
            }
        }

        let [first, second] = self.args;
        let (Some(a), Some(b)) = (self.resolve(first), self.resolve(second)) else {
            return Err(Error::MalformedExpression {
                position,
                operator: opcode.to_str(),
                detail: "operator doesn't have two operands",
            });
        };
        let (lhs, rhs) = if flipped { (b, a) } else { (a, b) };
        trace!(
            "`{}` on {:?} x {:?}{}",
            opcode,
            first.kind(),
            second.kind(),
            if flipped { " (flipped)" } else { "" }
        );

        let node = self.combine(op, lhs, rhs, position)?;
        self.args = [Operand::Expr(node), Operand::Empty];
        Ok(())
    }

    fn apply_unary(&mut self, op: UnaryOp, opcode: Opcode, position: usize) -> Result<(), Error> {
        // The function applies to the newest operand; the older one waits.
        if let [older, newest @ (Operand::Num(_) | Operand::Var(_) | Operand::Expr(_))] = self.args {
            self.defer(older, position, opcode)?;
            self.args = [newest, Operand::Empty];
        }

        let child = match self.resolve(self.args[0]) {
            Some(Arg::Node(node)) => node,
            Some(Arg::Const(value)) => self.constant(value),
            None => {
                return Err(Error::MalformedExpression {
                    position,
                    operator: opcode.to_str(),
                    detail: "function doesn't have an operand",
                });
            }
        };

        let node = self.arena.alloc(ExprNode::Unary { op, child });
        self.args = [Operand::Expr(node), Operand::Empty];
        Ok(())
    }

    /// Create the node for `lhs op rhs`. The node is always created last.
    fn combine(&mut self, op: BinaryOp, lhs: Arg, rhs: Arg, position: usize) -> Result<NodeId, Error> {
        if op == BinaryOp::Pow && !matches!(rhs, Arg::Const(_)) {
            return Err(Error::InvalidPower { position });
        }

        let node = match (lhs, rhs) {
            (Arg::Const(a), Arg::Const(b)) => return Ok(self.fold(op, a, b)),

            (Arg::Node(term), Arg::Const(c)) => match op {
                BinaryOp::Add => self.sum(vec![(term, 1.0)], c),
                BinaryOp::Sub => self.sum(vec![(term, 1.0)], -c),
                BinaryOp::Mul => return Ok(self.scaled(term, c)),
                BinaryOp::Div | BinaryOp::Pow => {
                    let constant = self.constant(c);
                    ExprNode::Binary {
                        op,
                        lhs: term,
                        rhs: constant,
                    }
                }
            },

            (Arg::Const(c), Arg::Node(term)) => match op {
                BinaryOp::Add => self.sum(vec![(term, 1.0)], c),
                BinaryOp::Sub => self.sum(vec![(term, -1.0)], c),
                BinaryOp::Mul => return Ok(self.scaled(term, c)),
                BinaryOp::Div | BinaryOp::Pow => {
                    let constant = self.constant(c);
                    ExprNode::Binary {
                        op,
                        lhs: constant,
                        rhs: term,
                    }
                }
            },

            (Arg::Node(lhs), Arg::Node(rhs)) => match op {
                BinaryOp::Add => self.sum(vec![(lhs, 1.0), (rhs, 1.0)], 0.0),
                BinaryOp::Sub => self.sum(vec![(lhs, 1.0), (rhs, -1.0)], 0.0),
                BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => ExprNode::Binary { op, lhs, rhs },
            },
        };

        Ok(self.arena.alloc(node))
    }

    /// Constant-only operands fold, except a division by exactly zero which
    /// is kept so that evaluation reports it.
    fn fold(&mut self, op: BinaryOp, a: f64, b: f64) -> NodeId {
        let value = match op {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Div if b != 0.0 => a / b,
            BinaryOp::Div => {
                let lhs = self.constant(a);
                let rhs = self.constant(b);
                return self.arena.alloc(ExprNode::Binary { op, lhs, rhs });
            }
        };
        self.constant(value)
    }

    /// `c * term`, dropping the term when `c` is zero within tolerance.
    fn scaled(&mut self, term: NodeId, c: f64) -> NodeId {
        if c.abs() <= self.options.zero_tolerance {
            debug!("Dropping term {} with zero coefficient {}", term, c);
            return self.arena.alloc(ExprNode::Sum {
                terms: Vec::new(),
                constant: 0.0,
            });
        }
        self.arena.alloc(ExprNode::Sum {
            terms: vec![(term, c)],
            constant: 0.0,
        })
    }

    fn sum(&self, terms: Vec<(NodeId, f64)>, constant: f64) -> ExprNode {
        ExprNode::Sum { terms, constant }
    }

    fn constant(&mut self, value: f64) -> NodeId {
        self.arena.alloc(ExprNode::Constant(value))
    }

    fn leaf(&self, slot: VarSlot) -> NodeId {
        NodeId(slot as u32)
    }

    /// Expressions that folded down to a constant resolve as that constant.
    fn resolve(&self, operand: Operand) -> Option<Arg> {
        match operand {
            Operand::Empty => None,
            Operand::Num(value) => Some(Arg::Const(value)),
            Operand::Var(slot) => Some(Arg::Node(self.leaf(slot))),
            Operand::Expr(node) => match self.arena.get(node) {
                Some(&ExprNode::Constant(value)) => Some(Arg::Const(value)),
                _ => Some(Arg::Node(node)),
            },
        }
    }

    fn trace_state(&self, instruction: &Instruction) {
        trace!(
            "{:?} after {:?} @{}: arg0={:?} arg1={:?} pending(expr={}, var={}, order={}) vars={}",
            self.state,
            instruction.kind,
            instruction.position,
            self.args[0].kind(),
            self.args[1].kind(),
            self.pending.expr_depth(),
            self.pending.var_depth(),
            self.pending.depth(),
            self.next_var
        );
    }

    /// Kinds currently held by the two registers.
    pub fn registers(&self) -> [ArgKind; 2] {
        [self.args[0].kind(), self.args[1].kind()]
    }
}
