//! Infix rendering of compiled expressions.
//!
//! Printing walks the tree with an explicit stack of pieces, so a deeply
//! nested expression prints without recursing.
use std::fmt::{Display, Formatter, Result};

use smallvec::SmallVec;

use crate::expr::{ExprNode, Expression, NodeId};

/// Pending output, popped in printing order.
enum Piece {
    Node(NodeId),
    Text(&'static str),
    /// Sign and multiplier written before a sum term.
    Term { coefficient: f64, first: bool },
    /// Constant offset closing a sum.
    Offset(f64),
    /// Operator symbol between the operands of a binary node.
    Symbol(&'static str),
}

impl Expression {
    fn write_term(f: &mut Formatter<'_>, coefficient: f64, first: bool) -> Result {
        let magnitude = coefficient.abs();
        match (first, coefficient < 0.0) {
            (true, false) => {}
            (true, true) => write!(f, "-")?,
            (false, false) => write!(f, " + ")?,
            (false, true) => write!(f, " - ")?,
        }
        if magnitude != 1.0 {
            write!(f, "{} * ", magnitude)?;
        }
        Ok(())
    }

    /// Queue the pieces of `id` so that popping them prints the node.
    fn expand(&self, id: NodeId, f: &mut Formatter<'_>, pieces: &mut SmallVec<Piece, 32>) -> Result {
        let Some(node) = self.node(id) else {
            return write!(f, "{}", id);
        };

        match node {
            ExprNode::Constant(value) => write!(f, "{}", value),
            ExprNode::Variable { index, .. } => write!(f, "x[{}]", index),
            ExprNode::Sum { terms, constant } if terms.is_empty() => write!(f, "{}", constant),
            ExprNode::Sum { terms, constant } => {
                pieces.push(Piece::Text(")"));
                pieces.push(Piece::Offset(*constant));
                for (i, &(child, coefficient)) in terms.iter().enumerate().rev() {
                    pieces.push(Piece::Node(child));
                    pieces.push(Piece::Term {
                        coefficient,
                        first: i == 0,
                    });
                }
                write!(f, "(")
            }
            ExprNode::Unary { op, child } => {
                pieces.push(Piece::Text(")"));
                pieces.push(Piece::Node(*child));
                write!(f, "{}(", op.name())
            }
            ExprNode::Binary { op, lhs, rhs } => {
                pieces.push(Piece::Text(")"));
                pieces.push(Piece::Node(*rhs));
                pieces.push(Piece::Symbol(op.symbol()));
                pieces.push(Piece::Node(*lhs));
                write!(f, "(")
            }
        }
    }
}

impl Display for Expression {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let mut pieces: SmallVec<Piece, 32> = SmallVec::new();
        pieces.push(Piece::Node(self.root()));

        while let Some(piece) = pieces.pop() {
            match piece {
                Piece::Node(id) => self.expand(id, f, &mut pieces)?,
                Piece::Text(text) => write!(f, "{}", text)?,
                Piece::Term { coefficient, first } => Self::write_term(f, coefficient, first)?,
                Piece::Offset(constant) if constant > 0.0 => write!(f, " + {}", constant)?,
                Piece::Offset(constant) if constant < 0.0 => write!(f, " - {}", -constant)?,
                Piece::Offset(_) => {}
                Piece::Symbol(symbol) => write!(f, " {} ", symbol)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::{BuildOptions, compile};

    fn render(tokens: &[f64]) -> String {
        compile(tokens, &BuildOptions::default()).unwrap().to_string()
    }

    #[test]
    fn renders_infix() {
        assert_eq!(render(&[0.0, 3.0]), "3");
        assert_eq!(render(&[1.0, 0.0]), "(x[0])");
        assert_eq!(render(&[1.0, 0.0, 0.0, 3.0, 5.0]), "(x[0] + 3)");
        assert_eq!(render(&[0.0, 3.0, 1.0, 1.0, 6.0]), "(-x[1] + 3)");
        assert_eq!(render(&[1.0, 0.0, 0.0, 2.5, 3.0]), "(2.5 * x[0])");
        assert_eq!(render(&[1.0, 0.0, 8.0]), "sqrt(x[0])");
        assert_eq!(render(&[1.0, 0.0, 1.0, 1.0, 4.0]), "(x[0] / x[1])");
        assert_eq!(render(&[1.0, 0.0, 1.0, 1.0, 6.0]), "(x[0] - x[1])");
    }

    #[test]
    fn renders_nested_operands_in_order() {
        // log(x0 + -2 * x1) / (x2^2 - 4)
        let tokens = [
            1.0, 0.0, 1.0, 1.0, 0.0, -2.0, 3.0, 5.0, 11.0, 1.0, 2.0, 0.0, 2.0, 9.0, 0.0, 4.0, 6.0, 4.0,
        ];
        assert_eq!(render(&tokens), "(log((x[0] + (-2 * x[1]))) / ((x[2] ^ 2) - 4))");
    }

    #[test]
    fn deep_chains_print_without_recursion() {
        const LINKS: usize = 200_000;
        let mut tokens = vec![1.0, 0.0];
        for _ in 0..LINKS {
            tokens.extend([1.0, 0.0, 5.0]);
        }
        let expr = compile(&tokens, &BuildOptions::default()).unwrap();
        assert_eq!(expr.evaluate(&[1.0]).unwrap(), (LINKS + 1) as f64);

        let text = expr.to_string();
        assert_eq!(text.len(), 4 * (LINKS + 1) + 5 * LINKS);
        assert!(text.starts_with(&"(".repeat(LINKS)));
        assert!(text.ends_with("x[0] + x[0])"));
    }
}
