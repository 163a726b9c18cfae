//! Operand-complexity scoring and evaluation-order selection
//! (`SPEC_FULL.md` §4.2).

use crate::ir::node::{Node, Op, Ullman};
use crate::ir::{NodeRef, Procedure};

/// Compute the Ullman number of `node`, given its children have already
/// been scored. A leaf costs zero registers; a node that may call costs
/// the sentinel `Ullman::Call`; otherwise a binary node costs
/// `max(left, right)` registers if the two differ, or `left + 1` if they
/// tie (the classic Sethi-Ullman rule: a tie forces holding one side in a
/// register while the other is evaluated).
pub fn ullman(proc: &Procedure, node: &Node) -> Ullman {
    if matches!(node.op, Op::Call | Op::DeferCall | Op::AsyncCall | Op::InterfaceCall) {
        return Ullman::Call;
    }
    let left = node.left.map(|r| score(proc, r));
    let right = node.right.map(|r| score(proc, r));
    match (left, right) {
        (None, None) => Ullman::Registers(0),
        (Some(l), None) | (None, Some(l)) => l,
        (Some(l), Some(r)) => {
            if l.may_call() || r.may_call() {
                Ullman::Call
            } else {
                let (ln, rn) = (l.rank(), r.rank());
                let reg = if ln == rn { ln + 1 } else { ln.max(rn) };
                Ullman::Registers(reg.min(u16::from(u8::MAX)) as u8)
            }
        }
    }
}

fn score(proc: &Procedure, r: NodeRef) -> Ullman {
    proc.node(r).ullman
}

/// How to evaluate a binary node's two operands.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Order {
    /// Evaluate `left` first, hold its result in a register, then
    /// evaluate `right`.
    LeftFirst,
    /// Evaluate `right` first, hold its result in a register, then
    /// evaluate `left`.
    RightFirst,
    /// Both operands may call; evaluate `left` into a stack temporary
    /// before evaluating `right`, the only case that forces a temporary.
    ForceLeftTemp,
}

/// Decide the evaluation order for a binary node's two children, given
/// their already-computed Ullman numbers (`SPEC_FULL.md` §4.2).
pub fn order_binary(left: Ullman, right: Ullman) -> Order {
    if left.may_call() && right.may_call() {
        Order::ForceLeftTemp
    } else if right.rank() > left.rank() {
        Order::RightFirst
    } else {
        Order::LeftFirst
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_may_call_forces_a_temporary() {
        assert_eq!(order_binary(Ullman::Call, Ullman::Call), Order::ForceLeftTemp);
    }

    #[test]
    fn larger_subtree_goes_first() {
        assert_eq!(order_binary(Ullman::Registers(1), Ullman::Registers(3)), Order::RightFirst);
        assert_eq!(order_binary(Ullman::Registers(3), Ullman::Registers(1)), Order::LeftFirst);
    }

    #[test]
    fn a_tie_evaluates_left_first() {
        assert_eq!(order_binary(Ullman::Registers(2), Ullman::Registers(2)), Order::LeftFirst);
    }

    #[test]
    fn a_single_calling_side_is_still_evaluated_first() {
        // The call outranks any finite register count, so the ordinary
        // larger-score-first rule still applies even though only one side
        // can call.
        assert_eq!(order_binary(Ullman::Registers(2), Ullman::Call), Order::RightFirst);
        assert_eq!(order_binary(Ullman::Call, Ullman::Registers(2)), Order::LeftFirst);
    }
}
