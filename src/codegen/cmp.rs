//! Table-driven comparison lowering. Each comparison is classified by
//! family, by what is known about its right operand, and by whether its
//! value feeds a conditional branch or is materialized as 0 or 1. The
//! table maps each classification to a short program of emission steps.

use lazy_static::lazy_static;

use super::Lowerer;
use crate::ir::{Op, Tok};
use crate::target::{AluOp, BranchOp, Instr, Operand, Reg};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Family {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

/// Splits a comparison operator into a family and a signedness.
pub(super) fn classify(op: Op) -> Option<(Family, bool)> {
    Some(match op {
        Op::Lt => (Family::Lt, false),
        Op::Le => (Family::Le, false),
        Op::Gt => (Family::Gt, false),
        Op::Ge => (Family::Ge, false),
        Op::ULt => (Family::Lt, true),
        Op::ULe => (Family::Le, true),
        Op::UGt => (Family::Gt, true),
        Op::UGe => (Family::Ge, true),
        Op::Eq => (Family::Eq, false),
        Op::Ne => (Family::Ne, false),
        _ => return None,
    })
}

/// What is known about the comparison's right operand.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Rhs {
    Zero,
    Const,
    Runtime,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Step {
    /// Flip the branch polarity for the remaining steps.
    Invert,
    /// Bump the constant so a strict compare can use greater-or-equal.
    AddOne,

    XorPair,
    XorOne,
    XorConst,

    BranchPair,
    BranchZero,
    BranchLtZero,
    BranchGtZero,

    SetLess,
    SetGreater,
    SetLtZero,
    SetLtOne,
    SetLtConst,
    SetGtZero,
    SetNonZero,
    SetZero,
}

use Step::*;

lazy_static! {
    /// Indexed by family, then value/branch context, then right operand
    /// kind (zero, other constant, runtime).
    static ref STEPS: [[[Vec<Step>; 3]; 2]; 6] = [
        // less than
        [
            [vec![SetLtZero], vec![SetLtConst], vec![SetLess]],
            [
                vec![BranchLtZero],
                vec![SetLtConst, Invert, BranchZero],
                vec![SetLess, Invert, BranchZero],
            ],
        ],
        // less or equal
        [
            [vec![SetLtOne], vec![AddOne, SetLtConst], vec![SetGreater, XorOne]],
            [
                vec![Invert, BranchGtZero],
                vec![AddOne, SetLtConst, Invert, BranchZero],
                vec![SetGreater, BranchZero],
            ],
        ],
        // greater than
        [
            [vec![SetGtZero], vec![AddOne, SetLtConst, XorOne], vec![SetGreater]],
            [
                vec![BranchGtZero],
                vec![AddOne, SetLtConst, BranchZero],
                vec![SetGreater, Invert, BranchZero],
            ],
        ],
        // greater or equal
        [
            [vec![SetLtZero, XorOne], vec![SetLtConst, XorOne], vec![SetLess, XorOne]],
            [
                vec![Invert, BranchLtZero],
                vec![SetLtConst, BranchZero],
                vec![SetLess, BranchZero],
            ],
        ],
        // equal
        [
            [vec![SetZero], vec![XorConst, SetZero], vec![XorPair, SetZero]],
            [vec![BranchZero], vec![XorConst, BranchZero], vec![BranchPair]],
        ],
        // not equal
        [
            [vec![SetNonZero], vec![XorConst, SetNonZero], vec![XorPair, SetNonZero]],
            [
                vec![Invert, BranchZero],
                vec![XorConst, Invert, BranchZero],
                vec![Invert, BranchPair],
            ],
        ],
    ];
}

impl Lowerer<'_> {
    /// Lowers the comparison at `toks[i]`, consuming a following branch
    /// token when there is one. Returns the index of the last token used.
    pub(super) fn cmp(&mut self, toks: &[Tok], i: usize, mut family: Family, unsigned: bool) -> usize {
        let (mut rhs, mut constant) = match toks[i - 1] {
            Tok::Int(0) => (Rhs::Zero, 0),
            Tok::Int(v) => (Rhs::Const, v),
            _ => (Rhs::Runtime, 0),
        };

        // branch context and initial polarity, from the token after
        let branch = match toks.get(i + 1) {
            Some(Tok::If(label)) => Some((*label, true)),
            Some(Tok::IfNot(label)) => Some((*label, false)),
            _ => None,
        };

        if rhs == Rhs::Runtime {
            self.pop_operand();
        }

        // unsigned orderings against zero degenerate: nothing is below
        // zero, so only the "greater" family keeps a real test
        if branch.is_some() && unsigned && rhs == Rhs::Zero {
            match family {
                Family::Lt | Family::Le | Family::Ge => rhs = Rhs::Const,
                Family::Gt => family = Family::Ne,
                _ => {}
            }
        }

        let context = usize::from(branch.is_some());
        let steps = &STEPS[family as usize][context][rhs as usize];

        let (label, mut when_true) = match branch {
            Some((label, polarity)) => (label, polarity),
            None => (0, true),
        };

        for step in steps {
            self.step(*step, unsigned, &mut constant, &mut when_true, label);
        }

        match branch {
            Some(_) => i + 1,
            None => i,
        }
    }

    fn step(&mut self, step: Step, unsigned: bool, constant: &mut i32, when_true: &mut bool, label: u32) {
        let bge = if unsigned { BranchOp::Bgeu } else { BranchOp::Bge };
        let w = self.wreg;

        match step {
            Invert => *when_true = !*when_true,
            // wraps so an unsigned constant at the signed maximum bumps to
            // the bit pattern 0x80000000
            AddOne => *constant = constant.wrapping_add(1),

            XorPair => self.alu(AluOp::Xor, self.lreg, Operand::Reg(self.rreg), w),
            XorOne => self.alu(AluOp::Xor, w, Operand::Imm(1), w),
            XorConst => self.alu(AluOp::Xor, w, Operand::Imm(*constant), w),

            BranchPair => {
                let op = if *when_true { BranchOp::Bne } else { BranchOp::Beq };
                self.out
                    .instr(Instr::Branch(op, self.lreg, Operand::Reg(self.rreg), 2));
                self.jump(label);
            }
            BranchZero => {
                let op = if *when_true { BranchOp::Bne } else { BranchOp::Beq };
                self.out
                    .instr(Instr::Branch(op, w, Operand::Reg(Reg::Zero), 2));
                self.jump(label);
            }
            BranchLtZero => {
                let instr = if *when_true {
                    Instr::Branch(BranchOp::Bge, w, Operand::Reg(Reg::Zero), 2)
                } else {
                    Instr::Branch(BranchOp::Bgt, Reg::Zero, Operand::Reg(w), 2)
                };
                self.out.instr(instr);
                self.jump(label);
            }
            BranchGtZero => {
                let instr = if *when_true {
                    Instr::Branch(BranchOp::Bge, Reg::Zero, Operand::Reg(w), 2)
                } else {
                    Instr::Branch(BranchOp::Bgt, w, Operand::Reg(Reg::Zero), 2)
                };
                self.out.instr(instr);
                self.jump(label);
            }

            SetLess => self.set_bool(bge, self.lreg, Operand::Reg(self.rreg)),
            SetGreater => self.set_bool(bge, self.rreg, Operand::Reg(self.lreg)),
            SetLtZero => self.set_bool(bge, w, Operand::Reg(Reg::Zero)),
            SetLtOne => {
                self.out.instr(Instr::Ldi(1, Reg::ScratchA));
                self.set_bool(bge, w, Operand::Reg(Reg::ScratchA));
            }
            SetLtConst => {
                self.out.instr(Instr::Ldi(*constant, Reg::ScratchA));
                self.set_bool(bge, w, Operand::Reg(Reg::ScratchA));
            }
            SetGtZero => self.set_bool(bge, Reg::Zero, Operand::Reg(w)),
            SetNonZero => self.set_bool(BranchOp::Bgeu, Reg::Zero, Operand::Reg(w)),
            SetZero => self.set_bool(BranchOp::Bgeu, w, Operand::Imm(1)),
        }
    }

    /// The skip-branch idiom for materializing a truth value: 1 unless the
    /// branch condition holds, else 0.
    fn set_bool(&mut self, op: BranchOp, a: Reg, b: Operand) {
        self.out.instr(Instr::Branch(op, a, b, 3));
        self.out.instr(Instr::Ldi(1, self.wreg));
        self.out.instr(Instr::Rjmp(2));
        self.out.instr(Instr::Ldi(0, self.wreg));
    }
}
