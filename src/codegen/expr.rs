//! The expression walk. After the rewrite pass, one left-to-right sweep
//! over the postfix stream selects instructions directly: literals and
//! address leaves fuse into their consumer where the machine allows it,
//! everything else flows through the register cursor.

use super::{cmp, prep, Lowerer};
use crate::ir::{Op, Tok, Width};
use crate::target::{
    AluOp, BranchOp, Instr, JumpTarget, Operand, Reg, ARG_REGS, CALL_RETURN_SKIP, WORD,
};

/// Bytes of argument homing space every caller provides.
const HOME_BYTES: i32 = WORD * ARG_REGS as i32;

impl Lowerer<'_> {
    /// Lowers one postfix expression statement.
    pub(crate) fn expr(&mut self, toks: &mut Vec<Tok>) {
        if toks.is_empty() {
            return;
        }

        let mut top = toks.len() as isize - 1;
        if let Some(Tok::If(_) | Tok::IfNot(_) | Tok::Return) = toks.last() {
            top -= 1;
        }
        if top >= 0 {
            prep::prep(toks, &mut top, 0);
        }

        self.scan_calls(toks);
        self.parked = 0;

        assert_eq!(Reg::Acc, self.wreg, "cursor adrift at expression start");
        self.walk(toks);
        assert_eq!(Reg::Acc, self.wreg, "cursor adrift at expression end");
    }

    /// Finds the deepest call nesting, which decides whether arguments can
    /// be built directly in the argument registers and whether the operand
    /// pool is safe to use.
    fn scan_calls(&mut self, toks: &[Tok]) {
        let mut depth = 0usize;
        let mut deepest = 0usize;
        let mut direct = true;

        for (i, tok) in toks.iter().enumerate() {
            match tok {
                Tok::Open(_) => {
                    depth += 1;
                    deepest = deepest.max(depth);
                }
                Tok::Close(_) => {
                    if !matches!(toks[i - 1], Tok::Ident(_)) {
                        direct = false;
                    }
                    depth -= 1;
                }
                _ => {}
            }
        }

        // a computed callee needs the accumulator for the address, so such
        // calls take the stack-argument protocol of nested calls
        if deepest == 1 && !direct {
            deepest = 2;
        }

        self.call_depth = deepest;
        self.pool_ok = deepest == 0;
    }

    fn walk(&mut self, toks: &[Tok]) {
        // whether wreg holds a value the next leaf would clobber
        let mut got_value = false;
        let mut param_ofs: i32 = 0;

        let mut i = 0;
        while i < toks.len() {
            let tok = toks[i];
            if self.annotate {
                self.note(&tok);
            }

            match tok {
                Tok::Int(v) => {
                    let fused = matches!(
                        toks.get(i + 1),
                        Some(Tok::Op(op, _)) if fuses_const(*op)
                    );
                    if !fused {
                        if got_value {
                            self.push_operand();
                        }
                        self.out.instr(Instr::Ldi(v, self.wreg));
                    }
                    got_value = true;
                }

                Tok::Uint(_) => unreachable!("unsigned literals fold during rewrite"),
                Tok::Zero => got_value = true,

                Tok::Ident(name) => {
                    if got_value {
                        self.push_operand();
                    }
                    let fused = matches!(
                        toks.get(i + 1),
                        Some(Tok::Close(_))
                            | Some(Tok::Op(
                                Op::Deref | Op::Inc | Op::Dec | Op::PostInc | Op::PostDec,
                                _
                            ))
                    );
                    if !fused {
                        self.out.instr(Instr::Lea(name, self.wreg));
                    }
                    got_value = true;
                }

                Tok::LocalOfs(ofs) => {
                    self.note_local(ofs);
                    if got_value {
                        self.push_operand();
                    }
                    let fused = matches!(
                        toks.get(i + 1),
                        Some(Tok::Op(
                            Op::Deref | Op::Inc | Op::Dec | Op::PostInc | Op::PostDec,
                            _
                        ))
                    );
                    if !fused {
                        self.alu(AluOp::Add, Reg::Fp, Operand::Imm(ofs), self.wreg);
                    }
                    got_value = true;
                }

                // consumed by the assignment that peeks back at them
                Tok::RevIdent(_) | Tok::RevLocalOfs(_) => {}

                Tok::Open(bytes) => {
                    if got_value {
                        self.push_operand();
                    }
                    got_value = false;

                    if self.call_depth != 1 && bytes < HOME_BYTES {
                        self.grow_stack(HOME_BYTES - bytes);
                    }

                    param_ofs = bytes - WORD;
                    if self.call_depth == 1 && (0..HOME_BYTES).contains(&param_ofs) {
                        self.wreg = Reg::Arg((param_ofs / WORD) as u8);
                    }
                }

                Tok::Comma => {
                    if self.call_depth == 1 {
                        if param_ofs == HOME_BYTES {
                            // fifth argument leaves the accumulator for the
                            // stack; the rest descend through the registers
                            self.spill();
                            self.wreg = Reg::Arg(ARG_REGS as u8 - 1);
                            got_value = false;
                        } else if (0..HOME_BYTES).contains(&param_ofs) {
                            self.wreg = if param_ofs > 0 {
                                Reg::Arg((param_ofs / WORD - 1) as u8)
                            } else {
                                Reg::Acc
                            };
                            got_value = false;
                        }
                        param_ofs -= WORD;
                    } else {
                        self.spill();
                        got_value = false;
                    }
                }

                Tok::Close(bytes) => {
                    self.leaf = false;

                    if self.call_depth == 1 {
                        self.grow_stack(HOME_BYTES);
                    } else {
                        let reload = (bytes / WORD).min(ARG_REGS as i32);
                        for k in 0..reload {
                            self.out
                                .instr(Instr::Ldw(WORD * k, Reg::Sp, Reg::Arg(k as u8)));
                        }
                    }

                    self.out.instr(Instr::GetPc(Reg::Ra));
                    self.add_imm(Reg::Ra, CALL_RETURN_SKIP);
                    match toks[i - 1] {
                        Tok::Ident(name) => {
                            self.out.instr(Instr::Jump(JumpTarget::Label(name)))
                        }
                        _ => self.out.instr(Instr::Jr(0, self.wreg)),
                    }

                    self.shrink_stack(bytes.max(HOME_BYTES));
                    self.wreg = Reg::Acc;
                    got_value = true;
                }

                Tok::Op(op, width) => {
                    if let Some((family, unsigned)) = cmp::classify(op) {
                        i = self.cmp(toks, i, family, unsigned);
                    } else {
                        self.operator(toks, i, op, width);
                    }
                }

                Tok::If(label) => self.jump_if_not_zero(label),
                Tok::IfNot(label) => self.jump_if_zero(label),
                Tok::Goto(label) => self.jump(label),

                Tok::ShortCirc { or, label } => {
                    if or {
                        self.jump_if_not_zero(label)
                    } else {
                        self.jump_if_zero(label)
                    }
                    got_value = false;
                }
                Tok::CircTarget(label) => self.out.numbered(label),

                Tok::Return => {}
                Tok::Void => got_value = false,
            }

            i += 1;
        }
    }

    fn operator(&mut self, toks: &[Tok], i: usize, op: Op, width: Width) {
        match op {
            Op::Deref => match toks[i - 1] {
                Tok::Ident(name) => self.read_ident(self.wreg, name),
                Tok::LocalOfs(ofs) => self.read_local(self.wreg, ofs),
                _ => self.read_indirect(self.wreg, self.wreg),
            },

            Op::Plus => {}
            Op::Not => self.out.instr(Instr::Not(self.wreg, self.wreg)),
            Op::Neg => self.alu(AluOp::Sub, Reg::Zero, Operand::Reg(self.wreg), self.wreg),
            Op::Bool => {
                self.out.instr(Instr::Branch(
                    BranchOp::Bgtu,
                    self.wreg,
                    Operand::Reg(Reg::Zero),
                    3,
                ));
                self.out.instr(Instr::Ldi(0, self.wreg));
                self.out.instr(Instr::Rjmp(2));
                self.out.instr(Instr::Ldi(1, self.wreg));
            }

            Op::CastI8 => self.widen(self.wreg, Width::I8),
            Op::CastU8 => self.widen(self.wreg, Width::U8),
            Op::CastI16 => self.widen(self.wreg, Width::I16),
            Op::CastU16 => self.widen(self.wreg, Width::U16),

            Op::Add
            | Op::Sub
            | Op::And
            | Op::Xor
            | Op::Or
            | Op::Shl
            | Op::Shr
            | Op::UShr => {
                if let Tok::Int(v) = toks[i - 1] {
                    self.alu(alu_for(op), self.wreg, Operand::Imm(v), self.wreg);
                } else {
                    self.pop_operand();
                    self.alu(alu_for(op), self.lreg, Operand::Reg(self.rreg), self.wreg);
                }
            }

            Op::Mul | Op::Div | Op::UDiv | Op::Mod | Op::UMod => {
                self.pop_operand();
                self.alu(alu_for(op), self.lreg, Operand::Reg(self.rreg), self.wreg);
            }

            Op::Inc | Op::Dec | Op::PostInc | Op::PostDec => {
                let step = match op {
                    Op::Dec | Op::PostDec => -1,
                    _ => 1,
                };
                let post = matches!(op, Op::PostInc | Op::PostDec);
                match toks[i - 1] {
                    Tok::Ident(name) => {
                        self.read_ident(self.wreg, name);
                        self.add_imm(self.wreg, step);
                        self.write_ident(self.wreg, name);
                    }
                    Tok::LocalOfs(ofs) => {
                        self.read_local(self.wreg, ofs);
                        self.add_imm(self.wreg, step);
                        self.write_local(self.wreg, ofs);
                    }
                    _ => {
                        // the address register doubles as the value register,
                        // so the address moves to scratch first
                        self.copy(self.wreg, Reg::ScratchA);
                        self.read_indirect(self.wreg, Reg::ScratchA);
                        self.add_imm(self.wreg, step);
                        self.write_indirect(Reg::ScratchA, self.wreg);
                    }
                }
                if post {
                    self.add_imm(self.wreg, -step);
                }
                self.widen(self.wreg, width);
            }

            Op::PostAdd | Op::PostSub => {
                let instr = alu_for(op);
                self.pop_operand();
                if self.wreg == self.lreg {
                    self.copy(self.lreg, Reg::ScratchB);
                    self.read_indirect(self.wreg, Reg::ScratchB);
                    self.alu(instr, self.wreg, Operand::Reg(self.rreg), Reg::ScratchA);
                    self.write_indirect(Reg::ScratchB, Reg::ScratchA);
                } else {
                    self.copy(self.rreg, Reg::ScratchB);
                    self.read_indirect(self.wreg, self.lreg);
                    self.alu(instr, self.wreg, Operand::Reg(Reg::ScratchB), Reg::ScratchB);
                    self.write_indirect(self.lreg, Reg::ScratchB);
                }
                self.widen(self.wreg, width);
            }

            Op::Assign => {
                match toks[i - 1] {
                    Tok::RevIdent(name) => self.write_ident(self.wreg, name),
                    Tok::RevLocalOfs(ofs) => self.write_local(self.wreg, ofs),
                    _ => {
                        self.pop_operand();
                        self.write_indirect(self.lreg, self.rreg);
                        if self.wreg != self.rreg {
                            self.copy(self.rreg, self.wreg);
                        }
                    }
                }
                self.widen(self.wreg, width);
            }

            Op::AssignZero => match toks[i - 1] {
                Tok::RevIdent(name) => self.write_ident(Reg::Zero, name),
                Tok::RevLocalOfs(ofs) => self.write_local(Reg::Zero, ofs),
                _ => self.write_indirect(self.wreg, Reg::Zero),
            },

            Op::AssignAdd
            | Op::AssignSub
            | Op::AssignMul
            | Op::AssignDiv
            | Op::AssignUDiv
            | Op::AssignMod
            | Op::AssignUMod
            | Op::AssignShl
            | Op::AssignShr
            | Op::AssignUShr
            | Op::AssignAnd
            | Op::AssignXor
            | Op::AssignOr => {
                let instr = alu_for(op);
                match toks[i - 1] {
                    Tok::RevIdent(name) => {
                        self.read_ident(Reg::ScratchB, name);
                        self.alu(instr, Reg::ScratchB, Operand::Reg(self.wreg), self.wreg);
                        self.write_ident(self.wreg, name);
                    }
                    Tok::RevLocalOfs(ofs) => {
                        self.read_local(Reg::ScratchB, ofs);
                        self.alu(instr, Reg::ScratchB, Operand::Reg(self.wreg), self.wreg);
                        self.write_local(self.wreg, ofs);
                    }
                    _ => {
                        self.pop_operand();
                        let (addr, value) = if self.wreg == self.lreg {
                            self.copy(self.lreg, Reg::ScratchB);
                            (Reg::ScratchB, self.rreg)
                        } else {
                            self.copy(self.rreg, Reg::ScratchB);
                            (self.lreg, Reg::ScratchB)
                        };
                        self.read_indirect(self.wreg, addr);
                        self.alu(instr, self.wreg, Operand::Reg(value), self.wreg);
                        self.write_indirect(addr, self.wreg);
                    }
                }
                self.widen(self.wreg, width);
            }

            Op::Seq => {}

            other => panic!("operator missed by classification: {other:?}"),
        }
    }

    fn note(&mut self, tok: &Tok) {
        let text = match tok {
            Tok::Int(v) => v.to_string(),
            Tok::Ident(name) | Tok::RevIdent(name) => self.names.get(*name).to_string(),
            Tok::LocalOfs(ofs) | Tok::RevLocalOfs(ofs) => format!("local {ofs}"),
            Tok::Open(bytes) => format!("call, {bytes} arg bytes"),
            Tok::Op(op, _) => format!("{op:?}").to_lowercase(),
            other => format!("{other:?}").to_lowercase(),
        };
        self.out.comment(text);
    }
}

fn fuses_const(op: Op) -> bool {
    matches!(
        op,
        Op::Add | Op::Sub | Op::And | Op::Xor | Op::Or | Op::Shl | Op::Shr | Op::UShr
    ) || cmp::classify(op).is_some()
}

fn alu_for(op: Op) -> AluOp {
    match op {
        Op::Add | Op::AssignAdd | Op::PostAdd => AluOp::Add,
        Op::Sub | Op::AssignSub | Op::PostSub => AluOp::Sub,
        Op::Mul | Op::AssignMul => AluOp::Mul,
        Op::Div | Op::AssignDiv => AluOp::Div,
        Op::UDiv | Op::AssignUDiv => AluOp::Divu,
        Op::Mod | Op::AssignMod => AluOp::Mod,
        Op::UMod | Op::AssignUMod => AluOp::Modu,
        Op::And | Op::AssignAnd => AluOp::And,
        Op::Xor | Op::AssignXor => AluOp::Xor,
        Op::Or | Op::AssignOr => AluOp::Or,
        Op::Shl | Op::AssignShl => AluOp::Shl,
        // signed right shift keeps the sign bit
        Op::Shr | Op::AssignShr => AluOp::Sar,
        Op::UShr | Op::AssignUShr => AluOp::Shr,
        other => panic!("no machine op for {other:?}"),
    }
}
