use super::Lowerer;
use crate::target::{AluOp, Instr, Operand, Reg, TEMP_REGS, WORD};

impl Lowerer<'_> {
    fn advance(&mut self) {
        self.wreg = match self.wreg {
            Reg::Acc => Reg::Temp(0),
            Reg::Temp(n) if (n as usize) + 1 < TEMP_REGS => Reg::Temp(n + 1),
            other => panic!("advancing register cursor past the pool: {other:?}"),
        };
    }

    fn retreat(&mut self) {
        self.wreg = match self.wreg {
            Reg::Temp(0) => Reg::Acc,
            Reg::Temp(n) => Reg::Temp(n - 1),
            other => panic!("retreating register cursor below the pool: {other:?}"),
        };
    }

    /// Parks the current value so the next one can be produced. Uses the
    /// next pool register while one is free, otherwise spills to the stack
    /// and keeps producing into the same register.
    pub(super) fn push_operand(&mut self) {
        if self.pool_ok && self.parked < TEMP_REGS {
            self.advance();
            self.parked += 1;
            return;
        }

        self.grow_stack(WORD);
        self.out.instr(Instr::Stw(0, Reg::Sp, self.wreg));
        self.parked += 1;
    }

    /// Recovers the most recently parked value, leaving the pair in `lreg`
    /// and `rreg` and the cursor on the left operand's register.
    pub(super) fn pop_operand(&mut self) {
        self.parked = match self.parked.checked_sub(1) {
            Some(parked) => parked,
            None => panic!("popping an operand that was never pushed"),
        };

        if self.pool_ok && self.parked < TEMP_REGS {
            self.rreg = self.wreg;
            self.retreat();
            self.lreg = self.wreg;
        } else {
            self.out.instr(Instr::Ldw(0, Reg::Sp, Reg::ScratchA));
            self.shrink_stack(WORD);
            self.lreg = Reg::ScratchA;
            self.rreg = self.wreg;
        }
    }

    /// Unpaired spill of the current value, used for call arguments that go
    /// to the stack. Freed wholesale when the call frees its slots.
    pub(super) fn spill(&mut self) {
        self.grow_stack(WORD);
        self.out.instr(Instr::Stw(0, Reg::Sp, self.wreg));
    }

    pub(super) fn add_imm(&mut self, reg: Reg, v: i32) {
        self.out
            .instr(Instr::Alu(AluOp::Add, reg, Operand::Imm(v), reg));
    }
}
