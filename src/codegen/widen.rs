use super::Lowerer;
use crate::ir::Width;
use crate::target::{AluOp, Instr, Operand, Reg};

impl Lowerer<'_> {
    /// Brings a register holding a narrow value back to a full word, by
    /// masking for unsigned widths and by a shift pair for signed ones.
    pub(super) fn widen(&mut self, reg: Reg, width: Width) {
        match width {
            Width::Word => {}

            Width::I8 => self.shift_pair(reg, 24, AluOp::Sar),
            Width::I16 => self.shift_pair(reg, 16, AluOp::Sar),

            Width::U8 => {
                self.out
                    .instr(Instr::Alu(AluOp::And, reg, Operand::Imm(0xff), reg));
            }
            Width::U16 => self.shift_pair(reg, 16, AluOp::Shr),
        }
    }

    fn shift_pair(&mut self, reg: Reg, by: i32, back: AluOp) {
        self.out
            .instr(Instr::Alu(AluOp::Shl, reg, Operand::Imm(by), reg));
        self.out.instr(Instr::Alu(back, reg, Operand::Imm(by), reg));
    }
}
