mod render;

use crate::ir::Name;

/// Bytes per machine word.
pub const WORD: i32 = 4;

/// Registers available for argument passing.
pub const ARG_REGS: usize = 4;

/// Registers available to the expression operand pool.
pub const TEMP_REGS: usize = 3;

/// Bytes taken by the saved frame pointer and return address.
pub const FRAME_HEADER: i32 = 8;

/// Words a `getpc`-based call sequence adds to the return address so the
/// callee comes back past the jump.
pub const CALL_RETURN_SKIP: i32 = 3;

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Reg {
    /// Hardwired zero.
    Zero,
    /// Accumulator; expression results and return values live here.
    Acc,
    /// Argument registers, `Arg(0)` through `Arg(3)`.
    Arg(u8),
    /// Operand pool registers, `Temp(0)` through `Temp(2)`.
    Temp(u8),
    /// Scratch for address formation and operand reloads.
    ScratchA,
    /// Scratch for saved values in compound stores.
    ScratchB,
    Sp,
    Fp,
    Ra,
}

impl Reg {
    pub fn index(self) -> u8 {
        match self {
            Reg::Zero => 0,
            Reg::Acc => 1,
            Reg::Arg(n) => {
                assert!((n as usize) < ARG_REGS);
                2 + n
            }
            Reg::Temp(n) => {
                assert!((n as usize) < TEMP_REGS);
                6 + n
            }
            Reg::ScratchA => 9,
            Reg::ScratchB => 10,
            Reg::Sp => 13,
            Reg::Fp => 14,
            Reg::Ra => 15,
        }
    }
}

/// Second operand of an ALU or branch instruction.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Operand {
    Reg(Reg),
    Imm(i32),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AluOp {
    Add,
    Sub,
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Sar,
    Mul,
    Div,
    Divu,
    Mod,
    Modu,
}

/// Skip-style conditional branches; the third operand counts instructions
/// to skip forward when the condition holds.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BranchOp {
    Beq,
    Bne,
    Bge,
    Bgt,
    Bgeu,
    Bgtu,
}

/// Destination of an unconditional jump.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JumpTarget {
    Label(Name),
    Numbered(u32),
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Instr {
    /// Load constant into a register.
    Ldi(i32, Reg),
    /// Load the address of a label into a register.
    Lea(Name, Reg),
    /// Load word: offset, base, destination.
    Ldw(i32, Reg, Reg),
    /// Store word: offset, base, source.
    Stw(i32, Reg, Reg),
    /// Three-operand ALU op: first, second, destination.
    Alu(AluOp, Reg, Operand, Reg),
    Not(Reg, Reg),
    /// Conditional skip: first, second, instruction count.
    Branch(BranchOp, Reg, Operand, i32),
    Jump(JumpTarget),
    /// Relative jump by an instruction count.
    Rjmp(i32),
    /// Indirect jump through a register plus offset.
    Jr(i32, Reg),
    /// Read the program counter.
    GetPc(Reg),
}

impl Instr {
    /// Canonicalizes additive immediates. `add`/`sub` of zero into the same
    /// register disappears, and negative immediates flip to the opposite
    /// instruction so the emitted constant is always nonnegative.
    pub fn normalized(self) -> Option<Instr> {
        match self {
            Instr::Alu(op @ (AluOp::Add | AluOp::Sub), a, Operand::Imm(v), c) => {
                if v == 0 && a == c {
                    None
                } else if v == i32::MIN {
                    // adding and subtracting 2^31 both just toggle the top
                    // bit, and the flip below cannot represent +2^31
                    Some(Instr::Alu(AluOp::Xor, a, Operand::Imm(v), c))
                } else if v < 0 {
                    let flipped = match op {
                        AluOp::Add => AluOp::Sub,
                        _ => AluOp::Add,
                    };
                    Some(Instr::Alu(flipped, a, Operand::Imm(-v), c))
                } else {
                    Some(self)
                }
            }
            other => Some(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_zero_to_self_disappears() {
        let instr = Instr::Alu(AluOp::Add, Reg::Acc, Operand::Imm(0), Reg::Acc);
        assert_eq!(None, instr.normalized());
    }

    #[test]
    fn add_zero_to_other_register_stays() {
        let instr = Instr::Alu(AluOp::Add, Reg::Sp, Operand::Imm(0), Reg::Fp);
        assert_eq!(Some(instr), instr.normalized());
    }

    #[test]
    fn negative_add_flips_to_sub() {
        let instr = Instr::Alu(AluOp::Add, Reg::Acc, Operand::Imm(-5), Reg::Acc);
        assert_eq!(
            Some(Instr::Alu(AluOp::Sub, Reg::Acc, Operand::Imm(5), Reg::Acc)),
            instr.normalized()
        );
    }

    #[test]
    fn negative_sub_flips_to_add() {
        let instr = Instr::Alu(AluOp::Sub, Reg::Sp, Operand::Imm(-8), Reg::Sp);
        assert_eq!(
            Some(Instr::Alu(AluOp::Add, Reg::Sp, Operand::Imm(8), Reg::Sp)),
            instr.normalized()
        );
    }

    #[test]
    fn int_min_immediate_becomes_top_bit_toggle() {
        let instr = Instr::Alu(AluOp::Add, Reg::Acc, Operand::Imm(i32::MIN), Reg::Acc);
        assert_eq!(
            Some(Instr::Alu(AluOp::Xor, Reg::Acc, Operand::Imm(i32::MIN), Reg::Acc)),
            instr.normalized()
        );

        let instr = Instr::Alu(AluOp::Sub, Reg::Acc, Operand::Imm(i32::MIN), Reg::Acc);
        assert_eq!(
            Some(Instr::Alu(AluOp::Xor, Reg::Acc, Operand::Imm(i32::MIN), Reg::Acc)),
            instr.normalized()
        );
    }

    #[test]
    fn non_additive_imm_untouched() {
        let instr = Instr::Alu(AluOp::Xor, Reg::Acc, Operand::Imm(0), Reg::Acc);
        assert_eq!(Some(instr), instr.normalized());
    }
}
