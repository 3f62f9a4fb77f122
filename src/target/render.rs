use super::{AluOp, BranchOp, Instr, JumpTarget, Operand, Reg};
use crate::ir::Names;

impl Reg {
    fn render(self) -> String {
        format!("r{}", self.index())
    }
}

impl Operand {
    fn render(self) -> String {
        match self {
            Operand::Reg(reg) => reg.render(),
            Operand::Imm(v) => v.to_string(),
        }
    }
}

impl AluOp {
    fn mnemonic(self) -> &'static str {
        match self {
            AluOp::Add => "add",
            AluOp::Sub => "sub",
            AluOp::And => "and",
            AluOp::Or => "or",
            AluOp::Xor => "xor",
            AluOp::Shl => "shl",
            AluOp::Shr => "shr",
            AluOp::Sar => "sar",
            AluOp::Mul => "mul",
            AluOp::Div => "div",
            AluOp::Divu => "divu",
            AluOp::Mod => "mod",
            AluOp::Modu => "modu",
        }
    }
}

impl BranchOp {
    fn mnemonic(self) -> &'static str {
        match self {
            BranchOp::Beq => "beq",
            BranchOp::Bne => "bne",
            BranchOp::Bge => "bge",
            BranchOp::Bgt => "bgt",
            BranchOp::Bgeu => "bgeu",
            BranchOp::Bgtu => "bgtu",
        }
    }
}

impl JumpTarget {
    pub(crate) fn render(self, names: &Names) -> String {
        match self {
            JumpTarget::Label(name) => names.get(name).to_string(),
            JumpTarget::Numbered(label) => format!("L{label}"),
        }
    }
}

impl Instr {
    pub fn render(&self, names: &Names) -> String {
        match *self {
            Instr::Ldi(v, d) => format!("ldi {v} {}", d.render()),
            Instr::Lea(name, d) => format!("lea {} {}", names.get(name), d.render()),
            Instr::Ldw(ofs, base, d) => {
                format!("ldw {ofs} {} {}", base.render(), d.render())
            }
            Instr::Stw(ofs, base, s) => {
                format!("stw {ofs} {} {}", base.render(), s.render())
            }
            Instr::Alu(op, a, b, c) => {
                format!("{} {} {} {}", op.mnemonic(), a.render(), b.render(), c.render())
            }
            Instr::Not(a, b) => format!("not {} {}", a.render(), b.render()),
            Instr::Branch(op, a, b, skip) => {
                format!("{} {} {} {skip}", op.mnemonic(), a.render(), b.render())
            }
            Instr::Jump(target) => format!("jmp {}", target.render(names)),
            Instr::Rjmp(n) => format!("rjmp {n}"),
            Instr::Jr(ofs, r) => format!("jr {ofs} {}", r.render()),
            Instr::GetPc(r) => format!("getpc {}", r.render()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_loads_and_stores() {
        let names = Names::new();
        assert_eq!(
            "ldw -4 r14 r1",
            Instr::Ldw(-4, Reg::Fp, Reg::Acc).render(&names)
        );
        assert_eq!(
            "stw 4 r13 r2",
            Instr::Stw(4, Reg::Sp, Reg::Arg(0)).render(&names)
        );
    }

    #[test]
    fn renders_alu_with_both_operand_kinds() {
        let names = Names::new();
        assert_eq!(
            "shr r1 3 r1",
            Instr::Alu(AluOp::Shr, Reg::Acc, Operand::Imm(3), Reg::Acc).render(&names)
        );
        assert_eq!(
            "add r9 r6 r1",
            Instr::Alu(
                AluOp::Add,
                Reg::ScratchA,
                Operand::Reg(Reg::Temp(0)),
                Reg::Acc
            )
            .render(&names)
        );
    }

    #[test]
    fn renders_branches_and_jumps() {
        let mut names = Names::new();
        let main = names.add("main");
        assert_eq!(
            "bgeu r1 r0 3",
            Instr::Branch(BranchOp::Bgeu, Reg::Acc, Operand::Reg(Reg::Zero), 3).render(&names)
        );
        assert_eq!("jmp main", Instr::Jump(JumpTarget::Label(main)).render(&names));
        assert_eq!(
            "jmp L7",
            Instr::Jump(JumpTarget::Numbered(7)).render(&names)
        );
        assert_eq!("jr 0 r15", Instr::Jr(0, Reg::Ra).render(&names));
    }
}
