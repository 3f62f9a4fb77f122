mod cmp;
mod expr;
mod prep;
mod regs;
mod widen;

#[cfg(test)]
mod tests;

use log::{debug, info};

use crate::ir::{Function, Name, Names, Stmt};
use crate::output::{Output, Patch};
use crate::target::{
    AluOp, BranchOp, Instr, JumpTarget, Operand, Reg, ARG_REGS, FRAME_HEADER, WORD,
};

/// Lowers every function into the output stream.
pub fn lower_program(names: &Names, out: &mut Output, functions: &[Function], annotate: bool) {
    info!("lowering {} functions", functions.len());

    let mut lowerer = Lowerer::new(names, out, annotate);
    for function in functions {
        lowerer.function(function);
    }

    debug!("done lowering");
}

/// Per-function lowering state. The register cursor and the operand counter
/// carry across helper calls within one expression, and must be back at
/// their resting position whenever a function or expression finishes.
pub struct Lowerer<'a> {
    names: &'a Names,
    out: &'a mut Output,
    annotate: bool,

    /// The register the next value is produced into.
    wreg: Reg,
    /// Left and right operands of the most recent pop.
    lreg: Reg,
    rreg: Reg,
    /// Values currently parked by pushes, in registers or on the stack.
    parked: usize,
    /// Whether the operand pool registers may be used for parking. Off for
    /// any expression containing a call, since calls clobber them.
    pool_ok: bool,

    /// Deepest call nesting in the current expression.
    call_depth: usize,
    /// False once the current function emits a call.
    leaf: bool,
    /// Most negative local offset seen so far; decides the frame size.
    min_local: i32,
    prologue: Option<Patch>,
}

impl<'a> Lowerer<'a> {
    pub fn new(names: &'a Names, out: &'a mut Output, annotate: bool) -> Self {
        Self {
            names,
            out,
            annotate,
            wreg: Reg::Acc,
            lreg: Reg::Acc,
            rreg: Reg::Acc,
            parked: 0,
            pool_ok: true,
            call_depth: 0,
            leaf: true,
            min_local: 0,
            prologue: None,
        }
    }

    pub fn function(&mut self, function: &Function) {
        debug!("lowering {}", self.names.get(function.name));
        assert_eq!(Reg::Acc, self.wreg, "register cursor leaked across functions");

        self.leaf = true;
        self.min_local = 0;
        self.prologue(function);

        for stmt in &function.body {
            self.stmt(stmt);
        }

        self.epilogue();

        assert_eq!(Reg::Acc, self.wreg);
    }

    fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr(toks) => {
                let mut toks = toks.clone();
                self.expr(&mut toks);
            }

            Stmt::Label(label) => self.out.numbered(*label),
            Stmt::Jump(label) => self.jump(*label),
            Stmt::JumpIfEqual(value, label) => self.jump_if_equal(*value, *label),
            Stmt::Local(ofs) => self.note_local(*ofs),
        }
    }

    /// Emits the function label and argument homing, and reserves the frame
    /// setup slot. The frame size is only known once the whole body has
    /// been walked, so the slot is filled by `epilogue`.
    fn prologue(&mut self, function: &Function) {
        self.out.label(function.name);

        // a function that can take no arguments must not touch its homes,
        // since the caller may not have made room for them; a variadic
        // minimum arrives as 0, and param_max is never below param_min
        if function.param_min > 0 {
            let homed = function.param_max.min(ARG_REGS);
            for i in 0..homed {
                self.out
                    .instr(Instr::Stw(WORD * i as i32, Reg::Sp, Reg::Arg(i as u8)));
            }
        }

        self.prologue = Some(self.out.reserve());
    }

    fn epilogue(&mut self) {
        let frame = FRAME_HEADER - self.min_local;

        let mut setup = vec![
            Instr::Alu(AluOp::Sub, Reg::Sp, Operand::Imm(frame), Reg::Sp),
            Instr::Stw(frame - FRAME_HEADER, Reg::Sp, Reg::Fp),
            Instr::Alu(
                AluOp::Add,
                Reg::Sp,
                Operand::Imm(frame - FRAME_HEADER),
                Reg::Fp,
            ),
        ];
        if !self.leaf {
            setup.push(Instr::Stw(WORD, Reg::Fp, Reg::Ra));
        }

        // the cursor never moves between reserving and filling, so only one
        // slot is ever outstanding
        let patch = self.prologue.take().unwrap();
        self.out.fill(patch, setup);

        if !self.leaf {
            self.out.instr(Instr::Ldw(WORD, Reg::Fp, Reg::Ra));
        }
        self.out.instr(Instr::Ldw(0, Reg::Fp, Reg::Fp));
        self.out
            .instr(Instr::Alu(AluOp::Add, Reg::Sp, Operand::Imm(frame), Reg::Sp));
        self.out.instr(Instr::Jr(0, Reg::Ra));
    }

    fn note_local(&mut self, ofs: i32) {
        self.min_local = self.min_local.min(ofs);
    }

    fn grow_stack(&mut self, bytes: i32) {
        self.out
            .instr(Instr::Alu(AluOp::Sub, Reg::Sp, Operand::Imm(bytes), Reg::Sp));
    }

    fn shrink_stack(&mut self, bytes: i32) {
        self.out
            .instr(Instr::Alu(AluOp::Add, Reg::Sp, Operand::Imm(bytes), Reg::Sp));
    }

    /// Register-to-register move, spelled as an `or` with zero.
    fn copy(&mut self, from: Reg, to: Reg) {
        self.out
            .instr(Instr::Alu(AluOp::Or, Reg::Zero, Operand::Reg(from), to));
    }

    fn read_ident(&mut self, dst: Reg, name: Name) {
        self.out.instr(Instr::Lea(name, Reg::ScratchA));
        self.out.instr(Instr::Ldw(0, Reg::ScratchA, dst));
    }

    fn write_ident(&mut self, src: Reg, name: Name) {
        self.out.instr(Instr::Lea(name, Reg::ScratchA));
        self.out.instr(Instr::Stw(0, Reg::ScratchA, src));
    }

    fn read_local(&mut self, dst: Reg, ofs: i32) {
        self.note_local(ofs);
        self.out.instr(Instr::Ldw(ofs, Reg::Fp, dst));
    }

    fn write_local(&mut self, src: Reg, ofs: i32) {
        self.note_local(ofs);
        self.out.instr(Instr::Stw(ofs, Reg::Fp, src));
    }

    fn read_indirect(&mut self, dst: Reg, addr: Reg) {
        self.out.instr(Instr::Ldw(0, addr, dst));
    }

    fn write_indirect(&mut self, addr: Reg, src: Reg) {
        self.out.instr(Instr::Stw(0, addr, src));
    }

    fn jump(&mut self, label: u32) {
        self.out.instr(Instr::Jump(JumpTarget::Numbered(label)));
    }

    /// Branch to the label if the current value is zero.
    fn jump_if_zero(&mut self, label: u32) {
        self.out.instr(Instr::Branch(
            BranchOp::Bne,
            self.wreg,
            Operand::Reg(Reg::Zero),
            2,
        ));
        self.jump(label);
    }

    /// Branch to the label if the current value is nonzero.
    fn jump_if_not_zero(&mut self, label: u32) {
        self.out.instr(Instr::Branch(
            BranchOp::Beq,
            self.wreg,
            Operand::Reg(Reg::Zero),
            2,
        ));
        self.jump(label);
    }

    /// Branch to the label if the current value equals the constant.
    fn jump_if_equal(&mut self, value: i32, label: u32) {
        self.out.instr(Instr::Ldi(value, Reg::ScratchB));
        self.out.instr(Instr::Branch(
            BranchOp::Bne,
            self.wreg,
            Operand::Reg(Reg::ScratchB),
            2,
        ));
        self.jump(label);
    }

    fn alu(&mut self, op: AluOp, a: Reg, b: Operand, c: Reg) {
        self.out.instr(Instr::Alu(op, a, b, c));
    }
}
