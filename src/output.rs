use crate::ir::{Name, Names};
use crate::target::Instr;

/// One line of assembly output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Line {
    Label(Name),
    Numbered(u32),
    Instr(Instr),
    Comment(String),
    /// A reserved slot that must be filled before rendering.
    Pending,
}

/// Handle to a reserved slot. Not copyable, so a slot can only be filled
/// once.
#[derive(Debug)]
pub struct Patch(usize);

/// The in-memory assembly stream. Everything is buffered so a reserved slot
/// can be filled in after the code that depends on it has been emitted.
#[derive(Debug, Default)]
pub struct Output {
    lines: Vec<Line>,
}

impl Output {
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    pub fn instr(&mut self, instr: Instr) {
        if let Some(instr) = instr.normalized() {
            self.lines.push(Line::Instr(instr));
        }
    }

    pub fn label(&mut self, name: Name) {
        self.lines.push(Line::Label(name));
    }

    pub fn numbered(&mut self, label: u32) {
        self.lines.push(Line::Numbered(label));
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.lines.push(Line::Comment(text.into()));
    }

    /// Reserves a slot to be filled later.
    pub fn reserve(&mut self) -> Patch {
        let at = self.lines.len();
        self.lines.push(Line::Pending);
        Patch(at)
    }

    /// Replaces a reserved slot with the given instructions.
    pub fn fill(&mut self, at: Patch, instrs: Vec<Instr>) {
        let Patch(at) = at;
        assert_eq!(Line::Pending, self.lines[at], "slot filled twice");
        let lines = instrs
            .into_iter()
            .filter_map(Instr::normalized)
            .map(Line::Instr);
        self.lines.splice(at..=at, lines);
    }

    pub fn render(&self, names: &Names) -> Vec<String> {
        self.lines
            .iter()
            .map(|line| match line {
                Line::Label(name) => format!("{}:", names.get(*name)),
                Line::Numbered(label) => format!("L{label}:"),
                Line::Instr(instr) => instr.render(names),
                Line::Comment(text) => format!("; {text}"),
                Line::Pending => panic!("rendering an unfilled slot"),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{AluOp, Operand, Reg};

    #[test]
    fn fill_replaces_reserved_slot_in_place() {
        let names = Names::new();
        let mut out = Output::new();
        out.instr(Instr::Ldi(1, Reg::Acc));
        let patch = out.reserve();
        out.instr(Instr::Ldi(2, Reg::Acc));
        out.fill(
            patch,
            vec![
                Instr::Alu(AluOp::Sub, Reg::Sp, Operand::Imm(12), Reg::Sp),
                Instr::Stw(4, Reg::Sp, Reg::Fp),
            ],
        );

        assert_eq!(
            vec!["ldi 1 r1", "sub r13 12 r13", "stw 4 r13 r14", "ldi 2 r1"],
            out.render(&names)
        );
    }

    #[test]
    fn instr_normalizes_before_buffering() {
        let names = Names::new();
        let mut out = Output::new();
        out.instr(Instr::Alu(AluOp::Add, Reg::Acc, Operand::Imm(0), Reg::Acc));
        out.instr(Instr::Alu(AluOp::Add, Reg::Acc, Operand::Imm(-5), Reg::Acc));
        assert_eq!(vec!["sub r1 5 r1"], out.render(&names));
    }

    #[test]
    #[should_panic]
    fn rendering_with_unfilled_slot_panics() {
        let names = Names::new();
        let mut out = Output::new();
        let _patch = out.reserve();
        out.render(&names);
    }
}
