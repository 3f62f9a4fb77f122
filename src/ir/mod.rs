mod names;
pub mod text;

pub use names::{Name, Names};

/// Operand width for loads, stores and truncating assignments. The machine
/// itself is word-only, so anything narrower is modelled by masking or
/// sign-extending the low bits after the fact.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Width {
    Word,
    I8,
    U8,
    I16,
    U16,
}

/// Expression operators, as they appear in the postfix token stream.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Op {
    Add,
    Sub,
    Mul,
    Div,
    UDiv,
    Mod,
    UMod,
    And,
    Xor,
    Or,
    Shl,
    Shr,
    UShr,

    Lt,
    Gt,
    Le,
    Ge,
    ULt,
    UGt,
    ULe,
    UGe,
    Eq,
    Ne,

    Not,
    Neg,
    Plus,
    Bool,

    Deref,
    Inc,
    Dec,
    PostInc,
    PostDec,
    /// Pointer post-add: `p += n` yielding the old value of `p`.
    PostAdd,
    PostSub,

    Assign,
    /// Store of a known zero whose value is discarded. Introduced by the
    /// rewrite pass, never by the front end.
    AssignZero,
    AssignAdd,
    AssignSub,
    AssignMul,
    AssignDiv,
    AssignUDiv,
    AssignMod,
    AssignUMod,
    AssignShl,
    AssignShr,
    AssignUShr,
    AssignAnd,
    AssignXor,
    AssignOr,

    /// The C comma operator: evaluate left, discard, yield right.
    Seq,

    CastI8,
    CastU8,
    CastI16,
    CastU16,
}

/// One token of a postfix expression.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Tok {
    Int(i32),
    Uint(u32),
    /// Placeholder for a known-zero operand. Introduced by the rewrite pass.
    Zero,
    Ident(Name),
    /// Address of a local, as a frame-pointer offset.
    LocalOfs(i32),
    /// An identifier moved past its assignment's right-hand side, so the
    /// store can pick it up by peeking backwards.
    RevIdent(Name),
    RevLocalOfs(i32),

    Op(Op, Width),

    /// Start of a call's argument list; payload is the argument bytes.
    Open(i32),
    /// Separates arguments; also follows the last argument.
    Comma,
    /// End of a call. The token before it is the callee.
    Close(i32),

    /// Branch to the numbered label if the expression value is nonzero.
    If(u32),
    /// Branch to the numbered label if the expression value is zero.
    IfNot(u32),
    Goto(u32),
    /// Short-circuit exit: for `||` jump to the label on nonzero, for `&&`
    /// jump on zero.
    ShortCirc { or: bool, label: u32 },
    /// Join point for a short-circuit jump.
    CircTarget(u32),
    /// Marks the expression value as the function's return value.
    Return,
    /// Marks the expression value as discarded.
    Void,
}

/// A statement of a lowered function body.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Stmt {
    Expr(Vec<Tok>),
    Label(u32),
    Jump(u32),
    /// Switch-table edge: jump to the label if the current expression value
    /// equals the constant.
    JumpIfEqual(i32, u32),
    /// Declares a local at the given frame-pointer offset.
    Local(i32),
}

#[derive(Clone, Debug)]
pub struct Function {
    pub name: Name,
    /// Lowest and highest possible argument count, from the prototype.
    pub param_min: usize,
    pub param_max: usize,
    pub body: Vec<Stmt>,
}
