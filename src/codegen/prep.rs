//! Rewrites a postfix expression before instruction selection: folds
//! unsigned literal types away, strength-reduces multiplies and unsigned
//! divisions by powers of two, moves literal operands of commutative and
//! relational operators to the right, folds comparisons that a 32-bit
//! machine cannot lose, and moves simple assignment targets past their
//! right-hand sides so stores need no address computation.

use crate::ir::{Op, Tok};

/// Expression nesting beyond this is a front-end bug, not a program.
pub(super) const MAX_DEPTH: usize = 256;

/// Rewrites the subtree whose top token is at `*idx`, walking the stream
/// right to left. Leaves `*idx` just below the subtree.
pub(super) fn prep(toks: &mut [Tok], idx: &mut isize, depth: usize) {
    assert!(depth < MAX_DEPTH, "expression nested too deeply");
    assert!(*idx >= 0, "operator without enough operands");

    let here = *idx as usize;
    *idx -= 1;
    let right = *idx;

    let mut tok = toks[here];

    // unsigned divide or remainder by a power of two becomes a shift or a
    // mask before the operands are even walked
    if let Tok::Op(op @ (Op::UDiv | Op::UMod | Op::AssignUDiv | Op::AssignUMod), width) = tok {
        if let Some(m) = literal(toks[right as usize]) {
            if m != 0 && m & (m - 1) == 0 {
                let reduced = match op {
                    Op::UDiv => Op::UShr,
                    Op::AssignUDiv => Op::AssignUShr,
                    Op::UMod => Op::And,
                    _ => Op::AssignAnd,
                };
                toks[right as usize] = match op {
                    Op::UDiv | Op::AssignUDiv => Tok::Int(m.trailing_zeros() as i32),
                    _ => Tok::Int((m - 1) as i32),
                };
                tok = Tok::Op(reduced, width);
                toks[here] = tok;
            }
        }
    }

    match tok {
        Tok::Uint(v) => toks[here] = Tok::Int(v as i32),
        Tok::Int(_) | Tok::Zero | Tok::Ident(_) | Tok::LocalOfs(_) => {}

        Tok::Op(
            Op::Deref
            | Op::Inc
            | Op::Dec
            | Op::PostInc
            | Op::PostDec
            | Op::Not
            | Op::Plus
            | Op::Neg
            | Op::Bool
            | Op::CastI8
            | Op::CastU8
            | Op::CastI16
            | Op::CastU16,
            _,
        )
        | Tok::ShortCirc { .. }
        | Tok::Goto(_)
        | Tok::Void => prep(toks, idx, depth + 1),

        Tok::Op(
            Op::PostAdd
            | Op::PostSub
            | Op::Sub
            | Op::Div
            | Op::Mod
            | Op::UDiv
            | Op::UMod
            | Op::Shl
            | Op::Shr
            | Op::UShr
            | Op::Seq,
            _,
        )
        | Tok::CircTarget(_) => {
            prep(toks, idx, depth + 1);
            prep(toks, idx, depth + 1);
        }

        Tok::Op(
            op @ (Op::Assign
            | Op::AssignAdd
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
            | Op::AssignOr),
            width,
        ) => {
            // a store of zero whose result nothing reads needs no value
            // register at all
            if op == Op::Assign && here == toks.len() - 1 {
                if let Some(0) = literal(toks[right as usize]) {
                    toks[right as usize] = Tok::Zero;
                    toks[here] = Tok::Op(Op::AssignZero, width);
                }
            }

            prep(toks, idx, depth + 1);
            let left = *idx;
            prep(toks, idx, depth + 1);

            let l = left as usize;
            let r = right as usize;
            let target = toks[l];
            if let Tok::Ident(_) | Tok::LocalOfs(_) = target {
                toks.copy_within(l + 1..=r, l);
                toks[r] = match target {
                    Tok::Ident(name) => Tok::RevIdent(name),
                    Tok::LocalOfs(ofs) => Tok::RevLocalOfs(ofs),
                    _ => unreachable!(),
                };
            }
        }

        Tok::Op(
            op @ (Op::Add
            | Op::Mul
            | Op::And
            | Op::Xor
            | Op::Or
            | Op::Eq
            | Op::Ne
            | Op::Lt
            | Op::Gt
            | Op::Le
            | Op::Ge
            | Op::ULt
            | Op::UGt
            | Op::ULe
            | Op::UGe),
            width,
        ) => {
            prep(toks, idx, depth + 1);
            let left = *idx;
            prep(toks, idx, depth + 1);

            let l = left as usize;
            let r = right as usize;
            let mut op = op;

            // a literal on the left moves right, mirroring the operator
            if literal(toks[r]).is_none() && literal(toks[l]).is_some() {
                let saved = toks[l];
                toks.copy_within(l + 1..=r, l);
                toks[r] = saved;
                op = mirror(op);
            }

            if let Some(m) = literal(toks[r]) {
                match op {
                    Op::Mul if m != 0 && m & (m - 1) == 0 => {
                        toks[r] = Tok::Int(m.trailing_zeros() as i32);
                        op = Op::Shl;
                    }

                    // nothing exceeds the type's maximum; the compare
                    // becomes an always-true or always-false constant form
                    Op::Le if m == i32::MAX as u32 => {
                        toks[r] = Tok::Int(0);
                        op = Op::UGe;
                    }
                    Op::ULe if m == u32::MAX => {
                        toks[r] = Tok::Int(0);
                        op = Op::UGe;
                    }
                    Op::Gt if m == i32::MAX as u32 => {
                        toks[r] = Tok::Int(0);
                        op = Op::And;
                    }
                    Op::UGt if m == u32::MAX => {
                        toks[r] = Tok::Int(0);
                        op = Op::And;
                    }

                    _ => {}
                }
            }

            toks[here] = Tok::Op(op, width);
        }

        Tok::Close(_) => loop {
            assert!(*idx >= 0, "call without an opening token");
            match toks[*idx as usize] {
                Tok::Open(_) => {
                    *idx -= 1;
                    break;
                }
                Tok::Comma => *idx -= 1,
                _ => prep(toks, idx, depth + 1),
            }
        },

        other => panic!("token out of place in postfix stream: {other:?}"),
    }
}

fn literal(tok: Tok) -> Option<u32> {
    match tok {
        Tok::Int(v) => Some(v as u32),
        Tok::Uint(v) => Some(v),
        _ => None,
    }
}

fn mirror(op: Op) -> Op {
    match op {
        Op::Lt => Op::Gt,
        Op::Gt => Op::Lt,
        Op::Le => Op::Ge,
        Op::Ge => Op::Le,
        Op::ULt => Op::UGt,
        Op::UGt => Op::ULt,
        Op::ULe => Op::UGe,
        Op::UGe => Op::ULe,
        other => other,
    }
}
