use super::Lowerer;
use crate::ir::{Function, Names, Op, Stmt, Tok, Width};
use crate::output::Output;

fn lower_expr(names: &Names, toks: Vec<Tok>) -> Vec<String> {
    let mut out = Output::new();
    let mut lowerer = Lowerer::new(names, &mut out, false);
    let mut toks = toks;
    lowerer.expr(&mut toks);
    out.render(names)
}

fn lower_function(names: &Names, function: Function) -> Vec<String> {
    let mut out = Output::new();
    let mut lowerer = Lowerer::new(names, &mut out, false);
    lowerer.function(&function);
    out.render(names)
}

fn op(op: Op) -> Tok {
    Tok::Op(op, Width::Word)
}

/// Loads the local at the offset.
fn local(ofs: i32) -> [Tok; 2] {
    [Tok::LocalOfs(ofs), op(Op::Deref)]
}

#[test]
fn unsigned_div_by_pow2_is_shift() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Uint(8), op(Op::UDiv)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "shr r1 3 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn unsigned_mod_by_pow2_is_mask() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Uint(8), op(Op::UMod)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "and r1 7 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn unsigned_div_by_other_const_divides() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Uint(7), op(Op::UDiv)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "ldi 7 r6", "divu r1 r6 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn mul_by_pow2_is_shift() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(8), op(Op::Mul)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "shl r1 3 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn add_of_negative_const_is_sub() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(-5), op(Op::Add)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "sub r1 5 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn add_of_int_min_const_toggles_top_bit() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(i32::MIN), op(Op::Add)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "xor r1 -2147483648 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn le_int_max_is_always_true() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(i32::MAX), op(Op::Le)]);

    // nothing exceeds the maximum, so this is an unsigned >= 0
    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "bgeu r1 r0 3",
            "ldi 1 r1",
            "rjmp 2",
            "ldi 0 r1",
            "xor r1 1 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn unsigned_le_signed_max_wraps_the_bumped_constant() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Uint(0x7FFF_FFFF), op(Op::ULe)]);

    // the strict form compares against 0x80000000
    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldi -2147483648 r9",
            "bgeu r1 r9 3",
            "ldi 1 r1",
            "rjmp 2",
            "ldi 0 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn gt_int_max_is_always_false() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(i32::MAX), op(Op::Gt)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "and r1 0 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn literal_on_left_swaps_and_mirrors() {
    let names = Names::new();
    let mut toks = vec![Tok::Int(5)];
    toks.extend(local(-4));
    toks.push(op(Op::Lt));

    // 5 < x becomes x > 5, which the table lowers as !(x < 6)
    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldi 6 r9",
            "bge r1 r9 3",
            "ldi 1 r1",
            "rjmp 2",
            "ldi 0 r1",
            "xor r1 1 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn runtime_cmp_feeding_branch() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend(local(-8));
    toks.extend([op(Op::Lt), Tok::If(7)]);

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldw -8 r14 r6",
            "bge r1 r6 3",
            "ldi 1 r1",
            "rjmp 2",
            "ldi 0 r1",
            "beq r1 r0 2",
            "jmp L7",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn eq_zero_branches_without_materializing() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(0), op(Op::Eq), Tok::IfNot(3)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "beq r1 r0 2", "jmp L3"],
        lower_expr(&names, toks)
    );
}

#[test]
fn unsigned_gt_zero_branch_is_a_nonzero_test() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend([Tok::Int(0), op(Op::UGt), Tok::If(5)]);

    assert_eq!(
        vec!["ldw -4 r14 r1", "beq r1 r0 2", "jmp L5"],
        lower_expr(&names, toks)
    );
}

#[test]
fn discarded_zero_store_uses_zero_register() {
    let names = Names::new();
    let toks = vec![Tok::LocalOfs(-4), Tok::Int(0), op(Op::Assign)];

    assert_eq!(vec!["stw -4 r14 r0"], lower_expr(&names, toks));
}

#[test]
fn assign_to_local_stores_directly() {
    let names = Names::new();
    let toks = vec![Tok::LocalOfs(-4), Tok::Int(5), op(Op::Assign)];

    assert_eq!(
        vec!["ldi 5 r1", "stw -4 r14 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn compound_assign_reads_modifies_writes() {
    let names = Names::new();
    let toks = vec![Tok::LocalOfs(-4), Tok::Int(5), op(Op::AssignAdd)];

    assert_eq!(
        vec![
            "ldi 5 r1",
            "ldw -4 r14 r10",
            "add r10 r1 r1",
            "stw -4 r14 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn assign_through_pointer_keeps_value_in_cursor() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.extend(local(-8));
    toks.push(op(Op::Assign));

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldw -8 r14 r6",
            "stw 0 r1 r6",
            "or r0 r6 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn narrow_assign_widens_result() {
    let names = Names::new();
    let toks = vec![
        Tok::LocalOfs(-4),
        Tok::Int(200),
        Tok::Op(Op::Assign, Width::U8),
    ];

    assert_eq!(
        vec!["ldi 200 r1", "stw -4 r14 r1", "and r1 255 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn signed_cast_is_a_shift_pair() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.push(op(Op::CastI16));

    assert_eq!(
        vec!["ldw -4 r14 r1", "shl r1 16 r1", "sar r1 16 r1"],
        lower_expr(&names, toks)
    );
}

#[test]
fn bool_normalizes_to_zero_or_one() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.push(op(Op::Bool));

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "bgtu r1 r0 3",
            "ldi 0 r1",
            "rjmp 2",
            "ldi 1 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn short_circuit_and_skips_second_operand() {
    let names = Names::new();
    let mut toks = local(-4).to_vec();
    toks.push(Tok::ShortCirc {
        or: false,
        label: 9,
    });
    toks.extend(local(-8));
    toks.push(Tok::CircTarget(9));

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "bne r1 r0 2",
            "jmp L9",
            "ldw -8 r14 r1",
            "L9:",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn post_increment_restores_old_value() {
    let names = Names::new();
    let toks = vec![Tok::LocalOfs(-4), op(Op::PostInc)];

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "add r1 1 r1",
            "stw -4 r14 r1",
            "sub r1 1 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn operands_spill_past_the_register_pool() {
    let names = Names::new();
    let mut toks = Vec::new();
    for ofs in [-4, -8, -12, -16, -20] {
        toks.extend(local(ofs));
    }
    toks.extend([op(Op::Add), op(Op::Add), op(Op::Add), op(Op::Add)]);

    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldw -8 r14 r6",
            "ldw -12 r14 r7",
            "ldw -16 r14 r8",
            "sub r13 4 r13",
            "stw 0 r13 r8",
            "ldw -20 r14 r8",
            "ldw 0 r13 r9",
            "add r13 4 r13",
            "add r9 r8 r8",
            "add r7 r8 r7",
            "add r6 r7 r6",
            "add r1 r6 r1",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn lone_call_builds_arguments_in_their_registers() {
    let mut names = Names::new();
    let f = names.add("f");

    let mut toks = vec![Tok::Open(8)];
    toks.extend(local(-8));
    toks.push(Tok::Comma);
    toks.extend(local(-4));
    toks.extend([Tok::Comma, Tok::Ident(f), Tok::Close(8)]);

    assert_eq!(
        vec![
            "ldw -8 r14 r3",
            "ldw -4 r14 r2",
            "sub r13 16 r13",
            "getpc r15",
            "add r15 3 r15",
            "jmp f",
            "add r13 16 r13",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn nested_call_passes_arguments_on_the_stack() {
    let mut names = Names::new();
    let f = names.add("f");
    let g = names.add("g");

    let mut toks = vec![Tok::Open(4), Tok::Open(4)];
    toks.extend(local(-4));
    toks.extend([Tok::Comma, Tok::Ident(g), Tok::Close(4)]);
    toks.extend([Tok::Comma, Tok::Ident(f), Tok::Close(4)]);

    assert_eq!(
        vec![
            "sub r13 12 r13",
            "sub r13 12 r13",
            "ldw -4 r14 r1",
            "sub r13 4 r13",
            "stw 0 r13 r1",
            "ldw 0 r13 r2",
            "getpc r15",
            "add r15 3 r15",
            "jmp g",
            "add r13 16 r13",
            "sub r13 4 r13",
            "stw 0 r13 r1",
            "ldw 0 r13 r2",
            "getpc r15",
            "add r15 3 r15",
            "jmp f",
            "add r13 16 r13",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn computed_callee_jumps_indirect() {
    let names = Names::new();
    let mut toks = vec![Tok::Open(0)];
    toks.extend(local(-4));
    toks.push(Tok::Close(0));

    assert_eq!(
        vec![
            "sub r13 16 r13",
            "ldw -4 r14 r1",
            "getpc r15",
            "add r15 3 r15",
            "jr 0 r1",
            "add r13 16 r13",
        ],
        lower_expr(&names, toks)
    );
}

#[test]
fn leaf_function_frame_omits_return_address() {
    let mut names = Names::new();
    let f = names.add("f");

    let lines = lower_function(
        &names,
        Function {
            name: f,
            param_min: 0,
            param_max: 0,
            body: vec![
                Stmt::Local(-4),
                Stmt::Expr(vec![Tok::LocalOfs(-4), Tok::Int(5), op(Op::Assign)]),
            ],
        },
    );

    assert_eq!(
        vec![
            "f:",
            "sub r13 12 r13",
            "stw 4 r13 r14",
            "add r13 4 r14",
            "ldi 5 r1",
            "stw -4 r14 r1",
            "ldw 0 r14 r14",
            "add r13 12 r13",
            "jr 0 r15",
        ],
        lines
    );
}

#[test]
fn calling_function_saves_and_restores_return_address() {
    let mut names = Names::new();
    let g = names.add("g");
    let h = names.add("h");

    let lines = lower_function(
        &names,
        Function {
            name: g,
            param_min: 1,
            param_max: 1,
            body: vec![Stmt::Expr(vec![
                Tok::Open(0),
                Tok::Ident(h),
                Tok::Close(0),
                Tok::Void,
            ])],
        },
    );

    assert_eq!(
        vec![
            "g:",
            "stw 0 r13 r2",
            "sub r13 8 r13",
            "stw 0 r13 r14",
            "add r13 0 r14",
            "stw 4 r14 r15",
            "sub r13 16 r13",
            "getpc r15",
            "add r15 3 r15",
            "jmp h",
            "add r13 16 r13",
            "ldw 4 r14 r15",
            "ldw 0 r14 r14",
            "add r13 8 r13",
            "jr 0 r15",
        ],
        lines
    );
}

#[test]
fn zero_minimum_arity_skips_argument_homing() {
    let mut names = Names::new();
    let f = names.add("f");

    let lines = lower_function(
        &names,
        Function {
            name: f,
            param_min: 0,
            param_max: 2,
            body: vec![Stmt::Expr(vec![
                Tok::LocalOfs(-4),
                Tok::Int(1),
                op(Op::Assign),
            ])],
        },
    );

    assert_eq!(
        vec![
            "f:",
            "sub r13 12 r13",
            "stw 4 r13 r14",
            "add r13 4 r14",
            "ldi 1 r1",
            "stw -4 r14 r1",
            "ldw 0 r14 r14",
            "add r13 12 r13",
            "jr 0 r15",
        ],
        lines
    );
}

#[test]
fn frame_size_covers_deepest_local() {
    let mut names = Names::new();
    let f = names.add("f");

    let lines = lower_function(
        &names,
        Function {
            name: f,
            param_min: 0,
            param_max: 0,
            body: vec![
                Stmt::Local(-20),
                Stmt::Expr(vec![Tok::LocalOfs(-20), Tok::Int(1), op(Op::Assign)]),
            ],
        },
    );

    // 8 header bytes plus 20 bytes of locals, settled after the body
    assert_eq!("sub r13 28 r13", lines[1]);
    assert!(lines.contains(&"add r13 28 r13".to_string()));
}

#[test]
fn switch_edges_compare_and_jump() {
    let mut names = Names::new();
    let f = names.add("f");

    let lines = lower_function(
        &names,
        Function {
            name: f,
            param_min: 0,
            param_max: 0,
            body: vec![
                Stmt::Expr(local(-4).to_vec()),
                Stmt::JumpIfEqual(3, 6),
                Stmt::Jump(7),
                Stmt::Label(6),
                Stmt::Label(7),
            ],
        },
    );

    let body: Vec<_> = lines[4..].to_vec();
    assert_eq!(
        vec![
            "ldw -4 r14 r1",
            "ldi 3 r10",
            "bne r1 r10 2",
            "jmp L6",
            "jmp L7",
            "L6:",
            "L7:",
        ],
        body[..7].to_vec()
    );
}

#[test]
#[should_panic]
fn operator_without_operands_panics() {
    let names = Names::new();
    lower_expr(&names, vec![op(Op::Add)]);
}
