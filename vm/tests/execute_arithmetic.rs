//! Integration tests for the arithmetic, comparison and logic opcodes.

mod common;

use common::{assert_trap, run, run_bytes};
use proptest::prelude::*;
use rstest::rstest;
use stackvm_container::{Opcode, ProgramBuilder};
use stackvm_vm::Trap;

/// Pushes `b` then `a`, applies `op` and returns the result.
fn apply(b: u64, a: u64, op: Opcode) -> Vec<u64> {
    let mut builder = ProgramBuilder::new();
    builder.emit_push(b);
    builder.emit_push(a);
    builder.emit_plain(op);
    run(&builder.finalize().unwrap()).stack
}

#[rstest]
#[case::add(Opcode::Add, 10, 3, 13)]
#[case::sub(Opcode::Sub, 10, 3, 7)]
#[case::mul(Opcode::Mul, 10, 3, 30)]
#[case::div(Opcode::Div, 10, 3, 3)]
#[case::modulo(Opcode::Mod, 10, 3, 1)]
#[case::eq_true(Opcode::Eq, 4, 4, 1)]
#[case::eq_false(Opcode::Eq, 4, 5, 0)]
#[case::lt_true(Opcode::Lt, 3, 4, 1)]
#[case::lt_false(Opcode::Lt, 4, 3, 0)]
#[case::gt_true(Opcode::Gt, 4, 3, 1)]
#[case::gt_false(Opcode::Gt, 3, 4, 0)]
#[case::or_both_false(Opcode::Or, 0, 0, 0)]
#[case::or_one_true(Opcode::Or, 0, 7, 1)]
fn execute_when_binary_op_then_second_popped_is_left_operand(
    #[case] op: Opcode,
    #[case] b: u64,
    #[case] a: u64,
    #[case] expected: u64,
) {
    assert_eq!(apply(b, a, op), vec![expected]);
}

#[test]
fn execute_when_sub_below_zero_then_wraps() {
    assert_eq!(apply(0, 1, Opcode::Sub), vec![u64::MAX]);
}

#[rstest]
#[case::div(0x23)]
#[case::modulo(0x24)]
fn execute_when_divisor_zero_then_divide_by_zero(#[case] op: u8) {
    #[rustfmt::skip]
    let bytecode: Vec<u8> = vec![
        0x03, 10,  // PS8 10
        0x03, 0,   // PS8 0
        op,
    ];

    assert_trap(bytecode, Trap::DivideByZero);
}

#[rstest]
#[case::inc(0x25, 41, 42)]
#[case::dec(0x26, 43, 42)]
#[case::dec_zero(0x26, 0, u64::MAX)]
#[case::not_zero(0x33, 0, 1)]
#[case::not_non_zero(0x33, 9, 0)]
fn execute_when_unary_op_then_expected(#[case] op: u8, #[case] value: u8, #[case] expected: u64) {
    assert_eq!(run_bytes(vec![0x03, value, op]).stack, vec![expected]);
}

proptest! {
    #[test]
    fn execute_when_add_any_values_then_wrapping_sum(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(apply(b, a, Opcode::Add), vec![b.wrapping_add(a)]);
    }

    #[test]
    fn execute_when_lt_any_values_then_matches_unsigned_order(a in any::<u64>(), b in any::<u64>()) {
        prop_assert_eq!(apply(b, a, Opcode::Lt), vec![(b < a) as u64]);
    }
}
