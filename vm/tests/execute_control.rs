//! Integration tests for jumps, calls and call frames.

mod common;

use common::{assert_trap, run, run_to_fault};
use stackvm_container::{Opcode, ProgramBuilder};
use stackvm_vm::{Step, Trap, Vm, VmOptions};

#[test]
fn execute_when_jump_if_true_and_condition_set_then_jumps() {
    let mut b = ProgramBuilder::new();
    let taken = b.create_label().unwrap();
    b.emit_push(1);
    b.emit_jump_if_true(taken).unwrap();
    b.emit_push(100);
    b.emit_plain(Opcode::Exit);
    b.link_label(taken).unwrap();
    b.emit_push(7);

    assert_eq!(run(&b.finalize().unwrap()).stack, vec![7]);
}

#[test]
fn execute_when_jump_if_false_and_condition_set_then_falls_through() {
    let mut b = ProgramBuilder::new();
    let taken = b.create_label().unwrap();
    b.emit_push(1);
    b.emit_jump_if_false(taken).unwrap();
    b.emit_push(100);
    b.emit_plain(Opcode::Exit);
    b.link_label(taken).unwrap();
    b.emit_push(7);

    assert_eq!(run(&b.finalize().unwrap()).stack, vec![100]);
}

#[test]
fn execute_when_jump_past_end_then_halts() {
    let mut b = ProgramBuilder::new();
    b.emit_push(1000);
    b.emit_plain(Opcode::Jmp);
    b.emit_push(1);

    assert!(run(&b.finalize().unwrap()).stack.is_empty());
}

#[test]
fn execute_when_subroutine_returns_value_then_value_survives_return() {
    let mut b = ProgramBuilder::new();
    let five = b.create_label().unwrap();
    b.emit_call(five).unwrap();
    b.emit_plain(Opcode::Debug);
    b.emit_plain(Opcode::Exit);
    b.link_label(five).unwrap();
    b.emit_push(5);
    b.emit_plain(Opcode::Ret);

    let outcome = run(&b.finalize().unwrap());

    assert_eq!(outcome.output_str(), "5");
    assert!(outcome.stack.is_empty());
}

#[test]
fn execute_when_callee_pops_below_frame_then_out_of_frame() {
    let mut b = ProgramBuilder::new();
    let greedy = b.create_label().unwrap();
    b.emit_push(1);
    b.emit_call(greedy).unwrap();
    b.emit_plain(Opcode::Exit);
    b.link_label(greedy).unwrap();
    b.emit_plain(Opcode::Drop);
    b.emit_plain(Opcode::Ret);
    let program = b.finalize().unwrap();

    let ctx = run_to_fault(&program, VmOptions::default());

    assert_eq!(ctx.trap, Trap::OutOfFrame { height: 1, floor: 1 });
    // PSH, PSH 'greedy, CLL, EXT precede the DRP.
    assert_eq!(ctx.offset, 9 + 9 + 1 + 1);
}

#[test]
fn execute_when_callee_takes_arguments_then_can_consume_them() {
    let mut b = ProgramBuilder::new();
    let add2 = b.create_label().unwrap();
    b.emit_push(2);
    b.emit_push(3);
    b.emit_call(add2).unwrap();
    b.emit_plain(Opcode::Debug);
    b.emit_plain(Opcode::Exit);
    b.link_label(add2).unwrap();
    b.emit_push(2);
    b.emit_plain(Opcode::TakeArgs);
    b.emit_plain(Opcode::Add);
    b.emit_plain(Opcode::Ret);

    let outcome = run(&b.finalize().unwrap());

    assert_eq!(outcome.output_str(), "5");
    assert!(outcome.stack.is_empty());
}

#[test]
fn execute_when_take_args_after_push_then_arguments_unavailable() {
    let mut b = ProgramBuilder::new();
    let f = b.create_label().unwrap();
    b.emit_push(1);
    b.emit_call(f).unwrap();
    b.link_label(f).unwrap();
    b.emit_push(9);
    b.emit_push(1);
    b.emit_plain(Opcode::TakeArgs);

    let ctx = run_to_fault(&b.finalize().unwrap(), VmOptions::default());

    assert_eq!(ctx.trap, Trap::ArgumentsUnavailable);
}

#[test]
fn execute_when_take_args_exceeds_caller_cells_then_arguments_unavailable() {
    let mut b = ProgramBuilder::new();
    let f = b.create_label().unwrap();
    b.emit_push(1);
    b.emit_call(f).unwrap();
    b.link_label(f).unwrap();
    b.emit_push(2);
    b.emit_plain(Opcode::TakeArgs);

    let ctx = run_to_fault(&b.finalize().unwrap(), VmOptions::default());

    assert_eq!(ctx.trap, Trap::ArgumentsUnavailable);
}

#[test]
fn execute_when_return_at_top_level_then_call_stack_underflow() {
    assert_trap(vec![0x44], Trap::CallStackUnderflow);
}

#[test]
fn execute_when_unbounded_recursion_then_call_stack_overflow() {
    let mut b = ProgramBuilder::new();
    let f = b.create_label().unwrap();
    b.link_label(f).unwrap();
    b.emit_call(f).unwrap();
    let options = VmOptions {
        max_call_depth: 4,
        ..VmOptions::default()
    };

    let ctx = run_to_fault(&b.finalize().unwrap(), options);

    assert_eq!(ctx.trap, Trap::CallStackOverflow);
}

#[test]
fn step_when_call_and_return_then_call_depth_tracks_frames() {
    let mut b = ProgramBuilder::new();
    let f = b.create_label().unwrap();
    b.emit_call(f).unwrap();
    b.emit_plain(Opcode::Exit);
    b.link_label(f).unwrap();
    b.emit_plain(Opcode::Ret);
    let program = b.finalize().unwrap();
    let mut vm = Vm::default().load(&program).start(Vec::new());

    vm.step().unwrap(); // PSH 'f
    vm.step().unwrap(); // CLL
    assert_eq!(vm.call_depth(), 2);
    assert_eq!(vm.call_frames()[1].callee, 11);
    assert_eq!(vm.call_frames()[1].return_site, 10);
    assert_eq!(vm.pc(), 11);

    vm.step().unwrap(); // RET
    assert_eq!(vm.call_depth(), 1);
    assert_eq!(vm.pc(), 10);

    assert_eq!(vm.step(), Ok(Step::Continue)); // EXT
    assert_eq!(vm.step(), Ok(Step::Halted));
}
