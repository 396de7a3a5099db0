//! Shared test helpers for VM integration tests.

use stackvm_container::Program;
use stackvm_vm::{Exit, FaultContext, Trap, Vm, VmOptions};

/// Final state of a program that ran to completion.
pub struct Outcome {
    pub stack: Vec<u64>,
    pub output: Vec<u8>,
}

#[allow(dead_code)]
impl Outcome {
    pub fn output_str(&self) -> &str {
        std::str::from_utf8(&self.output).unwrap()
    }
}

/// Runs raw bytecode to completion with default options.
#[allow(dead_code)]
pub fn run_bytes(bytecode: Vec<u8>) -> Outcome {
    run(&Program::from_bytes(bytecode))
}

/// Runs a program to completion with default options.
#[allow(dead_code)]
pub fn run(program: &Program) -> Outcome {
    run_with(program, VmOptions::default())
}

/// Runs a program to completion with the given options.
pub fn run_with(program: &Program, options: VmOptions) -> Outcome {
    let mut vm = Vm::new(options).load(program).start(Vec::new());
    assert_eq!(vm.run(), Ok(Exit::Completed));
    let stopped = vm.stop();
    let stack = stopped.stack().iter().map(|s| s.get()).collect();
    Outcome {
        stack,
        output: stopped.into_output(),
    }
}

/// Runs a program that must fault and returns the fault.
#[allow(dead_code)]
pub fn run_to_fault(program: &Program, options: VmOptions) -> FaultContext {
    let mut vm = Vm::new(options).load(program).start(Vec::new());
    match vm.run() {
        Err(ctx) => ctx,
        Ok(exit) => panic!("expected a trap but the run ended with {exit:?}"),
    }
}

/// Asserts that running raw bytecode produces a specific trap.
#[allow(dead_code)]
pub fn assert_trap(bytecode: Vec<u8>, expected: Trap) {
    let ctx = run_to_fault(&Program::from_bytes(bytecode), VmOptions::default());
    assert_eq!(ctx.trap, expected);
}
