//! Shared test helpers for assembler integration tests.

use std::path::PathBuf;

use stackvm_assembler::assemble;

/// Assembles `source`, executes it and returns what it printed.
pub fn assemble_and_run(source: &str) -> String {
    let program = assemble(source).unwrap();
    let mut out = Vec::new();
    stackvm_vm::execute(&program, &mut out).unwrap();
    String::from_utf8(out).unwrap()
}

/// Reads a demo program from the workspace `demos` directory.
#[allow(dead_code)]
pub fn demo_source(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("..");
    path.push("demos");
    path.push(name);
    std::fs::read_to_string(path).unwrap()
}
