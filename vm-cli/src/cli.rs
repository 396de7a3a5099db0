//! Implements the command line behavior.

use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use log::{info, warn};
use stackvm_container::Program;
use stackvm_vm::{Exit, Vm, VmOptions};

use crate::disassemble;

/// Assembles a source file and executes it.
pub fn run_source(path: &Path, options: VmOptions) -> Result<(), String> {
    let program = assemble_file(path)?;
    execute(&program, options)
}

/// Loads a raw program file and executes it.
pub fn run_binary(path: &Path, options: VmOptions) -> Result<(), String> {
    let program = read_program(path)?;
    execute(&program, options)
}

/// Assembles a source file and writes the raw program to `output`.
pub fn build(path: &Path, output: &Path) -> Result<(), String> {
    let program = assemble_file(path)?;

    let mut file = fs::File::create(output)
        .map_err(|e| format!("Unable to create {}: {e}", output.display()))?;
    program
        .write_to(&mut file)
        .map_err(|e| format!("Unable to write {}: {e}", output.display()))?;

    info!("Wrote {} bytes to {}", program.len(), output.display());
    Ok(())
}

/// Prints the instruction listing of a program file, or of a source file
/// when `source` is set.
pub fn disassemble(path: &Path, source: bool) -> Result<(), String> {
    let program = if source {
        assemble_file(path)?
    } else {
        read_program(path)?
    };

    let doc = disassemble::listing(&program)
        .map_err(|e| format!("Unable to decode {}: {e}", path.display()))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&doc).map_err(|e| e.to_string())?
    );
    Ok(())
}

fn assemble_file(path: &Path) -> Result<Program, String> {
    let source = fs::read_to_string(path)
        .map_err(|e| format!("Unable to read {}: {e}", path.display()))?;
    stackvm_assembler::assemble(&source).map_err(|e| match e.location() {
        Some(_) => format!("{}:{e}", path.display()),
        None => format!("{}: {e}", path.display()),
    })
}

fn read_program(path: &Path) -> Result<Program, String> {
    let mut file =
        fs::File::open(path).map_err(|e| format!("Unable to open {}: {e}", path.display()))?;
    Program::read_from(&mut file)
        .map_err(|e| format!("Unable to read program {}: {e}", path.display()))
}

/// Runs a program with output to stdout until it ends, faults or Ctrl+C.
fn execute(program: &Program, options: VmOptions) -> Result<(), String> {
    let stdout = io::stdout();
    let mut running = Vm::new(options)
        .load(program)
        .start(BufWriter::new(stdout.lock()));

    // Install signal handler for clean shutdown
    let handle = running.stop_handle();
    ctrlc::set_handler(move || handle.request_stop())
        .map_err(|e| format!("Failed to set signal handler: {e}"))?;

    match running.run() {
        Ok(exit) => {
            if exit == Exit::Interrupted {
                warn!("Interrupted at 0x{:04X}", running.pc());
            }
            let mut out = running.stop().into_output();
            out.flush()
                .map_err(|e| format!("Unable to write output: {e}"))
        }
        Err(ctx) => {
            let faulted = running.fault(ctx);
            let err_msg = format!(
                "VM trap: {} at 0x{:04X}",
                faulted.trap(),
                faulted.offset()
            );
            let mut out = faulted.into_output();
            // Output written before the trap is still delivered.
            let _ = out.flush();
            Err(err_msg)
        }
    }
}
