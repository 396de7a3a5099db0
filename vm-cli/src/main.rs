use std::path::PathBuf;

use clap::Parser;
use stackvm_vm::{StringMode, VmOptions};

mod cli;
mod disassemble;
mod logger;

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[command(name = "stackvm", about = "Assembler and virtual machine for stackvm bytecode")]
struct Args {
    /// Turn on verbose logging. Repeat to increase verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Sets the logging to write to a file.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Selects the subcommand.
    #[command(subcommand)]
    action: Action,
}

#[derive(clap::Subcommand, Debug)]
enum Action {
    /// Assembles a source file and executes it.
    Asm {
        /// Path to the assembler source file.
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Executes a raw program file.
    Bin {
        /// Path to the program file.
        file: PathBuf,

        #[command(flatten)]
        run: RunArgs,
    },
    /// Assembles a source file and writes the raw program.
    Build {
        /// Path to the assembler source file.
        file: PathBuf,

        /// Path of the program file to write.
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Prints the instructions of a program as JSON.
    Disassemble {
        /// Path to the program file, or to a source file with `--source`.
        file: PathBuf,

        /// Treat the input as assembler source.
        #[arg(long)]
        source: bool,
    },
    /// Prints the version number of the virtual machine.
    Version,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Maximum number of cells on the operand stack.
    #[arg(long, default_value_t = VmOptions::DEFAULT_MAX_STACK_DEPTH)]
    stack_depth: usize,

    /// Maximum number of nested calls, including the top level.
    #[arg(long, default_value_t = VmOptions::DEFAULT_MAX_CALL_DEPTH)]
    call_depth: usize,

    /// Copy string literals out of the program instead of borrowing them.
    #[arg(long)]
    copy_strings: bool,
}

impl From<RunArgs> for VmOptions {
    fn from(args: RunArgs) -> Self {
        VmOptions {
            max_stack_depth: args.stack_depth,
            max_call_depth: args.call_depth,
            string_mode: if args.copy_strings {
                StringMode::Copy
            } else {
                StringMode::Borrow
            },
        }
    }
}

pub fn main() -> Result<(), String> {
    let args = Args::parse();

    logger::configure(args.verbose, args.log_file)?;

    match args.action {
        Action::Asm { file, run } => cli::run_source(&file, run.into()),
        Action::Bin { file, run } => cli::run_binary(&file, run.into()),
        Action::Build { file, output } => cli::build(&file, &output),
        Action::Disassemble { file, source } => cli::disassemble(&file, source),
        Action::Version => {
            println!("stackvm version {VERSION}");
            Ok(())
        }
    }
}
