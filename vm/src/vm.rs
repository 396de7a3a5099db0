use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace};
use stackvm_container::{Opcode, Operand, OperandWidth, Program};

use crate::error::Trap;
use crate::frame::{CallStack, StackFrame};
use crate::options::{StringMode, VmOptions};
use crate::stack::OperandStack;
use crate::strings::StringTable;
use crate::value::Slot;

/// A cloneable handle for requesting the VM to stop.
/// Used by signal handlers to stop the VM from another context.
#[derive(Clone)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
}

impl StopHandle {
    /// Requests the VM to stop before its next instruction.
    pub fn request_stop(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

/// Context for a fault that occurred during execution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultContext {
    pub trap: Trap,
    /// Offset of the instruction that faulted.
    pub offset: usize,
}

impl fmt::Display for FaultContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at 0x{:04X}", self.trap, self.offset)
    }
}

/// Outcome of executing a single instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    /// An instruction executed and more may follow.
    Continue,
    /// A breakpoint at `offset` executed and dumped the VM state.
    Breakpoint { offset: usize },
    /// The program counter is at or past the end of the program.
    Halted,
}

/// How [`VmRunning::run`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exit {
    /// The program ran to its end.
    Completed,
    /// A stop was requested through a [`StopHandle`].
    Interrupted,
}

/// A newly created VM with no loaded program.
///
/// The only valid operation is [`load`](Vm::load), which consumes
/// this value and produces a [`VmReady`].
pub struct Vm {
    options: VmOptions,
}

impl Vm {
    /// Creates a new VM.
    pub fn new(options: VmOptions) -> Self {
        Vm { options }
    }

    /// Loads a program. The program must outlive the VM, since borrowed
    /// strings point into its bytes.
    pub fn load(self, program: &Program) -> VmReady<'_> {
        debug!(
            "Loaded program of {} bytes (stack depth {}, call depth {}, {:?} strings)",
            program.len(),
            self.options.max_stack_depth,
            self.options.max_call_depth,
            self.options.string_mode
        );
        VmReady {
            code: program.as_bytes(),
            options: self.options,
        }
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new(VmOptions::default())
    }
}

/// A VM with a loaded program, ready to start execution.
///
/// Call [`start`](VmReady::start) to begin execution.
pub struct VmReady<'p> {
    code: &'p [u8],
    options: VmOptions,
}

impl<'p> VmReady<'p> {
    /// Starts the VM with `out` receiving everything the program prints.
    /// Consumes the ready VM and returns a running VM.
    pub fn start<W: Write>(self, out: W) -> VmRunning<'p, W> {
        VmRunning {
            code: self.code,
            pc: 0,
            stack: OperandStack::new(self.options.max_stack_depth),
            calls: CallStack::new(self.options.max_call_depth),
            strings: StringTable::new(),
            string_mode: self.options.string_mode,
            out,
            stop_flag: Arc::new(AtomicBool::new(false)),
        }
    }
}

/// A VM that is actively executing a program.
///
/// Call [`step`](VmRunning::step) or [`run`](VmRunning::run) to execute.
/// On a trap, the caller should transition to [`VmFaulted`].
pub struct VmRunning<'p, W: Write> {
    code: &'p [u8],
    pc: usize,
    stack: OperandStack,
    calls: CallStack,
    strings: StringTable,
    string_mode: StringMode,
    out: W,
    stop_flag: Arc<AtomicBool>,
}

impl<'p, W: Write> VmRunning<'p, W> {
    /// Runs until the program ends, faults or a stop is requested.
    /// Breakpoints dump the VM state and execution continues.
    pub fn run(&mut self) -> Result<Exit, FaultContext> {
        loop {
            if self.stop_requested() {
                debug!("Stop requested at 0x{:04X}", self.pc);
                return Ok(Exit::Interrupted);
            }
            if self.step()? == Step::Halted {
                debug!("Program completed");
                return Ok(Exit::Completed);
            }
        }
    }

    /// Executes the instruction at the program counter.
    pub fn step(&mut self) -> Result<Step, FaultContext> {
        let offset = self.pc;
        if offset >= self.code.len() {
            return Ok(Step::Halted);
        }
        self.execute(offset)
            .map_err(|trap| FaultContext { trap, offset })
    }

    /// Returns the program counter.
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Returns the operand stack from bottom to top.
    pub fn stack(&self) -> &[Slot] {
        self.stack.as_slice()
    }

    /// Returns the number of call frames, including the top-level frame.
    pub fn call_depth(&self) -> usize {
        self.calls.depth()
    }

    pub fn call_frames(&self) -> &[StackFrame] {
        self.calls.frames()
    }

    pub fn is_halted(&self) -> bool {
        self.pc >= self.code.len()
    }

    /// Returns a cloneable handle that can request the VM to stop.
    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            flag: self.stop_flag.clone(),
        }
    }

    /// Returns true if a stop has been requested.
    pub fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }

    /// Requests the VM to stop before the next instruction.
    pub fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Transitions to the stopped state (clean shutdown).
    pub fn stop(self) -> VmStopped<W> {
        VmStopped {
            pc: self.pc,
            stack: self.stack.as_slice().to_vec(),
            out: self.out,
        }
    }

    /// Transitions to the faulted state (trap occurred).
    pub fn fault(self, ctx: FaultContext) -> VmFaulted<W> {
        VmFaulted {
            trap: ctx.trap,
            offset: ctx.offset,
            stack: self.stack.as_slice().to_vec(),
            out: self.out,
        }
    }

    fn execute(&mut self, offset: usize) -> Result<Step, Trap> {
        let byte = self.code[offset];
        self.pc = offset + 1;
        let op = Opcode::from_u8(byte).ok_or(Trap::InvalidInstruction(byte))?;
        trace!("0x{offset:04X} {op}");

        match op {
            Opcode::Nop => {}
            Opcode::Push => {
                let value = self.read_operand(OperandWidth::U64)?;
                self.push(value)?;
            }
            Opcode::Push4 => {
                let value = self.read_operand(OperandWidth::U32)?;
                self.push(value)?;
            }
            Opcode::Push8 => {
                let value = self.read_operand(OperandWidth::U8)?;
                self.push(value)?;
            }
            Opcode::Str => {
                let len = self.read_operand(OperandWidth::U64)?;
                let start = self.pc;
                let end = usize::try_from(len)
                    .ok()
                    .and_then(|len| start.checked_add(len))
                    .filter(|&end| end <= self.code.len())
                    .ok_or(Trap::TruncatedOperand)?;
                let index = self
                    .strings
                    .intern(offset, start..end, self.code, self.string_mode);
                self.pc = end;
                self.push(index)?;
            }
            Opcode::Drop => {
                self.pop()?;
            }
            Opcode::Dup => {
                let top = self.stack.peek(self.calls.floor(), 0)?;
                self.stack.push(top)?;
            }
            Opcode::Swap => {
                self.stack.swap_n(self.calls.floor(), 1)?;
            }
            Opcode::Rot => {
                self.stack.rotate(self.calls.floor())?;
            }
            Opcode::Over => {
                let second = self.stack.peek(self.calls.floor(), 1)?;
                self.stack.push(second)?;
            }
            Opcode::DropN => {
                let n = self.read_count()?;
                self.stack.drop_n(self.calls.floor(), n)?;
            }
            Opcode::DupN => {
                let offset = self.read_count()?;
                let n = self.read_count()?;
                self.stack.dup_n(self.calls.floor(), offset, n)?;
            }
            Opcode::SwapN => {
                let n = self.read_count()?;
                self.stack.swap_n(self.calls.floor(), n)?;
            }
            Opcode::Add => self.binary(|b, a| Ok(b.wrapping_add(a)))?,
            Opcode::Sub => self.binary(|b, a| Ok(b.wrapping_sub(a)))?,
            Opcode::Mul => self.binary(|b, a| Ok(b.wrapping_mul(a)))?,
            Opcode::Div => self.binary(|b, a| b.checked_div(a).ok_or(Trap::DivideByZero))?,
            Opcode::Mod => self.binary(|b, a| b.checked_rem(a).ok_or(Trap::DivideByZero))?,
            Opcode::Inc => {
                let value = self.pop()?;
                self.push(value.wrapping_add(1))?;
            }
            Opcode::Dec => {
                let value = self.pop()?;
                self.push(value.wrapping_sub(1))?;
            }
            Opcode::Eq => self.compare(|b, a| b == a)?,
            Opcode::Lt => self.compare(|b, a| b < a)?,
            Opcode::Gt => self.compare(|b, a| b > a)?,
            Opcode::Not => {
                let value = Slot::new(self.pop()?);
                self.stack.push(Slot::from_bool(!value.is_true()))?;
            }
            Opcode::Or => self.compare(|b, a| b != 0 || a != 0)?,
            Opcode::Jmp => {
                let target = self.pop()?;
                self.jump(target);
            }
            Opcode::JmpIfTrue => {
                let target = self.pop()?;
                if Slot::new(self.pop()?).is_true() {
                    self.jump(target);
                }
            }
            Opcode::JmpIfFalse => {
                let target = self.pop()?;
                if !Slot::new(self.pop()?).is_true() {
                    self.jump(target);
                }
            }
            Opcode::Call => {
                let target = self.pop()?;
                let frame = StackFrame {
                    return_site: self.pc,
                    callee: usize::try_from(target).unwrap_or(usize::MAX),
                    floor: self.stack.height(),
                };
                self.calls.push(frame)?;
                trace!("Calling 0x{target:04X} from 0x{offset:04X}");
                self.jump(target);
            }
            Opcode::Ret => {
                let frame = self.calls.pop()?;
                self.pc = frame.return_site;
            }
            Opcode::TakeArgs => {
                let n = self.pop()?;
                let n = usize::try_from(n).map_err(|_| Trap::ArgumentsUnavailable)?;
                self.calls.adopt_arguments(self.stack.height(), n)?;
            }
            Opcode::PrintStr => {
                let index = self.pop()?;
                let bytes = self.strings.get(index, self.code)?;
                self.out
                    .write_all(bytes)
                    .map_err(|e| Trap::OutputFailed(e.kind()))?;
            }
            Opcode::PrintChar => {
                let value = self.pop()?;
                self.write(&[value as u8])?;
            }
            Opcode::Debug => {
                let value = self.pop()?;
                self.write(value.to_string().as_bytes())?;
            }
            Opcode::Load | Opcode::Deref | Opcode::Deref8 => {
                return Err(Trap::Unimplemented(op));
            }
            Opcode::Breakpoint => {
                self.dump_state()?;
                return Ok(Step::Breakpoint { offset });
            }
            Opcode::Exit => {
                self.pc = self.code.len();
            }
        }

        Ok(Step::Continue)
    }

    fn push(&mut self, value: u64) -> Result<(), Trap> {
        self.stack.push(Slot::new(value))
    }

    fn pop(&mut self) -> Result<u64, Trap> {
        self.stack.pop(self.calls.floor()).map(Slot::get)
    }

    /// Pops `a` then `b` and pushes `f(b, a)`.
    fn binary(&mut self, f: impl FnOnce(u64, u64) -> Result<u64, Trap>) -> Result<(), Trap> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.push(f(b, a)?)
    }

    /// Pops `a` then `b` and pushes 1 if `f(b, a)` holds, else 0.
    fn compare(&mut self, f: impl FnOnce(u64, u64) -> bool) -> Result<(), Trap> {
        let a = self.pop()?;
        let b = self.pop()?;
        self.stack.push(Slot::from_bool(f(b, a)))
    }

    /// Targets past the end of the program halt it.
    fn jump(&mut self, target: u64) {
        self.pc = usize::try_from(target).unwrap_or(usize::MAX);
    }

    fn read_operand(&mut self, width: OperandWidth) -> Result<u64, Trap> {
        let operand = self
            .code
            .get(self.pc..)
            .and_then(|rest| Operand::read_le(width, rest))
            .ok_or(Trap::TruncatedOperand)?;
        self.pc += width.bytes();
        Ok(operand.value())
    }

    /// Reads a u64 cell count. Counts that do not fit in memory cannot be
    /// satisfied by the stack.
    fn read_count(&mut self) -> Result<usize, Trap> {
        let value = self.read_operand(OperandWidth::U64)?;
        usize::try_from(value).map_err(|_| Trap::StackUnderflow)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Trap> {
        self.out
            .write_all(bytes)
            .map_err(|e| Trap::OutputFailed(e.kind()))
    }

    /// Writes the operand stack and call stack to the output.
    fn dump_state(&mut self) -> Result<(), Trap> {
        let mut dump = String::from("STACK:\n");
        for (i, slot) in self.stack.as_slice().iter().enumerate() {
            dump.push_str(&format!("[{i:03}] {slot}\n"));
        }
        dump.push_str("BOTTOM OF STACK\nCALL STACK:\n");
        for frame in self.calls.frames().iter().rev() {
            dump.push_str(&format!(
                "Frame 0x{:x} (called from 0x{:x})\n",
                frame.callee, frame.return_site
            ));
        }
        dump.push_str("-------\n");
        self.write(dump.as_bytes())
    }
}

/// A VM that has been cleanly stopped.
pub struct VmStopped<W> {
    pc: usize,
    stack: Vec<Slot>,
    out: W,
}

impl<W> VmStopped<W> {
    pub fn pc(&self) -> usize {
        self.pc
    }

    /// Returns the operand stack as it was when the VM stopped.
    pub fn stack(&self) -> &[Slot] {
        &self.stack
    }

    /// Returns the output sink.
    pub fn into_output(self) -> W {
        self.out
    }
}

/// A VM that has stopped due to a trap.
pub struct VmFaulted<W> {
    trap: Trap,
    offset: usize,
    stack: Vec<Slot>,
    out: W,
}

impl<W> VmFaulted<W> {
    /// Returns the trap that caused the fault.
    pub fn trap(&self) -> &Trap {
        &self.trap
    }

    /// Returns the offset of the instruction that faulted.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the operand stack as it was when the trap occurred.
    pub fn stack(&self) -> &[Slot] {
        &self.stack
    }

    /// Returns the output sink.
    pub fn into_output(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackvm_container::ProgramBuilder;

    fn stack_values<W: Write>(vm: &VmRunning<'_, W>) -> Vec<u64> {
        vm.stack().iter().map(|s| s.get()).collect()
    }

    #[test]
    fn vm_run_when_add_then_sum_on_stack() {
        #[rustfmt::skip]
        let bytecode: Vec<u8> = vec![
            0x03, 0x03,   // PS8 3
            0x03, 0x04,   // PS8 4
            0x20,         // ADD
        ];
        let program = Program::from_bytes(bytecode);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        assert_eq!(vm.run(), Ok(Exit::Completed));
        assert_eq!(stack_values(&vm), vec![7]);
    }

    #[test]
    fn vm_step_when_end_of_program_then_halted() {
        let program = Program::from_bytes(vec![0x00]);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        assert_eq!(vm.step(), Ok(Step::Continue));
        assert_eq!(vm.step(), Ok(Step::Halted));
        assert!(vm.is_halted());
    }

    #[test]
    fn vm_step_when_invalid_opcode_then_trap_with_offset() {
        let program = Program::from_bytes(vec![0x00, 0x05]);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        let ctx = vm.run().unwrap_err();

        assert_eq!(ctx.trap, Trap::InvalidInstruction(0x05));
        assert_eq!(ctx.offset, 1);
    }

    #[test]
    fn vm_step_when_unimplemented_opcode_then_trap_names_opcode() {
        let program = Program::from_bytes(vec![0x61]);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        let ctx = vm.run().unwrap_err();

        assert_eq!(ctx.trap, Trap::Unimplemented(Opcode::Deref));
        assert_eq!(ctx.to_string(), "unimplemented instruction: REF at 0x0000");
    }

    #[test]
    fn vm_step_when_truncated_push_then_truncated_operand() {
        let program = Program::from_bytes(vec![0x01, 0x01, 0x02]);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        assert_eq!(vm.run().unwrap_err().trap, Trap::TruncatedOperand);
    }

    #[test]
    fn vm_run_when_exit_then_skips_rest() {
        #[rustfmt::skip]
        let bytecode: Vec<u8> = vec![
            0xFF,         // EXT
            0x03, 0x01,   // PS8 1
        ];
        let program = Program::from_bytes(bytecode);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        assert_eq!(vm.run(), Ok(Exit::Completed));
        assert!(vm.stack().is_empty());
        assert_eq!(vm.pc(), 3);
    }

    #[test]
    fn vm_run_when_stop_requested_then_interrupted() {
        // top: PSH 'top JMP
        let mut b = ProgramBuilder::new();
        let top = b.create_label().unwrap();
        b.link_label(top).unwrap();
        b.emit_jump(top).unwrap();
        let program = b.finalize().unwrap();
        let mut vm = Vm::default().load(&program).start(Vec::new());

        vm.stop_handle().request_stop();

        assert!(vm.stop_requested());
        assert_eq!(vm.run(), Ok(Exit::Interrupted));
    }

    #[test]
    fn vm_step_when_breakpoint_then_dumps_state() {
        #[rustfmt::skip]
        let bytecode: Vec<u8> = vec![
            0x03, 0x2A,   // PS8 42
            0xFE,         // BKP
        ];
        let program = Program::from_bytes(bytecode);
        let mut vm = Vm::default().load(&program).start(Vec::new());

        assert_eq!(vm.step(), Ok(Step::Continue));
        assert_eq!(vm.step(), Ok(Step::Breakpoint { offset: 2 }));

        let out = vm.stop().into_output();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "STACK:\n[000] 42\nBOTTOM OF STACK\nCALL STACK:\nFrame 0x0 (called from 0x0)\n-------\n"
        );
    }

    #[test]
    fn vm_stop_when_called_then_returns_stopped() {
        let program = Program::from_bytes(vec![0x03, 0x09]);
        let mut vm = Vm::default().load(&program).start(Vec::new());
        vm.run().unwrap();

        let stopped = vm.stop();

        assert_eq!(stopped.stack(), &[Slot::new(9)]);
        assert_eq!(stopped.pc(), 2);
    }

    #[test]
    fn vm_fault_when_called_then_returns_faulted_with_context() {
        let program = Program::from_bytes(vec![0x10]);
        let mut vm = Vm::default().load(&program).start(Vec::new());
        let ctx = vm.run().unwrap_err();

        let faulted = vm.fault(ctx);

        assert_eq!(*faulted.trap(), Trap::StackUnderflow);
        assert_eq!(faulted.offset(), 0);
        assert!(faulted.stack().is_empty());
    }
}
