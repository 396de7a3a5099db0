use crate::error::Trap;

/// One entry of the call stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StackFrame {
    /// Address execution resumes at after the matching return.
    pub return_site: usize,
    /// Address that was called.
    pub callee: usize,
    /// Operand stack height below which this frame may not pop.
    pub floor: usize,
}

/// Bounded call stack that always holds the top-level frame.
pub struct CallStack {
    frames: Vec<StackFrame>,
    max_depth: usize,
}

impl CallStack {
    pub fn new(max_depth: usize) -> Self {
        CallStack {
            frames: vec![StackFrame {
                return_site: 0,
                callee: 0,
                floor: 0,
            }],
            max_depth,
        }
    }

    /// Number of frames, including the top-level frame.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn frames(&self) -> &[StackFrame] {
        &self.frames
    }

    /// Floor of the innermost frame.
    pub fn floor(&self) -> usize {
        self.frames.last().map_or(0, |frame| frame.floor)
    }

    pub fn push(&mut self, frame: StackFrame) -> Result<(), Trap> {
        if self.frames.len() >= self.max_depth {
            return Err(Trap::CallStackOverflow);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Removes the innermost frame. The top-level frame cannot be removed.
    pub fn pop(&mut self) -> Result<StackFrame, Trap> {
        if self.frames.len() <= 1 {
            return Err(Trap::CallStackUnderflow);
        }
        self.frames.pop().ok_or(Trap::CallStackUnderflow)
    }

    /// Moves the top `n` cells of the caller's region into the innermost
    /// frame by lowering its floor.
    ///
    /// Only allowed while the innermost frame holds no cells of its own.
    pub fn adopt_arguments(&mut self, height: usize, n: usize) -> Result<(), Trap> {
        let [.., caller, current] = self.frames.as_mut_slice() else {
            return Err(Trap::ArgumentsUnavailable);
        };
        if height != current.floor {
            return Err(Trap::ArgumentsUnavailable);
        }
        match height.checked_sub(n) {
            Some(new_floor) if new_floor >= caller.floor => {
                current.floor = new_floor;
                Ok(())
            }
            _ => Err(Trap::ArgumentsUnavailable),
        }
    }
}
