use crate::error::Trap;
use crate::value::Slot;

/// Bounded operand stack.
///
/// Every operation that reads or removes cells takes the floor of the
/// current call frame and refuses to touch cells below it.
pub struct OperandStack {
    data: Vec<Slot>,
    max_depth: usize,
}

impl OperandStack {
    /// Creates a new operand stack with the given maximum depth.
    pub fn new(max_depth: usize) -> Self {
        OperandStack {
            data: Vec::new(),
            max_depth,
        }
    }

    pub fn height(&self) -> usize {
        self.data.len()
    }

    /// Returns the cells from bottom to top.
    pub fn as_slice(&self) -> &[Slot] {
        &self.data
    }

    /// Pushes a slot onto the stack.
    pub fn push(&mut self, slot: Slot) -> Result<(), Trap> {
        if self.data.len() >= self.max_depth {
            return Err(Trap::StackOverflow);
        }
        self.data.push(slot);
        Ok(())
    }

    /// Pops a slot from the stack.
    pub fn pop(&mut self, floor: usize) -> Result<Slot, Trap> {
        self.check(floor, 1)?;
        self.data.pop().ok_or(Trap::StackUnderflow)
    }

    /// Removes the top `n` cells.
    pub fn drop_n(&mut self, floor: usize, n: usize) -> Result<(), Trap> {
        self.check(floor, n)?;
        self.data.truncate(self.data.len() - n);
        Ok(())
    }

    /// Returns the cell `depth` places below the top without removing it.
    pub fn peek(&self, floor: usize, depth: usize) -> Result<Slot, Trap> {
        self.check(floor, depth.saturating_add(1))?;
        Ok(self.data[self.data.len() - 1 - depth])
    }

    /// Pushes copies of the `n` cells that start `offset` cells below the top.
    pub fn dup_n(&mut self, floor: usize, offset: usize, n: usize) -> Result<(), Trap> {
        if offset < n {
            return Err(Trap::InvalidSize { offset, count: n });
        }
        self.check(floor, offset)?;
        if n > self.max_depth - self.data.len() {
            return Err(Trap::StackOverflow);
        }
        let start = self.data.len() - offset;
        self.data.extend_from_within(start..start + n);
        Ok(())
    }

    /// Swaps the top two groups of `n` cells, keeping the order within each.
    pub fn swap_n(&mut self, floor: usize, n: usize) -> Result<(), Trap> {
        let total = n.checked_mul(2).ok_or(Trap::StackUnderflow)?;
        self.check(floor, total)?;
        let start = self.data.len() - total;
        let (lower, upper) = self.data[start..].split_at_mut(n);
        lower.swap_with_slice(upper);
        Ok(())
    }

    /// Moves the third cell from the top to the top: `[c b a]` becomes `[b a c]`.
    pub fn rotate(&mut self, floor: usize) -> Result<(), Trap> {
        self.check(floor, 3)?;
        let start = self.data.len() - 3;
        self.data[start..].rotate_left(1);
        Ok(())
    }

    /// Checks that `n` cells exist above `floor`.
    fn check(&self, floor: usize, n: usize) -> Result<(), Trap> {
        let height = self.data.len();
        if n > height {
            return Err(Trap::StackUnderflow);
        }
        if height - n < floor {
            return Err(Trap::OutOfFrame { height, floor });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stack_of(values: &[u64]) -> OperandStack {
        let mut stack = OperandStack::new(16);
        for &v in values {
            stack.push(Slot::new(v)).unwrap();
        }
        stack
    }

    fn values(stack: &OperandStack) -> Vec<u64> {
        stack.as_slice().iter().map(|s| s.get()).collect()
    }

    #[test]
    fn stack_push_when_exceeds_max_depth_then_stack_overflow() {
        let mut stack = OperandStack::new(1);
        stack.push(Slot::new(1)).unwrap();

        assert_eq!(stack.push(Slot::new(2)), Err(Trap::StackOverflow));
    }

    #[test]
    fn stack_pop_when_empty_then_stack_underflow() {
        let mut stack = OperandStack::new(4);

        assert_eq!(stack.pop(0), Err(Trap::StackUnderflow));
    }

    #[test]
    fn stack_push_pop_when_values_pushed_then_lifo_order() {
        let mut stack = stack_of(&[10, 20]);

        assert_eq!(stack.pop(0).unwrap().get(), 20);
        assert_eq!(stack.pop(0).unwrap().get(), 10);
    }

    #[test]
    fn stack_pop_when_at_floor_then_out_of_frame() {
        let mut stack = stack_of(&[1, 2]);

        assert_eq!(
            stack.pop(2),
            Err(Trap::OutOfFrame {
                height: 2,
                floor: 2
            })
        );
        assert_eq!(stack.height(), 2);
    }

    #[test]
    fn stack_peek_when_below_floor_then_out_of_frame() {
        let stack = stack_of(&[1, 2, 3]);

        assert_eq!(stack.peek(1, 1).unwrap().get(), 2);
        assert!(matches!(stack.peek(2, 1), Err(Trap::OutOfFrame { .. })));
    }

    #[test]
    fn stack_rotate_when_three_cells_then_third_moves_to_top() {
        let mut stack = stack_of(&[1, 2, 3]);

        stack.rotate(0).unwrap();

        assert_eq!(values(&stack), vec![2, 3, 1]);
    }

    #[test]
    fn stack_swap_n_when_two_groups_then_groups_exchanged() {
        let mut stack = stack_of(&[9, 1, 2, 3, 4]);

        stack.swap_n(0, 2).unwrap();

        assert_eq!(values(&stack), vec![9, 3, 4, 1, 2]);
    }

    #[test]
    fn stack_dup_n_when_offset_then_copies_group() {
        let mut stack = stack_of(&[1, 2, 3]);

        stack.dup_n(0, 3, 2).unwrap();

        assert_eq!(values(&stack), vec![1, 2, 3, 1, 2]);
    }

    #[test]
    fn stack_dup_n_when_offset_less_than_count_then_invalid_size() {
        let mut stack = stack_of(&[1, 2, 3]);

        assert_eq!(
            stack.dup_n(0, 1, 2),
            Err(Trap::InvalidSize {
                offset: 1,
                count: 2
            })
        );
    }

    #[test]
    fn stack_drop_n_when_more_than_height_then_underflow() {
        let mut stack = stack_of(&[1, 2]);

        assert_eq!(stack.drop_n(0, 3), Err(Trap::StackUnderflow));
        stack.drop_n(0, 2).unwrap();
        assert_eq!(stack.height(), 0);
    }
}
