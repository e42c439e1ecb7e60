//! Platform limits shared by the stack allocator and the current thread locator.
//!
//! Both sides mask and allocate with [STACK_SIZE], so changing it means rebuilding everything that touches stacks.

/// log2 of the smallest page size a thread stack is laid out for.
pub const PAGE_SHIFT: usize = 12;

/// Smallest page size a thread stack is laid out for.
pub const PAGE_SIZE: usize = 1 << PAGE_SHIFT;

/// Thread stacks span `2^STACK_SIZE_PAGE_ORDER` pages.
#[cfg(not(feature = "large_stacks"))]
pub const STACK_SIZE_PAGE_ORDER: usize = 4;

/// Thread stacks span `2^STACK_SIZE_PAGE_ORDER` pages.
#[cfg(feature = "large_stacks")]
pub const STACK_SIZE_PAGE_ORDER: usize = 8;

/// Size and alignment of every thread stack.
pub const STACK_SIZE: usize = PAGE_SIZE * (1 << STACK_SIZE_PAGE_ORDER);

const _: () = assert!(STACK_SIZE.is_power_of_two());
const _: () = assert!(STACK_SIZE >= PAGE_SIZE);

/// Mask that clears the offset of an address within its thread stack.
pub(crate) const STACK_MASK: usize = !(STACK_SIZE - 1);
