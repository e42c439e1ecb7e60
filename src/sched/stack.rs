//! Thread stacks in the layout the current thread locator relies on.
//!
//! ```text
//! top         -> +------------------+  base + STACK_SIZE
//!                | initial frame    |
//!                | ...grows down... |
//!                |                  |
//! base + 8    -> +------------------+
//!                | back-pointer     |  reserved word
//! base        -> +------------------+  aligned to STACK_SIZE
//!                | guard page       |  PROT_NONE
//!                +------------------+
//! ```

use std::{ffi, io, mem, ptr};

use super::{Entry, ThreadMd, ThreadPointer, ThreadPtr};
use crate::limits::STACK_SIZE;

#[derive(Debug)]
pub struct Stack {
    /// Lowest address of the mapping, start of the guard page.
    mapping: *mut u8,
    guard_length: usize,
}

impl Stack {
    /// Maps a `STACK_SIZE` aligned thread stack with an unset back-pointer.
    /// Demand paging ensures that physical memory is allocated only as necessary, during a page fault.
    /// The stack is protected from running past its base using a guard page.
    pub fn new() -> crate::Result<Self> {
        let page_size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) as usize };
        if STACK_SIZE % page_size != 0 {
            return Err(crate::Error::PageSize { page_size });
        }

        // over-allocate so an aligned window with a guard page below it always fits
        let length = page_size + 2 * STACK_SIZE;

        // kernel allocates an unused block of virtual memory
        let pointer = unsafe {
            libc::mmap(
                ptr::null_mut(),
                length,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if pointer == libc::MAP_FAILED {
            let error = io::Error::last_os_error();
            return Err(crate::Error::Map(error));
        }

        let start = pointer as usize;
        let base = (start + page_size).next_multiple_of(STACK_SIZE);
        let mapping = base - page_size;
        let end = base + STACK_SIZE;

        // return both slack regions, only munmap on a page aligned range
        unsafe {
            if mapping > start {
                libc::munmap(start as *mut ffi::c_void, mapping - start);
            }
            if start + length > end {
                libc::munmap(end as *mut ffi::c_void, start + length - end);
            }
        }

        // if guarding memory goes wrong then mmap gets cleaned up in Stack's drop
        let mut stack = Stack {
            mapping: mapping as *mut u8,
            guard_length: page_size,
        };

        // located at the lowest addresses since the stack grows downward
        let result = unsafe { libc::mprotect(mapping as *mut ffi::c_void, page_size, libc::PROT_NONE) };
        if result == -1 {
            let error = io::Error::last_os_error();
            return Err(crate::Error::Guard(error));
        }

        stack.set_back_pointer(ThreadPtr::null());
        log::trace!("mapped thread stack {:#x}..{:#x}", base, end);

        Ok(stack)
    }

    /// Lowest address of the stack, holds the back-pointer.
    pub fn base(&self) -> *mut u8 {
        // safety: part of same allocation, can't overflow
        unsafe { self.mapping.add(self.guard_length) }
    }

    /// One past the highest address of the stack, where the first frame starts.
    pub fn top(&self) -> *mut u8 {
        // safety: part of same allocation, can't overflow
        unsafe { self.base().add(STACK_SIZE) }
    }

    pub fn contains(&self, address: usize) -> bool {
        (self.base() as usize..self.top() as usize).contains(&address)
    }

    pub fn back_pointer(&self) -> ThreadPtr {
        unsafe { (self.base() as *const ThreadPtr).read() }
    }

    /// Points the locator at [thread] for all code running on this stack.
    pub fn set_back_pointer(&mut self, thread: ThreadPtr) {
        unsafe { (self.base() as *mut ThreadPtr).write(thread) }
    }

    /// Fulfills everything a thread needs before its first switch in:
    /// the back-pointer to [thread] and a descriptor that calls [entry] with [arg].
    ///
    /// The returned descriptor must be switched to at most once per suspension,
    /// and the stack must outlive the thread.
    pub fn prepare(&mut self, thread: ThreadPtr, entry: Entry, arg: *mut (), thread_pointer: ThreadPointer) -> ThreadMd {
        self.set_back_pointer(thread);
        // safety: top is page aligned and the frame is far above the back-pointer word
        unsafe { ThreadMd::prepare(self.top(), entry, arg, thread_pointer) }
    }
}

impl Drop for Stack {
    fn drop(&mut self) {
        let length = self.guard_length + STACK_SIZE;
        let result = unsafe { libc::munmap(self.mapping as *mut ffi::c_void, length) };
        assert_eq!(result, 0);
        log::trace!("unmapped thread stack {:p}", self.base());
    }
}

const _: () = assert!(STACK_SIZE > 2 * mem::size_of::<usize>() + 16);
