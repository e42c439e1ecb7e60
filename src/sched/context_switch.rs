//! Abstraction over register transfer between threads.
//!
//! Provides an implementation for every CPU architecture.

use std::arch::global_asm;
use std::mem;

use super::{Entry, ThreadMd};

extern "C" {
    /// Executes a context switch.
    ///
    /// Spills callee-saved registers onto the current stack, sets [prev]'s `sp` and `ip`.
    /// Loads [next]'s `sp`, jumps to its `ip`.
    pub(super) fn cothread_jump(prev: *mut ThreadMd, next: *const ThreadMd);

    /// Resume address of a prepared thread, never called directly.
    fn cothread_trampoline();
}

#[cfg(not(target_os = "linux"))]
compile_error!("cothread only supports Linux");

#[cfg(not(any(target_arch = "x86_64", target_arch = "aarch64")))]
compile_error!("cothread only supports x86_64 and aarch64");

#[cfg(target_arch = "x86_64")]
global_asm!(include_str!("assembly/x86_64.s"));

#[cfg(target_arch = "aarch64")]
global_asm!(include_str!("assembly/aarch64.s"));

/// Words the trampoline pops off a prepared stack: argument, then entry.
const INITIAL_FRAME_WORDS: usize = 2;

/// Lays out the first frame below [top] and returns the `sp` and `ip` that start it.
///
/// Both architectures want a 16 byte aligned stack at the entry call.
///
/// # Safety
/// [top] must be the writable, 16 byte aligned end of a stack with room for the frame.
pub(super) unsafe fn initial_frame(top: *mut u8, entry: Entry, arg: *mut ()) -> (usize, usize) {
    debug_assert_eq!(top as usize % 16, 0);

    let frame = (top as *mut usize).sub(INITIAL_FRAME_WORDS);
    frame.write(arg as usize);
    frame.add(1).write(entry as usize);

    (frame as usize, cothread_trampoline as usize)
}

const _: () = assert!(INITIAL_FRAME_WORDS * mem::size_of::<usize>() % 16 == 0);
