//! Current thread lookup and context switching.
//!
//! Every thread runs on a [Stack] whose lowest word points at the thread's control structure,
//! so [current_thread] only needs the stack address. [switch_threads] is the single suspension point:
//! it saves the caller into one [ThreadMd] and resumes the thread saved in another.

use std::{mem, ptr};

use crate::limits::STACK_MASK;

mod context_switch;
mod stack;
mod tls;

pub use stack::Stack;

/// Entry point of a prepared thread, called with the argument given to [ThreadMd::prepare].
///
/// There's nothing to return to, a finished thread switches away for the last time instead.
pub type Entry = extern "C" fn(*mut ()) -> !;

/// Opaque pointer to the scheduler's control structure for a thread, as stored in the back-pointer word.
#[repr(transparent)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ThreadPtr(*mut ());

impl ThreadPtr {
    pub const fn null() -> Self {
        ThreadPtr(ptr::null_mut())
    }

    pub const fn new<T>(control: *mut T) -> Self {
        ThreadPtr(control as *mut ())
    }

    pub fn cast<T>(self) -> *mut T {
        self.0 as *mut T
    }

    pub fn is_null(self) -> bool {
        self.0.is_null()
    }
}

/// Thread-local addressing state, `tp` is the TLS base and `tl` its architecture defined companion.
///
/// Saved and restored together, neither is interpreted.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct ThreadPointer {
    pub tp: usize,
    pub tl: usize,
}

impl ThreadPointer {
    pub const ZERO: ThreadPointer = ThreadPointer { tp: 0, tl: 0 };
}

/// Machine state of a suspended thread.
///
/// The layout is shared with the register transfer assembly, don't reorder.
/// Only [switch_threads] writes it once the thread exists, so it's neither `Clone` nor mutable from outside.
#[repr(C)]
#[derive(Debug, Default)]
pub struct ThreadMd {
    sp: usize,
    ip: usize,
    tp: usize,
    tl: usize,
}

const _: () = assert!(mem::size_of::<ThreadMd>() == 4 * mem::size_of::<usize>());
const _: () = assert!(mem::offset_of!(ThreadMd, sp) == 0);
const _: () = assert!(mem::offset_of!(ThreadMd, ip) == mem::size_of::<usize>());
const _: () = assert!(mem::offset_of!(ThreadMd, tp) == 2 * mem::size_of::<usize>());
const _: () = assert!(mem::offset_of!(ThreadMd, tl) == 3 * mem::size_of::<usize>());

impl ThreadMd {
    /// Descriptor of a context that's already running, e.g. the OS thread's original stack.
    /// Its first suspend fills it in.
    pub const fn new() -> Self {
        ThreadMd {
            sp: 0,
            ip: 0,
            tp: 0,
            tl: 0,
        }
    }

    /// Prepares a never-run thread so its first resume calls `entry(arg)` with [thread_pointer] live.
    ///
    /// # Safety
    /// [top] must be the 16 byte aligned upper end of a writable stack that outlives the thread.
    /// For [current_thread] to work on it, the stack must follow the [Stack] layout.
    pub unsafe fn prepare(top: *mut u8, entry: Entry, arg: *mut (), thread_pointer: ThreadPointer) -> Self {
        let (sp, ip) = context_switch::initial_frame(top, entry, arg);
        log::debug!("prepared thread with sp {:#x}, tp {:#x}, tl {:#x}", sp, thread_pointer.tp, thread_pointer.tl);

        ThreadMd {
            sp,
            ip,
            tp: thread_pointer.tp,
            tl: thread_pointer.tl,
        }
    }

    pub fn sp(&self) -> usize {
        self.sp
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn tp(&self) -> usize {
        self.tp
    }

    pub fn tl(&self) -> usize {
        self.tl
    }

    pub fn thread_pointer(&self) -> ThreadPointer {
        ThreadPointer {
            tp: self.tp,
            tl: self.tl,
        }
    }
}

/// Returns the control structure of the running thread.
///
/// Masks the address of a local down to the stack base and reads the back-pointer there.
///
/// # Safety
/// Must run on a [Stack] (or any `STACK_SIZE` sized and aligned region) whose back-pointer has been set.
/// Anywhere else, e.g. the OS thread's original stack, it reads an unrelated word.
#[inline(always)]
pub unsafe fn current_thread() -> ThreadPtr {
    let marker = 0u8;
    locate(ptr::addr_of!(marker) as usize)
}

/// [current_thread] cast to the scheduler's control structure.
///
/// # Safety
/// Same as [current_thread], and the back-pointer must point at a `T`.
#[inline(always)]
pub unsafe fn current<T>() -> *mut T {
    current_thread().cast()
}

#[inline(always)]
unsafe fn locate(stack_address: usize) -> ThreadPtr {
    ((stack_address & STACK_MASK) as *const ThreadPtr).read()
}

/// Suspends the calling thread into [prev] and resumes the thread saved in [next].
///
/// Returns once another switch names [prev] as its `next`, with the caller's registers and thread pointer as they were.
/// [prev] and [next] may be the same descriptor.
///
/// # Safety
/// - [prev] must be the descriptor of the calling thread.
/// - [next] must hold a suspended or freshly prepared thread, not one that's running.
/// - Not reentrant, nothing may interrupt the caller with another switch on this OS thread until it returns.
#[inline(never)]
pub unsafe fn switch_threads(prev: *mut ThreadMd, next: *const ThreadMd) {
    // save before load, prev and next may alias
    let live = tls::read();
    (*prev).tp = live.tp;
    (*prev).tl = live.tl;
    tls::write((*next).thread_pointer());

    context_switch::cothread_jump(prev, next);
}

/// Thread pointer of the running thread.
pub fn thread_pointer() -> ThreadPointer {
    tls::read()
}

/// Sets the thread pointer of a context that wasn't started from a prepared descriptor.
///
/// # Safety
/// Only for the bootstrap context before it first switches away, afterwards [switch_threads] owns the register.
pub unsafe fn install_thread_pointer(thread_pointer: ThreadPointer) {
    tls::write(thread_pointer)
}
