//! Cooperative thread switching core.
//!
//! Two primitives sit at the bottom of a cooperative scheduler:
//! - [current_thread] finds the running thread's control structure by masking the stack address,
//!   every thread stack is [STACK_SIZE] bytes, aligned to [STACK_SIZE], with a back-pointer in its lowest word.
//! - [switch_threads] suspends the calling thread into its [ThreadMd] and resumes another one.
//!
//! Run queues, blocking, and wakeups are left to the scheduler built on top.
//!
//! # Example
//! ```no_run
//! use cothread::{switch_threads, Stack, ThreadMd, ThreadPointer, ThreadPtr};
//!
//! static mut MAIN: ThreadMd = ThreadMd::new();
//!
//! extern "C" fn entry(arg: *mut ()) -> ! {
//!     let me = arg as *mut ThreadMd;
//!     loop {
//!         unsafe { switch_threads(me, std::ptr::addr_of!(MAIN)) };
//!     }
//! }
//!
//! let mut stack = Stack::new().unwrap();
//! let mut md = Box::new(ThreadMd::new());
//! let arg = &mut *md as *mut ThreadMd;
//! *md = stack.prepare(ThreadPtr::new(arg), entry, arg as *mut (), ThreadPointer::default());
//! unsafe { switch_threads(std::ptr::addr_of_mut!(MAIN), arg) };
//! ```

#![cfg_attr(feature = "fast_thread_local", feature(thread_local))]

use std::io;

pub mod limits;
pub mod sched;

pub use limits::STACK_SIZE;
pub use sched::{
    current, current_thread, install_thread_pointer, switch_threads, thread_pointer, Entry, Stack, ThreadMd,
    ThreadPointer, ThreadPtr,
};

/// Failure to set up a thread stack.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The kernel refused to map stack memory.
    #[error("failed to map thread stack")]
    Map(#[source] io::Error),

    /// The guard page below the stack couldn't be protected.
    #[error("failed to protect stack guard page")]
    Guard(#[source] io::Error),

    /// Stacks must be whole pages so the guard page lines up with the base.
    #[error("page size {page_size} doesn't divide the thread stack size")]
    PageSize { page_size: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
