//! Thread pointer register of the execution unit.
//!
//! The hardware thread pointer (FS base on x86_64, TPIDR_EL0 on aarch64) already belongs to libc and the Rust runtime,
//! so each OS thread gets an emulated register instead. Switching swaps its contents, never its location.
//! The `fast_thread_local` feature trades the `thread_local!` lazy access for a plain `#[thread_local]` static.

use std::cell::Cell;

use super::ThreadPointer;

/// Cache padded to avoid potential performance hit due to false sharing.
#[repr(align(128))]
struct Register(Cell<ThreadPointer>);

#[cfg(not(feature = "fast_thread_local"))]
thread_local! {
    /// Each execution unit gets its own independent register.
    static REGISTER: Register = const { Register(Cell::new(ThreadPointer::ZERO)) };
}

#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn read() -> ThreadPointer {
    REGISTER.with(|register| register.0.get())
}

#[cfg(not(feature = "fast_thread_local"))]
pub(super) fn write(thread_pointer: ThreadPointer) {
    REGISTER.with(|register| register.0.set(thread_pointer))
}

#[cfg(feature = "fast_thread_local")]
#[thread_local]
static REGISTER: Register = Register(Cell::new(ThreadPointer::ZERO));

#[cfg(feature = "fast_thread_local")]
pub(super) fn read() -> ThreadPointer {
    REGISTER.0.get()
}

#[cfg(feature = "fast_thread_local")]
pub(super) fn write(thread_pointer: ThreadPointer) {
    REGISTER.0.set(thread_pointer)
}
