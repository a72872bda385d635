//! Architecture specific primitives

#[cfg(target_arch = "aarch64")]
mod aarch64 {
    use core::arch::asm;

    /// Wait for interrupt.
    pub fn wfi() {
        unsafe { asm!("wfi", options(nomem, nostack, preserves_flags)) }
    }

    /// Full system data synchronization barrier.
    pub fn dsb() {
        unsafe { asm!("dsb sy", options(nostack, preserves_flags)) }
    }

    pub fn read_mpidr() -> u64 {
        let mpidr: u64;
        unsafe { asm!("mrs {}, mpidr_el1", out(reg) mpidr, options(nomem, nostack)) }
        mpidr
    }
}

#[cfg(target_arch = "aarch64")]
pub use aarch64::*;

// Host builds, only used for tests and tooling.
#[cfg(not(target_arch = "aarch64"))]
mod host {
    use core::sync::atomic::{fence, Ordering};

    pub fn wfi() {
        core::hint::spin_loop();
    }

    pub fn dsb() {
        fence(Ordering::SeqCst);
    }

    pub fn read_mpidr() -> u64 {
        0
    }
}

#[cfg(not(target_arch = "aarch64"))]
pub use host::*;
