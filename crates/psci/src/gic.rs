//! GICv2 wake channel
//!
//! Parked cores only accept SGI 15, other cores send it to release them.

use core::ptr;

use crate::affinity::{MPIDR_AFF0, MPIDR_AFF1};
use crate::arch;
use crate::error::PsciError;
use crate::platform::PowerHooks;
use crate::state::CoreId;

/// Software generated interrupt used to wake up parked cores.
pub const SGI_WAKE: u32 = 15;

const SPURIOUS_INTERRUPT: u32 = 1023;
const INTERRUPT_ID_MASK: u32 = 0x3ff;
const MAX_TARGETS: usize = 8;

// Distributor
const GICD_ISENABLER0: usize = 0x100;
const GICD_ICENABLER0: usize = 0x180;
const GICD_SGIR: usize = 0xf00;

// CPU interface
const GICC_IAR: usize = 0x0c;
const GICC_EOIR: usize = 0x10;

const SGIR_TARGET_LIST_SHIFT: u32 = 16;

macro_rules! ro_reg {
    ($base:ident, $addr:expr, $get:ident) => {
        pub fn $get(&self) -> u32 {
            unsafe { ptr::read_volatile((self.$base + $addr) as *const u32) }
        }
    };
}

macro_rules! wo_reg {
    ($base:ident, $addr:expr, $set:ident) => {
        pub fn $set(&self, val: u32) {
            unsafe { ptr::write_volatile((self.$base + $addr) as *mut u32, val) }
        }
    };
}

/// An helper for accessing the distributor and the CPU interface of a GICv2.
pub struct Gicv2 {
    gicd: usize,
    gicc: usize,
}

impl Gicv2 {
    /// SAFETY: `gicd` and `gicc` must be the base addresses of the distributor and CPU interface
    /// register frames, mapped for the lifetime of the helper.
    pub const unsafe fn new(gicd: usize, gicc: usize) -> Self {
        Self { gicd, gicc }
    }

    wo_reg!(gicd, GICD_ISENABLER0, set_enable0);
    wo_reg!(gicd, GICD_ICENABLER0, clear_enable0);
    wo_reg!(gicd, GICD_SGIR, send_sgi_raw);
    ro_reg!(gicc, GICC_IAR, acknowledge);
    wo_reg!(gicc, GICC_EOIR, end_of_interrupt);

    /// Sends the wake SGI to the CPU interface `target`.
    ///
    /// The SGI target list only covers the first 8 CPU interfaces.
    pub fn send_wake(&self, target: usize) -> Result<(), PsciError> {
        if target >= MAX_TARGETS {
            log::warn!("CPU interface {} can not be targeted by an SGI", target);
            return Err(PsciError::InternalFailure);
        }
        self.send_sgi_raw((1 << (target as u32 + SGIR_TARGET_LIST_SHIFT)) | SGI_WAKE);
        Ok(())
    }

    /// Disables every banked interrupt (SGI and PPI) of the calling core but the wake SGI.
    pub fn mask_all_but_wake(&self) {
        self.clear_enable0(!(1 << SGI_WAKE));
        self.set_enable0(1 << SGI_WAKE);
    }

    /// Acknowledges the pending interrupt, returns true if it was the wake SGI.
    pub fn ack_wake(&self) -> bool {
        let iar = self.acknowledge();
        let id = iar & INTERRUPT_ID_MASK;

        if id == SPURIOUS_INTERRUPT {
            return false;
        }

        self.end_of_interrupt(iar);
        if id != SGI_WAKE {
            log::debug!("Unexpected interrupt {} while parked", id);
            return false;
        }
        true
    }
}

// ———————————————————————————— Generic Platform ———————————————————————————— //

/// Platform hooks for systems using GICv2 SGIs to wake parked cores.
pub struct GicPlatform {
    gic: Gicv2,
    cold_boot: fn(CoreId),
    enter: fn(u64, u64) -> !,
}

impl GicPlatform {
    /// `cold_boot` starts a core for the first time, `enter` jumps to the non-secure entry point.
    pub const fn new(gic: Gicv2, cold_boot: fn(CoreId), enter: fn(u64, u64) -> !) -> Self {
        Self {
            gic,
            cold_boot,
            enter,
        }
    }
}

impl PowerHooks for GicPlatform {
    fn current_affinity(&self) -> u64 {
        arch::read_mpidr() & (MPIDR_AFF0 | MPIDR_AFF1)
    }

    fn cold_boot(&self, core: CoreId) {
        (self.cold_boot)(core)
    }

    fn kick(&self, core: CoreId) -> Result<(), PsciError> {
        self.gic.send_wake(core.index())
    }

    fn mask_wake_sources(&self, _core: CoreId) {
        self.gic.mask_all_but_wake();
    }

    fn wait_for_wake(&self) {
        arch::wfi();
    }

    fn ack_wake(&self, core: CoreId) {
        if !self.gic.ack_wake() {
            log::trace!("Core {} resumed without a pending wake SGI", core);
        }
    }

    fn enter(&self, entry_point: u64, context_id: u64) -> ! {
        (self.enter)(entry_point, context_id)
    }
}

#[cfg(test)]
mod tests {
    use core::sync::atomic::{AtomicU32, Ordering};

    use super::*;
    use crate::state::{AffinityLevel, CoreFlags, CoreTable, ResumeContext};
    use crate::Psci;

    /// Fake register frames backed by memory.
    struct Frames {
        gicd: Box<[AtomicU32]>,
        gicc: Box<[AtomicU32]>,
    }

    fn frame(words: usize) -> Box<[AtomicU32]> {
        (0..words).map(|_| AtomicU32::new(0)).collect()
    }

    impl Frames {
        fn new() -> Self {
            Self {
                gicd: frame(0x400),
                gicc: frame(0x10),
            }
        }

        fn gic(&self) -> Gicv2 {
            unsafe { Gicv2::new(self.gicd.as_ptr() as usize, self.gicc.as_ptr() as usize) }
        }

        fn gicd(&self, offset: usize) -> u32 {
            self.gicd[offset / 4].load(Ordering::Relaxed)
        }

        fn gicc(&self, offset: usize) -> u32 {
            self.gicc[offset / 4].load(Ordering::Relaxed)
        }

        fn set_gicc(&self, offset: usize, val: u32) {
            self.gicc[offset / 4].store(val, Ordering::Relaxed)
        }
    }

    fn no_cold_boot(_core: CoreId) {
        panic!("Unexpected cold boot");
    }

    fn no_enter(_entry_point: u64, _context_id: u64) -> ! {
        panic!("Unexpected entry");
    }

    #[test]
    fn send_wake() {
        let frames = Frames::new();
        let gic = frames.gic();

        assert_eq!(gic.send_wake(2), Ok(()));
        assert_eq!(frames.gicd(GICD_SGIR), (1 << 18) | 15);

        // Out of the target list, nothing is written
        assert_eq!(gic.send_wake(8), Err(PsciError::InternalFailure));
        assert_eq!(frames.gicd(GICD_SGIR), (1 << 18) | 15);
    }

    #[test]
    fn mask_and_ack() {
        let frames = Frames::new();
        let gic = frames.gic();

        gic.mask_all_but_wake();
        assert_eq!(frames.gicd(GICD_ICENABLER0), !(1 << 15));
        assert_eq!(frames.gicd(GICD_ISENABLER0), 1 << 15);

        // SGI 15 from CPU interface 1
        frames.set_gicc(GICC_IAR, (1 << 10) | 15);
        assert!(gic.ack_wake());
        assert_eq!(frames.gicc(GICC_EOIR), (1 << 10) | 15);

        frames.set_gicc(GICC_IAR, SPURIOUS_INTERRUPT);
        frames.set_gicc(GICC_EOIR, 0);
        assert!(!gic.ack_wake());
        assert_eq!(frames.gicc(GICC_EOIR), 0);

        frames.set_gicc(GICC_IAR, 27);
        assert!(!gic.ack_wake());
        assert_eq!(frames.gicc(GICC_EOIR), 27);
    }

    #[test]
    fn warm_release_sends_sgi() {
        let frames = Frames::new();
        let platform = GicPlatform::new(frames.gic(), no_cold_boot, no_enter);
        let table: CoreTable<4> = CoreTable::new();
        table.init();

        let core = table.core_id(3).unwrap();
        table.set_flags(core, CoreFlags::POWERED_UP);
        table
            .claim(core, ResumeContext { entry_point: 0x1000, context_id: 0 })
            .unwrap();

        assert_eq!(platform.release_core(&table, core), Ok(()));
        assert_eq!(frames.gicd(GICD_SGIR), (1 << 19) | 15);
    }

    #[test]
    fn unreachable_core_stays_off() {
        let frames = Frames::new();
        let platform = GicPlatform::new(frames.gic(), no_cold_boot, no_enter);
        let table: CoreTable<16> = CoreTable::new();
        let psci = Psci::new(&table, &platform);

        // Core 9 was powered up once, it can only be resumed with an SGI
        let core = table.core_id(9).unwrap();
        table.set_flags(core, CoreFlags::POWERED_UP);

        assert_eq!(psci.cpu_on(9, 0x1000, 0), Err(PsciError::InternalFailure));
        assert_eq!(psci.affinity_info(9, 0), Ok(AffinityLevel::Off));
        assert_eq!(frames.gicd(GICD_SGIR), 0);

        // Cores within the target list are still reachable
        let core = table.core_id(7).unwrap();
        table.set_flags(core, CoreFlags::POWERED_UP);
        assert_eq!(psci.cpu_on(7, 0x1000, 0), Ok(()));
        assert_eq!(frames.gicd(GICD_SGIR), (1 << 23) | 15);
    }
}
