//! Per-core power state table.
//!
//! The table is shared by every core and is never locked: each field of a record is an atomic
//! cell. The resume context of a core is written once by the core requesting the power up, before
//! the record is published as ON_PENDING with release ordering, and read by the target core after
//! it observed that publication with acquire ordering.

use core::fmt;
use core::sync::atomic::{AtomicU64, AtomicU8, Ordering};

use bitflags::bitflags;
use spin::Once;

use crate::error::PsciError;

/// Index of the core running the firmware cold boot.
pub const BOOT_CORE: usize = 0;

// ————————————————————————————— Affinity Level ————————————————————————————— //

/// Power state of a core, encoded as returned by AFFINITY_INFO.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AffinityLevel {
    On = 0,
    Off = 1,
    OnPending = 2,
}

const LEVEL_ON: u8 = AffinityLevel::On as u8;
const LEVEL_OFF: u8 = AffinityLevel::Off as u8;
const LEVEL_ON_PENDING: u8 = AffinityLevel::OnPending as u8;
/// Power up requested, the resume context is being written. Reported as ON_PENDING.
const LEVEL_CLAIMED: u8 = 0x80;

impl AffinityLevel {
    fn from_raw(raw: u8) -> Self {
        match raw {
            LEVEL_ON => AffinityLevel::On,
            LEVEL_OFF => AffinityLevel::Off,
            _ => AffinityLevel::OnPending,
        }
    }
}

impl From<AffinityLevel> for u64 {
    fn from(level: AffinityLevel) -> Self {
        level as u64
    }
}

impl fmt::Display for AffinityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AffinityLevel::On => write!(f, "on"),
            AffinityLevel::Off => write!(f, "off"),
            AffinityLevel::OnPending => write!(f, "on_pending"),
        }
    }
}

bitflags! {
    pub struct CoreFlags: u8 {
        /// The core went through its reset path at least once.
        const POWERED_UP = 1 << 0;
    }
}

// —————————————————————————————— Core Record ——————————————————————————————— //

/// Where a core resumes execution once powered up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResumeContext {
    pub entry_point: u64,
    pub context_id: u64,
}

pub struct CoreRecord {
    level: AtomicU8,
    flags: AtomicU8,
    entry_point: AtomicU64,
    context_id: AtomicU64,
}

impl CoreRecord {
    pub const fn new() -> Self {
        Self {
            level: AtomicU8::new(LEVEL_OFF),
            flags: AtomicU8::new(0),
            entry_point: AtomicU64::new(0),
            context_id: AtomicU64::new(0),
        }
    }
}

/// A valid index into a core table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreId(usize);

impl CoreId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// —————————————————————————————— Core Table ———————————————————————————————— //

pub struct CoreTable<const N: usize> {
    cores: [CoreRecord; N],
    ready: Once,
}

impl<const N: usize> CoreTable<N> {
    /// A table with every core off, call `init` before use.
    pub const fn new() -> Self {
        const OFF: CoreRecord = CoreRecord::new();

        Self {
            cores: [OFF; N],
            ready: Once::new(),
        }
    }

    /// Marks the boot core as on and every other core as off.
    ///
    /// Only the first call has an effect.
    pub fn init(&self) {
        self.ready.call_once(|| {
            for (index, core) in self.cores.iter().enumerate() {
                if index == BOOT_CORE {
                    core.flags.store(CoreFlags::POWERED_UP.bits(), Ordering::Relaxed);
                    core.level.store(LEVEL_ON, Ordering::Release);
                } else {
                    core.flags.store(0, Ordering::Relaxed);
                    core.level.store(LEVEL_OFF, Ordering::Release);
                }
            }
            log::debug!("Power state table ready for {} cores", N);
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.ready.is_completed()
    }

    pub const fn len(&self) -> usize {
        N
    }

    /// Validates a core index.
    pub fn core_id(&self, index: usize) -> Result<CoreId, PsciError> {
        if index >= N {
            log::warn!("Core {} requested, but there are only {} cores", index, N);
            return Err(PsciError::InvalidParameters);
        }
        Ok(CoreId(index))
    }

    fn record(&self, core: CoreId) -> &CoreRecord {
        &self.cores[core.0]
    }

    // ——————————————————————————— Accessors ———————————————————————————— //

    pub fn affinity_level(&self, core: CoreId) -> AffinityLevel {
        AffinityLevel::from_raw(self.record(core).level.load(Ordering::Acquire))
    }

    pub(crate) fn set_affinity_level(&self, core: CoreId, level: AffinityLevel) {
        self.record(core).level.store(level as u8, Ordering::Release);
    }

    pub fn flags(&self, core: CoreId) -> CoreFlags {
        CoreFlags::from_bits_truncate(self.record(core).flags.load(Ordering::Acquire))
    }

    /// Sets `flags` on top of the current ones.
    ///
    /// A core observing the new flags also observes every write made before by the caller.
    pub fn set_flags(&self, core: CoreId, flags: CoreFlags) {
        self.record(core)
            .flags
            .fetch_or(flags.bits(), Ordering::Release);
    }

    /// The resume context, `None` while the core waits for a power up request.
    pub fn resume_context(&self, core: CoreId) -> Option<ResumeContext> {
        if self.awaiting_release(core) {
            return None;
        }

        let record = self.record(core);
        Some(ResumeContext {
            entry_point: record.entry_point.load(Ordering::Relaxed),
            context_id: record.context_id.load(Ordering::Relaxed),
        })
    }

    /// True while the core is off, or while a power up request is still being recorded.
    pub fn awaiting_release(&self, core: CoreId) -> bool {
        let level = self.record(core).level.load(Ordering::Acquire);
        level == LEVEL_OFF || level == LEVEL_CLAIMED
    }

    // —————————————————————————— Transitions ——————————————————————————— //

    /// OFF -> ON_PENDING, recording where the core resumes.
    ///
    /// Exactly one of several concurrent requests on the same core succeeds, the others observe
    /// ON_PENDING. The context is never written unless the transition succeeded.
    pub(crate) fn claim(&self, core: CoreId, context: ResumeContext) -> Result<(), PsciError> {
        let record = self.record(core);

        match record.level.compare_exchange(
            LEVEL_OFF,
            LEVEL_CLAIMED,
            Ordering::Acquire,
            Ordering::Acquire,
        ) {
            Ok(_) => {}
            Err(LEVEL_ON) => return Err(PsciError::AlreadyOn),
            Err(_) => return Err(PsciError::OnPending),
        }

        record.entry_point.store(context.entry_point, Ordering::Relaxed);
        record.context_id.store(context.context_id, Ordering::Relaxed);
        self.set_affinity_level(core, AffinityLevel::OnPending);
        Ok(())
    }

    /// ON_PENDING -> OFF, undoes a `claim` whose core could not be released.
    ///
    /// Returns false if the record is no longer ON_PENDING.
    pub(crate) fn abort_claim(&self, core: CoreId) -> bool {
        self.record(core)
            .level
            .compare_exchange(
                LEVEL_ON_PENDING,
                LEVEL_OFF,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
    }

    /// ON_PENDING -> ON, returns the observed level if the core was not pending.
    pub(crate) fn mark_on(&self, core: CoreId) -> Result<(), AffinityLevel> {
        self.record(core)
            .level
            .compare_exchange(
                LEVEL_ON_PENDING,
                LEVEL_ON,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map(|_| ())
            .map_err(AffinityLevel::from_raw)
    }

    /// Any -> OFF, returns the previous level.
    pub(crate) fn mark_off(&self, core: CoreId) -> AffinityLevel {
        AffinityLevel::from_raw(self.record(core).level.swap(LEVEL_OFF, Ordering::AcqRel))
    }
}

impl<const N: usize> fmt::Display for CoreTable<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for index in 0..N {
            let core = CoreId(index);
            if index != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", index, self.affinity_level(core))?;
            if self.flags(core).contains(CoreFlags::POWERED_UP) {
                write!(f, "*")?;
            }
        }
        write!(f, "]")
    }
}
