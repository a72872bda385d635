//! Power State Coordination
//!
//! Secure-world implementation of the CPU power management calls: any core can power another one
//! on, a core can power itself off and anyone can query the state of a core. There is no lock in
//! here, cores coordinate through the atomic records of the power state table.
#![cfg_attr(not(test), no_std)]

pub mod abi;
pub mod affinity;
pub mod arch;
mod error;
mod features;
#[cfg(feature = "gicv2")]
pub mod gic;
pub mod platform;
pub mod state;

#[cfg(test)]
mod debug;

pub use error::PsciError;
pub use features::{features, version};
pub use platform::PowerHooks;
pub use state::{AffinityLevel, CoreFlags, CoreId, CoreTable, ResumeContext};

use affinity::is_well_formed;

/// Static configuration of the firmware.
pub mod config {
    /// Number of cores managed by the firmware.
    pub const NR_CPUS: usize = 4;
    /// Cores per cluster, 0 for a single cluster.
    pub const CORES_PER_CLUSTER: usize = 0;
}

/// The power state table of the firmware.
pub static CORE_TABLE: CoreTable<{ config::NR_CPUS }> = CoreTable::new();

// ————————————————————————————— Coordinator ———————————————————————————————— //

/// Entry points of the power management calls.
///
/// All calls are executed on the calling core and never block, except `cpu_off` which parks the
/// calling core until another one powers it on again.
pub struct Psci<'a, P: PowerHooks, const N: usize> {
    table: &'a CoreTable<N>,
    platform: &'a P,
}

impl<'a, P: PowerHooks, const N: usize> Psci<'a, P, N> {
    /// Creates the coordinator, initializing the table if that was not already done.
    pub fn new(table: &'a CoreTable<N>, platform: &'a P) -> Self {
        table.init();
        Self { table, platform }
    }

    pub fn version(&self) -> u32 {
        version()
    }

    pub fn features(&self, function_id: u32) -> Result<u32, PsciError> {
        features(function_id)
    }

    /// Resolves the affinity of a target core.
    fn target(&self, mpidr: u64) -> Result<CoreId, PsciError> {
        if !is_well_formed(mpidr) {
            log::warn!("Malformed target affinity {:#x}", mpidr);
            return Err(PsciError::InvalidParameters);
        }

        let index = self.platform.resolve_core_id(mpidr)?;
        self.table.core_id(index)
    }

    /// The calling core.
    fn current(&self) -> Result<CoreId, PsciError> {
        let mpidr = self.platform.current_affinity();
        self.target(mpidr).map_err(|err| {
            log::warn!("Calling core {:#x} is not managed", mpidr);
            err
        })
    }

    // ——————————————————————————— Calls ———————————————————————————— //

    /// Power state of the core `target_affinity`.
    ///
    /// Only `lowest_affinity_level` 0 (a single core) is supported.
    pub fn affinity_info(
        &self,
        target_affinity: u64,
        lowest_affinity_level: u64,
    ) -> Result<AffinityLevel, PsciError> {
        if lowest_affinity_level != 0 {
            log::warn!(
                "Affinity info requested at level {}, only level 0 is supported",
                lowest_affinity_level
            );
            return Err(PsciError::InvalidParameters);
        }

        let core = self.target(target_affinity)?;
        Ok(self.table.affinity_level(core))
    }

    /// Powers on the core `target_affinity`, which resumes at `entry_point` with `context_id` as
    /// argument.
    ///
    /// Returns as soon as the core is released, the caller observes the core coming up through
    /// `affinity_info`. If the platform fails to release the core, the core is left off.
    pub fn cpu_on(
        &self,
        target_affinity: u64,
        entry_point: u64,
        context_id: u64,
    ) -> Result<(), PsciError> {
        log::trace!("CPU on {:#x} at {:#x}", target_affinity, entry_point);

        let core = self.target(target_affinity)?;
        let context = ResumeContext {
            entry_point,
            context_id,
        };

        if let Err(err) = self.table.claim(core, context) {
            log::debug!("CPU on of core {} rejected: {:?}", core, err);
            return Err(err);
        }

        if let Err(err) = self.platform.release_core(self.table, core) {
            log::warn!("Failed to release core {}: {:?}", core, err);
            if !self.table.abort_claim(core) {
                log::warn!("Core {} changed state while being released", core);
            }
            return Err(PsciError::InternalFailure);
        }

        log::debug!("Core {} is on pending", core);
        Ok(())
    }

    /// Powers off the calling core.
    ///
    /// The core is parked until another core powers it on again, it then resumes at the entry
    /// point given by that request. The call never returns to the caller.
    pub fn cpu_off(&self) -> ! {
        let core = match self.current() {
            Ok(core) => core,
            Err(_) => self.platform.halt(),
        };

        let previous = self.table.mark_off(core);
        if previous != AffinityLevel::On {
            log::warn!("Core {} powered off while {}", core, previous);
        }
        log::debug!("Core {} is off", core);
        arch::dsb();

        self.platform.park_core(self.table, core)
    }

    /// Reports the calling core as running, completing the power up started by `cpu_on`.
    ///
    /// Called once by the generic startup path of a resumed core. Reporting a core that is
    /// already on has no effect.
    pub fn report_self_on(&self) -> Result<CoreId, PsciError> {
        let core = self.current()?;

        match self.table.mark_on(core) {
            Ok(()) => {
                log::debug!("Core {} is on", core);
                Ok(core)
            }
            Err(AffinityLevel::On) => Ok(core),
            Err(level) => {
                log::warn!("Core {} reported on while {}", core, level);
                Err(PsciError::Denied)
            }
        }
    }

    /// Where the calling core resumes, as requested by the `cpu_on` that released it.
    pub fn resume_context(&self) -> Result<ResumeContext, PsciError> {
        let core = self.current()?;
        self.table
            .resume_context(core)
            .ok_or(PsciError::Denied)
    }

    pub fn system_off(&self) -> ! {
        log::info!("System off");
        self.platform.system_off()
    }

    pub fn system_reset(&self) -> ! {
        log::info!("System reset");
        self.platform.system_reset()
    }

    // ———————————————————————— SMC32 Variants ——————————————————————————— //

    pub fn cpu_on_smc32(
        &self,
        target_affinity: u32,
        entry_point: u32,
        context_id: u32,
    ) -> Result<(), PsciError> {
        self.cpu_on(
            target_affinity as u64,
            entry_point as u64,
            context_id as u64,
        )
    }

    pub fn affinity_info_smc32(
        &self,
        target_affinity: u32,
        lowest_affinity_level: u32,
    ) -> Result<AffinityLevel, PsciError> {
        self.affinity_info(target_affinity as u64, lowest_affinity_level as u64)
    }
}
