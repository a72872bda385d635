//! Platform hooks
//!
//! The coordinator never touches the hardware directly, it goes through a `PowerHooks`
//! implementation provided by the platform. The required methods are the hardware primitives,
//! the provided ones implement the generic way of releasing and parking cores on top of them and
//! can be overridden by platforms that power cores down for real.

use crate::affinity::Topology;
use crate::arch;
use crate::config;
use crate::error::PsciError;
use crate::state::{CoreFlags, CoreId, CoreTable};

pub trait PowerHooks: Sync {
    // ———————————————————————— Hardware Primitives ————————————————————————— //

    /// Affinity (MPIDR) of the calling core.
    fn current_affinity(&self) -> u64;

    /// Starts a core that never ran since reset, e.g. by programming its boot vector and
    /// releasing its reset line.
    fn cold_boot(&self, core: CoreId);

    /// Sends the wake signal to a parked core.
    fn kick(&self, core: CoreId) -> Result<(), PsciError>;

    /// Masks every interrupt of the calling core except the wake signal.
    fn mask_wake_sources(&self, core: CoreId);

    /// Waits in a low power state until the next wake event.
    fn wait_for_wake(&self);

    /// Acknowledges the wake signal on the calling core.
    fn ack_wake(&self, core: CoreId);

    /// Jumps to the non-secure entry point, passing `context_id` as first argument.
    fn enter(&self, entry_point: u64, context_id: u64) -> !;

    // ——————————————————————————— Provided Hooks ——————————————————————————— //

    /// Linear core index of an affinity value.
    fn resolve_core_id(&self, mpidr: u64) -> Result<usize, PsciError> {
        Topology::new(config::CORES_PER_CLUSTER).core_index(mpidr)
    }

    /// Makes `core` start executing, the core must already be ON_PENDING.
    ///
    /// The first release of a core goes through its cold boot path, later ones resume it from
    /// `park_core`.
    fn release_core<const N: usize>(
        &self,
        table: &CoreTable<N>,
        core: CoreId,
    ) -> Result<(), PsciError> {
        if !table.flags(core).contains(CoreFlags::POWERED_UP) {
            log::debug!("Cold boot of core {}", core);
            table.set_flags(core, CoreFlags::POWERED_UP);
            arch::dsb();
            self.cold_boot(core);
            return Ok(());
        }

        log::debug!("Waking up core {}", core);
        arch::dsb();
        self.kick(core)
    }

    /// Parks the calling core until another core powers it on again, then enters the resume
    /// context.
    fn park_core<const N: usize>(&self, table: &CoreTable<N>, core: CoreId) -> ! {
        self.mask_wake_sources(core);

        let context = loop {
            if let Some(context) = table.resume_context(core) {
                break context;
            }
            self.wait_for_wake();
        };

        self.ack_wake(core);
        self.enter(context.entry_point, context.context_id)
    }

    /// Stops the calling core for good.
    fn halt(&self) -> ! {
        loop {
            self.wait_for_wake();
        }
    }

    /// Powers the system off.
    fn system_off(&self) -> ! {
        log::warn!("System off is not implemented by the platform, halting");
        self.halt()
    }

    /// Resets the system.
    fn system_reset(&self) -> ! {
        log::warn!("System reset is not implemented by the platform, halting");
        self.halt()
    }
}
