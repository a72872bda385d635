//! Version and feature discovery.

use crate::abi::{function, PSCI_VERSION_1_0};
use crate::error::PsciError;

/// Protocol version implemented by the firmware.
pub const fn version() -> u32 {
    PSCI_VERSION_1_0
}

/// Feature flags of a function, `NotSupported` for functions the firmware does not implement.
///
/// None of the implemented functions advertise optional capabilities, they all return 0.
pub fn features(function_id: u32) -> Result<u32, PsciError> {
    match function_id {
        function::PSCI_VERSION
        | function::PSCI_FEATURES
        | function::CPU_ON
        | function::CPU_ON_64
        | function::CPU_OFF
        | function::AFFINITY_INFO
        | function::AFFINITY_INFO_64
        | function::SYSTEM_OFF
        | function::SYSTEM_RESET => Ok(0),

        function::CPU_SUSPEND
        | function::CPU_SUSPEND_64
        | function::MIGRATE
        | function::MIGRATE_64
        | function::MIGRATE_INFO_TYPE
        | function::MIGRATE_INFO_UP_CPU
        | function::MIGRATE_INFO_UP_CPU_64
        | function::SYSTEM_RESET2_64
        | function::SYSTEM_SUSPEND
        | function::SYSTEM_SUSPEND_64
        | function::CPU_FREEZE
        | function::CPU_DEFAULT_SUSPEND
        | function::CPU_DEFAULT_SUSPEND_64
        | function::NODE_HW_STATE
        | function::NODE_HW_STATE_64
        | function::SET_SUSPEND_MODE
        | function::STAT_RESIDENCY
        | function::STAT_RESIDENCY_64
        | function::STAT_COUNT
        | function::STAT_COUNT_64 => Err(PsciError::NotSupported),

        _ => {
            log::debug!("Unknown function {:#x} in feature query", function_id);
            Err(PsciError::NotSupported)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_functions() {
        for id in [
            function::PSCI_VERSION,
            function::PSCI_FEATURES,
            function::CPU_ON,
            function::CPU_ON_64,
            function::CPU_OFF,
            function::AFFINITY_INFO,
            function::AFFINITY_INFO_64,
            function::SYSTEM_OFF,
            function::SYSTEM_RESET,
        ] {
            assert_eq!(features(id), Ok(0), "function {:#x}", id);
        }
    }

    #[test]
    fn unsupported_functions() {
        for id in [
            function::CPU_SUSPEND,
            function::MIGRATE,
            function::SYSTEM_SUSPEND,
            function::SYSTEM_RESET2_64,
            function::STAT_COUNT_64,
            0,
            0x8400_00ff,
            u32::MAX,
        ] {
            assert_eq!(features(id), Err(PsciError::NotSupported), "function {:#x}", id);
        }
    }

    #[test]
    fn pure() {
        for id in [function::CPU_ON_64, function::CPU_FREEZE, 0x1234] {
            assert_eq!(features(id), features(id));
        }
        assert_eq!(version(), version());
        assert_eq!(version(), 0x0001_0000);
    }
}
