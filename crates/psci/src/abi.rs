//! Protocol identifiers and return codes.
//!
//! The values follow the Arm Power State Coordination Interface, SMC calling convention
//! encoding: bit 30 selects the 64-bit calling convention, bit 31 marks a fast call.

use crate::error::PsciError;

// ———————————————————————————————— Version ————————————————————————————————— //

pub const PSCI_VERSION_MAJOR_SHIFT: u32 = 16;
pub const PSCI_VERSION_MINOR_MASK: u32 = 0xffff;

pub const fn psci_version(major: u32, minor: u32) -> u32 {
    (major << PSCI_VERSION_MAJOR_SHIFT) | (minor & PSCI_VERSION_MINOR_MASK)
}

pub const PSCI_VERSION_1_0: u32 = psci_version(1, 0);

// ——————————————————————————————— Functions ———————————————————————————————— //

const FN_BASE: u32 = 0x8400_0000;
const FN64_BASE: u32 = 0xC400_0000;

const fn fn32(n: u32) -> u32 {
    FN_BASE + n
}

const fn fn64(n: u32) -> u32 {
    FN64_BASE + n
}

pub mod function {
    use super::{fn32, fn64};

    // PSCI 0.2
    pub const PSCI_VERSION: u32 = fn32(0);
    pub const CPU_SUSPEND: u32 = fn32(1);
    pub const CPU_OFF: u32 = fn32(2);
    pub const CPU_ON: u32 = fn32(3);
    pub const AFFINITY_INFO: u32 = fn32(4);
    pub const MIGRATE: u32 = fn32(5);
    pub const MIGRATE_INFO_TYPE: u32 = fn32(6);
    pub const MIGRATE_INFO_UP_CPU: u32 = fn32(7);
    pub const SYSTEM_OFF: u32 = fn32(8);
    pub const SYSTEM_RESET: u32 = fn32(9);

    pub const CPU_SUSPEND_64: u32 = fn64(1);
    pub const CPU_ON_64: u32 = fn64(3);
    pub const AFFINITY_INFO_64: u32 = fn64(4);
    pub const MIGRATE_64: u32 = fn64(5);
    pub const MIGRATE_INFO_UP_CPU_64: u32 = fn64(7);
    pub const SYSTEM_RESET2_64: u32 = fn64(18);

    // PSCI 1.0
    pub const PSCI_FEATURES: u32 = fn32(10);
    pub const CPU_FREEZE: u32 = fn32(11);
    pub const CPU_DEFAULT_SUSPEND: u32 = fn32(12);
    pub const NODE_HW_STATE: u32 = fn32(13);
    pub const SYSTEM_SUSPEND: u32 = fn32(14);
    pub const SET_SUSPEND_MODE: u32 = fn32(15);
    pub const STAT_RESIDENCY: u32 = fn32(16);
    pub const STAT_COUNT: u32 = fn32(17);

    pub const CPU_DEFAULT_SUSPEND_64: u32 = fn64(12);
    pub const NODE_HW_STATE_64: u32 = fn64(13);
    pub const SYSTEM_SUSPEND_64: u32 = fn64(14);
    pub const STAT_RESIDENCY_64: u32 = fn64(16);
    pub const STAT_COUNT_64: u32 = fn64(17);
}

// ————————————————————————————— Return Codes ——————————————————————————————— //

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Success = 0,
    NotSupported = -1,
    InvalidParameters = -2,
    Denied = -3,
    AlreadyOn = -4,
    OnPending = -5,
    InternalFailure = -6,
    NotPresent = -7,
    Disabled = -8,
    InvalidAddress = -9,
}

impl Status {
    /// Status of a handler that returned no value.
    pub fn from_result<T>(result: Result<T, PsciError>) -> Self {
        match result {
            Ok(_) => Status::Success,
            Err(err) => err.status(),
        }
    }

    pub const fn code(self) -> i32 {
        self as i32
    }
}

impl From<PsciError> for Status {
    fn from(err: PsciError) -> Self {
        err.status()
    }
}

/// Encode a handler result as the value a call transport places in the first return register.
///
/// Successful results carry their payload, failures their negative return code.
pub fn into_register<T: Into<u64>>(result: Result<T, PsciError>) -> u64 {
    match result {
        Ok(value) => value.into(),
        Err(err) => err.code() as i64 as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn function_ids() {
        assert_eq!(function::PSCI_VERSION, 0x8400_0000);
        assert_eq!(function::CPU_ON, 0x8400_0003);
        assert_eq!(function::CPU_ON_64, 0xC400_0003);
        assert_eq!(function::PSCI_FEATURES, 0x8400_000A);
        assert_eq!(function::SYSTEM_RESET2_64, 0xC400_0012);
    }

    #[test]
    fn version_encoding() {
        assert_eq!(PSCI_VERSION_1_0, 0x0001_0000);
        assert_eq!(psci_version(0, 2), 0x0000_0002);
    }

    #[test]
    fn register_encoding() {
        assert_eq!(into_register(Ok::<u32, _>(2)), 2);
        assert_eq!(
            into_register::<u32>(Err(PsciError::InvalidParameters)),
            (-2i64) as u64
        );
        assert_eq!(Status::from_result(Ok::<(), _>(())), Status::Success);
        assert_eq!(Status::from_result::<()>(Err(PsciError::OnPending)).code(), -5);
    }
}
