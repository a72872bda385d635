use crate::abi::Status;

/// Errors returned by the protocol handlers.
///
/// `AlreadyOn` and `OnPending` are not failures: they tell the caller that an earlier request
/// already took effect, the caller decides whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsciError {
    NotSupported,
    InvalidParameters,
    Denied,
    AlreadyOn,
    OnPending,
    InternalFailure,
}

impl PsciError {
    pub const fn status(self) -> Status {
        match self {
            PsciError::NotSupported => Status::NotSupported,
            PsciError::InvalidParameters => Status::InvalidParameters,
            PsciError::Denied => Status::Denied,
            PsciError::AlreadyOn => Status::AlreadyOn,
            PsciError::OnPending => Status::OnPending,
            PsciError::InternalFailure => Status::InternalFailure,
        }
    }

    /// The protocol return code.
    pub const fn code(self) -> i32 {
        self.status().code()
    }
}
