//! Error types for the protocol engines
//!
//! Every failure aborts the whole operation; nothing here is recovered
//! internally. `ErrorKind` groups the variants for callers that only need to
//! know what class of problem occurred.

use thiserror::Error;

use sarco_core::{Address, Amount, ResourceId};

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Broad classification of a `ProtocolError`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Resource or profile absent
    NotFound,
    /// Duplicate terminal action
    Duplicate,
    /// Caller is not allowed to perform the action
    Unauthorized,
    /// Called outside the permitted time window
    WindowViolation,
    /// Parameters break a structural invariant
    InvariantViolation,
    /// A signature, hash or accusal proof did not check out
    ProofFailure,
    /// Bond or payment could not be covered
    FundsFailure,
    /// Resource is no longer in a state that accepts the action
    StateViolation,
    /// Persistence, configuration or encoding problem
    Storage,
}

/// Errors that can occur in protocol operations
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Resource does not exist
    #[error("Resource not found: {0}")]
    NotFound(ResourceId),

    /// Caller has no custodian profile
    #[error("Custodian not registered: {0}")]
    NotRegistered(Address),

    /// Resource id already taken
    #[error("Resource already exists: {0}")]
    AlreadyExists(ResourceId),

    /// Custodian profile already exists
    #[error("Custodian already registered: {0}")]
    AlreadyRegistered(Address),

    #[error("Key share already published")]
    AlreadyPublished,

    #[error("Custodian already accused")]
    AlreadyAccused,

    #[error("Resource already cleaned")]
    AlreadyCleaned,

    #[error("Resource already compromised")]
    AlreadyCompromised,

    #[error("Caller is not the embalmer")]
    NotEmbalmer,

    #[error("Custodian {0} is not bonded to this resource")]
    NotOnResource(Address),

    #[error("Caller is neither the embalmer nor the admin")]
    NotEmbalmerOrAdmin,

    #[error("Caller is not the admin")]
    NotAdmin,

    #[error("Too early: resurrection time not reached")]
    TooEarly,

    #[error("Too late: grace period has ended")]
    TooLate,

    #[error("Too late to accuse: resurrection time has passed")]
    TooLateToAccuse,

    #[error("Embalmer claim window has passed")]
    ClaimWindowPassed,

    #[error("Admin may only clean after the embalmer claim window closes")]
    TooEarlyForAdminClean,

    #[error("Resurrection time has already passed")]
    ExpiredResource,

    #[error("New resurrection time must be in the future")]
    NewTimeInPast,

    #[error("New resurrection time {requested} exceeds limit {limit}")]
    NewTimeTooFar { requested: u64, limit: u64 },

    #[error("Signed parameters expired (created at {creation_time}, now {now})")]
    ParametersExpired { creation_time: u64, now: u64 },

    #[error("Creation time {0} is in the future")]
    CreationTimeInFuture(u64),

    #[error("Resurrection time must be in the future")]
    ResurrectionTimeInPast,

    #[error("Resurrection time exceeds the maximum rewrap interval")]
    ResurrectionTimeTooFar,

    #[error("Resource is no longer active")]
    Inactive,

    #[error("Resource is compromised")]
    Compromised,

    #[error("Invalid threshold {threshold} for {custodians} custodians")]
    InvalidThreshold { threshold: u32, custodians: usize },

    #[error("No custodians supplied")]
    NoCustodians,

    #[error("Duplicate custodian: {0}")]
    DuplicateCustodian(Address),

    #[error("Commitment already used by another custodian: {0}")]
    DuplicateCommitment(Address),

    #[error("Term must be non-zero: {0}")]
    ZeroTerm(&'static str),

    #[error("Fee offered to {0} is below the custodian's minimum")]
    FeeBelowMinimum(Address),

    #[error("Rewrap interval exceeds the terms of custodian {0}")]
    IntervalExceedsTerms(Address),

    #[error("Resurrection time exceeds the terms of custodian {0}")]
    ResurrectionExceedsTerms(Address),

    #[error("Commitment of {0} does not match the resource's reveal mode")]
    CommitmentModeMismatch(Address),

    #[error("Operation does not match the resource's reveal mode")]
    WrongRevealMode,

    #[error("Invalid signature from custodian {0}")]
    InvalidSignature(Address),

    #[error("Published secret does not match the stored commitment")]
    HashMismatch,

    #[error("Not enough proof supplied")]
    NotEnoughProof,

    #[error("Supplied secret matches no custodian on this resource")]
    IncorrectProof,

    #[error("Insufficient free bond for {custodian}: required {required}, available {available}")]
    InsufficientFreeBond {
        custodian: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Payment failed: {0}")]
    PaymentFailed(String),

    #[error("Nothing to withdraw")]
    NothingToWithdraw,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Arithmetic overflow")]
    ArithmeticOverflow,

    /// Core library error
    #[error("Core error: {0}")]
    Core(#[from] sarco_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProtocolError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        use ProtocolError::*;
        match self {
            NotFound(_) | NotRegistered(_) => ErrorKind::NotFound,
            AlreadyExists(_) | AlreadyRegistered(_) | AlreadyPublished | AlreadyAccused
            | AlreadyCleaned | AlreadyCompromised => ErrorKind::Duplicate,
            NotEmbalmer | NotOnResource(_) | NotEmbalmerOrAdmin | NotAdmin => {
                ErrorKind::Unauthorized
            }
            TooEarly
            | TooLate
            | TooLateToAccuse
            | ClaimWindowPassed
            | TooEarlyForAdminClean
            | ExpiredResource
            | NewTimeInPast
            | NewTimeTooFar { .. }
            | ParametersExpired { .. }
            | CreationTimeInFuture(_)
            | ResurrectionTimeInPast
            | ResurrectionTimeTooFar => ErrorKind::WindowViolation,
            Inactive | Compromised | WrongRevealMode => ErrorKind::StateViolation,
            InvalidThreshold { .. }
            | NoCustodians
            | DuplicateCustodian(_)
            | DuplicateCommitment(_)
            | ZeroTerm(_)
            | FeeBelowMinimum(_)
            | IntervalExceedsTerms(_)
            | ResurrectionExceedsTerms(_)
            | CommitmentModeMismatch(_)
            | ArithmeticOverflow => ErrorKind::InvariantViolation,
            InvalidSignature(_) | HashMismatch | NotEnoughProof | IncorrectProof => {
                ErrorKind::ProofFailure
            }
            InsufficientFreeBond { .. } | PaymentFailed(_) | NothingToWithdraw => {
                ErrorKind::FundsFailure
            }
            InvalidConfig(_) | Core(_) | Io(_) | Serialization(_) => ErrorKind::Storage,
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(e: serde_json::Error) -> Self {
        ProtocolError::Serialization(e.to_string())
    }
}
