//! Engine Error Taxonomy
//!
//! All failures are returned by value. Event-shape failures and registry
//! failures are separate enums; [`HandleError`] is the union the dispatcher
//! surfaces to callers.

use thiserror::Error;

use crate::output::S1apOut;

/// Errors raised by event shape validation.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventError {
    /// Event tag is not one of the handled S1AP event types
    #[error("unknown event type")]
    WrongEventType,

    /// Attach request carries both an IMSI and an M-TMSI
    #[error("attach request carries both IMSI and M-TMSI")]
    WrongImsiAndMTmsiArgs,

    /// Attach request carries neither an IMSI nor an M-TMSI
    #[error("attach request carries neither IMSI nor M-TMSI")]
    MissingImsiOrMTmsi,

    /// Required IMSI field is absent
    #[error("IMSI missing from event")]
    ImsiNotExist,

    /// IMSI field is unusable
    #[error("bad IMSI")]
    BadImsi,

    /// Required eNodeB ID field is absent
    #[error("eNodeB ID missing from event")]
    BadEnodebId,

    /// Required M-TMSI field is absent
    #[error("M-TMSI missing from event")]
    BadMTmsi,

    /// Required MME ID field is absent
    #[error("MME ID missing from event")]
    BadMmeId,

    /// Required CGI field is absent or unusable
    #[error("CGI missing from event or unusable")]
    BadCgi,
}

/// Errors raised by the registry while applying a verified event.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbError {
    /// No subscriber record for the IMSI
    #[error("no subscriber for IMSI")]
    ImsiNotExists,

    /// No mapping for the M-TMSI
    #[error("no IMSI mapping for M-TMSI")]
    MTmsiNotExists,

    /// Identity resolved but the subscriber record is gone
    #[error("subscriber not found")]
    SubscriberNotFound,

    /// Event cannot be applied in the subscriber's current state
    #[error("event not applicable in current subscriber state")]
    InvalidStateForEvent,

    /// Event resolves to no IMSI, directly or via the M-TMSI index
    #[error("event resolves no IMSI or M-TMSI")]
    NoImsiOrMTmsiInEvent,

    /// An outstanding identity request expired
    #[error("identity request timed out")]
    TimeoutOccurred,

    /// Subscriber state does not permit this procedure
    #[error("wrong subscriber state")]
    WrongState,
}

/// Union error returned by [`S1apDb::handle`](crate::context::S1apDb::handle).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Event failed shape validation
    #[error(transparent)]
    Event(#[from] EventError),

    /// Event was valid but the registry could not apply it
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Result of handling one event: an optional downstream notification.
pub type HandleOut = Result<Option<S1apOut>, HandleError>;
