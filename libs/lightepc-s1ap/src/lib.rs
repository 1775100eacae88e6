//! S1AP control-plane subscriber registry for a simplified LTE MME.
//!
//! The engine consumes S1AP signalling events exchanged between eNodeBs
//! and the MME, maintains per-subscriber state across permanent (IMSI) and
//! temporary (M-TMSI, eNodeB) identities, and derives registration
//! notifications (`Reg`, `UnReg`, `CgiChange`) for downstream consumers.
//!
//! Transport, S1AP decode and the clock live outside the engine: callers
//! feed [`Event`] values into [`S1apDb::handle`] and drive
//! [`S1apDb::handle_timeouts`] with an externally supplied monotonic
//! timestamp. All failures come back by value; nothing is thrown.

pub mod context;
pub mod error;
pub mod event;
pub mod output;
pub mod subscriber;
pub mod types;

#[cfg(test)]
mod property_tests;

pub use context::{s1ap_self, S1apDb};
pub use error::{DbError, EventError, HandleError, HandleOut};
pub use event::{Event, EventBuilder, EventType};
pub use output::{OutputType, S1apOut};
pub use subscriber::{Subscriber, SubscriberState};
pub use types::{Cgi, EnodebId, Imsi, MTmsi, MmeId, Timestamp, INITIAL_MTMSI};
