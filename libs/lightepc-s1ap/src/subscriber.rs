//! Per-Subscriber Record
//!
//! One mutable record per known IMSI. The record owns only field-level
//! invariants (the IMSI never changes after creation); all transition
//! policy lives in the registry.

use std::fmt;

use crate::event::EventType;
use crate::types::{Cgi, EnodebId, Imsi, MTmsi, MmeId, Timestamp};

/// Subscriber FSM states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriberState {
    /// No context; observed only transiently during teardown
    Detached,
    /// Identity request outstanding
    Attaching,
    /// Registered and reachable
    Attached,
    /// Network-initiated paging in progress
    PagingState,
    /// Service request outstanding
    ServiceRequestPending,
    /// Handover between eNodeBs in progress
    HandoverState,
    /// Context release in progress
    Releasing,
}

impl fmt::Display for SubscriberState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberState::Detached => write!(f, "DETACHED"),
            SubscriberState::Attaching => write!(f, "ATTACHING"),
            SubscriberState::Attached => write!(f, "ATTACHED"),
            SubscriberState::PagingState => write!(f, "PAGING_STATE"),
            SubscriberState::ServiceRequestPending => write!(f, "SERVICE_REQUEST_PENDING"),
            SubscriberState::HandoverState => write!(f, "HANDOVER_STATE"),
            SubscriberState::Releasing => write!(f, "RELEASING"),
        }
    }
}

/// Registry record for one subscriber, keyed by IMSI.
#[derive(Debug, Clone)]
pub struct Subscriber {
    imsi: Imsi,
    m_tmsi: Option<MTmsi>,
    enodeb_id: Option<EnodebId>,
    mme_id: Option<MmeId>,
    cgi: Option<Cgi>,
    state: SubscriberState,
    last_event_type: EventType,
    last_event_timestamp: Timestamp,
}

impl Subscriber {
    /// Fresh record in `Detached`; the creating handler applies the first
    /// real transition immediately.
    pub fn new(imsi: Imsi, event_type: EventType, timestamp: Timestamp) -> Self {
        Self {
            imsi,
            m_tmsi: None,
            enodeb_id: None,
            mme_id: None,
            cgi: None,
            state: SubscriberState::Detached,
            last_event_type: event_type,
            last_event_timestamp: timestamp,
        }
    }

    pub fn imsi(&self) -> Imsi {
        self.imsi
    }

    pub fn m_tmsi(&self) -> Option<MTmsi> {
        self.m_tmsi
    }

    pub fn enodeb_id(&self) -> Option<EnodebId> {
        self.enodeb_id
    }

    pub fn mme_id(&self) -> Option<MmeId> {
        self.mme_id
    }

    pub fn cgi(&self) -> Option<&Cgi> {
        self.cgi.as_ref()
    }

    pub fn state(&self) -> SubscriberState {
        self.state
    }

    pub fn last_event_type(&self) -> EventType {
        self.last_event_type
    }

    pub fn last_event_timestamp(&self) -> Timestamp {
        self.last_event_timestamp
    }

    pub fn set_m_tmsi(&mut self, m_tmsi: MTmsi) {
        self.m_tmsi = Some(m_tmsi);
    }

    pub fn set_enodeb_id(&mut self, enodeb_id: EnodebId) {
        self.enodeb_id = Some(enodeb_id);
    }

    /// Drop the eNodeB binding, e.g. when another subscriber takes over
    /// the cell.
    pub fn clear_enodeb_id(&mut self) {
        self.enodeb_id = None;
    }

    pub fn set_mme_id(&mut self, mme_id: MmeId) {
        self.mme_id = Some(mme_id);
    }

    pub fn set_cgi(&mut self, cgi: Cgi) {
        self.cgi = Some(cgi);
    }

    pub fn set_state(&mut self, state: SubscriberState) {
        self.state = state;
    }

    pub fn set_last_event(&mut self, event_type: EventType, timestamp: Timestamp) {
        self.last_event_type = event_type;
        self.last_event_timestamp = timestamp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_subscriber_starts_detached_and_bare() {
        let subscriber = Subscriber::new(12345, EventType::AttachRequest, 1000);

        assert_eq!(subscriber.imsi(), 12345);
        assert_eq!(subscriber.state(), SubscriberState::Detached);
        assert_eq!(subscriber.m_tmsi(), None);
        assert_eq!(subscriber.enodeb_id(), None);
        assert_eq!(subscriber.mme_id(), None);
        assert_eq!(subscriber.cgi(), None);
        assert_eq!(subscriber.last_event_type(), EventType::AttachRequest);
        assert_eq!(subscriber.last_event_timestamp(), 1000);
    }

    #[test]
    fn test_set_last_event_updates_both_fields() {
        let mut subscriber = Subscriber::new(12345, EventType::AttachRequest, 1000);
        subscriber.set_last_event(EventType::Paging, 2000);

        assert_eq!(subscriber.last_event_type(), EventType::Paging);
        assert_eq!(subscriber.last_event_timestamp(), 2000);
    }

    #[test]
    fn test_enodeb_binding_can_be_cleared() {
        let mut subscriber = Subscriber::new(12345, EventType::AttachRequest, 1000);
        subscriber.set_enodeb_id(42);
        assert_eq!(subscriber.enodeb_id(), Some(42));

        subscriber.clear_enodeb_id();
        assert_eq!(subscriber.enodeb_id(), None);
    }
}
