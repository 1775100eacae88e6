//! S1AP Signalling Events
//!
//! One immutable record per signalling message exchanged between an eNodeB
//! and the MME. Each event type has a fixed required-field mask enforced by
//! [`Event::verify`]; the named factories produce the legal wire shapes,
//! and [`EventBuilder`] assembles events from untrusted field bags (wire
//! decode, malformed-shape tests). Validation is pure: no registry reads.

use std::fmt;
use std::str::FromStr;

use crate::error::EventError;
use crate::types::{Cgi, EnodebId, Imsi, MTmsi, MmeId, Timestamp};

// ============================================================================
// Event Types
// ============================================================================

/// S1AP event types handled by the engine.
///
/// Direction notes are documentation; the engine does not enforce them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// eNodeB -> MME
    AttachRequest,
    /// eNodeB -> MME
    IdentityResponse,
    /// MME -> eNodeB
    AttachAccept,
    /// eNodeB -> MME
    Paging,
    /// eNodeB -> MME
    PathSwitchRequest,
    /// MME -> eNodeB
    PathSwitchRequestAcknowledge,
    /// MME -> eNodeB
    UeContextReleaseCommand,
    /// eNodeB -> MME
    UeContextReleaseResponse,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventType::AttachRequest => write!(f, "AttachRequest"),
            EventType::IdentityResponse => write!(f, "IdentityResponse"),
            EventType::AttachAccept => write!(f, "AttachAccept"),
            EventType::Paging => write!(f, "Paging"),
            EventType::PathSwitchRequest => write!(f, "PathSwitchRequest"),
            EventType::PathSwitchRequestAcknowledge => {
                write!(f, "PathSwitchRequestAcknowledge")
            }
            EventType::UeContextReleaseCommand => write!(f, "UEContextReleaseCommand"),
            EventType::UeContextReleaseResponse => write!(f, "UEContextReleaseResponse"),
        }
    }
}

impl FromStr for EventType {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AttachRequest" => Ok(EventType::AttachRequest),
            "IdentityResponse" => Ok(EventType::IdentityResponse),
            "AttachAccept" => Ok(EventType::AttachAccept),
            "Paging" => Ok(EventType::Paging),
            "PathSwitchRequest" => Ok(EventType::PathSwitchRequest),
            "PathSwitchRequestAcknowledge" => Ok(EventType::PathSwitchRequestAcknowledge),
            "UEContextReleaseCommand" => Ok(EventType::UeContextReleaseCommand),
            "UEContextReleaseResponse" => Ok(EventType::UeContextReleaseResponse),
            _ => Err(EventError::WrongEventType),
        }
    }
}

// ============================================================================
// Event
// ============================================================================

/// One S1AP signalling event.
///
/// Never mutated after construction. Which optional identifiers must be
/// present depends on the event type; see [`Event::verify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: EventType,
    timestamp: Timestamp,
    imsi: Option<Imsi>,
    m_tmsi: Option<MTmsi>,
    enodeb_id: Option<EnodebId>,
    mme_id: Option<MmeId>,
    cgi: Option<Cgi>,
}

impl Event {
    /// Attach Request identifying the subscriber by permanent IMSI.
    pub fn attach_request_with_imsi(
        timestamp: Timestamp,
        imsi: Imsi,
        enodeb_id: EnodebId,
        cgi: Cgi,
    ) -> Self {
        Self::builder(EventType::AttachRequest, timestamp)
            .imsi(imsi)
            .enodeb_id(enodeb_id)
            .cgi(cgi)
            .build()
    }

    /// Attach Request identifying the subscriber by a previously issued M-TMSI.
    pub fn attach_request_with_mtmsi(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        m_tmsi: MTmsi,
        cgi: Cgi,
    ) -> Self {
        Self::builder(EventType::AttachRequest, timestamp)
            .enodeb_id(enodeb_id)
            .m_tmsi(m_tmsi)
            .cgi(cgi)
            .build()
    }

    /// Identity Response resolving a pending identity request.
    pub fn identity_response(
        timestamp: Timestamp,
        imsi: Imsi,
        enodeb_id: EnodebId,
        mme_id: MmeId,
        cgi: Cgi,
    ) -> Self {
        Self::builder(EventType::IdentityResponse, timestamp)
            .imsi(imsi)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .cgi(cgi)
            .build()
    }

    /// Attach Accept sent back towards the eNodeB.
    pub fn attach_accept(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        mme_id: MmeId,
        m_tmsi: MTmsi,
    ) -> Self {
        Self::builder(EventType::AttachAccept, timestamp)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .m_tmsi(m_tmsi)
            .build()
    }

    /// Paging attempt for an idle subscriber.
    pub fn paging(timestamp: Timestamp, m_tmsi: MTmsi, cgi: Cgi) -> Self {
        Self::builder(EventType::Paging, timestamp)
            .m_tmsi(m_tmsi)
            .cgi(cgi)
            .build()
    }

    /// Path Switch Request starting a handover away from `enodeb_id`.
    pub fn path_switch_request(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        mme_id: MmeId,
        cgi: Cgi,
    ) -> Self {
        Self::builder(EventType::PathSwitchRequest, timestamp)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .cgi(cgi)
            .build()
    }

    /// Path Switch Request Acknowledge.
    pub fn path_switch_request_acknowledge(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        mme_id: MmeId,
    ) -> Self {
        Self::builder(EventType::PathSwitchRequestAcknowledge, timestamp)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .build()
    }

    /// UE Context Release Command.
    pub fn ue_context_release_command(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        mme_id: MmeId,
        cgi: Cgi,
    ) -> Self {
        Self::builder(EventType::UeContextReleaseCommand, timestamp)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .cgi(cgi)
            .build()
    }

    /// UE Context Release Response, completing a subscriber teardown.
    pub fn ue_context_release_response(
        timestamp: Timestamp,
        enodeb_id: EnodebId,
        mme_id: MmeId,
    ) -> Self {
        Self::builder(EventType::UeContextReleaseResponse, timestamp)
            .enodeb_id(enodeb_id)
            .mme_id(mme_id)
            .build()
    }

    /// Free-form assembly, for wire decode and tests. The result is
    /// unverified; [`Event::verify`] is the gate.
    pub fn builder(event_type: EventType, timestamp: Timestamp) -> EventBuilder {
        EventBuilder {
            event: Event {
                event_type,
                timestamp,
                imsi: None,
                m_tmsi: None,
                enodeb_id: None,
                mme_id: None,
                cgi: None,
            },
        }
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn imsi(&self) -> Option<Imsi> {
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

    /// Check the event against its type's required-field mask.
    pub fn verify(&self) -> Result<(), EventError> {
        match self.event_type {
            EventType::AttachRequest => self.verify_attach_request(),
            EventType::IdentityResponse => self.verify_identity_response(),
            EventType::AttachAccept => self.verify_attach_accept(),
            EventType::Paging => self.verify_paging(),
            EventType::PathSwitchRequest => self.verify_path_switch_request(),
            EventType::PathSwitchRequestAcknowledge
            | EventType::UeContextReleaseResponse => {
                self.require_enodeb_id()?;
                self.require_mme_id()?;
                Ok(())
            }
            EventType::UeContextReleaseCommand => {
                self.require_enodeb_id()?;
                self.require_mme_id()?;
                self.require_cgi()?;
                Ok(())
            }
        }
    }

    fn verify_attach_request(&self) -> Result<(), EventError> {
        if self.imsi.is_some() && self.m_tmsi.is_some() {
            return Err(EventError::WrongImsiAndMTmsiArgs);
        }
        if self.imsi.is_none() && self.m_tmsi.is_none() {
            return Err(EventError::MissingImsiOrMTmsi);
        }
        self.require_enodeb_id()?;
        self.require_cgi()?;
        Ok(())
    }

    fn verify_identity_response(&self) -> Result<(), EventError> {
        self.require_imsi()?;
        self.require_enodeb_id()?;
        self.require_mme_id()?;
        self.require_cgi()?;
        Ok(())
    }

    fn verify_attach_accept(&self) -> Result<(), EventError> {
        self.require_enodeb_id()?;
        self.require_mme_id()?;
        self.require_m_tmsi()?;
        Ok(())
    }

    fn verify_paging(&self) -> Result<(), EventError> {
        self.require_m_tmsi()?;
        self.require_cgi()?;
        Ok(())
    }

    fn verify_path_switch_request(&self) -> Result<(), EventError> {
        self.require_enodeb_id()?;
        self.require_mme_id()?;
        // Byte 0 of the CGI names the target eNodeB, so an empty blob is
        // as unusable as a missing one.
        let cgi = self.require_cgi()?;
        if cgi.is_empty() {
            return Err(EventError::BadCgi);
        }
        Ok(())
    }

    pub(crate) fn require_imsi(&self) -> Result<Imsi, EventError> {
        self.imsi.ok_or(EventError::ImsiNotExist)
    }

    pub(crate) fn require_m_tmsi(&self) -> Result<MTmsi, EventError> {
        self.m_tmsi.ok_or(EventError::BadMTmsi)
    }

    pub(crate) fn require_enodeb_id(&self) -> Result<EnodebId, EventError> {
        self.enodeb_id.ok_or(EventError::BadEnodebId)
    }

    pub(crate) fn require_mme_id(&self) -> Result<MmeId, EventError> {
        self.mme_id.ok_or(EventError::BadMmeId)
    }

    pub(crate) fn require_cgi(&self) -> Result<&Cgi, EventError> {
        self.cgi.as_ref().ok_or(EventError::BadCgi)
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Assembles an [`Event`] field by field without validation.
#[derive(Debug)]
pub struct EventBuilder {
    event: Event,
}

impl EventBuilder {
    pub fn imsi(mut self, imsi: Imsi) -> Self {
        self.event.imsi = Some(imsi);
        self
    }

    pub fn m_tmsi(mut self, m_tmsi: MTmsi) -> Self {
        self.event.m_tmsi = Some(m_tmsi);
        self
    }

    pub fn enodeb_id(mut self, enodeb_id: EnodebId) -> Self {
        self.event.enodeb_id = Some(enodeb_id);
        self
    }

    pub fn mme_id(mut self, mme_id: MmeId) -> Self {
        self.event.mme_id = Some(mme_id);
        self
    }

    pub fn cgi(mut self, cgi: Cgi) -> Self {
        self.event.cgi = Some(cgi);
        self
    }

    pub fn build(self) -> Event {
        self.event
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
