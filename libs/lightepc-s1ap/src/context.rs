//! S1AP Subscriber Registry
//!
//! The registry owns every known subscriber plus the temporary-identity
//! indices, dispatches verified events to per-event processors and derives
//! the outbound notification stream. Single-writer: callers that share an
//! instance across threads serialize externally (or use [`s1ap_self`]).
//!
//! Index discipline: the secondary indices map temporary identities back
//! to IMSIs, never to the records themselves; the primary map is the sole
//! owner of every [`Subscriber`].

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use crate::error::{DbError, EventError, HandleOut};
use crate::event::{Event, EventType};
use crate::output::{OutputType, S1apOut};
use crate::subscriber::{Subscriber, SubscriberState};
use crate::types::{Cgi, EnodebId, Imsi, MTmsi, MmeId, Timestamp, INITIAL_MTMSI};

/// Derive the target eNodeB identifier from a Path Switch Request CGI.
///
/// Byte 0 of the CGI blob names the target eNodeB in the current wire
/// contract. A real E-CGI decode replaces this function wholesale.
fn target_enodeb_from_cgi(cgi: &Cgi) -> Option<EnodebId> {
    cgi.first().map(|&byte| EnodebId::from(byte))
}

// ============================================================================
// Registry
// ============================================================================

/// Event-driven subscriber registry for the S1AP control plane.
#[derive(Debug)]
pub struct S1apDb {
    /// Primary store; exclusive owner of every subscriber record
    pub(crate) imsi_to_subscriber: HashMap<Imsi, Subscriber>,
    /// M-TMSI -> IMSI, unique on both sides at any instant
    pub(crate) mtmsi_to_imsi: HashMap<MTmsi, Imsi>,
    /// eNodeB -> IMSI of the subscriber currently reachable via that cell
    pub(crate) enodeb_id_to_imsi: HashMap<EnodebId, Imsi>,
    /// MME ID -> IMSI; write side only, kept for forward compatibility
    pub(crate) mme_id_to_imsi: HashMap<MmeId, Imsi>,
    /// Deadline of the outstanding identity request, per attaching IMSI
    pub(crate) imsi_to_identity_request_timeout: HashMap<Imsi, Timestamp>,
    pub(crate) next_mtmsi: MTmsi,
}

impl S1apDb {
    pub fn new() -> Self {
        Self {
            imsi_to_subscriber: HashMap::new(),
            mtmsi_to_imsi: HashMap::new(),
            enodeb_id_to_imsi: HashMap::new(),
            mme_id_to_imsi: HashMap::new(),
            imsi_to_identity_request_timeout: HashMap::new(),
            next_mtmsi: INITIAL_MTMSI,
        }
    }

    /// Number of subscribers currently known to the registry.
    pub fn subscriber_count(&self) -> usize {
        self.imsi_to_subscriber.len()
    }

    /// Apply one signalling event.
    ///
    /// Verifies the event shape first, then dispatches to the per-type
    /// processor. `Ok(None)` means the event was absorbed without a
    /// downstream notification.
    pub fn handle(&mut self, event: &Event) -> HandleOut {
        event.verify()?;

        match event.event_type() {
            EventType::AttachRequest => self.handle_attach_request(event),
            EventType::IdentityResponse => self.handle_identity_response(event),
            EventType::Paging => self.handle_paging(event),
            EventType::PathSwitchRequest => self.handle_path_switch_request(event),
            EventType::UeContextReleaseResponse => {
                self.handle_ue_context_release_response(event)
            }
            EventType::AttachAccept
            | EventType::PathSwitchRequestAcknowledge
            | EventType::UeContextReleaseCommand => self.handle_mme_originated(event),
        }
    }

    /// Tear down subscribers whose outstanding identity request expired.
    ///
    /// A subscriber reaped here never produced a `Reg`, so no `UnReg` is
    /// emitted. Idempotent; safe to call at any cadence.
    pub fn handle_timeouts(&mut self, now: Timestamp) {
        let expired: Vec<Imsi> = self
            .imsi_to_identity_request_timeout
            .iter()
            .filter(|&(_, &deadline)| deadline <= now)
            .map(|(&imsi, _)| imsi)
            .collect();

        for imsi in expired {
            self.imsi_to_identity_request_timeout.remove(&imsi);

            let attaching = self
                .imsi_to_subscriber
                .get(&imsi)
                .is_some_and(|subscriber| subscriber.state() == SubscriberState::Attaching);
            if attaching {
                log::warn!("identity request for user {imsi} timed out, tearing down");
                self.detach_subscriber(imsi);
            }
        }
    }

    // ------------------------------------------------------------------------
    // Identity resolution
    // ------------------------------------------------------------------------

    fn resolve_imsi_from_event(&self, event: &Event) -> Result<Imsi, DbError> {
        if let Some(imsi) = event.imsi() {
            return Ok(imsi);
        }
        event
            .m_tmsi()
            .and_then(|m_tmsi| self.mtmsi_to_imsi.get(&m_tmsi).copied())
            .ok_or(DbError::NoImsiOrMTmsiInEvent)
    }

    fn resolve_imsi_from_enodeb_id(&self, enodeb_id: EnodebId) -> Result<Imsi, DbError> {
        self.enodeb_id_to_imsi
            .get(&enodeb_id)
            .copied()
            .ok_or(DbError::SubscriberNotFound)
    }

    // ------------------------------------------------------------------------
    // Attach
    // ------------------------------------------------------------------------

    fn handle_attach_request(&mut self, event: &Event) -> HandleOut {
        let imsi = match self.resolve_imsi_from_event(event) {
            Ok(imsi) => imsi,
            Err(err) => {
                if let Some(m_tmsi) = event.m_tmsi() {
                    log::info!(
                        "attach request with unknown M-TMSI {m_tmsi}, sending identity request"
                    );
                    return Ok(None);
                }
                return Err(err.into());
            }
        };

        match self.imsi_to_subscriber.get(&imsi).map(Subscriber::state) {
            None => self.process_new_attach(imsi, event),
            Some(SubscriberState::Attached) => self.process_duplicate_attach(imsi, event),
            Some(_) => self.process_existing_attach(imsi, event),
        }
    }

    fn process_new_attach(&mut self, imsi: Imsi, event: &Event) -> HandleOut {
        let enodeb_id = event.require_enodeb_id()?;

        let m_tmsi = self.generate_new_mtmsi();
        let mut subscriber = Subscriber::new(imsi, event.event_type(), event.timestamp());
        subscriber.set_state(SubscriberState::Attached);
        subscriber.set_m_tmsi(m_tmsi);
        if let Some(cgi) = event.cgi() {
            subscriber.set_cgi(cgi.clone());
        }
        self.imsi_to_subscriber.insert(imsi, subscriber);

        self.mtmsi_to_imsi.insert(m_tmsi, imsi);
        self.bind_enodeb(imsi, enodeb_id);

        log::info!("user {imsi} attached, assigned M-TMSI {m_tmsi}");
        Ok(Some(S1apOut::new(OutputType::Reg, imsi, event.cgi().cloned())))
    }

    fn process_duplicate_attach(&mut self, imsi: Imsi, event: &Event) -> HandleOut {
        if let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) {
            subscriber.set_last_event(event.event_type(), event.timestamp());
        }

        log::info!("user {imsi} already attached, ignoring duplicate attach request");
        Ok(None)
    }

    fn process_existing_attach(&mut self, imsi: Imsi, event: &Event) -> HandleOut {
        let enodeb_id = event.require_enodeb_id()?;
        let m_tmsi = self.current_or_fresh_mtmsi(imsi)?;

        let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) else {
            return Err(DbError::SubscriberNotFound.into());
        };
        subscriber.set_state(SubscriberState::Attached);
        subscriber.set_m_tmsi(m_tmsi);
        if let Some(cgi) = event.cgi() {
            subscriber.set_cgi(cgi.clone());
        }
        subscriber.set_last_event(event.event_type(), event.timestamp());
        self.bind_enodeb(imsi, enodeb_id);

        log::info!("user {imsi} re-attached, current M-TMSI {m_tmsi}");
        Ok(Some(S1apOut::new(OutputType::Reg, imsi, event.cgi().cloned())))
    }

    // ------------------------------------------------------------------------
    // Identity response
    // ------------------------------------------------------------------------

    fn handle_identity_response(&mut self, event: &Event) -> HandleOut {
        let imsi = event.require_imsi()?;

        match self.imsi_to_subscriber.get(&imsi).map(Subscriber::state) {
            None => self.process_identity_response_new_user(imsi, event),
            Some(SubscriberState::Attaching) => {
                self.process_identity_response_attaching_user(imsi, event)
            }
            Some(state) => {
                log::warn!(
                    "identity response for user {imsi} in unexpected state {state}, ignoring"
                );
                Ok(None)
            }
        }
    }

    fn process_identity_response_new_user(&mut self, imsi: Imsi, event: &Event) -> HandleOut {
        let enodeb_id = event.require_enodeb_id()?;
        let mme_id = event.require_mme_id()?;

        let m_tmsi = self.generate_new_mtmsi();
        let mut subscriber = Subscriber::new(imsi, event.event_type(), event.timestamp());
        subscriber.set_state(SubscriberState::Attached);
        subscriber.set_m_tmsi(m_tmsi);
        subscriber.set_mme_id(mme_id);
        if let Some(cgi) = event.cgi() {
            subscriber.set_cgi(cgi.clone());
        }
        self.imsi_to_subscriber.insert(imsi, subscriber);

        self.mtmsi_to_imsi.insert(m_tmsi, imsi);
        self.mme_id_to_imsi.insert(mme_id, imsi);
        self.bind_enodeb(imsi, enodeb_id);
        self.imsi_to_identity_request_timeout.remove(&imsi);

        log::info!("identity response for user {imsi}, user attached, assigned M-TMSI {m_tmsi}");
        Ok(Some(S1apOut::new(OutputType::Reg, imsi, event.cgi().cloned())))
    }

    fn process_identity_response_attaching_user(
        &mut self,
        imsi: Imsi,
        event: &Event,
    ) -> HandleOut {
        let enodeb_id = event.require_enodeb_id()?;
        let mme_id = event.require_mme_id()?;
        let m_tmsi = self.current_or_fresh_mtmsi(imsi)?;

        let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) else {
            return Err(DbError::SubscriberNotFound.into());
        };
        subscriber.set_state(SubscriberState::Attached);
        subscriber.set_m_tmsi(m_tmsi);
        subscriber.set_mme_id(mme_id);
        if let Some(cgi) = event.cgi() {
            subscriber.set_cgi(cgi.clone());
        }
        subscriber.set_last_event(event.event_type(), event.timestamp());

        self.mme_id_to_imsi.insert(mme_id, imsi);
        self.bind_enodeb(imsi, enodeb_id);
        self.imsi_to_identity_request_timeout.remove(&imsi);

        log::info!("user {imsi} moved from ATTACHING to ATTACHED, current M-TMSI {m_tmsi}");
        Ok(Some(S1apOut::new(OutputType::Reg, imsi, event.cgi().cloned())))
    }

    // ------------------------------------------------------------------------
    // Paging
    // ------------------------------------------------------------------------

    fn handle_paging(&mut self, event: &Event) -> HandleOut {
        let imsi = self.resolve_imsi_from_event(event)?;

        let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) else {
            log::error!("paging for non-existent subscriber IMSI {imsi}");
            return Err(DbError::SubscriberNotFound.into());
        };

        match subscriber.state() {
            SubscriberState::Attached | SubscriberState::Detached => {
                subscriber.set_last_event(event.event_type(), event.timestamp());
                subscriber.set_state(SubscriberState::PagingState);
                log::info!("paging for user {imsi}, entering PAGING_STATE");
                Ok(None)
            }
            state => {
                log::warn!("paging for user {imsi} in unexpected state {state}, ignoring");
                Ok(None)
            }
        }
    }

    // ------------------------------------------------------------------------
    // Path switch
    // ------------------------------------------------------------------------

    fn handle_path_switch_request(&mut self, event: &Event) -> HandleOut {
        let source_enodeb_id = event.require_enodeb_id()?;
        let cgi = event.require_cgi()?.clone();

        let imsi = self.resolve_imsi_from_enodeb_id(source_enodeb_id)?;
        let Some(subscriber) = self.imsi_to_subscriber.get(&imsi) else {
            log::error!("path switch request for non-existent subscriber IMSI {imsi}");
            return Err(DbError::SubscriberNotFound.into());
        };
        if subscriber.state() != SubscriberState::Attached {
            log::warn!(
                "path switch request for user {imsi} in unexpected state {}, rejecting",
                subscriber.state()
            );
            return Err(DbError::WrongState.into());
        }

        let Some(target_enodeb_id) = target_enodeb_from_cgi(&cgi) else {
            return Err(EventError::BadCgi.into());
        };

        if let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) {
            subscriber.set_last_event(event.event_type(), event.timestamp());
            subscriber.set_state(SubscriberState::HandoverState);
        }
        self.bind_enodeb(imsi, target_enodeb_id);

        log::info!(
            "path switch request for user {imsi}, moved from eNodeB {source_enodeb_id} to {target_enodeb_id}"
        );
        Ok(Some(S1apOut::new(OutputType::CgiChange, imsi, Some(cgi))))
    }

    // ------------------------------------------------------------------------
    // Release
    // ------------------------------------------------------------------------

    fn handle_ue_context_release_response(&mut self, event: &Event) -> HandleOut {
        let enodeb_id = event.require_enodeb_id()?;
        let imsi = self.resolve_imsi_from_enodeb_id(enodeb_id)?;

        let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) else {
            log::error!("ue context release response for non-existent subscriber IMSI {imsi}");
            return Err(DbError::SubscriberNotFound.into());
        };
        subscriber.set_state(SubscriberState::Detached);
        subscriber.set_last_event(event.event_type(), event.timestamp());
        let last_cgi = subscriber.cgi().cloned();

        self.detach_subscriber(imsi);

        log::info!("ue context for user {imsi} released, user detached");
        Ok(Some(S1apOut::new(OutputType::UnReg, imsi, last_cgi)))
    }

    // ------------------------------------------------------------------------
    // MME-originated events
    // ------------------------------------------------------------------------

    /// Attach Accept, Path Switch Request Acknowledge and UE Context
    /// Release Command are MME -> eNodeB in this model and carry no
    /// registry-side state change.
    fn handle_mme_originated(&self, event: &Event) -> HandleOut {
        log::debug!("{} passed through, nothing to track", event.event_type());
        Ok(None)
    }

    // ------------------------------------------------------------------------
    // Index maintenance
    // ------------------------------------------------------------------------

    /// Bind a subscriber to an eNodeB, keeping `enodeb_id_to_imsi` and the
    /// subscriber fields bijective: the subscriber's previous binding is
    /// dropped and a different subscriber still bound to `enodeb_id` is
    /// evicted.
    fn bind_enodeb(&mut self, imsi: Imsi, enodeb_id: EnodebId) {
        if let Some(old_enodeb_id) = self
            .imsi_to_subscriber
            .get(&imsi)
            .and_then(Subscriber::enodeb_id)
        {
            if old_enodeb_id != enodeb_id {
                self.enodeb_id_to_imsi.remove(&old_enodeb_id);
            }
        }

        if let Some(previous_imsi) = self.enodeb_id_to_imsi.insert(enodeb_id, imsi) {
            if previous_imsi != imsi {
                if let Some(previous) = self.imsi_to_subscriber.get_mut(&previous_imsi) {
                    previous.clear_enodeb_id();
                }
            }
        }

        if let Some(subscriber) = self.imsi_to_subscriber.get_mut(&imsi) {
            subscriber.set_enodeb_id(enodeb_id);
        }
    }

    /// Erase a subscriber record and every index entry that points at it.
    fn detach_subscriber(&mut self, imsi: Imsi) {
        let Some(subscriber) = self.imsi_to_subscriber.remove(&imsi) else {
            return;
        };

        if let Some(m_tmsi) = subscriber.m_tmsi() {
            self.mtmsi_to_imsi.remove(&m_tmsi);
        }
        if let Some(enodeb_id) = subscriber.enodeb_id() {
            self.enodeb_id_to_imsi.remove(&enodeb_id);
        }
        if let Some(mme_id) = subscriber.mme_id() {
            // The MME id is shared across subscribers; only drop the entry
            // this subscriber owns.
            if self.mme_id_to_imsi.get(&mme_id) == Some(&imsi) {
                self.mme_id_to_imsi.remove(&mme_id);
            }
        }
        self.imsi_to_identity_request_timeout.remove(&imsi);
    }

    /// The subscriber's current M-TMSI, or a fresh one with the reverse
    /// index installed.
    fn current_or_fresh_mtmsi(&mut self, imsi: Imsi) -> Result<MTmsi, DbError> {
        let Some(subscriber) = self.imsi_to_subscriber.get(&imsi) else {
            return Err(DbError::SubscriberNotFound);
        };

        match subscriber.m_tmsi() {
            Some(m_tmsi) => Ok(m_tmsi),
            None => {
                let m_tmsi = self.generate_new_mtmsi();
                self.mtmsi_to_imsi.insert(m_tmsi, imsi);
                Ok(m_tmsi)
            }
        }
    }

    /// Hand out the next unused M-TMSI. Wrap-around is not handled.
    fn generate_new_mtmsi(&mut self) -> MTmsi {
        let m_tmsi = self.next_mtmsi;
        self.next_mtmsi += 1;
        m_tmsi
    }
}

impl Default for S1apDb {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Global Registry Instance
// ============================================================================

static S1AP_DB: OnceLock<Mutex<S1apDb>> = OnceLock::new();

/// Process-wide registry instance.
///
/// Lazily initialized on first access; lives until process exit. The
/// engine itself is single-writer, so the mutex serializes callers that
/// share this instance across threads. Prefer owning an [`S1apDb`] at the
/// program root and passing it explicitly; this accessor is a convenience.
pub fn s1ap_self() -> &'static Mutex<S1apDb> {
    S1AP_DB.get_or_init(|| Mutex::new(S1apDb::new()))
}

// ============================================================================
// Unit Tests
// ============================================================================
