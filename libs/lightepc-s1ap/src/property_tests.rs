//! Property-Based Tests for the Subscriber Registry
//!
//! Drives the registry with arbitrary event sequences drawn from small
//! identifier pools and checks the structural invariants after every
//! single `handle` call: index bijections, no dangling IMSIs, notification
//! accounting, and M-TMSI uniqueness.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;
    use proptest::test_runner::TestCaseError;

    use crate::context::S1apDb;
    use crate::event::Event;
    use crate::output::OutputType;
    use crate::subscriber::SubscriberState;
    use crate::types::{Cgi, EnodebId, Imsi, MTmsi, MmeId, Timestamp, INITIAL_MTMSI};

    /// One scripted feed operation. Identifiers come from pools small
    /// enough that collisions, re-attaches and releases actually happen.
    #[derive(Debug, Clone)]
    enum Op {
        AttachImsi { imsi: Imsi, enodeb_id: EnodebId, cgi: Cgi },
        AttachMTmsi { m_tmsi: MTmsi, enodeb_id: EnodebId, cgi: Cgi },
        Identity { imsi: Imsi, enodeb_id: EnodebId, mme_id: MmeId, cgi: Cgi },
        Paging { m_tmsi: MTmsi, cgi: Cgi },
        PathSwitch { enodeb_id: EnodebId, mme_id: MmeId, cgi: Cgi },
        Release { enodeb_id: EnodebId, mme_id: MmeId },
    }

    impl Op {
        fn to_event(&self, timestamp: Timestamp) -> Event {
            match self.clone() {
                Op::AttachImsi { imsi, enodeb_id, cgi } => {
                    Event::attach_request_with_imsi(timestamp, imsi, enodeb_id, cgi)
                }
                Op::AttachMTmsi { m_tmsi, enodeb_id, cgi } => {
                    Event::attach_request_with_mtmsi(timestamp, enodeb_id, m_tmsi, cgi)
                }
                Op::Identity { imsi, enodeb_id, mme_id, cgi } => {
                    Event::identity_response(timestamp, imsi, enodeb_id, mme_id, cgi)
                }
                Op::Paging { m_tmsi, cgi } => Event::paging(timestamp, m_tmsi, cgi),
                Op::PathSwitch { enodeb_id, mme_id, cgi } => {
                    Event::path_switch_request(timestamp, enodeb_id, mme_id, cgi)
                }
                Op::Release { enodeb_id, mme_id } => {
                    Event::ue_context_release_response(timestamp, enodeb_id, mme_id)
                }
            }
        }
    }

    /// Non-empty CGI whose first byte doubles as a target eNodeB id from
    /// the same pool the attach events use.
    fn arb_cgi() -> impl Strategy<Value = Cgi> {
        (1u8..6, proptest::collection::vec(any::<u8>(), 0..3)).prop_map(|(head, tail)| {
            let mut cgi = vec![head];
            cgi.extend(tail);
            cgi
        })
    }

    fn arb_imsi() -> impl Strategy<Value = Imsi> {
        1u64..6
    }

    fn arb_enodeb_id() -> impl Strategy<Value = EnodebId> {
        1u32..6
    }

    /// Mix of M-TMSIs the allocator will actually hand out and ones it
    /// never will.
    fn arb_m_tmsi() -> impl Strategy<Value = MTmsi> {
        prop_oneof![INITIAL_MTMSI..INITIAL_MTMSI + 8, 1u32..8]
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (arb_imsi(), arb_enodeb_id(), arb_cgi())
                .prop_map(|(imsi, enodeb_id, cgi)| Op::AttachImsi { imsi, enodeb_id, cgi }),
            (arb_m_tmsi(), arb_enodeb_id(), arb_cgi())
                .prop_map(|(m_tmsi, enodeb_id, cgi)| Op::AttachMTmsi { m_tmsi, enodeb_id, cgi }),
            (arb_imsi(), arb_enodeb_id(), 1u32..4, arb_cgi()).prop_map(
                |(imsi, enodeb_id, mme_id, cgi)| Op::Identity { imsi, enodeb_id, mme_id, cgi }
            ),
            (arb_m_tmsi(), arb_cgi()).prop_map(|(m_tmsi, cgi)| Op::Paging { m_tmsi, cgi }),
            (arb_enodeb_id(), 1u32..4, arb_cgi()).prop_map(|(enodeb_id, mme_id, cgi)| {
                Op::PathSwitch { enodeb_id, mme_id, cgi }
            }),
            (arb_enodeb_id(), 1u32..4)
                .prop_map(|(enodeb_id, mme_id)| Op::Release { enodeb_id, mme_id }),
        ]
    }

    fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
        proptest::collection::vec(arb_op(), 1..60)
    }

    /// Bijection and dangling-reference checks over every index.
    fn check_indices(db: &S1apDb) -> Result<(), TestCaseError> {
        for (&m_tmsi, &imsi) in &db.mtmsi_to_imsi {
            let subscriber = db.imsi_to_subscriber.get(&imsi);
            prop_assert!(subscriber.is_some(), "M-TMSI {} maps to missing IMSI {}", m_tmsi, imsi);
            prop_assert_eq!(subscriber.and_then(|s| s.m_tmsi()), Some(m_tmsi));
        }
        for (&enodeb_id, &imsi) in &db.enodeb_id_to_imsi {
            let subscriber = db.imsi_to_subscriber.get(&imsi);
            prop_assert!(
                subscriber.is_some(),
                "eNodeB {} maps to missing IMSI {}",
                enodeb_id,
                imsi
            );
            prop_assert_eq!(subscriber.and_then(|s| s.enodeb_id()), Some(enodeb_id));
        }
        for subscriber in db.imsi_to_subscriber.values() {
            if let Some(m_tmsi) = subscriber.m_tmsi() {
                prop_assert_eq!(db.mtmsi_to_imsi.get(&m_tmsi), Some(&subscriber.imsi()));
            }
            if let Some(enodeb_id) = subscriber.enodeb_id() {
                prop_assert_eq!(db.enodeb_id_to_imsi.get(&enodeb_id), Some(&subscriber.imsi()));
            }
        }
        for &imsi in db.imsi_to_identity_request_timeout.keys() {
            let state = db.imsi_to_subscriber.get(&imsi).map(|s| s.state());
            prop_assert_eq!(state, Some(SubscriberState::Attaching));
        }
        Ok(())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn prop_indices_stay_bijective(ops in arb_ops()) {
            let mut db = S1apDb::new();
            for (step, op) in ops.iter().enumerate() {
                let _ = db.handle(&op.to_event(step as Timestamp));
                check_indices(&db)?;
            }
        }

        #[test]
        fn prop_unreg_matches_record_removal(ops in arb_ops()) {
            let mut db = S1apDb::new();
            let mut registered: HashSet<Imsi> = HashSet::new();

            for (step, op) in ops.iter().enumerate() {
                let before: HashSet<Imsi> = db.imsi_to_subscriber.keys().copied().collect();
                let result = db.handle(&op.to_event(step as Timestamp));
                let after: HashSet<Imsi> = db.imsi_to_subscriber.keys().copied().collect();

                let removed: Vec<Imsi> = before.difference(&after).copied().collect();

                match &result {
                    Ok(Some(out)) if out.output_type() == OutputType::UnReg => {
                        // An UnReg names exactly the record that vanished,
                        // and only a previously registered one.
                        prop_assert_eq!(&removed, &vec![out.imsi()]);
                        prop_assert!(registered.remove(&out.imsi()));
                    }
                    _ => {
                        prop_assert!(removed.is_empty(), "record vanished without UnReg");
                    }
                }

                if let Ok(Some(out)) = &result {
                    if out.output_type() == OutputType::Reg {
                        registered.insert(out.imsi());
                    }
                }
            }
        }

        #[test]
        fn prop_mtmsi_values_never_reused_while_held(ops in arb_ops()) {
            let mut db = S1apDb::new();
            let mut watermark = INITIAL_MTMSI;

            for (step, op) in ops.iter().enumerate() {
                let _ = db.handle(&op.to_event(step as Timestamp));

                // The allocator never moves backwards, so a fresh value can
                // never collide with one still held.
                prop_assert!(db.next_mtmsi >= watermark);
                watermark = db.next_mtmsi;
                for &m_tmsi in db.mtmsi_to_imsi.keys() {
                    prop_assert!((INITIAL_MTMSI..db.next_mtmsi).contains(&m_tmsi));
                }

                // One holder per live value.
                let holders: Vec<MTmsi> = db
                    .imsi_to_subscriber
                    .values()
                    .filter_map(|s| s.m_tmsi())
                    .collect();
                let distinct: HashSet<MTmsi> = holders.iter().copied().collect();
                prop_assert_eq!(holders.len(), distinct.len());
            }
        }
    }
}
