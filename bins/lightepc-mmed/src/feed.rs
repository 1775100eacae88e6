//! JSON-Lines Event Feed
//!
//! Wire records for the stdin/stdout shim: one JSON object per line in,
//! one JSON object per emitted notification out. The feed only moves
//! fields around; all shape validation stays in the engine.

use anyhow::Context;
use serde::{Deserialize, Serialize};

use lightepc_s1ap::{Event, EventType, HandleError, S1apDb, S1apOut};

/// One inbound signalling record as carried on the feed.
#[derive(Debug, Deserialize)]
pub struct EventRecord {
    /// Wire-level event type name, e.g. `"AttachRequest"`
    #[serde(rename = "type")]
    pub event_type: String,
    pub timestamp: u64,
    #[serde(default)]
    pub imsi: Option<u64>,
    #[serde(default)]
    pub m_tmsi: Option<u32>,
    #[serde(default)]
    pub enodeb_id: Option<u32>,
    #[serde(default)]
    pub mme_id: Option<u32>,
    #[serde(default)]
    pub cgi: Option<Vec<u8>>,
}

impl EventRecord {
    /// Assemble the engine event. Unknown type names surface the engine's
    /// own `WrongEventType`; field masks are checked later by `handle`.
    pub fn into_event(self) -> Result<Event, HandleError> {
        let event_type: EventType = self.event_type.parse().map_err(HandleError::from)?;

        let mut builder = Event::builder(event_type, self.timestamp);
        if let Some(imsi) = self.imsi {
            builder = builder.imsi(imsi);
        }
        if let Some(m_tmsi) = self.m_tmsi {
            builder = builder.m_tmsi(m_tmsi);
        }
        if let Some(enodeb_id) = self.enodeb_id {
            builder = builder.enodeb_id(enodeb_id);
        }
        if let Some(mme_id) = self.mme_id {
            builder = builder.mme_id(mme_id);
        }
        if let Some(cgi) = self.cgi {
            builder = builder.cgi(cgi);
        }
        Ok(builder.build())
    }
}

/// One outbound notification line.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct OutRecord {
    #[serde(rename = "type")]
    pub output_type: String,
    pub imsi: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cgi: Option<Vec<u8>>,
}

impl From<S1apOut> for OutRecord {
    fn from(out: S1apOut) -> Self {
        Self {
            output_type: out.output_type().to_string(),
            imsi: out.imsi(),
            cgi: out.cgi().cloned(),
        }
    }
}

/// Feed one raw line through the registry.
///
/// The event's own timestamp also drives the timeout sweep: event time is
/// the only clock the engine ever sees.
pub fn ingest(db: &mut S1apDb, line: &str) -> anyhow::Result<Option<OutRecord>> {
    let record: EventRecord =
        serde_json::from_str(line).context("malformed event record")?;
    let event = record.into_event()?;

    let now = event.timestamp();
    let result = db.handle(&event);
    db.handle_timeouts(now);

    let out = result?;
    Ok(out.map(OutRecord::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attach_line_round_trips_to_reg() {
        let mut db = S1apDb::new();
        let line = r#"{"type":"AttachRequest","timestamp":10000,"imsi":123456789,"enodeb_id":1000,"cgi":[1,2,3]}"#;

        let out = ingest(&mut db, line).unwrap().unwrap();
        assert_eq!(out.output_type, "Reg");
        assert_eq!(out.imsi, 123456789);
        assert_eq!(out.cgi, Some(vec![1, 2, 3]));

        let encoded = serde_json::to_string(&out).unwrap();
        assert_eq!(encoded, r#"{"type":"Reg","imsi":123456789,"cgi":[1,2,3]}"#);
    }

    #[test]
    fn test_noop_event_produces_no_line() {
        let mut db = S1apDb::new();
        let line = r#"{"type":"AttachAccept","timestamp":10000,"enodeb_id":1,"mme_id":7,"m_tmsi":1000}"#;

        assert_eq!(ingest(&mut db, line).unwrap(), None);
    }

    #[test]
    fn test_unknown_type_is_rejected() {
        let mut db = S1apDb::new();
        let line = r#"{"type":"DetachRequest","timestamp":1}"#;

        let err = ingest(&mut db, line).unwrap_err();
        assert!(err.to_string().contains("unknown event type"));
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        let mut db = S1apDb::new();

        let err = ingest(&mut db, "{not json").unwrap_err();
        assert!(err.to_string().contains("malformed event record"));
    }

    #[test]
    fn test_invalid_field_mask_surfaces_engine_error() {
        let mut db = S1apDb::new();
        let line = r#"{"type":"AttachRequest","timestamp":1,"imsi":1,"m_tmsi":2,"enodeb_id":3,"cgi":[1]}"#;

        let err = ingest(&mut db, line).unwrap_err();
        assert!(err.to_string().contains("both IMSI and M-TMSI"));
    }
}
