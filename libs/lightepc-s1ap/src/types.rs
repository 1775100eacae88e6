//! S1AP Identifier Types
//!
//! Plain-typed identifiers shared across the engine. All identifiers are
//! non-negative integers at the widths the wire carries them; the CGI is
//! an opaque ordered byte sequence the engine never decodes.

/// Monotonic event timestamp, supplied by the transport.
pub type Timestamp = u64;

/// International Mobile Subscriber Identity (permanent).
pub type Imsi = u64;

/// MME-assigned Temporary Mobile Subscriber Identity.
pub type MTmsi = u32;

/// eNodeB identifier.
pub type EnodebId = u32;

/// MME identifier.
pub type MmeId = u32;

/// Cell Global Identity, opaque ordered bytes.
pub type Cgi = Vec<u8>;

/// First M-TMSI value handed out by the allocator.
pub const INITIAL_MTMSI: MTmsi = 1000;
