//! Downstream Registration Notifications

use std::fmt;

use crate::types::{Cgi, Imsi};

/// Notification kinds emitted to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Subscriber registered (fresh attach or re-attach)
    Reg,
    /// Subscriber deregistered (context released)
    UnReg,
    /// Subscriber moved to a new serving cell
    CgiChange,
}

impl fmt::Display for OutputType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputType::Reg => write!(f, "Reg"),
            OutputType::UnReg => write!(f, "UnReg"),
            OutputType::CgiChange => write!(f, "CgiChange"),
        }
    }
}

/// One registration notification: who, what, and (when known) where.
///
/// The CGI on an `UnReg` is the subscriber's last known serving cell,
/// captured before teardown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S1apOut {
    output_type: OutputType,
    imsi: Imsi,
    cgi: Option<Cgi>,
}

impl S1apOut {
    pub fn new(output_type: OutputType, imsi: Imsi, cgi: Option<Cgi>) -> Self {
        Self {
            output_type,
            imsi,
            cgi,
        }
    }

    pub fn output_type(&self) -> OutputType {
        self.output_type
    }

    pub fn imsi(&self) -> Imsi {
        self.imsi
    }

    pub fn cgi(&self) -> Option<&Cgi> {
        self.cgi.as_ref()
    }
}
