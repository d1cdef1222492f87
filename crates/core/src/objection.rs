//! Objection categories heard during the pitch

use serde::{Deserialize, Serialize};

/// Category of a callee objection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectionKind {
    /// No time right now
    Time,
    /// Too expensive / no budget
    Price,
    /// Already working with an agency
    HaveVendor,
    /// Asked to receive an email instead
    SendEmail,
    /// Not interested
    NotInterested,
    /// Asked to be called later
    CallLater,
    /// Something was said, nothing specific matched
    Generic,
}

impl ObjectionKind {
    /// All categories in classification order, `Generic` last
    pub const ALL: [ObjectionKind; 7] = [
        ObjectionKind::Time,
        ObjectionKind::Price,
        ObjectionKind::HaveVendor,
        ObjectionKind::SendEmail,
        ObjectionKind::NotInterested,
        ObjectionKind::CallLater,
        ObjectionKind::Generic,
    ];

    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectionKind::Time => "time",
            ObjectionKind::Price => "price",
            ObjectionKind::HaveVendor => "have_vendor",
            ObjectionKind::SendEmail => "send_email",
            ObjectionKind::NotInterested => "not_interested",
            ObjectionKind::CallLater => "call_later",
            ObjectionKind::Generic => "generic",
        }
    }
}

impl std::fmt::Display for ObjectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
