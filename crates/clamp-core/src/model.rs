//! Status enumerations for clamp records and appeals

use crate::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment state of a clamp record.
///
/// The amount paid is tracked separately and is not validated against
/// this status: a record can be `Paid` with a zero amount. That
/// looseness is inherited from the deployed system and is preserved
/// deliberately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus {
    Processing,
    Paid,
    NotPaid,
}

impl PaymentStatus {
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "Processing" => Ok(Self::Processing),
            "Paid" => Ok(Self::Paid),
            "Not Paid" => Ok(Self::NotPaid),
            other => Err(CoreError::InvalidPaymentStatus(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::Paid => "Paid",
            Self::NotPaid => "Not Paid",
        }
    }
}

impl Default for PaymentStatus {
    fn default() -> Self {
        Self::Processing
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow state of an appeal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppealStatus {
    Pending,
    Approved,
    Rejected,
}

impl AppealStatus {
    pub fn parse(value: &str) -> CoreResult<Self> {
        match value {
            "Pending" => Ok(Self::Pending),
            "Approved" => Ok(Self::Approved),
            "Rejected" => Ok(Self::Rejected),
            other => Err(CoreError::InvalidAppealStatus(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::Approved => "Approved",
            Self::Rejected => "Rejected",
        }
    }
}

impl Default for AppealStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for AppealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
