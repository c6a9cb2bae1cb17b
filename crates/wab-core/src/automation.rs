//! Server-side attachment automation and dashboard reports.
//!
//! Matching contacts to files by name happens on the backend; these are the
//! typed views of what it reports back.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{errors::Error, Result};

// ============== Scan ==============

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ScanStatistics {
    pub total_contacts: usize,
    pub total_files: usize,
    pub matched: usize,
    pub unmatched_contacts: usize,
    pub unmatched_files: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ScanMatch {
    pub contact: String,
    pub phone: String,
    pub file: String,
    #[serde(default)]
    pub file_size: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct UnmatchedContact {
    pub contact: String,
    pub phone: String,
}

/// Preview of what an automated send would do.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ScanReport {
    pub statistics: ScanStatistics,
    #[serde(default)]
    pub matches: Vec<ScanMatch>,
    #[serde(default)]
    pub unmatched_contacts: Vec<UnmatchedContact>,
    #[serde(default)]
    pub unmatched_files: Vec<String>,
    #[serde(default)]
    pub attachments_folder: String,
}

impl ScanReport {
    /// Auto-send is only worth starting when at least one file matched.
    pub fn ensure_sendable(&self) -> Result<()> {
        if self.statistics.matched == 0 {
            return Err(Error::validation(
                "No matched files found. Cannot start automation.",
            ));
        }
        Ok(())
    }
}

// ============== Auto-send ==============

#[derive(Clone, Debug, Serialize)]
pub struct AutoSendRequest {
    pub message: String,
    /// Seconds between sends.
    pub delay: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutoSendStatus {
    Sent,
    Failed,
    Error,
    NoMatch,
}

impl AutoSendStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Error => "error",
            Self::NoMatch => "no_match",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct AutoSendResult {
    pub contact: String,
    pub phone: String,
    #[serde(default)]
    pub file: Option<String>,
    pub status: AutoSendStatus,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AutoSendStatistics {
    pub total_contacts: usize,
    pub matched: usize,
    pub sent: usize,
    pub failed: usize,
    pub no_match: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AutoSendReport {
    #[serde(default)]
    pub message: String,
    pub statistics: AutoSendStatistics,
    #[serde(default)]
    pub results: Vec<AutoSendResult>,
}

// ============== Dashboard ==============

/// Dashboard counters. Kept as an ordered map so unknown keys survive.
pub type DashboardStats = BTreeMap<String, serde_json::Value>;
