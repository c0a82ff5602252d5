//! Guarded status tracks of a persisted transfer.
//!
//! Each track only accepts values from its own allow-list, and only along
//! the edges listed in [`StatusColumn::successors`]. Anything else fails
//! closed before a row is touched.

use crate::error::{BridgeError, Result};
use crate::models::status::*;
use crate::models::TransferRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusColumn {
    Status,
    SignatureMsgStatus,
    EthTxStatus,
    EthTxMsgStatus,
}

impl StatusColumn {
    pub const ALL: [StatusColumn; 4] = [
        StatusColumn::Status,
        StatusColumn::SignatureMsgStatus,
        StatusColumn::EthTxStatus,
        StatusColumn::EthTxMsgStatus,
    ];

    // Database column name
    pub fn name(self) -> &'static str {
        match self {
            StatusColumn::Status => "status",
            StatusColumn::SignatureMsgStatus => "signature_msg_status",
            StatusColumn::EthTxStatus => "eth_tx_status",
            StatusColumn::EthTxMsgStatus => "eth_tx_msg_status",
        }
    }

    pub fn allowed(self) -> &'static [&'static str] {
        match self {
            StatusColumn::Status => &[INITIAL, RECOVERED, IN_PROGRESS, COMPLETED, FAILED, INSUFFICIENT_FEE],
            StatusColumn::SignatureMsgStatus => &[SIGNATURE_SUBMITTED, SIGNATURE_MINED, SIGNATURE_FAILED],
            StatusColumn::EthTxStatus => &[ETH_TX_SUBMITTED, ETH_TX_MINED, ETH_TX_REVERTED],
            StatusColumn::EthTxMsgStatus => &[ETH_TX_MSG_SUBMITTED, ETH_TX_MSG_MINED, ETH_TX_MSG_FAILED],
        }
    }

    // Values reachable from `current` (None = column not yet set)
    pub fn successors(self, current: Option<&str>) -> &'static [&'static str] {
        match (self, current) {
            (StatusColumn::Status, None) => &[INITIAL, RECOVERED],
            (StatusColumn::Status, Some(INITIAL)) => &[IN_PROGRESS, COMPLETED, FAILED, INSUFFICIENT_FEE],
            (StatusColumn::Status, Some(RECOVERED)) => &[IN_PROGRESS, COMPLETED, FAILED],
            (StatusColumn::Status, Some(IN_PROGRESS)) => &[COMPLETED, FAILED],

            (StatusColumn::SignatureMsgStatus, None) => &[SIGNATURE_SUBMITTED],
            (StatusColumn::SignatureMsgStatus, Some(SIGNATURE_SUBMITTED)) => &[SIGNATURE_MINED, SIGNATURE_FAILED],

            (StatusColumn::EthTxStatus, None) => &[ETH_TX_SUBMITTED],
            (StatusColumn::EthTxStatus, Some(ETH_TX_SUBMITTED)) => &[ETH_TX_MINED, ETH_TX_REVERTED],

            (StatusColumn::EthTxMsgStatus, None) => &[ETH_TX_MSG_SUBMITTED],
            (StatusColumn::EthTxMsgStatus, Some(ETH_TX_MSG_SUBMITTED)) => &[ETH_TX_MSG_MINED, ETH_TX_MSG_FAILED],

            // Terminal values
            _ => &[],
        }
    }

    // Stored value of this column on a record
    pub fn current(self, record: &TransferRecord) -> Option<&str> {
        match self {
            StatusColumn::Status => Some(record.status.as_str()),
            StatusColumn::SignatureMsgStatus => record.signature_msg_status.as_deref(),
            StatusColumn::EthTxStatus => record.eth_tx_status.as_deref(),
            StatusColumn::EthTxMsgStatus => record.eth_tx_msg_status.as_deref(),
        }
    }

    // Rejects values outside the column's allow-list
    pub fn check_value(self, next: &str) -> Result<()> {
        if self.allowed().contains(&next) {
            Ok(())
        } else {
            Err(BridgeError::InvalidStatus {
                column: self.name(),
                status: next.to_string(),
            })
        }
    }

    // Rejects values outside the allow-list or not reachable from `current`
    pub fn check_transition(self, current: Option<&str>, next: &str) -> Result<()> {
        self.check_value(next)?;
        if self.successors(current).contains(&next) {
            Ok(())
        } else {
            Err(BridgeError::InvalidTransition {
                column: self.name(),
                from: current.unwrap_or("NONE").to_string(),
                to: next.to_string(),
            })
        }
    }
}

// Set of columns written together in one guarded update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusUpdate {
    pub changes: Vec<(StatusColumn, String)>,
    pub eth_tx_hash: Option<String>,
}

impl StatusUpdate {
    pub fn single(column: StatusColumn, status: &str) -> Self {
        StatusUpdate {
            changes: vec![(column, status.to_string())],
            eth_tx_hash: None,
        }
    }

    pub fn and(mut self, column: StatusColumn, status: &str) -> Self {
        self.changes.push((column, status.to_string()));
        self
    }

    pub fn with_eth_tx_hash(mut self, hash: &str) -> Self {
        self.eth_tx_hash = Some(hash.to_string());
        self
    }

    // Value-only check, done before any row is read
    pub fn check_values(&self) -> Result<()> {
        self.changes
            .iter()
            .try_for_each(|(column, status)| column.check_value(status))
    }

    // Full guard against the stored record; nothing is written on failure
    pub fn check_against(&self, record: &TransferRecord) -> Result<()> {
        self.changes
            .iter()
            .try_for_each(|(column, status)| column.check_transition(column.current(record), status))
    }

    pub fn apply_to(&self, record: &mut TransferRecord) {
        for (column, status) in &self.changes {
            match column {
                StatusColumn::Status => record.status = status.clone(),
                StatusColumn::SignatureMsgStatus => record.signature_msg_status = Some(status.clone()),
                StatusColumn::EthTxStatus => record.eth_tx_status = Some(status.clone()),
                StatusColumn::EthTxMsgStatus => record.eth_tx_msg_status = Some(status.clone()),
            }
        }
        if let Some(hash) = &self.eth_tx_hash {
            record.eth_tx_hash = Some(hash.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_track_only_moves_to_mined_or_failed() {
        let column = StatusColumn::SignatureMsgStatus;
        assert!(column.check_transition(Some(SIGNATURE_SUBMITTED), SIGNATURE_MINED).is_ok());
        assert!(column.check_transition(Some(SIGNATURE_SUBMITTED), SIGNATURE_FAILED).is_ok());

        for value in [SIGNATURE_SUBMITTED, COMPLETED, ETH_TX_MINED, "GARBAGE"] {
            assert!(column.check_transition(Some(SIGNATURE_SUBMITTED), value).is_err(), "{}", value);
        }
    }

    #[test]
    fn foreign_values_are_invalid_status() {
        let err = StatusColumn::EthTxStatus.check_transition(Some(ETH_TX_SUBMITTED), SIGNATURE_MINED);
        assert!(matches!(err, Err(BridgeError::InvalidStatus { column: "eth_tx_status", .. })));
    }

    #[test]
    fn terminal_values_have_no_successors() {
        for column in StatusColumn::ALL {
            for value in column.allowed() {
                let successors = column.successors(Some(value));
                assert!(!successors.contains(value), "{} self-loop on {}", column.name(), value);
            }
        }
        assert!(StatusColumn::Status.successors(Some(COMPLETED)).is_empty());
        assert!(StatusColumn::EthTxStatus.successors(Some(ETH_TX_REVERTED)).is_empty());
    }

    #[test]
    fn unset_tracks_start_at_submitted() {
        let err = StatusColumn::EthTxMsgStatus.check_transition(None, ETH_TX_MSG_MINED);
        assert!(matches!(err, Err(BridgeError::InvalidTransition { .. })));
        assert!(StatusColumn::EthTxMsgStatus.check_transition(None, ETH_TX_MSG_SUBMITTED).is_ok());
    }

    #[test]
    fn composite_update_checks_every_value() {
        let update = StatusUpdate::single(StatusColumn::EthTxStatus, ETH_TX_MINED).and(StatusColumn::Status, "DONE");
        assert!(update.check_values().is_err());
    }
}
