//! Status records for long-running operations.
//!
//! Controllers create a record when they start an asynchronous mutation and
//! update it as the mutation progresses. The polling controllers only read it.

use serde::{Deserialize, Serialize};

use crate::operation_id::OperationId;
use crate::types::Timestamp;

/// Provisioning state of a resource or an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProvisioningState {
    Accepted,
    Provisioning,
    Updating,
    Deleting,
    Succeeded,
    Failed,
    Canceled,
}

impl ProvisioningState {
    /// Whether no further transitions are expected.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

/// Error detail attached to a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// The polled record of one long-running operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationStatus {
    /// Full polling path of this record.
    pub id: String,
    /// The operation identifier.
    pub name: OperationId,
    /// Resource the operation acts on.
    pub resource_id: String,
    pub status: ProvisioningState,
    pub start_time: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
}

impl OperationStatus {
    /// Start tracking `operation_id` against `resource_id` in the accepted state.
    pub fn accepted(id: String, operation_id: OperationId, resource_id: String) -> Self {
        Self {
            id,
            name: operation_id,
            resource_id,
            status: ProvisioningState::Accepted,
            start_time: chrono::Utc::now(),
            end_time: None,
            error: None,
        }
    }

    /// Move to `status`, stamping the end time on terminal states.
    pub fn transition(&mut self, status: ProvisioningState) {
        self.status = status;
        if status.is_terminal() {
            self.end_time = Some(chrono::Utc::now());
        }
    }

    /// Mark the operation failed with `error`.
    pub fn fail(&mut self, error: ErrorDetail) {
        self.transition(ProvisioningState::Failed);
        self.error = Some(error);
    }
}

/// Storage key of an operation status record.
///
/// Keys are namespaced by the lower-cased provider namespace so ids from
/// different providers never collide.
pub fn status_key(namespace: &str, operation_id: &OperationId) -> String {
    format!(
        "{}/operationstatuses/{operation_id}",
        namespace.to_ascii_lowercase()
    )
}
