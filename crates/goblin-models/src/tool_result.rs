use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Uniform envelope returned by every external data collaborator.
///
/// The pipeline only ever looks at `success`, `error` and `data`; how the data
/// was fetched is the collaborator's business.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolResult<T> {
    pub success: bool,
    pub error: Option<String>,
    pub data: Option<T>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ToolResult<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
            timestamp: Utc::now(),
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            data: None,
            timestamp: Utc::now(),
        }
    }

    /// Payload of a successful result; `None` for failures.
    pub fn into_data(self) -> Option<T> {
        if self.success {
            self.data
        } else {
            None
        }
    }

    /// Payload of a successful result, or the failure message.
    pub fn into_result(self) -> Result<T, String> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err("Tool returned no data".to_string()),
            (false, _) => Err(self
                .error
                .unwrap_or_else(|| "Tool call failed".to_string())),
        }
    }
}
