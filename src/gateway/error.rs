#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("request to {url} failed: {reason}")]
    Transport { url: String, reason: String },
    #[error("{url} responded with status {status}: {body}")]
    Status {
        url: String,
        status: u16,
        body: String,
    },
    #[error("response from {url} is malformed: {reason}")]
    Schema { url: String, reason: String },
    #[error("failed to encode request for {url}: {reason}")]
    Encode { url: String, reason: String },
}

impl GatewayError {
    /// Connection-level failures; the only class eligible for retry.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    pub fn is_schema(&self) -> bool {
        matches!(self, Self::Schema { .. })
    }
}
