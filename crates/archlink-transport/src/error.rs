/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is not open. Sends and closes attempted after the
    /// connection left the `Open` state always fail with this error.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Opening the connection failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// A reassembled text message was not valid UTF-8.
    #[error("message is not valid UTF-8: {0}")]
    InvalidUtf8(#[source] std::string::FromUtf8Error),

    /// A reassembled message grew past the configured limit.
    #[error("message of {size} bytes exceeds the {max} byte limit")]
    MessageTooLarge { size: usize, max: usize },

    /// The transport configuration was rejected.
    #[error("invalid transport config: {0}")]
    InvalidConfig(String),

    /// Several independent failures reported together.
    ///
    /// Callback-based hosts never see this variant: the
    /// [`CallbackBridge`](crate::CallbackBridge) unwraps it into one
    /// error callback per contained error.
    #[error("{} transport errors", .0.len())]
    Aggregate(Vec<TransportError>),
}

impl TransportError {
    /// Builds the error returned when an operation needs an open connection.
    pub(crate) fn not_open(state: crate::ConnectionState) -> Self {
        Self::ConnectionClosed(format!("connection is {state}"))
    }

    /// Flattens nested [`Aggregate`](Self::Aggregate) errors into the
    /// leaf errors they contain, in order.
    pub fn leaves(&self) -> Vec<&TransportError> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }
}

fn collect_leaves<'a>(error: &'a TransportError, out: &mut Vec<&'a TransportError>) {
    match error {
        TransportError::Aggregate(inner) => {
            for e in inner {
                collect_leaves(e, out);
            }
        }
        other => out.push(other),
    }
}
