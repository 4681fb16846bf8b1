use std::io;

/// All error types that can occur when interacting with LIFX lights.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A received buffer could not be decoded as a LIFX packet.
    #[error("malformed packet: {0}")]
    Format(String),

    /// A caller-supplied field violates a protocol-defined range.
    #[error("invalid field: {0}")]
    Validation(String),

    /// No matching response arrived before retries or the handler deadline
    /// were exhausted.
    #[error("no response received in time")]
    Timeout,

    /// A network socket operation failed.
    #[error("socket {action} error: {err:?}")]
    Socket { action: String, err: io::Error },

    /// No device with the given identifier is known to the client.
    #[error("no light found for identifier {0:?}")]
    DeviceNotFound(String),

    /// The vendor/product pair is not in the capability table.
    #[error("unknown product {product} for vendor {vendor}")]
    ProductNotFound { vendor: u32, product: u32 },

    /// The client has been destroyed; no further requests are accepted.
    #[error("client is closed")]
    Closed,
}

impl Error {
    /// Create a new format error
    pub fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }

    /// Create a new validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    /// Create a new socket error
    pub fn socket(action: &str, err: io::Error) -> Self {
        Error::Socket {
            action: action.to_string(),
            err,
        }
    }
}

/// Hacky implementation of PartialEq for testing
#[cfg(test)]
impl PartialEq for Error {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}
