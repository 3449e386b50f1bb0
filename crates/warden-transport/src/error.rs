/// Errors that can occur in the transport layer.
///
/// An HTTP response with an error status is NOT a transport error: the
/// client returns it as a [`Response`](crate::Response) so interceptors can
/// inspect it. Use [`Response::error_for_status`](crate::Response::error_for_status)
/// to turn one into [`TransportError::Status`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// The remote host could not be reached.
    #[error("connection failed: {0}")]
    Connect(String),

    /// The request did not complete within the client's timeout.
    #[error("request timed out")]
    Timeout,

    /// Building or sending the request failed for another reason.
    #[error("request failed: {0}")]
    Request(String),

    /// A request or response body could not be (de)serialized.
    #[error("invalid body: {0}")]
    Body(String),

    /// The server answered with a non-success status.
    #[error("server responded with status {status}: {body}")]
    Status { status: u16, body: String },
}
