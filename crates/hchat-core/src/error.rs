use http::StatusCode;

/// Domain error that knows how it should surface over HTTP
///
/// The LLM crate implements this for its error enum; the handlers wrap the
/// three values into whichever vendor envelope the caller expects.
pub trait HttpError: std::error::Error {
    /// HTTP status code for this error
    fn status_code(&self) -> StatusCode;

    /// Machine-readable error type (e.g. `invalid_request_error`)
    fn error_type(&self) -> &str;

    /// Message safe to expose to API consumers
    fn client_message(&self) -> String;
}
