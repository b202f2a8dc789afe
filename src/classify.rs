//! Outcome classification for observations against the API server
//!
//! Every fetch or delete attempt ends up in exactly one bucket:
//! the object was returned, the server affirmatively said it does not exist,
//! the request failed in a way that may heal on retry, or it failed in a way
//! that never will. Kinds come from status codes and kube-rs error variants,
//! never from message text.

use std::fmt;

use thiserror::Error;

/// Kind of failure reported by the client boundary
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// 404: the object does not exist
    NotFound,
    /// 410: the requested resource version is no longer available
    Gone,
    /// 400
    BadRequest,
    /// 401
    Unauthorized,
    /// 403
    Forbidden,
    /// 405
    MethodNotAllowed,
    /// 409
    Conflict,
    /// 422: the object failed server-side validation
    Invalid,
    /// 429: client is being throttled
    TooManyRequests,
    /// 5xx other than gateway timeouts
    Server,
    /// 408/504 or a client-side timeout
    Timeout,
    /// Connection or TLS failure before a response was received
    Transport,
    /// Response could not be decoded into the expected type
    Decode,
    /// Anything not covered above
    Other,
}

impl ErrorKind {
    /// Map an HTTP status code returned by the API server
    pub fn from_status(code: u16) -> Self {
        match code {
            400 => ErrorKind::BadRequest,
            401 => ErrorKind::Unauthorized,
            403 => ErrorKind::Forbidden,
            404 => ErrorKind::NotFound,
            405 => ErrorKind::MethodNotAllowed,
            408 | 504 => ErrorKind::Timeout,
            409 => ErrorKind::Conflict,
            410 => ErrorKind::Gone,
            422 => ErrorKind::Invalid,
            429 => ErrorKind::TooManyRequests,
            500..=599 => ErrorKind::Server,
            _ => ErrorKind::Other,
        }
    }

    /// True if this kind affirmatively reports that the object does not exist
    ///
    /// Both 404 and 410 count: the API server answers 410 once the object's
    /// resource version has been compacted away after deletion.
    pub fn confirms_absence(self) -> bool {
        matches!(self, ErrorKind::NotFound | ErrorKind::Gone)
    }

    /// True if retrying the same request can never succeed
    pub fn is_fatal(self) -> bool {
        matches!(
            self,
            ErrorKind::BadRequest
                | ErrorKind::Unauthorized
                | ErrorKind::Forbidden
                | ErrorKind::MethodNotAllowed
                | ErrorKind::Invalid
                | ErrorKind::Decode
        )
    }

    /// Short lowercase name used in messages
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Gone => "gone",
            ErrorKind::BadRequest => "bad request",
            ErrorKind::Unauthorized => "unauthorized",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::MethodNotAllowed => "method not allowed",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Invalid => "invalid",
            ErrorKind::TooManyRequests => "too many requests",
            ErrorKind::Server => "server error",
            ErrorKind::Timeout => "timeout",
            ErrorKind::Transport => "transport",
            ErrorKind::Decode => "decode",
            ErrorKind::Other => "other",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by an [`ObjectClient`](crate::client::ObjectClient)
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{kind}: {message}")]
pub struct ClientError {
    /// Classified kind, used for every retry decision
    pub kind: ErrorKind,
    /// Message from the server or transport, for humans only
    pub message: String,
}

impl ClientError {
    /// Create a client error of the given kind
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }
}

impl From<kube::Error> for ClientError {
    fn from(err: kube::Error) -> Self {
        let kind = match &err {
            kube::Error::Api(response) => ErrorKind::from_status(response.code),
            kube::Error::SerdeError(_) => ErrorKind::Decode,
            _ => ErrorKind::Transport,
        };
        Self::new(kind, err.to_string())
    }
}

/// Classified result of a single attempt against the external system
#[derive(Debug)]
pub enum Observation<T> {
    /// The object exists and was returned
    Found(T),
    /// The server reported that the object does not exist
    ConfirmedAbsent(ClientError),
    /// The attempt failed but may succeed on retry
    TransientError(ClientError),
    /// The attempt failed and will never succeed
    FatalError(ClientError),
}

/// Classify the result of one fetch or mutate attempt
pub fn classify<T>(result: Result<T, ClientError>) -> Observation<T> {
    match result {
        Ok(value) => Observation::Found(value),
        Err(e) if e.kind.confirms_absence() => Observation::ConfirmedAbsent(e),
        Err(e) if e.kind.is_fatal() => Observation::FatalError(e),
        Err(e) => Observation::TransientError(e),
    }
}
