use std::fmt;
use std::fmt::Debug;

use coap_lite::error::HandlingError;
use coap_lite::ResponseType;

/// Error that the app handler turns into an error reply, so handlers can use `?` without ever
/// leaving a request unanswered.  The message becomes the (text/plain) payload of the reply.
#[derive(Debug, Clone)]
pub struct CoapError {
    pub code: Option<ResponseType>,
    pub message: String,
}

impl CoapError {
    pub fn internal(msg: impl ToString) -> Self {
        Self::for_code(ResponseType::InternalServerError, msg)
    }

    pub fn bad_request(msg: impl ToString) -> Self {
        Self::for_code(ResponseType::BadRequest, msg)
    }

    pub fn not_found() -> Self {
        Self::for_code(ResponseType::NotFound, "Not found")
    }

    pub fn method_not_allowed() -> Self {
        Self::for_code(ResponseType::MethodNotAllowed, "Method not allowed")
    }

    /// Error reply carrying only a status code and an empty body.
    pub fn status(code: ResponseType) -> Self {
        Self::for_code(code, "")
    }

    pub fn for_code(code: ResponseType, msg: impl ToString) -> Self {
        Self {
            code: Some(code),
            message: msg.to_string(),
        }
    }

    pub(crate) fn into_handling_error(self) -> HandlingError {
        HandlingError {
            code: self.code,
            message: self.message,
        }
    }
}

impl fmt::Display for CoapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{code:?}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for CoapError {}

impl From<HandlingError> for CoapError {
    fn from(src: HandlingError) -> Self {
        Self {
            message: src.message,
            code: src.code,
        }
    }
}
