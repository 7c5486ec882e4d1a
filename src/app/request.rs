use coap_lite::{CoapOption, CoapRequest, RequestType, ResponseType};

use crate::app::block::Block1;
use crate::app::coap_utils::{request_uri_path, URI_PATH_MAX};
use crate::app::{CoapError, Response};

/// Request as seen by a resource handler: the parsed message plus the registered path of the
/// resource it was routed to.
#[derive(Debug, Clone)]
pub struct Request<Endpoint> {
    pub original: CoapRequest<Endpoint>,
    pub resource_path: String,
    reply: Response,
}

impl<Endpoint> Request<Endpoint> {
    /// Wrap a parsed request.  Returns `None` for messages that cannot be answered, i.e. ones
    /// for which `coap_lite` could not prepare a piggy-backed response.
    pub fn from_coap(original: CoapRequest<Endpoint>, resource_path: &str) -> Option<Self> {
        let reply = original.response.clone()?;
        Some(Self {
            original,
            resource_path: resource_path.to_string(),
            reply,
        })
    }

    /// Fresh reply with matching type, message id and token, an empty payload and the default
    /// success code for the request method.
    pub fn new_response(&self) -> Response {
        let mut response = self.reply.clone();
        response.message.payload = Vec::new();
        let default_code = match self.method() {
            RequestType::Get => ResponseType::Content,
            RequestType::Post => ResponseType::Created,
            RequestType::Put => ResponseType::Changed,
            RequestType::Delete => ResponseType::Deleted,
            _ => ResponseType::Valid,
        };
        response.set_status(default_code);
        response
    }

    pub fn method(&self) -> RequestType {
        *self.original.get_method()
    }

    /// Full request path as raw bytes, e.g. `/echo/hello`.  Fails for paths longer than
    /// [`URI_PATH_MAX`].
    pub fn uri_path(&self) -> Result<Vec<u8>, CoapError> {
        let path = request_uri_path(&self.original);
        if path.len() > URI_PATH_MAX {
            return Err(CoapError::internal(format!(
                "Uri-Path of {} bytes exceeds {URI_PATH_MAX}",
                path.len()
            )));
        }
        Ok(path)
    }

    pub fn payload(&self) -> &[u8] {
        &self.original.message.payload
    }

    /// Block1 descriptor, or `None` when the request carries its whole payload.  An option
    /// that fails to decode is treated as absent.
    pub fn block1(&self) -> Option<Block1> {
        self.original
            .message
            .get_options_as::<Block1>(CoapOption::Block1)
            .and_then(|values| values.into_iter().next())
            .and_then(Result::ok)
    }

    pub fn peer(&self) -> Option<&Endpoint> {
        self.original.source.as_ref()
    }
}
