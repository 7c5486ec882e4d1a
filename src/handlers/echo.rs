use coap_lite::{ContentFormat, ResponseType};
use log::warn;

use crate::app::{CoapError, HandlerResult, Request};

/// `GET <prefix>...`: reply with whatever follows the resource's registered path, byte for
/// byte, as text/plain.  Register on a subtree resource such as `/echo/`.
pub async fn echo<Endpoint>(request: Request<Endpoint>) -> HandlerResult {
    let uri = request.uri_path().map_err(|e| {
        warn!("Echo could not read the request path: {e}");
        CoapError::status(ResponseType::InternalServerError)
    })?;
    let suffix = uri
        .strip_prefix(request.resource_path.as_bytes())
        .unwrap_or_default();

    let mut response = request.new_response();
    response.set_status(ResponseType::Content);
    response.message.set_content_format(ContentFormat::TextPlain);
    response.message.payload = suffix.to_vec();
    Ok(response)
}
