use coap_lite::CoapResponse;

/// Replies are built directly on `coap_lite`'s response type; [`crate::app::Request::new_response`]
/// prepares one with the right message type, id and token.
pub type Response = CoapResponse;
