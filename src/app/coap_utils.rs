use std::collections::HashMap;

use coap_lite::error::IncompatibleOptionValueFormat;
use coap_lite::option_value::OptionValueType;
use coap_lite::{CoapOption, CoapRequest, MessageClass, MessageType, Packet, ResponseType};

use crate::app::CoapError;

/// Longest reassembled path [`crate::app::Request::uri_path`] hands to a handler.
pub const URI_PATH_MAX: usize = 64;

/// Reassemble the request's Uri-Path options into `/seg1/seg2`.  Segments are opaque bytes and
/// are not required to be UTF-8.  A request without any Uri-Path option addresses `/`.
pub fn request_uri_path<Endpoint>(request: &CoapRequest<Endpoint>) -> Vec<u8> {
    let mut path = Vec::new();
    if let Some(segments) = request.message.get_option(CoapOption::UriPath) {
        for segment in segments {
            path.push(b'/');
            path.extend_from_slice(segment);
        }
    }
    if path.is_empty() {
        path.push(b'/');
    }
    path
}

pub fn request_get_queries<Endpoint>(request: &CoapRequest<Endpoint>) -> HashMap<String, String> {
    request
        .message
        .get_options_as::<OptionValueQuery>(CoapOption::UriQuery)
        .map_or_else(HashMap::new, |options| {
            options
                .into_iter()
                .filter_map(Result::ok)
                .map(|query| (query.key, query.value))
                .collect()
        })
}

/// Reply to an empty Confirmable message ("CoAP ping") with a Reset carrying the same
/// message id.
pub fn new_pong_message(ping: &Packet) -> Packet {
    let mut pong = Packet::new();
    pong.header.set_type(MessageType::Reset);
    pong.header.message_id = ping.header.message_id;
    pong
}

/// Replacement for a reply that cannot be sent as built: same type, id and token, a bare
/// 5.00 and nothing else.
pub fn new_bare_error(reply: &Packet) -> Packet {
    let mut error = Packet::new();
    error.header.set_type(reply.header.get_type());
    error.header.message_id = reply.header.message_id;
    error.header.code = MessageClass::Response(ResponseType::InternalServerError);
    error.set_token(reply.get_token().to_vec());
    error
}

/// `key=value` Uri-Query option, used to filter `/.well-known/core`.
pub struct OptionValueQuery {
    key: String,
    value: String,
}

impl From<OptionValueQuery> for Vec<u8> {
    fn from(option_value: OptionValueQuery) -> Self {
        format!("{}={}", option_value.key, option_value.value).into_bytes()
    }
}

impl TryFrom<Vec<u8>> for OptionValueQuery {
    type Error = IncompatibleOptionValueFormat;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Self::parse(&value).map_err(|e| IncompatibleOptionValueFormat {
            message: e.to_string(),
        })
    }
}

impl OptionValueType for OptionValueQuery {}

impl OptionValueQuery {
    fn parse(value: &[u8]) -> Result<Self, CoapError> {
        let split_at = value
            .iter()
            .position(|&c| c == b'=')
            .ok_or_else(|| CoapError::bad_request("Missing '=', not a valid query string"))?;
        let key = String::from_utf8(value[..split_at].to_vec())
            .map_err(|e| CoapError::bad_request(format!("Key is not UTF-8: {e}")))?;
        let value = String::from_utf8(value[split_at + 1..].to_vec())
            .map_err(|e| CoapError::bad_request(format!("Value is not UTF-8: {e}")))?;

        Ok(OptionValueQuery { key, value })
    }
}
