use coap_lite::{CoapRequest, MessageType, RequestType};

use crate::app::block::Block1;
use crate::app::Request;

#[derive(Default, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TestEndpoint(pub i32);

/// Confirmable request from `peer` routed to `resource_path`.
pub fn new_request(
    method: RequestType,
    path: &str,
    resource_path: &str,
    peer: TestEndpoint,
) -> Request<TestEndpoint> {
    let mut request: CoapRequest<TestEndpoint> = CoapRequest::new();
    request.set_method(method);
    request.set_path(path);
    request.message.header.set_type(MessageType::Confirmable);
    request.message.header.message_id = 7;
    request.message.set_token(vec![0xca, 0xfe]);
    wrap(request, resource_path, peer)
}

/// POST carrying `payload`, optionally as one block of a Block1 transfer.
pub fn new_upload(
    path: &str,
    peer: TestEndpoint,
    payload: &[u8],
    block1: Option<Block1>,
) -> Request<TestEndpoint> {
    let mut request: CoapRequest<TestEndpoint> = CoapRequest::new();
    request.set_method(RequestType::Post);
    request.set_path(path);
    request.message.header.set_type(MessageType::Confirmable);
    if let Some(block1) = block1 {
        request
            .message
            .add_option(coap_lite::CoapOption::Block1, block1.into());
    }
    request.message.payload = payload.to_vec();
    wrap(request, path, peer)
}

fn wrap(
    request: CoapRequest<TestEndpoint>,
    resource_path: &str,
    peer: TestEndpoint,
) -> Request<TestEndpoint> {
    let parsed = CoapRequest::from_packet(request.message, peer);
    Request::from_coap(parsed, resource_path).expect("confirmable requests can be answered")
}
