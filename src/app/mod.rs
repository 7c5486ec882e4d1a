//! Resource-level API: build a sorted resource table, register handlers per method, and turn
//! it into the [`crate::packet_handler::PacketHandler`] the server runs.

pub use app_builder::AppBuilder;
pub use app_handler::{AppHandler, DEFAULT_MAX_MESSAGE_SIZE};
pub use block::Block1;
pub use core_handler::WELL_KNOWN_CORE;
pub use core_link::LinkAttributeValue;
pub use error::CoapError;
pub use methods::Methods;
pub use request::Request;
pub use request_handler::{HandlerResult, RequestHandler};
pub use resource_builder::ResourceBuilder;
pub use resource_table::{check_sorted, RouteTableError};
pub use response::Response;

pub mod app_builder;
mod app_handler;
pub mod block;
pub mod coap_utils;
mod core_handler;
mod core_link;
pub mod error;
mod methods;
pub mod request;
mod request_handler;
pub mod resource_builder;
mod resource_table;
pub mod response;
#[cfg(test)]
pub(crate) mod test_util;

pub fn new<Endpoint>() -> AppBuilder<Endpoint> {
    AppBuilder::new()
}

pub fn resource<Endpoint: Send + Sync + 'static>(path: &str) -> ResourceBuilder<Endpoint> {
    ResourceBuilder::new(path)
}
