use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use coap_lite::{CoapRequest, MessageClass, MessageType, Packet};
use futures::Stream;
use log::{debug, warn};
use pin_project::pin_project;

use crate::app::app_builder::AppBuilder;
use crate::app::coap_utils::{new_bare_error, new_pong_message, request_uri_path};
use crate::app::core_handler::CoreRequestHandler;
use crate::app::error::CoapError;
use crate::app::resource_table::{check_sorted, ResourceTable, Route, RouteTableError};
use crate::app::{Request, Response};
use crate::packet_handler::PacketHandler;

const DEFAULT_DISCOVERABLE: bool = true;

/// Reply size bound when neither the app nor the transport provide one.  Same default as
/// `coap_lite`'s block handler.
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 1152;

/// [`PacketHandler`] for an app built with [`crate::app::new`]: answers pings, routes requests
/// through the sorted resource table and turns handler errors into error replies.
pub struct AppHandler<Endpoint> {
    resources: Arc<ResourceTable<Endpoint>>,
    max_message_size: usize,
}

impl<Endpoint> Clone for AppHandler<Endpoint> {
    fn clone(&self) -> Self {
        Self {
            resources: self.resources.clone(),
            max_message_size: self.max_message_size,
        }
    }
}

#[pin_project]
struct PacketStream<F: Send> {
    #[pin]
    fut: F,
    response: Vec<Packet>,
    fut_complete: bool,
}

impl<F: Future<Output = Vec<Packet>> + Send> Stream for PacketStream<F> {
    type Item = Packet;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.project();

        if !*this.fut_complete {
            match this.fut.poll(cx) {
                Poll::Ready(response) => {
                    *this.response = response;
                    *this.fut_complete = true;
                    this.response.reverse();
                }
                Poll::Pending => {
                    return Poll::Pending;
                }
            }
        }

        Poll::Ready(this.response.pop())
    }
}

impl<Endpoint: Debug + Clone + Send + Sync + 'static> PacketHandler<Endpoint>
    for AppHandler<Endpoint>
{
    fn handle<'a>(
        &'a self,
        packet: Packet,
        peer: Endpoint,
    ) -> Pin<Box<dyn Stream<Item = Packet> + Send + 'a>> {
        Box::pin(PacketStream {
            fut: self.handle_packet(packet, peer),
            response: vec![],
            fut_complete: false,
        })
    }
}

impl<Endpoint: Debug + Clone + Send + Sync + 'static> AppHandler<Endpoint> {
    pub fn from_builder(
        builder: AppBuilder<Endpoint>,
        mtu: Option<u32>,
    ) -> Result<Self, RouteTableError> {
        let discoverable = builder.config.discoverable.unwrap_or(DEFAULT_DISCOVERABLE);

        let mut entries = Vec::with_capacity(builder.resources.len() + 1);
        let mut discoverable_resources = Vec::new();
        for resource_builder in builder.resources {
            let built = resource_builder.build(discoverable)?;
            if let Some(link) = built.discoverable {
                discoverable_resources.push(link);
            }
            entries.push(built.resource);
        }
        check_sorted(entries.iter().map(|entry| entry.path.as_str()))?;

        if discoverable {
            let core = CoreRequestHandler::new_resource_builder(discoverable_resources)
                .build(false)?
                .resource;
            let position = entries.partition_point(|entry| entry.path < core.path);
            entries.insert(position, core);
        }

        let resources = ResourceTable::new(entries)?;
        debug!("Resource table: {:?}", resources.paths().collect::<Vec<_>>());

        let max_message_size = builder
            .config
            .max_message_size
            .or_else(|| mtu.and_then(|mtu| usize::try_from(mtu).ok()))
            .unwrap_or(DEFAULT_MAX_MESSAGE_SIZE);

        Ok(Self {
            resources: Arc::new(resources),
            max_message_size,
        })
    }

    async fn handle_packet(&self, packet: Packet, peer: Endpoint) -> Vec<Packet> {
        match packet.header.code {
            MessageClass::Request(_) => self.handle_request(packet, peer).await.into_iter().collect(),
            MessageClass::Response(_) => {
                warn!("Spurious response message from {peer:?}, ignoring...");
                vec![]
            }
            MessageClass::Empty => match packet.header.get_type() {
                MessageType::Confirmable => {
                    debug!("Ping from {peer:?}");
                    vec![new_pong_message(&packet)]
                }
                t => {
                    debug!("Ignoring empty {t:?} message from {peer:?}");
                    vec![]
                }
            },
            code => {
                warn!("Unhandled message code {code} from {peer:?}, ignoring...");
                vec![]
            }
        }
    }

    async fn handle_request(&self, packet: Packet, peer: Endpoint) -> Option<Packet> {
        let mut request = CoapRequest::from_packet(packet, peer);
        if request.response.is_none() {
            debug!("Request from {:?} cannot be answered, ignoring", request.source);
            return None;
        }

        match self.try_handle_request(&request).await {
            Ok(response) => request.response = Some(response),
            Err(e) => {
                debug!("Error reply for {:?}: {e}", request.source);
                if !request.apply_from_error(e.into_handling_error()) {
                    warn!("Could not build error reply for {:?}", request.source);
                }
            }
        }

        request
            .response
            .map(|response| self.enforce_size_limit(response.message))
    }

    async fn try_handle_request(
        &self,
        request: &CoapRequest<Endpoint>,
    ) -> Result<Response, CoapError> {
        let path = request_uri_path(request);
        let method = *request.get_method();

        let route = self.resources.route(&path, method);
        if log::log_enabled!(log::Level::Debug) {
            let peer = &request.source;
            let path = String::from_utf8_lossy(&path);
            let handler_label = match &route {
                Route::Matched { path, .. } => format!("matched {path}"),
                Route::MethodNotAllowed => "method not allowed".to_string(),
                Route::NotFound => "<no resource>!".to_string(),
            };
            debug!("Received from [{peer:?}]: {method:?} {path}: {handler_label}");
        }

        match route {
            Route::Matched {
                path: resource_path,
                handler,
            } => {
                let wrapped_request = Request::from_coap(request.clone(), resource_path)
                    .ok_or_else(|| CoapError::internal("request cannot be answered"))?;
                handler.handle(wrapped_request).await
            }
            Route::MethodNotAllowed => Err(CoapError::method_not_allowed()),
            Route::NotFound => Err(CoapError::not_found()),
        }
    }

    fn enforce_size_limit(&self, reply: Packet) -> Packet {
        match reply.to_bytes() {
            Ok(bytes) if bytes.len() <= self.max_message_size => reply,
            Ok(bytes) => {
                warn!(
                    "Reply of {} bytes exceeds the {} byte limit, sending 5.00 instead",
                    bytes.len(),
                    self.max_message_size
                );
                new_bare_error(&reply)
            }
            Err(e) => {
                warn!("Reply could not be encoded ({e:?}), sending 5.00 instead");
                new_bare_error(&reply)
            }
        }
    }
}
