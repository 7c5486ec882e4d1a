use std::fmt::Debug;
use std::future::{self, Future};
use std::pin::Pin;

use coap_lite::Packet;
use futures::stream::Fuse;
use futures::{SinkExt, StreamExt};
use log::{error, info, trace, warn};
use tokio::sync::mpsc::{Receiver, Sender};

use crate::app::RouteTableError;
use crate::packet_handler::{IntoHandler, PacketHandler};
use crate::transport::{FramedBinding, FramedItem, FramedReadError, Transport, TransportError};

/// Replies waiting to be written to the binding.  Handlers are spawned per request so this only
/// needs to absorb short bursts.
const RELAY_QUEUE_DEPTH: usize = 32;

/// Binds a transport and runs the dispatch loop that feeds packets to a [`PacketHandler`].
pub struct CoapServer<Handler, Endpoint> {
    binding: Fuse<Pin<Box<dyn FramedBinding<Endpoint>>>>,
    packet_relay_rx: Receiver<FramedItem<Endpoint>>,
    packet_relay_tx: Sender<FramedItem<Endpoint>>,
    handler: Option<Handler>,
}

impl<Handler, Endpoint> CoapServer<Handler, Endpoint>
where
    Handler: PacketHandler<Endpoint> + Send + Sync + 'static,
    Endpoint: Debug + Send + Sync + Clone + 'static,
{
    /// Bind the server to a source of incoming packets.  The node uses
    /// [`crate::udp::UdpTransport`].
    pub async fn bind<T: Transport<Endpoint = Endpoint>>(
        transport: T,
    ) -> Result<Self, TransportError> {
        let binding = transport.bind().await?;
        let (packet_tx, packet_rx) = tokio::sync::mpsc::channel(RELAY_QUEUE_DEPTH);
        Ok(Self {
            binding: binding.fuse(),
            packet_relay_rx: packet_rx,
            packet_relay_tx: packet_tx,
            handler: None,
        })
    }

    /// Serve until a fatal error occurs.
    pub async fn serve(
        self,
        handler: impl IntoHandler<Handler, Endpoint>,
    ) -> Result<(), FatalServerError> {
        self.serve_until(handler, future::pending()).await
    }

    /// Serve until `shutdown` resolves or a fatal error occurs.  Requests still being handled
    /// when shutdown fires are abandoned along with their replies.
    pub async fn serve_until(
        mut self,
        handler: impl IntoHandler<Handler, Endpoint>,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), FatalServerError> {
        let mtu = self.binding.get_ref().mtu();
        self.handler = Some(handler.into_handler(mtu)?);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                event = self.binding.select_next_some() => {
                    self.handle_rx_event(event)?;
                }
                Some(item) = self.packet_relay_rx.recv() => {
                    self.handle_packet_relay(item).await;
                }
                _ = &mut shutdown => {
                    info!("Shutdown requested, leaving dispatch loop");
                    return Ok(());
                }
            }
        }
    }

    fn handle_rx_event(
        &self,
        result: Result<FramedItem<Endpoint>, FramedReadError<Endpoint>>,
    ) -> Result<(), FatalServerError> {
        match result {
            Ok((packet, peer)) => {
                trace!("Incoming packet from {peer:?}: {packet:?}");
                self.do_handle_request(packet, peer)?
            }
            Err((transport_err, peer)) => {
                warn!("Error from {peer:?}: {transport_err}");
                if peer.is_none() {
                    return Err(transport_err.into());
                }
            }
        }

        Ok(())
    }

    fn do_handle_request(&self, packet: Packet, peer: Endpoint) -> Result<(), FatalServerError> {
        let handler = self
            .handler
            .as_ref()
            .ok_or_else(|| FatalServerError::InternalError("handler not set".to_string()))?;
        let reply_stream = Self::gen_and_send_responses(
            handler.clone(),
            self.packet_relay_tx.clone(),
            packet,
            peer,
        );
        tokio::spawn(reply_stream);
        Ok(())
    }

    async fn gen_and_send_responses(
        handler: Handler,
        packet_tx: Sender<FramedItem<Endpoint>>,
        packet: Packet,
        peer: Endpoint,
    ) {
        let mut stream = handler.handle(packet, peer.clone());
        while let Some(response) = stream.next().await {
            if packet_tx.send((response, peer.clone())).await.is_err() {
                // Relay receiver only goes away once the server stopped.
                trace!("Dropping reply to {peer:?}, server is shutting down");
                break;
            }
        }
    }

    async fn handle_packet_relay(&mut self, item: FramedItem<Endpoint>) {
        let peer = item.1.clone();
        trace!("Outgoing packet to {:?}: {:?}", peer, item.0);
        if let Err(e) = self.binding.send(item).await {
            error!("Error sending to {peer:?}: {e}");
        }
    }
}

/// Fatal error preventing the server from starting or continuing.
#[derive(thiserror::Error, Debug)]
pub enum FatalServerError {
    /// Programmer error within this crate.
    #[error("internal error: {0}")]
    InternalError(String),

    /// The resource table handed to the server is not usable.
    #[error("invalid configuration: {0}")]
    Configuration(#[from] RouteTableError),

    /// Transport error not tied to a single peer; no further exchanges are possible.
    #[error("fatal transport error: {0}")]
    Transport(#[from] TransportError),
}
