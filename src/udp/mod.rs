use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use bytes::BytesMut;
use coap_lite::error::MessageError;
use coap_lite::Packet;
use futures::{Sink, Stream};
use log::info;
use pin_project::pin_project;
use tokio::net::{ToSocketAddrs, UdpSocket};
use tokio_util::codec::{Decoder, Encoder};
use tokio_util::udp::UdpFramed;

use crate::transport::{BoxedFramedBinding, FramedBinding, Transport, TransportError};

/// CoAP over plain UDP as defined in RFC 7252.
pub struct UdpTransport<A: ToSocketAddrs> {
    addresses: A,
    mtu: Option<u32>,
}

impl<A: ToSocketAddrs> UdpTransport<A> {
    pub fn new(addresses: A) -> Self {
        Self {
            addresses,
            mtu: None,
        }
    }

    /// Manually set the MTU, which bounds the size of replies the application may send.
    pub fn set_mtu(mut self, mtu: u32) -> Self {
        self.mtu = Some(mtu);
        self
    }
}

#[async_trait]
impl<A: ToSocketAddrs + Sync + Send> Transport for UdpTransport<A> {
    type Endpoint = SocketAddr;

    async fn bind(self) -> Result<BoxedFramedBinding<Self::Endpoint>, TransportError> {
        let socket = UdpSocket::bind(self.addresses).await?;
        let local_addr = socket.local_addr()?;
        info!("Listening for CoAP on udp://{local_addr}");
        let binding = UdpBinding {
            framed_socket: UdpFramed::new(socket, Codec),
            mtu: self.mtu,
        };
        Ok(Box::pin(binding))
    }
}

#[pin_project]
struct UdpBinding {
    #[pin]
    framed_socket: UdpFramed<Codec>,
    mtu: Option<u32>,
}

impl FramedBinding<SocketAddr> for UdpBinding {
    fn mtu(&self) -> Option<u32> {
        self.mtu
    }
}

impl Stream for UdpBinding {
    type Item = Result<(Packet, SocketAddr), (TransportError, Option<SocketAddr>)>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.project()
            .framed_socket
            .poll_next(cx)
            .map(|item| item.map(attribute_read_error))
    }
}

/// Malformed datagrams are decoded into an inner `Err` so that the peer that sent them stays
/// known and the failure is not mistaken for a broken socket.
fn attribute_read_error(
    result: Result<(Result<Packet, MessageError>, SocketAddr), TransportError>,
) -> Result<(Packet, SocketAddr), (TransportError, Option<SocketAddr>)> {
    match result {
        Ok((Ok(packet), peer)) => Ok((packet, peer)),
        Ok((Err(e), peer)) => Err((e.into(), Some(peer))),
        Err(e) => Err((e, None)),
    }
}

impl Sink<(Packet, SocketAddr)> for UdpBinding {
    type Error = TransportError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed_socket.poll_ready(cx)
    }

    fn start_send(self: Pin<&mut Self>, item: (Packet, SocketAddr)) -> Result<(), Self::Error> {
        self.project().framed_socket.start_send(item)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed_socket.poll_flush(cx)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.project().framed_socket.poll_close(cx)
    }
}

/// One datagram is exactly one packet.
struct Codec;

impl Decoder for Codec {
    type Item = Result<Packet, MessageError>;
    type Error = TransportError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, TransportError> {
        if buf.is_empty() {
            return Ok(None);
        }
        let result = Packet::from_bytes(&buf[..]);
        buf.clear();
        Ok(Some(result))
    }
}

impl Encoder<Packet> for Codec {
    type Error = TransportError;

    fn encode(&mut self, packet: Packet, buf: &mut BytesMut) -> Result<(), TransportError> {
        buf.extend_from_slice(&packet.to_bytes()?[..]);
        Ok(())
    }
}
