use std::fmt::Debug;
use std::pin::Pin;

use async_trait::async_trait;
use coap_lite::error::MessageError;
use coap_lite::Packet;
use futures::{Sink, Stream};

/// Source of incoming packets and sink for replies.  The node only ships a UDP implementation
/// but the server loop is written against this trait so that other links (DTLS, a serial SLIP
/// bridge, an in-memory test harness) can be plugged in without touching the dispatch code.
#[async_trait]
pub trait Transport {
    type Endpoint: Debug + Send + Clone;

    /// Start accepting datagrams.  The returned binding yields `(Packet, Endpoint)` pairs for
    /// every peer and accepts replies addressed the same way.
    async fn bind(self) -> Result<BoxedFramedBinding<Self::Endpoint>, TransportError>;
}

pub type BoxedFramedBinding<Endpoint> = Pin<Box<dyn FramedBinding<Endpoint>>>;

/// A bound socket exposed as both a stream of parsed packets and a sink of outgoing ones.
pub trait FramedBinding<Endpoint>:
    Send
    + Stream<Item = Result<FramedItem<Endpoint>, FramedReadError<Endpoint>>>
    + Sink<FramedItem<Endpoint>, Error = FramedWriteError>
{
    /// Link MTU if known.  Used to bound the size of replies the application may produce.
    fn mtu(&self) -> Option<u32>;
}

/// Parsed packet together with the peer it came from (or is addressed to).
pub type FramedItem<Endpoint> = (Packet, Endpoint);

/// Receive error.  The endpoint is only known when the error is tied to a specific datagram,
/// e.g. a malformed packet; `None` means the binding itself is broken.
pub type FramedReadError<Endpoint> = (TransportError, Option<Endpoint>);

pub type FramedWriteError = TransportError;

/// Transport failures.  Only errors without an associated peer are fatal to the server.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("packet was malformed: {0:?}")]
    MalformedPacket(MessageError),

    #[error("unspecified: {0}")]
    Unspecified(String),
}

impl From<MessageError> for TransportError {
    fn from(x: MessageError) -> Self {
        Self::MalformedPacket(x)
    }
}
