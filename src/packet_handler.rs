use std::pin::Pin;

use coap_lite::Packet;
use futures::Stream;

use crate::server::FatalServerError;

/// Raw packet callback: one incoming packet in, any number of outgoing packets back to the same
/// peer.  [`crate::app::AppHandler`] is the implementation used by the node; most code should
/// register resources through [`crate::app::new`] rather than implement this directly.
pub trait PacketHandler<Endpoint>: Clone {
    fn handle<'a>(
        &'a self,
        packet: Packet,
        peer: Endpoint,
    ) -> Pin<Box<dyn Stream<Item = Packet> + Send + 'a>>;
}

/// Conversion performed by the server once the transport is bound and its MTU is known.
/// Fails when the configuration itself is invalid, e.g. an unsorted resource table.
pub trait IntoHandler<Handler, Endpoint>
where
    Handler: PacketHandler<Endpoint> + Send + 'static,
{
    fn into_handler(self, mtu: Option<u32>) -> Result<Handler, FatalServerError>;
}

impl<Handler, Endpoint> IntoHandler<Handler, Endpoint> for Handler
where
    Handler: PacketHandler<Endpoint> + Send + 'static,
{
    fn into_handler(self, _mtu: Option<u32>) -> Result<Handler, FatalServerError> {
        Ok(self)
    }
}
