use std::fmt::Debug;

use crate::app::app_handler::AppHandler;
use crate::app::ResourceBuilder;
use crate::packet_handler::IntoHandler;
use crate::server::FatalServerError;

/// Main builder API: the resource table plus app-wide settings.
///
/// Resources must be added in ascending path order (byte-wise); the table is validated when
/// the server starts and an unsorted or duplicated path aborts startup.
pub struct AppBuilder<Endpoint> {
    pub(crate) config: ConfigBuilder,
    pub(crate) resources: Vec<ResourceBuilder<Endpoint>>,
}

#[derive(Debug, Default, Clone)]
pub(crate) struct ConfigBuilder {
    pub discoverable: Option<bool>,
    pub max_message_size: Option<usize>,
}

impl<Endpoint> Default for AppBuilder<Endpoint> {
    fn default() -> Self {
        Self {
            config: ConfigBuilder::default(),
            resources: Vec::new(),
        }
    }
}

impl<Endpoint> AppBuilder<Endpoint> {
    pub fn new() -> Self {
        Default::default()
    }

    /// Serve `/.well-known/core` and list resources in it unless they opt out with
    /// [`ResourceBuilder::not_discoverable`].  This is the default.
    ///
    /// For more information refer to [RFC 6690](https://datatracker.ietf.org/doc/html/rfc6690).
    pub fn discoverable(mut self) -> Self {
        self.config.discoverable = Some(true);
        self
    }

    /// Do not serve `/.well-known/core` at all.
    pub fn not_discoverable(mut self) -> Self {
        self.config.discoverable = Some(false);
        self
    }

    /// Upper bound on the encoded size of any reply.  Replies that would exceed it are replaced
    /// with a bare 5.00.  Defaults to the transport MTU, or 1152 bytes when that is unknown.
    pub fn max_message_size(mut self, size: usize) -> Self {
        self.config.max_message_size = Some(size);
        self
    }

    /// Append a resource to the table.
    pub fn resource(mut self, resource: ResourceBuilder<Endpoint>) -> Self {
        self.resources.push(resource);
        self
    }

    /// Append several resources at once, in order.
    pub fn resources(mut self, resources: Vec<ResourceBuilder<Endpoint>>) -> Self {
        self.resources.extend(resources);
        self
    }
}

impl<Endpoint: Debug + Clone + Send + Sync + 'static> IntoHandler<AppHandler<Endpoint>, Endpoint>
    for AppBuilder<Endpoint>
{
    fn into_handler(self, mtu: Option<u32>) -> Result<AppHandler<Endpoint>, FatalServerError> {
        Ok(AppHandler::from_builder(self, mtu)?)
    }
}
