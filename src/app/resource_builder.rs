use std::collections::HashMap;

use coap_lite::RequestType;
use log::warn;

use crate::app::core_link::{CoreLink, DiscoverableResource, LinkAttributeValue};
use crate::app::methods::Methods;
use crate::app::request_handler::RequestHandler;
use crate::app::resource_table::{BoxedRequestHandler, Resource, RouteTableError};

/// Configure one entry of the routing table: its path, how the path matches, and one handler
/// per accepted method.
pub struct ResourceBuilder<Endpoint> {
    path: String,
    subtree: bool,
    discoverable: Option<bool>,
    attributes: CoreLink,
    handlers: HashMap<Methods, BoxedRequestHandler<Endpoint>>,
}

pub(crate) struct BuiltResource<Endpoint> {
    pub resource: Resource<Endpoint>,
    pub discoverable: Option<DiscoverableResource>,
}

impl<Endpoint: Send + Sync + 'static> ResourceBuilder<Endpoint> {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            subtree: false,
            discoverable: None,
            attributes: CoreLink::new(path),
            handlers: HashMap::new(),
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Match every request path that starts with this resource's path rather than only the
    /// exact path.  Register the path with a trailing `/` to match only below it.
    pub fn subtree(mut self) -> Self {
        self.subtree = true;
        self
    }

    /// Leave this resource out of the `/.well-known/core` listing.
    pub fn not_discoverable(mut self) -> Self {
        self.discoverable = Some(false);
        self
    }

    /// Add an attribute to this resource's link in the `/.well-known/core` listing, e.g.
    /// `rt` or `ct` (RFC 6690).
    pub fn link_attr(
        mut self,
        attr_name: &'static str,
        value: impl LinkAttributeValue<String> + 'static,
    ) -> Self {
        self.attributes.attr(attr_name, value);
        self
    }

    pub fn get(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::GET, handler)
    }

    pub fn post(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::POST, handler)
    }

    pub fn put(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::PUT, handler)
    }

    pub fn delete(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::DELETE, handler)
    }

    pub fn fetch(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::FETCH, handler)
    }

    pub fn patch(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::PATCH, handler)
    }

    pub fn ipatch(self, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handler(Methods::IPATCH, handler)
    }

    /// Register a handler for a method chosen at runtime.  Methods without a routing flag are
    /// dropped with a warning.
    pub fn method_handler(
        self,
        request_type: RequestType,
        handler: impl RequestHandler<Endpoint> + Send + Sync,
    ) -> Self {
        match Methods::from_request_type(request_type) {
            Some(flag) => self.handler(flag, handler),
            None => {
                warn!("Cannot route {request_type:?} requests, ignoring handler for {}", self.path);
                self
            }
        }
    }

    fn handler(mut self, flag: Methods, handler: impl RequestHandler<Endpoint> + Send + Sync) -> Self {
        self.handlers.insert(flag, Box::new(handler));
        self
    }

    pub(crate) fn build(
        self,
        default_discoverable: bool,
    ) -> Result<BuiltResource<Endpoint>, RouteTableError> {
        let discoverable = if self.discoverable.unwrap_or(default_discoverable) {
            let link = DiscoverableResource::try_from(self.attributes)
                .map_err(|_| RouteTableError::LinkFormat(self.path.clone()))?;
            Some(link)
        } else {
            None
        };

        let mut methods = self
            .handlers
            .keys()
            .fold(Methods::empty(), |acc, flag| acc | *flag);
        if self.subtree {
            methods |= Methods::MATCH_SUBTREE;
        }

        Ok(BuiltResource {
            resource: Resource {
                path: self.path,
                methods,
                handlers: self.handlers,
            },
            discoverable,
        })
    }
}
