use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use coap_lite::{ContentFormat, ResponseType};

use crate::app::coap_utils;
use crate::app::core_link::DiscoverableResource;
use crate::app::error::CoapError;
use crate::app::request_handler::RequestHandler;
use crate::app::{Request, ResourceBuilder, Response};

pub const WELL_KNOWN_CORE: &str = "/.well-known/core";

/// `GET /.well-known/core`: link-format listing of the discoverable resources, optionally
/// filtered by `?attr=value` queries.
#[derive(Clone)]
pub(crate) struct CoreRequestHandler {
    resources: Arc<Vec<DiscoverableResource>>,
}

impl CoreRequestHandler {
    pub(crate) fn new_resource_builder<Endpoint: Send + Sync + 'static>(
        resources: Vec<DiscoverableResource>,
    ) -> ResourceBuilder<Endpoint> {
        let me = Self {
            resources: Arc::new(resources),
        };
        ResourceBuilder::new(WELL_KNOWN_CORE).not_discoverable().get(me)
    }
}

#[async_trait]
impl<Endpoint: Send + Sync + 'static> RequestHandler<Endpoint> for CoreRequestHandler {
    async fn handle(&self, request: Request<Endpoint>) -> Result<Response, CoapError> {
        let queries = coap_utils::request_get_queries(&request.original);

        let mut response = request.new_response();
        response.message.payload = self
            .resources
            .iter()
            .filter(|&r| filter_by_query(r, &queries))
            .map(|r| r.link_str.as_str())
            .collect::<Vec<_>>()
            .join(",")
            .into_bytes();
        response.set_status(ResponseType::Content);
        response
            .message
            .set_content_format(ContentFormat::ApplicationLinkFormat);
        Ok(response)
    }
}

fn filter_by_query(resource: &DiscoverableResource, queries: &HashMap<String, String>) -> bool {
    queries
        .iter()
        .all(|(key, value)| resource.attributes_as_string.get(key.as_str()) == Some(value))
}
