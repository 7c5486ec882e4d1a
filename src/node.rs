//! The node's resource table: `/echo/`, `/sha256` and `/temp`.

use std::fmt::Debug;
use std::hash::Hash;

use coap_lite::link_format::{LINK_ATTR_CONTENT_FORMAT, LINK_ATTR_RESOURCE_TYPE};
use coap_lite::ContentFormat;

use crate::app::{AppBuilder, ResourceBuilder};
use crate::handlers::{echo, DigestHandler, TemperatureHandler};
use crate::sensor::TemperatureSensor;

pub const ECHO_PATH: &str = "/echo/";
pub const SHA256_PATH: &str = "/sha256";
pub const TEMP_PATH: &str = "/temp";

/// Resources in routing order.  Paths must stay sorted; the app refuses to start otherwise.
pub fn resources<Endpoint, S>(
    digest: DigestHandler<Endpoint>,
    temperature: TemperatureHandler<S>,
) -> Vec<ResourceBuilder<Endpoint>>
where
    Endpoint: Debug + Clone + Eq + Hash + Send + Sync + 'static,
    S: TemperatureSensor,
{
    vec![
        ResourceBuilder::new(ECHO_PATH)
            .subtree()
            .link_attr(LINK_ATTR_CONTENT_FORMAT, ContentFormat::TextPlain)
            .get(echo::<Endpoint>),
        ResourceBuilder::new(SHA256_PATH).post(digest),
        ResourceBuilder::new(TEMP_PATH)
            .link_attr(LINK_ATTR_RESOURCE_TYPE, "temperature")
            .link_attr(LINK_ATTR_CONTENT_FORMAT, ContentFormat::TextPlain)
            .get(temperature),
    ]
}

/// App serving the node resources, with `/.well-known/core` discovery enabled.
pub fn app<Endpoint, S>(
    digest: DigestHandler<Endpoint>,
    temperature: TemperatureHandler<S>,
) -> AppBuilder<Endpoint>
where
    Endpoint: Debug + Clone + Eq + Hash + Send + Sync + 'static,
    S: TemperatureSensor,
{
    AppBuilder::new().resources(resources(digest, temperature))
}
