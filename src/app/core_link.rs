use std::collections::HashMap;
use std::fmt::{self, Debug, Write};

use coap_lite::link_format::{LinkAttributeWrite, LinkFormatWrite};
use coap_lite::ContentFormat;
use dyn_clone::DynClone;

/// Link-format (RFC 6690) description of a single resource, written once at startup.
#[derive(Default, Debug)]
pub struct CoreLink {
    path: String,
    attributes: Vec<(&'static str, Box<dyn LinkAttributeValue<String>>)>,
}

impl CoreLink {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            attributes: Vec::new(),
        }
    }

    pub fn attr(&mut self, key: &'static str, value: impl LinkAttributeValue<String> + 'static) {
        self.attributes.push((key, Box::new(value)));
    }

    fn format_single_link(&self) -> Result<String, fmt::Error> {
        let mut buf = String::new();
        let write = self.write_link(LinkFormatWrite::new(&mut buf))?;
        write.finish()?;
        Ok(buf)
    }

    fn write_link<'a>(
        &self,
        mut write: LinkFormatWrite<'a, String>,
    ) -> Result<LinkFormatWrite<'a, String>, fmt::Error> {
        let mut link = write.link(&self.path);
        for (key, value) in &self.attributes {
            link = value.write_to(link, key);
        }
        link.finish().map(|_| write)
    }
}

/// Preformatted entry for the `/.well-known/core` listing.
#[derive(Debug, Clone)]
pub(crate) struct DiscoverableResource {
    /// Single `<path>;attr=...` link; the listing joins these with `,`.
    pub link_str: String,

    /// Attribute values as strings, compared against `?key=value` query filters.
    pub attributes_as_string: HashMap<&'static str, String>,
}

impl TryFrom<CoreLink> for DiscoverableResource {
    type Error = fmt::Error;

    fn try_from(src: CoreLink) -> Result<Self, Self::Error> {
        let link_str = src.format_single_link()?;
        let attributes_as_string = src
            .attributes
            .into_iter()
            .map(|(k, v)| (k, v.format_for_comparison()))
            .collect();
        Ok(Self {
            link_str,
            attributes_as_string,
        })
    }
}

impl Clone for CoreLink {
    fn clone(&self) -> Self {
        let attributes = self
            .attributes
            .iter()
            .map(|(key, value)| (*key, dyn_clone::clone_box(value.as_ref())))
            .collect();
        Self {
            path: self.path.clone(),
            attributes,
        }
    }
}

/// Value of a link attribute: knows how to write itself and how to compare against a query.
pub trait LinkAttributeValue<T>: DynClone + Debug + Send + Sync {
    fn format_for_comparison(&self) -> String;
    fn write_to<'a, 'b>(
        &self,
        write: LinkAttributeWrite<'a, 'b, T>,
        key: &str,
    ) -> LinkAttributeWrite<'a, 'b, T>;
}

dyn_clone::clone_trait_object!(<T> LinkAttributeValue<T>);

impl<T: Write> LinkAttributeValue<T> for &'static str {
    fn format_for_comparison(&self) -> String {
        self.to_string()
    }

    fn write_to<'a, 'b>(
        &self,
        write: LinkAttributeWrite<'a, 'b, T>,
        key: &str,
    ) -> LinkAttributeWrite<'a, 'b, T> {
        write.attr_quoted(key, *self)
    }
}

impl<T: Write> LinkAttributeValue<T> for u32 {
    fn format_for_comparison(&self) -> String {
        self.to_string()
    }

    fn write_to<'a, 'b>(
        &self,
        write: LinkAttributeWrite<'a, 'b, T>,
        key: &str,
    ) -> LinkAttributeWrite<'a, 'b, T> {
        write.attr_u32(key, *self)
    }
}

impl<T: Write> LinkAttributeValue<T> for ContentFormat {
    fn format_for_comparison(&self) -> String {
        usize::from(*self).to_string()
    }

    fn write_to<'a, 'b>(
        &self,
        write: LinkAttributeWrite<'a, 'b, T>,
        key: &str,
    ) -> LinkAttributeWrite<'a, 'b, T> {
        // Content-Format numbers are 16-bit registry values.
        let value = u32::try_from(usize::from(*self)).unwrap_or_default();
        write.attr_u32(key, value)
    }
}
