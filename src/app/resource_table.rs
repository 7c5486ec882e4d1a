use std::cmp::Ordering;
use std::collections::HashMap;

use coap_lite::RequestType;

use crate::app::methods::Methods;
use crate::app::request_handler::RequestHandler;

pub(crate) type BoxedRequestHandler<Endpoint> = Box<dyn RequestHandler<Endpoint> + Send + Sync>;

/// One row of the routing table.  `methods` is the union of the methods that have a handler,
/// plus [`Methods::MATCH_SUBTREE`] for prefix resources.
pub(crate) struct Resource<Endpoint> {
    pub path: String,
    pub methods: Methods,
    pub handlers: HashMap<Methods, BoxedRequestHandler<Endpoint>>,
}

/// Outcome of a table walk.
pub(crate) enum Route<'a, Endpoint> {
    Matched {
        path: &'a str,
        handler: &'a (dyn RequestHandler<Endpoint> + Send + Sync),
    },
    MethodNotAllowed,
    NotFound,
}

/// Startup-time configuration defects of the resource table.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteTableError {
    #[error("resource {after:?} is listed after {before:?}; resources must be sorted by path")]
    Unsorted { before: String, after: String },

    #[error("resource {0:?} is registered more than once")]
    Duplicate(String),

    #[error("link attributes of resource {0:?} could not be formatted")]
    LinkFormat(String),
}

/// Verify that `paths` are strictly ascending in byte order, which the early exit in
/// [`ResourceTable::route`] relies on.
pub fn check_sorted<'a>(paths: impl IntoIterator<Item = &'a str>) -> Result<(), RouteTableError> {
    let mut previous: Option<&str> = None;
    for path in paths {
        if let Some(before) = previous {
            match before.as_bytes().cmp(path.as_bytes()) {
                Ordering::Less => {}
                Ordering::Equal => return Err(RouteTableError::Duplicate(path.to_string())),
                Ordering::Greater => {
                    return Err(RouteTableError::Unsorted {
                        before: before.to_string(),
                        after: path.to_string(),
                    })
                }
            }
        }
        previous = Some(path);
    }
    Ok(())
}

/// Immutable, path-sorted routing table built once at startup.
pub(crate) struct ResourceTable<Endpoint> {
    entries: Vec<Resource<Endpoint>>,
}

impl<Endpoint> ResourceTable<Endpoint> {
    pub fn new(entries: Vec<Resource<Endpoint>>) -> Result<Self, RouteTableError> {
        check_sorted(entries.iter().map(|entry| entry.path.as_str()))?;
        Ok(Self { entries })
    }

    /// Walk the table in order and return the first resource whose path matches and that
    /// accepts `method`.  Entries sorting after `uri` cannot match, so the walk stops there.
    /// A path that matched only with the wrong method yields [`Route::MethodNotAllowed`].
    pub fn route(&self, uri: &[u8], method: RequestType) -> Route<'_, Endpoint> {
        let flag = Methods::from_request_type(method);
        let mut path_matched = false;
        for resource in &self.entries {
            match compare_path(&resource.path, resource.methods.is_subtree(), uri) {
                Ordering::Greater => continue,
                Ordering::Less => break,
                Ordering::Equal => {}
            }
            path_matched = true;
            if let Some(handler) = flag.and_then(|flag| resource.handlers.get(&flag)) {
                return Route::Matched {
                    path: &resource.path,
                    handler: handler.as_ref(),
                };
            }
        }
        if path_matched {
            Route::MethodNotAllowed
        } else {
            Route::NotFound
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.path.as_str())
    }
}

/// Order of `uri` relative to a registered path: `Greater` if the uri sorts after it, `Less`
/// if before, `Equal` on a match.  Subtree resources only compare the first
/// `resource_path.len()` bytes of the uri.  Uri bytes need not be UTF-8.
fn compare_path(resource_path: &str, subtree: bool, uri: &[u8]) -> Ordering {
    let resource = resource_path.as_bytes();
    if subtree {
        uri[..uri.len().min(resource.len())].cmp(resource)
    } else {
        uri.cmp(resource)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use coap_lite::RequestType;

    use crate::app::methods::Methods;
    use crate::app::resource_table::{
        check_sorted, BoxedRequestHandler, Resource, ResourceTable, Route, RouteTableError,
    };
    use crate::app::test_util::TestEndpoint;
    use crate::app::{CoapError, Request, Response};

    #[test]
    fn test_sorted() {
        check_sorted(["/.well-known/core", "/echo/", "/sha256", "/temp"]).unwrap();
    }

    #[test]
    fn test_unsorted() {
        let err = check_sorted(["/echo/", "/temp", "/sha256"]).unwrap_err();
        assert_eq!(
            err,
            RouteTableError::Unsorted {
                before: "/temp".to_string(),
                after: "/sha256".to_string()
            }
        );
    }

    #[test]
    fn test_duplicate() {
        let err = check_sorted(["/a", "/a"]).unwrap_err();
        assert_eq!(err, RouteTableError::Duplicate("/a".to_string()));
    }

    #[test]
    fn test_table_rejects_unsorted() {
        let result = ResourceTable::new(vec![
            new_resource("/temp", Methods::GET),
            new_resource("/echo/", Methods::GET),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_subtree_match() {
        let table = new_node_table();
        assert_matched(&table, "/echo/hello/world", RequestType::Get, "/echo/");
        assert_matched(&table, "/echo/", RequestType::Get, "/echo/");
        assert_not_found(&table, "/echo", RequestType::Get);
    }

    #[test]
    fn test_subtree_match_raw_bytes() {
        let table = new_node_table();
        match table.route(b"/echo/\xff\x41", RequestType::Get) {
            Route::Matched { path, .. } => assert_eq!(path, "/echo/"),
            _ => panic!("Expected a non-UTF-8 suffix to match /echo/"),
        }
    }

    #[test]
    fn test_exact_match() {
        let table = new_node_table();
        assert_matched(&table, "/sha256", RequestType::Post, "/sha256");
        assert_matched(&table, "/temp", RequestType::Get, "/temp");
        assert_not_found(&table, "/sha256/extra", RequestType::Post);
        assert_not_found(&table, "/temperature", RequestType::Get);
    }

    #[test]
    fn test_early_exit_and_unknown() {
        let table = new_node_table();
        assert_not_found(&table, "/", RequestType::Get);
        assert_not_found(&table, "/a", RequestType::Get);
        assert_not_found(&table, "/zzz", RequestType::Get);
    }

    #[test]
    fn test_method_not_allowed() {
        let table = new_node_table();
        assert!(matches!(
            table.route(b"/temp", RequestType::Post),
            Route::MethodNotAllowed
        ));
        assert!(matches!(
            table.route(b"/echo/x", RequestType::Delete),
            Route::MethodNotAllowed
        ));
    }

    #[test]
    fn test_first_match_in_order_wins() {
        let table = ResourceTable::new(vec![
            new_resource("/a/", Methods::GET | Methods::MATCH_SUBTREE),
            new_resource("/a/b", Methods::GET | Methods::POST),
        ])
        .unwrap();
        assert_matched(&table, "/a/b", RequestType::Get, "/a/");
        assert_matched(&table, "/a/b", RequestType::Post, "/a/b");
    }

    async fn ok(request: Request<TestEndpoint>) -> Result<Response, CoapError> {
        Ok(request.new_response())
    }

    fn new_resource(path: &str, methods: Methods) -> Resource<TestEndpoint> {
        let mut handlers: HashMap<Methods, BoxedRequestHandler<TestEndpoint>> = HashMap::new();
        for flag in [Methods::GET, Methods::POST, Methods::PUT, Methods::DELETE] {
            if methods.contains(flag) {
                handlers.insert(flag, Box::new(ok));
            }
        }
        Resource {
            path: path.to_string(),
            methods,
            handlers,
        }
    }

    fn new_node_table() -> ResourceTable<TestEndpoint> {
        ResourceTable::new(vec![
            new_resource("/.well-known/core", Methods::GET),
            new_resource("/echo/", Methods::GET | Methods::MATCH_SUBTREE),
            new_resource("/sha256", Methods::POST),
            new_resource("/temp", Methods::GET),
        ])
        .unwrap()
    }

    fn assert_matched(
        table: &ResourceTable<TestEndpoint>,
        uri: &str,
        method: RequestType,
        expected_path: &str,
    ) {
        match table.route(uri.as_bytes(), method) {
            Route::Matched { path, .. } => assert_eq!(path, expected_path),
            _ => panic!("Expected {uri} to match {expected_path}"),
        }
    }

    fn assert_not_found(table: &ResourceTable<TestEndpoint>, uri: &str, method: RequestType) {
        assert!(
            matches!(table.route(uri.as_bytes(), method), Route::NotFound),
            "Expected no resource for {uri}"
        );
    }
}
