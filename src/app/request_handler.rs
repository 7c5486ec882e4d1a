use std::future::Future;

use async_trait::async_trait;
use dyn_clone::DynClone;

use crate::app::{CoapError, Request, Response};

/// Outcome of one handler invocation.  `Err` is still answered: the app turns it into an
/// error reply with the carried code.
pub type HandlerResult = Result<Response, CoapError>;

/// Handler for one resource and method.
///
/// Any `async fn(Request<Endpoint>) -> HandlerResult` qualifies.  Handlers with state, such as
/// [`crate::handlers::DigestHandler`], implement it directly and share that state between their
/// clones, since the table hands each dispatch its own clone.
#[async_trait]
pub trait RequestHandler<Endpoint>: DynClone + 'static {
    async fn handle(&self, request: Request<Endpoint>) -> HandlerResult;
}

dyn_clone::clone_trait_object!(<Endpoint> RequestHandler<Endpoint>);

#[async_trait]
impl<Endpoint, F, Fut> RequestHandler<Endpoint> for F
where
    Endpoint: Send + Sync + 'static,
    F: Fn(Request<Endpoint>) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send,
{
    async fn handle(&self, request: Request<Endpoint>) -> HandlerResult {
        self(request).await
    }
}
