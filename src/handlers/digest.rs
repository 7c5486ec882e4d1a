//! `POST /sha256`: SHA-256 over a payload sent in one message or as a Block1 transfer.
//!
//! The running hash is kept per upload session.  A session is identified by the peer the
//! chunks come from, so two clients uploading at the same time each get their own digest.
//! Sessions that are not finished within the session timeout are dropped.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use coap_lite::{CoapOption, ResponseType};
use log::{debug, warn};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::app::{Block1, HandlerResult, Request, RequestHandler};

/// RFC 7252 EXCHANGE_LIFETIME with default transmission parameters.
pub const EXCHANGE_LIFETIME: Duration = Duration::from_secs(247);

/// Uploads kept in progress at once unless configured otherwise.
pub const DEFAULT_MAX_SESSIONS: usize = 64;

type SessionKey<Endpoint> = Option<Endpoint>;

struct DigestSession {
    hasher: Sha256,
    next_offset: usize,
    last_seen: Instant,
}

impl DigestSession {
    fn new(now: Instant) -> Self {
        Self {
            hasher: Sha256::new(),
            next_offset: 0,
            last_seen: now,
        }
    }

    fn update(&mut self, chunk: &[u8], now: Instant) {
        self.hasher.update(chunk);
        self.next_offset += chunk.len();
        self.last_seen = now;
    }

    fn finalize_hex(self) -> String {
        hex::encode(self.hasher.finalize())
    }
}

/// Incremental SHA-256 over Block1 uploads.  Every request is accepted: chunks are hashed in
/// the order they arrive, whatever their offsets say.
pub struct DigestHandler<Endpoint> {
    sessions: Arc<Mutex<HashMap<SessionKey<Endpoint>, DigestSession>>>,
    session_timeout: Duration,
    max_sessions: usize,
}

impl<Endpoint> Clone for DigestHandler<Endpoint> {
    fn clone(&self) -> Self {
        Self {
            sessions: self.sessions.clone(),
            session_timeout: self.session_timeout,
            max_sessions: self.max_sessions,
        }
    }
}

impl<Endpoint> Default for DigestHandler<Endpoint> {
    fn default() -> Self {
        Self {
            sessions: Arc::new(Mutex::new(HashMap::new())),
            session_timeout: EXCHANGE_LIFETIME,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

impl<Endpoint: Debug + Clone + Eq + Hash> DigestHandler<Endpoint> {
    pub fn new() -> Self {
        Default::default()
    }

    /// How long an unfinished upload is kept after its last chunk.
    pub fn session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Most uploads kept in progress at once.  Starting one more drops the upload that has
    /// been idle the longest.
    pub fn max_sessions(mut self, max: usize) -> Self {
        self.max_sessions = max.max(1);
        self
    }

    /// Number of uploads currently in progress.
    pub async fn active_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Feed one chunk and, when it is the last one, return the finished digest as lowercase hex.
    async fn feed(&self, key: SessionKey<Endpoint>, block1: Option<Block1>, chunk: &[u8]) -> Option<String> {
        let offset = block1.map_or(0, |block| block.offset());
        let finished = block1.map_or(true, |block| !block.more);
        let now = Instant::now();

        let mut sessions = self.sessions.lock().await;
        sessions.retain(|peer, session| {
            let alive = now.duration_since(session.last_seen) < self.session_timeout;
            if !alive {
                debug!("Dropping abandoned digest upload from {peer:?}");
            }
            alive
        });

        if offset == 0 || !sessions.contains_key(&key) {
            if offset == 0 {
                debug!("Digest upload from {key:?} started");
            } else {
                warn!("Digest chunk at offset {offset} from {key:?} without an upload in progress, starting over");
            }
            sessions.remove(&key);
            evict_idle(&mut sessions, self.max_sessions);
            sessions.insert(key.clone(), DigestSession::new(now));
        }

        let session = sessions
            .entry(key.clone())
            .or_insert_with(|| DigestSession::new(now));
        if offset != session.next_offset {
            debug!(
                "Digest chunk from {key:?} at offset {offset}, expected {}",
                session.next_offset
            );
        }
        session.update(chunk, now);

        if finished {
            debug!("Digest upload from {key:?} finished");
            sessions.remove(&key).map(DigestSession::finalize_hex)
        } else {
            None
        }
    }
}

/// Drop the longest idle uploads until there is room for one more.
fn evict_idle<K: Debug + Clone + Eq + Hash>(sessions: &mut HashMap<K, DigestSession>, max: usize) {
    while sessions.len() >= max {
        let idle = sessions
            .iter()
            .min_by_key(|(_, session)| session.last_seen)
            .map(|(peer, _)| peer.clone());
        match idle {
            Some(peer) => {
                warn!("{max} digest uploads in progress, dropping the one from {peer:?}");
                sessions.remove(&peer);
            }
            None => break,
        }
    }
}

#[async_trait]
impl<Endpoint> RequestHandler<Endpoint> for DigestHandler<Endpoint>
where
    Endpoint: Debug + Clone + Eq + Hash + Send + Sync + 'static,
{
    async fn handle(&self, request: Request<Endpoint>) -> HandlerResult {
        let block1 = request.block1();
        debug!(
            "Digest chunk from {:?}: len={} block1={block1:?}",
            request.peer(),
            request.payload().len()
        );

        let digest = self
            .feed(request.peer().cloned(), block1, request.payload())
            .await;

        let mut response = request.new_response();
        let more = block1.map_or(false, |block| block.more);
        response.set_status(if more {
            ResponseType::Continue
        } else {
            ResponseType::Changed
        });
        if let Some(block1) = block1 {
            response.message.add_option(CoapOption::Block1, block1.into());
        }
        if let Some(digest) = digest {
            response.message.payload = digest.into_bytes();
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use coap_lite::{CoapOption, ResponseType};
    use sha2::{Digest, Sha256};

    use crate::app::test_util::{new_upload, TestEndpoint};
    use crate::app::{Block1, RequestHandler, Response};

    use super::DigestHandler;

    const SZX_16: u8 = 0;

    fn sha256_hex(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    async fn post(
        handler: &DigestHandler<TestEndpoint>,
        peer: i32,
        payload: &[u8],
        block1: Option<Block1>,
    ) -> Response {
        handler
            .handle(new_upload("/sha256", TestEndpoint(peer), payload, block1))
            .await
            .unwrap()
    }

    async fn upload_in_blocks(handler: &DigestHandler<TestEndpoint>, peer: i32, payload: &[u8]) -> Response {
        let chunks: Vec<_> = payload.chunks(16).collect();
        let last = chunks.len() - 1;
        let mut final_response = None;
        for (num, chunk) in chunks.into_iter().enumerate() {
            let block = Block1::new(num as u32, num != last, SZX_16).unwrap();
            let response = post(handler, peer, chunk, Some(block)).await;
            if num == last {
                final_response = Some(response);
            } else {
                assert_eq!(*response.get_status(), ResponseType::Continue);
                assert!(response.message.payload.is_empty());
            }
        }
        final_response.unwrap()
    }

    fn echoed_block1(response: &Response) -> Option<Block1> {
        response
            .message
            .get_options_as::<Block1>(CoapOption::Block1)
            .and_then(|values| values.into_iter().next())
            .and_then(Result::ok)
    }

    #[tokio::test]
    async fn test_single_shot() {
        let handler = DigestHandler::new();
        let response = post(&handler, 1, b"hello world", None).await;

        assert_eq!(*response.get_status(), ResponseType::Changed);
        assert_eq!(
            String::from_utf8(response.message.payload.clone()).unwrap(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
        assert!(echoed_block1(&response).is_none());
        assert_eq!(handler.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_empty_payload() {
        let handler = DigestHandler::new();
        let response = post(&handler, 1, b"", None).await;
        assert_eq!(response.message.payload, sha256_hex(b"").into_bytes());
    }

    #[tokio::test]
    async fn test_chunked() {
        let handler = DigestHandler::new();
        let payload: Vec<u8> = (0..100u8).collect();

        let response = upload_in_blocks(&handler, 1, &payload).await;

        assert_eq!(*response.get_status(), ResponseType::Changed);
        assert_eq!(response.message.payload, sha256_hex(&payload).into_bytes());
        assert_eq!(echoed_block1(&response), Some(Block1::new(6, false, SZX_16).unwrap()));
        assert_eq!(handler.active_sessions().await, 0);
    }

    #[tokio::test]
    async fn test_continue_echoes_block1() {
        let handler = DigestHandler::new();
        let block = Block1::new(0, true, 2).unwrap();
        let response = post(&handler, 1, &[0u8; 64], Some(block)).await;

        assert_eq!(*response.get_status(), ResponseType::Continue);
        assert_eq!(echoed_block1(&response), Some(block));
        assert_eq!(handler.active_sessions().await, 1);
    }

    #[tokio::test]
    async fn test_new_upload_resets() {
        let handler = DigestHandler::new();

        // Abandon an upload halfway, then start over at offset 0.
        post(&handler, 1, &[0xaa; 16], Some(Block1::new(0, true, SZX_16).unwrap())).await;
        let payload = b"the second upload is what counts";
        let response = upload_in_blocks(&handler, 1, payload).await;

        assert_eq!(response.message.payload, sha256_hex(payload).into_bytes());
    }

    #[tokio::test]
    async fn test_completed_upload_does_not_leak() {
        let handler = DigestHandler::new();
        upload_in_blocks(&handler, 1, b"first upload, long enough for two blocks").await;

        let response = post(&handler, 1, b"second", None).await;
        assert_eq!(response.message.payload, sha256_hex(b"second").into_bytes());
    }

    #[tokio::test]
    async fn test_interleaved_peers() {
        let handler = DigestHandler::new();
        let a = b"AAAAAAAAAAAAAAAAaaaa";
        let b = b"BBBBBBBBBBBBBBBBbbbb";

        post(&handler, 1, &a[..16], Some(Block1::new(0, true, SZX_16).unwrap())).await;
        post(&handler, 2, &b[..16], Some(Block1::new(0, true, SZX_16).unwrap())).await;
        let done_a = post(&handler, 1, &a[16..], Some(Block1::new(1, false, SZX_16).unwrap())).await;
        let done_b = post(&handler, 2, &b[16..], Some(Block1::new(1, false, SZX_16).unwrap())).await;

        assert_eq!(done_a.message.payload, sha256_hex(a).into_bytes());
        assert_eq!(done_b.message.payload, sha256_hex(b).into_bytes());
    }

    #[tokio::test]
    async fn test_chunk_without_session_is_accepted() {
        let handler = DigestHandler::new();
        let response = post(&handler, 1, b"orphan", Some(Block1::new(3, false, SZX_16).unwrap())).await;

        assert_eq!(*response.get_status(), ResponseType::Changed);
        assert_eq!(response.message.payload, sha256_hex(b"orphan").into_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_session_expires() {
        let handler = DigestHandler::new().session_timeout(Duration::from_secs(10));
        post(&handler, 1, &[0u8; 16], Some(Block1::new(0, true, SZX_16).unwrap())).await;
        assert_eq!(handler.active_sessions().await, 1);

        tokio::time::advance(Duration::from_secs(11)).await;
        post(&handler, 2, b"other peer", None).await;

        assert_eq!(handler.active_sessions().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_cap_drops_idle_upload() {
        let handler = DigestHandler::new().max_sessions(2);
        for peer in 1..=3 {
            post(&handler, peer, &[peer as u8; 16], Some(Block1::new(0, true, SZX_16).unwrap())).await;
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(handler.active_sessions().await, 2);

        // Peer 1 was idle the longest, so its upload restarts from this chunk.
        let last = Some(Block1::new(1, false, SZX_16).unwrap());
        let dropped = post(&handler, 1, b"tail", last).await;
        assert_eq!(dropped.message.payload, sha256_hex(b"tail").into_bytes());

        let kept = post(&handler, 3, b"tail", last).await;
        let mut expected = vec![3u8; 16];
        expected.extend_from_slice(b"tail");
        assert_eq!(kept.message.payload, sha256_hex(&expected).into_bytes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_live_session_survives() {
        let handler = DigestHandler::new().session_timeout(Duration::from_secs(10));
        post(&handler, 1, &[1u8; 16], Some(Block1::new(0, true, SZX_16).unwrap())).await;

        tokio::time::advance(Duration::from_secs(5)).await;
        let response = post(&handler, 1, &[2u8; 4], Some(Block1::new(1, false, SZX_16).unwrap())).await;

        let mut expected = vec![1u8; 16];
        expected.extend_from_slice(&[2u8; 4]);
        assert_eq!(response.message.payload, sha256_hex(&expected).into_bytes());
    }
}
