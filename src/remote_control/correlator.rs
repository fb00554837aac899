use rand::Rng;
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::Error;

use super::dialect::{Response, ResponseBody};

/// Request categories. Each gets its own id space and its own single
/// in-flight slot, there is no queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Connect,
    ListScenes,
    ActiveScene,
    SetScene,
}

const KINDS: usize = 4;

impl RequestKind {
    const ALL: [RequestKind; KINDS] = [
        RequestKind::Connect,
        RequestKind::ListScenes,
        RequestKind::ActiveScene,
        RequestKind::SetScene,
    ];

    fn index(self) -> usize {
        match self {
            RequestKind::Connect => 0,
            RequestKind::ListScenes => 1,
            RequestKind::ActiveScene => 2,
            RequestKind::SetScene => 3,
        }
    }

    fn base(self) -> u64 {
        match self {
            RequestKind::Connect => 100,
            RequestKind::ListScenes => 200,
            RequestKind::ActiveScene => 300,
            RequestKind::SetScene => 400,
        }
    }
}

/// Reply channel for one in-flight request.
pub type Responder = oneshot::Sender<Result<ResponseBody, Error>>;

struct Slot {
    request_id: u64,
    respond: Responder,
}

/// Matches replies to the requests that caused them.
///
/// Ids start from a distinct base per kind and grow by a random offset on
/// every request, which keeps stale replies from earlier traffic
/// distinguishable in practice. Best effort, not a guarantee: a zero offset
/// reuses the previous id and the reply then settles the newer slot, the
/// same latest-wins outcome the single slot gives anyway.
pub struct Correlator {
    counters: [u64; KINDS],
    pending: [Option<Slot>; KINDS],
}

impl Correlator {
    pub fn new() -> Self {
        Self {
            counters: [
                RequestKind::Connect.base(),
                RequestKind::ListScenes.base(),
                RequestKind::ActiveScene.base(),
                RequestKind::SetScene.base(),
            ],
            pending: [None, None, None, None],
        }
    }

    /// Next correlation id for a kind. This is the value the remote has to
    /// echo back for the reply to be routable.
    pub fn create_id(&mut self, kind: RequestKind) -> u64 {
        let counter = &mut self.counters[kind.index()];
        *counter += rand::thread_rng().gen_range(0..1000);
        *counter
    }

    /// Registers the in-flight request for a kind and returns its id. An
    /// earlier occupant of the slot is superseded, its caller fails right
    /// away instead of waiting on a reply that will never be routed to it.
    pub fn register(&mut self, kind: RequestKind, respond: Responder) -> u64 {
        let request_id = self.create_id(kind);

        let slot = Slot {
            request_id,
            respond,
        };

        if let Some(previous) = self.pending[kind.index()].replace(slot) {
            debug!(?kind, "in-flight request superseded");
            let _ = previous.respond.send(Err(Error::Superseded));
        }

        request_id
    }

    /// Routes a reply to the slot whose id matches and returns the kind it
    /// settled. Replies nothing waits for are dropped.
    pub fn resolve(&mut self, response: Response) -> Option<RequestKind> {
        let kind = self.waiting_kind(response.request_id)?;
        let slot = self.pending[kind.index()].take()?;
        let _ = slot.respond.send(Ok(response.body));

        Some(kind)
    }

    /// Settles the connect slot directly, for dialects whose auth outcome
    /// arrives without a correlation id.
    pub fn settle_connect(&mut self, ok: bool) {
        if let Some(slot) = self.pending[RequestKind::Connect.index()].take() {
            let _ = slot.respond.send(Ok(ResponseBody::Ack(ok)));
        }
    }

    /// Fails the in-flight request of one kind, for errors that happen
    /// before the request even reaches the remote.
    pub fn fail(&mut self, kind: RequestKind, error: Error) {
        if let Some(slot) = self.pending[kind.index()].take() {
            let _ = slot.respond.send(Err(error));
        }
    }

    /// Fails everything still in flight. Called when the connection goes
    /// away so callers get an answer instead of waiting forever.
    pub fn drain(&mut self) {
        for slot in &mut self.pending {
            if let Some(slot) = slot.take() {
                let _ = slot.respond.send(Err(Error::Disconnected));
            }
        }
    }

    /// Which kind, if any, is waiting on this id.
    pub fn waiting_kind(&self, request_id: u64) -> Option<RequestKind> {
        RequestKind::ALL.into_iter().find(|kind| {
            self.pending[kind.index()]
                .as_ref()
                .map(|slot| slot.request_id == request_id)
                .unwrap_or(false)
        })
    }
}
