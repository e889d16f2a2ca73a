//! Stateful event-stream client.
//!
//! [`EventSourceClient`] owns one logical connection: it drives the
//! transport, parses records, tracks [`ConnectionState`], remembers the
//! last record ID for resumption, and fans events out to subscribers.
//!
//! Failures are terminal. Resuming is a caller decision: calling
//! [`connect`](EventSourceClient::connect) again sends the remembered
//! `last-event-id` header.

use crate::error::{ClientError, TransportError};
use crate::events::{ClientEvent, EventName, ResponseMeta};
use crate::options::ClientOptions;
use crate::registry::{Handler, SubscriptionId, SubscriptionRegistry};
use crate::state::ConnectionState;
use crate::transport::{EventTransport, TransportRequest};
use eventfeed_streaming::{EventRecord, FrameStream};
use futures::future::{BoxFuture, FutureExt, Shared};
use futures::StreamExt;
use parking_lot::{Mutex, ReentrantMutex};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a `connect()` call settled.
#[derive(Debug, Clone, Default)]
pub enum ConnectOutcome {
    /// The server ended the stream.
    Closed,
    /// The stream failed; the same error was delivered to `error` handlers.
    Failed(ClientError),
    /// `disconnect()` or `destroy()` ended the connection.
    #[default]
    Disconnected,
    /// The client could not start a connection.
    Rejected(ClientError),
}

impl ConnectOutcome {
    /// Get the failure, if any.
    pub fn error(&self) -> Option<&ClientError> {
        match self {
            Self::Failed(err) | Self::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

/// Completion of a `connect()` call. Cloning shares the same outcome.
pub type ConnectFuture = Shared<BoxFuture<'static, ConnectOutcome>>;

struct ActiveConnection {
    generation: u64,
    cancel: CancellationToken,
    completion: ConnectFuture,
}

#[derive(Default)]
struct ClientCore {
    state: ConnectionState,
    last_event_id: Option<String>,
    retry_hint: Option<Duration>,
    active: Option<ActiveConnection>,
    next_generation: u64,
    destroyed: bool,
}

impl ClientCore {
    fn set_state(&mut self, state: ConnectionState) -> bool {
        if self.state == state {
            return false;
        }
        debug!(from = %self.state, to = %state, "Connection state changed");
        self.state = state;
        true
    }

    fn is_current(&self, generation: u64) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| active.generation == generation)
    }
}

struct ClientInner {
    url: String,
    options: ClientOptions,
    transport: Arc<dyn EventTransport>,
    // Serializes every emission with disconnect(); reentrant so handlers
    // may call back into the client.
    dispatch: ReentrantMutex<()>,
    core: Mutex<ClientCore>,
    registry: Mutex<SubscriptionRegistry>,
}

impl ClientInner {
    fn emit(&self, name: EventName, event: &ClientEvent) {
        let handlers = self.registry.lock().take_handlers(&name);
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!(event = %name, subscription = %id, error = %err, "Event handler failed");
                }
                Err(_) => {
                    error!(event = %name, subscription = %id, "Event handler panicked");
                }
            }
        }
    }

    fn emit_state(&self, state: ConnectionState) {
        self.emit(EventName::StateChange, &ClientEvent::StateChange(state));
    }

    fn mark_open(&self, generation: u64, meta: ResponseMeta) -> bool {
        let _dispatch = self.dispatch.lock();
        {
            let mut core = self.core.lock();
            if !core.is_current(generation) {
                return false;
            }
            core.set_state(ConnectionState::Open);
        }
        info!(url = %self.url, status = meta.status, "Event stream opened");
        self.emit_state(ConnectionState::Open);
        self.emit(EventName::Open, &ClientEvent::Open(meta));
        self.core.lock().is_current(generation)
    }

    fn deliver(&self, generation: u64, record: EventRecord) -> bool {
        let _dispatch = self.dispatch.lock();
        {
            let mut core = self.core.lock();
            if !core.is_current(generation) {
                return false;
            }
            if let Some(id) = record.non_empty_id() {
                core.last_event_id = Some(id.to_string());
            }
            if let Some(ms) = record.retry {
                core.retry_hint = Some(Duration::from_millis(ms));
            }
        }

        self.emit(EventName::Message, &ClientEvent::Message(record.clone()));
        if let Some(name) = record.event_type() {
            if !self.core.lock().is_current(generation) {
                return false;
            }
            let name = EventName::custom(name);
            self.emit(name, &ClientEvent::Custom(record));
        }
        self.core.lock().is_current(generation)
    }

    fn finish(&self, generation: u64) -> ConnectOutcome {
        let _dispatch = self.dispatch.lock();
        let changed = {
            let mut core = self.core.lock();
            if !core.is_current(generation) {
                return ConnectOutcome::Disconnected;
            }
            core.active = None;
            core.set_state(ConnectionState::Closed)
        };
        info!(url = %self.url, "Event stream ended");
        if changed {
            self.emit_state(ConnectionState::Closed);
        }
        self.emit(EventName::Close, &ClientEvent::Close);
        ConnectOutcome::Closed
    }

    fn fail(&self, generation: u64, err: ClientError) -> ConnectOutcome {
        let _dispatch = self.dispatch.lock();
        let changed = {
            let mut core = self.core.lock();
            if !core.is_current(generation) {
                return ConnectOutcome::Disconnected;
            }
            core.set_state(ConnectionState::Errored)
        };
        warn!(url = %self.url, error = %err, "Event stream failed");
        if changed {
            self.emit_state(ConnectionState::Errored);
        }
        self.emit(EventName::Error, &ClientEvent::Error(err.clone()));

        // Teardown, unless an error handler already disconnected or reconnected.
        // The state stays `Errored`.
        let released = {
            let mut core = self.core.lock();
            if core.is_current(generation) {
                core.active.take()
            } else {
                None
            }
        };
        if let Some(active) = released {
            active.cancel.cancel();
            self.emit(EventName::Close, &ClientEvent::Close);
        }
        ConnectOutcome::Failed(err)
    }
}

impl Drop for ClientInner {
    fn drop(&mut self) {
        if let Some(active) = self.core.get_mut().active.take() {
            active.cancel.cancel();
        }
    }
}

/// Client for a single `text/event-stream` endpoint.
///
/// Cloning yields another handle to the same connection.
#[derive(Clone)]
pub struct EventSourceClient {
    inner: Arc<ClientInner>,
}

impl EventSourceClient {
    /// Create a client using the `reqwest` transport.
    #[cfg(feature = "reqwest")]
    pub fn new(url: impl Into<String>, options: ClientOptions) -> Self {
        Self::with_transport(
            url,
            options,
            Arc::new(crate::transport::ReqwestTransport::new()),
        )
    }

    /// Create a client with a custom transport.
    pub fn with_transport(
        url: impl Into<String>,
        options: ClientOptions,
        transport: Arc<dyn EventTransport>,
    ) -> Self {
        let core = ClientCore {
            last_event_id: options.last_event_id.clone(),
            ..ClientCore::default()
        };
        Self {
            inner: Arc::new(ClientInner {
                url: url.into(),
                options,
                transport,
                dispatch: ReentrantMutex::new(()),
                core: Mutex::new(core),
                registry: Mutex::new(SubscriptionRegistry::default()),
            }),
        }
    }

    /// Target URL.
    pub fn url(&self) -> &str {
        &self.inner.url
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    /// Check if records are flowing.
    pub fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    /// Check if a request is in flight.
    pub fn is_connecting(&self) -> bool {
        self.state() == ConnectionState::Connecting
    }

    /// ID of the last record that carried a non-empty `id`.
    pub fn last_event_id(&self) -> Option<String> {
        self.inner.core.lock().last_event_id.clone()
    }

    /// Last `retry:` hint received from the server.
    pub fn retry_hint(&self) -> Option<Duration> {
        self.inner.core.lock().retry_hint
    }

    /// Check if [`destroy`](Self::destroy) was called.
    pub fn is_destroyed(&self) -> bool {
        self.inner.core.lock().destroyed
    }

    /// Open the stream.
    ///
    /// The request starts immediately; the returned future only reports
    /// how the connection settled and never fails. While a connection is
    /// connecting or open, every call returns that connection's
    /// completion instead of issuing a second request.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&self) -> ConnectFuture {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();

        let completion = {
            let mut core = inner.core.lock();
            if core.destroyed {
                warn!(url = %inner.url, "connect() called on a destroyed client");
                return settled(ConnectOutcome::Rejected(ClientError::Destroyed));
            }
            if let Some(active) = &core.active {
                if core.state.is_active() {
                    return active.completion.clone();
                }
            }
            let runtime = match tokio::runtime::Handle::try_current() {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!(
                        url = %inner.url,
                        error = %err,
                        "connect() called outside a Tokio runtime"
                    );
                    return settled(ConnectOutcome::Rejected(ClientError::NoRuntime(
                        err.to_string(),
                    )));
                }
            };
            if let Some(stale) = core.active.take() {
                stale.cancel.cancel();
            }

            core.next_generation += 1;
            let generation = core.next_generation;
            let cancel = CancellationToken::new();
            let request = TransportRequest {
                url: inner.url.clone(),
                method: inner.options.request_method(),
                headers: inner
                    .options
                    .request_headers(core.last_event_id.as_deref()),
                body: inner.options.request_body(),
                cancel: cancel.clone(),
            };

            debug!(
                url = %inner.url,
                generation,
                last_event_id = ?core.last_event_id,
                "Connecting event stream"
            );

            let task = runtime.spawn(drive(
                Arc::downgrade(inner),
                Arc::clone(&inner.transport),
                generation,
                request,
            ));
            let completion = async move {
                task.await.unwrap_or_else(|err| {
                    error!(error = %err, "Event stream task aborted");
                    ConnectOutcome::Disconnected
                })
            }
            .boxed()
            .shared();

            core.active = Some(ActiveConnection {
                generation,
                cancel,
                completion: completion.clone(),
            });
            core.set_state(ConnectionState::Connecting);
            completion
        };

        inner.emit_state(ConnectionState::Connecting);
        completion
    }

    /// Close the stream.
    ///
    /// No-op when idle or already closed. Cancels the in-flight request,
    /// moves to `Closed` and fires `close`. After a failure only the state
    /// moves to `Closed`. The last event ID is kept.
    pub fn disconnect(&self) {
        let inner = &self.inner;
        let _dispatch = inner.dispatch.lock();

        let (released, changed) = {
            let mut core = inner.core.lock();
            if matches!(
                core.state,
                ConnectionState::Idle | ConnectionState::Closed
            ) {
                return;
            }
            let released = core.active.take();
            (released, core.set_state(ConnectionState::Closed))
        };
        let had_connection = released.is_some();
        if let Some(active) = released {
            active.cancel.cancel();
        }

        info!(url = %inner.url, "Event stream disconnected");
        if changed {
            inner.emit_state(ConnectionState::Closed);
        }
        // A failed stream already fired `close` during its teardown.
        if had_connection {
            inner.emit(EventName::Close, &ClientEvent::Close);
        }
    }

    /// Disconnect and drop every subscription. The client cannot be
    /// reconnected afterwards.
    pub fn destroy(&self) {
        self.disconnect();
        let newly_destroyed = {
            let mut core = self.inner.core.lock();
            !std::mem::replace(&mut core.destroyed, true)
        };
        if newly_destroyed {
            debug!(url = %self.inner.url, "Client destroyed");
        }
        self.inner.registry.lock().clear();
    }

    /// Subscribe to an event.
    pub fn on<F>(&self, name: EventName, handler: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(name, Arc::new(handler), false)
    }

    /// Subscribe to the next occurrence of an event only.
    pub fn once<F>(&self, name: EventName, handler: F) -> SubscriptionId
    where
        F: Fn(&ClientEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.subscribe(name, Arc::new(handler), true)
    }

    /// Remove one handler, or all handlers for `name` when `id` is `None`.
    ///
    /// Returns the number of handlers removed.
    pub fn off(&self, name: &EventName, id: Option<SubscriptionId>) -> usize {
        self.inner.registry.lock().unsubscribe(name, id)
    }

    /// Number of handlers registered for `name`.
    pub fn handler_count(&self, name: &EventName) -> usize {
        self.inner.registry.lock().handler_count(name)
    }

    fn subscribe(&self, name: EventName, handler: Handler, once: bool) -> SubscriptionId {
        if self.is_destroyed() {
            warn!(event = %name, "Subscribing on a destroyed client has no effect");
        }
        self.inner.registry.lock().subscribe(name, handler, once)
    }
}

impl std::fmt::Debug for EventSourceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let core = self.inner.core.lock();
        f.debug_struct("EventSourceClient")
            .field("url", &self.inner.url)
            .field("state", &core.state)
            .field("last_event_id", &core.last_event_id)
            .finish_non_exhaustive()
    }
}

fn settled(outcome: ConnectOutcome) -> ConnectFuture {
    futures::future::ready(outcome).boxed().shared()
}

/// Read loop for one connection. Holds only a weak reference to the
/// client between suspension points so dropping the client cancels it.
async fn drive(
    client: Weak<ClientInner>,
    transport: Arc<dyn EventTransport>,
    generation: u64,
    request: TransportRequest,
) -> ConnectOutcome {
    let cancel = request.cancel.clone();

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return ConnectOutcome::Disconnected,
        result = transport.open(request) => result,
    };

    let response = match opened {
        Ok(response) if response.meta.is_success() => response,
        Ok(response) => {
            let err = ClientError::OpenFailed(TransportError::Status {
                status: response.meta.status,
            });
            return with_client(&client, |inner| inner.fail(generation, err));
        }
        Err(TransportError::Cancelled) => return ConnectOutcome::Disconnected,
        Err(err) => {
            return with_client(&client, |inner| {
                inner.fail(generation, ClientError::OpenFailed(err))
            });
        }
    };

    let mut records = FrameStream::new(response.body);
    let meta = response.meta;
    if !with_client(&client, |inner| inner.mark_open(generation, meta)) {
        return ConnectOutcome::Disconnected;
    }

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => return ConnectOutcome::Disconnected,
            next = records.next() => next,
        };

        match next {
            Some(Ok(record)) => {
                if !with_client(&client, |inner| inner.deliver(generation, record)) {
                    return ConnectOutcome::Disconnected;
                }
            }
            Some(Err(TransportError::Cancelled)) => return ConnectOutcome::Disconnected,
            Some(Err(err)) => {
                return with_client(&client, |inner| {
                    inner.fail(generation, ClientError::ReadFailed(err))
                });
            }
            None => return with_client(&client, |inner| inner.finish(generation)),
        }
    }
}

fn with_client<R: Default>(client: &Weak<ClientInner>, f: impl FnOnce(&ClientInner) -> R) -> R {
    client.upgrade().map(|inner| f(&inner)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportResult;
    use crate::options::LAST_EVENT_ID_HEADER;
    use crate::transport::{TextStream, TransportResponse};
    use async_trait::async_trait;
    use futures::channel::mpsc;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Script {
        Respond {
            status: u16,
            body: mpsc::UnboundedReceiver<TransportResult<String>>,
        },
        Fail(TransportError),
        Hang,
    }

    #[derive(Default)]
    struct ScriptedTransport {
        scripts: Mutex<VecDeque<Script>>,
        requests: Mutex<Vec<TransportRequest>>,
    }

    impl ScriptedTransport {
        fn push(&self, script: Script) {
            self.scripts.lock().push_back(script);
        }

        /// Queue a 200 response and return the sender feeding its body.
        fn push_body(&self) -> mpsc::UnboundedSender<TransportResult<String>> {
            let (tx, rx) = mpsc::unbounded();
            self.push(Script::Respond { status: 200, body: rx });
            tx
        }

        fn push_complete(&self, body: &str) {
            let tx = self.push_body();
            tx.unbounded_send(Ok(body.to_string())).unwrap();
        }

        fn request_count(&self) -> usize {
            self.requests.lock().len()
        }

        fn request(&self, index: usize) -> TransportRequest {
            self.requests.lock()[index].clone()
        }
    }

    #[async_trait]
    impl EventTransport for ScriptedTransport {
        async fn open(&self, request: TransportRequest) -> TransportResult<TransportResponse> {
            self.requests.lock().push(request);
            let script = self.scripts.lock().pop_front();
            match script {
                Some(Script::Respond { status, body }) => {
                    let body: TextStream = body.boxed();
                    Ok(TransportResponse::new(ResponseMeta::new(status), body))
                }
                Some(Script::Fail(err)) => Err(err),
                Some(Script::Hang) | None => futures::future::pending().await,
            }
        }
    }

    fn client_with(transport: &Arc<ScriptedTransport>) -> EventSourceClient {
        EventSourceClient::with_transport(
            "http://localhost/sse",
            ClientOptions::default(),
            Arc::clone(transport) as Arc<dyn EventTransport>,
        )
    }

    fn record_events(client: &EventSourceClient, name: EventName) -> Arc<Mutex<Vec<ClientEvent>>> {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        client.on(name, move |event| {
            sink.lock().push(event.clone());
            Ok(())
        });
        seen
    }

    fn count_events(client: &EventSourceClient, name: EventName) -> Arc<AtomicUsize> {
        let count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&count);
        client.on(name, move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        count
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("data: a\n\nid: 1\ndata: b\n\n");
        let client = client_with(&transport);

        let states = record_events(&client, EventName::StateChange);
        let messages = record_events(&client, EventName::Message);
        let opens = count_events(&client, EventName::Open);
        let closes = count_events(&client, EventName::Close);

        assert_eq!(client.state(), ConnectionState::Idle);
        let outcome = client.connect().await;

        assert!(matches!(outcome, ConnectOutcome::Closed));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let states: Vec<_> = states.lock().iter().filter_map(ClientEvent::state).collect();
        assert_eq!(
            states,
            vec![
                ConnectionState::Connecting,
                ConnectionState::Open,
                ConnectionState::Closed
            ]
        );

        let data: Vec<_> = messages
            .lock()
            .iter()
            .filter_map(|e| e.record().map(|r| r.data.clone()))
            .collect();
        assert_eq!(data, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(client.last_event_id().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_connect_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::default());
        let body = transport.push_body();
        let client = client_with(&transport);

        let first = client.connect();
        let second = client.connect();
        assert!(client.is_connecting());

        drop(body);
        let (a, b) = futures::join!(first, second);

        assert!(matches!(a, ConnectOutcome::Closed));
        assert!(matches!(b, ConnectOutcome::Closed));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_sends_last_event_id() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("id: abc\ndata: first\n\n");
        transport.push_complete("data: second\n\n");
        let client = client_with(&transport);

        client.connect().await;
        assert_eq!(client.last_event_id().as_deref(), Some("abc"));
        assert_eq!(transport.request(0).header(LAST_EVENT_ID_HEADER), None);

        client.connect().await;
        assert_eq!(
            transport.request(1).header(LAST_EVENT_ID_HEADER),
            Some("abc")
        );
        // A record without an id leaves the resumption point unchanged.
        assert_eq!(client.last_event_id().as_deref(), Some("abc"));
    }

    #[tokio::test]
    async fn test_default_headers_sent() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("");
        let client = client_with(&transport);

        client.connect().await;
        let request = transport.request(0);
        assert_eq!(request.header("accept"), Some("text/event-stream"));
        assert_eq!(request.header("cache-control"), Some("no-cache"));
        assert_eq!(request.method, "GET");
        assert!(request.body.is_none());
    }

    #[tokio::test]
    async fn test_custom_event_fan_out() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("event: end\ndata: bye\n\ndata: plain\n\n");
        let client = client_with(&transport);

        let order = Arc::new(Mutex::new(Vec::new()));
        for name in [EventName::Message, EventName::custom("end")] {
            let sink = Arc::clone(&order);
            client.on(name, move |event| {
                let data = event.record().map(|r| r.data.clone()).unwrap_or_default();
                sink.lock().push(format!("{}:{}", event.name(), data));
                Ok(())
            });
        }

        client.connect().await;
        assert_eq!(
            *order.lock(),
            vec![
                "message:bye".to_string(),
                "end:bye".to_string(),
                "message:plain".to_string()
            ]
        );
    }

    #[tokio::test]
    async fn test_failing_handler_does_not_block_others() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("data: x\n\n");
        let client = client_with(&transport);

        client.on(EventName::Message, |_| anyhow::bail!("handler failed"));
        client.on(EventName::Message, |_| panic!("handler panicked"));
        let delivered = count_events(&client, EventName::Message);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Closed));
        assert_eq!(delivered.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_open_failure_status() {
        let transport = Arc::new(ScriptedTransport::default());
        let (_tx, rx) = mpsc::unbounded();
        transport.push(Script::Respond { status: 500, body: rx });
        let client = client_with(&transport);

        let errors = record_events(&client, EventName::Error);
        let opens = count_events(&client, EventName::Open);
        let closes = count_events(&client, EventName::Close);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(ref e) if e.status() == Some(500)));
        assert_eq!(client.state(), ConnectionState::Errored);
        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);

        let errors = errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].error().is_some_and(ClientError::is_open_failure));
    }

    #[tokio::test]
    async fn test_network_failure() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Script::Fail(TransportError::network("refused")));
        let client = client_with(&transport);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(ClientError::OpenFailed(_))));
        assert_eq!(client.state(), ConnectionState::Errored);
    }

    #[tokio::test]
    async fn test_read_failure_after_records() {
        let transport = Arc::new(ScriptedTransport::default());
        let body = transport.push_body();
        body.unbounded_send(Ok("data: a\n\n".to_string())).unwrap();
        body.unbounded_send(Err(TransportError::network("reset"))).unwrap();
        let client = client_with(&transport);

        let messages = count_events(&client, EventName::Message);
        let closes = count_events(&client, EventName::Close);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(ClientError::ReadFailed(_))));
        assert_eq!(messages.load(Ordering::SeqCst), 1);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert_eq!(client.state(), ConnectionState::Errored);

        // The failure already closed; disconnecting only settles the state.
        client.disconnect();
        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_fires_error_then_close() {
        let transport = Arc::new(ScriptedTransport::default());
        let body = transport.push_body();
        body.unbounded_send(Ok("data: a\n\n".to_string())).unwrap();
        body.unbounded_send(Err(TransportError::network("reset"))).unwrap();
        let client = client_with(&transport);

        let order = Arc::new(Mutex::new(Vec::new()));
        for name in [EventName::Message, EventName::Error, EventName::Close] {
            let sink = Arc::clone(&order);
            let label = name.clone();
            client.on(name, move |_| {
                sink.lock().push(label.to_string());
                Ok(())
            });
        }

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(_)));
        assert_eq!(*order.lock(), vec!["message", "error", "close"]);
        assert_eq!(client.state(), ConnectionState::Errored);
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_disconnect_from_error_handler_closes_once() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Script::Fail(TransportError::network("refused")));
        let client = client_with(&transport);

        let closer = client.clone();
        client.on(EventName::Error, move |_| {
            closer.disconnect();
            Ok(())
        });
        let closes = count_events(&client, EventName::Close);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Failed(ClientError::OpenFailed(_))));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_while_connecting() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push(Script::Hang);
        let client = client_with(&transport);

        let opens = count_events(&client, EventName::Open);
        let closes = count_events(&client, EventName::Close);

        let completion = client.connect();
        tokio::task::yield_now().await;
        client.disconnect();

        assert!(matches!(completion.await, ConnectOutcome::Disconnected));
        assert_eq!(client.state(), ConnectionState::Closed);
        assert_eq!(opens.load(Ordering::SeqCst), 0);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disconnect_when_idle_is_noop() {
        let transport = Arc::new(ScriptedTransport::default());
        let client = client_with(&transport);
        let closes = count_events(&client, EventName::Close);

        client.disconnect();
        assert_eq!(client.state(), ConnectionState::Idle);
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_no_messages_after_disconnect() {
        let transport = Arc::new(ScriptedTransport::default());
        let body = transport.push_body();
        let client = client_with(&transport);

        let messages = count_events(&client, EventName::Message);
        let opened = Arc::new(tokio::sync::Notify::new());
        let signal = Arc::clone(&opened);
        client.once(EventName::Open, move |_| {
            signal.notify_one();
            Ok(())
        });

        let completion = client.connect();
        opened.notified().await;
        client.disconnect();
        let _ = body.unbounded_send(Ok("data: late\n\n".to_string()));

        assert!(matches!(completion.await, ConnectOutcome::Disconnected));
        assert_eq!(messages.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_handler_can_disconnect() {
        let transport = Arc::new(ScriptedTransport::default());
        let body = transport.push_body();
        body.unbounded_send(Ok("event: end\ndata: done\n\ndata: after\n\n".to_string()))
            .unwrap();
        let client = client_with(&transport);

        let messages = record_events(&client, EventName::Message);
        let handle = client.clone();
        client.on(EventName::custom("end"), move |_| {
            handle.disconnect();
            Ok(())
        });

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Disconnected));
        assert_eq!(messages.lock().len(), 1);
        assert_eq!(client.state(), ConnectionState::Closed);
        client.destroy();
    }

    #[tokio::test]
    async fn test_once_and_off() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("data: 1\n\ndata: 2\n\n");
        let client = client_with(&transport);

        let once_count = Arc::new(AtomicUsize::new(0));
        let sink = Arc::clone(&once_count);
        client.once(EventName::Message, move |_| {
            sink.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        let removed = client.on(EventName::Message, |_| anyhow::bail!("should be removed"));
        assert_eq!(client.off(&EventName::Message, Some(removed)), 1);

        client.connect().await;
        assert_eq!(once_count.load(Ordering::SeqCst), 1);
        assert_eq!(client.handler_count(&EventName::Message), 0);
    }

    #[tokio::test]
    async fn test_destroy_is_idempotent() {
        let transport = Arc::new(ScriptedTransport::default());
        let _body = transport.push_body();
        let client = client_with(&transport);
        let closes = count_events(&client, EventName::Close);

        let completion = client.connect();
        tokio::task::yield_now().await;
        assert!(client.is_open());
        client.destroy();
        client.destroy();

        assert!(matches!(completion.await, ConnectOutcome::Disconnected));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
        assert!(client.is_destroyed());
        assert_eq!(client.handler_count(&EventName::Close), 0);

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Rejected(ClientError::Destroyed)));
        assert_eq!(transport.request_count(), 1);
    }

    #[tokio::test]
    async fn test_retry_hint_and_seeded_last_event_id() {
        let transport = Arc::new(ScriptedTransport::default());
        transport.push_complete("retry: 2500\ndata: x\n\n");
        let client = EventSourceClient::with_transport(
            "http://localhost/sse",
            ClientOptions::new().last_event_id("seed"),
            Arc::clone(&transport) as Arc<dyn EventTransport>,
        );

        client.connect().await;
        assert_eq!(transport.request(0).header(LAST_EVENT_ID_HEADER), Some("seed"));
        assert_eq!(client.retry_hint(), Some(Duration::from_millis(2500)));
    }

    #[cfg(feature = "reqwest")]
    #[tokio::test]
    async fn test_end_to_end_with_http_server() {
        use wiremock::matchers::{header, method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sse"))
            .and(header("last-event-id", "41"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "id: 42\nevent: tick\ndata: {\"n\":1}\n\n: comment\n\n",
                "text/event-stream",
            ))
            .mount(&server)
            .await;

        let options = ClientOptions::new()
            .method("POST")
            .last_event_id("41")
            .json_body(&serde_json::json!({ "topic": "clock" }))
            .unwrap();
        let client = EventSourceClient::new(format!("{}/sse", server.uri()), options);
        let ticks = record_events(&client, EventName::custom("tick"));

        let outcome = client.connect().await;
        assert!(matches!(outcome, ConnectOutcome::Closed));
        assert_eq!(client.last_event_id().as_deref(), Some("42"));

        let ticks = ticks.lock();
        assert_eq!(ticks.len(), 1);
        let value: serde_json::Value = ticks[0].record().unwrap().parse_data().unwrap();
        assert_eq!(value["n"], 1);
    }
}
