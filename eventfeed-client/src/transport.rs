//! Transport abstraction for event-stream requests.
//!
//! A transport turns a [`TransportRequest`] into a response status plus a
//! cancellable stream of decoded text fragments. The client is the only
//! caller and owns the cancellation token it passes down.

use crate::error::{TransportError, TransportResult};
use crate::events::ResponseMeta;
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{ready, Stream};
use pin_project_lite::pin_project;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

/// Stream of decoded text fragments.
pub type TextStream = BoxStream<'static, TransportResult<String>>;

/// One request issued by the client.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Target URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Request headers, names lowercased.
    pub headers: BTreeMap<String, String>,
    /// Request body.
    pub body: Option<String>,
    /// Cancelled when the client disconnects.
    pub cancel: CancellationToken,
}

impl TransportRequest {
    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Look up a header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }
}

/// An opened response.
pub struct TransportResponse {
    /// Status and headers.
    pub meta: ResponseMeta,
    /// Decoded body fragments.
    pub body: TextStream,
}

impl TransportResponse {
    /// Create a response.
    pub fn new(meta: ResponseMeta, body: TextStream) -> Self {
        Self { meta, body }
    }
}

impl std::fmt::Debug for TransportResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportResponse")
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Capability that opens streaming requests.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Issue the request and return once response headers are available.
    ///
    /// Non-success statuses are returned as responses, not errors; the
    /// client decides which statuses it accepts.
    async fn open(&self, request: TransportRequest) -> TransportResult<TransportResponse>;
}

/// Incremental UTF-8 decoder that tolerates code points split across chunks.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a new decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a chunk, holding back an incomplete trailing sequence.
    pub fn decode(&mut self, bytes: &[u8]) -> TransportResult<String> {
        let mut input = std::mem::take(&mut self.pending);
        input.extend_from_slice(bytes);

        match std::str::from_utf8(&input) {
            Ok(text) => Ok(text.to_string()),
            Err(err) if err.error_len().is_some() => Err(TransportError::decode(format!(
                "invalid UTF-8 sequence at byte {}",
                err.valid_up_to()
            ))),
            Err(err) => {
                self.pending = input.split_off(err.valid_up_to());
                String::from_utf8(input).map_err(|e| TransportError::decode(e.to_string()))
            }
        }
    }

    /// Check that the stream did not end inside a multi-byte sequence.
    pub fn finish(&mut self) -> TransportResult<()> {
        if self.pending.is_empty() {
            Ok(())
        } else {
            let held = self.pending.len();
            self.pending.clear();
            Err(TransportError::decode(format!(
                "stream ended inside a multi-byte sequence ({held} bytes held)"
            )))
        }
    }
}

pin_project! {
    /// Stream adapter decoding a byte stream into UTF-8 text fragments.
    pub struct DecodedBody<S> {
        #[pin]
        inner: S,
        decoder: Utf8Decoder,
        finished: bool,
    }
}

impl<S> DecodedBody<S> {
    /// Wrap a byte stream.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            decoder: Utf8Decoder::new(),
            finished: false,
        }
    }
}

impl<S, B> Stream for DecodedBody<S>
where
    S: Stream<Item = TransportResult<B>>,
    B: AsRef<[u8]>,
{
    type Item = TransportResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        loop {
            if *this.finished {
                return Poll::Ready(None);
            }

            match ready!(this.inner.as_mut().poll_next(cx)) {
                Some(Ok(bytes)) => match this.decoder.decode(bytes.as_ref()) {
                    Ok(text) if text.is_empty() => continue,
                    Ok(text) => return Poll::Ready(Some(Ok(text))),
                    Err(err) => {
                        *this.finished = true;
                        return Poll::Ready(Some(Err(err)));
                    }
                },
                Some(Err(err)) => return Poll::Ready(Some(Err(err))),
                None => {
                    *this.finished = true;
                    if let Err(err) = this.decoder.finish() {
                        return Poll::Ready(Some(Err(err)));
                    }
                    return Poll::Ready(None);
                }
            }
        }
    }
}

/// HTTP transport backed by `reqwest`.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestTransport {
    /// Create a transport with a default client.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with a custom client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "reqwest")]
#[async_trait]
impl EventTransport for ReqwestTransport {
    async fn open(&self, request: TransportRequest) -> TransportResult<TransportResponse> {
        use futures::StreamExt;

        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self.client.request(method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = tokio::select! {
            biased;
            _ = request.cancel.cancelled() => return Err(TransportError::Cancelled),
            result = builder.send() => result.map_err(|e| {
                if e.is_builder() {
                    TransportError::InvalidRequest(e.to_string())
                } else {
                    TransportError::Network(e.to_string())
                }
            })?,
        };

        let mut meta = ResponseMeta::new(response.status().as_u16());
        for (name, value) in response.headers() {
            if let Ok(value) = value.to_str() {
                meta.headers.insert(name.as_str().to_string(), value.to_string());
            }
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| TransportError::Network(e.to_string())))
            .take_until(request.cancel.cancelled_owned());

        Ok(TransportResponse::new(meta, DecodedBody::new(bytes).boxed()))
    }
}
