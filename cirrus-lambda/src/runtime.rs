//! Invocation boundary between Lambda events and a routing layer.

use crate::response::ERROR_TYPE_HEADER;
use crate::streaming::STREAM_CAPACITY;
use crate::{
    FromApiGateway, InvocationContext, InvocationEvent, LambdaConfig, LambdaError,
    ResponseDocument, Result, RuntimeStream, Stream, StreamingTo, Tracing,
};
use bytes::Bytes;
use cirrus_core::{HttpError, MultipartParser, Request, Response};
use lambda_runtime::{LambdaEvent, StreamResponse, service_fn};
use std::convert::Infallible;
use std::sync::Arc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// The HTTP-processing layer driven by an invocation.
///
/// Failures returned here are classified at the boundary: an
/// [`HttpError`] answers with its own status, anything else becomes an
/// internal server error.
#[async_trait::async_trait]
pub trait Routing: Send + Sync {
    async fn service(&self, req: &mut Request, res: &mut Response<'_>) -> anyhow::Result<()>;
}

#[async_trait::async_trait]
impl<R: Routing + ?Sized> Routing for Arc<R> {
    async fn service(&self, req: &mut Request, res: &mut Response<'_>) -> anyhow::Result<()> {
        (**self).service(req, res).await
    }
}

/// Settings shared by buffered and streaming invocations.
#[derive(Clone, Default)]
struct Settings {
    config: Arc<LambdaConfig>,
    tracing: Tracing,
    multipart: Option<Arc<dyn MultipartParser>>,
}

impl Settings {
    /// Turn an event into a request carrying the invocation's context
    /// values, or fail if the event cannot be handled at all.
    fn request(&self, event: InvocationEvent, context: InvocationContext) -> Result<Request> {
        let mut input = FromApiGateway::new(event)?;
        if let Some(parser) = &self.multipart {
            input = input.with_multipart(parser.clone());
        }
        let request_context = input.context()?;

        let mut req = Request::new(input);
        req.pass(context)
            .pass(request_context)
            .pass(self.config.clone());

        if self.config.log_requests {
            debug!(
                method = %req.method(),
                path = %req.path(),
                request_id = ?req.value::<InvocationContext>().map(|c| &c.request_id),
                "Handling Lambda request"
            );
        }
        Ok(req)
    }

    fn log_response(&self, status: u16) {
        if self.config.log_responses {
            debug!(status, "Lambda response");
        }
    }
}

/// Runs a routing layer behind an HTTP API gateway, answering each
/// invocation with a buffered [`ResponseDocument`].
pub struct HttpApi<R> {
    routing: Arc<R>,
    settings: Settings,
}

impl<R: Routing> HttpApi<R> {
    pub fn new(routing: R) -> Self {
        Self {
            routing: Arc::new(routing),
            settings: Settings::default(),
        }
    }

    /// Set the adapter configuration.
    pub fn with_config(mut self, config: LambdaConfig) -> Self {
        self.settings.config = Arc::new(config);
        self
    }

    pub fn with_tracing(mut self, tracing: Tracing) -> Self {
        self.settings.tracing = tracing;
        self
    }

    pub fn with_multipart(mut self, parser: Arc<dyn MultipartParser>) -> Self {
        self.settings.multipart = Some(parser);
        self
    }

    pub fn config(&self) -> &LambdaConfig {
        &self.settings.config
    }

    /// Handle one invocation.
    ///
    /// Only events that cannot be handled at all yield an error; failures
    /// inside the routing layer are traced and answered with an error
    /// document.
    pub async fn invoke(
        &self,
        event: InvocationEvent,
        context: InvocationContext,
    ) -> Result<ResponseDocument> {
        let mut req = self.settings.request(event, context)?;
        let mut doc = ResponseDocument::new();

        let mut res = Response::new(&mut doc);
        let outcome = match self.routing.service(&mut req, &mut res).await {
            Ok(()) => res.end().map_err(anyhow::Error::from),
            Err(err) => Err(err),
        };
        let status = res.status();
        drop(res);

        match outcome {
            Ok(()) => {
                self.settings.tracing.log(&req, status, None);
                self.settings.log_response(status);
                Ok(doc)
            }
            Err(err) => {
                let err = HttpError::normalize(err);
                self.settings
                    .tracing
                    .log(&req, err.status_code(), Some(&err));
                self.settings.log_response(err.status_code());
                Ok(ResponseDocument::error(&err))
            }
        }
    }

    /// Serve invocations from the Lambda runtime API.
    ///
    /// This function never returns under normal operation.
    pub async fn run(self) -> Result<()>
    where
        R: 'static,
    {
        info!(function = %self.settings.config, "Starting Cirrus Lambda runtime");

        let api = Arc::new(self);
        lambda_runtime::run(service_fn(move |event: LambdaEvent<InvocationEvent>| {
            let api = api.clone();
            async move {
                let (payload, context) = event.into_parts();
                api.invoke(payload, InvocationContext::from(context))
                    .await
                    .map_err(|e| Box::new(e) as lambda_runtime::Error)
            }
        }))
        .await
        .map_err(LambdaError::from)
    }
}

/// Runs a routing layer behind a function URL, streaming each response as
/// it is written.
pub struct HttpStreaming<R> {
    routing: Arc<R>,
    settings: Settings,
}

impl<R: Routing> HttpStreaming<R> {
    pub fn new(routing: R) -> Self {
        Self {
            routing: Arc::new(routing),
            settings: Settings::default(),
        }
    }

    /// Set the adapter configuration.
    pub fn with_config(mut self, config: LambdaConfig) -> Self {
        self.settings.config = Arc::new(config);
        self
    }

    pub fn with_tracing(mut self, tracing: Tracing) -> Self {
        self.settings.tracing = tracing;
        self
    }

    pub fn with_multipart(mut self, parser: Arc<dyn MultipartParser>) -> Self {
        self.settings.multipart = Some(parser);
        self
    }

    pub fn config(&self) -> &LambdaConfig {
        &self.settings.config
    }

    /// Handle one invocation, writing the response to `stream`. The
    /// stream is handed back once ended.
    ///
    /// A failure before any header was sent is answered with an error
    /// response; once headers went out, the stream is just ended.
    pub async fn invoke<S: Stream>(
        &self,
        event: InvocationEvent,
        stream: S,
        context: InvocationContext,
    ) -> Result<S> {
        let mut req = self.settings.request(event, context)?;
        let mut out = StreamingTo::new(stream);
        if let Some(hint) = &self.settings.config.stream_body_hint {
            out = out.with_body_hint(hint.clone());
        }

        {
            let mut res = Response::new(&mut out);
            let outcome = match self.routing.service(&mut req, &mut res).await {
                Ok(()) => res.end().map_err(anyhow::Error::from),
                Err(err) => Err(err),
            };

            match outcome {
                Ok(()) => {
                    self.settings.tracing.log(&req, res.status(), None);
                    self.settings.log_response(res.status());
                }
                Err(err) => {
                    let err = HttpError::normalize(err);
                    self.settings
                        .tracing
                        .log(&req, err.status_code(), Some(&err));
                    self.settings.log_response(err.status_code());

                    if res.committed() {
                        res.end()?;
                    } else {
                        res.reset()?;
                        res.answer_with(err.status_code(), err.message())
                            .header(ERROR_TYPE_HEADER, err.kind());
                        res.send(err.compound_message(), "text/plain")?;
                    }
                }
            }
        }

        Ok(out.into_inner())
    }

    /// Handle one runtime invocation as a streamed response.
    ///
    /// Resolves once the prelude is known; the body keeps flowing from a
    /// blocking thread, since [`RuntimeStream`] waits on a bounded channel.
    pub async fn stream_response(
        self: Arc<Self>,
        event: LambdaEvent<InvocationEvent>,
    ) -> Result<
        StreamResponse<
            impl tokio_stream::Stream<Item = std::result::Result<Bytes, Infallible>> + Unpin + Send,
        >,
    >
    where
        R: 'static,
    {
        let (payload, context) = event.into_parts();
        let (stream, prelude, body) = RuntimeStream::channel(STREAM_CAPACITY);

        let handle = tokio::runtime::Handle::current();
        let task = tokio::task::spawn_blocking(move || {
            handle.block_on(self.invoke(payload, stream, InvocationContext::from(context)))
        });

        match prelude.await {
            Ok(metadata_prelude) => Ok(StreamResponse {
                metadata_prelude,
                stream: ReceiverStream::new(body).map(Ok::<_, Infallible>),
            }),
            Err(_) => match task.await {
                Ok(Ok(_)) => Err(LambdaError::Runtime(
                    "Stream ended without a prelude".to_string(),
                )),
                Ok(Err(err)) => Err(err),
                Err(err) => Err(LambdaError::Runtime(err.to_string())),
            },
        }
    }

    /// Serve invocations from the Lambda runtime API with streamed
    /// responses.
    ///
    /// This function never returns under normal operation.
    pub async fn run(self) -> Result<()>
    where
        R: 'static,
    {
        info!(function = %self.settings.config, "Starting Cirrus Lambda streaming runtime");

        let api = Arc::new(self);
        lambda_runtime::run(service_fn(move |event: LambdaEvent<InvocationEvent>| {
            let api = api.clone();
            async move {
                api.stream_response(event)
                    .await
                    .map_err(|e| Box::new(e) as lambda_runtime::Error)
            }
        }))
        .await
        .map_err(LambdaError::from)
    }
}
