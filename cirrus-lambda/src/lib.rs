//! # Cirrus Lambda
//!
//! AWS Lambda adapter for HTTP API gateway (payload format 2.0) and
//! function URL invocations.
//!
//! Inbound events become [`cirrus_core::Request`]s; responses are either
//! collected into a [`ResponseDocument`] or streamed through
//! [`StreamingTo`] as they are written.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cirrus_core::{Request, Response};
//! use cirrus_lambda::{HttpApi, LambdaConfig, Routing};
//!
//! struct Hello;
//!
//! #[async_trait::async_trait]
//! impl Routing for Hello {
//!     async fn service(&self, req: &mut Request, res: &mut Response<'_>) -> anyhow::Result<()> {
//!         let name = req.param("name").unwrap_or("World").to_string();
//!         res.send(format!("Hello {}", name), "text/plain")?;
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> cirrus_lambda::Result<()> {
//!     // Initialize tracing for CloudWatch
//!     cirrus_lambda::init_tracing();
//!
//!     HttpApi::new(Hello)
//!         .with_config(LambdaConfig::from_env())
//!         .run()
//!         .await
//! }
//! ```
//!
//! ## Streaming
//!
//! ```rust,ignore
//! use cirrus_lambda::{ChannelStream, HttpStreaming, InvocationContext};
//!
//! let (stream, mut chunks) = ChannelStream::channel();
//! let api = HttpStreaming::new(Hello);
//! api.invoke(event, stream, InvocationContext::default()).await?;
//!
//! while let Some(chunk) = chunks.recv().await {
//!     // prelude, delimiter, then body chunks
//! }
//! ```
//!
//! Deployed behind a function URL, [`HttpStreaming::run`] hands each
//! response to the runtime's streaming API through a [`RuntimeStream`]:
//!
//! ```rust,ignore
//! HttpStreaming::new(Hello)
//!     .with_config(LambdaConfig::from_env())
//!     .run()
//!     .await
//! ```
//!
//! ## Deployment
//!
//! ```bash
//! cargo lambda build --release
//! cargo lambda deploy
//! ```

mod config;
mod context;
mod error;
pub mod event;
mod request;
pub mod response;
mod runtime;
pub mod streaming;
pub mod trace;

pub use config::{DEFAULT_PROFILE, LambdaConfig};
pub use context::{InvocationContext, RequestContext};
pub use error::{LambdaError, Result};
pub use event::{EventRequestContext, HttpDescription, InvocationEvent};
pub use request::{DEFAULT_REMOTE_ADDR, FromApiGateway, HeaderIter};
pub use response::{ERROR_TYPE_HEADER, ResponseDocument};
pub use runtime::{HttpApi, HttpStreaming, Routing};
pub use streaming::{BufferStream, ChannelStream, RuntimeStream, STREAM_CAPACITY, Stream, StreamingTo};
pub use trace::{TraceSink, Tracing, TracingSink, WriterSink};

// Re-export runtime types
pub use lambda_runtime;

/// Initialize tracing for Lambda/CloudWatch.
///
/// Installs structured JSON logging suitable for CloudWatch Logs, filtered
/// by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    install(filter);
}

/// Initialize tracing with a custom log level.
pub fn init_tracing_with_level(level: &str) {
    install(tracing_subscriber::EnvFilter::new(level));
}

fn install(filter: tracing_subscriber::EnvFilter) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json().flatten_event(true))
        .init();
}
