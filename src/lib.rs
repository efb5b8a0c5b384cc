// Cirrus - serverless HTTP invocation adapter
//
// Turns API gateway invocation events into requests for an HTTP-processing
// layer and hands its responses back, buffered or streamed.

// Re-export core functionality
pub use cirrus_core::*;

// Re-export adapters
#[cfg(feature = "lambda")]
pub use cirrus_lambda;

// Prelude for common imports
pub mod prelude {
    pub use crate::{Cookie, Headers, HttpError, HttpStatus, Input, Output, Request, Response};

    #[cfg(feature = "lambda")]
    pub use cirrus_lambda::{
        HttpApi, HttpStreaming, InvocationContext, InvocationEvent, LambdaConfig, RequestContext,
        ResponseDocument, Routing, StreamingTo, Tracing,
    };

    pub use async_trait::async_trait;
}
