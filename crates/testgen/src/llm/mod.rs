//! Model Dispatcher: send one prompt to one inference backend.

mod http;

pub use http::HttpBackend;

use futures::future::BoxFuture;

/// Environment variable that carries the backend API key.
pub const API_KEY_VARIABLE: &str = "LLM_API_KEY";

/// Failure of a single model call.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("{backend} server not reachable. Ensure {backend} is running and model '{model}' is available. Error: {detail}")]
    BackendUnreachable {
        backend: &'static str,
        model: String,
        detail: String,
    },

    #[error("{backend} returned an empty response for model '{model}'.")]
    EmptyResponse { backend: &'static str, model: String },

    #[error("The {backend} backend requires an API key. Set {variable}.")]
    MissingCredential {
        backend: &'static str,
        variable: &'static str,
    },

    #[error("An unexpected error occurred during AI generation ({backend}): {detail}")]
    UnexpectedBackendError {
        backend: &'static str,
        detail: String,
    },
}

/// Something that can turn a prompt into text.
///
/// The HTTP implementation covers every configured provider; tests plug in
/// canned backends.
pub trait ModelBackend: Send + Sync {
    /// Short backend name used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Send `prompt` to `model` once and return the trimmed, non-empty text.
    fn send<'a>(
        &'a self,
        prompt: &'a str,
        model: &'a str,
    ) -> BoxFuture<'a, Result<String, DispatchError>>;
}
