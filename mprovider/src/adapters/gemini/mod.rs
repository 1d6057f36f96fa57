mod auth;
mod provider;
mod serde_api;
mod transport;

pub use auth::GeminiAuth;
pub use provider::GeminiProvider;
pub use serde_api::{
    GeminiCandidate, GeminiCandidateContent, GeminiCandidatePart, GeminiContent,
    GeminiCountTokensRequest, GeminiCountTokensResponse, GeminiGenerateRequest,
    GeminiGenerateResponse, GeminiGenerationConfig, GeminiModelInfo, GeminiPart,
    GeminiPromptFeedback, GeminiUsageMetadata,
};
pub use transport::{GeminiChunkStream, GeminiHttpTransport, GeminiTransport};
