mod chat;
mod mock;
mod traits;

pub use chat::{ChatCompletionsClient, ChatConfig, DEFAULT_BASE_URL};
pub use mock::{MockClient, MockReply};
pub use traits::{CompletionRequest, ModelClient, ModelError, ResponseFormat};
