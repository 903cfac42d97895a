//! wicket-provider: LLM provider abstraction and implementations.

mod error;
pub mod providers;
mod traits;
mod types;

pub use error::ProviderError;
pub use providers::{OpenAiCompatConfig, OpenAiCompatProvider};
pub use traits::Provider;
pub use types::ProviderMessage;
