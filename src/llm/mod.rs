pub mod client;
pub mod extract;
pub mod generate;
pub mod prompt;
pub mod response;
pub mod secrets;

pub use client::{ensure_client, test_configured_api_key};
pub use extract::{ExtractError, extract_card_set};
pub use generate::request_cards;
pub use prompt::{CountPolicy, GenerationRequest, build_prompt};
pub use secrets::{clear_api_key, store_api_key};
