pub mod card;
pub mod commands;
pub mod export;
pub mod llm;
pub mod palette;
pub mod render;
pub mod settings;
pub mod tui;
pub mod utils;
