use anyhow::{Context, Result};
use async_openai::{Client, config::OpenAIConfig};

use super::extract::extract_card_set;
use super::prompt::{GenerationRequest, build_prompt};
use super::response::request_single_text_response;
use crate::card::CardSet;

const GENERATION_MODEL: &str = "gpt-5-mini";

/// The full request pipeline: render the prompt, make one model call, and
/// normalize the reply into a card set.
///
/// A parse or schema failure surfaces to the user as one generic message;
/// the typed cause (with the raw reply) rides along in the error chain.
pub async fn request_cards(
    client: &Client<OpenAIConfig>,
    request: &GenerationRequest,
) -> Result<CardSet> {
    let prompt = build_prompt(request);
    let raw_reply =
        request_single_text_response(client, GENERATION_MODEL, request.temperature, &prompt)
            .await?;

    let card_set = extract_card_set(&raw_reply, request.kind)
        .context("The model's reply couldn't be read as flashcards. Try generating again.")?;
    Ok(card_set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::{Card, CardKind};
    use crate::export::{ExportFormat, export_cards};
    use crate::llm::prompt::CountPolicy;

    // End-to-end minus the network: the reply below stands in for the model.
    #[test]
    fn stubbed_reply_flows_through_prompt_extract_and_export() {
        let request = GenerationRequest {
            source_text: "Paris is the capital of France.".into(),
            kind: CardKind::Basic,
            count: CountPolicy::Fixed(1),
            revision: None,
            temperature: 0.3,
        };

        let prompt = build_prompt(&request);
        assert!(prompt.contains("Produce exactly 1 card."));
        assert!(prompt.contains("Paris is the capital of France."));

        let stub_reply = "```json\n{\"cards\":[{\"front\":\"What is the capital of France?\",\"back\":\"Paris\"}]}\n```";
        let set = extract_card_set(stub_reply, request.kind).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.current_index(), Some(0));
        assert_eq!(
            set.current_card(),
            Some(&Card::Basic {
                front: "What is the capital of France?".into(),
                back: "Paris".into(),
            })
        );

        let csv = export_cards(set.cards(), request.kind, ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "front,back\n\"What is the capital of France?\",\"Paris\"\n"
        );
    }
}
