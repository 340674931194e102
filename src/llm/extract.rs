use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::card::{CardKind, CardSet, ReplyCard};

/// Models are told "no fencing" but wrap the reply in a markdown block often
/// enough that we strip one anyway. Language tag optional.
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)\A\s*```[A-Za-z0-9_-]*\s*\n?(.*?)\n?\s*```\s*\z").expect("valid fence regex")
});

/// Why a reply could not be turned into cards. The two cases are shown to the
/// user with the same generic message, but stay distinct here so diagnostics
/// can tell "not JSON" from "JSON of the wrong shape".
#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("model reply is not valid JSON")]
    Parse {
        source: serde_json::Error,
        /// The reply as received, kept for inspection. Not shown to the user.
        raw: String,
    },
    #[error("model reply is JSON but not an object with a `cards` array")]
    Schema { raw: String },
}

#[derive(Debug, Deserialize)]
struct Reply {
    cards: Vec<ReplyCard>,
}

/// Take the interior of a single enclosing code fence, or the input verbatim
/// when there is none. Surrounding whitespace is trimmed either way.
pub fn strip_code_fence(raw: &str) -> &str {
    match CODE_FENCE.captures(raw) {
        Some(captures) => captures.get(1).map_or("", |m| m.as_str()).trim(),
        None => raw.trim(),
    }
}

/// Reduce a free-text model reply to a card set.
///
/// Fence-stripping first, then a strict JSON parse, then the container check.
/// Individual cards are deliberately lenient: absent fields come back as
/// empty strings rather than failing the set.
pub fn extract_card_set(raw: &str, kind: CardKind) -> Result<CardSet, ExtractError> {
    let body = strip_code_fence(raw);

    let value: serde_json::Value =
        serde_json::from_str(body).map_err(|source| ExtractError::Parse {
            source,
            raw: raw.to_string(),
        })?;

    let reply: Reply = serde_json::from_value(value).map_err(|_| ExtractError::Schema {
        raw: raw.to_string(),
    })?;

    let cards = reply
        .cards
        .into_iter()
        .map(|card| card.into_card(kind))
        .collect();
    Ok(CardSet::new(cards))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Card;

    #[test]
    fn strips_fence_with_language_tag() {
        let raw = "```json\n{\"cards\": []}\n```";
        assert_eq!(strip_code_fence(raw), "{\"cards\": []}");
    }

    #[test]
    fn strips_fence_without_language_tag() {
        let raw = "```\n{\"cards\": []}\n```";
        assert_eq!(strip_code_fence(raw), "{\"cards\": []}");
    }

    #[test]
    fn unfenced_input_passes_through_trimmed() {
        assert_eq!(strip_code_fence("  {\"cards\": []}  \n"), "{\"cards\": []}");
    }

    #[test]
    fn fence_detection_tolerates_surrounding_whitespace() {
        let raw = "\n\n  ```json\n{\"cards\": []}\n```  \n";
        assert_eq!(strip_code_fence(raw), "{\"cards\": []}");
    }

    #[test]
    fn extracts_cards_from_fenced_reply() {
        let raw = "```json\n{\"cards\":[{\"front\":\"a\",\"back\":\"b\"}]}\n```";
        let set = extract_card_set(raw, CardKind::Basic).unwrap();
        assert_eq!(
            set.cards(),
            &[Card::Basic {
                front: "a".into(),
                back: "b".into(),
            }]
        );
        assert_eq!(set.current_index(), Some(0));
    }

    #[test]
    fn non_json_reply_is_a_parse_error() {
        let err = extract_card_set("not json at all", CardKind::Basic).unwrap_err();
        match err {
            ExtractError::Parse { raw, .. } => assert_eq!(raw, "not json at all"),
            other => panic!("expected ParseError, got {other:?}"),
        }
    }

    #[test]
    fn json_without_cards_field_is_a_schema_error() {
        let err = extract_card_set(r#"{"notcards": []}"#, CardKind::Basic).unwrap_err();
        assert!(matches!(err, ExtractError::Schema { .. }));
    }

    #[test]
    fn top_level_array_is_a_schema_error() {
        let err = extract_card_set(r#"[{"front":"a"}]"#, CardKind::Basic).unwrap_err();
        assert!(matches!(err, ExtractError::Schema { .. }));
    }

    #[test]
    fn cloze_cards_keep_their_deletion_markers() {
        let raw = r#"{"cards":[{"text":"Water boils at {{c1::100}} degrees."}]}"#;
        let set = extract_card_set(raw, CardKind::Cloze).unwrap();
        assert_eq!(
            set.cards(),
            &[Card::Cloze {
                text: "Water boils at {{c1::100}} degrees.".into(),
            }]
        );
    }

    #[test]
    fn cards_with_missing_fields_become_empty_strings() {
        let raw = r#"{"cards":[{"front":"q"},{}]}"#;
        let set = extract_card_set(raw, CardKind::Basic).unwrap();
        assert_eq!(
            set.cards(),
            &[
                Card::Basic {
                    front: "q".into(),
                    back: String::new(),
                },
                Card::Basic {
                    front: String::new(),
                    back: String::new(),
                },
            ]
        );
    }
}
