use crate::card::CardKind;

/// Everything needed to generate one card set. Built fresh per user action;
/// the temperature is whatever the settings held at that moment.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationRequest {
    pub source_text: String,
    pub kind: CardKind,
    pub count: CountPolicy,
    pub revision: Option<String>,
    pub temperature: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CountPolicy {
    /// Ask for exactly this many cards (1..=50, enforced at the CLI edge).
    Fixed(u32),
    /// Let the model pick a count from the density of the material.
    Automatic,
}

const ROLE_STATEMENT: &str =
    "You are an experienced author of educational flashcards. You turn study \
     material into cards that are easy to review one fact at a time.";

const BASIC_SCHEMA_EXAMPLE: &str = r#"{"cards": [{"front": "question text", "back": "answer text"}]}"#;

const CLOZE_SCHEMA_EXAMPLE: &str = r#"{"cards": [{"text": "sentence with {{c1::hidden part}}"}]}"#;

const BASIC_QUALITY_RULES: &str = "\
- Each card covers exactly one concept.
- Do not produce two cards covering the same fact.
- Write the cards in the same language as the source material.
- The only markup allowed is <b> and <i>, and use it sparingly.";

const CLOZE_QUALITY_RULES: &str = "\
- Each card covers exactly one concept.
- Do not produce two cards covering the same fact.
- Write the cards in the same language as the source material.
- The only markup allowed is <b> and <i>, and use it sparingly.
- Mark deletions with {{c1::...}} syntax; use {{c2::...}}, {{c3::...}} for \
further deletions in the same card. A deletion may carry a hint in \
parentheses, e.g. {{c1::Paris (city)}}.";

/// Render the full instruction block for a request.
///
/// Pure: identical requests always produce byte-identical prompts. The
/// revision block comes before the quality rules so a user's steering wins
/// over the defaults, and the source material comes last so nothing inside
/// it reads like an instruction.
pub fn build_prompt(request: &GenerationRequest) -> String {
    let schema_example = match request.kind {
        CardKind::Basic => BASIC_SCHEMA_EXAMPLE,
        CardKind::Cloze => CLOZE_SCHEMA_EXAMPLE,
    };
    let quality_rules = match request.kind {
        CardKind::Basic => BASIC_QUALITY_RULES,
        CardKind::Cloze => CLOZE_QUALITY_RULES,
    };
    let count_instruction = match request.count {
        CountPolicy::Fixed(n) => format!(
            "Produce exactly {}.",
            crate::utils::pluralize("card", n as usize)
        ),
        CountPolicy::Automatic => {
            "Choose the most appropriate number of cards for the density of the \
             content, typically between 3 and 20."
                .to_string()
        }
    };

    let mut prompt = String::new();
    prompt.push_str(ROLE_STATEMENT);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "Respond with exactly one JSON object of the shape {schema_example}, \
         with no surrounding prose and no code fencing.\n\n"
    ));
    prompt.push_str(&count_instruction);
    prompt.push_str("\n\n");
    if let Some(revision) = &request.revision {
        prompt.push_str(&format!(
            "Apply the following modification to the previous output:\n{revision}\n\n"
        ));
    }
    prompt.push_str("Rules:\n");
    prompt.push_str(quality_rules);
    prompt.push_str("\n\n");
    prompt.push_str(&format!(
        "This is the source material, between the dashed lines:\n\
         ----------\n{}\n----------\n",
        request.source_text
    ));

    prompt
}
