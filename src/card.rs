use clap::ValueEnum;
use serde::Deserialize;

/// Which card schema the model is asked to produce. Selects both the prompt
/// template and the export header.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum CardKind {
    Basic,
    Cloze,
}

impl CardKind {
    pub fn label(self) -> &'static str {
        match self {
            CardKind::Basic => "basic",
            CardKind::Cloze => "cloze",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Card {
    /// Front/back pair. Either side may carry the restricted inline markup
    /// subset (`<b>`, `<i>`).
    Basic { front: String, back: String },
    /// Single text body with one or more `{{cN::...}}` deletion markers.
    Cloze { text: String },
}

/// Raw card object as it appears in the model's JSON reply. Fields the model
/// omits deserialize to empty strings rather than failing the whole set.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReplyCard {
    #[serde(default)]
    pub front: String,
    #[serde(default)]
    pub back: String,
    #[serde(default)]
    pub text: String,
}

impl ReplyCard {
    pub fn into_card(self, kind: CardKind) -> Card {
        match kind {
            CardKind::Basic => Card::Basic {
                front: self.front,
                back: self.back,
            },
            CardKind::Cloze => Card::Cloze { text: self.text },
        }
    }
}

/// An ordered card set with a cursor over the currently displayed card.
///
/// The set is replaced wholesale on every successful generation and discarded
/// entirely on restart; cards are never appended or edited individually.
#[derive(Clone, Debug, Default)]
pub struct CardSet {
    cards: Vec<Card>,
    current: Option<usize>,
}

impl CardSet {
    pub fn new(cards: Vec<Card>) -> Self {
        let current = if cards.is_empty() { None } else { Some(0) };
        Self { cards, current }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn current_card(&self) -> Option<&Card> {
        self.current.and_then(|idx| self.cards.get(idx))
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Advance the cursor. Stays put on the last card.
    pub fn next(&mut self) {
        if let Some(idx) = self.current
            && idx + 1 < self.cards.len()
        {
            self.current = Some(idx + 1);
        }
    }

    /// Move the cursor back. Stays put on the first card.
    pub fn prev(&mut self) {
        if let Some(idx) = self.current
            && idx > 0
        {
            self.current = Some(idx - 1);
        }
    }

    /// Replace the whole set; the cursor restarts at the first card.
    pub fn replace(&mut self, cards: Vec<Card>) {
        *self = CardSet::new(cards);
    }

    /// Drop everything and leave the cursor undefined.
    pub fn clear(&mut self) {
        self.cards.clear();
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(front: &str, back: &str) -> Card {
        Card::Basic {
            front: front.into(),
            back: back.into(),
        }
    }

    fn set_of(n: usize) -> CardSet {
        CardSet::new((0..n).map(|i| basic(&format!("q{i}"), "a")).collect())
    }

    #[test]
    fn empty_set_has_no_cursor() {
        let set = CardSet::new(vec![]);
        assert!(set.is_empty());
        assert_eq!(set.current_index(), None);
        assert!(set.current_card().is_none());
    }

    #[test]
    fn next_is_clamped_at_last_card() {
        let mut set = set_of(5);
        for _ in 0..10 {
            set.next();
        }
        assert_eq!(set.current_index(), Some(4));
        set.next();
        assert_eq!(set.current_index(), Some(4));
    }

    #[test]
    fn prev_is_clamped_at_first_card() {
        let mut set = set_of(5);
        set.prev();
        assert_eq!(set.current_index(), Some(0));
        set.next();
        set.prev();
        set.prev();
        assert_eq!(set.current_index(), Some(0));
    }

    #[test]
    fn replace_resets_cursor_to_first_card() {
        let mut set = set_of(3);
        set.next();
        set.next();
        set.replace(vec![basic("new", "card")]);
        assert_eq!(set.len(), 1);
        assert_eq!(set.current_index(), Some(0));
    }

    #[test]
    fn clear_empties_set_and_cursor() {
        let mut set = set_of(3);
        set.next();
        set.clear();
        assert!(set.is_empty());
        assert_eq!(set.current_index(), None);
    }

    #[test]
    fn reply_card_missing_fields_default_to_empty() {
        let parsed: ReplyCard = serde_json::from_str(r#"{"front":"only front"}"#).unwrap();
        assert_eq!(
            parsed.into_card(CardKind::Basic),
            Card::Basic {
                front: "only front".into(),
                back: String::new(),
            }
        );

        let parsed: ReplyCard = serde_json::from_str("{}").unwrap();
        assert_eq!(
            parsed.into_card(CardKind::Cloze),
            Card::Cloze {
                text: String::new()
            }
        );
    }
}
