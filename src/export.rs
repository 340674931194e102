use anyhow::{Context, Result};
use clap::ValueEnum;
use csv::{QuoteStyle, WriterBuilder};

use crate::card::{Card, CardKind};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Csv,
    Tsv,
}

impl ExportFormat {
    fn delimiter(self) -> u8 {
        match self {
            ExportFormat::Csv => b',',
            ExportFormat::Tsv => b'\t',
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Tsv => "tsv",
        }
    }
}

const DEFAULT_FILE_STEM: &str = "flashcards";

/// Serialize a card set for import into a spaced-repetition app.
///
/// Header row matches the card kind (`front,back` or `text`); every data
/// field is quoted, with embedded quotes and newlines escaped by standard
/// double-quote doubling.
pub fn export_cards(cards: &[Card], kind: CardKind, format: ExportFormat) -> Result<String> {
    let delimiter = format.delimiter();
    let header = match kind {
        CardKind::Basic => format!("front{}back\n", delimiter as char),
        CardKind::Cloze => "text\n".to_string(),
    };

    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .quote_style(QuoteStyle::Always)
        .from_writer(Vec::new());

    for card in cards {
        match card {
            Card::Basic { front, back } => writer.write_record([front, back])?,
            Card::Cloze { text } => writer.write_record([text])?,
        }
    }

    let body = writer.into_inner().context("Failed to flush export buffer")?;
    let body = String::from_utf8(body).context("Export produced invalid UTF-8")?;
    Ok(format!("{header}{body}"))
}

/// File name for the export: the user's topic with whitespace collapsed to
/// hyphens, or a fixed default when no topic was given.
pub fn export_file_name(topic: Option<&str>, format: ExportFormat) -> String {
    let stem = topic
        .map(|value| value.split_whitespace().collect::<Vec<_>>().join("-"))
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| DEFAULT_FILE_STEM.to_string());
    format!("{stem}.{}", format.extension())
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

    #[test]
    fn basic_csv_has_header_and_quoted_rows() {
        let cards = vec![basic("What is the capital of France?", "Paris")];
        let csv = export_cards(&cards, CardKind::Basic, ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "front,back\n\"What is the capital of France?\",\"Paris\"\n"
        );
    }

    #[test]
    fn cloze_csv_uses_text_header() {
        let cards = vec![Card::Cloze {
            text: "Water boils at {{c1::100}} degrees.".into(),
        }];
        let csv = export_cards(&cards, CardKind::Cloze, ExportFormat::Csv).unwrap();
        assert_eq!(csv, "text\n\"Water boils at {{c1::100}} degrees.\"\n");
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let cards = vec![basic("Who said \"veni, vidi, vici\"?", "Caesar")];
        let csv = export_cards(&cards, CardKind::Basic, ExportFormat::Csv).unwrap();
        assert_eq!(
            csv,
            "front,back\n\"Who said \"\"veni, vidi, vici\"\"?\",\"Caesar\"\n"
        );
    }

    #[test]
    fn embedded_newlines_stay_inside_the_quoted_field() {
        let cards = vec![basic("line one\nline two", "answer")];
        let csv = export_cards(&cards, CardKind::Basic, ExportFormat::Csv).unwrap();
        assert_eq!(csv, "front,back\n\"line one\nline two\",\"answer\"\n");
    }

    #[test]
    fn tsv_uses_tab_delimiter() {
        let cards = vec![basic("q", "a")];
        let tsv = export_cards(&cards, CardKind::Basic, ExportFormat::Tsv).unwrap();
        assert_eq!(tsv, "front\tback\n\"q\"\t\"a\"\n");
    }

    #[test]
    fn empty_set_exports_header_only() {
        let csv = export_cards(&[], CardKind::Basic, ExportFormat::Csv).unwrap();
        assert_eq!(csv, "front,back\n");
    }

    #[test]
    fn file_name_slugs_topic_whitespace() {
        assert_eq!(
            export_file_name(Some("French  Revolution \t dates"), ExportFormat::Csv),
            "French-Revolution-dates.csv"
        );
        assert_eq!(
            export_file_name(None, ExportFormat::Csv),
            "flashcards.csv"
        );
        assert_eq!(
            export_file_name(Some("   "), ExportFormat::Tsv),
            "flashcards.tsv"
        );
    }
}
