use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use async_openai::{Client, config::OpenAIConfig};
use crossterm::{
    event::{
        self, Event, KeyCode, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
        PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};
use tokio::task::JoinHandle;

use crate::card::{Card, CardKind, CardSet};
use crate::export::{ExportFormat, export_cards, export_file_name};
use crate::llm::prompt::{CountPolicy, GenerationRequest};
use crate::llm::{ensure_client, request_cards};
use crate::render::render_card_text;
use crate::settings::load_settings;
use crate::tui::Theme;
use crate::utils::pluralize;

const FLASH_SECS: f64 = 2.5;

pub struct GenerateOptions {
    pub path: Option<PathBuf>,
    pub kind: CardKind,
    pub count: CountPolicy,
    pub topic: Option<String>,
    pub output: Option<PathBuf>,
    pub format: ExportFormat,
    pub plain: bool,
}

pub async fn run(options: GenerateOptions) -> Result<()> {
    let source_text = read_source_text(options.path.as_deref())?;
    if source_text.trim().is_empty() {
        bail!("Source material is empty; nothing to generate cards from.");
    }

    let settings = load_settings()?;
    let client = ensure_client("cardforge needs an OpenAI API key to generate flashcards.")?;

    let request = GenerationRequest {
        source_text,
        kind: options.kind,
        count: options.count,
        revision: None,
        temperature: settings.effective_temperature(),
    };

    let card_set = request_cards(&client, &request).await?;

    if options.plain {
        let path = export_destination(&options);
        write_export(card_set.cards(), options.kind, options.format, &path)?;
        println!(
            "Wrote {} to {}",
            pluralize("card", card_set.len()),
            path.display()
        );
        return Ok(());
    }

    start_review_session(client, request, card_set, options).await
}

fn read_source_text(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("Failed to read source material from {}", path.display())),
        None => io::read_to_string(io::stdin()).context("Failed to read source material from stdin"),
    }
}

fn export_destination(options: &GenerateOptions) -> PathBuf {
    options.output.clone().unwrap_or_else(|| {
        PathBuf::from(export_file_name(options.topic.as_deref(), options.format))
    })
}

fn write_export(cards: &[Card], kind: CardKind, format: ExportFormat, path: &Path) -> Result<()> {
    let document = export_cards(cards, kind, format)?;
    fs::write(path, document)
        .with_context(|| format!("Failed to write export to {}", path.display()))?;
    Ok(())
}

enum Mode {
    Review,
    EditingRevision,
    Generating,
}

struct StatusFlash {
    message: String,
    shown_at: Instant,
    is_error: bool,
}

struct ReviewState {
    set: CardSet,
    kind: CardKind,
    reveal: bool,
    mode: Mode,
    revision_input: String,
    pending_revision: Option<String>,
    status: Option<StatusFlash>,
    last_export: Option<PathBuf>,
}

impl ReviewState {
    fn new(set: CardSet, kind: CardKind) -> Self {
        Self {
            set,
            kind,
            reveal: false,
            mode: Mode::Review,
            revision_input: String::new(),
            pending_revision: None,
            status: None,
            last_export: None,
        }
    }

    fn next_card(&mut self) {
        self.set.next();
        self.reveal = false;
    }

    fn prev_card(&mut self) {
        self.set.prev();
        self.reveal = false;
    }

    /// Discard the whole set along with any steering text typed so far.
    fn restart(&mut self) {
        self.set.clear();
        self.reveal = false;
        self.revision_input.clear();
        self.pending_revision = None;
    }

    fn apply_generation(&mut self, result: Result<CardSet>) {
        match result {
            Ok(set) => {
                self.set.replace(set.cards().to_vec());
                self.reveal = false;
                self.pending_revision = None;
                self.flash(
                    format!("Generated {}.", pluralize("card", self.set.len())),
                    false,
                );
            }
            Err(err) => {
                let flat = err
                    .chain()
                    .map(|cause| cause.to_string().replace('\n', " "))
                    .collect::<Vec<_>>()
                    .join(": ");
                self.flash(format!("Generation failed: {flat}"), true);
            }
        }
        self.mode = Mode::Review;
    }

    fn flash(&mut self, message: String, is_error: bool) {
        self.status = Some(StatusFlash {
            message,
            shown_at: Instant::now(),
            is_error,
        });
    }
}

async fn start_review_session(
    client: Client<OpenAIConfig>,
    request: GenerationRequest,
    card_set: CardSet,
    options: GenerateOptions,
) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(
        stdout,
        EnterAlternateScreen,
        PushKeyboardEnhancementFlags(
            KeyboardEnhancementFlags::REPORT_ALL_KEYS_AS_ESCAPE_CODES
                | KeyboardEnhancementFlags::DISAMBIGUATE_ESCAPE_CODES
        )
    )
    .context("failed to configure terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to start terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let mut state = ReviewState::new(card_set, options.kind);
    let mut base_request = request;
    let mut generation_handle: Option<JoinHandle<Result<CardSet>>> = None;

    let loop_result: Result<()> = async {
        loop {
            if let Some(handle) = &mut generation_handle
                && handle.is_finished()
            {
                let result = handle
                    .await
                    .unwrap_or_else(|err| Err(anyhow::anyhow!("generation task failed: {err}")));
                // Applied unconditionally: whatever happened at the keyboard
                // since dispatch, the reply (or its error) lands now.
                state.apply_generation(result);
                generation_handle = None;
            }

            terminal
                .draw(|frame| {
                    let area = frame.area();
                    frame.render_widget(Theme::backdrop(), area);
                    let chunks = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([Constraint::Min(5), Constraint::Length(6)])
                        .split(area);

                    let header_line = Line::from(header_spans(&state));
                    let body = body_text(&state);
                    let card_widget = Paragraph::new(body)
                        .block(Theme::panel_with_line(header_line))
                        .wrap(Wrap { trim: false });
                    frame.render_widget(card_widget, chunks[0]);

                    let footer = Paragraph::new(instructions_text(&state))
                        .block(Theme::panel_with_line(Theme::section_header("Controls")))
                        .wrap(Wrap { trim: true });
                    frame.render_widget(footer, chunks[1]);
                })
                .context("failed to render frame")?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
            {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if key.code == KeyCode::Esc && matches!(state.mode, Mode::EditingRevision) {
                    state.revision_input.clear();
                    state.mode = Mode::Review;
                    continue;
                }
                if key.code == KeyCode::Esc
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    break Ok(());
                }

                match state.mode {
                    Mode::EditingRevision => match key.code {
                        KeyCode::Enter => {
                            let instruction = state.revision_input.trim().to_string();
                            state.revision_input.clear();
                            if instruction.is_empty() {
                                state.mode = Mode::Review;
                                continue;
                            }
                            state.pending_revision = Some(instruction.clone());
                            base_request.revision = Some(instruction);
                            state.mode = Mode::Generating;
                            generation_handle =
                                Some(spawn_generation(client.clone(), base_request.clone()));
                        }
                        KeyCode::Backspace => {
                            state.revision_input.pop();
                        }
                        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                            state.revision_input.push(c);
                        }
                        _ => {}
                    },
                    Mode::Generating => match key.code {
                        // Only navigation while a request is in flight; the
                        // generate/revise triggers stay disabled.
                        KeyCode::Left | KeyCode::Char('h') => state.prev_card(),
                        KeyCode::Right | KeyCode::Char('l') => state.next_card(),
                        KeyCode::Char(' ') | KeyCode::Enter => state.reveal = !state.reveal,
                        _ => {}
                    },
                    Mode::Review => match key.code {
                        KeyCode::Left | KeyCode::Char('h') => state.prev_card(),
                        KeyCode::Right | KeyCode::Char('l') => state.next_card(),
                        KeyCode::Char(' ') | KeyCode::Enter => state.reveal = !state.reveal,
                        KeyCode::Char('r') => {
                            state.mode = Mode::EditingRevision;
                        }
                        KeyCode::Char('g') => {
                            base_request.revision = state.pending_revision.clone();
                            state.mode = Mode::Generating;
                            generation_handle =
                                Some(spawn_generation(client.clone(), base_request.clone()));
                        }
                        KeyCode::Char('n') => {
                            base_request.revision = None;
                            state.restart();
                            state.flash("Cleared the card set.".to_string(), false);
                        }
                        KeyCode::Char('e') if !state.set.is_empty() => {
                            let path = export_destination(&options);
                            match write_export(
                                state.set.cards(),
                                state.kind,
                                options.format,
                                &path,
                            ) {
                                Ok(()) => {
                                    state.flash(format!("Exported to {}", path.display()), false);
                                    state.last_export = Some(path);
                                }
                                Err(err) => {
                                    state.flash(format!("Export failed: {err}"), true);
                                }
                            }
                        }
                        KeyCode::Char('o') => {
                            if let Some(path) = &state.last_export
                                && let Err(err) = open::that(path)
                            {
                                state.flash(format!("Couldn't open export: {err}"), true);
                            }
                        }
                        _ => {}
                    },
                }
            }
        }
    }
    .await;

    teardown_terminal(&mut terminal)?;

    loop_result
}

fn spawn_generation(
    client: Client<OpenAIConfig>,
    request: GenerationRequest,
) -> JoinHandle<Result<CardSet>> {
    tokio::spawn(async move { request_cards(&client, &request).await })
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(
        terminal.backend_mut(),
        PopKeyboardEnhancementFlags,
        LeaveAlternateScreen
    )
    .context("failed to restore terminal")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn header_spans(state: &ReviewState) -> Vec<Span<'static>> {
    let mut spans = vec![Theme::label_span(match state.set.current_index() {
        Some(idx) => format!("Card {}/{}", idx + 1, state.set.len()),
        None => "No cards".to_string(),
    })];
    spans.push(Theme::bullet());
    spans.push(Theme::span(format!("{} deck", state.kind.label())));
    if state.pending_revision.is_some() {
        spans.push(Theme::bullet());
        spans.push(Theme::key_chip("revised"));
    }
    spans
}

fn body_text(state: &ReviewState) -> Text<'static> {
    if matches!(state.mode, Mode::EditingRevision) {
        return Text::from(vec![
            Line::from(Theme::span("Describe how the cards should change:")),
            Line::default(),
            Line::from(vec![
                Theme::span("> "),
                Span::styled(state.revision_input.clone(), Theme::emphasis()),
                Span::styled("█", Theme::label()),
            ]),
        ]);
    }

    if matches!(state.mode, Mode::Generating) && state.set.is_empty() {
        return Text::from("Generating cards...\n\nPlease wait.");
    }

    match state.set.current_card() {
        Some(card) => card_text(card, state.reveal),
        None => Text::from("No cards. Press g to generate a fresh set, or Esc to quit."),
    }
}

fn card_text(card: &Card, reveal: bool) -> Text<'static> {
    match card {
        Card::Basic { front, back } => {
            let mut text = render_card_text(front, reveal);
            text.lines.push(Line::default());
            text.lines.push(Line::from(Theme::label_span("Answer")));
            if reveal {
                text.lines.extend(render_card_text(back, reveal).lines);
            }
            text
        }
        Card::Cloze { text } => render_card_text(text, reveal),
    }
}

fn instructions_text(state: &ReviewState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    match state.mode {
        Mode::EditingRevision => {
            lines.push(Line::from(vec![
                Theme::key_chip("Enter"),
                Theme::span(" regenerate with this instruction"),
                Theme::bullet(),
                Theme::key_chip("Esc"),
                Theme::span(" cancel"),
            ]));
        }
        Mode::Generating => {
            lines.push(Line::from(vec![
                Theme::span("Generating..."),
                Theme::bullet(),
                Theme::key_chip("←"),
                Theme::span(" / "),
                Theme::key_chip("→"),
                Theme::span(" browse current cards"),
            ]));
        }
        Mode::Review => {
            lines.push(Line::from(vec![
                Theme::key_chip("←"),
                Theme::span(" / "),
                Theme::key_chip("→"),
                Theme::span(" page"),
                Theme::bullet(),
                Theme::key_chip("Space"),
                Theme::span(" reveal"),
                Theme::bullet(),
                Theme::key_chip("r"),
                Theme::span(" revise"),
                Theme::bullet(),
                Theme::key_chip("g"),
                Theme::span(" regenerate"),
            ]));
            lines.push(Line::from(vec![
                Theme::key_chip("e"),
                Theme::span(" export"),
                Theme::bullet(),
                Theme::key_chip("o"),
                Theme::span(" open export"),
                Theme::bullet(),
                Theme::key_chip("n"),
                Theme::span(" start over"),
                Theme::bullet(),
                Theme::key_chip("Esc"),
                Theme::span(" exit"),
            ]));
        }
    }

    if let Some(status) = &state.status
        && status.shown_at.elapsed().as_secs_f64() < FLASH_SECS
    {
        let style = if status.is_error {
            Theme::danger()
        } else {
            Theme::success()
        };
        lines.push(Line::from(vec![Span::styled(
            status.message.clone(),
            style,
        )]));
    }

    lines
}
