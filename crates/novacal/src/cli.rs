//! CLI (Command Line Interface) mode
//!
//! Interactive REPL over one assistant session, plus the one-shot execute
//! mode.

use std::borrow::Cow;
use std::sync::Arc;

use chrono::Local;
use nu_ansi_term::{Color, Style};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use tracing::info;

use novacal_calendar::{CalendarToolkit, EMPTY_VIEW_MESSAGE};
use novacal_core::session::NOTICE_MISSING_KEY;
use novacal_core::{AgentFactory, ChatRole, Session, TraceStep};

/// Available commands for autocomplete display
const COMMANDS: &[(&str, &str)] = &[
    ("/help", "Show this help"),
    ("/clear", "Clear the screen, keep the AI context"),
    ("/reset", "Full reset: wipe transcript, memory and agent"),
    ("/key", "Set the model API key: /key <value>"),
    ("/agenda", "Show today's schedule"),
    ("/calendar", "List every event on the calendar"),
    ("/history", "Show the transcript"),
    ("/exit", "Quit"),
];

/// A parsed slash command
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Help,
    Clear,
    Reset,
    Key(Option<String>),
    Agenda,
    Calendar,
    History,
    Exit,
    Unknown(String),
}

/// `None` when `input` is a chat message
fn parse_command(input: &str) -> Option<Command> {
    if !input.starts_with('/') {
        return None;
    }

    let (name, rest) = match input.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (input, ""),
    };

    Some(match name.to_lowercase().as_str() {
        "/help" | "/?" => Command::Help,
        "/clear" => Command::Clear,
        "/reset" => Command::Reset,
        "/key" => Command::Key((!rest.is_empty()).then(|| rest.to_string())),
        "/agenda" => Command::Agenda,
        "/calendar" => Command::Calendar,
        "/history" => Command::History,
        "/exit" | "/quit" | "/q" => Command::Exit,
        _ => Command::Unknown(input.to_string()),
    })
}

/// Command completer for reedline
#[derive(Clone)]
pub struct CommandCompleter {
    commands: Vec<(&'static str, &'static str)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        Self {
            commands: COMMANDS.to_vec(),
        }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        if !line.starts_with('/') {
            return Vec::new();
        }

        self.commands
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(line))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.to_string(),
                description: Some(desc.to_string()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt showing whether the AI engine is online
struct SessionPrompt {
    online: bool,
}

impl Prompt for SessionPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        let style = if self.online {
            Color::Cyan.bold()
        } else {
            Color::DarkGray.bold()
        };
        Cow::Owned(style.paint("📅 > ").to_string())
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

/// Prints each tool call and observation as the turn runs
fn print_trace(step: &TraceStep) {
    match step {
        TraceStep::ToolCall { tool, input } => {
            let input = serde_json::to_string(input).unwrap_or_default();
            println!(
                "{} {} {}",
                Color::Yellow.paint("⚙️  calling"),
                Color::Yellow.bold().paint(tool),
                Style::new().dimmed().paint(input)
            );
        }
        TraceStep::Observation {
            tool,
            output,
            is_error,
        } => {
            let label = if *is_error {
                Color::Red.paint(format!("✗ {}", tool))
            } else {
                Color::Green.paint(format!("✓ {}", tool))
            };
            println!("{}", label);
            for line in output.lines() {
                println!("    {}", Style::new().dimmed().paint(line));
            }
        }
    }
}

/// Interactive state
struct Repl {
    session: Session,
    factory: Arc<dyn AgentFactory>,
    toolkit: Arc<CalendarToolkit>,
}

impl Repl {
    /// Run one chat turn and print the answer or the failure
    async fn chat(&mut self, input: &str) {
        if let Err(failure) = self.session.ensure_ready(self.factory.as_ref()) {
            eprintln!("\n{}\n", Color::Red.paint(failure.user_message()));
            return;
        }

        println!();
        match self.session.submit(input, &print_trace).await {
            Ok(outcome) => println!("\n{}\n", outcome.answer),
            Err(e) => eprintln!("\n{}\n", Color::Red.paint(e.to_string())),
        }
    }

    /// Returns false when the REPL should stop
    async fn command(&mut self, command: Command) -> bool {
        match command {
            Command::Exit => return false,
            Command::Help => print_help(),
            Command::Clear => {
                let notice = self.session.clear_screen();
                print!("\x1B[2J\x1B[1;1H");
                println!("\n✅ {}\n", notice);
            }
            Command::Reset => println!("\n✅ {}\n", self.session.full_reset()),
            Command::Key(Some(key)) => println!("\n🔑 {}\n", self.session.set_api_key(key)),
            Command::Key(None) => eprintln!("\nUsage: /key <value>\n"),
            Command::Agenda => self.print_agenda().await,
            Command::Calendar => self.print_calendar().await,
            Command::History => print_history(&self.session),
            Command::Unknown(input) => eprintln!(
                "\n❓ Unknown command: {}. Type /help for the command list.\n",
                input
            ),
        }
        true
    }

    async fn print_agenda(&self) {
        let today = Local::now().format("%Y-%m-%d").to_string();
        let summary = self
            .toolkit
            .lookup()
            .range_summary(&today, &today, None)
            .await;
        println!("\n{}", Color::Cyan.bold().paint("📅 Today's Agenda"));
        println!("{}\n", summary.trim_end());
    }

    async fn print_calendar(&self) {
        match self.toolkit.view().events().await {
            Err(message) => eprintln!("\n{}\n", Color::Red.paint(message)),
            Ok(events) if events.is_empty() => println!("\n{}\n", EMPTY_VIEW_MESSAGE),
            Ok(events) => {
                println!();
                for event in &events {
                    println!("  {} → {}  {}", event.start, event.end, event.title);
                }
                println!("\n{} event(s)\n", events.len());
            }
        }
    }
}

/// Run CLI interactive mode
pub async fn run_cli(
    session: Session,
    factory: Arc<dyn AgentFactory>,
    toolkit: Arc<CalendarToolkit>,
) -> anyhow::Result<()> {
    let mut repl = Repl {
        session,
        factory,
        toolkit,
    };

    print_welcome();
    repl.print_agenda().await;
    if !repl.session.has_api_key() {
        println!("{}\n", Color::Yellow.paint(format!("⚠️  {} Use /key <value>.", NOTICE_MISSING_KEY)));
    }

    let mut keybindings = default_keybindings();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(50))
            .with_only_buffer_difference(false),
    );
    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    info!("CLI session {} started", repl.session.id());

    loop {
        let prompt = SessionPrompt {
            online: repl.session.has_llm(),
        };

        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => {
                let input = line.trim();
                if input.is_empty() {
                    continue;
                }

                match parse_command(input) {
                    Some(command) => {
                        if !repl.command(command).await {
                            break;
                        }
                    }
                    None => repl.chat(input).await,
                }
            }
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => break,
            Err(err) => {
                eprintln!("\n❌ Error: {}\n", err);
                break;
            }
        }
    }

    println!("\n👋 Goodbye!\n");
    Ok(())
}

/// Run a single request and print the answer
pub async fn run_execute(
    mut session: Session,
    factory: Arc<dyn AgentFactory>,
    prompt: &str,
) -> anyhow::Result<()> {
    let prompt = prompt.trim();
    if !session.has_api_key() {
        anyhow::bail!("{}", NOTICE_MISSING_KEY);
    }

    session
        .ensure_ready(factory.as_ref())
        .map_err(|failure| anyhow::anyhow!("{}", failure.user_message()))?;

    let outcome = session
        .submit(prompt, &print_trace)
        .await
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    println!("{}", outcome.answer);
    Ok(())
}

/// Default keybindings for reedline
fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn print_welcome() {
    println!();
    println!("╔════════════════════════════════════════════════════════════╗");
    println!("║          📅 NovaCal - Calendar Assistant                   ║");
    println!("╠════════════════════════════════════════════════════════════╣");
    println!("║  Ask about your schedule or tell me what to change         ║");
    println!("║  Commands: /help, /agenda, /calendar, /reset, /exit        ║");
    println!("╚════════════════════════════════════════════════════════════╝");
    println!();
}

fn print_help() {
    println!();
    println!("📖 Commands:");
    for (cmd, desc) in COMMANDS {
        println!("  {:<10} {}", cmd, desc);
    }
    println!();
}

fn print_history(session: &Session) {
    let transcript = session.transcript();
    println!();
    println!("📜 Transcript ({} messages):", transcript.len());
    println!("{}", "─".repeat(50));

    for (i, msg) in transcript.iter().enumerate() {
        let role = match msg.role {
            ChatRole::Human => "👤 You",
            ChatRole::Ai => "🤖 NovaCal",
        };
        let mut preview: String = msg.content.chars().take(100).collect();
        if msg.content.chars().count() > 100 {
            preview.push_str("...");
        }
        println!("{}. {}: {}", i + 1, role, preview.replace('\n', " "));
    }

    println!("{}", "─".repeat(50));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("What's on today?"), None);
        assert_eq!(parse_command("/help"), Some(Command::Help));
        assert_eq!(parse_command("/CLEAR"), Some(Command::Clear));
        assert_eq!(
            parse_command("/key  AIza-123 "),
            Some(Command::Key(Some("AIza-123".to_string())))
        );
        assert_eq!(parse_command("/key"), Some(Command::Key(None)));
        assert_eq!(parse_command("/quit"), Some(Command::Exit));
        assert_eq!(
            parse_command("/nope"),
            Some(Command::Unknown("/nope".to_string()))
        );
    }

    #[test]
    fn test_completer_filters_by_prefix() {
        let mut completer = CommandCompleter::new();
        let values: Vec<String> = completer
            .complete("/c", 2)
            .into_iter()
            .map(|s| s.value)
            .collect();
        assert_eq!(values, vec!["/clear", "/calendar"]);
        assert!(completer.complete("hello", 5).is_empty());
    }
}
