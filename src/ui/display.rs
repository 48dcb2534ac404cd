use console::{Term, style};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use std::time::Duration;

use crate::compaction::{AutoCompaction, CompactionSummary};
use crate::controller::{Event, Outcome};
use crate::errors::ChatError;
use crate::session::Session;
use crate::transcript::{Role, Turn};
use crate::ui::icons::{CHECK, CROSS, MEMORY, SAVE, SCROLL, SPARKLE, WARN};

const MIN_WIDTH: usize = 40;
const MAX_WIDTH: usize = 100;

/// Terminal renderer for a chat session.
///
/// Speaker names are colored by who is talking: the character in cyan, the
/// user's persona in green, the narrator dimmed.
pub struct ChatUI {
    character: String,
    counterpart: String,
    narrator: String,
    width: usize,
    trigger: AutoCompaction,
}

impl ChatUI {
    pub fn new(session: &Session) -> Self {
        let (_, columns) = Term::stdout().size();
        Self::with_width(
            session.character_name(),
            session.counterpart_name(),
            session.narrator_name(),
            columns as usize,
        )
    }

    pub fn with_width(character: &str, counterpart: &str, narrator: &str, width: usize) -> Self {
        Self {
            character: character.to_string(),
            counterpart: counterpart.to_string(),
            narrator: narrator.to_string(),
            width: width.clamp(MIN_WIDTH, MAX_WIDTH),
            trigger: AutoCompaction::default(),
        }
    }

    /// Measure reply token usage against this trigger's threshold.
    pub fn with_trigger(mut self, trigger: AutoCompaction) -> Self {
        self.trigger = trigger;
        self
    }

    /// Token usage of a reply with its share of the compaction threshold.
    pub fn format_usage(&self, token_usage: u64) -> String {
        let percentage = self.trigger.usage_percentage(token_usage);
        let text = format!(
            "{} tokens ({:.0}% of {})",
            token_usage,
            percentage,
            self.trigger.threshold()
        );
        if self.trigger.should_compact(token_usage) {
            style(text).yellow().to_string()
        } else {
            style(text).dim().to_string()
        }
    }

    /// Render a turn as a styled speaker header followed by wrapped content.
    pub fn format_turn(&self, turn: &Turn) -> String {
        let name = if turn.name == self.narrator {
            style(turn.name.as_str()).dim().italic()
        } else if turn.name == self.character && turn.role == Role::Assistant {
            style(turn.name.as_str()).cyan().bold()
        } else if turn.name == self.counterpart {
            style(turn.name.as_str()).green().bold()
        } else {
            style(turn.name.as_str()).bold()
        };

        let options = textwrap::Options::new(self.width)
            .initial_indent("  ")
            .subsequent_indent("  ");
        format!("{}\n{}", name, textwrap::fill(&turn.content, options))
    }

    pub fn print_turn(&self, turn: &Turn) {
        println!("{}", self.format_turn(turn));
    }

    /// Numbered listing for `log` and `memory`.
    pub fn format_listing(&self, title: &str, turns: &[Turn]) -> String {
        let icon = if title == "Memory" { MEMORY } else { SCROLL };
        let mut out = format!(
            "{}{} {}",
            icon,
            style(title).bold(),
            style(format!("({} entries)", turns.len())).dim()
        );
        if turns.is_empty() {
            out.push_str(&format!("\n  {}", style("(empty)").dim()));
        }
        for (index, turn) in turns.iter().enumerate() {
            out.push_str(&format!(
                "\n{} {}",
                style(format!("[{}]", index + 1)).dim(),
                self.format_turn(turn)
            ));
        }
        out
    }

    pub fn show_banner(&self, session: &Session, save_path: &Path) {
        println!();
        println!(
            "{}{} {} {}",
            SPARKLE,
            style(self.character.as_str()).cyan().bold(),
            style("&").dim(),
            style(self.counterpart.as_str()).green().bold()
        );
        println!(
            "  {} {}  {} {}  {} {}",
            style("transcript:").dim(),
            session.transcript().len(),
            style("memory:").dim(),
            session.memory().len(),
            style("archived:").dim(),
            session.archive().len()
        );
        println!("  {} {}", style("saving to").dim(), save_path.display());
        println!(
            "  {}",
            style("Commands: !rewrite  ?regenerate  :inspire  ~skip  /narrate  log  memory  compress [n|all]  exit")
                .dim()
        );
        println!("{}", style("─".repeat(self.width)).dim());
    }

    /// Print everything a command produced. Turns the user just typed are not echoed.
    pub fn show_outcome(&self, outcome: &Outcome) {
        for event in &outcome.events {
            match event {
                Event::Appended(turn) => {
                    if turn.name == self.narrator {
                        self.print_turn(turn);
                    }
                }
                Event::Rewrote(turn) => {
                    println!("{}{}", CHECK, style("Last reply replaced:").dim());
                    self.print_turn(turn);
                }
                Event::Replied { turn, token_usage } => {
                    self.print_turn(turn);
                    println!("  {}", self.format_usage(*token_usage));
                }
                Event::Compacted(summary) => self.show_compaction(summary),
                Event::Listing { title, turns } => println!("{}", self.format_listing(title, turns)),
                Event::Notice(message) => println!("{}", style(message).dim()),
                Event::Warning(message) => self.show_warning(message),
            }
        }
    }

    pub fn show_compaction(&self, summary: &CompactionSummary) {
        println!(
            "{}{} {}",
            MEMORY,
            style(format!("Compressed {} lines into memory", summary.turns_compacted)).yellow(),
            style(format!(
                "({} → {} chars)",
                summary.original_chars, summary.summary_chars
            ))
            .dim()
        );
    }

    pub fn show_warning(&self, message: &str) {
        println!("{}{}", WARN, style(message).yellow());
    }

    pub fn show_error(&self, error: &ChatError) {
        println!(
            "{}{} {}",
            CROSS,
            style(format!("[{}]", error.kind())).red().bold(),
            style(error).red()
        );
    }

    pub fn show_saved(&self, path: &Path) {
        println!("{}{} {}", SAVE, style("Session saved to").dim(), path.display());
    }

    /// Spinner shown while a command is waiting on the model.
    pub fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.cyan} {msg}")
                .expect("spinner template is a valid static string"),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}
