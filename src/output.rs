//! Output rendering abstraction for tiller.
//!
//! Defines the [`Renderer`] trait that decouples loop events from the display
//! layer. [`StdoutRenderer`] prints colored text to the terminal; tests use a
//! recording double.

use colored::Colorize;

/// Receives every user-visible event of the turn loop.
pub trait Renderer {
    /// A new turn is starting (`turn` is 1-based).
    fn turn_start(&mut self, turn: usize, max_turns: usize);

    /// Progress message such as "generating".
    fn status(&mut self, msg: &str);

    /// The retrieval result used to seed the first turn.
    fn initial_context(&mut self, text: &str);

    fn thought(&mut self, text: &str);

    fn action(&mut self, name: &str, args: &str);

    /// Preview shown before the approval prompt (diff or description).
    fn preview(&mut self, title: &str, body: &str);

    fn observation(&mut self, text: &str);

    /// Recoverable condition worth telling the user about.
    fn warning(&mut self, msg: &str);

    fn error(&mut self, msg: &str);

    /// The terminal action's summary.
    fn finished(&mut self, summary: &str);
}

/// Renders loop events to stdout (errors to stderr).
#[derive(Default)]
pub struct StdoutRenderer;

impl StdoutRenderer {
    pub fn new() -> Self {
        Self
    }
}

/// Colors unified-diff lines by prefix.
fn colorize_diff(diff: &str) -> String {
    diff.lines()
        .map(|line| {
            if line.starts_with("+++") || line.starts_with("---") {
                line.bold().to_string()
            } else if line.starts_with("@@") {
                line.cyan().to_string()
            } else if line.starts_with('+') {
                line.green().to_string()
            } else if line.starts_with('-') {
                line.red().to_string()
            } else {
                line.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

impl Renderer for StdoutRenderer {
    fn turn_start(&mut self, turn: usize, max_turns: usize) {
        println!();
        println!("{}", format!("--- Turn {}/{} ---", turn, max_turns).yellow().bold());
    }

    fn status(&mut self, msg: &str) {
        println!("{}", msg.cyan());
    }

    fn initial_context(&mut self, text: &str) {
        println!("{}", "Initial search results:".bold());
        println!("{}", text.dimmed());
    }

    fn thought(&mut self, text: &str) {
        println!("{} {}", "Thought:".bold(), text);
    }

    fn action(&mut self, name: &str, args: &str) {
        println!("{} {} {}", "Action:".bold(), name.yellow(), args.dimmed());
    }

    fn preview(&mut self, title: &str, body: &str) {
        println!();
        println!("{}", title.blue().bold());
        if body.starts_with("---") {
            println!("{}", colorize_diff(body));
        } else {
            println!("{}", body);
        }
    }

    fn observation(&mut self, text: &str) {
        println!("{}", "Observation:".bold());
        println!("{}", text.dimmed());
    }

    fn warning(&mut self, msg: &str) {
        println!("{}", msg.yellow());
    }

    fn error(&mut self, msg: &str) {
        eprintln!("{} {}", "error:".red().bold(), msg);
    }

    fn finished(&mut self, summary: &str) {
        println!();
        println!("{}", "Task finished.".green().bold());
        println!("{} {}", "Summary:".bold(), summary);
    }
}
