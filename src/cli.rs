use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Get the default data directory for ticket-board
/// Uses platform-specific data directories:
/// - Linux: ~/.local/share/ticket-board
/// - macOS: ~/Library/Application Support/ticket-board
/// - Windows: %APPDATA%/ticket-board
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir().map(|p| p.join("ticket-board")).unwrap_or_else(|| PathBuf::from(".ticket-board"))
}

/// Narrowest console table we will lay out
const MIN_CONSOLE_WIDTH: usize = 40;

#[derive(Parser, Debug, Clone)]
#[command(name = "ticket-board")]
#[command(about = "Repair-ticket worklist: chat commands in, rendered table out")]
#[command(version)]
pub struct CliArgs {
    /// TOML configuration file
    #[arg(long, short = 'c', value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Workbook JSON file holding the ticket and profile sheets
    /// Default: ~/.local/share/ticket-board/workbook.json (Linux)
    #[arg(long, value_name = "PATH", global = true)]
    pub store: Option<PathBuf>,

    /// TrueType/OpenType font for the rendered table
    /// Falls back to the system sans-serif font when missing
    #[arg(long, value_name = "PATH", global = true)]
    pub font: Option<PathBuf>,

    /// Keep the rendered PNG at this path instead of a temporary file
    #[arg(long, short = 'o', value_name = "PATH", global = true)]
    pub output: Option<PathBuf>,

    /// Print replies to the console instead of uploading and replying
    #[arg(long, global = true)]
    pub no_deliver: bool,

    /// Handle the message against an in-memory copy of the workbook;
    /// nothing is written back
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Override console width for testing (default: auto-detect)
    #[arg(long, value_name = "COLUMNS", global = true)]
    pub console_width: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Handle one chat message, exactly as if it arrived from the channel
    /// Example: ticket-board handle "StoreA 報修 冷氣漏水"
    Handle {
        /// Message text; multiple words are joined with spaces
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Render the full worklist table
    Show,

    /// Print the open worklist to the console
    List,

    /// Renumber open tickets 1..N in sheet order without other changes
    Resequence,

    /// Create an empty workbook with header rows
    Init,

    /// Load store profiles from a file of `store,model,phone,address` lines
    ImportProfiles {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Verify and dispatch a webhook delivery saved to a file
    Webhook {
        /// Raw request body
        #[arg(long, value_name = "FILE")]
        body: PathBuf,

        /// Value of the signature header
        #[arg(long, value_name = "SIG")]
        signature: String,
    },
}

impl CliArgs {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        CliArgs::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        if let Some(width) = self.console_width
            && width < MIN_CONSOLE_WIDTH
        {
            return Err(format!("--console-width must be at least {}", MIN_CONSOLE_WIDTH));
        }

        // The webhook path always answers on the channel
        if self.no_deliver && matches!(self.command, Commands::Webhook { .. }) {
            return Err("Cannot use --no-deliver with the webhook command".to_string());
        }

        if self.dry_run && !matches!(self.command, Commands::Handle { .. } | Commands::Show) {
            return Err("--dry-run only applies to the handle and show commands".to_string());
        }

        if let Some(ref output) = self.output
            && output.is_dir()
        {
            return Err(format!("--output must be a file path, not a directory: {}", output.display()));
        }

        Ok(())
    }

    /// Message text for `handle`, words joined back together
    pub fn handle_text(&self) -> Option<String> {
        match &self.command {
            Commands::Handle { text } => Some(text.join(" ")),
            _ => None,
        }
    }

    /// Does this command touch the channel or image host?
    pub fn needs_delivery(&self) -> bool {
        match self.command {
            Commands::Handle { .. } | Commands::Show => !self.no_deliver,
            Commands::Webhook { .. } => true,
            Commands::List | Commands::Resequence | Commands::Init | Commands::ImportProfiles { .. } => false,
        }
    }
}
