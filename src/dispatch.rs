/// Command dispatch
///
/// One inbound message becomes exactly one reply:
/// parse -> reconcile -> (re-read, lay out, render, upload) -> reply.
///
/// Store and render failures turn into the system-error reply and an upload
/// failure into the upload-failed reply. The underlying error is logged.

use crate::command::{self, Command};
use crate::config::AppConfig;
use crate::delivery::{DeliveryError, ImageHost, Reply};
use crate::layout::layout_tickets;
use crate::reconcile::{CompleteOutcome, Reconciler, ReportOutcome, TicketRepository};
use crate::render::{self, RenderError, highlight_store};
use crate::store::StoreError;
use crate::typeface::load_typeface;
use log::{debug, error, info};
use std::fmt;
use std::path::{Path, PathBuf};

pub const SYSTEM_ERROR_REPLY: &str = "系統錯誤，請聯絡管理員檢查 Log。";
pub const UPLOAD_FAILED_REPLY: &str = "圖片上傳失敗，請檢查 API Key。";

/// Where the image goes when nothing is uploaded and no path was given
pub const DEFAULT_OUTPUT: &str = "worklist.png";

/// Reply to text that is not a command
pub fn acknowledgment(text: &str, show_table: &str) -> String {
    format!("機器人連線正常！您輸入的是：{}\n輸入「{}」可產生報表。", text, show_table)
}

/// Today's date as written into the ticket sheet
pub fn today() -> String {
    chrono::Local::now().format("%Y/%m/%d").to_string()
}

/// Why a command could not be answered normally
#[derive(Debug)]
pub enum DispatchError {
    Store(StoreError),
    Render(RenderError),
    Upload(DeliveryError),
    Io(std::io::Error),
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Store(e) => write!(f, "{}", e),
            DispatchError::Render(e) => write!(f, "render failed: {}", e),
            DispatchError::Upload(e) => write!(f, "upload failed: {}", e),
            DispatchError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<StoreError> for DispatchError {
    fn from(e: StoreError) -> Self {
        DispatchError::Store(e)
    }
}

impl From<RenderError> for DispatchError {
    fn from(e: RenderError) -> Self {
        DispatchError::Render(e)
    }
}

impl From<std::io::Error> for DispatchError {
    fn from(e: std::io::Error) -> Self {
        DispatchError::Io(e)
    }
}

impl DispatchError {
    /// The text the chat user sees for this failure
    pub fn reply_text(&self) -> &'static str {
        match self {
            DispatchError::Upload(_) => UPLOAD_FAILED_REPLY,
            _ => SYSTEM_ERROR_REPLY,
        }
    }
}

/// Turns messages into replies against one repository
pub struct Dispatcher<'a, R: TicketRepository> {
    config: &'a AppConfig,
    reconciler: Reconciler<R>,
    host: Option<&'a dyn ImageHost>,
    output: Option<PathBuf>,
    date: Option<String>,
}

impl<'a, R: TicketRepository> Dispatcher<'a, R> {
    /// `host` of `None` keeps the image local and replies with its path
    pub fn new(config: &'a AppConfig, repository: R, host: Option<&'a dyn ImageHost>) -> Self {
        Dispatcher { config, reconciler: Reconciler::new(repository), host, output: None, date: None }
    }

    /// Keep the rendered image at `path`
    pub fn with_output(mut self, path: Option<PathBuf>) -> Self {
        self.output = path;
        self
    }

    /// Use a fixed date instead of the clock
    #[cfg(test)]
    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }

    pub fn reconciler(&self) -> &Reconciler<R> {
        &self.reconciler
    }

    /// Handle one message. Never fails: errors become error replies.
    pub fn handle(&mut self, text: &str) -> Reply {
        let command = command::parse(text, &self.config.commands);
        info!("handling {} command", command.kind());

        match self.execute(command) {
            Ok(reply) => reply,
            Err(e) => {
                error!("Failed to handle {:?}: {}", text, e);
                Reply::Text(e.reply_text().to_string())
            }
        }
    }

    /// Run a parsed command
    pub fn execute(&mut self, command: Command) -> Result<Reply, DispatchError> {
        let date = self.date.clone().unwrap_or_else(today);

        match command {
            Command::ShowTable => self.publish(),
            Command::Report { store, issue } => match self.reconciler.report(&store, &issue, &date)? {
                ReportOutcome::Created { .. } => self.publish(),
                ReportOutcome::Duplicate { ordinal } => {
                    Ok(Reply::Text(format!("{} 已有未完修的報修單（第 {} 項）。", store, ordinal)))
                }
                ReportOutcome::UnknownStore => Ok(Reply::Text(format!("找不到店別「{}」的基本資料。", store))),
            },
            Command::Complete { store, note } => match self.reconciler.complete(&store, &note, &date)? {
                CompleteOutcome::Closed { .. } => self.publish(),
                CompleteOutcome::AlreadyClosed => Ok(Reply::Text(format!("{} 的報修單已完修。", store))),
                CompleteOutcome::NotFound => Ok(Reply::Text(format!("找不到店別「{}」的報修單。", store))),
            },
            Command::Unrecognized(text) => Ok(Reply::Text(acknowledgment(&text, &self.config.commands.show_table))),
        }
    }

    /// Render the current worklist and hand it to the image host
    fn publish(&mut self) -> Result<Reply, DispatchError> {
        let tickets = self.reconciler.open_tickets()?;
        let highlight = self.reconciler.take_highlight();
        let layout = layout_tickets(&tickets, &self.config.layout);
        let typeface = load_typeface(self.config.font_path());
        let predicate = highlight_store(highlight.as_deref());
        debug!("rendering {} open tickets with {:?} typeface", layout.body_rows().len(), typeface.source());

        if let Some(store) = highlight.as_deref() {
            // A closed ticket is not drawn, so this is usually zero
            let painted = layout.body_rows().iter().filter(|&row| predicate(row)).count();
            debug!("highlight for {} matches {} rendered rows", store, painted);
        }

        let target = match (&self.output, self.host) {
            (Some(path), _) => Some(path.clone()),
            (None, None) => Some(PathBuf::from(DEFAULT_OUTPUT)),
            (None, Some(_)) => None,
        };

        match target {
            Some(path) => {
                render::render_to_file(&layout, &typeface, predicate, &path)?;
                self.deliver(&path)
            }
            None => {
                let temp = tempfile::Builder::new().prefix("worklist-").suffix(".png").tempfile()?;
                render::render_to_file(&layout, &typeface, predicate, temp.path())?;
                let reply = self.deliver(temp.path());
                // Dropping the handle removes the file
                debug!("removing temporary image {}", temp.path().display());
                reply
            }
        }
    }

    fn deliver(&self, path: &Path) -> Result<Reply, DispatchError> {
        match self.host {
            Some(host) => {
                let url = host.upload(path).map_err(DispatchError::Upload)?;
                info!("table image uploaded to {}", url);
                Ok(Reply::Image { url })
            }
            None => Ok(Reply::Image { url: path.display().to_string() }),
        }
    }
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
