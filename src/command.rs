/// Inbound command parsing
///
/// Chat text is turned into a `Command` here, so the reconciler never sees
/// raw text matching. Recognized shapes:
/// - the show keyword on its own: show the full table
/// - `<store> <text...>` with the complete marker in the text: close the ticket
/// - `<store> <text...>` with the report marker in the text: open a ticket
///
/// Anything else is `Unrecognized`.

/// Keywords recognized in chat text
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct CommandWords {
    /// Exact text asking for the full table
    pub show_table: String,
    /// Substring marking a new report
    pub report_marker: String,
    /// Substring marking a completed repair
    pub complete_marker: String,
}

impl Default for CommandWords {
    fn default() -> Self {
        CommandWords {
            show_table: "總表".to_string(),
            report_marker: "報修".to_string(),
            complete_marker: "完修".to_string(),
        }
    }
}

impl CommandWords {
    pub fn validate(&self) -> Result<(), String> {
        for (name, value) in [
            ("commands.show_table", &self.show_table),
            ("commands.report_marker", &self.report_marker),
            ("commands.complete_marker", &self.complete_marker),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{} must not be empty", name));
            }
        }
        if self.report_marker == self.complete_marker {
            return Err("commands.report_marker and commands.complete_marker must differ".to_string());
        }
        Ok(())
    }
}

/// A parsed inbound command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowTable,
    /// Open a ticket; `issue` is empty when the text carried no description
    Report { store: String, issue: String },
    /// Close a ticket; `note` is the full command text
    Complete { store: String, note: String },
    Unrecognized(String),
}

impl Command {
    pub fn kind(&self) -> &'static str {
        match self {
            Command::ShowTable => "show-table",
            Command::Report { .. } => "report",
            Command::Complete { .. } => "complete",
            Command::Unrecognized(_) => "unrecognized",
        }
    }
}

/// Parse chat text into a command.
///
/// The store is the first whitespace-separated word; markers are looked for
/// in the remaining text only. The complete marker is checked first.
pub fn parse(text: &str, words: &CommandWords) -> Command {
    let trimmed = text.trim();
    if trimmed == words.show_table {
        return Command::ShowTable;
    }

    let Some((store, rest)) = trimmed.split_once(char::is_whitespace) else {
        return Command::Unrecognized(trimmed.to_string());
    };
    let store = store.trim();
    let rest = rest.trim();

    if rest.contains(words.complete_marker.as_str()) {
        return Command::Complete { store: store.to_string(), note: trimmed.to_string() };
    }

    if rest.contains(words.report_marker.as_str()) {
        let issue = rest.replace(words.report_marker.as_str(), " ");
        let issue = issue.split_whitespace().collect::<Vec<_>>().join(" ");
        return Command::Report { store: store.to_string(), issue };
    }

    Command::Unrecognized(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_default(text: &str) -> Command {
        parse(text, &CommandWords::default())
    }

    #[test]
    fn test_show_table_keyword() {
        assert_eq!(parse_default("總表"), Command::ShowTable);
        assert_eq!(parse_default("  總表 \n"), Command::ShowTable);
        assert_eq!(parse_default("總表 please"), Command::Unrecognized("總表 please".to_string()));
    }

    #[test]
    fn test_report_with_issue() {
        assert_eq!(
            parse_default("StoreA 報修 冷氣漏水"),
            Command::Report { store: "StoreA".to_string(), issue: "冷氣漏水".to_string() }
        );
        assert_eq!(
            parse_default("StoreA 冷氣漏水 報修"),
            Command::Report { store: "StoreA".to_string(), issue: "冷氣漏水".to_string() }
        );
        assert_eq!(
            parse_default("StoreA 報修漏水"),
            Command::Report { store: "StoreA".to_string(), issue: "漏水".to_string() }
        );
    }

    #[test]
    fn test_report_without_issue() {
        assert_eq!(parse_default("StoreA 報修"), Command::Report { store: "StoreA".to_string(), issue: String::new() });
    }

    #[test]
    fn test_complete_keeps_full_text() {
        assert_eq!(
            parse_default(" StoreA 完修 已更換壓縮機 "),
            Command::Complete { store: "StoreA".to_string(), note: "StoreA 完修 已更換壓縮機".to_string() }
        );
    }

    #[test]
    fn test_complete_marker_wins_over_report() {
        let cmd = parse_default("StoreA 報修 已完修");
        assert_eq!(cmd.kind(), "complete");
    }

    #[test]
    fn test_unrecognized() {
        assert_eq!(parse_default("hello"), Command::Unrecognized("hello".to_string()));
        assert_eq!(parse_default("StoreA hello"), Command::Unrecognized("StoreA hello".to_string()));
        // Marker only in the store position
        assert_eq!(parse_default("報修"), Command::Unrecognized("報修".to_string()));
        assert_eq!(parse_default(""), Command::Unrecognized(String::new()));
    }

    #[test]
    fn test_custom_words() {
        let words = CommandWords {
            show_table: "table".to_string(),
            report_marker: "#broken".to_string(),
            complete_marker: "#fixed".to_string(),
        };
        assert_eq!(parse("table", &words), Command::ShowTable);
        assert_eq!(
            parse("Shop1 #broken door", &words),
            Command::Report { store: "Shop1".to_string(), issue: "door".to_string() }
        );
        assert!(words.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_equal_markers() {
        let words = CommandWords { complete_marker: "報修".to_string(), ..CommandWords::default() };
        assert!(words.validate().is_err());
    }
}
