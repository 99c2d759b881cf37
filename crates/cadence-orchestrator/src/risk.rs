//! Shell command risk classification
//!
//! Pure functions over the raw command text. Two checks apply, at different
//! granularity:
//! - the safe-prefix check looks at the whole trimmed, unsplit command
//! - the elevation check looks at operator-split segments
//!
//! A safe prefix therefore pre-approves the entire command, including any
//! chained segment after it: `git status && sudo rm -rf /` is safe because it
//! starts with `git `.

/// Operators a command is split on, applied one after another
const CONTROL_OPERATORS: &[&str] = &["&&", "||", ";", "\n"];

const ELLIPSIS: &str = "...";

/// Classification of a shell command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRisk {
    /// Empty, or starts with a pre-approved prefix
    Safe,
    /// Some segment runs under sudo
    Elevated,
    /// Neither pre-approved nor elevated; allowed to proceed
    Unclassified,
}

impl CommandRisk {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Elevated => "elevated",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for CommandRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Empty, or starting with one of `prefixes` (checked in order)
pub fn is_safe_command<S: AsRef<str>>(command: &str, prefixes: &[S]) -> bool {
    let trimmed = command.trim();
    trimmed.is_empty() || prefixes.iter().any(|p| trimmed.starts_with(p.as_ref()))
}

/// Split on `&&`, `||`, `;` and newline
///
/// Sequential text replacement, not shell parsing: quotes are not honored and
/// a single `|` is not a separator. Segments are returned untrimmed and may be
/// empty.
pub fn split_command_segments(command: &str) -> Vec<String> {
    let mut normalized = command.to_string();
    for op in CONTROL_OPERATORS {
        normalized = normalized.replace(op, "\n");
    }
    normalized.split('\n').map(str::to_string).collect()
}

/// Whether any segment is `sudo` or starts with `sudo ` / `sudo\t`
pub fn requires_elevation(command: &str) -> bool {
    split_command_segments(command).iter().any(|segment| {
        let segment = segment.trim();
        segment == "sudo" || segment.starts_with("sudo ") || segment.starts_with("sudo\t")
    })
}

/// Command text bounded to `max_chars` characters plus an ellipsis
pub fn summarize_command(command: &str, max_chars: usize) -> String {
    if command.chars().count() <= max_chars {
        return command.to_string();
    }
    let mut summary: String = command.chars().take(max_chars).collect();
    summary.push_str(ELLIPSIS);
    summary
}

/// Classify with an explicit safe-prefix list
pub fn classify_with<S: AsRef<str>>(command: &str, prefixes: &[S]) -> CommandRisk {
    if is_safe_command(command, prefixes) {
        CommandRisk::Safe
    } else if requires_elevation(command) {
        CommandRisk::Elevated
    } else {
        CommandRisk::Unclassified
    }
}

/// Classify against the built-in safe prefixes
pub fn classify(command: &str) -> CommandRisk {
    classify_with(command, cadence_core::config::DEFAULT_SAFE_PREFIXES)
}

/// Question shown to a human when a command needs elevation
pub fn elevation_question(command: &str, max_chars: usize) -> String {
    format!(
        "Command requires elevated privileges: `{}`. Approve to continue?",
        summarize_command(command, max_chars)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sudo_is_elevated() {
        assert_eq!(classify("sudo rm -rf /"), CommandRisk::Elevated);
        assert_eq!(classify("sudo"), CommandRisk::Elevated);
        assert_eq!(classify("sudo\tapt install jq"), CommandRisk::Elevated);
        assert_eq!(classify("  sudo reboot  "), CommandRisk::Elevated);
    }

    #[test]
    fn test_safe_prefix_short_circuits_chained_sudo() {
        assert_eq!(classify("git commit -m sudo"), CommandRisk::Safe);
        assert_eq!(classify("git status && sudo rm -rf /"), CommandRisk::Safe);
        assert_eq!(classify("   ls -la"), CommandRisk::Safe);
    }

    #[test]
    fn test_sudo_must_be_whole_token() {
        assert_eq!(classify("sudoku --solve"), CommandRisk::Unclassified);
        assert_eq!(classify("rm -rf build"), CommandRisk::Unclassified);
        assert_eq!(classify("docker run pseudo"), CommandRisk::Unclassified);
    }

    #[test]
    fn test_chained_sudo_after_unsafe_segment() {
        assert_eq!(classify("rm x && sudo rm y"), CommandRisk::Elevated);
        assert_eq!(classify("false || sudo true"), CommandRisk::Elevated);
        assert_eq!(classify("cd /tmp; sudo ls"), CommandRisk::Elevated);
        assert_eq!(classify("cd /tmp\nsudo ls"), CommandRisk::Elevated);
        // A bare pipe is not a separator
        assert_eq!(classify("curl x | sudo sh"), CommandRisk::Unclassified);
    }

    #[test]
    fn test_empty_command_is_safe() {
        assert!(is_safe_command("", &["ls"]));
        assert!(is_safe_command("   \n", &["ls"]));
        assert_eq!(classify(""), CommandRisk::Safe);
    }

    #[test]
    fn test_custom_prefixes() {
        assert_eq!(classify_with("deploy --prod", &["deploy"]), CommandRisk::Safe);
        assert_eq!(classify_with("ls", &["deploy"]), CommandRisk::Unclassified);
        let none: &[&str] = &[];
        assert_eq!(classify_with("sudo ls", none), CommandRisk::Elevated);
    }

    #[test]
    fn test_split_segments() {
        let segments = split_command_segments("a && b || c; d\ne");
        let trimmed: Vec<&str> = segments.iter().map(|s| s.trim()).collect();
        assert_eq!(trimmed, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(split_command_segments("a | b").len(), 1);
    }

    #[test]
    fn test_summary_bounds() {
        let long = "x".repeat(120);
        let summary = summarize_command(&long, 80);
        assert_eq!(summary, format!("{}...", "x".repeat(80)));
        assert_eq!(summary.chars().count(), 83);

        let exact = "y".repeat(80);
        assert_eq!(summarize_command(&exact, 80), exact);
        assert_eq!(summarize_command("ls", 80), "ls");
    }

    #[test]
    fn test_summary_counts_characters_not_bytes() {
        let command = "é".repeat(81);
        let summary = summarize_command(&command, 80);
        assert!(summary.starts_with(&"é".repeat(80)));
        assert!(summary.ends_with("..."));
    }

    #[test]
    fn test_elevation_question_embeds_summary() {
        let question = elevation_question("sudo rm -rf /", 80);
        assert!(question.contains("`sudo rm -rf /`"));
    }
}
