//! Pipe chain parsing
//!
//! Splits a command line on top-level `|` operators and word-splits each
//! segment with shell quoting rules. No shell is involved at execution time,
//! so `|` is the only operator recognized.

use helmfile_mcp_common::{ErrorSeverity, Severity};
use thiserror::Error;

/// One executable invocation within a pipe chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineStage {
    /// Program to run, resolved through `PATH`
    pub executable: String,
    /// Arguments in order, already unquoted
    pub arguments: Vec<String>,
}

impl PipelineStage {
    /// Create a stage from a program and its arguments
    pub fn new<S: Into<String>>(executable: impl Into<String>, arguments: Vec<S>) -> Self {
        Self {
            executable: executable.into(),
            arguments: arguments.into_iter().map(Into::into).collect(),
        }
    }

    /// Render the stage as a shell-quoted command line for logs
    pub fn command_line(&self) -> String {
        shell_words::join(std::iter::once(&self.executable).chain(self.arguments.iter()))
    }
}

/// Render a whole chain as `a | b | c` for logs
pub fn render_pipeline(stages: &[PipelineStage]) -> String {
    stages
        .iter()
        .map(PipelineStage::command_line)
        .collect::<Vec<_>>()
        .join(" | ")
}

/// Errors produced while parsing a pipe chain
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineParseError {
    /// Nothing to run
    #[error("Command is empty")]
    EmptyCommand,

    /// A quote was opened and never closed
    #[error("Unbalanced quotes in command: {0}")]
    UnbalancedQuotes(String),

    /// A `|` with nothing on one side
    #[error("Empty pipeline segment at position {position}")]
    EmptySegment {
        /// Zero-based index of the empty segment
        position: usize,
    },
}

impl Severity for PipelineParseError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Warning
    }
}

/// Parse a command line into stages in left-to-right pipe order
///
/// ```
/// use helmfile_mcp_shell::parse_pipeline;
///
/// let stages = parse_pipeline("list | grep foo | wc -l").unwrap();
/// assert_eq!(stages.len(), 3);
/// assert_eq!(stages[1].executable, "grep");
/// assert_eq!(stages[2].arguments, vec!["-l"]);
/// ```
pub fn parse_pipeline(raw_command: &str) -> Result<Vec<PipelineStage>, PipelineParseError> {
    if raw_command.trim().is_empty() {
        return Err(PipelineParseError::EmptyCommand);
    }

    let segments = split_top_level(raw_command)
        .ok_or_else(|| PipelineParseError::UnbalancedQuotes(raw_command.to_string()))?;

    segments
        .iter()
        .enumerate()
        .map(|(position, segment)| parse_segment(segment, position))
        .collect()
}

fn parse_segment(segment: &str, position: usize) -> Result<PipelineStage, PipelineParseError> {
    if segment.trim().is_empty() {
        return Err(PipelineParseError::EmptySegment { position });
    }

    let mut words = shell_words::split(segment)
        .map_err(|_| PipelineParseError::UnbalancedQuotes(segment.trim().to_string()))?
        .into_iter();

    match words.next() {
        Some(executable) if !executable.is_empty() => Ok(PipelineStage {
            executable,
            arguments: words.collect(),
        }),
        _ => Err(PipelineParseError::EmptySegment { position }),
    }
}

/// Split on unquoted, unescaped `|`. Returns `None` when a quote is left open.
pub(crate) fn split_top_level(raw: &str) -> Option<Vec<&str>> {
    let (segments, balanced) = scan_segments(raw);
    balanced.then_some(segments)
}

/// Like [`split_top_level`], but an open quote swallows the rest of the input
pub(crate) fn first_segment(raw: &str) -> &str {
    scan_segments(raw).0.first().copied().unwrap_or(raw)
}

fn scan_segments(raw: &str) -> (Vec<&str>, bool) {
    let mut segments = Vec::new();
    let mut start = 0;
    let mut in_single = false;
    let mut in_double = false;
    let mut escaped = false;

    for (index, ch) in raw.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if !in_single => escaped = true,
            '\'' if !in_double => in_single = !in_single,
            '"' if !in_single => in_double = !in_double,
            '|' if !in_single && !in_double => {
                segments.push(&raw[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    segments.push(&raw[start..]);

    (segments, !in_single && !in_double)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(executable: &str, arguments: &[&str]) -> PipelineStage {
        PipelineStage::new(executable, arguments.to_vec())
    }

    #[test]
    fn test_three_stage_chain() {
        let stages = parse_pipeline("list | grep foo | wc -l").unwrap();
        assert_eq!(
            stages,
            vec![
                stage("list", &[]),
                stage("grep", &["foo"]),
                stage("wc", &["-l"]),
            ]
        );
    }

    #[test]
    fn test_single_stage() {
        let stages = parse_pipeline("helmfile -f helmfile.yaml diff").unwrap();
        assert_eq!(stages, vec![stage("helmfile", &["-f", "helmfile.yaml", "diff"])]);
    }

    #[test]
    fn test_pipe_inside_quotes_is_not_split() {
        let stages = parse_pipeline(r#"list | grep "a|b" | awk '{print $1|"sort"}'"#).unwrap();
        assert_eq!(stages.len(), 3);
        assert_eq!(stages[1].arguments, vec!["a|b"]);
        assert_eq!(stages[2].arguments, vec![r#"{print $1|"sort"}"#]);
    }

    #[test]
    fn test_escaped_pipe_is_literal() {
        let stages = parse_pipeline(r"grep a\|b").unwrap();
        assert_eq!(stages, vec![stage("grep", &["a|b"])]);
    }

    #[test]
    fn test_double_pipe_is_empty_segment() {
        assert_eq!(
            parse_pipeline("list || grep foo"),
            Err(PipelineParseError::EmptySegment { position: 1 })
        );
    }

    #[test]
    fn test_leading_and_trailing_pipes() {
        assert_eq!(
            parse_pipeline("| grep foo"),
            Err(PipelineParseError::EmptySegment { position: 0 })
        );
        assert_eq!(
            parse_pipeline("list |"),
            Err(PipelineParseError::EmptySegment { position: 1 })
        );
        assert_eq!(
            parse_pipeline("list |   | wc"),
            Err(PipelineParseError::EmptySegment { position: 1 })
        );
    }

    #[test]
    fn test_unbalanced_quotes() {
        assert!(matches!(
            parse_pipeline("list --selector 'name=web"),
            Err(PipelineParseError::UnbalancedQuotes(_))
        ));
        assert!(matches!(
            parse_pipeline(r#"grep "foo | wc"#),
            Err(PipelineParseError::UnbalancedQuotes(_))
        ));
    }

    #[test]
    fn test_empty_command() {
        assert_eq!(parse_pipeline("   "), Err(PipelineParseError::EmptyCommand));
    }

    #[test]
    fn test_empty_quoted_executable() {
        assert_eq!(
            parse_pipeline(r#""" list"#),
            Err(PipelineParseError::EmptySegment { position: 0 })
        );
    }

    #[test]
    fn test_first_segment_is_lenient() {
        assert_eq!(first_segment("apply --confirm | grep x"), "apply --confirm ");
        assert_eq!(first_segment("apply 'open | x"), "apply 'open | x");
    }

    #[test]
    fn test_command_line_quotes_arguments() {
        let stage = stage("grep", &["hello world"]);
        assert_eq!(stage.command_line(), "grep 'hello world'");
        assert_eq!(
            render_pipeline(&[stage.clone(), self::stage("wc", &["-l"])]),
            "grep 'hello world' | wc -l"
        );
    }
}
