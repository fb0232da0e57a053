//! CLI argument parsing.

use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};

/// Markdown-to-HTML build tool with async component expansion.
#[derive(Debug, Parser)]
#[command(name = "markweave")]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Working directory for the build
    #[arg(long, default_value = ".")]
    pub workspace: Utf8PathBuf,

    /// Output directory for rendered HTML (overrides markweave.json)
    #[arg(long = "out-dir")]
    pub out_dir: Option<Utf8PathBuf>,

    /// Output directory for component runtime scripts (overrides markweave.json)
    #[arg(long = "scripts-dir")]
    pub scripts_dir: Option<Utf8PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    pub output: OutputFormat,

    /// Build target (overrides markweave.json)
    #[arg(long, value_enum)]
    pub target: Option<BuildTarget>,

    /// Watch mode
    #[arg(long)]
    pub watch: bool,

    /// Preserve watch output (don't clear screen)
    #[arg(long = "preserveWatchOutput")]
    pub preserve_watch_output: bool,

    /// Stop at the first document that fails to build
    #[arg(long = "fail-fast")]
    pub fail_fast: bool,

    /// Exit with error on warnings
    #[arg(long = "fail-on-warnings")]
    pub fail_on_warnings: bool,

    /// Glob patterns to ignore
    #[arg(long)]
    pub ignore: Vec<String>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable output (default)
    #[default]
    Human,
    /// Human-readable with code snippets
    HumanVerbose,
    /// JSON output
    Json,
    /// Machine-readable (one line per diagnostic)
    Machine,
}

/// Which audience a build renders for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum BuildTarget {
    /// Interactive web output (default)
    #[default]
    Web,
    /// Static ebook output: no scripts, no interactive components
    Ebook,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_args() {
        let args = Args::parse_from(["markweave"]);
        assert_eq!(args.workspace.as_str(), ".");
        assert!(matches!(args.output, OutputFormat::Human));
        assert!(args.target.is_none());
        assert!(!args.watch);
    }

    #[test]
    fn test_custom_workspace() {
        let args = Args::parse_from(["markweave", "--workspace", "/path/to/book"]);
        assert_eq!(args.workspace.as_str(), "/path/to/book");
    }

    #[test]
    fn test_target_flag() {
        let args = Args::parse_from(["markweave", "--target", "ebook"]);
        assert_eq!(args.target, Some(BuildTarget::Ebook));
    }

    #[test]
    fn test_output_formats() {
        let args = Args::parse_from(["markweave", "--output", "json"]);
        assert!(matches!(args.output, OutputFormat::Json));

        let args = Args::parse_from(["markweave", "--output", "machine"]);
        assert!(matches!(args.output, OutputFormat::Machine));
    }

    #[test]
    fn test_ignore_patterns() {
        let args = Args::parse_from(["markweave", "--ignore", "**/drafts/**"]);
        assert_eq!(args.ignore, vec!["**/drafts/**".to_string()]);
    }
}
