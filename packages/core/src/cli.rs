use std::path::PathBuf;

use clap::Parser;

/// Seat availability monitor CLI arguments
#[derive(Debug, Parser)]
#[command(
    name = "seatwatch",
    version,
    about = "Watches web pages for a condition and alerts when it turns true"
)]
pub struct Cli {
    /// JSON file with the targets to monitor
    #[arg(long)]
    pub targets: Option<PathBuf>,

    /// Classification endpoint the page text is sent to
    #[arg(long)]
    pub analyzer_url: Option<String>,

    /// Seconds to wait for loops to stop on shutdown
    #[arg(long)]
    pub grace_seconds: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_are_optional() {
        let cli = Cli::try_parse_from(["seatwatch"]).unwrap();
        assert!(cli.targets.is_none());
        assert!(cli.analyzer_url.is_none());
        assert!(cli.grace_seconds.is_none());
    }

    #[test]
    fn parses_overrides() {
        let cli = Cli::try_parse_from([
            "seatwatch",
            "--targets",
            "watch.json",
            "--analyzer-url",
            "http://localhost:9000/analyze",
            "--grace-seconds",
            "10",
        ])
        .unwrap();
        assert_eq!(cli.targets, Some(PathBuf::from("watch.json")));
        assert_eq!(cli.analyzer_url.as_deref(), Some("http://localhost:9000/analyze"));
        assert_eq!(cli.grace_seconds, Some(10));
    }
}
