//! CLI argument definitions using clap.

use clap::Parser;
use std::path::PathBuf;

/// mapstyle - restyle a map after a reference image with a vision model in the loop
#[derive(Parser, Debug)]
#[command(name = "mapstyle")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Reference (inspiration) image
    #[arg(short, long)]
    pub inspiration: PathBuf,

    /// Base style document (JSON)
    #[arg(short, long)]
    pub style: PathBuf,

    /// Directory for renders, transcript and the final style
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Optional config file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop after this many revisions without acceptance
    #[arg(long)]
    pub max_iterations: Option<u32>,

    /// Reasoning model override
    #[arg(long)]
    pub model: Option<String>,

    /// Reasoning service API key (defaults to OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Style service access token (defaults to MAPBOX_TOKEN)
    #[arg(long)]
    pub mapbox_token: Option<String>,

    /// Style service account (defaults to MAPBOX_USERNAME)
    #[arg(long)]
    pub mapbox_username: Option<String>,

    /// Log to stderr instead of the log file
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_and_optional_args() {
        let cli = Cli::try_parse_from([
            "mapstyle",
            "--inspiration",
            "ref.jpg",
            "--style",
            "harbor.json",
            "--max-iterations",
            "4",
            "--model",
            "gpt-4o-mini",
        ])
        .unwrap();

        assert_eq!(cli.inspiration, PathBuf::from("ref.jpg"));
        assert_eq!(cli.style, PathBuf::from("harbor.json"));
        assert_eq!(cli.max_iterations, Some(4));
        assert_eq!(cli.model.as_deref(), Some("gpt-4o-mini"));
        assert!(cli.output_dir.is_none());
        assert!(!cli.is_verbose());
    }

    #[test]
    fn test_missing_style_is_rejected() {
        assert!(Cli::try_parse_from(["mapstyle", "--inspiration", "ref.jpg"]).is_err());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["mapstyle", "-i", "a.png", "-s", "b.json", "-o", "out", "-v"]).unwrap();
        assert_eq!(cli.output_dir, Some(PathBuf::from("out")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_credential_overrides() {
        let cli = Cli::try_parse_from([
            "mapstyle",
            "-i",
            "a.png",
            "-s",
            "b.json",
            "--api-key",
            "sk-test",
            "--mapbox-token",
            "pk.test",
            "--mapbox-username",
            "cartographer",
        ])
        .unwrap();
        assert_eq!(cli.api_key.as_deref(), Some("sk-test"));
        assert_eq!(cli.mapbox_token.as_deref(), Some("pk.test"));
        assert_eq!(cli.mapbox_username.as_deref(), Some("cartographer"));

        let bare = Cli::try_parse_from(["mapstyle", "-i", "a.png", "-s", "b.json"]).unwrap();
        assert!(bare.api_key.is_none());
        assert!(bare.mapbox_token.is_none());
    }
}
