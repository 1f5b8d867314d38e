use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(
    name = "audio-extractor",
    about = "Audio Extractor - Pull audio from video URLs with yt-dlp and publish it to object storage",
    version,
    long_about = "Runs an HTTP service (POST /extract, GET /health) that downloads the audio track of a video with yt-dlp, uploads the MP3 to an S3-compatible bucket such as Cloudflare R2 and returns its public URL with the video metadata."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Address to bind (overrides BIND_ADDRESS)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Run one extraction locally and print the result
    Extract {
        /// Video URL to extract audio from
        #[arg(value_name = "URL")]
        url: String,

        /// Owner of the transcription (object key segment)
        #[arg(long, value_name = "ID")]
        user_id: String,

        /// Transcription the audio belongs to (object key segment)
        #[arg(long, value_name = "ID")]
        transcription_id: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the effective configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}

#[derive(ValueEnum, Clone, Debug)]
pub enum OutputFormat {
    /// Human-readable summary
    Text,
    /// The same JSON the HTTP endpoint returns
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_extract() {
        let cli = Cli::try_parse_from([
            "audio-extractor",
            "extract",
            "https://youtu.be/abc",
            "--user-id",
            "usr_1",
            "--transcription-id",
            "txn_1",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::Extract { url, user_id, format, .. } => {
                assert_eq!(url, "https://youtu.be/abc");
                assert_eq!(user_id, "usr_1");
                assert!(matches!(format, OutputFormat::Json));
            }
            _ => panic!("expected extract command"),
        }
    }

    #[test]
    fn test_extract_requires_ids() {
        assert!(Cli::try_parse_from(["audio-extractor", "extract", "https://youtu.be/abc"]).is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
