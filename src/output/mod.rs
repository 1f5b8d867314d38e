use anyhow::Result;
use console::style;

use crate::cli::OutputFormat;
use crate::pipeline::ExtractResponse;
use crate::utils::format_duration;

/// Render an extraction result for the terminal
pub fn render(response: &ExtractResponse, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(response)?),
        OutputFormat::Text => Ok(format_as_text(response)),
    }
}

fn format_as_text(response: &ExtractResponse) -> String {
    let metadata = &response.metadata;
    let mut lines = vec![
        format!("{} {}", style("Status:").bold(), response.status),
        format!("{} {}", style("URL:").bold(), response.r2_url),
        format!("{} {}", style("Title:").bold(), metadata.title),
        format!("{} {}", style("Channel:").bold(), metadata.channel),
        format!("{} {}", style("Video ID:").bold(), metadata.video_id),
    ];

    if metadata.duration > 0 {
        lines.push(format!(
            "{} {}",
            style("Duration:").bold(),
            format_duration(metadata.duration)
        ));
    }

    lines.join("\n")
}

/// Print an extraction result to stdout
pub fn print_to_console(response: &ExtractResponse, format: &OutputFormat) -> Result<()> {
    println!("{}", render(response, format)?);
    Ok(())
}
