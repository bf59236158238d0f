use colored::{ColoredString, Colorize};
use eyre::Result;

use crate::critique::score::ScoreBand;
use crate::critique::sections::SectionKey;
use crate::review::session::{ErrorKind, Review, ReviewError};
use crate::utils::cli::OutputFormat;

pub fn render(review: &Review, format: OutputFormat) -> Result<String> {
    Ok(match format {
        OutputFormat::Terminal => terminal(review),
        OutputFormat::Markdown => markdown(review),
        OutputFormat::Json => serde_json::to_string_pretty(review)?,
    })
}

fn paint_band(text: String, band: ScoreBand) -> ColoredString {
    match band {
        ScoreBand::Strong => text.green().bold(),
        ScoreBand::Fair => text.yellow().bold(),
        ScoreBand::Weak => text.red().bold(),
    }
}

fn terminal(review: &Review) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\n{} {}\n",
        "Detailed Review for Role:".cyan().bold(),
        review.job_role.bold()
    ));
    out.push_str(&format!(
        "{} {}\n",
        SectionKey::Score.title().cyan(),
        paint_band(
            format!("{} ({})", review.score, review.band.label()),
            review.band
        )
    ));

    for (key, body) in review.sections.present() {
        out.push_str(&format!("\n{}\n{}\n", key.title().cyan().bold(), body));
    }

    if !review.missing.is_empty() {
        out.push_str(&format!(
            "\n{} {}\n",
            "⊘ Sections the model did not return:".yellow(),
            missing_titles(&review.missing)
        ));
    }

    out.push_str(&format!(
        "\n{}\n",
        "✓ Review complete. Focus on the actionable feedback above for your next revision.".green()
    ));
    out
}

fn markdown(review: &Review) -> String {
    let mut out = format!(
        "## Detailed Review for Role: **{}**\n\n**{}:** {} ({})\n",
        review.job_role,
        SectionKey::Score.title(),
        review.score,
        review.band.label()
    );

    for key in SectionKey::CONTENT {
        if let Some(body) = review.sections.get(key) {
            out.push_str(&format!("\n### {}\n\n{}\n", key.title(), body));
        }
    }

    if !review.missing.is_empty() {
        out.push_str(&format!(
            "\n> Sections the model did not return: {}\n",
            missing_titles(&review.missing)
        ));
    }
    out
}

fn missing_titles(missing: &[SectionKey]) -> String {
    missing
        .iter()
        .map(|key| key.title())
        .collect::<Vec<_>>()
        .join(", ")
}

/// User-facing message for a failed analysis. Contract violations carry the
/// raw reply so the mismatch can be diagnosed.
pub fn failure(err: &ReviewError) -> String {
    let headline = match err.kind() {
        ErrorKind::Input => format!("Error: {}", err).red(),
        ErrorKind::Busy => format!("Warning: {}", err).yellow(),
        ErrorKind::Backend | ErrorKind::Contract => format!("Error: {}", err).red().bold(),
    };

    match err.raw_response() {
        Some(raw) => format!(
            "{}\n\n{}\n{}\n{}",
            headline,
            "--- raw model response ---".dimmed(),
            raw,
            "--- end of raw model response ---".dimmed()
        ),
        None => headline.to_string(),
    }
}
