use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(name = "resume-critique")]
#[command(about = "AI-powered resume review against a target job role", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Resume to review (.pdf or .txt); prompts interactively when omitted
    #[arg(short, long, value_name = "FILE")]
    pub resume: Option<PathBuf>,

    /// Target job role, e.g. "Senior Data Scientist"
    #[arg(short = 'j', long, value_name = "ROLE")]
    pub role: Option<String>,

    /// Override the MIME type guessed from the file extension
    #[arg(long, value_name = "TYPE")]
    pub mime: Option<String>,

    /// Show the sections that parsed even when others are missing
    #[arg(long)]
    pub partial: bool,

    /// How to print the review
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
    pub format: OutputFormat,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Markdown,
    Json,
}

impl Args {
    /// Both inputs given on the command line: run once and exit.
    pub fn one_shot(&self) -> Option<(&PathBuf, &str)> {
        self.resume.as_ref().zip(self.role.as_deref())
    }
}
