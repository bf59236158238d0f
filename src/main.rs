mod chat;
mod critique;
mod loader;
mod review;
mod utils;

use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Result, eyre};
use log::{debug, info};

use crate::chat::agent::{CritiqueAgent, CritiqueBackend};
use crate::critique::parser::ParseMode;
use crate::loader::document::Upload;
use crate::review::render;
use crate::review::session::{RequestState, Review, ReviewError, ReviewSession};
use crate::utils::cli::{Args, OutputFormat};
use crate::utils::config::{Config, config};
use crate::utils::input;
use crate::utils::log::Logger;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.verbosity);

    info!(
        "starting resume-critique {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    if let Err(e) = dotenvy::dotenv() {
        debug!("no .env file loaded: {}", e);
    }

    let config: Config = config(args.config.clone())?;

    // without a credential no analysis is possible
    let api_key = config.api_key()?;
    let agent = CritiqueAgent::new(api_key, &config.llm)?;

    let mode = if args.partial {
        ParseMode::Partial
    } else {
        config.review.parse_mode()
    };
    info!("using model {} ({:?} parsing)", config.llm.model, mode);

    let mut session = ReviewSession::new(agent, mode);

    match args.one_shot() {
        Some((path, role)) => {
            let upload = Upload::from_path(path, args.mime.as_deref()).await?;
            analyze_and_show(&mut session, Some(&upload), role, args.format)
                .await
                .map(|_| ())
                .map_err(|e| eyre!("review failed ({:?} error)", e.kind()))
        }
        None => interactive(&mut session, &args).await,
    }
}

async fn analyze_and_show<B: CritiqueBackend>(
    session: &mut ReviewSession<B>,
    upload: Option<&Upload>,
    job_role: &str,
    format: OutputFormat,
) -> Result<Review, ReviewError> {
    let result = session
        .analyze(upload, job_role, |state| {
            if state == RequestState::Requesting {
                eprintln!("{}", "Executing comprehensive analysis...".dimmed());
            }
        })
        .await;

    match &result {
        Ok(review) => match render::render(review, format) {
            Ok(out) => println!("{}", out),
            Err(e) => eprintln!("{}", format!("Error: could not render review: {}", e).red()),
        },
        Err(e) => eprintln!("{}", render::failure(e)),
    }

    result
}

async fn interactive<B: CritiqueBackend>(session: &mut ReviewSession<B>, args: &Args) -> Result<()> {
    println!("\n{}", "=== ResuMate AI: Professional Resume Review ===".cyan().bold());
    println!(
        "{}\n",
        "Upload your resume and name the target role for a critique of ATS alignment, quantifiable impact and formatting.".cyan()
    );

    let mut resume = args.resume.clone();
    let mut role = args.role.clone();

    loop {
        let path = match resume.take() {
            Some(path) => path,
            None => match input::prompt_line("Resume file (.pdf or .txt, empty to quit): ") {
                Some(path) if !path.is_empty() => PathBuf::from(path),
                _ => break,
            },
        };

        let job_role = match role.take() {
            Some(role) => role,
            None => input::prompt_line("Target job role (e.g. Senior Data Scientist): ").unwrap_or_default(),
        };

        let upload = match Upload::from_path(&path, args.mime.as_deref()).await {
            Ok(upload) => Some(upload),
            Err(e) => {
                eprintln!(
                    "{}",
                    format!("could not open {}: {}", path.display(), e).red()
                );
                None
            }
        };

        println!();
        // failures are already shown; the session is back to idle either way
        let _ = analyze_and_show(session, upload.as_ref(), &job_role, args.format).await;
        debug!("session is {:?}", session.state());

        if !input::confirm("\nAnalyze another resume? (y/n): ") {
            break;
        }
    }

    info!("goodbye");
    Ok(())
}
