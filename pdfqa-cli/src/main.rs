//! pdfqa: ask questions about a PDF from the terminal.
//!
//! Indexes the document once, then answers a single `--question` or reads
//! questions interactively until EOF or `exit`.

mod args;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use pdfqa::{Answer, OpenAIBackend, QaConfig, QaPipeline};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::args::CliArgs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.default_log_filter()));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    let config = args.config(QaConfig::from_env()?)?;
    let pipeline = QaPipeline::builder()
        .config(config.clone())
        .backend(Arc::new(OpenAIBackend::new(config)))
        .build()?;

    let bytes = tokio::fs::read(&args.pdf)
        .await
        .with_context(|| format!("failed to read {}", args.pdf.display()))?;
    pipeline
        .build_index(&bytes, &args.api_key())
        .await
        .with_context(|| format!("failed to index {}", args.pdf.display()))?;

    if let Some(info) = pipeline.index_info().await {
        info!(index.id = %info.id, segment_count = info.segment_count, "document ready");
    }

    match &args.question {
        Some(question) => {
            let answer = pipeline.answer(question, None).await?;
            print_answer(&answer, args.show_sources);
        }
        None => run_console(&pipeline, args.show_sources).await?,
    }
    Ok(())
}

/// Read questions until EOF or `exit`, answering each against the indexed document.
async fn run_console(pipeline: &QaPipeline, show_sources: bool) -> anyhow::Result<()> {
    let mut rl = DefaultEditor::new()?;
    println!("Ask a question about the document (type 'exit' to quit).");

    loop {
        let line = match rl.readline("question> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question.eq_ignore_ascii_case("exit") || question.eq_ignore_ascii_case("quit") {
            break;
        }
        let _ = rl.add_history_entry(question);

        match pipeline.answer(question, None).await {
            Ok(answer) => print_answer(&answer, show_sources),
            Err(e) => eprintln!("Error: {e}"),
        }
    }
    Ok(())
}

fn print_answer(answer: &Answer, show_sources: bool) {
    println!("{answer}");
    if show_sources && !answer.source_pages.is_empty() {
        let pages: Vec<String> =
            answer.source_pages.iter().map(|p| (p + 1).to_string()).collect();
        println!("(pages {})", pages.join(", "));
    }
}
