//! Command line argument parsing for the pdfqa CLI using clap.

use std::path::PathBuf;

use clap::Parser;
use pdfqa::{ApiKey, QaConfig};

/// Ask questions about a PDF document
#[derive(Parser, Debug, Clone)]
#[command(name = "pdfqa")]
#[command(about = "Ask questions about a PDF document using retrieval-augmented generation")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct CliArgs {
    /// PDF file to index
    #[arg(long, value_name = "FILE")]
    pub pdf: PathBuf,

    /// Answer this question and exit instead of starting an interactive session
    #[arg(short, long)]
    pub question: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Number of pages retrieved per question
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Generation temperature (0.0 to 2.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Upper bound on the prompt size, in characters
    #[arg(long)]
    pub max_context_size: Option<usize>,

    /// Chat model used for answers
    #[arg(long)]
    pub chat_model: Option<String>,

    /// Embedding model used for pages and questions
    #[arg(long)]
    pub embedding_model: Option<String>,

    /// Base URL of an OpenAI-compatible API
    #[arg(long)]
    pub base_url: Option<String>,

    /// Print the pages each answer was drawn from
    #[arg(long)]
    pub show_sources: bool,

    /// Verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl CliArgs {
    /// Log filter used when `RUST_LOG` is not set.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }

    /// The API key, or an empty key if none was given.
    pub fn api_key(&self) -> ApiKey {
        ApiKey::new(self.api_key.clone().unwrap_or_default())
    }

    /// Apply command line overrides on top of `base`.
    pub fn config(&self, base: QaConfig) -> pdfqa::Result<QaConfig> {
        let mut builder = base.into_builder();
        if let Some(k) = self.top_k {
            builder = builder.top_k(k);
        }
        if let Some(t) = self.temperature {
            builder = builder.temperature(t);
        }
        if let Some(size) = self.max_context_size {
            builder = builder.max_context_size(size);
        }
        if let Some(model) = &self.chat_model {
            builder = builder.chat_model(model);
        }
        if let Some(model) = &self.embedding_model {
            builder = builder.embedding_model(model);
        }
        if let Some(url) = &self.base_url {
            builder = builder.base_url(url);
        }
        builder.build()
    }
}
