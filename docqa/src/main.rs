use anyhow::Result;
use clap::Parser;
use docqa::error::{configuration_failure, generation_failure, MISSING_KEY_NOTICE};
use docqa::{relay, DocumentProcessor, GeminiService, QueryService, Settings, WriterSink};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Ask Gemini a question about a text or Markdown document
#[derive(Parser, Debug)]
#[command(name = "docqa", version)]
struct Cli {
    /// Document to ask about (.txt or .md)
    document: PathBuf,

    /// Gemini model to use (overrides GEMINI_MODEL)
    #[arg(long)]
    model: Option<String>,

    /// Print the whole answer at once instead of streaming it
    #[arg(long)]
    no_stream: bool,

    /// The question. Everything after the first word is taken verbatim.
    #[arg(trailing_var_arg = true, required = true)]
    question: Vec<String>,
}

impl Cli {
    fn question(&self) -> String {
        self.question.join(" ")
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenv::dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let mut settings = Settings::from_env()?;
    if let Some(model) = cli.model.clone() {
        settings.model = model;
    }

    let mut stdout = io::stdout().lock();
    run(&cli, &settings, &mut stdout).await
}

/// Answers one question, writing the answer (or the missing-key notice) to `out`.
/// Failures the user should see go to stderr and become a failing exit code.
async fn run<W: Write>(cli: &Cli, settings: &Settings, out: &mut W) -> Result<ExitCode> {
    let Some(api_key) = settings.api_key.as_deref() else {
        writeln!(out, "{MISSING_KEY_NOTICE} Set GEMINI_API_KEY in the environment or in .env.")?;
        return Ok(ExitCode::SUCCESS);
    };

    let document = DocumentProcessor::new().process_file(&cli.document).await?;
    let question = cli.question();

    let client = reqwest::Client::new();
    let gemini_service = match GeminiService::configure(client, api_key, settings).await {
        Ok(service) => service,
        Err(e) => {
            eprintln!("{}", configuration_failure(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    let query_service = QueryService::new(Arc::new(gemini_service));

    if cli.no_stream {
        return match query_service.answer(&document, &question).await {
            Ok(answer) => {
                writeln!(out, "{answer}")?;
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                eprintln!("{}", generation_failure(&e));
                Ok(ExitCode::FAILURE)
            }
        };
    }

    let stream = query_service.stream_answer(&document, &question)?;
    let mut sink = WriterSink::new(&mut *out);
    let outcome = relay(stream, &mut sink).await;
    writeln!(out)?;

    match outcome.error {
        Some(e) => {
            eprintln!("{}", generation_failure(&e));
            Ok(ExitCode::FAILURE)
        }
        None => {
            log::info!("Answer complete: {} fragments, {} bytes", outcome.fragments, outcome.text.len());
            Ok(ExitCode::SUCCESS)
        }
    }
}
