//! `scripture`: ask the scripture-study backend questions from a terminal.

mod render;

use std::io::Write as _;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};
use scripture_stream::observability::init_observability;
use scripture_stream::prelude::*;
use scripture_stream::parse_selections;
use tracing::debug;

#[derive(Parser)]
#[command(name = "scripture", version, about = "Ask questions about the scriptures")]
struct Cli {
    /// Backend base URL.
    #[arg(long, env = "SCRIPTURE_API_URL", global = true)]
    api_url: Option<String>,
    /// Bearer token for the backend.
    #[arg(long, env = "SCRIPTURE_API_KEY", hide_env_values = true, global = true)]
    api_key: Option<String>,
    /// Timeout in seconds for non-streaming requests.
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// Log at debug level (unless SCRIPTURE_LOG_LEVEL or RUST_LOG is set).
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Stream a generated answer with its sources.
    Ask {
        #[command(flatten)]
        query: QueryArgs,
        /// Print raw events as JSON lines instead of rendered text.
        #[arg(long)]
        json: bool,
    },
    /// Run a search without generating an answer.
    Search {
        #[command(flatten)]
        query: QueryArgs,
    },
    /// Check that the backend is up.
    Health,
    /// List searchable collections.
    Sources,
}

#[derive(Args)]
struct QueryArgs {
    /// The question or search text.
    #[arg(required = true, num_args = 1..)]
    query: Vec<String>,
    /// Answer mode label, e.g. "Book of Mormon Only".
    #[arg(short, long, default_value = "default")]
    mode: String,
    /// Number of passages to retrieve.
    #[arg(short = 'k', long)]
    top_k: Option<u32>,
    /// Source selection token (all, scriptures, conference,
    /// standard_work:<name>, year:<yyyy>, speaker:<name>). Repeatable.
    #[arg(short, long = "source")]
    sources: Vec<String>,
}

impl QueryArgs {
    fn to_request(&self) -> anyhow::Result<AnswerRequest> {
        let query = self.query.join(" ");
        if query.trim().is_empty() {
            bail!("query must not be empty");
        }
        let mut request = AnswerRequest::new(query)
            .mode(self.mode.as_str())
            .selections(parse_selections(&self.sources));
        if let Some(top_k) = self.top_k {
            request = request.max_results(top_k);
        }
        Ok(request)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_observability(if cli.verbose { "debug" } else { "warn" });

    match run(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let client = build_client(&cli)?;
    match cli.command {
        Command::Ask { query, json } => ask(&client, query.to_request()?, json).await,
        Command::Search { query } => {
            let response = client
                .search(&query.to_request()?)
                .await
                .context("search failed")?;
            render::search_results(&response);
            Ok(ExitCode::SUCCESS)
        }
        Command::Health => {
            let health = client.health().await.context("health check failed")?;
            render::health(&health);
            Ok(if health.is_healthy() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Sources => {
            let sources = client.sources().await.context("listing sources failed")?;
            render::collections(&sources);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn build_client(cli: &Cli) -> anyhow::Result<ScriptureClient> {
    let mut config = ClientConfig::from_env().context("invalid environment configuration")?;
    if let Some(url) = &cli.api_url {
        config = config.base_url(url.clone());
    }
    if let Some(key) = cli.api_key.as_ref().filter(|k| !k.trim().is_empty()) {
        config = config.api_key(key.clone());
    }
    if let Some(secs) = cli.timeout_secs {
        config = config.timeout(Duration::from_secs(secs));
    }
    debug!(event = "cli.config_resolved", domain = "cli", base_url = %config.base_url);
    ScriptureClient::new(config).context("invalid client configuration")
}

async fn ask(
    client: &ScriptureClient,
    request: AnswerRequest,
    json: bool,
) -> anyhow::Result<ExitCode> {
    let abort = AbortHandle::new();
    let ctrl_c_abort = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            ctrl_c_abort.abort();
        }
    });

    let mut stdout = std::io::stdout();
    let result = client
        .answer_consumer()
        .consume_with_abort(&request, &abort, |event| {
            if json {
                render::json_event(&mut stdout, &event);
            } else if let StreamEvent::Content { content } = &event {
                let _ = write!(stdout, "{content}");
                let _ = stdout.flush();
            }
        })
        .await;

    let session = match result {
        Ok(session) => session,
        Err(ConsumeError::Cancelled) => {
            println!();
            eprintln!("cancelled");
            return Ok(ExitCode::from(130));
        }
        Err(err) if err.is_transport_failure() => {
            return Err(anyhow::Error::new(err).context(format!(
                "could not get an answer from {}",
                client.config().base_url
            )));
        }
        Err(err) => {
            println!();
            return Err(anyhow::Error::new(err).context("answer stream broke off"));
        }
    };

    if !json {
        println!();
        render::session_summary(&session);
    }
    Ok(match session.outcome() {
        StreamOutcome::Completed => ExitCode::SUCCESS,
        StreamOutcome::Failed { message } => {
            eprintln!("the server could not finish the answer: {message}");
            ExitCode::FAILURE
        }
        StreamOutcome::Open => {
            eprintln!("warning: the answer may be incomplete (stream closed early)");
            ExitCode::from(2)
        }
    })
}
