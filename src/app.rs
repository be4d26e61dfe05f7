//! Command-line front end.
//!
//! `serve` exposes the router over newline-delimited JSON on stdio; `encrypt`
//! and `decrypt` run a single request against a file on disk.

use std::ffi::OsStr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{Level, debug, info, warn};

use crate::backend::Backends;
use crate::config::{APP_NAME, APP_VERSION};
use crate::message::{Operation, Request, Response};
use crate::prompt;
use crate::registry::DispatchContext;
use crate::router::Router;
use crate::secret::Secret;
use crate::types::{Action, ProviderType};
use crate::worker::Worker;

/// Subcommands.
#[derive(Subcommand)]
pub enum Commands {
    /// Answer newline-delimited JSON requests from stdin on stdout.
    Serve {
        #[arg(long, value_parser = parse_provider)]
        provider: Option<ProviderType>,
    },

    /// Encrypt a file; the output defaults to the input name plus the
    /// provider's extension.
    Encrypt(FileArgs),

    /// Decrypt a file; the output defaults to the input name without its
    /// last extension.
    Decrypt(FileArgs),
}

impl Commands {
    /// Whether this run can reach the age engine. Only then is its load
    /// started, since it occupies the blocking pool until it finishes.
    fn needs_age(&self) -> bool {
        match self {
            Self::Serve { .. } => true,
            Self::Encrypt(args) | Self::Decrypt(args) => args.provider == Some(ProviderType::ThirdParty),
        }
    }
}

/// Arguments shared by `encrypt` and `decrypt`.
#[derive(Args)]
pub struct FileArgs {
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long)]
    password: Option<String>,

    #[arg(long, value_parser = parse_provider)]
    provider: Option<ProviderType>,
}

/// Parsed command line.
#[derive(Parser)]
#[command(name = APP_NAME, version = APP_VERSION)]
pub struct App {
    /// Log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

fn parse_provider(value: &str) -> Result<ProviderType, String> {
    value.parse().map_err(|_| format!("unknown provider '{value}' (expected legacy, aead or thirdParty)"))
}

impl App {
    /// Parses the command line and installs the stderr tracing subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber is already installed.
    pub fn init() -> Result<Self> {
        let app = Self::parse();
        let level = match app.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        // stdout carries response envelopes in `serve`.
        let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).with_file(true).with_line_number(true).finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(app)
    }

    /// Runs the parsed command to completion.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, on a failed provider activation, or
    /// when the operation itself is answered with an error.
    pub async fn execute(self) -> Result<()> {
        let backends = if self.command.needs_age() { Backends::load() } else { Backends::without_age() };
        let ctx = Arc::new(DispatchContext::new(backends));
        match self.command {
            Commands::Serve { provider } => {
                if let Some(provider) = provider {
                    activate(&ctx, provider).await?;
                }
                let stdin = tokio::io::BufReader::new(tokio::io::stdin());
                serve(ctx, stdin, tokio::io::stdout()).await
            }
            Commands::Encrypt(args) => process_file(ctx, Action::Encrypt, args).await,
            Commands::Decrypt(args) => process_file(ctx, Action::Decrypt, args).await,
        }
    }
}

/// Makes `provider` active, waiting for the age engine to finish loading
/// first when it is the one requested.
async fn activate(ctx: &DispatchContext, provider: ProviderType) -> Result<()> {
    if provider == ProviderType::ThirdParty {
        debug!("waiting for age engine");
        ctx.backends().age.wait_ready().await?;
    }
    ctx.switch(provider).with_context(|| format!("failed to activate {provider} provider"))
}

/// Feeds one JSON request per input line to a worker and writes one JSON
/// response per output line until the input ends and every job has answered.
async fn serve<R, W>(ctx: Arc<DispatchContext>, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let (requests, responses) = Worker::new(ctx).spawn().into_parts();

    let intake = tokio::spawn(async move {
        let mut lines = input.lines();
        while let Some(line) = lines.next_line().await? {
            if line.trim().is_empty() {
                continue;
            }
            let message = serde_json::from_str(&line).unwrap_or_else(|e| {
                warn!("unparseable request line: {e}");
                Value::Null
            });
            if requests.send_async(message).await.is_err() {
                break;
            }
        }
        anyhow::Ok(())
    });

    while let Ok(response) = responses.recv_async().await {
        let mut line = serde_json::to_vec(&response.encode())?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }

    intake.await.context("request reader panicked")?.context("failed to read requests")
}

/// Reads `args.input`, dispatches one request through a router and writes
/// the result next to the input (or to `args.output`).
async fn process_file(ctx: Arc<DispatchContext>, action: Action, args: FileArgs) -> Result<()> {
    let FileArgs { input, output, password, provider } = args;

    if let Some(provider) = provider {
        activate(&ctx, provider).await?;
    }

    let file_name = input.file_name().and_then(OsStr::to_str).with_context(|| format!("no usable file name in {}", input.display()))?.to_owned();
    let payload = tokio::fs::read(&input).await.with_context(|| format!("failed to read {}", input.display()))?;

    let password = match password {
        Some(password) => Secret::from_string(password),
        None if action == Action::Encrypt => prompt::encryption_password()?,
        None => prompt::decryption_password()?,
    };

    let operation = Operation { payload, password, file_name, provider: None };
    let request = match action {
        Action::Encrypt => Request::Encrypt(operation),
        Action::Decrypt | Action::Init => Request::Decrypt(operation),
    };

    match Router::new(ctx).dispatch(request).await {
        Response::Success { payload, file_name, .. } => {
            let output = output.unwrap_or_else(|| input.with_file_name(&file_name));
            if output == input {
                bail!("output would overwrite {}; pass --output", input.display());
            }
            tokio::fs::write(&output, &payload).await.with_context(|| format!("failed to write {}", output.display()))?;
            info!(%action, bytes = payload.len(), output = %output.display(), "file written");
            println!("{} -> {}", input.display(), output.display());
            Ok(())
        }
        Response::Error { user_message, code: Some(code), .. } => bail!("{user_message} ({code})"),
        Response::Error { user_message, .. } => bail!("{user_message}"),
        other => bail!("unexpected response to {action}: {other:?}"),
    }
}
