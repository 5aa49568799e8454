use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use docuseal::api::{CreateHtmlTemplateRequest, CreateWebhookRequest, UpdateWebhookRequest};
use docuseal::config::{Credentials, Settings};
use docuseal::report::{OutputMode, write_error};
use docuseal::runtime::{RealRuntime, Runtime};
use docuseal::{Client, error};
use reqwest::Method;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

/// docuseal - command-line client for the DocuSeal document signing API
///
/// Credentials come from --url/--api-key or the DOCUSEAL_URL and
/// DOCUSEAL_API_KEY environment variables.
///
/// Exit codes: 1 unknown, 2 validation, 3 auth, 4 rate limit, 5 not configured,
/// 6 circuit breaker open, 7 timeout.
#[derive(Parser, Debug)]
#[command(author, version = env!("DOCUSEAL_VERSION"), about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// DocuSeal instance URL
    #[arg(long, env = "DOCUSEAL_URL", value_name = "URL", global = true)]
    url: Option<String>,

    /// API key
    #[arg(
        long = "api-key",
        env = "DOCUSEAL_API_KEY",
        hide_env_values = true,
        value_name = "KEY",
        global = true
    )]
    api_key: Option<String>,

    /// Per-request timeout in seconds (also via DOCUSEAL_TIMEOUT)
    #[arg(long, value_name = "SECS", global = true)]
    timeout: Option<u64>,

    /// Max retries for rate-limited requests (also via DOCUSEAL_RETRIES)
    #[arg(long, value_name = "N", global = true)]
    retries: Option<u32>,

    /// Base delay for exponential backoff (also via DOCUSEAL_RETRY_BASE_DELAY_MS)
    #[arg(long = "retry-base-delay-ms", value_name = "MS", global = true)]
    retry_base_delay_ms: Option<u64>,

    /// Skip TLS certificate verification (also via DOCUSEAL_INSECURE_SKIP_VERIFY)
    #[arg(long = "insecure-skip-verify", global = true)]
    insecure_skip_verify: bool,

    /// Wall-clock limit for the whole operation, including retries
    #[arg(long, value_name = "SECS", global = true)]
    deadline: Option<u64>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "DOCUSEAL_OUTPUT",
        value_enum,
        default_value_t = OutputMode::Text,
        global = true
    )]
    output: OutputMode,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Send a raw request to an API path
    Api(ApiArgs),

    /// Manage templates
    #[command(subcommand)]
    Templates(TemplateCommands),

    /// Manage webhooks
    #[command(subcommand)]
    Webhooks(WebhookCommands),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(clap::Args, Debug)]
struct ApiArgs {
    #[arg(value_enum)]
    method: HttpMethod,

    /// Path below the API root, e.g. /templates
    path: String,

    /// JSON request body
    #[arg(long, value_name = "JSON")]
    data: Option<String>,
}

#[derive(clap::Subcommand, Debug)]
enum TemplateCommands {
    /// Create a template from an HTML file
    CreateHtml {
        #[arg(long)]
        name: String,
        /// HTML document to upload
        #[arg(long, value_name = "PATH")]
        file: PathBuf,
        #[arg(long)]
        folder: Option<String>,
    },
}

#[derive(clap::Subcommand, Debug)]
enum WebhookCommands {
    /// List webhooks
    List {
        #[arg(long, default_value_t = 0)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        after: u64,
        #[arg(long, default_value_t = 0)]
        before: u64,
    },
    /// Show a webhook
    Get { id: u64 },
    /// Create a webhook
    Create {
        #[arg(long)]
        url: String,
        /// Comma-separated event types
        #[arg(long, value_delimiter = ',', required = true)]
        events: Vec<String>,
    },
    /// Update a webhook
    Update {
        id: u64,
        #[arg(long)]
        url: Option<String>,
        #[arg(long, value_delimiter = ',')]
        events: Option<Vec<String>>,
        #[arg(long)]
        active: Option<bool>,
    },
    /// Delete a webhook
    Delete { id: u64 },
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();
    let mode = cli.output;

    if let Err(err) = run(RealRuntime, cli).await {
        let _ = write_error(&mut std::io::stderr(), mode, &err);
        std::process::exit(error::exit_code(&err));
    }
}

async fn run<R: Runtime>(runtime: R, cli: Cli) -> Result<()> {
    let client = build_client(&runtime, &cli)?;

    let cancel = client.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let work = execute(&runtime, &client, cli.command);
    let output = match cli.deadline {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), work).await??,
        None => work.await?,
    };

    if let Some(value) = output {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}

fn build_client<R: Runtime>(runtime: &R, cli: &Cli) -> Result<Client> {
    let creds = Credentials::resolve(runtime, cli.url.clone(), cli.api_key.clone())?;
    let env = Settings::from_env(runtime);

    let insecure = cli.insecure_skip_verify || env.insecure_skip_verify;
    if insecure {
        eprintln!("WARNING: TLS certificate verification disabled (--insecure-skip-verify).");
    }

    let client = Client::builder(creds.url, creds.api_key)
        .timeout(cli.timeout.map(Duration::from_secs).unwrap_or(env.timeout))
        .retries(cli.retries.unwrap_or(env.retries))
        .retry_base_delay(
            cli.retry_base_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(env.retry_base_delay),
        )
        .insecure_skip_verify(insecure)
        .build()?;
    Ok(client)
}

#[tracing::instrument(skip_all)]
async fn execute<R: Runtime>(
    runtime: &R,
    client: &Client,
    command: Commands,
) -> Result<Option<Value>> {
    match command {
        Commands::Api(args) => {
            let body: Option<Value> = args
                .data
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--data is not valid JSON")?;
            let method = match args.method {
                HttpMethod::Get => Method::GET,
                HttpMethod::Post => Method::POST,
                HttpMethod::Put => Method::PUT,
                HttpMethod::Delete => Method::DELETE,
            };
            Ok(client.request(method, &args.path, body.as_ref()).await?)
        }
        Commands::Templates(TemplateCommands::CreateHtml { name, file, folder }) => {
            let req = CreateHtmlTemplateRequest::from_file(runtime, name, &file, folder)?;
            Ok(client.create_template_from_html(&req).await?)
        }
        Commands::Webhooks(cmd) => match cmd {
            WebhookCommands::List {
                limit,
                after,
                before,
            } => {
                let hooks = client.list_webhooks(limit, after, before).await?;
                Ok(Some(serde_json::to_value(hooks)?))
            }
            WebhookCommands::Get { id } => {
                let hook = client.get_webhook(id).await?;
                Ok(hook.map(serde_json::to_value).transpose()?)
            }
            WebhookCommands::Create { url, events } => {
                let hook = client
                    .create_webhook(&CreateWebhookRequest { url, events })
                    .await?;
                Ok(hook.map(serde_json::to_value).transpose()?)
            }
            WebhookCommands::Update {
                id,
                url,
                events,
                active,
            } => {
                let req = UpdateWebhookRequest {
                    url,
                    events,
                    active,
                };
                let hook = client.update_webhook(id, &req).await?;
                Ok(hook.map(serde_json::to_value).transpose()?)
            }
            WebhookCommands::Delete { id } => {
                client.delete_webhook(id).await?;
                Ok(None)
            }
        },
    }
}
