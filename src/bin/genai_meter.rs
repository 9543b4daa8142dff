//! genai-meter: metered Google generative AI calls from the command line
//!
//! Runs a chat, stream, or embedding call through a metered gateway and
//! waits for the usage record to be delivered before exiting.

use std::io::{self, IsTerminal, Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Args as ClapArgs, Parser, Subcommand};
use futures_util::StreamExt;
use genai_meter::{
    CallerMetadata, MemorySink, Meter, MeterConfig, ProviderFlavor, verify_environment,
};

/// Metered Google generative AI client
#[derive(Parser)]
#[command(name = "genai-meter")]
#[command(version = genai_meter::version::PKG_VERSION)]
#[command(about = "Call Google generative AI models and meter their usage")]
struct Args {
    /// Config file (default: ~/.genai-meter/config.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Provider flavor: google or vertex
    #[arg(long, env = "GENAI_METER_FLAVOR")]
    flavor: Option<ProviderFlavor>,

    /// Keep records in memory and print them instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Seconds to wait for pending records before exiting
    #[arg(long, default_value_t = 10)]
    drain_timeout: u64,

    #[command(flatten)]
    metadata: MetadataArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Multi-turn chat, one turn per prompt
    Chat {
        /// Prompts, sent in order (or omit to read one from stdin)
        prompts: Vec<String>,
        /// Model to use
        #[arg(short, long, default_value = "gemini-2.0-flash-001")]
        model: String,
    },

    /// Stream a response to the prompts joined by newlines
    Stream {
        /// Prompts (or omit to read one from stdin)
        prompts: Vec<String>,
        /// Model to use
        #[arg(short, long, default_value = "gemini-2.0-flash-001")]
        model: String,
    },

    /// Generate an embedding for text
    Embed {
        /// Text to embed (or omit to read from stdin)
        text: Option<String>,
        /// Model to use
        #[arg(short, long, default_value = "text-embedding-004")]
        model: String,
    },

    /// Report missing environment variables for the selected flavor
    Verify,
}

/// Record overrides.
#[derive(ClapArgs)]
struct MetadataArgs {
    #[arg(long, global = true)]
    transaction_id: Option<String>,
    #[arg(long, global = true)]
    trace_id: Option<String>,
    #[arg(long, global = true)]
    task_type: Option<String>,
    #[arg(long, global = true)]
    organization_id: Option<String>,
    #[arg(long, global = true)]
    product_id: Option<String>,
    #[arg(long, global = true)]
    subscription_id: Option<String>,
    #[arg(long, global = true)]
    subscriber_id: Option<String>,
    #[arg(long, global = true)]
    subscriber_email: Option<String>,
    /// Credential name (used with --subscriber-credential)
    #[arg(long, global = true)]
    subscriber_credential_name: Option<String>,
    #[arg(long, global = true)]
    subscriber_credential: Option<String>,
    #[arg(long, global = true)]
    agent: Option<String>,
    /// Quality score in [0, 1]
    #[arg(long, global = true)]
    quality_score: Option<f64>,
    #[arg(long, global = true)]
    temperature: Option<f64>,
}

impl MetadataArgs {
    fn into_metadata(self) -> Option<CallerMetadata> {
        let metadata = CallerMetadata {
            transaction_id: self.transaction_id,
            trace_id: self.trace_id,
            task_type: self.task_type,
            subscriber_email: self.subscriber_email,
            subscriber_id: self.subscriber_id,
            subscriber_credential_name: self.subscriber_credential_name,
            subscriber_credential: self.subscriber_credential,
            organization_id: self.organization_id,
            subscription_id: self.subscription_id,
            product_id: self.product_id,
            agent: self.agent,
            response_quality_score: self.quality_score,
            temperature: self.temperature,
            ..CallerMetadata::default()
        };
        (metadata != CallerMetadata::default()).then_some(metadata)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = MeterConfig::load(args.config.as_deref())?.with_env();
    if let Some(flavor) = args.flavor {
        config.provider.flavor = flavor;
    }

    // RUST_LOG wins; otherwise REVENIUM_LOG_LEVEL / config file.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(config.log_level.as_filter().to_string())
            }),
        )
        .with_writer(io::stderr)
        .init();

    let missing = verify_environment(config.provider.flavor);
    if let Command::Verify = args.command {
        if missing.is_empty() {
            println!("environment ok for {}", config.provider.flavor);
            return Ok(());
        }
        return Err(format!("missing: {}", missing.join(", ")).into());
    }

    let memory = MemorySink::new();
    let mut builder = Meter::builder();
    if args.dry_run {
        builder = builder.sink(memory.clone());
    }
    let gateway = builder.config(&config)?.build()?;
    let metadata = args.metadata.into_metadata();

    match args.command {
        Command::Chat { prompts, model } => {
            let prompts = resolve_prompts(prompts, "chat")?;
            let prompts: Vec<&str> = prompts.iter().map(String::as_str).collect();
            let transcript = gateway.chat(&model, &prompts, metadata.as_ref()).await?;
            for (prompt, turn) in prompts.iter().zip(&transcript.responses) {
                println!("> {prompt}");
                println!("{}", turn.text);
                println!(
                    "[{} in / {} out tokens]",
                    turn.usage_metadata.prompt_token_count,
                    turn.usage_metadata.candidates_token_count
                );
            }
        }

        Command::Stream { prompts, model } => {
            let prompts = resolve_prompts(prompts, "stream")?;
            let prompts: Vec<&str> = prompts.iter().map(String::as_str).collect();
            let mut stream = gateway.stream(&model, &prompts, metadata.as_ref()).await?;
            let mut stdout = io::stdout();
            while let Some(chunk) = stream.next().await {
                write!(stdout, "{}", chunk?.output_text())?;
                stdout.flush()?;
            }
            writeln!(stdout)?;
        }

        Command::Embed { text, model } => {
            let text = resolve_text(text, "embed")?;
            let outcome = gateway.embed(&model, &text, metadata.as_ref()).await?;
            println!("model: {}", outcome.model_version);
            println!("dimensions: {}", outcome.dimensions());
            println!("tokens: {}", outcome.total_token_count);
        }

        Command::Verify => {}
    }

    if !gateway
        .drain_timeout(Duration::from_secs(args.drain_timeout))
        .await
    {
        eprintln!(
            "warning: {} metering record(s) still pending at exit",
            gateway.dispatcher().in_flight()
        );
    }

    if args.dry_run {
        for record in memory.records() {
            println!("{}", serde_json::to_string_pretty(&record.redacted())?);
        }
    }

    Ok(())
}

fn resolve_prompts(
    prompts: Vec<String>,
    command: &str,
) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    if prompts.is_empty() {
        return Ok(vec![resolve_text(None, command)?]);
    }
    Ok(prompts)
}

/// Resolve text input from an optional CLI argument and/or stdin.
///
/// - arg only → arg
/// - stdin only → stdin
/// - both → `"{arg}\n\n{stdin}"`
/// - neither → error
fn resolve_text(arg: Option<String>, command: &str) -> Result<String, Box<dyn std::error::Error>> {
    let stdin_text = if io::stdin().is_terminal() {
        None
    } else {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim().to_string();
        (!trimmed.is_empty()).then_some(trimmed)
    };

    match (arg, stdin_text) {
        (Some(a), Some(s)) => Ok(format!("{a}\n\n{s}")),
        (Some(a), None) => Ok(a),
        (None, Some(s)) => Ok(s),
        (None, None) => {
            Err(format!("{command}: no input provided (pass text as argument or via stdin)").into())
        }
    }
}
