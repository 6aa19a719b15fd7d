//! sqslite - command-line client for the SQS query API

mod config;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqslite::{Attribute, CreateQueueOptions, Queue, ReceiveOptions, Sqs};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Settings;

#[derive(Parser, Debug)]
#[command(name = "sqslite")]
#[command(about = "Command-line client for the SQS query API", long_about = None)]
struct Args {
    /// Config file (defaults to ./sqslite.* when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Access key id
    #[arg(long, global = true, env = "SQSLITE_ACCESS_KEY")]
    access_key: Option<String>,

    /// Secret access key
    #[arg(long, global = true, env = "SQSLITE_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Region name (us-east-1, eu-west-1, ...)
    #[arg(long, global = true, env = "SQSLITE_REGION")]
    region: Option<String>,

    /// EC2-style endpoint to use instead of the region's
    #[arg(long, global = true, env = "SQSLITE_ENDPOINT")]
    endpoint: Option<String>,

    /// Log request and response bodies
    #[arg(long, global = true)]
    debug: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn", env = "SQSLITE_LOG_LEVEL")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List queues, optionally by name prefix
    List { prefix: Option<String> },

    /// Create a queue and print its URL
    Create {
        name: String,
        /// Default visibility timeout in seconds
        #[arg(long)]
        visibility_timeout: Option<u32>,
        /// Maximum message size in bytes
        #[arg(long)]
        max_message_size: Option<u32>,
    },

    /// Delete a queue
    Delete { queue: String },

    /// Send a message and print its id
    Send { queue: String, body: String },

    /// Receive messages as JSON
    Receive {
        queue: String,
        /// Upper bound on messages returned
        #[arg(long)]
        max: Option<u32>,
        /// Seconds the messages stay hidden
        #[arg(long)]
        visibility_timeout: Option<u32>,
        /// Message attribute to include (repeatable)
        #[arg(long = "attribute")]
        attributes: Vec<String>,
        /// Delete each message after printing it
        #[arg(long)]
        delete: bool,
    },

    /// Print queue attributes as JSON
    Attributes {
        queue: String,
        /// Attribute names; defaults to All
        names: Vec<Attribute>,
    },

    /// Set one queue attribute
    SetAttribute {
        queue: String,
        name: Attribute,
        value: String,
    },
}

#[derive(Serialize)]
struct QueueSummary {
    name: String,
    url: String,
}

impl From<&Queue> for QueueSummary {
    fn from(queue: &Queue) -> Self {
        Self {
            name: queue.name().to_string(),
            url: queue.url(),
        }
    }
}

impl Args {
    /// Flags take precedence over the file and the environment
    fn apply(&self, settings: &mut Settings) {
        if let Some(access_key) = &self.access_key {
            settings.access_key = Some(access_key.clone());
        }
        if let Some(secret_key) = &self.secret_key {
            settings.secret_key = Some(secret_key.clone());
        }
        if let Some(region) = &self.region {
            settings.region = region.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            settings.endpoint = Some(endpoint.clone());
        }
        settings.debug |= self.debug;
    }

    /// Filter used when `RUST_LOG` is unset
    ///
    /// Debug mode needs the debug level, or the request and response dumps
    /// are filtered out.
    fn default_filter(&self, debug: bool) -> String {
        let level = if debug { "debug" } else { self.log_level.as_str() };
        format!("sqslite={},sqslite_auth={}", level, level)
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = Settings::load(args.config.as_deref())?;
    args.apply(&mut settings);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| args.default_filter(settings.debug).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let region = settings.region()?;
    info!(region = %region.name, endpoint = %region.sqs_endpoint(), "Using region");

    let sqs = Sqs::with_config(settings.credentials()?, region, settings.client_config())?;
    run(&sqs, args.command)
}

fn run(sqs: &Sqs, command: Command) -> anyhow::Result<()> {
    match command {
        Command::List { prefix } => {
            let queues = sqs.list_queues(prefix.as_deref())?;
            let summaries: Vec<QueueSummary> = queues.iter().map(QueueSummary::from).collect();
            print_json(&summaries)?;
        }
        Command::Create {
            name,
            visibility_timeout,
            max_message_size,
        } => {
            let options = CreateQueueOptions {
                default_visibility_timeout: visibility_timeout,
                maximum_message_size: max_message_size,
            };
            let queue = sqs.create_queue(&name, Some(&options))?;
            println!("{}", queue.url());
        }
        Command::Delete { queue } => {
            find_queue(sqs, &queue)?.delete()?;
        }
        Command::Send { queue, body } => {
            let id = find_queue(sqs, &queue)?.send_message(&body)?;
            println!("{}", id);
        }
        Command::Receive {
            queue,
            max,
            visibility_timeout,
            attributes,
            delete,
        } => {
            let queue = find_queue(sqs, &queue)?;
            let options = ReceiveOptions {
                max_messages: max,
                visibility_timeout,
                attribute_names: attributes,
            };
            let messages = queue.receive_messages(&options)?;
            print_json(&messages)?;

            if delete {
                for message in &messages {
                    queue.delete_message(&message.receipt_handle)?;
                }
            }
        }
        Command::Attributes { queue, names } => {
            let names = if names.is_empty() {
                vec![Attribute::All]
            } else {
                names
            };
            let attributes = find_queue(sqs, &queue)?.attributes(&names)?;
            print_json(&attributes)?;
        }
        Command::SetAttribute { queue, name, value } => {
            find_queue(sqs, &queue)?.set_attribute(name, &value)?;
        }
    }
    Ok(())
}

fn find_queue(sqs: &Sqs, name: &str) -> anyhow::Result<Queue> {
    sqs.queue(name)?
        .with_context(|| format!("queue {} does not exist", name))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
