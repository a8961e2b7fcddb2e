use clap::{Args as ClapArgs, Parser, Subcommand};
use kafka_batch::config::parse_option_override;
use kafka_batch::kafka::{describe_status, OutboundRecord, TopicPartitionOffset, NO_ERROR};
use kafka_batch::output::{record_to_json_line, split_key_payload, Encoding};
use kafka_batch::{create_consumer, create_producer, follow, Error, Result, Settings};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "kafka-batch")]
#[command(about = "Produce and consume Kafka records in bounded batches", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "kafka-batch.toml")]
    config: PathBuf,

    #[arg(
        short,
        long = "set",
        value_name = "NAME=VALUE",
        help = "Extra librdkafka option, applied after the file"
    )]
    set: Vec<String>,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Produce stdin lines (`key<SEP>payload`) as one batch
    Produce(ProduceArgs),
    /// Consume records and print them as JSON lines
    Consume(ConsumeArgs),
}

#[derive(ClapArgs, Debug)]
struct ProduceArgs {
    #[arg(short, long)]
    topic: String,

    #[arg(short, long, help = "Target partition; the partitioner decides when omitted")]
    partition: Option<i32>,

    #[arg(long, default_value = "\t")]
    separator: String,

    #[arg(long, value_name = "MS", help = "Flush timeout after the batch")]
    flush_timeout_ms: Option<u64>,
}

#[derive(ClapArgs, Debug)]
struct ConsumeArgs {
    #[arg(short, long = "topic", conflicts_with = "assign", required_unless_present = "assign")]
    topics: Vec<String>,

    #[arg(short, long, value_name = "TOPIC:PARTITION:OFFSET")]
    assign: Vec<String>,

    #[arg(short, long)]
    max: Option<usize>,

    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    #[arg(short, long, help = "Keep consuming until Ctrl+C")]
    follow: bool,

    #[arg(long, value_enum, default_value_t = Encoding::Utf8)]
    encoding: Encoding,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<ExitCode> {
    info!("Loading settings from {:?}", args.config);
    let settings = Settings::from_file(&args.config)?;

    let overrides = args
        .set
        .iter()
        .map(|raw| parse_option_override(raw))
        .collect::<Result<Vec<_>>>()?;
    let engine_config = settings.engine_config(&overrides)?;

    info!(
        options = engine_config.len(),
        bootstrap_servers = engine_config.get("bootstrap.servers").unwrap_or("<unset>"),
        "Configuration summary"
    );

    match args.command {
        Command::Produce(produce) => {
            let flush_timeout = produce
                .flush_timeout_ms
                .unwrap_or(settings.produce.flush_timeout_ms);
            let mut producer = create_producer(&engine_config)?
                .with_flush_timeout(Duration::from_millis(flush_timeout));

            let mut records = Vec::new();
            for line in io::stdin().lock().lines() {
                let line = line?;
                let (key, payload) = split_key_payload(&line, &produce.separator);
                records.push(OutboundRecord::new(
                    produce.topic.clone(),
                    produce.partition,
                    key.as_bytes().to_vec(),
                    payload.as_bytes().to_vec(),
                ));
            }

            let sent = producer.produce_batch(&records);
            println!("{}", sent);

            if sent < records.len() as i64 {
                warn!(sent, read = records.len(), "Not every record was accepted");
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Consume(consume) => {
            let mut consumer = create_consumer(&engine_config)?;

            let code = if consume.assign.is_empty() {
                consumer.subscribe(&consume.topics)
            } else {
                let assignments = consume
                    .assign
                    .iter()
                    .map(|raw| raw.parse::<TopicPartitionOffset>())
                    .collect::<Result<Vec<_>>>()?;
                consumer.assign(&assignments)
            };

            if code != NO_ERROR {
                error!(code, "Could not attach consumer: {}", describe_status(code));
                return Ok(ExitCode::FAILURE);
            }

            let max = consume.max.unwrap_or(settings.consume.max_records);
            let timeout = Duration::from_millis(
                consume.timeout_ms.unwrap_or(settings.consume.timeout_ms),
            );
            let encoding = consume.encoding;

            if consume.follow {
                let shutdown = async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl+C: {}", e);
                    }
                };
                follow::follow(consumer, max, timeout, shutdown, |records| {
                    print_records(&records, encoding)
                })
                .await?;
            } else {
                let records = consumer.consume_batch(max, timeout);
                match print_records(&records, encoding) {
                    Ok(()) | Err(Error::Shutdown) => {}
                    Err(e) => return Err(e),
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_records(records: &[kafka_batch::kafka::Record], encoding: Encoding) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in records {
        let line = record_to_json_line(record, encoding)?;
        if let Err(e) = writeln!(out, "{}", line) {
            // A closed pipe (e.g. `| head`) ends the run quietly.
            if e.kind() == io::ErrorKind::BrokenPipe {
                return Err(Error::Shutdown);
            }
            return Err(e.into());
        }
    }
    out.flush().or_else(|e| {
        if e.kind() == io::ErrorKind::BrokenPipe {
            Err(Error::Shutdown)
        } else {
            Err(e.into())
        }
    })
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("kafka_batch=debug,rdkafka=info,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kafka_batch=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .with_writer(io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .with_writer(io::stderr)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
