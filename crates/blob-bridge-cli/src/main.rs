use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "blob-bridge")]
#[command(about = "Copy, list and manage blobs across storage backends", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy blobs from one backend to another
    Copy {
        /// Path to a copy job file (replaces --from/--to and filter flags)
        #[arg(short, long, conflicts_with_all = ["from", "to"])]
        config: Option<String>,

        /// Source storage URL (file:///path, memory://, s3://bucket, ...)
        #[arg(long, required_unless_present = "config")]
        from: Option<String>,

        /// Destination storage URL
        #[arg(long, required_unless_present = "config")]
        to: Option<String>,

        /// Stop after this many blobs have been written (-1 for all)
        #[arg(long, default_value = "-1", allow_hyphen_values = true)]
        stop_after: i64,

        /// Only copy keys starting with this prefix (case-insensitive)
        #[arg(long)]
        prefix: Option<String>,

        /// Only copy keys ending with this suffix (case-insensitive)
        #[arg(long)]
        suffix: Option<String>,

        /// Minimum blob size in bytes
        #[arg(long)]
        min_size: Option<u64>,

        /// Maximum blob size in bytes
        #[arg(long)]
        max_size: Option<u64>,

        /// Resume the source enumeration from a previous run's token
        #[arg(long)]
        token: Option<String>,

        /// Print Prometheus metrics after the run
        #[arg(long, default_value = "false")]
        metrics: bool,
    },

    /// Delete every blob in a backend
    Empty {
        /// Storage URL to drain
        #[arg(short, long)]
        target: String,

        /// Confirm the deletion
        #[arg(long, default_value = "false")]
        yes: bool,
    },

    /// List one page of blobs
    List {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Key prefix (case-insensitive)
        #[arg(long)]
        prefix: Option<String>,

        /// Key suffix (case-insensitive)
        #[arg(long)]
        suffix: Option<String>,

        /// Continuation token from a previous page
        #[arg(long)]
        token: Option<String>,

        /// List every page instead of one
        #[arg(long, default_value = "false")]
        all: bool,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Download a blob
    Get {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Blob key
        #[arg(short, long)]
        key: String,

        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Upload a file as a blob
    Put {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Blob key
        #[arg(short, long)]
        key: String,

        /// File to upload
        #[arg(long)]
        file: String,

        /// Content type (defaults to application/octet-stream)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Delete a blob
    Delete {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Blob key
        #[arg(short, long)]
        key: String,
    },

    /// Show blob metadata
    Stat {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Blob key
        #[arg(short, long)]
        key: String,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Print the locator for a blob
    Url {
        /// Storage URL
        #[arg(short, long)]
        target: String,

        /// Blob key
        #[arg(short, long)]
        key: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    match cli.command {
        Commands::Copy {
            config,
            from,
            to,
            stop_after,
            prefix,
            suffix,
            min_size,
            max_size,
            token,
            metrics,
        } => {
            let job = match config {
                Some(path) => commands::copy::CopyJob::from_file(&path, token)?,
                None => commands::copy::CopyJob::from_args(commands::copy::CopyArgs {
                    from,
                    to,
                    stop_after,
                    prefix,
                    suffix,
                    min_size,
                    max_size,
                    token,
                })?,
            };
            commands::copy::run(job, metrics).await?;
        }
        Commands::Empty { target, yes } => {
            commands::empty::run(&target, yes).await?;
        }
        Commands::List {
            target,
            prefix,
            suffix,
            token,
            all,
            format,
        } => {
            commands::list::run(
                &target,
                prefix.as_deref(),
                suffix.as_deref(),
                token.as_deref(),
                all,
                commands::OutputFormat::from(format.as_str()),
            )
            .await?;
        }
        Commands::Get {
            target,
            key,
            output,
        } => {
            commands::blob::get(&target, &key, output.as_deref()).await?;
        }
        Commands::Put {
            target,
            key,
            file,
            content_type,
        } => {
            commands::blob::put(&target, &key, &file, content_type.as_deref()).await?;
        }
        Commands::Delete { target, key } => {
            commands::blob::delete(&target, &key).await?;
        }
        Commands::Stat {
            target,
            key,
            format,
        } => {
            commands::blob::stat(&target, &key, commands::OutputFormat::from(format.as_str()))
                .await?;
        }
        Commands::Url { target, key } => {
            commands::blob::url(&target, &key)?;
        }
    }

    Ok(())
}
