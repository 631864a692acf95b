//! aptpub CLI - Publish, promote, purge and restore aptly publications

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use aptpub_client::DEFAULT_TIMEOUT_SECS;
use aptpub_core::DEFAULT_DUMP_PREFIX;
use aptpub_engine::{DEFAULT_CONCURRENCY, DEFAULT_CONFIG_PATH, ReconcilePolicy};

mod commands;
mod display;
mod error;
mod exit_codes;
mod logging;

use commands::Connection;

#[derive(Parser)]
#[command(name = "aptpub")]
#[command(author = "aptpub Contributors")]
#[command(version)]
#[command(about = "Publish, promote, purge and restore aptly publications", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// aptly API URL, e.g. http://localhost:8080
    #[arg(long, env = "APTLY_URL", global = true)]
    url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS, global = true)]
    timeout: u64,

    /// Show what would change without modifying anything
    #[arg(long, global = true)]
    dry_run: bool,

    /// Log decisions
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log every request
    #[arg(short, long, global = true)]
    debug: bool,

    /// Default publish storage, e.g. s3:packages
    #[arg(long, default_value = "", global = true)]
    storage: String,

    /// API user
    #[arg(long, env = "APTLY_USER", global = true)]
    user: Option<String>,

    /// API password
    #[arg(long, env = "APTLY_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,
}

/// How publications are brought up to date
#[derive(Args, Debug, Clone, Copy)]
struct ReconcileArgs {
    /// Drop and create publications instead of updating them
    #[arg(long, conflicts_with = "no_recreate")]
    recreate: bool,

    /// Never drop a publication, even when updating it fails
    #[arg(long)]
    no_recreate: bool,

    /// Overwrite files in the package pool
    #[arg(long)]
    force_overwrite: bool,

    /// Generate Contents indexes
    #[arg(long)]
    publish_contents: bool,
}

impl From<ReconcileArgs> for ReconcilePolicy {
    fn from(args: ReconcileArgs) -> Self {
        ReconcilePolicy {
            recreate: args.recreate,
            no_recreate: args.no_recreate,
            force_overwrite: args.force_overwrite,
            publish_contents: args.publish_contents,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Publish the latest snapshots of configured mirrors and repositories
    Publish {
        /// Publisher configuration
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Only these distributions
        #[arg(long, value_delimiter = ',')]
        dists: Vec<String>,

        /// Only these publications, by full name
        #[arg(short, long, value_delimiter = ',')]
        publish: Vec<String>,

        /// Publish these architectures instead of the configured ones
        #[arg(long, value_delimiter = ',')]
        architectures: Vec<String>,

        /// Keep only the latest version of every package
        #[arg(long)]
        only_latest: bool,

        /// Only these components
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,

        #[command(flatten)]
        reconcile: ReconcileArgs,

        /// Publications published at the same time
        #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
        concurrency: usize,
    },

    /// Promote components or packages from one publication to another
    Promote {
        /// Source publication, or a pattern such as `(.*)/testing`
        #[arg(long)]
        source: String,

        /// Target publication; `{0}` refers to the source pattern's groups
        #[arg(long)]
        target: String,

        /// Only these components
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,

        /// Only these packages
        #[arg(long, value_delimiter = ',')]
        packages: Vec<String>,

        /// Show what would be promoted and exit
        #[arg(long)]
        diff: bool,

        #[command(flatten)]
        reconcile: ReconcileArgs,
    },

    /// Delete snapshots that are neither published nor the latest of their kind
    Cleanup,

    /// Save publications to YAML documents
    Dump {
        /// Only these publications, all when empty
        #[arg(short, long, value_delimiter = ',')]
        publish: Vec<String>,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        save_dir: PathBuf,

        /// File name prefix
        #[arg(short = 'x', long, default_value = DEFAULT_DUMP_PREFIX)]
        prefix: String,
    },

    /// Rebuild a publication from a dump document
    Restore {
        /// Dump document
        #[arg(short, long)]
        restore_file: PathBuf,

        /// Only these components
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,

        /// Drop and create the publication instead of updating it
        #[arg(long)]
        recreate: bool,
    },

    /// Keep only the latest version of every package in publications
    Purge {
        /// Publisher configuration, used to find repositories for --hard
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,

        /// Publications to purge
        #[arg(short, long, value_delimiter = ',', required = true)]
        publish: Vec<String>,

        /// Only these components
        #[arg(long, value_delimiter = ',')]
        components: Vec<String>,

        /// Also delete old versions from the source repositories
        #[arg(long)]
        hard: bool,

        #[command(flatten)]
        reconcile: ReconcileArgs,
    },
}

#[tokio::main]
async fn main() {
    // Setup miette for nice error display
    miette::set_panic_hook();

    let cli = Cli::parse();
    logging::init(cli.verbose, cli.debug);

    let code = match run(cli).await {
        Ok(()) => exit_codes::SUCCESS,
        Err(err) => {
            let code = err.exit_code();
            eprintln!("{:?}", miette::Report::new(err));
            code
        }
    };
    std::process::exit(code);
}

async fn run(cli: Cli) -> error::Result<()> {
    let connection = Connection {
        url: cli.url,
        timeout: cli.timeout,
        dry_run: cli.dry_run,
        storage: cli.storage,
        user: cli.user,
        password: cli.password,
    };

    match cli.command {
        Commands::Publish {
            config,
            dists,
            publish,
            architectures,
            only_latest,
            components,
            reconcile,
            concurrency,
        } => {
            commands::publish::run(
                &connection,
                &config,
                commands::publish::Selection {
                    distributions: dists,
                    publications: publish,
                    components,
                    architectures,
                },
                reconcile.into(),
                only_latest,
                concurrency,
            )
            .await
        }

        Commands::Promote {
            source,
            target,
            components,
            packages,
            diff,
            reconcile,
        } => {
            commands::promote::run(
                &connection,
                &source,
                &target,
                &components,
                &packages,
                diff,
                reconcile.into(),
            )
            .await
        }

        Commands::Cleanup => commands::cleanup::run(&connection).await,

        Commands::Dump {
            publish,
            save_dir,
            prefix,
        } => commands::dump::run(&connection, &publish, &save_dir, &prefix).await,

        Commands::Restore {
            restore_file,
            components,
            recreate,
        } => commands::restore::run(&connection, &restore_file, &components, recreate).await,

        Commands::Purge {
            config,
            publish,
            components,
            hard,
            reconcile,
        } => {
            commands::purge::run(
                &connection,
                &config,
                &publish,
                &components,
                hard,
                reconcile.into(),
            )
            .await
        }
    }
}
