//! recordkv CLI
//!
//! Composition root: builds the config, bootstraps the schema, then runs one
//! store operation for the chosen record kind.

use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use recordkv::backend::{LocalAdminClient, LocalDataClient};
use recordkv::config::JournalSyncStrategy;
use recordkv::record;
use recordkv::{Config, Message, PersonalInfo, RecordError, RecordKind, RecordStore, Scope};
use tracing_subscriber::{fmt, EnvFilter};

type Store = RecordStore<LocalDataClient, LocalAdminClient>;

/// recordkv CLI
#[derive(Parser, Debug)]
#[command(name = "recordkv")]
#[command(about = "Typed record storage with soft delete over a wide-column backend")]
#[command(version)]
struct Args {
    /// Project the backend instance belongs to
    #[arg(long, default_value = "dev-project")]
    project: String,

    /// Backend instance identifier
    #[arg(long, default_value = "dev-instance")]
    instance: String,

    /// Table holding the records
    #[arg(short, long, default_value = "records")]
    table: String,

    /// Column family of the scope
    #[arg(short, long, default_value = "cf1")]
    family: String,

    /// Row key prefix of the scope
    #[arg(short, long, default_value = "com.sr#test#messages")]
    prefix: String,

    /// Journal root directory
    #[arg(short, long, default_value = "./recordkv_data")]
    data_dir: String,

    /// Keep everything in memory (nothing survives the process)
    #[arg(long)]
    in_memory: bool,

    /// fsync the journal after every mutation
    #[arg(long)]
    sync_every_write: bool,

    /// Record kind to operate on
    #[arg(short, long, value_enum, default_value = "message")]
    kind: Kind,

    #[command(subcommand)]
    command: Commands,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Message,
    PersonalInfo,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a new record from a JSON body; prints the new id
    Create {
        /// Record as JSON
        json: String,
    },

    /// Print one record
    Get {
        /// Record id
        id: String,
    },

    /// Print every record of the kind in the scope
    List,

    /// Write a record at an id, creating it if absent
    Update {
        /// Record id
        id: String,

        /// Record as JSON
        json: String,
    },

    /// Soft-delete a record into the archive namespace
    Delete {
        /// Record id
        id: String,
    },

    /// Print every archived record of the kind
    Deleted,

    /// Drop the whole table (irreversible)
    DropTable,
}

fn main() -> ExitCode {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,recordkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("recordkv v{}", recordkv::VERSION);

    let mut builder = Config::builder()
        .project(&args.project)
        .instance(&args.instance)
        .table_name(&args.table)
        .column_family(&args.family)
        .key_prefix(&args.prefix);

    builder = if args.in_memory {
        builder.in_memory()
    } else {
        builder.data_dir(&args.data_dir)
    };

    if args.sync_every_write {
        builder = builder.journal_sync_strategy(JournalSyncStrategy::EveryWrite);
    }

    let config = builder.build();

    // Nothing is served unless the schema is in place
    let store = match Store::open(&config) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("Failed to start: {}", e);
            return ExitCode::from(1);
        }
    };

    let scope = config.default_scope();
    let result = match args.kind {
        Kind::Message => run::<Message>(&store, &scope, args.command),
        Kind::PersonalInfo => run::<PersonalInfo>(&store, &scope, args.command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Run one command against records of kind `R`
fn run<R: RecordKind>(store: &Store, scope: &Scope, command: Commands) -> recordkv::Result<()> {
    match command {
        Commands::Create { json } => {
            let record: R = record::unmarshal(json.as_bytes())?;
            let id = store.create_new(scope, &record)?;
            println!("{}", id);
        }
        Commands::Get { id } => {
            let stored = store.read_single(scope, R::QUALIFIER, &id)?;
            println!("{}", stored.value_lossy());
        }
        Commands::List => {
            let mut listing = serde_json::Map::new();
            for (id, payload) in store.read_all(scope, R::QUALIFIER)? {
                let mut record: R = record::unmarshal(&payload)?;
                record.assign_id(&id);
                let value = serde_json::to_value(&record).map_err(|source| RecordError::Encode {
                    kind: R::QUALIFIER,
                    source,
                })?;
                listing.insert(id, value);
            }
            println!("{}", serde_json::Value::Object(listing));
        }
        Commands::Update { id, json } => {
            let record: R = record::unmarshal(json.as_bytes())?;
            store.update(scope, &id, &record)?;
        }
        Commands::Delete { id } => {
            store.delete(scope, R::QUALIFIER, &id)?;
        }
        Commands::Deleted => {
            for stored in store.read_all_deleted(R::QUALIFIER)? {
                println!("{} = {};{}", stored.row_key, stored.value_lossy(), stored.timestamp);
            }
        }
        Commands::DropTable => {
            let signal = store.tear_down()?;
            tracing::info!("{}", signal);
        }
    }
    Ok(())
}

/// Map an outcome to a process exit code
fn exit_code(error: &RecordError) -> u8 {
    match error {
        RecordError::StartupFatal { .. } | RecordError::Config(_) => 1,
        RecordError::NotFound { .. } => 2,
        RecordError::Decode { .. } | RecordError::Encode { .. } => 3,
        RecordError::Transport(_) => 4,
    }
}
