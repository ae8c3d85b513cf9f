//! vibestore - command line access to B+Trees in a data directory

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use log::info;
use std::path::PathBuf;
use vibestore::access::btree::{BTree, SearchMode};
use vibestore::access::memcomparable;
use vibestore::config::{StorageConfig, DEFAULT_BUFFER_POOL_SIZE, DEFAULT_DATA_DIR};
use vibestore::database::Database;
use vibestore::storage::page::{FileId, PageId, PageNumber};

/// Every tree the CLI touches lives in this heap file.
const CLI_FILE_ID: FileId = FileId(0);

/// vibestore - B+Tree storage engine
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Data directory
    #[arg(short = 'D', long, default_value = DEFAULT_DATA_DIR)]
    data_dir: PathBuf,

    /// Buffer pool size in pages
    #[arg(short, long, default_value_t = DEFAULT_BUFFER_POOL_SIZE)]
    pool_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new B+Tree and print its meta page number
    Create,
    /// Insert a value under a composite key
    Put {
        meta: u32,
        value: String,
        #[arg(required = true)]
        key: Vec<String>,
    },
    /// Look up the value stored under a composite key
    Get {
        meta: u32,
        #[arg(required = true)]
        key: Vec<String>,
    },
    /// Print pairs in key order, optionally starting at a key
    Scan {
        meta: u32,
        #[arg(long, num_args = 1..)]
        from: Vec<String>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = StorageConfig::new(&args.data_dir).with_buffer_pool_size(args.pool_size);
    let mut database = Database::open(config).context("Failed to open data directory")?;
    database.open_file(CLI_FILE_ID)?;

    match args.command {
        Command::Create => {
            let btree = database.create_btree(CLI_FILE_ID)?;
            database.flush()?;
            info!("Created B+Tree at {}", btree.meta_page_id());
            println!("{}", btree.meta_page_id().page_number);
        }
        Command::Put { meta, value, key } => {
            let btree = open_btree(&database, meta);
            let key = memcomparable::encode(&key);
            btree
                .insert(database.buffer_pool(), &key, value.as_bytes())
                .context("Insert failed")?;
            database.flush()?;
        }
        Command::Get { meta, key } => {
            let btree = open_btree(&database, meta);
            let key = memcomparable::encode(&key);
            match btree.get(database.buffer_pool(), &key)? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => {
                    eprintln!("not found");
                    std::process::exit(1);
                }
            }
        }
        Command::Scan { meta, from } => {
            let btree = open_btree(&database, meta);
            let mode = if from.is_empty() {
                SearchMode::Start
            } else {
                SearchMode::Key(memcomparable::encode(&from))
            };
            let iter = btree.search(database.buffer_pool(), mode)?;
            for pair in iter.scan(database.buffer_pool()) {
                let (key, value) = pair?;
                let fields = memcomparable::decode(&key)?;
                let fields: Vec<_> = fields
                    .iter()
                    .map(|field| String::from_utf8_lossy(field))
                    .collect();
                println!("{}\t{}", fields.join(" "), String::from_utf8_lossy(&value));
            }
        }
    }

    Ok(())
}

fn open_btree(database: &Database, meta: u32) -> BTree {
    database.open_btree(PageId::new(CLI_FILE_ID, PageNumber(meta)))
}
