//! pagedb - load, scan and inspect heap table files

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser as ClapParser, Subcommand};
use log::info;
use pagedb::access::{TableFile, Tuple};
use pagedb::config::{DbConfig, DEFAULT_BUFFER_POOL_PAGES, DEFAULT_PAGE_SIZE};
use pagedb::database::Database;
use pagedb::storage::page::PageId;
use rand::Rng;
use std::path::PathBuf;

/// pagedb - a page store with strict two-phase locking
#[derive(ClapParser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of pages the buffer pool caches
    #[arg(short = 'p', long, default_value_t = DEFAULT_BUFFER_POOL_PAGES)]
    pool_pages: usize,

    /// Page size in bytes
    #[arg(short = 's', long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(ClapArgs, Debug)]
struct TableArgs {
    /// Table file
    file: PathBuf,

    /// Number of 4-byte integer columns per row
    #[arg(short, long, default_value = "2")]
    columns: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Append random rows to a table file in one transaction
    Insert {
        #[command(flatten)]
        table: TableArgs,

        /// Number of rows to insert
        #[arg(short = 'n', long, default_value = "100")]
        rows: usize,
    },
    /// Print every row of a table file
    Scan {
        #[command(flatten)]
        table: TableArgs,
    },
    /// Show page count and slot occupancy of a table file
    Info {
        #[command(flatten)]
        table: TableArgs,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = DbConfig::default()
        .with_buffer_pool_pages(args.pool_pages)
        .with_page_size(args.page_size);
    let db = Database::new(config).context("Invalid configuration")?;

    match args.command {
        Command::Insert { table, rows } => insert(&db, &table, rows),
        Command::Scan { table } => scan(&db, &table),
        Command::Info { table } => show_info(&db, &table),
    }
}

fn open(db: &Database, table: &TableArgs) -> Result<pagedb::catalog::TableId> {
    let name = table
        .file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "table".to_string());
    db.open_table(&table.file, &name, table.columns * 4)
        .with_context(|| format!("Failed to open table file {}", table.file.display()))
}

fn insert(db: &Database, table: &TableArgs, rows: usize) -> Result<()> {
    let table_id = open(db, table)?;
    let mut rng = rand::thread_rng();

    let txn = db.begin();
    for _ in 0..rows {
        let values: Vec<i32> = (0..table.columns).map(|_| rng.gen_range(0..1000)).collect();
        txn.insert_tuple(table_id, &mut Tuple::from_ints(&values))
            .context("Insert failed")?;
    }
    txn.commit().context("Commit failed")?;

    info!("inserted {} rows into {}", rows, table.file.display());
    Ok(())
}

fn scan(db: &Database, table: &TableArgs) -> Result<()> {
    let table_id = open(db, table)?;

    let txn = db.begin();
    let mut count = 0;
    for tuple in txn.scan(table_id)? {
        let tuple = tuple.context("Scan failed")?;
        let values: Vec<String> = tuple.ints().iter().map(|v| v.to_string()).collect();
        match tuple.record_id {
            Some(record_id) => println!("{}\t{}", record_id, values.join("\t")),
            None => println!("-\t{}", values.join("\t")),
        }
        count += 1;
    }
    txn.commit()?;

    println!("({} rows)", count);
    Ok(())
}

fn show_info(db: &Database, table: &TableArgs) -> Result<()> {
    let table_id = open(db, table)?;
    let file = db.catalog().table_file(table_id)?;
    let num_pages = file.num_pages()?;

    println!("file:           {}", table.file.display());
    println!("page size:      {}", file.page_size());
    println!("tuple width:    {}", file.tuple_width());
    println!("pages:          {}", num_pages);

    let mut used = 0;
    let mut total = 0;
    for page_no in 0..num_pages {
        let page = file.read_page(PageId::new(table_id, page_no))?;
        let page_used = page.num_slots() - page.num_empty_slots();
        println!("  page {:>4}: {:>4}/{} slots used", page_no, page_used, page.num_slots());
        used += page_used;
        total += page.num_slots();
    }
    println!("occupancy:      {}/{} slots", used, total);
    Ok(())
}
