use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use falcon_registry::{
    export, init_logging, sort, FalconRegistration, Mode, NewRegistration, RegistryConfig,
    RegistryError, RegistryStore, SelectionBroker, Session, SortOrder, SqliteStore,
};
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "falcon-registry", version, about = "On-device falcon registration store")]
struct Cli {
    /// Database file (overrides config and FALCON_REGISTRY_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Config file (overrides FALCON_REGISTRY_CONFIG)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new falcon
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        breed: Option<String>,
        #[arg(long)]
        weight: Option<String>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// List every registration
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Created)]
        sort: SortArg,
    },
    /// Case-insensitive search by name
    Search { query: String },
    /// Show one registration
    Show { id: String },
    /// Audit trail of one registration
    History { id: String },
    /// Export all registrations
    Export {
        #[arg(long, value_enum, default_value_t = FormatArg::Csv)]
        format: FormatArg,
        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Created,
    Newest,
    Name,
}

impl From<SortArg> for SortOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Created => SortOrder::Created,
            SortArg::Newest => SortOrder::Newest,
            SortArg::Name => SortOrder::Name,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FormatArg {
    Csv,
    Json,
}

impl From<FormatArg> for falcon_registry::ExportFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Csv => falcon_registry::ExportFormat::Csv,
            FormatArg::Json => falcon_registry::ExportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => RegistryConfig::load_from(path),
        None => RegistryConfig::load(),
    };
    init_logging(&config.log_level());

    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path());
    let store = SqliteStore::open(&db_path)
        .with_context(|| format!("Failed to open database at {}", db_path.display()))?
        .with_actor("falcon-cli");

    let mut session = Session::new(store, SelectionBroker::new());

    match cli.command {
        Command::Register { name, breed, weight, notes } => {
            let input = NewRegistration { name, breed, weight, notes };
            match session.create(input) {
                Ok(record) => {
                    println!("✓ Registered {} ({})", record.name, record.id);
                    println!("✓ Registry contains {} falcons", session.list()?.len());
                }
                Err(RegistryError::Validation(e)) => {
                    eprintln!("❌ Missing information: {}", e);
                    std::process::exit(2);
                }
                Err(e) => return Err(e).context("Could not save registration"),
            }
        }
        Command::List { sort: order } => {
            let records = sort(session.list()?, order.into());
            print_table(&records);
        }
        Command::Search { query } => {
            session.switch_mode(Mode::Selecting);
            session.set_query(query);
            print_table(&session.visible()?);
        }
        Command::Show { id } => match session.store().find(&id)? {
            Some(record) => print_detail(&record),
            None => {
                eprintln!("❌ No falcon with id {}", id);
                std::process::exit(1);
            }
        },
        Command::History { id } => {
            let events = session.store().events_for(&id)?;
            if events.is_empty() {
                println!("No events for {}", id);
            }
            for event in events {
                println!(
                    "{}  {:<22} by {:<14} {}",
                    event.timestamp.format("%Y-%m-%d %H:%M:%S"),
                    event.event_type,
                    event.actor,
                    event.data
                );
            }
        }
        Command::Export { format, output } => {
            let records = session.list()?;
            match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    export(records, format.into(), BufWriter::new(file))?;
                    println!("✓ Exported {} falcons to {}", records.len(), path.display());
                }
                None => export(records, format.into(), io::stdout().lock())?,
            }
        }
    }

    Ok(())
}

fn print_table(records: &[FalconRegistration]) {
    if records.is_empty() {
        println!("No falcons found");
        return;
    }

    println!("{:<36}  {:<20}  {:<14}  {:>8}  {}", "ID", "NAME", "BREED", "WEIGHT", "REGISTERED");
    for r in records {
        println!(
            "{:<36}  {:<20}  {:<14}  {:>8}  {}",
            r.id,
            truncate(&r.name, 20),
            truncate(r.breed.as_deref().unwrap_or("-"), 14),
            r.weight.as_deref().unwrap_or("-"),
            r.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("\n{} falcons", records.len());
}

fn print_detail(r: &FalconRegistration) {
    println!("ID:         {}", r.id);
    println!("Name:       {}", r.name);
    println!("Breed:      {}", r.breed.as_deref().unwrap_or("-"));
    println!("Weight:     {}", r.weight.as_deref().unwrap_or("-"));
    println!("Registered: {}", r.created_at.to_rfc3339());
    if let Some(notes) = &r.notes {
        println!("Notes:");
        for line in notes.lines() {
            println!("  {}", line);
        }
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_len.saturating_sub(1)).collect();
        format!("{}…", cut)
    }
}
