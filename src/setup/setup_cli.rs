use clap::{Parser, Subcommand};
use campaign_backend::config::Config;
use campaign_backend::helper::publisher::SimulatedPublisher;
use campaign_backend::helper::queue_processor::QueueProcessor;
use campaign_backend::models::db_operations::document_store::DocumentStore;
use campaign_backend::models::db_operations::{members_db_operations, queue_db_operations};
use campaign_backend::models::permissions::role_label;
use campaign_backend::models::Role;
use campaign_backend::setup::db_setup;
use chrono::Utc;
use rusqlite::Connection;
use redb::Database;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(
    name = "setup_cli",
    author,
    version,
    about = "A CLI for initial application setup.",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the .env configuration file.
    #[arg(long, required = true, value_name = "FILE")]
    env_file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Db {
        #[command(subcommand)]
        action: DbAction,
    },
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
    Queue {
        #[command(subcommand)]
        action: QueueAction,
    },
}

#[derive(Subcommand, Debug)]
enum DbAction {
    Setup {
        /// `members`, `documents`, or nothing for both.
        db_type: Option<String>,
    }
}

#[derive(Subcommand, Debug)]
enum MemberAction {
    Add {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        organization: String,
        #[arg(long)]
        name: String,
        /// admin, marketer, editor or viewer. Omit for a member without a role.
        #[arg(long)]
        role: Option<Role>,
    },
    List {
        #[arg(long)]
        organization: String,
    },
    SetRole {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        organization: String,
        /// Omit to clear the role.
        #[arg(long)]
        role: Option<Role>,
    },
    Remove {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        organization: String,
    },
}

#[derive(Subcommand, Debug)]
enum QueueAction {
    /// Pending entries, earliest first.
    List,
    /// Runs the queue processor once against the simulated publisher.
    Process,
}

fn main() {
    let cli = Cli::parse();

    let config = Config::from_env(&cli.env_file)
        .expect("FATAL: Failed to load or parse configuration.");

    env_logger::init_from_env(env_logger::Env::new().default_filter_or(&config.log_level));

    match &cli.command {
        Commands::Db { action } => match action {
            DbAction::Setup { db_type } => {
                match db_type.as_deref() {
                    Some("members") => setup_members_database(&config),
                    Some("documents") => setup_documents_database(&config),
                    Some(other) => eprintln!(
                        "❌ Error: Unknown database type '{}'. Use 'members' or 'documents'.",
                        other
                    ),
                    None => {
                        setup_members_database(&config);
                        setup_documents_database(&config);
                    }
                }
            }
        },
        Commands::Member { action } => match action {
            MemberAction::Add { user_id, organization, name, role } => {
                add_member(&config, user_id, organization, name, *role);
            }
            MemberAction::List { organization } => list_members(&config, organization),
            MemberAction::SetRole { user_id, organization, role } => {
                set_member_role(&config, user_id, organization, *role);
            }
            MemberAction::Remove { user_id, organization } => {
                remove_member(&config, user_id, organization)
            }
        },
        Commands::Queue { action } => match action {
            QueueAction::List => list_queue(&config),
            QueueAction::Process => process_queue(&config),
        },
    }
}

fn setup_members_database(config: &Config) {
    let db_path = config.members_db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Members database already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!("\nSetting up members database at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let mut conn = Connection::open(&db_path).expect("Could not create members database file.");
    match db_setup::setup_members_db(&mut conn) {
        Ok(_) => println!("✅ Members database setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up members database: {}", e),
    }
}

fn setup_documents_database(config: &Config) {
    let db_path = config.documents_db_path();
    if db_path.exists() {
        println!(
            "ℹ️ Document store already exists at '{}'. Skipping creation.",
            db_path.display()
        );
        return;
    }
    println!("\nSetting up document store at '{}'...", db_path.display());

    if let Some(parent_dir) = db_path.parent() {
        fs::create_dir_all(parent_dir).expect("Could not create database directory.");
    }

    let db = Database::create(&db_path).expect("Failed to create document store file.");
    match db_setup::setup_documents_db(&db) {
        Ok(_) => println!("✅ Document store setup completed successfully."),
        Err(e) => eprintln!("❌ Error setting up document store: {}", e),
    }
}

fn open_members(config: &Config) -> Option<Connection> {
    let db_path = config.members_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Members database not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    Some(Connection::open(&db_path).expect("Could not open members database."))
}

fn open_documents(config: &Config) -> Option<DocumentStore> {
    let db_path = config.documents_db_path();
    if !db_path.exists() {
        eprintln!(
            "❌ Error: Document store not found at '{}'. Please run `setup_cli db setup` first.",
            db_path.display()
        );
        return None;
    }
    match DocumentStore::open(&db_path) {
        Ok(store) => Some(store),
        Err(e) => {
            eprintln!("❌ Error opening document store: {}", e);
            None
        }
    }
}

fn add_member(config: &Config, user_id: &str, organization: &str, name: &str, role: Option<Role>) {
    let Some(conn) = open_members(config) else { return };
    match members_db_operations::add_member(&conn, user_id, organization, name, role) {
        Ok(_) => println!("✅ Added '{}' to '{}' as {}.", user_id, organization, role_label(role)),
        Err(e) => eprintln!("❌ Error adding member: {}", e),
    }
}

fn list_members(config: &Config, organization: &str) {
    let Some(conn) = open_members(config) else { return };
    match members_db_operations::read_members_for_organization(&conn, organization) {
        Ok(members) if members.is_empty() => println!("No members found in '{}'.", organization),
        Ok(members) => {
            println!("Members of '{}':", organization);
            for member in members {
                println!(
                    "- {} ({}) - {}",
                    member.display_name,
                    member.user_id,
                    role_label(member.role)
                );
            }
        }
        Err(e) => eprintln!("❌ Error listing members: {}", e),
    }
}

fn set_member_role(config: &Config, user_id: &str, organization: &str, role: Option<Role>) {
    let Some(conn) = open_members(config) else { return };
    match members_db_operations::update_member_role(&conn, user_id, organization, role) {
        Ok(_) => println!("✅ '{}' in '{}' is now {}.", user_id, organization, role_label(role)),
        Err(e) => eprintln!("❌ Error changing role: {}", e),
    }
}

fn remove_member(config: &Config, user_id: &str, organization: &str) {
    let Some(conn) = open_members(config) else { return };
    match members_db_operations::remove_member(&conn, user_id, organization) {
        Ok(0) => eprintln!("❌ Error: '{}' is not a member of '{}'.", user_id, organization),
        Ok(_) => println!("✅ Removed '{}' from '{}'.", user_id, organization),
        Err(e) => eprintln!("❌ Error removing member: {}", e),
    }
}

fn list_queue(config: &Config) {
    let Some(store) = open_documents(config) else { return };
    match queue_db_operations::read_pending_entries(&store) {
        Ok(entries) if entries.is_empty() => println!("The queue is empty."),
        Ok(entries) => {
            println!("Pending entries:");
            for entry in entries {
                let target = entry
                    .content_id
                    .map_or_else(|| "ad hoc".to_string(), |id| id.to_string());
                println!(
                    "- {} [{}] {} on {} for {} ({})",
                    entry.id,
                    entry.organization_id,
                    entry.scheduled_at.to_rfc3339(),
                    entry.platform,
                    entry.user_id,
                    target
                );
            }
        }
        Err(e) => eprintln!("❌ Error reading the queue: {}", e),
    }
}

fn process_queue(config: &Config) {
    let Some(store) = open_documents(config) else { return };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to start the async runtime.");

    let processor = QueueProcessor::new(store, Arc::new(SimulatedPublisher), &config.queue);
    match runtime.block_on(processor.run_once(Utc::now())) {
        Ok(report) => println!(
            "✅ Queue processed: {} completed, {} failed, {} skipped, {} not yet due, \
             {} expired claims released.",
            report.completed.len(),
            report.failed.len(),
            report.skipped,
            report.not_due,
            report.released
        ),
        Err(e) => eprintln!("❌ Error processing the queue: {}", e),
    }
}
