//! Command-line front-end for The People DB.
//!
//! # Responsibility
//! - Map subcommands onto `ContactService` and maintenance entry points.
//! - Present not-found and validation outcomes as user messages (exit 1),
//!   storage failures as operational errors.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use peopledb_core::db::migrations::latest_version;
use peopledb_core::db::{inspect_schema, open_db, SchemaSnapshot};
use peopledb_core::{
    core_version, default_log_level, init_logging, repair_contacts_with, split_tag_list, Contact,
    ContactId, ContactPatch, ContactService, ContactServiceError, FixAction, NewContact,
    RepairOptions, SocialHandles, SqliteContactRepository,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

const NOTES_PREVIEW_CHARS: usize = 60;

#[derive(Parser)]
#[command(name = "peopledb")]
#[command(about = "Personal contact record store", long_about = None)]
#[command(version)]
struct Cli {
    /// Contact database file
    #[arg(long, global = true, env = "PEOPLEDB_PATH", default_value = "contacts.db")]
    db: PathBuf,

    /// Log level (trace|debug|info|warn|error)
    #[arg(long, global = true, env = "PEOPLEDB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off when unset
    #[arg(long, global = true, env = "PEOPLEDB_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Contact(ContactCommand),

    /// Fix corrupted social media / tag fields
    Repair {
        /// Report problems without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Bring the database schema up to date and report what changed
    Migrate,
}

#[derive(Subcommand)]
enum ContactCommand {
    /// Add a new contact
    Add {
        /// Contact name (required)
        name: String,

        #[command(flatten)]
        fields: ContactFields,
    },

    /// List all contacts ordered by name
    List,

    /// Show one contact
    Show {
        id: ContactId,

        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Edit a contact; omitted flags keep their current value
    Edit {
        id: ContactId,

        /// New name
        #[arg(long)]
        name: Option<String>,

        #[command(flatten)]
        fields: ContactFields,
    },

    /// Delete a contact permanently
    Delete { id: ContactId },

    /// Search name, nickname and tags
    Search { query: String },

    /// List contacts carrying a tag
    Filter { tag: String },

    /// List every tag in use
    Tags,

    /// Export all contacts to a timestamped CSV file
    Export {
        /// Destination directory
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
}

/// Optional contact fields shared by `add` and `edit`.
#[derive(Args)]
struct ContactFields {
    #[arg(long)]
    nickname: Option<String>,

    /// Free-form birthday
    #[arg(long)]
    birthday: Option<String>,

    #[arg(long)]
    address: Option<String>,

    /// Personality notes
    #[arg(long)]
    notes: Option<String>,

    /// Comma-separated tags; replaces the whole tag list on edit
    #[arg(long)]
    tags: Option<String>,

    /// Social handle as platform=handle (repeatable); replaces all handles on edit
    #[arg(long = "social", value_parser = parse_social)]
    social: Vec<(String, String)>,

    #[arg(long)]
    friend: Option<bool>,

    #[arg(long)]
    romantic: Option<bool>,
}

impl ContactFields {
    fn social_handles(&self) -> Option<SocialHandles> {
        if self.social.is_empty() {
            return None;
        }
        Some(self.social.iter().cloned().collect())
    }

    fn into_new_contact(self, name: String) -> NewContact {
        let social_media = self.social_handles().unwrap_or_default();
        NewContact {
            name,
            nickname: self.nickname.unwrap_or_default(),
            birthday: self.birthday.unwrap_or_default(),
            address: self.address.unwrap_or_default(),
            personality_notes: self.notes.unwrap_or_default(),
            social_media,
            tags: self.tags.as_deref().map(split_tag_list).unwrap_or_default(),
            like_as_friend: self.friend.unwrap_or(false),
            like_romantically: self.romantic.unwrap_or(false),
        }
    }

    fn into_patch(self, name: Option<String>) -> ContactPatch {
        let social_media = self.social_handles();
        ContactPatch {
            name,
            nickname: self.nickname,
            birthday: self.birthday,
            address: self.address,
            personality_notes: self.notes,
            social_media,
            tags: self.tags.as_deref().map(split_tag_list),
            like_as_friend: self.friend,
            like_romantically: self.romantic,
        }
    }
}

fn parse_social(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((platform, handle)) if !platform.trim().is_empty() => {
            Ok((platform.trim().to_string(), handle.trim().to_string()))
        }
        _ => Err(format!("expected platform=handle, got `{raw}`")),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_ref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        if let Err(err) = init_logging(level, log_dir) {
            eprintln!("warning: logging disabled: {err}");
        }
    }

    match run(cli) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Migrate => migrate(&cli.db),
        Commands::Repair { dry_run } => repair(&mut open(&cli.db)?, dry_run),
        Commands::Contact(command) => run_contact_command(&mut open(&cli.db)?, command),
    }
}

fn open(db: &Path) -> Result<Connection> {
    open_db(db).with_context(|| format!("failed to open database `{}`", db.display()))
}

fn run_contact_command(conn: &mut Connection, command: ContactCommand) -> Result<ExitCode> {
    let repo = SqliteContactRepository::try_new(conn)?;
    let mut service = ContactService::new(repo);

    match command {
        ContactCommand::Add { name, fields } => {
            match service.add(fields.into_new_contact(name)) {
                Ok(contact) => println!("Added '{}' (ID: {}).", contact.name, contact.id),
                Err(ContactServiceError::Validation(err)) => return Ok(user_error(err)),
                Err(err) => return Err(err.into()),
            }
        }
        ContactCommand::List => print_contacts(&service.list_all()?, "No contacts found."),
        ContactCommand::Show { id, json } => match service.get(id)? {
            Some(contact) if json => println!("{}", serde_json::to_string_pretty(&contact)?),
            Some(contact) => print_detail(&contact),
            None => return Ok(user_error(format!("contact {id} not found"))),
        },
        ContactCommand::Edit { id, name, fields } => {
            match service.update(id, fields.into_patch(name)) {
                Ok(Some(contact)) => println!("Updated '{}'.", contact.name),
                Ok(None) => return Ok(user_error(format!("contact {id} not found"))),
                Err(ContactServiceError::Validation(err)) => return Ok(user_error(err)),
                Err(err) => return Err(err.into()),
            }
        }
        ContactCommand::Delete { id } => {
            if !service.delete(id)? {
                return Ok(user_error(format!("contact {id} not found")));
            }
            println!("Deleted contact {id}.");
        }
        ContactCommand::Search { query } => {
            if query.trim().is_empty() {
                return Ok(user_error("please enter a search term"));
            }
            print_contacts(
                &service.search(&query)?,
                &format!("No contacts found matching '{query}'."),
            );
        }
        ContactCommand::Filter { tag } => print_contacts(
            &service.filter_by_tag(&tag)?,
            &format!("No contacts tagged '{tag}'."),
        ),
        ContactCommand::Tags => {
            let tags = service.all_tags()?;
            if tags.is_empty() {
                println!("No tags found.");
            }
            for tag in tags {
                println!("#{tag}");
            }
        }
        ContactCommand::Export { dir } => {
            let path = service.export_csv(&dir)?;
            println!("Exported to {}", path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn repair(conn: &mut Connection, dry_run: bool) -> Result<ExitCode> {
    let report = repair_contacts_with(conn, RepairOptions { dry_run })?;
    for fix in &report.fixes {
        println!(
            "contact {}: social_media={} tags={}",
            fix.id,
            fix.social_media.map_or("ok", FixAction::as_str),
            fix.tags.map_or("ok", FixAction::as_str)
        );
    }

    if report.fixed() == 0 {
        println!(
            "Database is clean, no repairs needed ({} scanned).",
            report.scanned
        );
    } else if report.dry_run {
        println!(
            "{} of {} records would be fixed.",
            report.fixed(),
            report.scanned
        );
    } else {
        println!("{} of {} records fixed.", report.fixed(), report.scanned);
    }
    Ok(ExitCode::SUCCESS)
}

fn migrate(db: &Path) -> Result<ExitCode> {
    let before = inspect_schema(db)?;
    match &before {
        Some(snapshot) => println!(
            "Current schema version {} (columns: {})",
            snapshot.version,
            snapshot.columns.join(", ")
        ),
        None => println!("No database at {}, creating it.", db.display()),
    }

    drop(open(db)?);

    println!("{}", migrate_summary(before.as_ref()));
    Ok(ExitCode::SUCCESS)
}

fn migrate_summary(before: Option<&SchemaSnapshot>) -> String {
    let outcome = match before {
        Some(snapshot) if snapshot.version == latest_version() => {
            "Database is already up to date".to_string()
        }
        _ => format!("Database migrated to schema version {}", latest_version()),
    };
    format!("{outcome} (peopledb_core {}).", core_version())
}

fn user_error(message: impl std::fmt::Display) -> ExitCode {
    eprintln!("{message}");
    ExitCode::from(1)
}

fn print_contacts(contacts: &[Contact], empty_message: &str) {
    if contacts.is_empty() {
        println!("{empty_message}");
        return;
    }
    for contact in contacts {
        print_summary(contact);
    }
    println!("({} total)", contacts.len());
}

fn print_summary(contact: &Contact) {
    let mut line = format!("[{}] {}", contact.id, contact.name);
    if !contact.nickname.is_empty() {
        line.push_str(&format!(" \"{}\"", contact.nickname));
    }
    if !contact.tags.is_empty() {
        let tags = contact
            .tags
            .iter()
            .map(|tag| format!("#{tag}"))
            .collect::<Vec<_>>();
        line.push_str(&format!("  {}", tags.join(" ")));
    }
    println!("{line}");
}

fn print_detail(contact: &Contact) {
    println!("ID:         {}", contact.id);
    println!("Name:       {}", contact.name);
    println!("Nickname:   {}", contact.nickname);
    println!("Birthday:   {}", contact.birthday);
    println!("Address:    {}", contact.address);
    println!("Notes:      {}", preview(&contact.personality_notes));
    for (platform, handle) in &contact.social_media {
        println!("Social:     {platform}: {handle}");
    }
    println!("Tags:       {}", contact.tags.join(", "));
    println!("Friend:     {}", yes_no(contact.like_as_friend));
    println!("Romantic:   {}", yes_no(contact.like_romantically));
    println!("Created:    {}", contact.created_at);
    println!("Updated:    {}", contact.updated_at);
}

fn preview(notes: &str) -> String {
    if notes.chars().count() <= NOTES_PREVIEW_CHARS {
        return notes.to_string();
    }
    let mut short = notes.chars().take(NOTES_PREVIEW_CHARS).collect::<String>();
    short.push_str("...");
    short
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

#[cfg(test)]
mod tests {
    use super::{migrate_summary, parse_social, preview, Cli, ContactFields};
    use peopledb_core::db::migrations::latest_version;
    use peopledb_core::db::SchemaSnapshot;
    use clap::Parser;

    fn fields() -> ContactFields {
        ContactFields {
            nickname: None,
            birthday: None,
            address: None,
            notes: None,
            tags: Some("work, friend".to_string()),
            social: vec![("github".to_string(), "ada".to_string())],
            friend: Some(true),
            romantic: None,
        }
    }

    #[test]
    fn parse_social_splits_platform_and_handle() {
        assert_eq!(
            parse_social("github = ada").unwrap(),
            ("github".to_string(), "ada".to_string())
        );
        assert!(parse_social("no-separator").is_err());
        assert!(parse_social("=handle").is_err());
    }

    #[test]
    fn patch_leaves_unset_flags_unprovided() {
        let patch = fields().into_patch(None);
        assert_eq!(patch.name, None);
        assert_eq!(patch.nickname, None);
        assert_eq!(patch.like_romantically, None);
        assert_eq!(patch.like_as_friend, Some(true));
        assert_eq!(
            patch.tags,
            Some(vec!["work".to_string(), "friend".to_string()])
        );
        assert_eq!(patch.social_media.map(|handles| handles.len()), Some(1));
    }

    #[test]
    fn new_contact_defaults_unset_fields() {
        let contact = fields().into_new_contact("Ada".to_string());
        assert_eq!(contact.nickname, "");
        assert!(contact.like_as_friend);
        assert!(!contact.like_romantically);
        assert_eq!(contact.tags, vec!["work", "friend"]);
    }

    #[test]
    fn preview_truncates_long_notes() {
        let long = "x".repeat(80);
        assert!(preview(&long).ends_with("..."));
        assert_eq!(preview("short"), "short");
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
        let cli = Cli::try_parse_from(["peopledb", "--db", "x.db", "edit", "3", "--nickname", ""])
            .unwrap();
        assert_eq!(cli.db.to_str(), Some("x.db"));
    }

    #[test]
    fn migrate_summary_reports_outcome_and_core_version() {
        let version = peopledb_core::core_version();

        let fresh = migrate_summary(None);
        assert!(fresh.starts_with("Database migrated to schema version"));
        assert!(fresh.contains(version));

        let current = SchemaSnapshot {
            version: latest_version(),
            columns: Vec::new(),
        };
        let unchanged = migrate_summary(Some(&current));
        assert!(unchanged.starts_with("Database is already up to date"));
        assert!(unchanged.contains(version));
    }
}
