// SPDX-License-Identifier: AGPL-3.0
// Phonebook CLI - command-line frontend

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use phonebook_core::{Id, SessionStore, SettingsStore};

#[derive(Parser)]
#[command(name = "phonebook")]
#[command(about = "Signpost phonebook favorites from the command line", long_about = None)]
struct Cli {
    /// Override the favorites service URL for this invocation
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with a registered mobile number
    Login {
        mobile: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the saved session
    Logout,
    /// Show the signed-in user
    Whoami,
    /// Check whether a mobile number is already registered
    CheckNumber { mobile: String },
    /// Update profile fields, e.g. `profile city=Chennai person=Raj`
    Profile {
        #[arg(value_parser = parse_field, required = true)]
        fields: Vec<(String, String)>,
    },
    /// Show favorite groups and their members
    Favorites,
    /// Manage favorite groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },
    /// Manage group members
    Member {
        #[command(subcommand)]
        action: MemberAction,
    },
}

#[derive(Subcommand)]
enum GroupAction {
    Add { name: String },
    Rename { id: Id, name: String },
    Delete { id: Id },
}

#[derive(Subcommand)]
enum MemberAction {
    /// Add a contact to one or more groups
    Add {
        name: String,
        mobile: String,
        #[arg(long = "group", required = true)]
        groups: Vec<Id>,
    },
    Edit { id: Id, name: String, mobile: String },
    Delete { id: Id },
}

/// Parse a single `key=value` profile field
fn parse_field(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid field {:?}: expected key=value", s))?;
    if key.trim().is_empty() {
        return Err(format!("invalid field {:?}: empty key", s));
    }
    Ok((key.trim().to_string(), value.to_string()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("phonebook_cli=info".parse()?)
                .add_directive("phonebook_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let mut settings = SettingsStore::new()?.get();
    if let Some(base_url) = cli.base_url {
        settings.favorites_base_url = base_url;
    }
    tracing::debug!("Favorites service: {}", settings.favorites_base_url);
    let sessions = SessionStore::new()?;

    match cli.command {
        Commands::Login { mobile, password } => {
            commands::login(&settings, &sessions, &mobile, &password).await?
        }
        Commands::Logout => sessions.sign_out()?,
        Commands::Whoami => commands::whoami(&sessions),
        Commands::CheckNumber { mobile } => commands::check_number(&settings, &mobile).await?,
        Commands::Profile { fields } => {
            commands::update_profile(&settings, &sessions, fields).await?
        }
        Commands::Favorites => {
            let store = commands::favorites_store(&settings, &sessions)?;
            store.load().await?;
            commands::print_groups(&store.snapshot());
        }
        Commands::Group { action } => {
            let store = commands::favorites_store(&settings, &sessions)?;
            match action {
                GroupAction::Add { name } => commands::add_group(&store, &sessions, &name).await?,
                GroupAction::Rename { id, name } => store.edit_group(&id, &name).await?,
                GroupAction::Delete { id } => store.delete_group(&id).await?,
            }
            commands::print_groups(&store.snapshot());
        }
        Commands::Member { action } => {
            let store = commands::favorites_store(&settings, &sessions)?;
            match action {
                MemberAction::Add { name, mobile, groups } => {
                    store.add_member_to_groups(&groups, &name, &mobile).await?
                }
                MemberAction::Edit { id, name, mobile } => {
                    store.edit_member(&id, &name, &mobile).await?
                }
                MemberAction::Delete { id } => store.delete_member(&id).await?,
            }
            commands::print_groups(&store.snapshot());
        }
    }

    Ok(())
}
