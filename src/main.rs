use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;

use shortvault::config::{StaticConfig, init_config};
use shortvault::errors::StoreError;
use shortvault::services::{DeletionToken, EntryStore};
use shortvault::storage::{Entry, Visitor};
use shortvault::system::init_logging;
use shortvault::utils::TimeParser;

mod cli;

use cli::{Cli, Commands, ConfigCommands};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<StoreError>() {
            Some(err) => eprintln!("{}", err.format_colored()),
            None => eprintln!("{} {:#}", "[ERROR]".red().bold(), e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let command = match cli.command {
        Commands::Config { action } => return run_config_command(&action),
        command => command,
    };

    let config = init_config(cli.config.as_deref())?;
    let _guard = init_logging(&config.logging)?;

    let store = EntryStore::from_config(&config).await?;
    let result = run_store_command(&store, command).await;
    store.close().await?;
    result
}

fn run_config_command(action: &ConfigCommands) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Generate { output_path, force } => {
            let path = output_path.as_deref().unwrap_or("config.example.toml");
            if std::path::Path::new(path).exists() && !force {
                bail!("{} already exists, use --force to overwrite", path);
            }
            StaticConfig::default()
                .save_to_file(path)
                .with_context(|| format!("unable to write configuration file {}", path))?;
            println!(
                "{} Configuration file generated: {}",
                "✓".bold().green(),
                path.blue()
            );
            Ok(())
        }
    }
}

async fn run_store_command(store: &EntryStore, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Create {
            url,
            id,
            password,
            expire,
            provider,
            owner,
            remote_addr,
        } => {
            let mut entry = Entry::new(url).with_owner(provider, owner);
            if let Some(addr) = remote_addr {
                entry = entry.with_remote_addr(addr);
            }
            if let Some(expire) = expire {
                let at = TimeParser::parse_expire_time(&expire)
                    .map_err(|e| anyhow::anyhow!("invalid --expire value: {}", e))?;
                entry = entry.with_expiration(at);
            }

            let (id, token) = store
                .create_entry(entry, id.as_deref(), password.as_deref())
                .await?;
            println!("{} Created entry {}", "✓".bold().green(), id.cyan());
            println!("  {} {}", "Deletion token:".bold(), token.to_string().yellow());
        }

        Commands::Get { id } => {
            let entry = store.get_entry_by_id(&id).await?;
            print_entry(&id, &entry);
        }

        Commands::Visit {
            id,
            ip,
            referer,
            user_agent,
            password,
        } => {
            let entry = store.get_entry_by_id(&id).await?;
            if entry.is_password_protected()
                && !store.check_password(&entry, password.as_deref().unwrap_or(""))?
            {
                return Err(StoreError::authorization_failed("wrong password").into());
            }

            let visitor = Visitor::new(ip)
                .with_referer(referer)
                .with_user_agent(user_agent);
            let entry = store.record_visit(&id, &visitor).await?;
            println!(
                "{} {} -> {} (visit #{})",
                "→".bold().blue(),
                id.cyan(),
                entry.public.url.blue().underline(),
                entry.public.visit_count
            );
        }

        Commands::Delete { id, token } => {
            let token = DeletionToken::from_base64(&token)?;
            store.delete_entry(&id, token.as_bytes()).await?;
            println!("{} Deleted entry {}", "✓".bold().green(), id.cyan());
        }

        Commands::Token { id } => {
            println!("{}", store.deletion_token(&id));
        }

        Commands::Visitors { id } => {
            let visitors = store.get_visitors(&id).await?;
            if visitors.is_empty() {
                println!("{} No visits recorded for {}", "ℹ".bold().blue(), id.cyan());
            }
            for v in visitors {
                println!(
                    "{}  {}  {}  {}",
                    v.timestamp.format("%Y-%m-%d %H:%M:%S").to_string().yellow(),
                    v.ip,
                    v.referer.dimmed(),
                    v.user_agent.dimmed()
                );
            }
        }

        Commands::List { provider, owner } => {
            let entries = match (provider, owner) {
                (Some(provider), Some(owner)) => store.get_owner_entries(&provider, &owner).await?,
                _ => store.get_all_entries().await?,
            };
            let mut ids: Vec<_> = entries.keys().cloned().collect();
            ids.sort();
            for id in ids {
                if let Some(entry) = entries.get(&id) {
                    print_entry(&id, entry);
                }
            }
            println!(
                "{} {} entries ({} backend)",
                "ℹ".bold().blue(),
                entries.len(),
                store.backend_name()
            );
        }

        Commands::Config { .. } => bail!("config commands do not use the store"),
    }

    Ok(())
}

fn print_entry(id: &str, entry: &Entry) {
    let public = &entry.public;
    println!("{} -> {}", id.cyan(), public.url.blue().underline());
    println!("  created:  {}", public.created_on.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  visits:   {}", public.visit_count);
    if let Some(addr) = &entry.remote_addr {
        println!("  from:     {}", addr);
    }
    if let Some(last) = public.last_visit {
        println!("  last:     {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(exp) = public.expiration {
        let label = if entry.is_expired() {
            "expired".red()
        } else {
            "expires".yellow()
        };
        println!("  {}:  {}", label, exp.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if entry.is_password_protected() {
        println!("  {}", "password protected".magenta());
    }
}
