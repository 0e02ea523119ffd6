//! `roster` - CLI for the student roster
//!
//! This binary opens the configured database and runs either a single
//! command or an interactive shell against it.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::{self, Stdout};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use roster::cli::{Cli, Command, ConfigCommand, SearchCommand, UpdateCommand};
use roster::{init_logging, App, Config, Shell, Storage, TerminalChart, TerminalView};

type TerminalApp = App<Storage, TerminalView<Stdout>, TerminalChart<Stdout>>;

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone()).context("failed to load configuration")?;

    let command = match cli.command {
        Command::Config(config_cmd) => {
            handle_config(&config, config_cmd)?;
            return Ok(ExitCode::SUCCESS);
        }
        command => command,
    };

    let mut app = open_app(&config)?;
    match run_command(&mut app, &config, command) {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) if e.is_user_error() => {
            eprintln!("error: {e}");
            Ok(ExitCode::FAILURE)
        }
        Err(e) => Err(e.into()),
    }
}

fn open_app(config: &Config) -> anyhow::Result<TerminalApp> {
    let path = config.database_path();
    debug!("Opening database at {}", path.display());
    let storage = Storage::open(&path, config.idle_timeout())
        .with_context(|| format!("failed to open roster database {}", path.display()))?;
    let app = App::new(
        storage,
        TerminalView::stdout(),
        TerminalChart::stdout(config.display.chart_width),
    )
    .context("failed to load the roster")?;
    Ok(app)
}

fn run_command(app: &mut TerminalApp, config: &Config, command: Command) -> roster::Result<()> {
    if matches!(command, Command::Shell) {
        app.start()?;
        let shell = Shell::new(&config.export.file_name);
        return shell.run(app, io::stdin().lock(), &mut io::stdout());
    }

    app.resume()?;
    match command {
        Command::Login(cmd) => app.login(&cmd.email)?,
        Command::Logout => {
            app.logout()?;
            println!("Signed out.");
        }
        Command::Whoami(cmd) => {
            if cmd.json {
                println!("{}", serde_json::to_string_pretty(&app.session())?);
            } else {
                match app.session() {
                    Some(session) => {
                        println!("Signed in as {} ({})", session.email, session.role);
                    }
                    None => println!("Not signed in"),
                }
            }
        }
        Command::Add(cmd) => {
            app.add(cmd.to_record())?;
            println!("Added {}.", cmd.id);
        }
        Command::Update(cmd) => handle_update(app, &cmd)?,
        Command::Delete(cmd) => {
            if cmd.yes {
                if app.delete(&cmd.id)? {
                    println!("Deleted {}.", cmd.id);
                } else {
                    println!("No student with id {}.", cmd.id);
                }
            } else {
                println!("This will permanently delete {}.", cmd.id);
                println!("Use --yes to confirm.");
            }
        }
        Command::List(cmd) => app.change_page(cmd.page)?,
        Command::Search(cmd) => handle_search(app, &cmd)?,
        Command::Sort(cmd) => app.sort(cmd.column.into(), cmd.direction())?,
        Command::Export(cmd) => {
            let csv = app.export()?;
            let path = cmd
                .output
                .unwrap_or_else(|| PathBuf::from(&config.export.file_name));
            std::fs::write(&path, csv)?;
            println!(
                "Exported {} students to {}",
                app.roster().records().len(),
                path.display()
            );
        }
        Command::Chart => app.show_chart()?,
        Command::Theme(cmd) => {
            let dark = if cmd.show {
                app.is_dark()
            } else {
                app.toggle_theme()?
            };
            println!("Theme: {}", if dark { "dark" } else { "light" });
        }
        Command::Shell | Command::Config(_) => {}
    }
    Ok(())
}

fn handle_update(app: &mut TerminalApp, cmd: &UpdateCommand) -> roster::Result<()> {
    let patch = cmd.patch();
    if patch.is_empty() {
        println!("Nothing to change.");
        println!("Pass at least one of --name, --age, --grade or --email.");
        return Ok(());
    }
    let record = app.edit(&cmd.id)?;
    app.save(patch.apply(record.fields()))?;
    println!("Updated {}.", cmd.id);
    Ok(())
}

fn handle_search(app: &mut TerminalApp, cmd: &SearchCommand) -> roster::Result<()> {
    let matches = app.search(&cmd.term)?;
    if cmd.page > 1 {
        app.change_page(cmd.page)?;
    }
    println!("{matches} matching");
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Session]");
                println!(
                    "  Idle timeout (min): {}",
                    config.session.idle_timeout_minutes
                );
                println!();
                println!("[Export]");
                println!("  File name:          {}", config.export.file_name);
                println!();
                println!("[Display]");
                println!("  Chart width:        {}", config.display.chart_width);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
