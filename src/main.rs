//! CLI entry point for `mailgrab`.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailgrab::config::{self, Config};
use mailgrab::extract::Extractor;
use mailgrab::harvest::{self, HarvestRequest};
use mailgrab::mailbox::imap::ImapMailbox;
use mailgrab::mailbox::local::{LocalMailbox, LOCAL_FOLDER};
use mailgrab::mailbox::{Credentials, Mailbox};
use mailgrab::model::outcome::RunSummary;
use mailgrab::parser::filename::ExtensionFilter;

/// Download every attachment from a mailbox label into one folder.
///
/// Attachments with identical content under the same name are stored
/// once; different content under a taken name is stored as `name(n).ext`.
/// Existing files are never overwritten.
#[derive(Parser)]
#[command(name = "mailgrab", version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Config file (defaults to $MAILGRAB_CONFIG or the user config dir)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the final summary as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Download attachments from a mailbox label (default)
    Fetch(FetchArgs),
    /// List the folders/labels of the account
    Labels(ConnectArgs),
    /// Extract attachments from local .eml files
    Extract {
        /// Message files, processed in the order given
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Show the effective configuration
    Config {
        /// Write it to the standard config location
        #[arg(long)]
        write: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

#[derive(Args, Default)]
struct ConnectArgs {
    /// IMAP server host
    #[arg(long)]
    host: Option<String>,

    /// IMAP server port (TLS)
    #[arg(long)]
    port: Option<u16>,

    /// Login name (prompted for when missing)
    #[arg(short, long, env = "MAILGRAB_USER")]
    user: Option<String>,
}

#[derive(Args, Default)]
struct TargetArgs {
    /// Output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Only keep attachments with these extensions (repeatable or comma-separated, e.g. --ext .jpg,.gif)
    #[arg(long = "ext", value_name = "EXT", value_delimiter = ',')]
    extensions: Vec<String>,
}

#[derive(Args, Default)]
struct FetchArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    #[command(flatten)]
    target: TargetArgs,

    /// Folder or label to read
    #[arg(short, long)]
    label: Option<String>,

    /// IMAP SEARCH criteria
    #[arg(long)]
    query: Option<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_config(cli.config.as_deref());

    let log_level = match cli.verbose {
        0 => config.general.log_level.clone(),
        1 => "info".to_string(),
        2 => "debug".to_string(),
        _ => "trace".to_string(),
    };
    setup_logging(&log_level, &config);

    match cli.command {
        Some(Commands::Fetch(args)) => cmd_fetch(args, &mut config, cli.json),
        None => cmd_fetch(FetchArgs::default(), &mut config, cli.json),
        Some(Commands::Labels(args)) => cmd_labels(args, &mut config),
        Some(Commands::Extract { files, target }) => {
            cmd_extract(files, target, &mut config, cli.json)
        }
        Some(Commands::Config { write }) => cmd_config(&config, write),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::log_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailgrab.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Fold command-line overrides into the loaded configuration.
fn apply_connect_args(args: ConnectArgs, config: &mut Config) {
    if let Some(host) = args.host {
        config.imap.host = host;
    }
    if let Some(port) = args.port {
        config.imap.port = port;
    }
    if args.user.is_some() {
        config.imap.username = args.user;
    }
}

fn apply_target_args(args: TargetArgs, config: &mut Config) {
    if let Some(output) = args.output {
        config.extract.output_dir = output;
    }
    if !args.extensions.is_empty() {
        config.extract.extensions = args.extensions;
    }
}

/// Ask for whatever credentials the config and environment did not supply.
fn read_credentials(config: &Config) -> anyhow::Result<Credentials> {
    let configured = config
        .imap
        .username
        .clone()
        .or_else(|| std::env::var("MAILGRAB_USER").ok());
    let username = match configured {
        Some(user) => user,
        None => {
            print!("Enter your username for {}: ", config.imap.host);
            std::io::stdout().flush()?;
            let mut line = String::new();
            std::io::stdin()
                .read_line(&mut line)
                .context("Could not read username")?;
            line.trim().to_string()
        }
    };
    if username.is_empty() {
        anyhow::bail!("A username is required");
    }

    let secret = match std::env::var("MAILGRAB_PASSWORD") {
        Ok(secret) => secret,
        Err(_) => rpassword::prompt_password("Enter your password: ")
            .context("Could not read password")?,
    };

    Ok(Credentials::new(username, secret))
}

fn connect(config: &Config) -> anyhow::Result<ImapMailbox> {
    let credentials = read_credentials(config)?;
    let mailbox = ImapMailbox::connect(&config.imap, &credentials)?;
    println!("  Logged in as {}", credentials.username);
    Ok(mailbox)
}

/// Download attachments from the configured label.
fn cmd_fetch(args: FetchArgs, config: &mut Config, json: bool) -> anyhow::Result<()> {
    apply_connect_args(args.connect, config);
    apply_target_args(args.target, config);
    if let Some(label) = args.label {
        config.imap.label = label;
    }
    if let Some(query) = args.query {
        config.imap.search_query = query;
    }

    let mut mailbox = connect(config)?;
    let request = HarvestRequest {
        label: &config.imap.label,
        query: &config.imap.search_query,
    };
    run_harvest(&mut mailbox, request, config, json)
}

/// Run the extractor over local message files.
fn cmd_extract(
    files: Vec<PathBuf>,
    target: TargetArgs,
    config: &mut Config,
    json: bool,
) -> anyhow::Result<()> {
    apply_target_args(target, config);
    for file in &files {
        if !file.exists() {
            anyhow::bail!("File not found: {}", file.display());
        }
    }

    let mut mailbox = LocalMailbox::new(files);
    let request = HarvestRequest {
        label: LOCAL_FOLDER,
        query: "ALL",
    };
    run_harvest(&mut mailbox, request, config, json)
}

fn run_harvest<M: Mailbox>(
    mailbox: &mut M,
    request: HarvestRequest<'_>,
    config: &Config,
    json: bool,
) -> anyhow::Result<()> {
    let output_dir = &config.extract.output_dir;
    let mut extractor = Extractor::new(output_dir, config.extract.filter())
        .with_context(|| format!("Could not prepare {}", output_dir.display()))?;

    println!(
        "  Reading \"{}\" into {}{}",
        request.label,
        output_dir.display(),
        describe_filter(extractor.filter())
    );

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Fetching [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let summary = harvest::harvest(
        mailbox,
        &mut extractor,
        request,
        &|current, total| {
            pb.set_length(total as u64);
            pb.set_position(current as u64);
        },
        &mut |id, outcome| {
            if !json {
                pb.println(format!("  [{id}] {outcome}"));
            }
        },
    )?;

    pb.finish_and_clear();

    if json {
        print_summary_json(&summary)?;
    } else {
        print_summary_table(&summary, output_dir);
    }
    Ok(())
}

fn describe_filter(filter: &ExtensionFilter) -> String {
    if filter.is_empty() {
        String::new()
    } else {
        format!(" (only {})", filter.suffixes().join(", "))
    }
}

/// List the account's folders/labels.
fn cmd_labels(args: ConnectArgs, config: &mut Config) -> anyhow::Result<()> {
    apply_connect_args(args, config);
    let mut mailbox = connect(config)?;
    let labels = mailbox.list_folders();
    if let Err(e) = mailbox.logout() {
        tracing::warn!(error = %e, "Could not release mailbox session");
    }

    println!();
    for label in labels? {
        println!("  {label}");
    }
    println!();
    Ok(())
}

/// Print (and optionally save) the effective configuration.
fn cmd_config(config: &Config, write: bool) -> anyhow::Result<()> {
    if write {
        let path = config::save_config(config)?;
        println!("  Wrote {}", path.display());
    } else {
        print!("{}", toml::to_string_pretty(config)?);
    }
    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailgrab", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}

/// Print the run summary in a human-readable table.
fn print_summary_table(summary: &RunSummary, output_dir: &Path) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  Done:");
    println!("  {:<25} {}", "Messages found", summary.messages_found);
    println!("  {:<25} {}", "Messages processed", summary.messages_processed);
    if summary.messages_failed > 0 {
        println!("  {:<25} {}", "Messages failed", summary.messages_failed);
    }
    println!("  {:<25} {}", "Stored", summary.stored);
    println!("  {:<25} {}", "Stored renamed", summary.renamed);
    println!("  {:<25} {}", "Duplicates skipped", summary.duplicates);
    println!("  {:<25} {}", "Already on disk", summary.exists);
    if summary.exists_conflicting > 0 {
        println!(
            "  {:<25} {}",
            "  ...with other content", summary.exists_conflicting
        );
    }
    if summary.filtered > 0 {
        println!("  {:<25} {}", "Filtered out", summary.filtered);
    }
    if summary.empty > 0 {
        println!("  {:<25} {}", "Empty payloads", summary.empty);
    }
    if summary.undecodable > 0 {
        println!("  {:<25} {}", "Undecodable payloads", summary.undecodable);
    }
    if summary.failed > 0 {
        println!("  {:<25} {}", "Failed to store", summary.failed);
    }
    println!(
        "  {:<25} {}",
        "Written",
        format_size(summary.bytes_written, BINARY)
    );
    println!("  {:<25} {}", "Output directory", output_dir.display());
    println!();
}

/// Print the run summary as JSON.
fn print_summary_json(summary: &RunSummary) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(summary)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ext_accepts_commas_and_repeats() {
        let cli = Cli::try_parse_from([
            "mailgrab", "extract", "a.eml", "--ext", ".jpg,.gif", "--ext", ".png",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Extract { files, target }) => {
                assert_eq!(files, vec![PathBuf::from("a.eml")]);
                assert_eq!(target.extensions, vec![".jpg", ".gif", ".png"]);
            }
            _ => panic!("expected extract"),
        }
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
