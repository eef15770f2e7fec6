//! softrm - a safer rm with a compressed, self-cleaning recycle bin.
//!
//! Usage:
//!   softrm [OPTION]... [FILE]...        Remove files (into the recycle bin)
//!   softrm --permanent FILE             Permanently delete
//!   softrm --list-recycle-bin           List held entries
//!   softrm --restore=PATH               Restore an entry
//!   softrm --clear-recycle-bin          Empty the recycle bin
//!   softrm --setup-recycle-bin          Interactive configuration

use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use color_eyre::eyre::{Context, Result, eyre};

use softrm_core::{BinConfig, Confirm};
use softrm_engine::{Disposal, InteractiveMode, RemovalEngine, RemovalOptions};
use softrm_store::{PurgeOutcome, RecycleStore, RestoreOutcome};

#[derive(Parser)]
#[command(
    name = "softrm",
    version,
    about = "Remove files into a compressed, self-cleaning recycle bin",
    long_about = "softrm removes the FILE(s) the way rm does, except that by default \
                  every removal lands in a recycle bin: compressed, restorable, and \
                  automatically evicted after the retention period. Use --permanent \
                  to bypass the bin and delete immediately.",
    after_help = "Examples:\n  \
                  softrm file.txt                 Move file.txt to the recycle bin\n  \
                  softrm --permanent file.txt     Permanently delete file.txt\n  \
                  softrm --list-recycle-bin       List all held entries\n  \
                  softrm --restore=file.txt       Restore file.txt to where it was\n  \
                  softrm --clear-recycle-bin      Empty the recycle bin permanently\n\n\
                  To remove a file whose name starts with a '-', use:\n  \
                  softrm -- -foo"
)]
struct Cli {
    /// Ignore nonexistent files and arguments, never prompt
    #[arg(short, long)]
    force: bool,

    /// Prompt before every removal
    #[arg(short = 'i')]
    prompt_each: bool,

    /// Prompt once before removing more than three files, or when removing
    /// recursively; less intrusive than -i
    #[arg(short = 'I')]
    prompt_once: bool,

    /// Prompt according to WHEN: never, once (-I), or always (-i); without
    /// WHEN, prompt always
    #[arg(
        long,
        value_name = "WHEN",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "always"
    )]
    interactive: Option<When>,

    /// Remove directories and their contents recursively
    #[arg(short, short_alias = 'R', long)]
    recursive: bool,

    /// Remove empty directories
    #[arg(short, long)]
    dir: bool,

    /// Explain what is being done
    #[arg(short, long)]
    verbose: bool,

    /// When removing a hierarchy recursively, skip any directory on a file
    /// system different from that of the command line argument
    #[arg(long)]
    one_file_system: bool,

    /// Do not remove '/' (default); with 'all', reject any command line
    /// argument on a separate device from its parent
    #[arg(
        long,
        value_name = "MODE",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "root"
    )]
    preserve_root: Option<PreserveRootMode>,

    /// Do not treat '/' specially
    #[arg(long)]
    no_preserve_root: bool,

    /// Permanently delete files (bypass the recycle bin)
    #[arg(long)]
    permanent: bool,

    /// List items in the recycle bin
    #[arg(long)]
    list_recycle_bin: bool,

    /// Permanently delete all items from the recycle bin
    #[arg(long)]
    clear_recycle_bin: bool,

    /// Set up the recycle bin configuration interactively
    #[arg(long)]
    setup_recycle_bin: bool,

    /// Restore a file from the recycle bin to its original location
    #[arg(long, value_name = "PATH")]
    restore: Option<String>,

    /// Override the retention period in days for this invocation
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u32).range(1..))]
    recycle_bin_days: Option<u32>,

    /// Files and directories to remove
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum When {
    Never,
    Once,
    Always,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PreserveRootMode {
    Root,
    All,
}

impl Cli {
    /// Resolve the -i / -I / --interactive=WHEN family into one mode;
    /// the explicit --interactive value wins over the short flags.
    fn interactive_mode(&self) -> InteractiveMode {
        match self.interactive {
            Some(When::Never) => InteractiveMode::Never,
            Some(When::Once) => InteractiveMode::Once,
            Some(When::Always) => InteractiveMode::Always,
            None if self.prompt_each => InteractiveMode::Always,
            None if self.prompt_once => InteractiveMode::Once,
            None => InteractiveMode::Auto,
        }
    }
}

/// Answers confirmation prompts from the terminal.
struct StdinConfirmer;

impl Confirm for StdinConfirmer {
    fn confirm(&mut self, prompt: &str) -> bool {
        print!("softrm: {prompt} ");
        let _ = std::io::stdout().flush();

        let mut line = String::new();
        if std::io::stdin().lock().read_line(&mut line).is_err() {
            return false;
        }
        matches!(line.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();

    if cli.setup_recycle_bin {
        run_setup()?;
        return Ok(ExitCode::SUCCESS);
    }

    let (mut config, existed) =
        BinConfig::load().context("failed to load recycle bin configuration")?;
    if let Some(days) = cli.recycle_bin_days {
        config.retention_days = days;
    }

    if !existed {
        println!("softrm: first-time setup detected.");
        println!("Run 'softrm --setup-recycle-bin' to configure the recycle bin.");
        config
            .save()
            .context("failed to write default configuration")?;
    }

    let store = RecycleStore::open(&config).context("failed to initialize recycle bin")?;

    if cli.clear_recycle_bin {
        return run_clear(&store);
    }
    if cli.list_recycle_bin {
        run_list(&store)?;
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(selector) = cli.restore.as_deref() {
        return run_restore(&store, selector);
    }

    // Passive age-based eviction before any disposal.
    store.evict_expired();

    if cli.files.is_empty() {
        eprintln!("softrm: missing operand");
        eprintln!("Try 'softrm --help' for more information.");
        return Ok(ExitCode::FAILURE);
    }

    run_removal(&cli, &store)
}

/// Run the removal engine over the requested targets.
fn run_removal(cli: &Cli, store: &RecycleStore) -> Result<ExitCode> {
    let options = RemovalOptions::builder()
        .force(cli.force)
        .interactive(cli.interactive_mode())
        .recursive(cli.recursive)
        .dir_mode(cli.dir)
        .one_file_system(cli.one_file_system)
        .preserve_root(!cli.no_preserve_root)
        .preserve_root_all(matches!(cli.preserve_root, Some(PreserveRootMode::All)))
        .tty(std::io::stdin().is_terminal())
        .build()?;

    let active_store = (!cli.permanent).then_some(store);

    let verbose = cli.verbose;
    let mut observer = move |path: &Path, disposal: Disposal| {
        if !verbose {
            return;
        }
        match disposal {
            Disposal::Recycled => println!("moved to recycle bin '{}'", path.display()),
            Disposal::Removed => println!("removed '{}'", path.display()),
            Disposal::Skipped => {}
        }
    };

    let mut confirmer = StdinConfirmer;
    let mut engine =
        RemovalEngine::new(options, active_store, &mut confirmer).with_observer(&mut observer);

    let report = match engine.remove_all(&cli.files) {
        Ok(report) => report,
        // Batch-level violation: nothing was disposed.
        Err(e) => {
            eprintln!("softrm: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    for (_, error) in &report.errors {
        eprintln!("softrm: {error}");
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print the recycle bin listing.
fn run_list(store: &RecycleStore) -> Result<()> {
    let entries: Vec<_> = store.entries()?.collect();
    if entries.is_empty() {
        println!("Recycle bin is empty");
        return Ok(());
    }

    println!(
        "{:<20} {:>10} {:>12} {:>8}  {}",
        "Deleted At", "Size", "Compressed", "Savings", "Original Path"
    );
    println!("{}", "─".repeat(85));

    for entry in entries {
        let deleted = entry.deleted_at.format("%Y-%m-%d %H:%M:%S").to_string();

        let (size, compressed, savings) = if entry.is_compressed && entry.original_size > 0 {
            let stored = entry.compressed_size.unwrap_or(0);
            let savings = if stored < entry.original_size {
                let ratio =
                    (entry.original_size - stored) as f64 / entry.original_size as f64 * 100.0;
                format!("{ratio:.1}%")
            } else {
                "0%".to_string()
            };
            (format_size(entry.original_size), format_size(stored), savings)
        } else {
            (
                format_size(entry.original_size),
                "No".to_string(),
                "-".to_string(),
            )
        };

        println!(
            "{deleted:<20} {size:>10} {compressed:>12} {savings:>8}  {}",
            entry.original_path.display()
        );
    }

    Ok(())
}

/// Empty the recycle bin after confirmation.
fn run_clear(store: &RecycleStore) -> Result<ExitCode> {
    let mut confirmer = StdinConfirmer;
    match store.purge(&mut confirmer)? {
        PurgeOutcome::Purged(count) => {
            println!("Cleared {count} items from recycle bin");
            Ok(ExitCode::SUCCESS)
        }
        PurgeOutcome::Cancelled => {
            println!("Operation cancelled");
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Restore one held entry to its original location.
fn run_restore(store: &RecycleStore, selector: &str) -> Result<ExitCode> {
    let mut confirmer = StdinConfirmer;
    match store.restore(selector, &mut confirmer) {
        Ok(RestoreOutcome::Restored(path)) => {
            println!("Restored '{}'", path.display());
            Ok(ExitCode::SUCCESS)
        }
        Ok(RestoreOutcome::Cancelled) => {
            println!("Restore cancelled");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            eprintln!("softrm: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

/// Interactive first-time configuration.
fn run_setup() -> Result<()> {
    println!("Setting up the recycle bin for softrm...");

    let default_path = BinConfig::default_bin_path();
    println!("Default recycle bin location: {}", default_path.display());
    print!("Use this location? (y/n) [y]: ");
    std::io::stdout().flush()?;

    let stdin = std::io::stdin();
    let mut line = String::new();
    stdin.lock().read_line(&mut line)?;

    let bin_path = if matches!(line.trim().to_lowercase().as_str(), "n" | "no") {
        print!("Enter custom recycle bin path: ");
        std::io::stdout().flush()?;
        let mut custom = String::new();
        stdin.lock().read_line(&mut custom)?;
        let custom = custom.trim();
        if custom.is_empty() {
            default_path
        } else {
            let path = PathBuf::from(custom);
            if !path.is_absolute() {
                return Err(eyre!("recycle bin path must be absolute"));
            }
            path
        }
    } else {
        default_path
    };

    print!(
        "Enter retention days (default {}): ",
        softrm_core::DEFAULT_RETENTION_DAYS
    );
    std::io::stdout().flush()?;
    let mut days_line = String::new();
    stdin.lock().read_line(&mut days_line)?;
    let retention_days = match days_line.trim().parse::<u32>() {
        Ok(days) if days > 0 => days,
        _ => softrm_core::DEFAULT_RETENTION_DAYS,
    };

    let mut config = BinConfig::new(bin_path);
    config.retention_days = retention_days;

    // Create the holding-area layout, then persist the choices.
    RecycleStore::open(&config).context("failed to create recycle bin directory")?;
    config.save().context("failed to save configuration")?;

    println!("Recycle bin setup complete!");
    println!("Location: {}", config.recycle_bin_path.display());
    println!("Retention: {} days", config.retention_days);
    Ok(())
}

/// Format a byte count in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}
