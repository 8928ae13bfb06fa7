//! CLI entry point for `eudora2tbird`.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use eudora2tbird::config::{self, Config};
use eudora2tbird::convert::{convert_mailbox, ConversionStats};
use eudora2tbird::repair::RepairOptions;
use eudora2tbird::report::TracingReporter;

/// Repair an Eudora Rescue mbox and write a Thunderbird-compatible one.
#[derive(Parser)]
#[command(name = "eudora2tbird", version, subcommand_negates_reqs = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Eudora Rescue mbox to read
    #[arg(short, long, value_name = "FILE", required = true)]
    mbox: Option<PathBuf>,

    /// Thunderbird mbox to write (truncated first)
    #[arg(short, long, value_name = "FILE", required = true)]
    outmbox: Option<PathBuf>,

    /// Eudora attachment directory
    #[arg(short, long, value_name = "DIR")]
    attach: Option<PathBuf>,

    /// Eudora embedded-objects directory
    #[arg(short, long, value_name = "DIR")]
    embed: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "FILE", env = "EUDORA2TBIRD_CONFIG")]
    config: Option<PathBuf>,

    /// Print the final statistics as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Completions { shell }) => return cmd_completions(shell),
        Some(Commands::Manpage) => return cmd_manpage(),
        None => {}
    }

    let config = match &cli.config {
        Some(path) => config::load_config_from(path),
        None => config::load_config(),
    };

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    let (Some(mbox), Some(outmbox)) = (cli.mbox, cli.outmbox) else {
        anyhow::bail!("--mbox and --outmbox are required");
    };
    let options = config.repair_options(cli.attach, cli.embed);
    cmd_convert(&mbox, &outmbox, &options, cli.json)
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
        let file_appender = tracing_appender::rolling::never(&log_dir, "eudora2tbird.log");
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

/// Convert one mailbox, printing a line per message.
fn cmd_convert(
    mbox: &Path,
    outmbox: &Path,
    options: &RepairOptions,
    json: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();
    let total = std::fs::metadata(mbox).map(|m| m.len()).unwrap_or(0);

    let pb = ProgressBar::new(total);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(
                "{spinner:.green} Converting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
            )
            .expect("valid template")
            .progress_chars("#>-"),
    );
    if json {
        pb.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }

    let result = convert_mailbox(
        mbox,
        outmbox,
        options,
        &mut TracingReporter,
        &mut |message, bytes| {
            if !json {
                pb.println(message.summary.to_string());
            }
            pb.set_position(bytes);
        },
    );
    pb.finish_and_clear();
    let stats = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    } else {
        print_stats(&stats, outmbox, start.elapsed().as_secs_f64());
    }
    Ok(())
}

fn print_stats(stats: &ConversionStats, outmbox: &Path, elapsed: f64) {
    use humansize::{format_size, BINARY};

    println!();
    println!("  Conversion complete:");
    println!("  {:<25} {}", "Messages", stats.messages);
    println!("  {:<25} {}", "Embedded objects", stats.embedded);
    println!("  {:<25} {}", "Attachments", stats.attached);
    println!("  {:<25} {}", "Warnings", stats.warnings);
    println!("  {:<25} {}", "Errors", stats.errors);
    println!(
        "  {:<25} {}",
        "Input size",
        format_size(stats.input_size, BINARY)
    );
    println!(
        "  {:<25} {}",
        "Output size",
        format_size(stats.output_size, BINARY)
    );
    println!("  {:<25} {}", "Output file", outmbox.display());
    println!("  {:<25} {:.1}s", "Elapsed", elapsed);
    println!();
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "eudora2tbird", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}
