//! Command-line front end for hudtext.
//!
//! `hudtext compile` shows what the compiler makes of a piece of markup;
//! `hudtext send` pushes a burst of updates through a scheduler and prints
//! what actually gets delivered.

use std::io::{IsTerminal, Read};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use console::Style;
use hudtext::{Coordinator, HudConfig, Priority, SchedulerState, StdoutTransport};
use log::LevelFilter;

#[derive(Parser)]
#[command(name = "hudtext")]
#[command(version)]
#[command(about = "Compile rich-text hints and simulate their rate-limited delivery")]
struct Cli {
    /// Log to stderr (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// YAML configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile markup and print the result with its measurements
    Compile(CompileArgs),
    /// Schedule each text in turn for one recipient and print the deliveries
    Send(SendArgs),
}

#[derive(Args)]
struct CompileArgs {
    /// Markup to compile; read from stdin when omitted
    text: Option<String>,

    /// Print only the compiled text
    #[arg(long)]
    plain: bool,
}

#[derive(Args)]
struct SendArgs {
    /// Markup to send, one update per argument
    #[arg(required = true)]
    texts: Vec<String>,

    /// Recipient name shown in the output
    #[arg(short, long, default_value = "display")]
    recipient: String,

    /// Delay requested for each update, in milliseconds
    #[arg(short, long, default_value_t = 100)]
    delay_ms: u64,

    /// Pause between successive updates, in milliseconds
    #[arg(short, long, default_value_t = 0)]
    gap_ms: u64,
}

fn init_logging(verbose: u8) {
    // Without -v, RUST_LOG still applies.
    let mut builder = env_logger::Builder::from_default_env();
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    let _ = builder.format_timestamp(None).try_init();
}

fn load_config(path: Option<&PathBuf>) -> Result<HudConfig> {
    match path {
        Some(path) => HudConfig::from_path(path)
            .with_context(|| format!("loading configuration from {}", path.display())),
        None => Ok(HudConfig::default()),
    }
}

fn read_input(text: Option<String>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    let stdin = std::io::stdin();
    if stdin.is_terminal() {
        bail!("no markup given: pass TEXT or pipe it on stdin");
    }
    let mut buffer = String::new();
    stdin
        .lock()
        .read_to_string(&mut buffer)
        .context("reading markup from stdin")?;
    Ok(buffer)
}

fn compile(config: &HudConfig, args: CompileArgs) -> Result<()> {
    let input = read_input(args.text)?;
    let compiled = hudtext::Compiler::new(config.layout).compile(&input);

    println!("{}", compiled.text);
    if args.plain {
        return Ok(());
    }

    let label = Style::new().dim();
    let overflow = if compiled.overflowed {
        Style::new().red().bold().apply_to("yes")
    } else {
        Style::new().green().apply_to("no")
    };
    println!(
        "{} {}  {} {:.2}px  {} {}",
        label.apply_to("lines:"),
        compiled.lines,
        label.apply_to("height:"),
        compiled.height,
        label.apply_to("overflow:"),
        overflow
    );
    Ok(())
}

fn send(config: HudConfig, args: SendArgs) -> Result<()> {
    let min_interval = config.schedule.min_interval();
    let hud = Coordinator::new(config, StdoutTransport);
    let delay = Duration::from_millis(args.delay_ms);
    let gap = Duration::from_millis(args.gap_ms);

    for (i, text) in args.texts.iter().enumerate() {
        if i > 0 && !gap.is_zero() {
            thread::sleep(gap);
        }
        let compiled = hud.show(&args.recipient, text, Priority::NORMAL, delay)?;
        if compiled.overflowed {
            eprintln!(
                "{} update {} overflows the display",
                Style::new().yellow().apply_to("warning:"),
                i + 1
            );
        }
    }

    // Worst case: the last request waits out its delay and one rate window.
    let patience = delay
        .saturating_add(min_interval)
        .saturating_add(Duration::from_secs(1));
    let deadline = Instant::now().checked_add(patience);
    while hud.state(&args.recipient) == Some(SchedulerState::Pending) {
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            bail!("delivery to {} did not complete in time", args.recipient);
        }
        thread::sleep(Duration::from_millis(10));
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = load_config(cli.config.as_ref())?;

    match cli.command {
        Command::Compile(args) => compile(&config, args),
        Command::Send(args) => send(config, args),
    }
}
