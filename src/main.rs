use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use robogrid::bytecode::disassemble;
use robogrid::event::{JsonLines, NullSink};
use robogrid::mission::{MissionConfig, generate};
use robogrid::{compile, execute};

#[derive(Parser)]
#[command(name = "robogrid", about = "Compile and run robot missions on a scented grid")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a source file to bytecode.
    Compile {
        source: PathBuf,
        /// Where to write the bytecode.
        #[arg(short, long, default_value = "output.bytecode")]
        output: PathBuf,
    },
    /// Run a bytecode file, printing the event trace as JSON lines.
    Run { bytecode: PathBuf },
    /// Compile a source file and run it without writing bytecode.
    Exec { source: PathBuf },
    /// Print a listing of a bytecode file.
    Disasm { bytecode: PathBuf },
    /// Print a random mission as source text.
    Generate {
        #[command(flatten)]
        mission: MissionArgs,
        /// Write the source here instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compile and run a generated mission repeatedly, reporting throughput.
    Bench {
        #[command(flatten)]
        mission: MissionArgs,
        /// Number of compile+run cycles.
        #[arg(long, default_value_t = 10_000)]
        iterations: usize,
    },
}

#[derive(Args)]
struct MissionArgs {
    /// Random seed for reproducibility.
    #[arg(long)]
    seed: u64,

    /// Grid width.
    #[arg(long, default_value_t = 5)]
    width: u8,

    /// Grid height.
    #[arg(long, default_value_t = 3)]
    height: u8,

    /// Number of robots.
    #[arg(long, default_value_t = 3)]
    robots: usize,

    /// Commands per robot heading.
    #[arg(long, default_value_t = 12)]
    commands: usize,
}

impl From<&MissionArgs> for MissionConfig {
    fn from(args: &MissionArgs) -> Self {
        Self {
            width: args.width,
            height: args.height,
            robots: args.robots,
            commands: args.commands,
        }
    }
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    if let Err(e) = dispatch(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

/// Log to stderr so stdout stays a clean event stream. `RUST_LOG` overrides
/// the default `warn` filter.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn dispatch(cli: &Cli) -> Result<()> {
    match &cli.command {
        Command::Compile { source, output } => run_compile(source, output),
        Command::Run { bytecode } => {
            let bytes = read_bytes(bytecode)?;
            run_trace(&bytes)
        }
        Command::Exec { source } => {
            let bytes = compile_file(source)?;
            run_trace(&bytes)
        }
        Command::Disasm { bytecode } => {
            let bytes = read_bytes(bytecode)?;
            print!("{}", disassemble(&bytes));
            Ok(())
        }
        Command::Generate { mission, output } => run_generate(mission, output.as_deref()),
        Command::Bench {
            mission,
            iterations,
        } => run_benchmark(mission, *iterations),
    }
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("failed to read {}", path.display()))
}

fn compile_file(path: &Path) -> Result<Vec<u8>> {
    let source = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let bytes = compile(&source).with_context(|| format!("failed to compile {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "compiled");
    Ok(bytes)
}

fn run_compile(source: &Path, output: &Path) -> Result<()> {
    let bytes = compile_file(source)?;
    fs::write(output, &bytes).with_context(|| format!("failed to write {}", output.display()))?;
    info!(path = %output.display(), "wrote bytecode");
    Ok(())
}

fn run_trace(bytes: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut sink = JsonLines::new(stdout.lock());
    let results = execute(bytes, &mut sink)?;
    sink.into_inner().flush()?;
    info!(
        robots = results.len(),
        lost = results.iter().filter(|r| r.lost).count(),
        "run complete"
    );
    Ok(())
}

fn run_generate(args: &MissionArgs, output: Option<&Path>) -> Result<()> {
    let program = generate(&MissionConfig::from(args), args.seed);
    let source = program.to_string();
    match output {
        Some(path) => fs::write(path, source)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{source}"),
    }
    Ok(())
}

fn run_benchmark(args: &MissionArgs, iterations: usize) -> Result<()> {
    let program = generate(&MissionConfig::from(args), args.seed);
    let source = program.to_string();

    let start = std::time::Instant::now();
    let mut bytes_total = 0usize;
    let mut lost_total = 0usize;
    for _ in 0..iterations {
        let bytes = compile(&source)?;
        bytes_total += bytes.len();
        let results = execute(&bytes, &mut NullSink)?;
        lost_total += results.iter().filter(|r| r.lost).count();
    }
    let elapsed = start.elapsed();

    let runs_per_sec = iterations as f64 / elapsed.as_secs_f64();
    let robots_per_sec = (iterations * program.robots.len()) as f64 / elapsed.as_secs_f64();

    eprintln!("Benchmark results:");
    eprintln!("  Iterations:        {iterations}");
    eprintln!("  Grid:              {}x{}", program.square.w, program.square.h);
    eprintln!("  Robots per run:    {}", program.robots.len());
    eprintln!("  Bytecode bytes:    {}", bytes_total / iterations.max(1));
    eprintln!("  Robots lost:       {lost_total}");
    eprintln!("  Elapsed:           {elapsed:.2?}");
    eprintln!("  Runs/sec:          {runs_per_sec:.1}");
    eprintln!("  Robots/sec:        {robots_per_sec:.0}");
    Ok(())
}
