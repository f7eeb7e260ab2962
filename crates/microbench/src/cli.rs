use crate::bench::Benchmark;
use crate::clock::{Clock, ClockKind, QuantaClock, StdClock};
use crate::output::Format;
use crate::runner::{run_benchmark, Iterations, RunConfig};
use clap::Args;
use eyre::Result;
use std::io::Write;
use tracing::{debug, Level};

/// Arguments shared by every benchmark binary.
#[derive(Args, Debug, Clone)]
pub struct BenchArgs {
    #[arg(
        allow_negative_numbers = true,
        help = "Number of loop iterations, read like C atoi (absent or 0 means 1048576)"
    )]
    pub iterations: Option<String>,

    #[arg(long, value_enum, default_value_t = ClockKind::Monotonic, help = "Timestamp source")]
    pub clock: ClockKind,

    #[arg(
        long,
        default_value_t = 1,
        value_parser = clap::value_parser!(u32).range(1..),
        help = "Number of times the timed loop is repeated"
    )]
    pub runs: u32,

    #[arg(
        long,
        value_delimiter = ',',
        default_value = "95",
        value_parser = clap::value_parser!(u8).range(0..=100),
        help = "Percentiles shown when --runs is greater than 1"
    )]
    pub percentiles: Vec<u8>,

    #[arg(long, value_enum, default_value_t = Format::Table, help = "Output format")]
    pub format: Format,

    #[arg(short, long, action = clap::ArgAction::Count, help = "Log more (repeat for more detail)")]
    pub verbose: u8,
}

impl BenchArgs {
    pub fn config(&self) -> RunConfig {
        RunConfig {
            iterations: Iterations::from_arg(self.iterations.as_deref()),
            runs: self.runs,
            percentiles: self.percentiles.clone(),
            clock: self.clock,
        }
    }

    /// Runs `bench` and writes its report to stdout.
    pub fn run<B: Benchmark>(&self, bench: &B) -> Result<()> {
        init_logging(self.verbose);

        let stdout = std::io::stdout();
        let mut out = stdout.lock();

        match self.clock {
            ClockKind::Monotonic => run_monotonic(self, bench, &mut out),
            ClockKind::Quanta => self.execute(bench, &QuantaClock::new(), &mut out),
            ClockKind::Std => self.execute(bench, &StdClock::new(), &mut out),
        }
    }

    /// Runs `bench` against `clock` and writes the report to `out`.
    ///
    /// Nothing is written when the benchmark fails.
    pub fn execute<B: Benchmark, C: Clock>(
        &self,
        bench: &B,
        clock: &C,
        out: &mut dyn Write,
    ) -> Result<()> {
        let config = self.config();
        debug!(?config, "starting {}", bench.name());

        let report = run_benchmark(bench, clock, &config)?;
        self.format.reporter().report(&report, out)?;
        out.flush()?;
        Ok(())
    }
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        fn run_monotonic<B: Benchmark>(
            args: &BenchArgs,
            bench: &B,
            out: &mut dyn Write,
        ) -> Result<()> {
            args.execute(bench, &crate::clock::MonotonicClock, out)
        }
    } else {
        fn run_monotonic<B: Benchmark>(
            args: &BenchArgs,
            bench: &B,
            out: &mut dyn Write,
        ) -> Result<()> {
            tracing::warn!("CLOCK_MONOTONIC is unavailable, using std::time::Instant");
            args.execute(bench, &StdClock::new(), out)
        }
    }
}

fn log_level(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Installs a stderr logger so stdout carries only results.
pub fn init_logging(verbose: u8) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(log_level(verbose))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
