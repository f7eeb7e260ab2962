use crate::bench::Benchmark;
use crate::clock::{Clock, ClockKind};
use crate::output::BenchReport;
use crate::stats::RunStats;
use eyre::Result;
use tracing::{debug, info};

/// Loop count used when none (or zero) is given on the command line.
pub const DEFAULT_ITERATIONS: u32 = 1 << 20;

/// Iteration count argument. Absent or zero falls back to [`DEFAULT_ITERATIONS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Iterations(u32);

impl Iterations {
    pub fn new(count: u32) -> Self {
        if count == 0 {
            Self(DEFAULT_ITERATIONS)
        } else {
            Self(count)
        }
    }

    /// Parses a command-line argument the way C `atoi` does: optional leading
    /// whitespace and sign, then as many digits as present. Anything else
    /// reads as zero, which selects the default.
    pub fn from_arg(arg: Option<&str>) -> Self {
        Self::new(arg.map_or(0, atoi))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

fn atoi(arg: &str) -> u32 {
    let s = arg.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let value = digits
        .bytes()
        .take_while(u8::is_ascii_digit)
        .fold(0i64, |acc, d| {
            acc.saturating_mul(10).saturating_add(i64::from(d - b'0'))
        });

    // negative values wrap like the C conversion to `unsigned`
    if negative {
        value.wrapping_neg() as u32
    } else {
        value as u32
    }
}

#[derive(Clone, Debug)]
pub struct RunConfig {
    pub iterations: Iterations,
    pub runs: u32,
    pub percentiles: Vec<u8>,
    pub clock: ClockKind,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            iterations: Iterations::new(0),
            runs: 1,
            percentiles: vec![95],
            clock: ClockKind::default(),
        }
    }
}

/// Runs `bench` against `clock` as configured and collects the results.
pub fn run_benchmark<B: Benchmark, C: Clock>(
    bench: &B,
    clock: &C,
    config: &RunConfig,
) -> Result<BenchReport> {
    let iterations = config.iterations.get();
    let resolution = clock.resolution()?;
    debug!(
        clock = clock.description(),
        resolution_ns = resolution.as_nanos() as u64,
        "clock ready"
    );

    let mut stats = RunStats::new()?;

    #[cfg(feature = "alloc-count")]
    let alloc_before = crate::alloc::AllocSnapshot::take();

    for run in 0..config.runs.max(1) {
        let elapsed = bench.run(clock, iterations)?;
        debug!(
            benchmark = bench.name(),
            run,
            elapsed_ns = elapsed.as_nanos() as u64,
            "run finished"
        );
        stats.record(elapsed)?;
    }

    cfg_if::cfg_if! {
        if #[cfg(feature = "alloc-count")] {
            let alloc = Some(crate::alloc::AllocSnapshot::take().since(&alloc_before));
        } else {
            let alloc = None;
        }
    }

    let summary = stats.summary(iterations, &config.percentiles);
    info!(
        benchmark = bench.name(),
        iterations,
        runs = summary.runs,
        avg_ns = summary.avg_ns,
        "benchmark complete"
    );

    Ok(BenchReport {
        benchmark: bench.name(),
        operation: bench.operation(clock),
        iterations,
        clock: config.clock,
        clock_description: clock.description(),
        resolution_ns: resolution.as_nanos() as u64,
        elapsed_usec: stats.avg().as_micros() as u64,
        stats: summary,
        alloc,
    })
}
