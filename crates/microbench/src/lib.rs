//! Micro-benchmarks for the cost of reading a monotonic clock, appending to a
//! `Vec`, and growing an allocation one element at a time with `realloc`.
//!
//! Each benchmark is a single timed loop. The binaries (`clock-overhead`,
//! `push-bench`, `realloc-bench` and the combined `microbench`) print the
//! clock in use and one result line:
//!
//! ```text
//! Using CLOCK_MONOTONIC, resolution: 1 nsec
//! 1048576 reallocs in 10554 usec
//! ```

pub mod alloc;
pub mod bench;
pub mod cli;
pub mod clock;
pub mod output;
pub mod runner;
pub mod stats;

pub use bench::{Benchmark, ClockOverhead, GrowBuffer, PushBack, Realloc};
pub use cli::BenchArgs;
pub use clock::{Clock, ClockKind, QuantaClock, StdClock, Timestamp};
pub use output::{BenchReport, Format, Reporter};
pub use runner::{run_benchmark, Iterations, RunConfig, DEFAULT_ITERATIONS};
pub use stats::{RunStats, StatsSummary};

#[cfg(unix)]
pub use clock::MonotonicClock;

cfg_if::cfg_if! {
    if #[cfg(feature = "alloc-count")] {
        // Counts every allocation made by the process so reports can include
        // allocator activity.
        #[global_allocator]
        static GLOBAL: alloc::CountingAllocator = alloc::CountingAllocator;
    }
}
