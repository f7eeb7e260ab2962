use clap::Parser;
use eyre::Result;
use microbench::{BenchArgs, ClockOverhead};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Measure the cost of reading the monotonic clock in a tight loop"
)]
struct Args {
    #[command(flatten)]
    bench: BenchArgs,
}

fn main() -> Result<()> {
    Args::parse().bench.run(&ClockOverhead)
}
