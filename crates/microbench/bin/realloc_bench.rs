use clap::Parser;
use eyre::Result;
use microbench::{BenchArgs, Realloc};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Measure the cost of growing a buffer one element at a time with realloc"
)]
struct Args {
    #[command(flatten)]
    bench: BenchArgs,
}

fn main() -> Result<()> {
    Args::parse().bench.run(&Realloc)
}
