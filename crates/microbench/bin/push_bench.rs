use clap::Parser;
use eyre::Result;
use microbench::{BenchArgs, PushBack};

#[derive(Parser, Debug)]
#[command(version, about = "Measure the cost of appending integers to a Vec")]
struct Args {
    #[command(flatten)]
    bench: BenchArgs,
}

fn main() -> Result<()> {
    Args::parse().bench.run(&PushBack)
}
