use clap::{Parser, Subcommand};
use eyre::Result;
use microbench::{BenchArgs, ClockOverhead, PushBack, Realloc};

#[derive(Subcommand, Debug)]
pub enum MBSubcommand {
    #[command(about = "Measure the cost of reading the monotonic clock")]
    Clock(BenchArgs),
    #[command(about = "Measure the cost of appending integers to a Vec")]
    Push(BenchArgs),
    #[command(about = "Measure the cost of growing a buffer with realloc")]
    Realloc(BenchArgs),
}

#[derive(Parser, Debug)]
#[command(
    version,
    about,
    long_about = "microbench: clock-read, Vec append and realloc micro-benchmarks"
)]
pub struct MBArgs {
    #[command(subcommand)]
    pub cmd: MBSubcommand,
}

fn main() -> Result<()> {
    let root_args = MBArgs::parse();

    match root_args.cmd {
        MBSubcommand::Clock(args) => args.run(&ClockOverhead)?,
        MBSubcommand::Push(args) => args.run(&PushBack)?,
        MBSubcommand::Realloc(args) => args.run(&Realloc)?,
    }

    Ok(())
}
