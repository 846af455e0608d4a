//! Command-line configuration.

use clap::{Args, Parser, Subcommand};

use crate::scenarios::{BenchConfig, StressSweep};

#[derive(Parser, Debug)]
#[command(
    name = "telephone_queue",
    version,
    about = "Bounded call queue with urgent-call prioritization"
)]
pub struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the scripted queue scenarios (default)
    Demo,
    /// Run one concurrent benchmark and print a CSV row
    Bench(BenchArgs),
    /// Sweep benchmark configurations and print CSV rows
    Stress(StressArgs),
}

/// Knobs shared by `bench` and `stress`.
#[derive(Args, Debug)]
pub struct WorkloadArgs {
    /// Consumer threads draining the queue
    #[arg(long, default_value_t = 4)]
    pub consumers: usize,

    /// Every n-th call id is urgent
    #[arg(long, default_value_t = 3)]
    pub urgent_every: usize,

    /// Pause between prioritize passes, in milliseconds
    #[arg(long, default_value_t = 1)]
    pub prioritize_ms: u64,

    /// Track consumed call ids and report duplicates
    #[arg(long)]
    pub validate: bool,
}

#[derive(Args, Debug)]
pub struct BenchArgs {
    /// Queue capacity
    #[arg(long, default_value_t = 8)]
    pub capacity: usize,

    /// Producer threads
    #[arg(long, default_value_t = 4)]
    pub producers: usize,

    /// Calls enqueued by each producer
    #[arg(long, default_value_t = 250)]
    pub calls_per_producer: usize,

    #[command(flatten)]
    pub workload: WorkloadArgs,
}

impl BenchArgs {
    pub fn config(&self) -> BenchConfig {
        BenchConfig {
            capacity: self.capacity,
            producers: self.producers,
            consumers: self.workload.consumers,
            calls_per_producer: self.calls_per_producer,
            urgent_every: self.workload.urgent_every,
            prioritize_ms: self.workload.prioritize_ms,
            validate: self.workload.validate,
        }
    }
}

#[derive(Args, Debug)]
pub struct StressArgs {
    /// Comma-separated queue capacities
    #[arg(long, value_delimiter = ',', default_values_t = [2usize, 8, 32])]
    pub capacities: Vec<usize>,

    /// Comma-separated producer counts
    #[arg(long, value_delimiter = ',', default_values_t = [1usize, 2, 4, 8])]
    pub producers: Vec<usize>,

    /// Comma-separated per-producer call counts
    #[arg(long, value_delimiter = ',', default_values_t = [50usize, 250])]
    pub calls_per_producer: Vec<usize>,

    #[command(flatten)]
    pub workload: WorkloadArgs,
}

impl StressArgs {
    pub fn sweep(&self) -> StressSweep {
        StressSweep {
            capacities: self.capacities.clone(),
            producers: self.producers.clone(),
            calls_per_producer: self.calls_per_producer.clone(),
            consumers: self.workload.consumers,
            urgent_every: self.workload.urgent_every,
            prioritize_ms: self.workload.prioritize_ms,
            validate: self.workload.validate,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn no_subcommand_means_demo() {
        let cli = Cli::try_parse_from(["telephone_queue"]).expect("parse");
        assert!(cli.command.is_none());
        assert!(!cli.verbose);
    }

    #[test]
    fn bench_flags_map_onto_config() {
        let cli = Cli::try_parse_from([
            "telephone_queue",
            "bench",
            "--capacity",
            "5",
            "--producers",
            "2",
            "--validate",
            "-v",
        ])
        .expect("parse");
        assert!(cli.verbose);
        let Some(Command::Bench(args)) = cli.command else {
            panic!("expected bench command");
        };
        let config = args.config();
        assert_eq!(config.capacity, 5);
        assert_eq!(config.producers, 2);
        assert_eq!(config.consumers, 4);
        assert_eq!(config.calls_per_producer, 250);
        assert!(config.validate);
    }

    #[test]
    fn stress_sets_split_on_commas() {
        let cli = Cli::try_parse_from([
            "telephone_queue",
            "stress",
            "--capacities",
            "1,4",
            "--producers",
            "3",
        ])
        .expect("parse");
        let Some(Command::Stress(args)) = cli.command else {
            panic!("expected stress command");
        };
        let sweep = args.sweep();
        assert_eq!(sweep.capacities, vec![1, 4]);
        assert_eq!(sweep.producers, vec![3]);
        assert_eq!(sweep.calls_per_producer, vec![50, 250]);
    }
}
