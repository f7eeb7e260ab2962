use crate::alloc::{format_bytes, AllocSnapshot};
use crate::clock::ClockKind;
use crate::stats::StatsSummary;
use clap::ValueEnum;
use colored::*;
use eyre::Result;
use prettytable::{Cell, Row, Table};
use serde::Serialize;
use std::io::Write;
use std::time::Duration;

/// Everything measured by one benchmark invocation.
///
/// Serialized as-is by the JSON reporters.
#[derive(Debug, Clone, Serialize)]
pub struct BenchReport {
    pub benchmark: &'static str,
    pub operation: String,
    pub iterations: u32,
    pub clock: ClockKind,
    pub clock_description: &'static str,
    pub resolution_ns: u64,
    /// Elapsed wall-clock time of the loop; the average when several runs were made.
    pub elapsed_usec: u64,
    pub stats: StatsSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alloc: Option<AllocSnapshot>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Format {
    #[default]
    Table,
    Json,
    JsonPretty,
}

impl Format {
    pub fn reporter(self) -> Box<dyn Reporter> {
        match self {
            Format::Table => Box::new(TableReporter),
            Format::Json => Box::new(JsonReporter),
            Format::JsonPretty => Box::new(JsonPrettyReporter),
        }
    }
}

/// Renders a [`BenchReport`].
///
/// # Examples
///
/// ```rust
/// use microbench::{BenchReport, Reporter};
/// use std::io::Write;
///
/// struct OneLine;
///
/// impl Reporter for OneLine {
///     fn report(&self, report: &BenchReport, out: &mut dyn Write) -> eyre::Result<()> {
///         writeln!(out, "{}={}us", report.benchmark, report.elapsed_usec)?;
///         Ok(())
///     }
/// }
/// ```
pub trait Reporter {
    fn report(&self, report: &BenchReport, out: &mut dyn Write) -> Result<()>;
}

pub struct TableReporter;

impl Reporter for TableReporter {
    fn report(&self, report: &BenchReport, out: &mut dyn Write) -> Result<()> {
        writeln!(
            out,
            "Using {}, resolution: {} nsec",
            report.clock_description, report.resolution_ns
        )?;
        writeln!(
            out,
            "{} {} in {} usec",
            report.iterations, report.operation, report.elapsed_usec
        )?;

        if report.stats.runs > 1 {
            writeln!(
                out,
                "{} {} - {} runs",
                "[microbench]".blue().bold(),
                report.benchmark.yellow().bold(),
                report.stats.runs
            )?;
            write!(out, "{}", summary_table(&report.stats))?;
        }

        if let Some(alloc) = report.alloc {
            writeln!(
                out,
                "{} allocator: {} allocs, {} reallocs, {} deallocs, {} requested",
                "[microbench]".blue().bold(),
                alloc.allocs,
                alloc.reallocs,
                alloc.deallocs,
                format_bytes(alloc.bytes_requested)
            )?;
        }

        Ok(())
    }
}

fn summary_table(stats: &StatsSummary) -> Table {
    let mut table = Table::new();

    let mut header = vec![Cell::new("Runs"), Cell::new("Min"), Cell::new("Avg")];
    for (p, _) in &stats.percentiles {
        header.push(Cell::new(&format!("P{}", p)));
    }
    header.push(Cell::new("Max"));
    header.push(Cell::new("ns/iter"));
    table.add_row(Row::new(header));

    let mut row = vec![
        Cell::new(&stats.runs.to_string()),
        Cell::new(&format!("{:.2?}", Duration::from_nanos(stats.min_ns))),
        Cell::new(&format!("{:.2?}", Duration::from_nanos(stats.avg_ns))),
    ];
    for (_, ns) in &stats.percentiles {
        row.push(Cell::new(&format!("{:.2?}", Duration::from_nanos(*ns))));
    }
    row.push(Cell::new(&format!(
        "{:.2?}",
        Duration::from_nanos(stats.max_ns)
    )));
    row.push(Cell::new(&format!("{:.2}", stats.ns_per_iter)));
    table.add_row(Row::new(row));

    table
}

pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn report(&self, report: &BenchReport, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer(&mut *out, report)?;
        writeln!(out)?;
        Ok(())
    }
}

pub struct JsonPrettyReporter;

impl Reporter for JsonPrettyReporter {
    fn report(&self, report: &BenchReport, out: &mut dyn Write) -> Result<()> {
        serde_json::to_writer_pretty(&mut *out, report)?;
        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn sample_report(runs: u64, alloc: Option<AllocSnapshot>) -> BenchReport {
        BenchReport {
            benchmark: "realloc",
            operation: "reallocs".to_string(),
            iterations: 1_048_576,
            clock: ClockKind::Monotonic,
            clock_description: "CLOCK_MONOTONIC",
            resolution_ns: 1,
            elapsed_usec: 10_554,
            stats: StatsSummary {
                runs,
                min_ns: 10_000_000,
                avg_ns: 10_554_000,
                max_ns: 11_000_000,
                percentiles: vec![(95, 10_900_000)],
                ns_per_iter: 10.07,
            },
            alloc,
        }
    }

    fn render(reporter: &dyn Reporter, report: &BenchReport) -> String {
        let mut buf = Vec::new();
        reporter.report(report, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_table_single_run_is_two_lines() {
        let out = render(&TableReporter, &sample_report(1, None));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(
            lines,
            vec![
                "Using CLOCK_MONOTONIC, resolution: 1 nsec",
                "1048576 reallocs in 10554 usec",
            ]
        );
    }

    #[test]
    fn test_table_multi_run_adds_summary() {
        let out = render(&TableReporter, &sample_report(5, None));

        assert!(out.contains("1048576 reallocs in 10554 usec"));
        for expected in ["Runs", "Min", "Avg", "P95", "Max", "ns/iter", "10.07"] {
            assert!(
                out.contains(expected),
                "Output did not match expected.\nExpected:\n{expected}\n\nGot:\n{out}",
            );
        }
    }

    #[test]
    fn test_table_prints_alloc_counts() {
        let alloc = AllocSnapshot {
            allocs: 1,
            reallocs: 1_048_575,
            deallocs: 1,
            bytes_requested: 2048,
        };
        let out = render(&TableReporter, &sample_report(1, Some(alloc)));

        assert!(out.contains("1048575 reallocs"));
        assert!(out.contains("2.0 KB requested"));
    }

    #[test]
    fn test_json_report_fields() {
        let out = render(&JsonReporter, &sample_report(1, None));
        assert_eq!(out.lines().count(), 1);

        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["benchmark"], "realloc");
        assert_eq!(json["iterations"], 1_048_576);
        assert_eq!(json["clock"], "monotonic");
        assert_eq!(json["elapsed_usec"], 10_554);
        assert_eq!(json["stats"]["percentiles"]["p95"], 10_900_000);
        assert!(json.get("alloc").is_none());
    }

    #[test]
    fn test_json_pretty_includes_alloc() {
        let alloc = AllocSnapshot {
            allocs: 3,
            ..Default::default()
        };
        let out = render(&JsonPrettyReporter, &sample_report(1, Some(alloc)));
        assert!(out.lines().count() > 1);

        let json: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(json["alloc"]["allocs"], 3);
    }

    #[test]
    fn test_format_selects_reporter() {
        let report = sample_report(1, None);
        let table = render(Format::Table.reporter().as_ref(), &report);
        let json = render(Format::Json.reporter().as_ref(), &report);

        assert!(table.starts_with("Using "));
        assert!(json.starts_with('{'));
    }
}
