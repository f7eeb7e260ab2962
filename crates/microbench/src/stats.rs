use eyre::{Result, WrapErr};
use hdrhistogram::Histogram;
use serde::Serialize;
use std::time::Duration;

/// Elapsed times of repeated runs of one benchmark.
#[derive(Debug)]
pub struct RunStats {
    pub total_ns: u64,
    pub min_ns: u64,
    pub max_ns: u64,
    pub count: u64,
    hist: Histogram<u64>,
}

impl RunStats {
    const LOW_NS: u64 = 1;
    const HIGH_NS: u64 = 60_000_000_000; // 60s
    const SIGFIGS: u8 = 3;

    pub fn new() -> Result<Self> {
        let hist = Histogram::<u64>::new_with_bounds(Self::LOW_NS, Self::HIGH_NS, Self::SIGFIGS)
            .wrap_err("hdrhistogram init")?;

        Ok(Self {
            total_ns: 0,
            min_ns: u64::MAX,
            max_ns: 0,
            count: 0,
            hist,
        })
    }

    pub fn record(&mut self, elapsed: Duration) -> Result<()> {
        let ns = elapsed.as_nanos().min(u128::from(u64::MAX)) as u64;

        self.total_ns = self.total_ns.saturating_add(ns);
        self.min_ns = self.min_ns.min(ns);
        self.max_ns = self.max_ns.max(ns);
        self.count += 1;

        let clamped = ns.clamp(Self::LOW_NS, Self::HIGH_NS);
        self.hist.record(clamped).wrap_err("hdrhistogram record")?;
        Ok(())
    }

    pub fn min(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.min_ns)
        }
    }

    pub fn max(&self) -> Duration {
        Duration::from_nanos(self.max_ns)
    }

    pub fn avg(&self) -> Duration {
        if self.count == 0 {
            Duration::ZERO
        } else {
            Duration::from_nanos(self.total_ns / self.count)
        }
    }

    #[inline]
    pub fn percentile(&self, p: f64) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        let p = p.clamp(0.0, 100.0);
        Duration::from_nanos(self.hist.value_at_percentile(p))
    }

    /// Average cost of one loop iteration, in nanoseconds.
    pub fn ns_per_iter(&self, iterations: u32) -> f64 {
        if iterations == 0 {
            return 0.0;
        }
        self.avg().as_nanos() as f64 / f64::from(iterations)
    }

    pub fn summary(&self, iterations: u32, percentiles: &[u8]) -> StatsSummary {
        StatsSummary {
            runs: self.count,
            min_ns: self.min().as_nanos() as u64,
            avg_ns: self.avg().as_nanos() as u64,
            max_ns: self.max_ns,
            percentiles: percentiles
                .iter()
                .map(|&p| (p, self.percentile(f64::from(p)).as_nanos() as u64))
                .collect(),
            ns_per_iter: self.ns_per_iter(iterations),
        }
    }
}

/// Serializable view of [`RunStats`].
#[derive(Debug, Clone, Serialize)]
pub struct StatsSummary {
    pub runs: u64,
    pub min_ns: u64,
    pub avg_ns: u64,
    pub max_ns: u64,
    #[serde(serialize_with = "serialize_percentiles")]
    pub percentiles: Vec<(u8, u64)>,
    pub ns_per_iter: f64,
}

fn serialize_percentiles<S>(values: &[(u8, u64)], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    use serde::ser::SerializeMap;

    let mut map = serializer.serialize_map(Some(values.len()))?;
    for (p, ns) in values {
        map.serialize_entry(&format!("p{}", p), ns)?;
    }
    map.end()
}
