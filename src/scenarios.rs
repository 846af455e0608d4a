//! Scripted queue scenarios plus benchmark and stress runners.

use std::collections::HashSet;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::call_queue::{CallQueue, QueueError};
use crate::report::{QueueReporter, TranscriptReporter};
use crate::shared_queue::SharedCallQueue;
use crate::types::{Call, CallId, CallType};

const CSV_HEADER: &str = "capacity,producers,consumers,calls_total,elapsed_ms,throughput_calls_per_s,cpu_user_s,cpu_sys_s,overflow_retries,prioritize_passes,duplicate_calls,leftover";

/// Failures that stop a runner before or while it produces output.
#[derive(Error, Debug)]
pub enum RunError {
    #[error("{runner} error: {what} must be > 0")]
    ZeroArgument {
        runner: &'static str,
        what: &'static str,
    },

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),
}

impl RunError {
    /// Process exit code: usage problems are 2, everything else 1.
    pub fn exit_code(&self) -> u8 {
        match self {
            RunError::ZeroArgument { .. } => 2,
            RunError::Queue(_) | RunError::Io(_) => 1,
        }
    }
}

/// Best-effort CPU user/system time snapshot (seconds) on Unix platforms.
#[cfg(unix)]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    // SAFETY: an all-zero rusage is a valid value for getrusage to fill in.
    let mut usage: libc::rusage = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::getrusage(libc::RUSAGE_SELF, &mut usage) };
    if rc != 0 {
        return None;
    }
    let user = usage.ru_utime.tv_sec as f64 + (usage.ru_utime.tv_usec as f64 / 1_000_000.0);
    let sys = usage.ru_stime.tv_sec as f64 + (usage.ru_stime.tv_usec as f64 / 1_000_000.0);
    Some((user, sys))
}

/// Stub on non-Unix platforms.
#[cfg(not(unix))]
fn cpu_times_seconds() -> Option<(f64, f64)> {
    None
}

/// What the scripted scenarios observed, printed after the transcript.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DemoSummary {
    pub scenarios: usize,
    pub overflow_signals: usize,
    pub underflow_signals: usize,
    pub order_after_prioritize: Vec<CallId>,
    pub remaining_after_two_dequeues: Vec<CallId>,
    /// Insert count at which the capacity-4 queue first reported full.
    pub full_at_capacity_4: Option<usize>,
}

/// Forwards outcomes to a reporter and counts the error signals.
struct Tally<'a, R: QueueReporter> {
    inner: &'a mut R,
    overflow: usize,
    underflow: usize,
}

impl<'a, R: QueueReporter> Tally<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            overflow: 0,
            underflow: 0,
        }
    }

    fn enqueue(&mut self, queue: &mut CallQueue, call: Call) -> io::Result<()> {
        let outcome = queue.enqueue(call);
        if matches!(outcome, Err(QueueError::Overflow(_))) {
            self.overflow += 1;
        }
        self.inner.enqueued(&outcome)
    }

    fn dequeue(&mut self, queue: &mut CallQueue) -> io::Result<()> {
        let outcome = queue.dequeue();
        if matches!(outcome, Err(QueueError::Underflow)) {
            self.underflow += 1;
        }
        self.inner.dequeued(&outcome)
    }

    fn show(&mut self, title: &str, queue: &CallQueue) -> io::Result<()> {
        self.inner.heading(title)?;
        self.inner.listing(queue)
    }
}

fn ids(queue: &CallQueue) -> Vec<CallId> {
    queue.iter().map(|call| call.id).collect()
}

fn scenario_calls() -> [Call; 5] {
    [
        Call::normal(1, 10, false),
        Call::urgent(2, 5, true),
        Call::normal(3, 15, false),
        Call::urgent(4, 8, true),
        Call::normal(5, 20, false),
    ]
}

/// Play the scripted scenarios against `reporter` and summarize them.
pub fn play_scenarios<R: QueueReporter>(reporter: &mut R) -> Result<DemoSummary, RunError> {
    let mut tally = Tally::new(reporter);
    let mut summary = DemoSummary::default();

    // Fill a capacity-5 queue in arrival order.
    let mut queue = CallQueue::new(5)?;
    for call in scenario_calls() {
        tally.enqueue(&mut queue, call)?;
    }
    tally.show("Initial Queue", &queue)?;
    summary.scenarios += 1;

    queue.prioritize_urgent_calls();
    tally.show("Queue after prioritizing urgent calls", &queue)?;
    summary.order_after_prioritize = ids(&queue);
    summary.scenarios += 1;

    let mut served = queue.clone();
    tally.dequeue(&mut served)?;
    tally.dequeue(&mut served)?;
    tally.show("Queue after two dequeues", &served)?;
    summary.remaining_after_two_dequeues = ids(&served);
    summary.scenarios += 1;

    tally.enqueue(&mut queue, Call::urgent(6, 3, true))?;
    tally.show("Queue after overflow attempt", &queue)?;
    summary.scenarios += 1;

    let mut empty = CallQueue::new(5)?;
    tally.dequeue(&mut empty)?;
    tally.show("Empty queue after dequeue attempt", &empty)?;
    summary.scenarios += 1;

    let mut small = CallQueue::new(4)?;
    let mixed = [
        Call::urgent(11, 4, true),
        Call::normal(12, 9, false),
        Call::urgent(13, 2, false),
        Call::normal(14, 7, true),
    ];
    for (inserted, call) in mixed.into_iter().enumerate() {
        tally.enqueue(&mut small, call)?;
        if summary.full_at_capacity_4.is_none() && small.is_full() {
            summary.full_at_capacity_4 = Some(inserted + 1);
        }
    }
    tally.enqueue(&mut small, Call::normal(15, 1, false))?;
    tally.show("Capacity-4 queue", &small)?;
    summary.scenarios += 1;

    summary.overflow_signals = tally.overflow;
    summary.underflow_signals = tally.underflow;
    Ok(summary)
}

/// Run the scripted scenarios with a console transcript and print a summary.
pub fn run_demo() -> Result<(), RunError> {
    info!("[DEMO] start");
    let start = Instant::now();

    let summary = {
        let stdout = io::stdout();
        let mut reporter = TranscriptReporter::new(stdout.lock());
        play_scenarios(&mut reporter)?
    };
    info!(
        "[DEMO] finished {} scenarios in {}ms",
        summary.scenarios,
        start.elapsed().as_millis()
    );

    println!("DEMO SUMMARY");
    println!("scenarios={}", summary.scenarios);
    println!("overflow_signals={}", summary.overflow_signals);
    println!("underflow_signals={}", summary.underflow_signals);
    println!("order_after_prioritize={:?}", summary.order_after_prioritize);
    println!(
        "remaining_after_two_dequeues={:?}",
        summary.remaining_after_two_dequeues
    );
    match summary.full_at_capacity_4 {
        Some(inserted) => println!("full_at_capacity_4={inserted}"),
        None => println!("full_at_capacity_4=never"),
    }
    Ok(())
}

/// Parameters for one concurrent benchmark run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchConfig {
    pub capacity: usize,
    pub producers: usize,
    pub consumers: usize,
    pub calls_per_producer: usize,
    /// Every n-th call id is urgent.
    pub urgent_every: usize,
    /// Pause between prioritize passes.
    pub prioritize_ms: u64,
    /// Track consumed ids and flag duplicates.
    pub validate: bool,
}

impl BenchConfig {
    fn check(&self, runner: &'static str) -> Result<(), RunError> {
        let fields = [
            ("capacity", self.capacity),
            ("producers", self.producers),
            ("consumers", self.consumers),
            ("calls_per_producer", self.calls_per_producer),
            ("urgent_every", self.urgent_every),
        ];
        for (what, value) in fields {
            if value == 0 {
                return Err(RunError::ZeroArgument { runner, what });
            }
        }
        Ok(())
    }
}

/// Value sets swept by the stress runner.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StressSweep {
    pub capacities: Vec<usize>,
    pub producers: Vec<usize>,
    pub calls_per_producer: Vec<usize>,
    pub consumers: usize,
    pub urgent_every: usize,
    pub prioritize_ms: u64,
    pub validate: bool,
}

/// Aggregated metrics from a single benchmark run.
#[derive(Debug)]
struct BenchResult {
    capacity: usize,
    producers: usize,
    consumers: usize,
    calls_total: usize,
    elapsed_ms: f64,
    throughput: f64,
    cpu_user_s: Option<f64>,
    cpu_sys_s: Option<f64>,
    overflow_retries: usize,
    prioritize_passes: usize,
    duplicate_calls: bool,
    leftover: usize,
}

fn bench_call(id: CallId, urgent_every: usize) -> Call {
    let kind = if id % urgent_every as CallId == 0 {
        CallType::Urgent
    } else {
        CallType::Normal
    };
    Call::new(id, kind, (id % 30) as u32 + 1, kind.is_urgent())
}

fn benchmark_once(config: &BenchConfig) -> Result<BenchResult, RunError> {
    let queue = Arc::new(SharedCallQueue::new(config.capacity)?);
    let stop_flag = Arc::new(AtomicBool::new(false));
    let overflow_retries = Arc::new(AtomicUsize::new(0));
    let prioritize_passes = Arc::new(AtomicUsize::new(0));
    let consumed = Arc::new(AtomicUsize::new(0));
    let duplicate_calls = Arc::new(AtomicBool::new(false));
    let seen_calls = if config.validate {
        Some(Arc::new(Mutex::new(HashSet::new())))
    } else {
        None
    };
    let calls_total = config.producers * config.calls_per_producer;

    let prioritizer = {
        let queue = Arc::clone(&queue);
        let stop_flag = Arc::clone(&stop_flag);
        let prioritize_passes = Arc::clone(&prioritize_passes);
        let pause = Duration::from_millis(config.prioritize_ms);
        thread::Builder::new()
            .name("prioritizer".to_string())
            .spawn(move || {
                while !stop_flag.load(Ordering::SeqCst) {
                    queue.prioritize_urgent_calls();
                    prioritize_passes.fetch_add(1, Ordering::SeqCst);
                    thread::sleep(pause);
                }
            })?
    };

    let cpu_start = cpu_times_seconds();
    let start = Instant::now();

    let mut consumer_handles = Vec::with_capacity(config.consumers);
    for consumer_id in 0..config.consumers {
        let queue = Arc::clone(&queue);
        let consumed = Arc::clone(&consumed);
        let duplicate_calls = Arc::clone(&duplicate_calls);
        let seen_calls = seen_calls.as_ref().map(Arc::clone);
        let handle = thread::Builder::new()
            .name(format!("consumer-{consumer_id}"))
            .spawn(move || {
                while let Some(call) = queue.pop_blocking_or_closed() {
                    consumed.fetch_add(1, Ordering::SeqCst);
                    if let Some(seen) = seen_calls.as_ref() {
                        let mut guard = seen.lock().expect("seen mutex poisoned");
                        if !guard.insert(call.id) {
                            duplicate_calls.store(true, Ordering::SeqCst);
                        }
                    }
                }
            })?;
        consumer_handles.push(handle);
    }

    let mut producer_handles = Vec::with_capacity(config.producers);
    for producer_id in 0..config.producers {
        let queue = Arc::clone(&queue);
        let overflow_retries = Arc::clone(&overflow_retries);
        let calls_per_producer = config.calls_per_producer;
        let urgent_every = config.urgent_every;
        let handle = thread::Builder::new()
            .name(format!("producer-{producer_id}"))
            .spawn(move || {
                let first = (producer_id * calls_per_producer) as CallId;
                for offset in 0..calls_per_producer as CallId {
                    let call = bench_call(first + offset, urgent_every);
                    match queue.push_blocking(call) {
                        Ok(retries) => {
                            overflow_retries.fetch_add(retries, Ordering::SeqCst);
                        }
                        Err(err) => {
                            warn!(%err, "producer stopped early");
                            return;
                        }
                    }
                }
            })?;
        producer_handles.push(handle);
    }

    for handle in producer_handles {
        handle.join().expect("producer thread panicked");
    }
    queue.close();
    for handle in consumer_handles {
        handle.join().expect("consumer thread panicked");
    }
    let elapsed = start.elapsed();
    let cpu_end = cpu_times_seconds();

    stop_flag.store(true, Ordering::SeqCst);
    prioritizer.join().expect("prioritizer thread panicked");

    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let served = consumed.load(Ordering::SeqCst);
    let throughput = if elapsed.as_secs_f64() > 0.0 {
        served as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };
    let (cpu_user_s, cpu_sys_s) = match (cpu_start, cpu_end) {
        (Some((u0, s0)), Some((u1, s1))) => (Some(u1 - u0), Some(s1 - s0)),
        _ => (None, None),
    };
    debug!(served, calls_total, elapsed_ms, "benchmark run finished");

    Ok(BenchResult {
        capacity: config.capacity,
        producers: config.producers,
        consumers: config.consumers,
        calls_total,
        elapsed_ms,
        throughput,
        cpu_user_s,
        cpu_sys_s,
        overflow_retries: overflow_retries.load(Ordering::SeqCst),
        prioritize_passes: prioritize_passes.load(Ordering::SeqCst),
        duplicate_calls: duplicate_calls.load(Ordering::SeqCst),
        leftover: calls_total.saturating_sub(served) + queue.len(),
    })
}

fn print_result(result: &BenchResult, validate: bool) {
    let cpu_user = result
        .cpu_user_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    let cpu_sys = result
        .cpu_sys_s
        .map(|v| format!("{v:.4}"))
        .unwrap_or_else(|| "NA".to_string());
    println!(
        "{},{},{},{},{:.2},{:.2},{},{},{},{},{},{}",
        result.capacity,
        result.producers,
        result.consumers,
        result.calls_total,
        result.elapsed_ms,
        result.throughput,
        cpu_user,
        cpu_sys,
        result.overflow_retries,
        result.prioritize_passes,
        result.duplicate_calls,
        result.leftover
    );
    if result.leftover > 0 {
        eprintln!("# warning,leftover_calls,{}", result.leftover);
    }
    if validate && result.duplicate_calls {
        eprintln!("# violation,duplicate_calls");
    }
}

/// Run a single benchmark and print one CSV row.
pub fn run_benchmark(config: &BenchConfig) -> Result<(), RunError> {
    config.check("benchmark")?;
    let result = benchmark_once(config)?;
    println!("{CSV_HEADER}");
    print_result(&result, config.validate);
    Ok(())
}

/// Sweep benchmark configurations and print CSV output.
pub fn run_stress(sweep: &StressSweep) -> Result<(), RunError> {
    let mut capacities = sweep.capacities.clone();
    let before = capacities.len();
    capacities.retain(|&capacity| capacity > 0);
    let dropped = before - capacities.len();
    if dropped > 0 {
        eprintln!("stress warning: ignored {dropped} capacity set(s) <= 0");
    }
    if capacities.is_empty() {
        return Err(RunError::ZeroArgument {
            runner: "stress",
            what: "capacities",
        });
    }

    let configs: Vec<BenchConfig> = capacities
        .iter()
        .flat_map(move |&capacity| {
            sweep.producers.iter().flat_map(move |&producers| {
                sweep
                    .calls_per_producer
                    .iter()
                    .map(move |&calls_per_producer| BenchConfig {
                        capacity,
                        producers,
                        consumers: sweep.consumers,
                        calls_per_producer,
                        urgent_every: sweep.urgent_every,
                        prioritize_ms: sweep.prioritize_ms,
                        validate: sweep.validate,
                    })
            })
        })
        .collect();
    for config in &configs {
        config.check("stress")?;
    }

    println!("{CSV_HEADER}");
    for config in &configs {
        let result = benchmark_once(config)?;
        print_result(&result, config.validate);
    }
    Ok(())
}
