use abstime::config::{Bootstrap, Config, DisplayZone, HourClock, TimestampRecord};
use abstime::dom::html;
use abstime::normalizer::record_for;
use abstime::output;
use abstime::reconciler::reconcile_page;
use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};
use memchr::memchr_iter;
use memmap2::Mmap;
use std::fs::File;
use std::time::Instant;
use tracing::debug;

#[cfg(feature = "parallel")]
use rayon::prelude::*;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BootstrapArg {
    Raw,
    Normalize,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(value_name = "FILE")]
    file: String,

    #[arg(short, long, default_value = "stdout")]
    output: String,

    /// Treat FILE as an HTML page and rewrite its <time> elements
    #[arg(long)]
    html: bool,

    /// local, utc, or a fixed offset like +08:00
    #[arg(long, default_value = "local")]
    zone: DisplayZone,

    /// Keep the old "pm adds 12" rule, which breaks 12pm and 12am
    #[arg(long)]
    legacy_noon: bool,

    #[arg(long, value_enum, default_value = "raw")]
    bootstrap: BootstrapArg,

    #[arg(long, default_value = "100000")]
    batch_size: usize,

    #[arg(long)]
    benchmark: bool,
}

impl Args {
    fn config(&self) -> Config {
        Config {
            zone: self.zone,
            hour_clock: if self.legacy_noon {
                HourClock::Legacy
            } else {
                HourClock::Corrected
            },
            bootstrap: match self.bootstrap {
                BootstrapArg::Raw => Bootstrap::Raw,
                BootstrapArg::Normalize => Bootstrap::Normalize,
            },
            ..Config::default()
        }
    }
}

fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();
    let start_time = Instant::now();
    let file_size = std::fs::metadata(&args.file)?.len();

    let (lines, records) = if args.html {
        let records = rewrite_page(&args.file, &config)?;
        let mut writer = output::create_writer(&args.output)?;
        writer.write_batch(&records)?;
        writer.finish()?;
        (records.len(), records.len())
    } else {
        normalize_lines(&args, &config)?
    };

    if args.benchmark {
        print_benchmark_results(file_size, lines, records, start_time.elapsed());
    }

    Ok(())
}

/// One timestamp per line; each becomes a record.
fn normalize_lines(args: &Args, config: &Config) -> Result<(usize, usize)> {
    let file = File::open(&args.file)?;
    let mmap = unsafe { Mmap::map(&file)? };

    let mut lines: Vec<&[u8]> = Vec::new();
    let mut start = 0;
    for nl in memchr_iter(b'\n', &mmap) {
        lines.push(&mmap[start..nl]);
        start = nl + 1;
    }
    if start < mmap.len() {
        lines.push(&mmap[start..]);
    }
    let total_lines = lines.len();
    let batches: Vec<&[&[u8]]> = lines.chunks(args.batch_size.max(1)).collect();

    let (tx, rx) = crossbeam::channel::unbounded::<Vec<TimestampRecord>>();

    let output_arg = args.output.clone();
    let writer_handle = std::thread::spawn(move || -> Result<()> {
        let mut writer = output::create_writer(&output_arg)?;
        for batch in rx {
            writer.write_batch(&batch)?;
        }
        writer.finish()
    });

    let to_records = |batch: &&[&[u8]]| -> Vec<TimestampRecord> {
        batch
            .iter()
            .filter_map(|line| line_record(line, config))
            .collect()
    };

    #[cfg(feature = "parallel")]
    let total_records: usize = batches
        .par_iter()
        .map(|batch| {
            let recs = to_records(batch);
            let len = recs.len();
            let _ = tx.send(recs);
            len
        })
        .sum();

    #[cfg(not(feature = "parallel"))]
    let total_records: usize = batches
        .iter()
        .map(|batch| {
            let recs = to_records(batch);
            let len = recs.len();
            let _ = tx.send(recs);
            len
        })
        .sum();

    // close channel so writer thread can finish
    drop(tx);
    writer_handle
        .join()
        .map_err(|_| anyhow!("writer thread panicked"))??;

    Ok((total_lines, total_records))
}

fn line_record(line: &[u8], config: &Config) -> Option<TimestampRecord> {
    let Ok(text) = std::str::from_utf8(line) else {
        debug!("skipping non-UTF-8 line");
        return None;
    };
    let raw = text.trim();
    if raw.is_empty() {
        return None;
    }
    Some(record_for(raw, config))
}

fn rewrite_page(path: &str, config: &Config) -> Result<Vec<TimestampRecord>> {
    let source = std::fs::read_to_string(path)?;
    let mut dom = html::parse_document(&source);
    Ok(reconcile_page(&mut dom, config)?)
}

fn print_benchmark_results(
    file_size: u64,
    total_lines: usize,
    total_records: usize,
    duration: std::time::Duration,
) {
    let duration_secs = duration.as_secs_f64();
    let file_size_mb = file_size as f64 / (1024.0 * 1024.0);

    eprintln!("\n=== BENCHMARK RESULTS ===");
    eprintln!("File size: {:.2} MB", file_size_mb);
    eprintln!("Total lines: {}", total_lines);
    eprintln!("Records: {}", total_records);
    eprintln!("Processing time: {:.3}s", duration_secs);
    eprintln!("Throughput: {:.2} MB/s", file_size_mb / duration_secs);
    eprintln!("Throughput: {:.0} records/s", total_records as f64 / duration_secs);
}
