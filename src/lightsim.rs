//! ICEBERG light-simulation driver.
//!
//! ```sh
//! lightsim layout iceberg.toml --output placements.json
//! lightsim generate iceberg.toml --events 100000 --workers 4 --output jitter.npz
//! lightsim events iceberg.toml marley.jsonl --samples primaries.jsonl
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use clap::{Parser, Subcommand};
use iceberg_light::random::streams;
use iceberg_light::{
    Config, DetectorLayout, EmissionSample, EventReader, JitterHistograms, JitterObserver, PRng, PointSource, Source,
    Vector,
};
use ndarray::Array1;
use ndarray_npy::NpzWriter;
use rand::SeedableRng;

#[derive(Parser)]
#[command(name = "lightsim")]
#[command(about = "Geometry layout and primary generation for the ICEBERG light simulation")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the detector layout and report the placements per group.
    Layout {
        /// TOML configuration file.
        config: PathBuf,
        /// Write all placements as JSON.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sample primaries from the configured source and histogram the position jitter.
    Generate {
        config:  PathBuf,
        #[arg(short = 'n', long)]
        events:  Option<u64>,
        #[arg(short, long)]
        seed:    Option<u64>,
        #[arg(short, long)]
        workers: Option<usize>,
        /// Jitter histograms, one array per axis.
        #[arg(short, long, default_value = "jitter.npz")]
        output:  PathBuf,
        /// Also write every sample as JSON Lines.
        #[arg(long)]
        samples: Option<PathBuf>,
    },
    /// Emit one primary per final-state particle of each generator event.
    Events {
        config:  PathBuf,
        /// Generator summaries, one JSON object per line.
        events:  PathBuf,
        #[arg(short, long)]
        seed:    Option<u64>,
        #[arg(long)]
        samples: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Layout { config, output } => {
            let config = load(&config)?;
            let layout = DetectorLayout::build(&config.detector)?;
            for (group, n) in layout.counts() {
                println!("{:<20} {:>5}", group, n);
            }
            println!("{:<20} {:>5}", "total", layout.placements().len());
            if let Some(path) = output {
                write_layout(&layout, &path)?;
            }
            Ok(())
        }
        Commands::Generate {
            config,
            events,
            seed,
            workers,
            output,
            samples,
        } => {
            let mut config = load(&config)?;
            if let Some(events) = events {
                config.run.events = events;
            }
            if let Some(seed) = seed {
                config.run.seed = seed;
            }
            if let Some(workers) = workers {
                config.run.workers = workers;
            }
            config.validate()?;
            generate(&config, &output, samples.as_deref())
        }
        Commands::Events {
            config,
            events,
            seed,
            samples,
        } => {
            let mut config = load(&config)?;
            if let Some(seed) = seed {
                config.run.seed = seed;
            }
            replay_events(&config, &events, samples.as_deref())
        }
    }
}

fn load(path: &Path) -> anyhow::Result<Config> {
    Config::load(path).with_context(|| format!("loading {}", path.display()))
}

fn create(path: &Path) -> anyhow::Result<BufWriter<File>> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Events per worker; the first `events % workers` take one extra.
fn shares(events: u64, workers: usize) -> Vec<u64> {
    let n = workers as u64;
    (0..n).map(|i| events / n + u64::from(i < events % n)).collect()
}

struct WorkerOutput {
    histograms: JitterHistograms,
    samples:    Vec<EmissionSample>,
}

fn run_worker(
    source: &PointSource,
    events: u64,
    rng: &mut PRng,
    histograms: JitterHistograms,
    keep_samples: bool,
) -> iceberg_light::Result<WorkerOutput> {
    let mut output = WorkerOutput {
        histograms,
        samples: Vec::new(),
    };
    for _ in 0..events {
        let (sample, jitter) = source.launch(rng)?;
        output.histograms.record(&jitter);
        if keep_samples {
            output.samples.push(sample);
        }
    }
    Ok(output)
}

fn generate(config: &Config, output: &Path, samples: Option<&Path>) -> anyhow::Result<()> {
    let run = &config.run;
    let source = config.source.point_source()?;
    let empty = JitterHistograms::new(run.histogram_bins, run.histogram_range)?;
    log::info!(
        "generating {} events from {:?} with {} workers, seed {}",
        run.events,
        source.spec.species,
        run.workers,
        run.seed
    );

    let keep_samples = samples.is_some();
    let results: Vec<_> = std::thread::scope(|s| {
        let handles: Vec<_> = streams(run.seed, run.workers)
            .into_iter()
            .zip(shares(run.events, run.workers))
            .map(|(mut rng, events)| {
                let histograms = empty.clone();
                s.spawn(move || run_worker(&source, events, &mut rng, histograms, keep_samples))
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut merged = empty;
    let mut kept = Vec::new();
    for result in results {
        let worker = result.map_err(|_| anyhow!("generator worker panicked"))??;
        merged.merge(&worker.histograms)?;
        kept.extend(worker.samples);
    }

    write_histograms(&merged, output)?;
    if let Some(path) = samples {
        write_samples(&kept, path)?;
    }
    for h in merged.iter() {
        println!(
            "{}: {} in range, {} under, {} over",
            h.name,
            h.entries(),
            h.underflow,
            h.overflow
        );
    }
    Ok(())
}

fn write_layout(layout: &DetectorLayout, path: &Path) -> anyhow::Result<()> {
    let mut out = create(path)?;
    serde_json::to_writer_pretty(&mut out, layout)?;
    out.flush().with_context(|| format!("writing {}", path.display()))?;
    log::info!("placements written to {}", path.display());
    Ok(())
}

fn write_histograms(histograms: &JitterHistograms, path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut npz = NpzWriter::new(file);
    for h in histograms.iter() {
        npz.add_array(format!("{}_counts", h.name), &h.bins)?;
        npz.add_array(format!("{}_centers", h.name), &h.bin_centers())?;
        npz.add_array(format!("{}_outside", h.name), &Array1::from(vec![h.underflow, h.overflow]))?;
    }
    npz.finish().with_context(|| format!("writing {}", path.display()))?;
    log::info!("histograms written to {}", path.display());
    Ok(())
}

fn write_samples(samples: &[EmissionSample], path: &Path) -> anyhow::Result<()> {
    let mut out = create(path)?;
    for sample in samples {
        serde_json::to_writer(&mut out, sample)?;
        writeln!(out)?;
    }
    out.flush()?;
    log::info!("{} samples written to {}", samples.len(), path.display());
    Ok(())
}

fn replay_events(config: &Config, events: &Path, samples: Option<&Path>) -> anyhow::Result<()> {
    let file = File::open(events).with_context(|| format!("opening {}", events.display()))?;
    let half_width = Vector::splat(config.source.position_jitter);
    let mut rng = PRng::seed_from_u64(config.run.seed);
    let mut emitted = Vec::new();
    let mut count = 0usize;

    for event in EventReader::new(BufReader::new(file)) {
        let event = event.with_context(|| format!("reading {}", events.display()))?;
        for spec in event.sources(config.source.position)? {
            let (sample, _) = PointSource::new(spec, half_width)?.launch(&mut rng)?;
            emitted.push(sample);
        }
        count += 1;
    }

    println!("{} events, {} primaries", count, emitted.len());
    if let Some(path) = samples {
        write_samples(&emitted, path)?;
    }
    Ok(())
}
