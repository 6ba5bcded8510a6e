//! Replay a recorded gaze session against a simulated page.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use gazelens_common::clock::SessionClock;
use gazelens_common::config::EngineTuning;
use gazelens_focus_engine::{ConfigStore, EngineStats, FocusEngine};
use gazelens_page_model::config::ExtensionConfig;
use gazelens_page_model::sample::{load_samples, TimedGazeSample};
use gazelens_page_sim::{ManualScheduler, MemoryPage, RecordingSink};
use gazelens_platform_core::Page;
use serde::Serialize;

pub struct ReplayOptions {
    pub samples: PathBuf,
    pub page: PathBuf,
    pub config: Option<PathBuf>,
    pub no_config: bool,
    pub debug: bool,
    pub realtime: bool,
    pub trace: Option<PathBuf>,
    pub json: bool,
}

/// End-of-replay report.
#[derive(Debug, Serialize)]
struct ReplaySummary {
    samples: usize,
    replayed: usize,
    interrupted: bool,
    duration_secs: f64,
    stats: EngineStats,
    config_requests: Vec<String>,
    elements: Vec<ElementReport>,
}

#[derive(Debug, Serialize)]
struct ElementReport {
    id: u64,
    label: String,
    classes: Vec<String>,
    style: BTreeMap<String, String>,
}

type ReplayEngine = FocusEngine<MemoryPage, ManualScheduler, RecordingSink>;

pub async fn run(options: ReplayOptions, tuning: &EngineTuning) -> anyhow::Result<()> {
    let samples = load_samples(&options.samples)
        .map_err(|e| anyhow::anyhow!("Failed to load samples: {e}"))?;
    let page = MemoryPage::load_layout(&options.page)
        .map_err(|e| anyhow::anyhow!("Failed to load page layout: {e}"))?;

    let store = match (&options.config, options.no_config) {
        (_, true) => ConfigStore::new(None),
        (Some(path), false) => {
            ConfigStore::load(path).map_err(|e| anyhow::anyhow!("Failed to load config: {e}"))?
        }
        (None, false) => ConfigStore::new(Some(ExtensionConfig::builtin())),
    };
    store.set_debug(options.debug);

    let mut engine: ReplayEngine = FocusEngine::new(
        page,
        ManualScheduler::new(),
        RecordingSink::new(),
        store.subscribe(),
        tuning,
    );

    if !options.json {
        let viewport = engine.page().viewport();
        println!("Replaying {} samples", samples.len());
        println!("  Page: {} ({}x{})", options.page.display(), viewport.width, viewport.height);
        match engine.config() {
            Some(config) => println!("  Config: {} tag(s)", config.len()),
            None => println!("  Config: none"),
        }
        println!("  Smoothing window: {}", tuning.smoothing_window);
        println!();
    }

    let mut trace = options
        .trace
        .as_ref()
        .map(|path| File::create(path).map(BufWriter::new))
        .transpose()
        .map_err(|e| anyhow::anyhow!("Failed to create trace file: {e}"))?;

    let stop = Arc::new(AtomicBool::new(false));
    if options.realtime {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::SeqCst);
            }
        });
        if !options.json {
            println!("Replaying in real time, press Ctrl+C to stop...");
        }
    }

    let clock = SessionClock::start();
    let first_ms = samples.first().map_or(0, |s| s.timestamp_ms);
    let mut replayed: usize = 0;
    for timed in &samples {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        if options.realtime {
            let due = timed.timestamp_ms.saturating_sub(first_ms);
            let now = clock.now_ms();
            if due > now {
                tokio::time::sleep(Duration::from_millis(due - now)).await;
            }
        }

        fire_due_timers(&mut engine, timed.timestamp_ms);
        if let Some(outcome) = engine.handle_sample(&timed.sample, timed.timestamp_ms) {
            if let Some(writer) = trace.as_mut() {
                serde_json::to_writer(&mut *writer, &outcome)?;
                writer.write_all(b"\n")?;
            }
        }
        replayed += 1;
    }

    // Let pending unfocus transitions finish.
    while let Some(deadline) = engine.scheduler().next_deadline() {
        fire_due_timers(&mut engine, deadline);
    }

    if let Some(mut writer) = trace {
        writer.flush()?;
    }

    tracing::info!(
        replayed,
        elapsed_ms = clock.now_ms(),
        started = clock.epoch_wall(),
        "Replay finished"
    );

    let duration_secs = replayed_span_secs(&samples, replayed);
    let summary = summarize(&engine, samples.len(), replayed, duration_secs);
    if options.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
    }

    Ok(())
}

/// Session time covered by the first `replayed` samples.
fn replayed_span_secs(samples: &[TimedGazeSample], replayed: usize) -> f64 {
    let first_ms = samples.first().map_or(0, |s| s.timestamp_ms);
    let last_ms = samples
        .get(replayed.saturating_sub(1))
        .map_or(first_ms, |s| s.timestamp_ms);
    SessionClock::ms_to_secs(last_ms.saturating_sub(first_ms))
}

fn fire_due_timers(engine: &mut ReplayEngine, now_ms: u64) {
    for task in engine.scheduler_mut().advance_to(now_ms) {
        engine.on_timer(task);
    }
}

fn summarize(
    engine: &ReplayEngine,
    samples: usize,
    replayed: usize,
    duration_secs: f64,
) -> ReplaySummary {
    let page = engine.page();
    let elements = page
        .element_ids()
        .map(|id| ElementReport {
            id: id.0,
            label: page.label(id).unwrap_or_default().to_string(),
            classes: page.classes(id),
            style: page.inline_style(id).cloned().unwrap_or_default(),
        })
        .collect();

    ReplaySummary {
        samples,
        replayed,
        interrupted: replayed < samples,
        duration_secs,
        stats: engine.stats(),
        config_requests: engine.sink().config_requests(),
        elements,
    }
}

fn print_summary(summary: &ReplaySummary) {
    let stats = &summary.stats;
    if summary.interrupted {
        println!("Interrupted after {} of {} samples.", summary.replayed, summary.samples);
    }
    println!("Replay summary:");
    println!("  Session length: {:.2}s", summary.duration_secs);
    println!("  Samples: {}", stats.samples);
    println!("  Stabilized: {}", stats.emitted);
    println!("  Blinks: {}", stats.blinks);
    println!("  Focus events: {}", stats.focused);
    println!("  Unfocus events: {}", stats.unfocused);
    if summary.config_requests.is_empty() {
        println!("  Config requests: none");
    } else {
        println!("  Config requests: {}", summary.config_requests.join(", "));
    }

    println!();
    println!("Final inline styles:");
    for element in &summary.elements {
        let style = element
            .style
            .iter()
            .map(|(property, value)| format!("{property}: {value}"))
            .collect::<Vec<_>>()
            .join("; ");
        let classes = if element.classes.is_empty() {
            String::new()
        } else {
            format!(" [{}]", element.classes.join(" "))
        };
        println!("  el#{} {}{}  {{ {} }}", element.id, element.label, classes, style);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gazelens_page_model::sample::RawGazeSample;

    fn fixture(name: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("../../fixtures/session")
            .join(name)
    }

    fn timed(timestamp_ms: u64) -> TimedGazeSample {
        TimedGazeSample {
            timestamp_ms,
            sample: RawGazeSample::without_features(0.0, 0.0),
        }
    }

    #[test]
    fn test_span_covers_replayed_samples_only() {
        let samples = vec![timed(1000), timed(1500), timed(3000)];
        assert_eq!(replayed_span_secs(&samples, 3), 2.0);
        assert_eq!(replayed_span_secs(&samples, 2), 0.5);
        assert_eq!(replayed_span_secs(&samples, 1), 0.0);
        assert_eq!(replayed_span_secs(&samples, 0), 0.0);
        assert_eq!(replayed_span_secs(&[], 0), 0.0);
    }

    #[tokio::test]
    async fn test_replay_fixture_session_writes_trace() {
        let trace = std::env::temp_dir().join(format!(
            "gazelens-replay-trace-{}.jsonl",
            std::process::id()
        ));
        let options = ReplayOptions {
            samples: fixture("samples.jsonl"),
            page: fixture("page.json"),
            config: Some(fixture("config.json")),
            no_config: false,
            debug: false,
            realtime: false,
            trace: Some(trace.clone()),
            json: true,
        };

        run(options, &EngineTuning::default()).await.unwrap();
        let written = std::fs::read_to_string(&trace).unwrap();
        std::fs::remove_file(&trace).ok();

        assert_eq!(written.lines().count(), 178);
        for line in written.lines() {
            serde_json::from_str::<serde_json::Value>(line).unwrap();
        }
    }
}
