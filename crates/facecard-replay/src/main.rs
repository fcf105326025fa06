use anyhow::{Context, Result};
use clap::Parser;
use facecard_core::{CardRegistry, Classifier};
use facecard_engine::{
    spawn_pipeline, Admission, CardStage, Collaborators, Config, RenderCommand, RenderSink,
};
use recording::Recording;
use script::{Script, ScriptedClassifier, ScriptedDetector, ScriptedTracker};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

mod recording;
mod script;

#[derive(Parser)]
#[command(
    name = "facecard-replay",
    about = "Replay a recorded AR session through the face card pipeline"
)]
struct Cli {
    /// Recorded session (JSON)
    recording: PathBuf,
    /// Pipeline configuration (TOML); defaults plus FACECARD_* variables otherwise
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Delay between delivered frames, in milliseconds
    #[arg(long, default_value_t = 33)]
    frame_interval_ms: u64,
}

/// Prints each render command as one JSON line.
struct JsonLines;

impl RenderSink for JsonLines {
    fn apply(&mut self, command: RenderCommand) {
        match serde_json::to_string(&command) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!(error = %e, "failed to encode render command"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };
    let recording = Recording::load(&cli.recording)?;
    let base_dir = cli
        .recording
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let stage = replay(
        recording,
        &config,
        &base_dir,
        Duration::from_millis(cli.frame_interval_ms),
        &mut JsonLines,
    )
    .await?;

    tracing::info!(cards = stage.registry().len(), "replay finished");
    Ok(())
}

/// Feed every recorded frame to a fresh pipeline, forwarding render
/// commands to `sink`. Waits for each admitted frame to finish so the
/// scripted answers line up with the frame that asked for them.
async fn replay(
    recording: Recording,
    config: &Config,
    base_dir: &Path,
    frame_interval: Duration,
    sink: &mut dyn RenderSink,
) -> Result<CardStage> {
    let script = Script::default();

    // A configured model that fails to load is fatal.
    let classifier: Box<dyn Classifier> = match config
        .load_classifier()
        .context("failed to load identity classifier")?
    {
        Some(classifier) => Box::new(classifier),
        None => Box::new(ScriptedClassifier(script.clone())),
    };

    let (handle, mut changes) = spawn_pipeline(
        Collaborators {
            detector: Box::new(ScriptedDetector(script.clone())),
            classifier,
            tracker: Arc::new(ScriptedTracker(script.clone())),
            roster: config.roster_source(),
        },
        config,
    )?;

    let mut stage = CardStage::new(CardRegistry::new(config.card_layout()));
    let mut ticker = tokio::time::interval(frame_interval.max(Duration::from_millis(1)));

    for (index, recorded) in recording.frames.iter().enumerate() {
        ticker.tick().await;
        let frame = recorded.to_frame(recording.viewport, base_dir)?;
        script.load(recorded);

        match handle.on_frame(frame) {
            Admission::Admitted => {}
            Admission::Closed => anyhow::bail!("detection pipeline stopped unexpectedly"),
            other => {
                tracing::debug!(frame = index, admission = ?other, "frame not admitted");
                continue;
            }
        }

        while handle.is_busy() {
            tokio::time::sleep(Duration::from_millis(1)).await;
            stage.pump(&mut changes, sink);
        }
        stage.pump(&mut changes, sink);
    }

    drop(handle);
    while let Some(change) = changes.recv().await {
        stage.apply(change, sink);
    }

    Ok(stage)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SESSION: &str = r#"{
        "viewport": {"width": 390, "height": 844},
        "frames": [
            {"tracking": "limited", "face": {"x": 0.2, "y": 0.3, "width": 0.4, "height": 0.5}},
            {
                "tracking": "normal",
                "face": {"x": 0.2, "y": 0.3, "width": 0.4, "height": 0.5},
                "classifications": [{"label": "Bob", "confidence": 0.8}],
                "hits": [
                    [{"position": [0.0, 0.0, 0.0], "distance": 0.05}],
                    [{"position": [0.1, 0.2, -1.0], "distance": 0.2}],
                    [{"position": [0.3, 0.0, -1.2], "distance": 0.3}]
                ]
            },
            {
                "tracking": "normal",
                "face": {"x": 0.25, "y": 0.3, "width": 0.4, "height": 0.5},
                "classifications": [{"label": "Bob", "confidence": 0.2}],
                "hits": [[{"position": [0.4, 0.1, -1.0], "distance": 0.5}]]
            },
            {"tracking": "normal"}
        ]
    }"#;

    fn config() -> Config {
        Config {
            hit_interval_ms: 0,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_replay_session() {
        let recording = Recording::from_json(SESSION).unwrap();
        let mut commands: Vec<RenderCommand> = Vec::new();
        let stage = replay(recording, &config(), Path::new("."), Duration::ZERO, &mut commands)
            .await
            .unwrap();

        assert_eq!(commands.len(), 3, "{commands:?}");
        let offset = config().card_layout().offset;

        let RenderCommand::Attach { card } = &commands[0] else {
            panic!("expected attach, got {:?}", commands[0]);
        };
        assert_eq!(card.name, "Bob");
        let expected = nalgebra::Point3::new(0.2, 0.1, -1.1) + offset;
        assert!((card.position - expected).norm() < 1e-5);

        // Low-confidence frame still moves Bob's card.
        let RenderCommand::Reposition { name, position } = &commands[1] else {
            panic!("expected reposition, got {:?}", commands[1]);
        };
        assert_eq!(name, "Bob");
        let expected = nalgebra::Point3::new(0.4, 0.1, -1.0) + offset;
        assert!((*position - expected).norm() < 1e-5);

        assert_eq!(commands[2], RenderCommand::Remove { name: "Bob".into() });
        assert!(stage.registry().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_load_failure_is_fatal() {
        let recording = Recording::from_json(SESSION).unwrap();
        let config = Config {
            model_path: Some(PathBuf::from("/nonexistent/identities.onnx")),
            labels_path: Some(PathBuf::from("/nonexistent/labels.txt")),
            ..config()
        };
        let mut commands: Vec<RenderCommand> = Vec::new();
        let result = replay(recording, &config, Path::new("."), Duration::ZERO, &mut commands).await;
        assert!(result.is_err());
        assert!(commands.is_empty());
    }
}
