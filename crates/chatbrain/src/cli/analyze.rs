//! The `chatbrain analyze` command.

use chatbrain_core::output::OutputFormat as CoreOutputFormat;
use chatbrain_core::{Analyzer, Config, InputItem, OutputWriter, PipelineState, ProgressSnapshot};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::{broadcast, watch};

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Final analysis as a single JSON document
    Json,
    /// State changes as they happen, then the analysis (one JSON object per line)
    Jsonl,
}

impl From<OutputFormat> for CoreOutputFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Json => CoreOutputFormat::Json,
            OutputFormat::Jsonl => CoreOutputFormat::JsonLines,
        }
    }
}

/// Arguments for the `analyze` command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Screenshots, one audio recording, or one text file
    #[arg(required_unless_present = "text", conflicts_with = "text")]
    pub files: Vec<PathBuf>,

    /// Analyze this text instead of files
    #[arg(long)]
    pub text: Option<String>,

    /// Output format (defaults to the configured one)
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Analysis service base URL
    #[arg(long, env = "CHATBRAIN_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Do not draw the progress bar
    #[arg(long)]
    pub no_progress: bool,
}

/// Execute the analyze command.
pub async fn execute(args: AnalyzeArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(endpoint) = &args.endpoint {
        config.remote.endpoint = endpoint.clone();
    }

    let items = match &args.text {
        Some(text) => vec![InputItem::from_text(text)],
        None => read_items(&args.files).await?,
    };
    tracing::info!("Analyzing {} item(s)", items.len());

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(std::io::stdout().lock()),
    };
    let mut writer = match args.format {
        Some(format) => OutputWriter::new(sink, format.into(), config.output.pretty),
        None => OutputWriter::from_config(sink, &config.output),
    };

    let mut analyzer = Analyzer::with_http(&config)?;
    let mut events = analyzer.subscribe();
    let progress = (!args.no_progress).then(|| spawn_progress_bar(analyzer.progress()));

    analyzer.submit(items).await?;

    let state = {
        let settle = analyzer.run_until_settled();
        tokio::pin!(settle);
        loop {
            tokio::select! {
                state = &mut settle => break state.clone(),
                event = events.recv() => match event {
                    Ok(event) => writer.write_event(&event)?,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Output lagged behind by {skipped} event(s)");
                    }
                    Err(broadcast::error::RecvError::Closed) => {}
                },
            }
        }
    };
    while let Ok(event) = events.try_recv() {
        writer.write_event(&event)?;
    }

    if let Some((bar, task)) = progress {
        task.abort();
        finish_progress_bar(&bar, &state);
    }

    let view = analyzer.current_view();
    writer.write_view(&view)?;
    writer.flush()?;
    if let Some(path) = &args.output {
        tracing::info!("Output written to {:?}", path);
    }

    if let PipelineState::Failed(reason) = state {
        anyhow::bail!("Analysis failed: {reason}");
    }
    if let Some(notice) = &view.notice {
        tracing::warn!("{notice}");
    }
    Ok(())
}

/// Read every file into an input item, expanding `~` in paths.
async fn read_items(files: &[PathBuf]) -> anyhow::Result<Vec<InputItem>> {
    let mut items = Vec::with_capacity(files.len());
    for file in files {
        let path = PathBuf::from(shellexpand::tilde(&file.to_string_lossy()).into_owned());
        let content = tokio::fs::read(&path)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        items.push(InputItem::new(name, mime_for_path(&path), content));
    }
    Ok(items)
}

/// MIME type guessed from the file extension.
fn mime_for_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        "txt" | "log" => "text/plain",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "m4a" => "audio/mp4",
        "ogg" | "oga" => "audio/ogg",
        "flac" => "audio/flac",
        _ => "application/octet-stream",
    }
}

fn spawn_progress_bar(
    mut progress: watch::Receiver<ProgressSnapshot>,
) -> (ProgressBar, tokio::task::JoinHandle<()>) {
    let bar = ProgressBar::new(100);
    if let Ok(style) =
        ProgressStyle::default_bar().template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}% {msg}")
    {
        bar.set_style(style.progress_chars("##-"));
    }

    let task_bar = bar.clone();
    let task = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            task_bar.set_position(u64::from(snapshot.displayed_percent));
            task_bar.set_message(snapshot.status_text);
        }
    });
    (bar, task)
}

fn finish_progress_bar(bar: &ProgressBar, state: &PipelineState) {
    match state {
        PipelineState::Complete => {
            bar.set_position(100);
            bar.finish_with_message(state.status_text());
        }
        _ => bar.finish_and_clear(),
    }
}
