//! Output formatting for analysis runs.
//!
//! JSON output is the final [`AnalysisView`] as one document. JSON Lines
//! output streams one tagged record per pipeline event, followed by the
//! view as the last line.

use serde::Serialize;
use std::io::{self, Write};

use crate::config::OutputConfig;
use crate::pipeline::{AnalysisView, PipelineEvent};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Final view as a single JSON document
    Json,
    /// One JSON record per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One line of JSON Lines output.
#[derive(Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum Record<'a> {
    Event(&'a PipelineEvent),
    View(&'a AnalysisView),
}

/// Serializes pipeline events and the final view.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    records_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// `pretty` only affects JSON format.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            records_written: 0,
        }
    }

    /// Writer configured from the `[output]` section. Unknown formats fall
    /// back to JSON.
    pub fn from_config(writer: W, config: &OutputConfig) -> Self {
        let format = OutputFormat::parse(&config.format).unwrap_or(OutputFormat::Json);
        Self::new(writer, format, config.pretty)
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    /// Record a state transition. Only JSON Lines output streams events.
    pub fn write_event(&mut self, event: &PipelineEvent) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => Ok(()),
            OutputFormat::JsonLines => self.write_line(&Record::Event(event)),
        }
    }

    /// Write the final view model.
    pub fn write_view(&mut self, view: &AnalysisView) -> io::Result<()> {
        match self.format {
            OutputFormat::Json => {
                if self.pretty {
                    serde_json::to_writer_pretty(&mut self.writer, view)
                        .map_err(io::Error::other)?;
                } else {
                    serde_json::to_writer(&mut self.writer, view).map_err(io::Error::other)?;
                }
                writeln!(self.writer)?;
                self.records_written += 1;
                Ok(())
            }
            OutputFormat::JsonLines => self.write_line(&Record::View(view)),
        }
    }

    fn write_line<T: Serialize>(&mut self, record: &T) -> io::Result<()> {
        // JSONL is never pretty-printed (one record per line)
        serde_json::to_writer(&mut self.writer, record).map_err(io::Error::other)?;
        writeln!(self.writer)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}
