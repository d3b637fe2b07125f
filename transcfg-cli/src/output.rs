use std::fmt::Write;

use anyhow::Result;
use serde::Serialize;

use crate::cli::OutputFormat;
use crate::commands::{ConcurrencyReport, ProfileReport, Summary};

/// Renders command reports in the requested format.
pub struct OutputManager {
    format: OutputFormat,
}

impl OutputManager {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn summary(&self, summary: &Summary) -> Result<String> {
        if self.format == OutputFormat::Json {
            return json(summary);
        }

        let mut output = String::new();
        for report in &summary.loaded {
            let status = if report.accepted { "accepted" } else { "ignored (stale)" };
            let time = report
                .time
                .map_or_else(|| "none".to_string(), |t| t.to_string());
            writeln!(output, "{} [time {}]: {}", report.path.display(), time, status)?;
        }
        writeln!(output, "Config time:             {}", summary.config_time)?;
        writeln!(output, "Active service:          {}", summary.active_service)?;
        writeln!(output, "Active config:           {}", summary.active_config)?;
        write!(
            output,
            "Max concurrent requests: {}",
            summary.max_concurrent_requests
        )?;
        Ok(output)
    }

    pub fn concurrency(&self, report: &ConcurrencyReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => json(report),
            OutputFormat::Pretty => Ok(format!(
                "{}/{}: {}",
                report.service, report.profile, report.max_concurrent_requests
            )),
        }
    }

    pub fn profile(&self, report: &ProfileReport) -> Result<String> {
        if self.format == OutputFormat::Json {
            return json(report);
        }

        let mut output = String::new();
        writeln!(output, "{}/{}:", report.service, report.profile)?;
        for (key, value) in &report.config {
            writeln!(output, "  {key}: {value}")?;
        }
        match &report.written {
            Some(path) => write!(output, "Saved to {}", path.display())?,
            None => write!(output, "Not saved (use --write to update the file)")?,
        }
        Ok(output)
    }
}

fn json<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}
