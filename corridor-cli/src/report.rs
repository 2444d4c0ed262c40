//! Report generation
//!
//! Read-only view of the engine's output: one line per tick plus a closing
//! summary, either as plain text or as JSON lines.

use crate::config::OutputFormat;
use crate::mission::{MissionSummary, TickRecord};
use anyhow::Result;
use corridor_engine::{RosterOrigin, Signal};
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct SummaryLine<'a> {
    summary: &'a MissionSummary,
}

pub struct Reporter {
    out: Box<dyn Write>,
    format: OutputFormat,
}

impl Reporter {
    pub fn new(out: Box<dyn Write>, format: OutputFormat) -> Self {
        Self { out, format }
    }

    /// Report one tick
    pub fn tick(&mut self, record: &TickRecord) -> Result<()> {
        match self.format {
            OutputFormat::Txt => writeln!(self.out, "{}", format_tick(record))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, record)?;
                writeln!(self.out)?;
            }
        }
        Ok(())
    }

    /// Report the mission summary and flush
    pub fn summary(&mut self, summary: &MissionSummary) -> Result<()> {
        match self.format {
            OutputFormat::Txt => write!(self.out, "{}", format_summary(summary))?,
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, &SummaryLine { summary })?;
                writeln!(self.out)?;
            }
        }
        self.out.flush()?;
        Ok(())
    }
}

fn format_tick(record: &TickRecord) -> String {
    let response = &record.response;
    let nearest = match response.nearest_signal_id {
        Some(id) => format!("signal {}", id),
        None => "no signal".to_string(),
    };

    format!(
        "[tick {:03}] {:.5},{:.5} @ {:.0} km/h -> {} {} at {:.0} m, saves {:.1} min ({}) | {}",
        record.tick,
        record.sample.lat,
        record.sample.lng,
        record.sample.speed,
        nearest,
        response.signal_status,
        response.distance_m,
        response.estimated_time_saved_min,
        response.source,
        format_signal_strip(&record.signals)
    )
}

/// Compact status strip, e.g. `1:G 2:R 3:R`
fn format_signal_strip(signals: &[Signal]) -> String {
    signals
        .iter()
        .map(|s| format!("{}:{}", s.id, if s.is_green() { "G" } else { "R" }))
        .collect::<Vec<_>>()
        .join(" ")
}

fn format_summary(summary: &MissionSummary) -> String {
    let mut text = String::new();
    text.push_str("\n═══════════════════════════════════════════════\n");
    text.push_str("  Mission Summary\n");
    text.push_str("═══════════════════════════════════════════════\n");
    text.push_str(&format!("  Ticks:          {}\n", summary.ticks));
    text.push_str(&format!("  Authoritative:  {}\n", summary.authoritative));
    text.push_str(&format!("  Local fallback: {}\n", summary.fallback));
    text.push_str(&format!(
        "  Roster:         {}\n",
        match summary.roster_origin {
            RosterOrigin::Fetched => "fetched from decision service",
            RosterOrigin::Demo => "demo roster (service unavailable)",
        }
    ));
    match &summary.push {
        Some(push) => text.push_str(&format!(
            "  Push updates:   {} applied, {} unknown, {} stale, {} malformed\n",
            push.applied, push.unknown, push.stale, push.malformed
        )),
        None => text.push_str("  Push updates:   not subscribed\n"),
    }

    text.push_str("\n  ID   LATITUDE    LONGITUDE   STATUS  LAST ACTIVATED\n");
    for signal in &summary.final_signals {
        let activated = signal
            .last_activated_time
            .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
            .unwrap_or_else(|| "never".to_string());
        text.push_str(&format!(
            "  {:<4} {:<11.6} {:<11.6} {:<7} {}\n",
            signal.id, signal.latitude, signal.longitude, signal.status, activated
        ));
    }
    text
}
