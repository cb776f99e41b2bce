//! User-initiated export of parking history.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::models::ParkingSession;

const CSV_HEADER: &str =
    "Date,Start Time,End Time,Duration (minutes),Location,Address,Floor,Section,Hourly Rate,Total Cost";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }
}

pub fn export_file_name(format: ExportFormat, now: DateTime<Utc>) -> String {
    format!(
        "ParkSafe_Export_{}.{}",
        now.with_timezone(&Local).format("%Y-%m-%d"),
        format.extension()
    )
}

pub fn export(sessions: &[ParkingSession], format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Csv => Ok(to_csv(sessions)),
        ExportFormat::Json => to_json(sessions),
    }
}

/// Fields never contain a raw comma or line break: commas become `;` and
/// line breaks become spaces.
pub fn to_csv(sessions: &[ParkingSession]) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for session in sessions {
        let start = session.started_at.with_timezone(&Local);
        let end = session.ended_at.with_timezone(&Local);
        let location = session
            .location
            .as_ref()
            .map(|location| clean_field(&location.address))
            .unwrap_or_else(|| "Unknown".to_string());
        let address = clean_field(&session.truncated_address());

        let row = [
            start.format("%Y-%m-%d").to_string(),
            start.format("%H:%M").to_string(),
            end.format("%H:%M").to_string(),
            (session.duration_ms / 60_000).to_string(),
            address,
            location,
            clean(session.floor.as_deref()),
            clean(session.section.as_deref()),
            session
                .hourly_rate
                .map(|rate| format!("{rate:.2}"))
                .unwrap_or_default(),
            session
                .total_cost()
                .map(|cost| format!("{cost:.2}"))
                .unwrap_or_default(),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }

    out
}

pub fn to_json(sessions: &[ParkingSession]) -> Result<String> {
    serde_json::to_string_pretty(sessions).context("failed to encode history export")
}

fn clean(value: Option<&str>) -> String {
    clean_field(value.unwrap_or_default())
}

fn clean_field(value: &str) -> String {
    value
        .replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace(',', ";")
}
