use crate::error::Result;
use crate::models::ScreenResult;
use crate::screener::ScreenReport;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const CSV_HEADERS: [&str; 8] = [
    "symbol",
    "price",
    "max_pain",
    "deviation_pct",
    "ema20",
    "ema50",
    "volume_strength",
    "trend",
];

pub const CSV_FILE_NAME: &str = "screen_results.csv";
pub const JSON_FILE_NAME: &str = "screen_report.json";

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{:.2}", v)).unwrap_or_default()
}

fn csv_row(r: &ScreenResult) -> [String; 8] {
    [
        r.symbol.clone(),
        format!("{:.2}", r.price),
        fmt_opt(r.max_pain),
        fmt_opt(r.deviation_pct),
        fmt_opt(r.ema20),
        fmt_opt(r.ema50),
        format!("{:.2}", r.volume_strength),
        r.trend.to_string(),
    ]
}

/// Full table in fixed column order. Absent values are empty cells.
pub fn write_csv<W: Write>(writer: W, results: &[ScreenResult]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(CSV_HEADERS)?;
    for r in results {
        wtr.write_record(csv_row(r))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn to_csv_string(results: &[ScreenResult]) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(&mut buf, results)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Writes the CSV table and the JSON report into `dir`, returning both paths.
pub fn save_report(dir: impl AsRef<Path>, report: &ScreenReport) -> Result<(PathBuf, PathBuf)> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let csv_path = dir.join(CSV_FILE_NAME);
    write_csv(std::fs::File::create(&csv_path)?, &report.results)?;

    let json_path = dir.join(JSON_FILE_NAME);
    std::fs::write(&json_path, serde_json::to_string_pretty(report)?)?;

    tracing::info!(csv = %csv_path.display(), json = %json_path.display(), "saved screen report");
    Ok((csv_path, json_path))
}
