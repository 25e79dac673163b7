use crate::html::{self, PageOptions};
use crate::report::Report;
use serde::Serialize;

#[derive(Serialize)]
struct JsonReport<'a> {
    generated_from: &'a str,
    success: usize,
    total: usize,
    skipped_lines: Vec<JsonSkipped<'a>>,
    by_status: &'a [(String, usize)],
    records: Vec<JsonRecord<'a>>,
}

#[derive(Serialize)]
struct JsonSkipped<'a> {
    line: usize,
    text: &'a str,
    error: String,
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    name: &'a str,
    version: &'a str,
    status: &'a str,
    built_at: String,
    sort_key: String,
    color: &'static str,
    build_log: String,
    remark: Option<&'a str>,
    has_patch: bool,
}

pub fn write_json(path: &str, rep: &Report, opts: &PageOptions, source: &str) -> Result<(), std::io::Error> {
    let records = rep.rows.iter().map(|row| {
        let r = &row.record;
        JsonRecord {
            name: &r.name,
            version: &r.version,
            status: r.status.as_str(),
            built_at: r.built_at.to_rfc3339(),
            sort_key: html::sort_key(&r.built_at, opts.time_zone),
            color: html::status_color(&r.status),
            build_log: html::build_log_link(&r.name, &r.version, opts),
            remark: row.remark.as_deref(),
            has_patch: row.has_patch,
        }
    }).collect();
    let doc = JsonReport {
        generated_from: source,
        success: rep.summary.success,
        total: rep.summary.total,
        skipped_lines: rep.skipped.iter().map(|s| JsonSkipped { line: s.line_no, text: &s.text, error: s.error.to_string() }).collect(),
        by_status: &rep.summary.by_status,
        records,
    };
    let s = serde_json::to_string_pretty(&doc)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn write_csv(path: &str, rep: &Report) -> Result<(), std::io::Error> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["name", "version", "status", "built_at", "remark", "has_patch"])?;
    for row in &rep.rows {
        let r = &row.record;
        let ts = r.built_at.to_rfc3339();
        wtr.write_record([r.name.as_str(), r.version.as_str(), r.status.as_str(), ts.as_str(), row.remark.as_deref().unwrap_or(""), if row.has_patch { "true" } else { "false" }])?;
    }
    wtr.flush()?;
    Ok(())
}
