use std::collections::BTreeMap;
use std::path::Path;

pub type RemarkMap = BTreeMap<String, String>;

/// Loads `remark.json`. Any failure leaves the page without remarks rather than aborting.
pub fn load_remarks(path: &Path) -> RemarkMap {
    let data = match std::fs::read(path) {
        Ok(d) => d,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => { log::info!("No remark file at {}", path.display()); return RemarkMap::new() }
        Err(e) => { log::warn!("Failed to read remark file {}: {}", path.display(), e); return RemarkMap::new() }
    };
    match parse_remarks(&data) {
        Ok(m) => { log::debug!("Loaded {} remarks from {}", m.len(), path.display()); m }
        Err(e) => { log::warn!("Failed to parse remark file {}: {}", path.display(), e); RemarkMap::new() }
    }
}

pub fn parse_remarks(data: &[u8]) -> Result<RemarkMap, serde_json::Error> {
    let obj: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(data)?;
    let mut out = RemarkMap::new();
    for (k, v) in obj {
        match v {
            serde_json::Value::String(s) => { out.insert(k, s); }
            serde_json::Value::Null => {}
            other => log::warn!("Ignoring non-string remark for {}: {}", k, other),
        }
    }
    Ok(out)
}
