use crate::patches::PatchDir;
use crate::remarks::RemarkMap;
use crate::status::{SkippedLine, StatusLog, StatusRecord};

#[derive(Clone, Debug)]
pub struct ReportRow {
    pub record: StatusRecord,
    pub remark: Option<String>,
    pub has_patch: bool,
}

#[derive(Clone, Debug, Default)]
pub struct Summary {
    pub success: usize,
    pub total: usize,
    /// Status string and count, in order of first appearance in the log.
    pub by_status: Vec<(String, usize)>,
}

#[derive(Clone, Debug, Default)]
pub struct Report {
    pub rows: Vec<ReportRow>,
    pub summary: Summary,
    pub skipped: Vec<SkippedLine>,
}

pub fn build_report(status_log: StatusLog, remarks: &RemarkMap, patches: &PatchDir) -> Report {
    let mut summary = Summary::default();
    let mut rows = Vec::with_capacity(status_log.records.len());
    for record in status_log.records {
        summary.total += 1;
        if record.status.is_success() { summary.success += 1; }
        match summary.by_status.iter_mut().find(|(s, _)| s == record.status.as_str()) {
            Some(entry) => entry.1 += 1,
            None => summary.by_status.push((record.status.as_str().to_string(), 1)),
        }
        let remark = remarks.get(&record.name).filter(|r| !r.is_empty()).cloned();
        let has_patch = patches.has_patch(&record.name);
        if has_patch { log::debug!("{} has a patch directory under {}", record.name, patches.root().display()); }
        rows.push(ReportRow { record, remark, has_patch });
    }
    Report { rows, summary, skipped: status_log.skipped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::parse_status_log;

    const LOG: &str = "foo 1.0 successful 2023-05-02T15:04:05Z\n\
bar 2.0 attempted 2023-05-02T16:00:00Z\n\
baz 3.0 successful 2023-05-03T09:30:00Z\n\
qux 4.0 built 2023-05-03T10:00:00Z\n\
bad\n";

    #[test]
    fn counts_success_and_total() {
        let dir = tempfile::tempdir().unwrap();
        let rep = build_report(parse_status_log(LOG.as_bytes()), &RemarkMap::new(), &PatchDir::new(dir.path()));
        assert_eq!(rep.summary.success, 2);
        assert_eq!(rep.summary.total, 4);
        assert_eq!(rep.skipped.len(), 1);
        assert_eq!(rep.skipped[0].line_no, 5);
        assert!(rep.summary.success <= rep.summary.total);
        assert_eq!(rep.summary.by_status, vec![("successful".to_string(), 2), ("attempted".to_string(), 1), ("built".to_string(), 1)]);
    }

    #[test]
    fn rows_keep_log_order_and_annotations() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("baz")).unwrap();
        let mut remarks = RemarkMap::new();
        remarks.insert("foo".to_string(), "needs review".to_string());
        remarks.insert("bar".to_string(), String::new());
        let rep = build_report(parse_status_log(LOG.as_bytes()), &remarks, &PatchDir::new(dir.path()));
        let names: Vec<&str> = rep.rows.iter().map(|r| r.record.name.as_str()).collect();
        assert_eq!(names, vec!["foo", "bar", "baz", "qux"]);
        assert_eq!(rep.rows[0].remark.as_deref(), Some("needs review"));
        assert_eq!(rep.rows[1].remark, None);
        assert!(rep.rows[2].has_patch);
        assert!(!rep.rows[0].has_patch);
    }
}
