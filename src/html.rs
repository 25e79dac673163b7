use crate::report::{Report, ReportRow};
use crate::status::BuildStatus;
use crate::TimeZone;
use chrono::{DateTime, FixedOffset, Local, Utc};

pub const SUMMARY_PLACEHOLDER: &str = "##Summary##";
pub const SORTTABLE_JS: &str = "https://kryogenix.org/code/browser/sorttable/sorttable.js";
pub const ROW_COUNTER_JS: &str = "../js/default.js";
pub const ROW_COUNTER_CSS: &str = "../css/table_row_counter.css";
pub const DEFAULT_BUILD_LOG_URL: &str = "https://raw.githubusercontent.com/dothanhtrung/build-log/master/";
pub const DEFAULT_PATCH_URL: &str = "https://github.com/meta-debian/debian-cross-patches/tree/master/";
pub const PATCH_LINK_LABEL: &str = "debian-cross-patches";
pub const HEADER_COLOR: &str = "#bdc3c7";
pub const DEFAULT_COLOR: &str = "#df2029";

const DISPLAY_FMT: &str = "%b %e, %Y %-I:%M%p";
const SORT_KEY_FMT: &str = "%Y%m%d%H%M%S";

#[derive(Clone, Debug)]
pub struct PageOptions {
    pub title: String,
    pub heading: String,
    pub build_arch: String,
    pub host_arch: String,
    pub build_log_url: String,
    pub patch_url: String,
    pub time_zone: TimeZone,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            title: "Sbuild Status".to_string(),
            heading: "Debian cross-build state".to_string(),
            build_arch: "amd64".to_string(),
            host_arch: "armhf".to_string(),
            build_log_url: DEFAULT_BUILD_LOG_URL.to_string(),
            patch_url: DEFAULT_PATCH_URL.to_string(),
            time_zone: TimeZone::Source,
        }
    }
}

pub fn status_color(status: &BuildStatus) -> &'static str {
    match status {
        BuildStatus::Attempted => "#e74c3c",
        BuildStatus::Skipped => "#ecf0f1",
        BuildStatus::Successful => "#2ecc71",
        BuildStatus::GivenBack => "#e67e22",
        BuildStatus::Other(_) => DEFAULT_COLOR,
    }
}

fn in_zone(t: &DateTime<FixedOffset>, tz: TimeZone) -> DateTime<FixedOffset> {
    match tz {
        TimeZone::Source => *t,
        TimeZone::Utc => t.with_timezone(&Utc).fixed_offset(),
        TimeZone::Local => t.with_timezone(&Local).fixed_offset(),
    }
}

/// `May  2, 2023 3:04PM`
pub fn display_time(t: &DateTime<FixedOffset>, tz: TimeZone) -> String { in_zone(t, tz).format(DISPLAY_FMT).to_string() }

/// `20230502150405`, used by sorttable instead of the display text.
pub fn sort_key(t: &DateTime<FixedOffset>, tz: TimeZone) -> String { in_zone(t, tz).format(SORT_KEY_FMT).to_string() }

pub fn build_log_link(name: &str, version: &str, opts: &PageOptions) -> String {
    format!("{}{}_{}_{}.build", opts.build_log_url, name, version, opts.host_arch)
}

/// Remark text followed by the patch link, separated by a line break only when both are present.
pub fn compose_remark(name: &str, remark: Option<&str>, has_patch: bool, opts: &PageOptions) -> String {
    let mut s = remark.map(html_escape).unwrap_or_default();
    if has_patch {
        if !s.is_empty() { s.push_str("<br/>"); }
        s.push_str(&format!("<a href=\"{}\">{}</a>", html_escape(&format!("{}{}", opts.patch_url, name)), PATCH_LINK_LABEL));
    }
    s
}

pub fn render_row(row: &ReportRow, opts: &PageOptions) -> String {
    let r = &row.record;
    format!(
        "<tr bgcolor=\"{}\"><td></td>\n<td><a href=\"{}\">{}</a></td>\n<td>{}</td>\n<td>{}</td>\n<td sorttable_customkey=\"{}\">{}</td>\n<td>{}</td></tr>\n",
        status_color(&r.status),
        html_escape(&build_log_link(&r.name, &r.version, opts)),
        html_escape(&r.name),
        html_escape(&r.version),
        html_escape(r.status.as_str()),
        sort_key(&r.built_at, opts.time_zone),
        display_time(&r.built_at, opts.time_zone),
        compose_remark(&r.name, row.remark.as_deref(), row.has_patch, opts),
    )
}

fn render_shell(opts: &PageOptions) -> String {
    let mut s = String::new();
    s.push_str(&format!("<html><head><title>{}</title>\n", html_escape(&opts.title)));
    s.push_str(&format!("<script src=\"{}\"></script>\n", SORTTABLE_JS));
    s.push_str(&format!("<script src=\"{}\"></script>\n", ROW_COUNTER_JS));
    s.push_str(&format!("<link rel=\"stylesheet\" type=\"text/css\" id=\"table_row_counter\" href=\"{}\"/>\n", ROW_COUNTER_CSS));
    s.push_str("</head><body>\n");
    s.push_str(&format!("<h1>{}</h1>\n", html_escape(&opts.heading)));
    s.push_str(&format!("Build Architecture: {}<br/>Host Architecture: {}<br/>{}<br/>\n", html_escape(&opts.build_arch), html_escape(&opts.host_arch), SUMMARY_PLACEHOLDER));
    s.push_str("<br/><input type=\"checkbox\" onclick=\"tableRemoveCounter(this);\"/> Disable row counter. This helps table sort faster. (Re-enabling will take time)\n");
    s.push_str("<br/><table class=\"sortable\" id=\"sortable\">\n");
    s.push_str(&format!("<tr bgcolor=\"{}\"><th class=\"sorttable_nosort\"></th><th>Source Name</th><th class=\"sorttable_nosort\">Version</th><th width=\"80\">Status</th><th width=\"150\">Build At</th><th>Remark</th></tr>\n", HEADER_COLOR));
    s
}

pub fn summary_line(success: usize, total: usize) -> String { format!("Success: {}<br/>Total: {}", success, total) }

pub fn render_html(rep: &Report, opts: &PageOptions) -> String {
    let mut s = render_shell(opts);
    // The template's own placeholder is the last one in the shell; configured labels come before it.
    if let Some(at) = s.rfind(SUMMARY_PLACEHOLDER) {
        s.replace_range(at..at + SUMMARY_PLACEHOLDER.len(), &summary_line(rep.summary.success, rep.summary.total));
    }
    for row in &rep.rows { s.push_str(&render_row(row, opts)); }
    s.push_str("</table></body></html>");
    s
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&#39;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::{parse_record, StatusRecord};
    use crate::report::Summary;

    fn row(line: &str, remark: Option<&str>, has_patch: bool) -> ReportRow {
        ReportRow { record: parse_record(line).unwrap(), remark: remark.map(str::to_string), has_patch }
    }

    fn record(line: &str) -> StatusRecord { parse_record(line).unwrap() }

    #[test]
    fn colors_per_status() {
        assert_eq!(status_color(&BuildStatus::Attempted), "#e74c3c");
        assert_eq!(status_color(&BuildStatus::Skipped), "#ecf0f1");
        assert_eq!(status_color(&BuildStatus::Successful), "#2ecc71");
        assert_eq!(status_color(&BuildStatus::GivenBack), "#e67e22");
        assert_eq!(status_color(&BuildStatus::from("failed")), DEFAULT_COLOR);
        assert_eq!(status_color(&BuildStatus::from("SKIPPED")), DEFAULT_COLOR);
    }

    #[test]
    fn timestamp_formats() {
        let r = record("a 1 successful 2023-05-02T15:04:05Z");
        assert_eq!(sort_key(&r.built_at, TimeZone::Source), "20230502150405");
        assert_eq!(display_time(&r.built_at, TimeZone::Source), "May  2, 2023 3:04PM");
    }

    #[test]
    fn timestamp_morning_and_midnight() {
        let r = record("a 1 successful 2023-12-25T00:07:00Z");
        assert_eq!(display_time(&r.built_at, TimeZone::Source), "Dec 25, 2023 12:07AM");
        let r = record("a 1 successful 2023-01-10T09:30:59Z");
        assert_eq!(display_time(&r.built_at, TimeZone::Source), "Jan 10, 2023 9:30AM");
    }

    #[test]
    fn utc_zone_converts_offset() {
        let r = record("a 1 successful 2023-05-02T15:04:05+02:00");
        assert_eq!(sort_key(&r.built_at, TimeZone::Source), "20230502150405");
        assert_eq!(sort_key(&r.built_at, TimeZone::Utc), "20230502130405");
        assert_eq!(display_time(&r.built_at, TimeZone::Utc), "May  2, 2023 1:04PM");
    }

    #[test]
    fn local_zone_keeps_instant() {
        use chrono::{NaiveDateTime, Offset, TimeZone as _};
        let r = record("a 1 successful 2023-05-02T15:04:05+02:00");
        let shifted = in_zone(&r.built_at, TimeZone::Local);
        assert_eq!(shifted, r.built_at);
        let local_offset = Local.offset_from_utc_datetime(&r.built_at.naive_utc()).fix();
        assert_eq!(shifted.offset().local_minus_utc(), local_offset.local_minus_utc());
        let key = sort_key(&r.built_at, TimeZone::Local);
        let naive = NaiveDateTime::parse_from_str(&key, "%Y%m%d%H%M%S").unwrap();
        assert_eq!(naive - shifted.naive_local(), chrono::Duration::zero());
        assert_eq!(display_time(&r.built_at, TimeZone::Local), shifted.format("%b %e, %Y %-I:%M%p").to_string());
    }

    #[test]
    fn remark_only() {
        let opts = PageOptions::default();
        assert_eq!(compose_remark("foo", Some("needs review"), false, &opts), "needs review");
    }

    #[test]
    fn patch_link_only_has_no_leading_break() {
        let opts = PageOptions::default();
        let s = compose_remark("bar", None, true, &opts);
        assert_eq!(s, format!("<a href=\"{}bar\">debian-cross-patches</a>", DEFAULT_PATCH_URL));
    }

    #[test]
    fn remark_then_patch_link() {
        let opts = PageOptions::default();
        let s = compose_remark("baz", Some("flaky"), true, &opts);
        assert_eq!(s, format!("flaky<br/><a href=\"{}baz\">debian-cross-patches</a>", DEFAULT_PATCH_URL));
    }

    #[test]
    fn row_links_build_log() {
        let opts = PageOptions::default();
        let s = render_row(&row("bash 5.2-1 given-back 2023-05-02T15:04:05Z", None, false), &opts);
        assert!(s.starts_with("<tr bgcolor=\"#e67e22\"><td></td>\n"));
        assert!(s.contains(&format!("<a href=\"{}bash_5.2-1_armhf.build\">bash</a>", DEFAULT_BUILD_LOG_URL)));
        assert!(s.contains("<td>given-back</td>"));
        assert!(s.contains("<td sorttable_customkey=\"20230502150405\">May  2, 2023 3:04PM</td>"));
        assert!(s.ends_with("<td></td></tr>\n"));
    }

    #[test]
    fn host_arch_changes_log_name() {
        let opts = PageOptions { host_arch: "arm64".to_string(), ..Default::default() };
        assert_eq!(build_log_link("zlib", "1.3", &opts), format!("{}zlib_1.3_arm64.build", DEFAULT_BUILD_LOG_URL));
    }

    #[test]
    fn fields_are_escaped() {
        let opts = PageOptions::default();
        let s = render_row(&row("a<b 1&2 <x> 2023-05-02T15:04:05Z", Some("<script>\"hi\"</script>"), false), &opts);
        assert!(s.contains(">a&lt;b</a>"));
        assert!(s.contains("<td>1&amp;2</td>"));
        assert!(s.contains("<td>&lt;x&gt;</td>"));
        assert!(s.contains("&lt;script&gt;&quot;hi&quot;&lt;/script&gt;"));
        assert!(!s.contains("<script>"));
    }

    #[test]
    fn page_has_summary_and_rows_in_order() {
        let opts = PageOptions::default();
        let rep = Report {
            rows: vec![
                row("zz 1 successful 2023-05-02T15:04:05Z", None, false),
                row("aa 1 attempted 2023-05-01T15:04:05Z", Some("##Summary##"), false),
            ],
            summary: Summary { success: 1, total: 2, by_status: vec![] },
            skipped: vec![],
        };
        let page = render_html(&rep, &opts);
        assert!(page.starts_with("<html><head><title>Sbuild Status</title>\n"));
        assert!(page.contains("<h1>Debian cross-build state</h1>"));
        assert!(page.contains("Build Architecture: amd64<br/>Host Architecture: armhf<br/>Success: 1<br/>Total: 2<br/>"));
        assert!(page.contains("<td>##Summary##</td>"));
        assert!(page.ends_with("</table></body></html>"));
        assert_eq!(page.matches("<tr bgcolor=").count(), 3);
        assert!(page.find(">zz</a>").unwrap() < page.find(">aa</a>").unwrap());
    }

    #[test]
    fn rendering_is_deterministic() {
        let opts = PageOptions::default();
        let rep = Report { rows: vec![row("a 1 skipped 2023-05-02T15:04:05Z", Some("r"), true)], summary: Summary::default(), skipped: vec![] };
        assert_eq!(render_html(&rep, &opts), render_html(&rep, &opts));
    }
}
