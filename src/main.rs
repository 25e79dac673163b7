use std::path::Path;
use std::sync::OnceLock;
use anyhow::Context;
use clap::{Parser, ValueEnum, ColorChoice, ArgAction, CommandFactory};
use clap_complete::Shell;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use serde::{Deserialize, Serialize};
use is_terminal::IsTerminal;
mod status;
mod remarks;
mod patches;
mod report;
mod html;
mod export;
mod output;

static ENABLE_COLOR: OnceLock<bool> = OnceLock::new();

const DEFAULT_STATUS_FILE: &str = "sbuild-status";
const DEFAULT_REMARK_FILE: &str = "remark.json";
const DEFAULT_PATCH_DIR: &str = "debian-cross-patches";
const DEFAULT_OUTPUT: &str = "index.html";
const DEFAULT_CONFIG: &str = "sbuild-gen.toml";

/// Zone used for the displayed build time and its sort key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TimeZone { Source, Utc, Local }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogLevel { Error, Warn, Info, Debug, Trace }

#[derive(Clone, Copy, Debug, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LogFormat { Text, Json }

#[derive(Parser, Debug)]
#[command(
    name = "sbuild-gen",
    about = "Render an sbuild status log as a sortable HTML status page",
    long_about = "Reads an sbuild status log and a remark map and writes a static HTML page listing every package build with its status, build time, remarks and links to build logs and cross-build patches.",
    after_long_help = "Examples:\n  sbuild-gen\n  sbuild-gen --status-file out/sbuild-status --output public/index.html\n  sbuild-gen --host-arch arm64 --json-path status.json\n  sbuild-gen --summary-only -v",
    color = ColorChoice::Auto
)]
struct Args {
    #[arg(long, short = 's', default_value = DEFAULT_STATUS_FILE)]
    status_file: String,
    #[arg(long, short = 'r', default_value = DEFAULT_REMARK_FILE)]
    remark_file: String,
    /// Local checkout of the cross-build patches; one directory per package
    #[arg(long, short = 'p', default_value = DEFAULT_PATCH_DIR)]
    patch_dir: String,
    #[arg(long, short = 'o', default_value = DEFAULT_OUTPUT)]
    output: String,
    #[arg(long, default_value = html::DEFAULT_BUILD_LOG_URL)]
    build_log_url: String,
    #[arg(long, default_value = html::DEFAULT_PATCH_URL)]
    patch_url: String,
    #[arg(long, default_value = "amd64")]
    build_arch: String,
    #[arg(long, default_value = "armhf")]
    host_arch: String,
    #[arg(long, default_value = "Sbuild Status")]
    title: String,
    #[arg(long, default_value = "Debian cross-build state")]
    heading: String,
    #[arg(long, value_enum, default_value = "source")]
    time_zone: TimeZone,
    #[arg(long, short = 'j')]
    json_path: Option<String>,
    #[arg(long)]
    csv_path: Option<String>,
    /// Print the summary table without writing the HTML page
    #[arg(long, default_value_t = false)]
    summary_only: bool,
    /// Exit with status 2 when any status line was skipped
    #[arg(long, default_value_t = false)]
    warnings_as_errors: bool,
    #[arg(long)]
    config: Option<String>,
    #[arg(long, short = 'C', default_value_t = false)]
    no_color: bool,
    #[arg(long, default_value_t = false)]
    force_color: bool,
    #[arg(long)]
    log_level: Option<LogLevel>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
    #[arg(long)]
    log_path: Option<String>,
    #[arg(short = 'v', long, action = ArgAction::Count)]
    verbose: u8,
    #[arg(short = 'q', long, default_value_t = false)]
    quiet: bool,
    #[arg(long, value_enum)]
    completions: Option<Shell>,
    #[arg(long)]
    completions_out: Option<String>,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            status_file: DEFAULT_STATUS_FILE.to_string(),
            remark_file: DEFAULT_REMARK_FILE.to_string(),
            patch_dir: DEFAULT_PATCH_DIR.to_string(),
            output: DEFAULT_OUTPUT.to_string(),
            build_log_url: html::DEFAULT_BUILD_LOG_URL.to_string(),
            patch_url: html::DEFAULT_PATCH_URL.to_string(),
            build_arch: "amd64".to_string(),
            host_arch: "armhf".to_string(),
            title: "Sbuild Status".to_string(),
            heading: "Debian cross-build state".to_string(),
            time_zone: TimeZone::Source,
            json_path: None,
            csv_path: None,
            summary_only: false,
            warnings_as_errors: false,
            config: None,
            no_color: false,
            force_color: false,
            log_level: None,
            log_format: None,
            log_path: None,
            verbose: 0,
            quiet: false,
            completions: None,
            completions_out: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct AppConfig {
    status_file: Option<String>,
    remark_file: Option<String>,
    patch_dir: Option<String>,
    output: Option<String>,
    build_log_url: Option<String>,
    patch_url: Option<String>,
    build_arch: Option<String>,
    host_arch: Option<String>,
    title: Option<String>,
    heading: Option<String>,
    time_zone: Option<TimeZone>,
    json_path: Option<String>,
    csv_path: Option<String>,
    warnings_as_errors: Option<bool>,
    log_level: Option<LogLevel>,
    log_format: Option<LogFormat>,
    log_path: Option<String>,
}

fn main() {
    let mut args = Args::parse();
    if let Some(sh) = args.completions {
        write_completions(sh, args.completions_out.as_deref());
        return;
    }
    // Logging is not up yet; config problems are collected and reported after init.
    let config_warning = match load_config(&args) {
        Ok(Some(cfg)) => { apply_config(&mut args, cfg); None }
        Ok(None) => None,
        Err(e) => Some(e),
    };
    init_logging(&args);
    if let Some(e) = config_warning { log::warn!("{:#}", e); }
    let term = std::env::var("TERM").unwrap_or_default();
    let no_color_env = std::env::var_os("NO_COLOR").is_some();
    let color_default = std::io::stdout().is_terminal() && !no_color_env && term != "dumb";
    let _ = ENABLE_COLOR.set(args.force_color || (color_default && !args.no_color));
    match run(&args) {
        Ok(0) => {}
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::debug!("{:?}", e);
            eprintln!("sbuild-gen: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Writes completions to `path`, or to stdout when no path is given or it cannot be created.
/// Returns whether the file was written.
fn write_completions(sh: Shell, path: Option<&str>) -> bool {
    let mut cmd = Args::command();
    if let Some(path) = path {
        match std::fs::File::create(path) {
            Ok(mut f) => { clap_complete::generate(sh, &mut cmd, "sbuild-gen", &mut f); return true; }
            Err(e) => eprintln!("Failed to create completions file {}: {}; writing to stdout", path, e),
        }
    }
    clap_complete::generate(sh, &mut cmd, "sbuild-gen", &mut std::io::stdout());
    false
}

fn load_config(args: &Args) -> anyhow::Result<Option<AppConfig>> {
    let (path, explicit) = match args.config.as_ref() { Some(p) => (p.as_str(), true), None => (DEFAULT_CONFIG, false) };
    let s = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if !explicit && e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("failed to read config {}", path)),
    };
    let cfg = toml::from_str::<AppConfig>(&s).with_context(|| format!("failed to parse config {}", path))?;
    Ok(Some(cfg))
}

fn apply_config(args: &mut Args, cfg: AppConfig) {
    if args.status_file == DEFAULT_STATUS_FILE && let Some(v) = cfg.status_file { args.status_file = v; }
    if args.remark_file == DEFAULT_REMARK_FILE && let Some(v) = cfg.remark_file { args.remark_file = v; }
    if args.patch_dir == DEFAULT_PATCH_DIR && let Some(v) = cfg.patch_dir { args.patch_dir = v; }
    if args.output == DEFAULT_OUTPUT && let Some(v) = cfg.output { args.output = v; }
    if args.build_log_url == html::DEFAULT_BUILD_LOG_URL && let Some(v) = cfg.build_log_url { args.build_log_url = v; }
    if args.patch_url == html::DEFAULT_PATCH_URL && let Some(v) = cfg.patch_url { args.patch_url = v; }
    if args.build_arch == "amd64" && let Some(v) = cfg.build_arch { args.build_arch = v; }
    if args.host_arch == "armhf" && let Some(v) = cfg.host_arch { args.host_arch = v; }
    if args.title == "Sbuild Status" && let Some(v) = cfg.title { args.title = v; }
    if args.heading == "Debian cross-build state" && let Some(v) = cfg.heading { args.heading = v; }
    if args.time_zone == TimeZone::Source && let Some(v) = cfg.time_zone { args.time_zone = v; }
    if args.json_path.is_none() && let Some(v) = cfg.json_path { args.json_path = Some(v); }
    if args.csv_path.is_none() && let Some(v) = cfg.csv_path { args.csv_path = Some(v); }
    if let Some(v) = cfg.warnings_as_errors { args.warnings_as_errors = args.warnings_as_errors || v; }
    if args.log_level.is_none() && let Some(v) = cfg.log_level { args.log_level = Some(v); }
    if args.log_format.is_none() && let Some(v) = cfg.log_format { args.log_format = Some(v); }
    if args.log_path.is_none() && let Some(v) = cfg.log_path { args.log_path = Some(v); }
}

fn init_logging(args: &Args) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if let Some(lvl) = args.log_level {
        let f = match lvl { LogLevel::Error => log::LevelFilter::Error, LogLevel::Warn => log::LevelFilter::Warn, LogLevel::Info => log::LevelFilter::Info, LogLevel::Debug => log::LevelFilter::Debug, LogLevel::Trace => log::LevelFilter::Trace };
        builder.filter_level(f);
    } else if args.verbose > 0 {
        let f = if args.verbose >= 3 { log::LevelFilter::Trace } else if args.verbose == 2 { log::LevelFilter::Debug } else { log::LevelFilter::Info };
        builder.filter_level(f);
    }
    if let Some(fmt) = args.log_format {
        match fmt {
            LogFormat::Json => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().to_rfc3339();
                    let obj = serde_json::json!({
                        "ts": ts,
                        "level": record.level().to_string(),
                        "target": record.target(),
                        "msg": record.args().to_string(),
                    });
                    writeln!(buf, "{}", obj)
                });
            }
            LogFormat::Text => {
                builder.format(|buf, record| {
                    use std::io::Write;
                    let ts = chrono::Local::now().format("%H:%M:%S");
                    writeln!(buf, "[{:<5} {}] {}", record.level(), ts, record.args())
                });
            }
        }
    }
    if let Some(path) = args.log_path.as_ref() {
        match std::fs::File::create(path) {
            Ok(f) => { builder.target(env_logger::Target::Pipe(Box::new(f))); }
            Err(e) => { eprintln!("Failed to open log file {}: {}", path, e); }
        }
    }
    builder.init();
}

fn page_options(args: &Args) -> html::PageOptions {
    html::PageOptions {
        title: args.title.clone(),
        heading: args.heading.clone(),
        build_arch: args.build_arch.clone(),
        host_arch: args.host_arch.clone(),
        build_log_url: args.build_log_url.clone(),
        patch_url: args.patch_url.clone(),
        time_zone: args.time_zone,
    }
}

/// Runs one generation pass and returns the process exit code.
fn run(args: &Args) -> anyhow::Result<i32> {
    let status_log = status::load_status_log(Path::new(&args.status_file))?;
    let remarks = remarks::load_remarks(Path::new(&args.remark_file));
    let patches = patches::PatchDir::new(&args.patch_dir);
    let report = report::build_report(status_log, &remarks, &patches);
    let opts = page_options(args);
    if !args.summary_only {
        let page = html::render_html(&report, &opts);
        output::write_atomic(Path::new(&args.output), page.as_bytes())
            .with_context(|| format!("failed to write status page {}", args.output))?;
        log::info!("Wrote {} ({} rows)", args.output, report.rows.len());
    }
    if let Some(p) = args.json_path.as_ref() {
        export::write_json(p, &report, &opts, &args.status_file).with_context(|| format!("failed to write JSON report {}", p))?;
        log::info!("Wrote {}", p);
    }
    if let Some(p) = args.csv_path.as_ref() {
        export::write_csv(p, &report).with_context(|| format!("failed to write CSV report {}", p))?;
        log::info!("Wrote {}", p);
    }
    if !args.quiet { print_summary(&report); }
    if !report.skipped.is_empty() {
        log::warn!("{} status line(s) skipped as malformed", report.skipped.len());
        if args.warnings_as_errors { return Ok(2); }
    }
    Ok(0)
}

fn print_summary(rep: &report::Report) {
    println!("{}", summary_table(rep, color_enabled()));
    println!("{}", paint(&format!("Success: {} / Total: {}", rep.summary.success, rep.summary.total), "1;36"));
    if !rep.skipped.is_empty() { println!("{}", paint(&format!("Skipped lines: {}", rep.skipped.len()), "33")); }
}

// Styling goes through comfy-table cells so column widths ignore escape codes.
fn summary_table(rep: &report::Report, color: bool) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    if color { table.enforce_styling(); } else { table.force_no_tty(); }
    table.set_header(["Status", "Color", "Count"].map(|h| Cell::new(h).add_attribute(Attribute::Bold)));
    for (s, c) in &rep.summary.by_status {
        let st = status::BuildStatus::from(s.as_str());
        let (fg, bold) = status_style(&st);
        let mut name = Cell::new(s).fg(fg);
        if bold { name = name.add_attribute(Attribute::Bold); }
        table.add_row(vec![name, Cell::new(html::status_color(&st)), Cell::new(c)]);
    }
    table
}

fn status_style(s: &status::BuildStatus) -> (Color, bool) {
    match s { status::BuildStatus::Successful => (Color::Green, false), status::BuildStatus::Attempted => (Color::Red, false), status::BuildStatus::GivenBack => (Color::Yellow, false), status::BuildStatus::Skipped => (Color::Grey, false), status::BuildStatus::Other(_) => (Color::Red, true) }
}

fn color_enabled() -> bool { *ENABLE_COLOR.get().unwrap_or(&false) }

fn paint(s: &str, code: &str) -> String {
    if color_enabled() { format!("\x1b[{}m{}\x1b[0m", code, s) } else { s.to_string() }
}
