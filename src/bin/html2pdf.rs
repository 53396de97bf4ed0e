//! CLI binary for html2pdf-client.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClientConfig` + `ConversionOptions`, picks a sink, and reports the outcome.

use anyhow::{Context, Result};
use clap::Parser;
use html2pdf_client::config::DEFAULT_HOST;
use html2pdf_client::{
    file_sink, ClientConfig, ConversionOptions, ConversionProgressCallback, Credentials,
    Html2PdfClient, Outcome, OutputSink, ProgressCallback, WriterSink,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that tracks upload, status and downloaded bytes.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Preparing");
        bar.set_message("Building request…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self { bar })
    }
}

impl ConversionProgressCallback for CliProgressCallback {
    fn on_request_sent(&self, body_len: usize) {
        self.bar.set_prefix("Uploading");
        self.bar.set_message(format!("{body_len} bytes"));
    }

    fn on_response(&self, status: u16) {
        self.bar.set_prefix("Converting");
        self.bar.set_message(format!("HTTP {status}"));
    }

    fn on_chunk(&self, total_bytes: u64) {
        self.bar.set_prefix("Receiving");
        self.bar
            .set_message(format!("{}", indicatif::HumanBytes(total_bytes)));
    }

    fn on_complete(&self, _outcome: &Outcome) {
        self.bar.finish_and_clear();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert an HTML string (PDF on stdout)
  html2pdf '<h1>Hello</h1>' > hello.pdf

  # Convert to file
  html2pdf '<h1>Hello</h1>' -o hello.pdf

  # Convert a web page (the service fetches it)
  html2pdf --url https://example.com -o example.pdf

  # Convert a local HTML file with rendering options
  html2pdf --file report.html -O width=210mm -O height=297mm -o report.pdf

  # Options from a JSON object, outcome as JSON on stderr
  html2pdf --file report.html --options-file opts.json --json -o report.pdf

ENVIRONMENT VARIABLES:
  HTML2PDF_USERNAME       Account identifier
  HTML2PDF_API_KEY        Secret API key
  HTML2PDF_HOST           Service host (default: pdfcrowd.com)
  HTML2PDF_PORT           Service port (default: 80, or 443 with --https)
  RUST_LOG                Override log filter (e.g. html2pdf_client=debug)

EXIT STATUS:
  0 when a PDF was delivered, 1 for any upstream, transport or output failure.
"#;

/// Convert HTML, URLs and local HTML files to PDF via the remote service.
#[derive(Parser, Debug)]
#[command(
    name = "html2pdf",
    version,
    about = "Convert HTML, URLs and local HTML files to PDF via a remote conversion service",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// HTML markup to convert.
    #[arg(
        conflicts_with_all = ["url", "file"],
        required_unless_present_any = ["url", "file"]
    )]
    html: Option<String>,

    /// Convert the page at this http:// or https:// URL instead.
    #[arg(long, conflicts_with = "file")]
    url: Option<String>,

    /// Convert the contents of this local HTML file instead.
    #[arg(long)]
    file: Option<PathBuf>,

    /// Write the PDF to this file instead of stdout.
    #[arg(short, long, env = "HTML2PDF_OUTPUT")]
    output: Option<PathBuf>,

    /// Rendering option passed through verbatim (repeatable).
    #[arg(short = 'O', long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    options: Vec<(String, String)>,

    /// JSON object of rendering options; `--option` values take precedence.
    #[arg(long, env = "HTML2PDF_OPTIONS_FILE")]
    options_file: Option<PathBuf>,

    /// Account identifier.
    #[arg(long, env = "HTML2PDF_USERNAME", hide_env_values = true)]
    username: String,

    /// Secret API key.
    #[arg(long, env = "HTML2PDF_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Service host.
    #[arg(long, env = "HTML2PDF_HOST", default_value = DEFAULT_HOST)]
    host: String,

    /// Service port.
    #[arg(long, env = "HTML2PDF_PORT")]
    port: Option<u16>,

    /// Connect over HTTPS.
    #[arg(long, env = "HTML2PDF_HTTPS")]
    https: bool,

    /// Whole-request timeout in seconds (default: none).
    #[arg(long, env = "HTML2PDF_TIMEOUT", value_parser = clap::value_parser!(u64).range(1..))]
    timeout: Option<u64>,

    /// Print the outcome as JSON on stderr.
    #[arg(long)]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "HTML2PDF_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "HTML2PDF_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "HTML2PDF_QUIET")]
    quiet: bool,
}

fn parse_option(s: &str) -> Result<(String, String), String> {
    ConversionOptions::parse_pair(s).ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner already reports progress; keep library INFO logs out of
    // its way unless --verbose was given.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build client ─────────────────────────────────────────────────────
    let options = build_options(&cli).await?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn ConversionProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let client = Html2PdfClient::with_config(
        Credentials::new(cli.username.as_str(), cli.api_key.as_str()),
        config,
    )
    .context("Failed to create client")?;

    // ── Pick sink ────────────────────────────────────────────────────────
    let sink: Box<dyn OutputSink> = match cli.output {
        Some(ref path) => Box::new(
            file_sink(path)
                .await
                .with_context(|| format!("Failed to open output {}", path.display()))?,
        ),
        None => Box::new(WriterSink::stdout()),
    };

    // ── Run conversion ───────────────────────────────────────────────────
    let started = if let Some(ref url) = cli.url {
        client.convert_uri(url, sink, Some(&options))
    } else if let Some(ref path) = cli.file {
        client.convert_file(path, sink, Some(&options)).await
    } else {
        client.convert(cli.html.as_deref().unwrap_or_default(), sink, Some(&options))
    };
    let handle = started.context("Conversion could not start")?;

    let done = handle.await.context("Conversion failed")?;

    if cli.json {
        eprintln!(
            "{}",
            serde_json::to_string_pretty(&done.outcome).context("Failed to serialise outcome")?
        );
    }

    let result = exit_result(&done.outcome);
    if !cli.quiet && !cli.json {
        match (&done.outcome, &result) {
            (Outcome::Delivered { bytes }, _) => {
                let target = cli
                    .output
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "stdout".to_string());
                eprintln!(
                    "{}  {}  →  {}",
                    green("✔"),
                    dim(&indicatif::HumanBytes(*bytes).to_string()),
                    bold(&target),
                );
            }
            (_, Err(e)) => eprintln!("{} {}", red("✘"), e),
            (_, Ok(())) => {}
        }
    }
    result
}

/// Only a delivered PDF exits with status 0.
fn exit_result(outcome: &Outcome) -> Result<()> {
    match outcome {
        Outcome::Delivered { .. } => Ok(()),
        failed => anyhow::bail!("{}", failed.summary()),
    }
}

/// Merge `--options-file` and `--option` flags into one option map.
async fn build_options(cli: &Cli) -> Result<ConversionOptions> {
    let mut options = if let Some(ref path) = cli.options_file {
        let text = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read options from {:?}", path))?;
        serde_json::from_str::<ConversionOptions>(&text)
            .with_context(|| format!("Invalid options JSON in {:?}", path))?
    } else {
        ConversionOptions::new()
    };

    options.extend(cli.options.iter().cloned());
    Ok(options)
}

/// Map CLI args to `ClientConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClientConfig> {
    let mut builder = ClientConfig::builder().host(cli.host.as_str()).use_https(cli.https);

    if let Some(port) = cli.port {
        builder = builder.port(port);
    }
    if let Some(secs) = cli.timeout {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
