//! CLI entry point for `mailcast`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use clap::{Args, CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailcast::campaign::{Campaign, LiveDelivery, Mode};
use mailcast::clock::{Clock, SystemClock};
use mailcast::config::{self, CampaignConfig, Config, Credentials};
use mailcast::error::MailcastError;
use mailcast::model::attachment::Attachment;
use mailcast::model::outcome::{Outcome, RunSummary, Status};
use mailcast::model::record::FIELD_EMAIL;
use mailcast::rate_limit::RateLimiter;
use mailcast::runlog::RunLogger;
use mailcast::source;
use mailcast::template::{Template, DEFAULT_TEMPLATE_FILE};
use mailcast::transport::retry::with_retry;
use mailcast::transport::smtp::SmtpSession;
use mailcast::validate::{validate, ValidationOutcome};

#[derive(Parser)]
#[command(
    name = "mailcast",
    version,
    about = "Send a personalized email with an attachment to every contact in a table",
    long_about = "Reads a contact table (SNo, Name, Email, Title, Company), renders a \
                  template per contact and sends it over SMTP with rate limiting and \
                  retries. Every row gets one line in the run log. Without --send the \
                  run is a preview: nothing is sent."
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    run: RunArgs,

    /// Config file (overrides $MAILCAST_CONFIG and the default location)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Args)]
struct RunArgs {
    /// Contact table (comma, tab or whitespace separated)
    #[arg(short = 'c', long = "csv", value_name = "FILE")]
    csv: Option<PathBuf>,

    /// File attached to every message
    #[arg(short = 'r', long = "resume", value_name = "FILE")]
    resume: Option<PathBuf>,

    /// Template file (first line may be "Subject: ...")
    #[arg(short = 't', long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Actually send. Without this flag the run only previews.
    #[arg(long)]
    send: bool,

    /// Sending rate
    #[arg(long, value_name = "N")]
    emails_per_minute: Option<f64>,

    /// Run log (appended to)
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,

    /// Retries after the first attempt for transient SMTP failures
    #[arg(long, value_name = "N")]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and validate the contact table and template without sending
    Check {
        /// Contact table
        #[arg(short = 'c', long = "csv", value_name = "FILE")]
        csv: Option<PathBuf>,
        /// Template file
        #[arg(short = 't', long, value_name = "FILE")]
        template: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config(cli.config.as_deref())?;

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let config_source = config::config_source(cli.config.as_deref());
    setup_logging(log_level, &config, config_source.as_deref());

    match cli.command {
        None => cmd_run(&cli.run, &config),
        Some(Commands::Check {
            csv,
            template,
            json,
        }) => cmd_check(csv.as_deref(), template.as_deref(), json, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Diagnostic log written next to the cache, separate from the run log.
const DIAGNOSTIC_LOG: &str = "mailcast.log";

/// Install the tracing subscriber: stderr always, plus [`DIAGNOSTIC_LOG`] in
/// the cache directory when that directory can be created.
fn setup_logging(level: &str, config: &Config, config_source: Option<&Path>) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    let dir_error = std::fs::create_dir_all(&log_dir).err();
    let file_layer = dir_error.is_none().then(|| {
        tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(tracing_appender::rolling::never(&log_dir, DIAGNOSTIC_LOG))
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    if let Some(e) = dir_error {
        tracing::warn!(dir = %log_dir.display(), error = %e, "Diagnostic log disabled");
    }
    tracing::debug!(
        filter = level,
        config = %config_source
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in defaults".to_string()),
        diagnostic_log = %log_dir.join(DIAGNOSTIC_LOG).display(),
        contacts = %config.campaign.contacts.display(),
        run_log = %config.campaign.log_path.display(),
        smtp_host = %config.smtp.host,
        "Logging initialised"
    );
}

/// Merge command-line overrides into the configured campaign settings.
fn campaign_settings(args: &RunArgs, config: &Config) -> CampaignConfig {
    let mut settings = config.campaign.clone();
    if let Some(ref csv) = args.csv {
        settings.contacts = csv.clone();
    }
    if let Some(ref resume) = args.resume {
        settings.attachment = resume.clone();
    }
    if let Some(ref template) = args.template {
        settings.template = Some(template.clone());
    }
    if let Some(ref log) = args.log {
        settings.log_path = log.clone();
    }
    if let Some(rate) = args.emails_per_minute {
        settings.emails_per_minute = rate;
    }
    if let Some(retries) = args.max_retries {
        settings.max_retries = retries;
    }
    settings
}

/// The template to use: the given one, else `email_template.txt` if present.
fn template_path(explicit: Option<&Path>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => {
            let default = PathBuf::from(DEFAULT_TEMPLATE_FILE);
            default.exists().then_some(default)
        }
    }
}

/// Run a campaign (preview or live).
fn cmd_run(args: &RunArgs, config: &Config) -> anyhow::Result<()> {
    let settings = campaign_settings(args, config);
    settings.validate()?;

    let template = Template::load(template_path(settings.template.as_deref()).as_deref())?;
    let attachment = Attachment::load(&settings.attachment)?;

    let mode = if args.send {
        Mode::Live(open_live_delivery(&settings, config)?)
    } else {
        tracing::info!("Preview mode: no emails will be sent (pass --send to deliver)");
        Mode::Preview
    };

    let text = source::read_table(&settings.contacts)?;
    let rows = source::parse(&text);
    tracing::info!(
        path = %settings.contacts.display(),
        delimiter = %rows.dialect().delimiter,
        "Parsed contact table"
    );

    let logger = RunLogger::open(&settings.log_path)?;
    let mut campaign = Campaign::new(template, attachment.clone(), logger, mode);

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {pos} processed  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(120));

    let start = Instant::now();
    let summary = campaign.run(
        rows,
        Some(&|outcome: &Outcome| {
            pb.set_message(format!("#{} {} {}", outcome.sno, outcome.email, outcome.status));
            pb.inc(1);
        }),
    )?;
    pb.finish_and_clear();

    print_summary(&summary, &settings, &attachment, args.send, start.elapsed());
    Ok(())
}

/// Read credentials and authenticate once, retrying transient connection
/// failures with the same backoff as sends.
fn open_live_delivery(settings: &CampaignConfig, config: &Config) -> anyhow::Result<LiveDelivery> {
    let credentials = Credentials::from_env()?;
    let sender_name = config::sender_name_from_env();
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::new());

    let limiter = RateLimiter::new(settings.emails_per_minute, clock.clone())?;
    let session = with_retry(clock.as_ref(), settings.max_retries, |_| {
        SmtpSession::connect(&config.smtp, &credentials, sender_name.as_deref())
    })
    .map_err(|failure| MailcastError::Session(failure.error))?;

    Ok(LiveDelivery::new(
        Box::new(session),
        limiter,
        settings.max_retries,
        clock,
    ))
}

/// Validate a contact table and template without sending or logging.
fn cmd_check(
    csv: Option<&Path>,
    template: Option<&Path>,
    json: bool,
    config: &Config,
) -> anyhow::Result<()> {
    let contacts = csv.unwrap_or(&config.campaign.contacts);
    let template_file = template_path(template.or(config.campaign.template.as_deref()));
    let template = Template::load(template_file.as_deref())?;

    let text = source::read_table(contacts)?;
    let rows = source::parse(&text);
    let dialect = rows.dialect();

    let checked: Vec<(u64, String, ValidationOutcome)> = rows
        .map(|row| {
            let email = row.get(FIELD_EMAIL).to_string();
            (row.ordinal(), email, validate(&row))
        })
        .collect();
    let valid = checked.iter().filter(|(_, _, v)| v.is_valid()).count();

    if json {
        let items: Vec<serde_json::Value> = checked
            .iter()
            .map(|(sno, email, outcome)| match outcome {
                ValidationOutcome::Valid(record) => serde_json::json!({
                    "sno": sno,
                    "valid": true,
                    "record": record,
                }),
                ValidationOutcome::Invalid(reason) => serde_json::json!({
                    "sno": sno,
                    "valid": false,
                    "email": email,
                    "reason": reason,
                }),
            })
            .collect();
        let report = serde_json::json!({
            "file": contacts.to_string_lossy(),
            "dialect": dialect,
            "template": template_file.as_ref().map(|p| p.to_string_lossy().into_owned()),
            "subject": template.subject,
            "rows": checked.len(),
            "valid": valid,
            "records": items,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("  {:<20} {}", "File", contacts.display());
    println!("  {:<20} {} ({:?})", "Delimiter", dialect.delimiter, dialect.detection);
    println!(
        "  {:<20} {}",
        "Template",
        template_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string())
    );
    println!("  {:<20} {}", "Subject", template.subject);
    println!("  {:<20} {} of {}", "Valid rows", valid, checked.len());
    println!();

    if checked.is_empty() {
        return Ok(());
    }

    println!("  {:<6} {:<8} {:<32} {}", "SNo", "Status", "Email", "Reason");
    println!("  {}", "-".repeat(78));
    for (sno, email, outcome) in &checked {
        let email_trunc: String = email.chars().take(31).collect();
        match outcome {
            ValidationOutcome::Valid(_) => {
                println!("  {:<6} {:<8} {:<32}", sno, "ok", email_trunc);
            }
            ValidationOutcome::Invalid(reason) => {
                println!("  {:<6} {:<8} {:<32} {}", sno, "skip", email_trunc, reason);
            }
        }
    }
    println!();
    Ok(())
}

/// Print completion script for `shell` under the command's own name.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, name, &mut std::io::stdout().lock());
    Ok(())
}

/// Render the roff man page to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let mut out = std::io::stdout().lock();
    clap_mangen::Man::new(Cli::command()).render(&mut out)?;
    std::io::Write::flush(&mut out)?;
    Ok(())
}

/// Print the end-of-run banner.
fn print_summary(
    summary: &RunSummary,
    settings: &CampaignConfig,
    attachment: &Attachment,
    live: bool,
    elapsed: Duration,
) {
    use humansize::{format_size, BINARY};

    println!();
    println!(
        "  {:<20} {}",
        "Mode",
        if live { "live" } else { "preview (nothing sent)" }
    );
    println!("  {:<20} {}", "Processed", summary.total);
    for status in [Status::Sent, Status::Failed, Status::Skipped, Status::Previewed] {
        let count = summary.count(status);
        if count > 0 {
            println!("  {:<20} {}", status.as_str(), count);
        }
    }
    println!(
        "  {:<20} {} ({})",
        "Attachment",
        attachment.filename,
        format_size(attachment.size(), BINARY)
    );
    println!("  {:<20} {}", "Run log", settings.log_path.display());
    println!("  {:<20} {:.2?}", "Elapsed", elapsed);
    println!();
}
