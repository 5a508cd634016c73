use clap::{Parser, Subcommand};
use serde_json::Value;
use std::io::{IsTerminal, Read};
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use payouts::config::{
    config_dir, expand_path, load_config, load_session, save_session, Config, CONFIG_TEMPLATE,
};
use payouts::format::format_money;
use payouts::{
    extract_payments, fetch_payments, InvalidRangePolicy, OwedQuery, OwedReport, PayoutError,
    ReportSettings, Result,
};

#[derive(Parser)]
#[command(name = "payouts")]
#[command(version, about = "Provider payout reporting for the marketplace admin API", long_about = None)]
struct Cli {
    /// Path to config directory (default: ~/.payouts or XDG config)
    #[arg(short = 'C', long, global = true)]
    config_dir: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config directory with a template config.toml
    Init,

    /// Show configuration and session state
    Status,

    /// Store the admin API token for later requests
    Login {
        /// Bearer token issued by the admin backend
        #[arg(long)]
        token: String,
    },

    /// Forget the stored admin API token
    Logout,

    /// Show, set or clear the country workspace used to scope requests
    Country {
        /// 2-letter country code (e.g., ZA)
        code: Option<String>,

        /// Clear the selected country workspace
        #[arg(long, conflicts_with = "code")]
        clear: bool,
    },

    /// Compute what each provider is owed over a date range
    Owed {
        /// First day of the range, inclusive (YYYY-MM-DD, UTC)
        #[arg(long)]
        from: String,

        /// Last day of the range, inclusive (YYYY-MM-DD, UTC)
        #[arg(long)]
        to: String,

        /// Only include this provider id
        #[arg(short, long)]
        provider: Option<String>,

        /// Read payments from a JSON file ('-' for stdin) instead of the API
        #[arg(short, long, value_name = "PATH")]
        input: Option<String>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,

        /// Also list the individual line items
        #[arg(long)]
        rows: bool,

        /// Write the JSON report to this file
        #[arg(short, long)]
        output: Option<String>,

        /// How to treat an unparseable --from/--to (accept-all, reject-all)
        #[arg(long, value_name = "POLICY")]
        on_invalid_range: Option<InvalidRangePolicy>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let cfg_dir = match cli.config_dir {
        Some(p) => p,
        None => config_dir()?,
    };

    match cli.command {
        Commands::Init => cmd_init(&cfg_dir),
        Commands::Status => cmd_status(&cfg_dir),
        Commands::Login { token } => cmd_login(&cfg_dir, &token),
        Commands::Logout => cmd_logout(&cfg_dir),
        Commands::Country { code, clear } => cmd_country(&cfg_dir, code.as_deref(), clear),
        Commands::Owed {
            from,
            to,
            provider,
            input,
            json,
            rows,
            output,
            on_invalid_range,
        } => cmd_owed(
            &cfg_dir,
            OwedArgs {
                from,
                to,
                provider,
                input,
                json,
                rows,
                output,
                on_invalid_range,
            },
        ),
    }
}

/// Initialize config directory with template files
fn cmd_init(cfg_dir: &Path) -> Result<()> {
    use std::fs;

    if cfg_dir.exists() {
        return Err(PayoutError::AlreadyInitialized(cfg_dir.to_path_buf()));
    }

    fs::create_dir_all(cfg_dir)?;
    fs::write(cfg_dir.join("config.toml"), CONFIG_TEMPLATE)?;

    println!("Initialized payouts config at: {}", cfg_dir.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Point at your admin API:  $EDITOR {}/config.toml",
        cfg_dir.display()
    );
    println!("  2. Store your token:         payouts login --token <TOKEN>");
    println!("  3. Pick a country workspace: payouts country ZA");
    println!();
    println!("Then compute payouts:");
    println!("  payouts owed --from 2024-05-01 --to 2024-05-31");

    Ok(())
}

fn require_config_dir(cfg_dir: &Path) -> Result<()> {
    if !cfg_dir.exists() {
        return Err(PayoutError::ConfigNotFound(cfg_dir.to_path_buf()));
    }
    Ok(())
}

/// Show configuration and session state
fn cmd_status(cfg_dir: &Path) -> Result<()> {
    require_config_dir(cfg_dir)?;

    let config = load_config(cfg_dir)?;
    let session = load_session(cfg_dir)?;

    println!("Payouts Status");
    println!("{}", "-".repeat(50));
    println!("Config directory: {}", cfg_dir.display());
    println!("Payments API:     {}", config.api.payments_url());
    println!("Timeout:          {}s", config.api.timeout_secs);
    println!("Invalid ranges:   {}", config.report.on_invalid_range);
    println!(
        "Logged in:        {}",
        if session.is_logged_in() { "yes" } else { "no" }
    );
    println!(
        "Country:          {}",
        session.country_code.as_deref().unwrap_or("(all)")
    );

    Ok(())
}

fn cmd_login(cfg_dir: &Path, token: &str) -> Result<()> {
    require_config_dir(cfg_dir)?;

    let mut session = load_session(cfg_dir)?;
    session.token = Some(token.trim().to_string());
    if !session.is_logged_in() {
        return Err(PayoutError::NotLoggedIn);
    }
    save_session(cfg_dir, &session)?;

    println!("Token saved to {}/session.toml", cfg_dir.display());
    Ok(())
}

fn cmd_logout(cfg_dir: &Path) -> Result<()> {
    require_config_dir(cfg_dir)?;

    let mut session = load_session(cfg_dir)?;
    session.token = None;
    save_session(cfg_dir, &session)?;

    println!("Logged out.");
    Ok(())
}

fn cmd_country(cfg_dir: &Path, code: Option<&str>, clear: bool) -> Result<()> {
    require_config_dir(cfg_dir)?;

    let mut session = load_session(cfg_dir)?;

    if clear {
        session.country_code = None;
        save_session(cfg_dir, &session)?;
        println!("Country workspace cleared.");
        return Ok(());
    }

    match code {
        Some(code) => {
            session.set_country(code)?;
            save_session(cfg_dir, &session)?;
            println!(
                "Country workspace set to {}",
                session.country_code.as_deref().unwrap_or_default()
            );
        }
        None => match session.country_code.as_deref() {
            Some(current) => println!("Country workspace: {current}"),
            None => println!("No country workspace selected."),
        },
    }

    Ok(())
}

struct OwedArgs {
    from: String,
    to: String,
    provider: Option<String>,
    input: Option<String>,
    json: bool,
    rows: bool,
    output: Option<String>,
    on_invalid_range: Option<InvalidRangePolicy>,
}

// Table row structs for tabled
#[derive(Tabled)]
struct ProviderRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "PROVIDER")]
    provider_id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "JOBS")]
    jobs: usize,
    #[tabled(rename = "TOTAL DUE")]
    total_due: String,
}

#[derive(Tabled)]
struct LineItemRow {
    #[tabled(rename = "DATE")]
    date: String,
    #[tabled(rename = "PROVIDER")]
    provider_id: String,
    #[tabled(rename = "JOB")]
    job_id: String,
    #[tabled(rename = "PICKUP")]
    pickup: String,
    #[tabled(rename = "DROPOFF")]
    dropoff: String,
    #[tabled(rename = "DUE")]
    due: String,
}

/// Compute and print provider payouts
fn cmd_owed(cfg_dir: &Path, args: OwedArgs) -> Result<()> {
    // A local input file does not need the API config
    let config = if cfg_dir.exists() {
        Some(load_config(cfg_dir)?)
    } else if args.input.is_some() {
        None
    } else {
        return Err(PayoutError::ConfigNotFound(cfg_dir.to_path_buf()));
    };

    let report_settings: ReportSettings = config
        .as_ref()
        .map(|c| c.report.clone())
        .unwrap_or_default();
    let policy = args
        .on_invalid_range
        .unwrap_or(report_settings.on_invalid_range);

    let payments = match args.input.as_deref() {
        Some(path) => read_payments(path)?,
        None => load_remote_payments(cfg_dir, config.as_ref())?,
    };

    let query = OwedQuery::new(args.from.as_str(), args.to.as_str())
        .provider(args.provider.as_deref())
        .on_invalid_range(policy);

    if query.range_filter().is_degraded() {
        warn!(
            from = %args.from,
            to = %args.to,
            policy = %policy,
            "could not parse date range, applying invalid-range policy"
        );
    }

    let report = query.compute(&payments);
    info!(
        rows = report.rows.len(),
        providers = report.providers.len(),
        "payout report ready"
    );

    if let Some(output) = args.output.as_deref() {
        let path = expand_path(output);
        std::fs::write(&path, report_json(&report)?)?;
        println!("Saved: {}", path.display());
    }

    if args.json {
        println!("{}", report_json(&report)?);
        return Ok(());
    }

    print_report(&report, &report_settings.currency_symbol, args.rows);
    Ok(())
}

fn load_remote_payments(cfg_dir: &Path, config: Option<&Config>) -> Result<Value> {
    let config = config.ok_or_else(|| PayoutError::ConfigNotFound(cfg_dir.to_path_buf()))?;
    let session = load_session(cfg_dir)?;
    fetch_payments(&config.api, &session)
}

/// Read a payments export from a file, or stdin when the path is '-'
fn read_payments(path: &str) -> Result<Value> {
    let (name, content) = if path == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        ("stdin".to_string(), buf)
    } else {
        let path = expand_path(path);
        (path.display().to_string(), std::fs::read_to_string(&path)?)
    };

    let json: Value = serde_json::from_str(&content).map_err(|source| {
        PayoutError::InvalidJson {
            name: name.clone(),
            source,
        }
    })?;

    extract_payments(json).map_err(|reason| PayoutError::UnexpectedPayload { name, reason })
}

fn report_json(report: &OwedReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(PayoutError::Serialize)
}

fn print_report(report: &OwedReport, currency_symbol: &str, show_rows: bool) {
    if report.providers.is_empty() {
        println!("No payouts owed for the given range.");
        return;
    }

    if show_rows {
        let rows: Vec<LineItemRow> = report
            .rows
            .iter()
            .map(|item| LineItemRow {
                date: item.created_at.get(..10).unwrap_or(&item.created_at).to_string(),
                provider_id: item.provider_id.clone(),
                job_id: item.job_id.clone().unwrap_or_else(|| "-".to_string()),
                pickup: item.pickup.clone().unwrap_or_else(|| "-".to_string()),
                dropoff: item.dropoff.clone().unwrap_or_else(|| "-".to_string()),
                due: format_money(item.provider_amount_due, currency_symbol),
            })
            .collect();

        let table = Table::new(rows).with(Style::rounded()).to_string();
        println!("{table}");
        println!();
    }

    let rows: Vec<ProviderRow> = report
        .providers
        .iter()
        .enumerate()
        .map(|(idx, p)| ProviderRow {
            index: idx + 1,
            provider_id: p.provider_id.clone(),
            name: p.provider_name.clone().unwrap_or_else(|| "-".to_string()),
            jobs: p.job_count,
            total_due: format_money(p.total_due, currency_symbol),
        })
        .collect();

    let table = Table::new(rows).with(Style::rounded()).to_string();
    let total = format_money(report.total_due_all, currency_symbol);
    println!("{}", add_total_footer(&table, "TOTAL DUE", &total));

    println!();
    println!(
        "Total: {} provider(s), {} job(s)",
        report.providers.len(),
        report.rows.len()
    );
}

/// Append a summary row under the last column of a rounded table, merging
/// every other column into one label cell. Falls back to a plain line when
/// the value does not fit the column.
fn add_total_footer(table: &str, label: &str, value: &str) -> String {
    let plain = format!("{table}\n{label}: {value}");

    let lines: Vec<&str> = table.lines().collect();
    if lines.len() < 4 {
        return plain;
    }

    // Parse the top border to discover column widths
    let Some(inner) = lines[0]
        .strip_prefix('╭')
        .and_then(|s| s.strip_suffix('╮'))
    else {
        return plain;
    };

    let widths: Vec<usize> = inner.split('┬').map(|p| p.chars().count()).collect();
    let Some((&last_width, leading)) = widths.split_last() else {
        return plain;
    };
    if leading.is_empty() || value.chars().count() + 2 > last_width {
        return plain;
    }

    // Leading cells plus the separators between them
    let left_width = leading.iter().sum::<usize>() + leading.len() - 1;

    let mut out = lines[..lines.len() - 1].join("\n");
    out.push('\n');

    let merged: Vec<String> = leading.iter().map(|w| "─".repeat(*w)).collect();
    out.push_str(&format!(
        "├{}┼{}┤\n",
        merged.join("┴"),
        "─".repeat(last_width)
    ));
    out.push_str(&format!(
        "│ {:>left$} │ {:>last$} │\n",
        label,
        value,
        left = left_width - 2,
        last = last_width - 2
    ));
    out.push_str(&format!(
        "╰{}┴{}╯",
        "─".repeat(left_width),
        "─".repeat(last_width)
    ));

    out
}
