use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use homeprice::app::{run_prediction, Action, App};
use homeprice::config::{LocationMode, Settings};
use homeprice::loan::{
    check_price, LoanEstimate, LoanParameters, DEFAULT_RATE_PERCENT, DEFAULT_TERM_YEARS,
};
use homeprice::location::filter_catalog;
use homeprice::predict::{HttpPredictor, PredictionRequest, PredictionService};
use homeprice::ui::{rupees, ui};

const IDLE_POLL: Duration = Duration::from_millis(500);

#[derive(Parser)]
#[command(name = "homeprice")]
#[command(about = "Real estate price prediction front end with an EMI calculator", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Base URL of the prediction service
    #[arg(long, global = true, env = "HOMEPRICE_API_URL")]
    api_url: Option<String>,

    /// How the location field accepts input
    #[arg(long, global = true, value_enum)]
    location_mode: Option<LocationMode>,

    /// Log file used while the terminal UI is running
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,
    /// Price breakdown and EMI for a known price
    Emi {
        /// Predicted price in lakhs
        #[arg(long)]
        price_lakhs: f64,
        /// Loan term in years (10, 15, 20, 25 or 30)
        #[arg(long, default_value_t = DEFAULT_TERM_YEARS)]
        term: u32,
        /// Annual interest rate in percent (5 to 20)
        #[arg(long, default_value_t = DEFAULT_RATE_PERCENT)]
        rate: f64,
    },
    /// Ask the prediction service for a price
    Predict {
        #[arg(long)]
        total_sqft: f64,
        #[arg(long)]
        bath: u8,
        #[arg(long)]
        balcony: u8,
        #[arg(long)]
        price_per_sqft: f64,
        #[arg(long)]
        location: String,
    },
    /// List catalog locations matching a query
    Locations {
        query: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => {
            init_file_logging(&settings)?;
            run_tui(&settings)
        }
        Commands::Emi { price_lakhs, term, rate } => {
            init_stderr_logging();
            let price_lakhs = check_price(price_lakhs)?;
            let params = LoanParameters::new(term, rate)?;
            print_estimate(&LoanEstimate::compute(price_lakhs, params));
            Ok(())
        }
        Commands::Predict {
            total_sqft,
            bath,
            balcony,
            price_per_sqft,
            location,
        } => {
            init_stderr_logging();
            let request = PredictionRequest {
                total_sqft,
                bath,
                balcony,
                price_per_sqft,
                location,
            };
            let service = HttpPredictor::from_settings(&settings)?;
            let result = run_prediction(&request, &settings.catalog, &service)?;
            print_estimate(&LoanEstimate::compute(
                result.predicted_price_lakhs,
                LoanParameters::default(),
            ));
            for c in result.top_contributions(5) {
                println!("  {:<20} {:+.2}", c.feature, c.contribution);
            }
            Ok(())
        }
        Commands::Locations { query } => {
            for name in filter_catalog(&settings.catalog, query.as_deref().unwrap_or("")) {
                println!("{}", name);
            }
            Ok(())
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::load(cli.config.as_deref()).context("load settings")?;
    if let Some(url) = &cli.api_url {
        settings.set_api_url(url)?;
    }
    if let Some(mode) = cli.location_mode {
        settings.location_mode = mode;
    }
    if let Some(log_file) = &cli.log_file {
        settings.log_file = log_file.clone();
    }
    Ok(settings)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

// The terminal belongs to the UI, so logs go to a file.
fn init_file_logging(settings: &Settings) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&settings.log_file)
        .with_context(|| format!("open log file {}", settings.log_file.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn init_stderr_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(io::stderr)
        .init();
}

fn print_estimate(estimate: &LoanEstimate) {
    println!("Predicted price: ₹ {:.2} Lakhs", estimate.price_lakhs);
    for item in &estimate.breakdown {
        println!("  {:<18} {}", item.label, rupees(item.value));
    }
    println!(
        "EMI ({} yrs at {:.1}%): {} / month",
        estimate.params.term_years(),
        estimate.params.annual_rate_percent(),
        rupees(estimate.emi as f64)
    );
}

fn run_tui(settings: &Settings) -> Result<()> {
    let service = HttpPredictor::from_settings(settings)?;
    info!(endpoint = service.endpoint(), "starting terminal UI");

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let app = App::new(settings);
    let res = run_app(&mut terminal, app, &service);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    service: &dyn PredictionService,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, &mut app))?;

        // Wake up in time for a pending filter pass.
        let timeout = app
            .form
            .location
            .debounce()
            .remaining(Instant::now())
            .unwrap_or(IDLE_POLL);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match app.handle_key(key, Instant::now()) {
                        Action::Quit => return Ok(()),
                        Action::Submit => {
                            app.info("Requesting prediction...");
                            terminal.draw(|f| ui(f, &mut app))?;
                            app.submit(service);
                        }
                        Action::None => {}
                    }
                }
            }
        }

        app.tick(Instant::now());
    }
}
