//! fundi - browse and act on the Fundi marketplace from a terminal

mod output;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use libfundi::application::{self, Decision, NewApplication};
use libfundi::filters::{
    Filters, FundiFilters, FundiSortKey, JobFilters, JobSortKey, Matches, PortfolioFilters, Sort,
};
use libfundi::logging::{LogFormat, LoggingConfig};
use libfundi::types::BudgetBreakdown;
use libfundi::{ApiError, Config, FundiError, JobStatus, LoadOutcome, Marketplace, PagedList, RecordId};
use serde_json::json;

use crate::output::{print_record, print_records, OutputFormat};

#[derive(Parser, Debug)]
#[command(name = "fundi")]
#[command(version, about = "Browse and act on the Fundi marketplace")]
#[command(long_about = r#"Browse jobs, fundis and portfolios, apply for jobs and decide applications.

EXAMPLES:
    # Open plumbing jobs in Nairobi, two pages
    fundi jobs --category plumbing --location Nairobi --status open --pages 2

    # Jobs within a budget range, cheapest first
    fundi jobs --min-budget 1000 --max-budget 5000 --sort budget --asc

    # Jobs you have posted
    fundi jobs --mine

    # Apply for a job
    fundi apply 42 --message "Available tomorrow" --labor 2500 --materials 800 --days 2

    # Has fundi 7 applied for job 42?
    fundi applications 42 --fundi 7

    # Accept an application
    fundi decide 42 19 accept

    # Verified electricians with at least 4 stars
    fundi fundis --category electrical --min-rating 4 --verified

    # A fundi's plumbing portfolio as CSV
    fundi portfolio --fundi 7 --category Plumbing --format csv

CONFIGURATION:
    Read from $FUNDI_CONFIG or ~/.config/fundi/config.toml unless --config is
    given. FUNDI_API_URL and FUNDI_API_TOKEN override the file.

OUTPUT FORMATS:
    text  - Human-readable, one record per line (default)
    json  - JSON array (object for single records)
    jsonl - JSON lines, one object per line
    csv   - CSV with headers

EXIT CODES:
    0 - Success (including empty results)
    1 - Error (configuration, network, server)
    2 - Authentication failed
    3 - Invalid input
"#)]
struct Cli {
    /// Configuration file (overrides FUNDI_CONFIG)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "text")]
    format: OutputFormat,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format: text, json or pretty (overrides FUNDI_LOG_FORMAT)
    #[arg(long, global = true, value_name = "FORMAT")]
    log_format: Option<LogFormat>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List jobs
    Jobs {
        /// Free-text search in title and description
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// open, in_progress, completed or cancelled
        #[arg(long)]
        status: Option<JobStatus>,

        #[arg(long, value_name = "AMOUNT")]
        min_budget: Option<f64>,

        #[arg(long, value_name = "AMOUNT")]
        max_budget: Option<f64>,

        /// created_at, budget or deadline
        #[arg(long)]
        sort: Option<JobSortKey>,

        /// Sort ascending instead of descending
        #[arg(long, requires = "sort")]
        asc: bool,

        /// Only jobs posted by the signed-in customer
        #[arg(long, conflicts_with_all = ["search", "category", "location", "status", "min_budget", "max_budget", "sort"])]
        mine: bool,

        /// Number of pages to fetch
        #[arg(long, default_value_t = 1, value_name = "N")]
        pages: u32,
    },

    /// Show one job
    Job { id: String },

    /// List applications for a job
    Applications {
        job_id: String,

        /// Only report whether this fundi has applied
        #[arg(long, value_name = "FUNDI_ID")]
        fundi: Option<String>,
    },

    /// Apply for a job
    Apply {
        job_id: String,

        /// Message to the customer
        #[arg(short, long)]
        message: String,

        #[arg(long, default_value_t = 0.0)]
        labor: f64,

        #[arg(long, default_value_t = 0.0)]
        materials: f64,

        #[arg(long, default_value_t = 0.0)]
        transport: f64,

        /// Estimated duration in days
        #[arg(long)]
        days: u32,
    },

    /// Accept or reject an application
    Decide {
        job_id: String,
        application_id: String,
        /// accept or reject
        decision: Decision,
    },

    /// List fundis
    Fundis {
        #[arg(short, long)]
        search: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        location: Option<String>,

        /// Required skill (repeatable)
        #[arg(long = "skill", value_name = "SKILL")]
        skills: Vec<String>,

        #[arg(long, value_name = "STARS")]
        min_rating: Option<f32>,

        /// Only fundis available for work
        #[arg(long)]
        available: bool,

        /// Only verified fundis
        #[arg(long)]
        verified: bool,

        /// rating, hourly_rate or review_count
        #[arg(long)]
        sort: Option<FundiSortKey>,

        #[arg(long, requires = "sort")]
        asc: bool,

        #[arg(long, default_value_t = 1, value_name = "N")]
        pages: u32,
    },

    /// List portfolio items
    Portfolio {
        #[arg(long, value_name = "FUNDI_ID")]
        fundi: Option<String>,

        #[arg(short, long)]
        category: Option<String>,

        #[arg(short, long)]
        search: Option<String>,

        #[arg(long, default_value_t = 1, value_name = "N")]
        pages: u32,
    },

    /// List trade categories
    Categories,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_format = cli
        .log_format
        .or_else(|| {
            std::env::var("FUNDI_LOG_FORMAT")
                .ok()
                .and_then(|s| s.parse().ok())
        })
        .unwrap_or(LogFormat::Text);
    let level = std::env::var("FUNDI_LOG_LEVEL").unwrap_or_else(|_| "warn".to_string());
    LoggingConfig::new(log_format, level, cli.verbose).init();

    tracing::debug!("fundi started with args: {:?}", cli);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(exit_code(&e));
    }
}

fn exit_code(error: &anyhow::Error) -> i32 {
    if let Some(e) = error.downcast_ref::<FundiError>() {
        e.exit_code()
    } else if let Some(e) = error.downcast_ref::<ApiError>() {
        FundiError::Api(e.clone()).exit_code()
    } else {
        1
    }
}

fn load_config(path: Option<&Path>) -> libfundi::Result<Config> {
    match path {
        Some(path) => {
            let mut config = Config::load_from_path(path)?;
            config.apply_env_overrides();
            config.validate()?;
            Ok(config)
        }
        None => Config::load(),
    }
}

fn sort<K>(key: Option<K>, asc: bool) -> Option<Sort<K>> {
    key.map(|key| if asc { Sort::asc(key) } else { Sort::desc(key) })
}

fn flag(set: bool) -> Option<bool> {
    set.then_some(true)
}

/// Load the first page and follow with `load_more` up to `pages` pages
async fn collect_pages<T, F>(list: &PagedList<T, F>, filters: F, pages: u32) -> Result<Vec<T>>
where
    T: Clone + Send,
    F: Filters + Matches<T>,
{
    // Refuse bad filters with an input error rather than a list failure
    filters.validate().map_err(FundiError::from)?;

    into_result(list.load(filters, true).await)?;
    for _ in 1..pages {
        match list.load_more().await {
            LoadOutcome::Exhausted => break,
            outcome => into_result(outcome)?,
        }
    }

    tracing::debug!(
        list = list.name(),
        pages = list.current_page(),
        total_pages = list.total_pages(),
        "Fetched {} records",
        list.len()
    );
    Ok(list.items())
}

fn into_result(outcome: LoadOutcome) -> Result<()> {
    match outcome {
        LoadOutcome::Failed(error) => {
            let message = error.user_message();
            Err(anyhow::Error::new(FundiError::Api(error)).context(message))
        }
        _ => Ok(()),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(cli.config.as_deref())?;
    let marketplace = Marketplace::from_config(&config)?;
    let format = cli.format;

    match cli.command {
        Command::Jobs {
            search,
            category,
            location,
            status,
            min_budget,
            max_budget,
            sort: sort_key,
            asc,
            mine,
            pages,
        } => {
            if mine {
                let per_page = marketplace.paging().page_size;
                let mut jobs = Vec::new();
                for page in 1..=pages.max(1) {
                    let fetched = marketplace.jobs().mine(page, per_page).await?;
                    let more = fetched.has_more();
                    jobs.extend(fetched.items);
                    if !more {
                        break;
                    }
                }
                print_records(&jobs, format)
            } else {
                let filters = JobFilters {
                    search,
                    category,
                    location,
                    status,
                    budget_min: min_budget,
                    budget_max: max_budget,
                    sort: sort(sort_key, asc),
                };
                let list = marketplace.job_list();
                let jobs = collect_pages(&list, filters, pages).await?;
                print_records(&jobs, format)
            }
        }

        Command::Job { id } => {
            let job = marketplace.jobs().get(&RecordId::new(id)).await?;
            print_record(&job, format)
        }

        Command::Applications { job_id, fundi } => {
            let job_id = RecordId::new(job_id);
            let applications = marketplace.applications().list_for_job(&job_id).await?;

            match fundi {
                Some(fundi_id) => {
                    let fundi_id = RecordId::new(fundi_id);
                    let applied = application::has_applied(&applications, &fundi_id);
                    if format == OutputFormat::Text {
                        let answer = if applied { "yes" } else { "no" };
                        println!("Fundi {} has applied for job {}: {}", fundi_id, job_id, answer);
                    } else {
                        let report = json!({
                            "job_id": job_id,
                            "fundi_id": fundi_id,
                            "has_applied": applied,
                        });
                        println!("{}", serde_json::to_string(&report)?);
                    }
                    Ok(())
                }
                None => print_records(&applications, format),
            }
        }

        Command::Apply {
            job_id,
            message,
            labor,
            materials,
            transport,
            days,
        } => {
            let application = NewApplication {
                message,
                proposed_budget: BudgetBreakdown::new(labor, materials, transport),
                estimated_days: days,
            };
            let submitted = marketplace
                .jobs()
                .apply(&RecordId::new(job_id), &application)
                .await?;
            print_record(&submitted, format)
        }

        Command::Decide {
            job_id,
            application_id,
            decision,
        } => {
            let application_id = RecordId::new(application_id);
            let applications = marketplace
                .applications()
                .list_for_job(&RecordId::new(job_id.clone()))
                .await?;
            let target = applications
                .iter()
                .find(|a| a.id == application_id)
                .ok_or_else(|| {
                    ApiError::NotFound(format!("Application {} on job {}", application_id, job_id))
                })?;

            let decided = marketplace
                .applications()
                .decide(target, decision)
                .await
                .with_context(|| format!("Failed to update application {}", application_id))?;
            print_record(&decided, format)
        }

        Command::Fundis {
            search,
            category,
            location,
            skills,
            min_rating,
            available,
            verified,
            sort: sort_key,
            asc,
            pages,
        } => {
            let filters = FundiFilters {
                search,
                category,
                location,
                skills: skills.into_iter().collect(),
                min_rating,
                available: flag(available),
                verified: flag(verified),
                sort: sort(sort_key, asc),
            };
            let list = marketplace.fundi_list();
            let fundis = collect_pages(&list, filters, pages).await?;
            print_records(&fundis, format)
        }

        Command::Portfolio {
            fundi,
            category,
            search,
            pages,
        } => {
            let filters = PortfolioFilters {
                fundi_id: fundi.map(RecordId::new),
                category,
                search,
            };
            let list = marketplace.portfolio_list();
            let items = collect_pages(&list, filters, pages).await?;
            print_records(&items, format)
        }

        Command::Categories => {
            let categories = marketplace.categories().list().await?;
            print_records(&categories, format)
        }
    }
}
