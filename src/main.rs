use job_scraper_lib::{input_loader, logger};
use job_scraper_lib::{Config, JobSource, JobSummary, JobType, SearchCriteria, SearchOutcome, Site};

use std::error::Error;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use clap::{Parser, Subcommand};
use log::{error, info, warn};

const OUTPUT_HEADERS: [&str; 7] = ["title", "company", "location", "link", "text", "site", "timestamp"];

#[derive(Parser)]
#[command(name = "job-scraper", version, about = "Search job boards and read job descriptions")]
struct Cli {
    /// Debug-level logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Run the browser without a window
    #[arg(long, global = true)]
    headless: bool,

    /// Page backend: chrome or http
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one search and write the result cards as CSV
    Search {
        #[arg(long, default_value = "hellowork")]
        site: String,
        #[arg(long, default_value = "data scientist")]
        keywords: String,
        #[arg(long, default_value = "Athis-Mons 91200")]
        location: String,
        #[arg(long, default_value = "all")]
        job_type: String,
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Keep going to further result pages
        #[arg(long)]
        all_pages: bool,
        #[arg(long)]
        max_pages: Option<u32>,
        /// Append to this CSV file instead of printing
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Print the description of one job page
    Detail {
        #[arg(long, default_value = "hellowork")]
        site: String,
        url: String,
    },
    /// Run every search listed in a CSV file
    Batch {
        #[arg(long, default_value = "searches.csv")]
        input: PathBuf,
        #[arg(long, default_value = "results.csv")]
        output: PathBuf,
        /// Also open each job page and fill the text column
        #[arg(long)]
        with_details: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    logger::init(cli.verbose);
    info!("Starting job scraper...");

    let mut config = Config::from_env()?;
    if cli.headless {
        config.headless = true;
    }
    if let Some(backend) = cli.backend.as_deref() {
        config.backend = backend.parse()?;
    }

    match cli.command {
        Command::Search {
            site,
            keywords,
            location,
            job_type,
            page,
            all_pages,
            max_pages,
            output,
        } => {
            let site: Site = site.parse()?;
            let job_type: JobType = job_type.parse()?;
            let mut criteria = SearchCriteria::new(keywords, location)
                .with_job_type(job_type)
                .with_page(page);
            if all_pages {
                criteria = criteria.all_pages(max_pages.unwrap_or(config.max_pages));
            }

            let source = JobSource::new(site, config);
            let jobs = match source.search_outcome(&criteria) {
                SearchOutcome::Jobs(jobs) => jobs,
                SearchOutcome::NoSession => {
                    warn!("Could not start a browser session for {}. Please try again later.", site);
                    return Ok(());
                }
            };
            if jobs.is_empty() {
                warn!("No jobs found for '{}' in '{}'", criteria.keywords, criteria.location);
            }

            let mut writer = open_writer(output.as_deref())?;
            write_jobs(&mut writer, site, &jobs)?;
        }
        Command::Detail { site, url } => {
            let site: Site = site.parse()?;
            let source = JobSource::new(site, config);
            match source.get_details(&url) {
                Some(text) => println!("{}", text),
                None => warn!("No job details could be retrieved from {}", url),
            }
        }
        Command::Batch {
            input,
            output,
            with_details,
        } => {
            let requests = input_loader::load_requests(&input, config.max_pages);
            if requests.is_empty() {
                error!(
                    "No searches found in {:?}. Expected headers: Site, Keywords, Location, Job Type, Page, All Pages, Max Pages",
                    input
                );
                return Ok(());
            }

            let mut writer = open_writer(Some(output.as_path()))?;
            let total = requests.len();
            let mut written = 0;

            for (i, request) in requests.into_iter().enumerate() {
                info!(
                    "Search {} / {} : {} '{}' in '{}'",
                    i + 1,
                    total,
                    request.site,
                    request.criteria.keywords,
                    request.criteria.location
                );
                let source = JobSource::new(request.site, config.clone());
                let mut jobs = match source.search_outcome(&request.criteria) {
                    SearchOutcome::Jobs(jobs) => jobs,
                    SearchOutcome::NoSession => {
                        warn!("Skipping search {}: no browser session", i + 1);
                        continue;
                    }
                };
                if with_details {
                    let filled = source.attach_details(&mut jobs);
                    info!("Fetched details for {} of {} jobs", filled, jobs.len());
                }
                write_jobs(&mut writer, request.site, &jobs)?;
                written += jobs.len();
            }

            info!("Batch completed. Wrote {} jobs to {:?}.", written, output);
        }
    }

    Ok(())
}

/// CSV writer over `path` in append mode (header only for a new file), or
/// stdout when no path is given.
fn open_writer(path: Option<&Path>) -> Result<csv::Writer<Box<dyn Write>>, Box<dyn Error>> {
    let (sink, needs_header): (Box<dyn Write>, bool) = match path {
        Some(path) => {
            let file_exists = path.exists();
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            (Box::new(file), !file_exists)
        }
        None => (Box::new(io::stdout()), true),
    };

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(sink);
    if needs_header {
        writer.write_record(OUTPUT_HEADERS)?;
        writer.flush()?;
    }
    Ok(writer)
}

fn write_jobs<W: Write>(writer: &mut csv::Writer<W>, site: Site, jobs: &[JobSummary]) -> Result<(), Box<dyn Error>> {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let site = site.to_string();

    for job in jobs {
        let fields = [
            job.title.as_deref().unwrap_or_default(),
            job.company.as_deref().unwrap_or_default(),
            job.location.as_deref().unwrap_or_default(),
            job.link.as_deref().unwrap_or_default(),
            job.detail_text.as_deref().unwrap_or_default(),
            site.as_str(),
            timestamp.as_str(),
        ];
        if let Err(e) = writer.write_record(fields) {
            error!("Failed to write CSV record for {:?}: {}", job.title, e);
        }
    }
    writer.flush()?;
    Ok(())
}
