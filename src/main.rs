mod config;
mod pagination;
mod query;
mod remote;
mod ui;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};

use config::Config;
use remote::censys::CensysClient;
use remote::{sample, SearchParams, SearchResult, VirtualHosts, MAX_PER_PAGE, MIN_PER_PAGE};

#[derive(Parser, Debug)]
#[command(name = "hostscope", version, about = "Search the Censys hosts index")]
struct Cli {
    /// Path to an alternate configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Serve results from the bundled sample dataset instead of the live API
    #[arg(long, global = true, default_value_t = false)]
    offline: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a single search and print the results
    Query(QueryArgs),
    /// Report configuration status without revealing credential values
    Status,
}

#[derive(Args, Debug)]
struct QueryArgs {
    /// Search query (normalized before submission)
    query: String,

    #[arg(long, default_value_t = 10, value_parser = per_page_in_range)]
    per_page: u32,

    /// Opaque pagination cursor from a previous response
    #[arg(long)]
    cursor: Option<String>,

    #[arg(long, value_enum)]
    virtual_hosts: Option<VirtualHostsArg>,

    /// Sort order, e.g. "+ip" or "-autonomous_system.asn"
    #[arg(long)]
    sort: Option<String>,

    /// Restrict returned fields (comma-separated)
    #[arg(long, value_delimiter = ',')]
    fields: Option<Vec<String>>,

    /// Print the raw result as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VirtualHostsArg {
    Exclude,
    Include,
    Only,
}

impl From<VirtualHostsArg> for VirtualHosts {
    fn from(value: VirtualHostsArg) -> Self {
        match value {
            VirtualHostsArg::Exclude => VirtualHosts::Exclude,
            VirtualHostsArg::Include => VirtualHosts::Include,
            VirtualHostsArg::Only => VirtualHosts::Only,
        }
    }
}

fn per_page_in_range(s: &str) -> Result<u32, String> {
    let value: u32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (MIN_PER_PAGE..=MAX_PER_PAGE).contains(&value) {
        Ok(value)
    } else {
        Err(format!(
            "per_page must be between {MIN_PER_PAGE} and {MAX_PER_PAGE}"
        ))
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Some(Command::Query(args)) => handle_query(args, &config, cli.offline),
        Some(Command::Status) => handle_status(&config),
        None => {
            let mut app = ui::app::App::new(config, cli.offline)?;
            app.run()
        }
    }
}

fn handle_query(args: QueryArgs, config: &Config, offline: bool) -> Result<()> {
    let params = SearchParams {
        query: args.query,
        cursor: args.cursor,
        per_page: args.per_page,
        virtual_hosts: args.virtual_hosts.map(VirtualHosts::from),
        sort: args.sort,
        fields: args.fields,
    };

    let result = if offline {
        sample::search(&params)
    } else {
        let client = CensysClient::new(&config.api_url, config.credentials())?;
        client.search(&params)?
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_result(&result);
    Ok(())
}

fn print_result(result: &SearchResult) {
    println!(
        "Found {} host(s) matching \"{}\"",
        result.total, result.query
    );

    // Results: ip<TAB>name<TAB>services
    for host in &result.hits {
        println!(
            "{}\t{}\t{}",
            host.ip,
            host.name.as_deref().unwrap_or("-"),
            host.service_summary()
        );
    }

    if let Some(next) = result.links.next_cursor() {
        println!("next cursor: {}", next);
    }
    if let Some(prev) = result.links.prev_cursor() {
        println!("prev cursor: {}", prev);
    }
}

fn handle_status(config: &Config) -> Result<()> {
    let file_state = if config.config_path.exists() {
        "found"
    } else {
        "missing, defaults in effect"
    };
    println!(
        "configuration file: {} ({})",
        config.config_path.display(),
        file_state
    );
    println!("API URL: {}", config.api_url);
    println!("API ID configured: {}", yes_no(config.has_api_id()));
    println!("API secret configured: {}", yes_no(config.has_api_secret()));
    if !config.has_credentials() {
        println!(
            "Live searches will fail until {} and {} are set (or the [api] section is filled in).",
            config::ENV_API_ID,
            config::ENV_API_SECRET
        );
    }
    Ok(())
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
