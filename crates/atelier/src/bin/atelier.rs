use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

use atelier::db::catalog_repo::{self, NewCategory, NewOption};
use atelier::db::goal_repo::{self, NewGoal};
use atelier::db::site_repo::{self, SiteStatusUpdate};
use atelier::db::{commission_repo, visual_repo, DatabaseError};
use atelier::pipeline::{CleanupError, IngestError, LogProgress};
use atelier::response::{
    CategoryResponse, CommissionResponse, GoalResponse, IngestResponse, OptionResponse,
    PageViewResponse, SiteStatusResponse, VisualResponse,
};
use atelier::{
    load_config, AtelierError, ConfigError, Database, NotFoundError, Pipeline, PipelineConfig,
    Upload, UrlBuilder,
};

#[derive(Parser, Debug)]
#[command(name = "atelier")]
#[command(about = "Media and content backend for a commission-art website", long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, env = "ATELIER_CONFIG", default_value = "atelier.json")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest one file as a visual of a commission
    Ingest {
        file: PathBuf,
        #[arg(long)]
        commission: i64,
        #[arg(long)]
        explicit: bool,
        #[arg(long)]
        restricted: bool,
        /// Store as-is: no conversion, no thumbnails
        #[arg(long)]
        video: bool,
        #[arg(long, default_value_t = 0)]
        order: i64,
    },
    /// Delete a visual asset, or a whole group with --group
    Delete {
        #[arg(required_unless_present = "group")]
        asset_id: Option<i64>,
        #[arg(long, conflicts_with = "asset_id")]
        group: Option<String>,
    },
    /// Remove files in the visuals directory that no row references
    Sweep,
    /// Generate any missing thumbnails for an asset
    Thumbnails { asset_id: i64 },
    /// Manage commissions
    #[command(subcommand)]
    Commission(CommissionCommand),
    /// Manage goals
    #[command(subcommand)]
    Goal(GoalCommand),
    /// Record one page view and print the counters
    PageView { origin: String, pathname: String },
    /// Show or change the open/closed flags of a site
    #[command(subcommand)]
    Site(SiteCommand),
    /// Manage commission categories
    #[command(subcommand)]
    Category(CategoryCommand),
    /// Manage priced commission options
    #[command(subcommand)]
    Options(OptionCommand),
}

#[derive(Subcommand, Debug)]
enum SiteCommand {
    List,
    Show { origin: String },
    /// Change only the flags given; the origin must already exist
    Update {
        origin: String,
        #[arg(long)]
        commissions: Option<bool>,
        #[arg(long)]
        requests: Option<bool>,
        #[arg(long)]
        art_trades: Option<bool>,
        #[arg(long)]
        store: Option<bool>,
    },
}

#[derive(Subcommand, Debug)]
enum CategoryCommand {
    Create {
        name: String,
        #[arg(long)]
        explicit: bool,
        #[arg(long)]
        restricted: bool,
    },
    List,
    Delete { id: i64 },
    /// Link a category to a commission
    Attach { commission: i64, category: i64 },
    Detach { commission: i64, category: i64 },
}

#[derive(Subcommand, Debug)]
enum OptionCommand {
    Create {
        name: String,
        /// Price in cents
        #[arg(long, default_value_t = 0)]
        cost: i64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        explicit: bool,
        #[arg(long)]
        restricted: bool,
        #[arg(long, default_value = "")]
        exclusive_with: String,
        #[arg(long, default_value = "")]
        required: String,
    },
    List,
    Delete { id: i64 },
    /// Link an option to a commission
    Attach { commission: i64, option: i64 },
    Detach { commission: i64, option: i64 },
}

#[derive(Subcommand, Debug)]
enum CommissionCommand {
    Create {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        available: bool,
        #[arg(long)]
        explicit: bool,
        #[arg(long)]
        restricted: bool,
    },
    List,
    /// Show a commission by ID or slug and count the view
    View { commission: String },
    /// Toggle whether the commission is open for orders
    Toggle { id: i64 },
    /// Record an order
    Order { id: i64 },
    Delete { id: i64 },
}

#[derive(Subcommand, Debug)]
enum GoalCommand {
    Create {
        name: String,
        image: PathBuf,
        #[arg(long, default_value = "")]
        alt: String,
        /// Price in cents
        #[arg(long, default_value_t = 0)]
        cost: i64,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        use_case: Option<String>,
    },
    List,
    Image { id: i64, image: PathBuf },
    Fulfill { id: i64 },
    Delete { id: i64 },
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr so stdout stays valid JSON. `log` records from the
/// persistence layer are bridged into the same subscriber.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_ok() {
        if let Err(e) = tracing_log::LogTracer::init() {
            eprintln!("warning: log records will not be captured: {}", e);
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(&cli.config)?;
    let db_path = config.database_path().ok_or(CliError::NoDatabasePath)?;
    let db = Database::open(&db_path)?;
    let pipeline = Pipeline::from_config(Arc::new(PipelineConfig::from_config(&config)), db)?;
    let urls = UrlBuilder::from_config(&config);

    match cli.command {
        Commands::Ingest {
            file,
            commission,
            explicit,
            restricted,
            video,
            order,
        } => {
            let content = read_file(&file)?;
            let mut upload = Upload::new(&file_name(&file), content, commission);
            upload.is_explicit = explicit;
            upload.is_restricted = restricted;
            upload.is_video = video;
            upload.display_order = order;

            let outcome = pipeline.ingest(upload, &LogProgress)?;
            print_json(&IngestResponse::from_outcome(&outcome, &urls))
        }
        Commands::Delete { asset_id, group } => {
            if let Some(group) = group {
                let report = pipeline.delete_group(&group)?;
                print_json(&report)
            } else {
                let asset_id = asset_id.ok_or(CliError::MissingTarget)?;
                let report = pipeline.delete(asset_id)?;
                print_json(&report)
            }
        }
        Commands::Sweep => {
            let report = pipeline.sweep()?;
            print_json(&report)
        }
        Commands::Thumbnails { asset_id } => {
            let created = pipeline.generate_thumbnails(asset_id, &LogProgress)?;
            let visuals: Vec<VisualResponse> = created
                .iter()
                .map(|row| VisualResponse::from_row(row, &urls))
                .collect();
            print_json(&visuals)
        }
        Commands::Commission(command) => run_commission(command, &pipeline, &urls),
        Commands::Goal(command) => run_goal(command, &pipeline, &urls),
        Commands::PageView { origin, pathname } => {
            let db = pipeline.database();
            let page = site_repo::record_page_view(db, &origin, &pathname)?;
            let site = site_repo::get_or_create_site_status(db, &origin)?;
            print_json(&PageViewResponse::new(&page, &site))
        }
        Commands::Site(command) => run_site(command, &pipeline),
        Commands::Category(command) => run_category(command, &pipeline),
        Commands::Options(command) => run_option(command, &pipeline),
    }
}

fn run_site(command: SiteCommand, pipeline: &Pipeline) -> Result<(), CliError> {
    let db = pipeline.database();
    match command {
        SiteCommand::List => {
            let sites: Vec<SiteStatusResponse> = site_repo::list_site_statuses(db)?
                .iter()
                .map(SiteStatusResponse::from_row)
                .collect();
            print_json(&sites)
        }
        SiteCommand::Show { origin } => {
            let site = site_repo::get_or_create_site_status(db, &origin)?;
            print_json(&SiteStatusResponse::from_row(&site))
        }
        SiteCommand::Update {
            origin,
            commissions,
            requests,
            art_trades,
            store,
        } => {
            let update = SiteStatusUpdate {
                commissions_open: commissions,
                requests_open: requests,
                art_trades_open: art_trades,
                store_open: store,
            };
            let site = site_repo::update_site_status(db, &origin, &update)?
                .ok_or(CliError::UnknownOrigin(origin))?;
            print_json(&SiteStatusResponse::from_row(&site))
        }
    }
}

fn run_category(command: CategoryCommand, pipeline: &Pipeline) -> Result<(), CliError> {
    let db = pipeline.database();
    match command {
        CategoryCommand::Create {
            name,
            explicit,
            restricted,
        } => {
            let new = NewCategory {
                name,
                is_explicit: explicit,
                is_restricted: restricted,
            };
            let row = catalog_repo::insert_category(db, &new)?;
            print_json(&CategoryResponse::from_row(&row))
        }
        CategoryCommand::List => {
            let rows: Vec<CategoryResponse> = catalog_repo::list_categories(db)?
                .iter()
                .map(CategoryResponse::from_row)
                .collect();
            print_json(&rows)
        }
        CategoryCommand::Delete { id } => {
            let deleted = catalog_repo::delete_category(db, id)?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
        }
        CategoryCommand::Attach {
            commission,
            category,
        } => {
            require_commission(db, commission)?;
            catalog_repo::find_category(db, category)?
                .ok_or(CliError::UnknownCategory(category))?;
            let attached = catalog_repo::attach_category(db, commission, category)?;
            print_json(&serde_json::json!({
                "commission_id": commission,
                "category_id": category,
                "attached": attached,
            }))
        }
        CategoryCommand::Detach {
            commission,
            category,
        } => {
            let detached = catalog_repo::detach_category(db, commission, category)?;
            print_json(&serde_json::json!({
                "commission_id": commission,
                "category_id": category,
                "detached": detached,
            }))
        }
    }
}

fn run_option(command: OptionCommand, pipeline: &Pipeline) -> Result<(), CliError> {
    let db = pipeline.database();
    match command {
        OptionCommand::Create {
            name,
            cost,
            description,
            explicit,
            restricted,
            exclusive_with,
            required,
        } => {
            let new = NewOption {
                name,
                description,
                cost,
                is_explicit: explicit,
                is_restricted: restricted,
                exclusive_with,
                required,
            };
            let row = catalog_repo::insert_option(db, &new)?;
            print_json(&OptionResponse::from_row(&row))
        }
        OptionCommand::List => {
            let rows: Vec<OptionResponse> = catalog_repo::list_options(db)?
                .iter()
                .map(OptionResponse::from_row)
                .collect();
            print_json(&rows)
        }
        OptionCommand::Delete { id } => {
            let deleted = catalog_repo::delete_option(db, id)?;
            print_json(&serde_json::json!({ "id": id, "deleted": deleted }))
        }
        OptionCommand::Attach { commission, option } => {
            require_commission(db, commission)?;
            catalog_repo::find_option(db, option)?.ok_or(CliError::UnknownOption(option))?;
            let attached = catalog_repo::attach_option(db, commission, option)?;
            print_json(&serde_json::json!({
                "commission_id": commission,
                "option_id": option,
                "attached": attached,
            }))
        }
        OptionCommand::Detach { commission, option } => {
            let detached = catalog_repo::detach_option(db, commission, option)?;
            print_json(&serde_json::json!({
                "commission_id": commission,
                "option_id": option,
                "detached": detached,
            }))
        }
    }
}

fn require_commission(db: &Database, id: i64) -> Result<(), CliError> {
    if !commission_repo::exists(db, id)? {
        return Err(NotFoundError::Commission(id).into());
    }
    Ok(())
}

fn commission_response(
    db: &Database,
    row: &commission_repo::CommissionRow,
    urls: &UrlBuilder,
) -> Result<CommissionResponse, CliError> {
    let visuals = visual_repo::list_by_commission(db, row.id)?;
    let categories = catalog_repo::categories_for(db, row.id)?;
    let options = catalog_repo::options_for(db, row.id)?;
    Ok(CommissionResponse::new(row, &visuals, urls).with_catalog(&categories, &options))
}

fn run_commission(
    command: CommissionCommand,
    pipeline: &Pipeline,
    urls: &UrlBuilder,
) -> Result<(), CliError> {
    let db = pipeline.database();
    match command {
        CommissionCommand::Create {
            title,
            description,
            available,
            explicit,
            restricted,
        } => {
            let new = commission_repo::NewCommission {
                title,
                short_description: description,
                is_explicit: explicit,
                is_restricted: restricted,
                available,
            };
            let row = commission_repo::insert(db, &new)?;
            print_json(&CommissionResponse::new(&row, &[], urls))
        }
        CommissionCommand::List => {
            let rows = commission_repo::list(db)?;
            let mut responses = Vec::with_capacity(rows.len());
            for row in &rows {
                responses.push(commission_response(db, row, urls)?);
            }
            print_json(&responses)
        }
        CommissionCommand::View { commission } => {
            let found = match commission.parse::<i64>() {
                Ok(id) => commission_repo::find_by_id(db, id),
                Err(_) => commission_repo::find_by_slug(db, &commission),
            }?;
            let Some(row) = found else {
                return Err(CliError::UnknownCommission(commission));
            };

            commission_repo::increment_view_count(db, row.id)?;
            let row = commission_repo::find_by_id(db, row.id)?
                .ok_or(NotFoundError::Commission(row.id))?;
            print_json(&commission_response(db, &row, urls)?)
        }
        CommissionCommand::Toggle { id } => {
            let available = commission_repo::toggle_availability(db, id)?
                .ok_or(NotFoundError::Commission(id))?;
            print_json(&serde_json::json!({ "id": id, "available": available }))
        }
        CommissionCommand::Order { id } => {
            let order_count = commission_repo::increment_order_count(db, id)?
                .ok_or(NotFoundError::Commission(id))?;
            print_json(&serde_json::json!({ "id": id, "order_count": order_count }))
        }
        CommissionCommand::Delete { id } => {
            let report = pipeline.delete_commission(id)?;
            print_json(&report)
        }
    }
}

fn run_goal(command: GoalCommand, pipeline: &Pipeline, urls: &UrlBuilder) -> Result<(), CliError> {
    let db = pipeline.database();
    match command {
        GoalCommand::Create {
            name,
            image,
            alt,
            cost,
            description,
            use_case,
        } => {
            let content = read_file(&image)?;
            let new = NewGoal {
                name,
                cost,
                description,
                use_case,
                image_alt: alt,
            };
            let goal = pipeline.create_goal(&new, &file_name(&image), &content)?;
            print_json(&GoalResponse::from_row(&goal, urls))
        }
        GoalCommand::List => {
            let goals: Vec<GoalResponse> = goal_repo::list(db)?
                .iter()
                .map(|g| GoalResponse::from_row(g, urls))
                .collect();
            print_json(&goals)
        }
        GoalCommand::Image { id, image } => {
            let content = read_file(&image)?;
            let goal = pipeline.replace_goal_image(id, &file_name(&image), &content)?;
            print_json(&GoalResponse::from_row(&goal, urls))
        }
        GoalCommand::Fulfill { id } => {
            if !goal_repo::mark_fulfilled(db, id)? {
                return Err(NotFoundError::Goal(id).into());
            }
            let goal = goal_repo::find_by_id(db, id)?
                .ok_or(NotFoundError::Goal(id))?;
            print_json(&GoalResponse::from_row(&goal, urls))
        }
        GoalCommand::Delete { id } => {
            pipeline.delete_goal(id)?;
            print_json(&serde_json::json!({ "id": id, "deleted": true }))
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Atelier(#[from] AtelierError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Database(#[from] DatabaseError),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Cleanup(#[from] CleanupError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("Failed to read '{path}': {source}")]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No database_path configured and no home directory to default to")]
    NoDatabasePath,

    #[error("Either an asset ID or --group is required")]
    MissingTarget,

    #[error("Commission '{0}' not found")]
    UnknownCommission(String),

    #[error("No site status for origin '{0}'")]
    UnknownOrigin(String),

    #[error("Commission category {0} not found")]
    UnknownCategory(i64),

    #[error("Commission option {0} not found")]
    UnknownOption(i64),

    #[error("Failed to serialize output: {0}")]
    Output(#[from] serde_json::Error),
}

fn read_file(path: &Path) -> Result<Vec<u8>, CliError> {
    std::fs::read(path).map_err(|e| CliError::ReadInput {
        path: path.to_path_buf(),
        source: e,
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
        .to_string()
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
