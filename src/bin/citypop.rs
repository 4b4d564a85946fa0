use anyhow::{Context, Result, bail};
use citypop::auth::{Action, authorize};
use citypop::config::Config;
use citypop::models::Observation;
use citypop::store::{CityPatch, RecordPatch};
use citypop::{Forecaster, NextYearPolicy, SeriesRepository, Store};
use citypop::{service, storage, viz};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "citypop",
    version,
    about = "Store city population records; project, summarize, export & chart them"
)]
struct Cli {
    /// Store file (JSON). Overrides `data_file` from the config.
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    /// TOML config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Acting user (username) for commands that change data.
    #[arg(long = "as", global = true, value_name = "USERNAME")]
    actor: Option<String>,
    /// Which year projections target. Overrides `next_year` from the config.
    #[arg(long, global = true, value_enum)]
    next_year: Option<PolicyArg>,
    #[command(subcommand)]
    cmd: Command,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    /// Last observed year + 1
    LastObserved,
    /// Current calendar year + 1
    CurrentCalendar,
}

impl From<PolicyArg> for NextYearPolicy {
    fn from(p: PolicyArg) -> Self {
        match p {
            PolicyArg::LastObserved => NextYearPolicy::LastObservedYear,
            PolicyArg::CurrentCalendar => NextYearPolicy::CurrentCalendarYear,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage cities and show their projections.
    #[command(subcommand)]
    City(CityCommand),
    /// Manage yearly population records.
    #[command(subcommand)]
    Pop(PopCommand),
    /// Manage admin users.
    #[command(subcommand)]
    Admin(AdminCommand),
    /// Export a city's records as CSV.
    Export(ExportArgs),
    /// Print the number of cities and the total projected population.
    Stats,
    /// Print the cross-city projection summary.
    Summary(SummaryArgs),
    /// Chart a city's population trend and projection (.svg or .png).
    Plot(PlotArgs),
}

#[derive(Subcommand, Debug)]
enum CityCommand {
    /// Add a city.
    Add {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        region: String,
    },
    /// Rename a city or change its region.
    Update {
        id: u64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        region: Option<String>,
    },
    /// Delete a city and all of its population records.
    Delete { id: u64 },
    /// List every city with projection and growth history (JSON).
    List,
    /// Show one city with projection and growth history (JSON).
    Show { id: u64 },
}

#[derive(Subcommand, Debug)]
enum PopCommand {
    /// Add a population record to a city.
    Add {
        #[arg(long)]
        city: u64,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        count: u64,
        #[arg(long, default_value = "")]
        source: String,
    },
    /// Change a population record.
    Update {
        id: u64,
        #[arg(long)]
        year: Option<i32>,
        #[arg(long)]
        count: Option<u64>,
        #[arg(long)]
        source: Option<String>,
    },
    /// Delete a population record.
    Delete { id: u64 },
}

#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Create an admin user.
    Create {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// Create the first superadmin (only while none exists).
    Bootstrap {
        #[arg(long)]
        username: String,
        #[arg(long, default_value = "")]
        email: String,
    },
    /// List admin users.
    List,
    /// Delete an admin user.
    Delete { id: u64 },
}

#[derive(Args, Debug)]
struct ExportArgs {
    city: u64,
    /// Output file or directory; stdout when omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SummaryArgs {
    /// Print the full report as JSON instead of the paragraph.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Args, Debug)]
struct PlotArgs {
    city: u64,
    /// Output path (.svg or .png).
    #[arg(long)]
    out: PathBuf,
    /// Width of the plot (default from config, 1000).
    #[arg(long)]
    width: Option<u32>,
    /// Height of the plot (default from config, 600).
    #[arg(long)]
    height: Option<u32>,
    /// Locale for axis labels (en, de, fr, es, it, pt, nl).
    #[arg(long)]
    locale: Option<String>,
}

struct Ctx {
    cfg: Config,
    forecaster: Forecaster,
    store: Store,
    actor: Option<String>,
}

impl Ctx {
    fn authorize(&self, action: Action) -> Result<()> {
        let actor = service::resolve_actor(&self.store, self.actor.as_deref())?;
        authorize(actor, action)?;
        Ok(())
    }

    fn actor_name(&self) -> &str {
        self.actor.as_deref().unwrap_or("anonymous")
    }

    fn save(&self) -> Result<()> {
        self.store
            .save(&self.cfg.data_file)
            .with_context(|| format!("saving {}", self.cfg.data_file.display()))
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let mut cfg = Config::load_or_default(cli.config.as_deref())?;
    if let Some(data) = cli.data {
        cfg.data_file = data;
    }
    if let Some(policy) = cli.next_year {
        cfg.next_year = policy.into();
    }
    let forecaster = Forecaster::new(cfg.next_year);
    let store = Store::load(&cfg.data_file)
        .with_context(|| format!("loading {}", cfg.data_file.display()))?;
    log::debug!(
        "store {} with {} projections",
        cfg.data_file.display(),
        forecaster.policy()
    );

    let mut ctx = Ctx {
        cfg,
        forecaster,
        store,
        actor: cli.actor,
    };
    match cli.cmd {
        Command::City(c) => cmd_city(&mut ctx, c),
        Command::Pop(c) => cmd_pop(&mut ctx, c),
        Command::Admin(c) => cmd_admin(&mut ctx, c),
        Command::Export(args) => cmd_export(&ctx, args),
        Command::Stats => print_json(&service::population_stats(&ctx.store, &ctx.forecaster)?),
        Command::Summary(args) => cmd_summary(&ctx, args),
        Command::Plot(args) => cmd_plot(&ctx, args),
    }
}

fn cmd_city(ctx: &mut Ctx, cmd: CityCommand) -> Result<()> {
    match cmd {
        CityCommand::List => print_json(&service::city_reports(&ctx.store, &ctx.forecaster)?),
        CityCommand::Show { id } => {
            print_json(&service::city_report(&ctx.store, &ctx.forecaster, id)?)
        }
        CityCommand::Add { name, region } => {
            ctx.authorize(Action::ManageCities)?;
            let city = ctx.store.add_city(&name, &region)?;
            ctx.save()?;
            eprintln!("City {} added successfully.", city.name);
            print_json(&city)
        }
        CityCommand::Update { id, name, region } => {
            ctx.authorize(Action::ManageCities)?;
            let city = ctx.store.update_city(id, &CityPatch { name, region })?;
            ctx.save()?;
            print_json(&city)
        }
        CityCommand::Delete { id } => {
            ctx.authorize(Action::ManageCities)?;
            let city = ctx.store.delete_city(id)?;
            ctx.save()?;
            println!(
                "City \"{}\" and its population data deleted successfully.",
                city.name
            );
            Ok(())
        }
    }
}

fn cmd_pop(ctx: &mut Ctx, cmd: PopCommand) -> Result<()> {
    ctx.authorize(Action::ManagePopulation)?;
    match cmd {
        PopCommand::Add {
            city,
            year,
            count,
            source,
        } => {
            let created_by = ctx.actor_name().to_string();
            let record = ctx
                .store
                .add_record(city, year, count, &source, &created_by)?;
            ctx.save()?;
            eprintln!("Population data added successfully.");
            print_json(&record)
        }
        PopCommand::Update {
            id,
            year,
            count,
            source,
        } => {
            let patch = RecordPatch {
                year,
                population_count: count,
                source,
            };
            let record = ctx.store.update_record(id, &patch)?;
            ctx.save()?;
            print_json(&record)
        }
        PopCommand::Delete { id } => {
            ctx.store.delete_record(id)?;
            ctx.save()?;
            println!("Population data deleted successfully.");
            Ok(())
        }
    }
}

fn cmd_admin(ctx: &mut Ctx, cmd: AdminCommand) -> Result<()> {
    match cmd {
        AdminCommand::Create { username, email } => {
            ctx.authorize(Action::CreateAdmin)?;
            let user = ctx.store.create_admin(&username, &email)?;
            ctx.save()?;
            eprintln!("Admin {} created successfully.", user.username);
            print_json(&user)
        }
        AdminCommand::Bootstrap { username, email } => {
            if ctx.store.has_superadmin() {
                bail!("a superadmin already exists");
            }
            let user = ctx.store.create_superadmin(&username, &email)?;
            ctx.save()?;
            print_json(&user)
        }
        AdminCommand::List => {
            ctx.authorize(Action::ListAdmins)?;
            print_json(&ctx.store.admins())
        }
        AdminCommand::Delete { id } => {
            ctx.authorize(Action::DeleteAdmin)?;
            ctx.store.delete_admin(id)?;
            ctx.save()?;
            println!("Admin deleted successfully.");
            Ok(())
        }
    }
}

fn cmd_export(ctx: &Ctx, args: ExportArgs) -> Result<()> {
    let city = ctx
        .store
        .city(args.city)
        .with_context(|| format!("city {} not found", args.city))?;
    let records = ctx.store.fetch_series(city.id)?;
    match args.out {
        None => storage::export_city_csv(&records, std::io::stdout().lock()),
        Some(out) => {
            let path = if out.is_dir() {
                out.join(storage::csv_filename(&city.name))
            } else {
                out
            };
            storage::save_city_csv(&records, &path)?;
            eprintln!("Saved {} rows to {}", records.len(), path.display());
            Ok(())
        }
    }
}

fn cmd_summary(ctx: &Ctx, args: SummaryArgs) -> Result<()> {
    let report = service::summary_report(&ctx.store, &ctx.forecaster)?;
    if args.json {
        print_json(&report)
    } else {
        println!("{}", report.summary);
        Ok(())
    }
}

fn cmd_plot(ctx: &Ctx, args: PlotArgs) -> Result<()> {
    let city = ctx
        .store
        .city(args.city)
        .with_context(|| format!("city {} not found", args.city))?;
    let series: Vec<Observation> = ctx
        .store
        .fetch_series(city.id)?
        .iter()
        .map(Observation::from)
        .collect();
    let projection = ctx.forecaster.predict_next_year(&series);
    let width = args.width.unwrap_or(ctx.cfg.chart.width);
    let height = args.height.unwrap_or(ctx.cfg.chart.height);
    let locale = args.locale.as_deref().unwrap_or(&ctx.cfg.locale);
    if width == 0 || height == 0 {
        bail!("plot size must be non-zero");
    }
    let title = format!("{} population", city.name);
    viz::plot_city_trend(&title, &series, &projection, &args.out, width, height, locale)?;
    eprintln!("Wrote plot to {}", args.out.display());
    Ok(())
}
