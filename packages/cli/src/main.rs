use std::time::Duration;

use clap::{Parser, ValueEnum};
use freecycle::{Category, DEFAULT_RESULTS, Group, GroupOptions};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{Layer, layer::SubscriberExt as _, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(
    name = "freecycle",
    about = "Fetch posts from a freecycle.org group.",
    version
)]
struct FreecycleOptions {
    /// Group ID as it appears in the group's URL.
    group: String,

    /// Post category to fetch.
    #[arg(short, long, value_enum, default_value = "all")]
    category: CategoryArg,

    /// Maximum number of posts to fetch.
    #[arg(short, long, default_value_t = DEFAULT_RESULTS)]
    limit: u32,

    /// Print the total number of matching posts instead of the posts.
    #[arg(long)]
    count: bool,

    /// Overall deadline in seconds; whatever was fetched by then is printed.
    #[arg(short, long)]
    timeout: Option<u64>,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum CategoryArg {
    Wanted,
    Offer,
    All,
}

impl From<CategoryArg> for Category {
    fn from(arg: CategoryArg) -> Self {
        match arg {
            CategoryArg::Wanted => Category::Wanted,
            CategoryArg::Offer => Category::Offer,
            CategoryArg::All => Category::All,
        }
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    setup_tracing();
    color_eyre::install()?;
    let options = FreecycleOptions::parse();

    let group = Group::with_options(
        &options.group,
        GroupOptions {
            timeout: options.timeout.map(Duration::from_secs),
            ..GroupOptions::default()
        },
    );

    if options.count {
        let total = group.result_count(options.category.into()).await?;
        println!("{total}");
        return Ok(());
    }

    let posts = group
        .posts_limit(options.category.into(), options.limit)
        .await?;
    tracing::info!(group = group.id(), count = posts.len(), "fetched posts");
    println!("{}", serde_json::to_string_pretty(&posts)?);
    Ok(())
}

fn setup_tracing() {
    let stdout_log = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_filter(
            tracing_subscriber::EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        );

    tracing_subscriber::registry().with(stdout_log).init();
}
