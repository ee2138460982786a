use std::str::FromStr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use dex_api::{DexApi, FilterSet, InProcApi, LoadState, Settings, SortKey};
use dex_core::{Collection, DetailRecord, Item};
use tokio::signal;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "dexctl", version, about = "Browse a remote creature catalog")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// API root, e.g. https://pokeapi.co/api/v2
    #[arg(long = "base-url", env = "DEX_BASE_URL", global = true)]
    base_url: Option<String>,

    /// Collection resource under the API root
    #[arg(long = "resource", env = "DEX_RESOURCE", global = true)]
    resource: Option<String>,

    /// Page size hint sent as ?limit=N
    #[arg(long = "limit", env = "DEX_PAGE_LIMIT", global = true)]
    limit: Option<u32>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum SortArg { Id, Name }

impl From<SortArg> for SortKey {
    fn from(v: SortArg) -> Self {
        match v {
            SortArg::Id => SortKey::ById,
            SortArg::Name => SortKey::ByName,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the catalog
    Ls {
        /// Sort order
        #[arg(long = "sort", value_enum, default_value_t = SortArg::Id)]
        sort: SortArg,
        /// Show only items of these types (repeatable, OR-ed)
        #[arg(long = "type")]
        types: Vec<String>,
        /// Resolve every item's details before listing
        #[arg(long = "eager", action = ArgAction::SetTrue)]
        eager: bool,
    },
    /// Show details for one item by name
    Show {
        name: String,
    },
    /// List type names present in the catalog (resolves every item)
    Types,
}

fn init_tracing() {
    let env = std::env::var("DEX_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(settings: &Settings) {
    if let Some(addr) = settings.metrics_addr.as_deref() {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid DEX_METRICS_ADDR; expected host:port");
        }
    }
}

fn settings_from(cli: &Cli) -> Settings {
    let mut s = Settings::from_env();
    if let Some(v) = cli.base_url.clone() { s.base_url = v; }
    if let Some(v) = cli.resource.clone() { s.resource = v; }
    if cli.limit.is_some() { s.page_limit = cli.limit; }
    s
}

/// Load with a visible progress line; a failed load is reported and ends the process.
async fn load_or_exit(api: &InProcApi, output: Output) -> Arc<Collection> {
    if output == Output::Human {
        eprintln!("loading {} ...", api.loader().source().first_page_url());
    }
    let res = tokio::select! {
        res = api.load() => res,
        _ = signal::ctrl_c() => {
            warn!("Ctrl-C received; aborting load");
            std::process::exit(130);
        }
    };
    match res {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, state = ?api.load_state(), "load failed");
            eprintln!("load error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn resolve_or_exit(api: &InProcApi, output: Output) -> Arc<Collection> {
    if output == Output::Human {
        eprintln!("resolving {} details ...", api.collection().count());
    }
    match api.resolve_all().await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("resolve error: {}", e);
            std::process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let settings = settings_from(&cli);
    init_metrics(&settings);
    let api = InProcApi::from_settings(&settings).map_err(|e| anyhow!("building http client: {}", e))?;

    match cli.command {
        Commands::Ls { sort, types, eager } => {
            info!(sort = ?sort, types = ?types, eager, "ls invoked");
            load_or_exit(&api, cli.output).await;
            if eager {
                resolve_or_exit(&api, cli.output).await;
            } else if !types.is_empty() {
                warn!("type filters only match resolved items; pass --eager to resolve details first");
            }
            api.set_sort(sort.into());
            for t in types.iter() {
                if !api.view().filters.contains(t) { api.toggle_filter(t); }
            }
            let items = api.project();
            match cli.output {
                Output::Human => {
                    println!("{:<6} {:<24} TYPES", "ID", "NAME");
                    for it in items.iter() {
                        println!("{}", render_row(it));
                    }
                    let total = api.collection().count();
                    eprintln!("showing {} of {}{}", items.len(), total, render_filters(&api.view().filters));
                }
                Output::Json => println!("{}", serde_json::to_string_pretty(&items)?),
            }
        }
        Commands::Show { name } => {
            info!(name = %name, "show invoked");
            let collection = load_or_exit(&api, cli.output).await;
            let Some(item) = collection.find_by_name(&name).cloned() else {
                eprintln!("no item named {:?}", name);
                std::process::exit(1);
            };
            match api.select(&item).await {
                Ok(rec) => match cli.output {
                    Output::Human => print!("{}", render_detail(&rec)),
                    Output::Json => println!("{}", serde_json::to_string_pretty(&rec)?),
                },
                Err(e) => {
                    error!(error = ?e, "select failed");
                    eprintln!("detail error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::Types => {
            info!("types invoked");
            load_or_exit(&api, cli.output).await;
            resolve_or_exit(&api, cli.output).await;
            let facets = api.facets();
            match cli.output {
                Output::Human => {
                    println!("{:<12} COUNT", "TYPE");
                    for (t, n) in facets.iter() {
                        println!("{:<12} {}", t, n);
                    }
                }
                Output::Json => {
                    #[derive(serde::Serialize)]
                    struct Row<'a> { name: &'a str, count: usize }
                    let rows: Vec<_> = facets.iter().map(|(t, n)| Row { name: t, count: *n }).collect();
                    println!("{}", serde_json::to_string_pretty(&rows)?);
                }
            }
        }
    }

    if let LoadState::Failed(e) = api.load_state() {
        warn!(error = %e, "finished with failed load state");
    }
    Ok(())
}

fn render_row(it: &Item) -> String {
    let id = it.id().map(|i| i.to_string()).unwrap_or_else(|| "-".to_string());
    let types = match it.as_detail() {
        Some(d) => d.type_names().collect::<Vec<_>>().join(","),
        None => "?".to_string(),
    };
    format!("{:<6} {:<24} {}", id, it.name(), types)
}

fn render_filters(filters: &FilterSet) -> String {
    if filters.is_empty() {
        String::new()
    } else {
        format!(" (types: {})", filters.iter().collect::<Vec<_>>().join(", "))
    }
}

fn render_detail(rec: &DetailRecord) -> String {
    let abilities = rec.ability_names().collect::<Vec<_>>().join(", ");
    let types = rec.type_names().collect::<Vec<_>>().join(", ");
    format!(
        "Details for {}\nID: {}\nHeight: {} dm\nWeight: {} hg\nAbilities: {}\nTypes: {}\nSprite: {}\n",
        rec.name, rec.id, rec.height, rec.weight, abilities, types, rec.sprite_url()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_core::{Named, SummaryItem};

    #[test]
    fn rows_mark_unresolved_types() {
        let s = Item::Summary(SummaryItem { id: Some(4), name: "charmander".into(), url: "u".into() });
        assert!(render_row(&s).starts_with("4 "));
        assert!(render_row(&s).ends_with('?'));
    }

    #[test]
    fn detail_lists_units_and_names() {
        let rec = DetailRecord {
            id: 1,
            name: "bulbasaur".into(),
            url: "u".into(),
            height: 7,
            weight: 69,
            abilities: [Named::new("overgrow"), Named::new("chlorophyll")].into_iter().collect(),
            types: [Named::new("grass"), Named::new("poison")].into_iter().collect(),
        };
        let out = render_detail(&rec);
        assert!(out.contains("Height: 7 dm"));
        assert!(out.contains("Weight: 69 hg"));
        assert!(out.contains("Abilities: overgrow, chlorophyll"));
        assert!(out.contains("Types: grass, poison"));
        assert!(out.contains("/1.png"));
    }

    #[test]
    fn exporter_sees_view_metrics() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        metrics::set_boxed_recorder(Box::new(recorder)).unwrap();

        let c: Collection = [Item::Summary(SummaryItem { id: Some(1), name: "bulbasaur".into(), url: "u".into() })]
            .into_iter()
            .collect();
        assert_eq!(dex_api::ViewState::default().project(&c).len(), 1);
        assert!(handle.render().contains("view_project_items"));
    }

    #[test]
    fn cli_parses_repeated_types() {
        let cli = Cli::try_parse_from(["dexctl", "ls", "--sort", "name", "--type", "fire", "--type", "water", "--eager"]).unwrap();
        match cli.command {
            Commands::Ls { sort, types, eager } => {
                assert_eq!(SortKey::from(sort), SortKey::ByName);
                assert_eq!(types, vec!["fire", "water"]);
                assert!(eager);
            }
            _ => panic!("expected ls"),
        }
    }
}
