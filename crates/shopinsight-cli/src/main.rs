use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use shopinsight_agent::AnalyticsAgent;
use shopinsight_ai::LLMProviderFactory;
use shopinsight_api::{build_cache, AppState, Server};
use shopinsight_core::{ConfigManager, Domain, LoggingConfig, QueryValidator, ShopInsightConfig};
use shopinsight_platform::{ShopifyClient, ShopifyConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "shopinsight")]
#[command(about = "ShopInsight - natural-language analytics for Shopify stores", long_about = None)]
#[command(version)]
struct Cli {
    /// Output format (json, pretty)
    #[arg(short, long, global = true, default_value = "pretty")]
    output: OutputFormat,

    /// Configuration file (defaults to .shopinsight.toml or ~/.shopinsight/config.toml)
    #[arg(short, long, global = true, env = "SHOPINSIGHT_CONFIG")]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Json,
    Pretty,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP service
    Serve {
        /// Bind address (overrides server.host)
        #[arg(long)]
        host: Option<String>,

        /// Port (overrides server.port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Answer one question about a store
    Ask {
        #[command(flatten)]
        store: StoreArgs,

        /// The question, in plain language
        question: String,
    },

    /// Check a ShopifyQL query against the safety rules
    Validate {
        /// Query text
        query: String,
    },

    /// Execute a query directly against a store, skipping the completion stages
    RunQuery {
        #[command(flatten)]
        store: StoreArgs,

        /// Data domain the query targets
        #[arg(short, long)]
        domain: String,

        /// Query text
        query: String,
    },
}

#[derive(clap::Args)]
struct StoreArgs {
    /// Store domain, e.g. example.myshopify.com
    #[arg(short, long, env = "SHOPIFY_STORE")]
    store: String,

    /// Admin API access token
    #[arg(short, long, env = "SHOPIFY_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// Admin API version (overrides platform.api_version)
    #[arg(long)]
    api_version: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let manager = match &cli.config {
        Some(path) => ConfigManager::from_path(path),
        None => ConfigManager::load(),
    }
    .context("Failed to load configuration")?;
    let config = manager.config().clone();

    init_tracing(&config.logging, cli.verbose);
    if let Some(path) = manager.config_path() {
        tracing::debug!("Loaded configuration from {}", path.display());
    }

    match execute_command(&cli, config).await {
        Ok(Some(output)) => {
            print_output(&cli.output, &output)?;
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing(logging: &LoggingConfig, verbose: bool) {
    let default_filter = if verbose {
        "shopinsight=debug,tower_http=debug".to_string()
    } else {
        format!("shopinsight={},tower_http=info", logging.level)
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    // Logs go to stderr so command output stays machine-readable.
    let registry = tracing_subscriber::registry().with(filter);
    match logging.format.as_str() {
        "json" => registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        "compact" => registry
            .with(tracing_subscriber::fmt::layer().compact().with_writer(std::io::stderr))
            .init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

async fn execute_command(
    cli: &Cli,
    config: ShopInsightConfig,
) -> Result<Option<serde_json::Value>> {
    match &cli.command {
        Commands::Serve { host, port } => {
            serve(config, host.clone(), *port).await?;
            Ok(None)
        }
        Commands::Ask { store, question } => {
            let agent = build_agent(&config, store, true).await?;
            let response = agent.process_question(question).await?;
            Ok(Some(serde_json::to_value(response)?))
        }
        Commands::Validate { query } => {
            let outcome = QueryValidator::check(query);
            let mut value = serde_json::json!({
                "valid": outcome.is_ok(),
                "query": query,
            });
            if let Err(rejection) = outcome {
                value["reason"] = serde_json::Value::String(rejection.to_string());
            }
            Ok(Some(value))
        }
        Commands::RunQuery {
            store,
            domain,
            query,
        } => {
            let domain: Domain = domain.parse()?;
            let agent = build_agent(&config, store, false).await?;
            let result = agent.execute(domain, query).await?;
            Ok(Some(serde_json::json!({
                "domain": domain,
                "data_points": result.data_points(),
                "data": result.to_value(),
            })))
        }
    }
}

async fn serve(config: ShopInsightConfig, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", host, port))?;

    let state = AppState::new(Arc::new(config))
        .await
        .context("Failed to initialize application state")?;

    println!(
        "{} {}",
        "ShopInsight API".green().bold(),
        format!("listening on http://{}", addr).cyan()
    );
    Server::new(addr, state)
        .run()
        .await
        .context("HTTP server failed")
}

async fn build_agent(
    config: &ShopInsightConfig,
    store: &StoreArgs,
    with_completion: bool,
) -> Result<AnalyticsAgent> {
    let mut shopify =
        ShopifyConfig::from_platform_config(&store.store, &store.token, &config.platform);
    if let Some(version) = &store.api_version {
        shopify = shopify.with_api_version(version);
    }
    let platform = ShopifyClient::new(shopify)?;

    let mut builder = AnalyticsAgent::builder()
        .store_id(store.store.clone())
        .cache(build_cache(&config.cache).await)
        .platform(Arc::new(platform))
        .pipeline_config(config.pipeline.clone())
        .result_ttl(config.cache.ttl());

    if with_completion {
        let completion = LLMProviderFactory::create_completion(&config.llm)
            .context("Failed to create completion provider")?;
        builder = builder.completion(completion);
    }

    Ok(builder.build()?)
}

fn print_output(format: &OutputFormat, value: &serde_json::Value) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
        OutputFormat::Pretty => {
            print_pretty(value)?;
        }
    }
    Ok(())
}

fn print_pretty(value: &serde_json::Value) -> Result<()> {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                let key_colored = key.cyan().bold();
                match val {
                    serde_json::Value::String(s) => {
                        println!("{}: {}", key_colored, s.green());
                    }
                    serde_json::Value::Number(n) => {
                        println!("{}: {}", key_colored, n.to_string().yellow());
                    }
                    serde_json::Value::Bool(b) => {
                        let val_colored = if *b {
                            "true".green()
                        } else {
                            "false".red()
                        };
                        println!("{}: {}", key_colored, val_colored);
                    }
                    serde_json::Value::Null => {
                        println!("{}: {}", key_colored, "-".dimmed());
                    }
                    _ => {
                        println!("{}:", key_colored);
                        println!("{}", serde_json::to_string_pretty(val)?);
                    }
                }
            }
        }
        _ => {
            println!("{}", serde_json::to_string_pretty(value)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_run_query_arguments() {
        let cli = Cli::try_parse_from([
            "shopinsight",
            "--output",
            "json",
            "run-query",
            "--store",
            "demo.myshopify.com",
            "--token",
            "shpat_x",
            "--domain",
            "inventory",
            "FROM inventory WHERE quantity < 5",
        ])
        .unwrap();

        match cli.command {
            Commands::RunQuery {
                store,
                domain,
                query,
            } => {
                assert_eq!(store.store, "demo.myshopify.com");
                assert_eq!(domain, "inventory");
                assert_eq!(query, "FROM inventory WHERE quantity < 5");
            }
            _ => panic!("expected run-query"),
        }
        assert!(matches!(cli.output, OutputFormat::Json));
    }
}
