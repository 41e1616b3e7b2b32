use anyhow::Context;
use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use serde_json::json;
use std::sync::Arc;

use flowgate::gateway::flow::chain::FlowChainFactory;
use flowgate::gateway::flow::condition::ExpressionEvaluator;
use flowgate::gateway::flow::types::ResolutionScope;
use flowgate::gateway::flow::DefinitionLoader;
use flowgate::gateway::{
    ApiManager, ApiReactor, DryRunExecutor, GatewayConfig, OrganizationManager, RequestOutcome,
};
use flowgate::sdk::context::ATTR_PLAN;
use flowgate::sdk::{ExecutionContext, HttpMethod, LoggingFlowHook, Operation, Request};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Gateway configuration file (YAML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the flows each chain resolves for a request
    Resolve(RequestArgs),
    /// Run every phase of a request with dry-run policies
    Run(RequestArgs),
}

#[derive(ClapArgs, Debug)]
struct RequestArgs {
    /// Path to the API definition file
    #[arg(short, long)]
    api: String,

    /// Path to the organization definition file
    #[arg(short, long)]
    organization: Option<String>,

    /// Request path
    #[arg(short, long, default_value = "/")]
    path: String,

    /// Request method
    #[arg(short, long, default_value = "GET")]
    method: String,

    /// Plan the request is subscribed to
    #[arg(long)]
    plan: Option<String>,

    /// Entrypoint connector id (message APIs)
    #[arg(long)]
    entrypoint: Option<String>,

    /// Entrypoint operation: publish or subscribe
    #[arg(long, requires = "entrypoint")]
    operation: Option<String>,

    /// Request header as name=value, repeatable
    #[arg(long = "header", value_parser = parse_pair)]
    headers: Vec<(String, String)>,

    /// Query parameter as name=value, repeatable
    #[arg(long = "param", value_parser = parse_pair)]
    params: Vec<(String, String)>,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.to_string()))
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => GatewayConfig::load(path)
            .with_context(|| format!("Failed to load configuration from {}", path))?,
        None => GatewayConfig::default(),
    }
    .with_env()?;
    log::debug!("Using configuration: {:?}", config);

    match args.command {
        Commands::Resolve(request) => {
            let (reactor, ctx) = prepare(&config, &request)?;

            for scope in [
                ResolutionScope::Platform,
                ResolutionScope::Plan,
                ResolutionScope::Api,
            ] {
                let flows = reactor.chain(scope).resolver().resolve(&ctx).await?;
                println!("{} ({} flow(s))", scope, flows.len());
                for flow in flows.iter() {
                    println!("  - {}", flow.name);
                }
            }
        }
        Commands::Run(request) => {
            let (reactor, mut ctx) = prepare(&config, &request)?;

            let outcome = reactor.handle(&mut ctx).await;
            for step in DryRunExecutor::recorded(&ctx) {
                println!("{}", step);
            }
            match outcome {
                RequestOutcome::Completed => println!("Completed"),
                RequestOutcome::Interrupted(failure) => println!("Interrupted: {}", failure),
                RequestOutcome::Failed(e) => anyhow::bail!("Request failed: {}", e),
            }
        }
    }

    Ok(())
}

/// Deploy the API (and its organization) and build the request context
fn prepare(
    config: &GatewayConfig,
    args: &RequestArgs,
) -> anyhow::Result<(Arc<ApiReactor>, ExecutionContext)> {
    let loader = DefinitionLoader::new();
    let organizations = Arc::new(OrganizationManager::new());

    if let Some(path) = &args.organization {
        let definition = loader
            .load_organization(path)
            .with_context(|| format!("Failed to load organization from {}", path))?;
        organizations.register(definition)?;
    }

    let factory = FlowChainFactory::new(
        Arc::new(ExpressionEvaluator::new()),
        Arc::new(DryRunExecutor::new()),
        config.flows.clone(),
    )
    .with_hook(Arc::new(LoggingFlowHook::new()));
    let manager = ApiManager::new(factory, organizations);

    let definition = loader
        .load_api(&args.api)
        .with_context(|| format!("Failed to load API from {}", args.api))?;
    let reactor = manager.deploy(&definition)?;

    let method: HttpMethod = args.method.parse()?;
    let mut request = Request::new(method, args.path.clone());
    for (name, value) in &args.headers {
        request = request.with_header(name, value.clone());
    }
    for (name, value) in &args.params {
        request = request.with_param(name.clone(), value.clone());
    }
    if let Some(entrypoint) = &args.entrypoint {
        let operation: Operation = args
            .operation
            .as_deref()
            .unwrap_or("subscribe")
            .parse()?;
        request = request.with_entrypoint(entrypoint.clone(), operation);
    }

    let mut ctx = ExecutionContext::new(request);
    if let Some(plan) = &args.plan {
        ctx.set_attribute(ATTR_PLAN, json!(plan));
    }
    Ok((reactor, ctx))
}
