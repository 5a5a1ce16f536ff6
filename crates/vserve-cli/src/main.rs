use anyhow::Context;
use axum::Router;
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use vserve_backend::ParamValue;
use vserve_common::config::ServeConfig;
use vserve_core::{CompletionRequest, MaxTokens};

#[derive(Parser, Debug)]
#[command(name = "vserve", version, about = "HTTP completion service in front of an LLM inference engine")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    Serve(ServeArgs),
    /// Run the completion pipeline once against the configured engine and print the response
    Complete(CompleteArgs),
    Version,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Listen address; overrides VSERVE_BIND
    #[arg(short, long)]
    bind: Option<String>,
}

#[derive(Args, Debug)]
struct CompleteArgs {
    /// Repeat to send a batch; a single prompt gets a single completion back
    #[arg(short, long = "prompt", required = true)]
    prompts: Vec<String>,
    #[arg(short = 'n', long, default_value_t = MaxTokens::DEFAULT as i64)]
    max_tokens: i64,
    /// Sampling override as key=value, e.g. --param temperature=0.2
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, ParamValue)>,
}

fn parse_param(raw: &str) -> Result<(String, ParamValue), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw}"))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in {raw}"));
    }
    Ok((key.to_string(), ParamValue::parse_literal(value)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vserve_obs::init_tracing();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Serve(args) => serve(args).await,
        Commands::Complete(args) => complete_once(args).await,
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    };
    vserve_obs::shutdown_tracing();
    result
}

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut cfg = ServeConfig::load()?;
    if let Some(bind) = args.bind {
        cfg.bind = bind;
    }
    let app: Router = vserve_api::bootstrap(&cfg).await?;
    let listener = tokio::net::TcpListener::bind(cfg.bind.as_str())
        .await
        .with_context(|| format!("cannot bind {}", cfg.bind))?;
    tracing::info!("serving {} on http://{}", cfg.model_name(), cfg.bind);
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("shutdown signal received");
    };
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn complete_once(args: CompleteArgs) -> anyhow::Result<()> {
    let cfg = ServeConfig::load()?;
    let prompt = if args.prompts.len() == 1 {
        Value::String(args.prompts[0].clone())
    } else {
        Value::from(args.prompts)
    };
    let max_tokens = MaxTokens::try_from(args.max_tokens).map_err(anyhow::Error::msg)?;
    let request = args
        .params
        .into_iter()
        .fold(CompletionRequest::new(prompt).with_max_tokens(max_tokens), |req, (k, v)| {
            req.with_parameter(k, v)
        });

    let engine = vserve_api::select_engine(&cfg).await?;
    let response = vserve_core::complete(engine.as_ref(), request).await?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
