use clap::{Args as ClapArgs, Parser, Subcommand};
use dotenv::dotenv;
use scope_rs::scope::builtins::default_commands;
use scope_rs::scope::condition::parse;
use scope_rs::scope::environment::{EnvironmentBuilder, EnvironmentConfig, EnvironmentLoader};
use scope_rs::scope::predicate::{check, evaluate, Predicate};
use scope_rs::scope::registry::CommandRegistry;
use scope_rs::ScopeError;

use std::collections::HashMap;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Evaluate a predicate; exits 0 when true, 1 when false, 2 on error
    Check {
        /// Predicate expression
        expression: String,

        #[command(flatten)]
        env: EnvArgs,
    },
    /// Evaluate an expression and print the result as JSON
    Eval {
        /// Expression to evaluate
        expression: String,

        #[command(flatten)]
        env: EnvArgs,
    },
    /// Print the parsed syntax tree as JSON
    Parse {
        /// Expression to parse
        expression: String,
    },
    /// Check a legacy JSON token array
    Legacy {
        /// JSON array, e.g. '["os", "==", "linux"]'
        tokens: String,

        #[command(flatten)]
        env: EnvArgs,
    },
}

#[derive(ClapArgs, Debug)]
struct EnvArgs {
    /// Environment configuration file (YAML or JSON)
    #[arg(short, long)]
    config: Option<String>,

    /// Variable exposed through var(KEY), as KEY=VALUE
    #[arg(long = "var", value_parser = parse_var)]
    vars: Vec<(String, String)>,

    /// Log every command invocation with its result
    #[arg(short, long)]
    debug: bool,
}

fn parse_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", raw))
}

impl Commands {
    fn debug(&self) -> bool {
        match self {
            Commands::Check { env, .. } | Commands::Eval { env, .. } | Commands::Legacy { env, .. } => {
                env.debug
            }
            Commands::Parse { .. } => false,
        }
    }
}

async fn build_registry(env: EnvArgs) -> Result<CommandRegistry, ScopeError> {
    let mut config = match &env.config {
        Some(path) => EnvironmentLoader::new().load_config(path)?,
        None => EnvironmentConfig::default().with_env_overrides(),
    };
    config.debug |= env.debug;

    let vars: HashMap<String, String> = env.vars.into_iter().collect();
    EnvironmentBuilder::new()
        .with_commands(default_commands(vars))
        .build(&config)
        .await
}

async fn run(command: Commands) -> Result<ExitCode, ScopeError> {
    match command {
        Commands::Check { expression, env } => {
            let registry = build_registry(env).await?;
            let result = check(&registry, expression).await?;
            println!("{}", result);
            Ok(if result { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
        Commands::Eval { expression, env } => {
            let registry = build_registry(env).await?;
            let expr = parse(&expression)?;
            let value = evaluate(&registry, &expr).await?;
            println!("{}", serde_json::to_string_pretty(&value.to_json())?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Parse { expression } => {
            let expr = parse(&expression)?;
            println!("{}", serde_json::to_string_pretty(&expr)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Legacy { tokens, env } => {
            let registry = build_registry(env).await?;
            let tokens: serde_json::Value = serde_json::from_str(&tokens)?;
            let result = check(&registry, Predicate::Tokens(tokens)).await?;
            println!("{}", result);
            Ok(if result { ExitCode::SUCCESS } else { ExitCode::from(1) })
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let args = Args::parse();

    let level = if args.command.debug() { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match run(args.command).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}
