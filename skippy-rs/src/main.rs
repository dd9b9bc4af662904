use std::process::ExitCode;

use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skippy::cli::{self, CliArgs, ConfigFile};
use skippy::command::SpecialOp;
use skippy::config::Config;
use skippy::interp::DEFAULT_TIMEOUT;
use skippy::transport::ResourceConnector;
use skippy::{document, CancelToken, Interpreter};

fn init_tracing(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn load_config(args: &CliArgs) -> Config {
    let path = match &args.config {
        ConfigFile::Skip => return Config::new(),
        ConfigFile::Explicit(path) => path.clone(),
        ConfigFile::Search => match cli::find_user_config() {
            Some(path) => path,
            None => return Config::new(),
        },
    };
    match Config::load_file(&path) {
        Ok((config, errors)) => {
            for e in errors {
                warn!("{}: {e}", path.display());
            }
            config
        }
        Err(e) => {
            warn!("{e}");
            Config::new()
        }
    }
}

/// Print the variables and commands an interpreter would run (dry run).
fn print_listing(interp: &Interpreter) {
    println!("Variables:");
    for (name, value) in interp.vars.iter() {
        println!("  {name} = {value}");
    }
    println!("Commands:");
    for (i, cmd) in interp.commands().iter().enumerate() {
        let mut line = format!("  [{}] {} {}", i + 1, cmd.operation, cmd.command);
        if cmd.special_op != SpecialOp::None {
            line.push_str(&format!(" ({} {})", cmd.special_op, cmd.special_op_arg));
        }
        println!("{}", line.trim_end());
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = match cli::parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("skippy: {e}");
            eprintln!("{}", cli::USAGE);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.debug);

    // ── Variables: config defaults < document table < -D overrides ──────────
    let config = load_config(&args);
    let mut doc = match document::load(&args.document) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("skippy: {e}");
            return ExitCode::FAILURE;
        }
    };
    let mut vars = config.vars;
    for (name, value) in doc.vars.iter() {
        vars.set(name, value);
    }
    vars.extend(args.overrides.iter().cloned());
    doc.vars = vars;

    let timeout = args.timeout.or(config.timeout).unwrap_or(DEFAULT_TIMEOUT);
    let token = CancelToken::new();
    let mut interp = Interpreter::new(doc).with_cancel(token.clone()).with_timeout(timeout);

    if args.dry_run {
        print_listing(&interp);
        return ExitCode::SUCCESS;
    }

    // ── Run ───────────────────────────────────────────────────────────────────
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping");
            token.cancel();
        }
    });

    let connector = ResourceConnector::default();

    match interp.run(&connector).await {
        Ok(summary) => {
            info!(
                "done: {} statement(s), {} instrument operation(s)",
                summary.steps.len(),
                summary.instrument_ops()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("skippy: {e}");
            ExitCode::FAILURE
        }
    }
}
