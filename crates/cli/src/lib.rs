pub mod commands;
pub mod logging;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use commands::can::CanArgs;
use commands::predefined_route::PredefinedRouteArgs;
use commands::route::RouteArgs;

#[derive(Debug, Parser)]
#[command(
    name = "orderdesk",
    about = "Orderdesk access control and routing CLI",
    long_about = "Apply migrations, load the demo org, resolve order executors and evaluate permissions.",
    after_help = "Examples:\n  orderdesk seed\n  orderdesk route --order-type 3 --department 10\n  orderdesk can --user 111 --permission orders:update --order-department 10 --order-creator 101 --order-executor 111"
)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Apply pending database migrations and return structured status output")]
    Migrate,
    #[command(about = "Load the demo org structure, routing rules and roles")]
    Seed,
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Resolve the executor for an order")]
    Route(RouteArgs),
    #[command(about = "Show the department/otdel a hard rule pins for an order type")]
    PredefinedRoute(PredefinedRouteArgs),
    #[command(about = "Evaluate a permission for a user, optionally against a target")]
    Can(CanArgs),
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    logging::init_from_env();

    let result = match cli.command {
        Command::Migrate => commands::migrate::run(),
        Command::Seed => commands::seed::run(),
        Command::Config => {
            commands::CommandResult { exit_code: 0, output: commands::config::run() }
        }
        Command::Route(args) => commands::route::run(args),
        Command::PredefinedRoute(args) => commands::predefined_route::run(args),
        Command::Can(args) => commands::can::run(args),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
