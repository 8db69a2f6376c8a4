use anyhow::Context;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use dbnav_cli::{browse, build_command, logging, parse_command, DbnavConfig, Fixture};
use dbnav_connstr::{Dialect, FieldOverrides};
use std::path::PathBuf;

fn dialect_arg() -> Arg {
    Arg::new("dialect")
        .long("dialect")
        .short('d')
        .value_parser(value_parser!(Dialect))
        .help("Connection-string dialect (nosql, mongodb, postgres); inferred when omitted")
}

fn cli() -> Command {
    Command::new("dbnav")
        .version(dbnav_cli::VERSION)
        .about("Database navigator tools: connection strings and resource trees")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log at debug level (DBNAV_LOG overrides)"),
        )
        .subcommand(
            Command::new("parse")
                .about("Parse a connection string and print its fields as JSON")
                .arg(Arg::new("connection-string").required(true))
                .arg(dialect_arg())
                .arg(
                    Arg::new("show-secrets")
                        .long("show-secrets")
                        .action(ArgAction::SetTrue)
                        .help("Print the secret instead of masking it"),
                ),
        )
        .subcommand(
            Command::new("build")
                .about("Rewrite a connection string with replaced fields")
                .arg(Arg::new("connection-string").required(true))
                .arg(dialect_arg())
                .arg(Arg::new("user").long("user").help("Replace the user name"))
                .arg(
                    Arg::new("password")
                        .long("password")
                        .conflicts_with("no-password")
                        .help("Replace the password or account key"),
                )
                .arg(
                    Arg::new("no-password")
                        .long("no-password")
                        .action(ArgAction::SetTrue)
                        .help("Remove the password or account key"),
                )
                .arg(
                    Arg::new("database")
                        .long("database")
                        .conflicts_with("no-database")
                        .help("Replace the database"),
                )
                .arg(
                    Arg::new("no-database")
                        .long("no-database")
                        .action(ArgAction::SetTrue)
                        .help("Remove the database"),
                ),
        )
        .subcommand(
            Command::new("browse")
                .about("Render the account tree described by a JSON fixture")
                .arg(
                    Arg::new("fixture")
                        .long("fixture")
                        .required(true)
                        .value_parser(value_parser!(PathBuf))
                        .help("Fixture file with accounts, details and databases"),
                )
                .arg(
                    Arg::new("config")
                        .long("config")
                        .value_parser(value_parser!(PathBuf))
                        .help("TOML configuration file"),
                ),
        )
}

fn overrides(args: &ArgMatches) -> FieldOverrides {
    let mut overrides = FieldOverrides::new();
    if let Some(user) = args.get_one::<String>("user") {
        overrides = overrides.principal(user.clone());
    }
    if let Some(password) = args.get_one::<String>("password") {
        overrides = overrides.secret(password.clone());
    } else if args.get_flag("no-password") {
        overrides = overrides.clear_secret();
    }
    if let Some(database) = args.get_one::<String>("database") {
        overrides = overrides.database(database.clone());
    } else if args.get_flag("no-database") {
        overrides = overrides.clear_database();
    }
    overrides
}

fn connection_string(args: &ArgMatches) -> anyhow::Result<&str> {
    args.get_one::<String>("connection-string")
        .map(String::as_str)
        .context("missing connection string")
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    logging::init(matches.get_flag("verbose"));

    let output = match matches.subcommand() {
        Some(("parse", args)) => parse_command(
            connection_string(args)?,
            args.get_one::<Dialect>("dialect").copied(),
            args.get_flag("show-secrets"),
        )?,
        Some(("build", args)) => build_command(
            connection_string(args)?,
            args.get_one::<Dialect>("dialect").copied(),
            &overrides(args),
        )?,
        Some(("browse", args)) => {
            let fixture_path = args
                .get_one::<PathBuf>("fixture")
                .context("missing fixture path")?;
            let config = DbnavConfig::load_or_default(
                args.get_one::<PathBuf>("config").map(PathBuf::as_path),
            )?;
            let fixture = Fixture::load(fixture_path)?;
            browse(&fixture, &config).await?
        }
        _ => anyhow::bail!("no subcommand given"),
    };

    println!("{}", output.trim_end());
    Ok(())
}
