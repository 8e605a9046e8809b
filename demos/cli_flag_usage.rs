//! Example demonstrating command line flags parsed by clap as a source.
//!
//! Only flags actually given on the command line override the defaults;
//! `--mymodule-loglevel` addresses the `loglevel` key of `[mymodule]`.
//!
//! Try: `cargo run --example cli_flag_usage --features cli -- --processes 8 --verbose`

use clap::{Arg, ArgAction, Command};
use stratacfg::{CommandlineSource, Defaults, LayeredConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let app = Command::new("cli-example")
        .about("Example CLI application with layered configuration")
        .arg(
            Arg::new("datadir")
                .long("datadir")
                .value_name("DIR")
                .help("Data directory")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("processes")
                .long("processes")
                .value_name("N")
                .help("Number of worker processes")
                .action(ArgAction::Set),
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("jsfiles")
                .long("jsfiles")
                .value_name("FILE")
                .help("Script files (can be repeated)")
                .action(ArgAction::Append),
        )
        .arg(
            Arg::new("mymodule-loglevel")
                .long("mymodule-loglevel")
                .value_name("LEVEL")
                .help("Log level of mymodule")
                .action(ArgAction::Set),
        );

    let matches = app.try_get_matches()?;

    let defaults = Defaults::new()
        .value("datadir", "mydata")
        .value("processes", 1i64)
        .value("verbose", false)
        .value("jsfiles", vec!["default.js"])
        .section("mymodule", Defaults::new().value("loglevel", "INFO"));

    let config = LayeredConfig::builder()
        .source(defaults)
        .source(CommandlineSource::from_matches(&matches))
        .build();

    println!("=== Effective configuration ===");
    println!("datadir:   {:?}", config.get_string("datadir")?);
    println!("processes: {:?}", config.get_int("processes")?);
    println!("verbose:   {:?}", config.get_bool("verbose")?);
    println!("jsfiles:   {:?}", config.get_list("jsfiles")?);

    let module = config.section("mymodule")?;
    println!("mymodule.loglevel: {:?}", module.get_string("loglevel")?);

    Ok(())
}
