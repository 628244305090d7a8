//TODO: update clap to remove the need for this
#![allow(dangerous_implicit_autorefs)]

use std::io;
use std::process;

use anyhow::{anyhow, Context};
use clap::{
    crate_description, crate_name, crate_version, App, AppSettings, Arg, ArgMatches, SubCommand,
};
use phar::phar_core::AutoloadRule;
use phar::BuildConfig;
use tracing_subscriber::EnvFilter;

fn required<'a>(matches: &'a ArgMatches, name: &str) -> anyhow::Result<&'a str> {
    matches
        .value_of(name)
        .ok_or_else(|| anyhow!("missing argument {}", name))
}

/// Load `--config` if given, then let command-line flags override it
fn build_config(matches: &ArgMatches) -> anyhow::Result<BuildConfig> {
    let mut config = match matches.value_of("config") {
        Some(path) => BuildConfig::open(path.as_ref())?,
        None => BuildConfig::default(),
    };

    for (key, field) in [
        ("alias", &mut config.alias),
        ("compression", &mut config.compression),
        ("signature", &mut config.signature),
        ("prefix", &mut config.prefix),
    ] {
        if let Some(value) = matches.value_of(key) {
            *field = Some(value.to_string());
        }
    }
    if let Some(stub) = matches.value_of("stub") {
        config.stub = Some(stub.into());
    }
    if let Some(values) = matches.values_of("metadata") {
        for pair in values {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("metadata '{}' is not KEY=VALUE", pair))?;
            config.metadata.insert(key.to_string(), value.to_string());
        }
    }
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let arg_archive = Arg::with_name("archive")
        .help("Archive file")
        .short("a")
        .long("archive")
        .required(true)
        .takes_value(true)
        .value_name("FILE");

    let arg_basedir = Arg::with_name("basedir")
        .help("Source or target directory (defaults to '.')")
        .required(true)
        .value_name("DIR")
        .default_value(".");

    let matches = App::new(crate_name!())
        .about(crate_description!())
        .version(crate_version!())
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("create")
                .about("Create archive from a directory")
                .arg(&arg_archive)
                .arg(&arg_basedir)
                .arg(
                    Arg::with_name("config")
                        .help("Build config (toml)")
                        .short("c")
                        .long("config")
                        .takes_value(true)
                        .value_name("FILE"),
                )
                .arg(
                    Arg::with_name("compression")
                        .help("Payload compression")
                        .short("z")
                        .long("compression")
                        .takes_value(true)
                        .possible_values(&["none", "gz", "bz2"]),
                )
                .arg(
                    Arg::with_name("signature")
                        .help("Signature digest")
                        .long("signature")
                        .takes_value(true)
                        .possible_values(&["none", "md5", "sha1", "sha256", "sha512"]),
                )
                .arg(
                    Arg::with_name("stub")
                        .help("Stub file; a trailing __HALT_COMPILER(); is removed")
                        .short("s")
                        .long("stub")
                        .takes_value(true)
                        .value_name("FILE"),
                )
                .arg(
                    Arg::with_name("alias")
                        .help("Archive alias")
                        .long("alias")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("prefix")
                        .help("Store entries below this directory")
                        .long("prefix")
                        .takes_value(true)
                        .value_name("DIR"),
                )
                .arg(
                    Arg::with_name("metadata")
                        .help("Archive metadata")
                        .short("m")
                        .long("metadata")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .value_name("KEY=VALUE"),
                ),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract archive")
                .arg(&arg_archive)
                .arg(&arg_basedir),
        )
        .subcommand(
            SubCommand::with_name("list")
                .about("List archive")
                .arg(&arg_archive),
        )
        .subcommand(
            SubCommand::with_name("info")
                .about("Show archive settings and metadata")
                .arg(&arg_archive),
        )
        .subcommand(
            SubCommand::with_name("dump")
                .about("Print the manifest as toml")
                .arg(&arg_archive),
        )
        .subcommand(
            SubCommand::with_name("autoload")
                .about("Print the source of a class from the archive")
                .arg(&arg_archive)
                .arg(
                    Arg::with_name("prefix")
                        .help("Namespace prefix served by the archive")
                        .long("prefix")
                        .required(true)
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("class")
                        .help("Fully qualified class name")
                        .required(true)
                        .value_name("CLASS"),
                ),
        )
        .get_matches();

    if let Some(matches) = matches.subcommand_matches("create") {
        phar::create(
            &build_config(matches)?,
            required(matches, "archive")?,
            required(matches, "basedir")?,
        )?;
    } else if let Some(matches) = matches.subcommand_matches("extract") {
        phar::extract(required(matches, "archive")?, required(matches, "basedir")?)?;
    } else if let Some(matches) = matches.subcommand_matches("list") {
        phar::list(required(matches, "archive")?)?;
    } else if let Some(matches) = matches.subcommand_matches("info") {
        phar::info(required(matches, "archive")?)?;
    } else if let Some(matches) = matches.subcommand_matches("dump") {
        phar::dump(required(matches, "archive")?)?;
    } else if let Some(matches) = matches.subcommand_matches("autoload") {
        let rule = AutoloadRule::new(required(matches, "prefix")?);
        let loader = match phar::map_phar(required(matches, "archive")?, rule) {
            Ok(loader) => loader,
            Err(err) => {
                eprintln!("{}", err);
                eprintln!("Cannot initialize Phar");
                process::exit(1);
            }
        };
        phar::autoload(&loader, required(matches, "class")?, io::stdout().lock())?;
    }
    Ok(())
}
