//! config-chain command-line tool.

use anyhow::{Context, Result, bail};
use clap::Parser;
use config_chain::cli::{Cli, Command};
use config_chain::logging::{self, LogTarget};
use config_chain::manifest::ManifestLoader;
use config_chain::{Namespace, Registry, display_value};
use serde_json::Value;
use tracing::debug;

fn load_namespace(cli: &Cli) -> Result<Namespace> {
    let loader = match cli.manifest {
        Some(ref path) => ManifestLoader::load_explicit(path)?,
        None => ManifestLoader::load()?,
    };
    for (tier, path) in loader.sources() {
        debug!(tier = %tier, path = %path.display(), "loaded manifest");
    }

    let mut builder = loader.manifest().to_builder()?;
    if let Some(ref dir) = cli.working_dir {
        builder = builder.working_dir(dir);
    }

    let registry = Registry::global();
    let name = builder.name().to_string();
    registry.construct(builder).into_configuration().with_context(|| {
        format!(
            "namespace '{}' is not a configuration namespace (name must end with '{}')",
            name,
            registry.suffix()
        )
    })
}

fn run(cli: &Cli) -> Result<()> {
    let mut ns = load_namespace(cli)?;

    match cli.command {
        Command::Get { ref name } => {
            let value = ns.get(name)?;
            println!("{}", display_value(&value));
        }
        Command::Set {
            ref name,
            ref value,
        } => {
            if ns.item(name).is_none() {
                bail!("{} is not a configuration item of {}", name, ns.name());
            }
            let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.clone()));
            ns.set(name, value)?;
        }
        Command::List => {
            for name in ns.item_names() {
                match ns.get(&name) {
                    Ok(value) => println!("{} = {}", name, display_value(&value)),
                    Err(e) => println!("{} ! {}", name, e),
                }
            }
        }
        Command::Backends => {
            for name in ns.item_names() {
                if let Err(e) = ns.bind(&name) {
                    println!("{} ! {}", name, e);
                    continue;
                }
                let Some(item) = ns.item(&name) else { continue };
                println!("{} ({:?})", name, item.precedence());
                for backend in item.backends() {
                    let mut flags = Vec::new();
                    if backend.is_writable() {
                        flags.push("writable");
                    }
                    if backend.is_volatile() {
                        flags.push("volatile");
                    }
                    println!("  {} [{}]", backend.describe(), flags.join(", "));
                }
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let target: LogTarget = cli.log.parse()?;
    logging::init(&target, cli.verbose)?;
    run(&cli)
}
