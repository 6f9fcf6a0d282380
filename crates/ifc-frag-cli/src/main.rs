// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! `ifc-frag` - convert IFC models to fragments and inspect the result
//!
//! Usage:
//!   ifc-frag convert tower.ifc --exclude-reinforcement --out-dir out/
//!   ifc-frag inspect out/tower.frag --properties out/tower.json
//!
//! `IFC_FRAG_*` environment variables set the defaults, flags override them.
//! Log output follows `RUST_LOG` and defaults to `info`.

mod convert;
mod inspect;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ifc-frag")]
#[command(about = "Convert IFC models into compact fragment files", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load an IFC file and write <name>.frag and <name>.json
    Convert(convert::ConvertArgs),
    /// Print a summary of an exported fragment file
    Inspect(inspect::InspectArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => {
            let written = convert::run(&args).await?;
            for path in written {
                println!("{}", path.display());
            }
        }
        Commands::Inspect(args) => {
            let summary = inspect::run(&args)?;
            print!("{summary}");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn convert_flags_parse() {
        let cli = Cli::try_parse_from([
            "ifc-frag",
            "convert",
            "tower.ifc",
            "--exclude",
            "IfcFurnishingElement",
            "--exclude",
            "IFCSPACE",
            "--exclude-reinforcement",
            "--timeout",
            "30",
        ])
        .unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.exclude.len(), 2);
        assert!(args.exclude_reinforcement);
        assert_eq!(args.timeout, Some(30));
        assert!(!args.keep_coordinates);
    }
}
