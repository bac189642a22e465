//! `bdb props` command - query property files

use miette::{IntoDiagnostic, Result};
use serde_json::json;

use crate::cli::helpers::{open_database, truncate_str};
use crate::cli::output::Listing;
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::properties::PropertyStore;

#[derive(clap::Args, Debug)]
pub struct PropsArgs {
    /// Identifier of the entity (or component)
    pub id: String,

    /// Property name; omit to list all property files
    pub name: Option<String>,

    /// Property file to prefer when several define the name (repeatable)
    #[arg(long = "prefer", short = 'p')]
    pub prefer: Vec<String>,
}

pub fn run(args: PropsArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let handle = db.entity(&args.id)?;
    let store = PropertyStore::new();

    let Some(name) = args.name else {
        let mut listing = Listing::new(&["File", "Source", "BUID", "Properties"]);
        for (file, props) in store.properties(&handle)? {
            let keys: Vec<&str> = props.values.keys().map(String::as_str).collect();
            listing.push([
                file,
                props.source,
                props.buid,
                truncate_str(&keys.join(", "), 60),
            ]);
        }
        return listing.print(global.format, "property file");
    };

    let hit = store.query(&handle, &name, &args.prefer)?;

    match global.format {
        OutputFormat::Json => {
            let record = json!({
                "value": hit.value,
                "file": hit.file,
                "source": hit.source,
            });
            println!("{}", serde_json::to_string_pretty(&record).into_diagnostic()?);
        }
        OutputFormat::Yaml => {
            let record = json!({
                "value": hit.value,
                "file": hit.file,
                "source": hit.source,
            });
            print!("{}", serde_yml::to_string(&record).into_diagnostic()?);
        }
        _ => match hit.value {
            serde_json::Value::String(s) => println!("{}", s),
            other => println!("{}", other),
        },
    }
    Ok(())
}
