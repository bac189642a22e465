//! `bdb parse` command - extract identifiers from text

use console::style;
use miette::{miette, Result};

use crate::cli::output::Listing;
use crate::cli::GlobalOpts;
use crate::core::config::DbConfig;
use crate::core::database::Database;
use crate::core::parser::{BuidParser, ParseMode, ParserOptions, UnknownTypes};

#[derive(clap::Args, Debug)]
pub struct ParseArgs {
    /// Text to scan (file names, notes, paths...)
    pub text: String,

    /// Reduction mode: all, all_unique, first, last, unique
    #[arg(long, short = 'm', default_value = "unique")]
    pub mode: ParseMode,

    /// Unknown type codes: ignore, warn, accept
    #[arg(long, short = 'u', default_value = "warn")]
    pub unknown: UnknownTypes,

    /// Drop component suffixes
    #[arg(long)]
    pub no_components: bool,

    /// Extract component codes instead of identifiers
    #[arg(long, conflicts_with = "types")]
    pub component: bool,

    /// Extract type codes instead of identifiers
    #[arg(long)]
    pub types: bool,
}

pub fn run(args: ParseArgs, global: &GlobalOpts) -> Result<()> {
    // Outside a database the default type table applies
    let config = match Database::locate_root(global.root.as_deref()) {
        Ok(root) => DbConfig::load(&root)?,
        Err(_) => DbConfig::default(),
    };

    let options = ParserOptions::default()
        .mode(args.mode)
        .unknown(args.unknown)
        .allow_components(!args.no_components);
    let parser = BuidParser::new(config.buid_types, options);

    let (values, diagnostics) = if args.component {
        let outcome = parser.parse_component(&args.text);
        (outcome.clone().into_vec(), outcome.diagnostics)
    } else if args.types {
        let outcome = parser.parse_type(&args.text);
        (outcome.clone().into_vec(), outcome.diagnostics)
    } else {
        let outcome = parser.parse(&args.text);
        let values = outcome.clone().into_vec().iter().map(|b| b.to_string()).collect();
        (values, outcome.diagnostics)
    };

    if !global.quiet {
        for diagnostic in &diagnostics {
            eprintln!("{} {}", style("!").yellow(), diagnostic);
        }
    }

    if values.is_empty() {
        return Err(miette!("No identifier found in '{}'", args.text));
    }

    let mut listing = Listing::new(&["Value"]);
    for value in values {
        listing.push([value]);
    }
    listing.print(global.format, "match")
}
