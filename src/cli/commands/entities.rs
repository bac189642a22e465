//! Entity commands: `entities`, `path`, `components`, `free`, `new`, `new-component`

use console::style;
use miette::{miette, Result};

use crate::cli::helpers::{display_path, open_database};
use crate::cli::output::{print_value, Listing};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::database::Database;
use crate::core::entity::EntityHandle;
use crate::core::identity::Buid;

#[derive(clap::Args, Debug)]
pub struct EntitiesArgs {
    /// Only entities of this type (name or code, e.g. "web" or "WB")
    #[arg(long = "type", short = 't')]
    pub type_filter: Option<String>,
}

#[derive(clap::Args, Debug)]
pub struct PathArgs {
    /// Identifier, optionally with component (e.g. WB0251-D2)
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct ComponentsArgs {
    /// Identifier of the entity
    pub id: String,
}

#[derive(clap::Args, Debug)]
pub struct FreeArgs {
    /// Identifier to start searching from, or a type name/code
    pub start: String,

    /// Number of identifiers to return
    #[arg(long, short = 'n', default_value_t = 1)]
    pub count: usize,

    /// Length of the free run the identifiers must start (default: count)
    #[arg(long)]
    pub lookahead: Option<usize>,
}

#[derive(clap::Args, Debug)]
pub struct NewArgs {
    /// Full identifier, or a type name/code to allocate the next free number
    pub target: String,

    /// Free text appended to the folder name
    #[arg(long, short = 'c', default_value = "")]
    pub comment: String,
}

#[derive(clap::Args, Debug)]
pub struct NewComponentArgs {
    /// Identifier of the owning entity
    pub id: String,

    /// Component code (e.g. D2)
    pub component: String,

    /// Free text appended to the folder name
    #[arg(long, short = 'c', default_value = "")]
    pub comment: String,
}

fn entity<'a>(db: &'a Database, text: &str) -> Result<EntityHandle<'a>> {
    Ok(db.entity(text)?)
}

pub fn run_entities(args: EntitiesArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let index = db.index();

    let ids: Vec<&Buid> = match &args.type_filter {
        Some(t) => {
            let code = index
                .types()
                .code_for(t)
                .ok_or_else(|| miette!("Unknown entity type: {}", t))?;
            index.entities_of_type(code).collect()
        }
        None => index.entities().collect(),
    };

    let mut listing = Listing::new(&["ID", "Type", "Name", "Path"]);
    for buid in ids {
        let handle = EntityHandle::new(index, buid.clone());
        listing.push([
            buid.to_string(),
            index.types().name_for(buid.type_code()).unwrap_or("-").to_string(),
            handle.name().unwrap_or_default(),
            display_path(handle.entity_path()?, db.root()),
        ]);
    }

    listing.print(global.format, "entity")
}

pub fn run_path(args: PathArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let handle = entity(&db, &args.id)?;
    let path = handle.path()?;
    print_value(global.format, "path", &path.display().to_string())
}

pub fn run_components(args: ComponentsArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let handle = entity(&db, &args.id)?;

    let mut listing = Listing::new(&["ID", "Component", "Path"]);
    for (code, path) in handle.component_paths()? {
        listing.push([
            handle.buid().with_component(&code).to_string(),
            code,
            display_path(&path, db.root()),
        ]);
    }
    listing.print(global.format, "component")
}

/// Starting identifier from an identifier or a type name/code
fn start_id(db: &Database, text: &str) -> Result<Buid> {
    if let Ok(id) = Buid::parse(text) {
        return Ok(id.base());
    }
    let code = db
        .index()
        .types()
        .code_for(text)
        .ok_or_else(|| miette!("'{}' is neither an identifier nor a known type", text))?;
    Ok(Buid::new(code, 1, None))
}

pub fn run_free(args: FreeArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let start = start_id(&db, &args.start)?;
    let lookahead = args.lookahead.unwrap_or(args.count);

    let free = db
        .index()
        .free_identifiers(&start, args.count, lookahead)?;

    let mut listing = Listing::new(&["ID"]);
    for id in free {
        listing.push([id.to_string()]);
    }
    let format = match global.format {
        OutputFormat::Auto => OutputFormat::Id,
        other => other,
    };
    listing.print(format, "identifier")
}

pub fn run_new(args: NewArgs, global: &GlobalOpts) -> Result<()> {
    let mut db = open_database(global)?;
    let before = db.index().len();

    let path = db
        .index_mut()
        .create_entity_path(&args.target, &args.comment, false)?;

    report_folder(global, db.index().len() > before, &path, db.root())
}

pub fn run_new_component(args: NewComponentArgs, global: &GlobalOpts) -> Result<()> {
    let db = open_database(global)?;
    let handle = entity(&db, &args.id)?;
    let existed = handle.component_paths()?.keys().any(|c| c.eq_ignore_ascii_case(&args.component));

    let path = db
        .index()
        .create_component_path(handle.buid_with_component(), &args.component, &args.comment)?;

    report_folder(global, !existed, &path, db.root())
}

fn report_folder(global: &GlobalOpts, created: bool, path: &std::path::Path, root: &std::path::Path) -> Result<()> {
    if global.format != OutputFormat::Auto {
        return print_value(global.format, "path", &path.display().to_string());
    }
    if created {
        eprintln!(
            "{} Created {}",
            style("✓").green(),
            style(display_path(path, root)).cyan()
        );
    } else if !global.quiet {
        eprintln!(
            "{} Already exists: {}",
            style("!").yellow(),
            style(display_path(path, root)).cyan()
        );
    }
    println!("{}", path.display());
    Ok(())
}
