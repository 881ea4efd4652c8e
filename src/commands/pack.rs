//! Pack command

use std::path::PathBuf;

use crate::cli::PackArgs;
use crate::error::Result;
use crate::packager;
use crate::ui;

/// Run the pack command
pub fn run(project_root: Option<PathBuf>, args: PackArgs) -> Result<()> {
    let mut options = super::load_options(&args.root, project_root.as_deref())?;
    super::apply_walk_args(&mut options, args.walk);

    if args.output.is_some() {
        options.output = args.output;
    }
    if !args.formats.is_empty() {
        options.formats = args.formats;
    }
    if let Some(naming) = args.naming {
        options.naming = naming;
    }
    if args.strip_prefix.is_some() {
        options.strip_prefix = args.strip_prefix;
    }
    if args.default_template.is_some() {
        options.default_template = args.default_template;
    }
    if args.unresolved_template.is_some() {
        options.unresolved_template = args.unresolved_template;
    }

    let metadata = &mut options.metadata;
    for (flag, slot) in [
        (args.name, &mut metadata.name),
        (args.package_version, &mut metadata.version),
        (args.description, &mut metadata.description),
        (args.license, &mut metadata.license),
        (args.author, &mut metadata.author),
    ] {
        if flag.is_some() {
            *slot = flag;
        }
    }

    options.force = args.force;
    options.dry_run = args.dry_run;

    let result = packager::pack(&args.root, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        ui::display_pack_result(&mut std::io::stdout().lock(), &result)?;
    }

    Ok(())
}
