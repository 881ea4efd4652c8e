//! Graph command

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::cli::GraphArgs;
use crate::error::Result;
use crate::packager;
use crate::ui;
use crate::walker::WalkResult;

#[derive(Serialize)]
struct GraphReport<'a> {
    root: &'a str,
    project_root: &'a Path,
    #[serde(flatten)]
    walk: &'a WalkResult,
}

/// Run the graph command
pub fn run(project_root: Option<PathBuf>, args: GraphArgs) -> Result<()> {
    let mut options = super::load_options(&args.root, project_root.as_deref())?;
    super::apply_walk_args(&mut options, args.walk);

    let exclude = packager::bundle_excludes(&args.root, &options)?;
    let analysis = packager::analyze(&args.root, &options, &exclude)?;

    if args.json {
        let report = GraphReport {
            root: &analysis.root_id,
            project_root: &analysis.project_root,
            walk: &analysis.walk,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        ui::display_graph(&mut std::io::stdout().lock(), &analysis)?;
    }

    Ok(())
}
