//! Command implementations for the docpack CLI

pub mod completions;
pub mod graph;
pub mod pack;
pub mod version;

use std::path::Path;

use tracing::debug;

use crate::cli::WalkArgs;
use crate::config::DocpackConfig;
use crate::error::Result;
use crate::packager::{self, PackOptions};

/// Options from docpack.yaml in the project root of `root`
///
/// A relative `output` in the file is taken relative to the project root.
fn load_options(root: &Path, project_root: Option<&Path>) -> Result<PackOptions> {
    let root = packager::canonical_root(root)?;
    let project_root = packager::resolve_project_root(&root, project_root)?;

    let mut options = match DocpackConfig::discover(&project_root)? {
        Some(config) => PackOptions::from_config(&config)?,
        None => PackOptions::default(),
    };
    if let Some(output) = &options.output {
        if output.is_relative() {
            options.output = Some(project_root.join(output));
        }
    }
    debug!(project_root = %project_root.display(), "using project root");
    options.project_root = Some(project_root);
    Ok(options)
}

/// Layer walk flags over configured values; rules given on the command line
/// are checked before configured ones
fn apply_walk_args(options: &mut PackOptions, walk: WalkArgs) {
    if let Some(depth) = walk.depth {
        options.max_depth = depth.max_depth();
    }
    if walk.exclude_navigation {
        options.exclude_navigation_files = true;
    }
    if !walk.exclude_rules.is_empty() {
        let configured = std::mem::take(&mut options.exclude_rules);
        options.exclude_rules = walk.exclude_rules;
        options.exclude_rules.extend(configured);
    }
    if walk.identity_field.is_some() {
        options.identity_field = walk.identity_field;
    }
}
