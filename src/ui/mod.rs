//! Human-readable output for pack and graph results

use std::io::{self, Write};
use std::path::Path;

use console::Style;

use crate::packager::{Analysis, PackResult};
use crate::path_utils::glob_candidate;
use crate::walker::BundledEntity;

/// Summary of a packaging run
pub fn display_pack_result(out: &mut impl Write, result: &PackResult) -> io::Result<()> {
    let bold = Style::new().bold();

    let verb = if result.dry_run { "Would pack" } else { "Packed" };
    writeln!(
        out,
        "{} {} {} -> {}",
        Style::new().green().bold().apply_to(verb),
        Style::new().yellow().bold().apply_to(&result.metadata.name),
        result.metadata.version,
        result.output.display()
    )?;
    if let Some(description) = &result.metadata.description {
        writeln!(out, "  {description}")?;
    }

    writeln!(
        out,
        "{} ({})",
        bold.apply_to("Bundled dependencies"),
        result.bundled.len()
    )?;
    if result.bundled.is_empty() {
        writeln!(out, "  {}", Style::new().dim().apply_to("None"))?;
    }
    for path in &result.bundled {
        writeln!(out, "  {}", Style::new().cyan().apply_to(path))?;
    }

    if !result.excluded.is_empty() {
        writeln!(
            out,
            "{} ({})",
            bold.apply_to("Excluded references"),
            result.excluded.len()
        )?;
        for entry in &result.excluded {
            writeln!(
                out,
                "  {} {}",
                entry.path,
                Style::new().dim().apply_to(format!("({})", entry.reason))
            )?;
        }
    }

    writeln!(out, "{} {}", bold.apply_to("Max depth:"), result.max_depth)?;
    if let Some(checksum) = &result.checksum {
        writeln!(
            out,
            "{} {}",
            bold.apply_to("Checksum:"),
            Style::new().dim().apply_to(checksum)
        )?;
    }

    if !result.artifacts.is_empty() {
        writeln!(out, "{}", bold.apply_to("Artifacts"))?;
        for artifact in &result.artifacts {
            writeln!(
                out,
                "  {:<12} {}",
                artifact.format.as_str(),
                artifact.path.display()
            )?;
        }
    }

    Ok(())
}

/// Dependency listing of a walk
pub fn display_graph(out: &mut impl Write, analysis: &Analysis) -> io::Result<()> {
    let bold = Style::new().bold();
    let relative = |path: &Path| glob_candidate(path, Some(&analysis.project_root));

    writeln!(
        out,
        "{} {}",
        Style::new().yellow().bold().apply_to(&analysis.root_id),
        Style::new().dim().apply_to(format!("({})", relative(&analysis.root)))
    )?;

    let line = |out: &mut dyn Write, entity: &BundledEntity, kind: &str| {
        writeln!(
            out,
            "  {} {} {}",
            Style::new().dim().apply_to(format!("[{}]", entity.depth)),
            Style::new().cyan().apply_to(&entity.id),
            Style::new().dim().apply_to(format!("{kind}{}", relative(&entity.path)))
        )
    };
    for entity in &analysis.walk.entities {
        line(&mut *out, entity, "")?;
    }
    for asset in &analysis.walk.assets {
        line(&mut *out, asset, "asset ")?;
    }

    if !analysis.walk.excluded.is_empty() {
        writeln!(out, "{}", bold.apply_to("Excluded"))?;
        for excluded in &analysis.walk.excluded {
            writeln!(
                out,
                "  {} {} {}",
                Style::new().red().apply_to(&excluded.id),
                excluded.reason,
                Style::new().dim().apply_to(format!("(from {})", excluded.from))
            )?;
        }
    }

    writeln!(
        out,
        "{} {}",
        bold.apply_to("Max depth:"),
        analysis.walk.max_depth
    )
}
