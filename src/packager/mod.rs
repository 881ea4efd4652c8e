//! Bundle packaging
//!
//! Orchestrates one packaging run for a root document:
//!
//! 1. Load the project into a [`Registry`] and resolve links
//! 2. Walk the dependency graph from the root
//! 3. Assign destinations with a [`PathMap`] (collisions fail here)
//! 4. Build the destination registry view
//! 5. Rewrite every bundled document in one merged edit plan and copy
//!    assets byte-for-byte
//! 6. Produce the requested artifacts (zip, package.json, marketplace.json)
//!
//! All fatal conditions are detected before the first write.

pub mod archive;
pub mod manifest;
pub mod naming;

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::DocpackConfig;
use crate::error::{DocpackError, Result, read_failed, write_failed};
use crate::hash;
use crate::path_utils::{common_ancestor, glob_candidate, is_within, relative_path, to_kebab_case};
use crate::registry::{IdentityOptions, LinkResolution, Registry, crawl};
use crate::resource::{Entity, Link, frontmatter, parse_file};
use crate::rewrite::{self, Edit, LinkContext, RenderContext, TransformOptions, template};
use crate::walker::{self, ExcludeRule, ExcludedReference, ExclusionReason, WalkOptions, WalkResult};

pub use naming::{Naming, NamingStrategy, PathMap};

/// Destination of a surviving link; text and titles of inline links stay
pub const REDIRECT_TEMPLATE: &str = "{{ path }}{{ fragment }}";

pub const DEFAULT_VERSION: &str = "0.1.0";

/// Artifact kinds a packaging run can produce
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum PackageFormat {
    /// Plain output directory
    Dir,
    /// `<out>.zip` next to the output directory
    Zip,
    /// `package.json` in the output directory
    Npm,
    /// `.claude-plugin/marketplace.json` in the output directory
    Marketplace,
}

impl PackageFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            PackageFormat::Dir => "dir",
            PackageFormat::Zip => "zip",
            PackageFormat::Npm => "npm",
            PackageFormat::Marketplace => "marketplace",
        }
    }
}

/// Resolved package metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PackageMetadata {
    pub name: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
}

/// Metadata given explicitly (command line, then docpack.yaml)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    pub name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub author: Option<String>,
}

/// Options for one packaging run
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Output directory; defaults to `<project root>/dist/<name>`
    pub output: Option<PathBuf>,

    /// Boundary of the bundle; defaults to the current directory when it
    /// contains the root, otherwise the root's directory
    pub project_root: Option<PathBuf>,

    pub formats: Vec<PackageFormat>,

    /// Link-follow depth; `None` is unbounded
    pub max_depth: Option<usize>,

    pub exclude_navigation_files: bool,

    pub naming: NamingStrategy,

    pub strip_prefix: Option<String>,

    pub exclude_rules: Vec<ExcludeRule>,

    /// Template for excluded links whose rule has none
    pub default_template: Option<String>,

    /// Template for links whose target is outside the registry
    pub unresolved_template: Option<String>,

    pub include: Vec<String>,

    pub exclude: Vec<String>,

    pub identity_field: Option<String>,

    pub metadata: MetadataOverrides,

    /// Write into a non-empty output directory
    pub force: bool,

    /// Plan everything, write nothing
    pub dry_run: bool,
}

impl PackOptions {
    /// Options seeded from a configuration file
    pub fn from_config(config: &DocpackConfig) -> Result<Self> {
        Ok(Self {
            output: config.output.as_ref().map(PathBuf::from),
            formats: config.package_formats()?,
            max_depth: config.max_depth,
            exclude_navigation_files: config.exclude_navigation.unwrap_or(false),
            naming: config.naming.unwrap_or_default(),
            strip_prefix: config.strip_prefix.clone(),
            exclude_rules: config.rules.clone(),
            default_template: config.default_template.clone(),
            unresolved_template: config.unresolved_template.clone(),
            include: config.include.clone(),
            exclude: config.exclude.clone(),
            identity_field: config.identity_field.clone(),
            metadata: MetadataOverrides {
                name: config.name.clone(),
                version: config.version.clone(),
                description: config.description.clone(),
                license: config.license.clone(),
                author: config.author.clone(),
            },
            ..Self::default()
        })
    }

    /// Reject malformed rules and templates before touching the file system
    pub fn validate(&self) -> Result<()> {
        for rule in &self.exclude_rules {
            for pattern in &rule.patterns {
                crate::path_utils::validate_glob(pattern)?;
            }
            if let Some(t) = &rule.template {
                template::validate(t)?;
            }
        }
        for t in [&self.default_template, &self.unresolved_template]
            .into_iter()
            .flatten()
        {
            template::validate(t)?;
        }
        Ok(())
    }
}

/// Registry, resolution and walk for one root document
#[derive(Debug)]
pub struct Analysis {
    /// Canonical root document path
    pub root: PathBuf,
    pub root_id: String,
    pub project_root: PathBuf,
    pub registry: Registry,
    pub resolution: LinkResolution,
    pub walk: WalkResult,
}

/// Excluded reference as reported to the caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExcludedEntry {
    pub path: String,
    pub reason: ExclusionReason,
    pub from: String,
}

/// One produced artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub format: PackageFormat,
    pub path: PathBuf,
}

/// Summary of a packaging run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackResult {
    pub root: PathBuf,
    pub output: PathBuf,
    pub metadata: PackageMetadata,
    /// Bundled dependencies relative to their common ancestor
    pub bundled: Vec<String>,
    /// Excluded references relative to their common ancestor
    pub excluded: Vec<ExcludedEntry>,
    pub artifacts: Vec<Artifact>,
    pub max_depth: usize,
    /// BLAKE3 digest of the written output directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    pub dry_run: bool,
}

/// Resolve package metadata: explicit values, then root frontmatter, then
/// defaults (root stem, version 0.1.0)
///
/// The name is always kebab-cased since it names the npm package, the
/// marketplace plugin and the default `dist/<name>` directory.
pub fn resolve_metadata(
    overrides: &MetadataOverrides,
    root_metadata: &BTreeMap<String, serde_json::Value>,
    root: &Path,
) -> PackageMetadata {
    let pick = |explicit: &Option<String>, key: &str| {
        explicit
            .clone()
            .or_else(|| frontmatter::get_str(root_metadata, key))
            .filter(|v| !v.trim().is_empty())
    };

    let stem = root
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    PackageMetadata {
        name: to_kebab_case(&pick(&overrides.name, "name").unwrap_or(stem)),
        version: pick(&overrides.version, "version").unwrap_or_else(|| DEFAULT_VERSION.to_string()),
        description: pick(&overrides.description, "description"),
        license: pick(&overrides.license, "license"),
        author: pick(&overrides.author, "author"),
    }
}

/// Project root for a canonical root document
///
/// An explicit directory wins; otherwise the current directory when it
/// contains the root, else the root's directory.
pub fn resolve_project_root(root: &Path, explicit: Option<&Path>) -> Result<PathBuf> {
    let project_root = match explicit {
        Some(dir) => dunce::canonicalize(dir).map_err(|_| DocpackError::FileNotFound {
            path: dir.display().to_string(),
        })?,
        None => {
            let cwd = std::env::current_dir()?;
            let cwd = dunce::canonicalize(&cwd).unwrap_or(cwd);
            if root.starts_with(&cwd) {
                cwd
            } else {
                root.parent().map(Path::to_path_buf).unwrap_or(cwd)
            }
        }
    };

    if !is_within(root, &project_root) {
        return Err(DocpackError::RootOutsideProject {
            path: root.display().to_string(),
        });
    }
    Ok(project_root)
}

/// Canonical path of an existing root document
pub fn canonical_root(root: &Path) -> Result<PathBuf> {
    if !root.is_file() {
        return Err(DocpackError::FileNotFound {
            path: root.display().to_string(),
        });
    }
    dunce::canonicalize(root).map_err(|e| read_failed(root, &e))
}

/// Absolute form of a possibly relative path
fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Output directory of a run: the configured one, else `dist/<name>`
fn output_dir(project_root: &Path, metadata: &PackageMetadata, options: &PackOptions) -> Result<PathBuf> {
    let output = match &options.output {
        Some(out) => absolute(out)?,
        None => project_root.join("dist").join(&metadata.name),
    };
    Ok(crate::path_utils::normalize_lexically(&output))
}

/// Crawl excludes covering `output` when it lies inside the project
fn output_excludes(output: &Path, project_root: &Path) -> Vec<String> {
    if !is_within(output, project_root) || output == project_root {
        return Vec::new();
    }
    let rel = glob_candidate(output, Some(project_root));
    vec![format!("{rel}/**"), rel]
}

/// Crawl excludes for the directory `pack` writes for `root`, so a
/// previous bundle never feeds back into the analysis
pub fn bundle_excludes(root: &Path, options: &PackOptions) -> Result<Vec<String>> {
    let root_path = canonical_root(root)?;
    let root_meta = parse_file(&root_path)?.metadata;
    let metadata = resolve_metadata(&options.metadata, &root_meta, &root_path);
    let project_root = resolve_project_root(&root_path, options.project_root.as_deref())?;
    let output = output_dir(&project_root, &metadata, options)?;
    Ok(output_excludes(&output, &project_root))
}

/// Load the project, resolve links and walk from `root`
///
/// `extra_exclude` is added to the crawl excludes (used to keep a previous
/// output directory out of the registry).
pub fn analyze(root: &Path, options: &PackOptions, extra_exclude: &[String]) -> Result<Analysis> {
    options.validate()?;
    let root = canonical_root(root)?;
    let project_root = resolve_project_root(&root, options.project_root.as_deref())?;

    let mut identity = IdentityOptions::default().with_base_dir(&project_root);
    if let Some(field) = &options.identity_field {
        identity = identity.with_field(field);
    }
    let mut registry = Registry::with_options(identity);

    let include = crawl::include_or_default(&options.include);
    let mut exclude = options.exclude.clone();
    exclude.extend(extra_exclude.iter().cloned());
    let exclude = crawl::exclude_with_defaults(&exclude);
    registry.crawl(&project_root, &include, &exclude)?;

    if registry.get(&root).is_none() {
        registry.add(&root)?;
    }
    sweep_link_targets(&mut registry);

    let resolution = registry.resolve_links();
    let root_id = registry
        .get(&root)
        .map(|e| e.id.clone())
        .ok_or_else(|| DocpackError::FileNotFound {
            path: root.display().to_string(),
        })?;

    let walk_options = WalkOptions {
        max_depth: options.max_depth,
        exclude_rules: options.exclude_rules.clone(),
        project_root: project_root.clone(),
        exclude_navigation_files: options.exclude_navigation_files,
    };
    let walk = walker::walk(&root_id, &registry, &resolution, &walk_options);
    info!(
        root = %root_id,
        documents = walk.entities.len(),
        assets = walk.assets.len(),
        excluded = walk.excluded.len(),
        "walked dependency graph"
    );

    Ok(Analysis {
        root,
        root_id,
        project_root,
        registry,
        resolution,
        walk,
    })
}

/// Register existing link targets the crawl did not pick up
///
/// Only one level is added; links of swept files are not followed.
fn sweep_link_targets(registry: &mut Registry) {
    let mut missing: Vec<PathBuf> = registry
        .entities()
        .flat_map(|e| e.local_links().filter_map(|(_, link)| link.target.clone()))
        .filter(|target| registry.get(target).is_none() && target.is_file())
        .collect();
    missing.sort();
    missing.dedup();

    for target in missing {
        if let Err(e) = registry.add(&target) {
            warn!(path = %target.display(), error = %e, "could not register link target");
        } else {
            debug!(path = %target.display(), "registered link target outside the crawl");
        }
    }
}

/// Package `root` and everything it links to
pub fn pack(root: &Path, options: &PackOptions) -> Result<PackResult> {
    let root_path = canonical_root(root)?;
    let root_meta = parse_file(&root_path)?.metadata;
    let metadata = resolve_metadata(&options.metadata, &root_meta, &root_path);
    let project_root = resolve_project_root(&root_path, options.project_root.as_deref())?;

    let output = output_dir(&project_root, &metadata, options)?;

    let analysis = analyze(&root_path, options, &output_excludes(&output, &project_root))?;
    let naming = Naming::new(options.naming, &analysis.project_root, &output)
        .with_strip_prefix(options.strip_prefix.clone());
    let sources = analysis
        .walk
        .entities
        .iter()
        .chain(&analysis.walk.assets)
        .map(|e| e.path.as_path());
    let path_map = PathMap::build(&analysis.root, sources, &naming)?;
    let destination = analysis
        .registry
        .relocated(|path| path_map.get(path).map(Path::to_path_buf));

    let mut result = PackResult {
        root: analysis.root.clone(),
        output: output.clone(),
        metadata,
        bundled: bundled_paths(&analysis.walk),
        excluded: excluded_entries(&analysis.walk.excluded),
        artifacts: Vec::new(),
        max_depth: analysis.walk.max_depth,
        checksum: None,
        dry_run: options.dry_run,
    };

    if options.dry_run {
        debug!(output = %output.display(), "dry run, nothing written");
        return Ok(result);
    }

    // Render every document before the first write so template errors
    // leave the output untouched.
    let mut rendered: Vec<(PathBuf, Option<String>)> = Vec::with_capacity(path_map.len());
    for (source, dest) in path_map.iter() {
        let entity = analysis
            .registry
            .get(source)
            .ok_or_else(|| DocpackError::FileNotFound {
                path: source.display().to_string(),
            })?;
        let content = match entity.body.as_deref() {
            Some(body) => Some(rewrite_document(
                entity,
                body,
                dest,
                &analysis,
                &destination,
                &path_map,
                options,
            )?),
            None => None,
        };
        rendered.push((dest.to_path_buf(), content));
    }

    ensure_output_writable(&output, options.force)?;
    for ((source, _), (dest, content)) in path_map.iter().zip(&rendered) {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| write_failed(parent, &e))?;
        }
        match content {
            Some(text) => fs::write(dest, text).map_err(|e| write_failed(dest, &e))?,
            None => {
                fs::copy(source, dest).map_err(|e| write_failed(dest, &e))?;
            }
        }
    }
    info!(
        output = %output.display(),
        files = path_map.len(),
        "wrote bundle"
    );

    result.artifacts = write_artifacts(&output, &result.metadata, &analysis, &path_map, options)?;
    result.checksum = Some(hash::hash_directory(&output)?);
    Ok(result)
}

fn ensure_output_writable(output: &Path, force: bool) -> Result<()> {
    if !output.exists() || force {
        return Ok(());
    }
    let mut entries = fs::read_dir(output).map_err(|e| read_failed(output, &e))?;
    if entries.next().is_some() {
        return Err(DocpackError::OutputNotEmpty {
            path: output.display().to_string(),
        });
    }
    Ok(())
}

/// Rewritten text of one bundled document
///
/// Three passes merged into one edit plan: links to excluded targets,
/// destinations of surviving links, and a fallback for link targets the
/// registry does not know. Stripping and redirecting leave link text in
/// place, so images nested in a link are rewritten too.
fn rewrite_document(
    entity: &Entity,
    body: &str,
    dest: &Path,
    analysis: &Analysis,
    destination: &Registry,
    path_map: &PathMap,
    options: &PackOptions,
) -> Result<String> {
    let excluded: HashMap<&Path, &ExcludedReference> = analysis
        .walk
        .excluded
        .iter()
        .map(|e| (e.path.as_path(), e))
        .collect();

    let redirect = TransformOptions {
        registry: Some(destination),
        resolution: Some((&analysis.resolution, entity.id.as_str())),
        source_file: Some(dest),
        default_template: Some(REDIRECT_TEMPLATE),
        target_only: true,
        ..TransformOptions::default()
    };

    let mut edits: Vec<Edit> = Vec::new();
    let mut surviving: Vec<(usize, &Link)> = Vec::new();

    for (index, link) in entity.local_links() {
        let target = analysis
            .resolution
            .get(&entity.id, index)
            .and_then(|id| analysis.registry.get_by_id(id))
            .or_else(|| link.target.as_deref().and_then(|t| analysis.registry.get(t)));

        let Some(target) = target else {
            if let Some(edit) = fallback_edit(entity, link, dest, path_map, options)? {
                edits.push(edit);
            }
            continue;
        };

        if let Some(reference) = excluded.get(target.path.as_path()) {
            let rule_template = reference
                .rule
                .and_then(|i| options.exclude_rules.get(i))
                .and_then(|rule| rule.template.as_deref());
            match rule_template.or(options.default_template.as_deref()) {
                Some(source) => {
                    let rendered = rewrite::render_link(
                        source,
                        link,
                        Some(target),
                        &TransformOptions::default(),
                    )?;
                    edits.push(Edit::replace_link(link, rendered));
                }
                None => edits.extend(Edit::strip_link(link)),
            }
        } else if path_map.contains(&target.path) {
            surviving.push((index, link));
        } else {
            debug!(
                document = %entity.id,
                target = %target.id,
                "link target neither bundled nor excluded"
            );
        }
    }

    edits.extend(rewrite::edits(surviving, &redirect)?);

    Ok(rewrite::apply_edits(body, edits))
}

/// Edit for a local link whose target is not in the registry
fn fallback_edit(
    entity: &Entity,
    link: &Link,
    dest: &Path,
    path_map: &PathMap,
    options: &PackOptions,
) -> Result<Option<Edit>> {
    let target = link.target.as_deref();

    if let Some(mapped) = target.and_then(|t| path_map.get(t)) {
        let mut context = LinkContext::new(link, None, None);
        context.path = dest.parent().map(|dir| relative_path(dir, mapped));
        let rendered = template::render(
            REDIRECT_TEMPLATE,
            &RenderContext::new(context, BTreeMap::new()),
        )?;
        return Ok(Some(Edit::replace_target(link, rendered)));
    }

    if let Some(source) = options.unresolved_template.as_deref() {
        let rendered = rewrite::render_link(source, link, None, &TransformOptions::default())?;
        return Ok(Some(Edit::replace_link(link, rendered)));
    }

    warn!(
        document = %entity.id,
        href = %link.href,
        line = link.line,
        "link target is not part of the project, leaving it unchanged"
    );
    Ok(None)
}

fn write_artifacts(
    output: &Path,
    metadata: &PackageMetadata,
    analysis: &Analysis,
    path_map: &PathMap,
    options: &PackOptions,
) -> Result<Vec<Artifact>> {
    let relative = |dest: &Path| relative_path(output, dest);
    let files: Vec<String> = path_map.iter().map(|(_, dest)| relative(dest)).collect();
    let documents: Vec<String> = path_map
        .iter()
        .filter(|(source, _)| {
            analysis
                .registry
                .get(source)
                .is_some_and(Entity::is_document)
        })
        .map(|(_, dest)| relative(dest))
        .collect();
    let main = path_map
        .get(&analysis.root)
        .map(relative)
        .unwrap_or_default();

    let mut formats = options.formats.clone();
    if formats.is_empty() {
        formats.push(PackageFormat::Dir);
    }
    formats.sort();
    formats.dedup();

    // Archive last so it contains the manifests.
    let mut artifacts = Vec::new();
    for format in formats.iter().filter(|f| **f != PackageFormat::Zip) {
        let path = match format {
            PackageFormat::Dir => output.to_path_buf(),
            PackageFormat::Npm => manifest::write_package_json(output, metadata, &main, &files)?,
            PackageFormat::Marketplace => {
                manifest::write_marketplace_json(output, metadata, &documents)?
            }
            PackageFormat::Zip => continue,
        };
        artifacts.push(Artifact {
            format: *format,
            path,
        });
    }
    if formats.contains(&PackageFormat::Zip) {
        let path = archive::create_zip(output, &archive::archive_path(output))?;
        artifacts.push(Artifact {
            format: PackageFormat::Zip,
            path,
        });
    }

    Ok(artifacts)
}

/// Paths of bundled dependencies relative to their common ancestor
fn bundled_paths(walk: &WalkResult) -> Vec<String> {
    let paths: Vec<&Path> = walk
        .entities
        .iter()
        .chain(&walk.assets)
        .map(|e| e.path.as_path())
        .collect();
    relative_to_common(&paths)
}

fn excluded_entries(excluded: &[ExcludedReference]) -> Vec<ExcludedEntry> {
    let paths: Vec<&Path> = excluded.iter().map(|e| e.path.as_path()).collect();
    relative_to_common(&paths)
        .into_iter()
        .zip(excluded)
        .map(|(path, e)| ExcludedEntry {
            path,
            reason: e.reason,
            from: e.from.clone(),
        })
        .collect()
}

fn relative_to_common(paths: &[&Path]) -> Vec<String> {
    let Some(ancestor) = common_ancestor(paths.iter().copied()) else {
        return paths
            .iter()
            .map(|p| crate::path_utils::to_forward_slashes(p))
            .collect();
    };
    paths.iter().map(|p| relative_path(&ancestor, p)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn project() -> TempDir {
        let temp = TempDir::new().unwrap();
        let p = temp.path();
        write(
            p,
            "guide/start.md",
            "---\nname: Team Handbook\ndescription: Start here\n---\n# Start\n\n\
             See [api](../docs/api.md#usage), [draft](../drafts/idea.md) and \
             [site](https://example.com).\n\n![arch](../img/arch.png)\n\n[ref]: ../docs/api.md\n",
        );
        write(p, "docs/api.md", "# API\n\nBack to [start](../guide/start.md).\n");
        write(p, "drafts/idea.md", "# Idea\n");
        write(p, "img/arch.png", "PNG");
        temp
    }

    fn options(temp: &TempDir) -> PackOptions {
        PackOptions {
            project_root: Some(temp.path().to_path_buf()),
            output: Some(temp.path().join("out/bundle")),
            ..PackOptions::default()
        }
    }

    #[test]
    fn test_resolve_metadata_precedence() {
        let fm = BTreeMap::from([
            ("name".to_string(), serde_json::json!("From Frontmatter")),
            ("license".to_string(), serde_json::json!("MIT")),
        ]);
        let overrides = MetadataOverrides {
            name: Some("cli-name".to_string()),
            ..MetadataOverrides::default()
        };
        let meta = resolve_metadata(&overrides, &fm, Path::new("/p/Getting Started.md"));
        assert_eq!(meta.name, "cli-name");
        assert_eq!(meta.license.as_deref(), Some("MIT"));
        assert_eq!(meta.version, DEFAULT_VERSION);

        let meta = resolve_metadata(
            &MetadataOverrides::default(),
            &BTreeMap::new(),
            Path::new("/p/Getting Started.md"),
        );
        assert_eq!(meta.name, "getting-started");
    }

    #[test]
    fn test_frontmatter_name_is_kebab_cased() {
        let fm = BTreeMap::from([("name".to_string(), serde_json::json!("Team Handbook"))]);
        let meta = resolve_metadata(&MetadataOverrides::default(), &fm, Path::new("/p/start.md"));
        assert_eq!(meta.name, "team-handbook");

        let temp = project();
        let opts = PackOptions {
            project_root: Some(temp.path().to_path_buf()),
            formats: vec![PackageFormat::Npm],
            ..PackOptions::default()
        };
        let result = pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        assert!(result.output.ends_with("dist/team-handbook"));

        let package: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(result.output.join("package.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(package["name"], "team-handbook");
    }

    #[test]
    fn test_pack_rewrites_and_copies() {
        let temp = project();
        let mut opts = options(&temp);
        opts.exclude_rules = vec![
            ExcludeRule::new(vec!["drafts/**".to_string()]).with_template("{{ text }} (draft)"),
        ];

        let result = pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        let out = temp.path().join("out/bundle");
        assert!(result.output.ends_with("out/bundle"));
        assert_eq!(result.metadata.name, "team-handbook");
        assert_eq!(result.max_depth, 1);
        assert_eq!(result.excluded.len(), 1);
        assert_eq!(result.excluded[0].reason, ExclusionReason::PatternMatched);
        assert_eq!(result.artifacts[0].format, PackageFormat::Dir);

        let start = fs::read_to_string(out.join("start.md")).unwrap();
        assert!(start.contains(
            "See [api](docs/api.md#usage), draft (draft) and [site](https://example.com)."
        ));
        assert!(start.contains("![arch](img/arch.png)"));
        assert!(start.contains("[ref]: docs/api.md\n"));

        let api = fs::read_to_string(out.join("docs/api.md")).unwrap();
        assert!(api.contains("[start](../start.md)"));
        assert_eq!(fs::read(out.join("img/arch.png")).unwrap(), b"PNG");
        assert!(!out.join("drafts/idea.md").exists());
    }

    #[test]
    fn test_excluded_links_are_stripped_without_template() {
        let temp = project();
        let mut opts = options(&temp);
        opts.max_depth = Some(0);

        pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        let start = fs::read_to_string(temp.path().join("out/bundle/start.md")).unwrap();
        assert!(start.contains("See api, draft and [site](https://example.com)."));
        assert!(start.contains("\narch\n"));
        assert!(!start.contains("[ref]:"));
    }

    #[test]
    fn test_images_nested_in_links_are_rewritten() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "guide/start.md",
            "[![badge](../img/b.png)](../docs/api.md \"API\")\n\
             [![shot](../img/s.png)](../drafts/idea.md)\n",
        );
        write(temp.path(), "docs/api.md", "# API\n");
        write(temp.path(), "drafts/idea.md", "# Idea\n");
        write(temp.path(), "img/b.png", "B");
        write(temp.path(), "img/s.png", "S");
        let mut opts = options(&temp);
        opts.naming = NamingStrategy::Flat;
        opts.exclude_rules = vec![ExcludeRule::new(vec!["drafts/**".to_string()])];

        pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        let out = temp.path().join("out/bundle");
        let start = fs::read_to_string(out.join("start.md")).unwrap();
        assert_eq!(start, "[![badge](b.png)](api.md \"API\")\n![shot](s.png)\n");
        assert_eq!(fs::read(out.join("s.png")).unwrap(), b"S");
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = project();
        let mut opts = options(&temp);
        opts.dry_run = true;

        let result = pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        assert!(result.dry_run);
        assert_eq!(result.bundled.len(), 3);
        assert!(result.artifacts.is_empty());
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_non_empty_output_requires_force() {
        let temp = project();
        write(temp.path(), "out/bundle/stale.txt", "old");
        let mut opts = options(&temp);

        let result = pack(&temp.path().join("guide/start.md"), &opts);
        assert!(matches!(result, Err(DocpackError::OutputNotEmpty { .. })));
        assert!(!temp.path().join("out/bundle/start.md").exists());

        opts.force = true;
        pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        assert!(temp.path().join("out/bundle/start.md").exists());
    }

    #[test]
    fn test_collision_fails_before_writing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "root.md", "[a](a/notes.md) [b](b/notes.md)\n");
        write(temp.path(), "a/notes.md", "");
        write(temp.path(), "b/notes.md", "");
        let mut opts = options(&temp);
        opts.naming = NamingStrategy::Flat;

        let result = pack(&temp.path().join("root.md"), &opts);
        assert!(matches!(
            result,
            Err(DocpackError::DestinationCollision { .. })
        ));
        assert!(!temp.path().join("out").exists());
    }

    #[test]
    fn test_artifacts() {
        let temp = project();
        let mut opts = options(&temp);
        opts.formats = vec![PackageFormat::Zip, PackageFormat::Npm, PackageFormat::Marketplace];
        opts.metadata.version = Some("2.0.0".to_string());

        let result = pack(&temp.path().join("guide/start.md"), &opts).unwrap();
        let formats: Vec<PackageFormat> = result.artifacts.iter().map(|a| a.format).collect();
        assert_eq!(
            formats,
            vec![PackageFormat::Npm, PackageFormat::Marketplace, PackageFormat::Zip]
        );

        let out = temp.path().join("out/bundle");
        let package: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("package.json")).unwrap()).unwrap();
        assert_eq!(package["version"], "2.0.0");
        assert_eq!(package["main"], "start.md");
        assert!(out.join(".claude-plugin/marketplace.json").is_file());
        assert!(temp.path().join("out/bundle.zip").is_file());
    }

    #[test]
    fn test_root_outside_project() {
        let temp = project();
        let mut opts = options(&temp);
        opts.project_root = Some(temp.path().join("docs"));

        let result = pack(&temp.path().join("guide/start.md"), &opts);
        assert!(matches!(
            result,
            Err(DocpackError::RootOutsideProject { .. })
        ));
    }

    #[test]
    fn test_unresolved_links_use_template() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "root.md", "[gone](missing.md)\n");
        let mut opts = options(&temp);
        opts.unresolved_template = Some("{{ text }} (missing)".to_string());

        pack(&temp.path().join("root.md"), &opts).unwrap();
        let root = fs::read_to_string(temp.path().join("out/bundle/root.md")).unwrap();
        assert_eq!(root, "gone (missing)\n");
    }

    #[test]
    fn test_bundle_excludes_keep_previous_output_out() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "root.md", "---\nid: root\n---\n[doc](doc.md)\n");
        write(temp.path(), "doc.md", "---\nid: doc\n---\n# Doc\n");
        let opts = PackOptions {
            project_root: Some(temp.path().to_path_buf()),
            identity_field: Some("id".to_string()),
            ..PackOptions::default()
        };
        let root = temp.path().join("root.md");

        let result = pack(&root, &opts).unwrap();
        assert!(result.output.ends_with("dist/root"));
        // A second run sees the first bundle on disk.
        pack(&root, &PackOptions { force: true, ..opts.clone() }).unwrap();

        let exclude = bundle_excludes(&root, &opts).unwrap();
        assert_eq!(exclude, vec!["dist/root/**".to_string(), "dist/root".to_string()]);
        let analysis = analyze(&root, &opts, &exclude).unwrap();
        assert_eq!(analysis.walk.entities.len(), 1);

        assert!(matches!(
            analyze(&root, &opts, &[]),
            Err(DocpackError::DuplicateIdentity { .. })
        ));
    }

    #[test]
    fn test_analyze_sweeps_outside_targets() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "project/root.md", "[shared](../shared/doc.md)\n");
        write(temp.path(), "shared/doc.md", "# Shared\n");
        let opts = PackOptions {
            project_root: Some(temp.path().join("project")),
            ..PackOptions::default()
        };

        let analysis = analyze(&temp.path().join("project/root.md"), &opts, &[]).unwrap();
        assert!(analysis.walk.entities.is_empty());
        assert_eq!(analysis.walk.excluded.len(), 1);
        assert_eq!(
            analysis.walk.excluded[0].reason,
            ExclusionReason::OutsideProject
        );
    }
}
