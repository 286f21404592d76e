//! Skill package discovery
//!
//! A skill package is any immediate child directory of the skills root that
//! contains a `SKILL.md`. Each one becomes a [`SkillMetadata`] record that the
//! evaluators treat as read-only input.

pub mod manifest;

use crate::models::SkillMetadata;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{debug, warn};
use walkdir::WalkDir;

pub const MANIFEST_FILE: &str = "SKILL.md";

/// Names of `*.py` files anywhere under `dir`, sorted
fn python_file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "py"))
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Names of regular files directly inside `dir`, sorted
fn direct_file_names(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .flatten()
        .filter(|e| e.path().is_file())
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// Parse one package directory.
///
/// Returns `Ok(None)` when the directory has no `SKILL.md`.
/// `pipeline_targets` is left empty; it needs the sibling set and is filled
/// in by [`discover_skills`].
pub fn parse_skill_md(skill_dir: &Path) -> Result<Option<SkillMetadata>> {
    let manifest_path = skill_dir.join(MANIFEST_FILE);
    if !manifest_path.is_file() {
        return Ok(None);
    }

    let text = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;

    let parsed = manifest::split_manifest(&text);
    let dir_name = skill_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let name = parsed.fields.get("name").cloned().unwrap_or(dir_name);
    let description = parsed.fields.get("description").cloned().unwrap_or_default();

    let triggers = manifest::extract_triggers(&description, parsed.body);
    let section_headers = manifest::section_headers(parsed.body);
    let flags = manifest::section_flags(&section_headers);
    let (code_block_count, code_block_languages) = manifest::code_blocks(parsed.body);

    let scripts_dir = skill_dir.join("scripts");
    let refs_dir = skill_dir.join("references");
    let has_scripts_dir = scripts_dir.is_dir();
    let has_references_dir = refs_dir.is_dir();

    let skill = SkillMetadata {
        name,
        description,
        skill_path: skill_dir.to_path_buf(),
        triggers,
        has_scripts_dir,
        has_references_dir,
        has_bridges_dir: skill_dir.join("bridges").is_dir(),
        has_tests_dir: skill_dir.join("tests").is_dir(),
        has_design_decision: skill_dir.join("DESIGN_DECISION.md").exists(),
        has_when_to_use: flags.when_to_use,
        has_dont_use: flags.dont_use,
        has_pipeline_integration: flags.pipeline,
        has_llm_judgment_guide: flags.llm_judgment,
        has_quick_start: flags.quick_start,
        has_cli_options: flags.cli_options,
        has_prerequisites: flags.prerequisites,
        script_files: if has_scripts_dir {
            python_file_names(&scripts_dir)
        } else {
            Vec::new()
        },
        reference_files: if has_references_dir {
            direct_file_names(&refs_dir)
        } else {
            Vec::new()
        },
        skill_md_lines: text.split('\n').count(),
        code_block_count,
        code_block_languages,
        section_headers,
        pipeline_targets: Vec::new(),
        manifest_text: text,
    };

    debug!(
        "Parsed skill '{}' ({} triggers, {} scripts, {} references)",
        skill.name,
        skill.triggers.keywords.len(),
        skill.script_files.len(),
        skill.reference_files.len()
    );
    Ok(Some(skill))
}

/// Directory names of `others` mentioned anywhere in the manifest, case-insensitively.
fn detect_pipeline_targets(manifest_text: &str, others: &[&str]) -> Vec<String> {
    let lower = manifest_text.to_lowercase();
    others
        .iter()
        .filter(|name| lower.contains(&name.to_lowercase()))
        .map(|name| name.to_string())
        .collect()
}

/// Find every skill package directly under `skills_root`, sorted by directory.
///
/// A missing root yields an empty list. Manifests that cannot be read are
/// logged and skipped.
pub fn discover_skills(skills_root: &Path) -> Result<Vec<SkillMetadata>> {
    if !skills_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut children: Vec<_> = std::fs::read_dir(skills_root)
        .with_context(|| format!("cannot read skills root {}", skills_root.display()))?
        .flatten()
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    children.sort();

    let mut skills = Vec::new();
    for child in children {
        match parse_skill_md(&child) {
            Ok(Some(skill)) => skills.push(skill),
            Ok(None) => {}
            Err(e) => warn!("skipping {}: {e:#}", child.display()),
        }
    }

    let dir_names: Vec<String> = skills.iter().map(SkillMetadata::dir_name).collect();
    for skill in &mut skills {
        let own = skill.dir_name();
        let others: Vec<&str> = dir_names
            .iter()
            .map(String::as_str)
            .filter(|n| *n != own)
            .collect();
        skill.pipeline_targets = detect_pipeline_targets(&skill.manifest_text, &others);
    }

    debug!("Discovered {} skills in {}", skills.len(), skills_root.display());
    Ok(skills)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TriggerSource;
    use std::fs;

    fn write(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_parse_skill_md_full_layout() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("pdf-tools");
        write(
            &skill_dir.join("SKILL.md"),
            "---\nname: PDF Toolkit\ndescription: Works with PDFs. Triggers on \"pdf\", \"merge\".\n---\n## When to use\n\n```python\nx\n```\n",
        );
        write(&skill_dir.join("scripts/merge.py"), "print(1)\n");
        write(&skill_dir.join("scripts/lib/util.py"), "");
        write(&skill_dir.join("scripts/notes.txt"), "");
        write(&skill_dir.join("references/api.md"), "# API\n");
        write(&skill_dir.join("references/nested/skip.md"), "");
        fs::create_dir_all(skill_dir.join("tests")).unwrap();
        write(&skill_dir.join("DESIGN_DECISION.md"), "why");

        let skill = parse_skill_md(&skill_dir).unwrap().unwrap();
        assert_eq!(skill.name, "PDF Toolkit");
        assert_eq!(skill.dir_name(), "pdf-tools");
        assert_eq!(skill.triggers.keywords, vec!["pdf", "merge"]);
        assert_eq!(skill.triggers.source, TriggerSource::YamlDescription);
        assert!(skill.has_scripts_dir && skill.has_references_dir && skill.has_tests_dir);
        assert!(skill.has_design_decision);
        assert!(!skill.has_bridges_dir);
        assert!(skill.has_when_to_use);
        assert_eq!(skill.script_files, vec!["merge.py", "util.py"]);
        assert_eq!(skill.reference_files, vec!["api.md"]);
        assert_eq!(skill.code_block_count, 1);
        assert_eq!(skill.code_block_languages, vec!["python"]);
        assert_eq!(skill.skill_md_lines, 10);
    }

    #[test]
    fn test_name_defaults_to_directory() {
        let dir = tempfile::tempdir().unwrap();
        let skill_dir = dir.path().join("plain");
        write(&skill_dir.join("SKILL.md"), "# No front matter\n");
        let skill = parse_skill_md(&skill_dir).unwrap().unwrap();
        assert_eq!(skill.name, "plain");
        assert_eq!(skill.description, "");
    }

    #[test]
    fn test_parse_without_manifest_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(parse_skill_md(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_discover_sorted_with_pipeline_targets() {
        let dir = tempfile::tempdir().unwrap();
        write(
            &dir.path().join("beta/SKILL.md"),
            "---\nname: beta\n---\nFeeds results into ALPHA.\n",
        );
        write(&dir.path().join("alpha/SKILL.md"), "---\nname: alpha\n---\nStandalone.\n");
        fs::create_dir_all(dir.path().join("not-a-skill")).unwrap();
        write(&dir.path().join("README.md"), "top-level file");

        let skills = discover_skills(dir.path()).unwrap();
        let names: Vec<&str> = skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert!(skills[0].pipeline_targets.is_empty());
        assert_eq!(skills[1].pipeline_targets, vec!["alpha"]);
    }

    #[test]
    fn test_discover_missing_root_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let skills = discover_skills(&dir.path().join("missing")).unwrap();
        assert!(skills.is_empty());
    }
}
