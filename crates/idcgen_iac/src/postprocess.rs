//! Uniform clean-up of the generated tree.

use std::fs;
use std::path::Path;

use tracing::debug;
use walkdir::WalkDir;

use crate::error::IacResult;

/// First line of every generated Terraform file.
pub const HEADER: &str = "# Generated Terraform file for AWS IAM Identity Center";

/// What post-processing changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PostprocessReport {
    pub normalized: usize,
    pub removed_files: usize,
    pub removed_dirs: usize,
}

/// Content with the header and exactly one trailing newline, or `None` when
/// nothing but the header would remain.
pub fn finalize_content(content: &str) -> Option<String> {
    let body = content
        .strip_prefix(HEADER)
        .unwrap_or(content)
        .trim_start_matches('\n')
        .trim_end();
    if body.is_empty() {
        return None;
    }
    Some(format!("{}\n\n{}\n", HEADER, body))
}

/// Normalize every `.tf` file under `root`, drop files left empty and prune
/// empty directories.
pub fn postprocess(root: &Path) -> IacResult<PostprocessReport> {
    let mut report = PostprocessReport::default();
    if !root.exists() {
        return Ok(report);
    }

    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("tf") {
            continue;
        }

        let content = fs::read_to_string(path)?;
        match finalize_content(&content) {
            Some(finalized) => {
                if finalized != content {
                    fs::write(path, finalized)?;
                    report.normalized += 1;
                }
            }
            None => {
                debug!("Removing empty file {:?}", path);
                fs::remove_file(path)?;
                report.removed_files += 1;
            }
        }
    }

    let dirs: Vec<_> = WalkDir::new(root)
        .min_depth(1)
        .contents_first(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    for dir in dirs {
        if fs::read_dir(&dir)?.next().is_none() {
            debug!("Removing empty directory {:?}", dir);
            fs::remove_dir(&dir)?;
            report.removed_dirs += 1;
        }
    }

    Ok(report)
}
