//! Template loading utilities

use super::Template;
use crate::error::CvError;
use crate::utils::image::ImageUtils;
use crate::Result;
use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

/// Template loader searching a list of directories
pub struct TemplateLoader {
    template_dirs: Vec<PathBuf>,
    supported_extensions: Vec<String>,
}

impl TemplateLoader {
    /// Create new template loader
    pub fn new() -> Self {
        Self {
            template_dirs: Vec::new(),
            supported_extensions: vec![
                "png".to_string(),
                "jpg".to_string(),
                "jpeg".to_string(),
                "bmp".to_string(),
            ],
        }
    }

    /// Add template directory
    pub fn add_template_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.template_dirs.push(dir.as_ref().to_path_buf());
        self
    }

    /// Decode a template from an explicit file path.
    ///
    /// The file stem becomes the template name. Decode failures are errors.
    pub fn load_path<P: AsRef<Path>>(path: P) -> Result<Template> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "template".to_string());
        let color = ImageUtils::load_bgr(path)
            .with_context(|| format!("Failed to load template: {:?}", path))?;

        Ok(Template::from_bgr(name, color)?.with_path(path.to_path_buf()))
    }

    /// Resolve a configured template reference.
    ///
    /// An existing path is used directly, otherwise `reference` is treated
    /// as a name and looked up in the template directories.
    pub fn resolve(&self, reference: &Path) -> Result<Template> {
        if reference.is_file() {
            return Self::load_path(reference);
        }
        let name = reference.to_string_lossy();
        self.load_template(&name)?
            .ok_or_else(|| CvError::TemplateNotFound(name.to_string()).into())
    }

    /// Load template by name, trying a few spellings per extension
    pub fn load_template(&self, name: &str) -> Result<Option<Template>> {
        for candidate in self.generate_template_candidates(name) {
            if let Some(path) = self.find_template_file(&candidate) {
                let template = Self::load_path(&path)?;
                return Ok(Some(Template {
                    name: name.to_string(),
                    ..template
                }));
            }
        }

        Ok(None)
    }

    /// Generate template name candidates
    fn generate_template_candidates(&self, name: &str) -> Vec<String> {
        let mut candidates = Vec::new();

        for ext in &self.supported_extensions {
            candidates.push(format!("{}.{}", name, ext));
            candidates.push(format!("{}.{}", name.to_lowercase(), ext));
            candidates.push(format!("_{}.{}", name, ext));
        }

        candidates
    }

    /// Find template file in directories, falling back to a case-insensitive scan
    fn find_template_file(&self, candidate: &str) -> Option<PathBuf> {
        for dir in &self.template_dirs {
            let path = dir.join(candidate);
            if path.is_file() {
                return Some(path);
            }

            if let Ok(entries) = fs::read_dir(dir) {
                for entry in entries.flatten() {
                    let file_name = entry.file_name();
                    if file_name.to_string_lossy().eq_ignore_ascii_case(candidate) {
                        return Some(entry.path());
                    }
                }
            }
        }

        None
    }
}

impl Default for TemplateLoader {
    fn default() -> Self {
        Self::new()
    }
}
