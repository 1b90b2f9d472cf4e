//! Classified detector failures

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CvError {
    #[error("image is empty")]
    EmptyImage,

    #[error("template '{0}' was not found in any template directory")]
    TemplateNotFound(String),

    #[error("template '{name}' keep-mask retains only {percent:.1}% of its pixels")]
    DegenerateMask { name: String, percent: f64 },

    #[error("template {template_w}x{template_h} does not fit in {image_w}x{image_h} at any scale")]
    TemplateTooLarge {
        template_w: i32,
        template_h: i32,
        image_w: i32,
        image_h: i32,
    },
}
