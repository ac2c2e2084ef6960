//! # idcgen_templates
//!
//! Terraform text production for idcgen.
//!
//! Two kinds of output are produced here: whole-file static templates read
//! from the templates directory, and data-driven files built from normalized
//! records.
//!
//! ## Features
//!
//! - `{{variable}}` rendering with strict missing-variable errors
//! - Static template catalog with mode-variant classification
//! - HCL builders for users, groups, permission sets, assignments and TEAM
//! - Verbatim directory copies for policy documents and TEAM modules
//!
//! ## Example
//!
//! ```rust,no_run
//! use idcgen_core::Component;
//! use idcgen_templates::{TemplateCatalog, TemplateRenderer};
//! use std::collections::HashMap;
//!
//! let catalog = TemplateCatalog::new("templates");
//! let renderer = TemplateRenderer::new();
//! for entry in catalog.component_templates(Component::PermissionSets).unwrap() {
//!     let content = renderer.render_file(&entry.path, &HashMap::new()).unwrap();
//!     println!("{}: {} bytes", entry.template.output_name(), content.len());
//! }
//! ```

pub mod catalog;
pub mod error;
pub mod hcl;
pub mod renderer;

pub use catalog::{CatalogEntry, TemplateCatalog, TEMPLATE_SUFFIX};
pub use error::{TemplateError, TemplateResult};
pub use renderer::{copy_tree, TemplateRenderer};
