//! # idcgen_core
//!
//! Shared building blocks for idcgen, the IAM Identity Center to Terraform
//! generator.
//!
//! ## Features
//!
//! - Name sanitization for Terraform identifiers and record slots
//! - Tagged record types, one per directory entity kind
//! - File-backed record store with kind-scoped namespaces
//! - Layered run settings and workspace naming
//! - The mode matrix deciding which artifacts are produced and where
//!
//! ## Example
//!
//! ```rust,no_run
//! use idcgen_core::{decide, Artifact, Settings, SettingsLayer, TaskId};
//! use std::path::Path;
//!
//! let settings = Settings::load(Path::new("config.yaml"), &SettingsLayer::default()).unwrap();
//! let decision = decide(&settings.mode(), &Artifact::Task(TaskId::UsersImport));
//! println!("{:?}", decision);
//! ```

pub mod error;
pub mod matrix;
pub mod records;
pub mod sanitize;
pub mod settings;
pub mod store;
pub mod views;

pub use error::{CoreError, CoreResult};
pub use matrix::{
    decide, Artifact, Component, CopyArtifact, Decision, Location, Mode, Placement, SkipReason,
    StaticTemplate, TaskId, Variant, VariantSet, INSTANCES_FILE,
};
pub use records::{
    AccountAssignmentRecord, AccountRecord, AttachedManagedPolicy, CustomerManagedPolicyRef,
    DocumentKind, GroupMembershipRecord, GroupRecord, Importable, InstanceRecord,
    ManagedPolicyRecord, OrganizationalUnitRecord, PermissionSetRecord, PrincipalType, Record,
    RecordKind, Tag, TeamApplicationAssignmentsRecord, TeamApplicationRecord,
    TeamApproverRecord, TeamAssignmentDetail, TeamEligibilityRecord, TeamItem, TeamTableKind,
    TeamTableRecord, UserRecord,
};
pub use sanitize::{composite_name, is_valid_identifier, sanitize_name, COMPOSITE_SEPARATOR};
pub use settings::{Platform, Settings, SettingsLayer, StateMode, Verbosity, DEFAULT_SETTINGS_FILE};
pub use store::{Absence, RecordIter, RecordStore};
pub use views::{AssignmentTree, AttachmentMap, ManagedAttachment, MembershipMap};
