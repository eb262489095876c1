//! Startup bootstrap for the identity host
//!
//! This module handles:
//! - Configuration loading
//! - Identity store initialization (PostgreSQL or in-memory)
//! - The run-once startup task sequence
//! - Administrator role and user seeding

pub mod admin;
pub mod config;
pub mod database;
pub mod startup;

pub use admin::{
    AdminBootstrap, BootstrapError, BootstrapOutcome, BootstrapReport, BootstrapStep,
    IdentityCollaborators, RoleStep, SkipReason, UserStep,
};
pub use config::load_config;
pub use database::{init_database, init_identity_store, run_migrations};
pub use startup::{StartupHandle, StartupSequencer, StartupSummary, StartupTask};
