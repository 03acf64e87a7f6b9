//! univault - per-tenant schema lifecycle for a multi-tenant education platform
//!
//! Subsystems:
//! - archive: backup archive store (local + remote copies)
//! - registry: persistent per-tenant schema state machine
//! - restore: archive materialization with safety backup and rollback
//! - promotion: temp-to-production content swap
//! - reconcile: strategy-driven entity synchronization between schemas

pub mod api;
pub mod archive;
pub mod cli;
pub mod config;
pub mod entity;
pub mod observability;
pub mod promotion;
pub mod reconcile;
pub mod registry;
pub mod restore;
pub mod schema;
pub mod service;
pub mod tenant;
