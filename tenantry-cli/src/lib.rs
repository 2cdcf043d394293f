//! Tenantry CLI - Command-line interface for tenant provisioning.
//!
//! This crate provides the `tenantry` tool for provisioning organization
//! databases and inspecting their setup status and connections.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
