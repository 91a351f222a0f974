//! Clockwork - build, package and dependency tool for Clockwork game projects
//!
//! This library provides functionality to:
//! - Read and write the project manifest (`manifest.json`)
//! - Compile legacy XML level and sprite-sheet files to JSON
//! - Stage a project and package it into a single archive
//! - Resolve package dependencies against a registry

pub mod build;
pub mod cli;
pub mod compile;
pub mod deps;
pub mod init;
pub mod manifest;
pub mod progress;
