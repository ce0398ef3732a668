//! core
//!
//! Everything the publish workflow needs that does not run git: the
//! repository config store, branch and commit templates, the changelog
//! file, validated ref and object names, working-tree paths and the run
//! lock. All writes to disk here go through a temp file and a rename.

pub mod changelog;
pub mod config;
pub mod naming;
pub mod ops;
pub mod paths;
pub mod types;
