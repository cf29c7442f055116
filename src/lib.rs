//! scylla-configure library
//!
//! First-boot provisioning of a scylla database node on a cloud machine
//! image: reconcile scylla.yaml from defaults, instance facts and user-data,
//! then run the provisioning steps that prepare the node.
//!
//! # Design Principles
//!
//! - **Safety First**: No unsafe code (`#![forbid(unsafe_code)]`)
//! - **Fail Open**: Missing metadata or bad user-data fall back to defaults
//! - **Isolated Steps**: Only a scylla.yaml failure stops the run
//! - **Bounded**: Every external program runs with a timeout

#![forbid(unsafe_code)]

pub mod config;
pub mod datasources;
pub mod modules;
pub mod settings;
pub mod stages;
pub mod userdata;

mod error;

pub use datasources::{CloudInstance, CloudProvider, InstanceFacts};
pub use error::ConfigureError;
pub use settings::Settings;
pub use stages::configure::{Configurator, RunReport, StepOutcome};
