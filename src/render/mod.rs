//! Output rendering (context bundles)

pub mod bundle;

pub use bundle::{pack_bundle, BundleSpec, ContextBundle};
