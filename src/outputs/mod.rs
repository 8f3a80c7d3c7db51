//! Output generation for run reports.
//!
//! # Submodules
//!
//! - [`json`]: writes a run's metrics and inserted articles as JSON
//!
//! # Output Structure
//!
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── 20250506T101500Z-3fa2.json
//!     └── 20250506T161500Z-9c01.json
//! ```

pub mod json;
