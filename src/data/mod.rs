//! Data layer: format detection, header normalization, selection and
//! sample extraction.
//!
//! Architecture:
//! ```text
//!  .txt / .h5 / .edf
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  detect   │  extension or sniffed media type → Format
//!   └──────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ text / h5   │  parse header → FileHeader (one DeviceHeader per device)
//!   └─────────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ selection  │  check devices/channels, fill in omissions
//!   └───────────┘
//!        │
//!        ▼
//!   ┌─────────────┐
//!   │ text / h5   │  read the requested channels → Dataset
//!   └─────────────┘
//! ```
//! `loader` runs these stages in order; `summary` describes a finished load.

pub mod detect;
pub mod h5;
pub mod loader;
pub mod model;
pub mod selection;
pub mod summary;
pub mod text;
