//! # Store Harness
//!
//! Local-first sync of document folders into a remote file-search store,
//! with a keyword-window retrieval fallback that never leaves the machine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌─────────────┐   ┌──────────────┐
//! │  Selection  │──▶│    Sync     │──▶│ Remote store │
//! │ walk+filter │   │ upload+poll │   │ (file search)│
//! └─────────────┘   └──────┬──────┘   └──────┬───────┘
//!                          │                 │
//!                          ▼                 ▼
//!                   ┌─────────────┐   ┌──────────┐
//!                   │ store config│   │   ask    │
//!                   │   (JSON)    │   └──────────┘
//!                   └─────────────┘
//!
//! ┌──────────┐   ┌────────────────┐   ┌─────────────┐
//! │ document │──▶│ keyword windows│──▶│   context   │
//! └──────────┘   └────────────────┘   └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! storectl store create --name team-docs
//! storectl sync ./docs
//! storectl ask "How do I open a viewer?"
//! storectl search "viewer open" --document ./data/guide.md
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`selection`] | Which files qualify for upload |
//! | [`state`] | JSON persistence of the store record |
//! | [`gemini`] | HTTP remote store adapter |
//! | [`client`] | Store lifecycle and upload polling |
//! | [`sync`] | Bulk sync, init, reset, removal by name |
//! | [`document`] | Document loading for local search |
//! | [`retrieve`] | Local keyword search |
//! | [`answer`] | Prompting the answer model |
//! | [`progress`] | Sync progress on stderr |
//! | [`status`] | Local status report |

pub mod answer;
pub mod client;
pub mod config;
pub mod document;
pub mod gemini;
pub mod progress;
pub mod retrieve;
pub mod selection;
pub mod state;
pub mod status;
pub mod sync;
