// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Core module - lifecycle coordination and process wiring

mod coordinator;
mod engine;

pub use coordinator::Coordinator;
pub use engine::Engine;
