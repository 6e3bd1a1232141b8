// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod component;
pub mod descriptors;
pub mod error;
pub mod executor;
pub mod graph;
pub mod packet;
pub mod ports;
pub mod prelude;
pub mod registry;
pub mod runtime;

pub use component::*;
pub use descriptors::*;
pub use error::*;
pub use executor::*;
pub use graph::*;
pub use packet::*;
pub use ports::*;
pub use registry::*;
pub use runtime::*;
