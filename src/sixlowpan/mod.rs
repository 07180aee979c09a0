// SPDX-License-Identifier: Apache-2.0 OR MIT

//! 6LoWPAN (RFC 6282/4944): header compression, the mesh header, and
//! fragmentation/reassembly (spec §4.3).

pub mod context;
pub mod frag;
pub mod iphc;
pub mod mesh;
pub mod nhc;

pub use context::{Context, ContextTable};
pub use frag::{FragmentHeader, FragmentOutcome, ReassemblyTable};
pub use iphc::Decompressed;
pub use mesh::MeshHeader;
