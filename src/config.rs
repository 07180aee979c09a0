// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compile-time capacity bounds.
//!
//! Spec §5 requires every resource bound to be static, and §9(d) requires
//! those bounds to be "implementation parameters, not hardcoded". Rather
//! than scattering `const` items through each module, they live on one
//! trait so a downstream crate (e.g. a multi-node simulation harness that
//! wants a bigger buffer pool than a constrained device would carry) can
//! supply its own `Config` impl instead of editing this crate.

/// All static resource bounds for one node instance.
pub trait Config {
    /// Number of fixed-size buffers in the chained-buffer pool.
    const NUM_BUFFERS: usize;
    /// Bytes per buffer, including the space reserved for headers the
    /// stack prepends as a datagram moves down the layers.
    const BUFFER_SIZE: usize;

    /// Maximum simultaneously-tracked neighbors (children + router peers).
    const MAX_NEIGHBORS: usize;
    /// Maximum children a router/leader can hold.
    const MAX_CHILDREN: usize;
    /// Maximum router-role peers tracked in the router table.
    const MAX_ROUTERS: usize;

    /// Address resolver cache entry count.
    const ADDRESS_CACHE_SIZE: usize;
    /// MPL seed-set dedup window (recently seen `(seed, sequence)` pairs).
    const MPL_DEDUP_WINDOW: usize;
    /// Simultaneous in-progress 6LoWPAN reassemblies.
    const MAX_REASSEMBLIES: usize;
    /// Simultaneous indirect (sleepy-child) pending-message slots.
    const MAX_INDIRECT_PENDING: usize;

    /// Network Data context table size (context IDs 0..15 per spec).
    const MAX_CONTEXTS: usize;
    /// Network Data prefix/route entries held by the leader's aggregate store.
    const MAX_NETWORK_DATA_ENTRIES: usize;

    /// CSMA-CA: macMaxCSMABackoffs.
    const MAX_CSMA_BACKOFFS: u8;
    /// CSMA-CA: macMaxFrameRetries.
    const MAX_FRAME_RETRIES: u8;
}

/// The bounds this crate ships with, sized for a constrained router/child
/// node rather than a border-router-class device with more RAM.
pub struct DefaultConfig;

impl Config for DefaultConfig {
    // Spec §5: "typ. 64 x 128 B".
    const NUM_BUFFERS: usize = 64;
    const BUFFER_SIZE: usize = 128;

    const MAX_NEIGHBORS: usize = 32;
    // Spec §5: "Max children per router: 5".
    const MAX_CHILDREN: usize = 5;
    // Spec §5: "Max routers: 32 (router-id space 62)".
    const MAX_ROUTERS: usize = 32;

    // Spec §5: "Address-resolver cache: 16".
    const ADDRESS_CACHE_SIZE: usize = 16;
    const MPL_DEDUP_WINDOW: usize = 32;
    const MAX_REASSEMBLIES: usize = 4;
    // Per-child pending bitmask supports up to 8 sleepy children (spec §4.3).
    const MAX_INDIRECT_PENDING: usize = 8;

    const MAX_CONTEXTS: usize = 16;
    const MAX_NETWORK_DATA_ENTRIES: usize = 32;

    const MAX_CSMA_BACKOFFS: u8 = 4;
    const MAX_FRAME_RETRIES: u8 = 3;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_bounds_are_sane() {
        assert!(DefaultConfig::NUM_BUFFERS > 0);
        assert!(DefaultConfig::MAX_CHILDREN <= DefaultConfig::MAX_NEIGHBORS);
        assert!(DefaultConfig::MAX_ROUTERS <= DefaultConfig::MAX_NEIGHBORS);
    }
}
