// SPDX-License-Identifier: Apache-2.0 OR MIT

//! IPv6, ICMPv6, and UDP (spec §4.5): header codecs, checksum, extension
//! header walk, and MPL duplicate detection for realm-local multicast.

pub mod addr;
pub mod checksum;
pub mod ext_headers;
pub mod header;
pub mod icmpv6;
pub mod mpl;
pub mod udp;

pub use addr::IpAddr;
pub use checksum::{checksum_message, checksum_slice, fold};
pub use ext_headers::Dispatch;
pub use header::{Ip6Header, IP6_HEADER_LEN};
pub use icmpv6::{Icmp6Header, Icmp6Type};
pub use mpl::{MplDedupWindow, MplSeed};
pub use udp::{select_ephemeral_port, SocketTable, UdpHeader, UdpSocket};
