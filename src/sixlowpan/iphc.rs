// SPDX-License-Identifier: Apache-2.0 OR MIT

//! LOWPAN_IPHC header compression (RFC 6282 §3.1) and its inverse (spec
//! §4.3's invariant: `Decompress(Compress(x)) == x` for any `x` whose
//! addresses/next-header lie in the compressible set this module
//! handles).
//!
//! Grounded on `other_examples/*lowpan.rs`'s `iphc` dispatch-bit
//! constants and `compress_tf`/`compress_hl`/`compress_src`/
//! `compress_dst`/`compress_multicast`/`compress_iid` (kept largely as
//! written, generalized to this crate's `Ip6Header`/`IpAddr`/
//! `MacAddress`/`ContextTable` types); that source's `decompress*`
//! functions were left as unfinished TODO stubs, so the decompress half
//! here is a from-scratch inverse of the compress half rather than a
//! transcription, narrowed to the same compressible subset the spec
//! names: UDP next-header compression only — any other extension header
//! or upper-layer protocol is carried with next-header inline and its
//! bytes copied through uncompressed, not NHC-compressed.

use crate::error::ThreadError;
use crate::ip6::addr::IpAddr;
use crate::ip6::ext_headers::NEXT_HEADER_UDP;
use crate::ip6::header::Ip6Header;
use crate::mac::frame::MacAddress;
use crate::sixlowpan::context::{Context, ContextTable};
use crate::sixlowpan::nhc;

pub const DISPATCH: [u8; 2] = [0x60, 0x00];
pub const DISPATCH_MASK: u8 = 0xe0;

pub const TF_MASK: u8 = 0x18;
pub const TF_TRAFFIC_CLASS: u8 = 0x08;
pub const TF_FLOW_LABEL: u8 = 0x10;

pub const NH: u8 = 0x04;

pub const HLIM_MASK: u8 = 0x03;
pub const HLIM_INLINE: u8 = 0x00;
pub const HLIM_1: u8 = 0x01;
pub const HLIM_64: u8 = 0x02;
pub const HLIM_255: u8 = 0x03;

pub const CID: u8 = 0x80;
pub const SAC: u8 = 0x40;

pub const SAM_MASK: u8 = 0x30;
pub const SAM_MODE1: u8 = 0x10;
pub const SAM_MODE2: u8 = 0x20;
pub const SAM_MODE3: u8 = 0x30;

pub const MULTICAST: u8 = 0x01;
pub const DAC: u8 = 0x04;
pub const DAM_MASK: u8 = 0x03;
pub const DAM_MODE1: u8 = 0x01;
pub const DAM_MODE2: u8 = 0x02;
pub const DAM_MODE3: u8 = 0x03;

/// `0000:00ff:fe00:XXXX` base for a short-address-derived IID.
pub const MAC_BASE: [u8; 8] = [0, 0, 0, 0xff, 0xfe, 0, 0, 0];
pub const MAC_UL: u8 = 0x02;

fn compute_iid(mac_addr: MacAddress) -> [u8; 8] {
    match mac_addr {
        MacAddress::Short(short_addr) => {
            let mut iid = MAC_BASE;
            iid[6] = (short_addr >> 8) as u8;
            iid[7] = short_addr as u8;
            iid
        }
        MacAddress::Long(long_addr) => {
            let mut iid = long_addr;
            iid[0] ^= MAC_UL;
            iid
        }
    }
}

pub struct Decompressed {
    pub header: Ip6Header,
    pub consumed: usize,
    /// Present when the next header was NHC-UDP compressed; the caller
    /// prepends these 8 bytes to the remaining payload to recover a
    /// literal UDP datagram.
    pub udp_header: Option<[u8; 8]>,
}

/// Compresses `header` (with its next-header payload starting at
/// `upper_layer`) into `out`. Returns `(bytes written to out, bytes of
/// `upper_layer` consumed by NHC compression)` — the caller appends the
/// remaining, uncompressed `upper_layer[consumed..]` bytes itself.
pub fn compress<C: crate::config::Config>(
    header: &Ip6Header,
    upper_layer: &[u8],
    src_mac: MacAddress,
    dst_mac: MacAddress,
    ctx_table: &ContextTable<C>,
    out: &mut [u8],
) -> Result<(usize, usize), ThreadError> {
    if out.len() < 2 {
        return Err(ThreadError::NoBufs);
    }
    out[0..2].copy_from_slice(&DISPATCH);
    let mut offset = 2usize;

    let src_ctx = ctx_table.get_by_addr(&header.src).filter(|c| c.compress);
    let dst_ctx = if header.dst.is_multicast() {
        None
    } else {
        ctx_table.get_by_addr(&header.dst).filter(|c| c.compress)
    };

    compress_cie(&src_ctx, &dst_ctx, out, &mut offset)?;
    compress_tf(header, out, &mut offset)?;

    let is_nhc = header.next_header == NEXT_HEADER_UDP;
    compress_nh(header, is_nhc, out, &mut offset)?;
    compress_hl(header, out, &mut offset)?;
    compress_src(&header.src, src_mac, &src_ctx, out, &mut offset)?;

    if header.dst.is_multicast() {
        compress_multicast(&header.dst, &dst_ctx, out, &mut offset)?;
    } else {
        compress_dst(&header.dst, dst_mac, &dst_ctx, out, &mut offset)?;
    }

    let mut consumed = 0;
    if is_nhc {
        if upper_layer.len() < 8 {
            return Err(ThreadError::Parse);
        }
        if out.len() < offset + 1 {
            return Err(ThreadError::NoBufs);
        }
        let nhc_offset = offset;
        offset += 1;
        let udp_header = &upper_layer[0..8];
        let mut nhc_byte = nhc::DISPATCH_UDP;
        nhc_byte |= compress_udp_ports(udp_header, out, &mut offset)?;
        nhc_byte |= compress_udp_checksum(udp_header, out, &mut offset)?;
        out[nhc_offset] = nhc_byte;
        consumed = 8;
    }

    Ok((offset, consumed))
}

fn compress_cie(
    src_ctx: &Option<Context>,
    dst_ctx: &Option<Context>,
    out: &mut [u8],
    offset: &mut usize,
) -> Result<(), ThreadError> {
    let mut cie = 0u8;
    if let Some(ctx) = src_ctx {
        if ctx.id != 0 {
            cie |= ctx.id << 4;
        }
    }
    if let Some(ctx) = dst_ctx {
        if ctx.id != 0 {
            cie |= ctx.id;
        }
    }
    if cie != 0 {
        if out.len() < *offset + 1 {
            return Err(ThreadError::NoBufs);
        }
        out[1] |= CID;
        out[*offset] = cie;
        *offset += 1;
    }
    Ok(())
}

fn compress_tf(header: &Ip6Header, out: &mut [u8], offset: &mut usize) -> Result<(), ThreadError> {
    let traffic_class = header.traffic_class();
    let flow_label = header.flow_label();
    let mut tf_encoding = 0u8;

    if flow_label == 0 {
        tf_encoding |= TF_FLOW_LABEL;
    }
    if traffic_class == 0 {
        tf_encoding |= TF_TRAFFIC_CLASS;
    }

    let need = match (tf_encoding & TF_FLOW_LABEL != 0, tf_encoding & TF_TRAFFIC_CLASS != 0) {
        (true, true) => 0,
        (true, false) => 1,
        (false, true) => 3,
        (false, false) => 4,
    };
    if out.len() < *offset + need {
        return Err(ThreadError::NoBufs);
    }
    match (tf_encoding & TF_FLOW_LABEL != 0, tf_encoding & TF_TRAFFIC_CLASS != 0) {
        (true, true) => {}
        (true, false) => {
            out[*offset] = traffic_class;
            *offset += 1;
        }
        (false, true) => {
            let fl = flow_label.to_be_bytes();
            out[*offset] = fl[1] & 0x0f;
            out[*offset + 1] = fl[2];
            out[*offset + 2] = fl[3];
            *offset += 3;
        }
        (false, false) => {
            let fl = flow_label.to_be_bytes();
            out[*offset] = traffic_class;
            out[*offset + 1] = fl[1] & 0x0f;
            out[*offset + 2] = fl[2];
            out[*offset + 3] = fl[3];
            *offset += 4;
        }
    }
    out[0] |= tf_encoding;
    Ok(())
}

fn compress_nh(header: &Ip6Header, is_nhc: bool, out: &mut [u8], offset: &mut usize) -> Result<(), ThreadError> {
    if is_nhc {
        out[0] |= NH;
    } else {
        if out.len() < *offset + 1 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = header.next_header;
        *offset += 1;
    }
    Ok(())
}

fn compress_hl(header: &Ip6Header, out: &mut [u8], offset: &mut usize) -> Result<(), ThreadError> {
    let flag = match header.hop_limit {
        1 => HLIM_1,
        64 => HLIM_64,
        255 => HLIM_255,
        other => {
            if out.len() < *offset + 1 {
                return Err(ThreadError::NoBufs);
            }
            out[*offset] = other;
            *offset += 1;
            HLIM_INLINE
        }
    };
    out[0] |= flag;
    Ok(())
}

fn compress_src(
    src: &IpAddr,
    src_mac: MacAddress,
    src_ctx: &Option<Context>,
    out: &mut [u8],
    offset: &mut usize,
) -> Result<(), ThreadError> {
    if src.is_unspecified() {
        out[1] |= SAC;
        Ok(())
    } else if src.is_link_local() {
        compress_iid(src, src_mac, true, out, offset)
    } else if src_ctx.is_some() {
        out[1] |= SAC;
        compress_iid(src, src_mac, true, out, offset)
    } else {
        if out.len() < *offset + 16 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 16].copy_from_slice(&src.0);
        *offset += 16;
        Ok(())
    }
}

fn compress_dst(
    dst: &IpAddr,
    dst_mac: MacAddress,
    dst_ctx: &Option<Context>,
    out: &mut [u8],
    offset: &mut usize,
) -> Result<(), ThreadError> {
    if dst.is_link_local() {
        compress_iid(dst, dst_mac, false, out, offset)
    } else if dst_ctx.is_some() {
        out[1] |= DAC;
        compress_iid(dst, dst_mac, false, out, offset)
    } else {
        if out.len() < *offset + 16 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 16].copy_from_slice(&dst.0);
        *offset += 16;
        Ok(())
    }
}

fn compress_iid(
    addr: &IpAddr,
    mac_addr: MacAddress,
    is_src: bool,
    out: &mut [u8],
    offset: &mut usize,
) -> Result<(), ThreadError> {
    let iid = compute_iid(mac_addr);
    if addr.iid() == iid {
        out[1] |= if is_src { SAM_MODE3 } else { DAM_MODE3 };
        Ok(())
    } else if addr.0[8..14] == MAC_BASE[0..6] {
        out[1] |= if is_src { SAM_MODE2 } else { DAM_MODE2 };
        if out.len() < *offset + 2 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 2].copy_from_slice(&addr.0[14..16]);
        *offset += 2;
        Ok(())
    } else {
        out[1] |= if is_src { SAM_MODE1 } else { DAM_MODE1 };
        if out.len() < *offset + 8 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 8].copy_from_slice(&addr.0[8..16]);
        *offset += 8;
        Ok(())
    }
}

fn compress_multicast(
    dst: &IpAddr,
    dst_ctx: &Option<Context>,
    out: &mut [u8],
    offset: &mut usize,
) -> Result<(), ThreadError> {
    out[1] |= MULTICAST;
    if dst_ctx.is_some() {
        out[1] |= DAC;
        if out.len() < *offset + 6 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 2].copy_from_slice(&dst.0[1..3]);
        out[*offset + 2..*offset + 6].copy_from_slice(&dst.0[12..16]);
        *offset += 6;
        return Ok(());
    }
    let all_zero = |s: &[u8]| s.iter().all(|&b| b == 0);
    if dst.0[1] == 0x02 && all_zero(&dst.0[2..15]) {
        out[1] |= DAM_MODE3;
        if out.len() < *offset + 1 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = dst.0[15];
        *offset += 1;
    } else if !all_zero(&dst.0[2..11]) {
        if out.len() < *offset + 16 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 16].copy_from_slice(&dst.0);
        *offset += 16;
    } else if !all_zero(&dst.0[11..13]) {
        out[1] |= DAM_MODE1;
        if out.len() < *offset + 6 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = dst.0[1];
        out[*offset + 1..*offset + 6].copy_from_slice(&dst.0[11..16]);
        *offset += 6;
    } else {
        out[1] |= DAM_MODE2;
        if out.len() < *offset + 4 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = dst.0[1];
        out[*offset + 1..*offset + 4].copy_from_slice(&dst.0[13..16]);
        *offset += 4;
    }
    Ok(())
}

fn compress_udp_ports(udp_header: &[u8], out: &mut [u8], offset: &mut usize) -> Result<u8, ThreadError> {
    let src_port = u16::from_be_bytes([udp_header[0], udp_header[1]]);
    let dst_port = u16::from_be_bytes([udp_header[2], udp_header[3]]);
    let mut flags = 0u8;
    if (src_port & !nhc::UDP_SHORT_PORT_MASK) == nhc::UDP_PORT_PREFIX
        && (dst_port & !nhc::UDP_SHORT_PORT_MASK) == nhc::UDP_PORT_PREFIX
    {
        flags |= nhc::UDP_SRC_PORT_FLAG | nhc::UDP_DST_PORT_FLAG;
        if out.len() < *offset + 1 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = ((src_port & 0xf) as u8) | (((dst_port & 0xf) as u8) << 4);
        *offset += 1;
    } else if (src_port & !nhc::UDP_PORT_MASK) == nhc::UDP_PORT_PREFIX {
        flags |= nhc::UDP_SRC_PORT_FLAG;
        if out.len() < *offset + 3 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset] = src_port as u8;
        out[*offset + 1..*offset + 3].copy_from_slice(&udp_header[2..4]);
        *offset += 3;
    } else if (dst_port & !nhc::UDP_PORT_MASK) == nhc::UDP_PORT_PREFIX {
        flags |= nhc::UDP_DST_PORT_FLAG;
        if out.len() < *offset + 3 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 2].copy_from_slice(&udp_header[0..2]);
        out[*offset + 2] = dst_port as u8;
        *offset += 3;
    } else {
        if out.len() < *offset + 4 {
            return Err(ThreadError::NoBufs);
        }
        out[*offset..*offset + 4].copy_from_slice(&udp_header[0..4]);
        *offset += 4;
    }
    Ok(flags)
}

fn compress_udp_checksum(udp_header: &[u8], out: &mut [u8], offset: &mut usize) -> Result<u8, ThreadError> {
    // Checksum elision (the "equivalent link integrity" case spec §4.3
    // allows) is not implemented: this stack always has a CRC-checked
    // radio link but no notion of a trusted lower layer to elide on, so
    // the checksum is always carried inline.
    if out.len() < *offset + 2 {
        return Err(ThreadError::NoBufs);
    }
    out[*offset..*offset + 2].copy_from_slice(&udp_header[6..8]);
    *offset += 2;
    Ok(0)
}

/// Decompresses a LOWPAN_IPHC header in `buf` using the given MAC
/// addresses (for IID reconstruction) and context table (for CID
/// lookups). `buf` must start at the IPHC dispatch byte.
pub fn decompress<C: crate::config::Config>(
    buf: &[u8],
    src_mac: MacAddress,
    dst_mac: MacAddress,
    ctx_table: &ContextTable<C>,
) -> Result<Decompressed, ThreadError> {
    if buf.len() < 2 || (buf[0] & DISPATCH_MASK) != DISPATCH[0] {
        return Err(ThreadError::Parse);
    }
    let b0 = buf[0];
    let b1 = buf[1];
    let mut offset = 2usize;

    let (src_cid, dst_cid) = if b1 & CID != 0 {
        if buf.len() < offset + 1 {
            return Err(ThreadError::Parse);
        }
        let cie = buf[offset];
        offset += 1;
        (cie >> 4, cie & 0xf)
    } else {
        (0, 0)
    };

    let mut header = Ip6Header::new();
    decompress_tf(&mut header, b0, buf, &mut offset)?;

    let is_nhc = b0 & NH != 0;
    if !is_nhc {
        if buf.len() < offset + 1 {
            return Err(ThreadError::Parse);
        }
        header.set_next_header(buf[offset]);
        offset += 1;
    }

    decompress_hl(&mut header, b0, buf, &mut offset)?;

    let src_ctx = if b1 & SAC != 0 {
        ctx_table.get_by_id(src_cid)
    } else {
        None
    };
    header.src = decompress_src(b1, src_mac, &src_ctx, buf, &mut offset)?;

    let dst_ctx = if b1 & DAC != 0 {
        ctx_table.get_by_id(dst_cid)
    } else {
        None
    };
    header.dst = if b1 & MULTICAST != 0 {
        decompress_multicast(b1, &dst_ctx, buf, &mut offset)?
    } else {
        decompress_dst(b1, dst_mac, &dst_ctx, buf, &mut offset)?
    };

    let udp_header = if is_nhc {
        if buf.len() < offset + 1 {
            return Err(ThreadError::Parse);
        }
        let nhc_byte = buf[offset];
        offset += 1;
        if (nhc_byte & nhc::DISPATCH_UDP_MASK) != nhc::DISPATCH_UDP {
            return Err(ThreadError::Parse);
        }
        header.set_next_header(NEXT_HEADER_UDP);
        Some(decompress_udp(nhc_byte, buf, &mut offset)?)
    } else {
        None
    };

    Ok(Decompressed {
        header,
        consumed: offset,
        udp_header,
    })
}

fn decompress_tf(header: &mut Ip6Header, b0: u8, buf: &[u8], offset: &mut usize) -> Result<(), ThreadError> {
    let fl_elided = b0 & TF_FLOW_LABEL != 0;
    let tc_elided = b0 & TF_TRAFFIC_CLASS != 0;
    match (fl_elided, tc_elided) {
        (true, true) => {}
        (true, false) => {
            if buf.len() < *offset + 1 {
                return Err(ThreadError::Parse);
            }
            header.set_dscp(buf[*offset] >> 2);
            header.set_ecn(buf[*offset] & 0x3);
            *offset += 1;
        }
        (false, true) => {
            if buf.len() < *offset + 3 {
                return Err(ThreadError::Parse);
            }
            header.set_ecn(buf[*offset] >> 6);
            let fl = u32::from_be_bytes([0, buf[*offset] & 0x0f, buf[*offset + 1], buf[*offset + 2]]);
            header.set_flow_label(fl);
            *offset += 3;
        }
        (false, false) => {
            if buf.len() < *offset + 4 {
                return Err(ThreadError::Parse);
            }
            header.set_dscp(buf[*offset] >> 2);
            header.set_ecn(buf[*offset] & 0x3);
            let fl = u32::from_be_bytes([0, buf[*offset + 1] & 0x0f, buf[*offset + 2], buf[*offset + 3]]);
            header.set_flow_label(fl);
            *offset += 4;
        }
    }
    Ok(())
}

fn decompress_hl(header: &mut Ip6Header, b0: u8, buf: &[u8], offset: &mut usize) -> Result<(), ThreadError> {
    let hop_limit = match b0 & HLIM_MASK {
        HLIM_1 => 1,
        HLIM_64 => 64,
        HLIM_255 => 255,
        _ => {
            if buf.len() < *offset + 1 {
                return Err(ThreadError::Parse);
            }
            let hl = buf[*offset];
            *offset += 1;
            hl
        }
    };
    header.set_hop_limit(hop_limit);
    Ok(())
}

fn decompress_iid_inline(mac_addr: MacAddress, mode: u8, buf: &[u8], offset: &mut usize) -> Result<[u8; 8], ThreadError> {
    match mode {
        SAM_MODE3 | DAM_MODE3 => Ok(compute_iid(mac_addr)),
        SAM_MODE2 | DAM_MODE2 => {
            if buf.len() < *offset + 2 {
                return Err(ThreadError::Parse);
            }
            let mut iid = MAC_BASE;
            iid[6] = buf[*offset];
            iid[7] = buf[*offset + 1];
            *offset += 2;
            Ok(iid)
        }
        SAM_MODE1 | DAM_MODE1 => {
            if buf.len() < *offset + 8 {
                return Err(ThreadError::Parse);
            }
            let mut iid = [0u8; 8];
            iid.copy_from_slice(&buf[*offset..*offset + 8]);
            *offset += 8;
            Ok(iid)
        }
        _ => Err(ThreadError::Parse),
    }
}

fn decompress_src(
    b1: u8,
    src_mac: MacAddress,
    src_ctx: &Option<Context>,
    buf: &[u8],
    offset: &mut usize,
) -> Result<IpAddr, ThreadError> {
    if b1 & SAC != 0 {
        let mode = b1 & SAM_MASK;
        if mode == 0 {
            return Ok(IpAddr::new());
        }
        let iid = decompress_iid_inline(src_mac, mode, buf, offset)?;
        let mut addr = IpAddr::new();
        if let Some(ctx) = src_ctx {
            addr = ctx.prefix;
        }
        addr.set_iid(&iid);
        Ok(addr)
    } else {
        let mode = b1 & SAM_MASK;
        if mode == 0 {
            if buf.len() < *offset + 16 {
                return Err(ThreadError::Parse);
            }
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&buf[*offset..*offset + 16]);
            *offset += 16;
            return Ok(IpAddr(raw));
        }
        let iid = decompress_iid_inline(src_mac, mode, buf, offset)?;
        Ok(IpAddr::link_local_from_iid(&iid))
    }
}

fn decompress_dst(
    b1: u8,
    dst_mac: MacAddress,
    dst_ctx: &Option<Context>,
    buf: &[u8],
    offset: &mut usize,
) -> Result<IpAddr, ThreadError> {
    let mode = b1 & DAM_MASK;
    if b1 & DAC != 0 {
        let iid = decompress_iid_inline(dst_mac, dam_to_sam(mode), buf, offset)?;
        let mut addr = IpAddr::new();
        if let Some(ctx) = dst_ctx {
            addr = ctx.prefix;
        }
        addr.set_iid(&iid);
        Ok(addr)
    } else if mode == 0 {
        if buf.len() < *offset + 16 {
            return Err(ThreadError::Parse);
        }
        let mut raw = [0u8; 16];
        raw.copy_from_slice(&buf[*offset..*offset + 16]);
        *offset += 16;
        Ok(IpAddr(raw))
    } else {
        let iid = decompress_iid_inline(dst_mac, dam_to_sam(mode), buf, offset)?;
        Ok(IpAddr::link_local_from_iid(&iid))
    }
}

fn dam_to_sam(mode: u8) -> u8 {
    match mode {
        DAM_MODE1 => SAM_MODE1,
        DAM_MODE2 => SAM_MODE2,
        DAM_MODE3 => SAM_MODE3,
        other => other,
    }
}

fn decompress_multicast(b1: u8, dst_ctx: &Option<Context>, buf: &[u8], offset: &mut usize) -> Result<IpAddr, ThreadError> {
    let mode = b1 & DAM_MASK;
    if b1 & DAC != 0 {
        if mode != 0 {
            return Err(ThreadError::Parse);
        }
        if buf.len() < *offset + 6 {
            return Err(ThreadError::Parse);
        }
        let mut raw = [0u8; 16];
        raw[0] = 0xff;
        raw[1] = buf[*offset];
        raw[2] = buf[*offset + 1];
        if let Some(ctx) = dst_ctx {
            raw[4..12].copy_from_slice(&ctx.prefix.0[4..12]);
        }
        raw[12..16].copy_from_slice(&buf[*offset + 2..*offset + 6]);
        *offset += 6;
        return Ok(IpAddr(raw));
    }
    match mode {
        DAM_MODE3 => {
            if buf.len() < *offset + 1 {
                return Err(ThreadError::Parse);
            }
            let mut raw = [0u8; 16];
            raw[0] = 0xff;
            raw[1] = 0x02;
            raw[15] = buf[*offset];
            *offset += 1;
            Ok(IpAddr(raw))
        }
        DAM_MODE1 => {
            if buf.len() < *offset + 6 {
                return Err(ThreadError::Parse);
            }
            let mut raw = [0u8; 16];
            raw[0] = 0xff;
            raw[1] = buf[*offset];
            raw[11..16].copy_from_slice(&buf[*offset + 1..*offset + 6]);
            *offset += 6;
            Ok(IpAddr(raw))
        }
        DAM_MODE2 => {
            if buf.len() < *offset + 4 {
                return Err(ThreadError::Parse);
            }
            let mut raw = [0u8; 16];
            raw[0] = 0xff;
            raw[1] = buf[*offset];
            raw[13..16].copy_from_slice(&buf[*offset + 1..*offset + 4]);
            *offset += 4;
            Ok(IpAddr(raw))
        }
        _ => {
            if buf.len() < *offset + 16 {
                return Err(ThreadError::Parse);
            }
            let mut raw = [0u8; 16];
            raw.copy_from_slice(&buf[*offset..*offset + 16]);
            *offset += 16;
            Ok(IpAddr(raw))
        }
    }
}

fn decompress_udp(nhc_byte: u8, buf: &[u8], offset: &mut usize) -> Result<[u8; 8], ThreadError> {
    let mut udp = [0u8; 8];
    let src_flag = nhc_byte & nhc::UDP_SRC_PORT_FLAG != 0;
    let dst_flag = nhc_byte & nhc::UDP_DST_PORT_FLAG != 0;
    match (src_flag, dst_flag) {
        (true, true) => {
            if buf.len() < *offset + 1 {
                return Err(ThreadError::Parse);
            }
            let b = buf[*offset];
            *offset += 1;
            let src_port = nhc::UDP_PORT_PREFIX | ((b & 0xf) as u16);
            let dst_port = nhc::UDP_PORT_PREFIX | (((b >> 4) & 0xf) as u16);
            udp[0..2].copy_from_slice(&src_port.to_be_bytes());
            udp[2..4].copy_from_slice(&dst_port.to_be_bytes());
        }
        (true, false) => {
            if buf.len() < *offset + 3 {
                return Err(ThreadError::Parse);
            }
            let src_port = nhc::UDP_PORT_PREFIX | (buf[*offset] as u16);
            udp[0..2].copy_from_slice(&src_port.to_be_bytes());
            udp[2..4].copy_from_slice(&buf[*offset + 1..*offset + 3]);
            *offset += 3;
        }
        (false, true) => {
            if buf.len() < *offset + 3 {
                return Err(ThreadError::Parse);
            }
            udp[0..2].copy_from_slice(&buf[*offset..*offset + 2]);
            let dst_port = nhc::UDP_PORT_PREFIX | (buf[*offset + 2] as u16);
            udp[2..4].copy_from_slice(&dst_port.to_be_bytes());
            *offset += 3;
        }
        (false, false) => {
            if buf.len() < *offset + 4 {
                return Err(ThreadError::Parse);
            }
            udp[0..4].copy_from_slice(&buf[*offset..*offset + 4]);
            *offset += 4;
        }
    }
    if nhc_byte & nhc::UDP_CHKSUM_FLAG != 0 {
        return Err(ThreadError::Parse);
    }
    if buf.len() < *offset + 2 {
        return Err(ThreadError::Parse);
    }
    udp[6..8].copy_from_slice(&buf[*offset..*offset + 2]);
    *offset += 2;
    Ok(udp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DefaultConfig;

    fn ctx_table() -> ContextTable<DefaultConfig> {
        ContextTable::new(IpAddr::new(), 64)
    }

    #[test]
    fn link_local_udp_round_trips() {
        let src_mac = MacAddress::Long([1, 2, 3, 4, 5, 6, 7, 8]);
        let dst_mac = MacAddress::Long([8, 7, 6, 5, 4, 3, 2, 1]);
        let mut header = Ip6Header::new();
        header.src = IpAddr::link_local_from_extended(&[1, 2, 3, 4, 5, 6, 7, 8]);
        header.dst = IpAddr::link_local_from_extended(&[8, 7, 6, 5, 4, 3, 2, 1]);
        header.set_next_header(NEXT_HEADER_UDP);
        header.set_hop_limit(64);

        let udp = [0xf0, 0xb1, 0xf0, 0xb2, 0, 8, 0xab, 0xcd];
        let table = ctx_table();
        let mut buf = [0u8; 64];
        let (written, consumed) = compress(&header, &udp, src_mac, dst_mac, &table, &mut buf).unwrap();
        assert_eq!(consumed, 8);

        let decompressed = decompress(&buf[..written], src_mac, dst_mac, &table).unwrap();
        assert_eq!(decompressed.consumed, written);
        assert_eq!(decompressed.header.src, header.src);
        assert_eq!(decompressed.header.dst, header.dst);
        assert_eq!(decompressed.header.hop_limit, 64);
        assert_eq!(decompressed.header.next_header, NEXT_HEADER_UDP);
        assert_eq!(decompressed.udp_header.unwrap(), udp);
    }

    #[test]
    fn full_address_and_nonstandard_hop_limit_round_trip() {
        let src_mac = MacAddress::Short(1);
        let dst_mac = MacAddress::Short(2);
        let mut header = Ip6Header::new();
        header.src = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14]);
        header.dst = IpAddr([0xfd, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 15]);
        header.set_hop_limit(200);
        header.set_next_header(58);

        let table = ctx_table();
        let mut buf = [0u8; 64];
        let (written, consumed) = compress(&header, &[], src_mac, dst_mac, &table, &mut buf).unwrap();
        assert_eq!(consumed, 0);
        let decompressed = decompress(&buf[..written], src_mac, dst_mac, &table).unwrap();
        assert_eq!(decompressed.header.src, header.src);
        assert_eq!(decompressed.header.dst, header.dst);
        assert_eq!(decompressed.header.hop_limit, 200);
        assert_eq!(decompressed.header.next_header, 58);
    }
}
