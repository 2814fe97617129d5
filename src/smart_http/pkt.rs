use super::Service;

/// Flush packet terminating a pkt-line section.
pub const FLUSH_PKT: &[u8] = b"0000";

/// Frame `payload` as one pkt-line: four lowercase hex digits giving the
/// total length including the prefix, then the payload.
pub fn encode_pkt_line(payload: &[u8]) -> Vec<u8> {
    let mut out = format!("{:04x}", payload.len() + 4).into_bytes();
    out.extend_from_slice(payload);
    out
}

/// The `# service=...` line and flush packet that precede the ref
/// advertisement in a Smart HTTP `info/refs` response.
pub fn advertisement_preamble(service: Service) -> Vec<u8> {
    let line = format!("# service={}\n", service.name());
    let mut out = encode_pkt_line(line.as_bytes());
    out.extend_from_slice(FLUSH_PKT);
    out
}
