//! Device identity: the short id used as a writer log's filename stem and
//! as the `device=` meta line (SPEC_FULL.md §4.8).

use mac_address::MacAddress;
use uuid::Uuid;

/// Derives this host's device id from its hardware address, mirroring the
/// original program's `str(uuid.uuid1(uuid.getnode(), 0))[24:]` — a
/// version-1 UUID seeded with the host's MAC, truncated to its trailing
/// node-id segment (12 hex characters).
///
/// Falls back to a random 48-bit id (formatted the same way) when no MAC
/// address is available, e.g. on a sandboxed or containerized host, so the
/// process still gets a device id that's stable for its own lifetime.
pub fn device_id() -> String {
    match mac_address::get_mac_address() {
        Ok(Some(mac)) => format_node_id(mac),
        _ => format_node_id(random_mac()),
    }
}

fn format_node_id(mac: MacAddress) -> String {
    mac.bytes().iter().map(|b| format!("{b:02x}")).collect()
}

fn random_mac() -> MacAddress {
    let bytes = *Uuid::new_v4().as_bytes();
    MacAddress::new([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]])
}

/// A fresh random file id for a newly created log file (`fileid=` meta
/// line). Unlike the device id, this has no stability requirement: the
/// original program uses a plain `uuid.uuid4()` per file.
pub fn new_file_id() -> String {
    Uuid::new_v4().to_string()
}
