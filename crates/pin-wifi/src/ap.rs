//! AP-mode SSID formatting and validation: `Pin-Device-XXXX` where `XXXX`
//! is the last two MAC bytes, uppercase hex.

pub const AP_SSID_PREFIX: &str = "Pin-Device-";
pub const AP_IP: &str = "192.168.4.1";
pub const AP_NETMASK: &str = "255.255.255.0";

pub fn format_ap_ssid(mac: [u8; 6]) -> String {
    format!("{AP_SSID_PREFIX}{:02X}{:02X}", mac[4], mac[5])
}

pub fn is_valid_ap_ssid(ssid: &str) -> bool {
    let Some(suffix) = ssid.strip_prefix(AP_SSID_PREFIX) else {
        return false;
    };
    suffix.len() == 4 && suffix.chars().all(|c| c.is_ascii_hexdigit())
}
