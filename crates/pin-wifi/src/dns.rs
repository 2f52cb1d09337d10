//! The captive-portal DNS catch-all: every query gets a single A-record
//! answer pointing at the AP gateway, preserving the transaction id and
//! echoing the question section verbatim.

use crate::ap::AP_IP;
use crate::error::WifiError;

const TTL_SECS: u32 = 60;
const TYPE_A: u16 = 1;
const CLASS_IN: u16 = 1;

/// Builds a DNS response redirecting `query`'s question to `AP_IP`.
/// `query` must be a well-formed DNS message with exactly one question;
/// the header's QR/AA/RA bits are set appropriately and ANCOUNT becomes 1.
pub fn build_catch_all_response(query: &[u8]) -> Result<Vec<u8>, WifiError> {
    if query.len() < 12 {
        return Err(WifiError::InvalidArgument("DNS query shorter than header".to_string()));
    }
    let txn_id = &query[0..2];
    let qdcount = u16::from_be_bytes([query[4], query[5]]);
    if qdcount != 1 {
        return Err(WifiError::InvalidArgument(format!("expected exactly one question, got {qdcount}")));
    }

    let question_start = 12;
    let mut pos = question_start;
    while pos < query.len() && query[pos] != 0 {
        let label_len = query[pos] as usize;
        pos += 1 + label_len;
    }
    if pos >= query.len() {
        return Err(WifiError::InvalidArgument("truncated question name".to_string()));
    }
    pos += 1; // root label terminator
    pos += 4; // QTYPE + QCLASS
    if pos > query.len() {
        return Err(WifiError::InvalidArgument("truncated question".to_string()));
    }
    let question = &query[question_start..pos];

    let mut out = Vec::with_capacity(pos + 16);
    out.extend_from_slice(txn_id);
    out.extend_from_slice(&[0x81, 0x80]); // QR=1, opcode=0, AA=1, RD=1, RA=1
    out.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
    out.extend_from_slice(&1u16.to_be_bytes()); // ANCOUNT
    out.extend_from_slice(&0u16.to_be_bytes()); // NSCOUNT
    out.extend_from_slice(&0u16.to_be_bytes()); // ARCOUNT
    out.extend_from_slice(question);

    out.extend_from_slice(&[0xc0, 0x0c]); // name pointer back to the question
    out.extend_from_slice(&TYPE_A.to_be_bytes());
    out.extend_from_slice(&CLASS_IN.to_be_bytes());
    out.extend_from_slice(&TTL_SECS.to_be_bytes());
    out.extend_from_slice(&4u16.to_be_bytes()); // RDLENGTH
    for octet in AP_IP.split('.') {
        out.push(octet.parse::<u8>().expect("AP_IP is a valid dotted quad"));
    }
    Ok(out)
}

fn build_query(txn_id: u16, name: &str) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&txn_id.to_be_bytes());
    out.extend_from_slice(&[0x01, 0x00]); // RD=1
    out.extend_from_slice(&1u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    for label in name.split('.') {
        out.push(label.len() as u8);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    out.extend_from_slice(&TYPE_A.to_be_bytes());
    out.extend_from_slice(&CLASS_IN.to_be_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preserves_txn_id_and_answers_ap_ip() {
        let query = build_query(0xBEEF, "captive.example.com");
        let response = build_catch_all_response(&query).unwrap();
        assert_eq!(&response[0..2], &0xBEEFu16.to_be_bytes());
        let rdata = &response[response.len() - 4..];
        assert_eq!(rdata, &[192, 168, 4, 1]);
    }

    #[test]
    fn ttl_field_is_sixty() {
        let query = build_query(1, "x.test");
        let response = build_catch_all_response(&query).unwrap();
        let ttl_offset = response.len() - 4 - 2 - 4;
        let ttl = u32::from_be_bytes(response[ttl_offset..ttl_offset + 4].try_into().unwrap());
        assert_eq!(ttl, 60);
    }

    #[test]
    fn rejects_multi_question_query() {
        let mut query = build_query(1, "a.test");
        query[5] = 2; // QDCOUNT = 2
        assert!(build_catch_all_response(&query).is_err());
    }
}
