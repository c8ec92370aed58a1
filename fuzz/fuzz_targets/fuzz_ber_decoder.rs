#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_mib_agent::ber::{Decoder, decode_length};

fuzz_target!(|data: &[u8]| {
    let bytes = Bytes::copy_from_slice(data);

    let _ = decode_length(data, 0);

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_integer();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_octet_string();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_null();

    let mut decoder = Decoder::new(bytes.clone());
    let _ = decoder.read_oid();

    // walk every TLV in a sequence without interpreting it
    let mut decoder = Decoder::new(bytes);
    if let Ok(mut seq) = decoder.read_sequence() {
        while !seq.is_empty() {
            if seq.skip_tlv().is_err() {
                break;
            }
        }
    }
});
