#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use snmp_mib_agent::message::CommunityMessage;

fuzz_target!(|data: &[u8]| {
    // anything that decodes must re-encode and decode to the same message
    if let Ok(message) = CommunityMessage::decode(Bytes::copy_from_slice(data)) {
        let again = CommunityMessage::decode(message.encode());
        assert_eq!(again.ok(), Some(message));
    }
});
