#![no_main]

use libfuzzer_sys::fuzz_target;
use sarco_core::{Address, KeyShare, ResourceId, Signature};

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    // Parsing arbitrary text must never panic, and anything accepted
    // must survive a round-trip
    if let Ok(address) = Address::from_hex(s) {
        assert_eq!(Address::from_hex(&address.to_hex()).unwrap(), address);
    }
    if let Ok(id) = ResourceId::from_hex(s) {
        assert_eq!(ResourceId::from_hex(&id.to_hex()).unwrap(), id);
    }
    if let Ok(signature) = Signature::from_hex(s) {
        assert_eq!(Signature::from_hex(&signature.to_hex()).unwrap(), signature);
    }
    if let Ok(share) = KeyShare::from_hex(s) {
        assert_eq!(KeyShare::from_hex(&share.to_hex()).unwrap(), share);
    }
});
