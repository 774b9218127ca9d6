#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use sarco_core::{Commitment, CommitmentMessage, EcdsaVerifier, Signature, SignatureVerifier};

#[derive(Debug, Arbitrary)]
struct Input {
    payload_ref: String,
    share: Vec<u8>,
    maximum_rewrap_interval: u64,
    fee_per_second: u128,
    creation_time: u64,
    curse_fee: u128,
    signature: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let message = CommitmentMessage {
        payload_ref: input.payload_ref,
        commitment: Commitment::for_share(&input.share),
        maximum_rewrap_interval: input.maximum_rewrap_interval,
        fee_per_second: input.fee_per_second,
        creation_time: input.creation_time,
        curse_fee: input.curse_fee,
    };

    // Encoding is deterministic
    assert_eq!(message.encode(), message.encode());
    let digest = message.digest();
    assert_eq!(digest, message.digest());

    // Recovery from arbitrary signature bytes must fail cleanly, never panic
    if input.signature.len() >= 65 {
        let mut bytes = [0u8; 65];
        bytes.copy_from_slice(&input.signature[..65]);
        let signature = Signature::new(bytes);
        if let Ok(signer) = EcdsaVerifier::recover(&digest, &signature) {
            assert!(EcdsaVerifier.verify(&digest, &signer, &signature));
        }
    }
});
