//! Fixed canonical vectors for the entry signing payload.
//!
//! Any implementation that signs or anchors entries must reproduce these
//! bytes exactly, otherwise signatures stop verifying across implementations.

use lbx_core::{
    canonicalize, hash, AnchorProof, Entry, HashAlgorithm, IdentityDescriptor, NiUri,
    ProtectedHeader, SignatureProof, StorageDescriptor, StorageLocation, Timestamp,
};
use serde_json::json;

fn vector_entry() -> Entry {
    Entry::builder()
        .id("3f2b8c1e-9a4d-4c6e-8f10-2b7d5e9a1c34")
        .version("1.0")
        .storage(StorageDescriptor {
            protocol: "ipfs".to_string(),
            integrity_proof: NiUri::for_content(HashAlgorithm::Sha256, b"hello world"),
            media_type: "application/pdf".to_string(),
            size_bytes: 11,
            location: StorageLocation {
                region: "us-east-1".to_string(),
                jurisdiction: "US/DE".to_string(),
                provider: "IPFS".to_string(),
            },
        })
        .identity(IdentityDescriptor {
            org: "did:example:org".to_string(),
            process: None,
            artifact: "quarterly-report".to_string(),
            subject: None,
        })
        .timestamp(Timestamp::parse("2024-05-01T12:00:00Z").unwrap())
        .anchor(AnchorProof {
            chain: "stellar:testnet".to_string(),
            anchor_ref: "a".repeat(64),
            hash_alg: "sha-256".to_string(),
            token_id: None,
            contract_address: None,
            anchored_at: None,
        })
        .signature(SignatureProof {
            protected_header: ProtectedHeader::new("EdDSA", "key-1"),
            signature: "AAAA".to_string(),
        })
        .build()
        .unwrap()
}

#[test]
fn entry_payload_vector() {
    let expected = concat!(
        r#"{"anchor":{"anchor_ref":"aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa","#,
        r#""chain":"stellar:testnet","hash_alg":"sha-256"},"#,
        r#""id":"3f2b8c1e-9a4d-4c6e-8f10-2b7d5e9a1c34","#,
        r#""identity":{"artifact":"quarterly-report","org":"did:example:org"},"#,
        r#""storage":{"integrity_proof":"ni:///sha-256;uU0nuZNNPgilLlLX2n2r-sSE7-N6U4DukIj3rOLvzek","#,
        r#""location":{"jurisdiction":"US/DE","provider":"IPFS","region":"us-east-1"},"#,
        r#""media_type":"application/pdf","protocol":"ipfs","size_bytes":11},"#,
        r#""timestamp":"2024-05-01T12:00:00Z","version":"1.0"}"#
    );
    let entry = vector_entry();
    assert_eq!(entry.canonical_payload().unwrap().as_str(), expected);
    assert_eq!(
        entry.hash(HashAlgorithm::Sha256).unwrap().to_hex(),
        "50ec431d331016cbca9675d6cd773dada53fffa27d33e733db0a0a39593f6f97"
    );
}

#[test]
fn payload_ignores_signature_changes() {
    let mut entry = vector_entry();
    let before = entry.hash(HashAlgorithm::Sha256).unwrap();
    entry.signatures[0].signature = "BBBB".to_string();
    entry.signatures.push(entry.signatures[0].clone());
    assert_eq!(entry.hash(HashAlgorithm::Sha256).unwrap(), before);
}

#[test]
fn parsed_and_built_entries_share_payload() {
    let built = vector_entry();
    let text = serde_json::to_string_pretty(&built).unwrap();
    let parsed: Entry = serde_json::from_str(&text).unwrap();
    assert_eq!(
        parsed.canonical_payload().unwrap(),
        built.canonical_payload().unwrap()
    );
}

#[test]
fn foo_bar_hash_vector() {
    let digest = hash(&json!({"foo": "bar"}), HashAlgorithm::Sha256).unwrap();
    assert_eq!(canonicalize(&json!({"foo": "bar"})).unwrap(), r#"{"foo":"bar"}"#);
    assert_eq!(
        digest.to_hex(),
        "7a38bf81f383f69433ad6e900d35b3e2385593f76a7b7ab5d4355b8ba41ee24b"
    );
}
