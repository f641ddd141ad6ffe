use proptest::prelude::*;
use shroud_cipher::{wire, Aes256GcmCipher, Cipher, CipherError};

fn setup(namespace: &str) -> (Aes256GcmCipher, shroud_cipher::Key) {
    let cipher = Aes256GcmCipher::new();
    let key = (cipher.key_gen())(namespace, "subject").unwrap();
    (cipher, key)
}

#[test]
fn full_envelope_roundtrip() {
    let (cipher, key) = setup("tenant-a");
    let ct = cipher.encrypt("tenant-a", &key, "56559 Von Divide").unwrap();
    let sealed = wire::seal("kal5430", &ct);
    assert!(wire::is_wire_formatted(&sealed));

    let parts = wire::open(&sealed).unwrap();
    assert_eq!(parts.subject_id, "kal5430");
    let plain = cipher.decrypt("tenant-a", &key, &parts.ciphertext).unwrap();
    assert_eq!(plain, "56559 Von Divide");
}

#[test]
fn tampered_ciphertext_fails_authentication() {
    let (cipher, key) = setup("tenant-a");
    let mut ct = cipher.encrypt("tenant-a", &key, "secret").unwrap();
    let last = ct.len() - 1;
    ct[last] ^= 0x01;
    let err = cipher.decrypt("tenant-a", &key, &ct).unwrap_err();
    assert!(matches!(err, CipherError::DecryptionFailure(_)));
}

proptest! {
    #[test]
    fn roundtrip_any_plaintext(plaintext in ".{0,256}", namespace in "[a-z0-9-]{1,32}") {
        let (cipher, key) = setup(&namespace);
        let ct = cipher.encrypt(&namespace, &key, &plaintext).unwrap();
        let pt = cipher.decrypt(&namespace, &key, &ct).unwrap();
        prop_assert_eq!(pt, plaintext);
    }

    #[test]
    fn cross_namespace_never_decrypts(plaintext in ".{0,64}") {
        let (cipher, key) = setup("tenant-a");
        let ct = cipher.encrypt("tenant-a", &key, &plaintext).unwrap();
        prop_assert!(cipher.decrypt("tenant-b", &key, &ct).is_err());
    }

    #[test]
    fn wire_roundtrip_any_subject(
        subject in ".{1,64}",
        ct in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        let sealed = wire::seal(&subject, &ct);
        prop_assert!(wire::is_wire_formatted(&sealed));
        let parts = wire::open(&sealed).unwrap();
        prop_assert_eq!(parts.subject_id, subject);
        prop_assert_eq!(parts.ciphertext, ct);
    }

    #[test]
    fn wire_open_never_panics(input in ".{0,256}") {
        let _ = wire::open(&input);
    }
}
