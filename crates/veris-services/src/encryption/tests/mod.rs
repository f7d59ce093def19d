// Path: crates/veris-services/src/encryption/tests/mod.rs
use super::*;
use veris_crypto::{LocalKeyReencryptor, NaclPrimitives};
use veris_test_utils::{
    fixture_keypair, open_envelope, seal_envelope, test_ctx, CountingHooks, FailingEmitter,
    MemoryState, RecordingEmitter,
};
use veris_types::app::{
    EncryptionEvent, ReencryptionJobStatus, RotationState, RotationStatus,
    ALG_X25519_XSALSA20_POLY1305,
};
use veris_types::keys as state_keys;

const SENDER_SEED: [u8; 32] = [42; 32];

fn addr(byte: u8) -> AccountId {
    AccountId([byte; 32])
}

fn authority() -> AccountId {
    addr(0xEE)
}

struct Harness {
    module: EncryptionModule,
    emitter: Arc<RecordingEmitter>,
    hooks: Arc<CountingHooks>,
    state: MemoryState,
}

fn harness_with_params(params: EncryptionParams) -> Harness {
    let emitter = Arc::new(RecordingEmitter::new());
    let hooks = Arc::new(CountingHooks::new());
    let module = EncryptionModule::new(
        Some(authority()),
        emitter.clone(),
        hooks.clone(),
        Arc::new(NaclPrimitives::new()),
    );
    let mut state = MemoryState::new();
    module.set_params(&mut state, &params).unwrap();
    Harness {
        module,
        emitter,
        hooks,
        state,
    }
}

fn harness() -> Harness {
    harness_with_params(EncryptionParams::default())
}

fn worker_for(keys: &[&veris_test_utils::FixtureKeyPair]) -> LocalKeyReencryptor<NaclPrimitives> {
    let mut worker = LocalKeyReencryptor::new(NaclPrimitives::new(), SENDER_SEED).unwrap();
    for key in keys {
        worker.add_recipient_key(key.fingerprint.clone(), key.private_key.clone());
    }
    worker
}

fn rotation_states(state: &MemoryState) -> Vec<RotationState> {
    state
        .prefix_scan(state_keys::ROTATION_STATE_PREFIX)
        .unwrap()
        .map(|entry| {
            let (_, value) = entry.unwrap();
            veris_types::codec::from_bytes_canonical(&value).unwrap()
        })
        .collect()
}

// --- registry ---

#[test]
fn test_register_then_lookup_round_trip() {
    let mut h = harness();
    let owner = addr(1);
    let pair = fixture_keypair(1);

    let fingerprint = h
        .module
        .register_recipient_key(
            &mut h.state,
            &owner,
            &pair.public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "laptop",
            1000,
        )
        .unwrap();
    assert_eq!(fingerprint, pair.fingerprint);

    let key = h
        .module
        .get_recipient_key_by_fingerprint(&h.state, &fingerprint)
        .unwrap();
    assert_eq!(key.address, owner);
    assert_eq!(key.version, 1);
    assert_eq!(key.registered_at, 1000);
    assert_eq!(key.label, "laptop");
    assert!(key.is_usable(5000));

    let active = h
        .module
        .get_active_recipient_key(&mut h.state, &owner, 1000)
        .unwrap();
    assert_eq!(active.fingerprint, fingerprint);

    assert!(matches!(
        h.emitter.events().as_slice(),
        [EncryptionEvent::KeyRegistered { version: 1, .. }]
    ));
}

#[test]
fn test_register_rejects_bad_inputs() {
    let mut h = harness();
    let owner = addr(1);
    let pair = fixture_keypair(1);

    let short = vec![0u8; 31];
    assert!(matches!(
        h.module
            .register_recipient_key(&mut h.state, &owner, &short, ALG_X25519_XSALSA20_POLY1305, "", 1000)
            .unwrap_err(),
        EncryptionError::InvalidPublicKey(_)
    ));
    let long = vec![0u8; 33];
    assert!(matches!(
        h.module
            .register_recipient_key(&mut h.state, &owner, &long, ALG_X25519_XSALSA20_POLY1305, "", 1000)
            .unwrap_err(),
        EncryptionError::InvalidPublicKey(_)
    ));
    assert!(matches!(
        h.module
            .register_recipient_key(&mut h.state, &owner, &pair.public_key, "NOT-AN-ALGORITHM", "", 1000)
            .unwrap_err(),
        EncryptionError::UnsupportedAlgorithm(_)
    ));

    h.module
        .register_recipient_key(
            &mut h.state,
            &owner,
            &pair.public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "",
            1000,
        )
        .unwrap();
    // Same key again, from any account, collides on the fingerprint.
    assert!(matches!(
        h.module
            .register_recipient_key(
                &mut h.state,
                &addr(2),
                &pair.public_key,
                ALG_X25519_XSALSA20_POLY1305,
                "",
                1000
            )
            .unwrap_err(),
        EncryptionError::KeyAlreadyExists(_)
    ));
}

#[test]
fn test_register_enforces_per_account_key_limit() {
    let mut params = EncryptionParams::default();
    params.max_keys_per_account = 2;
    let mut h = harness_with_params(params);
    let owner = addr(1);

    for seed in 1..=2 {
        h.module
            .register_recipient_key(
                &mut h.state,
                &owner,
                &fixture_keypair(seed).public_key,
                ALG_X25519_XSALSA20_POLY1305,
                "",
                1000,
            )
            .unwrap();
    }
    let err = h
        .module
        .register_recipient_key(
            &mut h.state,
            &owner,
            &fixture_keypair(3).public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "",
            1000,
        )
        .unwrap_err();
    match err {
        EncryptionError::InvalidPublicKey(msg) => assert!(msg.contains("max keys limit")),
        other => panic!("expected InvalidPublicKey, got {:?}", other),
    }
}

#[test]
fn test_version_assignment_is_monotone() {
    let mut h = harness();
    let owner = addr(1);

    for (i, seed) in [1u8, 2, 3].into_iter().enumerate() {
        let fingerprint = h
            .module
            .register_recipient_key(
                &mut h.state,
                &owner,
                &fixture_keypair(seed).public_key,
                ALG_X25519_XSALSA20_POLY1305,
                "",
                1000,
            )
            .unwrap();
        let key = h
            .module
            .get_recipient_key_by_fingerprint(&h.state, &fingerprint)
            .unwrap();
        assert_eq!(key.version, i as u32 + 1);
    }
}

#[test]
fn test_revoke_is_owner_or_authority_gated_and_not_repeatable() {
    let mut h = harness();
    let owner = addr(1);
    let pair = fixture_keypair(1);
    let fingerprint = h
        .module
        .register_recipient_key(
            &mut h.state,
            &owner,
            &pair.public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "",
            1000,
        )
        .unwrap();

    // A stranger may not revoke.
    assert!(matches!(
        h.module
            .revoke_recipient_key(&mut h.state, &addr(9), &owner, &fingerprint, 2000)
            .unwrap_err(),
        EncryptionError::Unauthorized(_)
    ));

    // The authority may.
    h.module
        .revoke_recipient_key(&mut h.state, &authority(), &owner, &fingerprint, 2000)
        .unwrap();
    let key = h
        .module
        .get_recipient_key(&h.state, &owner, &fingerprint)
        .unwrap();
    assert_eq!(key.revoked_at, 2000);
    assert_eq!(key.purge_at, 2000 + 604800);
    assert_eq!(h.hooks.revoked.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Revoking again fails and leaves state unchanged.
    assert!(matches!(
        h.module
            .revoke_recipient_key(&mut h.state, &owner, &owner, &fingerprint, 3000)
            .unwrap_err(),
        EncryptionError::KeyRevoked(_)
    ));
    let unchanged = h
        .module
        .get_recipient_key(&h.state, &owner, &fingerprint)
        .unwrap();
    assert_eq!(unchanged.revoked_at, 2000);
}

#[test]
fn test_register_revoke_purge_lifecycle() {
    let mut h = harness();
    let owner = addr(1);
    let public_key = vec![0x01; 32];

    let fingerprint = h
        .module
        .register_recipient_key(
            &mut h.state,
            &owner,
            &public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "primary",
            1000,
        )
        .unwrap();
    h.module
        .revoke_recipient_key(&mut h.state, &owner, &owner, &fingerprint, 2000)
        .unwrap();

    // Not yet purgeable inside the grace window.
    assert_eq!(h.module.purge_revoked_keys(&mut h.state, 606799).unwrap(), 0);
    assert_eq!(h.module.purge_revoked_keys(&mut h.state, 606800).unwrap(), 1);

    assert!(matches!(
        h.module
            .get_recipient_key_by_fingerprint(&h.state, &fingerprint)
            .unwrap_err(),
        EncryptionError::KeyNotFound(_)
    ));
    // The fingerprint index is gone with the record.
    assert!(h
        .state
        .get(&state_keys::fingerprint_index_key(&fingerprint))
        .unwrap()
        .is_none());

    let events = h.emitter.events();
    assert!(matches!(
        events.as_slice(),
        [
            EncryptionEvent::KeyRegistered { registered_at: 1000, .. },
            EncryptionEvent::KeyRevoked { revoked_at: 2000, .. },
        ]
    ));
}

#[test]
fn test_active_pointer_recomputes_on_revoke() {
    let mut h = harness();
    let owner = addr(1);
    let first = fixture_keypair(1);
    let second = fixture_keypair(2);

    h.module
        .register_recipient_key(&mut h.state, &owner, &first.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();
    h.module
        .register_recipient_key(&mut h.state, &owner, &second.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1100)
        .unwrap();

    // The newest registration is active, and repeated reads agree.
    let active = h.module.get_active_recipient_key(&mut h.state, &owner, 1200).unwrap();
    assert_eq!(active.fingerprint, second.fingerprint);
    let again = h.module.get_active_recipient_key(&mut h.state, &owner, 1200).unwrap();
    assert_eq!(again, active);

    // Revoking the active key falls back to the older usable key.
    h.module
        .revoke_recipient_key(&mut h.state, &owner, &owner, &second.fingerprint, 1300)
        .unwrap();
    let active = h.module.get_active_recipient_key(&mut h.state, &owner, 1300).unwrap();
    assert_eq!(active.fingerprint, first.fingerprint);

    // No usable key left.
    h.module
        .revoke_recipient_key(&mut h.state, &owner, &owner, &first.fingerprint, 1400)
        .unwrap();
    assert!(matches!(
        h.module
            .get_active_recipient_key(&mut h.state, &owner, 1400)
            .unwrap_err(),
        EncryptionError::KeyNotFound(_)
    ));
}

#[test]
fn test_resolve_recipient_key_id_versions() {
    let mut h = harness();
    let owner = addr(1);
    let pair = fixture_keypair(1);
    let fingerprint = h
        .module
        .register_recipient_key(&mut h.state, &owner, &pair.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();

    let bare = h
        .module
        .resolve_recipient_key_id(&h.state, &owner, &fingerprint)
        .unwrap();
    assert_eq!(bare.fingerprint, fingerprint);

    let versioned = h
        .module
        .resolve_recipient_key_id(&h.state, &owner, &format!("{}:v1", fingerprint))
        .unwrap();
    assert_eq!(versioned.version, 1);

    // A version with no index entry falls back to the fingerprint part.
    let fallback = h
        .module
        .resolve_recipient_key_id(&h.state, &owner, &format!("{}:v9", fingerprint))
        .unwrap();
    assert_eq!(fallback.fingerprint, fingerprint);
}

#[test]
fn test_validate_envelope_recipients_splits_unknown_from_unusable() {
    let mut h = harness();
    let owner = addr(1);
    let known = fixture_keypair(1);
    let stranger = fixture_keypair(7);

    h.module
        .register_recipient_key(&mut h.state, &owner, &known.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();

    let unknown = h
        .module
        .validate_envelope_recipients(
            &h.state,
            &[known.fingerprint.clone(), stranger.fingerprint.clone()],
            1500,
        )
        .unwrap();
    assert_eq!(unknown, vec![stranger.fingerprint.clone()]);

    h.module
        .revoke_recipient_key(&mut h.state, &owner, &owner, &known.fingerprint, 2000)
        .unwrap();
    assert!(matches!(
        h.module
            .validate_envelope_recipients(&h.state, &[known.fingerprint.clone()], 2500)
            .unwrap_err(),
        EncryptionError::KeyRevoked(_)
    ));
}

// --- envelopes and access ---

#[test]
fn test_store_envelope_and_access_checks() {
    let mut h = harness();
    let owner_a = addr(1);
    let owner_b = addr(2);
    let pair_a = fixture_keypair(1);

    h.module
        .register_recipient_key(&mut h.state, &owner_a, &pair_a.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();

    let primitives = NaclPrimitives::new();
    let envelope = seal_envelope(&primitives, &[&pair_a], b"scope payload", SENDER_SEED, 1).unwrap();
    let hash = h.module.store_envelope(&mut h.state, &envelope, 1100).unwrap();

    let record = h.module.get_envelope(&h.state, &hash).unwrap();
    assert_eq!(record.rotation_count, 0);
    assert_eq!(record.created_at, 1100);
    assert_eq!(record.envelope, envelope);

    // Storing the same envelope twice is a no-op on the same address.
    assert_eq!(
        h.module.store_envelope(&mut h.state, &envelope, 1200).unwrap(),
        hash
    );
    assert_eq!(h.module.get_envelope(&h.state, &hash).unwrap().created_at, 1100);

    h.module
        .check_envelope_access(&h.state, &envelope, &owner_a, 1200)
        .unwrap();
    assert!(matches!(
        h.module
            .check_envelope_access(&h.state, &envelope, &owner_b, 1200)
            .unwrap_err(),
        EncryptionError::UnauthorizedAccess(_)
    ));

    h.module
        .check_envelope_access_by_fingerprint(&h.state, &envelope, &pair_a.fingerprint, 1200)
        .unwrap();

    // Revocation closes fingerprint-level access.
    h.module
        .revoke_recipient_key(&mut h.state, &owner_a, &owner_a, &pair_a.fingerprint, 1300)
        .unwrap();
    match h
        .module
        .check_envelope_access_by_fingerprint(&h.state, &envelope, &pair_a.fingerprint, 1400)
        .unwrap_err()
    {
        EncryptionError::UnauthorizedAccess(msg) => assert!(msg.contains("is revoked")),
        other => panic!("expected UnauthorizedAccess, got {:?}", other),
    }
}

#[test]
fn test_enforce_encrypted_payload_required() {
    let h = harness();
    let pair = fixture_keypair(1);
    let primitives = NaclPrimitives::new();
    let envelope = seal_envelope(&primitives, &[&pair], b"payload", SENDER_SEED, 1).unwrap();

    h.module
        .enforce_encrypted_payload_required(Some(&envelope), "identity_data")
        .unwrap();
    assert!(h
        .module
        .enforce_encrypted_payload_required(None, "identity_data")
        .is_err());

    let mut empty = envelope.clone();
    empty.ciphertext.clear();
    assert!(h
        .module
        .enforce_encrypted_payload_required(Some(&empty), "identity_data")
        .is_err());

    let mut no_recipients = envelope;
    no_recipients.recipient_key_ids.clear();
    assert!(h
        .module
        .enforce_encrypted_payload_required(Some(&no_recipients), "identity_data")
        .is_err());
}

#[test]
fn test_store_envelope_rejects_forged_signature() {
    let mut h = harness();
    let pair = fixture_keypair(1);
    let primitives = NaclPrimitives::new();
    let mut envelope = seal_envelope(&primitives, &[&pair], b"payload", SENDER_SEED, 1).unwrap();
    envelope.metadata.insert("purpose".into(), "kyc".into());
    // The signature no longer matches after tampering with the ciphertext.
    envelope.ciphertext.push(0xFF);

    assert!(matches!(
        h.module.store_envelope(&mut h.state, &envelope, 1000).unwrap_err(),
        EncryptionError::InvalidSignature(_)
    ));
}

// --- rotation ---

#[test]
fn test_rotation_end_to_end_with_cursor_resumption() {
    let mut params = EncryptionParams::default();
    params.rotation_batch_size = 2;
    let mut h = harness_with_params(params);
    let owner = addr(1);
    let old = fixture_keypair(1);
    let new = fixture_keypair(2);
    let primitives = NaclPrimitives::new();

    h.module
        .register_recipient_key(&mut h.state, &owner, &old.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();

    let mut hashes = Vec::new();
    for seed in 1..=3u8 {
        let envelope =
            seal_envelope(&primitives, &[&old], format!("payload {}", seed).as_bytes(), SENDER_SEED, seed)
                .unwrap();
        hashes.push(h.module.store_envelope(&mut h.state, &envelope, 1100).unwrap());
    }

    let new_fingerprint = h
        .module
        .rotate_recipient_key(
            &mut h.state,
            &owner,
            &old.fingerprint,
            &new.public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "replacement",
            "scheduled rotation",
            0,
            30,
            2000,
        )
        .unwrap();
    assert_eq!(new_fingerprint, new.fingerprint);

    // The old key is deprecated, not revoked.
    let old_record = h.module.get_recipient_key(&h.state, &owner, &old.fingerprint).unwrap();
    assert_eq!(old_record.deprecated_at, 2000);
    assert_eq!(old_record.revoked_at, 0);

    // Two of three envelopes were queued; the scan left a cursor behind.
    let campaigns = rotation_states(&h.state);
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].record.status, RotationStatus::InTransition);
    assert_eq!(campaigns[0].record.envelopes_pending, 2);
    assert!(!campaigns[0].cursor.is_empty());
    assert_eq!(
        campaigns[0].record.transition_window_end,
        2000 + 30 * 86400
    );

    let worker = worker_for(&[&old]);
    assert_eq!(
        h.module
            .process_reencryption_jobs(&mut h.state, &worker, 10, 2100)
            .unwrap(),
        2
    );

    // Resume the interrupted scan: the third envelope gets its job.
    assert_eq!(h.module.resume_rotation_scans(&mut h.state, 2200).unwrap(), 1);
    assert_eq!(
        h.module
            .process_reencryption_jobs(&mut h.state, &worker, 10, 2300)
            .unwrap(),
        1
    );

    // All campaigns settled; re-processing finds nothing.
    assert_eq!(
        h.module
            .process_reencryption_jobs(&mut h.state, &worker, 10, 2400)
            .unwrap(),
        0
    );
    let campaigns = rotation_states(&h.state);
    assert_eq!(campaigns[0].record.status, RotationStatus::Completed);
    assert_eq!(campaigns[0].record.envelopes_pending, 0);

    // Every stored envelope now addresses the new key and opens only under
    // its private half.
    for hash in &hashes {
        let record = h.module.get_envelope(&h.state, hash).unwrap();
        assert!(record.envelope.has_recipient(&new.fingerprint));
        assert!(!record.envelope.has_recipient(&old.fingerprint));
        assert_eq!(record.rotation_count, 1);

        let plaintext = open_envelope(&primitives, &record.envelope, &new).unwrap();
        assert!(plaintext.starts_with(b"payload "));
        assert!(open_envelope(&primitives, &record.envelope, &old).is_err());
    }
}

#[test]
fn test_rotate_rejects_revoked_key_and_double_rotation() {
    let mut h = harness();
    let owner = addr(1);
    let old = fixture_keypair(1);

    h.module
        .register_recipient_key(&mut h.state, &owner, &old.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();
    h.module
        .rotate_recipient_key(
            &mut h.state,
            &owner,
            &old.fingerprint,
            &fixture_keypair(2).public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "",
            "first",
            0,
            30,
            2000,
        )
        .unwrap();

    // A second rotation away from the same key is refused while the first
    // campaign is open.
    assert!(matches!(
        h.module
            .rotate_recipient_key(
                &mut h.state,
                &owner,
                &old.fingerprint,
                &fixture_keypair(3).public_key,
                ALG_X25519_XSALSA20_POLY1305,
                "",
                "second",
                0,
                30,
                2100,
            )
            .unwrap_err(),
        EncryptionError::KeyRotationInProgress(_)
    ));

    // Rotating a revoked key is refused outright.
    let other = fixture_keypair(4);
    h.module
        .register_recipient_key(&mut h.state, &addr(2), &other.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();
    h.module
        .revoke_recipient_key(&mut h.state, &addr(2), &addr(2), &other.fingerprint, 1500)
        .unwrap();
    assert!(matches!(
        h.module
            .rotate_recipient_key(
                &mut h.state,
                &addr(2),
                &other.fingerprint,
                &fixture_keypair(5).public_key,
                ALG_X25519_XSALSA20_POLY1305,
                "",
                "",
                0,
                30,
                1600,
            )
            .unwrap_err(),
        EncryptionError::KeyRevoked(_)
    ));
}

#[test]
fn test_failed_jobs_record_errors_and_stop_after_three_attempts() {
    let mut h = harness();
    let owner = addr(1);
    let old = fixture_keypair(1);
    let primitives = NaclPrimitives::new();

    h.module
        .register_recipient_key(&mut h.state, &owner, &old.public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();
    let envelope = seal_envelope(&primitives, &[&old], b"payload", SENDER_SEED, 1).unwrap();
    h.module.store_envelope(&mut h.state, &envelope, 1100).unwrap();

    h.module
        .rotate_recipient_key(
            &mut h.state,
            &owner,
            &old.fingerprint,
            &fixture_keypair(2).public_key,
            ALG_X25519_XSALSA20_POLY1305,
            "",
            "",
            0,
            30,
            2000,
        )
        .unwrap();

    // A worker without the old private key fails every job it touches.
    let blind_worker = LocalKeyReencryptor::new(NaclPrimitives::new(), SENDER_SEED).unwrap();
    for round in 1..=3u32 {
        assert_eq!(
            h.module
                .process_reencryption_jobs(&mut h.state, &blind_worker, 10, 2000 + u64::from(round))
                .unwrap(),
            0
        );
        let jobs: Vec<veris_types::app::ReencryptionJob> = h
            .state
            .prefix_scan(state_keys::REENCRYPTION_JOB_PREFIX)
            .unwrap()
            .map(|entry| {
                let (_, value) = entry.unwrap();
                veris_types::codec::from_bytes_canonical(&value).unwrap()
            })
            .collect();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].attempts, round);
        assert!(jobs[0].last_error.contains("no local private key"));
        let expected = if round == 3 {
            ReencryptionJobStatus::Failed
        } else {
            ReencryptionJobStatus::Pending
        };
        assert_eq!(jobs[0].status, expected);
    }

    // The permanent failure marks the campaign failed.
    assert_eq!(rotation_states(&h.state)[0].record.status, RotationStatus::Failed);
}

// --- sweeper ---

#[test]
fn test_expiry_warnings_then_expiry() {
    let mut params = EncryptionParams::default();
    params.default_key_ttl_seconds = 1000;
    params.key_expiry_warning_seconds = vec![500, 100];
    let mut h = harness_with_params(params);
    let owner = addr(1);
    let pair = fixture_keypair(1);

    h.module
        .register_recipient_key(&mut h.state, &owner, &pair.public_key, ALG_X25519_XSALSA20_POLY1305, "", 0)
        .unwrap();

    // Outside every window: nothing to do.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 400).unwrap(), (0, 0));

    // Entering the 500s window.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 500).unwrap(), (1, 0));
    // Idempotent within the same block.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 500).unwrap(), (0, 0));

    // Entering the 100s window.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 900).unwrap(), (1, 0));

    // Past the expiry: the key is revoked by the sweeper.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 1001).unwrap(), (0, 1));
    let key = h.module.get_recipient_key(&h.state, &owner, &pair.fingerprint).unwrap();
    assert_ne!(key.revoked_at, 0);
    assert_ne!(key.deprecated_at, 0);
    assert_eq!(h.hooks.expired.load(std::sync::atomic::Ordering::SeqCst), 1);

    // Nothing more to sweep at the same time.
    assert_eq!(h.module.process_key_expirations(&mut h.state, 1001).unwrap(), (0, 0));

    let events = h.emitter.events();
    let warnings: Vec<u64> = events
        .iter()
        .filter_map(|e| match e {
            EncryptionEvent::KeyExpiryWarning { window_seconds, .. } => Some(*window_seconds),
            _ => None,
        })
        .collect();
    assert_eq!(warnings, vec![500, 100]);
    assert!(events
        .iter()
        .any(|e| matches!(e, EncryptionEvent::KeyExpired { expired_at: 1001, .. })));
}

#[test]
fn test_expired_key_triggers_replacement_rotation() {
    let mut h = harness();
    let owner = addr(1);
    let expiring = fixture_keypair(1);
    let survivor = fixture_keypair(2);
    let primitives = NaclPrimitives::new();

    // Register the first key under a params TTL, then disable the TTL so the
    // replacement key never expires.
    let mut ttl_params = EncryptionParams::default();
    ttl_params.default_key_ttl_seconds = 1000;
    h.module.set_params(&mut h.state, &ttl_params).unwrap();
    h.module
        .register_recipient_key(&mut h.state, &owner, &expiring.public_key, ALG_X25519_XSALSA20_POLY1305, "", 0)
        .unwrap();
    h.module
        .set_params(&mut h.state, &EncryptionParams::default())
        .unwrap();
    h.module
        .register_recipient_key(&mut h.state, &owner, &survivor.public_key, ALG_X25519_XSALSA20_POLY1305, "", 10)
        .unwrap();

    let envelope = seal_envelope(&primitives, &[&expiring], b"payload", SENDER_SEED, 1).unwrap();
    h.module.store_envelope(&mut h.state, &envelope, 100).unwrap();

    assert_eq!(h.module.process_key_expirations(&mut h.state, 1000).unwrap(), (0, 1));

    // The sweep queued a migration toward the surviving key.
    let campaigns = rotation_states(&h.state);
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].record.old_fingerprint, expiring.fingerprint);
    assert_eq!(campaigns[0].record.new_fingerprint, survivor.fingerprint);
    assert_eq!(campaigns[0].record.envelopes_pending, 1);

    // And the active pointer moved off the expired key.
    let active = h.module.get_active_recipient_key(&mut h.state, &owner, 1000).unwrap();
    assert_eq!(active.fingerprint, survivor.fingerprint);

    let worker = worker_for(&[&expiring]);
    assert_eq!(
        h.module
            .process_reencryption_jobs(&mut h.state, &worker, 10, 1100)
            .unwrap(),
        1
    );
    let record = h.module.get_envelope(&h.state, &envelope.hash().unwrap()).unwrap();
    assert!(record.envelope.has_recipient(&survivor.fingerprint));
    assert_eq!(
        open_envelope(&primitives, &record.envelope, &survivor).unwrap(),
        b"payload"
    );
}

#[test]
fn test_sweeper_continues_past_event_failures() {
    let mut params = EncryptionParams::default();
    params.default_key_ttl_seconds = 1000;
    params.key_expiry_warning_seconds = vec![900, 800];
    let hooks = Arc::new(CountingHooks::new());
    let module = EncryptionModule::new(
        None,
        Arc::new(FailingEmitter),
        hooks,
        Arc::new(NaclPrimitives::new()),
    );
    let mut state = MemoryState::new();
    module.set_params(&mut state, &params).unwrap();

    module
        .register_recipient_key(&mut state, &addr(1), &fixture_keypair(1).public_key, ALG_X25519_XSALSA20_POLY1305, "", 0)
        .unwrap();

    // Both windows are due at once; failed emissions do not stop the loop or
    // the marker writes.
    assert_eq!(module.process_key_expirations(&mut state, 300).unwrap(), (2, 0));
    assert_eq!(module.process_key_expirations(&mut state, 300).unwrap(), (0, 0));
}

// --- ephemeral session keys ---

#[test]
fn test_ephemeral_key_is_single_use() {
    let mut h = harness();
    let owner = addr(1);

    let (session_id, public_key, private_key) = h
        .module
        .create_ephemeral_key(&mut h.state, &owner, 5, 100, 1000)
        .unwrap();

    // The session id is the documented hash of address, key and height.
    let mut preimage = Vec::new();
    preimage.extend_from_slice(owner.to_canonical_string().as_bytes());
    preimage.extend_from_slice(&public_key);
    preimage.extend_from_slice(&1000i64.to_be_bytes());
    assert_eq!(
        session_id,
        hex::encode(veris_crypto::hash::sha256(&preimage).unwrap())
    );
    assert_eq!(private_key.len(), 32);

    h.module.use_ephemeral_key(&mut h.state, &session_id, 101).unwrap();
    assert!(matches!(
        h.module.use_ephemeral_key(&mut h.state, &session_id, 102).unwrap_err(),
        EncryptionError::KeyRevoked(_)
    ));

    assert!(matches!(
        h.module.use_ephemeral_key(&mut h.state, "deadbeef", 102).unwrap_err(),
        EncryptionError::KeyNotFound(_)
    ));
}

#[test]
fn test_ephemeral_key_expiry_boundary() {
    let mut h = harness();
    let owner = addr(1);

    // Expires exactly at creation + ttl; the boundary itself is expired.
    let (at_boundary, _, _) = h
        .module
        .create_ephemeral_key(&mut h.state, &owner, 5, 100, 1000)
        .unwrap();
    assert!(matches!(
        h.module.use_ephemeral_key(&mut h.state, &at_boundary, 105).unwrap_err(),
        EncryptionError::KeyExpired(_)
    ));

    let (before_boundary, _, _) = h
        .module
        .create_ephemeral_key(&mut h.state, &owner, 5, 200, 1001)
        .unwrap();
    h.module
        .use_ephemeral_key(&mut h.state, &before_boundary, 204)
        .unwrap();

    let (short_lived, _, _) = h
        .module
        .create_ephemeral_key(&mut h.state, &owner, 1, 300, 1002)
        .unwrap();
    assert!(matches!(
        h.module.use_ephemeral_key(&mut h.state, &short_lived, 302).unwrap_err(),
        EncryptionError::KeyExpired(_)
    ));

    // Cleanup removes used and expired sessions.
    assert_eq!(h.module.cleanup_ephemeral_keys(&mut h.state, 302).unwrap(), 3);
}

#[test]
fn test_derive_shared_secret_agrees_across_parties() {
    let h = harness();
    let alice = fixture_keypair(1);
    let bob = fixture_keypair(2);

    let from_alice = h
        .module
        .derive_shared_secret(&alice.private_key, &bob.public_key)
        .unwrap();
    let from_bob = h
        .module
        .derive_shared_secret(&bob.private_key, &alice.public_key)
        .unwrap();
    assert_eq!(&*from_alice, &*from_bob);
}

// --- events & service plumbing ---

#[test]
fn test_event_emission_failures_are_non_fatal() {
    let module = EncryptionModule::new(
        None,
        Arc::new(FailingEmitter),
        Arc::new(CountingHooks::new()),
        Arc::new(NaclPrimitives::new()),
    );
    let mut state = MemoryState::new();

    let fingerprint = module
        .register_recipient_key(&mut state, &addr(1), &fixture_keypair(1).public_key, ALG_X25519_XSALSA20_POLY1305, "", 1000)
        .unwrap();
    // The registration committed despite the emitter failing.
    assert!(module
        .get_recipient_key_by_fingerprint(&state, &fingerprint)
        .is_ok());
}

#[tokio::test]
async fn test_service_call_dispatch() {
    let mut h = harness();
    let owner = addr(1);
    let pair = fixture_keypair(1);

    let params = codec::to_bytes_canonical(&RegisterKeyParams {
        public_key: pair.public_key.clone(),
        algorithm_id: ALG_X25519_XSALSA20_POLY1305.to_string(),
        label: "via-abi".into(),
    })
    .unwrap();
    let mut ctx = test_ctx(owner, 10, 1000);
    h.module
        .handle_service_call(&mut h.state, "register_key@v1", &params, &mut ctx)
        .await
        .unwrap();

    let key = h
        .module
        .get_recipient_key_by_fingerprint(&h.state, &pair.fingerprint)
        .unwrap();
    assert_eq!(key.label, "via-abi");

    let err = h
        .module
        .handle_service_call(&mut h.state, "not_a_method@v1", &[], &mut ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, TransactionError::Unsupported(_)));
}

#[tokio::test]
async fn test_end_block_drives_sweep_and_rotation() {
    let mut params = EncryptionParams::default();
    params.default_key_ttl_seconds = 1000;
    let emitter = Arc::new(RecordingEmitter::new());
    let old = fixture_keypair(1);
    let survivor = fixture_keypair(2);
    let worker = worker_for(&[&old]);
    let module = EncryptionModule::new(
        None,
        emitter.clone(),
        Arc::new(CountingHooks::new()),
        Arc::new(NaclPrimitives::new()),
    )
    .with_worker(Arc::new(worker));
    let mut state = MemoryState::new();
    module.set_params(&mut state, &params).unwrap();

    let owner = addr(1);
    module
        .register_recipient_key(&mut state, &owner, &old.public_key, ALG_X25519_XSALSA20_POLY1305, "", 0)
        .unwrap();
    module
        .set_params(&mut state, &EncryptionParams::default())
        .unwrap();
    module
        .register_recipient_key(&mut state, &owner, &survivor.public_key, ALG_X25519_XSALSA20_POLY1305, "", 10)
        .unwrap();

    let primitives = NaclPrimitives::new();
    let envelope = seal_envelope(&primitives, &[&old], b"payload", SENDER_SEED, 1).unwrap();
    module.store_envelope(&mut state, &envelope, 100).unwrap();

    // One end-block past the expiry: the sweep revokes the key, queues the
    // migration, and the attached worker re-encrypts in the same block.
    let ctx = test_ctx(owner, 11, 1000);
    module.on_end_block(&mut state, &ctx).await.unwrap();

    let record = module.get_envelope(&state, &envelope.hash().unwrap()).unwrap();
    assert!(record.envelope.has_recipient(&survivor.fingerprint));
    assert_eq!(record.rotation_count, 1);
}
