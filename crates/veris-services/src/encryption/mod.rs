// Path: crates/veris-services/src/encryption/mod.rs
//! The encryption module: end-to-end encryption for on-chain sensitive
//! payloads.
//!
//! The module owns the per-account recipient-key registry, the
//! content-addressed envelope store, the block-boundary lifecycle sweeper,
//! the re-encryption rotation engine, and ephemeral session keys. All state
//! lives in the host KV store under the prefixes in `veris_types::keys`; all
//! mutation happens inside the host's per-block transaction, so the module is
//! a deterministic state machine with no clock or entropy of its own beyond
//! the primitives port.

use async_trait::async_trait;
use parity_scale_codec::{Decode, Encode};
use std::any::Any;
use std::sync::Arc;
use veris_api::crypto::{EnvelopePrimitives, ReencryptionWorker};
use veris_api::events::EventEmitter;
use veris_api::hooks::EncryptionHooks;
use veris_api::lifecycle::OnEndBlock;
use veris_api::services::BlockchainService;
use veris_api::state::StateAccess;
use veris_api::transaction::context::TxContext;
use veris_types::app::{AccountId, EncryptionEvent};
use veris_types::codec;
use veris_types::error::{EncryptionError, StateError, TransactionError};
use veris_types::keys::PARAMS_KEY;
use veris_types::service_configs::{Capabilities, EncryptionParams};

mod envelopes;
mod ephemeral;
mod registry;
mod rotation;
mod sweeper;

#[cfg(test)]
mod tests;

/// Days both keys stay valid when a rotation request does not specify a
/// transition window.
const DEFAULT_TRANSITION_DAYS: u32 = 30;

// --- Service Method Parameter Structs (The Service's Public ABI) ---

#[derive(Encode, Decode)]
pub struct RegisterKeyParams {
    pub public_key: Vec<u8>,
    pub algorithm_id: String,
    pub label: String,
}

#[derive(Encode, Decode)]
pub struct UpdateLabelParams {
    pub fingerprint: String,
    pub label: String,
}

#[derive(Encode, Decode)]
pub struct RevokeKeyParams {
    pub address: AccountId,
    pub fingerprint: String,
}

#[derive(Encode, Decode)]
pub struct RotateKeyParams {
    pub old_fingerprint: String,
    pub new_public_key: Vec<u8>,
    pub new_algorithm_id: String,
    pub new_label: String,
    pub reason: String,
    pub new_ttl_seconds: u64,
    /// 0 selects the default transition window.
    pub transition_days: u32,
}

// --- Encryption Module ---

/// The encryption module service.
pub struct EncryptionModule {
    /// The privileged account allowed to revoke any key, if configured.
    authority: Option<AccountId>,
    emitter: Arc<dyn EventEmitter>,
    hooks: Arc<dyn EncryptionHooks>,
    primitives: Arc<dyn EnvelopePrimitives>,
    /// The re-encryption worker driven at block boundaries, if this node
    /// holds the key material to run one.
    worker: Option<Arc<dyn ReencryptionWorker>>,
}

impl EncryptionModule {
    pub fn new(
        authority: Option<AccountId>,
        emitter: Arc<dyn EventEmitter>,
        hooks: Arc<dyn EncryptionHooks>,
        primitives: Arc<dyn EnvelopePrimitives>,
    ) -> Self {
        Self {
            authority,
            emitter,
            hooks,
            primitives,
            worker: None,
        }
    }

    /// Attaches a re-encryption worker to be driven from the end-block hook.
    pub fn with_worker(mut self, worker: Arc<dyn ReencryptionWorker>) -> Self {
        self.worker = Some(worker);
        self
    }

    /// Loads the module parameters, falling back to defaults when no params
    /// record has been written yet. Params are re-read on every mutating
    /// entry point and never cached across transactions.
    pub fn params(&self, state: &dyn StateAccess) -> Result<EncryptionParams, EncryptionError> {
        match state.get(PARAMS_KEY)? {
            Some(bytes) => codec::from_bytes_canonical(&bytes)
                .map_err(|e| StateError::Decode(e).into()),
            None => Ok(EncryptionParams::default()),
        }
    }

    /// Persists the module parameters, validating them first.
    pub fn set_params(
        &self,
        state: &mut dyn StateAccess,
        params: &EncryptionParams,
    ) -> Result<(), EncryptionError> {
        params.validate()?;
        let bytes = codec::to_bytes_canonical(params).map_err(StateError::InvalidValue)?;
        state.insert(PARAMS_KEY, &bytes)?;
        Ok(())
    }

    /// Emits a typed event, logging and swallowing emission failures: the
    /// state transition that produced the event has already been applied.
    pub(crate) fn emit(&self, event: EncryptionEvent) {
        if let Err(e) = self.emitter.emit(event) {
            log::warn!("[Encryption] event emission failed: {}", e);
        }
    }

    /// Whether `signer` may operate on keys owned by `address`.
    pub(crate) fn is_owner_or_authority(&self, signer: &AccountId, address: &AccountId) -> bool {
        signer == address
            || self
                .authority
                .as_ref()
                .map_or(false, |authority| authority == signer)
    }

    pub(crate) fn primitives(&self) -> &dyn EnvelopePrimitives {
        self.primitives.as_ref()
    }

    pub(crate) fn hooks(&self) -> &dyn EncryptionHooks {
        self.hooks.as_ref()
    }
}

#[async_trait]
impl BlockchainService for EncryptionModule {
    fn id(&self) -> &str {
        "encryption"
    }
    fn abi_version(&self) -> u32 {
        1
    }
    fn state_schema(&self) -> &str {
        "v1"
    }
    fn capabilities(&self) -> Capabilities {
        Capabilities::ON_END_BLOCK
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_on_end_block(&self) -> Option<&dyn OnEndBlock> {
        Some(self)
    }

    async fn handle_service_call(
        &self,
        state: &mut dyn StateAccess,
        method: &str,
        params: &[u8],
        ctx: &mut TxContext,
    ) -> Result<(), TransactionError> {
        match method {
            "register_key@v1" => {
                let p: RegisterKeyParams = codec::from_bytes_canonical(params)
                    .map_err(TransactionError::Deserialization)?;
                self.register_recipient_key(
                    state,
                    &ctx.signer_account_id,
                    &p.public_key,
                    &p.algorithm_id,
                    &p.label,
                    ctx.block_timestamp,
                )?;
                Ok(())
            }
            "update_label@v1" => {
                let p: UpdateLabelParams = codec::from_bytes_canonical(params)
                    .map_err(TransactionError::Deserialization)?;
                self.update_key_label(
                    state,
                    &ctx.signer_account_id,
                    &p.fingerprint,
                    &p.label,
                )?;
                Ok(())
            }
            "revoke_key@v1" => {
                let p: RevokeKeyParams = codec::from_bytes_canonical(params)
                    .map_err(TransactionError::Deserialization)?;
                self.revoke_recipient_key(
                    state,
                    &ctx.signer_account_id,
                    &p.address,
                    &p.fingerprint,
                    ctx.block_timestamp,
                )?;
                Ok(())
            }
            "rotate_key@v1" => {
                let p: RotateKeyParams = codec::from_bytes_canonical(params)
                    .map_err(TransactionError::Deserialization)?;
                let transition_days = if p.transition_days == 0 {
                    DEFAULT_TRANSITION_DAYS
                } else {
                    p.transition_days
                };
                self.rotate_recipient_key(
                    state,
                    &ctx.signer_account_id,
                    &p.old_fingerprint,
                    &p.new_public_key,
                    &p.new_algorithm_id,
                    &p.new_label,
                    &p.reason,
                    p.new_ttl_seconds,
                    transition_days,
                    ctx.block_timestamp,
                )?;
                Ok(())
            }
            _ => Err(TransactionError::Unsupported(format!(
                "Encryption module does not support method '{}'",
                method
            ))),
        }
    }
}

#[async_trait]
impl OnEndBlock for EncryptionModule {
    async fn on_end_block(
        &self,
        state: &mut dyn StateAccess,
        ctx: &TxContext,
    ) -> Result<(), StateError> {
        let now = ctx.block_timestamp;

        let (warnings, expired) = self
            .process_key_expirations(state, now)
            .map_err(|e| StateError::Backend(e.to_string()))?;
        if warnings > 0 || expired > 0 {
            log::info!(
                "[Encryption] sweep at height {}: {} warnings, {} keys expired",
                ctx.block_height,
                warnings,
                expired
            );
        }

        let purged = self
            .purge_revoked_keys(state, now)
            .map_err(|e| StateError::Backend(e.to_string()))?;
        if purged > 0 {
            log::info!("[Encryption] purged {} revoked keys", purged);
        }

        let cleaned = self
            .cleanup_ephemeral_keys(state, now)
            .map_err(|e| StateError::Backend(e.to_string()))?;
        if cleaned > 0 {
            log::debug!("[Encryption] cleaned {} ephemeral session keys", cleaned);
        }

        // Advance any rotation campaigns: resume interrupted scans, then run
        // one bounded processing slice if this node carries a worker.
        self.resume_rotation_scans(state, now)
            .map_err(|e| StateError::Backend(e.to_string()))?;
        if let Some(worker) = &self.worker {
            let params = self
                .params(state)
                .map_err(|e| StateError::Backend(e.to_string()))?;
            let processed = self
                .process_reencryption_jobs(state, worker.as_ref(), params.rotation_batch_size, now)
                .map_err(|e| StateError::Backend(e.to_string()))?;
            if processed > 0 {
                log::info!("[Encryption] re-encrypted {} envelopes", processed);
            }
        }
        Ok(())
    }
}
