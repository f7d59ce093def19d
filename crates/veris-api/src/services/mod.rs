// Path: crates/veris-api/src/services/mod.rs
//! Traits for pluggable blockchain services.

use crate::lifecycle::OnEndBlock;
use crate::transaction::context::TxContext;
use async_trait::async_trait;
use std::any::Any;
use veris_types::error::TransactionError;
use veris_types::service_configs::Capabilities;

/// The base trait for any service managed by the chain.
///
/// Services own a private region of the state keyed by their prefixes and are
/// invoked either through dispatched `handle_service_call` transactions or
/// through the lifecycle hooks they advertise in [`Capabilities`].
#[async_trait]
pub trait BlockchainService: Any + Send + Sync {
    /// A unique, static, lowercase string identifier for the service.
    /// This is used for deterministic sorting and for dispatching calls.
    fn id(&self) -> &str;

    /// The version of the ABI the service expects from the host.
    fn abi_version(&self) -> u32;

    /// A string identifying the schema of the state this service reads/writes.
    fn state_schema(&self) -> &str;

    /// Returns a bitmask of the lifecycle capabilities (hooks) this service implements.
    fn capabilities(&self) -> Capabilities;

    /// Provides access to the concrete type for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Handles a generic, dispatched call from the host's transaction layer.
    /// This is the primary entry point for all on-chain service logic.
    ///
    /// # Default Implementation
    /// The default implementation returns an `Unsupported` error. Services
    /// must override this method to expose callable functions.
    async fn handle_service_call(
        &self,
        state: &mut dyn crate::state::StateAccess,
        method: &str,
        params: &[u8],
        ctx: &mut TxContext,
    ) -> Result<(), TransactionError> {
        // Mark parameters as used to satisfy the compiler under the default implementation.
        let _ = (state, params, ctx);
        Err(TransactionError::Unsupported(format!(
            "Service '{}' does not implement the handle_service_call capability or the method '{}'",
            self.id(),
            method
        )))
    }

    /// Attempts to downcast this service to an `OnEndBlock` trait object.
    fn as_on_end_block(&self) -> Option<&dyn OnEndBlock> {
        None
    }
}
