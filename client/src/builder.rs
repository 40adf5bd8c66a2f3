//! Shield and unshield request assembly.

use crate::abi::{
    self, dummy_transaction, native_unshield_action_data, note_value, ActionData, CommitmentPreimage,
    RelayAdapt, ShieldRequest, Transaction, UnshieldType,
};
use crate::collaborators::{
    KeyDerivation, ProofTransact, ShieldKeySigner, ShieldNoteEncryptor, SpendingKeys, TransactParams,
};
use crate::config::AccountConfig;
use crate::ledger::LedgerQuery;
use crate::sync::ScanState;
use crate::{Error, Result};
use alloy::primitives::{Address, Bytes, FixedBytes, B256, U256};
use alloy::sol_types::SolCall;
use shielded_account_lib::{
    select_spendable_notes, shield_private_key_from_signature, value_after_unshield_fee, ChangeOutput,
    Note, OutputNote, Selection, TokenData, UnshieldOutput, SHIELD_SIGNATURE_MESSAGE,
};
use std::collections::HashSet;
use tracing::info;

/// A relayed native-asset unshield. Both halves must be submitted together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeUnshieldRequest {
    pub transaction: Transaction,
    pub action_data: ActionData,
}

/// Borrows the account's collaborators for the duration of one request.
pub struct TransactionRequestBuilder<'a, R: Send + Sync> {
    pub config: &'a AccountConfig,
    pub keys: &'a dyn KeyDerivation,
    pub prover: &'a dyn ProofTransact<R>,
    pub encryptor: &'a dyn ShieldNoteEncryptor,
    pub shield_signer: Option<&'a dyn ShieldKeySigner>,
}

impl<'a, R: Send + Sync> TransactionRequestBuilder<'a, R> {
    /// keccak256 of the signer's signature over the shield message.
    /// Derived on every call.
    pub async fn shield_private_key(&self) -> Result<[u8; 32]> {
        let signer = self.shield_signer.ok_or(Error::ShieldSignerNotSet)?;
        let signature = signer.sign_message(SHIELD_SIGNATURE_MESSAGE.as_bytes()).await?;
        Ok(shield_private_key_from_signature(&signature))
    }

    /// Self-shield `value` of the ERC20 at `token_address`.
    pub async fn build_shield_request(&self, token_address: Address, value: u128) -> Result<ShieldRequest> {
        let value = note_value(value)
            .ok_or_else(|| Error::InvalidValue(format!("{value} exceeds uint120")))?;
        let shield_private_key = self.shield_private_key().await?;

        let master_public_key = self.keys.master_public_key().await?;
        let viewing = self.keys.viewing_key_pair().await?;
        let random: [u8; 16] = rand::random();

        let npk = self.encryptor.note_public_key(master_public_key, &random)?;
        let ciphertext = self
            .encryptor
            .encrypt(&random, &shield_private_key, &viewing.public_key)
            .await?;

        let token = TokenData::erc20(token_address);
        info!(%token_address, %value, "built shield request");
        Ok(ShieldRequest {
            preimage: CommitmentPreimage {
                npk,
                token: abi::TokenData::from(&token),
                value,
            },
            ciphertext,
        })
    }

    /// Unshield `value` of `token` straight to `receiver`.
    pub async fn build_unshield_request(
        &self,
        state: &ScanState<R>,
        token: &TokenData,
        value: u128,
        receiver: Address,
        min_gas_price: u128,
    ) -> Result<Transaction> {
        let selection = self.select(state, token, value)?;
        let outputs = self.outputs(&selection, token, receiver).await?;
        let params = TransactParams {
            min_gas_price,
            unshield: UnshieldType::Normal,
            chain_id: self.config.chain_id,
            adapt_contract: Address::ZERO,
            adapt_params: B256::ZERO,
        };

        let transaction = self.prove(state, &params, &selection.notes, &outputs).await?;
        let output_value: u128 = outputs.iter().map(OutputNote::value).sum();
        info!(
            inputs = selection.notes.len(),
            outputs = outputs.len(),
            %output_value,
            %receiver,
            "built unshield request"
        );
        Ok(transaction)
    }

    /// Unshield wrapped native token through the relay adapter, which unwraps
    /// it and forwards the fee-reduced amount to `receiver` as native currency.
    pub async fn build_native_unshield_request<L>(
        &self,
        state: &ScanState<R>,
        ledger: &L,
        value: u128,
        receiver: Address,
        min_gas_price: u128,
    ) -> Result<NativeUnshieldRequest>
    where
        L: LedgerQuery<Receipt = R> + ?Sized,
    {
        let relay_adapt = self
            .config
            .relay_adapt_address
            .ok_or_else(|| Error::Config("relay adapt address not set".into()))?;
        let wrapped = self
            .config
            .wrapped_native_token
            .ok_or_else(|| Error::Config("wrapped native token not set".into()))?;
        let token = TokenData::erc20(wrapped);

        let selection = self.select(state, &token, value)?;
        let nullifiers = nullifiers_for(state, &selection.notes)?;

        let reduced = value_after_unshield_fee(value, self.config.unshield_fee_basis_points);
        let random: [u8; 31] = rand::random();
        let action_data = native_unshield_action_data(
            relay_adapt,
            receiver,
            U256::from(reduced),
            FixedBytes(random),
            U256::from(self.config.relay_min_gas_limit),
        );

        let adapt_params = adapt_params(ledger, relay_adapt, nullifiers, &action_data).await?;

        let outputs = self.outputs(&selection, &token, relay_adapt).await?;
        let params = TransactParams {
            min_gas_price,
            unshield: UnshieldType::Normal,
            chain_id: self.config.chain_id,
            adapt_contract: relay_adapt,
            adapt_params,
        };
        let transaction = self.prove(state, &params, &selection.notes, &outputs).await?;

        info!(
            inputs = selection.notes.len(),
            %value,
            %reduced,
            %receiver,
            %adapt_params,
            "built native unshield request"
        );
        Ok(NativeUnshieldRequest {
            transaction,
            action_data,
        })
    }

    fn select(&self, state: &ScanState<R>, token: &TokenData, value: u128) -> Result<Selection> {
        if note_value(value).is_none() {
            return Err(Error::InvalidValue(format!("{value} exceeds uint120")));
        }
        let unspent = state.notes.unspent_notes(token);
        Ok(select_spendable_notes(&unspent, value)?)
    }

    /// Optional change note back to the account, then the unshield output.
    async fn outputs(&self, selection: &Selection, token: &TokenData, to: Address) -> Result<Vec<OutputNote>> {
        let mut outputs = Vec::with_capacity(2);
        if let Some(change) = selection.change_note_value() {
            let master_public_key = self.keys.master_public_key().await?;
            let viewing = self.keys.viewing_key_pair().await?;
            outputs.push(OutputNote::Change(ChangeOutput {
                master_public_key,
                viewing_public_key: viewing.public_key,
                value: change,
                token: token.clone(),
                random: rand::random(),
            }));
        }
        outputs.push(OutputNote::Unshield(UnshieldOutput {
            to,
            value: selection.target,
            token: token.clone(),
        }));
        Ok(outputs)
    }

    async fn prove(
        &self,
        state: &ScanState<R>,
        params: &TransactParams,
        inputs: &[Note],
        outputs: &[OutputNote],
    ) -> Result<Transaction> {
        let keys = SpendingKeys {
            spending: self.keys.spending_key_pair().await?,
            nullifying_key: self.keys.nullifying_key().await?,
        };
        Ok(self
            .prover
            .build_transaction(state.tree.as_ref(), &keys, params, inputs, outputs)
            .await?)
    }
}

/// Nullifier of each selected note, derived from its position in the
/// ledger's full note list. Equal notes map to distinct positions.
pub fn nullifiers_for<R: Send + Sync>(state: &ScanState<R>, selected: &[Note]) -> Result<Vec<B256>> {
    let all_notes = state.notes.all_notes();
    let mut used = HashSet::with_capacity(selected.len());
    let mut nullifiers = Vec::with_capacity(selected.len());
    for note in selected {
        let position = (0..all_notes.len())
            .find(|i| all_notes[*i] == *note && !used.contains(i))
            .ok_or(Error::NoteNotInLedger)?;
        used.insert(position);
        nullifiers.push(state.notes.nullifier(position)?);
    }
    Ok(nullifiers)
}

/// Ask the relay adapter to hash `action_data` against a placeholder
/// transaction carrying the real nullifiers.
pub async fn adapt_params<L: LedgerQuery + ?Sized>(
    ledger: &L,
    relay_adapt: Address,
    nullifiers: Vec<B256>,
    action_data: &ActionData,
) -> Result<B256> {
    let call = RelayAdapt::getAdaptParamsCall {
        _transactions: vec![dummy_transaction(nullifiers)],
        _actionData: action_data.clone(),
    };
    let output = ledger.call(relay_adapt, Bytes::from(call.abi_encode())).await?;
    let params = RelayAdapt::getAdaptParamsCall::abi_decode_returns(&output).map_err(anyhow::Error::from)?;
    Ok(params)
}
