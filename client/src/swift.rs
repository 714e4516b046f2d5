//! Signed-message ("swift") orders.
//!
//! A taker, or a delegate trading for one, signs an order message off-chain
//! and posts it to the relay, which forwards it to makers and lands it
//! on-chain. The message is the borsh encoding of
//! [`SignedMsgOrderParamsDelegateMessage`] behind an 8-byte discriminator,
//! hex-encoded; the signature covers the hex text.

use std::time::Duration;

use anchor_lang::{AnchorDeserialize, AnchorSerialize};
use backon::{ConstantBuilder, Retryable};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use drift::controller::position::PositionDirection;
use drift::state::order_params::OrderParams;
use rand::{distributions::Alphanumeric, Rng};
use reqwest::StatusCode;
use serde::Serialize;
use solana_sdk::{hash::hash, pubkey::Pubkey, signature::Keypair, signature::Signature, signer::Signer};
use tracing::{debug, info};

pub use drift::state::order_params::SignedMsgTriggerOrderParams;
pub use drift::validation::sig_verification::SignedMsgOrderParamsDelegateMessage;

use crate::error::{Error, Result};
use crate::orders::OrderBuilder;

const DELEGATE_MESSAGE_TYPE: &str = "global:SignedMsgOrderParamsDelegateMessage";

/// Random id distinguishing orders signed in the same slot.
pub fn generate_signed_msg_uuid() -> [u8; 8] {
    let mut uuid = [0u8; 8];
    for (byte, c) in uuid
        .iter_mut()
        .zip(rand::thread_rng().sample_iter(&Alphanumeric))
    {
        *byte = c;
    }
    uuid
}

/// Delegate message for `taker_pubkey` (the user account, not its
/// authority) with a fresh uuid and no take-profit or stop-loss legs.
pub fn delegate_message(
    params: OrderParams,
    taker_pubkey: Pubkey,
    slot: u64,
) -> SignedMsgOrderParamsDelegateMessage {
    SignedMsgOrderParamsDelegateMessage {
        signed_msg_order_params: params,
        taker_pubkey,
        slot,
        uuid: generate_signed_msg_uuid(),
        take_profit_order_params: None,
        stop_loss_order_params: None,
        ..Default::default()
    }
}

/// Oracle auction floating `offset` around the oracle: longs auction from
/// below it to above it, shorts the other way.
pub fn oracle_auction_params(
    market_index: u16,
    direction: PositionDirection,
    base_asset_amount: u64,
    offset: i64,
    auction_duration: u8,
) -> OrderParams {
    let (start, end) = match direction {
        PositionDirection::Long => (-offset, offset),
        PositionDirection::Short => (offset, -offset),
    };
    OrderBuilder::oracle(market_index, direction, base_asset_amount)
        .auction(start, end, auction_duration)
        .build()
}

fn message_discriminator() -> [u8; 8] {
    let mut discriminator = [0u8; 8];
    discriminator.copy_from_slice(&hash(DELEGATE_MESSAGE_TYPE.as_bytes()).to_bytes()[..8]);
    discriminator
}

pub fn encode_delegate_message(message: &SignedMsgOrderParamsDelegateMessage) -> Result<Vec<u8>> {
    let mut data = message_discriminator().to_vec();
    message.serialize(&mut data)?;
    Ok(data)
}

pub fn decode_delegate_message(data: &[u8]) -> Result<SignedMsgOrderParamsDelegateMessage> {
    let Some(body) = data.strip_prefix(&message_discriminator()) else {
        return Err(Error::Program("unexpected message discriminator".into()));
    };
    Ok(SignedMsgOrderParamsDelegateMessage::deserialize(&mut &body[..])?)
}

/// A message ready to be posted to the relay.
#[derive(Debug, Clone)]
pub struct SignedOrderMessage {
    /// Hex text of the encoded message; this is what gets signed.
    pub message: String,
    pub signature: Signature,
}

pub fn sign_delegate_message(
    signer: &Keypair,
    message: &SignedMsgOrderParamsDelegateMessage,
) -> Result<SignedOrderMessage> {
    let message = hex::encode(encode_delegate_message(message)?);
    let signature = signer.sign_message(message.as_bytes());
    Ok(SignedOrderMessage { message, signature })
}

/// Identifier the relay tracks an order by: base64 of sha256(signature).
pub fn digest_signature(signature: &Signature) -> String {
    STANDARD.encode(hash(signature.as_ref()).to_bytes())
}

/// Body of `POST /orders`.
#[derive(Debug, Clone, Serialize)]
pub struct SwiftOrderRequest {
    pub market_index: u16,
    pub market_type: &'static str,
    pub message: String,
    pub signature: String,
    /// Authority of the user traded for.
    pub taker_pubkey: String,
    /// Delegate that signed the message.
    pub signing_authority: String,
}

impl SwiftOrderRequest {
    pub fn perp(
        market_index: u16,
        signed: &SignedOrderMessage,
        taker_authority: &Pubkey,
        signing_authority: &Pubkey,
    ) -> Self {
        Self {
            market_index,
            market_type: "perp",
            message: signed.message.clone(),
            signature: STANDARD.encode(signed.signature.as_ref()),
            taker_pubkey: taker_authority.to_string(),
            signing_authority: signing_authority.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashStatus {
    Confirmed,
    /// The relay answered with a server error.
    Failed(u16),
    TimedOut,
}

/// Maps a hash-status response: 2xx is confirmed, 5xx failed, anything
/// else means the relay has not seen the hash yet.
fn classify_hash_status(status: StatusCode) -> Option<HashStatus> {
    if status.is_success() {
        Some(HashStatus::Confirmed)
    } else if status.is_server_error() {
        Some(HashStatus::Failed(status.as_u16()))
    } else {
        None
    }
}

/// Retries after the first request so that requests go out every
/// `poll_interval` strictly before `timeout`.
fn poll_retries(poll_interval: Duration, timeout: Duration) -> usize {
    let interval = poll_interval.as_millis().max(1);
    let requests = timeout.as_millis().div_ceil(interval).max(1);
    (requests - 1) as usize
}

#[derive(Debug)]
enum PollError {
    Pending,
    Http(reqwest::Error),
}

/// HTTP client of the signed-message relay.
#[derive(Clone)]
pub struct SwiftClient {
    http: reqwest::Client,
    base_url: String,
}

impl SwiftClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_http(base_url, reqwest::Client::new())
    }

    pub fn with_http(base_url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn send_order(&self, request: &SwiftOrderRequest) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/orders", self.base_url))
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        info!(market_index = request.market_index, "order accepted by relay");
        Ok(())
    }

    /// Polls the relay until it reports `hash`, fails, or `timeout` passes.
    pub async fn wait_for_confirmation(
        &self,
        hash: &str,
        poll_interval: Duration,
        timeout: Duration,
    ) -> Result<HashStatus> {
        let url = format!("{}/confirmation/hash-status", self.base_url);
        let retries = poll_retries(poll_interval, timeout);
        let (http, url) = (&self.http, url.as_str());

        let poll = || async move {
            let response = http
                .get(url)
                .query(&[("hash", hash)])
                .send()
                .await
                .map_err(PollError::Http)?;
            let status = response.status();
            debug!(%status, hash, "hash status");
            classify_hash_status(status).ok_or(PollError::Pending)
        };

        let backoff = ConstantBuilder::default()
            .with_delay(poll_interval)
            .with_max_times(retries);
        match poll
            .retry(&backoff)
            .when(|e| matches!(e, PollError::Pending))
            .await
        {
            Ok(status) => Ok(status),
            Err(PollError::Pending) => Ok(HashStatus::TimedOut),
            Err(PollError::Http(e)) => Err(e.into()),
        }
    }
}
