//! Third-party engine: age passphrase (scrypt) containers.
//!
//! The engine becomes usable only after its asynchronous load finishes. Load
//! state is published on a `watch` channel so selection code can poll it
//! without awaiting.

use std::io::{Read, Write};
use std::iter;

use age::armor::{ArmoredReader, ArmoredWriter, Format};
use age::secrecy::{ExposeSecret, SecretString};
use anyhow::{Context, Result, ensure};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum AgeError {
    #[error("age engine not ready")]
    NotReady,

    #[error("not a passphrase-encrypted age file")]
    NotPassphrase,

    #[error(transparent)]
    Decrypt(#[from] age::DecryptError),

    #[error("age encryption failed: {0}")]
    Encrypt(std::io::Error),

    /// Failure while streaming the payload; the text is the only detail age gives.
    #[error("{0}")]
    Payload(std::io::Error),
}

/// Completes the load of an [`AgeEngine`] created by [`AgeEngine::pending`].
pub struct ReadySignal(watch::Sender<bool>);

impl ReadySignal {
    pub fn mark_ready(&self) {
        self.0.send_replace(true);
    }
}

/// Handle to the age engine. Cheap to clone; all clones share load state.
#[derive(Clone, Debug)]
pub struct AgeEngine {
    ready: watch::Receiver<bool>,
}

impl AgeEngine {
    /// An engine that has not finished loading, plus the signal that finishes it.
    pub fn pending() -> (Self, ReadySignal) {
        let (tx, rx) = watch::channel(false);
        (Self { ready: rx }, ReadySignal(tx))
    }

    /// An engine that is usable immediately.
    pub fn ready() -> Self {
        let (tx, rx) = watch::channel(true);
        drop(tx);
        Self { ready: rx }
    }

    /// An engine that is never loaded, for runs that do not touch age.
    ///
    /// Selecting it fails as not ready and [`AgeEngine::wait_ready`] returns
    /// an error instead of waiting.
    pub fn unavailable() -> Self {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        Self { ready: rx }
    }

    /// Starts the asynchronous load and returns immediately.
    ///
    /// The load runs a passphrase round-trip on the blocking pool and marks the
    /// engine ready only if it succeeds. Must be called inside a tokio runtime.
    pub fn load() -> Self {
        let (engine, signal) = Self::pending();
        tokio::spawn(async move {
            debug!("loading age engine");
            match tokio::task::spawn_blocking(self_test).await {
                Ok(Ok(())) => {
                    signal.mark_ready();
                    info!("age engine ready");
                }
                Ok(Err(e)) => warn!("age engine failed to load: {e:#}"),
                Err(e) => warn!("age engine load task failed: {e}"),
            }
        });
        engine
    }

    /// Non-blocking readiness check.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Waits until the engine is ready. Not for use on the dispatch path.
    pub async fn wait_ready(&self) -> Result<()> {
        let mut ready = self.ready.clone();
        ready.wait_for(|ready| *ready).await.context("age engine failed to load")?;
        Ok(())
    }

    pub fn encrypt_with_passphrase(&self, passphrase: &SecretString, plaintext: &[u8], armor: bool) -> Result<Vec<u8>, AgeError> {
        if !self.is_ready() {
            return Err(AgeError::NotReady);
        }

        let encryptor = age::Encryptor::with_user_passphrase(duplicate(passphrase));
        let mut out = Vec::with_capacity(plaintext.len() + 256);

        if armor {
            let armored = ArmoredWriter::wrap_output(&mut out, Format::AsciiArmor).map_err(AgeError::Encrypt)?;
            let mut writer = encryptor.wrap_output(armored).map_err(AgeError::Encrypt)?;
            writer.write_all(plaintext).map_err(AgeError::Encrypt)?;
            writer.finish().and_then(ArmoredWriter::finish).map_err(AgeError::Encrypt)?;
        } else {
            let mut writer = encryptor.wrap_output(&mut out).map_err(AgeError::Encrypt)?;
            writer.write_all(plaintext).map_err(AgeError::Encrypt)?;
            writer.finish().map_err(AgeError::Encrypt)?;
        }

        Ok(out)
    }

    /// Decrypts a binary or ASCII-armored passphrase container.
    pub fn decrypt_with_passphrase(&self, passphrase: &SecretString, ciphertext: &[u8]) -> Result<Vec<u8>, AgeError> {
        if !self.is_ready() {
            return Err(AgeError::NotReady);
        }

        let decryptor = age::Decryptor::new(ArmoredReader::new(ciphertext))?;
        if !decryptor.is_scrypt() {
            return Err(AgeError::NotPassphrase);
        }

        let identity = age::scrypt::Identity::new(duplicate(passphrase));
        let mut reader = decryptor.decrypt(iter::once(&identity as &dyn age::Identity))?;

        let mut plaintext = Vec::with_capacity(ciphertext.len());
        reader.read_to_end(&mut plaintext).map_err(AgeError::Payload)?;
        Ok(plaintext)
    }
}

fn duplicate(passphrase: &SecretString) -> SecretString {
    SecretString::from(passphrase.expose_secret().to_owned())
}

fn self_test() -> Result<()> {
    let engine = AgeEngine::ready();
    let passphrase = SecretString::from("cipherpost-self-test".to_owned());
    let sealed = engine.encrypt_with_passphrase(&passphrase, b"probe", false)?;
    let opened = engine.decrypt_with_passphrase(&passphrase, &sealed)?;
    ensure!(opened == b"probe", "age self-test round-trip mismatch");
    Ok(())
}
