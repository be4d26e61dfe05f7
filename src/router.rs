//! Message router: validate, switch, capture, run, respond.
//!
//! Validation and provider switching happen synchronously in
//! [`Router::prepare`], in the order messages arrive. The operation itself
//! becomes a [`Job`] holding the provider captured at that moment; running it
//! moves the work onto the blocking pool so the caller can keep accepting
//! messages.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{ErrorCode, NormalizedError};
use crate::message::{Operation, Request, Response};
use crate::provider::Provider;
use crate::registry::DispatchContext;
use crate::secret::Secret;
use crate::types::{Action, ProviderType};
use crate::validate;

const SWITCH_FAILED: &str = "Failed to switch provider: ";

/// Result of the synchronous half of request handling.
pub enum Prepared {
    /// The request was answered without touching a provider operation.
    Done(Response),
    /// An operation bound to a captured provider, ready to run.
    Job(Job),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Direction {
    Encrypt,
    Decrypt,
}

impl Direction {
    fn action(self) -> Action {
        match self {
            Self::Encrypt => Action::Encrypt,
            Self::Decrypt => Action::Decrypt,
        }
    }
}

/// An encrypt or decrypt operation bound to the provider that was active when
/// it was prepared.
pub struct Job {
    direction: Direction,
    provider: Arc<Provider>,
    payload: Vec<u8>,
    password: Secret,
    file_name: String,
}

impl Job {
    pub fn provider_type(&self) -> ProviderType {
        self.provider.kind()
    }

    /// Runs the operation on the blocking pool and builds the response.
    ///
    /// Never fails: every error is normalized into an `ERROR` envelope.
    pub async fn run(self) -> Response {
        let Self { direction, provider, payload, password, file_name } = self;
        let action = direction.action();
        debug!(%action, provider = %provider.kind(), bytes = payload.len(), "dispatching");

        let outcome = tokio::task::spawn_blocking(move || {
            let result = match direction {
                Direction::Encrypt => provider.encrypt(&payload, &password),
                Direction::Decrypt => provider.decrypt(&payload, &password),
            };
            let extension = provider.info().file_extension;
            result.map(|bytes| (bytes, extension)).map_err(|e| provider.normalize_error(&e))
        })
        .await;

        match outcome {
            Ok(Ok((bytes, extension))) => {
                let file_name = match direction {
                    Direction::Encrypt => encrypted_name(&file_name, extension),
                    Direction::Decrypt => decrypted_name(&file_name),
                };
                debug!(%action, bytes = bytes.len(), %file_name, "operation complete");
                Response::Success { action, payload: bytes, file_name }
            }
            Ok(Err(normalized)) => {
                warn!(%action, code = %normalized.code, diagnostic = %normalized.message, "operation failed");
                Response::failure(action, &normalized)
            }
            Err(e) => {
                let normalized = NormalizedError::new(ErrorCode::UnknownError, e.to_string(), None);
                warn!(%action, diagnostic = %normalized.message, "operation task failed");
                Response::failure(action, &normalized)
            }
        }
    }
}

/// Output name for an encrypted file: the provider's extension appended.
pub fn encrypted_name(file_name: &str, extension: &str) -> String {
    format!("{file_name}{extension}")
}

/// Output name for a decrypted file: the final `.`-suffix removed, or the
/// name unchanged when it has no dot.
pub fn decrypted_name(file_name: &str) -> String {
    file_name.rfind('.').map_or(file_name, |dot| &file_name[..dot]).to_owned()
}

#[derive(Clone)]
pub struct Router {
    ctx: Arc<DispatchContext>,
}

impl Router {
    pub fn new(ctx: Arc<DispatchContext>) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &DispatchContext {
        &self.ctx
    }

    /// Handles one wire envelope end to end. Always produces a response.
    pub async fn handle(&self, message: &Value) -> Response {
        match self.prepare(message) {
            Prepared::Done(response) => response,
            Prepared::Job(job) => job.run().await,
        }
    }

    /// Handles an already-decoded request end to end.
    pub async fn dispatch(&self, request: Request) -> Response {
        match self.prepare_request(request) {
            Prepared::Done(response) => response,
            Prepared::Job(job) => job.run().await,
        }
    }

    /// Decodes, validates and switches; returns a job only when a provider
    /// operation is actually needed.
    pub fn prepare(&self, message: &Value) -> Prepared {
        match Request::decode(message) {
            Ok(request) => self.prepare_request(request),
            Err(response) => {
                debug!(?response, "rejected envelope");
                Prepared::Done(response)
            }
        }
    }

    pub fn prepare_request(&self, request: Request) -> Prepared {
        match request {
            Request::Init { provider } => Prepared::Done(self.init(provider.unwrap_or_default())),
            Request::Encrypt(op) => self.prepare_operation(Direction::Encrypt, op),
            Request::Decrypt(op) => self.prepare_operation(Direction::Decrypt, op),
        }
    }

    fn init(&self, target: ProviderType) -> Response {
        match self.ctx.switch(target) {
            Ok(()) => Response::InitSuccess { provider: target },
            Err(e) => Response::InitError { message: format!("{SWITCH_FAILED}{}", e.user_message), code: Some(e.code) },
        }
    }

    fn prepare_operation(&self, direction: Direction, op: Operation) -> Prepared {
        let action = direction.action();

        // Decoded envelopes already passed these; typed callers may not have.
        if let Err(message) = validate::password(op.password.expose_secret()).and_then(|()| validate::file_name(&op.file_name)) {
            return Prepared::Done(Response::error(Some(action), message));
        }

        if let Some(target) = op.provider {
            if let Err(e) = self.ctx.switch(target) {
                return Prepared::Done(Response::Error { action: Some(action), user_message: format!("{SWITCH_FAILED}{}", e.user_message), code: Some(e.code) });
            }
        }

        Prepared::Job(Job { direction, provider: self.ctx.provider(), payload: op.payload, password: op.password, file_name: op.file_name })
    }
}

#[cfg(test)]
mod tests {
    use base64::Engine;
    use base64::prelude::BASE64_STANDARD;
    use serde_json::json;

    use super::*;
    use crate::backend::{AesCrypt, AgeEngine, Backends, ReadySignal};
    use crate::validate::INVALID_FILENAME;

    fn router() -> Router {
        Router::new(Arc::new(DispatchContext::new(Backends::new(AesCrypt::new(1_000), AgeEngine::ready()))))
    }

    fn router_with_pending_age() -> (Router, ReadySignal) {
        let (engine, signal) = AgeEngine::pending();
        (Router::new(Arc::new(DispatchContext::new(Backends::new(AesCrypt::new(1_000), engine)))), signal)
    }

    fn encrypt(payload: &[u8], password: &str, file_name: &str, provider: Option<&str>) -> Value {
        json!({"action": "ENCRYPT", "payload": BASE64_STANDARD.encode(payload), "password": password, "fileName": file_name, "providerType": provider})
    }

    fn decrypt(payload: &[u8], password: &str, file_name: &str, provider: Option<&str>) -> Value {
        json!({"action": "DECRYPT", "payload": BASE64_STANDARD.encode(payload), "password": password, "fileName": file_name, "providerType": provider})
    }

    fn success(response: Response) -> (Vec<u8>, String) {
        match response {
            Response::Success { payload, file_name, .. } => (payload, file_name),
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[test]
    fn test_decrypted_name() {
        assert_eq!(decrypted_name("report.txt.enc"), "report.txt");
        assert_eq!(decrypted_name("noext"), "noext");
        assert_eq!(decrypted_name("archive.tar.gz.age"), "archive.tar.gz");
        assert_eq!(decrypted_name(""), "");
    }

    #[test]
    fn test_encrypted_name_roundtrip() {
        for extension in [".aes", ".enc", ".age"] {
            assert_eq!(decrypted_name(&encrypted_name("report", extension)), "report");
        }
        assert_eq!(encrypted_name("report.txt", ".enc"), "report.txt.enc");
    }

    #[tokio::test]
    async fn test_aead_end_to_end() {
        let router = router();

        let (sealed, name) = success(router.handle(&encrypt(b"hello", "pw123", "x.txt", Some("aead"))).await);
        assert_eq!(sealed.len(), 49);
        assert_eq!(name, "x.txt.enc");

        let (opened, name) = success(router.handle(&decrypt(&sealed, "pw123", &name, Some("aead"))).await);
        assert_eq!(opened, b"hello");
        assert_eq!(name, "x.txt");

        let response = router.handle(&decrypt(&sealed, "wrong", "x.txt.enc", Some("aead"))).await;
        assert_eq!(response.code(), Some(ErrorCode::WrongPassword));
        let Response::Error { action, user_message, .. } = response else { panic!("expected error") };
        assert_eq!(action, Some(Action::Decrypt));
        assert_eq!(user_message, ErrorCode::WrongPassword.user_message(Some(1024)));
    }

    #[tokio::test]
    async fn test_roundtrip_every_provider() {
        let router = router();
        for (provider, extension) in [("legacy", ".aes"), ("aead", ".enc"), ("thirdParty", ".age")] {
            for payload in [&b""[..], b"payload bytes"] {
                let (sealed, name) = success(router.handle(&encrypt(payload, "pw", "data.bin", Some(provider))).await);
                assert_eq!(name, format!("data.bin{extension}"));
                let (opened, name) = success(router.handle(&decrypt(&sealed, "pw", &name, Some(provider))).await);
                assert_eq!(opened, payload);
                assert_eq!(name, "data.bin");
            }
        }
    }

    #[tokio::test]
    async fn test_wrong_password_every_provider() {
        let router = router();
        for provider in ["legacy", "aead", "thirdParty"] {
            let (sealed, _) = success(router.handle(&encrypt(b"secret", "right", "a", Some(provider))).await);
            let response = router.handle(&decrypt(&sealed, "wrong", "a", Some(provider))).await;
            assert_eq!(response.code(), Some(ErrorCode::WrongPassword), "{provider}");
        }
    }

    #[tokio::test]
    async fn test_truncated_aead_container() {
        let router = router();
        let response = router.handle(&decrypt(&[0u8; 27], "pw", "x.enc", Some("aead"))).await;
        assert_eq!(response.code(), Some(ErrorCode::InvalidFormat));
    }

    #[tokio::test]
    async fn test_filename_rejected_before_provider() {
        let router = router();
        for message in [encrypt(b"data", "pw", "../x", Some("aead")), decrypt(b"data", "pw", "a/b", Some("aead"))] {
            let Response::Error { user_message, code, .. } = router.handle(&message).await else { panic!("expected error") };
            assert_eq!(user_message, INVALID_FILENAME);
            assert_eq!(code, None);
        }
        assert_eq!(router.context().active_type(), ProviderType::Legacy);
    }

    #[tokio::test]
    async fn test_init_switches_and_defaults_to_legacy() {
        let router = router();
        assert_eq!(router.handle(&json!({"action": "INIT", "providerType": "aead"})).await, Response::InitSuccess { provider: ProviderType::Aead });
        assert_eq!(router.context().active_type(), ProviderType::Aead);
        assert_eq!(router.handle(&json!({"action": "INIT"})).await, Response::InitSuccess { provider: ProviderType::Legacy });
        assert_eq!(router.context().active_type(), ProviderType::Legacy);
    }

    #[tokio::test]
    async fn test_switch_to_unready_age_is_atomic() {
        let (router, signal) = router_with_pending_age();
        router.handle(&json!(["INIT", "aead"])).await;

        let response = router.handle(&json!(["INIT", "thirdParty"])).await;
        assert_eq!(response.code(), Some(ErrorCode::BackendUnavailable));
        let Response::InitError { message, .. } = response else { panic!("expected init error") };
        assert!(message.starts_with(SWITCH_FAILED));
        assert_eq!(router.context().active_type(), ProviderType::Aead);

        let response = router.handle(&encrypt(b"data", "pw", "f", Some("thirdParty"))).await;
        assert_eq!(response.code(), Some(ErrorCode::BackendUnavailable));
        let Response::Error { user_message, .. } = response else { panic!("expected error") };
        assert!(user_message.starts_with(SWITCH_FAILED));

        let (_, name) = success(router.handle(&encrypt(b"data", "pw", "f", None)).await);
        assert_eq!(name, "f.enc");

        signal.mark_ready();
        assert_eq!(router.handle(&json!(["INIT", "thirdParty"])).await, Response::InitSuccess { provider: ProviderType::ThirdParty });
    }

    #[tokio::test]
    async fn test_job_keeps_captured_provider_across_switch() {
        let router = router();
        let Prepared::Job(job) = router.prepare(&encrypt(b"data", "pw", "f", None)) else { panic!("expected job") };
        assert_eq!(job.provider_type(), ProviderType::Legacy);

        router.handle(&json!(["INIT", "aead"])).await;
        assert_eq!(router.context().active_type(), ProviderType::Aead);

        let (sealed, name) = success(job.run().await);
        assert_eq!(&sealed[..3], b"AES");
        assert_eq!(name, "f.aes");
    }

    #[tokio::test]
    async fn test_dispatch_validates_typed_requests() {
        let router = router();
        let op = Operation { payload: b"data".to_vec(), password: Secret::new(""), file_name: "f".into(), provider: None };
        let response = router.dispatch(Request::Encrypt(op)).await;
        assert_eq!(response, Response::error(Some(Action::Encrypt), validate::INVALID_PASSWORD));
    }

    #[tokio::test]
    async fn test_corrupted_legacy_stream() {
        let router = router();
        let (mut sealed, _) = success(router.handle(&encrypt(b"a longer payload than one block", "pw", "f", Some("legacy"))).await);
        let index = sealed.len() - 40;
        sealed[index] ^= 0x80;
        let response = router.handle(&decrypt(&sealed, "pw", "f.aes", None)).await;
        assert_eq!(response.code(), Some(ErrorCode::CorruptedData));
    }
}
