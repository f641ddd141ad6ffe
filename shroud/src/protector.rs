//! The per-namespace protection façade.

use std::sync::Arc;
use std::time::Duration;

use shroud_cipher::wire::{self, WireParts};
use shroud_cipher::{Aes256GcmCipher, Cipher};
use shroud_engine::{
    CacheClear, EngineError, KeyEngine, KeyEngineCache, TokenEngine, TokenEngineCache, TokenMap,
};

use crate::error::ProtectError;
use crate::walker::{walk, PiiField, SensitiveRecord, Traversal};

const NO_TOKEN_ENGINE: &str =
    "no token engine configured for this protector; set one on the builder";

// ---------------------------------------------------------------------------
// Protector
// ---------------------------------------------------------------------------

/// Protects the PII fields of application structs within one tenant
/// namespace: field-level encryption, tokenization, and crypto-shredding.
///
/// Obtained from [`ProtectorBuilder`] (or a [`Factory`](crate::Factory) in
/// multi-tenant services). Cheap to share behind an `Arc`; all operations
/// take `&self`.
pub struct Protector {
    namespace: String,
    cipher: Arc<dyn Cipher>,
    key_engine: Arc<dyn KeyEngine>,
    token_engine: Option<Arc<dyn TokenEngine>>,
    graceful_mode: bool,
    caches: Vec<Arc<dyn CacheClear>>,
}

impl Protector {
    /// Starts building a protector for `namespace` on top of `key_engine`.
    pub fn builder(
        namespace: impl Into<String>,
        key_engine: Arc<dyn KeyEngine>,
    ) -> ProtectorBuilder {
        ProtectorBuilder {
            namespace: namespace.into(),
            key_engine,
            cipher: Arc::new(Aes256GcmCipher::new()),
            token_engine: None,
            cache_ttl: None,
            graceful_mode: false,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Encrypts every tagged PII field of `targets` in place.
    ///
    /// Fields already in the wire format are left untouched, so the call is
    /// idempotent. Per-subject keys are created lazily on first use; a
    /// subject whose key was disabled by a graceful forget surfaces
    /// [`ProtectError::SubjectForgotten`] before anything is mutated.
    ///
    /// There is no rollback: a cipher failure partway through leaves the
    /// fields mutated so far in their encrypted form.
    pub async fn encrypt(
        &self,
        targets: &mut [&mut dyn SensitiveRecord],
    ) -> Result<(), ProtectError> {
        let mut traversals: Vec<Traversal<'_>> = Vec::with_capacity(targets.len());
        for target in targets.iter_mut() {
            if let Some(traversal) = walk(&mut **target)? {
                traversals.push(traversal);
            }
        }

        // Subjects that still have at least one plain field.
        let mut wanted: Vec<String> = Vec::new();
        for t in &traversals {
            if t.fields.iter().any(|f| !wire::is_wire_formatted(f.value))
                && !wanted.contains(&t.subject_id)
            {
                wanted.push(t.subject_id.clone());
            }
        }
        if wanted.is_empty() {
            return Ok(());
        }

        let keys = self
            .key_engine
            .get_or_create_keys(&self.namespace, &wanted, self.cipher.key_gen())
            .await?;

        // An id we asked for but did not get back has a disabled key.
        for subject_id in &wanted {
            if !keys.contains_key(subject_id) {
                return Err(ProtectError::SubjectForgotten {
                    subject_id: subject_id.clone(),
                });
            }
        }

        let mut sealed = 0usize;
        for t in traversals {
            let Some(key) = keys.get(&t.subject_id) else { continue };
            for field in t.fields {
                if wire::is_wire_formatted(field.value) {
                    continue;
                }
                let ciphertext = self.cipher.encrypt(&self.namespace, key, field.value)?;
                *field.value = wire::seal(&t.subject_id, &ciphertext);
                sealed += 1;
            }
        }
        tracing::debug!(namespace = %self.namespace, fields = sealed, "encrypted pii fields");
        Ok(())
    }

    /// Decrypts every wire-formatted PII field of `targets` in place.
    ///
    /// Fields are grouped by the subject id carried in their own wire
    /// envelope, not by the target's subject field. A field whose subject
    /// has no active key — the subject was forgotten — is replaced with its
    /// declared fallback (empty string by default) instead of failing.
    /// Plain fields are left untouched, so the call is idempotent.
    pub async fn decrypt(
        &self,
        targets: &mut [&mut dyn SensitiveRecord],
    ) -> Result<(), ProtectError> {
        let mut traversals: Vec<Traversal<'_>> = Vec::with_capacity(targets.len());
        for target in targets.iter_mut() {
            if let Some(traversal) = walk(&mut **target)? {
                traversals.push(traversal);
            }
        }

        struct SealedField<'a> {
            field: PiiField<'a>,
            parts: WireParts,
        }

        let mut sealed: Vec<SealedField<'_>> = Vec::new();
        let mut wanted: Vec<String> = Vec::new();
        for t in traversals {
            for field in t.fields {
                if !wire::is_wire_formatted(field.value) {
                    continue;
                }
                let parts = wire::open(field.value)?;
                if !wanted.contains(&parts.subject_id) {
                    wanted.push(parts.subject_id.clone());
                }
                sealed.push(SealedField { field, parts });
            }
        }
        if sealed.is_empty() {
            return Ok(());
        }

        let keys = self
            .key_engine
            .get_keys(&self.namespace, Some(&wanted))
            .await?;

        let mut shredded = 0usize;
        for SealedField { field, parts } in sealed {
            match keys.get(&parts.subject_id) {
                Some(key) => {
                    *field.value = self.cipher.decrypt(&self.namespace, key, &parts.ciphertext)?;
                }
                None => {
                    // The subject was forgotten; the ciphertext is shredded.
                    *field.value = field.replace.to_string();
                    shredded += 1;
                }
            }
        }
        if shredded > 0 {
            tracing::debug!(
                namespace = %self.namespace,
                fields = shredded,
                "replaced shredded pii fields"
            );
        }
        Ok(())
    }

    /// Forgets a subject: disables its key in graceful mode (recoverable
    /// until the engine's grace-period sweep) or deletes it outright.
    ///
    /// Graceful forget of a subject that never existed surfaces
    /// [`EngineError::KeyNotFound`]; a permanent forget is idempotent.
    pub async fn forget(&self, subject_id: &str) -> Result<(), ProtectError> {
        if self.graceful_mode {
            self.key_engine
                .disable_key(&self.namespace, subject_id)
                .await?;
        } else {
            self.key_engine
                .delete_key(&self.namespace, subject_id)
                .await?;
        }
        tracing::info!(
            namespace = %self.namespace,
            subject_id,
            graceful = self.graceful_mode,
            "subject forgotten"
        );
        Ok(())
    }

    /// Restores a subject disabled by a graceful [`forget`](Self::forget).
    ///
    /// A hard-deleted (or never-created) subject cannot come back:
    /// [`ProtectError::CannotRecoverSubject`].
    pub async fn recover(&self, subject_id: &str) -> Result<(), ProtectError> {
        match self
            .key_engine
            .re_enable_key(&self.namespace, subject_id)
            .await
        {
            Ok(()) => {
                tracing::info!(namespace = %self.namespace, subject_id, "subject recovered");
                Ok(())
            }
            Err(EngineError::KeyNotFound(_)) => Err(ProtectError::CannotRecoverSubject {
                subject_id: subject_id.to_string(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    /// Resolves each value to its pseudonym in this namespace, minting fresh
    /// tokens on first sight.
    ///
    /// # Panics
    ///
    /// Panics if the protector was built without a token engine: calling
    /// this without one is a wiring bug, not a runtime condition.
    pub async fn tokenize(&self, values: &[String]) -> Result<TokenMap, ProtectError> {
        let engine = self.token_engine.as_deref().expect(NO_TOKEN_ENGINE);
        Ok(engine.tokenize(&self.namespace, values).await?)
    }

    /// Resolves tokens back to their original values. Unknown tokens are
    /// omitted from the result.
    ///
    /// # Panics
    ///
    /// Panics if the protector was built without a token engine.
    pub async fn detokenize(&self, tokens: &[String]) -> Result<TokenMap, ProtectError> {
        let engine = self.token_engine.as_deref().expect(NO_TOKEN_ENGINE);
        Ok(engine.detokenize(&self.namespace, tokens).await?)
    }

    /// Drops every cached key and token; cached key material zeroizes.
    ///
    /// A no-op for protectors built without caches.
    pub fn clear_caches(&self) {
        for cache in &self.caches {
            cache.clear();
        }
        if !self.caches.is_empty() {
            tracing::debug!(namespace = %self.namespace, "protector caches cleared");
        }
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Configures and builds a [`Protector`].
pub struct ProtectorBuilder {
    namespace: String,
    key_engine: Arc<dyn KeyEngine>,
    cipher: Arc<dyn Cipher>,
    token_engine: Option<Arc<dyn TokenEngine>>,
    cache_ttl: Option<Duration>,
    graceful_mode: bool,
}

impl ProtectorBuilder {
    /// Replaces the default AES-256-GCM cipher.
    pub fn cipher(mut self, cipher: Arc<dyn Cipher>) -> Self {
        self.cipher = cipher;
        self
    }

    /// Enables tokenize/detokenize by providing a token engine.
    pub fn token_engine(mut self, engine: Arc<dyn TokenEngine>) -> Self {
        self.token_engine = Some(engine);
        self
    }

    /// Decorates the key engine (and the token engine, if any) with
    /// in-memory TTL caches.
    pub fn cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Makes [`Protector::forget`] a recoverable disable instead of a hard
    /// delete.
    pub fn graceful_mode(mut self, graceful: bool) -> Self {
        self.graceful_mode = graceful;
        self
    }

    pub fn build(self) -> Protector {
        let ProtectorBuilder {
            namespace,
            key_engine,
            cipher,
            token_engine,
            cache_ttl,
            graceful_mode,
        } = self;

        let mut caches: Vec<Arc<dyn CacheClear>> = Vec::new();

        let key_engine: Arc<dyn KeyEngine> = match cache_ttl {
            Some(ttl) => {
                let cache = Arc::new(KeyEngineCache::new(key_engine, ttl));
                caches.push(cache.clone());
                cache
            }
            None => key_engine,
        };

        let token_engine: Option<Arc<dyn TokenEngine>> = match (token_engine, cache_ttl) {
            (Some(engine), Some(ttl)) => {
                let cache = Arc::new(TokenEngineCache::new(engine, ttl));
                caches.push(cache.clone());
                Some(cache)
            }
            (engine, _) => engine,
        };

        Protector {
            namespace,
            cipher,
            key_engine,
            token_engine,
            graceful_mode,
            caches,
        }
    }
}
