// Path: crates/observer/src/entropy.rs
//! Entropy sources: chain-derived, local random, cached and composite.

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use futures::future::try_join_all;
use observer_api::chain::{BlockSource, HeightSource};
use observer_api::entropy::{EntropyContext, EntropySource};
use observer_types::error::ObserverError;
use observer_types::prelude::OptionExt;
use observer_types::{Entropy, Result};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Bytes produced by [`RandomEntropySource`].
pub const RANDOM_ENTROPY_BYTES: usize = 256;

/// Hashes the identifiers of several consecutive blocks.
///
/// Sampling more than one block raises the cost of grinding a single block
/// hash. A missing block or identifier fails the call.
pub struct ChainEntropySource {
    heights: Arc<dyn HeightSource>,
    blocks: Arc<dyn BlockSource>,
    sampled_blocks: u64,
    blocks_offset: u64,
}

impl ChainEntropySource {
    /// Samples `sampled_blocks` blocks ending `blocks_offset` below the
    /// requested height.
    pub fn new(
        heights: Arc<dyn HeightSource>,
        blocks: Arc<dyn BlockSource>,
        sampled_blocks: u64,
        blocks_offset: u64,
    ) -> Self {
        Self {
            heights,
            blocks,
            sampled_blocks,
            blocks_offset,
        }
    }
}

#[async_trait]
impl EntropySource for ChainEntropySource {
    async fn get_entropy(&self, context: EntropyContext) -> Result<Entropy> {
        let height = match context.height {
            Some(height) => height,
            None => self.heights.get_height().await?,
        };

        let sampled = (0..self.sampled_blocks)
            .map(|i| {
                height
                    .checked_sub(self.blocks_offset + i)
                    .ok_or_else(|| {
                        ObserverError::InvalidInput(format!(
                            "height {height} too low to sample {} blocks at offset {}",
                            self.sampled_blocks, self.blocks_offset
                        ))
                    })
            })
            .collect::<Result<Vec<u64>>>()?;

        let blocks = try_join_all(
            sampled
                .iter()
                .map(|h| self.blocks.get_block_by_height(*h)),
        )
        .await?;

        let mut hasher = Sha256::new();
        for (block, h) in blocks.into_iter().zip(sampled) {
            let indep_hash = block
                .indep_hash
                .or_upstream(&format!("indep_hash for block {h}"))?;
            let bytes = URL_SAFE_NO_PAD
                .decode(indep_hash.trim_end_matches('='))
                .map_err(|e| {
                    ObserverError::UpstreamUnavailable(format!(
                        "block {h} has a malformed indep_hash: {e}"
                    ))
                })?;
            hasher.update(&bytes);
        }
        tracing::debug!(target: "entropy", height, sampled_blocks = self.sampled_blocks, "derived chain entropy");
        Ok(Entropy(hasher.finalize().to_vec()))
    }
}

/// Fresh cryptographically secure random bytes on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomEntropySource;

#[async_trait]
impl EntropySource for RandomEntropySource {
    async fn get_entropy(&self, _context: EntropyContext) -> Result<Entropy> {
        let mut bytes = vec![0u8; RANDOM_ENTROPY_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Ok(Entropy(bytes))
    }
}

/// Materializes the wrapped source's output to a file once and returns the
/// persisted bytes from then on.
pub struct CachedEntropySource {
    inner: Arc<dyn EntropySource>,
    path: PathBuf,
    cached: Mutex<Option<Entropy>>,
}

impl CachedEntropySource {
    /// Caches `inner` at `path`.
    pub fn new(inner: Arc<dyn EntropySource>, path: impl Into<PathBuf>) -> Self {
        Self {
            inner,
            path: path.into(),
            cached: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EntropySource for CachedEntropySource {
    async fn get_entropy(&self, context: EntropyContext) -> Result<Entropy> {
        let mut cached = self.cached.lock().await;
        if let Some(entropy) = cached.as_ref() {
            return Ok(entropy.clone());
        }

        let entropy = if tokio::fs::try_exists(&self.path).await? {
            Entropy(tokio::fs::read(&self.path).await?)
        } else {
            let fresh = self.inner.get_entropy(context).await?;
            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let tmp_path = self.path.with_extension("tmp");
            tokio::fs::write(&tmp_path, fresh.as_bytes()).await?;
            tokio::fs::rename(&tmp_path, &self.path).await?;
            tracing::info!(target: "entropy", path = %self.path.display(), "persisted new entropy cache");
            fresh
        };

        if entropy.as_bytes().is_empty() {
            return Err(ObserverError::Storage(format!(
                "entropy cache {} is empty",
                self.path.display()
            )));
        }
        *cached = Some(entropy.clone());
        Ok(entropy)
    }
}

/// Binds several sources together by hashing their outputs in source order.
pub struct CompositeEntropySource {
    sources: Vec<Arc<dyn EntropySource>>,
}

impl CompositeEntropySource {
    /// Combines `sources`. Order is significant.
    pub fn new(sources: Vec<Arc<dyn EntropySource>>) -> Self {
        Self { sources }
    }
}

#[async_trait]
impl EntropySource for CompositeEntropySource {
    async fn get_entropy(&self, context: EntropyContext) -> Result<Entropy> {
        let outputs = try_join_all(self.sources.iter().map(|s| s.get_entropy(context))).await?;
        let mut hasher = Sha256::new();
        for output in &outputs {
            hasher.update(output.as_bytes());
        }
        Ok(Entropy(hasher.finalize().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use observer_types::gateway::BlockInfo;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockChain {
        height: u64,
        hashes: HashMap<u64, Option<String>>,
    }

    #[async_trait]
    impl HeightSource for MockChain {
        async fn get_height(&self) -> Result<u64> {
            Ok(self.height)
        }
    }

    #[async_trait]
    impl BlockSource for MockChain {
        async fn get_block_by_height(&self, height: u64) -> Result<BlockInfo> {
            match self.hashes.get(&height) {
                Some(hash) => Ok(BlockInfo {
                    indep_hash: hash.clone(),
                    timestamp: height * 120,
                }),
                None => Err(ObserverError::UpstreamUnavailable(format!("no block {height}"))),
            }
        }
    }

    fn chain(height: u64, hashes: &[(u64, Option<&str>)]) -> Arc<MockChain> {
        Arc::new(MockChain {
            height,
            hashes: hashes
                .iter()
                .map(|(h, id)| (*h, id.map(|b| URL_SAFE_NO_PAD.encode(b.as_bytes()))))
                .collect(),
        })
    }

    struct FixedSource {
        bytes: Vec<u8>,
        delay: Duration,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(bytes: &[u8], delay_ms: u64) -> Arc<Self> {
            Arc::new(Self {
                bytes: bytes.to_vec(),
                delay: Duration::from_millis(delay_ms),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl EntropySource for FixedSource {
        async fn get_entropy(&self, _context: EntropyContext) -> Result<Entropy> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok(Entropy(self.bytes.clone()))
        }
    }

    fn fixed(bytes: &[u8], delay_ms: u64) -> Arc<dyn EntropySource> {
        FixedSource::new(bytes, delay_ms)
    }

    #[tokio::test]
    async fn test_chain_entropy_hashes_blocks_in_descending_order() {
        let mock = chain(
            10,
            &[(10, Some("ten")), (9, Some("nine")), (8, Some("eight"))],
        );
        let source = ChainEntropySource::new(mock.clone(), mock, 3, 0);
        let entropy = source.get_entropy(EntropyContext::default()).await.unwrap();

        let expected = Sha256::new()
            .chain_update(b"ten")
            .chain_update(b"nine")
            .chain_update(b"eight")
            .finalize();
        assert_eq!(entropy.as_bytes(), expected.as_slice());
    }

    #[tokio::test]
    async fn test_chain_entropy_honours_height_and_offset() {
        let mock = chain(100, &[(48, Some("a")), (47, Some("b"))]);
        let source = ChainEntropySource::new(mock.clone(), mock, 2, 2);
        let entropy = source
            .get_entropy(EntropyContext::at_height(50))
            .await
            .unwrap();
        let expected = Sha256::new().chain_update(b"a").chain_update(b"b").finalize();
        assert_eq!(entropy.as_bytes(), expected.as_slice());
    }

    #[tokio::test]
    async fn test_chain_entropy_fails_on_missing_identifier() {
        let mock = chain(5, &[(5, Some("x")), (4, None)]);
        let source = ChainEntropySource::new(mock.clone(), mock, 2, 0);
        let err = source
            .get_entropy(EntropyContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ObserverError::UpstreamUnavailable(_)));
    }

    #[tokio::test]
    async fn test_chain_entropy_fails_below_genesis() {
        let mock = chain(1, &[(1, Some("x")), (0, Some("y"))]);
        let source = ChainEntropySource::new(mock.clone(), mock, 3, 0);
        assert!(source.get_entropy(EntropyContext::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_random_entropy_length() {
        let a = RandomEntropySource
            .get_entropy(EntropyContext::default())
            .await
            .unwrap();
        let b = RandomEntropySource
            .get_entropy(EntropyContext::default())
            .await
            .unwrap();
        assert_eq!(a.as_bytes().len(), RANDOM_ENTROPY_BYTES);
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_cached_entropy_persists_and_reuses() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("entropy");

        let first = CachedEntropySource::new(Arc::new(RandomEntropySource), &path);
        let a = first.get_entropy(EntropyContext::default()).await.unwrap();
        let b = first.get_entropy(EntropyContext::default()).await.unwrap();
        assert_eq!(a, b);

        // A new instance over the same file returns the persisted bytes.
        let inner = FixedSource::new(b"never used", 0);
        let second = CachedEntropySource::new(inner.clone(), &path);
        let c = second.get_entropy(EntropyContext::default()).await.unwrap();
        assert_eq!(a, c);
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cached_entropy_ignores_partial_tmp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entropy");
        tokio::fs::write(path.with_extension("tmp"), b"trunc").await.unwrap();

        let inner = FixedSource::new(b"complete secret", 0);
        let cached = CachedEntropySource::new(inner.clone(), &path);
        let entropy = cached.get_entropy(EntropyContext::default()).await.unwrap();
        assert_eq!(entropy.as_bytes(), b"complete secret");
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"complete secret");
        assert!(!tokio::fs::try_exists(path.with_extension("tmp")).await.unwrap());
    }

    #[tokio::test]
    async fn test_composite_depends_on_every_source() {
        let base = CompositeEntropySource::new(vec![
            fixed(b"chain", 0),
            fixed(b"local", 0),
        ]);
        let chain_changed = CompositeEntropySource::new(vec![
            fixed(b"chain2", 0),
            fixed(b"local", 0),
        ]);
        let local_changed = CompositeEntropySource::new(vec![
            fixed(b"chain", 0),
            fixed(b"local2", 0),
        ]);
        let ctx = EntropyContext::default();
        let a = base.get_entropy(ctx).await.unwrap();
        assert_ne!(a, chain_changed.get_entropy(ctx).await.unwrap());
        assert_ne!(a, local_changed.get_entropy(ctx).await.unwrap());
    }

    #[tokio::test]
    async fn test_composite_hashes_in_source_order_not_completion_order() {
        let ctx = EntropyContext::default();
        let slow_first = CompositeEntropySource::new(vec![
            fixed(b"first", 30),
            fixed(b"second", 0),
        ]);
        let fast_first = CompositeEntropySource::new(vec![
            fixed(b"first", 0),
            fixed(b"second", 30),
        ]);
        let expected = Sha256::new()
            .chain_update(b"first")
            .chain_update(b"second")
            .finalize();
        assert_eq!(
            slow_first.get_entropy(ctx).await.unwrap().as_bytes(),
            expected.as_slice()
        );
        assert_eq!(
            fast_first.get_entropy(ctx).await.unwrap().as_bytes(),
            expected.as_slice()
        );
    }
}
