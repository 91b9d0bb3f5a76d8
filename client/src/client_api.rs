use anyhow::Result;

/// [`KvApi`] is the interface an application uses to talk to a key-value
/// store node. Values travel as text; the node keeps them as-is.
#[async_trait::async_trait]
pub trait KvApi: Send + Sync + 'static {
    /// Returns the value stored under `key`, or `None` when the key was
    /// never written.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, overwriting any previous value.
    async fn put(&self, key: &str, value: &str) -> Result<()>;
}
