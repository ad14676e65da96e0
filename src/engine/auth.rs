use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const TAG_KEY: &[u8] = b"mirrorvault-worker-v1";

/// Verifies the pre-shared worker secret without a timing side channel.
/// Secrets are MACed as messages under a fixed key, so HMAC key padding
/// never makes two different secrets equal; tags are compared with
/// `verify_slice`.
#[derive(Clone)]
pub struct WorkerAuth {
    expected_tag: Option<Vec<u8>>,
}

impl WorkerAuth {
    /// An empty secret rejects every caller.
    pub fn new(secret: &str) -> Self {
        let expected_tag = if secret.is_empty() {
            None
        } else {
            tag(secret.as_bytes())
        };
        Self { expected_tag }
    }

    pub fn verify(&self, presented: &str) -> bool {
        let Some(expected) = &self.expected_tag else {
            return false;
        };
        let Some(mut mac) = keyed_mac() else {
            return false;
        };
        mac.update(presented.as_bytes());
        mac.verify_slice(expected).is_ok()
    }
}

impl std::fmt::Debug for WorkerAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerAuth")
            .field("configured", &self.expected_tag.is_some())
            .finish()
    }
}

fn keyed_mac() -> Option<HmacSha256> {
    HmacSha256::new_from_slice(TAG_KEY).ok()
}

fn tag(secret: &[u8]) -> Option<Vec<u8>> {
    let mut mac = keyed_mac()?;
    mac.update(secret);
    Some(mac.finalize().into_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_matching_secret() {
        let auth = WorkerAuth::new("s3cret");
        assert!(auth.verify("s3cret"));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let auth = WorkerAuth::new("s3cret");
        assert!(!auth.verify("s3cret "));
        assert!(!auth.verify(""));
        assert!(!auth.verify("S3CRET"));
    }

    #[test]
    fn test_rejects_zero_padded_secret() {
        let auth = WorkerAuth::new("s3cret");
        assert!(!auth.verify("s3cret\0"));
        assert!(!auth.verify("s3cret\0\0\0"));
    }

    #[test]
    fn test_long_secrets_compared_exactly() {
        let long = "k".repeat(100);
        let auth = WorkerAuth::new(&long);
        assert!(auth.verify(&long));
        assert!(!auth.verify(&"k".repeat(101)));
        assert!(!auth.verify(&format!("{}x", "k".repeat(99))));
    }

    #[test]
    fn test_unconfigured_rejects_all() {
        let auth = WorkerAuth::new("");
        assert!(!auth.verify(""));
        assert!(!auth.verify("anything"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let dbg = format!("{:?}", WorkerAuth::new("s3cret"));
        assert!(!dbg.contains("s3cret"));
    }
}
