//! Community-string authorization.

use bytes::Bytes;

/// Which community strings the agent answers.
///
/// Requests carrying any other community are dropped without a reply.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CommunityPolicy {
    /// Answer every request.
    #[default]
    AcceptAll,
    /// Answer only these communities (compared byte for byte).
    OneOf(Vec<Bytes>),
}

impl CommunityPolicy {
    pub fn allows(&self, community: &[u8]) -> bool {
        match self {
            CommunityPolicy::AcceptAll => true,
            CommunityPolicy::OneOf(accepted) => accepted.iter().any(|c| c[..] == *community),
        }
    }

    /// Accept `community` in addition to those already accepted.
    ///
    /// The first call turns an accept-all policy into an allow list.
    pub fn add(&mut self, community: impl Into<Bytes>) {
        let community = community.into();
        match self {
            CommunityPolicy::AcceptAll => *self = CommunityPolicy::OneOf(vec![community]),
            CommunityPolicy::OneOf(accepted) => {
                if !accepted.contains(&community) {
                    accepted.push(community);
                }
            }
        }
    }
}

impl From<&str> for CommunityPolicy {
    fn from(community: &str) -> Self {
        CommunityPolicy::OneOf(vec![Bytes::copy_from_slice(community.as_bytes())])
    }
}

impl<S: AsRef<[u8]>> From<Vec<S>> for CommunityPolicy {
    fn from(communities: Vec<S>) -> Self {
        CommunityPolicy::OneOf(
            communities
                .iter()
                .map(|c| Bytes::copy_from_slice(c.as_ref()))
                .collect(),
        )
    }
}
