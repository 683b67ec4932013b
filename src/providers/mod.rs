pub mod client;
pub mod codeforces;
pub mod avatar;
pub mod resilience;

pub use client::{ApiCredentials, AvatarResolver, ProfileProvider, ProviderConfig};
pub use codeforces::CodeforcesClient;
pub use avatar::{HttpAvatarResolver, PLACEHOLDER_AVATAR};
pub use resilience::{retry_with_backoff, RetryConfig, Retryable};
