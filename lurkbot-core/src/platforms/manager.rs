// File: src/platforms/manager.rs

use tokio::task::JoinHandle;
use tracing::error;

use crate::models::AccountConfig;
use crate::platforms::PlatformIntegration;
use crate::platforms::discord::runtime::DiscordPresencePlatform;

/// PlatformManager starts one presence runtime per configured account.
/// The tasks share nothing; each owns its config, its socket, and its
/// timers, so no account can stall or poison another.
pub struct PlatformManager {
    accounts: Vec<AccountConfig>,
}

impl PlatformManager {
    pub fn new(accounts: Vec<AccountConfig>) -> Self {
        Self { accounts }
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Spawn a background task per account. The handles only resolve if a
    /// runtime panics; the caller holds them for shutdown abort.
    pub fn start_all_accounts(&self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.accounts.len());

        for config in self.accounts.iter().cloned() {
            let ordinal = config.ordinal;
            handles.push(tokio::spawn(async move {
                let mut platform = DiscordPresencePlatform::new(config);
                if let Err(e) = platform.connect().await {
                    error!("[account {ordinal}] connect error: {e:?}");
                    return;
                }
                // start_loop retries forever; it only comes back on an
                // unrecoverable error.
                if let Err(e) = platform.start_loop().await {
                    error!("[account {ordinal}] runtime ended: {e:?}");
                }
            }));
        }

        handles
    }
}
