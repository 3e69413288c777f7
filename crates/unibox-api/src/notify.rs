//! Change notification feed
//!
//! The remote store exposes a cursor-based change feed keyed by user.
//! Subscribing spawns a polling task that forwards payload-less change
//! notices; the engine responds with a full refetch of its current
//! page.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use unibox_core::remote::{ChangeNotice, ChangeNotifications};
use unibox_core::RemoteResult;

use crate::client::InboxClient;
use crate::types::ChangesResponse;

const POLL_INTERVAL: Duration = Duration::from_secs(15);
const NOTICE_CHANNEL_SIZE: usize = 16;

#[async_trait]
impl ChangeNotifications for InboxClient {
    async fn subscribe(&self, user_id: &str) -> RemoteResult<mpsc::Receiver<ChangeNotice>> {
        let (tx, rx) = mpsc::channel(NOTICE_CHANNEL_SIZE);
        let http = self.http.clone();
        let url = format!("{}/api/changes", self.base_url);
        let token = self.access_token.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(POLL_INTERVAL);
            let mut cursor: u64 = 0;
            loop {
                interval.tick().await;
                let response = http
                    .get(&url)
                    .bearer_auth(&token)
                    .query(&[("user", user_id.as_str()), ("cursor", &cursor.to_string())])
                    .send()
                    .await;

                let feed: ChangesResponse = match response {
                    Ok(r) if r.status().is_success() => match r.json().await {
                        Ok(feed) => feed,
                        Err(e) => {
                            warn!(error = %e, "change feed parse failed");
                            continue;
                        }
                    },
                    Ok(r) => {
                        warn!(status = %r.status(), "change feed poll rejected");
                        continue;
                    }
                    Err(e) => {
                        warn!(error = %e, "change feed poll failed");
                        continue;
                    }
                };

                cursor = feed.cursor;
                for change in feed.changes {
                    debug!(mailbox = ?change.mailbox_id, "change notice");
                    if tx
                        .send(ChangeNotice {
                            mailbox_id: change.mailbox_id,
                        })
                        .await
                        .is_err()
                    {
                        // Subscriber dropped the receiver.
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}
