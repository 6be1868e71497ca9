//! Best-effort analytics sink.
//!
//! Events fan out to NATS and the `user_activity` table on a detached task.
//! Nothing here may block a caller or surface a failure; transport errors
//! are logged at debug and dropped.

use std::sync::Arc;

use crate::domain::events::StorefrontEvent;
use crate::storage::{ActivityRecord, ActivityStore};

#[derive(Clone)]
pub struct Analytics {
    nats: Option<async_nats::Client>,
    activity: Option<Arc<dyn ActivityStore>>,
}

impl Analytics {
    pub fn new(nats: Option<async_nats::Client>, activity: Option<Arc<dyn ActivityStore>>) -> Self {
        Self { nats, activity }
    }

    /// Emits a typed storefront event. Returns immediately; delivery happens
    /// on a detached task and is never awaited by the caller.
    pub fn emit(&self, session_id: Option<String>, event: StorefrontEvent) {
        let sink = self.clone();
        tokio::spawn(async move {
            if let Some(client) = &sink.nats {
                match serde_json::to_vec(&event) {
                    Ok(payload) => {
                        if let Err(err) = client.publish(event.subject(), payload.into()).await {
                            tracing::debug!(subject = event.subject(), error = %err, "event publish dropped");
                        }
                    }
                    Err(err) => {
                        tracing::debug!(error = %err, "event serialization dropped");
                    }
                }
            }
            if let Some(store) = &sink.activity {
                let (product_id, product_name) = match event.product() {
                    Some((id, name)) => (Some(id), Some(name.to_string())),
                    None => (None, None),
                };
                let record = ActivityRecord {
                    session_id,
                    activity_type: event.activity_type().to_string(),
                    product_id,
                    product_name,
                    metadata: serde_json::to_value(&event).ok(),
                    ..ActivityRecord::default()
                };
                if let Err(err) = store.record_activity(&record).await {
                    tracing::debug!(error = %err, "activity row dropped");
                }
            }
        });
    }

    /// Ingests a raw activity row (the client-side pixel path). Best-effort,
    /// same as `emit`.
    pub fn track(&self, record: ActivityRecord) {
        let Some(store) = self.activity.clone() else { return };
        tokio::spawn(async move {
            if let Err(err) = store.record_activity(&record).await {
                tracing::debug!(error = %err, "activity row dropped");
            }
        });
    }
}
