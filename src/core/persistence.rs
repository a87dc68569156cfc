//! Server-side region save
//!
//! The save endpoint answers with a status only. Success raises a transient
//! notification on the display surface; failure is logged and returned.

use std::sync::Arc;

use crate::core::config::ClientConfig;
use crate::core::error::{MawaqitError, Result};
use crate::core::models::Region;
use crate::core::presenter::DisplaySurface;
use crate::core::transport::Transport;

/// Query parameter carrying the region to save
pub const PARAM_SAVE_REGION: &str = "wilaya";

/// Acknowledgement of a successful save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ack {
    pub region: Region,
    pub status: u16,
}

/// Posts the selected region to the save endpoint
pub struct RegionSaver {
    transport: Arc<dyn Transport>,
    url: String,
    surface: Arc<dyn DisplaySurface>,
}

impl RegionSaver {
    pub fn new(transport: Arc<dyn Transport>, url: impl Into<String>, surface: Arc<dyn DisplaySurface>) -> Self {
        Self {
            transport,
            url: url.into(),
            surface,
        }
    }

    pub fn from_config(
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
        surface: Arc<dyn DisplaySurface>,
    ) -> Self {
        Self::new(transport, config.save_url(), surface)
    }

    /// Save `region` server-side and confirm on the surface
    pub async fn save_region(&self, region: &Region) -> Result<Ack> {
        let query = vec![(PARAM_SAVE_REGION.to_string(), region.to_string())];

        let outcome = match self.transport.get(&self.url, &query).await {
            Ok(response) if response.is_success() => Ok(Ack {
                region: region.clone(),
                status: response.status,
            }),
            Ok(response) => Err(format!("status {}", response.status)),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(ack) => {
                tracing::info!(%region, "region saved");
                self.surface.notify(&format!("Saved {}", region));
                Ok(ack)
            }
            Err(message) => {
                tracing::warn!(%region, %message, "saving region failed");
                Err(MawaqitError::Persistence {
                    region: region.to_string(),
                    message,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::presenter::MemorySurface;
    use crate::core::transport::{HttpResponse, MockTransport};

    fn saver(transport: MockTransport) -> (Arc<MemorySurface>, RegionSaver) {
        let surface = Arc::new(MemorySurface::new());
        let saver = RegionSaver::new(Arc::new(transport), "http://test/save", surface.clone());
        (surface, saver)
    }

    #[tokio::test]
    async fn test_save_notifies_on_success() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .withf(|url, query| {
                url == "http://test/save"
                    && query.len() == 1
                    && query[0] == (PARAM_SAVE_REGION.to_string(), "Oran".to_string())
            })
            .times(1)
            .returning(|_, _| Ok(HttpResponse::ok("")));

        let (surface, saver) = saver(transport);
        let ack = saver.save_region(&Region::new("Oran")).await.unwrap();
        assert_eq!(ack.status, 200);
        assert_eq!(surface.notifications(), vec!["Saved Oran"]);
        assert_eq!(surface.write_count(), 0);
    }

    #[tokio::test]
    async fn test_rejected_save_is_silent() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Ok(HttpResponse::with_status(400, "unknown wilaya")));

        let (surface, saver) = saver(transport);
        let err = saver.save_region(&Region::new("Atlantis")).await.unwrap_err();
        assert!(matches!(err, MawaqitError::Persistence { .. }));
        assert!(err.to_string().contains("400"));
        assert!(surface.notifications().is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_save_is_persistence_error() {
        let mut transport = MockTransport::new();
        transport
            .expect_get()
            .returning(|_, _| Err(MawaqitError::network("timed out")));

        let (surface, saver) = saver(transport);
        let err = saver.save_region(&Region::new("Oran")).await.unwrap_err();
        assert!(matches!(err, MawaqitError::Persistence { .. }));
        assert!(surface.notifications().is_empty());
    }
}
