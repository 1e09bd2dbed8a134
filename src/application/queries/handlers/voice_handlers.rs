//! Voice Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{VoiceCatalogPort, VoiceInfo};
use crate::application::queries::ListVoices;

/// ListVoices Handler
pub struct ListVoicesHandler {
    catalog: Arc<dyn VoiceCatalogPort>,
}

impl ListVoicesHandler {
    pub fn new(catalog: Arc<dyn VoiceCatalogPort>) -> Self {
        Self { catalog }
    }

    pub async fn handle(&self, query: ListVoices) -> Result<Vec<VoiceInfo>, ApplicationError> {
        let voices = self.catalog.list_voices().await?;

        let voices = match query.locale {
            Some(locale) => voices
                .into_iter()
                .filter(|v| v.locale.eq_ignore_ascii_case(&locale))
                .collect(),
            None => voices,
        };

        Ok(voices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FakeTtsClient;

    #[tokio::test]
    async fn test_list_all_voices() {
        let handler = ListVoicesHandler::new(Arc::new(FakeTtsClient::with_defaults()));
        let voices = handler.handle(ListVoices::default()).await.unwrap();
        assert_eq!(voices.len(), 4);
    }

    #[tokio::test]
    async fn test_filter_by_locale() {
        let handler = ListVoicesHandler::new(Arc::new(FakeTtsClient::with_defaults()));
        let voices = handler
            .handle(ListVoices {
                locale: Some("zh-cn".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(voices.len(), 2);
        assert!(voices.iter().all(|v| v.locale == "zh-CN"));
    }
}
