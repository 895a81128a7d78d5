//! 端到端回合测试：Mock LLM + 记录型上报通道

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use honeypot::agent::build_components_with;
    use honeypot::api::{AnalysisRequest, ChatMessage, Timestamp};
    use honeypot::callback::{CallbackError, FinalResultPayload, Reporter};
    use honeypot::config::AppConfig;
    use honeypot::core::{
        spawn_sweeper, sweep_all, CacheShutdown, CleanupQueueDrain, ShutdownCoordinator,
        ShutdownManager, ShutdownReason,
    };
    use honeypot::llm::MockLlmClient;
    use honeypot::tools::{SessionMetadata, TurnContext};
    use honeypot::{process_turn, HoneypotComponents};

    #[derive(Default)]
    struct RecordingReporter {
        sent: Mutex<Vec<FinalResultPayload>>,
    }

    #[async_trait]
    impl Reporter for RecordingReporter {
        async fn send(&self, payload: &FinalResultPayload) -> Result<(), CallbackError> {
            self.sent.lock().unwrap().push(payload.clone());
            Ok(())
        }
    }

    fn components(cfg: AppConfig) -> (HoneypotComponents, Arc<RecordingReporter>) {
        let reporter = Arc::new(RecordingReporter::default());
        let components = build_components_with(cfg, Arc::new(MockLlmClient), reporter.clone());
        (components, reporter)
    }

    fn message(sender: &str, text: &str) -> ChatMessage {
        ChatMessage {
            sender: sender.to_string(),
            text: text.to_string(),
            timestamp: Timestamp::Text("2026-01-21T10:15:30Z".to_string()),
        }
    }

    fn request(session_id: &str, text: &str, history: Vec<ChatMessage>) -> AnalysisRequest {
        AnalysisRequest {
            session_id: session_id.to_string(),
            message: message("scammer", text),
            conversation_history: history,
            metadata: Some(SessionMetadata {
                channel: Some("SMS".to_string()),
                language: Some("English".to_string()),
                locale: Some("IN".to_string()),
            }),
        }
    }

    #[tokio::test]
    async fn test_intel_accumulates_and_report_refires() {
        let (components, reporter) = components(AppConfig::default());

        let history = vec![
            message("scammer", "Your account will be blocked today"),
            message("user", "oh no why??"),
        ];
        let response = process_turn(
            &components,
            request("flow-1", "Verify now, share your bank details", history.clone()),
        )
        .await;
        assert!(response.is_success());
        assert!(response.reply.contains("Mock Response"));

        {
            let sent = reporter.sent.lock().unwrap();
            assert_eq!(sent.len(), 1);
            assert!(sent[0].scam_detected);
            assert_eq!(sent[0].total_messages_exchanged, 4);
            assert_eq!(sent[0].extracted_intelligence.bank_accounts, vec!["MOCKBANK456"]);
            assert!(sent[0].extracted_intelligence.upi_ids.is_empty());
        }

        let mut history = history;
        history.push(message("scammer", "Verify now, share your bank details"));
        history.push(message("user", &response.reply));
        let response = process_turn(
            &components,
            request("flow-1", "Pay the fee via UPI instead", history),
        )
        .await;
        assert!(response.is_success());

        let sent = reporter.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[1].total_messages_exchanged, 6);
        assert_eq!(sent[1].extracted_intelligence.bank_accounts, vec!["MOCKBANK456"]);
        assert_eq!(sent[1].extracted_intelligence.upi_ids, vec!["mock@upi"]);
        drop(sent);

        let intel = components.intel.peek("flow-1").await.unwrap();
        assert!(intel.callback_sent);
        assert_eq!(intel.reports_sent, 2);
        assert!(intel.last_reported_at.is_some());
    }

    #[tokio::test]
    async fn test_benign_message_reports_nothing() {
        let (components, reporter) = components(AppConfig::default());
        let response = process_turn(&components, request("flow-2", "hello, who is this?", vec![])).await;

        assert!(response.is_success());
        assert!(reporter.sent.lock().unwrap().is_empty());
        assert!(components.intel.peek("flow-2").await.is_none());
    }

    #[tokio::test]
    async fn test_runtime_reused_and_memory_seeded_once() {
        let (components, _reporter) = components(AppConfig::default());
        let history = vec![message("scammer", "hi"), message("user", "hello")];

        process_turn(&components, request("flow-3", "are you there", history.clone())).await;
        let runtime = components
            .leases
            .lease_for(&TurnContext::new("flow-3", 1, SessionMetadata::default()))
            .await
            .unwrap();
        // 2 条历史 + 本回合消息 + 回复
        assert_eq!(runtime.memory().len().await, 4);

        process_turn(&components, request("flow-3", "reply fast", history)).await;
        assert_eq!(runtime.memory().len().await, 6);
        assert_eq!(runtime.metadata().await.channel.as_deref(), Some("SMS"));
    }

    #[tokio::test]
    async fn test_lease_capacity_evicts_and_releases_runtime() {
        let mut cfg = AppConfig::default();
        cfg.cache.lease_max_size = 1;
        let (components, _reporter) = components(cfg);

        process_turn(&components, request("a", "hello", vec![])).await;
        let first = components
            .leases
            .lease_for(&TurnContext::new("a", 1, SessionMetadata::default()))
            .await
            .unwrap();
        process_turn(&components, request("b", "hello", vec![])).await;
        components.cleanup.wait_idle().await;

        assert!(first.is_closed());
        assert_eq!(first.memory().len().await, 0);
        assert_eq!(components.leases.len().await, 1);
    }

    #[tokio::test]
    async fn test_sweeper_and_shutdown_clear_caches() {
        let mut cfg = AppConfig::default();
        cfg.cache.intel_ttl_secs = 0;
        cfg.cache.lease_ttl_secs = 0;
        let (components, _reporter) = components(cfg);

        process_turn(&components, request("flow-5", "send to my bank", vec![])).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sweep_all(&components.maintained_caches()).await >= 1);
        assert_eq!(components.intel.len().await, 0);
        assert_eq!(components.leases.len().await, 0);

        let manager = Arc::new(ShutdownManager::new());
        let sweeper = spawn_sweeper(
            components.maintained_caches(),
            Duration::from_millis(10),
            manager.token(),
        );
        process_turn(&components, request("flow-6", "hello", vec![])).await;

        let mut coordinator = ShutdownCoordinator::new();
        for cache in components.maintained_caches() {
            coordinator.register(CacheShutdown::new(cache));
        }
        coordinator.register(CleanupQueueDrain::new(components.cleanup.clone()));

        manager.shutdown(ShutdownReason::UserInitiated);
        sweeper.await.unwrap();
        coordinator.run_cleanup().await;

        assert_eq!(components.intel.len().await, 0);
        assert_eq!(components.leases.len().await, 0);
        assert_eq!(components.cleanup.outstanding(), 0);
    }
}
