//! 终端模块集成测试
//!
//! 会话状态机、命令调度器、持久化与事件总线协同工作的场景。
//!
//! ## 测试覆盖
//! - 会话初始化、缺失会话、断开
//! - 远程命令、内置命令、空输入、忙碌拒绝
//! - 历史去重、导航与补全
//! - 多目标执行与部分失败
//! - 连接测试、多命令、健康检查

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use netterm_core::models::{
        ExecutionState, HealthStatus, TargetCredentials, TargetDetail, TargetOutcome,
    };
    use netterm_infra::TransportError;
    use tokio::sync::Notify;

    use super::super::dispatcher::{DispatcherConfig, HEALTH_CHECK_COMMAND};
    use super::super::error::{ExecutionError, TerminalError};
    use super::super::events::{event_names, SessionState};
    use super::super::persistence::{MemorySessionStore, SessionPersistence, StoreLimits};
    use super::super::session::{Completion, SubmitOutcome, REASON_DISCONNECT};
    use super::super::test_support::*;
    use super::super::BuiltinCommand;

    fn connection_refused() -> TransportError {
        TransportError::Network("connection refused".to_string())
    }

    // ========================================================================
    // 会话生命周期
    // ========================================================================

    #[tokio::test]
    async fn test_initialize_enters_ready() {
        let h = Harness::with_session(
            ScriptedTransport::new().with_available(&["show version", "show clock"]),
        );
        let terminal = h.terminal();
        assert_eq!(terminal.state(), SessionState::Uninitialized);

        let summary = terminal.initialize().await.unwrap();
        assert_eq!(summary.device_id, "1");
        assert_eq!(terminal.state(), SessionState::Ready);
        assert_eq!(terminal.quick_commands(), vec!["show version", "show clock"]);
        assert_eq!(terminal.prompt().as_deref(), Some("admin@device-1:~$"));

        let started = h.bus.history(None, Some(event_names::SESSION_STARTED));
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].source, "terminal");
        assert_eq!(started[0].payload["session"]["username"], "admin");
        assert!(!started[0].payload.to_string().contains("s3cret-pw"));
    }

    #[tokio::test]
    async fn test_missing_session_closes() {
        let h = Harness::new(ScriptedTransport::new(), MemorySessionStore::default());
        let terminal = h.terminal();

        let err = terminal.initialize().await.unwrap_err();
        assert!(matches!(err, TerminalError::SessionInvalid(_)));
        assert_eq!(terminal.state(), SessionState::Closed);
        assert_eq!(h.event_names(), vec![event_names::SESSION_MISSING]);

        let err = terminal.submit("show version").await.unwrap_err();
        assert!(matches!(err, TerminalError::SessionClosed));
    }

    #[tokio::test]
    async fn test_submit_before_initialize_is_not_ready() {
        let h = Harness::with_session(ScriptedTransport::new());
        let err = h.terminal().submit("show version").await.unwrap_err();
        assert!(matches!(err, TerminalError::NotReady));
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_quick_commands_fall_back_to_device_defaults() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        assert_eq!(
            terminal.quick_commands(),
            vec!["show version", "show ip int brief", "show running-config"]
        );
    }

    #[tokio::test]
    async fn test_disconnect_is_idempotent() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        assert!(terminal.disconnect(REASON_DISCONNECT));
        assert!(!terminal.disconnect(REASON_DISCONNECT));
        assert_eq!(terminal.state(), SessionState::Closed);
        assert!(h.store.load_session().unwrap().is_none());
        assert_eq!(
            h.bus.history(None, Some(event_names::SESSION_CLOSED)).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_snapshot_is_redacted() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        let snapshot = terminal.state_snapshot();
        assert_eq!(snapshot.state, SessionState::Ready);
        assert_eq!(snapshot.credentials.as_ref().map(|c| c.port), Some(22));
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"username\":\"admin\""));
        assert!(!json.contains("s3cret-pw"));
    }

    // ========================================================================
    // 命令提交
    // ========================================================================

    #[tokio::test]
    async fn test_show_version_flow() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        let history_before = terminal.history().len();
        h.bus.clear_history();

        let outcome = terminal.submit("show version").await.unwrap();
        let SubmitOutcome::Completed(execution) = outcome else {
            panic!("expected completed outcome");
        };
        assert_eq!(execution.state, ExecutionState::Succeeded);
        assert_eq!(
            execution.stdout.as_deref(),
            Some("show version output from device-1")
        );

        assert_eq!(
            h.event_names(),
            vec![event_names::COMMAND_EXECUTING, event_names::COMMAND_COMPLETED]
        );
        let completed = h.bus.history(None, Some(event_names::COMMAND_COMPLETED));
        assert_eq!(completed[0].payload["command"], "show version");
        assert_eq!(completed[0].source, "dispatcher");

        assert_eq!(terminal.state(), SessionState::Ready);
        assert_eq!(terminal.history().len(), history_before + 1);
        let persisted = h.store.load_history("1").unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].command, "show version");
    }

    #[tokio::test]
    async fn test_empty_input_is_ignored() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        let events_before = h.bus.history(None, None).len();

        for input in ["", "   ", "\t"] {
            assert_eq!(terminal.submit(input).await.unwrap(), SubmitOutcome::Ignored);
        }

        assert_eq!(h.bus.history(None, None).len(), events_before);
        assert_eq!(terminal.state(), SessionState::Ready);
        assert!(terminal.history().is_empty());
    }

    #[tokio::test]
    async fn test_submit_while_executing_is_rejected() {
        let gate = Arc::new(Notify::new());
        let h = Harness::with_session(ScriptedTransport::new().with_gate(gate.clone()));
        let terminal = Arc::new(h.terminal());
        terminal.initialize().await.unwrap();

        let running = {
            let terminal = terminal.clone();
            tokio::spawn(async move { terminal.submit("show version").await })
        };
        for _ in 0..200 {
            if terminal.state() == SessionState::Executing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(terminal.state(), SessionState::Executing);

        let before = terminal.state_snapshot();
        let err = terminal.submit("show clock").await.unwrap_err();
        assert!(matches!(err, TerminalError::SessionBusy));
        let after = terminal.state_snapshot();
        assert_eq!(before.history_len, after.history_len);
        assert_eq!(before.cursor_position, after.cursor_position);

        let rejected = h.bus.history(None, Some(event_names::COMMAND_REJECTED));
        assert_eq!(rejected.len(), 1);
        assert_eq!(rejected[0].payload["command"], "show clock");
        assert_eq!(rejected[0].payload["state"], "executing");

        gate.notify_one();
        let outcome = running.await.unwrap().unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        assert_eq!(terminal.state(), SessionState::Ready);
        assert_eq!(h.transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_blank_input_while_executing_is_ignored() {
        let gate = Arc::new(Notify::new());
        let h = Harness::with_session(ScriptedTransport::new().with_gate(gate.clone()));
        let terminal = Arc::new(h.terminal());
        terminal.initialize().await.unwrap();

        let running = {
            let terminal = terminal.clone();
            tokio::spawn(async move { terminal.submit("show version").await })
        };
        for _ in 0..200 {
            if terminal.state() == SessionState::Executing {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(terminal.state(), SessionState::Executing);

        assert_eq!(terminal.submit("  ").await.unwrap(), SubmitOutcome::Ignored);
        assert!(h
            .bus
            .history(None, Some(event_names::COMMAND_REJECTED))
            .is_empty());

        gate.notify_one();
        running.await.unwrap().unwrap();
    }

    /// 终态事件的监听器读到的状态已经是 `Ready`
    #[tokio::test]
    async fn test_listeners_observe_ready_on_terminal_events() {
        for (transport, event_name) in [
            (ScriptedTransport::new(), event_names::COMMAND_COMPLETED),
            (
                ScriptedTransport::new().fail_target("1", connection_refused()),
                event_names::COMMAND_FAILED,
            ),
        ] {
            let h = Harness::with_session(transport);
            let terminal = Arc::new(h.terminal());
            terminal.initialize().await.unwrap();

            let observed = Arc::new(parking_lot::Mutex::new(Vec::new()));
            {
                let terminal = terminal.clone();
                let observed = observed.clone();
                h.bus
                    .on(
                        event_name,
                        crate::event_bus::Listener::sync(move |_| {
                            observed.lock().push(terminal.state());
                            Ok(())
                        }),
                    )
                    .unwrap();
            }

            terminal.submit("show version").await.unwrap();
            assert_eq!(*observed.lock(), vec![SessionState::Ready], "{}", event_name);
            assert_eq!(terminal.state(), SessionState::Ready);
        }
    }

    #[tokio::test]
    async fn test_remote_failure_returns_to_ready() {
        let h = Harness::with_session(ScriptedTransport::new().fail_target("1", connection_refused()));
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        h.bus.clear_history();

        let outcome = terminal.submit("show version").await.unwrap();
        assert!(matches!(
            outcome,
            SubmitOutcome::Failed(ExecutionError::Transport(TransportError::Network(_)))
        ));
        assert_eq!(terminal.state(), SessionState::Ready);
        assert_eq!(
            h.event_names(),
            vec![
                event_names::COMMAND_EXECUTING,
                event_names::COMMAND_FAILED,
                event_names::CONNECTION_ERROR
            ]
        );
        let failed = h.bus.history(None, Some(event_names::COMMAND_FAILED));
        assert_eq!(failed[0].payload["connectionError"], true);

        // 提交时已进入内存历史，失败不写持久化历史
        assert_eq!(terminal.history().len(), 1);
        assert!(h.store.load_history("1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_same_command_twice_appends_once() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        terminal.submit("show clock").await.unwrap();
        terminal.submit("show clock").await.unwrap();

        assert_eq!(terminal.history().len(), 1);
        assert_eq!(h.store.load_history("1").unwrap().len(), 1);
        assert_eq!(h.transport.calls().len(), 2);
    }

    // ========================================================================
    // 内置命令
    // ========================================================================

    #[tokio::test]
    async fn test_builtin_never_touches_transport() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        h.bus.clear_history();
        let calls_before = h.transport.calls().len();

        let outcome = terminal.submit("WHOAMI").await.unwrap();
        let SubmitOutcome::Builtin(builtin) = outcome else {
            panic!("expected builtin outcome");
        };
        assert_eq!(builtin.builtin, BuiltinCommand::Whoami);
        assert_eq!(builtin.output, "admin");

        assert_eq!(h.transport.calls().len(), calls_before);
        assert_eq!(h.event_names(), vec![event_names::BUILTIN_EXECUTED]);
        let event = &h.bus.history(None, None)[0];
        assert_eq!(event.payload["builtin"], "whoami");
        assert_eq!(terminal.state(), SessionState::Ready);
    }

    #[tokio::test]
    async fn test_exit_closes_session() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        h.bus.clear_history();

        let outcome = terminal.submit("quit").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Builtin(ref b) if b.disconnect));
        assert_eq!(terminal.state(), SessionState::Closed);
        assert_eq!(
            h.event_names(),
            vec![event_names::BUILTIN_EXECUTED, event_names::SESSION_CLOSED]
        );
        assert!(h.store.load_session().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_history_builtin_lists_submissions() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        terminal.submit("show version").await.unwrap();
        let SubmitOutcome::Builtin(outcome) = terminal.submit("history").await.unwrap() else {
            panic!("expected builtin outcome");
        };
        assert_eq!(
            outcome.output,
            "Command History (2 commands):\n  1: show version\n  2: history"
        );
    }

    // ========================================================================
    // 历史导航与补全
    // ========================================================================

    #[tokio::test]
    async fn test_recall_walks_history() {
        let h = Harness::with_session(ScriptedTransport::new());
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();
        for command in ["a", "b", "c"] {
            terminal.submit(command).await.unwrap();
        }

        assert_eq!(terminal.recall_previous().as_deref(), Some("c"));
        assert_eq!(terminal.recall_previous().as_deref(), Some("b"));
        assert_eq!(terminal.recall_previous().as_deref(), Some("a"));
        assert_eq!(terminal.recall_previous().as_deref(), Some("a"));
        assert_eq!(terminal.recall_next(), "b");
        assert_eq!(terminal.recall_next(), "c");
        assert_eq!(terminal.recall_next(), "");

        terminal.recall_previous();
        terminal.submit("d").await.unwrap();
        assert_eq!(terminal.state_snapshot().cursor_position, 4);
    }

    #[tokio::test]
    async fn test_history_restored_from_store() {
        let store = MemorySessionStore::with_session(stored_session(), StoreLimits::default());
        store.append_history("1", "show interfaces").unwrap();
        store.append_history("1", "show clock").unwrap();
        let h = Harness::new(ScriptedTransport::new(), store);
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        assert_eq!(terminal.recall_previous().as_deref(), Some("show clock"));
        assert_eq!(terminal.recent_history(1)[0].command, "show clock");
    }

    #[tokio::test]
    async fn test_completion() {
        let h = Harness::with_session(ScriptedTransport::new().with_available(&[
            "show version",
            "show ip int brief",
            "ping",
        ]));
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        assert_eq!(
            terminal.complete("show"),
            Completion::Multiple(vec![
                "show version".to_string(),
                "show ip int brief".to_string()
            ])
        );
        assert_eq!(
            terminal.complete("show v"),
            Completion::Single("show version".to_string())
        );
        assert_eq!(terminal.complete("Show"), Completion::None);
        assert_eq!(terminal.complete("traceroute"), Completion::None);
        assert_eq!(terminal.complete(""), Completion::None);

        // 历史中的命令和内置命令都不是补全候选
        terminal.submit("show clock").await.unwrap();
        terminal.submit("pwd").await.unwrap();
        assert_eq!(
            terminal.complete("show v"),
            Completion::Single("show version".to_string())
        );
        assert_eq!(
            terminal.complete("show"),
            Completion::Multiple(vec![
                "show version".to_string(),
                "show ip int brief".to_string()
            ])
        );
        assert_eq!(terminal.complete("p"), Completion::Single("ping".to_string()));
        assert_eq!(terminal.complete("show c"), Completion::None);
    }

    // ========================================================================
    // 调度器
    // ========================================================================

    #[tokio::test]
    async fn test_execute_one_rejects_blank_before_network() {
        let h = Harness::with_session(ScriptedTransport::new());
        let err = h
            .dispatcher
            .execute_one(&target("1"), &credentials(), "  ")
            .await
            .unwrap_err();
        assert_eq!(err, ExecutionError::EmptyCommand);
        assert!(h.transport.calls().is_empty());
        assert_eq!(h.event_names(), vec![event_names::COMMAND_FAILED]);
    }

    #[tokio::test]
    async fn test_execute_across_targets_partial_failure() {
        let h = Harness::with_session(ScriptedTransport::new().fail_target(
            "2",
            TransportError::Http {
                status: 500,
                detail: "Command execution failed: timeout".to_string(),
            },
        ));
        let targets: Vec<TargetCredentials> = ["1", "2", "3"]
            .iter()
            .map(|id| TargetCredentials::new(target(id), credentials()))
            .collect();

        let result = h
            .dispatcher
            .execute_across_targets(&targets, "show version")
            .await;

        let totals = result.totals();
        assert_eq!((totals.attempted, totals.succeeded, totals.failed), (3, 2, 1));
        assert_eq!(result.per_target().len(), 3);
        let failed = result.get("2").unwrap();
        assert_eq!(failed.outcome, TargetOutcome::Failure);
        assert!(matches!(
            &failed.detail,
            TargetDetail::Error { message } if message.contains("timeout")
        ));
        assert!(result.get("1").unwrap().is_success());

        assert_eq!(
            h.bus
                .history(None, Some(event_names::BATCH_COMMAND_COMPLETED))
                .len(),
            1
        );
        assert_eq!(
            h.bus.history(None, Some(event_names::COMMAND_FAILED)).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_execute_across_targets_times_out_per_target() {
        let h = Harness::with_config(
            ScriptedTransport::new().hang_target("3"),
            MemorySessionStore::default(),
            DispatcherConfig {
                target_timeout: Duration::from_millis(50),
                ..DispatcherConfig::default()
            },
        );
        let targets: Vec<TargetCredentials> = ["1", "3"]
            .iter()
            .map(|id| TargetCredentials::new(target(id), credentials()))
            .collect();

        let result = h.dispatcher.execute_across_targets(&targets, "uptime").await;
        assert_eq!(result.totals().succeeded, 1);
        assert_eq!(result.totals().failed, 1);
        assert_eq!(result.get("3").unwrap().outcome, TargetOutcome::Failure);

        // 超时目标也有且只有一个终止事件
        let failed = h.bus.history(None, Some(event_names::COMMAND_FAILED));
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].payload["deviceId"], "3");
    }

    #[tokio::test]
    async fn test_execute_many_reports_in_order() {
        let h = Harness::with_session(ScriptedTransport::new());
        let commands = vec![
            "show version".to_string(),
            "bad command".to_string(),
            "show clock".to_string(),
        ];

        let report = h
            .dispatcher
            .execute_many(&target("1"), &credentials(), &commands)
            .await
            .unwrap();
        assert_eq!(report.commands, commands);
        assert_eq!(report.succeeded(), 2);
        assert_eq!(report.failed(), 1);

        let persisted: Vec<String> = h
            .store
            .load_history("1")
            .unwrap()
            .into_iter()
            .map(|e| e.command)
            .collect();
        assert_eq!(persisted, vec!["show version", "show clock"]);
        assert_eq!(
            h.event_names(),
            vec![
                event_names::MULTI_COMMAND_EXECUTING,
                event_names::MULTI_COMMAND_COMPLETED
            ]
        );
    }

    #[tokio::test]
    async fn test_execute_many_rejects_empty_list() {
        let h = Harness::with_session(ScriptedTransport::new());
        let err = h
            .dispatcher
            .execute_many(&target("1"), &credentials(), &[])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidInput(_)));

        let err = h
            .dispatcher
            .execute_many(&target("1"), &credentials(), &["ls".to_string(), " ".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidInput(_)));
        assert!(h.transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_connection_test_validates_credentials_first() {
        let h = Harness::with_session(ScriptedTransport::new());
        let bad = netterm_core::models::Credentials::new("admin", "", 0);

        let err = h
            .dispatcher
            .test_connection(&target("1"), &bad)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::InvalidInput(_)));
        assert!(h.transport.calls().is_empty());
        assert_eq!(h.event_names(), vec![event_names::CONNECTION_ERROR]);

        let output = h
            .dispatcher
            .test_connection(&target("1"), &credentials())
            .await
            .unwrap();
        assert_eq!(output.successful_tests, 3);
        let success = h.bus.history(None, Some(event_names::CONNECTION_SUCCESS));
        assert_eq!(success[0].payload["totalTests"], 3);
    }

    #[tokio::test]
    async fn test_health_check_across_targets() {
        let h = Harness::with_session(ScriptedTransport::new().fail_target("2", connection_refused()));
        let targets: Vec<TargetCredentials> = ["1", "2"]
            .iter()
            .map(|id| TargetCredentials::new(target(id), credentials()))
            .collect();

        let result = h.dispatcher.health_check_across_targets(&targets).await;
        assert_eq!(result.command(), HEALTH_CHECK_COMMAND);
        assert_eq!(result.totals().succeeded, 1);
        match &result.get("1").unwrap().detail {
            TargetDetail::Health { report } => assert_eq!(report.status, HealthStatus::Healthy),
            other => panic!("unexpected detail: {:?}", other),
        }
        assert_eq!(
            h.bus.history(None, Some(event_names::HEALTH_CHECK_FAILED)).len(),
            1
        );
        assert_eq!(
            h.bus
                .history(None, Some(event_names::BATCH_HEALTH_CHECK_COMPLETED))
                .len(),
            1
        );
    }

    #[tokio::test]
    async fn test_listener_fault_does_not_break_submission() {
        let h = Harness::with_session(ScriptedTransport::new());
        h.bus
            .on(
                event_names::COMMAND_COMPLETED,
                crate::event_bus::Listener::sync(|_| anyhow::bail!("widget crashed")),
            )
            .unwrap();
        let terminal = h.terminal();
        terminal.initialize().await.unwrap();

        let outcome = terminal.submit("show version").await.unwrap();
        assert!(matches!(outcome, SubmitOutcome::Completed(_)));
        assert_eq!(terminal.state(), SessionState::Ready);
        assert_eq!(
            h.bus.history(None, Some(event_names::LISTENER_ERROR)).len(),
            1
        );
    }
}

#[cfg(test)]
mod property_tests {
    use proptest::prelude::*;

    use super::super::history::{HistoryCursor, HistoryIndex};

    proptest! {
        /// 历史不超过容量，且不存在相邻重复
        #[test]
        fn prop_history_bounded_without_adjacent_duplicates(
            capacity in 1usize..20,
            commands in prop::collection::vec("[abc]", 0..60),
        ) {
            let mut index = HistoryIndex::new(capacity);
            for command in &commands {
                index.append(command, "1");
            }
            let stored = index.commands();
            prop_assert!(stored.len() <= capacity);
            for pair in stored.windows(2) {
                prop_assert_ne!(&pair[0], &pair[1]);
            }
            if let Some(last) = commands.last() {
                prop_assert_eq!(stored.last(), Some(last));
            }
        }

        /// 导航游标与按下标模拟的结果一致
        #[test]
        fn prop_navigation_matches_model(
            commands in prop::collection::vec("[a-z]{1,4}", 0..10),
            moves in prop::collection::vec(any::<bool>(), 0..40),
        ) {
            let mut index = HistoryIndex::new(100);
            for command in &commands {
                index.append(command, "1");
            }
            let entries = index.commands();
            let mut cursor = HistoryCursor::at_end(&index);
            let mut position = entries.len();

            for up in moves {
                if up {
                    let got = cursor.previous(&index);
                    if entries.is_empty() {
                        prop_assert!(got.is_none());
                        position = 0;
                    } else {
                        position = position.saturating_sub(1);
                        prop_assert_eq!(got.as_deref(), Some(entries[position].as_str()));
                    }
                } else {
                    let got = cursor.next(&index);
                    if position + 1 < entries.len() {
                        position += 1;
                        prop_assert_eq!(got.as_str(), entries[position].as_str());
                    } else {
                        position = entries.len();
                        prop_assert_eq!(got.as_str(), "");
                    }
                }
                prop_assert_eq!(cursor.position(), position);
            }
        }
    }
}
